use memeai_studio::{config::Config, errors::AppError, routes::create_router, startup::build_studio, AppState};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "memeai_studio=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = Config::load()?;
    tracing::info!(
        store = ?config.store,
        export = ?config.export,
        caption_model = %config.ai.caption_model,
        image_model = %config.ai.image_model,
        "Configuration loaded"
    );
    if config.ai.api_key.is_none() {
        tracing::warn!("No GEMINI_API_KEY set; AI features will fall back to placeholders");
    }

    // --- Studio ---
    let studio = build_studio(&config).await?;
    let state = Arc::new(AppState::new(studio));
    let app = create_router(state);

    // --- Server Startup ---
    tracing::info!("Server listening on http://{}", config.bind_address);
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
