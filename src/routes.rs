use crate::{handlers, AppState};
use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, patch, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Uploads and camera captures travel as whole images.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Creates the Axum router and associates routes with handlers.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/feed", get(handlers::get_feed))
        .route("/memes", get(handlers::list_memes))
        .route("/memes/{id}/like", post(handlers::like_meme))
        .route("/memes/{id}/menu", post(handlers::toggle_menu))
        .route("/memes/{id}/report", post(handlers::report_meme))
        .route("/memes/{id}/remix", post(handlers::remix_meme))
        .route("/creators/{handle}/block", post(handlers::block_creator))
        .route("/leaderboard", get(handlers::get_leaderboard))
        .route("/profile", get(handlers::get_profile))
        .route("/templates", get(handlers::list_templates))
        .route("/humor-styles", get(handlers::list_humor_styles))
        .route("/prompt-suggestions", get(handlers::list_prompt_suggestions))
        .route("/settings", get(handlers::get_settings).patch(handlers::update_settings))
        .route("/settings/pro", post(handlers::toggle_pro))
        .route("/settings/onboard", post(handlers::complete_onboarding))
        .route("/studio", get(handlers::get_studio))
        .route("/studio/view", post(handlers::set_view))
        .route("/editor", patch(handlers::update_editor))
        .route("/editor/upload", post(handlers::upload_image))
        .route("/editor/image", post(handlers::load_image))
        .route("/editor/generate-image", post(handlers::generate_image))
        .route("/editor/captions", post(handlers::regenerate_captions))
        .route("/editor/remix-suggestion", post(handlers::suggest_remix))
        .route("/editor/template/{id}", post(handlers::select_template))
        .route("/editor/publish", post(handlers::publish))
        .route("/editor/cancel", post(handlers::cancel_editing))
        .route("/editor/export", post(handlers::export))
        .route("/data", delete(handlers::wipe_data))
        // Middleware Layers
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}
