use crate::{
    catalog::{trending_templates, PROMPT_SUGGESTIONS},
    domain::InlineImage,
    editor::{EditorPatch, View},
    errors::AppError,
    models::{HumorStyle, Theme},
    AppState,
};
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing;

// --- Feed and derived views ---

pub async fn get_feed(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.studio.feed().await)
}

pub async fn list_memes(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.studio.memes().await)
}

pub async fn get_leaderboard(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.studio.leaderboard().await)
}

pub async fn get_profile(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.studio.profile().await)
}

pub async fn list_templates() -> impl IntoResponse {
    Json(trending_templates())
}

pub async fn list_humor_styles() -> impl IntoResponse {
    let styles: Vec<_> = HumorStyle::ALL
        .iter()
        .map(|style| json!({ "style": style, "description": style.description() }))
        .collect();
    Json(styles)
}

pub async fn list_prompt_suggestions() -> impl IntoResponse {
    Json(PROMPT_SUGGESTIONS)
}

// --- Studio screen state ---

pub async fn get_studio(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.studio.snapshot().await)
}

#[derive(Deserialize, Debug)]
pub struct ViewRequest {
    pub view: View,
}

pub async fn set_view(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ViewRequest>,
) -> impl IntoResponse {
    state.studio.set_view(body.view).await;
    Json(state.studio.snapshot().await)
}

// --- Feed interactions ---

pub async fn like_meme(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let likes = state
        .studio
        .like(&id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("meme {}", id)))?;
    Ok(Json(json!({ "id": id, "likes": likes })))
}

pub async fn toggle_menu(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let active_menu = state.studio.toggle_menu(&id).await;
    Json(json!({ "activeMenu": active_menu }))
}

pub async fn report_meme(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    state.studio.report_post(&id).await;
    (StatusCode::ACCEPTED, Json(json!({ "reported": id })))
}

pub async fn block_creator(
    State(state): State<Arc<AppState>>,
    Path(handle): Path<String>,
) -> impl IntoResponse {
    let blocked = state.studio.block_creator(&handle).await;
    if !blocked {
        tracing::debug!(%handle, "Block request ignored");
    }
    Json(json!({ "blocked": blocked, "settings": state.studio.settings().await }))
}

pub async fn remix_meme(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    if !state.studio.remix(&id).await {
        return Err(AppError::NotFound(format!("meme {} (or the composer is publishing)", id)));
    }
    Ok(Json(state.studio.snapshot().await))
}

// --- Settings ---

pub async fn get_settings(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.studio.settings().await)
}

#[derive(Deserialize, Debug, Default)]
pub struct SettingsPatch {
    pub handle: Option<String>,
    pub theme: Option<Theme>,
}

pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    Json(patch): Json<SettingsPatch>,
) -> Result<impl IntoResponse, AppError> {
    if let Some(handle) = patch.handle.as_deref() {
        if handle.trim().is_empty() {
            return Err(AppError::InvalidInput("handle cannot be blank".to_string()));
        }
        state.studio.set_handle(handle).await;
    }
    if let Some(theme) = patch.theme {
        state.studio.set_theme(theme).await;
    }
    Ok(Json(state.studio.settings().await))
}

pub async fn toggle_pro(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let is_pro = state.studio.toggle_pro().await;
    Json(json!({ "isPro": is_pro }))
}

pub async fn complete_onboarding(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.studio.complete_onboarding().await;
    Json(state.studio.settings().await)
}

pub async fn wipe_data(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.studio.wipe().await;
    StatusCode::NO_CONTENT
}

// --- Editor ---

/// Handler for POST /editor/upload. Reads the `image` field into a data URI.
pub async fn upload_image(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut image_data: Option<Vec<u8>> = None;
    let mut image_filename: Option<String> = None;
    let mut image_content_type: Option<String> = None;

    while let Some(field) = multipart.next_field().await? {
        let field_name = match field.name() {
            Some(name) => name.to_string(),
            None => continue,
        };
        match field_name.as_str() {
            "image" => {
                image_filename = field.file_name().map(|s| s.to_string());
                image_content_type = field.content_type().map(|m| m.to_string());
                image_data = Some(field.bytes().await?.to_vec());
            }
            _ => tracing::debug!("Ignoring unknown multipart field: {}", field_name),
        }
    }

    let image_data = image_data.ok_or_else(|| AppError::MissingFormField("image".to_string()))?;
    if image_data.is_empty() {
        return Err(AppError::InvalidInput("image data cannot be empty".to_string()));
    }

    let mime_type = image_content_type
        .filter(|ct| ct.starts_with("image/"))
        .or_else(|| {
            image_filename
                .as_deref()
                .and_then(|name| mime_guess::from_path(name).first_raw())
                .filter(|ct| ct.starts_with("image/"))
                .map(|s| s.to_string())
        })
        .ok_or_else(|| AppError::InvalidInput("upload is not an image".to_string()))?;

    let image = InlineImage {
        mime_type,
        data: STANDARD.encode(&image_data),
    };
    tracing::debug!(bytes = image_data.len(), mime = %image.mime_type, "Image uploaded to editor");
    load_into_editor(&state, image.to_data_uri()).await
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ImageRequest {
    pub data_uri: String,
}

/// Handler for POST /editor/image, used for camera captures.
pub async fn load_image(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ImageRequest>,
) -> Result<impl IntoResponse, AppError> {
    if !body.data_uri.starts_with("data:image/") {
        return Err(AppError::InvalidInput("dataUri must be an image data URI".to_string()));
    }
    load_into_editor(&state, body.data_uri).await
}

async fn load_into_editor(state: &AppState, image: String) -> Result<axum::response::Response, AppError> {
    if !state.studio.load_image(image).await {
        return Err(AppError::InvalidInput("the composer is busy publishing".to_string()));
    }
    Ok(Json(state.studio.snapshot().await).into_response())
}

#[derive(Deserialize, Debug)]
pub struct PromptRequest {
    pub prompt: String,
}

pub async fn generate_image(
    State(state): State<Arc<AppState>>,
    Json(body): Json<PromptRequest>,
) -> Result<impl IntoResponse, AppError> {
    let generated = state.studio.generate_base_image(&body.prompt).await?;
    Ok(Json(json!({
        "generated": generated,
        "studio": state.studio.snapshot().await,
    })))
}

#[derive(Deserialize, Debug)]
pub struct CaptionRequest {
    pub context: Option<String>,
}

pub async fn regenerate_captions(
    State(state): State<Arc<AppState>>,
    body: Option<Json<CaptionRequest>>,
) -> Result<impl IntoResponse, AppError> {
    let context = body.and_then(|Json(b)| b.context);
    let context = context.as_deref().map(str::trim).filter(|c| !c.is_empty());
    state.studio.regenerate_captions(context).await?;
    Ok(Json(state.studio.snapshot().await))
}

pub async fn suggest_remix(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    state.studio.suggest_remix().await?;
    Ok(Json(state.studio.snapshot().await))
}

pub async fn select_template(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    if !state.studio.select_template(&id).await {
        return Err(AppError::NotFound(format!("template {} (or the composer is publishing)", id)));
    }
    Ok(Json(state.studio.snapshot().await))
}

pub async fn update_editor(
    State(state): State<Arc<AppState>>,
    Json(patch): Json<EditorPatch>,
) -> impl IntoResponse {
    state.studio.update_editor(patch).await;
    Json(state.studio.snapshot().await)
}

pub async fn cancel_editing(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.studio.cancel_editing().await;
    Json(state.studio.snapshot().await)
}

pub async fn publish(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    let meme = state
        .studio
        .publish()
        .await
        .ok_or_else(|| AppError::InvalidInput("nothing to publish".to_string()))?;
    tracing::info!(meme_id = %meme.id, "Meme published via handler");
    Ok((StatusCode::CREATED, Json(meme)))
}

pub async fn export(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    let location = state.studio.export().await?;
    Ok((StatusCode::CREATED, Json(json!({ "location": location }))))
}
