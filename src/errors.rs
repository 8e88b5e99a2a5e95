use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::ai::{Busy, TaskKind};

// --- Domain/Infrastructure Errors ---

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to (de)serialize value for key '{key}': {source}")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("No migration registered from schema version {0}")]
    MissingMigration(u32),

    #[error("Schema version {found} for key '{key}' is newer than supported version {supported}")]
    FutureVersion { key: String, found: u32, supported: u32 },

    #[error("Migration of key '{key}' from version {from} failed: {reason}")]
    MigrationFailed { key: String, from: u32, reason: String },

    #[error("Key-value backend error: {0}")]
    BackendError(#[from] anyhow::Error),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("File upload failed: {0}")]
    UploadFailed(String),

    #[error("Storage backend error: {0}")]
    BackendError(#[from] anyhow::Error),
}

#[derive(Error, Debug)]
pub enum AiError {
    #[error("No API key configured for the generative content service")]
    MissingApiKey,

    #[error("Request to generative content service failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Generative content service responded with {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed response from generative content service: {0}")]
    MalformedResponse(String),

    #[error("Could not process image data: {0}")]
    ImageData(String),
}

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Nothing to render: the editor has no source image")]
    NoSource,

    #[error("Unsupported image source: {0}")]
    UnsupportedSource(String),

    #[error("Could not decode image payload: {0}")]
    Decode(#[from] base64::DecodeError),
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Rendering failed")]
    Render(#[source] RenderError),
    #[error("Saving the rendered image failed")]
    Storage(#[source] StorageError),
}

// --- Web Layer Error ---

#[derive(Error, Debug)]
pub enum AppError {
    // Input validation / request parsing errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Missing form field: {0}")]
    MissingFormField(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Error processing multipart form data: {0}")]
    MultipartError(#[from] axum::extract::multipart::MultipartError),

    // Studio level errors
    #[error("An AI {0} task is already running")]
    AiBusy(TaskKind),
    #[error("Error rendering image.")]
    ExportFailed(#[source] ExportError),

    // Configuration / Startup errors
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Initialization error: {0}")]
    InitError(String),
}

impl From<Busy> for AppError {
    fn from(Busy(kind): Busy) -> Self {
        AppError::AiBusy(kind)
    }
}

impl From<ExportError> for AppError {
    fn from(err: ExportError) -> Self {
        AppError::ExportFailed(err)
    }
}

impl From<crate::config::ConfigError> for AppError {
    fn from(err: crate::config::ConfigError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

impl From<aws_smithy_types::error::operation::BuildError> for AppError {
    fn from(err: aws_smithy_types::error::operation::BuildError) -> Self {
        AppError::InitError(format!("Failed to build AWS request: {}", err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InitError(err.to_string())
    }
}

// --- Axum Response Implementation ---

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            // 4xx Client Errors
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::MissingFormField(field) => (StatusCode::BAD_REQUEST, format!("Missing form field: {}", field)),
            AppError::MultipartError(e) => (StatusCode::BAD_REQUEST, format!("Invalid multipart form data: {}", e)),
            AppError::NotFound(what) => (StatusCode::NOT_FOUND, format!("Not found: {}", what)),
            AppError::AiBusy(kind) => (StatusCode::CONFLICT, format!("An AI {} task is already running", kind)),

            // 5xx Server Errors
            AppError::ExportFailed(e) => {
                tracing::error!(error.source = ?e, "Export failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Error rendering image.".to_string())
            }
            AppError::ConfigError(msg) => {
                tracing::error!("Configuration error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Server configuration error".to_string())
            }
            AppError::InitError(msg) => {
                tracing::error!("Initialization error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Server initialization error".to_string())
            }
        };

        tracing::warn!(error.message = %error_message, error.detail = %self, "Responding with error");

        let body = Json(serde_json::json!({ "error": error_message }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_of(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn busy_maps_to_conflict() {
        let response = AppError::from(Busy(TaskKind::Caption)).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(body_of(response).await["error"], "An AI caption task is already running");
    }

    #[tokio::test]
    async fn export_failures_hide_details() {
        let response = AppError::from(ExportError::Render(RenderError::NoSource)).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_of(response).await["error"], "Error rendering image.");
    }

    #[tokio::test]
    async fn startup_errors_are_generic() {
        let response = AppError::InitError("table missing".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_of(response).await["error"], "Server initialization error");
    }
}
