use crate::editor::EditorSession;
use crate::errors::{AiError, RenderError, StorageError, StoreError};
use async_trait::async_trait;

/// Trait for the persistent key-value store backing settings and content.
#[async_trait]
pub trait KeyValueStore: Send + Sync + 'static { // Send+Sync+'static required for Arc<dyn>
    /// Returns Ok(None) if the key has never been written.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn put(&self, key: &str, value: String) -> Result<(), StoreError>;

    /// Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// Trait for writing exported images somewhere the user can download them.
#[async_trait]
pub trait FileStorage: Send + Sync + 'static {
    /// Uploads file data and returns a location string for it.
    async fn upload(&self, key: &str, data: Vec<u8>, content_type: Option<String>) -> Result<String, StorageError>;
}

/// Base64 image payload with its MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: String,
    pub data: String,
}

impl InlineImage {
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPart {
    Image(InlineImage),
    Text(String),
}

/// The hosted generative content service, reduced to what the studio needs.
#[async_trait]
pub trait GenerativeBackend: Send + Sync + 'static {
    /// Sends `parts` and asks for a JSON reply matching `schema`.
    /// Returns the raw text of the first candidate (empty if there was none).
    async fn generate_json(&self, parts: Vec<ContentPart>, schema: serde_json::Value) -> Result<String, AiError>;

    /// Asks for an image; Ok(None) when the reply carries no image part.
    async fn generate_image(&self, prompt: &str, aspect_ratio: &str) -> Result<Option<InlineImage>, AiError>;

    /// Downloads a remote image so it can be sent inline.
    async fn fetch_image(&self, url: &str) -> Result<InlineImage, AiError>;
}

/// Encoded image bytes and the MIME type they are encoded as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedImage {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Produces a raster image for the composition currently in the editor.
#[async_trait]
pub trait MemeRenderer: Send + Sync + 'static {
    async fn render(&self, session: &EditorSession, scale: u32) -> Result<RenderedImage, RenderError>;
}

/// Receives post reports. There is no moderation backend behind it.
pub trait ModerationSink: Send + Sync + 'static {
    fn report(&self, meme_id: &str);
}

/// Acknowledges reports and drops them.
#[derive(Debug, Default, Clone)]
pub struct AcknowledgeOnly;

impl ModerationSink for AcknowledgeOnly {
    fn report(&self, meme_id: &str) {
        tracing::info!(%meme_id, "Post reported; acknowledged locally");
    }
}
