use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::ai::parse_data_uri;
use crate::domain::{MemeRenderer, RenderedImage};
use crate::editor::EditorSession;
use crate::errors::RenderError;

pub const EXPORT_SCALE: u32 = 2;

/// Exports the editor's source image as-is. Caption compositing belongs to
/// the presentation layer, which can plug in its own [`MemeRenderer`].
#[derive(Debug, Default, Clone)]
pub struct SourceImageRenderer;

#[async_trait]
impl MemeRenderer for SourceImageRenderer {
    async fn render(&self, session: &EditorSession, scale: u32) -> Result<RenderedImage, RenderError> {
        let source = session.source_image.as_deref().ok_or(RenderError::NoSource)?;
        let image = parse_data_uri(source).ok_or_else(|| RenderError::UnsupportedSource(truncate(source)))?;
        tracing::debug!(mime_type = %image.mime_type, scale, "Exporting source image");
        let bytes = BASE64.decode(image.data.as_bytes())?;
        Ok(RenderedImage {
            mime_type: image.mime_type,
            bytes,
        })
    }
}

/// File extension for an export of the given MIME type.
pub fn extension_for(mime_type: &str) -> &'static str {
    match mime_type {
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "image/gif" => "gif",
        "image/webp" => "webp",
        other => mime_guess::get_mime_extensions_str(other)
            .and_then(|exts| exts.first().copied())
            .unwrap_or("bin"),
    }
}

fn truncate(source: &str) -> String {
    source.chars().take(64).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn decodes_data_uri_payload() {
        let session = EditorSession {
            source_image: Some("data:image/png;base64,AQID".to_string()),
            ..EditorSession::default()
        };
        let image = SourceImageRenderer.render(&session, EXPORT_SCALE).await.unwrap();
        assert_eq!(image.bytes, vec![1, 2, 3]);
        assert_eq!(image.mime_type, "image/png");
    }

    #[tokio::test]
    async fn keeps_the_source_format() {
        let session = EditorSession {
            source_image: Some("data:image/jpeg;base64,/9j/".to_string()),
            ..EditorSession::default()
        };
        let image = SourceImageRenderer.render(&session, EXPORT_SCALE).await.unwrap();
        assert_eq!(image.mime_type, "image/jpeg");
        assert_eq!(extension_for(&image.mime_type), "jpg");
    }

    #[test]
    fn extensions_follow_mime_type() {
        assert_eq!(extension_for("image/png"), "png");
        assert_eq!(extension_for("image/webp"), "webp");
        assert_eq!(extension_for("application/x-unknown-thing"), "bin");
    }

    #[tokio::test]
    async fn remote_sources_are_unsupported() {
        let session = EditorSession {
            source_image: Some("https://picsum.photos/1".to_string()),
            ..EditorSession::default()
        };
        let err = SourceImageRenderer.render(&session, EXPORT_SCALE).await.unwrap_err();
        assert!(matches!(err, RenderError::UnsupportedSource(_)));
    }

    #[tokio::test]
    async fn bad_base64_is_a_decode_error() {
        let session = EditorSession {
            source_image: Some("data:image/png;base64,@@@".to_string()),
            ..EditorSession::default()
        };
        let err = SourceImageRenderer.render(&session, EXPORT_SCALE).await.unwrap_err();
        assert!(matches!(err, RenderError::Decode(_)));
    }
}
