//! AI orchestration: caption generation, base-image generation and remix
//! suggestions on top of a [`GenerativeBackend`].
//!
//! Service failures never leave this module. Captions fall back to a fixed
//! pair and images to `None`. The only outward failure is [`Busy`], returned
//! when a task of the same kind is already in flight.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use serde_json::json;

use crate::domain::{ContentPart, GenerativeBackend, InlineImage};
use crate::errors::AiError;
use crate::models::{CaptionPair, HumorStyle};

pub const CAPTION_FALLBACK: (&str, &str) = ("AI is silent", "Type something!");
pub const REMIX_FALLBACK: (&str, &str) = ("Remix Failed", "Try again!");
pub const BASE_IMAGE_PREFIX: &str = "A cinematic meme base image: ";
pub const BASE_IMAGE_ASPECT_RATIO: &str = "1:1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    Caption,
    Image,
    Remix,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskKind::Caption => "caption",
            TaskKind::Image => "image",
            TaskKind::Remix => "remix",
        };
        f.write_str(name)
    }
}

/// Rejection returned while a task of the same kind is outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Busy(pub TaskKind);

struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

fn acquire(flag: &AtomicBool, kind: TaskKind) -> Result<InFlight<'_>, Busy> {
    flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        .map(|_| InFlight(flag))
        .map_err(|_| Busy(kind))
}

pub struct AiOrchestrator {
    backend: Arc<dyn GenerativeBackend>,
    caption_busy: AtomicBool,
    image_busy: AtomicBool,
    remix_busy: AtomicBool,
    tasks_started: AtomicU64,
}

impl AiOrchestrator {
    pub fn new(backend: Arc<dyn GenerativeBackend>) -> Self {
        Self {
            backend,
            caption_busy: AtomicBool::new(false),
            image_busy: AtomicBool::new(false),
            remix_busy: AtomicBool::new(false),
            tasks_started: AtomicU64::new(0),
        }
    }

    pub fn is_busy(&self, kind: TaskKind) -> bool {
        self.flag(kind).load(Ordering::Acquire)
    }

    pub fn any_busy(&self) -> bool {
        [TaskKind::Caption, TaskKind::Image, TaskKind::Remix]
            .into_iter()
            .any(|k| self.is_busy(k))
    }

    /// Number of tasks that got past the busy guard. Drives interstitial ad
    /// rotation.
    pub fn tasks_started(&self) -> u64 {
        self.tasks_started.load(Ordering::Relaxed)
    }

    fn flag(&self, kind: TaskKind) -> &AtomicBool {
        match kind {
            TaskKind::Caption => &self.caption_busy,
            TaskKind::Image => &self.image_busy,
            TaskKind::Remix => &self.remix_busy,
        }
    }

    fn begin(&self, kind: TaskKind) -> Result<InFlight<'_>, Busy> {
        let guard = acquire(self.flag(kind), kind)?;
        self.tasks_started.fetch_add(1, Ordering::Relaxed);
        Ok(guard)
    }

    pub async fn generate_caption(
        &self,
        image: &str,
        style: HumorStyle,
        context: Option<&str>,
    ) -> Result<CaptionPair, Busy> {
        let _guard = self.begin(TaskKind::Caption)?;
        match self.try_caption(image, style, context).await {
            Ok(pair) => Ok(pair),
            Err(e) => {
                tracing::error!(error = %e, "Caption generation failed, using fallback");
                Ok(CaptionPair::new(CAPTION_FALLBACK.0, CAPTION_FALLBACK.1))
            }
        }
    }

    async fn try_caption(&self, image: &str, style: HumorStyle, context: Option<&str>) -> Result<CaptionPair, AiError> {
        let inline = match parse_data_uri(image) {
            Some(inline) => inline,
            None => self.backend.fetch_image(image).await?,
        };
        let parts = vec![ContentPart::Image(inline), ContentPart::Text(caption_prompt(style, context))];
        let text = self.backend.generate_json(parts, caption_schema()).await?;
        parse_caption(&text)
    }

    /// Returns a `data:` URI for the generated image, or `None` when nothing
    /// was produced.
    pub async fn generate_base_image(&self, prompt: &str) -> Result<Option<String>, Busy> {
        let _guard = self.begin(TaskKind::Image)?;
        let full_prompt = format!("{BASE_IMAGE_PREFIX}{prompt}");
        match self.backend.generate_image(&full_prompt, BASE_IMAGE_ASPECT_RATIO).await {
            Ok(Some(image)) => Ok(Some(image.to_data_uri())),
            Ok(None) => {
                tracing::warn!("Image generation returned no image payload");
                Ok(None)
            }
            Err(e) => {
                tracing::error!(error = %e, "Image generation failed");
                Ok(None)
            }
        }
    }

    pub async fn suggest_remix(&self, original_text: &str, style: HumorStyle) -> Result<CaptionPair, Busy> {
        let _guard = self.begin(TaskKind::Remix)?;
        let prompt = format!(
            "Suggest a funny meme remix for this idea: \"{}\". Humor Style: {}. Return JSON with topText and bottomText.",
            original_text,
            style.name()
        );
        let result = match self.backend.generate_json(vec![ContentPart::Text(prompt)], caption_schema()).await {
            Ok(text) => parse_caption(&text),
            Err(e) => Err(e),
        };
        Ok(result.unwrap_or_else(|e| {
            tracing::error!(error = %e, "Remix suggestion failed, using fallback");
            CaptionPair::new(REMIX_FALLBACK.0, REMIX_FALLBACK.1)
        }))
    }
}

pub fn caption_prompt(style: HumorStyle, context: Option<&str>) -> String {
    let mut prompt = format!(
        "Analyze this image and generate a viral-style meme caption.\n\
         Humor Style: {}.\n\
         Description: {}.\n",
        style.name(),
        style.description()
    );
    if let Some(ctx) = context.map(str::trim).filter(|c| !c.is_empty()) {
        prompt.push_str(&format!("User idea/context: {ctx}\n"));
    }
    prompt.push_str("Generate \"topText\" and \"bottomText\".\nBe concise and funny.\nReturn ONLY valid JSON.");
    prompt
}

pub fn caption_schema() -> serde_json::Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "topText": { "type": "STRING" },
            "bottomText": { "type": "STRING" }
        },
        "required": ["topText", "bottomText"]
    })
}

/// An empty reply is treated as an empty caption pair.
fn parse_caption(text: &str) -> Result<CaptionPair, AiError> {
    if text.trim().is_empty() {
        return Ok(CaptionPair::new("", ""));
    }
    serde_json::from_str(text).map_err(|e| AiError::MalformedResponse(e.to_string()))
}

/// Splits `data:<mime>;base64,<payload>` into its parts.
pub fn parse_data_uri(input: &str) -> Option<InlineImage> {
    let rest = input.strip_prefix("data:")?;
    let (header, data) = rest.split_once(',')?;
    let mime_type = header.split(';').next().filter(|m| !m.is_empty())?;
    Some(InlineImage {
        mime_type: mime_type.to_string(),
        data: data.to_string(),
    })
}
