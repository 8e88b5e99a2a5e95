//! [`GenerativeBackend`] over the Gemini `generateContent` REST API.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::config::AiConfig;
use crate::domain::{ContentPart, GenerativeBackend, InlineImage};
use crate::errors::AiError;

const API_KEY_HEADER: &str = "x-goog-api-key";
const DEFAULT_FETCHED_MIME: &str = "image/jpeg";
/// Error bodies are cut to this many characters before logging.
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    caption_model: String,
    image_model: String,
}

impl GeminiClient {
    pub fn new(config: &AiConfig) -> Result<Self, AiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        if config.api_key.is_none() {
            tracing::warn!("No Gemini API key configured; AI features will fall back to defaults");
        }
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            caption_model: config.caption_model.clone(),
            image_model: config.image_model.clone(),
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, model)
    }

    async fn generate(&self, model: &str, body: Value) -> Result<GenerateContentResponse, AiError> {
        let api_key = self.api_key.as_deref().ok_or(AiError::MissingApiKey)?;
        tracing::debug!(%model, "Calling generateContent");
        let resp = self
            .http
            .post(self.endpoint(model))
            .header(API_KEY_HEADER, api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AiError::Status {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY).collect(),
            });
        }
        resp.json::<GenerateContentResponse>()
            .await
            .map_err(|e| AiError::MalformedResponse(e.to_string()))
    }
}

#[async_trait]
impl GenerativeBackend for GeminiClient {
    async fn generate_json(&self, parts: Vec<ContentPart>, schema: Value) -> Result<String, AiError> {
        let resp = self.generate(&self.caption_model, json_request_body(&parts, schema)).await?;
        Ok(resp.first_text())
    }

    async fn generate_image(&self, prompt: &str, aspect_ratio: &str) -> Result<Option<InlineImage>, AiError> {
        let resp = self.generate(&self.image_model, image_request_body(prompt, aspect_ratio)).await?;
        Ok(resp.first_image())
    }

    async fn fetch_image(&self, url: &str) -> Result<InlineImage, AiError> {
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AiError::ImageData(format!("failed to fetch {url}: {e}")))?;
        let mime_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_FETCHED_MIME.to_string());
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| AiError::ImageData(format!("failed to read {url}: {e}")))?;
        Ok(InlineImage {
            mime_type,
            data: BASE64.encode(&bytes),
        })
    }
}

fn wire_part(part: &ContentPart) -> Value {
    match part {
        ContentPart::Image(image) => json!({
            "inlineData": { "mimeType": image.mime_type, "data": image.data }
        }),
        ContentPart::Text(text) => json!({ "text": text }),
    }
}

pub(crate) fn json_request_body(parts: &[ContentPart], schema: Value) -> Value {
    json!({
        "contents": [{ "parts": parts.iter().map(wire_part).collect::<Vec<_>>() }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": schema
        }
    })
}

pub(crate) fn image_request_body(prompt: &str, aspect_ratio: &str) -> Value {
    json!({
        "contents": [{ "parts": [{ "text": prompt }] }],
        "generationConfig": {
            "imageConfig": { "aspectRatio": aspect_ratio }
        }
    })
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Debug, Default)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Deserialize, Debug, Default)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<WirePart>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct WirePart {
    text: Option<String>,
    inline_data: Option<WireInlineData>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct WireInlineData {
    #[serde(default)]
    mime_type: Option<String>,
    data: String,
}

impl GenerateContentResponse {
    fn first_parts(&self) -> &[WirePart] {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.as_slice())
            .unwrap_or_default()
    }

    pub(crate) fn first_text(&self) -> String {
        self.first_parts().iter().filter_map(|p| p.text.as_deref()).collect()
    }

    pub(crate) fn first_image(&self) -> Option<InlineImage> {
        self.first_parts().iter().find_map(|p| {
            p.inline_data.as_ref().map(|d| InlineImage {
                mime_type: d.mime_type.clone().unwrap_or_else(|| "image/png".to_string()),
                data: d.data.clone(),
            })
        })
    }
}
