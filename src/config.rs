use std::{env, net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid environment variable format for {0}: {1}")]
    InvalidVar(String, String),
}

/// Where settings and content are persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    File { dir: PathBuf },
    DynamoDb { table_name: String },
    Memory,
}

/// Where exported images are written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExportTarget {
    S3 { bucket_name: String },
    Directory(PathBuf),
}

#[derive(Clone, Debug)]
pub struct AiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub caption_model: String,
    pub image_model: String,
    pub timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            caption_model: "gemini-3-flash-preview".to_string(),
            image_model: "gemini-2.5-flash-image".to_string(),
            timeout_secs: 60,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub store: StoreBackend,
    pub export: ExportTarget,
    // Store region as string, aws_clients converts
    pub aws_region: String,
    // Optional endpoint for LocalStack
    pub localstack_endpoint: Option<String>,
    pub ai: AiConfig,
    pub celebration: Duration,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (ignores errors, relies on env vars otherwise)
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_address_str = var("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:3000".to_string());
        let bind_address = SocketAddr::from_str(&bind_address_str)
            .map_err(|e| ConfigError::InvalidVar("BIND_ADDRESS".into(), e.to_string()))?;

        let store = match var("STORE_BACKEND").as_deref().unwrap_or("file") {
            "file" => StoreBackend::File {
                dir: PathBuf::from(var("STORE_DIR").unwrap_or_else(|| "./.memeai".to_string())),
            },
            "dynamodb" => StoreBackend::DynamoDb {
                table_name: var("STATE_TABLE_NAME").unwrap_or_else(|| "memeai_state".to_string()),
            },
            "memory" => StoreBackend::Memory,
            other => {
                return Err(ConfigError::InvalidVar(
                    "STORE_BACKEND".into(),
                    format!("expected file, dynamodb or memory, got '{}'", other),
                ));
            }
        };

        let export = match var("EXPORT_BUCKET_NAME").filter(|b| !b.is_empty()) {
            Some(bucket_name) => ExportTarget::S3 { bucket_name },
            None => ExportTarget::Directory(PathBuf::from(
                var("EXPORT_DIR").unwrap_or_else(|| "./exports".to_string()),
            )),
        };

        let aws_region = var("AWS_DEFAULT_REGION").unwrap_or_else(|| "ca-central-1".to_string());

        // Allow overriding endpoint for localstack/testing
        let localstack_endpoint = var("AWS_ENDPOINT_URL");

        let defaults = AiConfig::default();
        let ai = AiConfig {
            api_key: var("GEMINI_API_KEY").or_else(|| var("API_KEY")).filter(|k| !k.is_empty()),
            base_url: var("GEMINI_BASE_URL").unwrap_or(defaults.base_url),
            caption_model: var("CAPTION_MODEL").unwrap_or(defaults.caption_model),
            image_model: var("IMAGE_MODEL").unwrap_or(defaults.image_model),
            timeout_secs: parse_or(&var, "AI_TIMEOUT_SECS", defaults.timeout_secs)?,
        };

        let celebration = Duration::from_millis(parse_or(&var, "CELEBRATION_MS", 1500)?);

        Ok(Config {
            bind_address,
            store,
            export,
            aws_region,
            localstack_endpoint,
            ai,
            celebration,
        })
    }

    /// True when any configured backend talks to AWS.
    pub fn needs_aws(&self) -> bool {
        matches!(self.store, StoreBackend::DynamoDb { .. }) || matches!(self.export, ExportTarget::S3 { .. })
    }
}

fn parse_or<T: FromStr>(var: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match var(key) {
        Some(raw) => raw
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidVar(key.into(), e.to_string())),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_use_file_store_and_local_exports() {
        let config = load(&[]).unwrap();
        assert_eq!(config.bind_address.to_string(), "0.0.0.0:3000");
        assert_eq!(config.store, StoreBackend::File { dir: PathBuf::from("./.memeai") });
        assert_eq!(config.export, ExportTarget::Directory(PathBuf::from("./exports")));
        assert_eq!(config.celebration, Duration::from_millis(1500));
        assert!(config.ai.api_key.is_none());
        assert!(!config.needs_aws());
    }

    #[test]
    fn dynamodb_and_s3_need_aws() {
        let config = load(&[
            ("STORE_BACKEND", "dynamodb"),
            ("EXPORT_BUCKET_NAME", "exports"),
            ("API_KEY", "k"),
        ])
        .unwrap();
        assert_eq!(config.store, StoreBackend::DynamoDb { table_name: "memeai_state".into() });
        assert!(config.needs_aws());
        assert_eq!(config.ai.api_key.as_deref(), Some("k"));
    }

    #[test]
    fn invalid_values_are_reported() {
        assert!(matches!(load(&[("STORE_BACKEND", "redis")]), Err(ConfigError::InvalidVar(..))));
        assert!(matches!(load(&[("CELEBRATION_MS", "soon")]), Err(ConfigError::InvalidVar(..))));
        assert!(matches!(load(&[("BIND_ADDRESS", "nowhere")]), Err(ConfigError::InvalidVar(..))));
    }
}
