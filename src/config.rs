//! Pipeline configuration.
//!
//! Secrets come from the CLI/environment (see [`crate::cli::Cli`]); every
//! tunable lives here and can be overridden from an optional YAML file.
//! Missing keys fall back to the defaults below, so an empty file is valid.
//!
//! ```yaml
//! search:
//!   topic: "wildfire OR flood"
//!   max_pages: 3
//!   stop_policy: exhaustive
//! summary:
//!   max_chars: 400
//! retry:
//!   max_attempts: 4
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{info, instrument};

pub const DEFAULT_TOPIC: &str = "natural disaster OR climate change";
pub const GNEWS_SEARCH_URL: &str = "https://gnews.io/api/v4/search";
pub const GEMINI_GENERATE_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent";
pub const DEFAULT_INFERENCE_URL: &str = "http://localhost:8080/invoke";

/// Top-level configuration, built once at startup and passed by reference.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub search: SearchConfig,
    pub summary: SummaryConfig,
    pub inference: InferenceConfig,
    pub retry: RetryConfig,
}

/// When the ingestion loop stops paging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopPolicy {
    /// Stop after the first page that stored at least one new article.
    #[default]
    FirstNewPage,
    /// Keep paging until the source is exhausted or `max_pages` is reached.
    Exhaustive,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SearchConfig {
    pub endpoint: String,
    pub topic: String,
    pub language: String,
    pub country: String,
    pub page_size: u32,
    pub max_pages: u32,
    pub stop_policy: StopPolicy,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: GNEWS_SEARCH_URL.to_string(),
            topic: DEFAULT_TOPIC.to_string(),
            language: "en".to_string(),
            country: "world".to_string(),
            page_size: 10,
            max_pages: 5,
            stop_policy: StopPolicy::FirstNewPage,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SummaryConfig {
    pub endpoint: String,
    pub max_chars: usize,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            endpoint: GEMINI_GENERATE_URL.to_string(),
            max_chars: 500,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct InferenceConfig {
    pub endpoint: String,
    pub max_gen_len: u32,
    pub temperature: f32,
    pub top_p: f32,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_INFERENCE_URL.to_string(),
            max_gen_len: 512,
            temperature: 0.7,
            top_p: 0.9,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: usize,
    pub base_delay_ms: u64,
    pub max_jitter_ms: u64,
    pub max_delay_ms: u64,
    pub timeout_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1_000,
            max_jitter_ms: 1_000,
            max_delay_ms: 30_000,
            timeout_secs: 15,
        }
    }
}

/// API keys, resolved from CLI flags or environment variables.
#[derive(Clone, Default)]
pub struct Credentials {
    pub gnews_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub inference_api_key: Option<String>,
}

impl Credentials {
    /// The GNews key, unless it is missing, blank, or still the placeholder.
    pub fn gnews_key(&self) -> Option<&str> {
        self.gnews_api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty() && *k != "YOUR_GNEWS_API_KEY")
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |k: &Option<String>| if k.is_some() { "<set>" } else { "<unset>" };
        f.debug_struct("Credentials")
            .field("gnews_api_key", &redact(&self.gnews_api_key))
            .field("gemini_api_key", &redact(&self.gemini_api_key))
            .field("inference_api_key", &redact(&self.inference_api_key))
            .finish()
    }
}

/// Load the configuration from `path`, or return the defaults when no path
/// is given.
#[instrument(level = "info")]
pub async fn load_config(path: Option<&str>) -> Result<PipelineConfig, ConfigError> {
    let Some(path) = path else {
        info!("No config file given; using defaults");
        return Ok(PipelineConfig::default());
    };

    let raw = fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
    let config = parse_config(&raw).map_err(|source| ConfigError::Yaml {
        path: path.to_string(),
        source,
    })?;
    info!(path, "Loaded pipeline configuration");
    Ok(config)
}

fn parse_config(raw: &str) -> Result<PipelineConfig, serde_yaml::Error> {
    if raw.trim().is_empty() {
        return Ok(PipelineConfig::default());
    }
    serde_yaml::from_str(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.search.max_pages, 5);
        assert_eq!(config.search.page_size, 10);
        assert_eq!(config.search.stop_policy, StopPolicy::FirstNewPage);
        assert_eq!(config.summary.max_chars, 500);
        assert_eq!(config.inference.max_gen_len, 512);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.timeout_secs, 15);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
search:
  topic: "wildfire"
  stop_policy: exhaustive
summary:
  max_chars: 280
"#;
        let config = parse_config(yaml).unwrap();
        assert_eq!(config.search.topic, "wildfire");
        assert_eq!(config.search.stop_policy, StopPolicy::Exhaustive);
        assert_eq!(config.search.language, "en");
        assert_eq!(config.summary.max_chars, 280);
        assert_eq!(config.retry.max_attempts, 3);
    }

    #[test]
    fn test_empty_yaml_is_default() {
        let config = parse_config("   \n").unwrap();
        assert_eq!(config.search.topic, DEFAULT_TOPIC);
    }

    #[test]
    fn test_gnews_key_placeholder_is_missing() {
        let creds = Credentials {
            gnews_api_key: Some("YOUR_GNEWS_API_KEY".to_string()),
            ..Default::default()
        };
        assert_eq!(creds.gnews_key(), None);

        let creds = Credentials {
            gnews_api_key: Some("  ".to_string()),
            ..Default::default()
        };
        assert_eq!(creds.gnews_key(), None);

        let creds = Credentials {
            gnews_api_key: Some("abc123".to_string()),
            ..Default::default()
        };
        assert_eq!(creds.gnews_key(), Some("abc123"));
    }

    #[test]
    fn test_credentials_debug_redacts() {
        let creds = Credentials {
            gemini_api_key: Some("secret".to_string()),
            ..Default::default()
        };
        let out = format!("{creds:?}");
        assert!(!out.contains("secret"));
        assert!(out.contains("<set>"));
    }

    #[tokio::test]
    async fn test_load_config_without_path() {
        let config = load_config(None).await.unwrap();
        assert_eq!(config.search.endpoint, GNEWS_SEARCH_URL);
    }

    #[tokio::test]
    async fn test_load_config_missing_file() {
        let err = load_config(Some("/definitely/not/here.yaml"))
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
