//! Runtime configuration.
//!
//! Everything is read once at startup from the process environment (and an
//! optional `.env` file). Missing credentials are a `Config` error here, never
//! a per-turn failure.

use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;
use validator::Validate;

use crate::error::AppError;

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_GOOGLE_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Wire dialect spoken by a model backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    /// OpenAI-compatible `/chat/completions`.
    OpenAi,
    /// Google `models/{model}:generateContent`.
    Gemini,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::OpenAi => write!(f, "openai"),
            Provider::Gemini => write!(f, "gemini"),
        }
    }
}

/// Configuration for one external model role.
#[derive(Clone, Serialize, Deserialize, Validate)]
pub struct ModelConfig {
    /// The identifier for the model (e.g. `gpt-4o`).
    #[validate(length(min = 1))]
    pub model_id: String,
    pub provider: Provider,
    #[validate(url)]
    pub base_url: String,
    #[serde(skip_serializing, default)]
    #[validate(length(min = 1))]
    pub api_key: String,
    /// Sampling temperature. Value between 0.0 and 2.0.
    #[validate(range(min = 0.0, max = 2.0))]
    pub temperature: f32,
    #[validate(range(min = 1, max = 16384))]
    pub max_output_tokens: u32,
}

impl fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelConfig")
            .field("model_id", &self.model_id)
            .field("provider", &self.provider)
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .finish()
    }
}

impl ModelConfig {
    /// Resolves `path` against the base URL, keeping any path prefix such as `/v1`.
    pub fn endpoint(&self, path: &str) -> Result<Url, AppError> {
        let mut base = Url::parse(&self.base_url)?;
        if !base.path().ends_with('/') {
            let with_slash = format!("{}/", base.path());
            base.set_path(&with_slash);
        }
        Ok(base.join(path.trim_start_matches('/'))?)
    }
}

/// Heuristic confidence constants. Kept configurable rather than derived.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PipelineTuning {
    /// Rule-based confidence when at least one indicator matched.
    #[validate(range(min = 0.0, max = 1.0))]
    pub rule_indicator_confidence: f32,
    /// Rule-based confidence when nothing matched.
    #[validate(range(min = 0.0, max = 1.0))]
    pub rule_baseline_confidence: f32,
    /// Fixed confidence stamped on a successful model analysis.
    #[validate(range(min = 0.0, max = 1.0))]
    pub analyzer_confidence: f32,
    /// Confidence of a reply produced by the primary model.
    #[validate(range(min = 0.0, max = 1.0))]
    pub response_confidence: f32,
    /// Confidence of a canned fallback reply.
    #[validate(range(min = 0.0, max = 1.0))]
    pub fallback_confidence: f32,
}

impl Default for PipelineTuning {
    fn default() -> Self {
        Self {
            rule_indicator_confidence: 0.6,
            rule_baseline_confidence: 0.3,
            analyzer_confidence: 0.8,
            response_confidence: 0.85,
            fallback_confidence: 0.5,
        }
    }
}

/// What to do with a primary reply when the safety review call itself fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewFailurePolicy {
    /// Discard the unreviewed reply and answer from the fallback catalog.
    #[default]
    Fallback,
    /// Deliver the unreviewed primary reply and log the failure.
    KeepPrimary,
}

impl FromStr for ReviewFailurePolicy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fallback" => Ok(ReviewFailurePolicy::Fallback),
            "keep_primary" => Ok(ReviewFailurePolicy::KeepPrimary),
            other => Err(AppError::Config(format!(
                "Unknown review failure policy '{}', expected 'fallback' or 'keep_primary'",
                other
            ))),
        }
    }
}

/// Complete pipeline configuration.
#[derive(Debug, Clone, Validate)]
pub struct Settings {
    #[validate(nested)]
    pub analyzer: ModelConfig,
    #[validate(nested)]
    pub primary: ModelConfig,
    #[validate(nested)]
    pub reviewer: ModelConfig,
    #[validate(nested)]
    pub tuning: PipelineTuning,
    /// Upper bound for any single external model call.
    #[validate(range(min = 1, max = 600))]
    pub model_timeout_secs: u64,
    pub review_failure_policy: ReviewFailurePolicy,
}

impl Settings {
    /// Loads `.env` (if present) and reads the settings from the environment.
    pub fn from_env() -> Result<Self, AppError> {
        if let Err(e) = dotenv::dotenv() {
            info!("No .env file loaded: {}", e);
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds settings from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let openai_key = get("OPENAI_API_KEY")
            .ok_or_else(|| AppError::Config("Missing OPENAI_API_KEY".to_string()))?;
        let openai_base =
            get("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string());

        let analyzer = ModelConfig {
            model_id: get("OPENAI_API_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string()),
            provider: Provider::OpenAi,
            base_url: openai_base.clone(),
            api_key: openai_key.clone(),
            temperature: 0.0,
            max_output_tokens: 300,
        };

        let primary = ModelConfig {
            model_id: get("PRIMARY_MODEL").unwrap_or_else(|| "gpt-4o".to_string()),
            provider: Provider::OpenAi,
            base_url: openai_base.clone(),
            api_key: openai_key.clone(),
            temperature: parse_var(&get, "PRIMARY_TEMPERATURE", 0.7)?,
            max_output_tokens: parse_var(&get, "PRIMARY_MAX_TOKENS", 800)?,
        };

        let reviewer = match get("GOOGLE_API_KEY") {
            Some(google_key) => ModelConfig {
                model_id: get("GOOGLE_AI_MODEL")
                    .unwrap_or_else(|| "gemini-2.5-flash-lite".to_string()),
                provider: Provider::Gemini,
                base_url: get("GOOGLE_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_GOOGLE_BASE_URL.to_string()),
                api_key: google_key,
                temperature: 0.2,
                max_output_tokens: 800,
            },
            None => {
                warn!("GOOGLE_API_KEY not set; safety review runs on the OpenAI backend");
                ModelConfig {
                    model_id: get("REVIEW_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string()),
                    provider: Provider::OpenAi,
                    base_url: openai_base,
                    api_key: openai_key,
                    temperature: 0.2,
                    max_output_tokens: 800,
                }
            }
        };

        let tuning = PipelineTuning {
            rule_indicator_confidence: parse_var(&get, "RULE_INDICATOR_CONFIDENCE", 0.6)?,
            rule_baseline_confidence: parse_var(&get, "RULE_BASELINE_CONFIDENCE", 0.3)?,
            analyzer_confidence: parse_var(&get, "ANALYZER_CONFIDENCE", 0.8)?,
            response_confidence: parse_var(&get, "RESPONSE_CONFIDENCE", 0.85)?,
            fallback_confidence: parse_var(&get, "FALLBACK_CONFIDENCE", 0.5)?,
        };

        let review_failure_policy = match get("REVIEW_FAILURE_POLICY") {
            Some(raw) => raw.parse()?,
            None => ReviewFailurePolicy::default(),
        };

        let settings = Self {
            analyzer,
            primary,
            reviewer,
            tuning,
            model_timeout_secs: parse_var(&get, "MODEL_TIMEOUT_SECS", 20)?,
            review_failure_policy,
        };

        settings
            .validate()
            .map_err(|e| AppError::Config(format!("Invalid settings: {}", e)))?;

        Ok(settings)
    }

    pub fn model_timeout(&self) -> Duration {
        Duration::from_secs(self.model_timeout_secs)
    }
}

fn parse_var<G, T>(get: &G, key: &str, default: T) -> Result<T, AppError>
where
    G: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: fmt::Display,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("Invalid value for {}: {}", key, e))),
        None => Ok(default),
    }
}
