//! Configuration model.
//!
//! `AppConfig` mirrors `config.toml`; every field has a default so a missing
//! or partial file is valid. `SecretConfig` mirrors `secret.json`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_CHAT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_PUBLIC_BASE_URL: &str = "https://imaginenchat.abareai.com";

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub generation: GenerationConfig,
    pub suggestion: SuggestionConfig,
    pub scheduler: SchedulerConfig,
    pub registry: RegistryConfig,
    pub share: ShareConfig,
    pub logging: LoggingConfig,
}

/// Settings for agent replies.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct GenerationConfig {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub request_timeout_secs: u64,
    pub base_url: String,
}

impl GenerationConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_CHAT_MODEL.to_string(),
            max_tokens: 50,
            temperature: 1.0,
            request_timeout_secs: 60,
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
        }
    }
}

/// Settings for character suggestions.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SuggestionConfig {
    pub model: String,
    pub max_tokens: u32,
}

impl Default for SuggestionConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_CHAT_MODEL.to_string(),
            max_tokens: 100,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Cap on probabilistic sweeps per round; unset repeats until someone answers.
    pub max_sweeps: Option<u32>,
    /// Fixed seed for reproducible turn order.
    pub seed: Option<u64>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct RegistryConfig {
    /// Sessions idle for longer than this are closed; unset keeps them forever.
    pub idle_timeout_secs: Option<u64>,
}

impl RegistryConfig {
    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ShareConfig {
    /// Directory for saved transcripts; defaults to the data directory.
    pub transcript_dir: Option<PathBuf>,
    pub public_base_url: String,
    pub hashtags: String,
}

impl Default for ShareConfig {
    fn default() -> Self {
        Self {
            transcript_dir: None,
            public_base_url: DEFAULT_PUBLIC_BASE_URL.to_string(),
            hashtags: "#ImagineNChat @AbareSmartBot #GPT".to_string(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Directory for log files; defaults to `<config dir>/logs`.
    pub directory: Option<PathBuf>,
    /// `EnvFilter` directive used when `RUST_LOG` is not set.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: None,
            filter: "info".to_string(),
        }
    }
}

/// Contents of `secret.json`.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct SecretConfig {
    #[serde(default)]
    pub openai: Option<OpenAiSecret>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct OpenAiSecret {
    pub api_key: String,
    #[serde(default)]
    pub model_name: Option<String>,
}
