use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tutors_core::RetryPolicy;

/// Top-level configuration, read from `~/tutors/config.json`.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub moderation: ModerationConfig,
    #[serde(default)]
    pub retry: RetrySettings,
    #[serde(default)]
    pub provider: ProviderConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ChatConfig {
    #[serde(default = "ChatConfig::default_model")]
    pub model: String,
    #[serde(default = "ChatConfig::default_system_prompt")]
    pub system_prompt: String,
    #[serde(default = "ChatConfig::default_temperature")]
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_limit: Option<usize>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            model: Self::default_model(),
            system_prompt: Self::default_system_prompt(),
            temperature: Self::default_temperature(),
            history_limit: None,
        }
    }
}

impl ChatConfig {
    fn default_model() -> String {
        "gemini-2.0-flash".to_string()
    }

    fn default_system_prompt() -> String {
        "You are a helpful AI Data Science Tutor. Answer only data science \
         related questions. Keep responses technical and concise."
            .to_string()
    }

    const fn default_temperature() -> f32 {
        0.7
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ModerationConfig {
    #[serde(default = "ModerationConfig::default_enabled")]
    pub enabled: bool,
    /// Case-insensitive keywords that mark a reply as in-domain.
    /// Empty means the configured gate passes everything.
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Refusal text shown when no keyword matches.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refusal: Option<String>,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            enabled: Self::default_enabled(),
            keywords: Vec::new(),
            refusal: None,
        }
    }
}

impl ModerationConfig {
    const fn default_enabled() -> bool {
        true
    }
}

/// Backoff parameters in seconds, mirroring the retry policy shape.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RetrySettings {
    #[serde(default = "RetrySettings::default_initial")]
    pub initial: f64,
    #[serde(default = "RetrySettings::default_maximum")]
    pub maximum: f64,
    #[serde(default = "RetrySettings::default_multiplier")]
    pub multiplier: f64,
    #[serde(default = "RetrySettings::default_deadline")]
    pub deadline: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            initial: Self::default_initial(),
            maximum: Self::default_maximum(),
            multiplier: Self::default_multiplier(),
            deadline: Self::default_deadline(),
        }
    }
}

impl RetrySettings {
    const fn default_initial() -> f64 {
        1.0
    }

    const fn default_maximum() -> f64 {
        60.0
    }

    const fn default_multiplier() -> f64 {
        2.0
    }

    const fn default_deadline() -> f64 {
        900.0
    }

    /// Convert to a validated [`RetryPolicy`].
    pub fn to_policy(&self) -> anyhow::Result<RetryPolicy> {
        if !(self.initial.is_finite()
            && self.maximum.is_finite()
            && self.multiplier.is_finite()
            && self.deadline.is_finite()
            && self.initial >= 0.0
            && self.maximum >= 0.0
            && self.deadline >= 0.0)
        {
            anyhow::bail!("retry durations must be finite and non-negative");
        }

        Ok(RetryPolicy::new(
            Duration::from_secs_f64(self.initial),
            Duration::from_secs_f64(self.maximum),
            self.multiplier,
            Duration::from_secs_f64(self.deadline),
        )?)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ProviderConfig {
    /// Gemini API key. Optional: the CLI prompts when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Endpoint override, mainly for tests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_dir()?.join("config.json");

        if !config_path.exists() {
            anyhow::bail!(
                "Config file not found at: {}. Please run 'tutors init' to create config.",
                config_path.display()
            );
        }

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    fn config_dir() -> anyhow::Result<PathBuf> {
        Ok(dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Cannot find home directory"))?
            .join("tutors"))
    }

    pub fn ensure_config_dir() -> anyhow::Result<PathBuf> {
        let config_dir = Self::config_dir()?;
        std::fs::create_dir_all(&config_dir)?;
        Ok(config_dir)
    }

    /// Write a default config file, refusing to clobber an existing one.
    pub fn create_config() -> anyhow::Result<PathBuf> {
        let config_dir = Self::ensure_config_dir()?;
        let config_path = config_dir.join("config.json");

        if config_path.exists() {
            anyhow::bail!("Config already exists at: {}", config_path.display());
        }

        let content = serde_json::to_string_pretty(&Self::default())?;
        std::fs::write(&config_path, content)?;

        Ok(config_path)
    }
}
