use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::converter::DEFAULT_VALIDATION_THRESHOLD;

/// Audit configuration, stored at `~/.mcq-case-audit/config.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub schema_version: u32,
    /// API root without the `/v1` suffix.
    pub llm_base_url: String,
    pub api_key: String,
    pub model: String,
    pub request_timeout_secs: u64,
    pub max_conversion_attempts: u32,
    pub validation_threshold: f64,
    /// MCQs sampled per specialty when the command line does not say.
    pub default_per_specialty: usize,
    pub report_dir: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    /// JSON vocabulary replacing the built-in keyword lists.
    pub vocabulary_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schema_version: 1,
            llm_base_url: "https://api.openai.com".to_string(),
            api_key: String::new(),
            model: "gpt-4o-mini".to_string(),
            request_timeout_secs: 120,
            max_conversion_attempts: 3,
            validation_threshold: DEFAULT_VALIDATION_THRESHOLD,
            default_per_specialty: 5,
            report_dir: None,
            log_dir: None,
            vocabulary_path: None,
        }
    }
}

impl Config {
    /// Get the default config directory
    pub fn config_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Failed to get home directory")?;
        Ok(home.join(".mcq-case-audit"))
    }

    /// Get the config file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    /// Load config from file or return default
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(config) => config,
            Err(e) => {
                debug!("Failed to load config, using default: {}", e);
                Self::default()
            }
        }
    }

    /// Load config from the default path
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load config from `path`; a missing file yields the default.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {:?}", path))?;
            let config: Config = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config {:?}", path))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to the default path
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// `OPENAI_API_KEY`, `MCQ_AUDIT_LLM_URL` and `MCQ_AUDIT_MODEL` replace file values.
    pub fn apply_env_overrides(&mut self) {
        let non_empty = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("OPENAI_API_KEY") {
            self.api_key = key;
        }
        if let Some(url) = non_empty("MCQ_AUDIT_LLM_URL") {
            self.llm_base_url = url;
        }
        if let Some(model) = non_empty("MCQ_AUDIT_MODEL") {
            self.model = model;
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Configured report directory, else `~/.mcq-case-audit/reports`.
    pub fn report_dir(&self) -> PathBuf {
        self.report_dir.clone().unwrap_or_else(|| {
            Self::config_dir()
                .unwrap_or_else(|_| PathBuf::from("."))
                .join("reports")
        })
    }

    /// Copy safe to print: the API key is masked.
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if !config.api_key.is_empty() {
            config.api_key = "***".to_string();
        }
        config
    }
}
