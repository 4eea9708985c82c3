use anyhow::{anyhow, Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

use crate::translation::prompts::DEFAULT_REFUSAL_MARKERS;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.

/// Default configuration file name
pub const CONFIG_FILENAME: &str = "main.config.json";

/// Default log file name
pub const LOG_FILENAME: &str = "translator.log";

/// Maximum number of in-flight API calls per batch
pub const MAX_CONCURRENCY: usize = 8;

/// Per-call API timeout in seconds
pub const REQUEST_TIMEOUT_SECS: u64 = 25;

/// Models offered by the settings UI of the original tool
pub const SUPPORTED_MODELS: &[&str] = &[
    "gpt-4o-mini",
    "gpt-4o",
    "gpt-4o-128k",
    "gpt-3.5-turbo",
    "gpt-3.5-turbo-16k",
];

/// Target languages offered by the settings UI of the original tool
pub const SUPPORTED_LANGUAGES: &[&str] = &["中文", "English", "日本語", "Español", "Français", "Deutsch"];

/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// API key for the model service
    #[serde(default)]
    pub api_key: String,

    /// API base URL including the version path (e.g. `https://host/v1`), blank for the default
    #[serde(default)]
    pub base_url: String,

    /// Model identifier
    #[serde(default = "default_model")]
    pub model: String,

    /// Target language, free-form (e.g. "中文", "English")
    #[serde(default = "default_target_lang")]
    pub target_lang: String,

    /// Maximum concurrent requests per batch
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Timeout for a single API call
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Substrings marking a refused translation; fix mode re-translates such lines literally
    #[serde(default = "default_refusal_markers")]
    pub refusal_markers: Vec<String>,

    /// Prompt overrides
    #[serde(default)]
    pub prompts: PromptConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Optional log file, appended to alongside stderr output
    #[serde(default = "default_log_file")]
    pub log_file: Option<String>,
}

/// Instruction strings sent as the system message; empty means built-in default
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct PromptConfig {
    /// Translate instruction; `{lang}` is replaced by the target language
    #[serde(default)]
    pub translate: String,

    /// Fix (touch-up) instruction
    #[serde(default)]
    pub fix: String,

    /// Appended to the translate instruction for the literal fallback
    #[serde(default)]
    pub literal_suffix: String,
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_target_lang() -> String {
    "中文".to_string()
}

fn default_concurrency() -> usize {
    MAX_CONCURRENCY
}

fn default_timeout_secs() -> u64 {
    REQUEST_TIMEOUT_SECS
}

fn default_refusal_markers() -> Vec<String> {
    DEFAULT_REFUSAL_MARKERS.iter().map(|m| m.to_string()).collect()
}

fn default_log_file() -> Option<String> {
    Some(LOG_FILENAME.to_string())
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            api_key: String::new(),
            base_url: String::new(),
            model: default_model(),
            target_lang: default_target_lang(),
            concurrency: default_concurrency(),
            timeout_secs: default_timeout_secs(),
            refusal_markers: default_refusal_markers(),
            prompts: PromptConfig::default(),
            log_level: LogLevel::default(),
            log_file: default_log_file(),
        }
    }
}

impl Config {
    /// True when a batch may be started with this configuration
    pub fn is_valid(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// Base URL to use, `None` when the default public endpoint applies
    pub fn effective_base_url(&self) -> Option<String> {
        let trimmed = self.base_url.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }

    /// Concurrency limit, never below one
    pub fn effective_concurrency(&self) -> usize {
        self.concurrency.max(1)
    }

    /// Collect every problem with this configuration
    pub fn validation_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.api_key.trim().is_empty() {
            errors.push("API key must not be empty".to_string());
        }

        if let Some(base_url) = self.effective_base_url() {
            match Url::parse(&base_url) {
                Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
                _ => errors.push(format!("Base URL must be an absolute http:// or https:// URL: {}", base_url)),
            }
        }

        if self.model.trim().is_empty() {
            errors.push("Model name must not be empty".to_string());
        }

        if self.target_lang.trim().is_empty() {
            errors.push("Target language must not be empty".to_string());
        }

        errors
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        let errors = self.validation_errors();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(anyhow!(errors.join("; ")))
        }
    }
}

/// Loads and saves a [`Config`] at a fixed path
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the backup copy, `<stem>.backup.json` next to the config file
    pub fn backup_path(&self) -> PathBuf {
        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "config".to_string());
        self.path.with_file_name(format!("{}.backup.json", stem))
    }

    /// Load the configuration; a missing or unreadable file yields defaults
    pub fn load(&self) -> Config {
        if !self.path.exists() {
            info!("Config file not found at {}, using defaults", self.path.display());
            return Config::default();
        }

        match self.read() {
            Ok(config) => {
                info!("Loaded configuration from {}", self.path.display());
                config
            }
            Err(e) => {
                warn!("Failed to read config {}: {:#}", self.path.display(), e);
                Config::default()
            }
        }
    }

    /// Load the configuration, failing on a missing or malformed file
    pub fn read(&self) -> Result<Config> {
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to open config file: {}", self.path.display()))?;
        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", self.path.display()))?;
        Ok(config)
    }

    /// Validate and write the configuration as pretty JSON
    pub fn save(&self, config: &Config) -> Result<()> {
        config.validate().context("Configuration validation failed")?;
        self.write_unchecked(config)
    }

    /// Write without validating, used when seeding a default file
    pub fn write_unchecked(&self, config: &Config) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
            }
        }

        let json = serde_json::to_string_pretty(config).context("Failed to serialize config to JSON")?;
        fs::write(&self.path, json)
            .with_context(|| format!("Failed to write config file: {}", self.path.display()))?;
        info!("Saved configuration to {}", self.path.display());
        Ok(())
    }

    /// Copy the current config file to its backup path
    pub fn backup(&self) -> Result<PathBuf> {
        if !self.path.exists() {
            return Err(anyhow!("Config file does not exist: {}", self.path.display()));
        }
        let backup = self.backup_path();
        fs::copy(&self.path, &backup)
            .with_context(|| format!("Failed to back up config to {}", backup.display()))?;
        info!("Backed up configuration to {}", backup.display());
        Ok(backup)
    }

    /// Replace the config file with its backup
    pub fn restore(&self) -> Result<()> {
        let backup = self.backup_path();
        if !backup.exists() {
            return Err(anyhow!("Backup file does not exist: {}", backup.display()));
        }
        fs::copy(&backup, &self.path)
            .with_context(|| format!("Failed to restore config from {}", backup.display()))?;
        info!("Restored configuration from {}", backup.display());
        Ok(())
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new(CONFIG_FILENAME)
    }
}
