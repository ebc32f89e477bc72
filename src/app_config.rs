use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration module
/// This module handles the configuration consumed by the backends: which
/// provider is active, its credentials, and request tuning.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// Active translation provider
    #[serde(default)]
    pub provider: TranslationProvider,

    /// Google Cloud Translation settings
    #[serde(default)]
    pub google_cloud: GoogleCloudConfig,

    /// Free Google endpoint settings
    #[serde(default)]
    pub google_free: GoogleFreeConfig,

    /// Yandex Cloud Translate settings
    #[serde(default)]
    pub yandex: YandexConfig,

    /// Request execution tuning
    #[serde(default)]
    pub request: RequestConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Translation provider type
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum TranslationProvider {
    // @provider: Google Cloud Translation v3
    GoogleCloud,
    // @provider: Unauthenticated Google web endpoint
    #[default]
    GoogleFree,
    // @provider: Yandex Cloud Translate v2
    Yandex,
    // @provider: In-process mock, never read from config files
    #[serde(skip)]
    Mock,
}

impl TranslationProvider {
    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::GoogleCloud => "Google Cloud",
            Self::GoogleFree => "Google (free)",
            Self::Yandex => "Yandex",
            Self::Mock => "Mock",
        }
    }

    // @returns: Lowercase provider identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::GoogleCloud => "googlecloud".to_string(),
            Self::GoogleFree => "googlefree".to_string(),
            Self::Yandex => "yandex".to_string(),
            Self::Mock => "mock".to_string(),
        }
    }
}

impl std::fmt::Display for TranslationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl std::str::FromStr for TranslationProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "googlecloud" | "googleapi" => Ok(Self::GoogleCloud),
            "googlefree" | "googlefreeapi" => Ok(Self::GoogleFree),
            "yandex" | "yapi" => Ok(Self::Yandex),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Google Cloud Translation configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GoogleCloudConfig {
    /// Path to the JSON key file
    #[serde(alias = "keypath", default = "default_credential_path")]
    pub credential_path: PathBuf,

    /// Project id, overrides the one in the key file
    #[serde(default)]
    pub project_id: Option<String>,

    /// Translation API base URL
    #[serde(default = "default_google_cloud_endpoint")]
    pub endpoint: String,

    /// OAuth token endpoint
    #[serde(default = "default_google_token_endpoint")]
    pub token_endpoint: String,
}

impl Default for GoogleCloudConfig {
    fn default() -> Self {
        Self {
            credential_path: default_credential_path(),
            project_id: None,
            endpoint: default_google_cloud_endpoint(),
            token_endpoint: default_google_token_endpoint(),
        }
    }
}

/// Free Google endpoint configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GoogleFreeConfig {
    /// Endpoint URL
    #[serde(default = "default_google_free_endpoint")]
    pub endpoint: String,
}

impl Default for GoogleFreeConfig {
    fn default() -> Self {
        Self {
            endpoint: default_google_free_endpoint(),
        }
    }
}

/// Yandex Cloud Translate configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct YandexConfig {
    /// Long-lived OAuth token exchanged for IAM tokens
    #[serde(alias = "oauth-token", default)]
    pub oauth_token: String,

    /// Cloud folder id sent with every request
    #[serde(alias = "folder-id", default)]
    pub folder_id: String,

    /// Translate API base URL
    #[serde(default = "default_yandex_endpoint")]
    pub endpoint: String,

    /// IAM token endpoint
    #[serde(default = "default_yandex_iam_endpoint")]
    pub iam_endpoint: String,
}

impl Default for YandexConfig {
    fn default() -> Self {
        Self {
            oauth_token: String::new(),
            folder_id: String::new(),
            endpoint: default_yandex_endpoint(),
            iam_endpoint: default_yandex_iam_endpoint(),
        }
    }
}

/// Request execution tuning
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RequestConfig {
    /// Per-attempt timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Attempts before giving up on repeated timeouts
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Cooldown before the single rate-limit retry, in seconds
    #[serde(default = "default_rate_limit_cooldown_secs")]
    pub rate_limit_cooldown_secs: u64,
}

impl RequestConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn rate_limit_cooldown(&self) -> Duration {
        Duration::from_secs(self.rate_limit_cooldown_secs)
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_attempts: default_max_attempts(),
            rate_limit_cooldown_secs: default_rate_limit_cooldown_secs(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_credential_path() -> PathBuf {
    PathBuf::from("../key.json")
}

fn default_google_cloud_endpoint() -> String {
    "https://translation.googleapis.com/v3".to_string()
}

fn default_google_token_endpoint() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

fn default_google_free_endpoint() -> String {
    "https://translate.googleapis.com/translate_a/single".to_string()
}

fn default_yandex_endpoint() -> String {
    "https://translate.api.cloud.yandex.net/translate/v2".to_string()
}

fn default_yandex_iam_endpoint() -> String {
    "https://iam.api.cloud.yandex.net/iam/v1/tokens".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_max_attempts() -> u32 {
    10
}

fn default_rate_limit_cooldown_secs() -> u64 {
    10
}

impl Config {
    /// Load a configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Write the configuration as pretty JSON
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize config to JSON")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        match self.provider {
            TranslationProvider::GoogleCloud => {
                if self.google_cloud.credential_path.as_os_str().is_empty() {
                    return Err(anyhow!("Credential path is required for Google Cloud provider"));
                }
            }
            TranslationProvider::Yandex => {
                if self.yandex.oauth_token.trim().is_empty() {
                    return Err(anyhow!("OAuth token is required for Yandex provider"));
                }
                if self.yandex.folder_id.trim().is_empty() {
                    return Err(anyhow!("Folder id is required for Yandex provider"));
                }
            }
            TranslationProvider::GoogleFree | TranslationProvider::Mock => {}
        }

        if self.request.max_attempts == 0 {
            return Err(anyhow!("request.max_attempts must be at least 1"));
        }
        if self.request.timeout_secs == 0 {
            return Err(anyhow!("request.timeout_secs must be at least 1"));
        }

        Ok(())
    }
}
