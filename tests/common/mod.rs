/*!
 * Common test utilities for the interlayer test suite
 */

use anyhow::Result;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

use interlayer::app_config::{Config, GoogleCloudConfig, RequestConfig, TranslationProvider};
use interlayer::credentials::Clock;

// Re-export the scripted transport module
pub mod mock_transport;

/// Route logs to the test output; safe to call from every test
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &TempDir, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.path().join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Writes an authorized-user key file for the Google Cloud backend
pub fn create_key_file(dir: &TempDir) -> Result<PathBuf> {
    let content = r#"{
        "type": "authorized_user",
        "client_id": "client-123.apps.googleusercontent.com",
        "client_secret": "secret-456",
        "refresh_token": "refresh-789",
        "quota_project_id": "demo-project"
    }"#;
    create_test_file(dir, "key.json", content)
}

/// PEM pair used to sign and verify service-account assertions
pub const SERVICE_ACCOUNT_PRIVATE_KEY: &str = include_str!("../resources/service_account_key.pem");
pub const SERVICE_ACCOUNT_PUBLIC_KEY: &str = include_str!("../resources/service_account_key.pub.pem");

/// Writes a service-account key file whose token_uri is the test OAuth endpoint
pub fn create_service_account_key_file(dir: &TempDir) -> Result<PathBuf> {
    let content = serde_json::json!({
        "type": "service_account",
        "project_id": "polyglot-123",
        "private_key_id": "key-1",
        "private_key": SERVICE_ACCOUNT_PRIVATE_KEY,
        "client_email": "translator@polyglot-123.iam.gserviceaccount.com",
        "client_id": "1234567890",
        "token_uri": "https://oauth.test/token"
    });
    create_test_file(dir, "service_account.json", &content.to_string())
}

/// Google Cloud settings pointing at test endpoints
pub fn google_cloud_config(credential_path: PathBuf) -> GoogleCloudConfig {
    GoogleCloudConfig {
        credential_path,
        project_id: None,
        endpoint: "https://translation.test/v3".to_string(),
        token_endpoint: "https://oauth.test/token".to_string(),
    }
}

/// Request settings with the default attempt budget and no cooldown
pub fn fast_request_config() -> RequestConfig {
    RequestConfig {
        rate_limit_cooldown_secs: 0,
        ..RequestConfig::default()
    }
}

/// Full configuration for a provider with test endpoints
pub fn test_config(provider: TranslationProvider) -> Config {
    let mut config = Config {
        provider,
        request: fast_request_config(),
        ..Config::default()
    };
    config.google_free.endpoint = "https://free.test/translate_a/single".to_string();
    config.yandex.oauth_token = "oauth-token".to_string();
    config.yandex.folder_id = "folder-1".to_string();
    config.yandex.endpoint = "https://yandex.test/translate/v2".to_string();
    config.yandex.iam_endpoint = "https://iam.test/tokens".to_string();
    config
}

/// Clock the test moves by hand
#[derive(Debug, Default)]
pub struct ManualClock(AtomicI64);

impl ManualClock {
    pub fn starting_at(now: i64) -> Arc<Self> {
        Arc::new(Self(AtomicI64::new(now)))
    }

    pub fn advance(&self, secs: i64) {
        self.0.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}
