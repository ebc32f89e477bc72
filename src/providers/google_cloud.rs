use async_trait::async_trait;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::app_config::{GoogleCloudConfig, RequestConfig, TranslationProvider};
use crate::catalog::{CatalogCache, LanguageCatalog};
use crate::classifier::{ProviderSignal, GOOGLE_CLOUD_SIGNALS};
use crate::credentials::{Clock, CredentialManager, TokenExchange, TOKEN_VALIDITY_SECS};
use crate::errors::{AdapterError, CanonicalError, ConfigError, Operation};
use crate::executor::RequestExecutor;
use crate::language_utils::display_name_or_fallback;
use crate::providers::{
    finish_translation, require_target, resolve_source, send_with_retry, with_rate_limit_retry,
    ErrorContext, ProviderCapabilities, TranslationBackend, TranslationRequest, TranslationResult,
};
use crate::transport::{HttpRequest, HttpResponse, HttpTransport};

const CAPABILITIES: ProviderCapabilities = ProviderCapabilities {
    auto_source_sentinel: None,
    rate_limit_retry: false,
};

/// Language names are requested in English
const DISPLAY_LANGUAGE: &str = "en";

/// OAuth scope requested for service-account tokens
const TOKEN_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Fields of a Google JSON key file this backend understands
#[derive(Debug, Default, Deserialize)]
pub struct KeyFile {
    #[serde(rename = "type", default)]
    pub key_type: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub quota_project_id: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub client_email: Option<String>,
    #[serde(default)]
    pub private_key: Option<String>,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default)]
    pub token_uri: Option<String>,
}

impl KeyFile {
    /// Read a key file, failing when it does not exist or is not JSON
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.is_file() {
            error!("JSON key file wasn't found: {}", path.display());
            return Err(ConfigError::CredentialFileMissing(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Project id, preferring the explicit override
    pub fn project(&self, override_id: Option<&str>) -> Option<String> {
        override_id
            .or(self.project_id.as_deref())
            .or(self.quota_project_id.as_deref())
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
    }

    fn required(value: &Option<String>, name: &'static str) -> Result<String, ConfigError> {
        value
            .clone()
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::Missing(name))
    }
}

/// Pick the token exchange matching the key file's `type`
pub fn exchange_for_key(
    key: &KeyFile,
    token_endpoint: &str,
    project: &str,
) -> Result<Box<dyn TokenExchange>, ConfigError> {
    match key.key_type.as_deref() {
        Some("service_account") => Ok(Box::new(ServiceAccountExchange::from_key(key, token_endpoint)?)),
        Some("authorized_user") | None => Ok(Box::new(GoogleRefreshExchange::from_key(
            key,
            token_endpoint,
            project,
        )?)),
        Some(other) => Err(ConfigError::UnsupportedCredential(format!(
            "{} (a service_account or authorized_user key is required)",
            other
        ))),
    }
}

/// `{"access_token": ...}` or `{"error": ..., "error_description": ...}`
fn parse_token_response(response: &HttpResponse) -> Result<String, String> {
    let value: Value = serde_json::from_str(&response.body)
        .map_err(|e| format!("unreadable token response (status {}): {}", response.status, e))?;

    if let Some(error) = value.get("error") {
        let code = error.as_str().unwrap_or("error");
        let description = value
            .get("error_description")
            .and_then(Value::as_str)
            .unwrap_or_default();
        return Err(format!("{}: {}", code, description));
    }

    value
        .get("access_token")
        .and_then(Value::as_str)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .ok_or_else(|| format!("token response without access_token (status {})", response.status))
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

/// Exchange of a signed service-account assertion for an OAuth access token
pub struct ServiceAccountExchange {
    token_uri: String,
    client_email: String,
    key_id: Option<String>,
    signing_key: EncodingKey,
}

impl ServiceAccountExchange {
    /// Read the signing key; `token_uri` from the key file wins over `token_endpoint`
    pub fn from_key(key: &KeyFile, token_endpoint: &str) -> Result<Self, ConfigError> {
        let private_key = KeyFile::required(&key.private_key, "private_key")?;
        let signing_key = EncodingKey::from_rsa_pem(private_key.as_bytes())
            .map_err(|e| ConfigError::CredentialFileInvalid(format!("private_key: {}", e)))?;

        Ok(Self {
            token_uri: key
                .token_uri
                .clone()
                .filter(|uri| !uri.is_empty())
                .unwrap_or_else(|| token_endpoint.to_string()),
            client_email: KeyFile::required(&key.client_email, "client_email")?,
            key_id: key.private_key_id.clone(),
            signing_key,
        })
    }

    /// RS256 JWT valid for one hour from `now`
    pub fn assertion(&self, now: i64) -> Result<String, String> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key_id.clone();
        let claims = AssertionClaims {
            iss: &self.client_email,
            scope: TOKEN_SCOPE,
            aud: &self.token_uri,
            iat: now,
            exp: now + TOKEN_VALIDITY_SECS,
        };
        jsonwebtoken::encode(&header, &claims, &self.signing_key)
            .map_err(|e| format!("cannot sign token assertion: {}", e))
    }
}

impl fmt::Debug for ServiceAccountExchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountExchange")
            .field("token_uri", &self.token_uri)
            .field("client_email", &self.client_email)
            .finish_non_exhaustive()
    }
}

impl TokenExchange for ServiceAccountExchange {
    fn name(&self) -> &str {
        "Service account access"
    }

    fn exchange_request(&self) -> Result<HttpRequest, String> {
        let assertion = self.assertion(chrono::Utc::now().timestamp())?;
        Ok(HttpRequest::post_form(
            self.token_uri.clone(),
            vec![
                ("grant_type".to_string(), JWT_BEARER_GRANT.to_string()),
                ("assertion".to_string(), assertion),
            ],
        ))
    }

    fn parse_response(&self, response: &HttpResponse) -> Result<String, String> {
        parse_token_response(response)
    }
}

/// Exchange of an authorized-user refresh token for an OAuth access token
pub struct GoogleRefreshExchange {
    token_endpoint: String,
    client_id: String,
    client_secret: String,
    refresh_token: String,
    project: String,
}

impl GoogleRefreshExchange {
    pub fn from_key(
        key: &KeyFile,
        token_endpoint: impl Into<String>,
        project: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        match key.key_type.as_deref() {
            Some("authorized_user") | None => {}
            Some(other) => {
                return Err(ConfigError::UnsupportedCredential(format!(
                    "{} (a refresh token exchange needs an authorized_user key)",
                    other
                )));
            }
        }

        Ok(Self {
            token_endpoint: token_endpoint.into(),
            client_id: KeyFile::required(&key.client_id, "client_id")?,
            client_secret: KeyFile::required(&key.client_secret, "client_secret")?,
            refresh_token: KeyFile::required(&key.refresh_token, "refresh_token")?,
            project: project.into(),
        })
    }
}

impl fmt::Debug for GoogleRefreshExchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GoogleRefreshExchange")
            .field("token_endpoint", &self.token_endpoint)
            .field("client_id", &self.client_id)
            .field("project", &self.project)
            .finish_non_exhaustive()
    }
}

impl TokenExchange for GoogleRefreshExchange {
    fn name(&self) -> &str {
        "OAuth access"
    }

    fn exchange_request(&self) -> Result<HttpRequest, String> {
        Ok(HttpRequest::post_form(
            self.token_endpoint.clone(),
            vec![
                ("client_id".to_string(), self.client_id.clone()),
                ("client_secret".to_string(), self.client_secret.clone()),
                ("refresh_token".to_string(), self.refresh_token.clone()),
                ("grant_type".to_string(), "refresh_token".to_string()),
            ],
        ))
    }

    fn parse_response(&self, response: &HttpResponse) -> Result<String, String> {
        parse_token_response(response)
    }

    fn auth_headers(&self, token: &str) -> Vec<(String, String)> {
        vec![
            ("Authorization".to_string(), format!("Bearer {}", token)),
            ("x-goog-user-project".to_string(), self.project.clone()),
        ]
    }
}

#[derive(Debug, Deserialize)]
struct DetectResponse {
    #[serde(default)]
    languages: Vec<DetectedLanguage>,
}

#[derive(Debug, Deserialize)]
struct DetectedLanguage {
    #[serde(rename = "languageCode", default)]
    language_code: String,
}

#[derive(Debug, Deserialize)]
struct SupportedLanguagesResponse {
    #[serde(default)]
    languages: Vec<SupportedLanguage>,
}

#[derive(Debug, Deserialize)]
struct SupportedLanguage {
    #[serde(rename = "languageCode")]
    language_code: String,
    #[serde(rename = "displayName", default)]
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    #[serde(default)]
    translations: Vec<GoogleTranslation>,
}

#[derive(Debug, Deserialize)]
struct GoogleTranslation {
    #[serde(rename = "translatedText")]
    translated_text: String,
    #[serde(rename = "detectedLanguageCode", default)]
    detected_language_code: Option<String>,
}

/// Google Cloud Translation v3 backend
#[derive(Debug)]
pub struct GoogleCloudTranslator {
    /// `{endpoint}/projects/{id}`
    parent_url: String,
    project: String,
    transport: Arc<dyn HttpTransport>,
    executor: RequestExecutor,
    credentials: CredentialManager,
    catalog: CatalogCache,
    cooldown: Duration,
}

impl GoogleCloudTranslator {
    /// Create the backend from the key file without contacting the provider
    pub fn new(
        config: &GoogleCloudConfig,
        request: &RequestConfig,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, ConfigError> {
        url::Url::parse(&config.endpoint)?;
        url::Url::parse(&config.token_endpoint)?;

        let key = KeyFile::load(&config.credential_path)?;
        let project = key.project(config.project_id.as_deref()).ok_or_else(|| {
            error!("Project name isn't readable from JSON key");
            ConfigError::Missing("project_id")
        })?;
        let exchange = exchange_for_key(&key, &config.token_endpoint, &project)?;

        let executor = RequestExecutor::from(request);
        Ok(Self {
            parent_url: format!("{}/projects/{}", config.endpoint.trim_end_matches('/'), project),
            project,
            credentials: CredentialManager::new(exchange, transport.clone(), executor.clone()),
            transport,
            executor,
            catalog: CatalogCache::new(),
            cooldown: request.rate_limit_cooldown(),
        })
    }

    /// Create the backend and obtain the first access token
    pub async fn connect(
        config: &GoogleCloudConfig,
        request: &RequestConfig,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, ConfigError> {
        let translator = Self::new(config, request, transport)?;
        translator
            .credentials
            .ensure_valid()
            .await
            .map_err(|e| translator.context(Operation::Connect).credentials(e))?;
        info!("Google Cloud backend ready (project {})", translator.project);
        Ok(translator)
    }

    /// Use a different clock for the token validity window
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.credentials = self.credentials.with_clock(clock);
        self
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn credentials(&self) -> &CredentialManager {
        &self.credentials
    }

    fn context(&self, operation: Operation) -> ErrorContext {
        ErrorContext::new(TranslationProvider::GoogleCloud, operation, GOOGLE_CLOUD_SIGNALS)
    }

    /// Send an authorized request and return the JSON body of a success
    async fn call(&self, operation: Operation, request: HttpRequest) -> Result<Value, AdapterError> {
        let context = self.context(operation);
        let headers = self
            .credentials
            .ensure_valid()
            .await
            .map_err(|e| context.credentials(e))?;

        let response = send_with_retry(&self.transport, &self.executor, request.headers(&headers))
            .await
            .map_err(|e| context.executor(e))?;

        let value: Option<Value> = serde_json::from_str(&response.body).ok();

        // {"error": {"code": 400, "message": "...", "status": "INVALID_ARGUMENT"}}
        if let Some(error) = value.as_ref().and_then(|v| v.get("error")) {
            let signal = format!(
                "{} {} {}",
                error.get("code").and_then(Value::as_u64).unwrap_or(u64::from(response.status)),
                error.get("message").and_then(Value::as_str).unwrap_or_default(),
                error.get("status").and_then(Value::as_str).unwrap_or_default(),
            );
            return Err(context.classify(ProviderSignal::Status(response.status, signal.trim())));
        }

        match value {
            Some(value) if response.is_success() => Ok(value),
            Some(_) => Err(context.classify(ProviderSignal::Status(response.status, &response.body))),
            None if response.is_success() => {
                Err(context.classify(ProviderSignal::Message("unreadable response body")))
            }
            None => Err(context.classify(ProviderSignal::Status(response.status, &response.body))),
        }
    }

    async fn translate_once(
        &self,
        text: &str,
        target: &str,
        source: Option<&str>,
    ) -> Result<TranslationResult, AdapterError> {
        let context = self.context(Operation::Translate);

        let mut body = json!({
            "contents": [text],
            "targetLanguageCode": target,
            "mimeType": "text/plain",
        });
        if let Some(source) = source {
            body["sourceLanguageCode"] = json!(source);
        }

        let request = HttpRequest::post_json(format!("{}:translateText", self.parent_url), body);
        let value = self.call(Operation::Translate, request).await?;
        let response: TranslateResponse = serde_json::from_value(value).map_err(|e| {
            context.classify(ProviderSignal::Message(&format!("unexpected translate response: {}", e)))
        })?;

        let translation = response.translations.into_iter().next().ok_or_else(|| {
            context.classify(ProviderSignal::Message("translate response without translations"))
        })?;

        Ok(TranslationResult {
            text: translation.translated_text,
            detected_source_language: translation.detected_language_code.filter(|c| !c.is_empty()),
        })
    }
}

#[async_trait]
impl TranslationBackend for GoogleCloudTranslator {
    fn provider(&self) -> TranslationProvider {
        TranslationProvider::GoogleCloud
    }

    fn capabilities(&self) -> ProviderCapabilities {
        CAPABILITIES
    }

    async fn detect_language(&self, text: &str) -> Result<String, AdapterError> {
        let context = self.context(Operation::DetectLanguage);
        let request = HttpRequest::post_json(
            format!("{}:detectLanguage", self.parent_url),
            json!({ "content": text, "mimeType": "text/plain" }),
        );

        let value = self.call(Operation::DetectLanguage, request).await?;
        let response: DetectResponse = serde_json::from_value(value).map_err(|e| {
            context.classify(ProviderSignal::Message(&format!("unexpected detect response: {}", e)))
        })?;

        // "und" is Google's code for an undetermined language
        match response.languages.into_iter().next() {
            Some(lang) if !lang.language_code.is_empty() && lang.language_code != "und" => {
                Ok(lang.language_code)
            }
            _ => Err(context.error(CanonicalError::UnknownLanguage)),
        }
    }

    async fn list_languages(&self) -> Result<LanguageCatalog, AdapterError> {
        let context = self.context(Operation::ListLanguages);
        let request = HttpRequest::get(format!("{}/supportedLanguages", self.parent_url))
            .query(&[("displayLanguageCode", DISPLAY_LANGUAGE)]);

        let value = self
            .call(Operation::ListLanguages, request)
            .await
            .inspect_err(|_| error!("Fatal error of creating language list"))?;
        let response: SupportedLanguagesResponse = serde_json::from_value(value).map_err(|e| {
            context.classify(ProviderSignal::Message(&format!("unexpected languages response: {}", e)))
        })?;

        if response.languages.is_empty() {
            warn!("Google Cloud returned an empty language list");
        }

        let catalog: LanguageCatalog = response
            .languages
            .iter()
            .map(|lang| {
                let name = display_name_or_fallback(&lang.language_code, lang.display_name.as_deref());
                (lang.language_code.clone(), name)
            })
            .collect();

        self.catalog.replace(catalog.clone());
        Ok(catalog)
    }

    async fn translate(&self, request: &TranslationRequest) -> Result<TranslationResult, AdapterError> {
        let target = require_target(self.provider(), request)?;
        let source = resolve_source(&CAPABILITIES, request);
        let text = request.text.as_str();

        let result = with_rate_limit_retry(&CAPABILITIES, self.cooldown, request.distorting, move || {
            self.translate_once(text, target, source)
        })
        .await?;

        finish_translation(self.provider(), result, request.distorting)
    }

    fn catalog(&self) -> LanguageCatalog {
        self.catalog.snapshot()
    }
}
