use async_trait::async_trait;
use log::{error, info};
use serde::Deserialize;
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::app_config::{RequestConfig, TranslationProvider, YandexConfig};
use crate::catalog::{CatalogCache, LanguageCatalog};
use crate::classifier::{ProviderSignal, YANDEX_SIGNALS};
use crate::credentials::{Clock, CredentialManager, TokenExchange};
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

/// Exchange of a Yandex OAuth token for an IAM token
pub struct YandexIamExchange {
    endpoint: String,
    oauth_token: String,
}

impl YandexIamExchange {
    pub fn new(endpoint: impl Into<String>, oauth_token: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            oauth_token: oauth_token.into(),
        }
    }
}

impl fmt::Debug for YandexIamExchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("YandexIamExchange")
            .field("endpoint", &self.endpoint)
            .field("oauth_token", &"<redacted>")
            .finish()
    }
}

impl TokenExchange for YandexIamExchange {
    fn name(&self) -> &str {
        "IAM"
    }

    fn exchange_request(&self) -> Result<HttpRequest, String> {
        Ok(HttpRequest::post_json(
            self.endpoint.clone(),
            json!({ "yandexPassportOauthToken": self.oauth_token }),
        ))
    }

    fn parse_response(&self, response: &HttpResponse) -> Result<String, String> {
        let value: Value = serde_json::from_str(&response.body)
            .map_err(|e| format!("unreadable IAM response (status {}): {}", response.status, e))?;

        if let Some(message) = value.get("message").and_then(Value::as_str) {
            return Err(message.to_string());
        }

        value
            .get("iamToken")
            .and_then(Value::as_str)
            .filter(|token| !token.is_empty())
            .map(str::to_string)
            .ok_or_else(|| format!("IAM response without token (status {})", response.status))
    }
}

#[derive(Debug, Deserialize)]
struct DetectResponse {
    #[serde(rename = "languageCode", default)]
    language_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LanguagesResponse {
    #[serde(default)]
    languages: Vec<YandexLanguage>,
}

#[derive(Debug, Deserialize)]
struct YandexLanguage {
    code: String,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    #[serde(default)]
    translations: Vec<YandexTranslation>,
}

#[derive(Debug, Deserialize)]
struct YandexTranslation {
    text: String,
    #[serde(rename = "detectedLanguageCode", default)]
    detected_language_code: Option<String>,
}

/// Yandex Cloud Translate v2 backend
#[derive(Debug)]
pub struct YandexTranslator {
    endpoint: String,
    folder_id: String,
    transport: Arc<dyn HttpTransport>,
    executor: RequestExecutor,
    credentials: CredentialManager,
    catalog: CatalogCache,
    cooldown: Duration,
}

impl YandexTranslator {
    /// Create the backend without contacting the provider
    pub fn new(
        config: &YandexConfig,
        request: &RequestConfig,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, ConfigError> {
        if config.oauth_token.trim().is_empty() {
            return Err(ConfigError::Missing("oauth_token"));
        }
        if config.folder_id.trim().is_empty() {
            return Err(ConfigError::Missing("folder_id"));
        }
        url::Url::parse(&config.endpoint)?;
        url::Url::parse(&config.iam_endpoint)?;

        let executor = RequestExecutor::from(request);
        let exchange = YandexIamExchange::new(config.iam_endpoint.clone(), config.oauth_token.clone());

        Ok(Self {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            folder_id: config.folder_id.clone(),
            credentials: CredentialManager::new(Box::new(exchange), transport.clone(), executor.clone()),
            transport,
            executor,
            catalog: CatalogCache::new(),
            cooldown: request.rate_limit_cooldown(),
        })
    }

    /// Create the backend and obtain the first IAM token
    pub async fn connect(
        config: &YandexConfig,
        request: &RequestConfig,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, ConfigError> {
        let translator = Self::new(config, request, transport)?;
        translator.authorize(Operation::Connect).await?;
        info!("Yandex backend ready (folder {})", translator.folder_id);
        Ok(translator)
    }

    /// Use a different clock for the token validity window
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.credentials = self.credentials.with_clock(clock);
        self
    }

    pub fn credentials(&self) -> &CredentialManager {
        &self.credentials
    }

    fn context(&self, operation: Operation) -> ErrorContext {
        ErrorContext::new(TranslationProvider::Yandex, operation, YANDEX_SIGNALS)
    }

    async fn authorize(&self, operation: Operation) -> Result<Vec<(String, String)>, AdapterError> {
        self.credentials
            .ensure_valid()
            .await
            .map_err(|e| self.context(operation).credentials(e))
    }

    /// POST to an API method and return the JSON body once it carries no error
    async fn call(&self, operation: Operation, method: &str, body: Value) -> Result<Value, AdapterError> {
        let context = self.context(operation);
        let headers = self.authorize(operation).await?;

        let request = HttpRequest::post_json(format!("{}/{}", self.endpoint, method), body)
            .headers(&headers);
        let response = send_with_retry(&self.transport, &self.executor, request)
            .await
            .map_err(|e| context.executor(e))?;

        let value: Value = match serde_json::from_str(&response.body) {
            Ok(value) => value,
            Err(e) if response.is_success() => {
                return Err(context.classify(ProviderSignal::Message(&format!(
                    "unreadable response: {}",
                    e
                ))));
            }
            Err(_) => {
                return Err(context.classify(ProviderSignal::Status(response.status, &response.body)));
            }
        };

        if let Some(message) = value.get("message").and_then(Value::as_str) {
            return Err(context.classify(ProviderSignal::Status(response.status, message)));
        }
        if !response.is_success() {
            return Err(context.classify(ProviderSignal::Status(response.status, &response.body)));
        }

        Ok(value)
    }

    async fn translate_once(
        &self,
        text: &str,
        target: &str,
        source: Option<&str>,
    ) -> Result<TranslationResult, AdapterError> {
        let context = self.context(Operation::Translate);

        let mut body = json!({
            "targetLanguageCode": target,
            "texts": [text],
            "folderId": self.folder_id,
        });
        if let Some(source) = source {
            body["sourceLanguageCode"] = json!(source);
        }

        let value = self.call(Operation::Translate, "translate", body).await?;
        let response: TranslateResponse = serde_json::from_value(value).map_err(|e| {
            context.classify(ProviderSignal::Message(&format!("unexpected translate response: {}", e)))
        })?;

        let translation = response.translations.into_iter().next().ok_or_else(|| {
            context.classify(ProviderSignal::Message("translate response without translations"))
        })?;

        Ok(TranslationResult {
            text: translation.text,
            detected_source_language: translation.detected_language_code.filter(|c| !c.is_empty()),
        })
    }
}

#[async_trait]
impl TranslationBackend for YandexTranslator {
    fn provider(&self) -> TranslationProvider {
        TranslationProvider::Yandex
    }

    fn capabilities(&self) -> ProviderCapabilities {
        CAPABILITIES
    }

    async fn detect_language(&self, text: &str) -> Result<String, AdapterError> {
        let context = self.context(Operation::DetectLanguage);
        let body = json!({ "folderId": self.folder_id, "text": text });

        let value = self.call(Operation::DetectLanguage, "detect", body).await?;
        let response: DetectResponse = serde_json::from_value(value).map_err(|e| {
            context.classify(ProviderSignal::Message(&format!("unexpected detect response: {}", e)))
        })?;

        match response.language_code {
            Some(code) if !code.trim().is_empty() => Ok(code),
            _ => Err(context.error(CanonicalError::UnknownLanguage)),
        }
    }

    async fn list_languages(&self) -> Result<LanguageCatalog, AdapterError> {
        let context = self.context(Operation::ListLanguages);
        let body = json!({ "folderId": self.folder_id });

        let value = self
            .call(Operation::ListLanguages, "languages", body)
            .await
            .inspect_err(|_| error!("langlist update failed"))?;
        let response: LanguagesResponse = serde_json::from_value(value).map_err(|e| {
            context.classify(ProviderSignal::Message(&format!("unexpected languages response: {}", e)))
        })?;

        let catalog: LanguageCatalog = response
            .languages
            .iter()
            .map(|lang| {
                let name = display_name_or_fallback(&lang.code, lang.name.as_deref());
                (lang.code.clone(), name)
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
