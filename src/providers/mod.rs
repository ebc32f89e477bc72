/*!
 * Backend adapters for the supported translation providers.
 *
 * This module contains the adapter contract and its implementations:
 * - Google Cloud: managed Translation API v3 with OAuth credentials
 * - Google (free): the unauthenticated web endpoint
 * - Yandex: Cloud Translate v2 with IAM token exchange
 * - Mock: scripted backend for callers' tests
 */

use async_trait::async_trait;
use log::{error, warn};
use std::fmt::Debug;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::app_config::{Config, TranslationProvider};
use crate::catalog::LanguageCatalog;
use crate::classifier::{classify_or, ProviderSignal, SignalTable};
use crate::errors::{
    AdapterError, CanonicalError, ConfigError, CredentialError, ExecutorError, LengthScope,
    Operation,
};
use crate::executor::RequestExecutor;
use crate::transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};

pub mod google_cloud;
pub mod google_free;
pub mod mock;
pub mod yandex;

/// Longest translation returned unless the caller is distorting
pub const MAX_OUTPUT_CHARS: usize = 4096;

/// A text to translate and the caller's preferences
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationRequest {
    /// Text to translate
    pub text: String,
    /// Target language code, required
    pub target_language: Option<String>,
    /// Source language code; auto-detected when absent
    pub source_language: Option<String>,
    /// Caller tolerates degraded behaviour: oversized output is returned
    /// and a rate-limited call is retried once after a cooldown
    pub distorting: bool,
}

impl TranslationRequest {
    pub fn new(text: impl Into<String>, target_language: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            target_language: Some(target_language.into()),
            source_language: None,
            distorting: false,
        }
    }

    /// Set the source language
    pub fn source(mut self, source_language: impl Into<String>) -> Self {
        self.source_language = Some(source_language.into());
        self
    }

    /// Set the distorting flag
    pub fn distorting(mut self, distorting: bool) -> Self {
        self.distorting = distorting;
        self
    }
}

/// Successful translation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationResult {
    /// Translated text
    pub text: String,
    /// Source language reported by the provider, if any
    pub detected_source_language: Option<String>,
}

impl TranslationResult {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            detected_source_language: None,
        }
    }
}

/// Behaviour that differs between providers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderCapabilities {
    /// Value sent as source language when the caller gives none.
    /// `None` means the field is omitted and the provider detects it.
    pub auto_source_sentinel: Option<&'static str>,
    /// Whether a rate-limited translate is retried once after a cooldown
    /// when the caller is distorting
    pub rate_limit_retry: bool,
}

/// Common trait for all translation backends
///
/// Callers are written against this trait only, so backends can be swapped
/// without changing the calling code.
#[async_trait]
pub trait TranslationBackend: Send + Sync + Debug {
    /// Provider this backend talks to
    fn provider(&self) -> TranslationProvider;

    /// Provider-specific behaviour switches
    fn capabilities(&self) -> ProviderCapabilities;

    /// Detect the language of `text`
    async fn detect_language(&self, text: &str) -> Result<String, AdapterError>;

    /// Refresh the language catalog and return it
    ///
    /// A failure here is fatal for the session, see [`AdapterError::is_fatal`].
    async fn list_languages(&self) -> Result<LanguageCatalog, AdapterError>;

    /// Translate a request
    async fn translate(&self, request: &TranslationRequest) -> Result<TranslationResult, AdapterError>;

    /// The cached catalog, empty until `list_languages` succeeds
    fn catalog(&self) -> LanguageCatalog;
}

/// Build the backend selected by `config` on top of a `reqwest` transport
pub async fn connect_backend(config: &Config) -> Result<Box<dyn TranslationBackend>, ConfigError> {
    connect_backend_with(config, Arc::new(ReqwestTransport::new())).await
}

/// Build the backend selected by `config` on top of a given transport
pub async fn connect_backend_with(
    config: &Config,
    transport: Arc<dyn HttpTransport>,
) -> Result<Box<dyn TranslationBackend>, ConfigError> {
    let backend: Box<dyn TranslationBackend> = match config.provider {
        TranslationProvider::GoogleCloud => Box::new(
            google_cloud::GoogleCloudTranslator::connect(
                &config.google_cloud,
                &config.request,
                transport,
            )
            .await?,
        ),
        TranslationProvider::GoogleFree => Box::new(google_free::GoogleFreeTranslator::new(
            &config.google_free,
            &config.request,
            transport,
        )?),
        TranslationProvider::Yandex => Box::new(
            yandex::YandexTranslator::connect(&config.yandex, &config.request, transport).await?,
        ),
        TranslationProvider::Mock => Box::new(mock::MockBackend::working()),
    };
    Ok(backend)
}

/// Reject oversized output unless the caller is distorting
pub fn enforce_output_limit(text: &str, distorting: bool) -> Result<(), CanonicalError> {
    if distorting {
        return Ok(());
    }
    let length = text.chars().count();
    if length > MAX_OUTPUT_CHARS {
        warn!("too long message for sending ({} characters)", length);
        return Err(CanonicalError::TooLongMessage(LengthScope::Output));
    }
    Ok(())
}

/// Target language of a request, or `BadTargetLanguage`
pub(crate) fn require_target(
    provider: TranslationProvider,
    request: &TranslationRequest,
) -> Result<&str, AdapterError> {
    match request.target_language.as_deref().map(str::trim) {
        Some(target) if !target.is_empty() => Ok(target),
        _ => Err(AdapterError::new(
            provider,
            Operation::Translate,
            CanonicalError::BadTargetLanguage,
        )),
    }
}

/// Source language to send, substituting the provider's sentinel if any
pub(crate) fn resolve_source<'a>(
    capabilities: &ProviderCapabilities,
    request: &'a TranslationRequest,
) -> Option<&'a str> {
    request
        .source_language
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .or(capabilities.auto_source_sentinel)
}

/// Run a translate attempt, retrying once after `cooldown` when it is
/// rate-limited, the provider allows it and the caller is distorting
pub(crate) async fn with_rate_limit_retry<T, F, Fut>(
    capabilities: &ProviderCapabilities,
    cooldown: Duration,
    distorting: bool,
    mut attempt: F,
) -> Result<T, AdapterError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AdapterError>>,
{
    match attempt().await {
        Err(e) if e.kind == CanonicalError::TooManyRequests
            && capabilities.rate_limit_retry
            && distorting =>
        {
            warn!("{} rejected the request, retrying in {:?}", e.provider, cooldown);
            tokio::time::sleep(cooldown).await;
            attempt().await.inspect_err(|e| {
                if e.kind == CanonicalError::TooManyRequests {
                    error!("{} rejected the request again", e.provider);
                }
            })
        }
        other => other,
    }
}

/// Apply the output policy to a translate result
pub(crate) fn finish_translation(
    provider: TranslationProvider,
    result: TranslationResult,
    distorting: bool,
) -> Result<TranslationResult, AdapterError> {
    enforce_output_limit(&result.text, distorting)
        .map_err(|kind| AdapterError::new(provider, Operation::Translate, kind))?;
    Ok(result)
}

/// Send a request through the executor with its attempt timeout applied
pub(crate) async fn send_with_retry(
    transport: &Arc<dyn HttpTransport>,
    executor: &RequestExecutor,
    request: HttpRequest,
) -> Result<HttpResponse, ExecutorError> {
    let request = request.timeout(executor.attempt_timeout());
    executor
        .execute(move || transport.send(request.clone()))
        .await
}

/// Classification context of one adapter operation
#[derive(Debug, Clone, Copy)]
pub(crate) struct ErrorContext {
    pub provider: TranslationProvider,
    pub operation: Operation,
    pub table: SignalTable,
    pub fallback: CanonicalError,
}

impl ErrorContext {
    pub fn new(provider: TranslationProvider, operation: Operation, table: SignalTable) -> Self {
        let fallback = match operation {
            Operation::DetectLanguage => CanonicalError::LanguageDetectionFailed,
            _ => CanonicalError::UnknownTranslationError,
        };
        Self {
            provider,
            operation,
            table,
            fallback,
        }
    }

    /// An error of a known kind
    pub fn error(&self, kind: CanonicalError) -> AdapterError {
        AdapterError::new(self.provider, self.operation, kind)
    }

    /// Classify a provider signal, logging the raw signal when unrecognised
    pub fn classify(&self, signal: ProviderSignal<'_>) -> AdapterError {
        let kind = classify_or(self.table, signal, self.fallback);
        let text = match signal {
            ProviderSignal::Message(text) => text.to_string(),
            ProviderSignal::Status(code, text) => format!("{} {}", code, text),
        };
        if kind == self.fallback {
            error!("{} {}: {}", self.provider, self.operation, text);
        }
        self.error(kind).with_signal(text)
    }

    /// Map an executor failure
    pub fn executor(&self, error: ExecutorError) -> AdapterError {
        match error.into_signal() {
            Err(kind) => {
                error!("{} {}: timeout exceeded", self.provider, self.operation);
                self.error(kind)
            }
            Ok(text) => self.classify(ProviderSignal::Message(&text)),
        }
    }

    /// Map a credential failure
    pub fn credentials(&self, error: CredentialError) -> AdapterError {
        self.error(CanonicalError::CredentialExchangeFailed)
            .with_signal(error.to_string())
    }
}
