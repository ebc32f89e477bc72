/*!
 * Mock backend for testing code written against `TranslationBackend`.
 *
 * This module provides a backend that simulates different behaviors:
 * - `MockBackend::working()` - Always succeeds with tagged text
 * - `MockBackend::intermittent(n)` - Rate-limits every Nth translate
 * - `MockBackend::failing(kind)` - Always fails with the given kind
 *
 * It follows the same contract as the real backends: missing targets,
 * equal languages and the output-size policy are all enforced.
 */

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::app_config::TranslationProvider;
use crate::catalog::{CatalogCache, LanguageCatalog};
use crate::errors::{AdapterError, CanonicalError, Operation};
use crate::language_utils::language_codes_match;
use crate::providers::{
    finish_translation, require_target, with_rate_limit_retry, ProviderCapabilities,
    TranslationBackend, TranslationRequest, TranslationResult,
};

const CAPABILITIES: ProviderCapabilities = ProviderCapabilities {
    auto_source_sentinel: None,
    rate_limit_retry: true,
};

/// Behavior mode for the mock backend
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds
    Working,
    /// Every Nth translate attempt is rate-limited
    Intermittent { fail_every: usize },
    /// Every operation fails with this kind
    Failing(CanonicalError),
    /// Detection finds nothing
    Empty,
    /// Simulates slow responses
    Slow { delay_ms: u64 },
}

/// Mock backend that never touches the network
#[derive(Debug)]
pub struct MockBackend {
    behavior: MockBehavior,
    /// Shared between clones
    request_count: Arc<AtomicUsize>,
    custom_response: Option<fn(&TranslationRequest) -> String>,
    catalog: CatalogCache,
}

impl MockBackend {
    /// Create a new mock backend with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            custom_response: None,
            catalog: CatalogCache::new(),
        }
    }

    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent {
            fail_every: fail_every.max(1),
        })
    }

    pub fn failing(kind: CanonicalError) -> Self {
        Self::new(MockBehavior::Failing(kind))
    }

    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    /// Set a custom response generator
    pub fn with_custom_response(mut self, generator: fn(&TranslationRequest) -> String) -> Self {
        self.custom_response = Some(generator);
        self
    }

    /// Number of operations served so far
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    fn error(&self, operation: Operation, kind: CanonicalError) -> AdapterError {
        AdapterError::new(TranslationProvider::Mock, operation, kind).with_signal("mock")
    }

    async fn serve(&self, operation: Operation) -> Result<usize, AdapterError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            MockBehavior::Failing(kind) => Err(self.error(operation, kind)),
            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                Ok(count)
            }
            _ => Ok(count),
        }
    }

    async fn translate_once(&self, request: &TranslationRequest, target: &str) -> Result<TranslationResult, AdapterError> {
        let count = self.serve(Operation::Translate).await?;
        if let MockBehavior::Intermittent { fail_every } = self.behavior {
            if count % fail_every == fail_every - 1 {
                return Err(self.error(Operation::Translate, CanonicalError::TooManyRequests));
            }
        }

        let text = match self.custom_response {
            Some(generator) => generator(request),
            None => format!("[{}] {}", target, request.text),
        };
        Ok(TranslationResult {
            text,
            detected_source_language: request.source_language.clone(),
        })
    }
}

impl Clone for MockBackend {
    fn clone(&self) -> Self {
        Self {
            behavior: self.behavior,
            request_count: Arc::clone(&self.request_count),
            custom_response: self.custom_response,
            catalog: CatalogCache::new(),
        }
    }
}

#[async_trait]
impl TranslationBackend for MockBackend {
    fn provider(&self) -> TranslationProvider {
        TranslationProvider::Mock
    }

    fn capabilities(&self) -> ProviderCapabilities {
        CAPABILITIES
    }

    async fn detect_language(&self, text: &str) -> Result<String, AdapterError> {
        self.serve(Operation::DetectLanguage).await?;
        if self.behavior == MockBehavior::Empty || text.trim().is_empty() {
            return Err(self.error(Operation::DetectLanguage, CanonicalError::UnknownLanguage));
        }
        Ok("en".to_string())
    }

    async fn list_languages(&self) -> Result<LanguageCatalog, AdapterError> {
        self.serve(Operation::ListLanguages).await?;
        let catalog: LanguageCatalog =
            [("en", "English"), ("fr", "French"), ("de", "German")].into_iter().collect();
        self.catalog.replace(catalog.clone());
        Ok(catalog)
    }

    async fn translate(&self, request: &TranslationRequest) -> Result<TranslationResult, AdapterError> {
        let target = require_target(self.provider(), request)?;
        if let Some(source) = &request.source_language {
            if language_codes_match(source, target) {
                return Err(self.error(Operation::Translate, CanonicalError::EqualLanguages));
            }
        }

        let result = with_rate_limit_retry(&CAPABILITIES, Duration::ZERO, request.distorting, move || {
            self.translate_once(request, target)
        })
        .await?;

        finish_translation(self.provider(), result, request.distorting)
    }

    fn catalog(&self) -> LanguageCatalog {
        self.catalog.snapshot()
    }
}
