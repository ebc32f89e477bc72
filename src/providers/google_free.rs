use async_trait::async_trait;
use log::{debug, error};
use once_cell::sync::Lazy;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::app_config::{GoogleFreeConfig, RequestConfig, TranslationProvider};
use crate::catalog::{CatalogCache, LanguageCatalog};
use crate::classifier::{ProviderSignal, GOOGLE_FREE_SIGNALS};
use crate::errors::{AdapterError, CanonicalError, ConfigError, Operation};
use crate::executor::RequestExecutor;
use crate::language_utils::normalize_code;
use crate::providers::{
    finish_translation, require_target, resolve_source, send_with_retry, with_rate_limit_retry,
    ErrorContext, ProviderCapabilities, TranslationBackend, TranslationRequest, TranslationResult,
};
use crate::transport::{HttpRequest, HttpTransport};

const CAPABILITIES: ProviderCapabilities = ProviderCapabilities {
    auto_source_sentinel: Some(AUTO),
    rate_limit_retry: true,
};

const AUTO: &str = "auto";

/// Languages accepted by the web endpoint
const LANGUAGES: &[(&str, &str)] = &[
    ("af", "afrikaans"),
    ("sq", "albanian"),
    ("am", "amharic"),
    ("ar", "arabic"),
    ("hy", "armenian"),
    ("az", "azerbaijani"),
    ("eu", "basque"),
    ("be", "belarusian"),
    ("bn", "bengali"),
    ("bs", "bosnian"),
    ("bg", "bulgarian"),
    ("ca", "catalan"),
    ("ceb", "cebuano"),
    ("ny", "chichewa"),
    ("zh-cn", "chinese (simplified)"),
    ("zh-tw", "chinese (traditional)"),
    ("co", "corsican"),
    ("hr", "croatian"),
    ("cs", "czech"),
    ("da", "danish"),
    ("nl", "dutch"),
    ("en", "english"),
    ("eo", "esperanto"),
    ("et", "estonian"),
    ("tl", "filipino"),
    ("fi", "finnish"),
    ("fr", "french"),
    ("fy", "frisian"),
    ("gl", "galician"),
    ("ka", "georgian"),
    ("de", "german"),
    ("el", "greek"),
    ("gu", "gujarati"),
    ("ht", "haitian creole"),
    ("ha", "hausa"),
    ("haw", "hawaiian"),
    ("iw", "hebrew"),
    ("he", "hebrew"),
    ("hi", "hindi"),
    ("hmn", "hmong"),
    ("hu", "hungarian"),
    ("is", "icelandic"),
    ("ig", "igbo"),
    ("id", "indonesian"),
    ("ga", "irish"),
    ("it", "italian"),
    ("ja", "japanese"),
    ("jw", "javanese"),
    ("kn", "kannada"),
    ("kk", "kazakh"),
    ("km", "khmer"),
    ("ko", "korean"),
    ("ku", "kurdish (kurmanji)"),
    ("ky", "kyrgyz"),
    ("lo", "lao"),
    ("la", "latin"),
    ("lv", "latvian"),
    ("lt", "lithuanian"),
    ("lb", "luxembourgish"),
    ("mk", "macedonian"),
    ("mg", "malagasy"),
    ("ms", "malay"),
    ("ml", "malayalam"),
    ("mt", "maltese"),
    ("mi", "maori"),
    ("mr", "marathi"),
    ("mn", "mongolian"),
    ("my", "myanmar (burmese)"),
    ("ne", "nepali"),
    ("no", "norwegian"),
    ("or", "odia"),
    ("ps", "pashto"),
    ("fa", "persian"),
    ("pl", "polish"),
    ("pt", "portuguese"),
    ("pa", "punjabi"),
    ("ro", "romanian"),
    ("ru", "russian"),
    ("sm", "samoan"),
    ("gd", "scots gaelic"),
    ("sr", "serbian"),
    ("st", "sesotho"),
    ("sn", "shona"),
    ("sd", "sindhi"),
    ("si", "sinhala"),
    ("sk", "slovak"),
    ("sl", "slovenian"),
    ("so", "somali"),
    ("es", "spanish"),
    ("su", "sundanese"),
    ("sw", "swahili"),
    ("sv", "swedish"),
    ("tg", "tajik"),
    ("ta", "tamil"),
    ("te", "telugu"),
    ("th", "thai"),
    ("tr", "turkish"),
    ("uk", "ukrainian"),
    ("ur", "urdu"),
    ("ug", "uyghur"),
    ("uz", "uzbek"),
    ("vi", "vietnamese"),
    ("cy", "welsh"),
    ("xh", "xhosa"),
    ("yi", "yiddish"),
    ("yo", "yoruba"),
    ("zu", "zulu"),
];

/// Lowercase code or English name -> code
static LANGUAGE_INDEX: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut index = HashMap::with_capacity(LANGUAGES.len() * 2);
    for (code, name) in LANGUAGES {
        index.insert(*code, *code);
        index.entry(*name).or_insert(*code);
    }
    index
});

/// Resolve a code or language name accepted by the endpoint
pub fn resolve_language(code: &str) -> Option<&'static str> {
    let normalized = normalize_code(code).replace('_', "-");
    LANGUAGE_INDEX.get(normalized.as_str()).copied()
}

/// Catalog of the endpoint's languages
pub fn builtin_catalog() -> LanguageCatalog {
    LANGUAGES.iter().copied().collect()
}

/// Parsed `translate_a/single` answer
#[derive(Debug, Clone, PartialEq, Eq)]
struct WebTranslation {
    text: String,
    detected_language: Option<String>,
}

/// Response is nested arrays: `[[["Bonjour","hello",...],...], null, "en", ...]`
fn parse_web_response(body: &str) -> Option<WebTranslation> {
    let value: Value = serde_json::from_str(body).ok()?;
    let root = value.as_array()?;

    let text: String = root
        .first()
        .and_then(Value::as_array)
        .map(|sentences| {
            sentences
                .iter()
                .filter_map(|sentence| sentence.get(0).and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default();
    let detected_language = root
        .get(2)
        .and_then(Value::as_str)
        .map(str::to_lowercase)
        .filter(|code| !code.is_empty());

    Some(WebTranslation {
        text,
        detected_language,
    })
}

/// Backend for the unauthenticated Google web endpoint
#[derive(Debug)]
pub struct GoogleFreeTranslator {
    endpoint: String,
    transport: Arc<dyn HttpTransport>,
    executor: RequestExecutor,
    catalog: CatalogCache,
    cooldown: Duration,
}

impl GoogleFreeTranslator {
    pub fn new(
        config: &GoogleFreeConfig,
        request: &RequestConfig,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, ConfigError> {
        url::Url::parse(&config.endpoint)?;
        Ok(Self {
            endpoint: config.endpoint.clone(),
            transport,
            executor: RequestExecutor::from(request),
            catalog: CatalogCache::new(),
            cooldown: request.rate_limit_cooldown(),
        })
    }

    fn context(&self, operation: Operation) -> ErrorContext {
        ErrorContext::new(TranslationProvider::GoogleFree, operation, GOOGLE_FREE_SIGNALS)
    }

    /// One call to the endpoint
    async fn query(
        &self,
        operation: Operation,
        text: &str,
        target: &str,
        source: &str,
    ) -> Result<WebTranslation, AdapterError> {
        let context = self.context(operation);
        let request = HttpRequest::get(self.endpoint.clone()).query(&[
            ("client", "gtx"),
            ("sl", source),
            ("tl", target),
            ("dt", "t"),
            ("q", text),
        ]);

        let response = send_with_retry(&self.transport, &self.executor, request)
            .await
            .map_err(|e| context.executor(e))?;

        if !response.is_success() {
            return Err(context.classify(ProviderSignal::Status(response.status, &response.body)));
        }

        let translates_text = operation == Operation::Translate && !text.trim().is_empty();
        match parse_web_response(&response.body) {
            Some(answer) if translates_text && answer.text.is_empty() => {
                error!("GOOGLE_API_REJECT ({}): no translated sentences", operation);
                Err(context.classify(ProviderSignal::Message("malformed response")))
            }
            Some(answer) => Ok(answer),
            None => {
                error!("GOOGLE_API_REJECT ({})", operation);
                Err(context.classify(ProviderSignal::Message("malformed response")))
            }
        }
    }
}

#[async_trait]
impl TranslationBackend for GoogleFreeTranslator {
    fn provider(&self) -> TranslationProvider {
        TranslationProvider::GoogleFree
    }

    fn capabilities(&self) -> ProviderCapabilities {
        CAPABILITIES
    }

    async fn detect_language(&self, text: &str) -> Result<String, AdapterError> {
        let answer = self.query(Operation::DetectLanguage, text, "en", AUTO).await?;
        answer
            .detected_language
            .ok_or_else(|| self.context(Operation::DetectLanguage).error(CanonicalError::UnknownLanguage))
    }

    async fn list_languages(&self) -> Result<LanguageCatalog, AdapterError> {
        let catalog = builtin_catalog();
        debug!("Using built-in language list ({} entries)", catalog.len());
        self.catalog.replace(catalog.clone());
        Ok(catalog)
    }

    async fn translate(&self, request: &TranslationRequest) -> Result<TranslationResult, AdapterError> {
        let context = self.context(Operation::Translate);
        let target = require_target(self.provider(), request)?;
        let target = resolve_language(target)
            .ok_or_else(|| context.classify(ProviderSignal::Message("invalid destination language")))?;

        let source = match resolve_source(&CAPABILITIES, request) {
            Some(source) if source.eq_ignore_ascii_case(AUTO) => AUTO,
            Some(source) => resolve_language(source)
                .ok_or_else(|| context.classify(ProviderSignal::Message("invalid source language")))?,
            None => AUTO,
        };
        let text = request.text.as_str();

        let answer = with_rate_limit_retry(&CAPABILITIES, self.cooldown, request.distorting, move || {
            self.query(Operation::Translate, text, target, source)
        })
        .await?;

        let result = TranslationResult {
            text: answer.text,
            detected_source_language: answer.detected_language,
        };
        finish_translation(self.provider(), result, request.distorting)
    }

    fn catalog(&self) -> LanguageCatalog {
        self.catalog.snapshot()
    }
}
