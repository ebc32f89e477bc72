/*!
 * Table-driven classification of provider error signals.
 *
 * Each backend owns a static [`SignalTable`] mapping its own vocabulary
 * (HTTP statuses, message fragments) to [`CanonicalError`]. Adding a backend
 * means adding a table here, nothing else.
 */

use crate::errors::{CanonicalError, LengthScope};

/// Raw failure signal reported by a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderSignal<'a> {
    /// Error text from a payload, status line or transport
    Message(&'a str),
    /// HTTP status together with whatever body text accompanied it
    Status(u16, &'a str),
}

impl ProviderSignal<'_> {
    fn text(&self) -> &str {
        match self {
            Self::Message(text) | Self::Status(_, text) => text,
        }
    }

    fn status(&self) -> Option<u16> {
        match self {
            Self::Message(_) => None,
            Self::Status(code, _) => Some(*code),
        }
    }
}

/// How a table rule recognises a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalPattern {
    /// Case-insensitive substring of the signal text
    Contains(&'static str),
    /// Exact HTTP status
    Status(u16),
}

impl SignalPattern {
    fn matches(&self, signal: &ProviderSignal<'_>, lowered: &str) -> bool {
        match self {
            Self::Contains(fragment) => lowered.contains(&fragment.to_lowercase()),
            Self::Status(code) => signal.status() == Some(*code),
        }
    }
}

/// Ordered rules; the first match wins
pub type SignalTable = &'static [(SignalPattern, CanonicalError)];

/// Classify with `UnknownTranslationError` as the default
pub fn classify(table: SignalTable, signal: ProviderSignal<'_>) -> CanonicalError {
    classify_or(table, signal, CanonicalError::UnknownTranslationError)
}

/// Classify with an operation-specific default for unrecognised signals
pub fn classify_or(
    table: SignalTable,
    signal: ProviderSignal<'_>,
    fallback: CanonicalError,
) -> CanonicalError {
    let lowered = signal.text().to_lowercase();
    table
        .iter()
        .find(|(pattern, _)| pattern.matches(&signal, &lowered))
        .map(|(_, kind)| *kind)
        .unwrap_or(fallback)
}

/// Signal vocabulary of Google Cloud Translation v3
pub static GOOGLE_CLOUD_SIGNALS: SignalTable = &[
    (SignalPattern::Contains("target language is invalid"), CanonicalError::BadTargetLanguage),
    (
        SignalPattern::Contains("target language can't be equal to source language"),
        CanonicalError::EqualLanguages,
    ),
    (SignalPattern::Contains("source language is invalid"), CanonicalError::BadSourceLanguage),
    (SignalPattern::Contains("text is too long"), CanonicalError::TooLongMessage(LengthScope::Input)),
    (SignalPattern::Contains("too many characters"), CanonicalError::TooLongMessage(LengthScope::Input)),
    (SignalPattern::Status(429), CanonicalError::TooManyRequests),
    (SignalPattern::Contains("resource_exhausted"), CanonicalError::TooManyRequests),
    (SignalPattern::Contains("quota exceeded"), CanonicalError::TooManyRequests),
];

/// Signal vocabulary of the unauthenticated Google web endpoint
pub static GOOGLE_FREE_SIGNALS: SignalTable = &[
    (SignalPattern::Contains("invalid destination language"), CanonicalError::BadTargetLanguage),
    (SignalPattern::Contains("invalid source language"), CanonicalError::BadSourceLanguage),
    (SignalPattern::Status(429), CanonicalError::TooManyRequests),
    (SignalPattern::Status(503), CanonicalError::TooManyRequests),
    (SignalPattern::Contains("unusual traffic"), CanonicalError::TooManyRequests),
    // An unparseable body means the endpoint served a captcha page instead of JSON
    (SignalPattern::Contains("malformed response"), CanonicalError::TooManyRequests),
];

/// Signal vocabulary of Yandex Cloud Translate v2
pub static YANDEX_SIGNALS: SignalTable = &[
    (SignalPattern::Contains("unsupported target_language_code"), CanonicalError::BadTargetLanguage),
    (SignalPattern::Contains("unsupported source_language_code"), CanonicalError::BadSourceLanguage),
    (
        SignalPattern::Contains("text length must be not greater than"),
        CanonicalError::TooLongMessage(LengthScope::Input),
    ),
    (SignalPattern::Status(429), CanonicalError::TooManyRequests),
    (SignalPattern::Contains("limit on units"), CanonicalError::TooManyRequests),
];
