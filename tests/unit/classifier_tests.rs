/*!
 * Tests for provider signal classification
 */

use interlayer::classifier::{
    classify, classify_or, ProviderSignal, GOOGLE_CLOUD_SIGNALS, GOOGLE_FREE_SIGNALS,
    YANDEX_SIGNALS,
};
use interlayer::{CanonicalError, LengthScope};

#[test]
fn test_google_cloud_signals_withKnownMessages_shouldMapToCanonicalKinds() {
    let cases = [
        ("400 Target language is invalid. INVALID_ARGUMENT", CanonicalError::BadTargetLanguage),
        ("400 Source language is invalid. INVALID_ARGUMENT", CanonicalError::BadSourceLanguage),
        (
            "400 Target language can't be equal to source language. INVALID_ARGUMENT",
            CanonicalError::EqualLanguages,
        ),
        ("400 Text is too long. INVALID_ARGUMENT", CanonicalError::TooLongMessage(LengthScope::Input)),
        ("403 Quota exceeded for quota metric", CanonicalError::TooManyRequests),
    ];

    for (message, expected) in cases {
        assert_eq!(
            classify(GOOGLE_CLOUD_SIGNALS, ProviderSignal::Status(400, message)),
            expected,
            "message: {}",
            message
        );
    }
}

#[test]
fn test_google_free_signals_withThrottling_shouldReportTooManyRequests() {
    assert_eq!(
        classify(GOOGLE_FREE_SIGNALS, ProviderSignal::Status(429, "")),
        CanonicalError::TooManyRequests
    );
    assert_eq!(
        classify(GOOGLE_FREE_SIGNALS, ProviderSignal::Status(200, "Our systems have detected unusual traffic")),
        CanonicalError::TooManyRequests
    );
    assert_eq!(
        classify(GOOGLE_FREE_SIGNALS, ProviderSignal::Message("invalid destination language")),
        CanonicalError::BadTargetLanguage
    );
}

#[test]
fn test_yandex_signals_withApiMessages_shouldMapToCanonicalKinds() {
    assert_eq!(
        classify(YANDEX_SIGNALS, ProviderSignal::Status(400, "unsupported target_language_code: xx")),
        CanonicalError::BadTargetLanguage
    );
    assert_eq!(
        classify(YANDEX_SIGNALS, ProviderSignal::Status(400, "unsupported source_language_code: yy")),
        CanonicalError::BadSourceLanguage
    );
    assert_eq!(
        classify(YANDEX_SIGNALS, ProviderSignal::Status(400, "Text length must be not greater than 10000")),
        CanonicalError::TooLongMessage(LengthScope::Input)
    );
    assert_eq!(
        classify(YANDEX_SIGNALS, ProviderSignal::Status(429, "limit on units was exceeded")),
        CanonicalError::TooManyRequests
    );
}

#[test]
fn test_unrecognised_signals_withEachTable_shouldFallBack() {
    for table in [GOOGLE_CLOUD_SIGNALS, GOOGLE_FREE_SIGNALS, YANDEX_SIGNALS] {
        assert_eq!(
            classify(table, ProviderSignal::Status(500, "backend exploded")),
            CanonicalError::UnknownTranslationError
        );
        assert_eq!(
            classify_or(table, ProviderSignal::Message("???"), CanonicalError::LanguageDetectionFailed),
            CanonicalError::LanguageDetectionFailed
        );
    }
}
