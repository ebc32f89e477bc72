/*!
 * Tests for error types
 */

use interlayer::errors::{ConfigError, ExecutorError, TransportError};
use interlayer::{AdapterError, CanonicalError, LengthScope, Operation, TranslationProvider};

#[test]
fn test_canonical_error_display_withLengthScope_shouldNameScope() {
    assert_eq!(
        CanonicalError::TooLongMessage(LengthScope::Output).to_string(),
        "Message is too long (output)"
    );
    assert_eq!(CanonicalError::TimeoutExceeded.to_string(), "Timeout exceeded");
}

#[test]
fn test_adapter_error_withSignal_shouldKeepRawText() {
    let error = AdapterError::new(
        TranslationProvider::GoogleCloud,
        Operation::Translate,
        CanonicalError::BadTargetLanguage,
    )
    .with_signal("400 Target language is invalid.");

    assert_eq!(error.signal.as_deref(), Some("400 Target language is invalid."));
    assert!(!error.is_fatal());
    assert!(error.to_string().contains("googlecloud"));
}

#[test]
fn test_adapter_error_fatality_withEachOperation_shouldOnlyFlagSessionBreakers() {
    let recoverable = [
        (Operation::Translate, CanonicalError::TooManyRequests),
        (Operation::DetectLanguage, CanonicalError::UnknownLanguage),
        (Operation::Translate, CanonicalError::TimeoutExceeded),
    ];
    for (operation, kind) in recoverable {
        assert!(!AdapterError::new(TranslationProvider::Yandex, operation, kind).is_fatal());
    }

    let fatal = [
        (Operation::ListLanguages, CanonicalError::UnknownTranslationError),
        (Operation::Translate, CanonicalError::CredentialExchangeFailed),
        (Operation::Connect, CanonicalError::CredentialExchangeFailed),
    ];
    for (operation, kind) in fatal {
        assert!(AdapterError::new(TranslationProvider::Yandex, operation, kind).is_fatal());
    }
}

#[test]
fn test_executor_error_intoSignal_shouldSeparateTimeoutsFromTransportFailures() {
    assert_eq!(
        ExecutorError::TimeoutExceeded { attempts: 10 }.into_signal(),
        Err(CanonicalError::TimeoutExceeded)
    );
    let signal = ExecutorError::Transport(TransportError::Connection("refused".to_string()))
        .into_signal()
        .unwrap();
    assert!(signal.contains("refused"));
}

#[test]
fn test_config_error_fromAdapterError_shouldWrap() {
    let adapter = AdapterError::new(
        TranslationProvider::Yandex,
        Operation::Connect,
        CanonicalError::CredentialExchangeFailed,
    );
    let error: ConfigError = adapter.into();
    assert!(matches!(error, ConfigError::Adapter(_)));
}
