/*!
 * Error types for the interlayer library.
 *
 * Every backend normalises its failures into [`CanonicalError`]. The other
 * types describe failures of the layers underneath (transport, executor,
 * credentials) and of initialisation.
 */

use std::fmt;
use thiserror::Error;

use crate::app_config::TranslationProvider;

/// Which side of a translation exceeded a length ceiling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LengthScope {
    /// The provider rejected the input text
    Input,
    /// The translated text is longer than the caller allows
    Output,
}

impl fmt::Display for LengthScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input => write!(f, "input"),
            Self::Output => write!(f, "output"),
        }
    }
}

/// Canonical error taxonomy shared by all backends
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalError {
    #[error("Target language is not supported")]
    BadTargetLanguage,

    #[error("Source language is not supported")]
    BadSourceLanguage,

    #[error("Source and target languages are equal")]
    EqualLanguages,

    #[error("Too many requests")]
    TooManyRequests,

    #[error("Message is too long ({0})")]
    TooLongMessage(LengthScope),

    #[error("Unknown translation error")]
    UnknownTranslationError,

    #[error("Language detection failed")]
    LanguageDetectionFailed,

    #[error("Language could not be determined")]
    UnknownLanguage,

    #[error("Credential exchange failed")]
    CredentialExchangeFailed,

    #[error("Timeout exceeded")]
    TimeoutExceeded,
}

/// Backend operation an error originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Connect,
    DetectLanguage,
    ListLanguages,
    Translate,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connect => "connect",
            Self::DetectLanguage => "detect_language",
            Self::ListLanguages => "list_languages",
            Self::Translate => "translate",
        };
        write!(f, "{}", name)
    }
}

/// A classified failure of a backend operation
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{provider} {operation} failed: {kind}")]
pub struct AdapterError {
    /// Provider the adapter talks to
    pub provider: TranslationProvider,
    /// Operation that failed
    pub operation: Operation,
    /// Canonical classification
    pub kind: CanonicalError,
    /// Raw provider signal, kept for diagnosis
    pub signal: Option<String>,
}

impl AdapterError {
    pub fn new(provider: TranslationProvider, operation: Operation, kind: CanonicalError) -> Self {
        Self {
            provider,
            operation,
            kind,
            signal: None,
        }
    }

    /// Attach the raw provider signal
    pub fn with_signal(mut self, signal: impl Into<String>) -> Self {
        self.signal = Some(signal.into());
        self
    }

    /// Whether the session cannot continue after this error.
    ///
    /// Credential exchange failures and catalog refresh failures leave the
    /// adapter unusable; the calling layer is expected to end the session.
    pub fn is_fatal(&self) -> bool {
        self.kind == CanonicalError::CredentialExchangeFailed
            || self.operation == Operation::ListLanguages
            || self.operation == Operation::Connect
    }
}

/// Errors raised by an HTTP transport
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The attempt did not complete within its timeout
    #[error("Request timed out")]
    Timeout,

    /// Any other failure to get a response
    #[error("Connection error: {0}")]
    Connection(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else {
            Self::Connection(error.to_string())
        }
    }
}

/// Errors returned by the request executor
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutorError {
    /// Every attempt timed out
    #[error("Timeout exceeded after {attempts} attempts")]
    TimeoutExceeded { attempts: u32 },

    /// A non-transient failure, not retried
    #[error(transparent)]
    Transport(TransportError),
}

impl ExecutorError {
    /// Canonical kind plus the signal worth classifying, if any
    pub fn into_signal(self) -> Result<String, CanonicalError> {
        match self {
            Self::TimeoutExceeded { .. } => Err(CanonicalError::TimeoutExceeded),
            Self::Transport(e) => Ok(e.to_string()),
        }
    }
}

/// Errors from the credential manager
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    /// The exchange endpoint answered with an error or could not be reached
    #[error("Credential exchange failed: {0}")]
    ExchangeFailed(String),

    /// A previous exchange failed; the manager will not try again
    #[error("Credentials are unusable after an earlier failure: {0}")]
    Failed(String),
}

/// Errors raised while building an adapter from configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Credential file not found: {0}")]
    CredentialFileMissing(String),

    #[error("Credential file is unreadable: {0}")]
    CredentialFileInvalid(String),

    #[error("Unsupported credential type: {0}")]
    UnsupportedCredential(String),

    #[error("Missing configuration value: {0}")]
    Missing(&'static str),

    #[error("Invalid endpoint: {0}")]
    Endpoint(#[from] url::ParseError),

    #[error(transparent)]
    Adapter(#[from] AdapterError),
}

impl From<std::io::Error> for ConfigError {
    fn from(error: std::io::Error) -> Self {
        Self::CredentialFileInvalid(error.to_string())
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(error: serde_json::Error) -> Self {
        Self::CredentialFileInvalid(error.to_string())
    }
}
