/*!
 * Integration tests for the Google Cloud Translation v3 backend
 */

use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use std::sync::Arc;
use tempfile::TempDir;

use interlayer::errors::{ConfigError, TransportError};
use interlayer::providers::google_cloud::GoogleCloudTranslator;
use interlayer::transport::Method;
use interlayer::{
    connect_backend_with, CanonicalError, TranslationBackend, TranslationProvider,
    TranslationRequest,
};

use crate::common::mock_transport::ScriptedTransport;
use crate::common::{
    create_key_file, create_service_account_key_file, create_temp_dir, create_test_file,
    fast_request_config, google_cloud_config, init_logging, test_config, ManualClock,
    SERVICE_ACCOUNT_PUBLIC_KEY,
};

const TOKEN: &str = "oauth.test/token";
const TRANSLATE: &str = ":translateText";
const DETECT: &str = ":detectLanguage";
const LANGUAGES: &str = "/supportedLanguages";

const TOKEN_OK: &str = r#"{"access_token":"ya29.first","expires_in":3599,"token_type":"Bearer"}"#;

fn backend(dir: &TempDir, transport: &Arc<ScriptedTransport>) -> GoogleCloudTranslator {
    init_logging();
    let config = google_cloud_config(create_key_file(dir).unwrap());
    GoogleCloudTranslator::new(&config, &fast_request_config(), transport.clone()).unwrap()
}

fn google_error(code: u16, message: &str, status: &str) -> String {
    format!(
        r#"{{"error":{{"code":{},"message":"{}","status":"{}"}}}}"#,
        code, message, status
    )
}

#[tokio::test]
async fn test_translate_withKeyFile_shouldCallProjectEndpointWithToken() {
    let dir = create_temp_dir().unwrap();
    let transport = Arc::new(
        ScriptedTransport::new()
            .on_json(TOKEN, 200, TOKEN_OK)
            .on_json(
                TRANSLATE,
                200,
                r#"{"translations":[{"translatedText":"Bonjour","detectedLanguageCode":"en"}]}"#,
            ),
    );
    let backend = backend(&dir, &transport);
    assert_eq!(backend.project(), "demo-project");

    let result = backend.translate(&TranslationRequest::new("Hello", "fr")).await.unwrap();
    assert_eq!(result.text, "Bonjour");
    assert_eq!(result.detected_source_language.as_deref(), Some("en"));

    let sent = transport.requests().into_iter().find(|r| r.url.contains(TRANSLATE)).unwrap();
    assert_eq!(sent.url, "https://translation.test/v3/projects/demo-project:translateText");
    assert_eq!(sent.header("Authorization"), Some("Bearer ya29.first"));
    assert_eq!(sent.header("x-goog-user-project"), Some("demo-project"));
    let body = sent.json_body().unwrap();
    assert_eq!(body["contents"][0], "Hello");
    assert_eq!(body["targetLanguageCode"], "fr");
    assert!(body.get("sourceLanguageCode").is_none());
}

#[tokio::test]
async fn test_translate_withApiErrors_shouldClassifyGoogleMessages() {
    let dir = create_temp_dir().unwrap();
    let transport = Arc::new(
        ScriptedTransport::new()
            .on_json(TOKEN, 200, TOKEN_OK)
            .on_json(TRANSLATE, 400, &google_error(400, "Target language is invalid.", "INVALID_ARGUMENT"))
            .on_json(
                TRANSLATE,
                400,
                &google_error(400, "Target language can't be equal to source language.", "INVALID_ARGUMENT"),
            )
            .on_json(TRANSLATE, 429, &google_error(429, "Quota exceeded", "RESOURCE_EXHAUSTED")),
    );
    let backend = backend(&dir, &transport);

    let error = backend.translate(&TranslationRequest::new("Hello", "xx")).await.unwrap_err();
    assert_eq!(error.kind, CanonicalError::BadTargetLanguage);
    let signal = error.signal.unwrap();
    assert!(signal.contains("Target language is invalid. INVALID_ARGUMENT"), "signal: {}", signal);

    let request = TranslationRequest::new("Hello", "en").source("en");
    let error = backend.translate(&request).await.unwrap_err();
    assert_eq!(error.kind, CanonicalError::EqualLanguages);

    // Rate limits are not retried by this provider, even when distorting
    let request = TranslationRequest::new("Hello", "fr").distorting(true);
    let error = backend.translate(&request).await.unwrap_err();
    assert_eq!(error.kind, CanonicalError::TooManyRequests);
    assert_eq!(transport.calls_to(TRANSLATE), 3);
}

#[tokio::test]
async fn test_detect_withUndeterminedLanguage_shouldReportUnknownLanguage() {
    let dir = create_temp_dir().unwrap();
    let transport = Arc::new(
        ScriptedTransport::new()
            .on_json(TOKEN, 200, TOKEN_OK)
            .on_json(DETECT, 200, r#"{"languages":[{"languageCode":"de","confidence":0.98}]}"#)
            .on_json(DETECT, 200, r#"{"languages":[{"languageCode":"und","confidence":0}]}"#),
    );
    let backend = backend(&dir, &transport);

    assert_eq!(backend.detect_language("Guten Tag").await.unwrap(), "de");
    let error = backend.detect_language("").await.unwrap_err();
    assert_eq!(error.kind, CanonicalError::UnknownLanguage);
}

#[tokio::test]
async fn test_detect_withUnrecognisedFailure_shouldReportDetectionFailed() {
    let dir = create_temp_dir().unwrap();
    let transport = Arc::new(
        ScriptedTransport::new()
            .on_json(TOKEN, 200, TOKEN_OK)
            .on_json(DETECT, 500, &google_error(500, "Internal error encountered.", "INTERNAL")),
    );
    let backend = backend(&dir, &transport);

    let error = backend.detect_language("Guten Tag").await.unwrap_err();
    assert_eq!(error.kind, CanonicalError::LanguageDetectionFailed);
    assert!(!error.is_fatal());
}

#[tokio::test]
async fn test_list_languages_withDisplayNames_shouldBuildCatalog() {
    let dir = create_temp_dir().unwrap();
    let transport = Arc::new(
        ScriptedTransport::new()
            .on_json(TOKEN, 200, TOKEN_OK)
            .on_json(
                LANGUAGES,
                200,
                r#"{"languages":[
                    {"languageCode":"en","displayName":"English","supportSource":true,"supportTarget":true},
                    {"languageCode":"zh-TW","displayName":"Chinese (Traditional)"},
                    {"languageCode":"haw"}
                ]}"#,
            )
            .on_json(LANGUAGES, 503, &google_error(503, "The service is currently unavailable.", "UNAVAILABLE")),
    );
    let backend = backend(&dir, &transport);

    let catalog = backend.list_languages().await.unwrap();
    assert_eq!(catalog.len(), 3);
    assert_eq!(catalog.display_name("zh-TW"), Some("Chinese (Traditional)"));
    assert_eq!(catalog.display_name("haw"), Some("Hawaiian"));

    let sent = transport.requests().into_iter().find(|r| r.url.contains(LANGUAGES)).unwrap();
    assert_eq!(sent.method, Method::Get);
    assert!(sent.query.contains(&("displayLanguageCode".to_string(), "en".to_string())));

    let error = backend.list_languages().await.unwrap_err();
    assert!(error.is_fatal());
    assert_eq!(backend.catalog(), catalog);
}

#[tokio::test]
async fn test_credentials_withManualClock_shouldRefreshAfterValidityWindow() {
    let dir = create_temp_dir().unwrap();
    let transport = Arc::new(
        ScriptedTransport::new()
            .on_json(TOKEN, 200, TOKEN_OK)
            .on_json(TOKEN, 200, r#"{"access_token":"ya29.second","expires_in":3599}"#)
            .on_json(DETECT, 200, r#"{"languages":[{"languageCode":"en"}]}"#),
    );
    let clock = ManualClock::starting_at(0);
    let backend = backend(&dir, &transport).with_clock(clock.clone());

    backend.detect_language("hello").await.unwrap();
    clock.advance(3600);
    backend.detect_language("hello").await.unwrap();
    assert_eq!(transport.calls_to(TOKEN), 1);

    clock.advance(1);
    backend.detect_language("hello").await.unwrap();
    assert_eq!(transport.calls_to(TOKEN), 2);

    let last = transport.requests().into_iter().rfind(|r| r.url.contains(DETECT)).unwrap();
    assert_eq!(last.header("Authorization"), Some("Bearer ya29.second"));
}

#[tokio::test]
async fn test_connect_withRevokedRefreshToken_shouldFailFatally() {
    init_logging();
    let dir = create_temp_dir().unwrap();
    let transport = Arc::new(ScriptedTransport::new().on_json(
        TOKEN,
        400,
        r#"{"error":"invalid_grant","error_description":"Token has been expired or revoked."}"#,
    ));
    let mut config = test_config(TranslationProvider::GoogleCloud);
    config.google_cloud = google_cloud_config(create_key_file(&dir).unwrap());

    let error = connect_backend_with(&config, transport.clone()).await.unwrap_err();

    match error {
        ConfigError::Adapter(e) => {
            assert_eq!(e.kind, CanonicalError::CredentialExchangeFailed);
            assert!(e.signal.unwrap().contains("invalid_grant"));
        }
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(transport.calls_to(TOKEN), 1);
}

#[tokio::test]
async fn test_connect_withTimingOutTokenEndpoint_shouldStopAfterTenAttempts() {
    init_logging();
    let dir = create_temp_dir().unwrap();
    let transport = Arc::new(ScriptedTransport::new().on(TOKEN, Err(TransportError::Timeout)));
    let mut config = test_config(TranslationProvider::GoogleCloud);
    config.google_cloud = google_cloud_config(create_key_file(&dir).unwrap());

    let result = connect_backend_with(&config, transport.clone()).await;

    assert!(matches!(result, Err(ConfigError::Adapter(_))));
    assert_eq!(transport.calls_to(TOKEN), 10);
}

#[tokio::test]
async fn test_connect_withMissingKeyFile_shouldFailBeforeAnyRequest() {
    init_logging();
    let dir = create_temp_dir().unwrap();
    let transport = Arc::new(ScriptedTransport::new());
    let mut config = test_config(TranslationProvider::GoogleCloud);
    config.google_cloud = google_cloud_config(dir.path().join("missing.json"));

    let result = connect_backend_with(&config, transport.clone()).await;

    assert!(matches!(result, Err(ConfigError::CredentialFileMissing(_))));
    assert_eq!(transport.call_count(), 0);
}

#[derive(Debug, Deserialize)]
struct AssertionClaims {
    iss: String,
    scope: String,
}

#[tokio::test]
async fn test_connect_withServiceAccountKey_shouldSignAssertionAndTranslate() {
    init_logging();
    let dir = create_temp_dir().unwrap();
    let key = create_service_account_key_file(&dir).unwrap();
    let transport = Arc::new(
        ScriptedTransport::new()
            .on_json(TOKEN, 200, r#"{"access_token":"ya29.service","expires_in":3599,"token_type":"Bearer"}"#)
            .on_json(TRANSLATE, 200, r#"{"translations":[{"translatedText":"Bonjour le monde"}]}"#),
    );
    let mut config = test_config(TranslationProvider::GoogleCloud);
    config.google_cloud = google_cloud_config(key);
    config.google_cloud.token_endpoint = "https://unused.test/token".to_string();

    let backend = connect_backend_with(&config, transport.clone()).await.unwrap();
    let result = backend.translate(&TranslationRequest::new("Hello world", "fr")).await.unwrap();
    assert_eq!(result.text, "Bonjour le monde");

    let exchange = transport.requests().into_iter().find(|r| r.url.contains(TOKEN)).unwrap();
    assert_eq!(exchange.url, "https://oauth.test/token");
    assert_eq!(
        exchange.form_field("grant_type"),
        Some("urn:ietf:params:oauth:grant-type:jwt-bearer")
    );
    let assertion = exchange.form_field("assertion").unwrap();
    let mut validation = Validation::new(Algorithm::RS256);
    validation.set_audience(&["https://oauth.test/token"]);
    let claims = jsonwebtoken::decode::<AssertionClaims>(
        assertion,
        &DecodingKey::from_rsa_pem(SERVICE_ACCOUNT_PUBLIC_KEY.as_bytes()).unwrap(),
        &validation,
    )
    .unwrap()
    .claims;
    assert_eq!(claims.iss, "translator@polyglot-123.iam.gserviceaccount.com");
    assert_eq!(claims.scope, "https://www.googleapis.com/auth/cloud-platform");

    let sent = transport.requests().into_iter().find(|r| r.url.contains(TRANSLATE)).unwrap();
    assert_eq!(sent.url, "https://translation.test/v3/projects/polyglot-123:translateText");
    assert_eq!(sent.header("Authorization"), Some("Bearer ya29.service"));
    assert_eq!(sent.header("x-goog-user-project"), None);
    assert_eq!(transport.calls_to(TOKEN), 1);
}

#[tokio::test]
async fn test_connect_withUnsupportedKeyType_shouldBeRejected() {
    init_logging();
    let dir = create_temp_dir().unwrap();
    let key = create_test_file(&dir, "ext.json", r#"{"type":"external_account","project_id":"p"}"#).unwrap();
    let transport = Arc::new(ScriptedTransport::new());

    let result = GoogleCloudTranslator::new(&google_cloud_config(key), &fast_request_config(), transport.clone());

    assert!(matches!(result, Err(ConfigError::UnsupportedCredential(_))));
    assert_eq!(transport.call_count(), 0);
}
