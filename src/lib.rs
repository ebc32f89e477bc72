/*!
 * # Interlayer - interchangeable translation backends
 *
 * A Rust library that lets an application translate text and detect
 * languages without depending on any one provider's semantics.
 *
 * ## Features
 *
 * - One `TranslationBackend` trait implemented by:
 *   - Google Cloud Translation v3 (OAuth access tokens)
 *   - the unauthenticated Google web endpoint
 *   - Yandex Cloud Translate v2 (IAM token exchange)
 * - Derived-token refresh with a fixed validity window
 * - Bounded retry of timed-out requests
 * - Table-driven classification of provider errors into one taxonomy
 * - Per-session language catalog cache
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `classifier`: Provider signal tables and classification
 * - `credentials`: Token exchange and refresh
 * - `executor`: Timeout-only bounded retry
 * - `transport`: HTTP seam with a `reqwest` implementation
 * - `catalog`: Language catalog cache
 * - `providers`: Backend adapters:
 *   - `providers::google_cloud`: Google Cloud Translation v3
 *   - `providers::google_free`: Google web endpoint
 *   - `providers::yandex`: Yandex Cloud Translate v2
 *   - `providers::mock`: Mock backend for tests
 * - `language_utils`: ISO language code utilities
 * - `errors`: Error types for the library
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod catalog;
pub mod classifier;
pub mod credentials;
pub mod errors;
pub mod executor;
pub mod language_utils;
pub mod providers;
pub mod transport;

// Re-export main types for easier usage
pub use app_config::{Config, TranslationProvider};
pub use catalog::LanguageCatalog;
pub use errors::{AdapterError, CanonicalError, ConfigError, LengthScope, Operation};
pub use providers::{
    connect_backend, connect_backend_with, TranslationBackend, TranslationRequest,
    TranslationResult,
};
