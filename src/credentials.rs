/*!
 * Credential lifecycle for token-exchange providers.
 *
 * A long-lived secret is exchanged for a short-lived derived token which is
 * valid for [`TOKEN_VALIDITY_SECS`] after issue. [`CredentialManager`]
 * refreshes it on demand and serialises refreshes behind one async mutex.
 * A failed exchange is terminal for the manager.
 */

use log::{error, info};
use std::fmt::Debug;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::errors::CredentialError;
use crate::executor::RequestExecutor;
use crate::transport::{HttpRequest, HttpResponse, HttpTransport};

/// Lifetime of a derived token in seconds
pub const TOKEN_VALIDITY_SECS: i64 = 3600;

/// Source of the current time in unix seconds
pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> i64;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Provider-specific exchange of a long-lived secret for a derived token
pub trait TokenExchange: Send + Sync + Debug {
    /// Short label for log lines
    fn name(&self) -> &str;

    /// The call to the provider's credential endpoint, or why it cannot be built
    fn exchange_request(&self) -> Result<HttpRequest, String>;

    /// Extract the derived token, or the provider's error message
    fn parse_response(&self, response: &HttpResponse) -> Result<String, String>;

    /// Headers attached to every authenticated request
    fn auth_headers(&self, token: &str) -> Vec<(String, String)> {
        vec![("Authorization".to_string(), format!("Bearer {}", token))]
    }
}

/// Observable state of a [`CredentialManager`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialStatus {
    Uninitialized,
    Valid,
    Expired,
    Failed,
}

#[derive(Debug)]
enum CredentialState {
    Uninitialized,
    Issued {
        issued_at: i64,
        headers: Vec<(String, String)>,
    },
    Failed(String),
}

/// Holds the derived token of one adapter and refreshes it when stale
#[derive(Debug)]
pub struct CredentialManager {
    exchange: Box<dyn TokenExchange>,
    transport: Arc<dyn HttpTransport>,
    executor: RequestExecutor,
    clock: Arc<dyn Clock>,
    state: Mutex<CredentialState>,
}

impl CredentialManager {
    pub fn new(
        exchange: Box<dyn TokenExchange>,
        transport: Arc<dyn HttpTransport>,
        executor: RequestExecutor,
    ) -> Self {
        Self {
            exchange,
            transport,
            executor,
            clock: Arc::new(SystemClock),
            state: Mutex::new(CredentialState::Uninitialized),
        }
    }

    /// Replace the clock used for the validity window
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub async fn status(&self) -> CredentialStatus {
        let state = self.state.lock().await;
        match &*state {
            CredentialState::Uninitialized => CredentialStatus::Uninitialized,
            CredentialState::Failed(_) => CredentialStatus::Failed,
            CredentialState::Issued { issued_at, .. } => {
                if self.is_expired(*issued_at) {
                    CredentialStatus::Expired
                } else {
                    CredentialStatus::Valid
                }
            }
        }
    }

    /// Issue time of the current derived token
    pub async fn issued_at(&self) -> Option<i64> {
        match &*self.state.lock().await {
            CredentialState::Issued { issued_at, .. } => Some(*issued_at),
            _ => None,
        }
    }

    /// Return auth headers for a valid token, exchanging first if needed.
    ///
    /// The lock is held across the exchange so concurrent callers wait for a
    /// single refresh instead of racing their own.
    pub async fn ensure_valid(&self) -> Result<Vec<(String, String)>, CredentialError> {
        let mut state = self.state.lock().await;

        match &*state {
            CredentialState::Failed(reason) => {
                return Err(CredentialError::Failed(reason.clone()));
            }
            CredentialState::Issued { issued_at, headers } if !self.is_expired(*issued_at) => {
                return Ok(headers.clone());
            }
            _ => {}
        }

        match self.exchange().await {
            Ok(token) => {
                let headers = self.exchange.auth_headers(&token);
                *state = CredentialState::Issued {
                    issued_at: self.clock.now(),
                    headers: headers.clone(),
                };
                info!("{} token updated successfully", self.exchange.name());
                Ok(headers)
            }
            Err(reason) => {
                error!("{} token wasn't updated successfully: {}", self.exchange.name(), reason);
                *state = CredentialState::Failed(reason.clone());
                Err(CredentialError::ExchangeFailed(reason))
            }
        }
    }

    fn is_expired(&self, issued_at: i64) -> bool {
        self.clock.now() - issued_at > TOKEN_VALIDITY_SECS
    }

    async fn exchange(&self) -> Result<String, String> {
        let request = self
            .exchange
            .exchange_request()?
            .timeout(self.executor.attempt_timeout());
        let transport = &self.transport;

        let response = self
            .executor
            .execute(move || transport.send(request.clone()))
            .await
            .map_err(|e| e.to_string())?;

        self.exchange.parse_response(&response)
    }
}
