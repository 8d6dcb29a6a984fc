//! Bearer token broker for the IGDB client-credentials flow.
//!
//! The broker has two states. It starts **Unauthenticated** and moves to
//! **Authenticated** the first time a token is needed, by exchanging the
//! configured client id and secret at the identity endpoint. A pre-provisioned
//! static token starts it Authenticated and the identity endpoint is never
//! contacted.
//!
//! Tokens are held in memory only and are never refreshed: the exchange's
//! `expires_in` is ignored and a token rejected by the games API keeps being
//! reused until the process restarts.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Deserialize;

use crate::config::CredentialsConfig;
use crate::errors::CatalogError;
use crate::types::CatalogSource;

/// Source of the current time for credential bookkeeping.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Returns the current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually advanced clock for deterministic tests.
///
/// Time only moves when [`ManualClock::advance`] is called.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Creates a clock frozen at `start`.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// Token held by the broker once authenticated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedCredential {
    /// Opaque bearer token
    pub token: String,
    /// When the token was obtained or installed
    pub obtained_at: DateTime<Utc>,
}

impl CachedCredential {
    /// How long the token has been held, as seen by `clock`.
    pub fn age(&self, clock: &dyn Clock) -> chrono::Duration {
        clock.now() - self.obtained_at
    }
}

/// Broker lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokerState {
    /// No token cached yet.
    Unauthenticated,
    /// A token is cached and will be reused.
    Authenticated,
}

/// How the broker obtains its token.
#[derive(Clone)]
pub enum TokenGrant {
    /// Pre-provisioned bearer token.
    Static(String),
    /// OAuth2 client-credentials exchange with this secret.
    ClientCredentials {
        /// Client secret paired with the broker's client id
        client_secret: String,
    },
}

impl fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenGrant::Static(_) => f.write_str("Static(<redacted>)"),
            TokenGrant::ClientCredentials { .. } => f.write_str("ClientCredentials(<redacted>)"),
        }
    }
}

impl TokenGrant {
    /// Picks the grant from configuration; a static token wins over a secret.
    pub fn from_config(credentials: &CredentialsConfig) -> Option<Self> {
        if let Some(token) = &credentials.igdb_access_token {
            return Some(TokenGrant::Static(token.clone()));
        }
        credentials
            .igdb_client_secret
            .as_ref()
            .map(|secret| TokenGrant::ClientCredentials {
                client_secret: secret.clone(),
            })
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

/// Obtains and caches the IGDB bearer token.
#[derive(Debug)]
pub struct CredentialBroker {
    http: reqwest::Client,
    token_url: String,
    client_id: String,
    grant: TokenGrant,
    clock: Arc<dyn Clock>,
    cached: RwLock<Option<CachedCredential>>,
}

impl CredentialBroker {
    /// Creates a broker using wall-clock time.
    pub fn new(
        http: reqwest::Client,
        token_url: impl Into<String>,
        client_id: impl Into<String>,
        grant: TokenGrant,
    ) -> Self {
        Self::with_clock(http, token_url, client_id, grant, Arc::new(SystemClock))
    }

    /// Creates a broker with an injected clock.
    pub fn with_clock(
        http: reqwest::Client,
        token_url: impl Into<String>,
        client_id: impl Into<String>,
        grant: TokenGrant,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let cached = match &grant {
            TokenGrant::Static(token) => Some(CachedCredential {
                token: token.clone(),
                obtained_at: clock.now(),
            }),
            TokenGrant::ClientCredentials { .. } => None,
        };

        Self {
            http,
            token_url: token_url.into(),
            client_id: client_id.into(),
            grant,
            clock,
            cached: RwLock::new(cached),
        }
    }

    /// Installs a credential as if it had been obtained earlier.
    ///
    /// Lets tests start from an old, possibly revoked, token.
    pub fn seed(&self, credential: CachedCredential) {
        *self.cached.write() = Some(credential);
    }

    /// Client id sent alongside the bearer token.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Current lifecycle state.
    pub fn state(&self) -> BrokerState {
        if self.cached.read().is_some() {
            BrokerState::Authenticated
        } else {
            BrokerState::Unauthenticated
        }
    }

    /// Snapshot of the cached credential, if any.
    pub fn cached(&self) -> Option<CachedCredential> {
        self.cached.read().clone()
    }

    /// Age of the cached credential according to the broker's clock.
    pub fn token_age(&self) -> Option<chrono::Duration> {
        self.cached().map(|credential| credential.age(self.clock.as_ref()))
    }

    /// Returns the cached token, exchanging client credentials on first use.
    ///
    /// Concurrent first callers may each perform an exchange; the last one to
    /// finish wins the cache slot.
    ///
    /// # Errors
    ///
    /// - `CatalogError::UpstreamFailed` - Identity endpoint unreachable, rejected
    ///   the credentials, or answered without a token
    pub async fn access_token(&self) -> Result<String, CatalogError> {
        let cached = self.cached.read().clone();
        if let Some(credential) = cached {
            return Ok(credential.token);
        }

        let client_secret = match &self.grant {
            TokenGrant::Static(token) => return Ok(token.clone()),
            TokenGrant::ClientCredentials { client_secret } => client_secret,
        };

        let token = self.exchange(client_secret).await?;
        *self.cached.write() = Some(CachedCredential {
            token: token.clone(),
            obtained_at: self.clock.now(),
        });

        Ok(token)
    }

    async fn exchange(&self, client_secret: &str) -> Result<String, CatalogError> {
        const OPERATION: &str = "token request";

        tracing::debug!(url = %self.token_url, "Requesting IGDB client-credentials token");

        let response = self
            .http
            .post(&self.token_url)
            .query(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", client_secret),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await
            .map_err(|e| {
                // The URL carries the client secret
                CatalogError::upstream(CatalogSource::Igdb, OPERATION, e.without_url().to_string())
            })?;

        if !response.status().is_success() {
            tracing::warn!(status = %response.status(), "IGDB token request rejected");
            return Err(CatalogError::upstream_status(
                CatalogSource::Igdb,
                OPERATION,
                response.status(),
            ));
        }

        let body: TokenResponse = response.json().await.map_err(|e| {
            CatalogError::upstream(CatalogSource::Igdb, OPERATION, format!("JSON parsing failed: {e}"))
        })?;

        let token = body
            .access_token
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                CatalogError::upstream(CatalogSource::Igdb, OPERATION, "response carried no access_token")
            })?;

        tracing::info!("Obtained IGDB access token");
        Ok(token)
    }
}
