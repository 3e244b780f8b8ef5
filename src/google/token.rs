use crate::config::GOOGLE_TOKEN_URI;
use crate::db::IntegrationStorage;
use crate::error::{BridgeError, IsRetryable};
use crate::google::endpoints::GoogleEndpoints;
use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

fn default_retry_policy() -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_secs(1))
        .with_max_delay(Duration::from_secs(3))
        .with_max_times(3)
        .with_jitter()
}

/// The single Google account credential backing the Sheets integration.
#[derive(Debug, Clone, PartialEq)]
pub struct GoogleCredential {
    pub client_id: String,
    pub client_secret: String,
    /// Absent until an operator connects the integration.
    pub refresh_token: Option<String>,
    pub access_token: Option<String>,
    pub expiry: Option<DateTime<Utc>>,
}

impl GoogleCredential {
    /// A cached token is usable only while its expiry is strictly in the
    /// future.
    pub fn fresh_access_token(&self, now: DateTime<Utc>) -> Option<&str> {
        match (&self.access_token, self.expiry) {
            (Some(token), Some(expiry)) if expiry > now => Some(token.as_str()),
            _ => None,
        }
    }
}

/// Narrow persistence seam for the singleton credential, so tests can
/// substitute an in-memory fake for the SQLite row.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn load(&self) -> Result<Option<GoogleCredential>, BridgeError>;
    async fn save_tokens(
        &self,
        access_token: &str,
        expiry: DateTime<Utc>,
    ) -> Result<(), BridgeError>;
}

#[async_trait]
impl CredentialStore for IntegrationStorage {
    async fn load(&self) -> Result<Option<GoogleCredential>, BridgeError> {
        Ok(self.get().await?.map(Into::into))
    }

    async fn save_tokens(
        &self,
        access_token: &str,
        expiry: DateTime<Utc>,
    ) -> Result<(), BridgeError> {
        IntegrationStorage::save_tokens(self, access_token, expiry).await
    }
}

/// Hands out a valid access token, transparently refreshing via the OAuth
/// refresh-token grant when the cached one has expired.
pub struct TokenManager {
    store: Arc<dyn CredentialStore>,
    http: reqwest::Client,
    token_uri: Url,
}

impl TokenManager {
    pub fn new(store: Arc<dyn CredentialStore>, http: reqwest::Client) -> Self {
        Self::with_token_uri(store, http, GOOGLE_TOKEN_URI.clone())
    }

    /// Same as [`TokenManager::new`] with an overridden token endpoint
    /// (used by tests pointing at a local server).
    pub fn with_token_uri(
        store: Arc<dyn CredentialStore>,
        http: reqwest::Client,
        token_uri: Url,
    ) -> Self {
        Self {
            store,
            http,
            token_uri,
        }
    }

    /// Returns a valid access token.
    ///
    /// - no stored refresh token → [`BridgeError::IntegrationNotConnected`]
    /// - cached token with future expiry → returned without network I/O
    /// - otherwise one refresh grant; on success the new token and
    ///   `now + provider-reported lifetime` are persisted (exactly one store
    ///   write), on failure stored state is left untouched.
    pub async fn get_valid_access_token(&self) -> Result<String, BridgeError> {
        let creds = self
            .store
            .load()
            .await?
            .ok_or(BridgeError::IntegrationNotConnected)?;

        let refresh_token = match creds.refresh_token.as_deref() {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => return Err(BridgeError::IntegrationNotConnected),
        };

        if let Some(token) = creds.fresh_access_token(Utc::now()) {
            debug!("access token cache hit");
            return Ok(token.to_string());
        }

        let retry_policy = default_retry_policy();
        let grant = (|| async {
            GoogleEndpoints::refresh_access_token(
                &creds,
                &refresh_token,
                self.http.clone(),
                &self.token_uri,
            )
            .await
        })
        .retry(retry_policy)
        .when(|e: &BridgeError| e.is_retryable())
        .notify(|err, dur: Duration| {
            warn!("token refresh retrying after error {}, sleeping {:?}", err, dur);
        })
        .await;

        let refreshed = match grant {
            Ok(r) => r,
            Err(BridgeError::TokenRefreshFailed(msg)) => {
                warn!(error = %msg, "refresh grant rejected by provider");
                return Err(BridgeError::TokenRefreshFailed(msg));
            }
            Err(e) => {
                warn!(error = %e, "token refresh failed");
                return Err(BridgeError::TokenRefreshFailed(e.to_string()));
            }
        };

        let expiry = Utc::now() + ChronoDuration::seconds(refreshed.expires_in_secs as i64);
        self.store
            .save_tokens(&refreshed.access_token, expiry)
            .await?;
        info!("access token refreshed, valid until {}", expiry.to_rfc3339());
        Ok(refreshed.access_token)
    }
}
