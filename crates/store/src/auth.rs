//! Service-account authentication for the Google store.
//!
//! A service account signs a short-lived RS256 assertion with its private
//! key and trades it at the token endpoint for a bearer token that lasts
//! about an hour. [`GoogleSession`] keeps a [`StoreHandle`] on a live token:
//! shortly before expiry it fetches a new one, builds a fresh
//! [`GoogleStore`] around it and swaps that into the handle.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::StoreError;
use crate::google::{GoogleConfig, GoogleStore};
use crate::handle::StoreHandle;

/// Scopes requested for every token.
pub const GOOGLE_SCOPES: &str =
    "https://www.googleapis.com/auth/drive https://www.googleapis.com/auth/spreadsheets";

const TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime of the signed assertion, in seconds. Google caps this at an hour.
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// How long before expiry a token is replaced.
pub const REFRESH_MARGIN: Duration = Duration::from_secs(300);

/// Wait before retrying a failed refresh.
pub const RETRY_DELAY: Duration = Duration::from_secs(30);

/// The fields of a downloaded service-account key file that signing needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    /// Read a key file in the JSON format the cloud console exports.
    pub async fn load(path: &Path) -> Result<Self, StoreError> {
        let text = tokio::fs::read_to_string(path).await?;
        serde_json::from_str(&text)
            .map_err(|e| StoreError::Decode(format!("service account key {}: {e}", path.display())))
    }
}

/// A bearer token and the moment it stops working.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Anything that can hand out a fresh [`AccessToken`].
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn fetch(&self) -> Result<AccessToken, StoreError>;
}

// ---------------------------------------------------------------------------
// Service account
// ---------------------------------------------------------------------------

/// Claims of the assertion exchanged at the token endpoint.
#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    exp: i64,
    iat: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

/// [`TokenSource`] using the OAuth JWT-bearer grant.
pub struct ServiceAccount {
    key: ServiceAccountKey,
    signing_key: EncodingKey,
    client: reqwest::Client,
}

impl ServiceAccount {
    /// Fails with [`StoreError::Auth`] when the private key is not a valid
    /// RSA PEM.
    pub fn new(key: ServiceAccountKey, timeout: Duration) -> Result<Self, StoreError> {
        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| StoreError::Auth(format!("invalid private key for {}: {e}", key.client_email)))?;
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            key,
            signing_key,
            client,
        })
    }

    fn assertion(&self, now: DateTime<Utc>) -> Result<String, StoreError> {
        let iat = now.timestamp();
        let claims = AssertionClaims {
            iss: &self.key.client_email,
            scope: GOOGLE_SCOPES,
            aud: &self.key.token_uri,
            exp: iat + ASSERTION_LIFETIME_SECS,
            iat,
        };
        encode(&Header::new(Algorithm::RS256), &claims, &self.signing_key)
            .map_err(|e| StoreError::Auth(format!("failed to sign assertion: {e}")))
    }
}

#[async_trait]
impl TokenSource for ServiceAccount {
    async fn fetch(&self) -> Result<AccessToken, StoreError> {
        let now = Utc::now();
        let assertion = self.assertion(now)?;
        let response = self
            .client
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Auth(format!("token endpoint returned {status}: {body}")));
        }
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| StoreError::Decode(format!("token response: {e}")))?;

        tracing::debug!(
            client_email = %self.key.client_email,
            expires_in = token.expires_in,
            "Fetched access token"
        );
        Ok(AccessToken {
            token: token.access_token,
            expires_at: now + chrono::Duration::seconds(token.expires_in),
        })
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Time to wait before refreshing a token that expires at `expires_at`.
pub fn refresh_delay(now: DateTime<Utc>, expires_at: DateTime<Utc>) -> Duration {
    (expires_at - now)
        .to_std()
        .unwrap_or(Duration::ZERO)
        .saturating_sub(REFRESH_MARGIN)
}

/// Keeps a [`StoreHandle`] pointed at a [`GoogleStore`] with a live token.
pub struct GoogleSession {
    source: Arc<dyn TokenSource>,
    timeout: Duration,
}

impl GoogleSession {
    pub fn new(source: Arc<dyn TokenSource>, timeout: Duration) -> Self {
        Self { source, timeout }
    }

    /// Fetch a token and build a store on it. Returns the token's expiry.
    pub async fn connect(&self) -> Result<(GoogleStore, DateTime<Utc>), StoreError> {
        let token = self.source.fetch().await?;
        let store = GoogleStore::new(GoogleConfig::new(token.token, self.timeout))?;
        Ok((store, token.expires_at))
    }

    /// Swap a store with a fresh token into `handle`. On failure the handle
    /// keeps its current store.
    pub async fn refresh(&self, handle: &StoreHandle) -> Result<DateTime<Utc>, StoreError> {
        let (store, expires_at) = self.connect().await?;
        handle.replace(Arc::new(store));
        tracing::info!(%expires_at, "Google access token refreshed");
        Ok(expires_at)
    }

    /// Refresh ahead of every expiry until `cancel` fires.
    pub async fn run(self, handle: StoreHandle, expires_at: DateTime<Utc>, cancel: CancellationToken) {
        let mut wait = refresh_delay(Utc::now(), expires_at);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Token refresh stopped");
                    break;
                }
                _ = tokio::time::sleep(wait) => {
                    wait = match self.refresh(&handle).await {
                        Ok(expires_at) => refresh_delay(Utc::now(), expires_at),
                        Err(e) => {
                            tracing::error!(error = %e, retry_secs = RETRY_DELAY.as_secs(), "Failed to refresh Google access token");
                            RETRY_DELAY
                        }
                    };
                }
            }
        }
    }
}
