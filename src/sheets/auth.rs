//! Google OAuth access tokens for the Sheets API.
//!
//! A service-account key signs an RS256 JWT assertion which is exchanged at
//! the key's `token_uri` (the OAuth JWT-bearer grant). Tokens are cached and
//! minted again shortly before they expire.

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use crate::core::config::SheetsAuth;
use crate::errors::BridgeError;

pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
/// Google caps assertion lifetime at one hour.
const ASSERTION_LIFETIME_SECS: u64 = 3600;
/// A cached token this close to expiry is replaced before use.
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Supplies the bearer token for each Sheets request.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String, BridgeError>;
}

/// Builds the token source `auth` describes.
///
/// # Errors
///
/// [`BridgeError::Config`] for a malformed service-account key.
pub fn token_source_from_config(
    auth: &SheetsAuth,
    timeout: Duration,
) -> Result<Arc<dyn TokenSource>, BridgeError> {
    match auth {
        SheetsAuth::AccessToken(token) => Ok(Arc::new(StaticToken(token.clone()))),
        SheetsAuth::ServiceAccount(json) => {
            let key = ServiceAccountKey::from_json(json)?;
            Ok(Arc::new(ServiceAccountTokens::new(key, timeout)?))
        }
    }
}

/// A fixed token, used as-is on every request.
pub struct StaticToken(pub String);

#[async_trait]
impl TokenSource for StaticToken {
    async fn access_token(&self) -> Result<String, BridgeError> {
        Ok(self.0.clone())
    }
}

/// The fields of a Google service-account key file this client needs.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    /// # Errors
    ///
    /// [`BridgeError::Config`] when the JSON is not a service-account key.
    pub fn from_json(json: &str) -> Result<Self, BridgeError> {
        serde_json::from_str(json)
            .map_err(|e| BridgeError::Config(format!("Invalid service-account key: {e}")))
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: u64,
    exp: u64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

struct CachedToken {
    value: String,
    refresh_at: Instant,
}

/// Mints tokens from a service-account key and caches them until
/// [`REFRESH_MARGIN`] before expiry.
pub struct ServiceAccountTokens {
    http: Client,
    key: ServiceAccountKey,
    signing_key: EncodingKey,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccountTokens {
    /// # Errors
    ///
    /// [`BridgeError::Config`] when the private key is not an RSA PEM or the
    /// HTTP client cannot be built.
    pub fn new(key: ServiceAccountKey, timeout: Duration) -> Result<Self, BridgeError> {
        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| BridgeError::Config(format!("Invalid service-account private key: {e}")))?;
        let http = Client::builder().timeout(timeout).build().map_err(|e| {
            BridgeError::Config(format!("Failed to build token HTTP client: {e}"))
        })?;

        Ok(Self {
            http,
            key,
            signing_key,
            cached: Mutex::new(None),
        })
    }

    fn assertion(&self, now_secs: u64) -> Result<String, BridgeError> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid.clone_from(&self.key.private_key_id);

        let claims = AssertionClaims {
            iss: &self.key.client_email,
            scope: SHEETS_SCOPE,
            aud: &self.key.token_uri,
            iat: now_secs,
            exp: now_secs + ASSERTION_LIFETIME_SECS,
        };

        encode(&header, &claims, &self.signing_key)
            .map_err(|e| BridgeError::SheetUnavailable(format!("Failed to sign token assertion: {e}")))
    }

    async fn mint(&self) -> Result<CachedToken, BridgeError> {
        let now_secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_secs());
        let assertion = self.assertion(now_secs)?;

        let response = self
            .http
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| BridgeError::SheetUnavailable(format!("Token request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(300).collect();
            return Err(BridgeError::SheetUnavailable(format!(
                "Token exchange failed (status {status}): {snippet}"
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| BridgeError::SheetUnavailable(format!("Token response parse error: {e}")))?;

        let lifetime = Duration::from_secs(token.expires_in.unwrap_or(ASSERTION_LIFETIME_SECS));
        debug!(
            client_email = %self.key.client_email,
            expires_in = lifetime.as_secs(),
            "Minted Sheets access token"
        );

        Ok(CachedToken {
            value: token.access_token,
            refresh_at: Instant::now() + lifetime.saturating_sub(REFRESH_MARGIN),
        })
    }
}

#[async_trait]
impl TokenSource for ServiceAccountTokens {
    /// Holding the lock while minting keeps concurrent writers to one exchange.
    async fn access_token(&self) -> Result<String, BridgeError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(token.value.clone());
            }
        }

        let fresh = self.mint().await?;
        let value = fresh.value.clone();
        *cached = Some(fresh);
        Ok(value)
    }
}
