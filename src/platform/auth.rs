//! ==============================================================================
//! platform/auth.rs - service account credentials and access tokens
//! ==============================================================================
//!
//! purpose:
//!     turns the service account key file into short-lived oauth2 access tokens
//!     for the firestore, realtime database and fcm rest apis.
//!
//! flow:
//!     1. read the key file once at startup (project id, client email, pkcs8 key)
//!     2. sign an RS256 jwt assertion with the private key
//!     3. exchange it at the key's token_uri (jwt-bearer grant)
//!     4. cache the access token until shortly before it expires
//!
//!     a static token (emulator suite: "owner") skips all of the above.
//!
//! ==============================================================================

use super::{check_status, PlatformError, PlatformResult};
use crate::config::FirebaseConfig;

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use ring::rand::SystemRandom;
use ring::signature::{RsaKeyPair, RSA_PKCS1_SHA256};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;
use tracing::{debug, info};

const TOKEN_SCOPES: &str = "https://www.googleapis.com/auth/datastore \
https://www.googleapis.com/auth/firebase.database \
https://www.googleapis.com/auth/firebase.messaging \
https://www.googleapis.com/auth/userinfo.email";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: u64 = 3600;
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

/// The fields of a service account key file the relay needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub project_id: String,
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl ServiceAccountKey {
    pub fn load(path: &Path) -> PlatformResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PlatformError::Credentials(format!("failed to read {}: {}", path.display(), e))
        })?;

        serde_json::from_str(&content).map_err(|e| {
            PlatformError::Credentials(format!("failed to parse {}: {}", path.display(), e))
        })
    }
}

/// Where bearer tokens come from.
pub enum TokenSource {
    Static(String),
    ServiceAccount(ServiceAccountTokens),
}

impl TokenSource {
    pub fn from_config(config: &FirebaseConfig) -> PlatformResult<Self> {
        if let Some(token) = &config.static_token {
            info!("using static bearer token (emulator mode)");
            return Ok(Self::Static(token.clone()));
        }

        let key = ServiceAccountKey::load(&config.credentials_path)?;
        info!(client_email = %key.client_email, "loaded service account credentials");
        Ok(Self::ServiceAccount(ServiceAccountTokens::new(
            key,
            reqwest::Client::new(),
        )?))
    }

    /// Project id carried by the credentials, if any.
    pub fn project_id(&self) -> Option<&str> {
        match self {
            Self::Static(_) => None,
            Self::ServiceAccount(tokens) => Some(&tokens.key.project_id),
        }
    }

    pub async fn bearer(&self) -> PlatformResult<String> {
        match self {
            Self::Static(token) => Ok(token.clone()),
            Self::ServiceAccount(tokens) => tokens.access_token().await,
        }
    }
}

struct CachedToken {
    value: String,
    refresh_at: Instant,
}

/// Mints and caches access tokens for one service account.
pub struct ServiceAccountTokens {
    key: ServiceAccountKey,
    key_pair: RsaKeyPair,
    rng: SystemRandom,
    http: reqwest::Client,
    // held across the refresh so concurrent callers share one exchange
    cache: Mutex<Option<CachedToken>>,
}

#[derive(Serialize)]
struct JwtClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: u64,
    exp: u64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

impl ServiceAccountTokens {
    pub fn new(key: ServiceAccountKey, http: reqwest::Client) -> PlatformResult<Self> {
        let der = pem_to_der(&key.private_key)?;
        let key_pair = RsaKeyPair::from_pkcs8(&der)
            .map_err(|e| PlatformError::Credentials(format!("private key rejected: {}", e)))?;

        Ok(Self {
            key,
            key_pair,
            rng: SystemRandom::new(),
            http,
            cache: Mutex::new(None),
        })
    }

    pub async fn access_token(&self) -> PlatformResult<String> {
        let mut cache = self.cache.lock().await;
        if let Some(cached) = cache.as_ref() {
            if Instant::now() < cached.refresh_at {
                return Ok(cached.value.clone());
            }
        }

        let fresh = self.exchange().await?;
        let value = fresh.value.clone();
        *cache = Some(fresh);
        Ok(value)
    }

    async fn exchange(&self) -> PlatformResult<CachedToken> {
        let assertion = self.assertion(unix_seconds())?;

        debug!(token_uri = %self.key.token_uri, "exchanging jwt assertion for access token");
        let response = self
            .http
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        let token: TokenResponse = check_status("oauth2", response).await?.json().await?;
        let lifetime = Duration::from_secs(token.expires_in.unwrap_or(ASSERTION_LIFETIME_SECS));

        Ok(CachedToken {
            value: token.access_token,
            refresh_at: Instant::now() + lifetime.saturating_sub(REFRESH_MARGIN),
        })
    }

    fn assertion(&self, issued_at: u64) -> PlatformResult<String> {
        let signing_input = signing_input(&self.key, issued_at)?;

        let mut signature = vec![0u8; self.key_pair.public().modulus_len()];
        self.key_pair
            .sign(&RSA_PKCS1_SHA256, &self.rng, signing_input.as_bytes(), &mut signature)
            .map_err(|_| PlatformError::Signing("rsa signing failed".to_string()))?;

        Ok(format!("{}.{}", signing_input, URL_SAFE_NO_PAD.encode(signature)))
    }
}

/// `base64url(header).base64url(claims)`, the part of the jwt that gets signed.
fn signing_input(key: &ServiceAccountKey, issued_at: u64) -> PlatformResult<String> {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
    let claims = JwtClaims {
        iss: &key.client_email,
        scope: TOKEN_SCOPES,
        aud: &key.token_uri,
        iat: issued_at,
        exp: issued_at + ASSERTION_LIFETIME_SECS,
    };
    let claims = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims)?);
    Ok(format!("{}.{}", header, claims))
}

fn pem_to_der(pem: &str) -> PlatformResult<Vec<u8>> {
    let body: String = pem
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("-----"))
        .collect();

    if body.is_empty() {
        return Err(PlatformError::Credentials("private key is empty".to_string()));
    }

    STANDARD
        .decode(body)
        .map_err(|e| PlatformError::Credentials(format!("private key is not valid base64: {}", e)))
}

fn unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
