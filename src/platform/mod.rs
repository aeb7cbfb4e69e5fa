//! ==============================================================================
//! platform/mod.rs - firebase platform handle
//! ==============================================================================
//!
//! purpose:
//!     the one authenticated handle to the cloud platform. it bundles the three
//!     remote collaborators the relay talks to:
//!     - documents: cloud firestore (collection queries, single document get/set)
//!     - realtime:  firebase realtime database (subtree overwrite by path)
//!     - push:      firebase cloud messaging (send by device token)
//!
//! relationships:
//!     - built once by: main.rs (from config.rs FirebaseConfig)
//!     - used by: sync.rs, notify.rs (through the traits below, never the clients)
//!     - implemented by: firestore.rs, realtime.rs, messaging.rs
//!     - authenticated by: auth.rs (shared token source)
//!
//! ==============================================================================

pub mod auth;
pub mod firestore;
pub mod messaging;
pub mod realtime;
pub mod value;

#[cfg(test)]
pub mod fake;
#[cfg(test)]
pub mod mock_server;

use crate::config::FirebaseConfig;
use crate::domain::PushMessage;

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// decoded document fields, plain json
pub type Fields = Map<String, Value>;

/// Errors raised by the platform clients.
#[derive(Error, Debug)]
pub enum PlatformError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Service returned a non-success response
    #[error("{service} API error: {status} - {message}")]
    Api {
        service: &'static str,
        status: u16,
        message: String,
    },

    /// Service account key missing or unusable
    #[error("Credentials error: {0}")]
    Credentials(String),

    /// JWT assertion could not be signed
    #[error("Signing error: {0}")]
    Signing(String),

    /// Client misconfigured (bad base url, missing project id)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Document body is not a JSON object
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// Firestore value could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),
}

pub type PlatformResult<T> = Result<T, PlatformError>;

/// Collection-oriented document store (firestore).
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Every document in `collection`, in the store's enumeration order.
    async fn list_collection(&self, collection: &str) -> PlatformResult<Vec<Fields>>;

    /// `Ok(None)` when the document does not exist.
    async fn get_document(&self, collection: &str, id: &str) -> PlatformResult<Option<Fields>>;

    /// Overwrites the document with `data`, which must be a JSON object.
    async fn set_document(&self, collection: &str, id: &str, data: &Value) -> PlatformResult<()>;
}

/// Path-addressed realtime store.
#[async_trait]
pub trait RealtimeStore: Send + Sync {
    /// Overwrites (never merges) the subtree at `path`.
    async fn set(&self, path: &str, value: &Value) -> PlatformResult<()>;
}

/// Push notification gateway.
#[async_trait]
pub trait PushGateway: Send + Sync {
    /// Returns the gateway-assigned message id.
    async fn send(&self, message: &PushMessage) -> PlatformResult<String>;
}

/// Clone-able handle shared by every request handler.
#[derive(Clone)]
pub struct Platform {
    pub documents: Arc<dyn DocumentStore>,
    pub realtime: Arc<dyn RealtimeStore>,
    pub push: Arc<dyn PushGateway>,
}

impl Platform {
    /// Build the REST clients around one shared token source.
    pub fn from_config(config: &FirebaseConfig) -> PlatformResult<Self> {
        let tokens = Arc::new(auth::TokenSource::from_config(config)?);

        let project_id = config
            .project_id
            .clone()
            .or_else(|| tokens.project_id().map(str::to_string))
            .ok_or_else(|| {
                PlatformError::Config(
                    "no project id configured and none available from credentials".to_string(),
                )
            })?;

        let http = reqwest::Client::new();

        let documents = firestore::FirestoreClient::new(
            http.clone(),
            tokens.clone(),
            &config.firestore_url,
            &project_id,
        )?;
        let realtime = realtime::RealtimeClient::new(http.clone(), tokens.clone(), &config.database_url)?;
        let push = messaging::MessagingClient::new(http, tokens, &config.fcm_url, &project_id);

        info!(project_id = %project_id, database_url = %config.database_url, "platform clients ready");

        Ok(Self {
            documents: Arc::new(documents),
            realtime: Arc::new(realtime),
            push: Arc::new(push),
        })
    }
}

/// Pass successful responses through, turn anything else into `PlatformError::Api`.
pub(crate) async fn check_status(
    service: &'static str,
    response: reqwest::Response,
) -> PlatformResult<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(PlatformError::Api {
        service,
        status,
        message: api_error_message(&body),
    })
}

/// google apis wrap errors as {"error": {"message": ...}}, the realtime
/// database as {"error": "..."}
fn api_error_message(body: &str) -> String {
    let parsed = serde_json::from_str::<Value>(body).ok();
    let message = parsed.as_ref().and_then(|v| match v.get("error") {
        Some(Value::Object(err)) => err.get("message").and_then(Value::as_str),
        Some(Value::String(err)) => Some(err.as_str()),
        _ => None,
    });

    match message {
        Some(m) => m.to_string(),
        None => body.trim().to_string(),
    }
}
