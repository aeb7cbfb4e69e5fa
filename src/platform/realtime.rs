//! Firebase Realtime Database rest client: `PUT {database_url}/{path}.json`.
//!
//! The database url's query (the emulator's `?ns=<db>`) is carried onto every request.

use super::auth::TokenSource;
use super::{check_status, PlatformError, PlatformResult, RealtimeStore};

use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

const SERVICE: &str = "realtime database";

pub struct RealtimeClient {
    http: reqwest::Client,
    tokens: Arc<TokenSource>,
    database_url: Url,
}

impl RealtimeClient {
    pub fn new(
        http: reqwest::Client,
        tokens: Arc<TokenSource>,
        database_url: &str,
    ) -> PlatformResult<Self> {
        let database_url = Url::parse(database_url).map_err(|e| {
            PlatformError::Config(format!("invalid realtime database url {}: {}", database_url, e))
        })?;
        if database_url.cannot_be_a_base() {
            return Err(PlatformError::Config(format!(
                "realtime database url {} cannot be a base",
                database_url
            )));
        }

        Ok(Self {
            http,
            tokens,
            database_url,
        })
    }

    fn url_for(&self, path: &str) -> PlatformResult<Url> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let Some((leaf, parents)) = segments.split_last() else {
            return Err(PlatformError::Config("realtime path is empty".to_string()));
        };

        let mut url = self.database_url.clone();
        url.path_segments_mut()
            .map_err(|_| PlatformError::Config("realtime database url cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(parents)
            .push(&format!("{}.json", leaf));
        Ok(url)
    }
}

#[async_trait]
impl RealtimeStore for RealtimeClient {
    async fn set(&self, path: &str, value: &Value) -> PlatformResult<()> {
        // PUT replaces the subtree, PATCH would merge
        let response = self
            .http
            .put(self.url_for(path)?)
            .bearer_auth(self.tokens.bearer().await?)
            .json(value)
            .send()
            .await?;
        check_status(SERVICE, response).await?;

        debug!(path, "wrote realtime database subtree");
        Ok(())
    }
}
