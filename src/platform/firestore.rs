//! ==============================================================================
//! platform/firestore.rs - cloud firestore rest client
//! ==============================================================================
//!
//! purpose:
//!     the document store half of the relay:
//!     - list every document of a collection (equipment, programs)
//!     - get one document by id (users/{id})
//!     - overwrite one document by id (readings/{timestamp})
//!
//! relationships:
//!     - implements: DocumentStore (platform/mod.rs)
//!     - uses: value.rs (typed value codec), auth.rs (bearer tokens)
//!
//! ==============================================================================

use super::auth::TokenSource;
use super::{check_status, value, DocumentStore, Fields, PlatformError, PlatformResult};

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

const SERVICE: &str = "firestore";
const PAGE_SIZE: u32 = 300;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListDocumentsResponse {
    #[serde(default)]
    documents: Vec<Document>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct Document {
    // required: a collection listing must never parse as a document
    #[allow(dead_code)]
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

/// `Url` would resolve `.` and `..` segments, so they never reach it
fn is_document_id(id: &str) -> bool {
    !id.is_empty() && id != "." && id != ".." && !id.contains('/')
}

pub struct FirestoreClient {
    http: reqwest::Client,
    tokens: Arc<TokenSource>,
    documents_url: Url,
}

impl FirestoreClient {
    pub fn new(
        http: reqwest::Client,
        tokens: Arc<TokenSource>,
        base_url: &str,
        project_id: &str,
    ) -> PlatformResult<Self> {
        let documents_url = format!(
            "{}/v1/projects/{}/databases/(default)/documents",
            base_url.trim_end_matches('/'),
            project_id
        );
        let documents_url = Url::parse(&documents_url)
            .map_err(|e| PlatformError::Config(format!("invalid firestore url {}: {}", documents_url, e)))?;

        Ok(Self {
            http,
            tokens,
            documents_url,
        })
    }

    /// caller-supplied ids are pushed as single, percent-encoded segments
    fn url_for(&self, segments: &[&str]) -> PlatformResult<Url> {
        let mut url = self.documents_url.clone();
        url.path_segments_mut()
            .map_err(|_| PlatformError::Config("firestore url cannot be a base".to_string()))?
            .extend(segments);
        Ok(url)
    }
}

#[async_trait]
impl DocumentStore for FirestoreClient {
    async fn list_collection(&self, collection: &str) -> PlatformResult<Vec<Fields>> {
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = self.url_for(&[collection])?;
            {
                let mut query = url.query_pairs_mut();
                query.append_pair("pageSize", &PAGE_SIZE.to_string());
                if let Some(token) = &page_token {
                    query.append_pair("pageToken", token);
                }
            }

            let response = self
                .http
                .get(url)
                .bearer_auth(self.tokens.bearer().await?)
                .send()
                .await?;
            let page: ListDocumentsResponse = check_status(SERVICE, response).await?.json().await?;

            for document in &page.documents {
                documents.push(value::decode_fields(&document.fields)?);
            }

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        debug!(collection, count = documents.len(), "listed firestore collection");
        Ok(documents)
    }

    async fn get_document(&self, collection: &str, id: &str) -> PlatformResult<Option<Fields>> {
        if !is_document_id(id) {
            debug!(collection, id, "not a valid document id, treating as absent");
            return Ok(None);
        }

        let response = self
            .http
            .get(self.url_for(&[collection, id])?)
            .bearer_auth(self.tokens.bearer().await?)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let document: Document = check_status(SERVICE, response).await?.json().await?;
        value::decode_fields(&document.fields).map(Some)
    }

    async fn set_document(&self, collection: &str, id: &str, data: &Value) -> PlatformResult<()> {
        if !is_document_id(id) {
            return Err(PlatformError::InvalidDocument(format!("invalid document id {:?}", id)));
        }
        let body = value::encode_document(data)?;

        // PATCH without an update mask replaces the whole document
        let response = self
            .http
            .patch(self.url_for(&[collection, id])?)
            .bearer_auth(self.tokens.bearer().await?)
            .json(&body)
            .send()
            .await?;
        check_status(SERVICE, response).await?;

        debug!(collection, id, "wrote firestore document");
        Ok(())
    }
}
