//! Firebase Cloud Messaging HTTP v1 client.

use super::auth::TokenSource;
use super::{check_status, PlatformResult, PushGateway};
use crate::domain::PushMessage;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const SERVICE: &str = "fcm";

#[derive(Serialize)]
struct SendRequest<'a> {
    message: &'a PushMessage,
}

#[derive(Deserialize)]
struct SendResponse {
    name: String,
}

pub struct MessagingClient {
    http: reqwest::Client,
    tokens: Arc<TokenSource>,
    send_url: String,
}

impl MessagingClient {
    pub fn new(http: reqwest::Client, tokens: Arc<TokenSource>, base_url: &str, project_id: &str) -> Self {
        Self {
            http,
            tokens,
            send_url: format!(
                "{}/v1/projects/{}/messages:send",
                base_url.trim_end_matches('/'),
                project_id
            ),
        }
    }
}

#[async_trait]
impl PushGateway for MessagingClient {
    async fn send(&self, message: &PushMessage) -> PlatformResult<String> {
        let response = self
            .http
            .post(&self.send_url)
            .bearer_auth(self.tokens.bearer().await?)
            .json(&SendRequest { message })
            .send()
            .await?;

        let sent: SendResponse = check_status(SERVICE, response).await?.json().await?;
        Ok(sent.name)
    }
}
