//! Notification relay: user id -> `users/{id}.fcmToken` -> push gateway.

use crate::domain::{Notification, PushMessage, USERS_COLLECTION};
use crate::platform::{Platform, PlatformResult};

use serde_json::Value;
use tracing::info;

#[derive(Debug, Clone, PartialEq)]
pub struct NotificationRequest {
    pub user_id: String,
    pub title: String,
    pub body: String,
}

impl NotificationRequest {
    /// `None` unless all three fields are non-empty strings.
    pub fn from_payload(payload: &Value) -> Option<Self> {
        let field = |name: &str| {
            payload
                .get(name)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        Some(Self {
            user_id: field("userId")?,
            title: field("title")?,
            body: field("body")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    /// accepted by the gateway, with its message id
    Sent(String),
    UserNotFound,
    MissingToken,
}

pub async fn send_notification(platform: &Platform, request: &NotificationRequest) -> PlatformResult<Delivery> {
    let Some(user) = platform
        .documents
        .get_document(USERS_COLLECTION, &request.user_id)
        .await?
    else {
        return Ok(Delivery::UserNotFound);
    };

    let token = user
        .get("fcmToken")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty());
    let Some(token) = token else {
        return Ok(Delivery::MissingToken);
    };

    let message = PushMessage {
        token: token.to_string(),
        notification: Notification {
            title: request.title.clone(),
            body: request.body.clone(),
        },
    };

    let message_id = platform.push.send(&message).await?;
    info!(user_id = %request.user_id, message_id = %message_id, "sent notification");
    Ok(Delivery::Sent(message_id))
}
