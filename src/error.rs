use crate::platform::PlatformError;

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Every failure the http surface can answer with.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Unknown sync target {0}, expected \"equipment\" or \"programs\"")]
    UnknownSyncTarget(String),

    #[error("Missing required parameters: userId, title, or body")]
    MissingParameters,

    #[error("FCM token not available for this user")]
    MissingDeviceToken,

    #[error("User not found")]
    UserNotFound,

    #[error("{context}")]
    Upstream {
        context: &'static str,
        #[source]
        source: PlatformError,
    },
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl AppError {
    /// `map_err` adapter tagging a platform failure with what was being attempted.
    pub fn upstream(context: &'static str) -> impl FnOnce(PlatformError) -> Self {
        move |source| Self::Upstream { context, source }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedPayload(_) => "malformed_payload",
            Self::UnknownSyncTarget(_) => "unknown_sync_target",
            Self::MissingParameters => "missing_parameters",
            Self::MissingDeviceToken => "missing_device_token",
            Self::UserNotFound => "user_not_found",
            Self::Upstream { .. } => "upstream_failure",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::MalformedPayload(_)
            | Self::UnknownSyncTarget(_)
            | Self::MissingParameters
            | Self::MissingDeviceToken => StatusCode::BAD_REQUEST,
            Self::UserNotFound => StatusCode::NOT_FOUND,
            Self::Upstream { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::MalformedPayload(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // only server-side failures are logged
        let details = match &self {
            Self::Upstream { context, source } => {
                tracing::error!(error = %source, "{}", context);
                Some(source.to_string())
            }
            _ => None,
        };

        let body = ErrorBody {
            error: self.code(),
            message: self.to_string(),
            details,
        };
        (status, Json(body)).into_response()
    }
}
