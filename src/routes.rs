//! ==============================================================================
//! routes.rs - http surface
//! ==============================================================================
//!
//!     POST /sync/firestore-to-realtime   {data: "equipment" | "programs"}
//!     POST /sync/realtime-to-firestore   arbitrary json reading
//!     POST /sendNotification             {userId, title, body}
//!     GET  *                             static client bundle
//!
//! every handler gets the platform handle through axum state; errors leave
//! through AppError (error.rs) so all endpoints share one error body.
//!
//! ==============================================================================

use crate::domain::{SyncReport, SyncTarget};
use crate::error::AppError;
use crate::notify::{self, Delivery, NotificationRequest};
use crate::platform::Platform;
use crate::sync;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::Value;
use std::path::Path;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

pub fn router(platform: Platform, static_dir: &Path) -> Router {
    Router::new()
        .route("/sync/firestore-to-realtime", post(firestore_to_realtime_handler))
        .route("/sync/realtime-to-firestore", post(realtime_to_firestore_handler))
        .route("/sendNotification", post(send_notification_handler))
        .fallback_service(ServeDir::new(static_dir))
        .layer(CorsLayer::permissive())
        .with_state(platform)
}

async fn firestore_to_realtime_handler(
    State(platform): State<Platform>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<SyncReport>, AppError> {
    let Json(payload) = payload?;

    let requested = payload.get("data");
    let target = requested
        .and_then(Value::as_str)
        .and_then(SyncTarget::from_name)
        .ok_or_else(|| AppError::UnknownSyncTarget(describe(requested)))?;

    let report = sync::firestore_to_realtime(&platform, target)
        .await
        .map_err(AppError::upstream("Failed to sync Firestore to Realtime Database"))?;

    Ok(Json(report))
}

async fn realtime_to_firestore_handler(
    State(platform): State<Platform>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<&'static str, AppError> {
    let Json(reading) = payload?;

    sync::realtime_to_firestore(&platform, &reading)
        .await
        .map_err(AppError::upstream("Failed to synchronize readings"))?;

    Ok("Data synchronized successfully.")
}

async fn send_notification_handler(
    State(platform): State<Platform>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<&'static str, AppError> {
    let Json(payload) = payload?;
    let request = NotificationRequest::from_payload(&payload).ok_or(AppError::MissingParameters)?;

    let delivery = notify::send_notification(&platform, &request)
        .await
        .map_err(AppError::upstream("Failed to send notification"))?;

    match delivery {
        Delivery::Sent(_) => Ok("Notification sent successfully"),
        Delivery::UserNotFound => Err(AppError::UserNotFound),
        Delivery::MissingToken => Err(AppError::MissingDeviceToken),
    }
}

fn describe(requested: Option<&Value>) -> String {
    match requested {
        None => "<absent>".to_string(),
        Some(value) => value.to_string(),
    }
}
