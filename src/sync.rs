//! ==============================================================================
//! sync.rs - firestore <-> realtime database sync passes
//! ==============================================================================
//!
//! purpose:
//!     firestore -> realtime: read a whole collection, shape it per target
//!     (domain.rs), overwrite `{timestamp}/{board}/{collection}` in one write.
//!
//!     realtime -> firestore: store an opaque readings payload as
//!     `readings/{timestamp}`.
//!
//! notes:
//!     the read and the write are two independent remote calls. a failure
//!     between them leaves the realtime database behind firestore until the
//!     next pass; nothing is rolled back or retried.
//!
//! ==============================================================================

use crate::domain::{timestamp_ms, BoardSnapshot, SyncReport, SyncTarget, READINGS_COLLECTION};
use crate::platform::{Platform, PlatformResult};

use serde_json::Value;
use tracing::info;

pub async fn firestore_to_realtime(platform: &Platform, target: SyncTarget) -> PlatformResult<SyncReport> {
    let timestamp = timestamp_ms();

    let documents = platform.documents.list_collection(target.collection()).await?;
    let snapshot = BoardSnapshot::shape(target, &documents);
    let path = snapshot.realtime_path(timestamp);

    platform
        .realtime
        .set(&path, &Value::Object(snapshot.payload.mapping().clone()))
        .await?;

    info!(
        collection = target.collection(),
        board = snapshot.board,
        timestamp,
        documents = documents.len(),
        entries = snapshot.payload.mapping().len(),
        "synced firestore to realtime database"
    );

    Ok(SyncReport {
        timestamp,
        payload: snapshot.payload,
    })
}

/// Returns the timestamp used as the reading's document id.
pub async fn realtime_to_firestore(platform: &Platform, reading: &Value) -> PlatformResult<u64> {
    let timestamp = timestamp_ms();

    platform
        .documents
        .set_document(READINGS_COLLECTION, &timestamp.to_string(), reading)
        .await?;

    info!(timestamp, "stored reading in firestore");
    Ok(timestamp)
}
