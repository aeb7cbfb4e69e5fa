use crate::platform::Fields;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::warn;

pub const READINGS_COLLECTION: &str = "readings";
pub const USERS_COLLECTION: &str = "users";

/// board used when no equipment document names one, and for every programs sync
pub const DEFAULT_BOARD: i64 = 1;

const PROGRAM_FIELDS: [&str; 4] = ["action", "limit", "equipment", "condition"];

/// milliseconds since the unix epoch
pub fn timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// firestore collections that can be mirrored into the realtime database
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncTarget {
    Equipment,
    Programs,
}

impl SyncTarget {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "equipment" => Some(Self::Equipment),
            "programs" => Some(Self::Programs),
            _ => None,
        }
    }

    pub fn collection(self) -> &'static str {
        match self {
            Self::Equipment => "equipment",
            Self::Programs => "programs",
        }
    }
}

/// a shaped collection, keyed the way it appears in the realtime database
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotPayload {
    /// equipment type -> status
    Equipment(Map<String, Value>),
    /// program title -> {action, limit, equipment, condition}
    Programs(Map<String, Value>),
}

impl SnapshotPayload {
    pub fn target(&self) -> SyncTarget {
        match self {
            Self::Equipment(_) => SyncTarget::Equipment,
            Self::Programs(_) => SyncTarget::Programs,
        }
    }

    pub fn mapping(&self) -> &Map<String, Value> {
        match self {
            Self::Equipment(mapping) | Self::Programs(mapping) => mapping,
        }
    }
}

/// one sync pass worth of data destined for `{timestamp}/{board}/{collection}`
#[derive(Debug, Clone, PartialEq)]
pub struct BoardSnapshot {
    pub board: i64,
    pub payload: SnapshotPayload,
}

impl BoardSnapshot {
    pub fn shape(target: SyncTarget, documents: &[Fields]) -> Self {
        match target {
            SyncTarget::Equipment => shape_equipment(documents),
            SyncTarget::Programs => shape_programs(documents),
        }
    }

    pub fn realtime_path(&self, timestamp: u64) -> String {
        format!("{}/{}/{}", timestamp, self.board, self.payload.target().collection())
    }
}

/// Map each equipment `type` to its `status`.
///
/// Duplicate types: the document enumerated last wins. The board is a single
/// scalar for the whole batch, taken from the last document that carries one.
pub fn shape_equipment(documents: &[Fields]) -> BoardSnapshot {
    let mut equipment = Map::new();
    let mut board = DEFAULT_BOARD;

    for document in documents {
        let Some(key) = document.get("type").and_then(mapping_key) else {
            warn!(fields = ?document.keys().collect::<Vec<_>>(), "skipping equipment document without a type");
            continue;
        };

        let status = document.get("status").cloned().unwrap_or(Value::Null);
        equipment.insert(key, status);

        if let Some(b) = document.get("board").and_then(board_number) {
            board = b;
        }
    }

    BoardSnapshot {
        board,
        payload: SnapshotPayload::Equipment(equipment),
    }
}

/// Map each program `title` to its four rule fields, copied verbatim.
pub fn shape_programs(documents: &[Fields]) -> BoardSnapshot {
    let mut programs = Map::new();

    for document in documents {
        let Some(key) = document.get("title").and_then(mapping_key) else {
            warn!(fields = ?document.keys().collect::<Vec<_>>(), "skipping program document without a title");
            continue;
        };

        // absent fields stay absent
        let entry: Map<String, Value> = PROGRAM_FIELDS
            .iter()
            .filter_map(|&field| document.get(field).map(|v| (field.to_string(), v.clone())))
            .collect();
        programs.insert(key, Value::Object(entry));
    }

    BoardSnapshot {
        board: DEFAULT_BOARD,
        payload: SnapshotPayload::Programs(programs),
    }
}

fn mapping_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// boards saved from a form field are strings ("2"), so those count too
fn board_number(value: &Value) -> Option<i64> {
    match value {
        Value::String(s) => s.trim().parse().ok(),
        _ => value
            .as_i64()
            .or_else(|| value.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
    }
}

/// response body of a firestore -> realtime sync
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub timestamp: u64,
    #[serde(flatten)]
    pub payload: SnapshotPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub title: String,
    pub body: String,
}

/// fcm v1 `message` object
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PushMessage {
    pub token: String,
    pub notification: Notification,
}
