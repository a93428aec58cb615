//! On-disk layouts of the chat memory file and the migrations between them.
//!
//! * v1: a single flat `messages` list with no sessions.
//! * v2: `sessions` plus `messages` keyed by session id.
//! * v3: v2 plus `performance_logs`.
//!
//! Each migration is a pure function of the previous snapshot.

use crate::error::{AnnotatorError, AnnotatorResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const CURRENT_VERSION: u32 = 3;

/// Title given to the session that absorbs a v1 file's messages.
pub const IMPORTED_SESSION_TITLE: &str = "Imported conversation";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub session_id: String,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceLog {
    pub id: String,
    pub session_id: Option<String>,
    pub latency_ms: u64,
    pub question_chars: usize,
    pub answer_chars: usize,
    #[serde(default)]
    pub model: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LegacyMessage {
    pub role: Role,
    pub content: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct SnapshotV1 {
    #[serde(default)]
    pub messages: Vec<LegacyMessage>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct SnapshotV2 {
    #[serde(default)]
    pub sessions: Vec<ChatSession>,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

/// Current layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemorySnapshot {
    pub version: u32,
    #[serde(default)]
    pub sessions: Vec<ChatSession>,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub performance_logs: Vec<PerformanceLog>,
}

impl Default for MemorySnapshot {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            sessions: Vec::new(),
            messages: Vec::new(),
            performance_logs: Vec::new(),
        }
    }
}

/// Fold the flat v1 message list into a single session.
///
/// An empty v1 file yields no session at all.
pub fn migrate_v1_to_v2(v1: SnapshotV1, now: DateTime<Utc>) -> SnapshotV2 {
    if v1.messages.is_empty() {
        return SnapshotV2::default();
    }
    let session_id = Uuid::new_v4().to_string();
    let messages: Vec<ChatMessage> = v1
        .messages
        .into_iter()
        .map(|m| ChatMessage {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.clone(),
            role: m.role,
            content: m.content,
            created_at: m.timestamp.unwrap_or(now),
        })
        .collect();
    let created_at = messages.iter().map(|m| m.created_at).min().unwrap_or(now);
    let updated_at = messages.iter().map(|m| m.created_at).max().unwrap_or(now);
    SnapshotV2 {
        sessions: vec![ChatSession {
            id: session_id,
            title: IMPORTED_SESSION_TITLE.to_string(),
            created_at,
            updated_at,
        }],
        messages,
    }
}

pub fn migrate_v2_to_v3(v2: SnapshotV2) -> MemorySnapshot {
    MemorySnapshot {
        version: 3,
        sessions: v2.sessions,
        messages: v2.messages,
        performance_logs: Vec::new(),
    }
}

/// Version recorded in a raw file. Files without a `version` field predate
/// versioning and are v1.
pub fn detect_version(value: &serde_json::Value) -> u64 {
    value
        .get("version")
        .and_then(serde_json::Value::as_u64)
        .unwrap_or(1)
}

/// Walk a raw file of any known version up to [`CURRENT_VERSION`].
pub fn upgrade(value: serde_json::Value, now: DateTime<Utc>) -> AnnotatorResult<MemorySnapshot> {
    match detect_version(&value) {
        1 => {
            let v1: SnapshotV1 = serde_json::from_value(value)?;
            Ok(migrate_v2_to_v3(migrate_v1_to_v2(v1, now)))
        }
        2 => {
            let v2: SnapshotV2 = serde_json::from_value(value)?;
            Ok(migrate_v2_to_v3(v2))
        }
        v if v == u64::from(CURRENT_VERSION) => Ok(serde_json::from_value(value)?),
        other => Err(AnnotatorError::UnsupportedSchema(other)),
    }
}
