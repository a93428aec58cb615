use super::schema::{
    ChatMessage, ChatSession, CURRENT_VERSION, MemorySnapshot, PerformanceLog, Role, detect_version,
    upgrade,
};
use crate::error::{AnnotatorError, AnnotatorResult};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

/// One prior exchange in the shape the inference server expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryTurn {
    pub role: Role,
    pub content: String,
}

/// Chat sessions, their messages and latency logs backed by a JSON file.
#[derive(Debug)]
pub struct MemoryStore {
    path: Option<PathBuf>,
    data: MemorySnapshot,
}

impl MemoryStore {
    /// Store that never touches disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            data: MemorySnapshot::default(),
        }
    }

    /// Open the file at `path`, upgrading older layouts in place.
    ///
    /// A missing file starts an empty store.
    pub fn open(path: &Path) -> AnnotatorResult<Self> {
        if !path.exists() {
            debug!("No memory file at {}, starting empty", path.display());
            return Ok(Self {
                path: Some(path.to_path_buf()),
                data: MemorySnapshot::default(),
            });
        }
        let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(path)?)?;
        let version = detect_version(&raw);
        let data = upgrade(raw, Utc::now())?;
        let store = Self {
            path: Some(path.to_path_buf()),
            data,
        };
        if version != u64::from(CURRENT_VERSION) {
            info!("Migrated memory file from v{version} to v{CURRENT_VERSION}");
            store.save()?;
        }
        Ok(store)
    }

    pub fn save(&self) -> AnnotatorResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(&self.data)?)?;
        Ok(())
    }

    pub fn snapshot(&self) -> &MemorySnapshot {
        &self.data
    }

    pub fn create_session(&mut self, title: &str) -> ChatSession {
        let now = Utc::now();
        let session = ChatSession {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            created_at: now,
            updated_at: now,
        };
        self.data.sessions.push(session.clone());
        session
    }

    /// Most recently active first.
    pub fn sessions(&self) -> Vec<&ChatSession> {
        let mut sessions: Vec<&ChatSession> = self.data.sessions.iter().collect();
        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        sessions
    }

    pub fn session(&self, id: &str) -> Option<&ChatSession> {
        self.data.sessions.iter().find(|s| s.id == id)
    }

    fn session_mut(&mut self, id: &str) -> AnnotatorResult<&mut ChatSession> {
        self.data
            .sessions
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| AnnotatorError::UnknownSession(id.to_string()))
    }

    pub fn rename_session(&mut self, id: &str, title: &str) -> AnnotatorResult<()> {
        let session = self.session_mut(id)?;
        session.title = title.to_string();
        session.updated_at = Utc::now();
        Ok(())
    }

    /// Remove a session together with its messages and performance logs.
    /// Returns how many messages went with it.
    pub fn delete_session(&mut self, id: &str) -> AnnotatorResult<usize> {
        let before = self.data.sessions.len();
        self.data.sessions.retain(|s| s.id != id);
        if self.data.sessions.len() == before {
            return Err(AnnotatorError::UnknownSession(id.to_string()));
        }
        let messages = self.data.messages.len();
        self.data.messages.retain(|m| m.session_id != id);
        self.data
            .performance_logs
            .retain(|l| l.session_id.as_deref() != Some(id));
        Ok(messages - self.data.messages.len())
    }

    pub fn append_message(
        &mut self,
        session_id: &str,
        role: Role,
        content: &str,
    ) -> AnnotatorResult<ChatMessage> {
        let now = Utc::now();
        self.session_mut(session_id)?.updated_at = now;
        let message = ChatMessage {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            role,
            content: content.to_string(),
            created_at: now,
        };
        self.data.messages.push(message.clone());
        Ok(message)
    }

    /// Messages of one session in insertion order.
    pub fn messages(&self, session_id: &str) -> Vec<&ChatMessage> {
        self.data
            .messages
            .iter()
            .filter(|m| m.session_id == session_id)
            .collect()
    }

    /// The last `limit` messages of a session as history turns, oldest first.
    pub fn history(&self, session_id: &str, limit: usize) -> Vec<HistoryTurn> {
        let messages = self.messages(session_id);
        let skip = messages.len().saturating_sub(limit);
        messages
            .into_iter()
            .skip(skip)
            .map(|m| HistoryTurn {
                role: m.role,
                content: m.content.clone(),
            })
            .collect()
    }

    pub fn log_performance(
        &mut self,
        session_id: Option<&str>,
        latency_ms: u64,
        question_chars: usize,
        answer_chars: usize,
        model: Option<String>,
    ) -> PerformanceLog {
        let log = PerformanceLog {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.map(str::to_string),
            latency_ms,
            question_chars,
            answer_chars,
            model,
            created_at: Utc::now(),
        };
        self.data.performance_logs.push(log.clone());
        log
    }

    pub fn performance_logs(&self) -> &[PerformanceLog] {
        &self.data.performance_logs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_keeps_the_tail() {
        let mut store = MemoryStore::in_memory();
        let s = store.create_session("EURUSD review");
        for i in 0..5 {
            store.append_message(&s.id, Role::User, &format!("q{i}")).unwrap();
        }
        let history = store.history(&s.id, 2);
        let contents: Vec<&str> = history.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, ["q3", "q4"]);
    }

    #[test]
    fn append_to_unknown_session_fails() {
        let mut store = MemoryStore::in_memory();
        let err = store.append_message("nope", Role::User, "hi").unwrap_err();
        assert!(matches!(err, AnnotatorError::UnknownSession(_)));
    }

    #[test]
    fn rename_updates_title() {
        let mut store = MemoryStore::in_memory();
        let s = store.create_session("untitled");
        store.rename_session(&s.id, "London open").unwrap();
        assert_eq!(store.session(&s.id).unwrap().title, "London open");
    }
}
