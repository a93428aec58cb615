//! Persistent multi-session chat memory for the screenshot assistant.

pub mod schema;
mod store;

pub use schema::{ChatMessage, ChatSession, MemorySnapshot, PerformanceLog, Role};
pub use store::{HistoryTurn, MemoryStore};
