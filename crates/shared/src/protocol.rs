use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{FieldId, StudentId};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    #[default]
    Idle,
    PendingDebounce,
    Syncing,
    Saved,
    Error,
    Offline,
}

impl SyncStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SyncStatus::Idle => "idle",
            SyncStatus::PendingDebounce => "pending_debounce",
            SyncStatus::Syncing => "syncing",
            SyncStatus::Saved => "saved",
            SyncStatus::Error => "error",
            SyncStatus::Offline => "offline",
        }
    }
}

/// Observer payload emitted on every controller state change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncSnapshot {
    pub field_id: FieldId,
    pub status: SyncStatus,
    pub current_value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queued_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_saved_at: Option<DateTime<Utc>>,
    pub generation: u64,
    pub online: bool,
}

impl SyncSnapshot {
    /// Short indicator text for the answer field.
    pub fn indicator(&self) -> &'static str {
        match self.status {
            SyncStatus::Idle if self.current_value.is_empty() => "Start typing",
            SyncStatus::Idle | SyncStatus::PendingDebounce => "Waiting to sync...",
            SyncStatus::Syncing => "Syncing...",
            SyncStatus::Saved => "Saved",
            SyncStatus::Error => "Error",
            SyncStatus::Offline => "Offline, answer queued",
        }
    }

    pub fn last_saved_label(&self) -> Option<String> {
        self.last_saved_at
            .map(|at| format!("Last saved at {}", at.format("%H:%M:%S")))
    }
}

/// What a transport submits for one saved answer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuizResponse {
    pub student_id: StudentId,
    pub question_id: FieldId,
    pub answer: String,
    pub timestamp: DateTime<Utc>,
}
