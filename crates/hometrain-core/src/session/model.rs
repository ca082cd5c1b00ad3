//! Session domain model.

use crate::plan::Exercise;
use crate::progress::{ExerciseProgress, ExerciseStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::{AsRefStr, Display, EnumString};

/// Remote status of a session.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Completed,
    Abandoned,
}

/// One user's attempt at executing a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub plan_id: String,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }
}

/// Authoritative view of a session as returned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionProgress {
    pub session: Session,
    /// One entry per exercise, ordered by `exercise_order`.
    pub progress: Vec<ExerciseProgress>,
    /// The plan exercises the session was started with.
    pub exercises: Vec<Exercise>,
}

/// Why a best-effort snapshot is being written.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AbandonReason {
    /// The process is about to terminate.
    Unload,
    /// The session went to the background.
    Backgrounded,
    /// The user chose to stop the session.
    UserCancelled,
}

/// In-memory state of one exercise carried by an abandon snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub series_completed: u32,
    pub status: ExerciseStatus,
    #[serde(default)]
    pub duration_seconds: Option<u32>,
}

/// Payload of the handle-abandon operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbandonRequest {
    /// Snapshot keyed by exercise order.
    pub current_progress: BTreeMap<usize, SnapshotEntry>,
    pub reason: AbandonReason,
}

/// What the store decided after handling an abandon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbandonOutcome {
    pub final_status: SessionStatus,
    pub can_resume: bool,
}
