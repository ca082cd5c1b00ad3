//! Progress ledger.
//!
//! Client-side record of the per-exercise state of the active session. It is
//! seeded from the store's authoritative progress list and afterwards only
//! changed through the idempotent update client. Entries whose write has not
//! been acknowledged are kept as *unsynced* so an abandon snapshot can carry
//! them.

use hometrain_core::error::{HomeTrainError, Result};
use hometrain_core::progress::{
    ExerciseFeedback, ExerciseProgress, ResumePoint, completion_percentage, resume_point,
};
use hometrain_core::session::{AbandonReason, AbandonRequest, Session, SnapshotEntry};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Ledger shared between the session controller and the abandonment monitor.
pub type SharedLedger = Arc<RwLock<ProgressLedger>>;

#[derive(Debug, Clone, PartialEq)]
struct LedgerEntry {
    progress: ExerciseProgress,
    synced: bool,
}

#[derive(Debug, Default)]
pub struct ProgressLedger {
    session_id: Option<String>,
    active: bool,
    plan_len: usize,
    entries: BTreeMap<usize, LedgerEntry>,
    stale: bool,
}

impl ProgressLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedLedger {
        Arc::new(RwLock::new(Self::new()))
    }

    /// Replaces the whole ledger with the store's view of `session`.
    ///
    /// Entries at or beyond `plan_len` are dropped.
    pub fn seed(&mut self, session: &Session, plan_len: usize, progress: Vec<ExerciseProgress>) {
        self.session_id = Some(session.id.clone());
        self.active = session.is_active();
        self.plan_len = plan_len;
        self.stale = false;
        self.entries = progress
            .into_iter()
            .filter(|p| p.exercise_order < plan_len)
            .map(|p| {
                (
                    p.exercise_order,
                    LedgerEntry {
                        progress: p,
                        synced: true,
                    },
                )
            })
            .collect();
    }

    /// Forgets the session entirely.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// True while the ledger tracks a session the store considers active.
    pub fn is_session_active(&self) -> bool {
        self.session_id.is_some() && self.active
    }

    pub fn set_session_active(&mut self, active: bool) {
        self.active = active;
    }

    pub fn plan_len(&self) -> usize {
        self.plan_len
    }

    pub fn get(&self, exercise_order: usize) -> Option<&ExerciseProgress> {
        self.entries.get(&exercise_order).map(|e| &e.progress)
    }

    pub fn is_synced(&self, exercise_order: usize) -> bool {
        self.entries
            .get(&exercise_order)
            .is_none_or(|e| e.synced)
    }

    /// Current record for `exercise_order` in `session_id`. A missing entry
    /// inside the plan is pending.
    ///
    /// # Errors
    ///
    /// Returns `HomeTrainError::Conflict` if the ledger tracks another
    /// session or the index is outside the plan.
    pub fn current(&self, session_id: &str, exercise_order: usize) -> Result<ExerciseProgress> {
        if self.session_id() != Some(session_id) {
            return Err(HomeTrainError::conflict(format!(
                "session {session_id} is not loaded in the ledger"
            )));
        }
        if exercise_order >= self.plan_len {
            return Err(HomeTrainError::conflict(format!(
                "exercise {exercise_order} is outside the plan ({} exercises)",
                self.plan_len
            )));
        }
        Ok(self.get(exercise_order).cloned().unwrap_or_else(|| {
            ExerciseProgress::pending(session_id, exercise_order, String::new(), 0)
        }))
    }

    /// Records a write acknowledged by the store.
    pub fn apply_synced(&mut self, progress: ExerciseProgress) {
        self.insert(progress, true);
    }

    /// Records an intended state whose write failed.
    pub fn stage_unsynced(&mut self, progress: ExerciseProgress) {
        self.insert(progress, false);
    }

    fn insert(&mut self, progress: ExerciseProgress, synced: bool) {
        if progress.exercise_order >= self.plan_len {
            return;
        }
        self.entries
            .insert(progress.exercise_order, LedgerEntry { progress, synced });
    }

    pub fn set_feedback(&mut self, exercise_order: usize, feedback: ExerciseFeedback) {
        if let Some(entry) = self.entries.get_mut(&exercise_order) {
            entry.progress.feedback = Some(feedback);
        }
    }

    pub fn has_unsynced(&self) -> bool {
        self.entries.values().any(|e| !e.synced)
    }

    /// Any exercise started or finished.
    pub fn has_progress(&self) -> bool {
        self.entries
            .values()
            .any(|e| e.progress.is_terminal() || e.progress.series_completed > 0)
    }

    /// The store may hold newer data than this ledger.
    pub fn mark_stale(&mut self) {
        self.stale = true;
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Entries in exercise order.
    pub fn progress(&self) -> Vec<ExerciseProgress> {
        self.entries.values().map(|e| e.progress.clone()).collect()
    }

    pub fn completion_percentage(&self) -> f64 {
        completion_percentage(&self.progress(), self.plan_len)
    }

    pub fn resume_point(&self) -> ResumePoint {
        resume_point(&self.progress(), self.plan_len)
    }

    /// Builds the abandon payload from every entry with progress.
    ///
    /// Returns `None` when no session is tracked.
    pub fn snapshot(&self, reason: AbandonReason) -> Option<(String, AbandonRequest)> {
        let session_id = self.session_id.clone()?;
        let current_progress = self
            .entries
            .iter()
            .filter(|(_, e)| e.progress.is_terminal() || e.progress.series_completed > 0)
            .map(|(order, e)| {
                (
                    *order,
                    SnapshotEntry {
                        series_completed: e.progress.series_completed,
                        status: e.progress.status,
                        duration_seconds: e.progress.duration_seconds,
                    },
                )
            })
            .collect();
        Some((
            session_id,
            AbandonRequest {
                current_progress,
                reason,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use hometrain_core::progress::ExerciseStatus;
    use hometrain_core::session::SessionStatus;

    fn session() -> Session {
        Session {
            id: "s-1".into(),
            plan_id: "p-1".into(),
            status: SessionStatus::Active,
            created_at: Utc::now(),
        }
    }

    fn seeded(len: usize) -> ProgressLedger {
        let mut ledger = ProgressLedger::new();
        let rows = (0..len)
            .map(|i| ExerciseProgress::pending("s-1", i, format!("ex-{i}"), 4))
            .collect();
        ledger.seed(&session(), len, rows);
        ledger
    }

    #[test]
    fn test_seed_drops_rows_outside_the_plan() {
        let mut ledger = ProgressLedger::new();
        ledger.seed(
            &session(),
            2,
            vec![
                ExerciseProgress::pending("s-1", 0, "a", 3),
                ExerciseProgress::pending("s-1", 5, "z", 3),
            ],
        );
        assert_eq!(ledger.progress().len(), 1);
        assert!(ledger.is_session_active());
        assert!(!ledger.has_progress());
    }

    #[test]
    fn test_current_treats_missing_entries_as_pending() {
        let mut ledger = ProgressLedger::new();
        ledger.seed(&session(), 3, Vec::new());
        let current = ledger.current("s-1", 2).unwrap();
        assert_eq!(current.status, ExerciseStatus::Pending);
        assert_eq!(current.total_series, 0);

        assert!(ledger.current("s-1", 3).unwrap_err().is_conflict());
        assert!(ledger.current("other", 0).unwrap_err().is_conflict());
    }

    #[test]
    fn test_unsynced_entries_and_snapshot() {
        let mut ledger = seeded(3);
        let mut first = ledger.get(0).unwrap().clone();
        first.status = ExerciseStatus::Completed;
        first.series_completed = 4;
        ledger.apply_synced(first);

        let mut second = ledger.get(1).unwrap().clone();
        second.status = ExerciseStatus::InProgress;
        second.series_completed = 2;
        ledger.stage_unsynced(second);

        assert!(ledger.has_unsynced());
        assert!(!ledger.is_synced(1));
        assert!(ledger.is_synced(2));

        let (session_id, request) = ledger.snapshot(AbandonReason::Unload).unwrap();
        assert_eq!(session_id, "s-1");
        assert_eq!(request.current_progress.len(), 2);
        assert_eq!(request.current_progress[&1].series_completed, 2);
        assert_eq!(ledger.resume_point(), ResumePoint::At(1));
        assert!((ledger.completion_percentage() - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_clear_and_stale_flag() {
        let mut ledger = seeded(1);
        ledger.mark_stale();
        assert!(ledger.is_stale());
        ledger.clear();
        assert!(ledger.session_id().is_none());
        assert!(!ledger.is_stale());
        assert!(ledger.snapshot(AbandonReason::Backgrounded).is_none());
    }
}
