//! Idempotent progress writes.
//!
//! `IdempotentUpdateClient::record_outcome` is the only path that mutates
//! exercise progress. It reads the ledger, derives the full record to store,
//! skips writes that would not change anything, never lets a completed
//! exercise regress, and keeps the ledger in step with the store.

use crate::ledger::SharedLedger;
use hometrain_core::error::{HomeTrainError, Result};
use hometrain_core::progress::{
    ExerciseProgress, ExerciseStatus, Outcome, OutcomeIntent, ProgressPatch,
};
use hometrain_core::session::SessionRepository;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// One in-flight operation per key. A second caller is refused, not queued.
#[derive(Debug, Default)]
pub struct SingleFlight {
    in_flight: Mutex<HashSet<String>>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `key` until the returned permit is dropped.
    ///
    /// # Errors
    ///
    /// Returns `HomeTrainError::Busy` if `key` is already claimed.
    pub fn try_acquire(self: &Arc<Self>, key: &str) -> Result<FlightPermit> {
        let mut in_flight = self
            .in_flight
            .lock()
            .map_err(|_| HomeTrainError::internal("single-flight lock poisoned"))?;
        if !in_flight.insert(key.to_string()) {
            return Err(HomeTrainError::busy(format!("session:{key}")));
        }
        Ok(FlightPermit {
            owner: Arc::clone(self),
            key: key.to_string(),
        })
    }

    pub fn is_in_flight(&self, key: &str) -> bool {
        self.in_flight
            .lock()
            .map(|set| set.contains(key))
            .unwrap_or(false)
    }
}

/// Releases its key on drop.
#[derive(Debug)]
pub struct FlightPermit {
    owner: Arc<SingleFlight>,
    key: String,
}

impl Drop for FlightPermit {
    fn drop(&mut self) {
        if let Ok(mut in_flight) = self.owner.in_flight.lock() {
            in_flight.remove(&self.key);
        }
    }
}

/// What `record_outcome` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordDisposition {
    /// A full record was written.
    Written,
    /// The exercise was already completed; only its duration was replaced.
    DurationMerged,
    /// The stored record already matches; nothing was sent.
    Unchanged,
    /// The outcome would regress a completed exercise and was dropped.
    Ignored,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordResult {
    pub progress: ExerciseProgress,
    pub disposition: RecordDisposition,
}

/// Wraps progress writes so repeated calls never double-record.
#[derive(Clone)]
pub struct IdempotentUpdateClient {
    sessions: Arc<dyn SessionRepository>,
    ledger: SharedLedger,
    flights: Arc<SingleFlight>,
}

impl IdempotentUpdateClient {
    pub fn new(sessions: Arc<dyn SessionRepository>, ledger: SharedLedger) -> Self {
        Self {
            sessions,
            ledger,
            flights: Arc::new(SingleFlight::new()),
        }
    }

    pub fn ledger(&self) -> SharedLedger {
        Arc::clone(&self.ledger)
    }

    /// Guard shared with the abandonment monitor.
    pub fn flights(&self) -> Arc<SingleFlight> {
        Arc::clone(&self.flights)
    }

    /// Records the outcome of one exercise.
    ///
    /// # Arguments
    ///
    /// * `session_id` - Session the exercise belongs to
    /// * `exercise_order` - Zero-based index of the exercise in the plan
    /// * `outcome` - Series done and what the user intends
    ///
    /// # Errors
    ///
    /// - `Busy` if another record for the session is in flight
    /// - `Conflict` if the index is outside the ledger
    /// - `Validation` if the series total is zero
    /// - the store error if the write fails after its single retry; the
    ///   intended record is then staged in the ledger as unsynced
    pub async fn record_outcome(
        &self,
        session_id: &str,
        exercise_order: usize,
        outcome: Outcome,
    ) -> Result<RecordResult> {
        let _permit = self.flights.try_acquire(session_id)?;

        let (current, synced) = {
            let ledger = self.ledger.read().await;
            (
                ledger.current(session_id, exercise_order)?,
                ledger.is_synced(exercise_order),
            )
        };

        let total_series = if current.total_series > 0 {
            current.total_series
        } else {
            outcome.total_series
        };
        if total_series == 0 {
            return Err(HomeTrainError::validation(format!(
                "exercise {exercise_order} has zero total series"
            )));
        }
        let outcome = Outcome {
            series_completed: outcome.series_completed.min(total_series),
            ..outcome
        };

        let patch = if current.status == ExerciseStatus::Completed {
            if !outcome.is_completion_equivalent(total_series) {
                tracing::info!(
                    "[UpdateClient] Ignoring {:?} for completed exercise {} of session {}",
                    outcome.intent,
                    exercise_order,
                    session_id
                );
                return Ok(RecordResult {
                    progress: current,
                    disposition: RecordDisposition::Ignored,
                });
            }
            match outcome.duration_seconds {
                Some(duration) if current.duration_seconds != Some(duration) || !synced => {
                    ProgressPatch {
                        duration_seconds: Some(duration),
                        ..current.to_patch()
                    }
                }
                _ if !synced => current.to_patch(),
                _ => {
                    return Ok(RecordResult {
                        progress: current,
                        disposition: RecordDisposition::Unchanged,
                    });
                }
            }
        } else {
            build_patch(&outcome, total_series)
        };

        if synced && matches_record(&current, &patch) {
            tracing::debug!(
                "[UpdateClient] Exercise {} of session {} already recorded",
                exercise_order,
                session_id
            );
            return Ok(RecordResult {
                progress: current,
                disposition: RecordDisposition::Unchanged,
            });
        }

        let disposition = if current.status == ExerciseStatus::Completed {
            RecordDisposition::DurationMerged
        } else {
            RecordDisposition::Written
        };

        tracing::debug!(
            "[UpdateClient] Writing exercise {} of session {}: {}/{} {}",
            exercise_order,
            session_id,
            patch.series_completed,
            patch.total_series,
            patch.status
        );

        match self.write_with_retry(session_id, exercise_order, &patch).await {
            Ok(stored) => {
                let mut stored = stored;
                if stored.exercise_name.is_empty() {
                    stored.exercise_name = current.exercise_name.clone();
                }
                self.ledger.write().await.apply_synced(stored.clone());
                Ok(RecordResult {
                    progress: stored,
                    disposition,
                })
            }
            Err(err) => {
                tracing::warn!(
                    "[UpdateClient] Write for exercise {} of session {} failed, staging: {}",
                    exercise_order,
                    session_id,
                    err
                );
                self.ledger
                    .write()
                    .await
                    .stage_unsynced(current.with_patch(&patch));
                Err(err)
            }
        }
    }

    /// The write is a keyed upsert, so one retry after a transient failure
    /// cannot double-record.
    async fn write_with_retry(
        &self,
        session_id: &str,
        exercise_order: usize,
        patch: &ProgressPatch,
    ) -> Result<ExerciseProgress> {
        match self
            .sessions
            .update_exercise_progress(session_id, exercise_order, patch)
            .await
        {
            Err(err) if err.is_retryable() => {
                tracing::warn!(
                    "[UpdateClient] Transient failure ({}), retrying once",
                    err
                );
                self.sessions
                    .update_exercise_progress(session_id, exercise_order, patch)
                    .await
            }
            other => other,
        }
    }
}

/// Full record for an outcome on a non-completed exercise.
fn build_patch(outcome: &Outcome, total_series: u32) -> ProgressPatch {
    let (series_completed, status) = match outcome.intent {
        OutcomeIntent::Skip => (0, ExerciseStatus::Skipped),
        OutcomeIntent::Progress | OutcomeIntent::Cancel
            if outcome.series_completed == total_series =>
        {
            (total_series, ExerciseStatus::Completed)
        }
        OutcomeIntent::Progress => (outcome.series_completed, ExerciseStatus::InProgress),
        OutcomeIntent::Cancel => (outcome.series_completed, ExerciseStatus::Cancelled),
    };
    ProgressPatch {
        series_completed,
        total_series,
        status,
        duration_seconds: outcome.duration_seconds,
    }
}

fn matches_record(current: &ExerciseProgress, patch: &ProgressPatch) -> bool {
    current.status == patch.status
        && current.series_completed == patch.series_completed
        && current.total_series == patch.total_series
        && patch
            .duration_seconds
            .is_none_or(|d| current.duration_seconds == Some(d))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::ProgressLedger;
    use async_trait::async_trait;
    use chrono::Utc;
    use hometrain_core::progress::ExerciseFeedback;
    use hometrain_core::session::{
        AbandonOutcome, AbandonRequest, Session, SessionProgress, SessionStatus,
    };
    use std::collections::VecDeque;

    // Mock SessionRepository recording progress writes
    #[derive(Default)]
    struct MockSessionRepository {
        writes: Mutex<Vec<(usize, ProgressPatch)>>,
        failures: Mutex<VecDeque<HomeTrainError>>,
    }

    #[async_trait]
    impl SessionRepository for MockSessionRepository {
        async fn close_active_sessions(&self) -> Result<usize> {
            Ok(0)
        }

        async fn start_session(&self, _plan_id: &str) -> Result<Session> {
            unimplemented!()
        }

        async fn session_progress(&self, _session_id: &str) -> Result<SessionProgress> {
            unimplemented!()
        }

        async fn update_exercise_progress(
            &self,
            session_id: &str,
            exercise_order: usize,
            patch: &ProgressPatch,
        ) -> Result<ExerciseProgress> {
            self.writes.lock().unwrap().push((exercise_order, *patch));
            if let Some(err) = self.failures.lock().unwrap().pop_front() {
                return Err(err);
            }
            Ok(ExerciseProgress::pending(session_id, exercise_order, "", 0).with_patch(patch))
        }

        async fn submit_feedback(
            &self,
            _session_id: &str,
            _exercise_order: usize,
            _feedback: &ExerciseFeedback,
        ) -> Result<()> {
            Ok(())
        }

        async fn handle_abandon(
            &self,
            _session_id: &str,
            _request: &AbandonRequest,
        ) -> Result<AbandonOutcome> {
            unimplemented!()
        }
    }

    async fn client_with(repo: Arc<MockSessionRepository>, len: usize) -> IdempotentUpdateClient {
        let ledger = ProgressLedger::shared();
        let session = Session {
            id: "s-1".into(),
            plan_id: "p-1".into(),
            status: SessionStatus::Active,
            created_at: Utc::now(),
        };
        let rows = (0..len)
            .map(|i| ExerciseProgress::pending("s-1", i, format!("ex-{i}"), 3))
            .collect();
        ledger.write().await.seed(&session, len, rows);
        IdempotentUpdateClient::new(repo, ledger)
    }

    #[test]
    fn test_single_flight_refuses_second_claim() {
        let flights = Arc::new(SingleFlight::new());
        let permit = flights.try_acquire("s-1").unwrap();
        assert!(flights.is_in_flight("s-1"));
        assert!(flights.try_acquire("s-1").unwrap_err().is_busy());
        assert!(flights.try_acquire("s-2").is_ok());

        drop(permit);
        assert!(!flights.is_in_flight("s-1"));
        assert!(flights.try_acquire("s-1").is_ok());
    }

    #[test]
    fn test_build_patch_statuses() {
        assert_eq!(
            build_patch(&Outcome::progress(3, 3), 3).status,
            ExerciseStatus::Completed
        );
        assert_eq!(
            build_patch(&Outcome::progress(1, 3), 3).status,
            ExerciseStatus::InProgress
        );
        let skip = build_patch(&Outcome::skip(3), 3);
        assert_eq!((skip.series_completed, skip.status), (0, ExerciseStatus::Skipped));
        assert_eq!(
            build_patch(&Outcome::cancel(2, 3), 3).status,
            ExerciseStatus::Cancelled
        );
        assert_eq!(
            build_patch(&Outcome::cancel(3, 3), 3).status,
            ExerciseStatus::Completed
        );
    }

    #[tokio::test]
    async fn test_identical_outcome_is_written_once() {
        let repo = Arc::new(MockSessionRepository::default());
        let client = client_with(repo.clone(), 2).await;

        let first = client
            .record_outcome("s-1", 0, Outcome::progress(2, 3))
            .await
            .unwrap();
        let second = client
            .record_outcome("s-1", 0, Outcome::progress(2, 3))
            .await
            .unwrap();

        assert_eq!(first.disposition, RecordDisposition::Written);
        assert_eq!(second.disposition, RecordDisposition::Unchanged);
        assert_eq!(repo.writes.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_completed_exercise_only_merges_duration() {
        let repo = Arc::new(MockSessionRepository::default());
        let client = client_with(repo.clone(), 1).await;

        client
            .record_outcome("s-1", 0, Outcome::progress(3, 3))
            .await
            .unwrap();
        let ignored = client
            .record_outcome("s-1", 0, Outcome::progress(1, 3))
            .await
            .unwrap();
        assert_eq!(ignored.disposition, RecordDisposition::Ignored);
        assert_eq!(ignored.progress.status, ExerciseStatus::Completed);

        let merged = client
            .record_outcome("s-1", 0, Outcome::progress(3, 3).with_duration(Some(95)))
            .await
            .unwrap();
        assert_eq!(merged.disposition, RecordDisposition::DurationMerged);
        assert_eq!(merged.progress.duration_seconds, Some(95));

        let writes = repo.writes.lock().unwrap();
        assert_eq!(writes.len(), 2);
        assert_eq!(writes[1].1.status, ExerciseStatus::Completed);
    }

    #[tokio::test]
    async fn test_series_are_clamped_to_the_ledger_total() {
        let repo = Arc::new(MockSessionRepository::default());
        let client = client_with(repo.clone(), 1).await;

        let result = client
            .record_outcome("s-1", 0, Outcome::progress(9, 9))
            .await
            .unwrap();
        assert_eq!(result.progress.series_completed, 3);
        assert_eq!(result.progress.total_series, 3);
        assert_eq!(result.progress.status, ExerciseStatus::Completed);
    }

    #[tokio::test]
    async fn test_zero_total_is_a_validation_error() {
        let repo = Arc::new(MockSessionRepository::default());
        let ledger = ProgressLedger::shared();
        let session = Session {
            id: "s-1".into(),
            plan_id: "p-1".into(),
            status: SessionStatus::Active,
            created_at: Utc::now(),
        };
        ledger.write().await.seed(&session, 1, Vec::new());
        let client = IdempotentUpdateClient::new(repo, ledger);

        let err = client
            .record_outcome("s-1", 0, Outcome::progress(0, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, HomeTrainError::Validation(_)));
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried_once() {
        let repo = Arc::new(MockSessionRepository::default());
        repo.failures
            .lock()
            .unwrap()
            .push_back(HomeTrainError::transient("timeout"));
        let client = client_with(repo.clone(), 1).await;

        let result = client
            .record_outcome("s-1", 0, Outcome::progress(1, 3))
            .await
            .unwrap();
        assert_eq!(result.disposition, RecordDisposition::Written);
        assert_eq!(repo.writes.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_write_is_staged_unsynced() {
        let repo = Arc::new(MockSessionRepository::default());
        {
            let mut failures = repo.failures.lock().unwrap();
            failures.push_back(HomeTrainError::transient("timeout"));
            failures.push_back(HomeTrainError::transient("timeout"));
        }
        let client = client_with(repo.clone(), 2).await;

        let err = client
            .record_outcome("s-1", 1, Outcome::progress(2, 3))
            .await
            .unwrap_err();
        assert!(err.is_retryable());

        let ledger = client.ledger();
        let ledger = ledger.read().await;
        assert!(ledger.has_unsynced());
        assert_eq!(ledger.get(1).unwrap().series_completed, 2);
        assert_eq!(ledger.get(1).unwrap().exercise_name, "ex-1");
    }

    #[tokio::test]
    async fn test_out_of_range_index_is_conflict() {
        let repo = Arc::new(MockSessionRepository::default());
        let client = client_with(repo.clone(), 2).await;
        let err = client
            .record_outcome("s-1", 2, Outcome::progress(1, 3))
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        assert!(repo.writes.lock().unwrap().is_empty());
    }
}
