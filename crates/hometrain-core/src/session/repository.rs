//! Session repository trait.
//!
//! Defines the interface for the remote session store.

use super::model::{AbandonOutcome, AbandonRequest, Session, SessionProgress};
use crate::error::Result;
use crate::progress::{ExerciseFeedback, ExerciseProgress, ProgressPatch};
use async_trait::async_trait;

/// An abstract repository for sessions and their exercise progress.
///
/// This trait decouples the session core from the transport used to reach
/// the store (HTTP in production, memory in tests).
///
/// # Implementation Notes
///
/// - `close_active_sessions` must be idempotent.
/// - `update_exercise_progress` is an upsert keyed by
///   `(session_id, exercise_order)`: sending the same patch twice has the
///   effect of sending it once.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Closes every active session of the user.
    ///
    /// # Returns
    ///
    /// - `Ok(count)`: Number of sessions closed (0 when none was active)
    /// - `Err(_)`: Error occurred while closing
    async fn close_active_sessions(&self) -> Result<usize>;

    /// Creates a new active session for a persisted plan, together with one
    /// pending progress entry per exercise.
    async fn start_session(&self, plan_id: &str) -> Result<Session>;

    /// Fetches the session, its progress entries and its plan exercises.
    ///
    /// # Errors
    ///
    /// Returns `HomeTrainError::NotFound` if the session does not exist.
    async fn session_progress(&self, session_id: &str) -> Result<SessionProgress>;

    /// Replaces the progress record of one exercise.
    ///
    /// # Returns
    ///
    /// - `Ok(ExerciseProgress)`: The record as stored after the write
    /// - `Err(_)`: Error occurred during the write
    async fn update_exercise_progress(
        &self,
        session_id: &str,
        exercise_order: usize,
        patch: &ProgressPatch,
    ) -> Result<ExerciseProgress>;

    /// Attaches feedback to one exercise of a session.
    async fn submit_feedback(
        &self,
        session_id: &str,
        exercise_order: usize,
        feedback: &ExerciseFeedback,
    ) -> Result<()>;

    /// Persists an abandon snapshot. Best-effort from the caller's side.
    async fn handle_abandon(
        &self,
        session_id: &str,
        request: &AbandonRequest,
    ) -> Result<AbandonOutcome>;
}
