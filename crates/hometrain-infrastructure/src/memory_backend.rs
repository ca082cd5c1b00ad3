//! In-memory implementation of every store trait.
//!
//! Backs the CLI's offline mode and the application test-suite. Mirrors the
//! remote store's observable behaviour: progress rows are created on session
//! start, updates are keyed upserts, and a session whose rows are all
//! terminal is completed. Failures can be injected per operation.

use async_trait::async_trait;
use chrono::Utc;
use hometrain_core::error::{HomeTrainError, Result};
use hometrain_core::plan::{
    CurrentPlan, Exercise, ExerciseTarget, Plan, PlanConstraints, PlanGenerator, PlanRepository,
    PlanRequest, StoredPlan, TrainingType,
};
use hometrain_core::progress::{
    ExerciseFeedback, ExerciseProgress, ExerciseStatus, ProgressPatch,
};
use hometrain_core::rejection::{NewRejection, RejectionRepository, RejectionRule};
use hometrain_core::session::{
    AbandonOutcome, AbandonRequest, Session, SessionProgress, SessionRepository, SessionStatus,
};
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// Series count used when a plan exercise carries none.
const DEFAULT_TOTAL_SERIES: u32 = 4;

/// Default number of exercises per generated plan.
pub const DEFAULT_PLAN_SIZE: usize = 5;

/// Operations of the backend, used for call accounting and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendOp {
    GeneratePlan,
    SavePlan,
    CurrentPlan,
    CloseActive,
    StartSession,
    SessionProgress,
    UpdateProgress,
    SubmitFeedback,
    HandleAbandon,
    SubmitRejections,
    ListRejections,
    DeleteRejection,
}

struct SessionRecord {
    session: Session,
    exercises: Vec<Exercise>,
    progress: Vec<ExerciseProgress>,
}

impl SessionRecord {
    fn snapshot(&self) -> SessionProgress {
        SessionProgress {
            session: self.session.clone(),
            progress: self.progress.clone(),
            exercises: self.exercises.clone(),
        }
    }

    fn all_terminal(&self) -> bool {
        !self.progress.is_empty() && self.progress.iter().all(ExerciseProgress::is_terminal)
    }

    /// Abandon only counts completed and skipped rows as finished.
    fn all_finished(&self) -> bool {
        !self.progress.is_empty()
            && self.progress.iter().all(|p| {
                matches!(p.status, ExerciseStatus::Completed | ExerciseStatus::Skipped)
            })
    }

    /// A cancelled row with no series is not progress.
    fn has_progress(&self) -> bool {
        self.progress.iter().any(|p| {
            p.series_completed > 0
                || matches!(
                    p.status,
                    ExerciseStatus::Completed | ExerciseStatus::Skipped | ExerciseStatus::InProgress
                )
        })
    }
}

#[derive(Default)]
struct BackendState {
    plans: Vec<StoredPlan>,
    sessions: Vec<SessionRecord>,
    rejections: Vec<RejectionRule>,
    failures: HashMap<BackendOp, VecDeque<HomeTrainError>>,
    log: Vec<BackendOp>,
    generate_requests: Vec<PlanRequest>,
    total_series_override: Option<u32>,
}

impl BackendState {
    fn session_mut(&mut self, session_id: &str) -> Result<&mut SessionRecord> {
        self.sessions
            .iter_mut()
            .find(|r| r.session.id == session_id)
            .ok_or_else(|| HomeTrainError::not_found("Session", session_id))
    }
}

/// Store, generator and rejection registry held in process memory.
pub struct InMemoryTrainingBackend {
    state: Mutex<BackendState>,
    plan_size: usize,
    update_latency: Option<Duration>,
    abandon_latency: Option<Duration>,
}

impl InMemoryTrainingBackend {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(BackendState::default()),
            plan_size: DEFAULT_PLAN_SIZE,
            update_latency: None,
            abandon_latency: None,
        }
    }

    /// Number of exercises each generated plan contains.
    pub fn with_plan_size(mut self, plan_size: usize) -> Self {
        self.plan_size = plan_size;
        self
    }

    /// Delays every progress write, making in-flight windows observable.
    pub fn with_update_latency(mut self, latency: Duration) -> Self {
        self.update_latency = Some(latency);
        self
    }

    /// Delays every abandon snapshot before it is applied.
    pub fn with_abandon_latency(mut self, latency: Duration) -> Self {
        self.abandon_latency = Some(latency);
        self
    }

    /// Makes the next call of `op` fail with `error`. Queued failures are
    /// consumed in order.
    pub fn fail_next(&self, op: BackendOp, error: HomeTrainError) {
        if let Ok(mut state) = self.state.lock() {
            state.failures.entry(op).or_default().push_back(error);
        }
    }

    /// Overrides the series count of progress rows created from now on, like
    /// a store that adjusts the plan's nominal value.
    pub fn override_total_series(&self, total_series: Option<u32>) {
        if let Ok(mut state) = self.state.lock() {
            state.total_series_override = total_series;
        }
    }

    /// Number of calls received for `op`, failed ones included.
    pub fn calls(&self, op: BackendOp) -> usize {
        self.state
            .lock()
            .map(|s| s.log.iter().filter(|o| **o == op).count())
            .unwrap_or_default()
    }

    /// Every call received, in order.
    pub fn call_log(&self) -> Vec<BackendOp> {
        self.state.lock().map(|s| s.log.clone()).unwrap_or_default()
    }

    /// Requests passed to the generator, in order.
    pub fn generate_requests(&self) -> Vec<PlanRequest> {
        self.state
            .lock()
            .map(|s| s.generate_requests.clone())
            .unwrap_or_default()
    }

    pub fn active_session_count(&self) -> usize {
        self.state
            .lock()
            .map(|s| s.sessions.iter().filter(|r| r.session.is_active()).count())
            .unwrap_or_default()
    }

    pub fn session_status(&self, session_id: &str) -> Option<SessionStatus> {
        self.state.lock().ok().and_then(|s| {
            s.sessions
                .iter()
                .find(|r| r.session.id == session_id)
                .map(|r| r.session.status)
        })
    }

    /// Records the call, then either fails with an injected error or hands
    /// out the locked state.
    fn enter(&self, op: BackendOp) -> Result<MutexGuard<'_, BackendState>> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| HomeTrainError::internal("in-memory backend lock poisoned"))?;
        state.log.push(op);
        if let Some(err) = state.failures.get_mut(&op).and_then(VecDeque::pop_front) {
            tracing::debug!("[InMemoryBackend] Injected failure for {:?}: {}", op, err);
            return Err(err);
        }
        Ok(state)
    }
}

impl Default for InMemoryTrainingBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn catalog(training_type: TrainingType) -> Vec<Exercise> {
    use ExerciseTarget::{DurationSeconds, Reps};

    let entries: &[(&str, u32, ExerciseTarget, u32)] = match training_type {
        TrainingType::Functional => &[
            ("Burpees", 3, Reps(10), 60),
            ("Goblet squat", 3, Reps(12), 60),
            ("Reverse lunges", 3, Reps(10), 45),
            ("Bear crawl", 3, DurationSeconds(30), 45),
            ("Single-leg deadlift", 3, Reps(8), 60),
            ("Plank with reach", 3, DurationSeconds(30), 30),
            ("Step-ups", 3, Reps(12), 45),
        ],
        TrainingType::Hiit => &[
            ("Burpees", 4, DurationSeconds(30), 30),
            ("Mountain climbers", 4, DurationSeconds(30), 30),
            ("Jump squats", 4, DurationSeconds(30), 30),
            ("High knees", 4, DurationSeconds(30), 30),
            ("Skater jumps", 4, DurationSeconds(30), 30),
            ("Plank jacks", 4, DurationSeconds(30), 30),
            ("Tuck jumps", 4, DurationSeconds(20), 40),
        ],
        TrainingType::Strength => &[
            ("Burpees", 3, Reps(8), 90),
            ("Push-ups", 4, Reps(10), 90),
            ("Bulgarian split squat", 4, Reps(8), 90),
            ("Pike push-ups", 3, Reps(8), 90),
            ("Glute bridge", 4, Reps(15), 60),
            ("Band rows", 4, Reps(12), 60),
            ("Hollow hold", 3, DurationSeconds(30), 60),
        ],
    };

    entries
        .iter()
        .map(|(name, series, target, rest)| {
            Exercise::new(*name, *series, *target).with_rest(*rest)
        })
        .collect()
}

#[async_trait]
impl PlanGenerator for InMemoryTrainingBackend {
    async fn generate_plan(&self, request: &PlanRequest) -> Result<Plan> {
        let mut state = self.enter(BackendOp::GeneratePlan)?;
        state.generate_requests.push(request.clone());

        let exercises: Vec<Exercise> = catalog(request.constraints.training_type)
            .into_iter()
            .filter(|e| !request.excludes(&e.key()))
            .take(self.plan_size)
            .collect();

        if exercises.is_empty() {
            return Err(HomeTrainError::validation(
                "every catalog exercise is excluded",
            ));
        }

        let mut plan = Plan::new(exercises);
        plan.message = Some(format!(
            "{} session with {} equipment",
            request.constraints.training_type, request.constraints.equipment
        ));
        Ok(plan)
    }
}

#[async_trait]
impl PlanRepository for InMemoryTrainingBackend {
    async fn save_plan(&self, plan: &Plan, constraints: PlanConstraints) -> Result<StoredPlan> {
        let mut state = self.enter(BackendOp::SavePlan)?;
        let stored = StoredPlan {
            id: uuid::Uuid::new_v4().to_string(),
            plan: plan.clone(),
            equipment: constraints.equipment,
            training_type: constraints.training_type,
            created_at: Utc::now(),
        };
        state.plans.push(stored.clone());
        Ok(stored)
    }

    async fn current_plan(&self) -> Result<CurrentPlan> {
        let state = self.enter(BackendOp::CurrentPlan)?;
        let Some(plan) = state.plans.last().cloned() else {
            return Ok(CurrentPlan::default());
        };
        let session = state
            .sessions
            .iter()
            .rev()
            .find(|r| r.session.plan_id == plan.id && r.session.is_active())
            .map(|r| r.session.clone());
        Ok(CurrentPlan {
            plan: Some(plan),
            session,
        })
    }
}

#[async_trait]
impl SessionRepository for InMemoryTrainingBackend {
    async fn close_active_sessions(&self) -> Result<usize> {
        let mut state = self.enter(BackendOp::CloseActive)?;
        let mut closed = 0;
        for record in state.sessions.iter_mut().filter(|r| r.session.is_active()) {
            record.session.status = SessionStatus::Abandoned;
            closed += 1;
        }
        Ok(closed)
    }

    async fn start_session(&self, plan_id: &str) -> Result<Session> {
        let mut state = self.enter(BackendOp::StartSession)?;
        let plan = state
            .plans
            .iter()
            .find(|p| p.id == plan_id)
            .cloned()
            .ok_or_else(|| HomeTrainError::not_found("Plan", plan_id))?;

        let session = Session {
            id: uuid::Uuid::new_v4().to_string(),
            plan_id: plan.id.clone(),
            status: SessionStatus::Active,
            created_at: Utc::now(),
        };

        let progress = plan
            .plan
            .exercises
            .iter()
            .enumerate()
            .map(|(order, exercise)| {
                let total = state
                    .total_series_override
                    .unwrap_or(exercise.target_series);
                let total = if total == 0 { DEFAULT_TOTAL_SERIES } else { total };
                ExerciseProgress::pending(session.id.clone(), order, exercise.name.clone(), total)
            })
            .collect();

        state.sessions.push(SessionRecord {
            session: session.clone(),
            exercises: plan.plan.exercises,
            progress,
        });
        Ok(session)
    }

    async fn session_progress(&self, session_id: &str) -> Result<SessionProgress> {
        let mut state = self.enter(BackendOp::SessionProgress)?;
        Ok(state.session_mut(session_id)?.snapshot())
    }

    async fn update_exercise_progress(
        &self,
        session_id: &str,
        exercise_order: usize,
        patch: &ProgressPatch,
    ) -> Result<ExerciseProgress> {
        // Counted and failure-checked before the simulated latency.
        drop(self.enter(BackendOp::UpdateProgress)?);
        if let Some(latency) = self.update_latency {
            tokio::time::sleep(latency).await;
        }

        let mut state = self
            .state
            .lock()
            .map_err(|_| HomeTrainError::internal("in-memory backend lock poisoned"))?;
        let record = state.session_mut(session_id)?;
        if record.session.status == SessionStatus::Abandoned {
            return Err(HomeTrainError::conflict(format!(
                "session {session_id} is abandoned"
            )));
        }

        let entry = record
            .progress
            .iter_mut()
            .find(|p| p.exercise_order == exercise_order)
            .ok_or_else(|| {
                HomeTrainError::conflict(format!(
                    "exercise {exercise_order} is not part of session {session_id}"
                ))
            })?;

        let mut patch = *patch;
        patch.series_completed = patch.series_completed.min(patch.total_series);
        *entry = entry.with_patch(&patch);
        let updated = entry.clone();

        if record.all_terminal() {
            record.session.status = SessionStatus::Completed;
            tracing::debug!("[InMemoryBackend] Session {} completed", session_id);
        }
        Ok(updated)
    }

    async fn submit_feedback(
        &self,
        session_id: &str,
        exercise_order: usize,
        feedback: &ExerciseFeedback,
    ) -> Result<()> {
        let mut state = self.enter(BackendOp::SubmitFeedback)?;
        let record = state.session_mut(session_id)?;
        let entry = record
            .progress
            .iter_mut()
            .find(|p| p.exercise_order == exercise_order)
            .ok_or_else(|| HomeTrainError::not_found("Exercise", exercise_order.to_string()))?;
        entry.feedback = Some(feedback.clone());
        Ok(())
    }

    async fn handle_abandon(
        &self,
        session_id: &str,
        request: &AbandonRequest,
    ) -> Result<AbandonOutcome> {
        drop(self.enter(BackendOp::HandleAbandon)?);
        if let Some(latency) = self.abandon_latency {
            tokio::time::sleep(latency).await;
        }

        let mut state = self
            .state
            .lock()
            .map_err(|_| HomeTrainError::internal("in-memory backend lock poisoned"))?;
        let record = state.session_mut(session_id)?;

        if !record.session.is_active() {
            return Ok(AbandonOutcome {
                final_status: record.session.status,
                can_resume: false,
            });
        }

        for (order, snapshot) in &request.current_progress {
            if snapshot.series_completed == 0 {
                continue;
            }
            let Some(entry) = record
                .progress
                .iter_mut()
                .find(|p| p.exercise_order == *order)
            else {
                continue;
            };
            if entry.status == ExerciseStatus::Completed {
                continue;
            }
            let series = snapshot.series_completed.min(entry.total_series);
            let status = if series == entry.total_series {
                ExerciseStatus::Completed
            } else if snapshot.status.is_terminal() {
                snapshot.status
            } else {
                ExerciseStatus::InProgress
            };
            *entry = entry.with_patch(&ProgressPatch {
                series_completed: series,
                total_series: entry.total_series,
                status,
                duration_seconds: snapshot.duration_seconds,
            });
        }

        let outcome = if record.all_finished() {
            record.session.status = SessionStatus::Completed;
            AbandonOutcome {
                final_status: SessionStatus::Completed,
                can_resume: false,
            }
        } else if record.has_progress() {
            AbandonOutcome {
                final_status: SessionStatus::Active,
                can_resume: true,
            }
        } else {
            record.session.status = SessionStatus::Abandoned;
            AbandonOutcome {
                final_status: SessionStatus::Abandoned,
                can_resume: false,
            }
        };

        tracing::debug!(
            "[InMemoryBackend] handle_abandon({}, {}) -> {:?}",
            session_id,
            request.reason,
            outcome.final_status
        );
        Ok(outcome)
    }
}

#[async_trait]
impl RejectionRepository for InMemoryTrainingBackend {
    async fn submit_rejections(&self, rejections: &[NewRejection]) -> Result<Vec<RejectionRule>> {
        let mut state = self.enter(BackendOp::SubmitRejections)?;
        let now = Utc::now();
        let rules: Vec<RejectionRule> = rejections
            .iter()
            .map(|draft| RejectionRule {
                id: uuid::Uuid::new_v4().to_string(),
                exercise_key: draft.exercise_key.clone(),
                exercise_name: draft.exercise_name.clone(),
                equipment: draft.equipment,
                training_type: draft.training_type,
                category: draft.category,
                reason: draft.reason.clone(),
                expires_at: draft.expires_at,
                created_at: now,
            })
            .collect();
        state.rejections.extend(rules.iter().cloned());
        Ok(rules)
    }

    async fn list_rejections(&self, constraints: PlanConstraints) -> Result<Vec<RejectionRule>> {
        let state = self.enter(BackendOp::ListRejections)?;
        let now = Utc::now();
        Ok(state
            .rejections
            .iter()
            .filter(|r| r.applies_to(constraints) && r.is_active(now))
            .cloned()
            .collect())
    }

    async fn delete_rejection(&self, rejection_id: &str) -> Result<()> {
        let mut state = self.enter(BackendOp::DeleteRejection)?;
        state.rejections.retain(|r| r.id != rejection_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hometrain_core::plan::EquipmentType;
    use hometrain_core::rejection::RejectionCategory;
    use hometrain_core::session::{AbandonReason, SnapshotEntry};
    use std::collections::BTreeMap;

    fn constraints() -> PlanConstraints {
        PlanConstraints::new(EquipmentType::Minimal, TrainingType::Hiit)
    }

    async fn started(backend: &InMemoryTrainingBackend) -> Session {
        let plan = backend
            .generate_plan(&PlanRequest::new(constraints()))
            .await
            .unwrap();
        let stored = backend.save_plan(&plan, constraints()).await.unwrap();
        backend.start_session(&stored.id).await.unwrap()
    }

    fn patch(series: u32, total: u32, status: ExerciseStatus) -> ProgressPatch {
        ProgressPatch {
            series_completed: series,
            total_series: total,
            status,
            duration_seconds: None,
        }
    }

    #[tokio::test]
    async fn test_generate_plan_honours_exclusions() {
        let backend = InMemoryTrainingBackend::new().with_plan_size(3);
        let plan = backend
            .generate_plan(&PlanRequest::new(constraints()))
            .await
            .unwrap();
        assert_eq!(plan.len(), 3);
        assert!(plan.contains_key("burpees"));

        let plan = backend
            .generate_plan(&PlanRequest::new(constraints()).with_exclusions(["burpees"]))
            .await
            .unwrap();
        assert!(!plan.contains_key("burpees"));
        assert_eq!(backend.generate_requests().len(), 2);
    }

    #[tokio::test]
    async fn test_start_session_creates_pending_rows() {
        let backend = InMemoryTrainingBackend::new().with_plan_size(3);
        backend.override_total_series(Some(5));
        let session = started(&backend).await;

        let progress = backend.session_progress(&session.id).await.unwrap();
        assert_eq!(progress.progress.len(), 3);
        assert_eq!(progress.exercises.len(), 3);
        assert!(progress
            .progress
            .iter()
            .all(|p| p.status == ExerciseStatus::Pending && p.total_series == 5));
    }

    #[tokio::test]
    async fn test_close_active_sessions() {
        let backend = InMemoryTrainingBackend::new();
        started(&backend).await;
        started(&backend).await;
        assert_eq!(backend.active_session_count(), 2);

        assert_eq!(backend.close_active_sessions().await.unwrap(), 2);
        assert_eq!(backend.close_active_sessions().await.unwrap(), 0);
        assert_eq!(backend.active_session_count(), 0);
    }

    #[tokio::test]
    async fn test_all_terminal_rows_complete_the_session() {
        let backend = InMemoryTrainingBackend::new().with_plan_size(2);
        let session = started(&backend).await;

        backend
            .update_exercise_progress(&session.id, 0, &patch(4, 4, ExerciseStatus::Completed))
            .await
            .unwrap();
        assert_eq!(backend.session_status(&session.id), Some(SessionStatus::Active));

        backend
            .update_exercise_progress(&session.id, 1, &patch(0, 4, ExerciseStatus::Skipped))
            .await
            .unwrap();
        assert_eq!(
            backend.session_status(&session.id),
            Some(SessionStatus::Completed)
        );
    }

    #[tokio::test]
    async fn test_update_out_of_range_is_conflict() {
        let backend = InMemoryTrainingBackend::new().with_plan_size(2);
        let session = started(&backend).await;
        let err = backend
            .update_exercise_progress(&session.id, 7, &patch(1, 4, ExerciseStatus::InProgress))
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_injected_failures_are_consumed_in_order() {
        let backend = InMemoryTrainingBackend::new();
        backend.fail_next(BackendOp::CurrentPlan, HomeTrainError::transient("down"));

        assert!(backend.current_plan().await.unwrap_err().is_retryable());
        assert!(backend.current_plan().await.is_ok());
        assert_eq!(backend.calls(BackendOp::CurrentPlan), 2);
    }

    #[tokio::test]
    async fn test_handle_abandon_keeps_session_with_progress() {
        let backend = InMemoryTrainingBackend::new().with_plan_size(3);
        let session = started(&backend).await;

        let request = AbandonRequest {
            current_progress: BTreeMap::from([(
                1,
                SnapshotEntry {
                    series_completed: 2,
                    status: ExerciseStatus::InProgress,
                    duration_seconds: Some(50),
                },
            )]),
            reason: AbandonReason::Backgrounded,
        };
        let outcome = backend.handle_abandon(&session.id, &request).await.unwrap();
        assert_eq!(outcome.final_status, SessionStatus::Active);
        assert!(outcome.can_resume);

        let progress = backend.session_progress(&session.id).await.unwrap();
        assert_eq!(progress.progress[1].status, ExerciseStatus::InProgress);
        assert_eq!(progress.progress[1].series_completed, 2);
        assert_eq!(progress.progress[1].duration_seconds, Some(50));
    }

    #[tokio::test]
    async fn test_handle_abandon_without_progress_abandons() {
        let backend = InMemoryTrainingBackend::new();
        let session = started(&backend).await;

        let request = AbandonRequest {
            current_progress: BTreeMap::new(),
            reason: AbandonReason::UserCancelled,
        };
        let outcome = backend.handle_abandon(&session.id, &request).await.unwrap();
        assert_eq!(outcome.final_status, SessionStatus::Abandoned);
        assert!(!outcome.can_resume);
        assert_eq!(backend.active_session_count(), 0);
    }

    #[tokio::test]
    async fn test_handle_abandon_ignores_empty_cancelled_rows() {
        let backend = InMemoryTrainingBackend::new().with_plan_size(2);
        let fresh = started(&backend).await;
        backend
            .update_exercise_progress(&fresh.id, 0, &patch(0, 4, ExerciseStatus::Cancelled))
            .await
            .unwrap();
        let request = AbandonRequest {
            current_progress: BTreeMap::new(),
            reason: AbandonReason::Unload,
        };
        let outcome = backend.handle_abandon(&fresh.id, &request).await.unwrap();
        assert_eq!(outcome.final_status, SessionStatus::Abandoned);
        assert!(!outcome.can_resume);
    }

    #[tokio::test]
    async fn test_handle_abandon_keeps_cancelled_mix_resumable() {
        let backend = InMemoryTrainingBackend::new().with_plan_size(2);
        let session = started(&backend).await;
        backend
            .update_exercise_progress(&session.id, 0, &patch(4, 4, ExerciseStatus::Completed))
            .await
            .unwrap();

        let request = AbandonRequest {
            current_progress: BTreeMap::from([(
                1,
                SnapshotEntry {
                    series_completed: 2,
                    status: ExerciseStatus::Cancelled,
                    duration_seconds: None,
                },
            )]),
            reason: AbandonReason::UserCancelled,
        };
        let outcome = backend.handle_abandon(&session.id, &request).await.unwrap();
        assert_eq!(outcome.final_status, SessionStatus::Active);
        assert!(outcome.can_resume);
    }

    #[tokio::test]
    async fn test_rejections_are_scoped_and_deletable() {
        let backend = InMemoryTrainingBackend::new();
        let rules = backend
            .submit_rejections(&[NewRejection::new(
                "Burpees",
                constraints(),
                RejectionCategory::TooHard,
            )])
            .await
            .unwrap();

        assert_eq!(backend.list_rejections(constraints()).await.unwrap().len(), 1);
        let other = PlanConstraints::new(EquipmentType::Advanced, TrainingType::Hiit);
        assert!(backend.list_rejections(other).await.unwrap().is_empty());

        backend.delete_rejection(&rules[0].id).await.unwrap();
        backend.delete_rejection(&rules[0].id).await.unwrap();
        assert!(backend.list_rejections(constraints()).await.unwrap().is_empty());
    }
}
