//! Session lifecycle controller.
//!
//! Drives plan → warm-up → exercise loop → completion. The controller is the
//! only owner of plan and session state; all fields change through
//! [`SessionLifecycleController::transition`] and the methods below.

use super::state::{LifecycleEvent, LifecycleState};
use crate::ledger::{ProgressLedger, SharedLedger};
use crate::services::TrainingServices;
use crate::update_client::{IdempotentUpdateClient, RecordResult};
use hometrain_core::error::{HomeTrainError, Result};
use hometrain_core::plan::{Exercise, Plan, PlanConstraints, PlanRequest, StoredPlan};
use hometrain_core::progress::{
    ExerciseFeedback, ExerciseProgress, Outcome, ResumePoint, resume_point,
};
use hometrain_core::session::{AbandonOutcome, AbandonReason, Session, SessionStatus};
use hometrain_core::warmup::{FitnessLevel, WarmupSequencer, WarmupSummary};
use std::sync::Arc;
use strum::{AsRefStr, Display, EnumString};

/// How the user finished the current exercise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ExerciseResult {
    Completed,
    Skipped,
    Cancelled,
}

pub struct SessionLifecycleController {
    services: TrainingServices,
    updates: IdempotentUpdateClient,
    ledger: SharedLedger,
    state: LifecycleState,
    constraints: Option<PlanConstraints>,
    plan: Option<StoredPlan>,
    exercises: Vec<Exercise>,
    session: Option<Session>,
    current_index: usize,
    warmup_summary: Option<WarmupSummary>,
}

impl SessionLifecycleController {
    pub fn new(services: TrainingServices) -> Self {
        let ledger = ProgressLedger::shared();
        let updates = IdempotentUpdateClient::new(services.sessions.clone(), ledger.clone());
        Self {
            services,
            updates,
            ledger,
            state: LifecycleState::Idle,
            constraints: None,
            plan: None,
            exercises: Vec::new(),
            session: None,
            current_index: 0,
            warmup_summary: None,
        }
    }

    // ============================================================================
    // Accessors
    // ============================================================================

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn services(&self) -> &TrainingServices {
        &self.services
    }

    pub fn update_client(&self) -> &IdempotentUpdateClient {
        &self.updates
    }

    pub fn ledger(&self) -> SharedLedger {
        Arc::clone(&self.ledger)
    }

    pub fn constraints(&self) -> Option<PlanConstraints> {
        self.constraints
    }

    pub fn plan(&self) -> Option<&StoredPlan> {
        self.plan.as_ref()
    }

    /// Exercises of the loaded plan or resumed session.
    pub fn exercises(&self) -> &[Exercise] {
        &self.exercises
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_exercise(&self) -> Option<&Exercise> {
        match self.state {
            LifecycleState::Warmup | LifecycleState::Exercising => {
                self.exercises.get(self.current_index)
            }
            _ => None,
        }
    }

    pub fn warmup_summary(&self) -> Option<WarmupSummary> {
        self.warmup_summary
    }

    pub async fn progress(&self) -> Vec<ExerciseProgress> {
        self.ledger.read().await.progress()
    }

    pub async fn completion_percentage(&self) -> f64 {
        self.ledger.read().await.completion_percentage()
    }

    // ============================================================================
    // Plan
    // ============================================================================

    /// Generates, validates and persists a new plan.
    ///
    /// Generation is never retried: on any failure the controller returns to
    /// `Idle` and the error is surfaced.
    ///
    /// # Arguments
    ///
    /// * `constraints` - Equipment and training type
    /// * `exclusions` - Exercise keys the plan must not contain
    pub async fn request_plan(
        &mut self,
        constraints: PlanConstraints,
        exclusions: Vec<String>,
    ) -> Result<StoredPlan> {
        self.transition(LifecycleEvent::PlanRequested)?;
        self.clear_plan_state().await;
        self.constraints = Some(constraints);

        let request = PlanRequest::new(constraints).with_exclusions(exclusions);
        tracing::info!(
            "[Controller] Requesting {}/{} plan ({} exclusion(s))",
            constraints.equipment,
            constraints.training_type,
            request.exclusions.len()
        );

        match self.generate_and_save(&request).await {
            Ok(stored) => {
                self.exercises = stored.plan.exercises.clone();
                self.plan = Some(stored.clone());
                self.transition(LifecycleEvent::PlanGenerated)?;
                Ok(stored)
            }
            Err(err) => {
                tracing::warn!("[Controller] Plan request failed: {}", err);
                self.transition(LifecycleEvent::PlanFailed)?;
                Err(err)
            }
        }
    }

    async fn generate_and_save(&self, request: &PlanRequest) -> Result<StoredPlan> {
        let mut plan: Plan = self.services.generator.generate_plan(request).await?;

        let before = plan.len();
        plan.exercises.retain(|e| !request.excludes(&e.key()));
        if plan.len() != before {
            tracing::warn!(
                "[Controller] Generator returned {} excluded exercise(s), dropped",
                before - plan.len()
            );
        }
        plan.validate()?;

        self.services
            .plans
            .save_plan(&plan, request.constraints)
            .await
    }

    /// Loads the latest persisted plan on cold start and resumes its open
    /// session, if any.
    pub async fn restore(&mut self) -> Result<LifecycleState> {
        let current = self.services.plans.current_plan().await?;
        let Some(plan) = current.plan else {
            tracing::debug!("[Controller] No persisted plan to restore");
            return Ok(self.state);
        };

        self.transition(LifecycleEvent::PlanRestored)?;
        self.constraints = Some(plan.constraints());
        self.exercises = plan.plan.exercises.clone();
        tracing::info!("[Controller] Restored plan {}", plan.id);
        self.plan = Some(plan);

        match current.session.filter(Session::is_active) {
            Some(session) => self.resume(&session.id).await,
            None => Ok(self.state),
        }
    }

    // ============================================================================
    // Session
    // ============================================================================

    /// Starts a session for the ready plan.
    ///
    /// Prior active sessions are closed first. Returns the warm-up sequencer
    /// unless `skip_warmup` is set.
    pub async fn accept_plan(
        &mut self,
        skip_warmup: bool,
        level: FitnessLevel,
    ) -> Result<Option<WarmupSequencer>> {
        let event = LifecycleEvent::PlanAccepted {
            warmup: !skip_warmup,
        };
        self.state.on(event)?;

        let plan = self
            .plan
            .clone()
            .ok_or_else(|| HomeTrainError::internal("plan ready without a plan"))?;

        let closed = self.services.sessions.close_active_sessions().await?;
        if closed > 0 {
            tracing::info!("[Controller] Closed {} previous active session(s)", closed);
        }

        let session = self.services.sessions.start_session(&plan.id).await?;
        tracing::info!("[Controller] Started session {} for plan {}", session.id, plan.id);

        let plan_len = plan.plan.len();
        match self.services.sessions.session_progress(&session.id).await {
            Ok(progress) => {
                self.ledger
                    .write()
                    .await
                    .seed(&session, plan_len, progress.progress);
            }
            Err(err) => {
                tracing::warn!(
                    "[Controller] Could not load progress of session {}: {}",
                    session.id,
                    err
                );
                let mut ledger = self.ledger.write().await;
                ledger.seed(&session, plan_len, Vec::new());
                ledger.mark_stale();
            }
        }

        self.session = Some(session);
        self.current_index = 0;
        self.warmup_summary = None;
        self.transition(event)?;

        Ok((!skip_warmup).then(|| WarmupSequencer::for_training(plan.training_type, level)))
    }

    pub fn complete_warmup(&mut self, summary: WarmupSummary) -> Result<()> {
        self.transition(LifecycleEvent::WarmupFinished)?;
        tracing::debug!(
            "[Controller] Warm-up finished: {}/{} steps, {}s",
            summary.steps_completed,
            summary.total_steps,
            summary.seconds_spent
        );
        self.warmup_summary = Some(summary);
        Ok(())
    }

    pub fn skip_warmup(&mut self) -> Result<()> {
        self.transition(LifecycleEvent::WarmupFinished)?;
        self.warmup_summary = None;
        Ok(())
    }

    /// Records series done on the current exercise without moving on.
    pub async fn record_series(
        &mut self,
        series_completed: u32,
        duration_seconds: Option<u32>,
    ) -> Result<RecordResult> {
        self.ensure_fresh().await?;
        self.require_exercising("record_series")?;

        let session_id = self.session_id()?;
        let index = self.current_index;
        let total = self.total_series_for(index).await;
        self.updates
            .record_outcome(
                &session_id,
                index,
                Outcome::progress(series_completed, total).with_duration(duration_seconds),
            )
            .await
    }

    /// Records the outcome of the current exercise and moves to the next.
    ///
    /// Past the last exercise the session is `Completed`. An index the
    /// store does not know is logged and skipped.
    pub async fn advance(
        &mut self,
        result: ExerciseResult,
        duration_seconds: Option<u32>,
    ) -> Result<LifecycleState> {
        self.ensure_fresh().await?;
        self.require_exercising("advance")?;

        let session_id = self.session_id()?;
        let index = self.current_index;
        let total = self.total_series_for(index).await;
        let done = {
            let ledger = self.ledger.read().await;
            ledger.get(index).map(|p| p.series_completed).unwrap_or(0)
        };

        let outcome = match result {
            ExerciseResult::Completed => Outcome::progress(total, total),
            ExerciseResult::Skipped => Outcome::skip(total),
            ExerciseResult::Cancelled => Outcome::cancel(done, total),
        }
        .with_duration(duration_seconds);

        match self.updates.record_outcome(&session_id, index, outcome).await {
            Ok(recorded) => tracing::debug!(
                "[Controller] Exercise {} {} ({:?})",
                index,
                recorded.progress.status,
                recorded.disposition
            ),
            Err(err) if err.is_conflict() => {
                tracing::warn!("[Controller] Exercise {} not recorded: {}", index, err);
            }
            Err(err) => return Err(err),
        }

        self.current_index += 1;
        if self.current_index >= self.exercises.len() {
            self.current_index = self.exercises.len().saturating_sub(1);
            self.transition(LifecycleEvent::AllExercisesDone)?;
            self.ledger.write().await.set_session_active(false);
            tracing::info!("[Controller] Session {} completed", session_id);
        }
        Ok(self.state)
    }

    /// Rebuilds the session state from the store.
    ///
    /// The current index becomes the first non-terminal exercise. A session
    /// with every exercise terminal, or one the store has closed, resumes
    /// into the matching terminal state.
    pub async fn resume(&mut self, session_id: &str) -> Result<LifecycleState> {
        let progress = self.services.sessions.session_progress(session_id).await?;

        let exercises = if !progress.exercises.is_empty() {
            progress.exercises.clone()
        } else {
            self.plan
                .as_ref()
                .filter(|p| p.id == progress.session.plan_id)
                .map(|p| p.plan.exercises.clone())
                .unwrap_or_default()
        };
        let plan_len = exercises.len();
        let point = resume_point(&progress.progress, plan_len);

        let target = match progress.session.status {
            SessionStatus::Abandoned => LifecycleState::Abandoned,
            SessionStatus::Completed => LifecycleState::Completed,
            SessionStatus::Active => match point {
                ResumePoint::Finished => LifecycleState::Completed,
                ResumePoint::At(_) => LifecycleState::Exercising,
            },
        };
        let event = LifecycleEvent::SessionRestored { target };
        self.state.on(event)?;

        {
            let mut ledger = self.ledger.write().await;
            ledger.seed(&progress.session, plan_len, progress.progress);
            if target.is_terminal() {
                ledger.set_session_active(false);
            }
        }

        if self
            .plan
            .as_ref()
            .is_some_and(|p| p.id != progress.session.plan_id)
        {
            self.plan = None;
        }
        self.current_index = match point {
            ResumePoint::At(index) => index,
            ResumePoint::Finished => plan_len.saturating_sub(1),
        };
        self.exercises = exercises;
        self.session = Some(progress.session);
        self.transition(event)?;

        tracing::info!(
            "[Controller] Resumed session {} at exercise {} ({})",
            session_id,
            self.current_index,
            self.state
        );
        Ok(self.state)
    }

    /// Stops the session on the user's request.
    ///
    /// The abandon snapshot is best-effort: a failed write is logged and the
    /// controller still moves to `Abandoned`.
    pub async fn abandon(&mut self, reason: AbandonReason) -> Result<Option<AbandonOutcome>> {
        self.state.on(LifecycleEvent::SessionAbandoned)?;

        let snapshot = self.ledger.read().await.snapshot(reason);
        let outcome = match snapshot {
            Some((session_id, request)) => {
                match self
                    .services
                    .sessions
                    .handle_abandon(&session_id, &request)
                    .await
                {
                    Ok(outcome) => Some(outcome),
                    Err(err) => {
                        tracing::warn!(
                            "[Controller] Abandon snapshot for {} failed: {}",
                            session_id,
                            err
                        );
                        None
                    }
                }
            }
            None => None,
        };

        self.ledger.write().await.set_session_active(false);
        self.transition(LifecycleEvent::SessionAbandoned)?;
        Ok(outcome)
    }

    /// Attaches feedback to one exercise of the loaded session.
    pub async fn submit_feedback(
        &mut self,
        exercise_order: usize,
        feedback: ExerciseFeedback,
    ) -> Result<()> {
        let session_id = self.session_id()?;
        if exercise_order >= self.exercises.len() {
            return Err(HomeTrainError::conflict(format!(
                "exercise {exercise_order} is outside the plan"
            )));
        }
        self.services
            .sessions
            .submit_feedback(&session_id, exercise_order, &feedback)
            .await?;
        self.ledger
            .write()
            .await
            .set_feedback(exercise_order, feedback);
        Ok(())
    }

    /// Closes any active session and drops all plan, session and progress
    /// state, keeping the constraints for the next request.
    pub async fn close_and_reset(&mut self) -> Result<()> {
        if let Err(err) = self.services.sessions.close_active_sessions().await {
            if matches!(err, HomeTrainError::AuthExpired) {
                return Err(err);
            }
            tracing::warn!("[Controller] Closing active sessions failed: {}", err);
        }
        self.reset().await
    }

    /// Back to `Idle` with no plan, session or progress.
    pub async fn reset(&mut self) -> Result<()> {
        self.transition(LifecycleEvent::Reset)?;
        self.clear_plan_state().await;
        Ok(())
    }

    // ============================================================================
    // Helpers
    // ============================================================================

    fn transition(&mut self, event: LifecycleEvent) -> Result<LifecycleState> {
        let next = self.state.on(event)?;
        tracing::debug!("[Controller] {} --{:?}--> {}", self.state, event, next);
        self.state = next;
        Ok(next)
    }

    fn require_exercising(&self, action: &str) -> Result<()> {
        if self.state == LifecycleState::Exercising {
            Ok(())
        } else {
            Err(HomeTrainError::InvalidTransition {
                from: self.state.to_string(),
                event: action.to_string(),
            })
        }
    }

    fn session_id(&self) -> Result<String> {
        self.session
            .as_ref()
            .map(|s| s.id.clone())
            .ok_or_else(|| HomeTrainError::conflict("no session is loaded"))
    }

    /// Store value when known, plan value otherwise.
    async fn total_series_for(&self, index: usize) -> u32 {
        let stored = self
            .ledger
            .read()
            .await
            .get(index)
            .map(|p| p.total_series)
            .filter(|t| *t > 0);
        stored
            .or_else(|| self.exercises.get(index).map(|e| e.target_series))
            .unwrap_or_default()
    }

    /// Reconciles with the store when the monitor flagged the ledger stale.
    async fn ensure_fresh(&mut self) -> Result<()> {
        let stale_session = {
            let ledger = self.ledger.read().await;
            ledger
                .is_stale()
                .then(|| ledger.session_id().map(str::to_string))
                .flatten()
        };
        if let Some(session_id) = stale_session {
            tracing::info!("[Controller] Ledger stale, reconciling session {}", session_id);
            self.resume(&session_id).await?;
        }
        Ok(())
    }

    async fn clear_plan_state(&mut self) {
        self.plan = None;
        self.exercises.clear();
        self.session = None;
        self.current_index = 0;
        self.warmup_summary = None;
        self.ledger.write().await.clear();
    }
}
