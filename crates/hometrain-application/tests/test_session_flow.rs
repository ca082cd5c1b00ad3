use hometrain_application::{
    ExerciseResult, LifecycleState, RecordDisposition, SessionLifecycleController,
    TrainingServices,
};
use hometrain_core::HomeTrainError;
use hometrain_core::plan::{EquipmentType, PlanConstraints, TrainingType};
use hometrain_core::progress::{ExerciseStatus, Outcome};
use hometrain_core::session::{AbandonReason, SessionStatus};
use hometrain_core::warmup::FitnessLevel;
use hometrain_infrastructure::{BackendOp, InMemoryTrainingBackend};
use std::sync::Arc;
use std::time::Duration;

fn hiit() -> PlanConstraints {
    PlanConstraints::new(EquipmentType::Minimal, TrainingType::Hiit)
}

fn controller(backend: &Arc<InMemoryTrainingBackend>) -> SessionLifecycleController {
    SessionLifecycleController::new(TrainingServices::from_backend(Arc::clone(backend)))
}

async fn exercising(backend: &Arc<InMemoryTrainingBackend>) -> SessionLifecycleController {
    let mut ctl = controller(backend);
    ctl.request_plan(hiit(), Vec::new())
        .await
        .expect("Should generate plan");
    let warmup = ctl
        .accept_plan(true, FitnessLevel::default())
        .await
        .expect("Should start session");
    assert!(warmup.is_none(), "Skipped warm-up returns no sequencer");
    assert_eq!(ctl.state(), LifecycleState::Exercising);
    ctl
}

#[tokio::test]
async fn test_three_exercise_session_reaches_full_completion() {
    let backend = Arc::new(InMemoryTrainingBackend::new().with_plan_size(3));
    let mut ctl = exercising(&backend).await;

    assert_eq!(
        ctl.advance(ExerciseResult::Completed, Some(120)).await.unwrap(),
        LifecycleState::Exercising
    );
    assert_eq!(
        ctl.advance(ExerciseResult::Skipped, None).await.unwrap(),
        LifecycleState::Exercising
    );
    assert_eq!(
        ctl.advance(ExerciseResult::Cancelled, None).await.unwrap(),
        LifecycleState::Completed
    );

    let statuses: Vec<ExerciseStatus> = ctl.progress().await.iter().map(|p| p.status).collect();
    assert_eq!(
        statuses,
        vec![
            ExerciseStatus::Completed,
            ExerciseStatus::Skipped,
            ExerciseStatus::Cancelled
        ]
    );
    assert!((ctl.completion_percentage().await - 100.0).abs() < f64::EPSILON);

    let session_id = ctl.session().unwrap().id.clone();
    assert_eq!(
        backend.session_status(&session_id),
        Some(SessionStatus::Completed)
    );
}

#[tokio::test]
async fn test_warmup_precedes_exercises() {
    let backend = Arc::new(InMemoryTrainingBackend::new());
    let mut ctl = controller(&backend);
    ctl.request_plan(hiit(), Vec::new()).await.unwrap();

    let mut warmup = ctl
        .accept_plan(false, FitnessLevel::Beginner)
        .await
        .unwrap()
        .expect("Warm-up sequencer");
    assert_eq!(ctl.state(), LifecycleState::Warmup);
    assert!(ctl.advance(ExerciseResult::Completed, None).await.is_err());

    let summary = warmup.skip();
    ctl.complete_warmup(summary).unwrap();
    assert_eq!(ctl.state(), LifecycleState::Exercising);
    assert_eq!(ctl.warmup_summary().map(|s| s.skipped), Some(true));
}

#[tokio::test]
async fn test_abandoned_session_resumes_on_cold_start() {
    let backend = Arc::new(InMemoryTrainingBackend::new().with_plan_size(3));
    let mut ctl = exercising(&backend).await;
    let session_id = ctl.session().unwrap().id.clone();

    ctl.advance(ExerciseResult::Completed, None).await.unwrap();
    ctl.record_series(2, None).await.unwrap();
    let outcome = ctl
        .abandon(AbandonReason::UserCancelled)
        .await
        .unwrap()
        .expect("Abandon outcome");
    assert!(outcome.can_resume);
    assert_eq!(ctl.state(), LifecycleState::Abandoned);

    let mut restored = controller(&backend);
    assert_eq!(restored.restore().await.unwrap(), LifecycleState::Exercising);
    assert_eq!(restored.session().unwrap().id, session_id);
    assert_eq!(restored.current_index(), 1);

    let progress = restored.progress().await;
    let current = progress.iter().find(|p| p.exercise_order == 1).unwrap();
    assert_eq!(current.status, ExerciseStatus::InProgress);
    assert_eq!((current.series_completed, current.total_series), (2, 4));
}

#[tokio::test]
async fn test_resume_of_finished_session_is_completed() {
    let backend = Arc::new(InMemoryTrainingBackend::new().with_plan_size(2));
    let mut ctl = exercising(&backend).await;
    ctl.advance(ExerciseResult::Completed, None).await.unwrap();
    ctl.advance(ExerciseResult::Completed, None).await.unwrap();
    let session_id = ctl.session().unwrap().id.clone();

    let mut other = controller(&backend);
    assert_eq!(
        other.resume(&session_id).await.unwrap(),
        LifecycleState::Completed
    );
    assert_eq!(other.current_index(), 1);
}

#[tokio::test]
async fn test_resume_of_session_closed_elsewhere_is_abandoned() {
    let backend = Arc::new(InMemoryTrainingBackend::new().with_plan_size(3));
    let mut ctl = exercising(&backend).await;
    ctl.record_series(2, None).await.unwrap();
    let session_id = ctl.session().unwrap().id.clone();

    // Starting a session on another device closes this one.
    let _other = exercising(&backend).await;
    assert_eq!(
        backend.session_status(&session_id),
        Some(SessionStatus::Abandoned)
    );

    assert_eq!(
        ctl.resume(&session_id).await.unwrap(),
        LifecycleState::Abandoned
    );
    assert!(!ctl.ledger().read().await.is_session_active());
    assert!(matches!(
        ctl.advance(ExerciseResult::Completed, None).await,
        Err(HomeTrainError::InvalidTransition { .. })
    ));

    ctl.request_plan(hiit(), Vec::new()).await.unwrap();
    assert_eq!(ctl.state(), LifecycleState::PlanReady);
}

#[tokio::test]
async fn test_repeated_outcome_is_written_once() {
    let backend = Arc::new(InMemoryTrainingBackend::new().with_plan_size(2));
    let ctl = exercising(&backend).await;
    let session_id = ctl.session().unwrap().id.clone();
    let updates = ctl.update_client().clone();

    let first = updates
        .record_outcome(&session_id, 0, Outcome::progress(4, 4))
        .await
        .unwrap();
    let second = updates
        .record_outcome(&session_id, 0, Outcome::progress(4, 4))
        .await
        .unwrap();
    let regress = updates
        .record_outcome(&session_id, 0, Outcome::skip(4))
        .await
        .unwrap();

    assert_eq!(first.disposition, RecordDisposition::Written);
    assert_eq!(second.disposition, RecordDisposition::Unchanged);
    assert_eq!(regress.disposition, RecordDisposition::Ignored);
    assert_eq!(regress.progress.status, ExerciseStatus::Completed);
    assert_eq!(backend.calls(BackendOp::UpdateProgress), 1);
}

#[tokio::test]
async fn test_store_total_series_wins_and_clamps() {
    let backend = Arc::new(InMemoryTrainingBackend::new().with_plan_size(2));
    backend.override_total_series(Some(2));
    let mut ctl = exercising(&backend).await;

    let result = ctl.record_series(9, Some(40)).await.unwrap();
    assert_eq!(result.progress.series_completed, 2);
    assert_eq!(result.progress.total_series, 2);
    assert_eq!(result.progress.status, ExerciseStatus::Completed);
}

#[tokio::test]
async fn test_only_one_session_is_active() {
    let backend = Arc::new(InMemoryTrainingBackend::new());
    let mut ctl = exercising(&backend).await;
    let first = ctl.session().unwrap().id.clone();

    ctl.reset().await.unwrap();
    ctl.request_plan(hiit(), Vec::new()).await.unwrap();
    ctl.accept_plan(true, FitnessLevel::default()).await.unwrap();

    assert_eq!(backend.active_session_count(), 1);
    assert_eq!(backend.session_status(&first), Some(SessionStatus::Abandoned));
}

#[tokio::test]
async fn test_generation_failure_returns_to_idle_without_retry() {
    let backend = Arc::new(InMemoryTrainingBackend::new());
    backend.fail_next(BackendOp::GeneratePlan, HomeTrainError::transient("timeout"));
    let mut ctl = controller(&backend);

    let err = ctl.request_plan(hiit(), Vec::new()).await.unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(ctl.state(), LifecycleState::Idle);
    assert!(ctl.plan().is_none());
    assert_eq!(backend.calls(BackendOp::GeneratePlan), 1);
    assert_eq!(backend.calls(BackendOp::SavePlan), 0);
}

#[tokio::test]
async fn test_failed_write_stops_the_loop() {
    let backend = Arc::new(InMemoryTrainingBackend::new().with_plan_size(2));
    let mut ctl = exercising(&backend).await;
    backend.fail_next(BackendOp::UpdateProgress, HomeTrainError::transient("reset"));
    backend.fail_next(BackendOp::UpdateProgress, HomeTrainError::transient("reset"));

    assert!(ctl.advance(ExerciseResult::Completed, None).await.is_err());
    assert_eq!(ctl.current_index(), 0);
    assert!(ctl.ledger().read().await.has_unsynced());

    ctl.advance(ExerciseResult::Completed, None).await.unwrap();
    assert_eq!(ctl.current_index(), 1);
    assert!(!ctl.ledger().read().await.has_unsynced());
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_record_is_refused() {
    let backend = Arc::new(
        InMemoryTrainingBackend::new()
            .with_plan_size(2)
            .with_update_latency(Duration::from_millis(200)),
    );
    let ctl = exercising(&backend).await;
    let session_id = ctl.session().unwrap().id.clone();
    let updates = ctl.update_client().clone();

    let (first, second) = tokio::join!(
        updates.record_outcome(&session_id, 0, Outcome::progress(1, 4)),
        updates.record_outcome(&session_id, 1, Outcome::progress(1, 4)),
    );
    assert!(first.is_ok());
    assert!(second.unwrap_err().is_busy());
    assert_eq!(backend.calls(BackendOp::UpdateProgress), 1);
}
