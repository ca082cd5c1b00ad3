use hometrain_application::{
    LifecycleState, RejectionCycle, RejectionDraft, SessionLifecycleController, TrainingServices,
};
use hometrain_core::HomeTrainError;
use hometrain_core::plan::{EquipmentType, PlanConstraints, TrainingType};
use hometrain_core::rejection::RejectionCategory;
use hometrain_core::session::SessionStatus;
use hometrain_core::warmup::FitnessLevel;
use hometrain_infrastructure::{BackendOp, InMemoryTrainingBackend};
use std::sync::Arc;

fn hiit() -> PlanConstraints {
    PlanConstraints::new(EquipmentType::Minimal, TrainingType::Hiit)
}

fn setup() -> (
    Arc<InMemoryTrainingBackend>,
    SessionLifecycleController,
    RejectionCycle,
) {
    let backend = Arc::new(InMemoryTrainingBackend::new().with_plan_size(3));
    let services = TrainingServices::from_backend(Arc::clone(&backend));
    let cycle = RejectionCycle::new(services.rejections.clone());
    (backend, SessionLifecycleController::new(services), cycle)
}

#[tokio::test]
async fn test_rejected_exercise_never_reappears_until_reactivated() {
    let (backend, mut ctl, cycle) = setup();

    let plan = cycle.request_plan(&mut ctl, hiit()).await.unwrap();
    assert!(plan.plan.contains_key("burpees"));
    ctl.accept_plan(true, FitnessLevel::default()).await.unwrap();
    let first_session = ctl.session().unwrap().id.clone();

    let (rules, regenerated) = cycle
        .submit_rejections(
            &mut ctl,
            vec![RejectionDraft::new("Burpees", RejectionCategory::TooHard).with_reason("knees")],
        )
        .await
        .unwrap();
    assert_eq!(rules.len(), 1);
    assert!(!regenerated.plan.contains_key("burpees"));
    assert_eq!(ctl.state(), LifecycleState::PlanReady);
    assert!(ctl.session().is_none());
    assert_eq!(backend.active_session_count(), 0);
    assert_eq!(
        backend.session_status(&first_session),
        Some(SessionStatus::Abandoned)
    );

    // Several regenerations later the rule still holds.
    for _ in 0..3 {
        ctl.reset().await.unwrap();
        let plan = cycle.request_plan(&mut ctl, hiit()).await.unwrap();
        assert!(!plan.plan.contains_key("burpees"));
    }
    assert!(
        backend
            .generate_requests()
            .iter()
            .skip(1)
            .all(|r| r.excludes("burpees"))
    );

    cycle.reactivate(&rules[0].id).await.unwrap();
    ctl.reset().await.unwrap();
    let plan = cycle.request_plan(&mut ctl, hiit()).await.unwrap();
    assert!(plan.plan.contains_key("burpees"));
}

#[tokio::test]
async fn test_rules_are_scoped_to_their_constraints() {
    let (_backend, mut ctl, cycle) = setup();
    cycle.request_plan(&mut ctl, hiit()).await.unwrap();
    cycle
        .submit_rejections(
            &mut ctl,
            vec![RejectionDraft::new("Burpees", RejectionCategory::DontLike)],
        )
        .await
        .unwrap();

    let strength = PlanConstraints::new(EquipmentType::Minimal, TrainingType::Strength);
    assert!(cycle.exclusions_for(strength).await.unwrap().is_empty());
    assert_eq!(cycle.exclusions_for(hiit()).await.unwrap(), vec!["burpees"]);
}

#[tokio::test]
async fn test_session_is_closed_before_regeneration() {
    let (backend, mut ctl, cycle) = setup();
    cycle.request_plan(&mut ctl, hiit()).await.unwrap();
    ctl.accept_plan(true, FitnessLevel::default()).await.unwrap();
    ctl.record_series(2, None).await.unwrap();

    cycle
        .submit_rejections(
            &mut ctl,
            vec![RejectionDraft::new("Jump squats", RejectionCategory::Injury).expiring_in_days(7)],
        )
        .await
        .unwrap();

    let log = backend.call_log();
    let close = log.iter().rposition(|op| *op == BackendOp::CloseActive).unwrap();
    let generate = log.iter().rposition(|op| *op == BackendOp::GeneratePlan).unwrap();
    let submit = log
        .iter()
        .rposition(|op| *op == BackendOp::SubmitRejections)
        .unwrap();
    assert!(submit < close && close < generate);
    assert!(ctl.progress().await.is_empty());
    assert_eq!(ctl.completion_percentage().await, 0.0);
}

#[tokio::test]
async fn test_failed_listing_blocks_generation() {
    let (backend, mut ctl, cycle) = setup();
    backend.fail_next(BackendOp::ListRejections, HomeTrainError::transient("down"));

    assert!(cycle.request_plan(&mut ctl, hiit()).await.is_err());
    assert_eq!(backend.calls(BackendOp::GeneratePlan), 0);
    assert_eq!(ctl.state(), LifecycleState::Idle);
}

#[tokio::test]
async fn test_failed_submission_keeps_the_session() {
    let (backend, mut ctl, cycle) = setup();
    cycle.request_plan(&mut ctl, hiit()).await.unwrap();
    ctl.accept_plan(true, FitnessLevel::default()).await.unwrap();
    backend.fail_next(BackendOp::SubmitRejections, HomeTrainError::transient("down"));

    let result = cycle
        .submit_rejections(
            &mut ctl,
            vec![RejectionDraft::new("Burpees", RejectionCategory::Other)],
        )
        .await;
    assert!(result.is_err());
    assert_eq!(ctl.state(), LifecycleState::Exercising);
    assert_eq!(backend.active_session_count(), 1);
}

#[tokio::test]
async fn test_skip_rejection_regenerates_without_rules() {
    let (backend, mut ctl, cycle) = setup();
    let first = cycle.request_plan(&mut ctl, hiit()).await.unwrap();
    ctl.accept_plan(true, FitnessLevel::default()).await.unwrap();

    let second = cycle.skip_rejection(&mut ctl).await.unwrap();
    assert_ne!(first.id, second.id);
    assert_eq!(ctl.state(), LifecycleState::PlanReady);
    assert_eq!(backend.calls(BackendOp::SubmitRejections), 0);
    assert_eq!(backend.active_session_count(), 0);
    assert!(ctl.session().is_none());
}
