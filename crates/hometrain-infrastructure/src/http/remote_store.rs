//! HTTP implementation of the plan generator and the remote stores.

use super::client::{ApiClient, retry_once};
use super::dto::{
    AbandonRequestDto, AbandonResponseDto, AckDto, CloseActiveResponseDto, CurrentPlanDto,
    ExerciseEnvelopeDto, GenerateRequestDto, GenerateResponseDto, NewRejectionDto,
    PlanEnvelopeDto, RejectionQueryDto, RejectionsEnvelopeDto, SavePlanRequestDto,
    SessionEnvelopeDto, SessionProgressDto, StartSessionRequestDto, SubmitRejectionsRequestDto,
};
use async_trait::async_trait;
use hometrain_core::config::ApiConfig;
use hometrain_core::error::Result;
use hometrain_core::plan::{
    CurrentPlan, Plan, PlanConstraints, PlanGenerator, PlanRepository, PlanRequest, StoredPlan,
};
use hometrain_core::progress::{ExerciseFeedback, ExerciseProgress, ProgressPatch};
use hometrain_core::rejection::{NewRejection, RejectionRepository, RejectionRule};
use hometrain_core::session::{
    AbandonOutcome, AbandonRequest, Session, SessionProgress, SessionRepository,
};

const GENERATE_PATH: &str = "/api/ia-home-training/generate";
const PLANS_PATH: &str = "/api/home-training/plans";
const CURRENT_PLAN_PATH: &str = "/api/home-training/current-plan";
const CLOSE_ACTIVE_PATH: &str = "/api/training-session/close-active";
const START_SESSION_PATH: &str = "/api/home-training/sessions/start";
const REJECTIONS_PATH: &str = "/api/home-training/rejections";

fn progress_path(session_id: &str) -> String {
    format!("/api/home-training/sessions/{session_id}/progress")
}

fn exercise_path(session_id: &str, exercise_order: usize) -> String {
    format!("/api/home-training/sessions/{session_id}/exercise/{exercise_order}")
}

fn abandon_path(session_id: &str) -> String {
    format!("/api/training-session/handle-abandon/{session_id}")
}

/// Remote training store reached over HTTP.
///
/// Implements every repository trait so one instance can back the whole
/// application layer. Only idempotent calls are retried, once.
#[derive(Clone)]
pub struct HttpTrainingStore {
    client: ApiClient,
}

impl HttpTrainingStore {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn from_config(config: &ApiConfig) -> Result<Self> {
        Ok(Self::new(ApiClient::new(config)?))
    }
}

#[async_trait]
impl PlanGenerator for HttpTrainingStore {
    async fn generate_plan(&self, request: &PlanRequest) -> Result<Plan> {
        tracing::debug!(
            "[HttpTrainingStore] generate_plan: {}/{} excluding {} exercise(s)",
            request.constraints.equipment,
            request.constraints.training_type,
            request.exclusions.len()
        );
        let body = GenerateRequestDto {
            equipment_type: request.constraints.equipment,
            training_type: request.constraints.training_type,
            excluded_exercises: &request.exclusions,
        };
        let response: GenerateResponseDto = self.client.post(GENERATE_PATH, &body).await?;
        Ok(response.plan.into())
    }
}

#[async_trait]
impl PlanRepository for HttpTrainingStore {
    async fn save_plan(&self, plan: &Plan, constraints: PlanConstraints) -> Result<StoredPlan> {
        let body = SavePlanRequestDto::new(plan, constraints);
        let response: PlanEnvelopeDto = self.client.post(PLANS_PATH, &body).await?;
        let stored = StoredPlan::from(response.plan);
        tracing::debug!("[HttpTrainingStore] Saved plan {}", stored.id);
        Ok(stored)
    }

    async fn current_plan(&self) -> Result<CurrentPlan> {
        let response: CurrentPlanDto = retry_once("current_plan", || {
            self.client.get::<CurrentPlanDto>(CURRENT_PLAN_PATH)
        })
        .await?;

        Ok(CurrentPlan {
            plan: response.plan.map(StoredPlan::from),
            session: response.session.map(Session::try_from).transpose()?,
        })
    }
}

#[async_trait]
impl SessionRepository for HttpTrainingStore {
    async fn close_active_sessions(&self) -> Result<usize> {
        let body = serde_json::json!({});
        let response: CloseActiveResponseDto = retry_once("close_active_sessions", || {
            self.client
                .put::<_, CloseActiveResponseDto>(CLOSE_ACTIVE_PATH, &body)
        })
        .await?;
        tracing::debug!(
            "[HttpTrainingStore] Closed {} active session(s)",
            response.closed
        );
        Ok(response.closed)
    }

    async fn start_session(&self, plan_id: &str) -> Result<Session> {
        let body = StartSessionRequestDto {
            home_training_plan_id: plan_id,
        };
        let response: SessionEnvelopeDto = self.client.post(START_SESSION_PATH, &body).await?;
        Session::try_from(response.session)
    }

    async fn session_progress(&self, session_id: &str) -> Result<SessionProgress> {
        let path = progress_path(session_id);
        let response: SessionProgressDto = retry_once("session_progress", || {
            self.client.get::<SessionProgressDto>(&path)
        })
        .await?;
        SessionProgress::try_from(response)
    }

    async fn update_exercise_progress(
        &self,
        session_id: &str,
        exercise_order: usize,
        patch: &ProgressPatch,
    ) -> Result<ExerciseProgress> {
        // Retried by the caller, which owns the idempotency check.
        let response: ExerciseEnvelopeDto = self
            .client
            .put(&exercise_path(session_id, exercise_order), patch)
            .await?;
        Ok(response.exercise.into())
    }

    async fn submit_feedback(
        &self,
        session_id: &str,
        exercise_order: usize,
        feedback: &ExerciseFeedback,
    ) -> Result<()> {
        let path = format!("{}/feedback", exercise_path(session_id, exercise_order));
        let _: AckDto = self.client.post(&path, feedback).await?;
        Ok(())
    }

    async fn handle_abandon(
        &self,
        session_id: &str,
        request: &AbandonRequest,
    ) -> Result<AbandonOutcome> {
        let body = AbandonRequestDto::from(request);
        let response: AbandonResponseDto = self
            .client
            .post(&abandon_path(session_id), &body)
            .await?;
        AbandonOutcome::try_from(response)
    }
}

#[async_trait]
impl RejectionRepository for HttpTrainingStore {
    async fn submit_rejections(&self, rejections: &[NewRejection]) -> Result<Vec<RejectionRule>> {
        if rejections.is_empty() {
            return Ok(Vec::new());
        }
        let body = SubmitRejectionsRequestDto {
            rejections: rejections.iter().map(NewRejectionDto::from).collect(),
        };
        let response: RejectionsEnvelopeDto = self.client.post(REJECTIONS_PATH, &body).await?;
        Ok(response
            .rejections
            .into_iter()
            .map(RejectionRule::from)
            .collect())
    }

    async fn list_rejections(&self, constraints: PlanConstraints) -> Result<Vec<RejectionRule>> {
        let query = RejectionQueryDto {
            equipment_type: constraints.equipment,
            training_type: constraints.training_type,
        };
        let response: RejectionsEnvelopeDto = retry_once("list_rejections", || {
            self.client
                .get_with_query::<RejectionsEnvelopeDto, _>(REJECTIONS_PATH, &query)
        })
        .await?;

        let now = chrono::Utc::now();
        Ok(response
            .rejections
            .into_iter()
            .map(RejectionRule::from)
            .filter(|rule| rule.is_active(now))
            .collect())
    }

    async fn delete_rejection(&self, rejection_id: &str) -> Result<()> {
        let path = format!("{REJECTIONS_PATH}/{rejection_id}");
        let result: Result<AckDto> = retry_once("delete_rejection", || {
            self.client.delete::<AckDto>(&path)
        })
        .await;
        match result {
            Ok(_) => Ok(()),
            Err(err) if err.is_not_found() => {
                tracing::debug!(
                    "[HttpTrainingStore] Rejection {} already gone",
                    rejection_id
                );
                Ok(())
            }
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        assert_eq!(
            progress_path("77"),
            "/api/home-training/sessions/77/progress"
        );
        assert_eq!(
            exercise_path("77", 2),
            "/api/home-training/sessions/77/exercise/2"
        );
        assert_eq!(
            abandon_path("77"),
            "/api/training-session/handle-abandon/77"
        );
    }

    #[tokio::test]
    async fn test_unreachable_store_is_transient() {
        let store = HttpTrainingStore::from_config(&ApiConfig {
            base_url: "http://127.0.0.1:9".into(),
            timeout_secs: 1,
            token: None,
        })
        .unwrap();

        let err = store.current_plan().await.unwrap_err();
        assert!(err.is_retryable());
    }
}
