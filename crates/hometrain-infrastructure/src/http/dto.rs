//! Wire representations of the training API and their domain conversions.
//!
//! Plan payloads keep the generator's field names (`plan_entrenamiento`,
//! `ejercicios`, `nombre`, ...); everything else is snake_case English.

use chrono::{DateTime, Utc};
use hometrain_core::error::{HomeTrainError, Result};
use hometrain_core::plan::{
    EquipmentType, Exercise, ExerciseTarget, Plan, PlanConstraints, StoredPlan, TrainingType,
};
use hometrain_core::progress::{
    ExerciseFeedback, ExerciseProgress, ExerciseStatus, FeedbackSentiment,
};
use hometrain_core::rejection::{NewRejection, RejectionCategory, RejectionRule};
use hometrain_core::session::{
    AbandonOutcome, AbandonReason, AbandonRequest, Session, SessionProgress, SessionStatus,
    SnapshotEntry,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Series count the store assumes when the generator omits one.
pub const DEFAULT_TOTAL_SERIES: u32 = 4;

// ============================================================================
// Plans
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExerciseDto {
    #[serde(rename = "nombre")]
    pub name: String,
    /// `reps` or `tiempo`.
    #[serde(rename = "tipo", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series: Option<u32>,
    #[serde(rename = "repeticiones", default, skip_serializing_if = "Option::is_none")]
    pub reps: Option<u32>,
    #[serde(rename = "duracion_seg", default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u32>,
    #[serde(rename = "descanso_seg", default, skip_serializing_if = "Option::is_none")]
    pub rest_seconds: Option<u32>,
    #[serde(rename = "notas", default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl From<&Exercise> for ExerciseDto {
    fn from(exercise: &Exercise) -> Self {
        let (kind, reps, duration_seconds) = match exercise.target {
            ExerciseTarget::Reps(reps) => ("reps", Some(reps), None),
            ExerciseTarget::DurationSeconds(secs) => ("tiempo", None, Some(secs)),
        };
        Self {
            name: exercise.name.clone(),
            kind: Some(kind.to_string()),
            series: Some(exercise.target_series),
            reps,
            duration_seconds,
            rest_seconds: Some(exercise.rest_seconds),
            notes: (!exercise.notes.is_empty()).then(|| exercise.notes.clone()),
        }
    }
}

impl From<ExerciseDto> for Exercise {
    fn from(dto: ExerciseDto) -> Self {
        let timed = dto.kind.as_deref() == Some("tiempo") || dto.reps.is_none();
        let target = match (timed, dto.duration_seconds, dto.reps) {
            (true, Some(secs), _) => ExerciseTarget::DurationSeconds(secs),
            (_, _, Some(reps)) => ExerciseTarget::Reps(reps),
            (_, Some(secs), None) => ExerciseTarget::DurationSeconds(secs),
            (_, None, None) => ExerciseTarget::Reps(0),
        };
        Exercise {
            name: dto.name,
            target_series: dto.series.filter(|s| *s > 0).unwrap_or(DEFAULT_TOTAL_SERIES),
            target,
            rest_seconds: dto.rest_seconds.unwrap_or_default(),
            notes: dto.notes.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PlanBodyDto {
    #[serde(rename = "ejercicios", default)]
    pub exercises: Vec<ExerciseDto>,
}

/// The generator's plan document, also stored verbatim as `plan_data`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PlanDataDto {
    #[serde(rename = "mensaje_personalizado", default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(rename = "plan_entrenamiento", default)]
    pub plan: PlanBodyDto,
}

impl From<&Plan> for PlanDataDto {
    fn from(plan: &Plan) -> Self {
        Self {
            message: plan.message.clone(),
            plan: PlanBodyDto {
                exercises: plan.exercises.iter().map(ExerciseDto::from).collect(),
            },
        }
    }
}

impl From<PlanDataDto> for Plan {
    fn from(dto: PlanDataDto) -> Self {
        Plan {
            exercises: dto.plan.exercises.into_iter().map(Exercise::from).collect(),
            message: dto.message,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequestDto<'a> {
    pub equipment_type: EquipmentType,
    pub training_type: TrainingType,
    pub excluded_exercises: &'a [String],
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateResponseDto {
    pub plan: PlanDataDto,
}

#[derive(Debug, Clone, Serialize)]
pub struct SavePlanRequestDto {
    pub plan_data: PlanDataDto,
    pub equipment_type: EquipmentType,
    pub training_type: TrainingType,
}

impl SavePlanRequestDto {
    pub fn new(plan: &Plan, constraints: PlanConstraints) -> Self {
        Self {
            plan_data: PlanDataDto::from(plan),
            equipment_type: constraints.equipment,
            training_type: constraints.training_type,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoredPlanDto {
    pub id: IdDto,
    pub plan_data: PlanDataDto,
    pub equipment_type: EquipmentType,
    pub training_type: TrainingType,
    pub created_at: DateTime<Utc>,
}

impl From<StoredPlanDto> for StoredPlan {
    fn from(dto: StoredPlanDto) -> Self {
        StoredPlan {
            id: dto.id.into_string(),
            plan: dto.plan_data.into(),
            equipment: dto.equipment_type,
            training_type: dto.training_type,
            created_at: dto.created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlanEnvelopeDto {
    pub plan: StoredPlanDto,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CurrentPlanDto {
    #[serde(default)]
    pub plan: Option<StoredPlanDto>,
    #[serde(default)]
    pub session: Option<SessionDto>,
}

// ============================================================================
// Sessions
// ============================================================================

/// Ids arrive as numbers from SQL-backed stores and as strings elsewhere.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum IdDto {
    Number(i64),
    Text(String),
}

impl IdDto {
    pub fn into_string(self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionDto {
    pub id: IdDto,
    #[serde(alias = "plan_id")]
    pub home_training_plan_id: IdDto,
    pub status: String,
    #[serde(alias = "created_at")]
    pub started_at: DateTime<Utc>,
}

/// Maps the store's session status vocabulary.
pub fn parse_session_status(status: &str) -> Result<SessionStatus> {
    match status {
        "active" | "in_progress" => Ok(SessionStatus::Active),
        "completed" => Ok(SessionStatus::Completed),
        "abandoned" | "cancelled" => Ok(SessionStatus::Abandoned),
        other => Err(HomeTrainError::Serialization {
            format: "JSON".to_string(),
            message: format!("unknown session status '{other}'"),
        }),
    }
}

impl TryFrom<SessionDto> for Session {
    type Error = HomeTrainError;

    fn try_from(dto: SessionDto) -> Result<Self> {
        Ok(Session {
            id: dto.id.into_string(),
            plan_id: dto.home_training_plan_id.into_string(),
            status: parse_session_status(&dto.status)?,
            created_at: dto.started_at,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StartSessionRequestDto<'a> {
    pub home_training_plan_id: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionEnvelopeDto {
    pub session: SessionDto,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CloseActiveResponseDto {
    #[serde(default)]
    pub closed: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExerciseProgressDto {
    #[serde(alias = "home_training_session_id")]
    pub session_id: IdDto,
    pub exercise_order: usize,
    #[serde(default)]
    pub exercise_name: String,
    pub status: ExerciseStatus,
    #[serde(default)]
    pub series_completed: u32,
    #[serde(default)]
    pub total_series: u32,
    #[serde(default)]
    pub duration_seconds: Option<u32>,
    #[serde(default)]
    pub feedback_sentiment: Option<FeedbackSentiment>,
    #[serde(default)]
    pub feedback_comment: Option<String>,
    /// The plan exercise this row was created from.
    #[serde(default)]
    pub exercise_data: Option<ExerciseDto>,
}

impl ExerciseProgressDto {
    fn exercise(&self) -> Exercise {
        match &self.exercise_data {
            Some(data) => Exercise::from(data.clone()),
            None => Exercise::new(
                self.exercise_name.clone(),
                self.total_series.max(1),
                ExerciseTarget::Reps(0),
            ),
        }
    }
}

impl From<ExerciseProgressDto> for ExerciseProgress {
    fn from(dto: ExerciseProgressDto) -> Self {
        let total_series = if dto.total_series == 0 {
            DEFAULT_TOTAL_SERIES
        } else {
            dto.total_series
        };
        ExerciseProgress {
            session_id: dto.session_id.into_string(),
            exercise_order: dto.exercise_order,
            exercise_name: dto.exercise_name,
            status: dto.status,
            series_completed: dto.series_completed.min(total_series),
            total_series,
            duration_seconds: dto.duration_seconds,
            feedback: dto.feedback_sentiment.map(|sentiment| ExerciseFeedback {
                sentiment,
                comment: dto.feedback_comment,
            }),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionProgressDto {
    pub session: SessionDto,
    #[serde(default)]
    pub exercises: Vec<ExerciseProgressDto>,
}

impl TryFrom<SessionProgressDto> for SessionProgress {
    type Error = HomeTrainError;

    fn try_from(dto: SessionProgressDto) -> Result<Self> {
        let mut rows = dto.exercises;
        rows.sort_by_key(|row| row.exercise_order);
        let exercises = rows.iter().map(ExerciseProgressDto::exercise).collect();
        Ok(SessionProgress {
            session: Session::try_from(dto.session)?,
            progress: rows.into_iter().map(ExerciseProgress::from).collect(),
            exercises,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExerciseEnvelopeDto {
    pub exercise: ExerciseProgressDto,
}

#[derive(Debug, Clone, Serialize)]
pub struct AbandonRequestDto<'a> {
    pub current_progress: &'a BTreeMap<usize, SnapshotEntry>,
    pub reason: AbandonReason,
}

impl<'a> From<&'a AbandonRequest> for AbandonRequestDto<'a> {
    fn from(request: &'a AbandonRequest) -> Self {
        Self {
            current_progress: &request.current_progress,
            reason: request.reason,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AbandonResponseDto {
    pub final_status: String,
    #[serde(default)]
    pub can_resume: bool,
}

impl TryFrom<AbandonResponseDto> for AbandonOutcome {
    type Error = HomeTrainError;

    fn try_from(dto: AbandonResponseDto) -> Result<Self> {
        Ok(AbandonOutcome {
            final_status: parse_session_status(&dto.final_status)?,
            can_resume: dto.can_resume,
        })
    }
}

// ============================================================================
// Rejections
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct NewRejectionDto<'a> {
    pub exercise_key: &'a str,
    pub exercise_name: &'a str,
    pub equipment_type: EquipmentType,
    pub training_type: TrainingType,
    pub rejection_category: RejectionCategory,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<&'a str>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl<'a> From<&'a NewRejection> for NewRejectionDto<'a> {
    fn from(draft: &'a NewRejection) -> Self {
        Self {
            exercise_key: &draft.exercise_key,
            exercise_name: &draft.exercise_name,
            equipment_type: draft.equipment,
            training_type: draft.training_type,
            rejection_category: draft.category,
            rejection_reason: draft.reason.as_deref(),
            expires_at: draft.expires_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmitRejectionsRequestDto<'a> {
    pub rejections: Vec<NewRejectionDto<'a>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RejectionRuleDto {
    pub id: IdDto,
    pub exercise_key: String,
    pub exercise_name: String,
    pub equipment_type: EquipmentType,
    pub training_type: TrainingType,
    #[serde(default)]
    pub rejection_category: RejectionCategory,
    #[serde(default)]
    pub rejection_reason: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(alias = "rejected_at")]
    pub created_at: DateTime<Utc>,
}

impl From<RejectionRuleDto> for RejectionRule {
    fn from(dto: RejectionRuleDto) -> Self {
        RejectionRule {
            id: dto.id.into_string(),
            exercise_key: dto.exercise_key,
            exercise_name: dto.exercise_name,
            equipment: dto.equipment_type,
            training_type: dto.training_type,
            category: dto.rejection_category,
            reason: dto.rejection_reason,
            expires_at: dto.expires_at,
            created_at: dto.created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RejectionsEnvelopeDto {
    #[serde(default)]
    pub rejections: Vec<RejectionRuleDto>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RejectionQueryDto {
    pub equipment_type: EquipmentType,
    pub training_type: TrainingType,
}

/// Acknowledgement-only responses.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AckDto {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_generator_plan_document() {
        let dto: GenerateResponseDto = serde_json::from_value(json!({
            "success": true,
            "plan": {
                "mensaje_personalizado": "Let's go",
                "plan_entrenamiento": {
                    "titulo": "HIIT",
                    "ejercicios": [
                        {"nombre": "Goblet squat", "tipo": "reps", "series": 4, "repeticiones": 12, "descanso_seg": 60, "notas": "Chest up"},
                        {"nombre": "Plank", "tipo": "tiempo", "duracion_seg": 40}
                    ]
                }
            }
        }))
        .unwrap();

        let plan = Plan::from(dto.plan);
        assert_eq!(plan.message.as_deref(), Some("Let's go"));
        assert_eq!(plan.exercises[0].target, ExerciseTarget::Reps(12));
        assert_eq!(plan.exercises[0].rest_seconds, 60);
        assert_eq!(plan.exercises[1].target, ExerciseTarget::DurationSeconds(40));
        assert_eq!(plan.exercises[1].target_series, DEFAULT_TOTAL_SERIES);
    }

    #[test]
    fn test_plan_data_keeps_target_kind() {
        let plan = Plan::new(vec![Exercise::new(
            "Plank",
            3,
            ExerciseTarget::DurationSeconds(30),
        )]);
        let value = serde_json::to_value(PlanDataDto::from(&plan)).unwrap();
        assert_eq!(value["plan_entrenamiento"]["ejercicios"][0]["tipo"], "tiempo");
        assert_eq!(value["plan_entrenamiento"]["ejercicios"][0]["duracion_seg"], 30);
        assert!(value["plan_entrenamiento"]["ejercicios"][0].get("repeticiones").is_none());
    }

    #[test]
    fn test_session_progress_from_rows() {
        let dto: SessionProgressDto = serde_json::from_value(json!({
            "session": {
                "id": 77,
                "home_training_plan_id": 148,
                "status": "in_progress",
                "started_at": "2025-01-10T10:00:00Z"
            },
            "exercises": [
                {
                    "home_training_session_id": 77,
                    "exercise_order": 1,
                    "exercise_name": "Plank",
                    "status": "in_progress",
                    "series_completed": 2,
                    "total_series": 4,
                    "feedback_sentiment": "hard",
                    "exercise_data": {"nombre": "Plank", "tipo": "tiempo", "series": 4, "duracion_seg": 30}
                },
                {
                    "home_training_session_id": 77,
                    "exercise_order": 0,
                    "exercise_name": "Squat",
                    "status": "completed",
                    "series_completed": 3,
                    "total_series": 3
                }
            ]
        }))
        .unwrap();

        let progress = SessionProgress::try_from(dto).unwrap();
        assert_eq!(progress.session.id, "77");
        assert_eq!(progress.session.plan_id, "148");
        assert!(progress.session.is_active());
        assert_eq!(progress.progress[0].exercise_order, 0);
        assert_eq!(progress.progress[1].series_completed, 2);
        assert_eq!(
            progress.progress[1].feedback.as_ref().unwrap().sentiment,
            FeedbackSentiment::Hard
        );
        assert_eq!(progress.exercises[1].target, ExerciseTarget::DurationSeconds(30));
        assert_eq!(progress.exercises[0].name, "Squat");
    }

    #[test]
    fn test_session_status_vocabulary() {
        assert_eq!(parse_session_status("cancelled").unwrap(), SessionStatus::Abandoned);
        assert_eq!(parse_session_status("active").unwrap(), SessionStatus::Active);
        assert!(parse_session_status("paused").is_err());
    }

    #[test]
    fn test_rejection_rule_conversion() {
        let dto: RejectionRuleDto = serde_json::from_value(json!({
            "id": 5,
            "exercise_key": "burpees",
            "exercise_name": "Burpees",
            "equipment_type": "minimal",
            "training_type": "hiit",
            "rejection_category": "too_hard",
            "expires_at": null,
            "rejected_at": "2025-01-10T10:00:00Z"
        }))
        .unwrap();
        let rule = RejectionRule::from(dto);
        assert_eq!(rule.id, "5");
        assert!(rule.is_permanent());
        assert_eq!(rule.category, RejectionCategory::TooHard);
    }
}
