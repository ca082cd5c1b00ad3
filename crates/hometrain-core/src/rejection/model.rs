//! Rejection rule domain model.

use crate::plan::{EquipmentType, PlanConstraints, TrainingType, exercise_key};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Why the user does not want to see an exercise.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum RejectionCategory {
    TooHard,
    #[default]
    DontLike,
    Injury,
    Equipment,
    Other,
}

/// A rejection about to be submitted to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRejection {
    pub exercise_key: String,
    pub exercise_name: String,
    pub equipment: EquipmentType,
    pub training_type: TrainingType,
    pub category: RejectionCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// `None` means the rejection is permanent.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl NewRejection {
    /// A permanent rejection of `exercise_name` under `constraints`.
    pub fn new(
        exercise_name: impl Into<String>,
        constraints: PlanConstraints,
        category: RejectionCategory,
    ) -> Self {
        let exercise_name = exercise_name.into();
        Self {
            exercise_key: exercise_key(&exercise_name),
            exercise_name,
            equipment: constraints.equipment,
            training_type: constraints.training_type,
            category,
            reason: None,
            expires_at: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        self.reason = (!reason.trim().is_empty()).then_some(reason);
        self
    }

    /// Limits the rejection to `days` from `now`; `None` keeps it permanent.
    pub fn expiring_in_days(mut self, days: Option<u32>, now: DateTime<Utc>) -> Self {
        self.expires_at = days
            .filter(|d| *d > 0)
            .map(|d| now + Duration::days(i64::from(d)));
        self
    }
}

/// A persisted exclusion constraint consulted by the plan generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectionRule {
    pub id: String,
    pub exercise_key: String,
    pub exercise_name: String,
    pub equipment: EquipmentType,
    pub training_type: TrainingType,
    pub category: RejectionCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl RejectionRule {
    pub fn is_permanent(&self) -> bool {
        self.expires_at.is_none()
    }

    /// A rule stops excluding once its expiry is reached.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }

    pub fn applies_to(&self, constraints: PlanConstraints) -> bool {
        self.equipment == constraints.equipment && self.training_type == constraints.training_type
    }
}

/// Exercise keys excluded for `constraints` by the active rules.
pub fn active_exclusions(
    rules: &[RejectionRule],
    constraints: PlanConstraints,
    now: DateTime<Utc>,
) -> Vec<String> {
    let mut keys: Vec<String> = rules
        .iter()
        .filter(|r| r.applies_to(constraints) && r.is_active(now))
        .map(|r| r.exercise_key.clone())
        .collect();
    keys.sort();
    keys.dedup();
    keys
}
