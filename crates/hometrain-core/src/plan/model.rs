//! Plan domain model.
//!
//! A plan is the ordered, immutable list of exercises produced by the external
//! generator for one training session.

use crate::error::{HomeTrainError, Result};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

static NON_ALNUM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("static pattern is valid"));

/// Normalises an exercise name into the key used by rejection rules.
///
/// The name is lowercased and every run of characters outside `[a-z0-9]`
/// collapses to a single underscore.
pub fn exercise_key(name: &str) -> String {
    NON_ALNUM
        .replace_all(&name.to_lowercase(), "_")
        .into_owned()
}

/// Equipment available to the user at home.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum EquipmentType {
    /// Body weight, towels, a chair and a wall.
    Minimal,
    /// Adjustable dumbbells, elastic bands, a mat.
    Basic,
    /// Pull-up bar, kettlebells, suspension trainer.
    Advanced,
}

/// Training style requested for the plan.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum TrainingType {
    Functional,
    Hiit,
    Strength,
}

/// What a single series of an exercise asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseTarget {
    Reps(u32),
    DurationSeconds(u32),
}

/// One exercise of a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exercise {
    pub name: String,
    pub target_series: u32,
    pub target: ExerciseTarget,
    #[serde(default)]
    pub rest_seconds: u32,
    #[serde(default)]
    pub notes: String,
}

impl Exercise {
    /// Creates an exercise with no rest and no notes.
    pub fn new(name: impl Into<String>, target_series: u32, target: ExerciseTarget) -> Self {
        Self {
            name: name.into(),
            target_series,
            target,
            rest_seconds: 0,
            notes: String::new(),
        }
    }

    pub fn with_rest(mut self, rest_seconds: u32) -> Self {
        self.rest_seconds = rest_seconds;
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    /// The rejection key of this exercise.
    pub fn key(&self) -> String {
        exercise_key(&self.name)
    }
}

/// An ordered list of exercises for one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub exercises: Vec<Exercise>,
    /// Personalised message from the generator, shown before the plan.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Plan {
    pub fn new(exercises: Vec<Exercise>) -> Self {
        Self {
            exercises,
            message: None,
        }
    }

    pub fn len(&self) -> usize {
        self.exercises.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exercises.is_empty()
    }

    pub fn exercise(&self, index: usize) -> Option<&Exercise> {
        self.exercises.get(index)
    }

    /// Returns true if any exercise of the plan normalises to `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        self.exercises.iter().any(|e| e.key() == key)
    }

    /// Checks that the plan can drive a session.
    ///
    /// # Errors
    ///
    /// Returns `HomeTrainError::Validation` if the plan is empty, an exercise
    /// has a blank name, or an exercise asks for zero series.
    pub fn validate(&self) -> Result<()> {
        if self.exercises.is_empty() {
            return Err(HomeTrainError::validation("plan contains no exercises"));
        }
        for (index, exercise) in self.exercises.iter().enumerate() {
            if exercise.name.trim().is_empty() {
                return Err(HomeTrainError::validation(format!(
                    "exercise {index} has no name"
                )));
            }
            if exercise.target_series == 0 {
                return Err(HomeTrainError::validation(format!(
                    "exercise {index} ('{}') has zero target series",
                    exercise.name
                )));
            }
        }
        Ok(())
    }
}

/// Equipment and training type selected by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlanConstraints {
    pub equipment: EquipmentType,
    pub training_type: TrainingType,
}

impl PlanConstraints {
    pub fn new(equipment: EquipmentType, training_type: TrainingType) -> Self {
        Self {
            equipment,
            training_type,
        }
    }
}

/// Input of the plan generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanRequest {
    pub constraints: PlanConstraints,
    /// Exercise keys that must not appear in the generated plan.
    pub exclusions: Vec<String>,
}

impl PlanRequest {
    pub fn new(constraints: PlanConstraints) -> Self {
        Self {
            constraints,
            exclusions: Vec::new(),
        }
    }

    /// Adds exclusion keys; the list stays sorted and free of duplicates.
    pub fn with_exclusions<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclusions.extend(keys.into_iter().map(Into::into));
        self.exclusions.sort();
        self.exclusions.dedup();
        self
    }

    pub fn excludes(&self, key: &str) -> bool {
        self.exclusions.binary_search_by(|k| k.as_str().cmp(key)).is_ok()
    }
}

/// A plan after it has been persisted by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredPlan {
    pub id: String,
    pub plan: Plan,
    pub equipment: EquipmentType,
    pub training_type: TrainingType,
    pub created_at: DateTime<Utc>,
}

impl StoredPlan {
    pub fn constraints(&self) -> PlanConstraints {
        PlanConstraints::new(self.equipment, self.training_type)
    }
}
