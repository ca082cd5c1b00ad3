//! Static warm-up library.

use crate::plan::TrainingType;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Shortest duration a warm-up step is ever scaled down to.
pub const MIN_STEP_SECONDS: u32 = 20;

/// Self-declared fitness level used to scale the warm-up.
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
#[strum(serialize_all = "snake_case")]
pub enum FitnessLevel {
    Beginner,
    Basic,
    #[default]
    Intermediate,
    Advanced,
}

impl FitnessLevel {
    pub fn multiplier(self) -> f64 {
        match self {
            Self::Beginner => 0.85,
            Self::Basic => 0.9,
            Self::Intermediate => 1.0,
            Self::Advanced => 1.15,
        }
    }

    /// Maps free text from a profile ("Avanzado", "advanced user", ...) onto a
    /// level. Anything unrecognised is intermediate.
    pub fn from_loose(text: &str) -> Self {
        let lower = text.trim().to_lowercase();
        if lower.contains("advan") || lower.contains("avanz") {
            Self::Advanced
        } else if lower.contains("inter") {
            Self::Intermediate
        } else if lower.contains("bas") {
            Self::Basic
        } else if lower.contains("begin") || lower.contains("princ") || lower.contains("novice") {
            Self::Beginner
        } else {
            Self::Intermediate
        }
    }

    /// Scales a nominal duration, never going below `MIN_STEP_SECONDS`.
    pub fn scale(self, seconds: u32) -> u32 {
        let scaled = (f64::from(seconds) * self.multiplier()).round() as u32;
        scaled.max(MIN_STEP_SECONDS)
    }
}

/// One timed warm-up movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarmupStep {
    pub name: String,
    pub duration_seconds: u32,
    pub description: String,
}

struct StepTemplate {
    name: &'static str,
    seconds: u32,
    description: &'static str,
}

const fn step(name: &'static str, seconds: u32, description: &'static str) -> StepTemplate {
    StepTemplate {
        name,
        seconds,
        description,
    }
}

const FUNCTIONAL: [StepTemplate; 5] = [
    step("Full joint mobility", 45, "Open circles of shoulders, hips and ankles"),
    step("High-knee march", 40, "Knees to chest while keeping the core braced"),
    step("Active plank with shoulder taps", 35, "Alternate hands keeping the hips still"),
    step("Dynamic lunges", 40, "Long step with a gentle torso rotation"),
    step("Controlled jumping jacks", 35, "Moderate pace to raise body temperature"),
];

const HIIT: [StepTemplate; 5] = [
    step("Skipping in place", 40, "Fast rhythm, arms follow the movement"),
    step("Squat reach", 35, "Short squat with arms extending overhead"),
    step("Mountain climbers", 40, "Knees to chest with shoulders over the hands"),
    step("Modified burpee", 35, "No jump, control the descent"),
    step("Shadow boxing", 30, "Light punches alternating guard"),
];

const STRENGTH: [StepTemplate; 5] = [
    step("Controlled glute bridge", 40, "Wake up the posterior chain progressively"),
    step("Bodyweight good morning", 35, "Hip hinge with a neutral spine"),
    step("Tempo push-ups", 45, "Three seconds down, one second up"),
    step("Paused squats", 45, "Hold two seconds at the bottom"),
    step("Light band rows", 40, "Squeeze the shoulder blades at the end"),
];

/// Builds the warm-up for a training type, scaled to `level`.
pub fn warmup_routine(training_type: TrainingType, level: FitnessLevel) -> Vec<WarmupStep> {
    let templates: &[StepTemplate] = match training_type {
        TrainingType::Functional => &FUNCTIONAL,
        TrainingType::Hiit => &HIIT,
        TrainingType::Strength => &STRENGTH,
    };

    templates
        .iter()
        .map(|t| WarmupStep {
            name: t.name.to_string(),
            duration_seconds: level.scale(t.seconds),
            description: t.description.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_scaling_rounds_and_floors() {
        assert_eq!(FitnessLevel::Beginner.scale(30), 26);
        assert_eq!(FitnessLevel::Advanced.scale(40), 46);
        assert_eq!(FitnessLevel::Intermediate.scale(35), 35);
        assert_eq!(FitnessLevel::Beginner.scale(10), MIN_STEP_SECONDS);
    }

    #[test]
    fn test_loose_level_parsing() {
        assert_eq!(FitnessLevel::from_loose("Avanzado"), FitnessLevel::Advanced);
        assert_eq!(FitnessLevel::from_loose("advanced"), FitnessLevel::Advanced);
        assert_eq!(FitnessLevel::from_loose("Intermedio"), FitnessLevel::Intermediate);
        assert_eq!(FitnessLevel::from_loose("basico"), FitnessLevel::Basic);
        assert_eq!(FitnessLevel::from_loose("Principiante"), FitnessLevel::Beginner);
        assert_eq!(FitnessLevel::from_loose(""), FitnessLevel::Intermediate);
    }

    #[test]
    fn test_routine_per_training_type() {
        let routine = warmup_routine(TrainingType::Hiit, FitnessLevel::Intermediate);
        assert_eq!(routine.len(), 5);
        assert_eq!(routine[0].name, "Skipping in place");
        assert_eq!(routine[4].duration_seconds, 30);

        let beginner = warmup_routine(TrainingType::Strength, FitnessLevel::Beginner);
        assert!(beginner.iter().all(|s| s.duration_seconds >= MIN_STEP_SECONDS));
        assert_eq!(beginner[2].duration_seconds, 38);
    }
}
