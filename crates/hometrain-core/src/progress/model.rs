//! Exercise progress domain model.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Per-exercise execution status within a session.
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
pub enum ExerciseStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Skipped,
    Cancelled,
}

impl ExerciseStatus {
    /// Completed, skipped and cancelled exercises need no further work.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Skipped | Self::Cancelled)
    }
}

/// How the user felt about an exercise.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum FeedbackSentiment {
    Dislike,
    Hard,
    Love,
}

/// Latest feedback attached to an exercise of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExerciseFeedback {
    pub sentiment: FeedbackSentiment,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Full-replace payload written for one `(session, exercise)` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressPatch {
    pub series_completed: u32,
    pub total_series: u32,
    pub status: ExerciseStatus,
    #[serde(default)]
    pub duration_seconds: Option<u32>,
}

/// What the caller of `record_outcome` wants to happen to the exercise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeIntent {
    /// Record series progress; completion is derived from the series count.
    Progress,
    Skip,
    Cancel,
}

/// Input of the idempotent update protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub series_completed: u32,
    pub total_series: u32,
    pub intent: OutcomeIntent,
    pub duration_seconds: Option<u32>,
}

impl Outcome {
    pub fn progress(series_completed: u32, total_series: u32) -> Self {
        Self {
            series_completed,
            total_series,
            intent: OutcomeIntent::Progress,
            duration_seconds: None,
        }
    }

    pub fn skip(total_series: u32) -> Self {
        Self {
            series_completed: 0,
            total_series,
            intent: OutcomeIntent::Skip,
            duration_seconds: None,
        }
    }

    pub fn cancel(series_completed: u32, total_series: u32) -> Self {
        Self {
            series_completed,
            total_series,
            intent: OutcomeIntent::Cancel,
            duration_seconds: None,
        }
    }

    pub fn with_duration(mut self, duration_seconds: Option<u32>) -> Self {
        self.duration_seconds = duration_seconds;
        self
    }

    /// Whether this outcome, applied against `total_series`, means the
    /// exercise is done in full.
    pub fn is_completion_equivalent(&self, total_series: u32) -> bool {
        match self.intent {
            OutcomeIntent::Skip => false,
            OutcomeIntent::Progress | OutcomeIntent::Cancel => {
                self.series_completed >= total_series
            }
        }
    }
}

/// Execution record of one exercise within a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExerciseProgress {
    pub session_id: String,
    pub exercise_order: usize,
    pub exercise_name: String,
    pub status: ExerciseStatus,
    pub series_completed: u32,
    pub total_series: u32,
    #[serde(default)]
    pub duration_seconds: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<ExerciseFeedback>,
}

impl ExerciseProgress {
    /// A fresh record for an exercise nobody has started yet.
    pub fn pending(
        session_id: impl Into<String>,
        exercise_order: usize,
        exercise_name: impl Into<String>,
        total_series: u32,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            exercise_order,
            exercise_name: exercise_name.into(),
            status: ExerciseStatus::Pending,
            series_completed: 0,
            total_series,
            duration_seconds: None,
            feedback: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// The patch that would rewrite this record as-is.
    pub fn to_patch(&self) -> ProgressPatch {
        ProgressPatch {
            series_completed: self.series_completed,
            total_series: self.total_series,
            status: self.status,
            duration_seconds: self.duration_seconds,
        }
    }

    /// Returns a copy with `patch` applied (full replace of the mutable fields).
    ///
    /// A patch without a duration keeps the recorded one.
    pub fn with_patch(&self, patch: &ProgressPatch) -> Self {
        Self {
            status: patch.status,
            series_completed: patch.series_completed,
            total_series: patch.total_series,
            duration_seconds: patch.duration_seconds.or(self.duration_seconds),
            ..self.clone()
        }
    }
}

/// Percentage of the plan whose exercises reached a terminal state.
///
/// Skipped and cancelled exercises count as finished: a session is 100 %
/// done once nothing is left to do, regardless of how each exercise ended.
/// Entries whose order lies outside the plan are ignored.
pub fn completion_percentage(progress: &[ExerciseProgress], plan_len: usize) -> f64 {
    if plan_len == 0 {
        return 0.0;
    }
    let terminal = progress
        .iter()
        .filter(|p| p.exercise_order < plan_len && p.is_terminal())
        .count();
    terminal as f64 / plan_len as f64 * 100.0
}

/// Where a resumed session continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumePoint {
    /// Index of the first exercise that is not terminal; always `< plan_len`.
    At(usize),
    /// Every exercise of the plan is terminal.
    Finished,
}

/// Computes the resume point of a session from its progress list.
///
/// Missing entries count as pending. Entries beyond the plan length (stale or
/// corrupted records) are ignored, so the result never indexes past the plan.
pub fn resume_point(progress: &[ExerciseProgress], plan_len: usize) -> ResumePoint {
    (0..plan_len)
        .find(|index| {
            progress
                .iter()
                .find(|p| p.exercise_order == *index)
                .map(|p| !p.is_terminal())
                .unwrap_or(true)
        })
        .map(ResumePoint::At)
        .unwrap_or(ResumePoint::Finished)
}
