//! Exercise progress domain module.

mod model;

pub use model::{
    ExerciseFeedback, ExerciseProgress, ExerciseStatus, FeedbackSentiment, Outcome,
    OutcomeIntent, ProgressPatch, ResumePoint, completion_percentage, resume_point,
};
