//! Plan domain module.
//!
//! - `model`: `Plan`, `Exercise`, constraints and requests
//! - `repository`: `PlanGenerator` and `PlanRepository` traits

mod model;
mod repository;

pub use model::{
    EquipmentType, Exercise, ExerciseTarget, Plan, PlanConstraints, PlanRequest, StoredPlan,
    TrainingType, exercise_key,
};
pub use repository::{CurrentPlan, PlanGenerator, PlanRepository};
