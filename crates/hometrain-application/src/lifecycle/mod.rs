//! Session lifecycle.
//!
//! - `state`: the `LifecycleState` transition table
//! - `controller`: `SessionLifecycleController`, the single owner of plan and
//!   session state

mod controller;
mod state;

pub use controller::{ExerciseResult, SessionLifecycleController};
pub use state::{LifecycleEvent, LifecycleState};
