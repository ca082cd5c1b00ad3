//! Warm-up domain module.
//!
//! - `library`: static routines per training type and level scaling
//! - `sequencer`: the countdown state machine run before the main session

mod library;
mod sequencer;

pub use library::{FitnessLevel, MIN_STEP_SECONDS, WarmupStep, warmup_routine};
pub use sequencer::{WarmupSequencer, WarmupSignal, WarmupState, WarmupSummary};
