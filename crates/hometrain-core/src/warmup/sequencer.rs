//! Warm-up countdown state machine.
//!
//! The sequencer is driven from the outside: callers feed it elapsed seconds
//! through [`WarmupSequencer::tick`] and manual actions through `start`,
//! `pause`, `advance` and `skip`. It holds no persisted state and can be
//! reset to its initial configuration at any time.

use super::library::{FitnessLevel, WarmupStep, warmup_routine};
use crate::error::{HomeTrainError, Result};
use crate::plan::TrainingType;

/// Position of the sequencer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarmupState {
    /// Step `i` is shown but its countdown has not started.
    Ready(usize),
    Running { index: usize, remaining: u32 },
    Paused { index: usize, remaining: u32 },
    Finished,
}

/// Result of the warm-up, handed to the session controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WarmupSummary {
    pub steps_completed: usize,
    pub total_steps: usize,
    pub seconds_spent: u32,
    pub skipped: bool,
}

/// What happened after feeding the sequencer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarmupSignal {
    /// Nothing to report (not running).
    Idle,
    Tick { index: usize, remaining: u32 },
    /// Step `index` ended; the next one is `Ready`.
    StepFinished { index: usize },
    Completed(WarmupSummary),
}

#[derive(Debug, Clone)]
pub struct WarmupSequencer {
    steps: Vec<WarmupStep>,
    state: WarmupState,
    seconds_spent: u32,
    steps_completed: usize,
    skipped: bool,
}

impl WarmupSequencer {
    pub fn new(steps: Vec<WarmupStep>) -> Self {
        let state = if steps.is_empty() {
            WarmupState::Finished
        } else {
            WarmupState::Ready(0)
        };
        Self {
            steps,
            state,
            seconds_spent: 0,
            steps_completed: 0,
            skipped: false,
        }
    }

    /// Sequencer over the library routine for a training type.
    pub fn for_training(training_type: TrainingType, level: FitnessLevel) -> Self {
        Self::new(warmup_routine(training_type, level))
    }

    pub fn state(&self) -> WarmupState {
        self.state
    }

    pub fn steps(&self) -> &[WarmupStep] {
        &self.steps
    }

    pub fn is_finished(&self) -> bool {
        self.state == WarmupState::Finished
    }

    /// The step currently shown, if any.
    pub fn current_step(&self) -> Option<&WarmupStep> {
        match self.state {
            WarmupState::Ready(index)
            | WarmupState::Running { index, .. }
            | WarmupState::Paused { index, .. } => self.steps.get(index),
            WarmupState::Finished => None,
        }
    }

    /// Summary of the run; only available once finished.
    pub fn summary(&self) -> Option<WarmupSummary> {
        self.is_finished().then(|| self.build_summary())
    }

    /// Starts the countdown of the ready step, or resumes a paused one.
    pub fn start(&mut self) -> Result<()> {
        self.state = match self.state {
            WarmupState::Ready(index) => WarmupState::Running {
                index,
                remaining: self.steps[index].duration_seconds,
            },
            WarmupState::Paused { index, remaining } => WarmupState::Running { index, remaining },
            running @ WarmupState::Running { .. } => running,
            WarmupState::Finished => return Err(self.invalid("start")),
        };
        Ok(())
    }

    pub fn pause(&mut self) -> Result<()> {
        self.state = match self.state {
            WarmupState::Running { index, remaining } => WarmupState::Paused { index, remaining },
            paused @ WarmupState::Paused { .. } => paused,
            _ => return Err(self.invalid("pause")),
        };
        Ok(())
    }

    /// Feeds elapsed time to a running countdown.
    pub fn tick(&mut self, elapsed_seconds: u32) -> WarmupSignal {
        let WarmupState::Running { index, remaining } = self.state else {
            return WarmupSignal::Idle;
        };

        let consumed = elapsed_seconds.min(remaining);
        self.seconds_spent += consumed;
        let remaining = remaining - consumed;

        if remaining == 0 {
            self.finish_step(index)
        } else {
            self.state = WarmupState::Running { index, remaining };
            WarmupSignal::Tick { index, remaining }
        }
    }

    /// Moves on to the next step without waiting for the countdown.
    pub fn advance(&mut self) -> WarmupSignal {
        match self.state {
            WarmupState::Ready(index)
            | WarmupState::Running { index, .. }
            | WarmupState::Paused { index, .. } => self.finish_step(index),
            WarmupState::Finished => WarmupSignal::Completed(self.build_summary()),
        }
    }

    /// Abandons the rest of the warm-up.
    pub fn skip(&mut self) -> WarmupSummary {
        if !self.is_finished() {
            self.skipped = true;
            self.state = WarmupState::Finished;
        }
        self.build_summary()
    }

    /// Back to the initial configuration.
    pub fn reset(&mut self) {
        *self = Self::new(std::mem::take(&mut self.steps));
    }

    fn finish_step(&mut self, index: usize) -> WarmupSignal {
        self.steps_completed += 1;
        let next = index + 1;
        if next >= self.steps.len() {
            self.state = WarmupState::Finished;
            WarmupSignal::Completed(self.build_summary())
        } else {
            self.state = WarmupState::Ready(next);
            WarmupSignal::StepFinished { index }
        }
    }

    fn build_summary(&self) -> WarmupSummary {
        WarmupSummary {
            steps_completed: self.steps_completed,
            total_steps: self.steps.len(),
            seconds_spent: self.seconds_spent,
            skipped: self.skipped,
        }
    }

    fn invalid(&self, event: &str) -> HomeTrainError {
        HomeTrainError::InvalidTransition {
            from: format!("{:?}", self.state),
            event: format!("warmup {event}"),
        }
    }
}
