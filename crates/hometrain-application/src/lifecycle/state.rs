//! Lifecycle transition table.

use hometrain_core::error::{HomeTrainError, Result};
use strum::{AsRefStr, Display};

/// Phase of the training session as seen by the user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, AsRefStr)]
pub enum LifecycleState {
    #[default]
    Idle,
    PlanPending,
    PlanReady,
    Warmup,
    Exercising,
    Completed,
    Abandoned,
}

/// Inputs of the lifecycle state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    PlanRequested,
    PlanGenerated,
    PlanFailed,
    /// A persisted plan was loaded on cold start.
    PlanRestored,
    PlanAccepted { warmup: bool },
    WarmupFinished,
    AllExercisesDone,
    SessionAbandoned,
    /// Session state rebuilt from the store.
    SessionRestored { target: LifecycleState },
    Reset,
}

impl LifecycleState {
    /// The state reached by applying `event`.
    ///
    /// # Errors
    ///
    /// Returns `HomeTrainError::InvalidTransition` when the table has no
    /// entry for `(self, event)`.
    pub fn on(self, event: LifecycleEvent) -> Result<LifecycleState> {
        use LifecycleEvent as E;
        use LifecycleState as S;

        let next = match (self, event) {
            (S::Idle | S::Completed | S::Abandoned, E::PlanRequested) => S::PlanPending,
            (S::PlanPending, E::PlanGenerated) => S::PlanReady,
            (S::PlanPending, E::PlanFailed) => S::Idle,
            (S::Idle, E::PlanRestored) => S::PlanReady,
            (S::PlanReady, E::PlanAccepted { warmup: true }) => S::Warmup,
            (S::PlanReady, E::PlanAccepted { warmup: false }) => S::Exercising,
            (S::Warmup, E::WarmupFinished) => S::Exercising,
            (S::Exercising, E::AllExercisesDone) => S::Completed,
            (S::Warmup | S::Exercising, E::SessionAbandoned) => S::Abandoned,
            (
                S::Idle | S::PlanReady | S::Warmup | S::Exercising,
                E::SessionRestored {
                    target: target @ (S::Exercising | S::Completed | S::Abandoned),
                },
            ) => target,
            (_, E::Reset) => S::Idle,
            (from, event) => {
                return Err(HomeTrainError::InvalidTransition {
                    from: from.to_string(),
                    event: format!("{event:?}"),
                });
            }
        };
        Ok(next)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Abandoned)
    }

    /// A session exists and has not ended.
    pub fn has_live_session(self) -> bool {
        matches!(self, Self::Warmup | Self::Exercising)
    }
}
