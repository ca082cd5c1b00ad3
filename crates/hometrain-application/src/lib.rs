//! Application layer for hometrain.
//!
//! Coordinates the domain models with the store implementations: the session
//! lifecycle controller, idempotent progress writes, the abandonment monitor,
//! the rejection cycle and the warm-up driver.

pub mod abandonment;
pub mod ledger;
pub mod lifecycle;
pub mod rejection;
pub mod services;
pub mod update_client;
pub mod warmup_driver;

pub use abandonment::{AbandonmentMonitor, EnvironmentSignal, SnapshotDisposition};
pub use ledger::{ProgressLedger, SharedLedger};
pub use lifecycle::{ExerciseResult, LifecycleEvent, LifecycleState, SessionLifecycleController};
pub use rejection::{RejectionCycle, RejectionDraft};
pub use services::TrainingServices;
pub use update_client::{IdempotentUpdateClient, RecordDisposition, RecordResult, SingleFlight};
pub use warmup_driver::{WarmupCommand, WarmupDriver};
