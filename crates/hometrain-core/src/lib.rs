//! Domain layer of hometrain.
//!
//! Models, repository traits and pure state machines for home-training
//! sessions. Nothing in this crate performs I/O.

pub mod config;
pub mod error;
pub mod plan;
pub mod progress;
pub mod rejection;
pub mod session;
pub mod warmup;

// Re-export common error type
pub use error::{HomeTrainError, Result};
