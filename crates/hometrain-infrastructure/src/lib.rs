pub mod config_service;
pub mod http;
pub mod memory_backend;
pub mod paths;

pub use crate::config_service::ConfigService;
pub use crate::http::{ApiClient, HttpTrainingStore};
pub use crate::memory_backend::{BackendOp, InMemoryTrainingBackend};
pub use crate::paths::HomeTrainPaths;
