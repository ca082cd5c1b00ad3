//! Rejection domain module.

mod model;
mod repository;

pub use model::{NewRejection, RejectionCategory, RejectionRule, active_exclusions};
pub use repository::RejectionRepository;
