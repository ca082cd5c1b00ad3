//! Session domain module.
//!
//! # Module Structure
//!
//! - `model`: `Session`, `SessionProgress` and abandon snapshot types
//! - `repository`: Repository trait for the remote session store

mod model;
mod repository;

pub use model::{
    AbandonOutcome, AbandonReason, AbandonRequest, Session, SessionProgress, SessionStatus,
    SnapshotEntry,
};
pub use repository::SessionRepository;
