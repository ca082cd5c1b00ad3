//! HTTP access to the training API.
//!
//! - `client`: envelope decoding, status mapping, single retry helper
//! - `dto`: wire types
//! - `remote_store`: repository trait implementations

mod client;
pub mod dto;
mod remote_store;

pub use client::{ApiClient, retry_once};
pub use remote_store::HttpTrainingStore;
