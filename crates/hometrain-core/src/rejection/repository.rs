//! Rejection repository trait.

use super::model::{NewRejection, RejectionRule};
use crate::error::Result;
use crate::plan::PlanConstraints;
use async_trait::async_trait;

/// An abstract repository for persisted rejection rules.
#[async_trait]
pub trait RejectionRepository: Send + Sync {
    /// Persists new rules.
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<RejectionRule>)`: The stored rules with their ids
    /// - `Err(_)`: Error occurred during submission
    async fn submit_rejections(&self, rejections: &[NewRejection]) -> Result<Vec<RejectionRule>>;

    /// Lists the rules that currently exclude exercises for `constraints`.
    /// Expired rules are not returned.
    async fn list_rejections(&self, constraints: PlanConstraints) -> Result<Vec<RejectionRule>>;

    /// Deletes a rule, making its exercise eligible again.
    ///
    /// Deleting a rule that does not exist is not an error.
    async fn delete_rejection(&self, rejection_id: &str) -> Result<()>;
}
