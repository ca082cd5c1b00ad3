//! Plan generator and plan repository traits.

use super::model::{Plan, PlanConstraints, PlanRequest, StoredPlan};
use crate::error::Result;
use crate::session::Session;
use async_trait::async_trait;

/// The external plan-generation service.
///
/// Generation is not free, so callers must never retry it automatically:
/// a failure is surfaced and the user decides whether to try again.
#[async_trait]
pub trait PlanGenerator: Send + Sync {
    /// Produces an ordered exercise list honouring `request.exclusions`.
    async fn generate_plan(&self, request: &PlanRequest) -> Result<Plan>;
}

/// The most recent plan of the user and its open session, if any.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CurrentPlan {
    pub plan: Option<StoredPlan>,
    pub session: Option<Session>,
}

/// An abstract repository for persisted plans.
#[async_trait]
pub trait PlanRepository: Send + Sync {
    /// Persists a generated plan.
    ///
    /// # Returns
    ///
    /// - `Ok(StoredPlan)`: The plan with its store-assigned id
    /// - `Err(_)`: Error occurred during save
    async fn save_plan(&self, plan: &Plan, constraints: PlanConstraints) -> Result<StoredPlan>;

    /// Gets the latest plan of the user together with its active session.
    ///
    /// Used on cold start to resume where the user left off.
    async fn current_plan(&self) -> Result<CurrentPlan>;
}
