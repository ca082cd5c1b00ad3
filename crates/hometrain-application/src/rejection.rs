//! Rejection cycle.
//!
//! Turns "I don't want this exercise" into persisted exclusion rules and a
//! regenerated plan. Exclusions are always read back from the store before a
//! plan is requested, so a rule submitted a moment ago is honoured. Both
//! regeneration paths clear the previous plan, session and progress before
//! the new plan is fetched.

use crate::lifecycle::SessionLifecycleController;
use chrono::Utc;
use hometrain_core::error::{HomeTrainError, Result};
use hometrain_core::plan::{PlanConstraints, StoredPlan};
use hometrain_core::rejection::{
    NewRejection, RejectionCategory, RejectionRepository, RejectionRule, active_exclusions,
};
use std::sync::Arc;

/// A rejection as entered by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectionDraft {
    pub exercise_name: String,
    pub category: RejectionCategory,
    pub reason: Option<String>,
    /// `None` means permanent.
    pub expires_in_days: Option<u32>,
}

impl RejectionDraft {
    pub fn new(exercise_name: impl Into<String>, category: RejectionCategory) -> Self {
        Self {
            exercise_name: exercise_name.into(),
            category,
            reason: None,
            expires_in_days: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn expiring_in_days(mut self, days: u32) -> Self {
        self.expires_in_days = Some(days);
        self
    }

    fn into_new_rejection(self, constraints: PlanConstraints) -> NewRejection {
        let rejection = NewRejection::new(self.exercise_name, constraints, self.category)
            .expiring_in_days(self.expires_in_days, Utc::now());
        match self.reason {
            Some(reason) => rejection.with_reason(reason),
            None => rejection,
        }
    }
}

pub struct RejectionCycle {
    rejections: Arc<dyn RejectionRepository>,
}

impl RejectionCycle {
    pub fn new(rejections: Arc<dyn RejectionRepository>) -> Self {
        Self { rejections }
    }

    /// Exercise keys currently excluded for `constraints`.
    ///
    /// # Errors
    ///
    /// Fails when the rules cannot be listed. Callers must not generate a
    /// plan without them.
    pub async fn exclusions_for(&self, constraints: PlanConstraints) -> Result<Vec<String>> {
        let rules = self.rejections.list_rejections(constraints).await?;
        Ok(active_exclusions(&rules, constraints, Utc::now()))
    }

    /// Requests a plan honouring every active rule for `constraints`.
    pub async fn request_plan(
        &self,
        controller: &mut SessionLifecycleController,
        constraints: PlanConstraints,
    ) -> Result<StoredPlan> {
        let exclusions = self.exclusions_for(constraints).await?;
        tracing::debug!(
            "[RejectionCycle] {} exclusion(s) for {}/{}",
            exclusions.len(),
            constraints.equipment,
            constraints.training_type
        );
        controller.request_plan(constraints, exclusions).await
    }

    /// Persists `drafts`, drops the current plan and session, and requests a
    /// new plan that excludes the rejected exercises.
    ///
    /// # Returns
    ///
    /// The stored rules and the regenerated plan.
    ///
    /// # Errors
    ///
    /// Nothing is closed when persisting the rules fails.
    pub async fn submit_rejections(
        &self,
        controller: &mut SessionLifecycleController,
        drafts: Vec<RejectionDraft>,
    ) -> Result<(Vec<RejectionRule>, StoredPlan)> {
        let constraints = Self::constraints_of(controller)?;

        let new_rejections: Vec<NewRejection> = drafts
            .into_iter()
            .map(|d| d.into_new_rejection(constraints))
            .collect();
        let rules = self.rejections.submit_rejections(&new_rejections).await?;
        tracing::info!("[RejectionCycle] Stored {} rejection(s)", rules.len());

        controller.close_and_reset().await?;
        let plan = self.request_plan(controller, constraints).await?;
        Ok((rules, plan))
    }

    /// Regenerates like [`Self::submit_rejections`] without storing a rule.
    pub async fn skip_rejection(
        &self,
        controller: &mut SessionLifecycleController,
    ) -> Result<StoredPlan> {
        let constraints = Self::constraints_of(controller)?;
        tracing::debug!("[RejectionCycle] Regenerating without new rejections");
        controller.close_and_reset().await?;
        self.request_plan(controller, constraints).await
    }

    fn constraints_of(controller: &SessionLifecycleController) -> Result<PlanConstraints> {
        controller
            .constraints()
            .ok_or_else(|| HomeTrainError::conflict("no plan constraints to regenerate for"))
    }

    pub async fn list(&self, constraints: PlanConstraints) -> Result<Vec<RejectionRule>> {
        self.rejections.list_rejections(constraints).await
    }

    /// Deletes a rule so its exercise may be generated again.
    pub async fn reactivate(&self, rejection_id: &str) -> Result<()> {
        self.rejections.delete_rejection(rejection_id).await?;
        tracing::info!("[RejectionCycle] Reactivated rejection {}", rejection_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hometrain_core::plan::{EquipmentType, TrainingType};

    #[test]
    fn test_draft_conversion() {
        let constraints = PlanConstraints::new(EquipmentType::Basic, TrainingType::Strength);
        let rejection = RejectionDraft::new("Push Ups", RejectionCategory::TooHard)
            .with_reason("wrist pain")
            .expiring_in_days(7)
            .into_new_rejection(constraints);

        assert_eq!(rejection.exercise_key, "push_ups");
        assert_eq!(rejection.equipment, EquipmentType::Basic);
        assert_eq!(rejection.reason.as_deref(), Some("wrist pain"));
        assert!(rejection.expires_at.is_some());

        let permanent = RejectionDraft::new("Plank", RejectionCategory::DontLike)
            .into_new_rejection(constraints);
        assert!(permanent.expires_at.is_none());
        assert!(permanent.reason.is_none());
    }
}
