use anyhow::Result;
use hometrain_application::{RejectionCycle, TrainingServices};
use hometrain_core::plan::PlanConstraints;

pub async fn list(services: TrainingServices, constraints: PlanConstraints) -> Result<()> {
    let cycle = RejectionCycle::new(services.rejections);
    let rules = cycle.list(constraints).await?;

    if rules.is_empty() {
        println!(
            "No active rejections for {} / {}.",
            constraints.equipment, constraints.training_type
        );
        return Ok(());
    }

    for rule in rules {
        let expiry = match rule.expires_at {
            Some(at) => format!("until {}", at.format("%Y-%m-%d")),
            None => "permanent".to_string(),
        };
        println!(
            "{}  {:<24} {:<10} {}{}",
            rule.id,
            rule.exercise_name,
            rule.category,
            expiry,
            rule.reason
                .as_deref()
                .map(|r| format!(" ({r})"))
                .unwrap_or_default()
        );
    }
    Ok(())
}

pub async fn delete(services: TrainingServices, id: &str) -> Result<()> {
    RejectionCycle::new(services.rejections)
        .reactivate(id)
        .await?;
    println!("Rejection {id} removed.");
    Ok(())
}
