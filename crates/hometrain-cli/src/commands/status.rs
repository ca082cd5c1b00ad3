use anyhow::Result;
use hometrain_application::{LifecycleState, SessionLifecycleController, TrainingServices};

pub async fn show(services: TrainingServices) -> Result<()> {
    let mut controller = SessionLifecycleController::new(services);
    let state = controller.restore().await?;

    let Some(plan) = controller.plan() else {
        if state == LifecycleState::Idle {
            println!("No plan yet. Start one with `hometrain session`.");
            return Ok(());
        }
        println!("State: {state}");
        return Ok(());
    };

    println!(
        "Plan {} ({} / {}), created {}",
        plan.id,
        plan.equipment,
        plan.training_type,
        plan.created_at.format("%Y-%m-%d %H:%M")
    );
    if let Some(message) = &plan.plan.message {
        println!("  {message}");
    }

    let progress = controller.progress().await;
    for (index, exercise) in controller.exercises().iter().enumerate() {
        let line = match progress.iter().find(|p| p.exercise_order == index) {
            Some(p) => format!(
                "{} {}/{}",
                p.status, p.series_completed, p.total_series
            ),
            None => "not started".to_string(),
        };
        println!("  {}. {:<28} {}", index + 1, exercise.name, line);
    }

    match controller.session() {
        Some(session) => println!(
            "Session {} is {} ({:.0}% done)",
            session.id,
            state,
            controller.completion_percentage().await
        ),
        None => println!("No active session."),
    }
    Ok(())
}
