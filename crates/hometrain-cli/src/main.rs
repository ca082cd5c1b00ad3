use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hometrain_core::plan::{EquipmentType, PlanConstraints, TrainingType};
use hometrain_core::warmup::FitnessLevel;
use hometrain_infrastructure::ConfigService;
use std::path::PathBuf;

mod commands;
mod logging;

#[derive(Parser)]
#[command(name = "hometrain")]
#[command(about = "hometrain - guided home-training sessions", long_about = None)]
struct Cli {
    /// Configuration file (defaults to ~/.config/hometrain/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Use the in-memory store instead of the remote API
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an interactive training session
    Session {
        #[arg(long, default_value = "minimal")]
        equipment: EquipmentType,
        #[arg(long = "type", default_value = "functional")]
        training_type: TrainingType,
        /// Go straight to the exercises
        #[arg(long)]
        skip_warmup: bool,
        /// Fitness level used to scale the warm-up
        #[arg(long)]
        level: Option<FitnessLevel>,
    },
    /// Show the current plan and session progress
    Status,
    /// Manage rejected exercises
    Rejections {
        #[command(subcommand)]
        action: RejectionsAction,
    },
}

#[derive(Subcommand)]
enum RejectionsAction {
    /// List active rejections
    List {
        #[arg(long, default_value = "minimal")]
        equipment: EquipmentType,
        #[arg(long = "type", default_value = "functional")]
        training_type: TrainingType,
    },
    /// Delete a rejection so the exercise can appear again
    Delete { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_service = match &cli.config {
        Some(path) => ConfigService::with_path(path),
        None => ConfigService::new(),
    };
    let config = config_service
        .get_config()
        .context("Failed to load configuration")?;
    let _log_guard = logging::init(&config.logging)?;

    let services = commands::build_services(&config, cli.offline)?;

    match cli.command {
        Commands::Session {
            equipment,
            training_type,
            skip_warmup,
            level,
        } => {
            let options = commands::session::SessionOptions {
                constraints: PlanConstraints::new(equipment, training_type),
                skip_warmup: skip_warmup || config.session.skip_warmup,
                level: level.unwrap_or(config.session.level),
                auto_continue_warmup: config.session.auto_continue_warmup,
                snapshot_timeout: config.session.snapshot_timeout(),
            };
            commands::session::run(services, options).await?
        }
        Commands::Status => commands::status::show(services).await?,
        Commands::Rejections { action } => match action {
            RejectionsAction::List {
                equipment,
                training_type,
            } => {
                commands::rejections::list(services, PlanConstraints::new(equipment, training_type))
                    .await?
            }
            RejectionsAction::Delete { id } => commands::rejections::delete(services, &id).await?,
        },
    }

    Ok(())
}
