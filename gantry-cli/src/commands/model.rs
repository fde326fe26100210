//! Model command handlers
//!
//! Lists models, shows version history and training runs, and triggers
//! manual rollbacks.

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::*;
use gantry_core::domain::artifact::ArtifactStatus;
use gantry_core::domain::run::RunOutcome;
use std::path::PathBuf;

use crate::config::Config;
use gantry_client::GantryClient;

/// Model subcommands
#[derive(Subcommand)]
pub enum ModelCommands {
    /// List catalogue models and their promoted versions
    List,
    /// Show the version history of a model
    Versions {
        /// Model name
        name: String,
    },
    /// Show the training runs of a model
    Runs {
        /// Model name
        name: String,
    },
    /// Restore the version promoted before the most recent cutover
    Rollback {
        /// Model name
        name: String,
    },
    /// Download the promoted artifact of a model
    Download {
        /// Model name
        name: String,

        /// Output file (defaults to <name>.bin)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Handle model commands
pub async fn handle_model_command(command: ModelCommands, config: &Config) -> Result<()> {
    let client = config.client()?;

    match command {
        ModelCommands::List => list_models(&client).await,
        ModelCommands::Versions { name } => list_versions(&client, &name).await,
        ModelCommands::Runs { name } => list_runs(&client, &name).await,
        ModelCommands::Rollback { name } => rollback(&client, &name).await,
        ModelCommands::Download { name, output } => download(&client, &name, output).await,
    }
}

async fn list_models(client: &GantryClient) -> Result<()> {
    let models = client.list_models().await?;

    println!("{}", format!("Found {} model(s):", models.len()).bold());
    println!();
    for model in models {
        println!(
            "  {} {} {}",
            "▸".cyan(),
            model.name.bold(),
            format!("[{}, {:?}]", model.category, model.score_direction).dimmed()
        );
        match model.promoted {
            Some(version) => {
                println!("    Promoted: {}", version.id.to_string().cyan());
                println!("    Score:    {}", version.score);
                println!(
                    "    Created:  {}",
                    version
                        .created_at
                        .format("%Y-%m-%d %H:%M:%S")
                        .to_string()
                        .dimmed()
                );
            }
            None => println!("    {}", "never promoted".yellow()),
        }
        println!();
    }

    Ok(())
}

async fn list_versions(client: &GantryClient, name: &str) -> Result<()> {
    let versions = client.list_versions(name).await?;

    if versions.is_empty() {
        println!("{}", format!("No versions of {} yet.", name).yellow());
        return Ok(());
    }

    println!("{}", format!("Versions of {}:", name).bold());
    for version in versions {
        println!(
            "  {} {} {:>12} {}",
            version
                .created_at
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
                .dimmed(),
            version.id.to_string().cyan(),
            version.score,
            colorize_status(version.status)
        );
    }

    Ok(())
}

async fn list_runs(client: &GantryClient, name: &str) -> Result<()> {
    let runs = client.list_runs(name).await?;

    if runs.is_empty() {
        println!("{}", format!("No training runs of {} yet.", name).yellow());
        return Ok(());
    }

    println!("{}", format!("Training runs of {}:", name).bold());
    for run in runs {
        let outcome = format!("{:?}", run.outcome);
        let outcome = match run.outcome {
            RunOutcome::Succeeded => outcome.green(),
            RunOutcome::Failed | RunOutcome::TimedOut => outcome.red(),
        };
        println!(
            "  {} {}s {} {}",
            run.started_at
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
                .dimmed(),
            (run.finished_at - run.started_at).num_seconds(),
            outcome,
            run.error_detail.unwrap_or_default().dimmed()
        );
    }

    Ok(())
}

async fn rollback(client: &GantryClient, name: &str) -> Result<()> {
    let restored = match client.rollback(name).await {
        Ok(version) => version,
        Err(e) if e.is_conflict() => {
            println!(
                "{}",
                format!("✗ {} has no previous version; nothing changed.", name)
                    .yellow()
                    .bold()
            );
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    println!("{}", "✓ Rollback complete!".green().bold());
    println!("  Model:   {}", name.bold());
    println!("  Version: {}", restored.id.to_string().cyan());
    println!("  Score:   {}", restored.score);

    Ok(())
}

async fn download(client: &GantryClient, name: &str, output: Option<PathBuf>) -> Result<()> {
    let bytes = client.download_artifact(name).await?;
    let path = output.unwrap_or_else(|| PathBuf::from(format!("{}.bin", name)));

    tokio::fs::write(&path, &bytes)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!(
        "{} {} ({} bytes)",
        "✓ Saved".green().bold(),
        path.display(),
        bytes.len()
    );

    Ok(())
}

fn colorize_status(status: ArtifactStatus) -> ColoredString {
    let status_str = status.to_string();
    match status {
        ArtifactStatus::Candidate => status_str.yellow(),
        ArtifactStatus::Promoted => status_str.green().bold(),
        ArtifactStatus::Superseded => status_str.dimmed(),
        ArtifactStatus::RolledBack => status_str.red(),
    }
}
