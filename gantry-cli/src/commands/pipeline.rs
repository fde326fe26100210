//! Pipeline command handlers
//!
//! Runs and cancels pipeline runs and queries the notification log. All
//! progress shown here is rendered from notification events.

use anyhow::Result;
use clap::Subcommand;
use colored::*;
use gantry_core::domain::notification::{NotificationEvent, Severity};
use gantry_core::domain::report::PipelineReport;
use gantry_core::dto::notification::NotificationQuery;
use uuid::Uuid;

use crate::config::Config;
use gantry_client::GantryClient;

/// Pipeline subcommands
#[derive(Subcommand)]
pub enum PipelineCommands {
    /// Run the pipeline and wait for its report
    Run {
        /// Only train these models (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        models: Vec<String>,

        /// Print the raw JSON report
        #[arg(long)]
        json: bool,
    },
    /// Cancel every active pipeline run
    Cancel,
    /// Show the notification log
    Notifications {
        /// Only events of this severity (success, warning, error)
        #[arg(short, long)]
        severity: Option<Severity>,

        /// Only events of this model
        #[arg(short, long)]
        model: Option<String>,

        /// Only events of this pipeline run
        #[arg(short, long)]
        run: Option<Uuid>,

        /// Maximum number of events
        #[arg(short, long)]
        limit: Option<i64>,
    },
}

/// Handle pipeline commands
pub async fn handle_pipeline_command(command: PipelineCommands, config: &Config) -> Result<()> {
    let client = config.client()?;

    match command {
        PipelineCommands::Run { models, json } => run_pipeline(&client, models, json).await,
        PipelineCommands::Cancel => cancel_pipeline(&client).await,
        PipelineCommands::Notifications {
            severity,
            model,
            run,
            limit,
        } => {
            let query = NotificationQuery {
                severity,
                model,
                run_id: run,
                limit,
            };
            list_notifications(&client, &query).await
        }
    }
}

/// Run the pipeline
async fn run_pipeline(client: &GantryClient, models: Vec<String>, json: bool) -> Result<()> {
    let subset = if models.is_empty() { None } else { Some(models) };

    if !json {
        println!("{}", "Running pipeline...".bold());
    }

    let report = client.run_pipeline(subset).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(())
}

/// Cancel active runs
async fn cancel_pipeline(client: &GantryClient) -> Result<()> {
    let response = client.cancel_pipeline().await?;

    if response.cancelled_runs.is_empty() {
        println!("{}", "No active pipeline runs.".yellow());
    } else {
        for run_id in response.cancelled_runs {
            println!(
                "{} {}",
                "✓ Cancelled run".green().bold(),
                run_id.to_string().cyan()
            );
        }
    }

    Ok(())
}

/// List notifications
async fn list_notifications(client: &GantryClient, query: &NotificationQuery) -> Result<()> {
    let events = client.list_notifications(query).await?;

    if events.is_empty() {
        println!("{}", "No notifications found.".yellow());
    } else {
        println!(
            "{}",
            format!("Found {} notification(s):", events.len()).bold()
        );
        println!();
        for event in &events {
            print_notification(event);
        }
    }

    Ok(())
}

/// Print a pipeline report
fn print_report(report: &PipelineReport) {
    let headline = format!(
        "{} of {} models succeeded",
        report.succeeded, report.total_models
    );
    if report.failed == 0 {
        println!("{}", format!("✓ {}", headline).green().bold());
    } else {
        println!("{}", format!("✗ {}", headline).yellow().bold());
    }

    println!("  Run:      {}", report.run_id.to_string().cyan());
    println!(
        "  Dataset:  {} {}",
        report.dataset.location,
        format!("({} bytes)", report.dataset.size_bytes).dimmed()
    );
    println!(
        "  Duration: {}s",
        (report.finished_at - report.started_at).num_seconds()
    );

    println!("\n{}", "By category:".bold());
    for (category, counts) in &report.by_category {
        let failed = if counts.failed > 0 {
            counts.failed.to_string().red()
        } else {
            counts.failed.to_string().dimmed()
        };
        println!(
            "  {:<14} {} ok  {} failed",
            category.to_string(),
            counts.success.to_string().green(),
            failed
        );
    }

    if !report.notifications.is_empty() {
        println!("\n{}", "Notifications:".bold());
        for event in &report.notifications {
            print_notification(event);
        }
    }
}

/// Print one notification event
fn print_notification(event: &NotificationEvent) {
    println!(
        "  {} {} {} {}",
        event
            .timestamp
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
            .dimmed(),
        colorize_severity(event.severity),
        event.model_name.bold(),
        event.message
    );
}

fn colorize_severity(severity: Severity) -> ColoredString {
    let label = format!("{:<7}", severity.to_string());
    match severity {
        Severity::Success => label.green(),
        Severity::Warning => label.yellow(),
        Severity::Error => label.red(),
    }
}
