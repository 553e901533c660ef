//! `sync one` / `sync all`

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::*;
use dialoguer::Confirm;
use is_terminal::IsTerminal;
use log::warn;
use tokio_util::sync::CancellationToken;

use crate::cli::context::AppContext;
use crate::models::EntityType;
use crate::sync::{RowReport, SyncOptions};

#[derive(Subcommand)]
pub enum SyncCommands {
    /// Sync a single record by business number
    One {
        entity: EntityType,
        business_number: String,
        /// Write even when the row is unchanged since the last sync
        #[arg(long)]
        force: bool,
    },
    /// Sync every row of a sheet
    All {
        entity: EntityType,
        #[arg(long)]
        force: bool,
        /// Rows processed concurrently
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=64))]
        parallel: Option<u32>,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

pub async fn handle_sync_command(ctx: &AppContext, command: SyncCommands) -> Result<()> {
    match command {
        SyncCommands::One {
            entity,
            business_number,
            force,
        } => sync_one(ctx, entity, &business_number, force).await,
        SyncCommands::All {
            entity,
            force,
            parallel,
            yes,
        } => sync_all(ctx, entity, force, parallel, yes).await,
    }
}

async fn sync_one(ctx: &AppContext, entity: EntityType, business_number: &str, force: bool) -> Result<()> {
    let options = SyncOptions {
        force,
        ..ctx.sync_options()
    };
    let service = ctx.sync_service(entity, options).await?;
    let report = service
        .sync_single(entity, business_number)
        .await
        .with_context(|| format!("Failed to sync {} {}", entity, business_number))?;
    print_row_report(&report, ctx.dry_run);
    Ok(())
}

async fn sync_all(
    ctx: &AppContext,
    entity: EntityType,
    force: bool,
    parallel: Option<u32>,
    yes: bool,
) -> Result<()> {
    if !yes && !ctx.dry_run {
        if !std::io::stdin().is_terminal() {
            anyhow::bail!("Refusing to sync all {} rows without a terminal; pass --yes", entity);
        }
        let proceed = Confirm::new()
            .with_prompt(format!("Sync every {} row into the store?", entity))
            .default(false)
            .interact()
            .context("Failed to read confirmation")?;
        if !proceed {
            println!("{}", "Cancelled".yellow());
            return Ok(());
        }
    }

    let mut options = SyncOptions {
        force,
        ..ctx.sync_options()
    };
    if let Some(parallel) = parallel {
        options.max_parallel_rows = parallel as usize;
    }
    let service = ctx.sync_service(entity, options).await?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    let signal_task = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted; finishing rows in flight");
            on_signal.cancel();
        }
    });

    let result = service.sync_all(entity, cancel).await;
    signal_task.abort();

    let report = result.with_context(|| format!("Failed to sync {} sheet", entity))?;
    report.print_summary();
    if report.cancelled {
        anyhow::bail!("Sync of {} interrupted before every row was processed", entity);
    }
    if report.has_failures() {
        warn!("Failed rows: {}", report.failed_business_numbers().join(", "));
    }
    report.into_result()?;
    Ok(())
}

fn print_row_report(report: &RowReport, dry_run: bool) {
    let outcome = report.outcome.to_string();
    println!(
        "{} (row {}): {}{}",
        report.business_number.bold(),
        report.row_number,
        outcome.green(),
        if dry_run { " (dry run)".dimmed().to_string() } else { String::new() }
    );
    for diagnostic in &report.diagnostics {
        println!(
            "  {} {}: {}",
            "!".yellow(),
            diagnostic.field,
            diagnostic.message
        );
    }
}
