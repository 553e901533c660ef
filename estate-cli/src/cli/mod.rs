//! Command-line interface

pub mod commands;
pub mod context;
pub mod output;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

pub use context::AppContext;

use commands::{
    ListArgs, SheetArgs, SyncCommands, handle_areas_command, handle_check_command,
    handle_inspect_command, handle_list_command, handle_sheet_command, handle_sync_command,
};
use crate::models::EntityType;

#[derive(Parser)]
#[command(name = "estate-sync")]
#[command(about = "Sync the back-office spreadsheets into the listing database")]
#[command(version)]
pub struct Cli {
    /// Config file (default: <config dir>/estate-sync/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Read sheets from a local .xlsx or .csv export instead of the API
    #[arg(long, global = true)]
    pub workbook: Option<PathBuf>,

    /// Log what would be written without writing it
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sync sheet rows into the store
    Sync {
        #[command(subcommand)]
        command: SyncCommands,
    },
    /// Show one record as the sheet, the mapper and the store see it
    Inspect {
        entity: EntityType,
        business_number: String,
    },
    /// Compare a sheet against the store without writing
    Check { entity: EntityType },
    /// Distribution zones for an address
    Areas { address: String },
    /// List stored records
    List(ListArgs),
    /// Show raw sheet rows
    Sheet(SheetArgs),
}

pub async fn run(ctx: &AppContext, command: Commands) -> Result<()> {
    match command {
        Commands::Sync { command } => handle_sync_command(ctx, command).await,
        Commands::Inspect {
            entity,
            business_number,
        } => handle_inspect_command(ctx, entity, &business_number).await,
        Commands::Check { entity } => handle_check_command(ctx, entity).await,
        Commands::Areas { address } => handle_areas_command(ctx, &address),
        Commands::List(args) => handle_list_command(ctx, args).await,
        Commands::Sheet(args) => handle_sheet_command(ctx, args).await,
    }
}
