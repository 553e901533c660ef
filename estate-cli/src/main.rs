mod api;
mod cli;
mod config;
mod error;
mod models;
mod services;
mod sync;

use anyhow::{Context, Result};
use clap::Parser;
use is_terminal::IsTerminal;
use log::debug;

use cli::{AppContext, Cli};
use config::Config;

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_target(verbose > 0)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if cli.no_color || !std::io::stdout().is_terminal() {
        colored::control::set_override(false);
    }

    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    match &config.source {
        Some(path) => debug!("Configuration loaded from {}", path.display()),
        None => debug!("No config file; using defaults and environment"),
    }

    let ctx = AppContext::new(config, cli.workbook, cli.dry_run);
    cli::run(&ctx, cli.command).await
}
