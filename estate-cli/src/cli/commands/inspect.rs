//! `inspect`: one record as the sheet, the mapper, the store and the sync
//! state each see it

use anyhow::{Context, Result};
use colored::*;
use serde::Serialize;

use super::sheet::row_object;
use crate::cli::context::AppContext;
use crate::cli::output::json_value_to_string;
use crate::config::repository::get_sync_state;
use crate::models::{EntityType, Record};
use crate::sync::status::classify_seller;

fn section(title: &str) {
    println!();
    println!("{}", title.bold().underline());
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("Failed to format JSON")?
    );
    Ok(())
}

pub async fn handle_inspect_command(
    ctx: &AppContext,
    entity: EntityType,
    business_number: &str,
) -> Result<()> {
    let service = ctx.sync_service(entity, ctx.sync_options()).await?;
    let row = service
        .find_row(entity, business_number)
        .await
        .with_context(|| format!("Failed to find {} {}", entity, business_number))?;

    println!(
        "{} {} (row {})",
        entity.to_string().cyan(),
        row.key().bold(),
        row.row_number
    );

    section("Sheet row");
    for (header, value) in row_object(&row) {
        if header != "row" {
            println!("  {}: {}", header.dimmed(), json_value_to_string(&value));
        }
    }

    section("Normalized");
    let mapped = service.mapper().map_row(entity, &row)?;
    print_json(&mapped.record)?;
    if mapped.is_clean() {
        println!("  {}", "all fields mapped".green());
    }
    for error in &mapped.field_errors {
        println!("  {} {}: {}", "x".red(), error.field, error.message);
    }
    for diagnostic in &mapped.diagnostics {
        println!("  {} {}: {}", "!".yellow(), diagnostic.field, diagnostic.message);
    }

    section("Store");
    let stored = service
        .store()
        .get(entity, row.key().as_str())
        .await
        .context("Failed to read the store")?;
    match &stored {
        Some(record) => print_json(record)?,
        None => println!("  {}", "not in the store".yellow()),
    }

    section("Sync state");
    match get_sync_state(service.state_pool(), entity, &row.key()).await? {
        Some(state) => {
            println!("  last written: {}", state.written_at);
            println!("  last synced:  {}", state.synced_at);
            let unchanged = mapped.record.to_json_map()? == state.payload;
            println!(
                "  sheet since last write: {}",
                if unchanged { "unchanged".green() } else { "changed".yellow() }
            );
        }
        None => println!("  {}", "never synced".yellow()),
    }

    if let Some(stored) = &stored {
        section("Sheet vs store");
        let merged = stored.merged_with(&mapped.record)?;
        let diffs = stored.diff_fields(&merged)?;
        if diffs.is_empty() {
            println!("  {}", "no differences".green());
        }
        for diff in diffs {
            println!(
                "  {}: {} -> {}",
                diff.field,
                json_value_to_string(&diff.left).red(),
                json_value_to_string(&diff.right).green()
            );
        }
    }

    if let Record::Seller(seller) = stored.as_ref().unwrap_or(&mapped.record) {
        section("Category");
        let category = classify_seller(seller, ctx.today());
        println!("  {} ({})", category.label(), category);
    }

    Ok(())
}
