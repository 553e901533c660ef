//! `list`: stored records, optionally grouped the way the screens group them

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Args;
use colored::*;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::api::store::{Filter, ListFilter};
use crate::cli::context::AppContext;
use crate::cli::output::{OutputFormat, format_objects};
use crate::models::{EntityType, Record};
use crate::sync::status::{classify_property_status, classify_seller};

#[derive(Args)]
pub struct ListArgs {
    pub entity: EntityType,

    /// Only records whose status contains this text
    #[arg(long)]
    pub status: Option<String>,

    /// Include soft-deleted records
    #[arg(long)]
    pub include_deleted: bool,

    /// Group by seller category, listing badge or buyer status
    #[arg(long)]
    pub group: bool,

    #[arg(short, long)]
    pub limit: Option<usize>,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

fn summary_columns(entity: EntityType) -> &'static [&'static str] {
    match entity {
        EntityType::Seller => &[
            "seller_number",
            "name",
            "status",
            "inquiry_date",
            "next_call_date",
            "assignee",
        ],
        EntityType::Buyer => &[
            "buyer_number",
            "name",
            "latest_status",
            "reception_date",
            "desired_areas",
            "assignee",
        ],
        EntityType::Property => &[
            "property_number",
            "property_type",
            "address",
            "status",
            "status_category",
            "price",
            "sales_assignee",
        ],
    }
}

fn status_field(entity: EntityType) -> &'static str {
    match entity {
        EntityType::Buyer => "latest_status",
        _ => "status",
    }
}

/// Group heading for a record
fn group_label(record: &Record, today: NaiveDate) -> String {
    match record {
        Record::Seller(seller) => classify_seller(seller, today).label().to_string(),
        Record::Property(property) => classify_property_status(property.status.as_deref())
            .map(|badge| badge.label().to_string())
            .unwrap_or_else(|| "その他".to_string()),
        Record::Buyer(buyer) => buyer
            .latest_status
            .clone()
            .unwrap_or_else(|| "(未設定)".to_string()),
    }
}

fn group_records(records: &[Record], today: NaiveDate) -> BTreeMap<String, Vec<&Record>> {
    let mut groups: BTreeMap<String, Vec<&Record>> = BTreeMap::new();
    for record in records {
        groups.entry(group_label(record, today)).or_default().push(record);
    }
    groups
}

fn to_objects(records: &[&Record]) -> Result<Vec<Map<String, Value>>> {
    records
        .iter()
        .map(|record| record.to_json_map().context("Failed to serialize record"))
        .collect()
}

pub async fn handle_list_command(ctx: &AppContext, args: ListArgs) -> Result<()> {
    let mut filter = ListFilter::active()
        .include_deleted(args.include_deleted)
        .limit(args.limit);
    if let Some(status) = &args.status {
        filter = filter.with(Filter::contains(status_field(args.entity), status.as_str()));
    }

    let store = ctx.store()?;
    let records = store
        .list(args.entity, &filter)
        .await
        .with_context(|| format!("Failed to list {} records", args.entity))?;
    let columns = summary_columns(args.entity);

    if !args.group {
        let refs: Vec<&Record> = records.iter().collect();
        print!("{}", format_objects(&to_objects(&refs)?, columns, args.format)?);
        if args.format == OutputFormat::Table {
            let deleted = records.iter().filter(|r| !r.is_active()).count();
            if deleted > 0 {
                println!("{} {} record(s), {} deleted", records.len(), args.entity, deleted);
            } else {
                println!("{} {} record(s)", records.len(), args.entity);
            }
        }
        return Ok(());
    }

    let groups = group_records(&records, ctx.today());
    if args.format == OutputFormat::Json {
        let mut grouped = Map::new();
        for (label, members) in &groups {
            let objects = to_objects(members)?;
            grouped.insert(
                label.clone(),
                Value::Array(objects.into_iter().map(Value::Object).collect()),
            );
        }
        println!(
            "{}",
            serde_json::to_string_pretty(&grouped).context("Failed to format JSON output")?
        );
        return Ok(());
    }

    for (label, members) in &groups {
        println!("{} ({})", label.bold(), members.len());
        print!("{}", format_objects(&to_objects(members)?, columns, args.format)?);
        println!();
    }
    Ok(())
}
