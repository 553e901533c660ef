use anyhow::{Context, Result};

use crate::cli::context::AppContext;
use crate::models::EntityType;

/// Print the health report; an unhealthy sheet exits non-zero so the check
/// can run from a scheduler
pub async fn handle_check_command(ctx: &AppContext, entity: EntityType) -> Result<()> {
    let service = ctx.sync_service(entity, ctx.sync_options()).await?;
    let report = service
        .check(entity)
        .await
        .with_context(|| format!("Health check of {} failed", entity))?;
    report.print();

    if !report.is_healthy() {
        anyhow::bail!("{} sheet and store are out of sync", entity);
    }
    Ok(())
}
