use anyhow::Result;
use colored::*;

use crate::cli::context::AppContext;

pub fn handle_areas_command(ctx: &AppContext, address: &str) -> Result<()> {
    let zones = ctx.areas().calculate(address);
    if zones.is_empty() {
        println!("{}", "No distribution zone matches this address".yellow());
        return Ok(());
    }
    for zone in zones {
        println!("{}", zone);
    }
    Ok(())
}
