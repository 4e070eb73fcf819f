use anyhow::Result;

use faultline_core::{IncidentStore, TierLevel};

use crate::app::AppContext;

pub async fn run_tier(app: &AppContext, level: i16, value: &str, limit: i64) -> Result<()> {
    let level = TierLevel::from_level(level)?;
    let incidents = app.store.find_by_tier(level, value, limit).await?;

    if incidents.is_empty() {
        println!("No incidents with {} = '{value}'.", level.column());
        return Ok(());
    }

    for (position, incident) in incidents.iter().enumerate() {
        let tiers = [
            incident.resolution_tier_1.as_deref().unwrap_or("-"),
            incident.resolution_tier_2.as_deref().unwrap_or("-"),
            incident.resolution_tier_3.as_deref().unwrap_or("-"),
        ]
        .join(" / ");

        println!(
            "{}. {} ({}) opened {}",
            position + 1,
            incident.incident_number,
            incident.product,
            incident.opened_at.format("%Y-%m-%d")
        );
        println!("    description: {}", incident.description);
        println!("    tiers: {tiers}");
        println!(
            "    resolution time: {:.2} hours",
            incident.resolution_time_hours
        );
        println!();
    }

    Ok(())
}
