use anyhow::Result;

use faultline_core::IncidentStore;

use crate::app::AppContext;

pub async fn run_stats(app: &AppContext) -> Result<()> {
    let incidents = app.store.count().await?;
    let embeddings = app.store.count_embeddings().await?;
    let categories = app.store.category_counts().await?;

    println!("Incidents:  {incidents}");
    println!("Embeddings: {embeddings}");

    if !categories.is_empty() {
        println!();
        println!("Categories:");
        for entry in &categories {
            let percent = entry.count as f64 / incidents as f64 * 100.0;
            println!("  {:<32} {:>6}  {:>6.2}%", entry.category, entry.count, percent);
        }
    }

    Ok(())
}
