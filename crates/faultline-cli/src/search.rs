use anyhow::Result;

use faultline_core::SearchResult;
use faultline_rag::{AskOptions, RagEngine};

use crate::app::AppContext;

pub async fn run_search(app: &AppContext, query: &str, options: &AskOptions) -> Result<()> {
    let engine = RagEngine::new(app.store.clone(), app.search.clone(), app.backend.clone());
    let results = engine.search(query, options).await?;

    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    print_results(&results);
    Ok(())
}

pub(crate) fn print_results(results: &[SearchResult]) {
    for (position, result) in results.iter().enumerate() {
        println!(
            "{}. [{:.3}] {} ({})",
            position + 1,
            result.similarity,
            result.incident_number,
            result.product
        );
        println!(
            "    matched {}: \"{}\"",
            result.content,
            snippet(&result.matched_text)
        );
        if let Some(category) = result.category() {
            println!("    category: {category}");
        }
        println!(
            "    resolution time: {:.2} hours",
            result.resolution_time_hours
        );
        println!();
    }
}

/// First line of the text, truncated for terminal display.
fn snippet(text: &str) -> String {
    const MAX_CHARS: usize = 120;
    let first_line = text.lines().next().unwrap_or_default();
    let mut out: String = first_line.chars().take(MAX_CHARS).collect();
    if first_line.chars().count() > MAX_CHARS || text.lines().count() > 1 {
        out.push_str("...");
    }
    out
}
