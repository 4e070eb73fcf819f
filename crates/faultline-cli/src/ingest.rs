use anyhow::Result;
use chrono::Utc;
use std::path::Path;

use faultline_ingest::{load_csv, preprocess, BatchFailurePolicy, IngestPipeline, PipelineConfig};

use crate::app::AppContext;

pub async fn run_ingest(
    app: &AppContext,
    csv: &Path,
    batch_size: Option<usize>,
    replace: bool,
    halt_on_batch_failure: bool,
) -> Result<()> {
    let rows = load_csv(csv)?;
    println!("Loaded {} rows from {}", rows.len(), csv.display());

    let incidents = preprocess(rows, Utc::now())?;
    println!("Preprocessed to {} records", incidents.len());

    let mut config = PipelineConfig::from_env().with_replace_existing(replace);
    if let Some(batch_size) = batch_size {
        config = config.with_batch_size(batch_size);
    }
    if halt_on_batch_failure {
        config = config.with_failure_policy(BatchFailurePolicy::Halt);
    }

    let pipeline = IngestPipeline::with_config(app.store.clone(), app.backend.clone(), config);
    let report = pipeline.run(incidents).await?;

    println!();
    println!("Ingestion run {}", report.run_id);
    println!("  records in:        {}", report.records_in);
    println!("  records inserted:  {}", report.records_inserted);
    println!("  records skipped:   {}", report.records_skipped);
    println!("  embeddings stored: {}", report.embeddings_stored);
    println!(
        "  batches committed: {} ({} failed)",
        report.batches_committed, report.batches_failed
    );
    if report.halted {
        println!("  run halted after a batch failure");
    }
    println!("  elapsed:           {} ms", report.elapsed_ms);

    Ok(())
}
