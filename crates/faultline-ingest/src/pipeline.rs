//! Batched ingestion pipeline.
//!
//! Drives preprocessed incidents through embedding and storage in fixed-size
//! batches. Each batch is one commit unit: a failure rolls back that batch
//! only, and the run carries on (or halts) per the configured policy.
//! Records whose embedding calls fail are skipped with a warning; the run is
//! never aborted for them.

use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use faultline_core::{
    defaults, EmbeddingBackend, Error, IncidentBundle, IncidentStore, NewEmbedding, NewIncident,
    Result,
};

/// What to do when a batch fails to commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchFailurePolicy {
    /// Roll back the failed batch, log it, and continue with the next one.
    #[default]
    SkipAndContinue,
    /// Stop the run after the failed batch. Earlier commits are kept.
    Halt,
}

impl BatchFailurePolicy {
    /// Parse a policy name, tolerating case and common synonyms. Returns
    /// `None` for unknown names.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "skip" | "skip-and-continue" | "continue" => Some(BatchFailurePolicy::SkipAndContinue),
            "halt" | "stop" => Some(BatchFailurePolicy::Halt),
            _ => None,
        }
    }
}

impl std::fmt::Display for BatchFailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BatchFailurePolicy::SkipAndContinue => write!(f, "skip-and-continue"),
            BatchFailurePolicy::Halt => write!(f, "halt"),
        }
    }
}

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Records per commit unit.
    pub batch_size: usize,
    pub failure_policy: BatchFailurePolicy,
    /// Clear all existing incidents before ingesting. Full-refresh semantics;
    /// not safe against concurrent readers, run it in a maintenance window.
    pub replace_existing: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: defaults::BATCH_SIZE,
            failure_policy: BatchFailurePolicy::default(),
            replace_existing: false,
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `FAULTLINE_BATCH_SIZE` | `100` | Records per commit unit |
    /// | `FAULTLINE_ON_BATCH_FAILURE` | `skip` | `skip` or `halt` |
    pub fn from_env() -> Self {
        let batch_size = std::env::var("FAULTLINE_BATCH_SIZE")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(defaults::BATCH_SIZE)
            .max(1);

        let failure_policy = match std::env::var("FAULTLINE_ON_BATCH_FAILURE") {
            Ok(raw) => BatchFailurePolicy::from_str_loose(&raw).unwrap_or_else(|| {
                warn!(
                    subsystem = "ingest",
                    component = "pipeline",
                    "Unknown batch failure policy '{}', using skip-and-continue",
                    raw
                );
                BatchFailurePolicy::SkipAndContinue
            }),
            Err(_) => BatchFailurePolicy::SkipAndContinue,
        };

        Self {
            batch_size,
            failure_policy,
            replace_existing: false,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_failure_policy(mut self, policy: BatchFailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_replace_existing(mut self, replace: bool) -> Self {
        self.replace_existing = replace;
        self
    }
}

/// Outcome of one ingestion run.
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub run_id: Uuid,
    pub records_in: usize,
    pub records_inserted: usize,
    /// Records dropped by embedding failures or rolled-back batches.
    pub records_skipped: usize,
    pub embeddings_stored: usize,
    pub batches_committed: usize,
    pub batches_failed: usize,
    /// True when the halt policy stopped the run before the last batch.
    pub halted: bool,
    pub elapsed_ms: u64,
}

/// Batched embed-and-store pipeline over a store and an embedding backend.
pub struct IngestPipeline<S: ?Sized, E: ?Sized> {
    store: Arc<S>,
    embedder: Arc<E>,
    config: PipelineConfig,
}

impl<S, E> IngestPipeline<S, E>
where
    S: IncidentStore + ?Sized,
    E: EmbeddingBackend + ?Sized,
{
    pub fn new(store: Arc<S>, embedder: Arc<E>) -> Self {
        Self::with_config(store, embedder, PipelineConfig::default())
    }

    pub fn with_config(store: Arc<S>, embedder: Arc<E>, config: PipelineConfig) -> Self {
        Self {
            store,
            embedder,
            config,
        }
    }

    /// Run the pipeline over preprocessed incidents.
    #[instrument(skip(self, incidents), fields(
        subsystem = "ingest",
        component = "pipeline",
        op = "run",
        record_count = incidents.len()
    ))]
    pub async fn run(&self, incidents: Vec<NewIncident>) -> Result<IngestReport> {
        if self.config.batch_size == 0 {
            return Err(Error::InvalidArgument(
                "batch size must be positive".to_string(),
            ));
        }

        let run_id = Uuid::now_v7();
        let start = Instant::now();
        let mut report = IngestReport {
            run_id,
            records_in: incidents.len(),
            records_inserted: 0,
            records_skipped: 0,
            embeddings_stored: 0,
            batches_committed: 0,
            batches_failed: 0,
            halted: false,
            elapsed_ms: 0,
        };

        info!(
            run_id = %run_id,
            record_count = incidents.len(),
            batch_size = self.config.batch_size,
            policy = %self.config.failure_policy,
            "Starting ingestion run"
        );

        if self.config.replace_existing {
            info!(run_id = %run_id, "Clearing existing incidents for full refresh");
            self.store.replace_all().await?;
        }

        for (batch_index, batch) in incidents.chunks(self.config.batch_size).enumerate() {
            let mut bundles = Vec::with_capacity(batch.len());
            for incident in batch {
                match self.embed_incident(incident).await {
                    Ok(embeddings) => bundles.push(IncidentBundle {
                        incident: incident.clone(),
                        embeddings,
                    }),
                    Err(e) if matches!(e, Error::EmptyInput(_) | Error::Embedding(_)) => {
                        warn!(
                            run_id = %run_id,
                            incident_number = %incident.incident_number,
                            error = %e,
                            "Skipping record, embedding failed"
                        );
                        report.records_skipped += 1;
                    }
                    Err(e) => return Err(e),
                }
            }

            if bundles.is_empty() {
                continue;
            }

            match self.store.store_batch(&bundles).await {
                Ok(ids) => {
                    report.records_inserted += ids.len();
                    report.embeddings_stored +=
                        bundles.iter().map(|b| b.embeddings.len()).sum::<usize>();
                    report.batches_committed += 1;
                    info!(
                        run_id = %run_id,
                        batch_index,
                        record_count = ids.len(),
                        "Batch committed"
                    );
                }
                Err(e) => {
                    report.batches_failed += 1;
                    report.records_skipped += bundles.len();
                    match self.config.failure_policy {
                        BatchFailurePolicy::SkipAndContinue => {
                            warn!(
                                run_id = %run_id,
                                batch_index,
                                record_count = bundles.len(),
                                error = %e,
                                "Batch rolled back, continuing with next batch"
                            );
                        }
                        BatchFailurePolicy::Halt => {
                            warn!(
                                run_id = %run_id,
                                batch_index,
                                record_count = bundles.len(),
                                error = %e,
                                "Batch rolled back, halting run"
                            );
                            report.halted = true;
                            break;
                        }
                    }
                }
            }
        }

        report.elapsed_ms = start.elapsed().as_millis() as u64;
        info!(
            run_id = %run_id,
            record_count = report.records_inserted,
            skipped_count = report.records_skipped,
            batches_committed = report.batches_committed,
            batches_failed = report.batches_failed,
            duration_ms = report.elapsed_ms,
            "Ingestion run complete"
        );
        Ok(report)
    }

    /// Embed all payload variants of one incident, in one backend call.
    async fn embed_incident(&self, incident: &NewIncident) -> Result<Vec<NewEmbedding>> {
        let payloads = incident.embedding_texts();
        let texts: Vec<String> = payloads.iter().map(|(_, text)| text.clone()).collect();
        let vectors = self.embedder.embed_texts(&texts).await?;
        if vectors.len() != payloads.len() {
            return Err(Error::Embedding(format!(
                "expected {} vectors, got {}",
                payloads.len(),
                vectors.len()
            )));
        }
        Ok(payloads
            .into_iter()
            .zip(vectors)
            .map(|((content, text), vector)| NewEmbedding {
                content,
                text,
                vector,
            })
            .collect())
    }
}
