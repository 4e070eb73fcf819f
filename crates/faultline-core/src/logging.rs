//! Structured logging conventions for faultline.
//!
//! Field name constants keep `tracing` output greppable across crates. Use
//! these instead of ad-hoc strings so that one `rg 'op='` finds everything.
//!
//! # Log Level Contract
//!
//! | Level | Meaning | Examples |
//! |-------|---------|----------|
//! | ERROR | Operation failed, run cannot continue | schema init failed, query embed failed |
//! | WARN  | Degraded but continuing | batch rolled back, chat fallback used, slow request |
//! | INFO  | Run milestones | run started, batch committed, run complete |
//! | DEBUG | Per-operation detail | search timings, embed timings, pool metrics |
//! | TRACE | High-volume internals | per-record preprocessing decisions |

// ─── Correlation ───

/// Correlates every event of one ingestion run.
pub const RUN_ID: &str = "run_id";

/// Subsystem name: `ingest`, `db`, `inference`, `rag`.
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem: `pipeline`, `search`, `ollama`.
pub const COMPONENT: &str = "component";

/// Operation being performed.
pub const OPERATION: &str = "op";

// ─── Measurements ───

/// Elapsed wall-clock time in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of results returned.
pub const RESULT_COUNT: &str = "result_count";

/// Number of inputs submitted.
pub const INPUT_COUNT: &str = "input_count";

/// Number of records processed.
pub const RECORD_COUNT: &str = "record_count";

/// Number of records skipped.
pub const SKIPPED_COUNT: &str = "skipped_count";

/// Prompt length in characters.
pub const PROMPT_LEN: &str = "prompt_len";

/// Response length in characters.
pub const RESPONSE_LEN: &str = "response_len";

// ─── Domain ───

/// Incident number being processed.
pub const INCIDENT_NUMBER: &str = "incident_number";

/// Zero-based batch ordinal within a run.
pub const BATCH_INDEX: &str = "batch_index";

/// Resolved answer category.
pub const CATEGORY: &str = "category";

/// Model name in use.
pub const MODEL: &str = "model";

/// Database table touched.
pub const DB_TABLE: &str = "db_table";

/// Query text (truncate before logging).
pub const QUERY: &str = "query";

// ─── Pool ───

/// Current connection pool size.
pub const POOL_SIZE: &str = "pool_size";

/// Idle connections in the pool.
pub const POOL_IDLE: &str = "pool_idle";

// ─── Outcome ───

/// Whether the operation succeeded.
pub const SUCCESS: &str = "success";

/// Error message on failure.
pub const ERROR_MSG: &str = "error";

/// Marks an operation that exceeded its slow threshold.
pub const SLOW: &str = "slow";
