//! Default configuration values for faultline.
//!
//! Single source of truth for tunables shared across crates. Environment
//! variables override these at the point of use; nothing here reads the
//! environment.

// ============================================================================
// INGESTION
// ============================================================================

/// Number of records committed per transaction during bulk ingestion.
pub const BATCH_SIZE: usize = 100;

/// Placeholder written into free-text fields that arrive empty.
pub const TEXT_PLACEHOLDER: &str = "Unknown";

/// Floor for derived resolution durations, in hours. Records with missing or
/// reversed timestamps clamp to this instead of going to zero or negative.
pub const MIN_RESOLUTION_HOURS: f64 = 0.1;

// ============================================================================
// EMBEDDING
// ============================================================================

/// Default embedding model served by Ollama.
pub const EMBED_MODEL: &str = "mxbai-embed-large";

/// Vector dimension produced by [`EMBED_MODEL`]. The embedding column is
/// created with this width, so changing it requires re-ingesting.
pub const EMBED_DIMENSION: usize = 1024;

// ============================================================================
// SEARCH
// ============================================================================

/// Minimum cosine similarity for a match in plain similarity search.
pub const SIMILARITY_THRESHOLD: f32 = 0.7;

/// Minimum cosine similarity when tier filters are active. Lower than the
/// plain threshold: the filters already constrain the candidate set.
pub const HYBRID_SIMILARITY_THRESHOLD: f32 = 0.6;

/// Maximum results returned by a similarity search.
pub const SEARCH_LIMIT: i64 = 10;

/// Maximum incidents returned by a tier lookup.
pub const TIER_LOOKUP_LIMIT: i64 = 10;

// ============================================================================
// INFERENCE
// ============================================================================

/// Default Ollama endpoint.
pub const OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Default chat model for answer synthesis.
pub const GEN_MODEL: &str = "llama3";

/// Request timeout for embedding calls, in seconds.
pub const EMBED_TIMEOUT_SECS: u64 = 30;

/// Request timeout for chat completion calls, in seconds. Generation is much
/// slower than embedding, especially on CPU-only hosts.
pub const GEN_TIMEOUT_SECS: u64 = 120;

/// Timeout for backend health probes, in seconds.
pub const HEALTH_TIMEOUT_SECS: u64 = 5;
