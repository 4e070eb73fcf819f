//! Core trait abstractions for faultline.
//!
//! These traits decouple the pipeline from concrete services: inference
//! backends (Ollama, OpenAI-compatible, mocks) and the Postgres store. The
//! ingestion pipeline and the answer engine are written against these seams
//! so tests can substitute deterministic fakes.

use async_trait::async_trait;
use pgvector::Vector;

use crate::error::Result;
use crate::models::{
    CategoryCount, IncidentBundle, IncidentRecord, NewEmbedding, NewIncident, SearchOptions,
    SearchResult, TierFilters, TierLevel,
};

// ============================================================================
// INFERENCE
// ============================================================================

/// Backend that turns text into fixed-dimension vectors.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    /// Embed a batch of texts, one vector per input, in input order.
    ///
    /// Fails with `Error::EmptyInput` when any text is blank: the remote
    /// models embed whitespace to garbage rather than rejecting it, so the
    /// contract is enforced here.
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vector>>;

    /// Dimension of the vectors this backend produces.
    fn dimension(&self) -> usize;

    /// Model identifier, for logging and diagnostics.
    fn model_name(&self) -> &str;
}

/// Backend that produces chat completions.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Generate a completion for a plain prompt.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Generate a completion with a system prompt steering the response.
    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String>;

    /// Model identifier, for logging and diagnostics.
    fn model_name(&self) -> &str;
}

/// A backend that can do both embedding and generation, plus liveness checks.
/// This is what the answer engine holds.
#[async_trait]
pub trait InferenceBackend: EmbeddingBackend + GenerationBackend {
    /// Probe the backend. `Ok(false)` means reachable-but-unhealthy;
    /// transport failures also map to `Ok(false)` so callers can treat the
    /// probe as a simple yes/no.
    async fn health_check(&self) -> Result<bool>;
}

// ============================================================================
// STORAGE
// ============================================================================

/// Persistence for incidents and their embeddings.
#[async_trait]
pub trait IncidentStore: Send + Sync {
    /// Store one incident with its embeddings atomically. Returns the new id.
    ///
    /// Fails with `Error::DuplicateKey` when the incident number exists.
    async fn store_incident(
        &self,
        incident: &NewIncident,
        embeddings: &[NewEmbedding],
    ) -> Result<i64>;

    /// Store a batch of incidents in one transaction. All-or-nothing: on any
    /// failure the whole batch rolls back. Returns ids in input order.
    async fn store_batch(&self, bundles: &[IncidentBundle]) -> Result<Vec<i64>>;

    /// Delete every incident and embedding. Used by full-refresh ingestion.
    async fn replace_all(&self) -> Result<()>;

    /// Look up an incident by its external number.
    async fn find_by_number(&self, incident_number: &str) -> Result<Option<IncidentRecord>>;

    /// List incidents whose tier column at `level` equals `value`, most
    /// recently opened first.
    async fn find_by_tier(
        &self,
        level: TierLevel,
        value: &str,
        limit: i64,
    ) -> Result<Vec<IncidentRecord>>;

    /// Total number of stored incidents.
    async fn count(&self) -> Result<i64>;

    /// Total number of stored embedding rows.
    async fn count_embeddings(&self) -> Result<i64>;

    /// Number of incidents in one resolution category (tier-2 label).
    async fn count_for_category(&self, category: &str) -> Result<i64>;

    /// Incident counts per category, most frequent first.
    async fn category_counts(&self) -> Result<Vec<CategoryCount>>;

    /// Most frequent category, or `None` when the store is empty. Ties break
    /// to the lexicographically smallest label.
    async fn mode_category(&self) -> Result<Option<String>>;

    /// Mean resolution time in hours for one category, or `None` when the
    /// category has no incidents.
    async fn mean_resolution_hours(&self, category: &str) -> Result<Option<f64>>;
}

/// Vector similarity search over stored embeddings.
#[async_trait]
pub trait SimilaritySearch: Send + Sync {
    /// Rank embeddings by cosine similarity to `query`, filtered per
    /// `options`. Results come back highest similarity first; exact ties
    /// resolve by insertion order.
    async fn find_similar(
        &self,
        query: &Vector,
        options: &SearchOptions,
    ) -> Result<Vec<SearchResult>>;

    /// Similarity search with conjunctive tier filters applied before
    /// ranking. With empty filters this is identical to [`find_similar`].
    ///
    /// [`find_similar`]: SimilaritySearch::find_similar
    async fn hybrid_search(
        &self,
        query: &Vector,
        filters: &TierFilters,
        options: &SearchOptions,
    ) -> Result<Vec<SearchResult>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FakeBackend {
        embed_calls: AtomicUsize,
    }

    #[async_trait]
    impl EmbeddingBackend for FakeBackend {
        async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vector>> {
            if texts.iter().any(|t| t.trim().is_empty()) {
                return Err(Error::EmptyInput("blank text".to_string()));
            }
            self.embed_calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts.iter().map(|_| Vector::from(vec![0.0; 4])).collect())
        }

        fn dimension(&self) -> usize {
            4
        }

        fn model_name(&self) -> &str {
            "fake-embed"
        }
    }

    #[async_trait]
    impl GenerationBackend for FakeBackend {
        async fn generate(&self, prompt: &str) -> Result<String> {
            Ok(format!("echo: {prompt}"))
        }

        async fn generate_with_system(&self, _system: &str, prompt: &str) -> Result<String> {
            self.generate(prompt).await
        }

        fn model_name(&self) -> &str {
            "fake-gen"
        }
    }

    #[async_trait]
    impl InferenceBackend for FakeBackend {
        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }
    }

    #[tokio::test]
    async fn test_embedding_backend_via_trait_object() {
        let backend: Arc<dyn InferenceBackend> = Arc::new(FakeBackend {
            embed_calls: AtomicUsize::new(0),
        });
        let vectors = backend
            .embed_texts(&["hello".to_string(), "world".to_string()])
            .await
            .unwrap();
        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0].as_slice().len(), 4);
        assert!(backend.health_check().await.unwrap());
    }

    #[tokio::test]
    async fn test_embedding_backend_rejects_blank_input() {
        let backend = FakeBackend {
            embed_calls: AtomicUsize::new(0),
        };
        let err = backend
            .embed_texts(&["  ".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::EmptyInput(_)));
        assert_eq!(backend.embed_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_generation_backend_with_system() {
        let backend = FakeBackend {
            embed_calls: AtomicUsize::new(0),
        };
        let out = backend
            .generate_with_system("be terse", "status?")
            .await
            .unwrap();
        assert_eq!(out, "echo: status?");
    }

    #[test]
    fn test_backend_model_names_disambiguate() {
        let backend = FakeBackend {
            embed_calls: AtomicUsize::new(0),
        };
        assert_eq!(EmbeddingBackend::model_name(&backend), "fake-embed");
        assert_eq!(GenerationBackend::model_name(&backend), "fake-gen");
    }
}
