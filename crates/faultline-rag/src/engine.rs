//! Query-time orchestration: embed the query, rank similar incidents,
//! aggregate category statistics, and synthesize the final answer.

use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument};

use faultline_core::{
    defaults, EmbeddingContent, Error, IncidentStore, InferenceBackend, Result, SearchOptions,
    SearchResult, SimilaritySearch, TierFilters,
};

use crate::context::{build_context, build_prompt, SYSTEM_PROMPT};
use crate::responder::{format_answer, synthesize};
use crate::stats::{resolve_category, CategoryStats};

/// Search and synthesis knobs for one query.
#[derive(Debug, Clone)]
pub struct AskOptions {
    /// Embedding variant to match against. The default restricts matches to
    /// description embeddings so one incident surfaces at most once; `None`
    /// searches every variant.
    pub content: Option<EmbeddingContent>,
    pub product: Option<String>,
    /// Tier filters. Any non-empty set routes the query through hybrid
    /// search.
    pub tiers: TierFilters,
    /// Similarity threshold override. Defaults per search mode when `None`.
    pub min_similarity: Option<f32>,
    pub limit: i64,
}

impl Default for AskOptions {
    fn default() -> Self {
        Self {
            content: Some(EmbeddingContent::Description),
            product: None,
            tiers: TierFilters::default(),
            min_similarity: None,
            limit: defaults::SEARCH_LIMIT,
        }
    }
}

impl AskOptions {
    fn to_search_options(&self) -> SearchOptions {
        let min_similarity = self.min_similarity.unwrap_or(if self.tiers.is_empty() {
            defaults::SIMILARITY_THRESHOLD
        } else {
            defaults::HYBRID_SIMILARITY_THRESHOLD
        });
        SearchOptions {
            content: self.content,
            product: self.product.clone(),
            min_similarity,
            limit: self.limit,
        }
    }
}

/// A fully synthesized answer plus the raw matches behind it.
#[derive(Debug, Clone, Serialize)]
pub struct EngineAnswer {
    /// Display-ready answer text, trailer included.
    pub answer: String,
    pub category: String,
    pub estimated_hours: Option<f64>,
    pub trending_percent: f64,
    /// True when the fallback template replaced the model completion.
    pub used_fallback: bool,
    /// Ranked matches, for diagnostics.
    pub results: Vec<SearchResult>,
}

/// The retrieval-and-synthesis engine. Generic over its three collaborators
/// so tests can run it against in-memory stubs and a mock backend.
pub struct RagEngine<S: ?Sized, V: ?Sized, B: ?Sized> {
    store: Arc<S>,
    search: Arc<V>,
    backend: Arc<B>,
}

impl<S, V, B> RagEngine<S, V, B>
where
    S: IncidentStore + ?Sized,
    V: SimilaritySearch + ?Sized,
    B: InferenceBackend + ?Sized,
{
    pub fn new(store: Arc<S>, search: Arc<V>, backend: Arc<B>) -> Self {
        Self {
            store,
            search,
            backend,
        }
    }

    /// Answer a free-text query.
    ///
    /// A failed embedding call is fatal, since without a query vector there
    /// is nothing to search. A failed chat call is not: the answer falls
    /// back to the deterministic template and the result still comes back
    /// `Ok`.
    #[instrument(skip(self, query, options), fields(
        subsystem = "rag",
        component = "engine",
        op = "answer"
    ))]
    pub async fn answer(&self, query: &str, options: &AskOptions) -> Result<EngineAnswer> {
        let start = Instant::now();
        let results = self.run_search(query, options).await?;

        let mode = self.store.mode_category().await?;
        let category = resolve_category(&results, mode.as_deref());
        let stats = self.category_stats(&category).await?;

        let context = build_context(&results, &category);
        let prompt = build_prompt(query, &context, &category);
        let synthesized =
            synthesize(self.backend.as_ref(), SYSTEM_PROMPT, &prompt, &category).await;
        let answer = format_answer(
            &synthesized.body,
            &category,
            stats.mean_resolution_hours,
            stats.trending_percent(),
        );

        info!(
            result_count = results.len(),
            category = %category,
            used_fallback = synthesized.used_fallback,
            duration_ms = start.elapsed().as_millis() as u64,
            "Query answered"
        );

        Ok(EngineAnswer {
            answer,
            category,
            estimated_hours: stats.mean_resolution_hours,
            trending_percent: stats.trending_percent(),
            used_fallback: synthesized.used_fallback,
            results,
        })
    }

    /// Embed the query and return the ranked matches without synthesis.
    #[instrument(skip(self, query, options), fields(
        subsystem = "rag",
        component = "engine",
        op = "search"
    ))]
    pub async fn search(&self, query: &str, options: &AskOptions) -> Result<Vec<SearchResult>> {
        self.run_search(query, options).await
    }

    async fn run_search(&self, query: &str, options: &AskOptions) -> Result<Vec<SearchResult>> {
        if query.trim().is_empty() {
            return Err(Error::EmptyInput("query text is empty".to_string()));
        }

        let vectors = self.backend.embed_texts(&[query.to_string()]).await?;
        let vector = vectors.into_iter().next().ok_or_else(|| {
            Error::Embedding("embedding service returned no vector for the query".to_string())
        })?;

        let search_options = options.to_search_options();
        if options.tiers.is_empty() {
            self.search.find_similar(&vector, &search_options).await
        } else {
            self.search
                .hybrid_search(&vector, &options.tiers, &search_options)
                .await
        }
    }

    async fn category_stats(&self, category: &str) -> Result<CategoryStats> {
        let total_records = self.store.count().await?;
        if total_records == 0 {
            return Ok(CategoryStats::default());
        }
        let category_records = self.store.count_for_category(category).await?;
        let mean_resolution_hours = self.store.mean_resolution_hours(category).await?;
        Ok(CategoryStats {
            total_records,
            category_records,
            mean_resolution_hours,
        })
    }
}
