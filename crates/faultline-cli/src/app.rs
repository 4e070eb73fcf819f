//! Shared wiring for command handlers.

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use faultline_core::{EmbeddingBackend, InferenceBackend};
use faultline_db::{create_pool, PgIncidentStore, PgSimilaritySearch};
use faultline_inference::OllamaBackend;

/// Connected collaborators every database-backed command needs.
pub struct AppContext {
    pub store: Arc<PgIncidentStore>,
    pub search: Arc<PgSimilaritySearch>,
    pub backend: Arc<dyn InferenceBackend>,
}

impl AppContext {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = create_pool(database_url).await?;
        let store = Arc::new(PgIncidentStore::new(pool.clone()));
        let search = Arc::new(PgSimilaritySearch::new(pool));
        let backend = make_backend()?;
        Ok(Self {
            store,
            search,
            backend,
        })
    }
}

/// Select the inference backend from `FAULTLINE_BACKEND` (default `ollama`).
pub fn make_backend() -> Result<Arc<dyn InferenceBackend>> {
    let choice = std::env::var("FAULTLINE_BACKEND").unwrap_or_else(|_| "ollama".to_string());
    let backend: Arc<dyn InferenceBackend> = match choice.as_str() {
        "ollama" => Arc::new(OllamaBackend::from_env()),
        #[cfg(feature = "openai")]
        "openai" => Arc::new(faultline_inference::OpenAIBackend::from_env()?),
        other => anyhow::bail!("Unknown inference backend '{other}' in FAULTLINE_BACKEND"),
    };
    info!(
        backend = %choice,
        model = EmbeddingBackend::model_name(backend.as_ref()),
        "Inference backend initialized"
    );
    Ok(backend)
}
