use anyhow::Result;

use faultline_core::{EmbeddingBackend, GenerationBackend, InferenceBackend};

pub async fn run_health(backend: &dyn InferenceBackend) -> Result<()> {
    if backend.health_check().await? {
        println!(
            "Inference backend reachable (embed model {}, chat model {}).",
            EmbeddingBackend::model_name(backend),
            GenerationBackend::model_name(backend)
        );
        Ok(())
    } else {
        anyhow::bail!("Inference backend is not reachable")
    }
}
