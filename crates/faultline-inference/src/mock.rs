//! Deterministic in-process backend for tests and offline development.
//!
//! Embeddings are seeded from the input text, so equal texts always embed to
//! equal vectors and tests can assert on similarity orderings without a
//! model server. Every call is recorded for later inspection.

use async_trait::async_trait;
use pgvector::Vector;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex};

use faultline_core::{EmbeddingBackend, Error, GenerationBackend, InferenceBackend, Result};

/// A recorded call against the mock backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Embed { input_count: usize },
    Generate { prompt_len: usize, has_system: bool },
    HealthCheck,
}

#[derive(Debug, Clone)]
struct MockConfig {
    dimension: usize,
    embed_model: String,
    gen_model: String,
    fail_embeddings: bool,
    fail_generation: bool,
    healthy: bool,
    fixed_response: Option<String>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            dimension: 8,
            embed_model: "mock-embed".to_string(),
            gen_model: "mock-gen".to_string(),
            fail_embeddings: false,
            fail_generation: false,
            healthy: true,
            fixed_response: None,
        }
    }
}

/// Mock implementation of the inference traits.
#[derive(Clone)]
pub struct MockInferenceBackend {
    config: Arc<MockConfig>,
    calls: Arc<Mutex<Vec<MockCall>>>,
}

impl Default for MockInferenceBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockInferenceBackend {
    pub fn new() -> Self {
        Self {
            config: Arc::new(MockConfig::default()),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_dimension(mut self, dimension: usize) -> Self {
        Arc::make_mut(&mut self.config).dimension = dimension;
        self
    }

    /// Make every `generate` call return this exact text.
    pub fn with_fixed_response(mut self, response: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.config).fixed_response = Some(response.into());
        self
    }

    /// Make every embedding call fail.
    pub fn failing_embeddings(mut self) -> Self {
        Arc::make_mut(&mut self.config).fail_embeddings = true;
        self
    }

    /// Make every generation call fail.
    pub fn failing_generation(mut self) -> Self {
        Arc::make_mut(&mut self.config).fail_generation = true;
        self
    }

    /// Make health checks report unhealthy.
    pub fn unhealthy(mut self) -> Self {
        Arc::make_mut(&mut self.config).healthy = false;
        self
    }

    /// All calls recorded so far, in order.
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn embed_call_count(&self) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| matches!(c, MockCall::Embed { .. }))
            .count()
    }

    pub fn generate_call_count(&self) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| matches!(c, MockCall::Generate { .. }))
            .count()
    }

    fn record(&self, call: MockCall) {
        self.calls.lock().unwrap().push(call);
    }

    /// Unit-length vector derived from the text alone.
    fn vector_for(&self, text: &str) -> Vector {
        let seed = text
            .bytes()
            .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
        let mut rng = StdRng::seed_from_u64(seed);
        let mut values: Vec<f32> = (0..self.config.dimension)
            .map(|_| rng.gen_range(-1.0..1.0))
            .collect();

        let norm: f32 = values.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut values {
                *v /= norm;
            }
        }
        Vector::from(values)
    }
}

#[async_trait]
impl EmbeddingBackend for MockInferenceBackend {
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vector>> {
        self.record(MockCall::Embed {
            input_count: texts.len(),
        });

        if self.config.fail_embeddings {
            return Err(Error::Embedding("mock embedding failure".to_string()));
        }
        if texts.is_empty() {
            return Ok(vec![]);
        }
        if let Some(position) = texts.iter().position(|t| t.trim().is_empty()) {
            return Err(Error::EmptyInput(format!(
                "text at index {position} is empty"
            )));
        }

        Ok(texts.iter().map(|t| self.vector_for(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }

    fn model_name(&self) -> &str {
        &self.config.embed_model
    }
}

#[async_trait]
impl GenerationBackend for MockInferenceBackend {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.record(MockCall::Generate {
            prompt_len: prompt.len(),
            has_system: false,
        });
        self.complete(prompt)
    }

    async fn generate_with_system(&self, _system: &str, prompt: &str) -> Result<String> {
        self.record(MockCall::Generate {
            prompt_len: prompt.len(),
            has_system: true,
        });
        self.complete(prompt)
    }

    fn model_name(&self) -> &str {
        &self.config.gen_model
    }
}

impl MockInferenceBackend {
    fn complete(&self, prompt: &str) -> Result<String> {
        if self.config.fail_generation {
            return Err(Error::Chat("mock generation failure".to_string()));
        }
        if let Some(fixed) = &self.config.fixed_response {
            return Ok(fixed.clone());
        }
        Ok(format!(
            "Mock completion for a prompt of {} characters.",
            prompt.len()
        ))
    }
}

#[async_trait]
impl InferenceBackend for MockInferenceBackend {
    async fn health_check(&self) -> Result<bool> {
        self.record(MockCall::HealthCheck);
        Ok(self.config.healthy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        dot / (norm_a * norm_b)
    }

    #[tokio::test]
    async fn test_embeddings_are_deterministic() {
        let backend = MockInferenceBackend::new();
        let first = backend
            .embed_texts(&["database outage".to_string()])
            .await
            .unwrap();
        let second = backend
            .embed_texts(&["database outage".to_string()])
            .await
            .unwrap();
        assert_eq!(first[0].as_slice(), second[0].as_slice());
    }

    #[tokio::test]
    async fn test_distinct_texts_embed_differently() {
        let backend = MockInferenceBackend::new();
        let vectors = backend
            .embed_texts(&["alpha".to_string(), "omega".to_string()])
            .await
            .unwrap();
        let sim = cosine_similarity(vectors[0].as_slice(), vectors[1].as_slice());
        assert!(sim < 0.999, "distinct texts must not embed identically");
    }

    #[tokio::test]
    async fn test_embeddings_are_unit_length() {
        let backend = MockInferenceBackend::new().with_dimension(32);
        let vectors = backend
            .embed_texts(&["normalize me".to_string()])
            .await
            .unwrap();
        let norm: f32 = vectors[0].as_slice().iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
        assert_eq!(vectors[0].as_slice().len(), 32);
    }

    #[tokio::test]
    async fn test_embed_rejects_blank_text() {
        let backend = MockInferenceBackend::new();
        let err = backend
            .embed_texts(&["".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::EmptyInput(_)));
    }

    #[tokio::test]
    async fn test_failing_embeddings() {
        let backend = MockInferenceBackend::new().failing_embeddings();
        let err = backend
            .embed_texts(&["anything".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Embedding(_)));
    }

    #[tokio::test]
    async fn test_failing_generation() {
        let backend = MockInferenceBackend::new().failing_generation();
        let err = backend.generate("prompt").await.unwrap_err();
        assert!(matches!(err, Error::Chat(_)));
    }

    #[tokio::test]
    async fn test_fixed_response() {
        let backend = MockInferenceBackend::new().with_fixed_response("canned");
        assert_eq!(backend.generate("anything").await.unwrap(), "canned");
        assert_eq!(
            backend
                .generate_with_system("system", "anything")
                .await
                .unwrap(),
            "canned"
        );
    }

    #[tokio::test]
    async fn test_call_log() {
        let backend = MockInferenceBackend::new();
        backend
            .embed_texts(&["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        backend.generate_with_system("sys", "hello").await.unwrap();
        backend.health_check().await.unwrap();

        let calls = backend.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0], MockCall::Embed { input_count: 2 });
        assert_eq!(
            calls[1],
            MockCall::Generate {
                prompt_len: 5,
                has_system: true
            }
        );
        assert_eq!(calls[2], MockCall::HealthCheck);
        assert_eq!(backend.embed_call_count(), 1);
        assert_eq!(backend.generate_call_count(), 1);
    }

    #[tokio::test]
    async fn test_unhealthy() {
        let backend = MockInferenceBackend::new().unhealthy();
        assert!(!backend.health_check().await.unwrap());
    }
}
