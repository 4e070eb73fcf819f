//! Ollama inference backend.
//!
//! Talks to a local Ollama server over HTTP: `/api/embed` for embeddings and
//! `/api/chat` for completions. One backend instance carries both the
//! embedding model and the chat model, since the answer pipeline always needs
//! the pair.

use async_trait::async_trait;
use pgvector::Vector;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

use faultline_core::{
    defaults, EmbeddingBackend, Error, GenerationBackend, InferenceBackend, Result,
};

/// Default Ollama server URL.
pub const DEFAULT_OLLAMA_URL: &str = defaults::OLLAMA_URL;

/// Default embedding model.
pub const DEFAULT_EMBED_MODEL: &str = defaults::EMBED_MODEL;

/// Default generation model.
pub const DEFAULT_GEN_MODEL: &str = defaults::GEN_MODEL;

/// Ollama-backed implementation of the inference traits.
pub struct OllamaBackend {
    client: Client,
    base_url: String,
    embed_model: String,
    gen_model: String,
    dimension: usize,
    embed_timeout: Duration,
    gen_timeout: Duration,
}

impl OllamaBackend {
    /// Create a backend with default configuration.
    pub fn new() -> Self {
        Self::with_config(
            DEFAULT_OLLAMA_URL.to_string(),
            DEFAULT_EMBED_MODEL.to_string(),
            DEFAULT_GEN_MODEL.to_string(),
            defaults::EMBED_DIMENSION,
        )
    }

    /// Create a backend with custom configuration.
    ///
    /// Timeouts come from `FAULTLINE_EMBED_TIMEOUT_SECS` and
    /// `FAULTLINE_GEN_TIMEOUT_SECS` when set.
    pub fn with_config(
        base_url: String,
        embed_model: String,
        gen_model: String,
        dimension: usize,
    ) -> Self {
        let embed_timeout = std::env::var("FAULTLINE_EMBED_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults::EMBED_TIMEOUT_SECS);
        let gen_timeout = std::env::var("FAULTLINE_GEN_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults::GEN_TIMEOUT_SECS);

        info!(
            subsystem = "inference",
            component = "ollama",
            op = "init",
            "Initializing Ollama backend: url={}, embed={}, gen={}",
            base_url,
            embed_model,
            gen_model
        );

        let client = Client::builder()
            .timeout(Duration::from_secs(gen_timeout))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            embed_model,
            gen_model,
            dimension,
            embed_timeout: Duration::from_secs(embed_timeout),
            gen_timeout: Duration::from_secs(gen_timeout),
        }
    }

    /// Create a backend from environment variables, falling back to defaults.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `OLLAMA_URL` | `http://127.0.0.1:11434` |
    /// | `FAULTLINE_EMBED_MODEL` | `mxbai-embed-large` |
    /// | `FAULTLINE_GEN_MODEL` | `llama3` |
    /// | `FAULTLINE_EMBED_DIM` | `1024` |
    pub fn from_env() -> Self {
        let base_url =
            std::env::var("OLLAMA_URL").unwrap_or_else(|_| DEFAULT_OLLAMA_URL.to_string());
        let embed_model = std::env::var("FAULTLINE_EMBED_MODEL")
            .unwrap_or_else(|_| DEFAULT_EMBED_MODEL.to_string());
        let gen_model =
            std::env::var("FAULTLINE_GEN_MODEL").unwrap_or_else(|_| DEFAULT_GEN_MODEL.to_string());
        let dimension = std::env::var("FAULTLINE_EMBED_DIM")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(defaults::EMBED_DIMENSION);
        Self::with_config(base_url, embed_model, gen_model, dimension)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn generate_internal(&self, system: &str, prompt: &str) -> Result<String> {
        let mut messages = Vec::with_capacity(2);
        if !system.is_empty() {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: system.to_string(),
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: prompt.to_string(),
        });

        let request = ChatRequest {
            model: self.gen_model.clone(),
            messages,
            stream: false,
            think: false,
        };

        let start = Instant::now();
        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .timeout(self.gen_timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Chat(format!("Request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Chat(format!(
                "Ollama returned {status}: {body}"
            )));
        }

        let result: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::Chat(format!("Failed to parse response: {e}")))?;

        let elapsed = start.elapsed().as_millis() as u64;
        debug!(
            subsystem = "inference",
            component = "ollama",
            op = "generate",
            model = %self.gen_model,
            duration_ms = elapsed,
            response_len = result.message.content.len(),
            "Chat completion finished"
        );
        if elapsed > 30_000 {
            warn!(
                subsystem = "inference",
                component = "ollama",
                op = "generate",
                model = %self.gen_model,
                duration_ms = elapsed,
                slow = true,
                "Slow chat completion"
            );
        }

        Ok(result.message.content)
    }
}

impl Default for OllamaBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct EmbeddingRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    think: bool,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[async_trait]
impl EmbeddingBackend for OllamaBackend {
    #[instrument(skip(self, texts), fields(
        subsystem = "inference",
        component = "ollama",
        op = "embed",
        model = %self.embed_model,
        input_count = texts.len()
    ))]
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vector>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        if let Some(position) = texts.iter().position(|t| t.trim().is_empty()) {
            return Err(Error::EmptyInput(format!(
                "text at index {position} is empty"
            )));
        }

        let request = EmbeddingRequest {
            model: self.embed_model.clone(),
            input: texts.to_vec(),
        };

        let start = Instant::now();
        let response = self
            .client
            .post(format!("{}/api/embed", self.base_url))
            .timeout(self.embed_timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Embedding(format!("Request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Embedding(format!(
                "Ollama returned {status}: {body}"
            )));
        }

        let result: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| Error::Embedding(format!("Failed to parse response: {e}")))?;

        if result.embeddings.len() != texts.len() {
            return Err(Error::Embedding(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                result.embeddings.len()
            )));
        }

        let elapsed = start.elapsed().as_millis() as u64;
        debug!(
            subsystem = "inference",
            component = "ollama",
            op = "embed",
            model = %self.embed_model,
            input_count = texts.len(),
            duration_ms = elapsed,
            "Embedding batch finished"
        );
        if elapsed > 5_000 {
            warn!(
                subsystem = "inference",
                component = "ollama",
                op = "embed",
                model = %self.embed_model,
                duration_ms = elapsed,
                slow = true,
                "Slow embedding request"
            );
        }

        Ok(result.embeddings.into_iter().map(Vector::from).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.embed_model
    }
}

#[async_trait]
impl GenerationBackend for OllamaBackend {
    #[instrument(skip(self, prompt), fields(
        subsystem = "inference",
        component = "ollama",
        op = "generate",
        model = %self.gen_model,
        prompt_len = prompt.len()
    ))]
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.generate_internal("", prompt).await
    }

    #[instrument(skip(self, system, prompt), fields(
        subsystem = "inference",
        component = "ollama",
        op = "generate",
        model = %self.gen_model,
        prompt_len = prompt.len()
    ))]
    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String> {
        self.generate_internal(system, prompt).await
    }

    fn model_name(&self) -> &str {
        &self.gen_model
    }
}

#[async_trait]
impl InferenceBackend for OllamaBackend {
    async fn health_check(&self) -> Result<bool> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .timeout(Duration::from_secs(defaults::HEALTH_TIMEOUT_SECS))
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => {
                info!(
                    subsystem = "inference",
                    component = "ollama",
                    op = "health",
                    "Ollama server is healthy"
                );
                Ok(true)
            }
            Ok(resp) => {
                warn!(
                    subsystem = "inference",
                    component = "ollama",
                    op = "health",
                    status = %resp.status(),
                    "Ollama server responded unhealthy"
                );
                Ok(false)
            }
            Err(e) => {
                warn!(
                    subsystem = "inference",
                    component = "ollama",
                    op = "health",
                    error = %e,
                    "Ollama server unreachable"
                );
                Ok(false)
            }
        }
    }
}


#[cfg(all(test, feature = "integration"))]
mod integration_tests {
    //! Tests against a live Ollama server. Run with:
    //!
    //! ```bash
    //! cargo test -p faultline-inference --features integration
    //! ```

    use super::*;

    fn get_backend() -> OllamaBackend {
        OllamaBackend::from_env()
    }

    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        dot / (norm_a * norm_b)
    }

    #[tokio::test]
    async fn test_live_health_check() {
        let backend = get_backend();
        assert!(backend.health_check().await.unwrap());
    }

    #[tokio::test]
    async fn test_live_embedding_shape() {
        let backend = get_backend();
        let vectors = backend
            .embed_texts(&["VPN tunnel drops every hour".to_string()])
            .await
            .unwrap();
        assert_eq!(vectors.len(), 1);
        assert_eq!(vectors[0].as_slice().len(), backend.dimension());
    }

    #[tokio::test]
    async fn test_live_embedding_relatedness() {
        let backend = get_backend();
        let vectors = backend
            .embed_texts(&[
                "database connection pool exhausted".to_string(),
                "postgres connections are maxed out".to_string(),
                "printer is out of toner".to_string(),
            ])
            .await
            .unwrap();
        let related = cosine_similarity(vectors[0].as_slice(), vectors[1].as_slice());
        let unrelated = cosine_similarity(vectors[0].as_slice(), vectors[2].as_slice());
        assert!(related > unrelated);
    }

    #[tokio::test]
    async fn test_live_generation() {
        let backend = get_backend();
        let response = backend
            .generate_with_system("Answer with one word.", "What color is the sky?")
            .await
            .unwrap();
        assert!(!response.trim().is_empty());
    }
}
