//! OpenAI-compatible inference backend.
//!
//! Works against api.openai.com and against self-hosted gateways that speak
//! the same wire format (LiteLLM, vLLM, OpenRouter). Enabled with the
//! `openai` feature.

use async_trait::async_trait;
use pgvector::Vector;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

use faultline_core::{
    defaults, EmbeddingBackend, Error, GenerationBackend, InferenceBackend, Result,
};

/// Default API base URL.
pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";

/// Default embedding model.
pub const DEFAULT_OPENAI_EMBED_MODEL: &str = "text-embedding-3-small";

/// Default chat model.
pub const DEFAULT_OPENAI_GEN_MODEL: &str = "gpt-4o-mini";

/// Vector dimension of [`DEFAULT_OPENAI_EMBED_MODEL`].
pub const DEFAULT_OPENAI_EMBED_DIMENSION: usize = 1536;

/// Configuration for [`OpenAIBackend`].
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    /// API base, e.g. `https://api.openai.com/v1`.
    pub base_url: String,
    /// Bearer token. `None` for gateways that do their own auth.
    pub api_key: Option<String>,
    pub embed_model: String,
    pub gen_model: String,
    pub embed_dimension: usize,
    pub timeout_seconds: u64,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OPENAI_URL.to_string(),
            api_key: None,
            embed_model: DEFAULT_OPENAI_EMBED_MODEL.to_string(),
            gen_model: DEFAULT_OPENAI_GEN_MODEL.to_string(),
            embed_dimension: DEFAULT_OPENAI_EMBED_DIMENSION,
            timeout_seconds: defaults::GEN_TIMEOUT_SECS,
        }
    }
}

impl OpenAIConfig {
    /// Build configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `OPENAI_BASE_URL` | `https://api.openai.com/v1` |
    /// | `OPENAI_API_KEY` | unset |
    /// | `OPENAI_EMBED_MODEL` | `text-embedding-3-small` |
    /// | `OPENAI_GEN_MODEL` | `gpt-4o-mini` |
    /// | `OPENAI_EMBED_DIM` | `1536` |
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_OPENAI_URL.to_string()),
            api_key: std::env::var("OPENAI_API_KEY").ok(),
            embed_model: std::env::var("OPENAI_EMBED_MODEL")
                .unwrap_or_else(|_| DEFAULT_OPENAI_EMBED_MODEL.to_string()),
            gen_model: std::env::var("OPENAI_GEN_MODEL")
                .unwrap_or_else(|_| DEFAULT_OPENAI_GEN_MODEL.to_string()),
            embed_dimension: std::env::var("OPENAI_EMBED_DIM")
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(DEFAULT_OPENAI_EMBED_DIMENSION),
            timeout_seconds: std::env::var("FAULTLINE_GEN_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(defaults::GEN_TIMEOUT_SECS),
        }
    }
}

/// OpenAI-compatible implementation of the inference traits.
pub struct OpenAIBackend {
    client: Client,
    config: OpenAIConfig,
}

impl OpenAIBackend {
    pub fn new(config: OpenAIConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(OpenAIConfig::from_env())
    }

    fn build_request(&self, endpoint: &str) -> reqwest::RequestBuilder {
        let url = format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            endpoint
        );
        let mut request = self
            .client
            .post(url)
            .header("Content-Type", "application/json");
        if let Some(key) = &self.config.api_key {
            request = request.header("Authorization", format!("Bearer {key}"));
        }
        request
    }

    /// Pull a readable message out of an error response body, falling back
    /// to the raw text when the body is not the standard error envelope.
    async fn error_detail(response: reqwest::Response) -> String {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        match serde_json::from_str::<ErrorResponse>(&body) {
            Ok(parsed) => format!("{status}: {}", parsed.error.message),
            Err(_) => format!("{status}: {body}"),
        }
    }
}

#[derive(Serialize)]
struct EmbeddingRequest {
    model: String,
    input: Vec<String>,
    encoding_format: String,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ApiError,
}

#[derive(Deserialize)]
struct ApiError {
    message: String,
}

#[async_trait]
impl EmbeddingBackend for OpenAIBackend {
    #[instrument(skip(self, texts), fields(
        subsystem = "inference",
        component = "openai",
        op = "embed",
        model = %self.config.embed_model,
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
            model: self.config.embed_model.clone(),
            input: texts.to_vec(),
            encoding_format: "float".to_string(),
        };

        let start = Instant::now();
        let response = self
            .build_request("embeddings")
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Embedding(format!("Request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::Embedding(Self::error_detail(response).await));
        }

        let result: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| Error::Embedding(format!("Failed to parse response: {e}")))?;

        if result.data.len() != texts.len() {
            return Err(Error::Embedding(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                result.data.len()
            )));
        }

        // The API may return entries out of order; `index` is authoritative.
        let mut data = result.data;
        data.sort_by_key(|d| d.index);

        debug!(
            subsystem = "inference",
            component = "openai",
            op = "embed",
            input_count = texts.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Embedding batch finished"
        );

        Ok(data
            .into_iter()
            .map(|d| Vector::from(d.embedding))
            .collect())
    }

    fn dimension(&self) -> usize {
        self.config.embed_dimension
    }

    fn model_name(&self) -> &str {
        &self.config.embed_model
    }
}

#[async_trait]
impl GenerationBackend for OpenAIBackend {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.generate_with_system("", prompt).await
    }

    #[instrument(skip(self, system, prompt), fields(
        subsystem = "inference",
        component = "openai",
        op = "generate",
        model = %self.config.gen_model,
        prompt_len = prompt.len()
    ))]
    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String> {
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

        let request = ChatCompletionRequest {
            model: self.config.gen_model.clone(),
            messages,
            stream: false,
        };

        let start = Instant::now();
        let response = self
            .build_request("chat/completions")
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Chat(format!("Request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::Chat(Self::error_detail(response).await));
        }

        let result: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| Error::Chat(format!("Failed to parse response: {e}")))?;

        let content = result
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();

        debug!(
            subsystem = "inference",
            component = "openai",
            op = "generate",
            duration_ms = start.elapsed().as_millis() as u64,
            response_len = content.len(),
            "Chat completion finished"
        );

        Ok(content)
    }

    fn model_name(&self) -> &str {
        &self.config.gen_model
    }
}

#[async_trait]
impl InferenceBackend for OpenAIBackend {
    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/models", self.config.base_url.trim_end_matches('/'));
        let mut request = self
            .client
            .get(url)
            .timeout(Duration::from_secs(defaults::HEALTH_TIMEOUT_SECS));
        if let Some(key) = &self.config.api_key {
            request = request.header("Authorization", format!("Bearer {key}"));
        }

        match request.send().await {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(e) => {
                warn!(
                    subsystem = "inference",
                    component = "openai",
                    op = "health",
                    error = %e,
                    "OpenAI endpoint unreachable"
                );
                Ok(false)
            }
        }
    }
}
