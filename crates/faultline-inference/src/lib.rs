//! # faultline-inference
//!
//! Inference backends for faultline: embedding generation and chat
//! completion behind the trait seams defined in `faultline-core`.
//!
//! | Feature | Backend |
//! |---------|---------|
//! | `ollama` (default) | Local Ollama server |
//! | `openai` | OpenAI-compatible HTTP APIs |
//! | `mock` | Deterministic in-process backend |

#[cfg(any(test, feature = "mock"))]
pub mod mock;
#[cfg(feature = "ollama")]
pub mod ollama;
#[cfg(feature = "openai")]
pub mod openai;

pub use faultline_core::{EmbeddingBackend, GenerationBackend, InferenceBackend};

#[cfg(any(test, feature = "mock"))]
pub use mock::MockInferenceBackend;
#[cfg(feature = "ollama")]
pub use ollama::OllamaBackend;
#[cfg(feature = "openai")]
pub use openai::{OpenAIBackend, OpenAIConfig};
