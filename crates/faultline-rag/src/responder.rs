//! Answer synthesis with a deterministic fallback.
//!
//! Chat failures never reach the caller as errors: a query must always
//! resolve to a displayable answer, so a failed or empty completion is
//! replaced by a category-based template instead of propagating.

use tracing::warn;

use faultline_core::GenerationBackend;

/// Synthesized answer body, before final formatting.
#[derive(Debug, Clone)]
pub struct SynthesizedAnswer {
    pub body: String,
    /// True when the fallback template replaced the model completion.
    pub used_fallback: bool,
}

/// Ask the chat backend for an answer, substituting the fallback template
/// on failure or on an empty completion.
pub async fn synthesize<B>(
    backend: &B,
    system: &str,
    prompt: &str,
    category: &str,
) -> SynthesizedAnswer
where
    B: GenerationBackend + ?Sized,
{
    match backend.generate_with_system(system, prompt).await {
        Ok(text) if !text.trim().is_empty() => SynthesizedAnswer {
            body: text.trim().to_string(),
            used_fallback: false,
        },
        Ok(_) => {
            warn!(
                subsystem = "rag",
                component = "responder",
                model = backend.model_name(),
                "Chat backend returned an empty completion, using fallback answer"
            );
            SynthesizedAnswer {
                body: fallback_answer(category),
                used_fallback: true,
            }
        }
        Err(e) => {
            warn!(
                subsystem = "rag",
                component = "responder",
                model = backend.model_name(),
                error = %e,
                "Chat backend failed, using fallback answer"
            );
            SynthesizedAnswer {
                body: fallback_answer(category),
                used_fallback: true,
            }
        }
    }
}

/// Deterministic two-part answer used when the chat backend is unavailable.
/// Mirrors the structure the system prompt requests from the model.
pub fn fallback_answer(category: &str) -> String {
    format!(
        r#"Response: An automated summary is not available right now. Based on historical incidents this issue most likely falls under the {category} category, and the steps below are a reasonable starting point.

Actionable Steps:
1. Review recent changes or deployments that could affect the {category} area.
2. Check service logs and monitoring dashboards for errors matching the reported symptoms.
3. Compare the report against resolved {category} incidents in the knowledge base.
4. If the issue persists, escalate to the team that owns the {category} queue with your findings so far."#
    )
}

/// Append the fixed trailer to a synthesized body: category, estimated
/// resolution time, and trending percentage, each on its own line, in that
/// order.
pub fn format_answer(
    body: &str,
    category: &str,
    mean_resolution_hours: Option<f64>,
    trending_percent: f64,
) -> String {
    let resolution_time = match mean_resolution_hours {
        Some(hours) => format!("{hours:.2} hours"),
        None => "Unknown".to_string(),
    };
    format!(
        "{body}\n\nResolution Category: {category}\nEstimated Resolution Time: {resolution_time}\nTrending Issue Percentage: {trending_percent:.2}%"
    )
}
