//! Prompt and context assembly for answer synthesis.
//!
//! Search results are rendered into a labeled plain-text context that the
//! chat model can quote from. The shape is stable so prompt changes do not
//! ripple through tests: one `Result N:` block per hit, in ranked order.

use faultline_core::{defaults, SearchResult};

/// Context line emitted when the search produced no hits. The prompt pairs
/// this with an instruction to give category-based guidance instead of
/// claiming ignorance.
pub const NO_RESULTS_CONTEXT: &str = "No relevant results found.";

/// System message for the synthesis call. Requests the two-part answer
/// shape that [`crate::responder::fallback_answer`] also follows, so the
/// caller sees the same structure whether or not the model was reachable.
pub const SYSTEM_PROMPT: &str = r#"You are an incident support assistant. Answer the query using the provided context of similar resolved incidents. Structure every answer in two parts: a "Response:" section giving a direct answer, then an "Actionable Steps:" section with numbered steps. Use direct information from the context when it is available. When specific details are missing, give general guidance based on the incident category without referencing incident numbers or similarity scores and without suggesting to explore other results. Only state that the context is irrelevant if it contains no results. Never answer with "I don't know" or "no exact match found"."#;

/// Render ranked search results into the context block for the prompt.
///
/// Hits without a recorded category are labeled with `fallback_category`
/// so the model always sees a usable label.
pub fn build_context(results: &[SearchResult], fallback_category: &str) -> String {
    let mut lines = vec!["Search Results:".to_string()];

    if results.is_empty() {
        lines.push(NO_RESULTS_CONTEXT.to_string());
    } else {
        for (position, result) in results.iter().enumerate() {
            let category = result.category().unwrap_or(fallback_category);
            let summary = result
                .closing_notes
                .as_deref()
                .filter(|notes| !notes.is_empty())
                .unwrap_or(defaults::TEXT_PLACEHOLDER);

            lines.push(format!("Result {}:", position + 1));
            lines.push(format!("  Incident: {}", result.incident_number));
            lines.push(format!("  Product: {}", result.product));
            lines.push(format!("  Description: {}", result.description));
            lines.push(format!("  Summary: {summary}"));
            lines.push(format!("  Category: {category}"));
            lines.push(format!(
                "  Resolution Time: {:.2} hours",
                result.resolution_time_hours
            ));
            lines.push(format!("  Similarity: {:.3}", result.similarity));
            lines.push(String::new());
        }
    }

    lines.join("\n")
}

/// Build the user message for the synthesis call.
pub fn build_prompt(query: &str, context: &str, category: &str) -> String {
    format!(
        r#"Based on the following context of similar past incidents, provide a concise and actionable response to the query: {query}

Context:
{context}

The most likely resolution category for this query is: {category}.
The context lists search results with incident number, product, description, resolution summary, category, resolution time, and similarity. Use the most relevant information to formulate a clear answer with actionable steps. If specific details are missing, provide general guidance based on the category."#
    )
}
