//! Domain models for the incident knowledge base.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::defaults;
use crate::error::{Error, Result};

pub use pgvector::Vector;

// ============================================================================
// EMBEDDING CONTENT
// ============================================================================

/// Which slice of an incident an embedding was computed from.
///
/// Every incident gets a `Description` embedding. `Resolution` and `Combined`
/// are only produced when the incident has closing notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingContent {
    /// The incident description on its own.
    Description,
    /// Closing notes plus any populated resolution tiers.
    Resolution,
    /// Product, description, and closing notes in one payload.
    Combined,
}

impl EmbeddingContent {
    /// All variants, in generation order.
    pub const ALL: [EmbeddingContent; 3] = [
        EmbeddingContent::Description,
        EmbeddingContent::Resolution,
        EmbeddingContent::Combined,
    ];

    /// Tag stored in the `content_type` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            EmbeddingContent::Description => "description",
            EmbeddingContent::Resolution => "resolution",
            EmbeddingContent::Combined => "combined",
        }
    }

    /// Parse a tag, tolerating case. Returns `None` for unknown tags.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "description" => Some(EmbeddingContent::Description),
            "resolution" => Some(EmbeddingContent::Resolution),
            "combined" => Some(EmbeddingContent::Combined),
            _ => None,
        }
    }
}

impl std::fmt::Display for EmbeddingContent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// RESOLUTION TIERS
// ============================================================================

/// Validated resolution tier level. Keeps tier lookups to a closed set of
/// columns; the level never reaches SQL as caller-controlled text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierLevel {
    One,
    Two,
    Three,
}

impl TierLevel {
    /// Validate a numeric level from user input.
    pub fn from_level(level: i16) -> Result<Self> {
        match level {
            1 => Ok(TierLevel::One),
            2 => Ok(TierLevel::Two),
            3 => Ok(TierLevel::Three),
            other => Err(Error::InvalidArgument(format!(
                "tier level must be 1, 2, or 3, got {other}"
            ))),
        }
    }

    /// Column this tier maps to in the `incident` table.
    pub fn column(&self) -> &'static str {
        match self {
            TierLevel::One => "resolution_tier_1",
            TierLevel::Two => "resolution_tier_2",
            TierLevel::Three => "resolution_tier_3",
        }
    }

    pub fn as_i16(&self) -> i16 {
        match self {
            TierLevel::One => 1,
            TierLevel::Two => 2,
            TierLevel::Three => 3,
        }
    }
}

impl std::fmt::Display for TierLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_i16())
    }
}

// ============================================================================
// INCIDENTS
// ============================================================================

/// A preprocessed incident ready for persistence.
///
/// Free-text fields are already imputed (never empty), timestamps are already
/// defaulted, and `resolution_time_hours` is derived and clamped. Optional
/// fields stay `None` when the source had nothing usable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewIncident {
    /// Unique external identifier, e.g. `INC0012345`.
    pub incident_number: String,
    pub product: String,
    pub description: String,
    /// Resolution write-up. Present on resolved incidents.
    pub closing_notes: Option<String>,
    pub resolution_tier_1: Option<String>,
    pub resolution_tier_2: Option<String>,
    pub resolution_tier_3: Option<String>,
    /// Upstream problem record, when the incident was linked to one.
    pub problem_id: Option<String>,
    pub opened_at: DateTime<Utc>,
    pub resolved_at: DateTime<Utc>,
    /// Hours between opening and resolution, clamped to
    /// [`defaults::MIN_RESOLUTION_HOURS`].
    pub resolution_time_hours: f64,
}

impl NewIncident {
    /// Resolution category, i.e. the tier-2 label when populated.
    pub fn category(&self) -> Option<&str> {
        self.resolution_tier_2.as_deref().filter(|s| !s.is_empty())
    }

    /// Build the embedding payloads for this incident, in generation order.
    ///
    /// Always yields a `Description` payload. When closing notes exist it also
    /// yields `Resolution` (notes plus populated tiers) and `Combined`
    /// (product, description, notes), so a resolved incident is findable from
    /// three angles.
    pub fn embedding_texts(&self) -> Vec<(EmbeddingContent, String)> {
        let mut payloads = vec![(EmbeddingContent::Description, self.description.clone())];

        let closing = self
            .closing_notes
            .as_deref()
            .filter(|notes| !notes.is_empty());
        if let Some(notes) = closing {
            let mut resolution = format!("Resolution: {notes}");
            for (level, tier) in [
                (1, &self.resolution_tier_1),
                (2, &self.resolution_tier_2),
                (3, &self.resolution_tier_3),
            ] {
                if let Some(value) = tier.as_deref().filter(|v| !v.is_empty()) {
                    resolution.push_str(&format!(" | Tier {level}: {value}"));
                }
            }
            payloads.push((EmbeddingContent::Resolution, resolution));

            payloads.push((
                EmbeddingContent::Combined,
                format!(
                    "Product: {} | Description: {} | Resolution: {notes}",
                    self.product, self.description
                ),
            ));
        }

        payloads
    }
}

/// A stored incident row.
#[derive(Debug, Clone, Serialize)]
pub struct IncidentRecord {
    pub id: i64,
    pub incident_number: String,
    pub product: String,
    pub description: String,
    pub closing_notes: Option<String>,
    pub resolution_tier_1: Option<String>,
    pub resolution_tier_2: Option<String>,
    pub resolution_tier_3: Option<String>,
    pub problem_id: Option<String>,
    pub opened_at: DateTime<Utc>,
    pub resolved_at: DateTime<Utc>,
    pub resolution_time_hours: f64,
    pub created_at: DateTime<Utc>,
}

/// An embedding payload awaiting insertion.
#[derive(Debug, Clone)]
pub struct NewEmbedding {
    pub content: EmbeddingContent,
    /// Exact text the vector was computed from, stored for display.
    pub text: String,
    pub vector: Vector,
}

/// One incident plus its embedding payloads, the unit of batched storage.
#[derive(Debug, Clone)]
pub struct IncidentBundle {
    pub incident: NewIncident,
    pub embeddings: Vec<NewEmbedding>,
}

// ============================================================================
// SEARCH
// ============================================================================

/// One ranked similarity match, joined with its incident.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub incident_id: i64,
    pub incident_number: String,
    pub product: String,
    pub content: EmbeddingContent,
    /// The stored text the query matched against.
    pub matched_text: String,
    /// The incident's description, regardless of which variant matched.
    pub description: String,
    pub closing_notes: Option<String>,
    pub resolution_tier_1: Option<String>,
    pub resolution_tier_2: Option<String>,
    pub resolution_tier_3: Option<String>,
    pub resolution_time_hours: f64,
    /// Cosine similarity in `[-1, 1]`, higher is closer.
    pub similarity: f32,
}

impl SearchResult {
    /// Resolution category of the matched incident, when recorded.
    pub fn category(&self) -> Option<&str> {
        self.resolution_tier_2.as_deref().filter(|s| !s.is_empty())
    }
}

/// Knobs for a similarity search.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Restrict matches to one embedding variant. `None` searches all.
    pub content: Option<EmbeddingContent>,
    /// Restrict matches to one product.
    pub product: Option<String>,
    /// Minimum cosine similarity for a row to qualify.
    pub min_similarity: f32,
    pub limit: i64,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            content: Some(EmbeddingContent::Description),
            product: None,
            min_similarity: defaults::SIMILARITY_THRESHOLD,
            limit: defaults::SEARCH_LIMIT,
        }
    }
}

impl SearchOptions {
    /// Defaults tuned for hybrid (tier-filtered) search: all embedding
    /// variants, relaxed threshold.
    pub fn for_hybrid() -> Self {
        Self {
            content: None,
            product: None,
            min_similarity: defaults::HYBRID_SIMILARITY_THRESHOLD,
            limit: defaults::SEARCH_LIMIT,
        }
    }

    pub fn with_content(mut self, content: Option<EmbeddingContent>) -> Self {
        self.content = content;
        self
    }

    pub fn with_product(mut self, product: Option<String>) -> Self {
        self.product = product;
        self
    }

    pub fn with_min_similarity(mut self, min_similarity: f32) -> Self {
        self.min_similarity = min_similarity;
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }
}

/// Conjunctive equality filters over the resolution tier columns. Any subset
/// may be set; an empty filter set degrades hybrid search to plain search.
#[derive(Debug, Clone, Default)]
pub struct TierFilters {
    pub tier_1: Option<String>,
    pub tier_2: Option<String>,
    pub tier_3: Option<String>,
}

impl TierFilters {
    pub fn is_empty(&self) -> bool {
        self.tier_1.is_none() && self.tier_2.is_none() && self.tier_3.is_none()
    }

    pub fn with_tier_1(mut self, value: Option<String>) -> Self {
        self.tier_1 = value;
        self
    }

    pub fn with_tier_2(mut self, value: Option<String>) -> Self {
        self.tier_2 = value;
        self
    }

    pub fn with_tier_3(mut self, value: Option<String>) -> Self {
        self.tier_3 = value;
        self
    }
}

// ============================================================================
// AGGREGATES
// ============================================================================

/// Count of incidents per resolution category.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: i64,
}
