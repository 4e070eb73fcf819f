//! Aggregate statistics over the historical incident dataset.

use serde::Serialize;

use faultline_core::{defaults, SearchResult};

/// Dataset-wide statistics for one resolved category.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CategoryStats {
    /// Total incidents in the store.
    pub total_records: i64,
    /// Incidents whose category matches the resolved one.
    pub category_records: i64,
    /// Mean resolution time over the category, `None` when it has no
    /// incidents.
    pub mean_resolution_hours: Option<f64>,
}

impl CategoryStats {
    /// Share of all incidents that fall in this category, as a percentage.
    /// An empty dataset yields 0.
    pub fn trending_percent(&self) -> f64 {
        if self.total_records == 0 {
            return 0.0;
        }
        self.category_records as f64 / self.total_records as f64 * 100.0
    }
}

/// Resolve the category to report for a query.
///
/// The top search hit wins when it carries a non-empty tier-2 label.
/// Otherwise the dataset-wide mode applies, and an empty dataset falls
/// through to the text placeholder.
pub fn resolve_category(results: &[SearchResult], mode_category: Option<&str>) -> String {
    results
        .first()
        .and_then(|top| top.category())
        .or(mode_category)
        .filter(|c| !c.trim().is_empty())
        .unwrap_or(defaults::TEXT_PLACEHOLDER)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use faultline_core::EmbeddingContent;

    fn result(tier_2: Option<&str>, similarity: f32) -> SearchResult {
        SearchResult {
            incident_id: 7,
            incident_number: "INC0000007".to_string(),
            product: "Payments".to_string(),
            content: EmbeddingContent::Description,
            matched_text: "Checkout times out under load".to_string(),
            description: "Checkout times out under load".to_string(),
            closing_notes: None,
            resolution_tier_1: None,
            resolution_tier_2: tier_2.map(str::to_string),
            resolution_tier_3: None,
            resolution_time_hours: 4.0,
            similarity,
        }
    }

    #[test]
    fn test_trending_percent() {
        let stats = CategoryStats {
            total_records: 3,
            category_records: 1,
            mean_resolution_hours: Some(5.0),
        };
        assert!((stats.trending_percent() - 33.333333).abs() < 1e-4);
        assert_eq!(format!("{:.2}", stats.trending_percent()), "33.33");
    }

    #[test]
    fn test_trending_percent_empty_dataset() {
        let stats = CategoryStats::default();
        assert_eq!(stats.trending_percent(), 0.0);
    }

    #[test]
    fn test_category_from_top_hit() {
        let results = vec![
            result(Some("Backend"), 0.81),
            result(Some("Frontend"), 0.74),
        ];
        assert_eq!(resolve_category(&results, Some("Frontend")), "Backend");
    }

    #[test]
    fn test_category_falls_back_to_mode() {
        let missing = vec![result(None, 0.81)];
        assert_eq!(resolve_category(&missing, Some("Network")), "Network");

        let blank = vec![result(Some(""), 0.81)];
        assert_eq!(resolve_category(&blank, Some("Network")), "Network");

        assert_eq!(resolve_category(&[], Some("Network")), "Network");
    }

    #[test]
    fn test_category_placeholder_when_nothing_known() {
        assert_eq!(resolve_category(&[], None), "Unknown");
        assert_eq!(resolve_category(&[], Some("  ")), "Unknown");
    }
}
