//! Vector similarity search over incident embeddings.
//!
//! Ranking happens in Postgres: pgvector's `<=>` operator gives cosine
//! distance, and `1 - distance` is the similarity callers see. Filters are
//! conjunctive equality predicates appended before ranking, so the threshold
//! and `LIMIT` apply to the filtered candidate set.

use async_trait::async_trait;
use pgvector::Vector;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use std::time::Instant;
use tracing::{debug, instrument};

use faultline_core::{
    EmbeddingContent, Error, Result, SearchOptions, SearchResult, SimilaritySearch, TierFilters,
};

/// PostgreSQL implementation of [`SimilaritySearch`].
#[derive(Clone)]
pub struct PgSimilaritySearch {
    pool: PgPool,
}

impl PgSimilaritySearch {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn run_search(
        &self,
        query: &Vector,
        options: &SearchOptions,
        filters: Option<&TierFilters>,
    ) -> Result<Vec<SearchResult>> {
        let (sql, string_binds) = build_search_sql(options, filters);

        let mut q = sqlx::query(&sql)
            .bind(query)
            .bind(options.min_similarity as f64);
        for value in &string_binds {
            q = q.bind(value);
        }
        let rows = q.bind(options.limit).fetch_all(&self.pool).await?;

        rows.iter().map(result_from_row).collect()
    }
}

/// Build the ranked search statement.
///
/// `$1` is the query vector and `$2` the similarity threshold; returned
/// string binds follow in order, and the limit is always the final
/// parameter. With no filters the hybrid statement is byte-identical to the
/// plain one.
fn build_search_sql(
    options: &SearchOptions,
    filters: Option<&TierFilters>,
) -> (String, Vec<String>) {
    let mut sql = String::from(
        "SELECT e.id AS embedding_id, e.incident_id, e.content_type, e.content_text, \
         i.incident_number, i.product, i.description, i.closing_notes, \
         i.resolution_tier_1, i.resolution_tier_2, i.resolution_tier_3, \
         i.resolution_time_hours, \
         1 - (e.embedding <=> $1::vector) AS similarity \
         FROM incident_embedding e \
         JOIN incident i ON i.id = e.incident_id \
         WHERE 1 - (e.embedding <=> $1::vector) >= $2",
    );

    let mut binds: Vec<String> = Vec::new();
    let mut next_param = 3;

    let mut push_condition = |sql: &mut String, binds: &mut Vec<String>, column: &str, value: String| {
        sql.push_str(&format!(" AND {column} = ${next_param}"));
        binds.push(value);
        next_param += 1;
    };

    if let Some(content) = options.content {
        push_condition(
            &mut sql,
            &mut binds,
            "e.content_type",
            content.as_str().to_string(),
        );
    }
    if let Some(product) = &options.product {
        push_condition(&mut sql, &mut binds, "i.product", product.clone());
    }
    if let Some(filters) = filters {
        for (column, value) in [
            ("i.resolution_tier_1", &filters.tier_1),
            ("i.resolution_tier_2", &filters.tier_2),
            ("i.resolution_tier_3", &filters.tier_3),
        ] {
            if let Some(value) = value {
                push_condition(&mut sql, &mut binds, column, value.clone());
            }
        }
    }

    // Equal distances rank by embedding id, i.e. insertion order.
    sql.push_str(&format!(
        " ORDER BY e.embedding <=> $1::vector ASC, e.id ASC LIMIT ${next_param}"
    ));

    (sql, binds)
}

fn result_from_row(row: &PgRow) -> Result<SearchResult> {
    let content_tag: String = row.get("content_type");
    let content = EmbeddingContent::from_str_loose(&content_tag)
        .ok_or_else(|| Error::Data(format!("unknown content type in store: {content_tag}")))?;

    Ok(SearchResult {
        incident_id: row.get("incident_id"),
        incident_number: row.get("incident_number"),
        product: row.get("product"),
        content,
        matched_text: row.get("content_text"),
        description: row.get("description"),
        closing_notes: row.get("closing_notes"),
        resolution_tier_1: row.get("resolution_tier_1"),
        resolution_tier_2: row.get("resolution_tier_2"),
        resolution_tier_3: row.get("resolution_tier_3"),
        resolution_time_hours: row.get("resolution_time_hours"),
        similarity: row.get::<f64, _>("similarity") as f32,
    })
}

#[async_trait]
impl SimilaritySearch for PgSimilaritySearch {
    #[instrument(skip(self, query), fields(
        subsystem = "database",
        component = "search",
        op = "find_similar",
        min_similarity = options.min_similarity,
        limit = options.limit
    ))]
    async fn find_similar(
        &self,
        query: &Vector,
        options: &SearchOptions,
    ) -> Result<Vec<SearchResult>> {
        let start = Instant::now();
        let results = self.run_search(query, options, None).await?;

        debug!(
            subsystem = "database",
            component = "search",
            op = "find_similar",
            result_count = results.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Similarity search complete"
        );
        Ok(results)
    }

    #[instrument(skip(self, query, filters), fields(
        subsystem = "database",
        component = "search",
        op = "hybrid_search",
        min_similarity = options.min_similarity,
        limit = options.limit
    ))]
    async fn hybrid_search(
        &self,
        query: &Vector,
        filters: &TierFilters,
        options: &SearchOptions,
    ) -> Result<Vec<SearchResult>> {
        let start = Instant::now();
        let results = self.run_search(query, options, Some(filters)).await?;

        debug!(
            subsystem = "database",
            component = "search",
            op = "hybrid_search",
            result_count = results.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Hybrid search complete"
        );
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_without_filters() {
        let options = SearchOptions::default().with_content(None);
        let (sql, binds) = build_search_sql(&options, None);
        assert!(sql.contains("WHERE 1 - (e.embedding <=> $1::vector) >= $2"));
        assert!(!sql.contains(" AND "));
        assert!(sql.ends_with("ORDER BY e.embedding <=> $1::vector ASC, e.id ASC LIMIT $3"));
        assert!(binds.is_empty());
    }

    #[test]
    fn test_sql_with_content_and_product() {
        let options = SearchOptions::default().with_product(Some("VPN".to_string()));
        let (sql, binds) = build_search_sql(&options, None);
        assert!(sql.contains("AND e.content_type = $3"));
        assert!(sql.contains("AND i.product = $4"));
        assert!(sql.ends_with("LIMIT $5"));
        assert_eq!(binds, vec!["description".to_string(), "VPN".to_string()]);
    }

    #[test]
    fn test_sql_with_tier_filters() {
        let options = SearchOptions::for_hybrid();
        let filters = TierFilters::default()
            .with_tier_1(Some("Software".to_string()))
            .with_tier_3(Some("Timeout".to_string()));
        let (sql, binds) = build_search_sql(&options, Some(&filters));
        assert!(sql.contains("AND i.resolution_tier_1 = $3"));
        assert!(!sql.contains("resolution_tier_2 = "));
        assert!(sql.contains("AND i.resolution_tier_3 = $4"));
        assert!(sql.ends_with("LIMIT $5"));
        assert_eq!(binds, vec!["Software".to_string(), "Timeout".to_string()]);
    }

    #[test]
    fn test_hybrid_with_empty_filters_matches_plain_search() {
        let options = SearchOptions::default();
        let plain = build_search_sql(&options, None);
        let hybrid = build_search_sql(&options, Some(&TierFilters::default()));
        assert_eq!(plain, hybrid);
    }

    #[test]
    fn test_order_clause_breaks_ties_by_insertion_order() {
        let (sql, _) = build_search_sql(&SearchOptions::default(), None);
        assert!(sql.contains("ORDER BY e.embedding <=> $1::vector ASC, e.id ASC"));
    }
}
