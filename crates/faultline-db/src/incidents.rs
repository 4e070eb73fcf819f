//! Incident repository backed by PostgreSQL.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::{debug, instrument};

use faultline_core::{
    CategoryCount, Error, IncidentBundle, IncidentRecord, IncidentStore, NewEmbedding,
    NewIncident, Result, TierLevel,
};

/// Columns selected whenever a full incident row is fetched.
const INCIDENT_COLUMNS: &str = "id, incident_number, product, description, closing_notes, \
     resolution_tier_1, resolution_tier_2, resolution_tier_3, problem_id, \
     opened_at, resolved_at, resolution_time_hours, created_at";

/// PostgreSQL implementation of [`IncidentStore`].
#[derive(Clone)]
pub struct PgIncidentStore {
    pool: PgPool,
}

impl PgIncidentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Insert one incident row within an existing transaction.
    pub async fn insert_incident_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        incident: &NewIncident,
    ) -> Result<i64> {
        let row = sqlx::query(
            r#"
            INSERT INTO incident
                (incident_number, product, description, closing_notes,
                 resolution_tier_1, resolution_tier_2, resolution_tier_3,
                 problem_id, opened_at, resolved_at, resolution_time_hours)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING id
            "#,
        )
        .bind(&incident.incident_number)
        .bind(&incident.product)
        .bind(&incident.description)
        .bind(&incident.closing_notes)
        .bind(&incident.resolution_tier_1)
        .bind(&incident.resolution_tier_2)
        .bind(&incident.resolution_tier_3)
        .bind(&incident.problem_id)
        .bind(incident.opened_at)
        .bind(incident.resolved_at)
        .bind(incident.resolution_time_hours)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| classify_insert_error(e, &incident.incident_number))?;

        Ok(row.get("id"))
    }

    /// Insert embedding rows for an incident within an existing transaction.
    pub async fn insert_embeddings_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        incident_id: i64,
        embeddings: &[NewEmbedding],
    ) -> Result<()> {
        for embedding in embeddings {
            sqlx::query(
                r#"
                INSERT INTO incident_embedding (incident_id, content_type, content_text, embedding)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(incident_id)
            .bind(embedding.content.as_str())
            .bind(&embedding.text)
            .bind(&embedding.vector)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }
}

/// Unique violations on insert surface as [`Error::DuplicateKey`] so callers
/// can tell collisions from outages.
fn classify_insert_error(e: sqlx::Error, incident_number: &str) -> Error {
    if let sqlx::Error::Database(ref db_err) = e {
        if db_err.code().as_deref() == Some("23505") {
            return Error::DuplicateKey(incident_number.to_string());
        }
    }
    Error::Database(e)
}

fn incident_from_row(row: &PgRow) -> IncidentRecord {
    IncidentRecord {
        id: row.get("id"),
        incident_number: row.get("incident_number"),
        product: row.get("product"),
        description: row.get("description"),
        closing_notes: row.get("closing_notes"),
        resolution_tier_1: row.get("resolution_tier_1"),
        resolution_tier_2: row.get("resolution_tier_2"),
        resolution_tier_3: row.get("resolution_tier_3"),
        problem_id: row.get("problem_id"),
        opened_at: row.get("opened_at"),
        resolved_at: row.get("resolved_at"),
        resolution_time_hours: row.get("resolution_time_hours"),
        created_at: row.get("created_at"),
    }
}

#[async_trait]
impl IncidentStore for PgIncidentStore {
    async fn store_incident(
        &self,
        incident: &NewIncident,
        embeddings: &[NewEmbedding],
    ) -> Result<i64> {
        let mut tx = self.pool.begin().await?;
        let id = self.insert_incident_tx(&mut tx, incident).await?;
        self.insert_embeddings_tx(&mut tx, id, embeddings).await?;
        tx.commit().await?;
        Ok(id)
    }

    #[instrument(skip(self, bundles), fields(
        subsystem = "database",
        component = "incidents",
        op = "store_batch",
        record_count = bundles.len()
    ))]
    async fn store_batch(&self, bundles: &[IncidentBundle]) -> Result<Vec<i64>> {
        let mut tx = self.pool.begin().await?;
        let mut ids = Vec::with_capacity(bundles.len());
        for bundle in bundles {
            let id = self.insert_incident_tx(&mut tx, &bundle.incident).await?;
            self.insert_embeddings_tx(&mut tx, id, &bundle.embeddings)
                .await?;
            ids.push(id);
        }
        tx.commit().await?;

        debug!(
            subsystem = "database",
            component = "incidents",
            op = "store_batch",
            record_count = ids.len(),
            "Batch committed"
        );
        Ok(ids)
    }

    async fn replace_all(&self) -> Result<()> {
        // Embedding rows go with their incidents via ON DELETE CASCADE.
        sqlx::query("TRUNCATE incident RESTART IDENTITY CASCADE")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_by_number(&self, incident_number: &str) -> Result<Option<IncidentRecord>> {
        let query = format!("SELECT {INCIDENT_COLUMNS} FROM incident WHERE incident_number = $1");
        let row = sqlx::query(&query)
            .bind(incident_number)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(incident_from_row))
    }

    #[instrument(skip(self), fields(
        subsystem = "database",
        component = "incidents",
        op = "find_by_tier",
        tier = %level
    ))]
    async fn find_by_tier(
        &self,
        level: TierLevel,
        value: &str,
        limit: i64,
    ) -> Result<Vec<IncidentRecord>> {
        // level maps to a closed set of columns; never caller-supplied text.
        let query = format!(
            "SELECT {INCIDENT_COLUMNS} FROM incident WHERE {} = $1 \
             ORDER BY opened_at DESC, id DESC LIMIT $2",
            level.column()
        );
        let rows = sqlx::query(&query)
            .bind(value)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(incident_from_row).collect())
    }

    async fn count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM incident")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("count"))
    }

    async fn count_embeddings(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM incident_embedding")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("count"))
    }

    async fn count_for_category(&self, category: &str) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM incident WHERE resolution_tier_2 = $1")
            .bind(category)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("count"))
    }

    async fn category_counts(&self) -> Result<Vec<CategoryCount>> {
        let rows = sqlx::query(
            r#"
            SELECT resolution_tier_2 AS category, COUNT(*) AS count
            FROM incident
            WHERE resolution_tier_2 IS NOT NULL AND resolution_tier_2 <> ''
            GROUP BY resolution_tier_2
            ORDER BY count DESC, category ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| CategoryCount {
                category: row.get("category"),
                count: row.get("count"),
            })
            .collect())
    }

    async fn mode_category(&self) -> Result<Option<String>> {
        let row = sqlx::query(
            r#"
            SELECT resolution_tier_2 AS category
            FROM incident
            WHERE resolution_tier_2 IS NOT NULL AND resolution_tier_2 <> ''
            GROUP BY resolution_tier_2
            ORDER BY COUNT(*) DESC, category ASC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| r.get("category")))
    }

    async fn mean_resolution_hours(&self, category: &str) -> Result<Option<f64>> {
        let row = sqlx::query(
            "SELECT AVG(resolution_time_hours) AS mean_hours \
             FROM incident WHERE resolution_tier_2 = $1",
        )
        .bind(category)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get("mean_hours"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incident_columns_complete() {
        for column in [
            "incident_number",
            "product",
            "description",
            "closing_notes",
            "resolution_tier_1",
            "resolution_tier_2",
            "resolution_tier_3",
            "problem_id",
            "opened_at",
            "resolved_at",
            "resolution_time_hours",
            "created_at",
        ] {
            assert!(
                INCIDENT_COLUMNS.contains(column),
                "column list is missing {column}"
            );
        }
    }

    #[test]
    fn test_classify_insert_error_passes_through_non_database_errors() {
        let err = classify_insert_error(sqlx::Error::RowNotFound, "INC0000001");
        assert!(matches!(err, Error::Database(_)));
    }
}
