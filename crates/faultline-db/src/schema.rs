//! Schema bootstrap for the incident knowledge base.
//!
//! Everything is `IF NOT EXISTS` so `init_schema` is safe to call on every
//! startup. The embedding column width is baked in at creation time; changing
//! the embedding model to one with a different dimension means dropping the
//! tables and re-ingesting.

use sqlx::PgPool;
use tracing::info;

use faultline_core::Result;

/// Create the vector extension, tables, and indexes.
pub async fn init_schema(pool: &PgPool, dimension: usize) -> Result<()> {
    sqlx::query("CREATE EXTENSION IF NOT EXISTS vector")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS incident (
            id BIGSERIAL PRIMARY KEY,
            incident_number TEXT NOT NULL UNIQUE,
            product TEXT NOT NULL,
            description TEXT NOT NULL,
            closing_notes TEXT,
            resolution_tier_1 TEXT,
            resolution_tier_2 TEXT,
            resolution_tier_3 TEXT,
            problem_id TEXT,
            opened_at TIMESTAMPTZ NOT NULL,
            resolved_at TIMESTAMPTZ NOT NULL,
            resolution_time_hours DOUBLE PRECISION NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Dimension is a trusted usize from our own config, not user input.
    let create_embeddings = format!(
        r#"
        CREATE TABLE IF NOT EXISTS incident_embedding (
            id BIGSERIAL PRIMARY KEY,
            incident_id BIGINT NOT NULL REFERENCES incident(id) ON DELETE CASCADE,
            content_type TEXT NOT NULL,
            content_text TEXT NOT NULL,
            embedding vector({dimension}) NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#
    );
    sqlx::query(&create_embeddings).execute(pool).await?;

    for statement in [
        "CREATE INDEX IF NOT EXISTS incident_product_idx ON incident (product)",
        "CREATE INDEX IF NOT EXISTS incident_tier_1_idx ON incident (resolution_tier_1)",
        "CREATE INDEX IF NOT EXISTS incident_tier_2_idx ON incident (resolution_tier_2)",
        "CREATE INDEX IF NOT EXISTS incident_tier_3_idx ON incident (resolution_tier_3)",
        "CREATE INDEX IF NOT EXISTS incident_embedding_incident_idx \
         ON incident_embedding (incident_id)",
        "CREATE INDEX IF NOT EXISTS incident_embedding_content_idx \
         ON incident_embedding (content_type)",
        // ivfflat trades recall for speed; lists=100 suits datasets in the
        // tens of thousands. Built empty, clusters improve after ingest.
        "CREATE INDEX IF NOT EXISTS incident_embedding_cosine_idx \
         ON incident_embedding USING ivfflat (embedding vector_cosine_ops) WITH (lists = 100)",
    ] {
        sqlx::query(statement).execute(pool).await?;
    }

    info!(
        subsystem = "database",
        component = "schema",
        op = "init",
        dimension,
        "Schema initialized"
    );

    Ok(())
}

/// Drop the incident tables. Destructive; exists for test teardown and full
/// re-ingestion with a new embedding dimension.
pub async fn drop_schema(pool: &PgPool) -> Result<()> {
    sqlx::query("DROP TABLE IF EXISTS incident_embedding")
        .execute(pool)
        .await?;
    sqlx::query("DROP TABLE IF EXISTS incident")
        .execute(pool)
        .await?;

    info!(
        subsystem = "database",
        component = "schema",
        op = "drop",
        "Schema dropped"
    );

    Ok(())
}
