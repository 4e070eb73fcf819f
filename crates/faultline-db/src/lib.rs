//! # faultline-db
//!
//! PostgreSQL storage for the incident knowledge base: schema bootstrap,
//! connection pooling, the incident repository, and pgvector similarity
//! search.
//!
//! The `integration` feature enables tests that need a live Postgres with
//! the pgvector extension installed (see `tests/`).

pub mod incidents;
pub mod pool;
pub mod schema;
pub mod search;

pub use faultline_core::*;

pub use incidents::PgIncidentStore;
pub use pool::{create_pool, create_pool_with_config, log_pool_metrics, PoolConfig};
pub use schema::{drop_schema, init_schema};
pub use search::PgSimilaritySearch;
