//! # faultline-ingest
//!
//! Dataset loading and ingestion for faultline: CSV parsing, record
//! preprocessing (placeholder fills, category mode fill, timestamp
//! defaulting, deduplication), and the batched embed-and-store pipeline.
//!
//! The typical flow is [`dataset::load_csv`] then [`preprocess::preprocess`]
//! then [`pipeline::IngestPipeline::run`].

pub mod dataset;
pub mod pipeline;
pub mod preprocess;

pub use faultline_core::{Error, Result};

pub use dataset::{load_csv, RawIncidentRow};
pub use pipeline::{BatchFailurePolicy, IngestPipeline, IngestReport, PipelineConfig};
pub use preprocess::preprocess;
