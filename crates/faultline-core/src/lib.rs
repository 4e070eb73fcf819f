//! # faultline-core
//!
//! Core types, traits, and defaults for faultline, a semantic knowledge base
//! over historical incident records.
//!
//! This crate defines:
//! - Domain models ([`NewIncident`], [`SearchResult`], embedding payloads)
//! - The error taxonomy ([`Error`], [`Result`])
//! - Trait seams for inference backends and the incident store
//! - Default tunables ([`defaults`]) and logging field conventions
//!   ([`logging`])

pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod traits;

pub use error::{Error, Result};
pub use models::*;
pub use traits::*;
