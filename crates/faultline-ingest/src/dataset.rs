//! CSV dataset loading.
//!
//! Reads ticket-system exports with named headers. Only three columns are
//! hard requirements; everything else degrades gracefully during
//! preprocessing.

use serde::Deserialize;
use std::path::Path;

use faultline_core::{Error, Result};

/// Headers that must be present. Loading fails fast if any is missing, since
/// preprocessing cannot invent descriptions or categories.
pub const REQUIRED_COLUMNS: [&str; 3] = ["description", "close_notes", "u_resolution_tier_2"];

/// One raw CSV row, prior to preprocessing. Empty cells deserialize to
/// `None`; preprocessing also treats whitespace-only values as absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawIncidentRow {
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default)]
    pub product: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub close_notes: Option<String>,
    #[serde(default, rename = "u_resolution_tier_1")]
    pub resolution_tier_1: Option<String>,
    #[serde(default, rename = "u_resolution_tier_2")]
    pub resolution_tier_2: Option<String>,
    #[serde(default, rename = "u_resolution_tier_3")]
    pub resolution_tier_3: Option<String>,
    #[serde(default)]
    pub problem_id: Option<String>,
    #[serde(default)]
    pub opened_at: Option<String>,
    #[serde(default)]
    pub resolved_at: Option<String>,
}

/// Load all rows from a CSV file.
pub fn load_csv(path: &Path) -> Result<Vec<RawIncidentRow>> {
    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| Error::Data(format!("failed to open {}: {e}", path.display())))?;

    let headers = reader
        .headers()
        .map_err(|e| Error::Data(format!("failed to read headers: {e}")))?
        .clone();
    validate_headers(&headers)?;

    let mut rows = Vec::new();
    for (index, record) in reader.deserialize().enumerate() {
        let row: RawIncidentRow =
            record.map_err(|e| Error::Data(format!("malformed row {}: {e}", index + 1)))?;
        rows.push(row);
    }
    Ok(rows)
}

fn validate_headers(headers: &csv::StringRecord) -> Result<()> {
    for required in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == required) {
            return Err(Error::Data(format!(
                "missing required column '{required}'"
            )));
        }
    }
    Ok(())
}
