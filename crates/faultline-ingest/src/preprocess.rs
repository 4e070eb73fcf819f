//! Incident preprocessing: imputation, timestamp defaulting, deduplication.
//!
//! Pure functions over in-memory rows. `now` is a parameter rather than a
//! clock read so runs are reproducible in tests; the pipeline passes
//! `Utc::now()` once per run.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::collections::{HashMap, HashSet};

use faultline_core::{defaults, Error, NewIncident, Result};

use crate::dataset::RawIncidentRow;

/// Clean raw rows into ingestion-ready incidents.
///
/// Steps, in order: category mode fill, placeholder fill for free text,
/// timestamp defaulting and duration derivation, then deduplication on the
/// (closing notes, description) pair keeping the first occurrence. Input
/// order survives into the output.
///
/// Fails with `Error::Data` when the category column has no non-empty value
/// anywhere, since there is then no mode to impute from.
pub fn preprocess(rows: Vec<RawIncidentRow>, now: DateTime<Utc>) -> Result<Vec<NewIncident>> {
    let mode = category_mode(&rows)?;

    let cleaned = rows
        .into_iter()
        .enumerate()
        .map(|(index, row)| clean_row(row, index, &mode, now))
        .collect();

    Ok(dedup_keep_first(cleaned))
}

/// Most frequent non-empty category value. Ties break to the
/// lexicographically smallest label so imputation is deterministic.
fn category_mode(rows: &[RawIncidentRow]) -> Result<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for row in rows {
        if let Some(value) = non_empty(row.resolution_tier_2.as_deref()) {
            *counts.entry(value).or_default() += 1;
        }
    }

    let mut best: Option<(&str, usize)> = None;
    for (value, count) in counts {
        best = match best {
            None => Some((value, count)),
            Some((best_value, best_count)) => {
                if count > best_count || (count == best_count && value < best_value) {
                    Some((value, count))
                } else {
                    Some((best_value, best_count))
                }
            }
        };
    }

    best.map(|(value, _)| value.to_string()).ok_or_else(|| {
        Error::Data("category column has no non-empty values, nothing to impute from".to_string())
    })
}

fn clean_row(row: RawIncidentRow, index: usize, mode: &str, now: DateTime<Utc>) -> NewIncident {
    let opened_at = parse_timestamp(row.opened_at.as_deref()).unwrap_or(now);
    let resolved_at = parse_timestamp(row.resolved_at.as_deref()).unwrap_or(now);

    NewIncident {
        incident_number: non_empty(row.number.as_deref())
            .map(str::to_string)
            .unwrap_or_else(|| format!("INC{:07}", index + 1)),
        product: fill_text(row.product.as_deref()),
        description: fill_text(row.description.as_deref()),
        closing_notes: Some(fill_text(row.close_notes.as_deref())),
        resolution_tier_1: non_empty(row.resolution_tier_1.as_deref()).map(str::to_string),
        resolution_tier_2: Some(
            non_empty(row.resolution_tier_2.as_deref())
                .unwrap_or(mode)
                .to_string(),
        ),
        resolution_tier_3: non_empty(row.resolution_tier_3.as_deref()).map(str::to_string),
        problem_id: non_empty(row.problem_id.as_deref()).map(str::to_string),
        opened_at,
        resolved_at,
        resolution_time_hours: resolution_hours(opened_at, resolved_at),
    }
}

/// Duration in hours, floored so missing or reversed timestamps never
/// produce zero or negative estimates.
fn resolution_hours(opened_at: DateTime<Utc>, resolved_at: DateTime<Utc>) -> f64 {
    let hours = (resolved_at - opened_at).num_milliseconds() as f64 / 3_600_000.0;
    hours.max(defaults::MIN_RESOLUTION_HOURS)
}

/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS` (read as UTC), and bare
/// `YYYY-MM-DD` dates. Anything else is treated as missing.
fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = non_empty(raw)?;
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }
    None
}

fn dedup_keep_first(incidents: Vec<NewIncident>) -> Vec<NewIncident> {
    let mut seen: HashSet<(String, String)> = HashSet::new();
    incidents
        .into_iter()
        .filter(|incident| {
            seen.insert((
                incident.closing_notes.clone().unwrap_or_default(),
                incident.description.clone(),
            ))
        })
        .collect()
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn fill_text(value: Option<&str>) -> String {
    non_empty(value)
        .unwrap_or(defaults::TEXT_PLACEHOLDER)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn row(
        number: Option<&str>,
        description: Option<&str>,
        close_notes: Option<&str>,
        tier_2: Option<&str>,
    ) -> RawIncidentRow {
        RawIncidentRow {
            number: number.map(str::to_string),
            description: description.map(str::to_string),
            close_notes: close_notes.map(str::to_string),
            resolution_tier_2: tier_2.map(str::to_string),
            ..RawIncidentRow::default()
        }
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_mode_fill_for_missing_categories() {
        let rows = vec![
            row(Some("INC1"), Some("a"), Some("n1"), Some("Network")),
            row(Some("INC2"), Some("b"), Some("n2"), Some("Network")),
            row(Some("INC3"), Some("c"), Some("n3"), Some("Database")),
            row(Some("INC4"), Some("d"), Some("n4"), None),
            row(Some("INC5"), Some("e"), Some("n5"), Some("")),
        ];
        let cleaned = preprocess(rows, fixed_now()).unwrap();
        assert_eq!(cleaned.len(), 5);
        assert_eq!(cleaned[3].resolution_tier_2.as_deref(), Some("Network"));
        assert_eq!(cleaned[4].resolution_tier_2.as_deref(), Some("Network"));
        // No record ever leaves preprocessing with an empty category.
        assert!(cleaned
            .iter()
            .all(|i| !i.resolution_tier_2.as_deref().unwrap().is_empty()));
    }

    #[test]
    fn test_mode_tie_breaks_lexicographically() {
        let rows = vec![
            row(Some("INC1"), Some("a"), Some("n1"), Some("Zebra")),
            row(Some("INC2"), Some("b"), Some("n2"), Some("Apple")),
            row(Some("INC3"), Some("c"), Some("n3"), None),
        ];
        let cleaned = preprocess(rows, fixed_now()).unwrap();
        assert_eq!(cleaned[2].resolution_tier_2.as_deref(), Some("Apple"));
    }

    #[test]
    fn test_all_empty_category_column_fails() {
        let rows = vec![
            row(Some("INC1"), Some("a"), Some("n1"), None),
            row(Some("INC2"), Some("b"), Some("n2"), Some("  ")),
        ];
        let err = preprocess(rows, fixed_now()).unwrap_err();
        assert!(matches!(err, Error::Data(_)));
    }

    #[test]
    fn test_empty_dataset_fails() {
        let err = preprocess(vec![], fixed_now()).unwrap_err();
        assert!(matches!(err, Error::Data(_)));
    }

    #[test]
    fn test_text_placeholder_fill() {
        let rows = vec![
            row(Some("INC1"), None, None, Some("Network")),
            row(Some("INC2"), Some("  "), Some(""), Some("Network")),
        ];
        let cleaned = preprocess(rows, fixed_now()).unwrap();
        // Both rows collapse to ("Unknown", "Unknown") and dedup keeps one.
        assert_eq!(cleaned.len(), 1);
        assert_eq!(cleaned[0].description, "Unknown");
        assert_eq!(cleaned[0].product, "Unknown");
        assert_eq!(cleaned[0].closing_notes.as_deref(), Some("Unknown"));
    }

    #[test]
    fn test_incident_number_synthesis_uses_row_position() {
        let rows = vec![
            row(None, Some("a"), Some("n1"), Some("Network")),
            row(Some("INC-REAL"), Some("b"), Some("n2"), Some("Network")),
            row(None, Some("c"), Some("n3"), Some("Network")),
        ];
        let cleaned = preprocess(rows, fixed_now()).unwrap();
        assert_eq!(cleaned[0].incident_number, "INC0000001");
        assert_eq!(cleaned[1].incident_number, "INC-REAL");
        assert_eq!(cleaned[2].incident_number, "INC0000003");
    }

    #[test]
    fn test_timestamp_parsing_and_defaulting() {
        let now = fixed_now();
        let mut r = row(Some("INC1"), Some("a"), Some("n"), Some("Network"));
        r.opened_at = Some("2024-01-02 08:00:00".to_string());
        r.resolved_at = Some("2024-01-02T10:30:00+02:00".to_string());
        let mut r2 = row(Some("INC2"), Some("b"), Some("n2"), Some("Network"));
        r2.opened_at = Some("not a date".to_string());

        let cleaned = preprocess(vec![r, r2], now).unwrap();

        let first = &cleaned[0];
        assert_eq!(
            first.opened_at,
            Utc.with_ymd_and_hms(2024, 1, 2, 8, 0, 0).unwrap()
        );
        // Offset timestamps normalize to UTC: 10:30+02:00 is 08:30Z.
        assert_eq!(
            first.resolved_at,
            Utc.with_ymd_and_hms(2024, 1, 2, 8, 30, 0).unwrap()
        );
        assert!((first.resolution_time_hours - 0.5).abs() < 1e-9);

        let second = &cleaned[1];
        assert_eq!(second.opened_at, now);
        assert_eq!(second.resolved_at, now);
    }

    #[test]
    fn test_bare_date_parses_to_midnight() {
        let parsed = parse_timestamp(Some("2024-03-15")).unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_duration_clamped_for_missing_and_reversed_timestamps() {
        let now = fixed_now();
        // Missing both: opened == resolved == now, so raw duration is zero.
        let missing = row(Some("INC1"), Some("a"), Some("n1"), Some("Network"));
        // Reversed: resolved before opened.
        let mut reversed = row(Some("INC2"), Some("b"), Some("n2"), Some("Network"));
        reversed.opened_at = Some("2024-01-05 12:00:00".to_string());
        reversed.resolved_at = Some("2024-01-01 12:00:00".to_string());

        let cleaned = preprocess(vec![missing, reversed], now).unwrap();
        for incident in &cleaned {
            assert!(incident.resolution_time_hours >= defaults::MIN_RESOLUTION_HOURS);
        }
        assert_eq!(cleaned[0].resolution_time_hours, defaults::MIN_RESOLUTION_HOURS);
        assert_eq!(cleaned[1].resolution_time_hours, defaults::MIN_RESOLUTION_HOURS);
    }

    #[test]
    fn test_dedup_keeps_first_occurrence_and_preserves_order() {
        let rows = vec![
            row(Some("INC1"), Some("printer jam"), Some("cleared"), Some("HW")),
            row(Some("INC2"), Some("vpn down"), Some("restarted"), Some("HW")),
            row(Some("INC3"), Some("printer jam"), Some("cleared"), Some("HW")),
            row(Some("INC4"), Some("printer jam"), Some("replaced roller"), Some("HW")),
        ];
        let cleaned = preprocess(rows, fixed_now()).unwrap();
        let numbers: Vec<&str> = cleaned.iter().map(|i| i.incident_number.as_str()).collect();
        // INC3 duplicates INC1 on (notes, description); INC4 differs in notes.
        assert_eq!(numbers, vec!["INC1", "INC2", "INC4"]);
    }

    #[test]
    fn test_preprocessing_is_idempotent() {
        let rows = vec![
            row(Some("INC1"), Some("a"), Some("n1"), Some("Network")),
            row(Some("INC2"), Some("a"), Some("n1"), Some("Network")),
            row(Some("INC3"), Some("b"), None, None),
        ];
        let once = preprocess(rows, fixed_now()).unwrap();
        let again = dedup_keep_first(once.clone());
        assert_eq!(once.len(), again.len());
    }

    #[test]
    fn test_optional_fields_stay_none_when_absent() {
        let cleaned = preprocess(
            vec![row(Some("INC1"), Some("a"), Some("n"), Some("Network"))],
            fixed_now(),
        )
        .unwrap();
        let incident = &cleaned[0];
        assert!(incident.resolution_tier_1.is_none());
        assert!(incident.resolution_tier_3.is_none());
        assert!(incident.problem_id.is_none());
    }
}
