//! Expected-vs-actual comparison of metadata records.
//!
//! Values are canonicalized before comparison so that representation
//! differences (epoch milliseconds vs ISO strings, numeric strings,
//! single-element arrays) do not show up as mismatches.

use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;
use tracing::debug;

use crate::error::Result;
use crate::traits::Repository;
use crate::types::diff::{DiffEntry, DiffStatus, DiffSummary};
use crate::types::record::{is_empty_value, MetadataRecord};
use crate::types::schema::Schema;

/// Compare an expected record against an actual one.
///
/// Entries come out in schema order for expected fields, followed by
/// actual-only fields in their own order.
pub fn diff(
    expected: &MetadataRecord,
    actual: &MetadataRecord,
    schema: &Schema,
) -> (Vec<DiffEntry>, DiffSummary) {
    let mut entries = Vec::new();

    let mut ordered_ids: Vec<&str> = schema
        .fields
        .iter()
        .map(|f| f.id.as_str())
        .filter(|id| expected.contains_key(*id))
        .collect();
    for id in expected.keys() {
        if !ordered_ids.contains(&id.as_str()) {
            ordered_ids.push(id);
        }
    }

    for id in ordered_ids {
        let expected_value = expected.get(id).filter(|v| !is_empty_value(v));
        let actual_value = actual.get(id).filter(|v| !is_empty_value(v));

        let status = match (expected_value, actual_value) {
            (Some(e), Some(a)) => {
                if canonicalize(e) == canonicalize(a) {
                    DiffStatus::Match
                } else {
                    DiffStatus::Mismatch
                }
            }
            (Some(_), None) => {
                let persisted = schema
                    .field(id)
                    .map(|f| f.repo_field.is_some())
                    .unwrap_or(true);
                if persisted {
                    DiffStatus::MissingInRepo
                } else {
                    DiffStatus::NotWritten
                }
            }
            (None, Some(_)) => DiffStatus::ExtraInRepo,
            (None, None) => continue,
        };

        entries.push(DiffEntry {
            field: id.to_string(),
            status,
            expected: expected_value.cloned(),
            actual: actual_value.cloned(),
        });
    }

    for (id, value) in actual {
        if expected.contains_key(id) || is_empty_value(value) {
            continue;
        }
        entries.push(DiffEntry {
            field: id.clone(),
            status: DiffStatus::ExtraInRepo,
            expected: None,
            actual: Some(value.clone()),
        });
    }

    let summary = DiffSummary::from_entries(&entries);
    debug!(
        matches = summary.matches,
        mismatches = summary.mismatches,
        missing = summary.missing_in_repo,
        extra = summary.extra_in_repo,
        "diff computed"
    );
    (entries, summary)
}

/// Diff an expected record against what the repository actually holds.
///
/// The actual side is read through the `Repository` collaborator and
/// mapped back from repository field names to schema field ids.
pub async fn diff_against_repository(
    expected: &MetadataRecord,
    node_id: &str,
    schema: &Schema,
    repository: &dyn Repository,
) -> Result<(Vec<DiffEntry>, DiffSummary)> {
    let stored = repository.read_fields(node_id).await?;

    let mut actual = MetadataRecord::new();
    let mut claimed: Vec<&str> = Vec::new();
    for field in &schema.fields {
        if let Some(repo_field) = &field.repo_field {
            if let Some(value) = stored.get(repo_field) {
                actual.insert(field.id.clone(), value.clone());
                claimed.push(repo_field);
            }
        }
    }
    for (key, value) in &stored {
        if !claimed.contains(&key.as_str()) {
            actual.insert(key.clone(), value.clone());
        }
    }

    Ok(diff(expected, &actual, schema))
}

// One canonical shape per value: single-element arrays unwrapped,
// temporal strings and epoch-millisecond numbers collapsed to one
// instant, numeric strings to numbers, strings trimmed.
fn canonicalize(value: &Value) -> Value {
    let value = match value {
        Value::Array(items) if items.len() == 1 => &items[0],
        other => other,
    };

    match value {
        Value::String(s) => {
            let t = s.trim();
            if let Some(ms) = instant_millis(t) {
                return Value::from(ms);
            }
            if let Ok(n) = t.parse::<i64>() {
                return Value::from(n);
            }
            if let Ok(f) = t.parse::<f64>() {
                return float_value(f);
            }
            Value::String(t.to_string())
        }
        Value::Number(n) => match n.as_f64() {
            Some(f) => float_value(f),
            None => value.clone(),
        },
        other => other.clone(),
    }
}

fn float_value(f: f64) -> Value {
    if f.fract() == 0.0 && f.abs() < 9e15 {
        Value::from(f as i64)
    } else {
        serde_json::Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
    }
}

// ISO date/datetime → epoch milliseconds; naive values read as UTC.
fn instant_millis(s: &str) -> Option<i64> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp_millis());
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt.and_utc().timestamp_millis());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc().timestamp_millis());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockRepository;
    use crate::types::schema::{FieldSpec, FieldType};
    use serde_json::json;
    use std::collections::HashMap;

    fn schema() -> Schema {
        Schema {
            context: "default".into(),
            version: "1.0.0".into(),
            file: "event.json".into(),
            labels: HashMap::new(),
            groups: vec![],
            fields: vec![
                FieldSpec::new("cclom:title", FieldType::Text).with_repo_field("cclom:title"),
                FieldSpec::new("ccm:event_begin", FieldType::DateTime)
                    .with_repo_field("ccm:oeh_event_begin"),
                FieldSpec::new("ccm:internal_note", FieldType::Text), // never persisted
            ],
        }
    }

    fn record(entries: &[(&str, Value)]) -> MetadataRecord {
        entries.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn test_epoch_millis_matches_iso() {
        // 2025-03-15T10:30:00 UTC
        let expected = record(&[("ccm:event_begin", json!("2025-03-15T10:30:00"))]);
        let actual = record(&[("ccm:event_begin", json!("1742034600000"))]);

        let (entries, summary) = diff(&expected, &actual, &schema());
        assert_eq!(entries[0].status, DiffStatus::Match);
        assert!(summary.is_clean());
    }

    #[test]
    fn test_off_by_a_day_is_mismatch() {
        let expected = record(&[("ccm:event_begin", json!("2025-03-16T10:30:00"))]);
        let actual = record(&[("ccm:event_begin", json!(1742034600000i64))]);

        let (entries, summary) = diff(&expected, &actual, &schema());
        assert_eq!(entries[0].status, DiffStatus::Mismatch);
        assert_eq!(summary.mismatches, 1);
    }

    #[test]
    fn test_single_element_array_unwrapped() {
        let expected = record(&[("cclom:title", json!("Rust-Workshop"))]);
        let actual = record(&[("cclom:title", json!(["Rust-Workshop"]))]);

        let (entries, _) = diff(&expected, &actual, &schema());
        assert_eq!(entries[0].status, DiffStatus::Match);
    }

    #[test]
    fn test_unpersisted_field_is_not_written() {
        let expected = record(&[
            ("cclom:title", json!("t")),
            ("ccm:internal_note", json!("nur intern")),
        ]);
        let actual = record(&[("cclom:title", json!("t"))]);

        let (entries, summary) = diff(&expected, &actual, &schema());
        assert_eq!(entries[1].status, DiffStatus::NotWritten);
        assert_eq!(summary.not_written, 1);
        assert!(summary.is_clean());
    }

    #[test]
    fn test_missing_and_extra() {
        let expected = record(&[("cclom:title", json!("t"))]);
        let actual = record(&[("ccm:unexpected", json!("x"))]);

        let (entries, summary) = diff(&expected, &actual, &schema());
        assert_eq!(summary.missing_in_repo, 1);
        assert_eq!(summary.extra_in_repo, 1);
        assert!(!summary.is_clean());
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn test_empty_values_treated_as_absent() {
        let expected = record(&[("cclom:title", json!(""))]);
        let actual = record(&[("cclom:title", json!("t"))]);

        let (entries, _) = diff(&expected, &actual, &schema());
        assert_eq!(entries[0].status, DiffStatus::ExtraInRepo);
    }

    #[tokio::test]
    async fn test_diff_against_repository_maps_repo_fields() {
        let repo = MockRepository::new().with_node(
            "node-1",
            record(&[
                ("cclom:title", json!("Rust-Workshop")),
                ("ccm:oeh_event_begin", json!("1742034600000")),
            ]),
        );
        let expected = record(&[
            ("cclom:title", json!("Rust-Workshop")),
            ("ccm:event_begin", json!("2025-03-15T10:30:00")),
        ]);

        let (entries, summary) = diff_against_repository(&expected, "node-1", &schema(), &repo)
            .await
            .unwrap();
        assert_eq!(entries.len(), 2);
        assert!(summary.is_clean());
        assert_eq!(summary.matches, 2);
    }
}
