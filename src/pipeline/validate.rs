//! Validation of metadata records against their schema.
//!
//! Validation never mutates the record. Errors block `valid`;
//! warnings are informational only.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde_json::Value;

use crate::normalize::{parse_date, parse_datetime, parse_time};
use crate::types::config::MatchConfig;
use crate::types::record::{is_empty_value, MetadataRecord};
use crate::types::report::{Finding, ValidationReport};
use crate::types::schema::{FieldSpec, FieldType, Schema};
use crate::types::vocabulary::Vocabulary;
use crate::vocab::match_value;

/// Schema-driven record validator.
#[derive(Debug, Clone, Default)]
pub struct Validator {
    match_config: MatchConfig,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_match_config(mut self, config: MatchConfig) -> Self {
        self.match_config = config;
        self
    }

    /// Validate a record against a schema.
    ///
    /// `vocabularies` holds the resolved vocabularies for the schema's
    /// vocabulary-typed fields, keyed by reference; fields whose
    /// vocabulary is absent from the map are not re-checked.
    pub fn validate(
        &self,
        schema: &Schema,
        record: &MetadataRecord,
        vocabularies: &HashMap<String, Arc<Vocabulary>>,
    ) -> ValidationReport {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        let mut required_total = 0usize;
        let mut required_present = 0usize;

        for field in &schema.fields {
            let value = record.get(&field.id).filter(|v| !is_empty_value(v));

            if field.required {
                required_total += 1;
                match value {
                    Some(_) => required_present += 1,
                    None => {
                        errors.push(Finding::error(&field.id, "missing_required_field"));
                    }
                }
            }

            let Some(value) = value else { continue };
            self.check_value(field, value, vocabularies, &mut errors, &mut warnings);
        }

        let coverage = if required_total == 0 {
            100.0
        } else {
            required_present as f64 / required_total as f64 * 100.0
        };

        ValidationReport::new(errors, warnings, coverage)
    }

    fn check_value(
        &self,
        field: &FieldSpec,
        value: &Value,
        vocabularies: &HashMap<String, Arc<Vocabulary>>,
        errors: &mut Vec<Finding>,
        warnings: &mut Vec<Finding>,
    ) {
        match field.field_type {
            FieldType::Date => {
                for s in string_values(value) {
                    if !is_iso_date(s) && !is_iso_datetime(s) {
                        warnings.push(Finding::warning(&field.id, format_hint(s, parse_date, "ISO date")));
                    }
                }
            }
            FieldType::DateTime => {
                for s in string_values(value) {
                    if !is_iso_datetime(s) {
                        warnings.push(Finding::warning(
                            &field.id,
                            format_hint(s, parse_datetime, "ISO datetime"),
                        ));
                    }
                }
            }
            FieldType::Time => {
                for s in string_values(value) {
                    if !is_iso_time(s) {
                        warnings.push(Finding::warning(&field.id, format_hint(s, parse_time, "HH:MM time")));
                    }
                }
            }
            FieldType::Url => {
                for s in string_values(value) {
                    let lower = s.to_lowercase();
                    if !lower.starts_with("http://") && !lower.starts_with("https://") {
                        warnings.push(Finding::warning(
                            &field.id,
                            format!("'{s}' is not an http(s) URL"),
                        ));
                    }
                }
            }
            FieldType::GeoLocation => check_geo(field, value, errors, warnings),
            FieldType::Number | FieldType::Integer => {
                if value.is_string() {
                    warnings.push(Finding::warning(&field.id, "expected a number, found a string"));
                }
            }
            FieldType::Boolean => {
                if !value.is_boolean() {
                    warnings.push(Finding::warning(&field.id, "expected a boolean"));
                }
            }
            FieldType::Vocabulary => {
                let Some(vocab) = field
                    .vocabulary
                    .as_deref()
                    .and_then(|reference| vocabularies.get(reference))
                else {
                    return;
                };
                for s in string_values(value) {
                    let result = match_value(s, vocab, &self.match_config);
                    if result.is_accepted() {
                        continue;
                    }
                    let message = match result.suggestions.first() {
                        Some(best) => format!(
                            "'{s}' is not in vocabulary '{}'; closest is '{}'",
                            vocab.reference, best.canonical
                        ),
                        None => format!("'{s}' is not recognized in vocabulary '{}'", vocab.reference),
                    };
                    warnings.push(Finding::warning(&field.id, message));
                }
            }
            FieldType::Text | FieldType::RichText | FieldType::MultiText | FieldType::Duration => {}
        }
    }
}

fn check_geo(field: &FieldSpec, value: &Value, errors: &mut Vec<Finding>, warnings: &mut Vec<Finding>) {
    let Value::Object(map) = value else {
        warnings.push(Finding::warning(&field.id, "expected a coordinates object"));
        return;
    };

    let lat = map.get("latitude").and_then(Value::as_f64);
    let lon = map.get("longitude").and_then(Value::as_f64);
    let (Some(lat), Some(lon)) = (lat, lon) else {
        warnings.push(Finding::warning(&field.id, "coordinates incomplete or non-numeric"));
        return;
    };

    if !(-90.0..=90.0).contains(&lat) {
        errors.push(Finding::error(&field.id, format!("latitude {lat} out of range [-90, 90]")));
    }
    if !(-180.0..=180.0).contains(&lon) {
        errors.push(Finding::error(
            &field.id,
            format!("longitude {lon} out of range [-180, 180]"),
        ));
    }
}

// String elements of a scalar-or-array value.
fn string_values(value: &Value) -> Vec<&str> {
    match value {
        Value::String(s) => vec![s.as_str()],
        Value::Array(items) => items.iter().filter_map(Value::as_str).collect(),
        _ => vec![],
    }
}

fn format_hint(raw: &str, parse: fn(&str) -> Option<String>, expected: &str) -> String {
    match parse(raw) {
        Some(suggested) => format!("'{raw}' is not a valid {expected}; did you mean '{suggested}'?"),
        None => format!("'{raw}' is not a valid {expected}"),
    }
}

fn is_iso_date(s: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap()).is_match(s)
}

fn is_iso_datetime(s: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}(:\d{2})?").unwrap())
        .is_match(s)
}

fn is_iso_time(s: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{2}:\d{2}(:\d{2})?$").unwrap()).is_match(s)
}
