//! Metadata records and processing summaries.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Final metadata mapping field id → value, in schema order.
///
/// Sparse encoding: fields whose final value is the type's empty
/// representation are omitted entirely — absence means "no value".
pub type MetadataRecord = IndexMap<String, Value>;

/// Identity of the completion provider used for a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub provider: String,
    pub model: String,
}

impl ModelInfo {
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
        }
    }
}

/// Statistics and diagnostics for one extraction run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingSummary {
    /// False only when the request failed before extraction started
    pub success: bool,

    /// Eligible fields that produced a non-empty final value
    pub fields_extracted: usize,

    /// Fields eligible for (re)extraction under the active mode
    pub fields_total: usize,

    pub processing_time_ms: u64,

    pub provider: String,
    pub model: String,

    /// Per-field failures, in schema order
    pub errors: Vec<String>,

    /// Non-fatal findings, in schema order
    pub warnings: Vec<String>,
}

/// A latitude/longitude pair produced by geo normalization or geocoding.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Whether both coordinates lie in their valid ranges.
    pub fn in_range(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Structured geo object for a metadata record.
    pub fn to_value(self) -> Value {
        serde_json::json!({
            "latitude": round7(self.latitude),
            "longitude": round7(self.longitude),
        })
    }
}

// ~1cm precision
fn round7(v: f64) -> f64 {
    (v * 1e7).round() / 1e7
}

/// Check whether a value is the empty representation for its shape:
/// null, empty string, empty array/object, or a collection of empties.
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.iter().all(is_empty_value),
        Value::Object(map) => map.values().all(is_empty_value),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_is_empty_value() {
        assert!(is_empty_value(&Value::Null));
        assert!(is_empty_value(&json!("")));
        assert!(is_empty_value(&json!("   ")));
        assert!(is_empty_value(&json!([])));
        assert!(is_empty_value(&json!([{}])));
        assert!(is_empty_value(&json!({"name": ""})));

        assert!(!is_empty_value(&json!("x")));
        assert!(!is_empty_value(&json!(0)));
        assert!(!is_empty_value(&json!(false)));
        assert!(!is_empty_value(&json!(["a"])));
        assert!(!is_empty_value(&json!({"name": "a"})));
    }

    #[test]
    fn test_geo_point_rounding() {
        let point = GeoPoint::new(52.123456789, 13.987654321);
        let value = point.to_value();
        assert_eq!(value["latitude"], json!(52.1234568));
        assert_eq!(value["longitude"], json!(13.9876543));
    }

    #[test]
    fn test_geo_point_range() {
        assert!(GeoPoint::new(52.5, 13.4).in_range());
        assert!(!GeoPoint::new(95.0, 13.4).in_range());
        assert!(!GeoPoint::new(52.5, 190.0).in_range());
    }
}
