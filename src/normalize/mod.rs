//! Type-driven canonicalization of raw extracted values.
//!
//! Normalization never fails on malformed input: anything unparseable
//! passes through unchanged with `changed = false` and surfaces, at
//! most, as a validation warning later.

pub mod datetime;
pub mod number;

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

use crate::types::config::MatchConfig;
use crate::types::record::GeoPoint;
use crate::types::schema::{FieldSpec, FieldType};
use crate::types::vocabulary::Vocabulary;
use crate::vocab::{match_value, VocabularyMatch};

pub use datetime::{parse_date, parse_datetime, parse_time};
pub use number::{parse_german_number, parse_number};

/// Result of normalizing one field value.
#[derive(Debug, Clone)]
pub struct Normalized {
    /// The canonical value (equal to `raw` when nothing changed)
    pub value: Value,

    /// The value as it came in
    pub raw: Value,

    pub changed: bool,

    /// Vocabulary rejection detail, for the validation engine to surface
    pub diagnostic: Option<VocabularyMatch>,
}

impl Normalized {
    fn passthrough(raw: Value) -> Self {
        Self {
            value: raw.clone(),
            raw,
            changed: false,
            diagnostic: None,
        }
    }

    fn changed_to(raw: Value, value: Value) -> Self {
        let changed = value != raw;
        Self {
            value,
            raw,
            changed,
            diagnostic: None,
        }
    }
}

/// Type-driven value normalizer.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    match_config: MatchConfig,
}

impl Normalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use custom vocabulary-matching thresholds.
    pub fn with_match_config(mut self, config: MatchConfig) -> Self {
        self.match_config = config;
        self
    }

    /// Normalize a raw value according to its field's declared type.
    ///
    /// `vocabulary` must be the resolved vocabulary for vocabulary-typed
    /// fields; for every other type it is ignored.
    pub fn normalize(
        &self,
        field: &FieldSpec,
        raw: Value,
        vocabulary: Option<&Vocabulary>,
    ) -> Normalized {
        if raw.is_null() {
            return Normalized::passthrough(raw);
        }

        match field.field_type {
            FieldType::Text | FieldType::RichText => self.normalize_text(raw),
            FieldType::Date => self.normalize_with(raw, parse_date),
            FieldType::DateTime => self.normalize_with(raw, parse_datetime),
            FieldType::Time => self.normalize_with(raw, parse_time),
            FieldType::Boolean => self.normalize_boolean(raw),
            FieldType::Number => self.normalize_number(raw, false),
            FieldType::Integer => self.normalize_number(raw, true),
            FieldType::MultiText => self.normalize_multi_text(raw),
            FieldType::Url => self.normalize_with(raw, normalize_url),
            FieldType::Duration => self.normalize_with(raw, parse_duration),
            FieldType::GeoLocation => self.normalize_geo(raw),
            FieldType::Vocabulary => self.normalize_vocabulary(raw, vocabulary),
        }
    }

    fn normalize_text(&self, raw: Value) -> Normalized {
        match &raw {
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed == s {
                    Normalized::passthrough(raw)
                } else {
                    let value = Value::String(trimmed.to_string());
                    Normalized::changed_to(raw, value)
                }
            }
            _ => Normalized::passthrough(raw),
        }
    }

    // Shared shape for string-to-string parsers: parse failure means
    // pass-through, and arrays normalize element-wise.
    fn normalize_with(&self, raw: Value, parse: fn(&str) -> Option<String>) -> Normalized {
        match &raw {
            Value::String(s) => match parse(s) {
                Some(canonical) => Normalized::changed_to(raw, Value::String(canonical)),
                None => Normalized::passthrough(raw),
            },
            Value::Array(items) => {
                let value: Vec<Value> = items
                    .iter()
                    .map(|item| match item {
                        Value::String(s) => parse(s)
                            .map(Value::String)
                            .unwrap_or_else(|| item.clone()),
                        _ => item.clone(),
                    })
                    .collect();
                Normalized::changed_to(raw, Value::Array(value))
            }
            _ => Normalized::passthrough(raw),
        }
    }

    fn normalize_boolean(&self, raw: Value) -> Normalized {
        match &raw {
            Value::Bool(_) => Normalized::passthrough(raw),
            Value::String(s) => match parse_boolean(s) {
                Some(b) => Normalized::changed_to(raw, Value::Bool(b)),
                None => Normalized::passthrough(raw),
            },
            Value::Number(n) => {
                let truthy = n.as_f64().map(|f| f != 0.0).unwrap_or(false);
                Normalized::changed_to(raw, Value::Bool(truthy))
            }
            _ => Normalized::passthrough(raw),
        }
    }

    fn normalize_number(&self, raw: Value, as_integer: bool) -> Normalized {
        match &raw {
            Value::Number(n) => {
                if as_integer && !n.is_i64() && !n.is_u64() {
                    let value = n
                        .as_f64()
                        .map(|f| Value::from(f.round() as i64))
                        .unwrap_or_else(|| raw.clone());
                    Normalized::changed_to(raw, value)
                } else {
                    Normalized::passthrough(raw)
                }
            }
            Value::String(s) => match parse_number(s) {
                Some(n) if as_integer => Normalized::changed_to(raw, Value::from(n.round() as i64)),
                Some(n) => {
                    let value = if n.fract() == 0.0 {
                        Value::from(n as i64)
                    } else {
                        serde_json::Number::from_f64(n)
                            .map(Value::Number)
                            .unwrap_or_else(|| raw.clone())
                    };
                    Normalized::changed_to(raw, value)
                }
                None => Normalized::passthrough(raw),
            },
            _ => Normalized::passthrough(raw),
        }
    }

    // Trim, drop empties, dedupe preserving first-seen order.
    fn normalize_multi_text(&self, raw: Value) -> Normalized {
        let items: Vec<Value> = match &raw {
            Value::Array(items) => items.clone(),
            Value::String(_) => vec![raw.clone()],
            _ => return Normalized::passthrough(raw),
        };

        let mut seen = Vec::new();
        for item in items {
            let trimmed = match item {
                Value::String(s) => {
                    let t = s.trim().to_string();
                    if t.is_empty() {
                        continue;
                    }
                    Value::String(t)
                }
                Value::Null => continue,
                other => other,
            };
            if !seen.contains(&trimmed) {
                seen.push(trimmed);
            }
        }

        Normalized::changed_to(raw, Value::Array(seen))
    }

    fn normalize_geo(&self, raw: Value) -> Normalized {
        let point = match &raw {
            Value::Object(map) => {
                let lat = map.get("latitude").and_then(coerce_coordinate);
                let lon = map.get("longitude").and_then(coerce_coordinate);
                match (lat, lon) {
                    (Some(lat), Some(lon)) => Some(GeoPoint::new(lat, lon)),
                    _ => None,
                }
            }
            Value::String(s) => parse_coordinate_pair(s),
            _ => None,
        };

        match point {
            Some(p) => Normalized::changed_to(raw, p.to_value()),
            None => Normalized::passthrough(raw),
        }
    }

    fn normalize_vocabulary(&self, raw: Value, vocabulary: Option<&Vocabulary>) -> Normalized {
        let Some(vocab) = vocabulary else {
            return Normalized::passthrough(raw);
        };

        match &raw {
            Value::String(s) => {
                let result = match_value(s, vocab, &self.match_config);
                match &result.canonical {
                    Some(canonical) => {
                        Normalized::changed_to(raw, Value::String(canonical.clone()))
                    }
                    None => Normalized {
                        value: raw.clone(),
                        raw,
                        changed: false,
                        diagnostic: Some(result),
                    },
                }
            }
            Value::Array(items) => {
                let mut values = Vec::with_capacity(items.len());
                let mut diagnostic = None;
                for item in items {
                    match item {
                        Value::String(s) => {
                            let result = match_value(s, vocab, &self.match_config);
                            match &result.canonical {
                                Some(canonical) => values.push(Value::String(canonical.clone())),
                                None => {
                                    values.push(item.clone());
                                    // keep the first rejection for diagnostics
                                    diagnostic.get_or_insert(result);
                                }
                            }
                        }
                        other => values.push(other.clone()),
                    }
                }
                let value = Value::Array(values);
                let changed = value != raw;
                Normalized {
                    value,
                    raw,
                    changed,
                    diagnostic,
                }
            }
            _ => Normalized::passthrough(raw),
        }
    }
}

fn parse_boolean(input: &str) -> Option<bool> {
    match input.trim().to_lowercase().as_str() {
        "ja" | "yes" | "true" | "wahr" | "1" => Some(true),
        "nein" | "no" | "false" | "falsch" | "0" => Some(false),
        _ => None,
    }
}

/// Add https:// to bare domains; leave everything else alone.
fn normalize_url(input: &str) -> Option<String> {
    static DOMAIN: OnceLock<Regex> = OnceLock::new();

    let val = input.trim();
    let lower = val.to_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        return Some(val.to_string());
    }

    let re = DOMAIN
        .get_or_init(|| Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9-]*\.[a-zA-Z]{2,}").unwrap());
    if re.is_match(val) {
        let candidate = format!("https://{val}");
        if url::Url::parse(&candidate).is_ok() {
            return Some(candidate);
        }
    }

    None
}

/// "2 Stunden" / "30 min" / "3 Tage" → ISO-8601 duration.
fn parse_duration(input: &str) -> Option<String> {
    static ISO: OnceLock<Regex> = OnceLock::new();
    static NATURAL: OnceLock<Regex> = OnceLock::new();

    let val = input.trim();

    let iso = ISO.get_or_init(|| Regex::new(r"^P(\d+[YMWD])*(T(\d+[HMS])+)?$").unwrap());
    if iso.is_match(&val.to_uppercase()) && val.len() > 1 {
        return Some(val.to_uppercase());
    }

    let re = NATURAL.get_or_init(|| {
        Regex::new(r"(?i)^(\d+)\s*(stunden?|hours?|h|minuten?|minutes?|min|m|tage?|days?|d|wochen?|weeks?|w)$")
            .unwrap()
    });
    let caps = re.captures(val)?;
    let amount = &caps[1];
    let unit = caps[2].to_lowercase();

    Some(match unit.chars().next()? {
        's' | 'h' => format!("PT{amount}H"),
        'm' => format!("PT{amount}M"),
        't' | 'd' => format!("P{amount}D"),
        'w' => format!("P{amount}W"),
        _ => return None,
    })
}

fn coerce_coordinate(value: &Value) -> Option<f64> {
    static DEGREE: OnceLock<Regex> = OnceLock::new();

    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let re = DEGREE.get_or_init(|| Regex::new(r"[°º]").unwrap());
            re.replace_all(s.trim(), "").replace(',', ".").parse().ok()
        }
        _ => None,
    }
}

// "52.52, 13.405" with either separator style
fn parse_coordinate_pair(input: &str) -> Option<GeoPoint> {
    let parts: Vec<&str> = input.split(|c| c == ';' || c == ',').collect();
    if parts.len() != 2 {
        // comma may be the pair separator only when dots are the
        // decimal separator; anything else is ambiguous
        return None;
    }
    let lat: f64 = parts[0].trim().parse().ok()?;
    let lon: f64 = parts[1].trim().parse().ok()?;
    Some(GeoPoint::new(lat, lon))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::vocabulary::Concept;
    use serde_json::json;

    fn field(field_type: FieldType) -> FieldSpec {
        FieldSpec::new("test:field", field_type)
    }

    #[test]
    fn test_date_normalization() {
        let n = Normalizer::new();
        let result = n.normalize(&field(FieldType::Date), json!("15. März 2026"), None);
        assert_eq!(result.value, json!("2026-03-15"));
        assert!(result.changed);
    }

    #[test]
    fn test_unparseable_date_passes_through() {
        let n = Normalizer::new();
        let result = n.normalize(&field(FieldType::Date), json!("demnächst"), None);
        assert_eq!(result.value, json!("demnächst"));
        assert!(!result.changed);
        assert!(result.diagnostic.is_none());
    }

    #[test]
    fn test_boolean_tokens() {
        let n = Normalizer::new();
        for (input, expected) in [("ja", true), ("Nein", false), ("YES", true), ("0", false)] {
            let result = n.normalize(&field(FieldType::Boolean), json!(input), None);
            assert_eq!(result.value, json!(expected), "input: {input}");
        }

        let result = n.normalize(&field(FieldType::Boolean), json!("vielleicht"), None);
        assert_eq!(result.value, json!("vielleicht"));
        assert!(!result.changed);
    }

    #[test]
    fn test_multi_text_dedupe_preserves_order() {
        let n = Normalizer::new();
        let result = n.normalize(
            &field(FieldType::MultiText),
            json!(["b ", "a", "b", "", "  ", "a"]),
            None,
        );
        assert_eq!(result.value, json!(["b", "a"]));
        assert!(result.changed);
    }

    #[test]
    fn test_number_german_words() {
        let n = Normalizer::new();
        let result = n.normalize(&field(FieldType::Integer), json!("dreihundertfünfzig"), None);
        assert_eq!(result.value, json!(350));
    }

    #[test]
    fn test_geo_object() {
        let n = Normalizer::new();
        let result = n.normalize(
            &field(FieldType::GeoLocation),
            json!({"latitude": "52,52°", "longitude": 13.405}),
            None,
        );
        assert_eq!(result.value["latitude"], json!(52.52));
        assert_eq!(result.value["longitude"], json!(13.405));
    }

    #[test]
    fn test_geo_missing_coordinate_passes_through() {
        let n = Normalizer::new();
        let raw = json!({"latitude": 52.52});
        let result = n.normalize(&field(FieldType::GeoLocation), raw.clone(), None);
        assert_eq!(result.value, raw);
        assert!(!result.changed);
    }

    #[test]
    fn test_vocabulary_acceptance_and_rejection() {
        let vocab = Vocabulary::new("format")
            .with_concept(Concept::new("Workshop"))
            .with_concept(Concept::new("Webinar"));
        let n = Normalizer::new();

        let accepted = n.normalize(
            &field(FieldType::Vocabulary),
            json!("workshop"),
            Some(&vocab),
        );
        assert_eq!(accepted.value, json!("Workshop"));
        assert!(accepted.diagnostic.is_none());

        let rejected = n.normalize(
            &field(FieldType::Vocabulary),
            json!("Vortrag"),
            Some(&vocab),
        );
        assert_eq!(rejected.value, json!("Vortrag"));
        assert!(!rejected.changed);
        assert!(rejected.diagnostic.is_some());
    }

    #[test]
    fn test_url_protocol_added() {
        let n = Normalizer::new();
        let result = n.normalize(&field(FieldType::Url), json!("example.org/kurs"), None);
        assert_eq!(result.value, json!("https://example.org/kurs"));
    }

    #[test]
    fn test_duration() {
        let n = Normalizer::new();
        let result = n.normalize(&field(FieldType::Duration), json!("2 Stunden"), None);
        assert_eq!(result.value, json!("PT2H"));

        let result = n.normalize(&field(FieldType::Duration), json!("30 min"), None);
        assert_eq!(result.value, json!("PT30M"));
    }

    #[test]
    fn test_normalization_idempotent() {
        let n = Normalizer::new();
        let cases = [
            (FieldType::Date, json!("15.03.2026")),
            (FieldType::Time, json!("14 Uhr 30")),
            (FieldType::Boolean, json!("ja")),
            (FieldType::MultiText, json!([" a ", "a", "b"])),
            (FieldType::Url, json!("example.org")),
        ];
        for (ft, raw) in cases {
            let f = field(ft);
            let once = n.normalize(&f, raw, None);
            let twice = n.normalize(&f, once.value.clone(), None);
            assert_eq!(once.value, twice.value, "type: {ft:?}");
            assert!(!twice.changed, "type: {ft:?}");
        }
    }
}
