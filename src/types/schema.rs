//! Schema and field definitions.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Cache key for a resolved schema: (context, version, file).
///
/// Always concrete — `latest` and `auto` are resolved before a key is built.
pub type SchemaKey = (String, String, String);

/// A versioned, contextual collection of field specs describing one
/// content type (e.g. event, person).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schema {
    /// Schema context (e.g. "default")
    pub context: String,

    /// Concrete version (never "latest")
    pub version: String,

    /// Concrete schema file name (never "auto")
    pub file: String,

    /// Human labels per language
    #[serde(default)]
    pub labels: HashMap<String, String>,

    /// Named sections grouping fields
    #[serde(default)]
    pub groups: Vec<GroupSpec>,

    /// Ordered field definitions; ids are unique within a schema
    pub fields: Vec<FieldSpec>,
}

impl Schema {
    /// Look up a field spec by id.
    pub fn field(&self, id: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.id == id)
    }

    /// Fields the completion service is allowed to fill.
    pub fn fillable_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|f| f.ai_fillable)
    }

    /// First field id declared more than once, if any.
    ///
    /// Field ids must be unique within a schema; lookups and diffs
    /// resolve to the first declaration otherwise.
    pub fn duplicate_field_id(&self) -> Option<&str> {
        let mut seen = std::collections::HashSet::new();
        self.fields
            .iter()
            .find(|f| !seen.insert(f.id.as_str()))
            .map(|f| f.id.as_str())
    }
}

/// A named section within a schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSpec {
    pub id: String,

    #[serde(default)]
    pub labels: HashMap<String, String>,
}

/// One named, typed, optionally-required metadata attribute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Namespaced field id (e.g. "cclom:title")
    pub id: String,

    /// Declared value type
    pub field_type: FieldType,

    /// Whether a record must carry a non-empty value for this field
    #[serde(default)]
    pub required: bool,

    /// Reference to a closed vocabulary, for vocabulary-typed fields
    #[serde(default)]
    pub vocabulary: Option<String>,

    /// Repository field this maps to when written externally.
    ///
    /// None means the field is extraction-only and never persisted.
    #[serde(default)]
    pub repo_field: Option<String>,

    /// Whether the completion service may fill this field
    #[serde(default = "default_true")]
    pub ai_fillable: bool,

    /// Group (section) this field belongs to
    #[serde(default)]
    pub group: String,

    /// Human labels per language
    #[serde(default)]
    pub labels: HashMap<String, String>,
}

fn default_true() -> bool {
    true
}

impl FieldSpec {
    /// Create a field spec with defaults.
    pub fn new(id: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            id: id.into(),
            field_type,
            required: false,
            vocabulary: None,
            repo_field: None,
            ai_fillable: true,
            group: String::new(),
            labels: HashMap::new(),
        }
    }

    /// Mark the field as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Attach a vocabulary reference.
    pub fn with_vocabulary(mut self, reference: impl Into<String>) -> Self {
        self.vocabulary = Some(reference.into());
        self
    }

    /// Map the field to a repository field name.
    pub fn with_repo_field(mut self, name: impl Into<String>) -> Self {
        self.repo_field = Some(name.into());
        self
    }

    /// Exclude the field from completion calls.
    pub fn not_fillable(mut self) -> Self {
        self.ai_fillable = false;
        self
    }

    /// Set the group id.
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    /// Add a label for a language.
    pub fn with_label(mut self, language: impl Into<String>, label: impl Into<String>) -> Self {
        self.labels.insert(language.into(), label.into());
        self
    }

    /// Localized label with de/en fallback.
    pub fn label(&self, language: &str) -> &str {
        self.labels
            .get(language)
            .or_else(|| self.labels.get("de"))
            .or_else(|| self.labels.get("en"))
            .map(String::as_str)
            .unwrap_or(&self.id)
    }
}

/// Declared field value types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    RichText,
    Date,
    DateTime,
    Time,
    Boolean,
    Number,
    Integer,
    MultiText,
    Url,
    Duration,
    GeoLocation,
    Vocabulary,
}

/// Summary of an available schema, as returned by `SchemaStore::list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaSummary {
    pub file: String,

    #[serde(default)]
    pub labels: HashMap<String, String>,

    pub field_count: usize,

    /// Keywords used for content-type detection fallback
    #[serde(default)]
    pub keywords: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_label_fallback() {
        let field = FieldSpec::new("cclom:title", FieldType::Text)
            .with_label("de", "Titel")
            .with_label("en", "Title");

        assert_eq!(field.label("de"), "Titel");
        assert_eq!(field.label("en"), "Title");
        assert_eq!(field.label("fr"), "Titel"); // falls back to de

        let bare = FieldSpec::new("cclom:title", FieldType::Text);
        assert_eq!(bare.label("de"), "cclom:title");
    }

    #[test]
    fn test_fillable_fields() {
        let schema = Schema {
            context: "default".into(),
            version: "1.0.0".into(),
            file: "event.json".into(),
            labels: HashMap::new(),
            groups: vec![],
            fields: vec![
                FieldSpec::new("cclom:title", FieldType::Text),
                FieldSpec::new("sys:node_id", FieldType::Text).not_fillable(),
            ],
        };

        let fillable: Vec<_> = schema.fillable_fields().map(|f| f.id.as_str()).collect();
        assert_eq!(fillable, vec!["cclom:title"]);
    }

    #[test]
    fn test_duplicate_field_id_detected() {
        let mut schema = Schema {
            context: "default".into(),
            version: "1.0.0".into(),
            file: "event.json".into(),
            labels: HashMap::new(),
            groups: vec![],
            fields: vec![
                FieldSpec::new("cclom:title", FieldType::Text),
                FieldSpec::new("ccm:event_date", FieldType::Date),
            ],
        };
        assert_eq!(schema.duplicate_field_id(), None);

        schema.fields.push(FieldSpec::new("cclom:title", FieldType::Text));
        assert_eq!(schema.duplicate_field_id(), Some("cclom:title"));
    }
}
