//! Closed vocabularies of canonical values with aliases.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A closed set of allowed canonical values for a controlled-vocabulary
/// field. Canonical values are unique; aliases may collide across
/// concepts, in which case the first match wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vocabulary {
    /// Reference name this vocabulary was loaded under
    pub reference: String,

    pub concepts: Vec<Concept>,
}

impl Vocabulary {
    /// Create an empty vocabulary.
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            concepts: Vec::new(),
        }
    }

    /// Add a concept.
    pub fn with_concept(mut self, concept: Concept) -> Self {
        self.concepts.push(concept);
        self
    }

    /// Check whether a value is one of the canonical values.
    pub fn contains_canonical(&self, value: &str) -> bool {
        self.concepts.iter().any(|c| c.canonical == value)
    }
}

/// One allowed value with its display labels and aliases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Concept {
    /// The canonical form (URI or plain value) stored in records
    pub canonical: String,

    /// Display labels per language
    #[serde(default)]
    pub labels: HashMap<String, String>,

    /// Alternative spellings that also identify this concept
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl Concept {
    /// Create a concept with no labels or aliases.
    pub fn new(canonical: impl Into<String>) -> Self {
        Self {
            canonical: canonical.into(),
            labels: HashMap::new(),
            aliases: Vec::new(),
        }
    }

    /// Add a display label.
    pub fn with_label(mut self, language: impl Into<String>, label: impl Into<String>) -> Self {
        self.labels.insert(language.into(), label.into());
        self
    }

    /// Add an alias.
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// All strings that identify this concept: canonical, labels, aliases.
    pub fn surface_forms(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.canonical.as_str())
            .chain(self.labels.values().map(String::as_str))
            .chain(self.aliases.iter().map(String::as_str))
    }
}
