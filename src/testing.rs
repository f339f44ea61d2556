//! Test doubles for the pipeline's collaborator traits.
//!
//! Hand-rolled mocks with builder-style configuration and call
//! tracking, shared by the inline unit tests across the crate.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{CompletionError, CompletionResult, SchemaError, SchemaResult};
use crate::traits::{Completion, FieldWriteResult, Geocoder, Repository, SchemaSource};
use crate::types::record::{GeoPoint, MetadataRecord, ModelInfo};
use crate::types::schema::{FieldSpec, Schema, SchemaSummary};
use crate::types::vocabulary::Vocabulary;

/// Mock completion service with canned per-field values, failure
/// injection and call tracking.
#[derive(Default)]
pub struct MockCompletion {
    responses: RwLock<HashMap<String, Value>>,
    failures: RwLock<HashMap<String, (CompletionError, usize)>>,
    classification: RwLock<Option<String>>,
    delay: Option<Duration>,
    calls: RwLock<Vec<String>>,
}

impl MockCompletion {
    pub fn new() -> Self {
        Self::default()
    }

    /// Respond with `value` for a field id.
    pub fn with_value(self, field: impl Into<String>, value: Value) -> Self {
        self.responses
            .write()
            .expect("lock poisoned")
            .insert(field.into(), value);
        self
    }

    /// Fail the first `times` calls for a field with `error`, then
    /// fall back to the configured value. `usize::MAX` never recovers.
    pub fn with_failure(
        self,
        field: impl Into<String>,
        error: CompletionError,
        times: usize,
    ) -> Self {
        self.failures
            .write()
            .expect("lock poisoned")
            .insert(field.into(), (error, times));
        self
    }

    /// Answer `classify_content` with this schema file.
    pub fn with_classification(self, file: impl Into<String>) -> Self {
        *self.classification.write().expect("lock poisoned") = Some(file.into());
        self
    }

    /// Sleep this long before answering each extraction call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Total extraction calls made.
    pub fn call_count(&self) -> usize {
        self.calls.read().expect("lock poisoned").len()
    }

    /// Extraction calls made for one field.
    pub fn calls_for(&self, field: &str) -> usize {
        self.calls
            .read()
            .expect("lock poisoned")
            .iter()
            .filter(|id| id.as_str() == field)
            .count()
    }
}

#[async_trait]
impl Completion for MockCompletion {
    async fn extract_field(
        &self,
        field: &FieldSpec,
        _text: &str,
        _existing: Option<&Value>,
        _language: &str,
    ) -> CompletionResult<Value> {
        self.calls
            .write()
            .expect("lock poisoned")
            .push(field.id.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        {
            let mut failures = self.failures.write().expect("lock poisoned");
            if let Some((error, remaining)) = failures.get_mut(&field.id) {
                if *remaining > 0 {
                    let err = error.clone();
                    if *remaining != usize::MAX {
                        *remaining -= 1;
                    }
                    return Err(err);
                }
            }
        }

        Ok(self
            .responses
            .read()
            .expect("lock poisoned")
            .get(&field.id)
            .cloned()
            .unwrap_or(Value::Null))
    }

    async fn classify_content(
        &self,
        _text: &str,
        _options: &[SchemaSummary],
        _language: &str,
    ) -> CompletionResult<String> {
        self.classification
            .read()
            .expect("lock poisoned")
            .clone()
            .ok_or_else(|| CompletionError::Provider("no classification configured".into()))
    }

    fn model(&self) -> ModelInfo {
        ModelInfo::new("mock", "mock-1")
    }
}

/// Mock schema source backed by in-memory schemas and vocabularies.
#[derive(Default)]
pub struct MockSchemaSource {
    schemas: RwLock<Vec<Schema>>,
    summaries: RwLock<HashMap<(String, String), Vec<SchemaSummary>>>,
    vocabularies: RwLock<HashMap<String, Vocabulary>>,
}

impl MockSchemaSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schema(self, schema: Schema) -> Self {
        self.schemas.write().expect("lock poisoned").push(schema);
        self
    }

    /// Override the summaries listed for a context/version (otherwise
    /// they are derived from the registered schemas).
    pub fn with_summaries(
        self,
        context: impl Into<String>,
        version: impl Into<String>,
        summaries: Vec<SchemaSummary>,
    ) -> Self {
        self.summaries
            .write()
            .expect("lock poisoned")
            .insert((context.into(), version.into()), summaries);
        self
    }

    pub fn with_vocabulary(self, vocabulary: Vocabulary) -> Self {
        self.vocabularies
            .write()
            .expect("lock poisoned")
            .insert(vocabulary.reference.clone(), vocabulary);
        self
    }
}

#[async_trait]
impl SchemaSource for MockSchemaSource {
    async fn load_schema(
        &self,
        context: &str,
        version: &str,
        file: &str,
    ) -> SchemaResult<Schema> {
        self.schemas
            .read()
            .expect("lock poisoned")
            .iter()
            .find(|s| s.context == context && s.version == version && s.file == file)
            .cloned()
            .ok_or_else(|| SchemaError::NotFound {
                context: context.to_string(),
                version: version.to_string(),
                file: file.to_string(),
            })
    }

    async fn list_versions(&self, context: &str) -> SchemaResult<Vec<String>> {
        let versions: Vec<String> = self
            .schemas
            .read()
            .expect("lock poisoned")
            .iter()
            .filter(|s| s.context == context)
            .map(|s| s.version.clone())
            .fold(Vec::new(), |mut acc, v| {
                if !acc.contains(&v) {
                    acc.push(v);
                }
                acc
            });

        if versions.is_empty() {
            return Err(SchemaError::UnknownContext(context.to_string()));
        }
        Ok(versions)
    }

    async fn list_schemas(
        &self,
        context: &str,
        version: &str,
    ) -> SchemaResult<Vec<SchemaSummary>> {
        let key = (context.to_string(), version.to_string());
        if let Some(summaries) = self.summaries.read().expect("lock poisoned").get(&key) {
            return Ok(summaries.clone());
        }

        Ok(self
            .schemas
            .read()
            .expect("lock poisoned")
            .iter()
            .filter(|s| s.context == context && s.version == version)
            .map(|s| SchemaSummary {
                file: s.file.clone(),
                labels: s.labels.clone(),
                field_count: s.fields.len(),
                keywords: vec![],
            })
            .collect())
    }

    async fn load_vocabulary(&self, reference: &str) -> SchemaResult<Vocabulary> {
        self.vocabularies
            .read()
            .expect("lock poisoned")
            .get(reference)
            .cloned()
            .ok_or_else(|| SchemaError::VocabularyNotFound(reference.to_string()))
    }
}

/// Mock geocoder resolving only exact address matches.
#[derive(Default)]
pub struct MockGeocoder {
    locations: RwLock<HashMap<String, GeoPoint>>,
    calls: RwLock<Vec<String>>,
}

impl MockGeocoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_location(self, address: impl Into<String>, point: GeoPoint) -> Self {
        self.locations
            .write()
            .expect("lock poisoned")
            .insert(address.into(), point);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.read().expect("lock poisoned").len()
    }
}

#[async_trait]
impl Geocoder for MockGeocoder {
    async fn geocode(&self, address: &str) -> Option<GeoPoint> {
        self.calls
            .write()
            .expect("lock poisoned")
            .push(address.to_string());
        self.locations
            .read()
            .expect("lock poisoned")
            .get(address)
            .copied()
    }
}

/// Mock repository storing node metadata in memory.
#[derive(Default)]
pub struct MockRepository {
    nodes: RwLock<HashMap<String, MetadataRecord>>,
    failing_fields: RwLock<HashSet<String>>,
}

impl MockRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a node with stored metadata.
    pub fn with_node(self, node_id: impl Into<String>, record: MetadataRecord) -> Self {
        self.nodes
            .write()
            .expect("lock poisoned")
            .insert(node_id.into(), record);
        self
    }

    /// Make writes to this repository field fail.
    pub fn with_failing_field(self, field: impl Into<String>) -> Self {
        self.failing_fields
            .write()
            .expect("lock poisoned")
            .insert(field.into());
        self
    }

    /// Snapshot of a node's stored metadata.
    pub fn node(&self, node_id: &str) -> MetadataRecord {
        self.nodes
            .read()
            .expect("lock poisoned")
            .get(node_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl Repository for MockRepository {
    async fn write_fields(
        &self,
        node_id: &str,
        fields: &[(String, Value)],
    ) -> crate::error::Result<Vec<FieldWriteResult>> {
        let failing = self.failing_fields.read().expect("lock poisoned").clone();
        let mut nodes = self.nodes.write().expect("lock poisoned");
        let record = nodes.entry(node_id.to_string()).or_default();

        Ok(fields
            .iter()
            .map(|(field, value)| {
                if failing.contains(field) {
                    FieldWriteResult::failed(field, "write rejected")
                } else {
                    record.insert(field.clone(), value.clone());
                    FieldWriteResult::ok(field)
                }
            })
            .collect())
    }

    async fn read_fields(&self, node_id: &str) -> crate::error::Result<MetadataRecord> {
        Ok(self.node(node_id))
    }
}
