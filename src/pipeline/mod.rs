//! Extraction pipeline: orchestration, validation, verification.

pub mod diff;
pub mod orchestrator;
pub mod validate;

pub use diff::{diff, diff_against_repository};
pub use orchestrator::Orchestrator;
pub use validate::Validator;

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use crate::error::{PipelineError, Result};
use crate::schema::SchemaStore;
use crate::traits::{Completion, FieldWriteResult, Geocoder, Repository, SchemaSource};
use crate::types::config::{ExtractOptions, MatchConfig, PipelineConfig};
use crate::types::diff::{DiffEntry, DiffSummary};
use crate::types::record::{is_empty_value, MetadataRecord, ProcessingSummary};
use crate::types::report::ValidationReport;
use crate::types::schema::{Schema, SchemaSummary};
use crate::types::vocabulary::Vocabulary;

/// One extraction request.
#[derive(Debug, Clone)]
pub struct ExtractRequest {
    /// Schema context; defaults to "default"
    pub context: String,

    /// Concrete version or "latest"
    pub version: String,

    /// Concrete schema file or "auto" for content-type detection
    pub file: String,

    /// Source text to extract from
    pub text: String,

    /// Previously extracted metadata, if any
    pub existing: Option<MetadataRecord>,

    pub options: ExtractOptions,
}

impl ExtractRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            context: "default".to_string(),
            version: crate::schema::LATEST.to_string(),
            file: crate::schema::AUTO.to_string(),
            text: text.into(),
            existing: None,
            options: ExtractOptions::default(),
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_schema_file(mut self, file: impl Into<String>) -> Self {
        self.file = file.into();
        self
    }

    pub fn with_existing(mut self, existing: MetadataRecord) -> Self {
        self.existing = Some(existing);
        self
    }

    pub fn with_options(mut self, options: ExtractOptions) -> Self {
        self.options = options;
        self
    }
}

/// Result of one extraction request.
#[derive(Debug, Clone)]
pub struct ExtractOutput {
    /// The concrete schema the request resolved to
    pub schema: Arc<Schema>,

    pub record: MetadataRecord,
    pub summary: ProcessingSummary,
}

/// Result of writing a record to the repository.
///
/// A failing field never aborts the others; at most one write attempt
/// is made per request.
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    /// True iff every field write succeeded
    pub success: bool,

    /// Fields written successfully
    pub written: usize,

    /// Per-field write failures
    pub field_errors: Vec<FieldWriteResult>,
}

/// Facade over the full pipeline: schema resolution, concurrent
/// extraction, validation, repository upload and verification.
pub struct Pipeline<S: SchemaSource> {
    store: SchemaStore<S>,
    completion: Arc<dyn Completion>,
    geocoder: Option<Arc<dyn Geocoder>>,
    repository: Option<Arc<dyn Repository>>,
    config: PipelineConfig,
    match_config: MatchConfig,
}

impl<S: SchemaSource> Pipeline<S> {
    pub fn new(source: S, completion: Arc<dyn Completion>) -> Self {
        Self {
            store: SchemaStore::new(source),
            completion,
            geocoder: None,
            repository: None,
            config: PipelineConfig::default(),
            match_config: MatchConfig::default(),
        }
    }

    pub fn with_geocoder(mut self, geocoder: Arc<dyn Geocoder>) -> Self {
        self.geocoder = Some(geocoder);
        self
    }

    pub fn with_repository(mut self, repository: Arc<dyn Repository>) -> Self {
        self.repository = Some(repository);
        self
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_match_config(mut self, config: MatchConfig) -> Self {
        self.match_config = config;
        self
    }

    /// The underlying schema store.
    pub fn store(&self) -> &SchemaStore<S> {
        &self.store
    }

    /// Schemas available under a context/version (version may be "latest").
    pub async fn schemas(&self, context: &str, version: &str) -> Result<Vec<SchemaSummary>> {
        Ok(self.store.list(context, version).await?)
    }

    /// Run one extraction request end to end.
    pub async fn extract(&self, request: &ExtractRequest) -> Result<ExtractOutput> {
        let schema = self
            .store
            .resolve(
                &request.context,
                &request.version,
                &request.file,
                self.completion.as_ref(),
                &request.text,
                &self.config.language,
            )
            .await?;

        let vocabularies = self.vocabularies_for(&schema).await;

        let mut orchestrator = Orchestrator::new(Arc::clone(&self.completion), self.config.clone())
            .with_match_config(self.match_config.clone());
        if let Some(geocoder) = &self.geocoder {
            orchestrator = orchestrator.with_geocoder(Arc::clone(geocoder));
        }

        let (record, summary) = orchestrator
            .run(
                &schema,
                &request.text,
                request.existing.as_ref(),
                &request.options,
                &vocabularies,
            )
            .await;

        Ok(ExtractOutput {
            schema,
            record,
            summary,
        })
    }

    /// Validate a record against a schema.
    pub async fn validate(&self, schema: &Schema, record: &MetadataRecord) -> ValidationReport {
        let vocabularies = self.vocabularies_for(schema).await;
        Validator::new()
            .with_match_config(self.match_config.clone())
            .validate(schema, record, &vocabularies)
    }

    /// Compare an expected record against the repository's stored state.
    pub async fn diff_against_repository(
        &self,
        expected: &MetadataRecord,
        node_id: &str,
        schema: &Schema,
    ) -> Result<(Vec<DiffEntry>, DiffSummary)> {
        let repository = self.require_repository()?;
        diff::diff_against_repository(expected, node_id, schema, repository.as_ref()).await
    }

    /// Write a record's persistable fields to a repository node.
    pub async fn upload(
        &self,
        record: &MetadataRecord,
        node_id: &str,
        schema: &Schema,
    ) -> Result<UploadOutcome> {
        let repository = self.require_repository()?;

        let fields: Vec<(String, Value)> = schema
            .fields
            .iter()
            .filter_map(|field| {
                let repo_field = field.repo_field.as_ref()?;
                let value = record.get(&field.id).filter(|v| !is_empty_value(v))?;
                Some((repo_field.clone(), value.clone()))
            })
            .collect();

        if fields.is_empty() {
            return Ok(UploadOutcome {
                success: true,
                written: 0,
                field_errors: vec![],
            });
        }

        let results = repository.write_fields(node_id, &fields).await?;
        let field_errors: Vec<FieldWriteResult> =
            results.iter().filter(|r| !r.success).cloned().collect();
        let written = results.len() - field_errors.len();

        info!(node_id, written, failed = field_errors.len(), "metadata written");
        Ok(UploadOutcome {
            success: field_errors.is_empty(),
            written,
            field_errors,
        })
    }

    fn require_repository(&self) -> Result<&Arc<dyn Repository>> {
        self.repository
            .as_ref()
            .ok_or_else(|| PipelineError::Repository("no repository configured".into()))
    }

    // Resolve every vocabulary the schema references. A missing
    // vocabulary disables matching for its fields but never fails
    // the request.
    async fn vocabularies_for(&self, schema: &Schema) -> HashMap<String, Arc<Vocabulary>> {
        let mut vocabularies = HashMap::new();
        for field in &schema.fields {
            let Some(reference) = &field.vocabulary else { continue };
            if vocabularies.contains_key(reference) {
                continue;
            }
            match self.store.vocabulary(reference).await {
                Ok(vocab) => {
                    vocabularies.insert(reference.clone(), vocab);
                }
                Err(error) => {
                    warn!(%reference, %error, "vocabulary unavailable, matching disabled");
                }
            }
        }
        vocabularies
    }
}
