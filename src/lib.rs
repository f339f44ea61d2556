//! Schema-Driven Metadata Extraction Pipeline
//!
//! Extracts structured metadata from free text against a declared
//! schema, using a language-model completion service per field,
//! then normalizes, validates, and verifies the result.
//!
//! # Design Philosophy
//!
//! **"One field, one task"**
//!
//! - Schema-driven: the schema decides what gets extracted and how
//!   values are typed, normalized, and validated
//! - Per-field isolation: a failing field never takes its siblings
//!   down; partial results always survive
//! - Deterministic post-processing: everything after the completion
//!   call (normalization, matching, validation, diffing) is pure
//! - Library handles mechanics, collaborators handle wire protocols
//!
//! # Usage
//!
//! ```rust,ignore
//! use metadata_pipeline::{ExtractRequest, Pipeline};
//! use metadata_pipeline::testing::{MockCompletion, MockSchemaSource};
//!
//! let pipeline = Pipeline::new(source, completion);
//!
//! // Resolve schema ("latest"/"auto"), extract, normalize
//! let output = pipeline.extract(&ExtractRequest::new(text)).await?;
//!
//! // Validate and verify
//! let report = pipeline.validate(&output.schema, &output.record).await;
//! let (entries, summary) = pipeline
//!     .diff_against_repository(&output.record, "node-1", &output.schema)
//!     .await?;
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Collaborator abstractions (Completion, SchemaSource, Geocoder, Repository)
//! - [`types`] - Schemas, vocabularies, records, reports, configuration
//! - [`schema`] - Schema store with `latest`/`auto` resolution and caching
//! - [`vocab`] - Fuzzy vocabulary matching
//! - [`normalize`] - Type-driven value normalization
//! - [`pipeline`] - Orchestrator, validator, diff engine, `Pipeline` facade
//! - [`testing`] - Mock collaborators for testing

pub mod error;
pub mod normalize;
pub mod pipeline;
pub mod schema;
pub mod testing;
pub mod traits;
pub mod types;
pub mod vocab;

// Re-export core types at crate root
pub use error::{CompletionError, PipelineError, Result, SchemaError};
pub use pipeline::{
    diff, diff_against_repository, ExtractOutput, ExtractRequest, Orchestrator, Pipeline,
    UploadOutcome, Validator,
};
pub use schema::{SchemaStore, AUTO, LATEST};
pub use traits::{Completion, FieldWriteResult, Geocoder, Repository, SchemaSource};
pub use types::{
    config::{ExtractOptions, MatchConfig, PipelineConfig},
    diff::{DiffEntry, DiffStatus, DiffSummary},
    record::{GeoPoint, MetadataRecord, ModelInfo, ProcessingSummary},
    report::{Finding, Severity, ValidationReport},
    schema::{FieldSpec, FieldType, GroupSpec, Schema, SchemaSummary},
    task::{ExtractionOutcome, ExtractionTask, TaskMode},
    vocabulary::{Concept, Vocabulary},
};
pub use vocab::{match_value, Similarity, Suggestion, VocabularyMatch};
