//! Completion trait for the external language-model service.
//!
//! Prompt construction and the network call belong to implementations;
//! the pipeline only sees typed values and typed failures.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::CompletionResult;
use crate::types::record::ModelInfo;
use crate::types::schema::{FieldSpec, SchemaSummary};

/// Abstraction over the language-model completion service.
///
/// Every method may fail with any of the four retryable completion
/// errors; the orchestrator owns the retry policy.
#[async_trait]
pub trait Completion: Send + Sync {
    /// Extract one field's value from the source text.
    ///
    /// `existing` is the field's prior value, supplied as context when
    /// regenerating; implementations should prefer fresh evidence from
    /// the text but may keep the prior value when the text is silent.
    async fn extract_field(
        &self,
        field: &FieldSpec,
        text: &str,
        existing: Option<&Value>,
        language: &str,
    ) -> CompletionResult<Value>;

    /// Pick the schema file that best describes the text.
    ///
    /// Used by `auto` schema resolution. Returns one of the offered
    /// schema files.
    async fn classify_content(
        &self,
        text: &str,
        options: &[SchemaSummary],
        language: &str,
    ) -> CompletionResult<String>;

    /// Provider and model identity, reported in processing summaries.
    fn model(&self) -> ModelInfo;
}
