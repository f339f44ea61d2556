//! Source trait for schema and vocabulary artifacts.

use async_trait::async_trait;

use crate::error::SchemaResult;
use crate::types::schema::{Schema, SchemaSummary};
use crate::types::vocabulary::Vocabulary;

/// Abstraction over wherever schemas and vocabularies live
/// (filesystem, registry service, bundled resources).
///
/// Implementations deal in concrete versions and file names only;
/// `latest`/`auto` resolution happens in the `SchemaStore` above them.
#[async_trait]
pub trait SchemaSource: Send + Sync {
    /// Load one schema artifact.
    async fn load_schema(&self, context: &str, version: &str, file: &str)
        -> SchemaResult<Schema>;

    /// All versions available for a context, in no particular order.
    async fn list_versions(&self, context: &str) -> SchemaResult<Vec<String>>;

    /// Summaries of the schemas available under a concrete version,
    /// in source order.
    async fn list_schemas(&self, context: &str, version: &str)
        -> SchemaResult<Vec<SchemaSummary>>;

    /// Load a vocabulary by reference.
    async fn load_vocabulary(&self, reference: &str) -> SchemaResult<Vocabulary>;
}
