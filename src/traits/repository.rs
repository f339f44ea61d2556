//! Repository trait for reading and writing persisted metadata.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::types::record::MetadataRecord;

/// Result of writing one field to the repository.
#[derive(Debug, Clone)]
pub struct FieldWriteResult {
    pub field: String,
    pub success: bool,
    pub error: Option<String>,
}

impl FieldWriteResult {
    pub fn ok(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            success: true,
            error: None,
        }
    }

    pub fn failed(field: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Abstraction over the target repository's read/write surface.
///
/// Individual field write failures must not abort the rest of the
/// write — the per-field isolation mirrors the orchestrator's policy.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Write fields to a node, reporting per-field success.
    ///
    /// Returns `Err` only when the node itself is unreachable.
    async fn write_fields(
        &self,
        node_id: &str,
        fields: &[(String, Value)],
    ) -> Result<Vec<FieldWriteResult>>;

    /// Read a node's stored field values.
    async fn read_fields(&self, node_id: &str) -> Result<MetadataRecord>;
}
