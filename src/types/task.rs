//! Per-field extraction tasks and their outcomes.

use std::time::Duration;

use serde_json::Value;

use crate::types::schema::FieldSpec;

/// How a field should be handled in one extraction run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskMode {
    /// Extract from the source text, re-deriving any existing value
    FreshExtract,

    /// Explicitly requested re-extraction of an existing field
    Regenerate,

    /// Copy the existing value verbatim; no completion call
    CarryForward,
}

/// One field to extract.
#[derive(Debug, Clone)]
pub struct ExtractionTask {
    pub field: FieldSpec,
    pub mode: TaskMode,

    /// Prior value from existing metadata, if any
    pub existing: Option<Value>,
}

impl ExtractionTask {
    /// Whether this task issues a completion call.
    pub fn needs_extraction(&self) -> bool {
        !matches!(self.mode, TaskMode::CarryForward)
    }
}

/// Per-field result of a completed (or failed) task.
///
/// Immutable once created; owned by the orchestrator for the duration
/// of one request.
#[derive(Debug, Clone)]
pub struct ExtractionOutcome {
    pub field_id: String,

    /// Value as returned by the completion service, if any
    pub raw: Option<Value>,

    /// Normalized value, if the raw value normalized to something non-empty
    pub value: Option<Value>,

    pub success: bool,

    pub error: Option<String>,

    pub elapsed: Duration,
}

impl ExtractionOutcome {
    /// Outcome for a successful extraction.
    pub fn success(
        field_id: impl Into<String>,
        raw: Option<Value>,
        value: Option<Value>,
        elapsed: Duration,
    ) -> Self {
        Self {
            field_id: field_id.into(),
            raw,
            value,
            success: true,
            error: None,
            elapsed,
        }
    }

    /// Outcome for a permanently failed extraction.
    pub fn failure(field_id: impl Into<String>, error: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            field_id: field_id.into(),
            raw: None,
            value: None,
            success: false,
            error: Some(error.into()),
            elapsed,
        }
    }
}
