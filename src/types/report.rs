//! Validation reports.

use serde::{Deserialize, Serialize};

/// Severity of a validation finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Blocks `valid`
    Error,

    /// Informational; never affects `valid`
    Warning,
}

/// One validation finding against a single field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub field: String,
    pub message: String,
    pub severity: Severity,
}

impl Finding {
    pub fn error(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            severity: Severity::Error,
        }
    }

    pub fn warning(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            severity: Severity::Warning,
        }
    }
}

/// Result of validating a metadata record against a schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    /// True iff the error list is empty; warnings never affect this
    pub valid: bool,

    pub errors: Vec<Finding>,
    pub warnings: Vec<Finding>,

    /// Percentage of required fields present and non-empty,
    /// rounded to one decimal. 100.0 when the schema has no required fields.
    pub coverage: f64,
}

impl ValidationReport {
    /// Build a report from findings, computing `valid` and rounding coverage.
    pub fn new(errors: Vec<Finding>, warnings: Vec<Finding>, coverage: f64) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
            warnings,
            coverage: (coverage * 10.0).round() / 10.0,
        }
    }
}
