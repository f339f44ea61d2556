//! Expected-vs-actual diff entries.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Classification of one field in an expected-vs-actual comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffStatus {
    /// Present in both with equal canonicalized value
    Match,

    /// Present in both but differing
    Mismatch,

    /// Present only in expected, and the field maps to a repository field
    MissingInRepo,

    /// Present only in actual
    ExtraInRepo,

    /// Present only in expected, but never meant to be persisted
    NotWritten,
}

/// One field's comparison result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffEntry {
    pub field: String,
    pub status: DiffStatus,
    pub expected: Option<Value>,
    pub actual: Option<Value>,
}

/// Tally of diff entries per status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSummary {
    pub matches: usize,
    pub mismatches: usize,
    pub missing_in_repo: usize,
    pub extra_in_repo: usize,
    pub not_written: usize,
}

impl DiffSummary {
    /// Tally a list of entries.
    pub fn from_entries(entries: &[DiffEntry]) -> Self {
        let mut summary = Self::default();
        for entry in entries {
            match entry.status {
                DiffStatus::Match => summary.matches += 1,
                DiffStatus::Mismatch => summary.mismatches += 1,
                DiffStatus::MissingInRepo => summary.missing_in_repo += 1,
                DiffStatus::ExtraInRepo => summary.extra_in_repo += 1,
                DiffStatus::NotWritten => summary.not_written += 1,
            }
        }
        summary
    }

    /// Whether every persisted field matched.
    pub fn is_clean(&self) -> bool {
        self.mismatches == 0 && self.missing_in_repo == 0 && self.extra_in_repo == 0
    }
}
