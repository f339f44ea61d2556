//! Configuration types for the extraction pipeline.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Hard bounds on the worker pool size.
pub const MIN_WORKERS: usize = 1;
pub const MAX_WORKERS: usize = 20;

/// Configuration for the extraction orchestrator.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Parallel extraction workers, clamped to [1, 20]
    pub max_workers: usize,

    /// Retry attempts per field after the first failure
    pub max_retries: u32,

    /// Base delay between retries; attempt n waits n × this
    pub retry_delay: Duration,

    /// Overall request deadline. In-flight tasks past the deadline are
    /// abandoned; completed outcomes are kept.
    pub request_timeout: Option<Duration>,

    /// Extraction language (prompt/label selection)
    pub language: String,

    /// Enrich geo fields holding address text via the geocoder
    pub enable_geocoding: bool,

    /// Apply type-driven normalization to extracted values
    pub normalize_output: bool,

    /// Fuzzy-match vocabulary values during normalization
    pub normalize_vocabularies: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_workers: 10,
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
            request_timeout: Some(Duration::from_secs(60)),
            language: "de".to_string(),
            enable_geocoding: true,
            normalize_output: true,
            normalize_vocabularies: true,
        }
    }
}

impl PipelineConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the worker pool size (clamped on use).
    pub fn with_max_workers(mut self, workers: usize) -> Self {
        self.max_workers = workers;
        self
    }

    /// Set the per-field retry limit.
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the base retry delay.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Set the overall request deadline.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Remove the request deadline.
    pub fn without_timeout(mut self) -> Self {
        self.request_timeout = None;
        self
    }

    /// Set the extraction language.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Disable geocoding enrichment.
    pub fn without_geocoding(mut self) -> Self {
        self.enable_geocoding = false;
        self
    }

    /// Effective worker count.
    pub fn workers(&self) -> usize {
        self.max_workers.clamp(MIN_WORKERS, MAX_WORKERS)
    }
}

/// Thresholds for fuzzy vocabulary matching.
///
/// The defaults are design values, not reverse-engineered constants;
/// both thresholds are intentionally configurable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchConfig {
    /// Minimum similarity to accept a candidate as canonical
    pub accept_threshold: f64,

    /// Minimum similarity for a candidate to appear as a suggestion
    pub suggest_threshold: f64,

    /// Maximum suggestions returned on rejection
    pub max_suggestions: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            accept_threshold: 0.80,
            suggest_threshold: 0.55,
            max_suggestions: 3,
        }
    }
}

impl MatchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the acceptance threshold.
    pub fn with_accept_threshold(mut self, threshold: f64) -> Self {
        self.accept_threshold = threshold;
        self
    }

    /// Set the suggestion threshold.
    pub fn with_suggest_threshold(mut self, threshold: f64) -> Self {
        self.suggest_threshold = threshold;
        self
    }
}

/// Per-request extraction options.
#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    /// Field ids to re-extract; when non-empty, all other fields are
    /// carried forward verbatim from existing metadata
    pub regenerate_fields: Vec<String>,

    /// Re-extract only fields that are empty or absent in existing metadata
    pub regenerate_empty_only: bool,
}

impl ExtractOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Regenerate only the listed fields.
    pub fn regenerate(mut self, fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.regenerate_fields = fields.into_iter().map(|f| f.into()).collect();
        self
    }

    /// Re-extract only empty fields.
    pub fn empty_only(mut self) -> Self {
        self.regenerate_empty_only = true;
        self
    }
}
