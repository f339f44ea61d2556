//! Concurrent per-field extraction with retries, a bounded worker
//! pool, and an overall request deadline.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use serde_json::Value;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::normalize::Normalizer;
use crate::traits::{Completion, Geocoder};
use crate::types::config::{ExtractOptions, MatchConfig, PipelineConfig};
use crate::types::record::{is_empty_value, MetadataRecord, ProcessingSummary};
use crate::types::schema::{FieldType, Schema};
use crate::types::task::{ExtractionOutcome, ExtractionTask, TaskMode};
use crate::types::vocabulary::Vocabulary;

/// Runs one extraction request: derives per-field tasks, dispatches
/// them through a bounded worker pool, and aggregates the outcomes
/// into a sparse record plus a processing summary.
///
/// One field's permanent failure never aborts its siblings; the run
/// itself fails only before extraction starts.
pub struct Orchestrator {
    completion: Arc<dyn Completion>,
    geocoder: Option<Arc<dyn Geocoder>>,
    config: PipelineConfig,
    normalizer: Normalizer,
}

impl Orchestrator {
    pub fn new(completion: Arc<dyn Completion>, config: PipelineConfig) -> Self {
        Self {
            completion,
            geocoder: None,
            config,
            normalizer: Normalizer::new(),
        }
    }

    pub fn with_geocoder(mut self, geocoder: Arc<dyn Geocoder>) -> Self {
        self.geocoder = Some(geocoder);
        self
    }

    pub fn with_match_config(mut self, config: MatchConfig) -> Self {
        self.normalizer = Normalizer::new().with_match_config(config);
        self
    }

    /// Extract metadata for one document.
    pub async fn run(
        &self,
        schema: &Schema,
        text: &str,
        existing: Option<&MetadataRecord>,
        options: &ExtractOptions,
        vocabularies: &HashMap<String, Arc<Vocabulary>>,
    ) -> (MetadataRecord, ProcessingSummary) {
        let started = Instant::now();
        let tasks = derive_tasks(schema, existing, options);
        let fields_total = tasks.iter().filter(|t| t.needs_extraction()).count();

        info!(
            schema = %schema.file,
            fields = tasks.len(),
            eligible = fields_total,
            workers = self.config.workers(),
            "extraction started"
        );

        let token = CancellationToken::new();
        let deadline = self.config.request_timeout.map(|timeout| {
            let token = token.clone();
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                token.cancel();
            })
        });

        let semaphore = Arc::new(Semaphore::new(self.config.workers()));
        let futures = tasks.iter().map(|task| {
            let semaphore = Arc::clone(&semaphore);
            let token = token.clone();
            async move {
                if !task.needs_extraction() {
                    return ExtractionOutcome::success(
                        &task.field.id,
                        None,
                        task.existing.clone(),
                        Duration::ZERO,
                    );
                }
                tokio::select! {
                    _ = token.cancelled() => ExtractionOutcome::failure(
                        &task.field.id,
                        "request deadline exceeded",
                        Duration::ZERO,
                    ),
                    outcome = self.extract_one(task, text, semaphore) => outcome,
                }
            }
        });
        let outcomes = join_all(futures).await;

        // don't leave the timer running after a fast request
        if let Some(handle) = deadline {
            handle.abort();
        }

        let (mut record, errors, mut warnings) =
            self.aggregate(schema, existing, &tasks, outcomes, vocabularies);

        if self.config.enable_geocoding {
            self.geocode_addresses(schema, &mut record, &mut warnings).await;
        }

        let fields_extracted = tasks
            .iter()
            .filter(|t| t.needs_extraction())
            .filter(|t| record.get(&t.field.id).is_some_and(|v| !is_empty_value(v)))
            .count();

        let model = self.completion.model();
        let summary = ProcessingSummary {
            success: true,
            fields_extracted,
            fields_total,
            processing_time_ms: started.elapsed().as_millis() as u64,
            provider: model.provider,
            model: model.model,
            errors,
            warnings,
        };

        info!(
            extracted = summary.fields_extracted,
            total = summary.fields_total,
            errors = summary.errors.len(),
            elapsed_ms = summary.processing_time_ms,
            "extraction finished"
        );
        (record, summary)
    }

    async fn extract_one(
        &self,
        task: &ExtractionTask,
        text: &str,
        semaphore: Arc<Semaphore>,
    ) -> ExtractionOutcome {
        let started = Instant::now();
        let _permit = match semaphore.acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => {
                return ExtractionOutcome::failure(&task.field.id, "worker pool closed", started.elapsed())
            }
        };

        let mut attempt = 0u32;
        loop {
            let result = self
                .completion
                .extract_field(&task.field, text, task.existing.as_ref(), &self.config.language)
                .await;

            match result {
                Ok(value) => {
                    debug!(field = %task.field.id, attempt, "field extracted");
                    return ExtractionOutcome::success(
                        &task.field.id,
                        Some(value.clone()),
                        Some(value),
                        started.elapsed(),
                    );
                }
                Err(error) if attempt < self.config.max_retries => {
                    attempt += 1;
                    warn!(field = %task.field.id, attempt, %error, "extraction failed, retrying");
                    tokio::time::sleep(self.config.retry_delay * attempt).await;
                }
                Err(error) => {
                    warn!(field = %task.field.id, %error, "extraction failed permanently");
                    return ExtractionOutcome::failure(
                        &task.field.id,
                        format!("{error} (after {} attempts)", attempt + 1),
                        started.elapsed(),
                    );
                }
            }
        }
    }

    // Merge existing metadata, then fold extraction outcomes over it in
    // schema order. Empty final values are omitted from the record.
    fn aggregate(
        &self,
        schema: &Schema,
        existing: Option<&MetadataRecord>,
        tasks: &[ExtractionTask],
        outcomes: Vec<ExtractionOutcome>,
        vocabularies: &HashMap<String, Arc<Vocabulary>>,
    ) -> (MetadataRecord, Vec<String>, Vec<String>) {
        let mut record = MetadataRecord::new();
        if let Some(existing) = existing {
            for (key, value) in existing {
                if key.starts_with('_') || is_empty_value(value) {
                    continue;
                }
                record.insert(key.clone(), value.clone());
            }
        }

        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        for (task, outcome) in tasks.iter().zip(outcomes) {
            if !outcome.success {
                if let Some(error) = outcome.error {
                    errors.push(format!("{}: {error}", outcome.field_id));
                }
                continue;
            }
            if !task.needs_extraction() {
                continue;
            }

            let raw = outcome.raw.unwrap_or(Value::Null);
            let value = if self.config.normalize_output {
                let vocab = if self.config.normalize_vocabularies {
                    task.field
                        .vocabulary
                        .as_deref()
                        .and_then(|reference| vocabularies.get(reference))
                        .map(Arc::as_ref)
                } else {
                    None
                };
                let normalized = self.normalizer.normalize(&task.field, raw, vocab);
                if let Some(diagnostic) = normalized.diagnostic {
                    let mut message = format!(
                        "{}: '{}' not in vocabulary",
                        task.field.id,
                        normalized.raw.as_str().unwrap_or("?")
                    );
                    if let Some(best) = diagnostic.suggestions.first() {
                        message.push_str(&format!("; closest is '{}'", best.canonical));
                    }
                    warnings.push(message);
                }
                normalized.value
            } else {
                raw
            };

            if is_empty_value(&value) {
                record.shift_remove(&task.field.id);
            } else {
                record.insert(task.field.id.clone(), value);
            }
        }

        // restore schema ordering over the merged record
        let mut ordered = MetadataRecord::new();
        for field in &schema.fields {
            if let Some(value) = record.shift_remove(&field.id) {
                ordered.insert(field.id.clone(), value);
            }
        }
        for (key, value) in record {
            ordered.insert(key, value);
        }

        (ordered, errors, warnings)
    }

    // Resolve geo fields still holding address text into coordinates.
    async fn geocode_addresses(
        &self,
        schema: &Schema,
        record: &mut MetadataRecord,
        warnings: &mut Vec<String>,
    ) {
        let Some(geocoder) = &self.geocoder else { return };

        for field in &schema.fields {
            if field.field_type != FieldType::GeoLocation {
                continue;
            }
            let Some(address) = record.get(&field.id).and_then(Value::as_str) else {
                continue;
            };
            let address = address.to_string();

            match geocoder.geocode(&address).await {
                Some(point) => {
                    debug!(field = %field.id, %address, "address geocoded");
                    record.insert(field.id.clone(), point.to_value());
                }
                None => {
                    warnings.push(format!("{}: could not geocode '{address}'", field.id));
                }
            }
        }
    }
}

// Per-field task modes for one request, in schema order.
fn derive_tasks(
    schema: &Schema,
    existing: Option<&MetadataRecord>,
    options: &ExtractOptions,
) -> Vec<ExtractionTask> {
    schema
        .fields
        .iter()
        .map(|field| {
            let existing_value = existing
                .and_then(|record| record.get(&field.id))
                .filter(|v| !is_empty_value(v))
                .cloned();

            let mode = if !field.ai_fillable {
                TaskMode::CarryForward
            } else if !options.regenerate_fields.is_empty() {
                if options.regenerate_fields.contains(&field.id) {
                    TaskMode::Regenerate
                } else {
                    TaskMode::CarryForward
                }
            } else if options.regenerate_empty_only {
                if existing_value.is_some() {
                    TaskMode::CarryForward
                } else {
                    TaskMode::FreshExtract
                }
            } else {
                TaskMode::FreshExtract
            };

            ExtractionTask {
                field: field.clone(),
                mode,
                existing: existing_value,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompletionError;
    use crate::testing::{MockCompletion, MockGeocoder};
    use crate::types::record::GeoPoint;
    use crate::types::schema::FieldSpec;
    use crate::types::vocabulary::Concept;
    use serde_json::json;
    use std::collections::HashMap as StdHashMap;

    fn schema() -> Schema {
        Schema {
            context: "default".into(),
            version: "1.0.0".into(),
            file: "event.json".into(),
            labels: StdHashMap::new(),
            groups: vec![],
            fields: vec![
                FieldSpec::new("cclom:title", FieldType::Text).required(),
                FieldSpec::new("ccm:event_date", FieldType::Date),
                FieldSpec::new("ccm:format", FieldType::Vocabulary).with_vocabulary("eventFormat"),
            ],
        }
    }

    fn vocabularies() -> HashMap<String, Arc<Vocabulary>> {
        let vocab = Vocabulary::new("eventFormat")
            .with_concept(Concept::new("Workshop"))
            .with_concept(Concept::new("Webinar"));
        HashMap::from([("eventFormat".to_string(), Arc::new(vocab))])
    }

    fn fast_config() -> PipelineConfig {
        PipelineConfig::new()
            .with_retry_delay(Duration::from_millis(1))
            .without_timeout()
    }

    fn full_mock() -> MockCompletion {
        MockCompletion::new()
            .with_value("cclom:title", json!("Rust-Workshop"))
            .with_value("ccm:event_date", json!("15.03.2026"))
            .with_value("ccm:format", json!("workshop"))
    }

    #[tokio::test]
    async fn test_extracts_and_normalizes_all_fields() {
        let orchestrator = Orchestrator::new(Arc::new(full_mock()), fast_config());
        let (record, summary) = orchestrator
            .run(&schema(), "text", None, &ExtractOptions::new(), &vocabularies())
            .await;

        assert_eq!(record["cclom:title"], json!("Rust-Workshop"));
        assert_eq!(record["ccm:event_date"], json!("2026-03-15"));
        assert_eq!(record["ccm:format"], json!("Workshop"));
        assert!(summary.success);
        assert_eq!(summary.fields_extracted, 3);
        assert_eq!(summary.fields_total, 3);
        assert!(summary.errors.is_empty());
    }

    #[tokio::test]
    async fn test_worker_count_does_not_change_result() {
        let vocabs = vocabularies();
        let mut records = Vec::new();
        for workers in [1, 10] {
            let orchestrator = Orchestrator::new(
                Arc::new(full_mock()),
                fast_config().with_max_workers(workers),
            );
            let (record, _) = orchestrator
                .run(&schema(), "text", None, &ExtractOptions::new(), &vocabs)
                .await;
            records.push(record);
        }
        assert_eq!(records[0], records[1]);
    }

    #[tokio::test]
    async fn test_failing_field_does_not_suppress_siblings() {
        let mock = full_mock().with_failure(
            "ccm:event_date",
            CompletionError::Provider("boom".into()),
            usize::MAX,
        );
        let orchestrator = Orchestrator::new(Arc::new(mock), fast_config().with_max_retries(1));
        let (record, summary) = orchestrator
            .run(&schema(), "text", None, &ExtractOptions::new(), &vocabularies())
            .await;

        assert_eq!(record["cclom:title"], json!("Rust-Workshop"));
        assert!(!record.contains_key("ccm:event_date"));
        assert!(summary.success);
        assert_eq!(summary.errors.len(), 1);
        assert!(summary.errors[0].starts_with("ccm:event_date:"));
        assert_eq!(summary.fields_extracted, 2);
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let mock = full_mock().with_failure("cclom:title", CompletionError::RateLimited, 2);
        let orchestrator = Orchestrator::new(Arc::new(mock), fast_config().with_max_retries(3));
        let (record, summary) = orchestrator
            .run(&schema(), "text", None, &ExtractOptions::new(), &vocabularies())
            .await;

        assert_eq!(record["cclom:title"], json!("Rust-Workshop"));
        assert!(summary.errors.is_empty());
    }

    #[tokio::test]
    async fn test_retry_count_observed() {
        let mock = Arc::new(full_mock().with_failure("cclom:title", CompletionError::Timeout, 2));
        let orchestrator = Orchestrator::new(
            Arc::clone(&mock) as Arc<dyn Completion>,
            fast_config().with_max_retries(3),
        );
        orchestrator
            .run(&schema(), "text", None, &ExtractOptions::new(), &vocabularies())
            .await;

        // two failures, then the successful third call
        assert_eq!(mock.calls_for("cclom:title"), 3);
    }

    #[tokio::test]
    async fn test_regenerate_only_listed_fields() {
        let mock = Arc::new(full_mock());
        let orchestrator =
            Orchestrator::new(Arc::clone(&mock) as Arc<dyn Completion>, fast_config());

        let existing: MetadataRecord = [
            ("cclom:title".to_string(), json!("Alter Titel")),
            ("ccm:event_date".to_string(), json!("2025-01-01")),
        ]
        .into_iter()
        .collect();
        let options = ExtractOptions::new().regenerate(["cclom:title"]);

        let (record, summary) = orchestrator
            .run(&schema(), "text", Some(&existing), &options, &vocabularies())
            .await;

        assert_eq!(mock.call_count(), 1);
        assert_eq!(record["cclom:title"], json!("Rust-Workshop"));
        assert_eq!(record["ccm:event_date"], json!("2025-01-01")); // verbatim
        assert_eq!(summary.fields_total, 1);
    }

    #[tokio::test]
    async fn test_regenerate_empty_only() {
        let mock = Arc::new(full_mock());
        let orchestrator =
            Orchestrator::new(Arc::clone(&mock) as Arc<dyn Completion>, fast_config());

        let existing: MetadataRecord =
            [("cclom:title".to_string(), json!("Alter Titel"))].into_iter().collect();
        let options = ExtractOptions::new().empty_only();

        let (record, _) = orchestrator
            .run(&schema(), "text", Some(&existing), &options, &vocabularies())
            .await;

        assert_eq!(record["cclom:title"], json!("Alter Titel"));
        assert_eq!(record["ccm:event_date"], json!("2026-03-15"));
        assert_eq!(mock.calls_for("cclom:title"), 0);
    }

    #[tokio::test]
    async fn test_empty_values_omitted() {
        let mock = MockCompletion::new()
            .with_value("cclom:title", json!("Rust-Workshop"))
            .with_value("ccm:event_date", json!(""));
        let orchestrator = Orchestrator::new(Arc::new(mock), fast_config());
        let (record, summary) = orchestrator
            .run(&schema(), "text", None, &ExtractOptions::new(), &vocabularies())
            .await;

        assert!(!record.contains_key("ccm:event_date"));
        assert!(!record.contains_key("ccm:format")); // mock answered null
        assert_eq!(summary.fields_extracted, 1);
    }

    #[tokio::test]
    async fn test_deadline_keeps_partial_results() {
        let mock = full_mock().with_delay(Duration::from_millis(200));
        let config = fast_config().with_request_timeout(Duration::from_millis(30));
        let orchestrator = Orchestrator::new(Arc::new(mock), config);

        let existing: MetadataRecord =
            [("_source".to_string(), json!("seed")), ("cclom:title".to_string(), json!("Alt"))]
                .into_iter()
                .collect();
        let options = ExtractOptions::new().regenerate(["ccm:event_date"]);

        let (record, summary) = orchestrator
            .run(&schema(), "text", Some(&existing), &options, &vocabularies())
            .await;

        // carried-forward value survives; underscore key does not
        assert_eq!(record["cclom:title"], json!("Alt"));
        assert!(!record.contains_key("_source"));
        assert!(summary.success);
        assert_eq!(summary.errors.len(), 1);
        assert!(summary.errors[0].contains("deadline"));
    }

    #[tokio::test]
    async fn test_deadline_timer_does_not_fire_after_fast_run() {
        let config = fast_config().with_request_timeout(Duration::from_secs(60));
        let orchestrator = Orchestrator::new(Arc::new(full_mock()), config);

        let (record, summary) = orchestrator
            .run(&schema(), "text", None, &ExtractOptions::new(), &vocabularies())
            .await;

        assert_eq!(record.len(), 3);
        assert!(summary.errors.is_empty());
        // the run returns as soon as the fields are done, not at the deadline
        assert!(summary.processing_time_ms < 1_000);
    }

    #[tokio::test]
    async fn test_not_fillable_fields_never_extracted() {
        let mut schema = schema();
        schema.fields[0] = FieldSpec::new("cclom:title", FieldType::Text).not_fillable();

        let mock = Arc::new(full_mock());
        let orchestrator =
            Orchestrator::new(Arc::clone(&mock) as Arc<dyn Completion>, fast_config());
        orchestrator
            .run(&schema, "text", None, &ExtractOptions::new(), &vocabularies())
            .await;

        assert_eq!(mock.calls_for("cclom:title"), 0);
    }

    #[tokio::test]
    async fn test_geocoding_enrichment() {
        let mut schema = schema();
        schema
            .fields
            .push(FieldSpec::new("ccm:venue", FieldType::GeoLocation));

        let mock = full_mock().with_value("ccm:venue", json!("Hauptstraße 1, Berlin"));
        let geocoder =
            MockGeocoder::new().with_location("Hauptstraße 1, Berlin", GeoPoint::new(52.52, 13.405));
        let orchestrator =
            Orchestrator::new(Arc::new(mock), fast_config()).with_geocoder(Arc::new(geocoder));

        let (record, summary) = orchestrator
            .run(&schema, "text", None, &ExtractOptions::new(), &vocabularies())
            .await;

        assert_eq!(record["ccm:venue"]["latitude"], json!(52.52));
        assert!(summary.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_geocoding_miss_is_warning() {
        let mut schema = schema();
        schema
            .fields
            .push(FieldSpec::new("ccm:venue", FieldType::GeoLocation));

        let mock = full_mock().with_value("ccm:venue", json!("Nirgendwo 99"));
        let orchestrator = Orchestrator::new(Arc::new(mock), fast_config())
            .with_geocoder(Arc::new(MockGeocoder::new()));

        let (record, summary) = orchestrator
            .run(&schema, "text", None, &ExtractOptions::new(), &vocabularies())
            .await;

        assert_eq!(record["ccm:venue"], json!("Nirgendwo 99"));
        assert_eq!(summary.warnings.len(), 1);
        assert!(summary.warnings[0].contains("geocode"));
    }

    #[tokio::test]
    async fn test_vocabulary_rejection_becomes_warning() {
        let mock = full_mock().with_value("ccm:format", json!("Vortrag"));
        let orchestrator = Orchestrator::new(Arc::new(mock), fast_config());
        let (record, summary) = orchestrator
            .run(&schema(), "text", None, &ExtractOptions::new(), &vocabularies())
            .await;

        // rejected values keep their raw form
        assert_eq!(record["ccm:format"], json!("Vortrag"));
        assert_eq!(summary.warnings.len(), 1);
        assert!(summary.warnings[0].contains("vocabulary"));
    }
}
