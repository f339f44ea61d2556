//! Read-through cache and resolution layer over a `SchemaSource`.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::{SchemaError, SchemaResult};
use crate::traits::{Completion, SchemaSource};
use crate::types::schema::{Schema, SchemaKey, SchemaSummary};
use crate::types::vocabulary::Vocabulary;

/// Version alias resolving to the highest available version.
pub const LATEST: &str = "latest";

/// Schema-file alias resolving via content-type detection.
pub const AUTO: &str = "auto";

/// Caching schema/vocabulary store.
///
/// Resolves the `latest` version alias and the `auto` schema-file
/// alias, then caches resolved artifacts by concrete key. Cached
/// entries are shared as `Arc`s; the cache is never invalidated within
/// a store's lifetime.
pub struct SchemaStore<S: SchemaSource> {
    source: S,
    schemas: RwLock<HashMap<SchemaKey, Arc<Schema>>>,
    vocabularies: RwLock<HashMap<String, Arc<Vocabulary>>>,
}

impl<S: SchemaSource> SchemaStore<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            schemas: RwLock::new(HashMap::new()),
            vocabularies: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve and load a schema.
    ///
    /// `version` may be `latest`; `file` may be `auto`, in which case
    /// the completion service classifies `text` against the available
    /// schemas, with keyword scoring as the fallback when
    /// classification fails or answers off-list.
    pub async fn resolve(
        &self,
        context: &str,
        version: &str,
        file: &str,
        completion: &dyn Completion,
        text: &str,
        language: &str,
    ) -> SchemaResult<Arc<Schema>> {
        let version = self.resolve_version(context, version).await?;
        let file = self
            .resolve_file(context, &version, file, completion, text, language)
            .await?;

        let key: SchemaKey = (context.to_string(), version.clone(), file.clone());
        if let Some(schema) = self.schemas.read().await.get(&key) {
            debug!(context, %version, %file, "schema cache hit");
            return Ok(Arc::clone(schema));
        }

        let schema = Arc::new(self.source.load_schema(context, &version, &file).await?);
        if let Some(duplicate) = schema.duplicate_field_id() {
            return Err(SchemaError::DuplicateField {
                file: schema.file.clone(),
                field: duplicate.to_string(),
            });
        }
        info!(context, %version, %file, fields = schema.fields.len(), "schema loaded");
        self.schemas.write().await.insert(key, Arc::clone(&schema));
        Ok(schema)
    }

    /// Summaries of the schemas available under a context/version
    /// (version may be `latest`).
    pub async fn list(&self, context: &str, version: &str) -> SchemaResult<Vec<SchemaSummary>> {
        let version = self.resolve_version(context, version).await?;
        self.source.list_schemas(context, &version).await
    }

    /// Load a vocabulary by reference, cached.
    pub async fn vocabulary(&self, reference: &str) -> SchemaResult<Arc<Vocabulary>> {
        if let Some(vocab) = self.vocabularies.read().await.get(reference) {
            return Ok(Arc::clone(vocab));
        }

        let vocab = Arc::new(self.source.load_vocabulary(reference).await?);
        debug!(reference, concepts = vocab.concepts.len(), "vocabulary loaded");
        self.vocabularies
            .write()
            .await
            .insert(reference.to_string(), Arc::clone(&vocab));
        Ok(vocab)
    }

    async fn resolve_version(&self, context: &str, version: &str) -> SchemaResult<String> {
        if version != LATEST {
            return Ok(version.to_string());
        }

        let mut versions = self.source.list_versions(context).await?;
        versions.sort_by(|a, b| compare_versions(a, b));
        versions
            .pop()
            .ok_or_else(|| SchemaError::UnknownContext(context.to_string()))
    }

    async fn resolve_file(
        &self,
        context: &str,
        version: &str,
        file: &str,
        completion: &dyn Completion,
        text: &str,
        language: &str,
    ) -> SchemaResult<String> {
        if file != AUTO {
            return Ok(file.to_string());
        }

        let summaries = self.source.list_schemas(context, version).await?;
        if summaries.is_empty() {
            return Err(SchemaError::NotFound {
                context: context.to_string(),
                version: version.to_string(),
                file: AUTO.to_string(),
            });
        }

        match completion.classify_content(text, &summaries, language).await {
            Ok(choice) if summaries.iter().any(|s| s.file == choice) => {
                info!(context, version, file = %choice, "content type classified");
                return Ok(choice);
            }
            Ok(choice) => {
                warn!(context, version, %choice, "classifier answered off-list");
            }
            Err(error) => {
                warn!(context, version, %error, "content classification failed");
            }
        }

        Ok(keyword_fallback(&summaries, text))
    }
}

// Numeric-then-lexical ordering per dot-separated segment, so that
// "1.10.0" sorts above "1.9.0".
fn compare_versions(a: &str, b: &str) -> std::cmp::Ordering {
    let parts = |v: &str| -> Vec<(u64, String)> {
        v.split('.')
            .map(|seg| (seg.parse::<u64>().unwrap_or(0), seg.to_string()))
            .collect()
    };
    parts(a).cmp(&parts(b))
}

// Score each candidate by how many of its keywords occur in the text;
// best positive score wins, first candidate otherwise.
fn keyword_fallback(summaries: &[SchemaSummary], text: &str) -> String {
    let haystack = text.to_lowercase();

    let best = summaries
        .iter()
        .map(|summary| {
            let hits = summary
                .keywords
                .iter()
                .filter(|kw| haystack.contains(&kw.to_lowercase()))
                .count();
            (hits, summary)
        })
        .max_by_key(|(hits, _)| *hits);

    match best {
        Some((hits, summary)) if hits > 0 => {
            debug!(file = %summary.file, hits, "keyword fallback matched");
            summary.file.clone()
        }
        _ => summaries[0].file.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockCompletion, MockSchemaSource};
    use crate::types::schema::{FieldSpec, FieldType};
    use std::collections::HashMap as StdHashMap;

    fn schema(version: &str, file: &str) -> Schema {
        Schema {
            context: "default".into(),
            version: version.into(),
            file: file.into(),
            labels: StdHashMap::new(),
            groups: vec![],
            fields: vec![FieldSpec::new("cclom:title", FieldType::Text)],
        }
    }

    fn summary(file: &str, keywords: &[&str]) -> SchemaSummary {
        SchemaSummary {
            file: file.into(),
            labels: StdHashMap::new(),
            field_count: 1,
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_latest_resolves_highest_version() {
        let source = MockSchemaSource::new()
            .with_schema(schema("1.9.0", "event.json"))
            .with_schema(schema("1.10.0", "event.json"))
            .with_schema(schema("1.2.0", "event.json"));
        let store = SchemaStore::new(source);
        let completion = MockCompletion::new();

        let resolved = store
            .resolve("default", "latest", "event.json", &completion, "", "de")
            .await
            .unwrap();
        assert_eq!(resolved.version, "1.10.0");
    }

    #[tokio::test]
    async fn test_auto_uses_classifier() {
        let source = MockSchemaSource::new()
            .with_schema(schema("1.0.0", "event.json"))
            .with_schema(schema("1.0.0", "person.json"));
        let store = SchemaStore::new(source);
        let completion = MockCompletion::new().with_classification("person.json");

        let resolved = store
            .resolve("default", "1.0.0", "auto", &completion, "Profil von ...", "de")
            .await
            .unwrap();
        assert_eq!(resolved.file, "person.json");
    }

    #[tokio::test]
    async fn test_auto_falls_back_to_keywords() {
        let source = MockSchemaSource::new()
            .with_schema(schema("1.0.0", "event.json"))
            .with_schema(schema("1.0.0", "course.json"))
            .with_summaries(
                "default",
                "1.0.0",
                vec![
                    summary("event.json", &["veranstaltung", "termin"]),
                    summary("course.json", &["kurs", "lektion"]),
                ],
            );
        let store = SchemaStore::new(source);
        // classifier not configured, so it errors
        let completion = MockCompletion::new();

        let resolved = store
            .resolve(
                "default",
                "1.0.0",
                "auto",
                &completion,
                "Ein Kurs mit zwölf Lektionen",
                "de",
            )
            .await
            .unwrap();
        assert_eq!(resolved.file, "course.json");
    }

    #[tokio::test]
    async fn test_auto_off_list_answer_falls_back_to_first() {
        let source = MockSchemaSource::new()
            .with_schema(schema("1.0.0", "event.json"))
            .with_schema(schema("1.0.0", "person.json"));
        let store = SchemaStore::new(source);
        let completion = MockCompletion::new().with_classification("nonsense.json");

        let resolved = store
            .resolve("default", "1.0.0", "auto", &completion, "text", "de")
            .await
            .unwrap();
        assert_eq!(resolved.file, "event.json");
    }

    #[tokio::test]
    async fn test_schema_cached_by_concrete_key() {
        let source = MockSchemaSource::new().with_schema(schema("1.0.0", "event.json"));
        let store = SchemaStore::new(source);
        let completion = MockCompletion::new();

        let first = store
            .resolve("default", "1.0.0", "event.json", &completion, "", "de")
            .await
            .unwrap();
        let second = store
            .resolve("default", "latest", "event.json", &completion, "", "de")
            .await
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_duplicate_field_id_rejected() {
        let mut bad = schema("1.0.0", "event.json");
        bad.fields.push(FieldSpec::new("cclom:title", FieldType::Text));
        let store = SchemaStore::new(MockSchemaSource::new().with_schema(bad));
        let completion = MockCompletion::new();

        let result = store
            .resolve("default", "1.0.0", "event.json", &completion, "", "de")
            .await;
        assert!(matches!(
            result,
            Err(SchemaError::DuplicateField { ref field, .. }) if field.as_str() == "cclom:title"
        ));
    }

    #[tokio::test]
    async fn test_unknown_schema_errors() {
        let store = SchemaStore::new(MockSchemaSource::new());
        let completion = MockCompletion::new();

        let result = store
            .resolve("default", "1.0.0", "missing.json", &completion, "", "de")
            .await;
        assert!(matches!(result, Err(SchemaError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_vocabulary_cached() {
        let source = MockSchemaSource::new()
            .with_vocabulary(Vocabulary::new("format"));
        let store = SchemaStore::new(source);

        let first = store.vocabulary("format").await.unwrap();
        let second = store.vocabulary("format").await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        assert!(matches!(
            store.vocabulary("missing").await,
            Err(SchemaError::VocabularyNotFound(_))
        ));
    }
}
