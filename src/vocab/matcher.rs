//! Fuzzy matching of free-text values against closed vocabularies.
//!
//! Pure and deterministic: identical inputs always produce identical
//! output, and no I/O happens here.

use serde::{Deserialize, Serialize};

use crate::types::config::MatchConfig;
use crate::types::vocabulary::Vocabulary;
use crate::vocab::similarity::{Levenshtein, Similarity};

/// Result of matching one raw value against a vocabulary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabularyMatch {
    /// Accepted canonical value, when a candidate cleared the
    /// acceptance threshold
    pub canonical: Option<String>,

    /// Similarity of the best candidate (1.0 for exact hits)
    pub confidence: f64,

    /// Near-misses when no candidate was accepted, best first
    pub suggestions: Vec<Suggestion>,
}

impl VocabularyMatch {
    /// Whether a canonical value was accepted.
    pub fn is_accepted(&self) -> bool {
        self.canonical.is_some()
    }
}

/// A rejected candidate close enough to be worth surfacing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub canonical: String,
    pub score: f64,
}

/// Match a raw value against a vocabulary with the default
/// Levenshtein similarity.
pub fn match_value(raw: &str, vocabulary: &Vocabulary, config: &MatchConfig) -> VocabularyMatch {
    match_value_with(raw, vocabulary, config, &Levenshtein)
}

/// Match a raw value using a caller-supplied similarity metric.
pub fn match_value_with<S: Similarity>(
    raw: &str,
    vocabulary: &Vocabulary,
    config: &MatchConfig,
    similarity: &S,
) -> VocabularyMatch {
    let needle = raw.trim().to_lowercase();

    // Exact case-insensitive hit on any surface form; first match wins.
    for concept in &vocabulary.concepts {
        if concept
            .surface_forms()
            .any(|form| form.to_lowercase() == needle)
        {
            return VocabularyMatch {
                canonical: Some(concept.canonical.clone()),
                confidence: 1.0,
                suggestions: vec![],
            };
        }
    }

    // Best similarity per concept across all of its surface forms.
    let mut scored: Vec<(f64, &str)> = vocabulary
        .concepts
        .iter()
        .map(|concept| {
            let best = concept
                .surface_forms()
                .map(|form| similarity.score(&needle, &form.to_lowercase()))
                .fold(0.0_f64, f64::max);
            (best, concept.canonical.as_str())
        })
        .collect();

    // Descending score; ties broken by shorter canonical, then lexical.
    scored.sort_by(|(sa, ca), (sb, cb)| {
        sb.partial_cmp(sa)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(ca.len().cmp(&cb.len()))
            .then(ca.cmp(cb))
    });

    let best_score = scored.first().map(|(s, _)| *s).unwrap_or(0.0);

    if best_score >= config.accept_threshold {
        if let Some((score, canonical)) = scored.first() {
            return VocabularyMatch {
                canonical: Some((*canonical).to_string()),
                confidence: *score,
                suggestions: vec![],
            };
        }
    }

    let suggestions = scored
        .into_iter()
        .filter(|(score, _)| *score >= config.suggest_threshold)
        .take(config.max_suggestions)
        .map(|(score, canonical)| Suggestion {
            canonical: canonical.to_string(),
            score,
        })
        .collect();

    VocabularyMatch {
        canonical: None,
        confidence: best_score,
        suggestions,
    }
}
