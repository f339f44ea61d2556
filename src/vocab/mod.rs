//! Fuzzy vocabulary matching.

pub mod matcher;
pub mod similarity;

pub use matcher::{match_value, match_value_with, Suggestion, VocabularyMatch};
pub use similarity::{levenshtein_distance, Levenshtein, Similarity};
