//! String similarity scoring.

/// A string similarity metric producing scores in [0, 1].
///
/// The matcher is generic over this so the metric can be swapped
/// without touching normalization or validation logic.
pub trait Similarity: Send + Sync {
    /// Score two strings; 1.0 means identical, 0.0 means unrelated.
    fn score(&self, a: &str, b: &str) -> f64;
}

/// Normalized Levenshtein similarity: 1 − distance / max(len).
#[derive(Debug, Clone, Copy, Default)]
pub struct Levenshtein;

impl Similarity for Levenshtein {
    fn score(&self, a: &str, b: &str) -> f64 {
        let a_len = a.chars().count();
        let b_len = b.chars().count();
        if a_len == 0 && b_len == 0 {
            return 1.0;
        }
        let max_len = a_len.max(b_len);
        1.0 - levenshtein_distance(a, b) as f64 / max_len as f64
    }
}

/// Levenshtein edit distance over chars, two-row dynamic programming.
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0usize; b.len() + 1];

    for (i, &ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let insertion = previous[j + 1] + 1;
            let deletion = current[j] + 1;
            let substitution = previous[j] + usize::from(ca != cb);
            current[j + 1] = insertion.min(deletion).min(substitution);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_basics() {
        assert_eq!(levenshtein_distance("", ""), 0);
        assert_eq!(levenshtein_distance("abc", ""), 3);
        assert_eq!(levenshtein_distance("", "abc"), 3);
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
        assert_eq!(levenshtein_distance("workshop", "worksho"), 1);
    }

    #[test]
    fn test_distance_unicode() {
        // umlauts count as single edits, not byte-level ones
        assert_eq!(levenshtein_distance("märz", "marz"), 1);
    }

    #[test]
    fn test_score_range() {
        let sim = Levenshtein;
        assert_eq!(sim.score("workshop", "workshop"), 1.0);
        assert_eq!(sim.score("", ""), 1.0);

        let score = sim.score("worksho", "workshop");
        assert!(score > 0.85 && score < 1.0);

        assert!(sim.score("abc", "xyz") < 0.01);
    }
}
