//! Fuzzy string comparison for keeping quiz options distinguishable

use strsim::{jaro_winkler, normalized_levenshtein};

/// Similarity at or above which two options count as the same answer
pub const NEAR_DUPLICATE_THRESHOLD: f64 = 0.9;

/// Weighted similarity of two strings in [0, 1], ignoring case and padding
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    if a == b {
        return 1.0;
    }
    // Jaro-Winkler favours shared prefixes, which is how inflected forms differ.
    normalized_levenshtein(&a, &b) * 0.4 + jaro_winkler(&a, &b) * 0.6
}

/// True when `candidate` would read as the same option as `answer`
/// ("apple" vs "Apples", "color" vs "colour")
pub fn is_near_duplicate(candidate: &str, answer: &str) -> bool {
    similarity(candidate, answer) >= NEAR_DUPLICATE_THRESHOLD
}
