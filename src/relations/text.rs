//! Token extraction and text similarity for feature descriptions.

use std::collections::BTreeSet;

/// Words too common to signal shared subject matter. Only words longer
/// than three characters need listing; shorter ones never survive
/// tokenization.
const STOP_WORDS: &[&str] = &[
    "about", "after", "also", "because", "been", "before", "being", "between", "both",
    "could", "does", "doing", "each", "from", "have", "having", "into", "just", "like",
    "made", "make", "many", "more", "most", "much", "must", "only", "other", "over",
    "should", "some", "such", "than", "that", "their", "them", "then", "there", "these",
    "they", "this", "those", "through", "under", "very", "want", "well", "were", "what",
    "when", "where", "which", "while", "will", "with", "would",
];

/// Every lowercase alphanumeric word in order of appearance.
fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(|word| word.to_lowercase())
        .collect()
}

/// The comparable token set of a text: lowercase alphanumeric words longer
/// than three characters, minus stop words.
pub fn tokenize(text: &str) -> BTreeSet<String> {
    words(text)
        .into_iter()
        .filter(|word| word.len() > 3)
        .filter(|word| !STOP_WORDS.contains(&word.as_str()))
        .collect()
}

/// Jaccard index of two token sets. Zero when both are empty; two blank
/// texts are not "identical", they are incomparable.
pub fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    intersection as f64 / union as f64
}

/// Distinct three-word sequences the two texts share, counted over the raw
/// word streams so that matching phrasing counts even through stop words.
fn shared_trigrams(a: &str, b: &str) -> usize {
    fn trigrams(text: &str) -> BTreeSet<Vec<String>> {
        words(text)
            .windows(3)
            .map(|window| window.to_vec())
            .collect()
    }
    trigrams(a).intersection(&trigrams(b)).count()
}

/// Ceiling for the accumulated trigram bonus, so repeated phrasing cannot
/// outvote the token-set body of the score.
const TRIGRAM_BONUS_CAP: f64 = 0.3;

/// Similarity of two texts in `[0, 1]`: token-set Jaccard plus +0.1 for
/// each shared three-word sequence (capped), clamped to 1.0.
pub fn similarity(a: &str, b: &str) -> f64 {
    let base = jaccard(&tokenize(a), &tokenize(b));
    let bonus = (shared_trigrams(a, b) as f64 * 0.1).min(TRIGRAM_BONUS_CAP);
    (base + bonus).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_drops_short_words_and_stop_words() {
        let tokens = tokenize("The cache must sync with the remote index");
        assert!(tokens.contains("cache"));
        assert!(tokens.contains("sync"));
        assert!(tokens.contains("remote"));
        assert!(tokens.contains("index"));
        assert!(!tokens.contains("the"));
        assert!(!tokens.contains("must"));
        assert!(!tokens.contains("with"));
    }

    #[test]
    fn test_tokenize_lowercases_and_splits_on_punctuation() {
        let tokens = tokenize("Offline-first sync; REAL-TIME updates!");
        assert!(tokens.contains("offline"));
        assert!(tokens.contains("first"));
        assert!(tokens.contains("sync"));
        assert!(tokens.contains("real"));
        assert!(tokens.contains("time"));
        assert!(tokens.contains("updates"));
    }

    #[test]
    fn test_jaccard_of_empty_sets_is_zero() {
        assert_eq!(jaccard(&BTreeSet::new(), &BTreeSet::new()), 0.0);
    }

    #[test]
    fn test_jaccard_of_identical_sets_is_one() {
        let set = tokenize("search indexing pipeline");
        assert_eq!(jaccard(&set, &set), 1.0);
    }

    #[test]
    fn test_similarity_of_identical_text_is_one() {
        let text = "users cannot recover forgotten passwords without support";
        assert_eq!(similarity(text, text), 1.0);
    }

    #[test]
    fn test_similarity_of_unrelated_text_is_zero() {
        assert_eq!(
            similarity("render vector tiles offline", "invoice payment reminders"),
            0.0
        );
    }

    #[test]
    fn test_shared_phrase_earns_bonus() {
        // Both pairs share the same three tokens out of five; only the
        // second keeps them in the same order.
        let scrambled = similarity(
            "render vector tiles in the evening",
            "tiles vector render in the morning",
        );
        let phrased = similarity(
            "render vector tiles in the evening",
            "render vector tiles in the morning",
        );
        assert!(phrased > scrambled);
    }

    #[test]
    fn test_trigram_bonus_is_capped() {
        // Five shared trigrams in the common prefix, but the bonus may
        // contribute at most 0.3 on top of the Jaccard base.
        let a = "alpha beta gamma delta epsilon zeta eta theta iota kappa";
        let b = "alpha beta gamma delta epsilon zeta eta unrelated words here";
        let score = similarity(a, b);
        let base = jaccard(&tokenize(a), &tokenize(b));
        assert!((score - (base + 0.3)).abs() < 1e-9);
    }
}
