//! Text measures used by the validator: sentence counting and lexical overlap.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

static SENTENCE: OnceLock<Regex> = OnceLock::new();
static NON_TOKEN: OnceLock<Regex> = OnceLock::new();

fn sentence_regex() -> &'static Regex {
    SENTENCE.get_or_init(|| Regex::new(r"[^.!?]+[.!?]+").expect("sentence pattern is valid"))
}

fn non_token_regex() -> &'static Regex {
    NON_TOKEN.get_or_init(|| Regex::new(r"[^\p{L}\p{N}'\s]").expect("token pattern is valid"))
}

/// Number of sentences in `text`.
///
/// A sentence is a run of non-terminator characters followed by one or more of
/// `.`, `!`, `?`. Trailing text without a terminator does not count.
pub fn sentence_count(text: &str) -> usize {
    sentence_regex().find_iter(text).count()
}

/// Token set used for similarity.
///
/// Lowercased, punctuation stripped (apostrophes kept), tokens of two
/// characters or fewer dropped.
pub fn tokenize(text: &str) -> HashSet<String> {
    let lowered = text.to_lowercase();
    let cleaned = non_token_regex().replace_all(&lowered, "");
    cleaned
        .split_whitespace()
        .filter(|t| t.chars().count() > 2)
        .map(str::to_string)
        .collect()
}

/// Intersection over union of two token sets; 0 when either is empty.
pub fn jaccard_sets(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let inter = a.intersection(b).count() as f64;
    let union = a.union(b).count() as f64;
    inter / union
}

/// Jaccard similarity of two texts' token sets.
pub fn jaccard(a: &str, b: &str) -> f64 {
    jaccard_sets(&tokenize(a), &tokenize(b))
}
