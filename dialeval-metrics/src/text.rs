//! Token-level helpers shared by the n-gram metrics.

use std::collections::HashMap;

/// Count the n-grams of a token sequence.
pub fn ngram_counts(tokens: &[String], n: usize) -> HashMap<&[String], usize> {
    let mut counts = HashMap::new();
    if n == 0 {
        return counts;
    }
    for gram in tokens.windows(n) {
        *counts.entry(gram).or_insert(0) += 1;
    }
    counts
}

/// Number of n-grams in a sequence of `len` tokens.
pub fn ngram_total(len: usize, n: usize) -> usize {
    if n == 0 {
        0
    } else {
        len.saturating_sub(n - 1)
    }
}

/// Matches between hypothesis and reference n-grams, each clipped by the
/// reference count.
pub fn clipped_overlap(hypothesis: &[String], reference: &[String], n: usize) -> usize {
    let reference_counts = ngram_counts(reference, n);
    ngram_counts(hypothesis, n)
        .into_iter()
        .map(|(gram, count)| count.min(reference_counts.get(gram).copied().unwrap_or(0)))
        .sum()
}

/// Split a line on whitespace into owned tokens.
pub fn tokenize(line: &str) -> Vec<String> {
    line.split_whitespace().map(str::to_string).collect()
}
