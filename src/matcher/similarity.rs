//! Line similarity scoring for the anchor-based strategies.

/// Minimum mean interior similarity for a block-anchor candidate.
///
/// Interior lines are scored pairwise by normalized Levenshtein similarity
/// and averaged over the longer of the two interiors, so missing or surplus
/// lines count as zero.
pub const BLOCK_ANCHOR_THRESHOLD: f64 = 0.6;

/// Minimum similarity for each context line of a context-aware match.
pub const CONTEXT_LINE_THRESHOLD: f64 = 0.8;

/// Minimum fraction of interior lines that must match exactly (after trim)
/// in a context-aware match. Lines blank on both sides are not counted.
pub const CONTEXT_INTERIOR_THRESHOLD: f64 = 0.5;

/// Similarity of two lines in `[0, 1]`, ignoring surrounding whitespace.
pub fn line_similarity(a: &str, b: &str) -> f64 {
    let (a, b) = (a.trim(), b.trim());
    if a == b {
        return 1.0;
    }
    strsim::normalized_levenshtein(a, b)
}

/// Whether two lines reach `threshold` similarity.
///
/// Skips the edit-distance computation when the length ratio alone rules
/// the pair out: similarity can never exceed `shorter / longer`.
pub fn at_least(a: &str, b: &str, threshold: f64) -> bool {
    let (a, b) = (a.trim(), b.trim());
    if a == b {
        return true;
    }
    let (la, lb) = (a.chars().count(), b.chars().count());
    let longer = la.max(lb);
    if (la.min(lb) as f64) < threshold * longer as f64 {
        return false;
    }
    strsim::normalized_levenshtein(a, b) >= threshold
}

/// Mean pairwise similarity of two interiors, averaged over the longer one.
pub fn interior_score(search: &[&str], candidate: &[&str]) -> f64 {
    let pairs = search.len().max(candidate.len());
    if pairs == 0 {
        return 1.0;
    }
    let total: f64 = search
        .iter()
        .zip(candidate)
        .map(|(a, b)| line_similarity(a, b))
        .sum();
    total / pairs as f64
}
