//! Text and structure similarity between two sections, as percentages in `[0, 100]`.

use crate::node::Section;
use difflib::sequencematcher::SequenceMatcher;
use similar::{capture_diff_slices, Algorithm, DiffOp};
use std::hash::Hash;

/// Length of the longest common subsequence of `a` and `b`.
///
/// Myers yields a minimal insert/delete script, so its equal runs add up to an exact LCS.
fn common_len<T: Hash + Eq + Ord>(a: &[T], b: &[T]) -> usize {
    capture_diff_slices(Algorithm::Myers, a, b)
        .iter()
        .map(|op| match op {
            DiffOp::Equal { len, .. } => *len,
            _ => 0,
        })
        .sum()
}

/// Total size of the Ratcliff/Obershelp matching blocks of `a` against `b`.
fn block_len<T: Hash + Eq>(a: &[T], b: &[T]) -> usize {
    SequenceMatcher::new(a, b)
        .get_matching_blocks()
        .iter()
        .map(|m| m.size)
        .sum()
}

fn ratio_of(matched: usize, total: usize) -> f64 {
    if total == 0 {
        return 1.0;
    }
    2.0 * matched as f64 / total as f64
}

/// Indel ratio `2*M/T` in `[0, 1]`, `M` being the LCS length; both empty counts as identical.
pub fn sequence_ratio<T: Hash + Eq + Ord>(a: &[T], b: &[T]) -> f64 {
    ratio_of(common_len(a, b), a.len() + b.len())
}

/// Ratcliff/Obershelp ratio in `[0, 1]`, taking the better of the two orientations.
///
/// Matching blocks depend on which side is searched first (and long sequences drop
/// popular elements from the second side), so one orientation can undercount.
pub fn block_ratio<T: Hash + Eq>(a: &[T], b: &[T]) -> f64 {
    let matched = block_len(a, b).max(block_len(b, a));
    ratio_of(matched, a.len() + b.len())
}

/// Character-level ratio of two strings scaled to a whole percentage, halves to even.
pub fn text_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    (sequence_ratio(&a, &b) * 100.0).round_ties_even()
}

/// Similarity of the whitespace-stripped visible text.
///
/// Empty/empty is 100, empty/non-empty is 0.
pub fn text_similarity(a: &Section, b: &Section) -> f64 {
    match (a.text.is_empty(), b.text.is_empty()) {
        (true, true) => 100.0,
        (true, false) | (false, true) => 0.0,
        (false, false) => text_ratio(&a.text, &b.text),
    }
}

/// Similarity of the ordered descendant tag-name sequences.
///
/// Order-sensitive: reordering descendants changes the score.
pub fn structure_similarity(a: &Section, b: &Section) -> f64 {
    match (a.tags.is_empty(), b.tags.is_empty()) {
        (true, true) => 100.0,
        (true, false) | (false, true) => 0.0,
        (false, false) => block_ratio(&a.tags, &b.tags) * 100.0,
    }
}
