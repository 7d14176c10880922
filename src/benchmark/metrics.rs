//! Quality and pruning metrics for threshold search.
//!
//! Unlike top-k ANN evaluation, a threshold query has a well-defined answer
//! set, so recall and precision are computed against the full ground truth
//! rather than at a cutoff k.

use crate::strategy::{MatchSet, StrategyStats};

/// Fraction of true matches that were retrieved.
///
/// recall = |retrieved ∩ ground_truth| / |ground_truth|
///
/// Returns 1.0 when the ground truth is empty (nothing to miss).
pub fn recall(ground_truth: &MatchSet, retrieved: &MatchSet) -> f64 {
    if ground_truth.is_empty() {
        return 1.0;
    }
    let found = retrieved.ids();
    let hits = ground_truth.ids().intersection(&found).count();
    hits as f64 / ground_truth.len() as f64
}

/// Fraction of retrieved items that are true matches.
///
/// precision = |retrieved ∩ ground_truth| / |retrieved|
///
/// Returns 1.0 when nothing was retrieved.
pub fn precision(ground_truth: &MatchSet, retrieved: &MatchSet) -> f64 {
    if retrieved.is_empty() {
        return 1.0;
    }
    let truth = ground_truth.ids();
    let hits = retrieved.ids().intersection(&truth).count();
    hits as f64 / retrieved.len() as f64
}

/// Fraction of the corpus the store did not have to evaluate.
pub fn pruning_ratio(stats: &StrategyStats, corpus_size: usize) -> f64 {
    if corpus_size == 0 {
        return 0.0;
    }
    1.0 - (stats.examined.min(corpus_size) as f64 / corpus_size as f64)
}
