//! Size and prefix filtering: sound candidate pruning before exact verification.
//!
//! For a query `Q` with `q = |Q|` features and threshold `t`, any candidate
//! `C` with `T(Q, C) = |Q∩C| / (|Q| + |C| - |Q∩C|) >= t` satisfies
//!
//! ```text
//! ceil(t * q) <= |C| <= floor(q / t)
//! ```
//!
//! because `|Q∩C| <= min(q, |C|)`. The lower bound is also the minimum overlap
//! a match needs. If the query's features are ordered rarest first, the
//! first `q - minSize + 1` of them form a prefix that every match must hit:
//! the remaining `minSize - 1` features are too few to reach the minimum
//! overlap on their own.
//!
//! Both bounds are exact (no false negatives). They only ever prune; the
//! final decision is always made by [`crate::similarity::SimilarityEvaluator`].
//!
//! # References
//!
//! - Chaudhuri, Ganti, Kaushik (2006). "A Primitive Operator for Similarity
//!   Joins in Data Cleaning."
//! - Swamidass, Baldi (2007). "Bounds and Algorithms for Fast Exact Searches
//!   of Chemical Fingerprints in Linear and Sublinear Time."

use crate::fingerprint::{FeatureId, Item};
use crate::threshold::Threshold;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Inclusive range of admissible candidate feature counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeRange {
    pub min: usize,
    pub max: usize,
}

impl SizeRange {
    pub fn contains(&self, feature_count: usize) -> bool {
        self.min <= feature_count && feature_count <= self.max
    }

    pub fn is_empty(&self) -> bool {
        self.min > self.max
    }
}

/// Prefix features; most thresholds of interest keep this short.
pub type Prefix = SmallVec<[FeatureId; 16]>;

/// Output of [`CandidateFilter::derive`]: a necessary (not sufficient) test
/// every true match passes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterResult {
    /// `[ceil(t*q), floor(q/t)]`.
    pub size: SizeRange,
    /// The rarest `q - minSize + 1` query features.
    pub prefix: Prefix,
    /// `q`, the number of distinct query features.
    pub query_size: usize,
}

impl FilterResult {
    /// Minimum candidate size, which is also the minimum overlap of a match.
    pub fn min_size(&self) -> usize {
        self.size.min
    }

    pub fn max_size(&self) -> usize {
        self.size.max
    }

    /// An empty query has no candidates.
    pub fn admits_nothing(&self) -> bool {
        self.query_size == 0 || self.prefix.is_empty() || self.size.is_empty()
    }

    /// Size bound and prefix membership, evaluated on one item.
    pub fn admits(&self, item: &Item) -> bool {
        !self.admits_nothing()
            && self.size.contains(item.feature_count)
            && item.features.contains_any(&self.prefix)
    }
}

/// Stateless derivation of size bounds and the pruning prefix.
#[derive(Debug, Clone, Copy, Default)]
pub struct CandidateFilter;

impl CandidateFilter {
    /// `(ceil(t*q), floor(q/t))`.
    pub fn size_bounds(query_size: usize, threshold: &Threshold) -> SizeRange {
        SizeRange {
            min: threshold.ceil_mul(query_size),
            max: threshold.floor_div(query_size),
        }
    }

    /// `q - minSize + 1`, clamped to `[1, q]`; 0 for an empty query.
    pub fn prefix_len(query_size: usize, min_size: usize) -> usize {
        if query_size == 0 {
            return 0;
        }
        (query_size + 1).saturating_sub(min_size).clamp(1, query_size)
    }

    /// Derive bounds and prefix from features already ordered rarest first.
    pub fn derive(ordered_features: &[FeatureId], threshold: &Threshold) -> FilterResult {
        let q = ordered_features.len();
        let size = Self::size_bounds(q, threshold);
        let prefix_len = Self::prefix_len(q, size.min);
        FilterResult {
            size,
            prefix: ordered_features[..prefix_len].iter().copied().collect(),
            query_size: q,
        }
    }
}
