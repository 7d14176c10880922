//! Corpus-wide feature frequencies.
//!
//! The count of items containing a feature is its selectivity: rare features
//! narrow the candidate set fastest, so the prefix filter examines them first.
//! The index is an immutable snapshot; share it by reference (or `Arc`) for
//! the lifetime of a search session.

use crate::fingerprint::{FeatureId, Item};
use std::collections::HashMap;

/// Mapping `feature_id -> number of corpus items containing it`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrequencyIndex {
    counts: HashMap<FeatureId, u64>,
    total_items: usize,
}

impl FrequencyIndex {
    /// Build from every item in the corpus snapshot.
    pub fn from_items<'a>(items: impl IntoIterator<Item = &'a Item>) -> Self {
        let mut counts: HashMap<FeatureId, u64> = HashMap::new();
        let mut total_items = 0;
        for item in items {
            total_items += 1;
            for feature in item.features.iter() {
                *counts.entry(feature).or_insert(0) += 1;
            }
        }
        Self {
            counts,
            total_items,
        }
    }

    /// Build from precomputed `(feature, count)` pairs, e.g. a counts table
    /// maintained by the store at ingestion time.
    pub fn from_counts(counts: impl IntoIterator<Item = (FeatureId, u64)>, total_items: usize) -> Self {
        Self {
            counts: counts.into_iter().collect(),
            total_items,
        }
    }

    /// Number of items containing `feature`; 0 if never seen.
    pub fn count(&self, feature: FeatureId) -> u64 {
        self.counts.get(&feature).copied().unwrap_or(0)
    }

    /// Sort features rarest first, ties broken by feature id.
    pub fn order_by_rarity(&self, features: impl IntoIterator<Item = FeatureId>) -> Vec<FeatureId> {
        let mut keyed: Vec<(u64, FeatureId)> = features
            .into_iter()
            .map(|f| (self.count(f), f))
            .collect();
        keyed.sort_unstable();
        keyed.dedup();
        keyed.into_iter().map(|(_, f)| f).collect()
    }

    /// Number of distinct features seen.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Number of items the index was built from.
    pub fn total_items(&self) -> usize {
        self.total_items
    }
}
