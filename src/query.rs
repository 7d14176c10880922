//! A loaded query: item, threshold, and its features in rarity order.

use crate::error::Result;
use crate::filter::{CandidateFilter, FilterResult};
use crate::fingerprint::{FeatureId, FeatureSet, Item};
use crate::frequency::FrequencyIndex;
use crate::threshold::Threshold;

#[derive(Debug, Clone)]
pub struct Query {
    item: Item,
    threshold: Threshold,
    ordered_features: Vec<FeatureId>,
}

impl Query {
    /// Order `item`'s features rarest first against `frequencies`.
    pub fn new(item: Item, threshold: Threshold, frequencies: &FrequencyIndex) -> Result<Self> {
        item.validate()?;
        let ordered_features = frequencies.order_by_rarity(item.features.iter());
        Ok(Self {
            item,
            threshold,
            ordered_features,
        })
    }

    pub fn item(&self) -> &Item {
        &self.item
    }

    pub fn threshold(&self) -> &Threshold {
        &self.threshold
    }

    /// Features sorted ascending by corpus frequency, ties by id.
    pub fn ordered_features(&self) -> &[FeatureId] {
        &self.ordered_features
    }

    /// The full feature set, for membership tests and intersection.
    pub fn features(&self) -> &FeatureSet {
        &self.item.features
    }

    /// `q`.
    pub fn size(&self) -> usize {
        self.ordered_features.len()
    }

    pub fn filter(&self) -> FilterResult {
        CandidateFilter::derive(&self.ordered_features, &self.threshold)
    }
}
