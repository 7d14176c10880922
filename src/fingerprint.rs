//! Fingerprints: sparse sets of integer feature ids, and the items that carry them.

use crate::error::{Result, SearchError};
use serde::{Deserialize, Deserializer, Serialize};

/// Integer feature identifier.
pub type FeatureId = u32;

/// A set of distinct feature ids, stored sorted ascending by id.
///
/// Identity ignores input order and duplicates. The search path reorders a
/// query's features by rarity separately (see [`crate::query::Query`]); this
/// canonical id order is what makes merge-based intersection cheap.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct FeatureSet {
    ids: Vec<FeatureId>,
}

impl FeatureSet {
    /// Build a set from arbitrary ids; duplicates collapse.
    pub fn new(ids: impl IntoIterator<Item = FeatureId>) -> Self {
        let mut ids: Vec<FeatureId> = ids.into_iter().collect();
        ids.sort_unstable();
        ids.dedup();
        Self { ids }
    }

    /// Number of distinct ids.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: FeatureId) -> bool {
        self.ids.binary_search(&id).is_ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = FeatureId> + '_ {
        self.ids.iter().copied()
    }

    pub fn as_slice(&self) -> &[FeatureId] {
        &self.ids
    }

    /// `|self ∩ other|` by a linear merge of the two sorted id lists.
    pub fn intersection_size(&self, other: &FeatureSet) -> usize {
        let (a, b) = (&self.ids, &other.ids);
        let (mut i, mut j, mut n) = (0, 0, 0);
        while i < a.len() && j < b.len() {
            match a[i].cmp(&b[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    n += 1;
                    i += 1;
                    j += 1;
                }
            }
        }
        n
    }

    /// True if any of `ids` is a member.
    pub fn contains_any(&self, ids: &[FeatureId]) -> bool {
        ids.iter().any(|&id| self.contains(id))
    }
}

impl FromIterator<FeatureId> for FeatureSet {
    fn from_iter<I: IntoIterator<Item = FeatureId>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl<'de> Deserialize<'de> for FeatureSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let ids = Vec::<FeatureId>::deserialize(deserializer)?;
        Ok(Self::new(ids))
    }
}

/// A corpus item. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    /// Human-readable description, e.g. a canonical structure string.
    pub label: String,
    pub features: FeatureSet,
    /// Declared cardinality; must equal `features.len()`.
    pub feature_count: usize,
}

impl Item {
    /// Create an item whose `feature_count` is derived from its features.
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        features: impl IntoIterator<Item = FeatureId>,
    ) -> Self {
        let features = FeatureSet::new(features);
        Self {
            id: id.into(),
            label: label.into(),
            feature_count: features.len(),
            features,
        }
    }

    /// Check `feature_count == |features|`.
    pub fn validate(&self) -> Result<()> {
        if self.feature_count != self.features.len() {
            return Err(SearchError::inconsistent(
                self.id.as_str(),
                format!(
                    "feature_count is {} but it has {} distinct features",
                    self.feature_count,
                    self.features.len()
                ),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicates_and_order_do_not_affect_identity() {
        let a = FeatureSet::new([5, 1, 3, 3, 1]);
        let b = FeatureSet::new([1, 3, 5]);
        assert_eq!(a, b);
        assert_eq!(a.len(), 3);
        assert_eq!(a.as_slice(), &[1, 3, 5]);
    }

    #[test]
    fn intersection_by_merge() {
        let a = FeatureSet::new([1, 2, 3, 4, 5]);
        let b = FeatureSet::new([1, 2, 3, 6, 7]);
        assert_eq!(a.intersection_size(&b), 3);
        assert_eq!(b.intersection_size(&a), 3);
        assert_eq!(a.intersection_size(&FeatureSet::default()), 0);
    }

    #[test]
    fn contains_any_checks_membership() {
        let a = FeatureSet::new([10, 20, 30]);
        assert!(a.contains_any(&[7, 20]));
        assert!(!a.contains_any(&[7, 21]));
        assert!(!a.contains_any(&[]));
    }

    #[test]
    fn validate_detects_inconsistent_count() {
        let mut item = Item::new("c1", "CCO", [1, 2, 3]);
        assert!(item.validate().is_ok());

        item.feature_count = 4;
        assert_eq!(
            item.validate(),
            Err(SearchError::InconsistentItem {
                id: "c1".into(),
                reason: "feature_count is 4 but it has 3 distinct features".into(),
            })
        );
    }

    #[test]
    fn deserialize_canonicalizes_features() {
        let item: Item = serde_json::from_str(
            r#"{"id":"x","label":"","features":[3,1,3],"feature_count":2}"#,
        )
        .unwrap();
        assert_eq!(item.features.as_slice(), &[1, 3]);
        assert!(item.validate().is_ok());
    }
}
