//! Exact Tanimoto verification.
//!
//! `T(A, B) = |A ∩ B| / (|A| + |B| - |A ∩ B|)`, the Jaccard coefficient of two
//! feature sets. The pass/fail decision uses the threshold's exact rational
//! form; the `f64` value is carried for reporting.

use crate::error::Result;
use crate::fingerprint::{FeatureSet, Item};
use crate::threshold::Threshold;
use serde::{Deserialize, Serialize};

/// A verified result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub item_id: String,
    pub label: String,
    pub tanimoto: f64,
}

/// Per-item overlap produced during search and discarded after verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub item_id: String,
    pub label: String,
    /// `|Q ∩ C|`.
    pub matched: usize,
    /// `|C|`.
    pub total: usize,
}

impl Candidate {
    /// Apply the final ratio and threshold test.
    pub fn verify(self, query_size: usize, threshold: &Threshold) -> Option<Match> {
        SimilarityEvaluator::decide(self.matched, query_size, self.total, threshold).map(
            |tanimoto| Match {
                item_id: self.item_id,
                label: self.label,
                tanimoto,
            },
        )
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SimilarityEvaluator;

impl SimilarityEvaluator {
    /// Tanimoto coefficient from counts. Two empty sets score 0.
    pub fn tanimoto(overlap: usize, query_size: usize, candidate_size: usize) -> f64 {
        let union = Self::union(overlap, query_size, candidate_size);
        if union == 0 {
            return 0.0;
        }
        overlap as f64 / union as f64
    }

    /// Returns the coefficient iff it meets `threshold` (non-strict).
    pub fn decide(
        overlap: usize,
        query_size: usize,
        candidate_size: usize,
        threshold: &Threshold,
    ) -> Option<f64> {
        let union = Self::union(overlap, query_size, candidate_size);
        threshold
            .is_met_by(overlap, union)
            .then(|| Self::tanimoto(overlap, query_size, candidate_size))
    }

    /// Full verification of one stored item against the query's features.
    ///
    /// Fails with `InconsistentItem` if the item's declared count is wrong.
    pub fn evaluate(
        query: &FeatureSet,
        candidate: &Item,
        threshold: &Threshold,
    ) -> Result<Option<Match>> {
        candidate.validate()?;
        let overlap = query.intersection_size(&candidate.features);
        Ok(
            Self::decide(overlap, query.len(), candidate.feature_count, threshold).map(
                |tanimoto| Match {
                    item_id: candidate.id.clone(),
                    label: candidate.label.clone(),
                    tanimoto,
                },
            ),
        )
    }

    fn union(overlap: usize, query_size: usize, candidate_size: usize) -> usize {
        (query_size + candidate_size).saturating_sub(overlap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SearchError;

    fn t(s: &str) -> Threshold {
        s.parse().unwrap()
    }

    #[test]
    fn worked_example() {
        let q = FeatureSet::new([1, 2, 3, 4, 5]);
        let c1 = Item::new("c1", "", [1, 2, 3, 6, 7]);
        let c2 = Item::new("c2", "", [1, 2, 3, 4, 9]);

        assert_eq!(SimilarityEvaluator::evaluate(&q, &c1, &t("0.5")).unwrap(), None);

        let m = SimilarityEvaluator::evaluate(&q, &c2, &t("0.5")).unwrap().unwrap();
        assert_eq!(m.item_id, "c2");
        assert!((m.tanimoto - 4.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn boundary_is_inclusive() {
        // 2 / (3 + 3 - 2) = 0.5 exactly.
        assert_eq!(SimilarityEvaluator::decide(2, 3, 3, &t("0.5")), Some(0.5));
        // 7 / 10 against 0.7: equal as rationals.
        assert!(SimilarityEvaluator::decide(7, 7, 10, &t("0.7")).is_some());
    }

    #[test]
    fn identical_sets_score_one() {
        let q = FeatureSet::new([3, 4, 5]);
        let item = Item::new("same", "", [5, 4, 3]);
        let m = SimilarityEvaluator::evaluate(&q, &item, &t("1")).unwrap().unwrap();
        assert_eq!(m.tanimoto, 1.0);
    }

    #[test]
    fn empty_sets_never_match() {
        assert_eq!(SimilarityEvaluator::tanimoto(0, 0, 0), 0.0);
        assert_eq!(SimilarityEvaluator::decide(0, 0, 0, &t("0.01")), None);
    }

    #[test]
    fn inconsistent_candidate_is_an_error() {
        let q = FeatureSet::new([1, 2]);
        let mut item = Item::new("bad", "", [1, 2]);
        item.feature_count = 7;
        assert!(matches!(
            SimilarityEvaluator::evaluate(&q, &item, &t("0.5")),
            Err(SearchError::InconsistentItem { .. })
        ));
    }

    #[test]
    fn candidate_verify_carries_label() {
        let c = Candidate {
            item_id: "x".into(),
            label: "CCO".into(),
            matched: 4,
            total: 5,
        };
        let m = c.verify(5, &t("0.5")).unwrap();
        assert_eq!(m.label, "CCO");
    }
}
