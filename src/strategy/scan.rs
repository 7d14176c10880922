//! Retrieve coarse candidates from the store, verify each locally.

use super::{ensure_distinct, MatchSet, SearchStrategy, StrategyKind, StrategyOutput, StrategyStats};
use crate::error::Result;
use crate::filter::FilterResult;
use crate::interrupt::Interrupt;
use crate::query::Query;
use crate::similarity::SimilarityEvaluator;
use crate::store::{CandidatePredicate, FeatureStore};

#[derive(Debug, Clone, Copy, Default)]
pub struct Scan;

impl SearchStrategy for Scan {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Scan
    }

    fn search(
        &self,
        store: &dyn FeatureStore,
        query: &Query,
        filter: &FilterResult,
        interrupt: &Interrupt,
    ) -> Result<StrategyOutput> {
        if filter.admits_nothing() {
            return Ok(StrategyOutput::empty());
        }

        let retrieved = store.find(&CandidatePredicate::from_filter(filter), interrupt)?;
        ensure_distinct(retrieved.rows.iter().map(|item| item.id.as_str()))?;
        let mut matches = Vec::new();
        for item in &retrieved.rows {
            // Below the minimum overlap an item can never match; it is not
            // checked for consistency either, same as the store-side paths.
            if query.features().intersection_size(&item.features) < filter.min_size() {
                continue;
            }
            if let Some(m) = SimilarityEvaluator::evaluate(query.features(), item, query.threshold())? {
                matches.push(m);
            }
        }

        let matches = MatchSet::new(matches);
        Ok(StrategyOutput {
            stats: StrategyStats {
                examined: retrieved.examined,
                candidates: retrieved.rows.len(),
                matched: matches.len(),
            },
            matches,
        })
    }
}
