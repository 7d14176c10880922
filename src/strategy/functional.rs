//! Push a per-item overlap counter to the store; finish the ratio locally.

use super::{ensure_distinct, MatchSet, SearchStrategy, StrategyKind, StrategyOutput, StrategyStats};
use crate::error::{Result, SearchError};
use crate::filter::FilterResult;
use crate::interrupt::Interrupt;
use crate::query::Query;
use crate::similarity::Candidate;
use crate::store::{CandidatePredicate, FeatureStore, OverlapReducer};

#[derive(Debug, Clone, Copy, Default)]
pub struct FunctionalAggregate;

impl FunctionalAggregate {
    /// A reducer row is malformed if its counts cannot describe a real overlap.
    fn check(candidate: &Candidate, query_size: usize) -> Result<()> {
        if candidate.matched > candidate.total || candidate.matched > query_size {
            return Err(SearchError::inconsistent(
                candidate.item_id.as_str(),
                format!(
                    "store reported {} matched of {} features for a {query_size}-feature query",
                    candidate.matched, candidate.total
                ),
            ));
        }
        Ok(())
    }
}

impl SearchStrategy for FunctionalAggregate {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Functional
    }

    fn search(
        &self,
        store: &dyn FeatureStore,
        query: &Query,
        filter: &FilterResult,
        interrupt: &Interrupt,
    ) -> Result<StrategyOutput> {
        if !store.capabilities().reducers {
            return Err(SearchError::StrategyUnsupported {
                strategy: "functional",
                capability: "per-item reducers",
            });
        }
        if filter.admits_nothing() {
            return Ok(StrategyOutput::empty());
        }

        let reducer = OverlapReducer {
            query: query.features().clone(),
            min_overlap: filter.min_size(),
        };
        let retrieved = store.reduce(&CandidatePredicate::from_filter(filter), &reducer, interrupt)?;
        ensure_distinct(retrieved.rows.iter().map(|c| c.item_id.as_str()))?;
        let candidates = retrieved.rows.len();

        let mut matches = Vec::new();
        for candidate in retrieved.rows {
            Self::check(&candidate, query.size())?;
            if let Some(m) = candidate.verify(query.size(), query.threshold()) {
                matches.push(m);
            }
        }

        let matches = MatchSet::new(matches);
        Ok(StrategyOutput {
            stats: StrategyStats {
                examined: retrieved.examined,
                candidates,
                matched: matches.len(),
            },
            matches,
        })
    }
}
