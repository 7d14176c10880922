//! Express the whole search, threshold test included, as store-side stages.

use super::{ensure_distinct, MatchSet, SearchStrategy, StrategyKind, StrategyOutput, StrategyStats};
use crate::error::{Result, SearchError};
use crate::filter::FilterResult;
use crate::interrupt::Interrupt;
use crate::query::Query;
use crate::similarity::Match;
use crate::store::{FeatureStore, Pipeline, Stage};

#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineAggregate {
    /// Also filter items by prefix membership in the first stage. Stage order
    /// already guarantees exactness, so this only trims work.
    use_prefix: bool,
}

impl PipelineAggregate {
    pub fn new(use_prefix: bool) -> Self {
        Self { use_prefix }
    }

    /// Size filter, [prefix filter], unwind, feature filter, group, minimum
    /// overlap, score, threshold.
    pub fn pipeline(&self, query: &Query, filter: &FilterResult) -> Pipeline {
        let mut pipeline = Pipeline::new().stage(Stage::MatchSize(filter.size));
        if self.use_prefix {
            pipeline = pipeline.stage(Stage::MatchAnyFeature(filter.prefix.to_vec()));
        }
        pipeline
            .stage(Stage::Unwind)
            .stage(Stage::MatchFeatureIn(query.features().clone()))
            .stage(Stage::GroupCount)
            .stage(Stage::MatchMinOverlap(filter.min_size()))
            .stage(Stage::ProjectTanimoto {
                query_size: query.size(),
            })
            .stage(Stage::MatchTanimoto(*query.threshold()))
    }
}

impl SearchStrategy for PipelineAggregate {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Pipeline
    }

    fn search(
        &self,
        store: &dyn FeatureStore,
        query: &Query,
        filter: &FilterResult,
        interrupt: &Interrupt,
    ) -> Result<StrategyOutput> {
        if !store.capabilities().pipelines {
            return Err(SearchError::StrategyUnsupported {
                strategy: "pipeline",
                capability: "staged pipelines",
            });
        }
        if filter.admits_nothing() {
            return Ok(StrategyOutput::empty());
        }

        let retrieved = store.aggregate(&self.pipeline(query, filter), interrupt)?;
        ensure_distinct(retrieved.rows.iter().map(|row| row.item_id.as_str()))?;
        let candidates = retrieved.rows.len();
        let matches = retrieved
            .rows
            .into_iter()
            .map(|row| {
                let tanimoto = row.tanimoto.ok_or_else(|| {
                    SearchError::inconsistent(row.item_id.as_str(), "pipeline row has no tanimoto")
                })?;
                Ok(Match {
                    item_id: row.item_id,
                    label: row.label,
                    tanimoto,
                })
            })
            .collect::<Result<Vec<_>>>()?;

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
