//! Query orchestration: load, order, filter, run strategies, compare.

use crate::config::SearchConfig;
use crate::error::{Result, SearchError};
use crate::filter::FilterResult;
use crate::frequency::FrequencyIndex;
use crate::interrupt::{CancelHandle, Interrupt};
use crate::query::Query;
use crate::strategy::{MatchSet, SearchStrategy, StrategyKind, StrategyStats};
use crate::store::FeatureStore;
use crate::threshold::Threshold;
use serde::{Serialize, Serializer};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

fn as_millis<S: Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64() * 1000.0)
}

/// One strategy's outcome.
#[derive(Debug, Clone, Serialize)]
pub struct StrategyRun {
    pub kind: StrategyKind,
    pub matches: MatchSet,
    pub stats: StrategyStats,
    #[serde(rename = "elapsed_ms", serialize_with = "as_millis")]
    pub elapsed: Duration,
}

/// Two strategies disagreed on the match set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mismatch {
    pub baseline: StrategyKind,
    pub other: StrategyKind,
    pub only_in_baseline: Vec<String>,
    pub only_in_other: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchReport {
    pub query_id: String,
    pub label: String,
    pub threshold: Threshold,
    /// Distinct features in the query.
    pub query_size: usize,
    pub filter: FilterResult,
    pub runs: Vec<StrategyRun>,
    pub mismatches: Vec<Mismatch>,
}

impl SearchReport {
    pub fn is_consistent(&self) -> bool {
        self.mismatches.is_empty()
    }

    pub fn run(&self, kind: StrategyKind) -> Option<&StrategyRun> {
        self.runs.iter().find(|r| r.kind == kind)
    }
}

/// Drives one query through the configured strategies.
///
/// Holds only shared references to the store and frequency snapshot, so a
/// single orchestrator can serve many queries, and strategies can run on
/// separate threads.
pub struct QueryOrchestrator<'a> {
    store: &'a dyn FeatureStore,
    frequencies: &'a FrequencyIndex,
    config: SearchConfig,
    cancel: Option<CancelHandle>,
}

impl<'a> QueryOrchestrator<'a> {
    pub fn new(store: &'a dyn FeatureStore, frequencies: &'a FrequencyIndex) -> Self {
        Self {
            store,
            frequencies,
            config: SearchConfig::default(),
            cancel: None,
        }
    }

    pub fn with_config(mut self, config: SearchConfig) -> Self {
        self.config = config;
        self
    }

    /// Searches abort with `Cancelled` once `handle` is cancelled.
    pub fn with_cancel(mut self, handle: CancelHandle) -> Self {
        self.cancel = Some(handle);
        self
    }

    /// Run a query with a floating-point threshold.
    pub fn run(&self, item_id: &str, threshold: f64) -> Result<SearchReport> {
        let threshold = Threshold::from_f64(threshold)?;
        self.run_with(item_id, threshold)
    }

    pub fn run_with(&self, item_id: &str, threshold: Threshold) -> Result<SearchReport> {
        self.config.validate()?;
        let (query, filter) = self.prepare(item_id, threshold)?;

        let strategies: Vec<Box<dyn SearchStrategy>> = self
            .config
            .strategies
            .iter()
            .map(|kind| kind.build(self.config.pipeline_prefix))
            .collect();

        let runs = if self.config.parallel && strategies.len() > 1 {
            self.run_parallel(&strategies, &query, &filter)?
        } else {
            strategies
                .iter()
                .map(|s| self.execute(s.as_ref(), &query, &filter))
                .collect::<Result<Vec<_>>>()?
        };

        let mismatches = compare(&runs);
        for m in &mismatches {
            warn!(
                baseline = %m.baseline,
                other = %m.other,
                only_in_baseline = m.only_in_baseline.len(),
                only_in_other = m.only_in_other.len(),
                "strategies disagree"
            );
        }

        Ok(SearchReport {
            query_id: query.item().id.clone(),
            label: query.item().label.clone(),
            threshold,
            query_size: query.size(),
            filter,
            runs,
            mismatches,
        })
    }

    /// Load the query item and derive its filter.
    pub fn prepare(&self, item_id: &str, threshold: Threshold) -> Result<(Query, FilterResult)> {
        let item = self
            .store
            .get(item_id, &self.interrupt())?
            .ok_or_else(|| SearchError::ItemNotFound(item_id.to_string()))?;
        info!(id = %item.id, label = %item.label, features = item.feature_count, "loaded query item");

        let query = Query::new(item, threshold, self.frequencies)?;
        let filter = query.filter();
        debug!(
            threshold = %threshold,
            min_size = filter.min_size(),
            max_size = filter.max_size(),
            prefix_len = filter.prefix.len(),
            "derived candidate filter"
        );
        Ok((query, filter))
    }

    fn interrupt(&self) -> Interrupt {
        Interrupt::new(self.config.timeout(), self.cancel.clone())
    }

    fn execute(&self, strategy: &dyn SearchStrategy, query: &Query, filter: &FilterResult) -> Result<StrategyRun> {
        let kind = strategy.kind();
        let start = Instant::now();
        let output = strategy.search(self.store, query, filter, &self.interrupt())?;
        let elapsed = start.elapsed();
        info!(
            strategy = %kind,
            matches = output.matches.len(),
            examined = output.stats.examined,
            candidates = output.stats.candidates,
            elapsed_ms = elapsed.as_secs_f64() * 1000.0,
            "strategy finished"
        );
        Ok(StrategyRun {
            kind,
            matches: output.matches,
            stats: output.stats,
            elapsed,
        })
    }

    fn run_parallel(
        &self,
        strategies: &[Box<dyn SearchStrategy>],
        query: &Query,
        filter: &FilterResult,
    ) -> Result<Vec<StrategyRun>> {
        std::thread::scope(|scope| {
            let handles: Vec<_> = strategies
                .iter()
                .map(|strategy| scope.spawn(move || self.execute(strategy.as_ref(), query, filter)))
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap_or_else(|payload| std::panic::resume_unwind(payload)))
                .collect()
        })
    }
}

/// Compare every run against the first one.
fn compare(runs: &[StrategyRun]) -> Vec<Mismatch> {
    let Some((baseline, rest)) = runs.split_first() else {
        return Vec::new();
    };
    rest.iter()
        .filter_map(|other| {
            let only_in_baseline = baseline.matches.missing_from(&other.matches);
            let only_in_other = other.matches.missing_from(&baseline.matches);
            (!only_in_baseline.is_empty() || !only_in_other.is_empty()).then(|| Mismatch {
                baseline: baseline.kind,
                other: other.kind,
                only_in_baseline,
                only_in_other,
            })
        })
        .collect()
}
