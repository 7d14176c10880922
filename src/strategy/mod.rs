//! Interchangeable search strategies.
//!
//! All three realizations take the same [`Query`] and [`FilterResult`] and
//! must return the same [`MatchSet`]; they differ only in how much of the
//! work they push to the store:
//!
//! | Strategy | Store does | Caller does |
//! |----------|------------|-------------|
//! | [`Scan`] | size + prefix retrieval | full intersection + threshold |
//! | [`FunctionalAggregate`] | retrieval + per-item overlap count | ratio + threshold |
//! | [`PipelineAggregate`] | everything, including the threshold | nothing |
//!
//! Agreement between strategies is a correctness property; the orchestrator
//! reports any divergence rather than reconciling it.

pub mod functional;
pub mod pipeline;
pub mod scan;

pub use functional::FunctionalAggregate;
pub use pipeline::PipelineAggregate;
pub use scan::Scan;

use crate::error::{Result, SearchError};
use crate::filter::FilterResult;
use crate::interrupt::Interrupt;
use crate::query::Query;
use crate::similarity::Match;
use crate::store::FeatureStore;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    Scan,
    Functional,
    Pipeline,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 3] = [Self::Scan, Self::Functional, Self::Pipeline];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Scan => "scan",
            Self::Functional => "functional",
            Self::Pipeline => "pipeline",
        }
    }

    /// Instantiate the strategy. `pipeline_prefix` only affects
    /// [`PipelineAggregate`].
    pub fn build(self, pipeline_prefix: bool) -> Box<dyn SearchStrategy> {
        match self {
            Self::Scan => Box::new(Scan),
            Self::Functional => Box::new(FunctionalAggregate),
            Self::Pipeline => Box::new(PipelineAggregate::new(pipeline_prefix)),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StrategyKind {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "scan" | "native" => Ok(Self::Scan),
            "functional" | "mapreduce" => Ok(Self::Functional),
            "pipeline" | "aggregate" => Ok(Self::Pipeline),
            other => Err(SearchError::InvalidConfig(format!("unknown strategy {other:?}"))),
        }
    }
}

/// Verified matches, sorted by item id so sets compare structurally
/// regardless of store iteration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MatchSet {
    matches: Vec<Match>,
}

impl MatchSet {
    /// Ids are expected to be distinct; strategies reject duplicate store
    /// rows with [`ensure_distinct`] before building a set.
    pub fn new(mut matches: Vec<Match>) -> Self {
        matches.sort_by(|a, b| a.item_id.cmp(&b.item_id));
        Self { matches }
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Match> {
        self.matches.iter()
    }

    pub fn ids(&self) -> BTreeSet<&str> {
        self.matches.iter().map(|m| m.item_id.as_str()).collect()
    }

    pub fn get(&self, item_id: &str) -> Option<&Match> {
        self.matches
            .binary_search_by(|m| m.item_id.as_str().cmp(item_id))
            .ok()
            .map(|i| &self.matches[i])
    }

    /// Ids present here but not in `other`.
    pub fn missing_from(&self, other: &MatchSet) -> Vec<String> {
        let theirs = other.ids();
        self.matches
            .iter()
            .filter(|m| !theirs.contains(m.item_id.as_str()))
            .map(|m| m.item_id.clone())
            .collect()
    }
}

/// Work counters, in the spirit of per-filter selectivity stats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StrategyStats {
    /// Items the store evaluated.
    pub examined: usize,
    /// Rows the store returned to the caller.
    pub candidates: usize,
    /// Verified matches.
    pub matched: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrategyOutput {
    pub matches: MatchSet,
    pub stats: StrategyStats,
}

impl StrategyOutput {
    /// Output for a query that admits no candidates.
    pub fn empty() -> Self {
        Self {
            matches: MatchSet::default(),
            stats: StrategyStats::default(),
        }
    }
}

/// Fail with `InconsistentItem` if a store returned the same item twice.
pub(crate) fn ensure_distinct<'a>(ids: impl IntoIterator<Item = &'a str>) -> Result<()> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(SearchError::inconsistent(id, "store returned the item more than once"));
        }
    }
    Ok(())
}

/// One way of turning filter bounds into verified matches.
pub trait SearchStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    fn search(
        &self,
        store: &dyn FeatureStore,
        query: &Query,
        filter: &FilterResult,
        interrupt: &Interrupt,
    ) -> Result<StrategyOutput>;
}
