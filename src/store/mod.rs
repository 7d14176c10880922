//! The item store the search core consumes.
//!
//! The search core never touches storage directly; it talks to a
//! [`FeatureStore`] through typed requests:
//!
//! | Capability | Request | Used by |
//! |------------|---------|---------|
//! | point lookup | `get(id)` | orchestrator |
//! | predicate retrieval | [`CandidatePredicate`] | Scan |
//! | per-item reducer (optional) | [`OverlapReducer`] | FunctionalAggregate |
//! | staged pipeline (optional) | [`Pipeline`] | PipelineAggregate |
//!
//! Reducers and pipelines are plain data, not script text. A backend either
//! evaluates them natively (the in-memory store does so directly) or
//! translates them into its own query language.

pub mod memory;
pub mod pipeline;

pub use memory::InMemoryStore;
pub use pipeline::{Pipeline, PipelineRow, Stage};

use crate::error::{Result, SearchError};
use crate::filter::{FilterResult, SizeRange};
use crate::fingerprint::{FeatureId, FeatureSet, Item};
use crate::interrupt::Interrupt;
use crate::similarity::Candidate;
use serde::{Deserialize, Serialize};

/// Optional capabilities a backend advertises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// Server-side evaluation of [`OverlapReducer`].
    pub reducers: bool,
    /// Declarative staged [`Pipeline`] execution.
    pub pipelines: bool,
}

impl Capabilities {
    pub const NONE: Self = Self {
        reducers: false,
        pipelines: false,
    };
    pub const ALL: Self = Self {
        reducers: true,
        pipelines: true,
    };
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::NONE
    }
}

/// Rows returned by the store, with how many items it had to evaluate.
#[derive(Debug, Clone, PartialEq)]
pub struct Retrieved<T> {
    pub rows: Vec<T>,
    /// Items the store evaluated against the predicate.
    pub examined: usize,
}

/// Feature-count range plus optional "contains any of" membership test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidatePredicate {
    pub size: SizeRange,
    /// If set, an item must contain at least one of these features.
    pub any_of: Option<Vec<FeatureId>>,
}

impl CandidatePredicate {
    /// Size bound and prefix membership.
    pub fn from_filter(filter: &FilterResult) -> Self {
        Self {
            size: filter.size,
            any_of: Some(filter.prefix.to_vec()),
        }
    }

    pub fn size_only(size: SizeRange) -> Self {
        Self { size, any_of: None }
    }

    pub fn matches(&self, item: &Item) -> bool {
        self.size.contains(item.feature_count)
            && self
                .any_of
                .as_deref()
                .is_none_or(|ids| item.features.contains_any(ids))
    }
}

/// Per-item reducer: count how many of the item's features are in `query`.
///
/// Items whose overlap falls below `min_overlap` cannot reach the threshold
/// and are dropped store-side without being checked; only survivors must
/// have a consistent `feature_count`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlapReducer {
    pub query: FeatureSet,
    pub min_overlap: usize,
}

impl OverlapReducer {
    pub fn apply(&self, item: &Item) -> Result<Option<Candidate>> {
        let matched = self.query.intersection_size(&item.features);
        if matched == 0 || matched < self.min_overlap {
            return Ok(None);
        }
        item.validate()?;
        Ok(Some(Candidate {
            item_id: item.id.clone(),
            label: item.label.clone(),
            matched,
            total: item.feature_count,
        }))
    }
}

/// The collaborator store. Implementations must be safe to share between
/// concurrently running strategies.
pub trait FeatureStore: Send + Sync {
    /// Point lookup by id.
    fn get(&self, id: &str, interrupt: &Interrupt) -> Result<Option<Item>>;

    /// Items matching `predicate`.
    fn find(
        &self,
        predicate: &CandidatePredicate,
        interrupt: &Interrupt,
    ) -> Result<Retrieved<Item>>;

    fn capabilities(&self) -> Capabilities {
        Capabilities::NONE
    }

    /// Evaluate `reducer` on every item matching `predicate`.
    fn reduce(
        &self,
        _predicate: &CandidatePredicate,
        _reducer: &OverlapReducer,
        _interrupt: &Interrupt,
    ) -> Result<Retrieved<Candidate>> {
        Err(SearchError::StrategyUnsupported {
            strategy: "functional",
            capability: "per-item reducers",
        })
    }

    /// Execute a staged pipeline.
    fn aggregate(&self, _pipeline: &Pipeline, _interrupt: &Interrupt) -> Result<Retrieved<PipelineRow>> {
        Err(SearchError::StrategyUnsupported {
            strategy: "pipeline",
            capability: "staged pipelines",
        })
    }
}
