//! In-memory reference store.
//!
//! Holds the corpus snapshot in a `Vec`, with an id index for point lookups
//! and a feature posting list so "contains any of" predicates touch only
//! items that share a feature with the prefix. Evaluates reducers and
//! pipelines natively; capabilities can be switched off to model weaker
//! backends.

use crate::error::{Result, SearchError};
use crate::fingerprint::{FeatureId, FeatureSet, Item};
use crate::frequency::FrequencyIndex;
use crate::interrupt::Interrupt;
use crate::similarity::Candidate;
use crate::store::{
    Capabilities, CandidatePredicate, FeatureStore, OverlapReducer, Pipeline, PipelineRow,
    Retrieved,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;
use tracing::debug;

const CHECK_EVERY: usize = 1024;

/// One JSON-lines record. `feature_count` is derived when absent.
#[derive(Debug, Deserialize)]
struct ItemRecord {
    id: String,
    #[serde(default)]
    label: String,
    features: Vec<FeatureId>,
    #[serde(default)]
    feature_count: Option<usize>,
}

impl ItemRecord {
    fn into_item(self) -> Result<Item> {
        let features = FeatureSet::new(self.features);
        let item = Item {
            feature_count: self.feature_count.unwrap_or(features.len()),
            id: self.id,
            label: self.label,
            features,
        };
        item.validate()?;
        Ok(item)
    }
}

#[derive(Debug, Clone)]
pub struct InMemoryStore {
    items: Vec<Item>,
    by_id: HashMap<String, usize>,
    postings: HashMap<FeatureId, Vec<usize>>,
    capabilities: Capabilities,
}

impl InMemoryStore {
    /// Index `items`. Items are stored as given; `feature_count` consistency
    /// is checked when an item is read, not here.
    pub fn new(items: Vec<Item>) -> Result<Self> {
        let mut by_id = HashMap::with_capacity(items.len());
        let mut postings: HashMap<FeatureId, Vec<usize>> = HashMap::new();
        for (idx, item) in items.iter().enumerate() {
            if by_id.insert(item.id.clone(), idx).is_some() {
                return Err(SearchError::StoreUnavailable(format!(
                    "duplicate item id {}",
                    item.id
                )));
            }
            for feature in item.features.iter() {
                postings.entry(feature).or_default().push(idx);
            }
        }
        debug!(
            items = items.len(),
            features = postings.len(),
            "indexed in-memory store"
        );
        Ok(Self {
            items,
            by_id,
            postings,
            capabilities: Capabilities::ALL,
        })
    }

    /// Load one JSON object per line; blank lines are skipped.
    pub fn from_json_lines(reader: impl BufRead) -> Result<Self> {
        let mut items = Vec::new();
        for (n, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: ItemRecord = serde_json::from_str(&line).map_err(|e| {
                SearchError::StoreUnavailable(format!("line {}: {e}", n + 1))
            })?;
            items.push(record.into_item()?);
        }
        Self::new(items)
    }

    pub fn from_json_lines_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| {
            SearchError::StoreUnavailable(format!("cannot open {}: {e}", path.display()))
        })?;
        Self::from_json_lines(std::io::BufReader::new(file))
    }

    /// Restrict the optional capabilities this store advertises.
    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Frequency snapshot of the stored corpus.
    pub fn frequency_index(&self) -> FrequencyIndex {
        FrequencyIndex::from_items(&self.items)
    }

    /// Indices of items that may satisfy `predicate`, ascending. Uses the
    /// posting lists when the predicate has a membership clause.
    fn scope(&self, predicate: &CandidatePredicate) -> Vec<usize> {
        match &predicate.any_of {
            Some(ids) => {
                let mut idx: Vec<usize> = ids
                    .iter()
                    .filter_map(|f| self.postings.get(f))
                    .flatten()
                    .copied()
                    .collect();
                idx.sort_unstable();
                idx.dedup();
                idx
            }
            None => (0..self.items.len()).collect(),
        }
    }

    fn matching<'a>(
        &'a self,
        predicate: &'a CandidatePredicate,
        interrupt: &'a Interrupt,
    ) -> (usize, impl Iterator<Item = Result<&'a Item>> + 'a) {
        let scope = self.scope(predicate);
        let examined = scope.len();
        let iter = scope.into_iter().enumerate().filter_map(move |(i, idx)| {
            if i % CHECK_EVERY == 0 {
                if let Err(e) = interrupt.check() {
                    return Some(Err(e));
                }
            }
            let item = &self.items[idx];
            predicate.matches(item).then_some(Ok(item))
        });
        (examined, iter)
    }

    fn require(&self, enabled: bool, strategy: &'static str, capability: &'static str) -> Result<()> {
        if enabled {
            Ok(())
        } else {
            Err(SearchError::StrategyUnsupported {
                strategy,
                capability,
            })
        }
    }
}

impl FeatureStore for InMemoryStore {
    fn get(&self, id: &str, interrupt: &Interrupt) -> Result<Option<Item>> {
        interrupt.check()?;
        Ok(self.by_id.get(id).map(|&idx| self.items[idx].clone()))
    }

    fn find(&self, predicate: &CandidatePredicate, interrupt: &Interrupt) -> Result<Retrieved<Item>> {
        let (examined, iter) = self.matching(predicate, interrupt);
        let rows = iter
            .map(|r| r.map(Item::clone))
            .collect::<Result<Vec<_>>>()?;
        Ok(Retrieved { rows, examined })
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn reduce(
        &self,
        predicate: &CandidatePredicate,
        reducer: &OverlapReducer,
        interrupt: &Interrupt,
    ) -> Result<Retrieved<Candidate>> {
        self.require(self.capabilities.reducers, "functional", "per-item reducers")?;
        let (examined, iter) = self.matching(predicate, interrupt);
        let mut rows = Vec::new();
        for item in iter {
            if let Some(candidate) = reducer.apply(item?)? {
                rows.push(candidate);
            }
        }
        Ok(Retrieved { rows, examined })
    }

    fn aggregate(&self, pipeline: &Pipeline, interrupt: &Interrupt) -> Result<Retrieved<PipelineRow>> {
        self.require(self.capabilities.pipelines, "pipeline", "staged pipelines")?;
        pipeline.execute(&self.items, interrupt)
    }
}
