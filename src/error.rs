//! Error types for similarity search.

use thiserror::Error;

/// Errors that can occur while loading a query or running a search strategy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    /// The query item id is not present in the store.
    #[error("item not found: {0}")]
    ItemNotFound(String),

    /// Threshold outside (0, 1] or not representable exactly.
    #[error("invalid threshold {value}: {reason}")]
    InvalidThreshold { value: String, reason: String },

    /// Stored data for an item is malformed: a feature count that disagrees
    /// with the feature set, or a store row that cannot describe a real item.
    #[error("inconsistent item {id}: {reason}")]
    InconsistentItem { id: String, reason: String },

    /// Transport or backend failure inside the store.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// The store lacks an optional capability the strategy depends on.
    #[error("strategy {strategy} is unavailable: store does not support {capability}")]
    StrategyUnsupported {
        strategy: &'static str,
        capability: &'static str,
    },

    /// Pipeline stages are out of order or their inputs do not line up.
    #[error("invalid pipeline: {0}")]
    InvalidPipeline(String),

    /// The per-call deadline elapsed before the store answered.
    #[error("search timed out after {elapsed_ms} ms")]
    TimedOut { elapsed_ms: u64 },

    /// The caller cancelled the search.
    #[error("search cancelled")]
    Cancelled,

    /// Configuration failed to parse or validate.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl SearchError {
    pub(crate) fn inconsistent(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InconsistentItem {
            id: id.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_threshold(value: impl ToString, reason: impl Into<String>) -> Self {
        Self::InvalidThreshold {
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<std::io::Error> for SearchError {
    fn from(e: std::io::Error) -> Self {
        Self::StoreUnavailable(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SearchError>;
