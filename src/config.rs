//! Search session configuration.

use crate::error::{Result, SearchError};
use crate::strategy::StrategyKind;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchConfig {
    /// Strategies to run, in report order.
    pub strategies: Vec<StrategyKind>,
    /// Run strategies concurrently.
    pub parallel: bool,
    /// Per-strategy deadline.
    pub timeout_ms: Option<u64>,
    /// Let the pipeline strategy also apply the prefix bound.
    pub pipeline_prefix: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            strategies: StrategyKind::ALL.to_vec(),
            parallel: false,
            timeout_ms: None,
            pipeline_prefix: false,
        }
    }
}

impl SearchConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            SearchError::InvalidConfig(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| SearchError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.strategies.is_empty() {
            return Err(SearchError::InvalidConfig("no strategies selected".into()));
        }
        let mut seen = HashSet::new();
        for kind in &self.strategies {
            if !seen.insert(kind) {
                return Err(SearchError::InvalidConfig(format!(
                    "strategy {kind} listed more than once"
                )));
            }
        }
        Ok(())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}
