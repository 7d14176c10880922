//! Benchmark utilities for comparing search strategies.
//!
//! Provides a reproducible synthetic corpus, an exhaustive ground-truth
//! search, and metrics for checking that pruned strategies lose nothing:
//!
//! - **Correctness**: recall and precision of a strategy's match set against
//!   exhaustive search (both must be exactly 1.0)
//! - **Pruning power**: fraction of the corpus the store never had to touch
//!
//! Real fingerprint corpora have a heavily skewed feature distribution (a
//! few substructure bits are set in most molecules, most bits are rare),
//! which is exactly what makes rarity-ordered prefixes selective. The
//! generator reproduces that skew.

pub mod datasets;
pub mod metrics;

pub use datasets::{exhaustive_search, generate_corpus, write_json_lines, CorpusSpec};
pub use metrics::{precision, pruning_ratio, recall};
