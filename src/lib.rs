//! tanimoto-search: exact threshold similarity search over sparse fingerprints.
//!
//! Given a corpus of items, each described by a set of integer feature ids,
//! find every item whose Tanimoto (Jaccard) similarity to a query item is at
//! least `t`, without comparing the query against the whole corpus.
//!
//! - `frequency`: corpus-wide feature counts (the rarity order)
//! - `filter`: size bounds and the rarity-ordered prefix
//! - `similarity`: exact verification
//! - `strategy`: three interchangeable ways of executing the search
//! - `store`: the backend interface and an in-memory reference store
//! - `orchestrator`: runs a query through the configured strategies
//!
//! ```rust
//! use tanimoto_search::{InMemoryStore, Item, QueryOrchestrator};
//!
//! let store = InMemoryStore::new(vec![
//!     Item::new("q", "query", [1, 2, 3, 4, 5]),
//!     Item::new("c1", "", [1, 2, 3, 6, 7]),
//!     Item::new("c2", "", [1, 2, 3, 4, 9]),
//! ])?;
//! let frequencies = store.frequency_index();
//!
//! let report = QueryOrchestrator::new(&store, &frequencies).run("q", 0.5)?;
//! assert!(report.is_consistent());
//! assert_eq!(report.runs[0].matches.len(), 2); // q itself and c2
//! # Ok::<(), tanimoto_search::SearchError>(())
//! ```
//!
//! # Critical Nuances
//!
//! ## Pruning Is Exact
//!
//! Nothing here is approximate. A match needs at least `ceil(t*q)` shared
//! features and at most `floor(q/t)` features of its own; the first
//! `q - ceil(t*q) + 1` rarest query features must contain one of the shared
//! ones (pigeonhole). Candidates failing either test are provably not
//! matches. Survivors are always verified against the full feature sets.
//!
//! ## Why Rarest First
//!
//! Any prefix of that length is sound, but the cost of the membership test
//! is the total posting-list length of the prefix features. Choosing the
//! rarest ones minimizes it. Feature frequencies in real fingerprint corpora
//! follow a steep power law, so the difference is orders of magnitude.
//!
//! ## Boundary Comparisons
//!
//! `tanimoto >= t` is decided on integers: thresholds are exact fractions
//! (`0.7` is `7/10`), and the test is `overlap * den >= num * union`. Float
//! division would misclassify ratios that equal `t` exactly.
//!
//! ## When Exhaustive Search Wins
//!
//! - Very low thresholds: the size window widens to `[1, q/t]` and the prefix
//!   grows to the whole query, so little is pruned
//! - Tiny corpora, where index lookups cost more than a linear pass

pub mod benchmark;
pub mod config;
pub mod error;
pub mod filter;
pub mod fingerprint;
pub mod frequency;
pub mod interrupt;
pub mod orchestrator;
pub mod query;
pub mod similarity;
pub mod store;
pub mod strategy;
pub mod threshold;

// Re-exports
pub use config::SearchConfig;
pub use error::{Result, SearchError};
pub use filter::{CandidateFilter, FilterResult, SizeRange};
pub use fingerprint::{FeatureId, FeatureSet, Item};
pub use frequency::FrequencyIndex;
pub use interrupt::{CancelHandle, Interrupt};
pub use orchestrator::{Mismatch, QueryOrchestrator, SearchReport, StrategyRun};
pub use query::Query;
pub use similarity::{Candidate, Match, SimilarityEvaluator};
pub use store::{Capabilities, FeatureStore, InMemoryStore};
pub use strategy::{
    FunctionalAggregate, MatchSet, PipelineAggregate, Scan, SearchStrategy, StrategyKind,
    StrategyStats,
};
pub use threshold::Threshold;
