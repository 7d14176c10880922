//! Synthetic fingerprint corpora and exhaustive ground truth.

use crate::error::Result;
use crate::fingerprint::{FeatureId, FeatureSet, Item};
use crate::similarity::SimilarityEvaluator;
use crate::strategy::MatchSet;
use crate::threshold::Threshold;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::io::Write;

/// Shape of a generated corpus.
#[derive(Debug, Clone)]
pub struct CorpusSpec {
    /// Number of items.
    pub n_items: usize,
    /// Feature ids are drawn from `0..vocabulary`.
    pub vocabulary: u32,
    pub min_features: usize,
    pub max_features: usize,
    /// Popularity skew; 1.0 is uniform, larger values favor low ids.
    pub skew: f64,
    /// Probability an item is a perturbed copy of an earlier one.
    pub near_duplicate_rate: f64,
    /// Feature insertions/removals applied to a near-duplicate.
    pub edits: usize,
}

impl Default for CorpusSpec {
    fn default() -> Self {
        Self {
            n_items: 10_000,
            vocabulary: 1024,
            min_features: 20,
            max_features: 120,
            skew: 3.0,
            near_duplicate_rate: 0.2,
            edits: 4,
        }
    }
}

fn sample_feature(rng: &mut StdRng, vocabulary: u32, skew: f64) -> FeatureId {
    let u: f64 = rng.random();
    let id = (u.powf(skew) * vocabulary as f64) as u32;
    id.min(vocabulary.saturating_sub(1))
}

/// Generate a corpus with skewed feature popularity and clusters of
/// near-duplicates.
///
/// # Arguments
///
/// * `spec` - Corpus shape
/// * `seed` - Random seed for reproducibility
pub fn generate_corpus(spec: &CorpusSpec, seed: u64) -> Vec<Item> {
    let mut rng = StdRng::seed_from_u64(seed);
    let vocabulary = spec.vocabulary.max(1);
    let min = spec.min_features.min(vocabulary as usize);
    let max = spec.max_features.clamp(min, vocabulary as usize);

    let mut items: Vec<Item> = Vec::with_capacity(spec.n_items);
    for i in 0..spec.n_items {
        let features: Vec<FeatureId> = if i > 0 && rng.random_bool(spec.near_duplicate_rate.clamp(0.0, 1.0)) {
            let base = &items[rng.random_range(0..i)];
            let mut features: Vec<FeatureId> = base.features.iter().collect();
            for _ in 0..spec.edits {
                if rng.random_bool(0.5) && features.len() > 1 {
                    let at = rng.random_range(0..features.len());
                    features.swap_remove(at);
                } else {
                    features.push(sample_feature(&mut rng, vocabulary, spec.skew));
                }
            }
            features
        } else {
            let target = rng.random_range(min..=max);
            let mut set = std::collections::BTreeSet::new();
            // Bounded so a tiny vocabulary with a heavy skew cannot spin.
            let mut attempts = 0;
            while set.len() < target && attempts < target * 50 {
                set.insert(sample_feature(&mut rng, vocabulary, spec.skew));
                attempts += 1;
            }
            set.into_iter().collect()
        };
        items.push(Item::new(format!("item-{i:06}"), format!("synthetic-{i}"), features));
    }
    items
}

/// Compare the query against every item. The reference answer every
/// strategy must reproduce.
pub fn exhaustive_search(items: &[Item], query: &FeatureSet, threshold: &Threshold) -> Result<MatchSet> {
    let mut matches = Vec::new();
    for item in items {
        if let Some(m) = SimilarityEvaluator::evaluate(query, item, threshold)? {
            matches.push(m);
        }
    }
    Ok(MatchSet::new(matches))
}

/// Write one JSON object per line, in the layout the in-memory store loads.
pub fn write_json_lines<'a>(
    items: impl IntoIterator<Item = &'a Item>,
    mut writer: impl Write,
) -> std::io::Result<()> {
    for item in items {
        serde_json::to_writer(&mut writer, item)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()
}
