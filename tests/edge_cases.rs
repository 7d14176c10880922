//! Edge case tests for tanimoto-search.
//!
//! Tests unusual inputs and boundary conditions that could cause failures.

use tanimoto_search::store::{
    Capabilities, CandidatePredicate, FeatureStore, OverlapReducer, Pipeline, PipelineRow,
    Retrieved,
};
use tanimoto_search::{
    Candidate, FilterResult, FrequencyIndex, InMemoryStore, Interrupt, Item, Query, QueryOrchestrator, Result,
    SearchConfig, SearchError, StrategyKind,
};

fn run_all(store: &InMemoryStore, id: &str, threshold: f64) -> Vec<Vec<String>> {
    let freq = store.frequency_index();
    let report = QueryOrchestrator::new(store, &freq).run(id, threshold).expect("search failed");
    assert!(report.is_consistent(), "strategies disagree: {:?}", report.mismatches);
    report
        .runs
        .iter()
        .map(|r| r.matches.ids().into_iter().map(String::from).collect())
        .collect()
}

fn strategies(store: &InMemoryStore, id: &str, threshold: f64) -> (Query, FilterResult) {
    let freq = store.frequency_index();
    let item = store.get(id, &Interrupt::none()).unwrap().unwrap();
    let query = Query::new(item, threshold.try_into().unwrap(), &freq).unwrap();
    let filter = query.filter();
    (query, filter)
}

// =============================================================================
// Worked example
// =============================================================================

#[test]
fn worked_example_all_strategies() {
    let store = InMemoryStore::new(vec![
        Item::new("q", "", [1, 2, 3, 4, 5]),
        Item::new("c1", "", [1, 2, 3, 6, 7]),
        Item::new("c2", "", [1, 2, 3, 4, 9]),
    ])
    .unwrap();

    let freq = store.frequency_index();
    let report = QueryOrchestrator::new(&store, &freq).run("q", 0.5).unwrap();
    assert_eq!(report.filter.min_size(), 3);
    assert_eq!(report.filter.max_size(), 10);

    for run in &report.runs {
        assert_eq!(run.matches.len(), 2, "{}", run.kind);
        assert!(run.matches.get("c1").is_none());
        let c2 = run.matches.get("c2").expect("c2 should match");
        assert!((c2.tanimoto - 4.0 / 6.0).abs() < 1e-12);
    }
}

// =============================================================================
// Threshold boundaries
// =============================================================================

#[test]
fn threshold_one_matches_only_identical_sets() {
    let store = InMemoryStore::new(vec![
        Item::new("q", "", [1, 2, 3, 4, 5]),
        Item::new("swapped", "", [1, 2, 3, 4, 6]),
        Item::new("superset", "", [1, 2, 3, 4, 5, 6]),
        Item::new("subset", "", [1, 2, 3, 4]),
    ])
    .unwrap();

    for ids in run_all(&store, "q", 1.0) {
        assert_eq!(ids, vec!["q"]);
    }
}

#[test]
fn threshold_one_finds_identical_twin() {
    let store = InMemoryStore::new(vec![
        Item::new("q", "", [10, 20, 30]),
        Item::new("twin", "", [30, 20, 10]),
        Item::new("other", "", [10, 20, 31]),
    ])
    .unwrap();

    for ids in run_all(&store, "q", 1.0) {
        assert_eq!(ids, vec!["q", "twin"]);
    }
}

#[test]
fn ratio_equal_to_threshold_matches() {
    // {1,2,3} vs {1,2,4}: 2 / 4 = 0.5 exactly.
    let store = InMemoryStore::new(vec![
        Item::new("q", "", [1, 2, 3]),
        Item::new("half", "", [1, 2, 4]),
    ])
    .unwrap();

    for ids in run_all(&store, "q", 0.5) {
        assert_eq!(ids, vec!["half", "q"]);
    }
}

#[test]
fn decimal_threshold_boundary_is_exact() {
    // 7 / 10 = 0.7: 7 shared features, union of 10.
    let q: Vec<u32> = (0..7).collect();
    let c: Vec<u32> = (0..7).chain(100..103).collect();
    let store = InMemoryStore::new(vec![Item::new("q", "", q), Item::new("c", "", c)]).unwrap();

    for ids in run_all(&store, "q", 0.7) {
        assert_eq!(ids, vec!["c", "q"]);
    }
}

#[test]
fn low_threshold_widens_window() {
    let store = InMemoryStore::new(vec![
        Item::new("q", "", [1, 2]),
        Item::new("big", "", (2..40).collect::<Vec<_>>()),
        Item::new("disjoint", "", [50, 51]),
    ])
    .unwrap();

    // 1 / (2 + 38 - 1) = 1/39 ≈ 0.0256
    for ids in run_all(&store, "q", 0.02) {
        assert_eq!(ids, vec!["big", "q"]);
    }
}

#[test]
fn invalid_thresholds_rejected() {
    let store = InMemoryStore::new(vec![Item::new("q", "", [1])]).unwrap();
    let freq = store.frequency_index();
    let orch = QueryOrchestrator::new(&store, &freq);
    for t in [0.0, -0.1, 1.0001, f64::NAN, f64::INFINITY] {
        assert!(
            matches!(orch.run("q", t), Err(SearchError::InvalidThreshold { .. })),
            "{t} should be rejected"
        );
    }
}

#[test]
fn thresholds_past_decimal_precision_are_accepted() {
    let store = InMemoryStore::new(vec![
        Item::new("q", "", [1, 2, 3]),
        Item::new("big", "", (3..200).collect::<Vec<_>>()),
    ])
    .unwrap();

    // 1 / 199 ≈ 0.005 clears one third of a percent.
    for ids in run_all(&store, "q", 0.01 / 3.0) {
        assert_eq!(ids, vec!["big", "q"]);
    }
}

// =============================================================================
// Degenerate queries and corpora
// =============================================================================

#[test]
fn empty_query_has_no_matches() {
    let store = InMemoryStore::new(vec![
        Item::new("empty", "", Vec::<u32>::new()),
        Item::new("also-empty", "", Vec::<u32>::new()),
        Item::new("full", "", [1, 2, 3]),
    ])
    .unwrap();

    for ids in run_all(&store, "empty", 0.1) {
        assert!(ids.is_empty());
    }
}

#[test]
fn single_item_corpus_matches_itself() {
    let store = InMemoryStore::new(vec![Item::new("only", "", [4, 8, 15, 16, 23, 42])]).unwrap();
    for ids in run_all(&store, "only", 0.9) {
        assert_eq!(ids, vec!["only"]);
    }
}

#[test]
fn missing_query_item() {
    let store = InMemoryStore::new(vec![Item::new("a", "", [1])]).unwrap();
    let freq = store.frequency_index();
    let err = QueryOrchestrator::new(&store, &freq).run("nope", 0.5).unwrap_err();
    assert_eq!(err, SearchError::ItemNotFound("nope".into()));
}

// =============================================================================
// Data integrity and backend capabilities
// =============================================================================

#[test]
fn inconsistent_candidate_fails_every_strategy() {
    let mut bad = Item::new("bad", "", [1, 2, 3, 4, 5]);
    bad.feature_count = 6;
    let store = InMemoryStore::new(vec![Item::new("q", "", [1, 2, 3, 4, 5]), bad]).unwrap();

    let (query, filter) = strategies(&store, "q", 0.5);
    for kind in StrategyKind::ALL {
        let err = kind
            .build(false)
            .search(&store, &query, &filter, &Interrupt::none())
            .unwrap_err();
        assert!(
            matches!(err, SearchError::InconsistentItem { ref id, .. } if id == "bad"),
            "{kind}: {err}"
        );
    }
}

#[test]
fn corrupt_item_without_enough_overlap_is_ignored_by_every_strategy() {
    // Both sit inside the size window [3, 10] but share fewer than 3
    // features with the query; `stray` does not even touch the prefix.
    let mut stray = Item::new("stray", "", [6, 7, 8]);
    stray.feature_count = 4;
    let mut grazing = Item::new("grazing", "", [1, 9, 10]);
    grazing.feature_count = 5;
    let store = InMemoryStore::new(vec![
        Item::new("q", "", [1, 2, 3, 4, 5]),
        Item::new("c2", "", [1, 2, 3, 4, 9]),
        stray,
        grazing,
    ])
    .unwrap();

    let (query, filter) = strategies(&store, "q", 0.5);
    for kind in StrategyKind::ALL {
        for use_prefix in [false, true] {
            let out = kind
                .build(use_prefix)
                .search(&store, &query, &filter, &Interrupt::none())
                .unwrap_or_else(|e| panic!("{kind}: {e}"));
            assert_eq!(out.matches.ids().into_iter().collect::<Vec<_>>(), vec!["c2", "q"], "{kind}");
        }
    }
}

/// A backend that answers reducers and pipelines with malformed rows.
struct MalformedStore {
    duplicate: bool,
}

impl FeatureStore for MalformedStore {
    fn get(&self, id: &str, _interrupt: &Interrupt) -> Result<Option<Item>> {
        Ok(Some(Item::new(id, "", [1, 2, 3, 4, 5])))
    }

    fn find(&self, _predicate: &CandidatePredicate, _interrupt: &Interrupt) -> Result<Retrieved<Item>> {
        Ok(Retrieved {
            rows: vec![],
            examined: 0,
        })
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::ALL
    }

    fn reduce(
        &self,
        _predicate: &CandidatePredicate,
        _reducer: &OverlapReducer,
        _interrupt: &Interrupt,
    ) -> Result<Retrieved<Candidate>> {
        let row = Candidate {
            item_id: "c".into(),
            label: String::new(),
            matched: 5,
            total: 5,
        };
        Ok(Retrieved {
            rows: vec![row.clone(), row],
            examined: 2,
        })
    }

    fn aggregate(&self, _pipeline: &Pipeline, _interrupt: &Interrupt) -> Result<Retrieved<PipelineRow>> {
        let row = PipelineRow {
            item_id: "c".into(),
            label: String::new(),
            matched: 5,
            total: 5,
            tanimoto: None,
        };
        let rows = if self.duplicate {
            vec![
                PipelineRow {
                    tanimoto: Some(1.0),
                    ..row.clone()
                },
                PipelineRow {
                    tanimoto: Some(1.0),
                    ..row
                },
            ]
        } else {
            vec![row]
        };
        Ok(Retrieved { rows, examined: 1 })
    }
}

#[test]
fn malformed_store_rows_are_inconsistent_items() {
    let freq = FrequencyIndex::default();
    for duplicate in [false, true] {
        let store = MalformedStore { duplicate };
        let item = store.get("q", &Interrupt::none()).unwrap().unwrap();
        let query = Query::new(item, 0.5_f64.try_into().unwrap(), &freq).unwrap();
        let filter = query.filter();

        for kind in [StrategyKind::Functional, StrategyKind::Pipeline] {
            let err = kind
                .build(false)
                .search(&store, &query, &filter, &Interrupt::none())
                .unwrap_err();
            assert!(
                matches!(err, SearchError::InconsistentItem { ref id, .. } if id == "c"),
                "{kind} duplicate={duplicate}: {err}"
            );
        }
    }
}

#[test]
fn scan_works_without_optional_capabilities() {
    let store = InMemoryStore::new(vec![
        Item::new("q", "", [1, 2, 3]),
        Item::new("near", "", [1, 2, 3, 4]),
    ])
    .unwrap()
    .with_capabilities(Capabilities::NONE);

    let (query, filter) = strategies(&store, "q", 0.7);
    let scan = StrategyKind::Scan
        .build(false)
        .search(&store, &query, &filter, &Interrupt::none())
        .unwrap();
    assert_eq!(scan.matches.len(), 2);

    for kind in [StrategyKind::Functional, StrategyKind::Pipeline] {
        let err = kind
            .build(false)
            .search(&store, &query, &filter, &Interrupt::none())
            .unwrap_err();
        assert!(matches!(err, SearchError::StrategyUnsupported { .. }), "{kind}");
    }
}

#[test]
fn pipeline_prefix_option_does_not_change_results() {
    let store = InMemoryStore::new(vec![
        Item::new("q", "", [1, 2, 3, 4, 5, 6]),
        Item::new("a", "", [1, 2, 3, 4, 5, 7]),
        Item::new("b", "", [2, 3, 4, 5, 6, 8, 9]),
        Item::new("c", "", [6, 7, 8, 9, 10]),
    ])
    .unwrap();

    let (query, filter) = strategies(&store, "q", 0.6);
    let plain = StrategyKind::Pipeline
        .build(false)
        .search(&store, &query, &filter, &Interrupt::none())
        .unwrap();
    let with_prefix = StrategyKind::Pipeline
        .build(true)
        .search(&store, &query, &filter, &Interrupt::none())
        .unwrap();
    assert_eq!(plain.matches, with_prefix.matches);
    assert!(with_prefix.stats.examined <= store.len());
}

#[test]
fn zero_timeout_times_out() {
    let store = InMemoryStore::new(vec![Item::new("q", "", [1, 2])]).unwrap();
    let freq = store.frequency_index();
    let err = QueryOrchestrator::new(&store, &freq)
        .with_config(SearchConfig {
            timeout_ms: Some(0),
            ..SearchConfig::default()
        })
        .run("q", 0.5)
        .unwrap_err();
    assert!(matches!(err, SearchError::TimedOut { .. }));
}
