//! Declarative staged pipelines over the item collection.
//!
//! A [`Pipeline`] is an ordered list of [`Stage`]s. Each stage consumes the
//! rows the previous one produced, and the row shape changes along the way:
//!
//! ```text
//! items --MatchSize/MatchAnyFeature--> items
//! items --Unwind--> (item, feature) rows
//! rows  --MatchFeatureIn--> rows
//! rows  --GroupCount--> per-item groups --MatchMinOverlap--> groups
//! groups --ProjectTanimoto--> scored groups --MatchTanimoto--> scored groups
//! ```
//!
//! `ProjectTanimoto` is the first stage that reads an item's declared
//! `feature_count`, so that is where inconsistent items are reported.
//!
//! [`Pipeline::execute`] is the reference interpreter; backends with a native
//! aggregation engine translate stages one-to-one instead.

use crate::error::{Result, SearchError};
use crate::filter::SizeRange;
use crate::fingerprint::{FeatureId, FeatureSet, Item};
use crate::interrupt::Interrupt;
use crate::similarity::SimilarityEvaluator;
use crate::store::Retrieved;
use crate::threshold::Threshold;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How often (in rows) the interpreter polls its interrupt.
const CHECK_EVERY: usize = 256;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stage {
    /// Keep items whose feature count is in range.
    MatchSize(SizeRange),
    /// Keep items containing at least one of the features.
    MatchAnyFeature(Vec<FeatureId>),
    /// One row per (item, feature).
    Unwind,
    /// Keep rows whose feature is in the set.
    MatchFeatureIn(FeatureSet),
    /// Group rows by item: matched = row count, total = item feature count.
    GroupCount,
    /// Keep groups with at least this many matched rows.
    MatchMinOverlap(usize),
    /// `tanimoto = matched / (query_size + total - matched)`.
    ProjectTanimoto { query_size: usize },
    /// Keep groups whose tanimoto meets the threshold.
    MatchTanimoto(Threshold),
}

impl Stage {
    fn name(&self) -> &'static str {
        match self {
            Stage::MatchSize(_) => "MatchSize",
            Stage::MatchAnyFeature(_) => "MatchAnyFeature",
            Stage::Unwind => "Unwind",
            Stage::MatchFeatureIn(_) => "MatchFeatureIn",
            Stage::GroupCount => "GroupCount",
            Stage::MatchMinOverlap(_) => "MatchMinOverlap",
            Stage::ProjectTanimoto { .. } => "ProjectTanimoto",
            Stage::MatchTanimoto(_) => "MatchTanimoto",
        }
    }
}

/// One output group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRow {
    pub item_id: String,
    pub label: String,
    pub matched: usize,
    pub total: usize,
    /// Present once a `ProjectTanimoto` stage ran.
    pub tanimoto: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Items,
    Features,
    Groups,
    Scored,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Check that each stage receives the row shape it expects and that the
    /// pipeline ends in groups.
    pub fn validate(&self) -> Result<()> {
        let mut shape = Shape::Items;
        for (i, stage) in self.stages.iter().enumerate() {
            let next = match (stage, shape) {
                (Stage::MatchSize(_) | Stage::MatchAnyFeature(_), Shape::Items) => Shape::Items,
                (Stage::Unwind, Shape::Items) => Shape::Features,
                (Stage::MatchFeatureIn(_), Shape::Features) => Shape::Features,
                (Stage::GroupCount, Shape::Features) => Shape::Groups,
                (Stage::MatchMinOverlap(_), Shape::Groups) => Shape::Groups,
                (Stage::ProjectTanimoto { .. }, Shape::Groups) => Shape::Scored,
                (Stage::MatchTanimoto(_), Shape::Scored) => Shape::Scored,
                (stage, shape) => {
                    return Err(SearchError::InvalidPipeline(format!(
                        "stage {i} ({}) cannot consume {shape:?} rows",
                        stage.name()
                    )))
                }
            };
            shape = next;
        }
        match shape {
            Shape::Groups | Shape::Scored => Ok(()),
            other => Err(SearchError::InvalidPipeline(format!(
                "pipeline ends with {other:?} rows; expected grouped output"
            ))),
        }
    }

    /// Run the pipeline over `items`.
    pub fn execute<'a>(
        &self,
        items: impl IntoIterator<Item = &'a Item>,
        interrupt: &Interrupt,
    ) -> Result<Retrieved<PipelineRow>> {
        self.validate()?;

        let mut rows = Rows::Items(items.into_iter().collect());
        let examined = match &rows {
            Rows::Items(items) => items.len(),
            _ => 0,
        };
        for stage in &self.stages {
            interrupt.check()?;
            rows = rows.apply(stage, interrupt)?;
        }

        let groups = match rows {
            Rows::Groups(groups) => groups,
            // validate() guarantees grouped output.
            _ => return Err(SearchError::InvalidPipeline("ungrouped output".into())),
        };
        Ok(Retrieved {
            rows: groups
                .into_iter()
                .map(|g| PipelineRow {
                    item_id: g.item.id.clone(),
                    label: g.item.label.clone(),
                    matched: g.matched,
                    total: g.total,
                    tanimoto: g.score.map(|s| s.tanimoto),
                })
                .collect(),
            examined,
        })
    }
}

#[derive(Debug, Clone, Copy)]
struct Score {
    union: usize,
    tanimoto: f64,
}

#[derive(Debug)]
struct Group<'a> {
    item: &'a Item,
    matched: usize,
    total: usize,
    score: Option<Score>,
}

enum Rows<'a> {
    Items(Vec<&'a Item>),
    Features(Vec<(&'a Item, FeatureId)>),
    Groups(Vec<Group<'a>>),
}

fn poll(i: usize, interrupt: &Interrupt) -> Result<()> {
    if i % CHECK_EVERY == 0 {
        interrupt.check()?;
    }
    Ok(())
}

impl<'a> Rows<'a> {
    fn apply(self, stage: &Stage, interrupt: &Interrupt) -> Result<Self> {
        Ok(match (stage, self) {
            (Stage::MatchSize(size), Rows::Items(items)) => {
                Rows::Items(items.into_iter().filter(|it| size.contains(it.feature_count)).collect())
            }
            (Stage::MatchAnyFeature(ids), Rows::Items(items)) => Rows::Items(
                items
                    .into_iter()
                    .filter(|it| it.features.contains_any(ids))
                    .collect(),
            ),
            (Stage::Unwind, Rows::Items(items)) => {
                let mut out = Vec::new();
                for (i, item) in items.into_iter().enumerate() {
                    poll(i, interrupt)?;
                    out.extend(item.features.iter().map(|f| (item, f)));
                }
                Rows::Features(out)
            }
            (Stage::MatchFeatureIn(set), Rows::Features(rows)) => {
                Rows::Features(rows.into_iter().filter(|(_, f)| set.contains(*f)).collect())
            }
            (Stage::GroupCount, Rows::Features(rows)) => {
                let mut slots: HashMap<&str, usize> = HashMap::new();
                let mut groups: Vec<Group<'a>> = Vec::new();
                for (i, (item, _)) in rows.into_iter().enumerate() {
                    poll(i, interrupt)?;
                    let slot = *slots.entry(item.id.as_str()).or_insert_with(|| {
                        groups.push(Group {
                            item,
                            matched: 0,
                            total: item.feature_count,
                            score: None,
                        });
                        groups.len() - 1
                    });
                    groups[slot].matched += 1;
                }
                Rows::Groups(groups)
            }
            (Stage::MatchMinOverlap(min), Rows::Groups(groups)) => {
                Rows::Groups(groups.into_iter().filter(|g| g.matched >= *min).collect())
            }
            (Stage::ProjectTanimoto { query_size }, Rows::Groups(mut groups)) => {
                for g in &mut groups {
                    g.item.validate()?;
                    g.score = Some(Score {
                        union: (query_size + g.total).saturating_sub(g.matched),
                        tanimoto: SimilarityEvaluator::tanimoto(g.matched, *query_size, g.total),
                    });
                }
                Rows::Groups(groups)
            }
            (Stage::MatchTanimoto(threshold), Rows::Groups(groups)) => Rows::Groups(
                groups
                    .into_iter()
                    .filter(|g| {
                        g.score
                            .is_some_and(|s| threshold.is_met_by(g.matched, s.union))
                    })
                    .collect(),
            ),
            (stage, _) => {
                return Err(SearchError::InvalidPipeline(format!(
                    "stage {} received rows of the wrong shape",
                    stage.name()
                )))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Vec<Item> {
        vec![
            Item::new("c1", "", [1, 2, 3, 6, 7]),
            Item::new("c2", "", [1, 2, 3, 4, 9]),
            Item::new("c3", "", [8, 9]),
        ]
    }

    fn full(threshold: &str) -> Pipeline {
        Pipeline::new()
            .stage(Stage::MatchSize(SizeRange { min: 3, max: 10 }))
            .stage(Stage::Unwind)
            .stage(Stage::MatchFeatureIn(FeatureSet::new([1, 2, 3, 4, 5])))
            .stage(Stage::GroupCount)
            .stage(Stage::MatchMinOverlap(3))
            .stage(Stage::ProjectTanimoto { query_size: 5 })
            .stage(Stage::MatchTanimoto(threshold.parse().unwrap()))
    }

    #[test]
    fn six_stage_pipeline_matches_worked_example() {
        let items = corpus();
        let out = full("0.5").execute(&items, &Interrupt::none()).unwrap();
        assert_eq!(out.examined, 3);
        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.rows[0].item_id, "c2");
        assert_eq!(out.rows[0].matched, 4);
        assert!((out.rows[0].tanimoto.unwrap() - 4.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn grouping_without_projection_reports_counts() {
        let items = corpus();
        let p = Pipeline::new()
            .stage(Stage::Unwind)
            .stage(Stage::MatchFeatureIn(FeatureSet::new([1, 9])))
            .stage(Stage::GroupCount);
        let out = p.execute(&items, &Interrupt::none()).unwrap();
        let counts: Vec<(&str, usize)> =
            out.rows.iter().map(|r| (r.item_id.as_str(), r.matched)).collect();
        assert_eq!(counts, vec![("c1", 1), ("c2", 2), ("c3", 1)]);
        assert!(out.rows.iter().all(|r| r.tanimoto.is_none()));
    }

    #[test]
    fn misordered_stages_are_rejected() {
        let p = Pipeline::new().stage(Stage::GroupCount).stage(Stage::Unwind);
        assert!(matches!(p.validate(), Err(SearchError::InvalidPipeline(_))));

        let p = Pipeline::new()
            .stage(Stage::Unwind)
            .stage(Stage::MatchTanimoto("0.5".parse().unwrap()));
        assert!(p.validate().is_err());

        // Ends before grouping.
        let p = Pipeline::new().stage(Stage::Unwind);
        assert!(p.validate().is_err());
    }

    #[test]
    fn inconsistent_item_surfaces_at_projection() {
        let mut items = corpus();
        items[0].feature_count = 9;
        let err = full("0.5").execute(&items, &Interrupt::none()).unwrap_err();
        assert!(matches!(err, SearchError::InconsistentItem { ref id, .. } if id == "c1"));
    }

    #[test]
    fn inconsistent_item_below_min_overlap_is_not_checked() {
        let mut items = corpus();
        // c3 = {8, 9} shares nothing with the query, so it never forms a group.
        items[2].feature_count = 4;
        let out = full("0.5").execute(&items, &Interrupt::none()).unwrap();
        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.rows[0].item_id, "c2");
    }

    #[test]
    fn min_overlap_stage_drops_thin_groups() {
        let items = corpus();
        let p = Pipeline::new()
            .stage(Stage::Unwind)
            .stage(Stage::MatchFeatureIn(FeatureSet::new([1, 2, 9])))
            .stage(Stage::GroupCount)
            .stage(Stage::MatchMinOverlap(2));
        let out = p.execute(&items, &Interrupt::none()).unwrap();
        let ids: Vec<&str> = out.rows.iter().map(|r| r.item_id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2"]);
        assert_eq!(p.stages().len(), 4);
    }
}
