//! Refresh steps and stage sequencing.
//!
//! A refresh names the first stage whose inputs changed. Every stage after it
//! in the pipeline order re-runs; stages before it keep their cached output.
//!
//! The pipeline order depends on one piece of configuration: when the sort
//! model reads an aggregated column, aggregation has to run before sorting.
//! Otherwise sorting runs first and aggregation after it.

use serde::{Deserialize, Serialize};

/// The point at which a refresh enters the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RefreshStep {
    /// Rebuild groups from the records, then everything downstream.
    Everything,
    /// Re-run the filter and everything downstream.
    Filter,
    /// Re-run the pivot stage and everything downstream.
    Pivot,
    /// Re-run aggregation and everything downstream.
    Aggregate,
    /// Re-run sorting and everything downstream.
    Sort,
    /// Re-flatten only (expand state, row heights).
    Map,
    /// Do nothing.
    Nothing,
}

/// A pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Group/tree building.
    Group,
    /// Filter evaluation.
    Filter,
    /// Pivot key collection.
    Pivot,
    /// Aggregation.
    Aggregate,
    /// Sorting.
    Sort,
    /// Flattening into display order.
    Flatten,
}

const SORT_THEN_AGGREGATE: [Stage; 6] = [
    Stage::Group,
    Stage::Filter,
    Stage::Pivot,
    Stage::Sort,
    Stage::Aggregate,
    Stage::Flatten,
];

const AGGREGATE_THEN_SORT: [Stage; 6] = [
    Stage::Group,
    Stage::Filter,
    Stage::Pivot,
    Stage::Aggregate,
    Stage::Sort,
    Stage::Flatten,
];

/// The ordered list of stages a refresh runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelinePlan {
    stages: Vec<Stage>,
}

impl PipelinePlan {
    /// Plans the stages for `step`.
    ///
    /// `sort_reads_aggregates` puts aggregation before sorting.
    pub fn for_step(step: RefreshStep, sort_reads_aggregates: bool) -> Self {
        let order: &[Stage] = if sort_reads_aggregates {
            &AGGREGATE_THEN_SORT
        } else {
            &SORT_THEN_AGGREGATE
        };

        let first = match step {
            RefreshStep::Everything => Stage::Group,
            RefreshStep::Filter => Stage::Filter,
            RefreshStep::Pivot => Stage::Pivot,
            RefreshStep::Aggregate => Stage::Aggregate,
            RefreshStep::Sort => Stage::Sort,
            RefreshStep::Map => Stage::Flatten,
            RefreshStep::Nothing => return Self { stages: Vec::new() },
        };

        let start = order.iter().position(|&s| s == first).unwrap_or(0);
        Self {
            stages: order[start..].to_vec(),
        }
    }

    /// Stages in execution order.
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Whether `stage` runs.
    pub fn contains(&self, stage: Stage) -> bool {
        self.stages.contains(&stage)
    }

    /// Whether nothing runs.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}
