//! JSON exporter for scenario runs and loaded snapshots.
//!
//! Writes the cohort statistics together with a per-trajectory summary, so
//! a run can be inspected or diffed without re-running the analytics.

use crate::error::SimError;
use peakview_core::{individual_impact, normalize, CohortStatistics, ImpactBranch, Trajectory};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// One trajectory as seen by the analytics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectorySummary {
    pub id: String,
    pub user_code: String,
    pub points: usize,
    pub hidden: bool,

    /// Largest normalized magnitude
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peak_magnitude: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub intervention_year: Option<i32>,
    pub improvement: i64,
    pub branch: ImpactBranch,
}

impl TrajectorySummary {
    pub fn new(trajectory: &Trajectory) -> Self {
        let impact = individual_impact(trajectory);
        Self {
            id: trajectory.id.clone(),
            user_code: trajectory.user_code.clone(),
            points: trajectory.len(),
            hidden: trajectory.is_hidden(),
            peak_magnitude: normalize(trajectory.points()).peak(),
            intervention_year: impact.intervention_year,
            improvement: impact.improvement,
            branch: impact.branch,
        }
    }
}

/// Complete export of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimExport {
    /// Scenario name, or the input path for a loaded snapshot
    pub scenario: String,
    pub seed: u64,
    pub passed: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,

    pub statistics: CohortStatistics,
    pub trajectories: Vec<TrajectorySummary>,
}

impl SimExport {
    /// Summarizes `population`. The export starts as not passed.
    pub fn new(scenario: &str, seed: u64, population: &[Trajectory]) -> Self {
        Self {
            scenario: scenario.to_string(),
            seed,
            passed: false,
            failure_reason: None,
            statistics: CohortStatistics::compute(population),
            trajectories: population.iter().map(TrajectorySummary::new).collect(),
        }
    }

    pub fn finalize(&mut self, passed: bool, failure_reason: Option<String>) {
        self.passed = passed;
        self.failure_reason = failure_reason;
    }

    pub fn hidden_count(&self) -> usize {
        self.trajectories.iter().filter(|t| t.hidden).count()
    }

    pub fn to_json(&self) -> Result<String, SimError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Writes the export as pretty JSON.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<(), SimError> {
        let json = self.to_json()?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }

    pub fn read_from_file(path: impl AsRef<Path>) -> Result<Self, SimError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}
