//! Individual impact of the intervention on one trajectory.

use crate::intervention::{find_first_intervention, is_intervention_event};
use crate::trajectory::Trajectory;
use serde::{Deserialize, Serialize};

/// Rounds to the nearest integer, ties toward +∞ (so `-2.5 -> -2`).
///
/// Non-finite values round to 0.
pub(crate) fn round_half_up(value: f64) -> i64 {
    if !value.is_finite() {
        return 0;
    }
    (value + 0.5).floor() as i64
}

/// Which formula produced an improvement percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpactBranch {
    /// No intervention point or nothing after it; the result is 0.
    Unavailable,
    /// The baseline score was exactly 0: the value is `round(final * 100)`,
    /// an absolute-scaled figure rather than a true ratio.
    ZeroBaseline,
    /// `(final - baseline) / |baseline| * 100`
    Relative,
}

/// Signed change between two scores under the zero-baseline policy.
pub fn percentage_change(baseline: f64, target: f64) -> (i64, ImpactBranch) {
    if baseline == 0.0 {
        (round_half_up(target * 100.0), ImpactBranch::ZeroBaseline)
    } else {
        (
            round_half_up((target - baseline) / baseline.abs() * 100.0),
            ImpactBranch::Relative,
        )
    }
}

/// Everything the profile panel shows about one trajectory's impact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactReport {
    pub intervention_year: Option<i32>,
    pub intervention_score: Option<f64>,
    pub final_score: Option<f64>,
    pub improvement: i64,
    pub branch: ImpactBranch,
}

impl ImpactReport {
    fn unavailable(intervention_year: Option<i32>) -> Self {
        Self {
            intervention_year,
            intervention_score: None,
            final_score: None,
            improvement: 0,
            branch: ImpactBranch::Unavailable,
        }
    }
}

/// Computes the full impact report for a trajectory.
pub fn individual_impact(trajectory: &Trajectory) -> ImpactReport {
    let Some(first) = find_first_intervention(trajectory) else {
        return ImpactReport::unavailable(None);
    };
    let year = first.year();
    let points = trajectory.points();

    let intervention_point = points
        .iter()
        .find(|p| p.year == year && is_intervention_event(&p.event));
    let final_point = points.iter().rev().find(|p| p.year > year);

    let (Some(intervention_point), Some(final_point)) = (intervention_point, final_point) else {
        return ImpactReport::unavailable(Some(year));
    };

    let (improvement, branch) =
        percentage_change(intervention_point.cumulative_score, final_point.cumulative_score);

    ImpactReport {
        intervention_year: Some(year),
        intervention_score: Some(intervention_point.cumulative_score),
        final_score: Some(final_point.cumulative_score),
        improvement,
        branch,
    }
}

/// Signed percentage change from the intervention point to the last later
/// point; 0 whenever it cannot be computed.
pub fn individual_improvement(trajectory: &Trajectory) -> i64 {
    individual_impact(trajectory).improvement
}

/// Change from the point just before the first intervention to the
/// intervention itself; `None` when the intervention opens the trajectory.
pub fn before_to_intervention_improvement(trajectory: &Trajectory) -> Option<i64> {
    let first = find_first_intervention(trajectory)?;
    if first.index == 0 {
        return None;
    }
    let previous = &trajectory.points()[first.index - 1];
    Some(percentage_change(previous.cumulative_score, first.point.cumulative_score).0)
}

/// Mean cumulative score strictly before and strictly after the
/// intervention year, when both sides have points.
pub fn before_after_means(trajectory: &Trajectory) -> Option<(f64, f64)> {
    let year = find_first_intervention(trajectory)?.year();

    let mean = |scores: Vec<f64>| -> Option<f64> {
        if scores.is_empty() {
            None
        } else {
            Some(scores.iter().sum::<f64>() / scores.len() as f64)
        }
    };

    let points = trajectory.points();
    let before = mean(points.iter().filter(|p| p.year < year).map(|p| p.cumulative_score).collect())?;
    let after = mean(points.iter().filter(|p| p.year > year).map(|p| p.cumulative_score).collect())?;
    Some((before, after))
}
