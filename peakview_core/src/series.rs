//! Chart Series Builder
//! ====================
//!
//! Derives the data behind the 2D multi-line chart:
//! - the year axis of the full view
//! - the three-point view (before / intervention / final)
//! - the average line and the relative-progression line
//!
//! The rendered geometry of these series is what the proximity resolver
//! hit-tests against.

use crate::cohort::mean_improvement;
use crate::intervention::find_first_intervention;
use crate::trajectory::Trajectory;
use std::collections::BTreeSet;

/// Slot labels of the three-point view.
pub const THREE_POINT_LABELS: [&str; 3] = ["Avant Jobtrek", "Jobtrek", "Étape finale"];

/// Axis of the three-point view: its points are re-indexed at 0, 1 and 2.
pub const THREE_POINT_AXIS: [i32; 3] = [0, 1, 2];

/// Sorted distinct years across all points.
pub fn year_axis<'a, I>(trajectories: I) -> Vec<i32>
where
    I: IntoIterator<Item = &'a Trajectory>,
{
    trajectories
        .into_iter()
        .flat_map(|t| t.points().iter().map(|p| p.year))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Reduces one trajectory to its before / intervention / final points.
///
/// The middle point is the first intervention event, or the middle point of
/// the trajectory when there is none. Returns `None` for an empty trajectory.
pub fn three_point(trajectory: &Trajectory) -> Option<Trajectory> {
    let points = trajectory.points();
    let first = points.first()?;
    let last = points.last()?;
    let middle = match find_first_intervention(trajectory) {
        Some(ip) => ip.point,
        None => &points[points.len() / 2],
    };

    let reindexed = [first, middle, last]
        .into_iter()
        .zip(THREE_POINT_AXIS)
        .map(|(point, slot)| {
            let mut point = point.clone();
            point.year = slot;
            point
        })
        .collect();

    Some(
        Trajectory::new(&trajectory.id, &trajectory.user_code, &trajectory.program_type, reindexed)
            .with_name(&trajectory.name)
            .with_start_year(trajectory.start_year)
            .with_max_height(trajectory.max_height),
    )
}

/// Three-point form of every non-empty trajectory.
pub fn three_point_view(trajectories: &[Trajectory]) -> Vec<Trajectory> {
    trajectories.iter().filter_map(three_point).collect()
}

/// Per axis slot, the mean cumulative score of the first point at that slot.
///
/// `None` where no trajectory has a point at the slot.
pub fn average_series(axis: &[i32], trajectories: &[Trajectory]) -> Vec<Option<f64>> {
    axis.iter()
        .map(|&slot| {
            let scores: Vec<f64> = trajectories
                .iter()
                .filter_map(|t| t.points().iter().find(|p| p.year == slot))
                .map(|p| p.cumulative_score)
                .collect();
            if scores.is_empty() {
                None
            } else {
                Some(scores.iter().sum::<f64>() / scores.len() as f64)
            }
        })
        .collect()
}

/// Per-trajectory series over `axis`, `None` where the trajectory has no point.
pub fn trajectory_series(axis: &[i32], trajectory: &Trajectory) -> Vec<Option<f64>> {
    axis.iter()
        .map(|&slot| {
            trajectory
                .points()
                .iter()
                .find(|p| p.year == slot)
                .map(|p| p.cumulative_score)
        })
        .collect()
}

/// Relative-progression line derived from the average line.
///
/// In the three-point view the line is `[None, share, 100]`, where `share`
/// is how much of the before-to-final change the intervention slot already
/// accounts for. In the full view each slot is its progression relative to
/// the middle slot, clamped to `[0, 100]`.
pub fn progression_series(average: &[Option<f64>], three_point_view: bool) -> Vec<Option<f64>> {
    if three_point_view && average.len() == THREE_POINT_AXIS.len() {
        return three_point_progression(average);
    }

    let middle = average.get(average.len() / 2).copied().flatten();
    average
        .iter()
        .enumerate()
        .map(|(index, current)| {
            if index == 0 {
                return Some(0.0);
            }
            let (Some(current), Some(_previous)) = (*current, average[index - 1]) else {
                return None;
            };
            match middle {
                Some(mid) if mid != 0.0 => {
                    Some(((current - mid) / mid.abs() * 100.0).clamp(0.0, 100.0))
                }
                _ => Some(0.0),
            }
        })
        .collect()
}

fn three_point_progression(average: &[Option<f64>]) -> Vec<Option<f64>> {
    let (Some(before), Some(intervention), Some(final_score)) = (average[0], average[1], average[2])
    else {
        return vec![None; 3];
    };

    let total = final_score - before;
    let share = if total != 0.0 {
        (intervention - before) / total * 100.0
    } else {
        0.0
    };
    vec![None, Some(share), Some(100.0)]
}

/// Rounded mean of individual improvements over trajectories containing an
/// intervention event; 0 when there are none.
pub fn cohort_intervention_to_final(trajectories: &[Trajectory]) -> i64 {
    mean_improvement(trajectories)
}
