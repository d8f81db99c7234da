//! Cohort Aggregator
//! =================
//!
//! Population-level impact statistics for the statistics panel:
//! - **Mean improvement** across trajectories with an intervention
//! - **Progression breakdown** (progression / stagnation / regression)
//! - **Top post-intervention events** by frequency
//! - **Program distribution** and per-program start/intervention/final averages
//!
//! Every operation is independently callable and returns zero/empty values
//! for an empty population.

use crate::impact::{before_after_means, individual_improvement, round_half_up};
use crate::intervention::{
    find_first_intervention, find_first_intervention_year, is_intervention_event, ProgramType,
    NEUTRAL_EVENT,
};
use crate::trajectory::{Trajectory, MIN_VISIBLE_POINTS};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Number of labels kept by [`top_post_intervention_events`].
pub const TOP_EVENTS: usize = 5;

fn percent(count: usize, total: usize) -> i64 {
    if total == 0 {
        0
    } else {
        round_half_up(count as f64 / total as f64 * 100.0)
    }
}

fn mean(total: f64, count: usize) -> f64 {
    if count > 0 {
        total / count as f64
    } else {
        0.0
    }
}

/// Trajectories eligible for aggregate statistics: at least three points and
/// a detectable intervention.
pub fn qualifying(population: &[Trajectory]) -> Vec<&Trajectory> {
    population
        .iter()
        .filter(|t| t.len() >= MIN_VISIBLE_POINTS && find_first_intervention_year(t).is_some())
        .collect()
}

// =============================================================================
// MEAN IMPROVEMENT & BREAKDOWN
// =============================================================================

/// Rounded mean of individual improvements over trajectories with an
/// intervention.
pub fn mean_improvement<'a, I>(population: I) -> i64
where
    I: IntoIterator<Item = &'a Trajectory>,
{
    let (total, count) = population
        .into_iter()
        .filter(|t| find_first_intervention_year(t).is_some())
        .fold((0.0, 0usize), |(total, count), t| {
            (total + individual_improvement(t) as f64, count + 1)
        });

    if count == 0 {
        0
    } else {
        round_half_up(total / count as f64)
    }
}

/// Share of trajectories whose improvement is positive, zero or negative.
///
/// Each percentage is rounded on its own, so the three need not sum to 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProgressionBreakdown {
    pub progression_percentage: i64,
    pub stagnation_percentage: i64,
    pub regression_percentage: i64,
    pub total_count: usize,
}

pub fn progression_breakdown<'a, I>(population: I) -> ProgressionBreakdown
where
    I: IntoIterator<Item = &'a Trajectory>,
{
    let mut progression = 0;
    let mut stagnation = 0;
    let mut regression = 0;

    for trajectory in population {
        if find_first_intervention_year(trajectory).is_none() {
            continue;
        }
        match individual_improvement(trajectory) {
            i if i > 0 => progression += 1,
            0 => stagnation += 1,
            _ => regression += 1,
        }
    }

    let total_count = progression + stagnation + regression;
    ProgressionBreakdown {
        progression_percentage: percent(progression, total_count),
        stagnation_percentage: percent(stagnation, total_count),
        regression_percentage: percent(regression, total_count),
        total_count,
    }
}

// =============================================================================
// POST-INTERVENTION EVENTS
// =============================================================================

/// One ranked post-intervention event label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventShare {
    pub event: String,
    pub count: usize,
    /// Share of all counted post-intervention events
    pub percentage: i64,
}

/// The most frequent event labels after each trajectory's intervention
/// year, ignoring intervention events and the neutral label.
///
/// Equal counts keep the order in which labels were first seen.
pub fn top_post_intervention_events<'a, I>(population: I) -> Vec<EventShare>
where
    I: IntoIterator<Item = &'a Trajectory>,
{
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<(&str, usize)> = Vec::new();
    let mut total = 0usize;

    for trajectory in population {
        let Some(year) = find_first_intervention_year(trajectory) else {
            continue;
        };

        let later = trajectory
            .points()
            .iter()
            .filter(|p| p.year > year && !is_intervention_event(&p.event) && p.event != NEUTRAL_EVENT);

        for point in later {
            let slot = *index.entry(point.event.as_str()).or_insert_with(|| {
                counts.push((point.event.as_str(), 0));
                counts.len() - 1
            });
            counts[slot].1 += 1;
            total += 1;
        }
    }

    // Stable: ties stay in first-seen order.
    counts.sort_by(|a, b| b.1.cmp(&a.1));

    counts
        .into_iter()
        .take(TOP_EVENTS)
        .map(|(event, count)| EventShare {
            event: event.to_string(),
            count,
            percentage: percent(count, total),
        })
        .collect()
}

// =============================================================================
// PROGRAM BREAKDOWN
// =============================================================================

/// Trajectory counts per intervention program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProgramDistribution {
    pub mist: usize,
    pub school: usize,
    pub total: usize,
}

impl ProgramDistribution {
    pub fn count(&self, program: ProgramType) -> usize {
        match program {
            ProgramType::Mist => self.mist,
            ProgramType::School => self.school,
        }
    }
}

pub fn program_distribution<'a, I>(population: I) -> ProgramDistribution
where
    I: IntoIterator<Item = &'a Trajectory>,
{
    let mut dist = ProgramDistribution::default();
    for trajectory in population {
        match ProgramType::classify(trajectory) {
            Some(ProgramType::Mist) => dist.mist += 1,
            Some(ProgramType::School) => dist.school += 1,
            None => {}
        }
    }
    dist.total = dist.mist + dist.school;
    dist
}

/// Mean cumulative score at the start, at the intervention and at the end.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ImpactAverages {
    pub start_avg: f64,
    pub intervention_avg: f64,
    pub final_avg: f64,
    /// Trajectories that contributed to the averages
    pub count: usize,
}

/// Start/intervention/final averages for both program buckets.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ProgramImpact {
    pub mist: ImpactAverages,
    pub school: ImpactAverages,
}

impl ProgramImpact {
    pub fn get(&self, program: ProgramType) -> &ImpactAverages {
        match program {
            ProgramType::Mist => &self.mist,
            ProgramType::School => &self.school,
        }
    }
}

fn impact_averages<'a>(trajectories: impl Iterator<Item = &'a Trajectory>) -> ImpactAverages {
    let mut start = 0.0;
    let mut intervention = 0.0;
    let mut last = 0.0;
    let mut count = 0;

    for trajectory in trajectories {
        let Some(first) = find_first_intervention(trajectory) else {
            continue;
        };
        let (Some(first_point), Some(last_point)) = (trajectory.first_point(), trajectory.last_point()) else {
            continue;
        };
        start += first_point.cumulative_score;
        intervention += first.point.cumulative_score;
        last += last_point.cumulative_score;
        count += 1;
    }

    ImpactAverages {
        start_avg: mean(start, count),
        intervention_avg: mean(intervention, count),
        final_avg: mean(last, count),
        count,
    }
}

/// Per-program averages; trajectories without an intervention are skipped.
pub fn program_impact<'a, I>(population: I) -> ProgramImpact
where
    I: IntoIterator<Item = &'a Trajectory>,
{
    let classified: Vec<(&Trajectory, Option<ProgramType>)> = population
        .into_iter()
        .map(|t| (t, ProgramType::classify(t)))
        .collect();

    let bucket = |program: ProgramType| {
        impact_averages(
            classified
                .iter()
                .filter(move |(_, p)| *p == Some(program))
                .map(|(t, _)| *t),
        )
    };

    ProgramImpact {
        mist: bucket(ProgramType::Mist),
        school: bucket(ProgramType::School),
    }
}

// =============================================================================
// BEFORE / AFTER COMPARISON
// =============================================================================

/// Population average of per-trajectory before/after mean scores.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SimpleComparison {
    pub before_avg: f64,
    pub after_avg: f64,
}

pub fn simple_comparison<'a, I>(population: I) -> SimpleComparison
where
    I: IntoIterator<Item = &'a Trajectory>,
{
    let (before, after, count) = population
        .into_iter()
        .filter_map(before_after_means)
        .fold((0.0, 0.0, 0usize), |(b, a, n), (before, after)| (b + before, a + after, n + 1));

    SimpleComparison {
        before_avg: mean(before, count),
        after_avg: mean(after, count),
    }
}

// =============================================================================
// COHORT STATISTICS
// =============================================================================

/// Everything the statistics panel shows for one population snapshot.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CohortStatistics {
    pub improvement_percentage: i64,
    pub progression_breakdown: ProgressionBreakdown,
    pub top_post_intervention_events: Vec<EventShare>,
    pub program_distribution: ProgramDistribution,
    pub simple_comparison: SimpleComparison,
    pub program_impact: ProgramImpact,
}

impl CohortStatistics {
    /// Restricts `population` to [`qualifying`] trajectories and runs every
    /// aggregate over them.
    pub fn compute(population: &[Trajectory]) -> Self {
        let cohort = qualifying(population);
        if cohort.is_empty() {
            return Self::default();
        }

        tracing::debug!(
            population = population.len(),
            qualifying = cohort.len(),
            "computing cohort statistics"
        );

        let members = || cohort.iter().copied();
        Self {
            improvement_percentage: mean_improvement(members()),
            progression_breakdown: progression_breakdown(members()),
            top_post_intervention_events: top_post_intervention_events(members()),
            program_distribution: program_distribution(members()),
            simple_comparison: simple_comparison(members()),
            program_impact: program_impact(members()),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trajectory::{accumulate, Point};
    use approx::assert_relative_eq;

    fn with_scores(id: &str, steps: &[(i32, f64, &str)]) -> Trajectory {
        let points = steps
            .iter()
            .map(|&(year, cumulative, event)| Point::new(year, 0.0, cumulative, event))
            .collect();
        Trajectory::new(id, id, "", points)
    }

    fn sample_population() -> Vec<Trajectory> {
        vec![
            // +50%
            with_scores("a", &[(2018, 4.0, "Ecole"), (2019, 10.0, "Mesure MISt Jobtrek"), (2021, 15.0, "CFC")]),
            // -50%
            with_scores("b", &[(2018, 2.0, "Ecole"), (2019, 4.0, "JobtrekSchool"), (2020, 2.0, "Chômage")]),
            // 0% (no later change)
            with_scores("c", &[(2018, 1.0, "Ecole"), (2019, 3.0, "JobtrekSchool"), (2020, 3.0, "Année stable")]),
            // no intervention
            with_scores("d", &[(2018, 1.0, "Ecole"), (2019, 2.0, "CFC"), (2020, 3.0, "Emploi")]),
            // intervention but too short
            with_scores("e", &[(2019, 1.0, "Mesure MISt Jobtrek"), (2020, 9.0, "CFC")]),
        ]
    }

    #[test]
    fn test_qualifying_filters_short_and_missing() {
        let population = sample_population();
        let ids: Vec<&str> = qualifying(&population).iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_mean_improvement() {
        let population = sample_population();
        assert_eq!(mean_improvement(qualifying(&population)), 0);
        assert_eq!(mean_improvement(&population[..1]), 50);
        assert_eq!(mean_improvement(&Vec::<Trajectory>::new()), 0);
    }

    #[test]
    fn test_mean_improvement_large_zero_baseline() {
        // Zero intervention score: improvement is final * 100, which
        // saturates for huge finals. Summing two of them must not overflow.
        let population = vec![
            with_scores("x", &[(2018, 1.0, "Ecole"), (2019, 0.0, "Suivi Jobtrek"), (2020, 1e17, "CFC")]),
            with_scores("y", &[(2018, 1.0, "Ecole"), (2019, 0.0, "Suivi Jobtrek"), (2021, 1e17, "Emploi")]),
        ];
        assert_eq!(mean_improvement(&population), i64::MAX);

        let stats = CohortStatistics::compute(&population);
        assert_eq!(stats.improvement_percentage, i64::MAX);
        assert_eq!(stats.progression_breakdown.progression_percentage, 100);
    }

    #[test]
    fn test_breakdown_buckets() {
        let population = sample_population();
        let breakdown = progression_breakdown(qualifying(&population));

        assert_eq!(breakdown.total_count, 3);
        assert_eq!(breakdown.progression_percentage, 33);
        assert_eq!(breakdown.stagnation_percentage, 33);
        assert_eq!(breakdown.regression_percentage, 33);
    }

    #[test]
    fn test_breakdown_empty() {
        assert_eq!(progression_breakdown(&Vec::<Trajectory>::new()), ProgressionBreakdown::default());
    }

    #[test]
    fn test_top_events_excludes_neutral_and_intervention() {
        let population = vec![
            with_scores("a", &[(2019, 1.0, "Suivi Jobtrek"), (2020, 2.0, "CFC"), (2021, 3.0, "Emploi")]),
            with_scores("b", &[(2019, 1.0, "Suivi Jobtrek"), (2020, 2.0, "Emploi"), (2021, 3.0, "Année stable")]),
            with_scores("c", &[(2019, 1.0, "Suivi Jobtrek"), (2020, 2.0, "JobtrekSchool"), (2021, 3.0, "Stage")]),
        ];
        let top = top_post_intervention_events(&population);

        assert_eq!(top[0].event, "Emploi");
        assert_eq!(top[0].count, 2);
        assert_eq!(top[0].percentage, 50);
        // CFC seen before Stage
        assert_eq!(top[1].event, "CFC");
        assert_eq!(top[2].event, "Stage");
        assert_eq!(top.len(), 3);
    }

    #[test]
    fn test_top_events_capped_at_five() {
        let steps: Vec<(i32, f64, &str)> = vec![
            (2010, 0.0, "Suivi Jobtrek"),
            (2011, 0.0, "A"),
            (2012, 0.0, "B"),
            (2013, 0.0, "C"),
            (2014, 0.0, "D"),
            (2015, 0.0, "E"),
            (2016, 0.0, "F"),
        ];
        let population = vec![with_scores("x", &steps)];
        assert_eq!(top_post_intervention_events(&population).len(), TOP_EVENTS);
    }

    #[test]
    fn test_program_distribution_priority() {
        let population = sample_population();
        let dist = program_distribution(qualifying(&population));

        assert_eq!(dist.mist, 1);
        assert_eq!(dist.school, 2);
        assert_eq!(dist.total, 3);
        assert_eq!(dist.count(ProgramType::School), 2);
    }

    #[test]
    fn test_program_impact_averages() {
        let population = sample_population();
        let impact = program_impact(qualifying(&population));

        assert_eq!(impact.mist.count, 1);
        assert_relative_eq!(impact.mist.start_avg, 4.0);
        assert_relative_eq!(impact.mist.intervention_avg, 10.0);
        assert_relative_eq!(impact.mist.final_avg, 15.0);

        assert_eq!(impact.school.count, 2);
        assert_relative_eq!(impact.school.start_avg, 1.5);
        assert_relative_eq!(impact.school.intervention_avg, 3.5);
        assert_relative_eq!(impact.school.final_avg, 2.5);
    }

    #[test]
    fn test_simple_comparison() {
        let population = sample_population();
        let cmp = simple_comparison(qualifying(&population));

        assert_relative_eq!(cmp.before_avg, (4.0 + 2.0 + 1.0) / 3.0);
        assert_relative_eq!(cmp.after_avg, (15.0 + 2.0 + 3.0) / 3.0);
    }

    #[test]
    fn test_compute_empty_population() {
        let stats = CohortStatistics::compute(&[]);
        assert_eq!(stats, CohortStatistics::default());

        let no_intervention = vec![accumulate("a", "A", "", &[(2018, 1.0, "x"), (2019, 1.0, "y"), (2020, 1.0, "z")])];
        assert_eq!(CohortStatistics::compute(&no_intervention), CohortStatistics::default());
    }

    #[test]
    fn test_compute_counts_only_qualifying() {
        let population = sample_population();
        let stats = CohortStatistics::compute(&population);

        assert_eq!(stats.progression_breakdown.total_count, 3);
        assert!(stats.program_distribution.total <= 3);
    }
}
