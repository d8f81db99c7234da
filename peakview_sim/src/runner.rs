//! Scenario runner - generates cohorts and checks analytics invariants.

use crate::context::SimContext;
use crate::oracle::{to_payload, GeneratedTrajectory, Oracle};
use crate::scenarios::ScenarioId;

use nalgebra::Point2;
use peakview_core::cohort::{progression_breakdown, qualifying};
use peakview_core::impact::individual_impact;
use peakview_core::intervention::find_first_intervention;
use peakview_core::proximity::{closest_line, distance_to_segment};
use peakview_core::series::{average_series, progression_series, trajectory_series, year_axis};
use peakview_core::{
    filter, ingest_payload, normalize, Action, CohortStatistics, ImpactBranch, LineId,
    NormalizerConfig, ProximityConfig, RenderedLine, Trajectory, VisualizationState,
};
use peakview_env::{SnapshotCache, StaticSource};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Hidden trajectories looked up by code per run.
const HIDDEN_LOOKUPS: usize = 20;

/// Cursor samples per proximity run.
const CURSOR_SAMPLES: usize = 200;

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Whether every check passed
    pub passed: bool,

    /// Size of the generated cohort
    pub population: usize,

    /// First failed check, if any
    pub failure_reason: Option<String>,

    pub metrics: ScenarioMetrics,
}

/// Counters collected during a run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScenarioMetrics {
    pub checks: usize,
    pub failed_checks: usize,
    pub visible: usize,
    pub hidden: usize,
    pub qualifying: usize,
    pub interventions: usize,
    pub mean_improvement: i64,
}

/// Accumulates check outcomes for one run.
#[derive(Default)]
struct Checks {
    count: usize,
    failures: Vec<String>,
}

impl Checks {
    fn check(&mut self, ok: bool, describe: impl FnOnce() -> String) {
        self.count += 1;
        if !ok {
            let message = describe();
            debug!("check failed: {}", message);
            self.failures.push(message);
        }
    }
}

/// Runs cohort scenarios.
pub struct ScenarioRunner {
    /// Configuration seed
    seed: u64,

    /// Cohort size for scenarios that do not fix their own
    population: usize,
}

impl ScenarioRunner {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            population: 50,
        }
    }

    pub fn with_population(mut self, population: usize) -> Self {
        self.population = population;
        self
    }

    /// Generates the cohort a scenario runs on.
    ///
    /// The cohort seed is derived from the master seed so scenario geometry
    /// (cursor samples) and cohort content do not share a stream.
    pub fn cohort(&self, scenario: ScenarioId) -> Vec<GeneratedTrajectory> {
        let cohort_seed = self.seed.wrapping_mul(0x9e3779b97f4a7c15);
        Oracle::new(cohort_seed).generate(&scenario.generator_config(self.population))
    }

    /// Runs a scenario and returns the result.
    pub fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.seed);

        let generated = self.cohort(scenario);
        let population: Vec<Trajectory> = generated.iter().map(|g| g.trajectory.clone()).collect();
        let mut checks = Checks::default();

        check_analytics(&generated, &population, &mut checks);

        match scenario {
            ScenarioId::Baseline | ScenarioId::HiddenCodes | ScenarioId::LargeCohort => {}
            ScenarioId::NegativeDrift => check_negative_offsets(&population, &mut checks),
            ScenarioId::NoIntervention => check_no_intervention(&population, &mut checks),
            ScenarioId::ConstantScores => check_constant_scores(&population, &mut checks),
            ScenarioId::SameYearBursts => check_payload_round_trip(&population, &mut checks),
            ScenarioId::ProximityStress => self.check_proximity(&population, &mut checks),
            ScenarioId::CacheExpiry => self.check_cache_expiry(population.clone(), &mut checks),
        }

        let stats = CohortStatistics::compute(&population);
        let hidden = population.iter().filter(|t| t.is_hidden()).count();
        let metrics = ScenarioMetrics {
            checks: checks.count,
            failed_checks: checks.failures.len(),
            visible: population.len() - hidden,
            hidden,
            qualifying: stats.progression_breakdown.total_count,
            interventions: generated.iter().filter(|g| g.intervention_index.is_some()).count(),
            mean_improvement: stats.improvement_percentage,
        };

        if !checks.failures.is_empty() {
            warn!(
                "{}: {}/{} checks failed",
                scenario.name(),
                checks.failures.len(),
                checks.count
            );
        }

        ScenarioResult {
            scenario,
            seed: self.seed,
            passed: checks.failures.is_empty(),
            population: population.len(),
            failure_reason: checks.failures.into_iter().next(),
            metrics,
        }
    }

    /// SIM-007: hit-test random cursors against the rendered full chart.
    fn check_proximity(&self, population: &[Trajectory], checks: &mut Checks) {
        let lines = render_chart(population);
        let config = ProximityConfig::default();
        let max_distance = config.max_distance(false);
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed ^ 0x5eed);

        let mut hits = 0;
        for _ in 0..CURSOR_SAMPLES {
            let cursor = Point2::new(rng.gen_range(0.0..800.0), rng.gen_range(0.0..600.0));
            let Some(id) = closest_line(cursor, &lines, max_distance) else {
                continue;
            };
            hits += 1;

            let Some(line) = lines.iter().find(|l| l.id == id) else {
                checks.check(false, || format!("selected unknown line {id:?}"));
                continue;
            };
            let min = line
                .points
                .windows(2)
                .map(|w| distance_to_segment(cursor, w[0], w[1]))
                .fold(f64::INFINITY, f64::min);
            checks.check(line.visible && line.points.len() >= 2, || {
                format!("selected unselectable line {id:?}")
            });
            checks.check(min <= max_distance, || {
                format!("selected {id:?} at {min:.2}px, beyond {max_distance}px")
            });

            let nearest = lines
                .iter()
                .filter(|l| l.visible && l.points.len() >= 2)
                .flat_map(|l| l.points.windows(2).map(move |w| distance_to_segment(cursor, w[0], w[1])))
                .fold(f64::INFINITY, f64::min);
            checks.check(min - nearest < config.tie_threshold, || {
                format!("selected {id:?} at {min:.2}px, nearest line is at {nearest:.2}px")
            });
        }
        debug!("proximity: {} hits out of {} cursors", hits, CURSOR_SAMPLES);
    }

    /// SIM-008: TTL reuse, expiry and forced refresh on the virtual clock.
    fn check_cache_expiry(&self, population: Vec<Trajectory>, checks: &mut Checks) {
        let runtime = match tokio::runtime::Builder::new_current_thread().enable_time().build() {
            Ok(runtime) => runtime,
            Err(e) => {
                checks.check(false, || format!("could not start runtime: {e}"));
                return;
            }
        };

        let ctx = SimContext::shared(self.seed);
        let expected = population.len();
        let mut cache = SnapshotCache::new(StaticSource::new(population), Arc::clone(&ctx));

        runtime.block_on(async {
            let first = match cache.get().await {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    checks.check(false, || format!("initial load failed: {e}"));
                    return;
                }
            };
            checks.check(first.len() == expected, || "snapshot size differs from source".to_string());

            ctx.advance_time(Duration::from_secs(299));
            let reused = cache.get().await;
            checks.check(reused.is_ok_and(|s| Arc::ptr_eq(&s, &first)), || {
                "snapshot reloaded before TTL".to_string()
            });

            ctx.advance_time(Duration::from_secs(1));
            let reloaded = cache.get().await;
            checks.check(reloaded.is_ok_and(|s| !Arc::ptr_eq(&s, &first)), || {
                "snapshot not reloaded at TTL".to_string()
            });

            let refreshed = cache.refresh().await;
            checks.check(refreshed.is_ok() && cache.load_count() == 3, || {
                format!("expected 3 loads, got {}", cache.load_count())
            });
            checks.check(cache.source().fetch_count() == 3, || "unexpected source fetches".to_string());

            // Reload keeps the reducer consistent
            if let Ok(snapshot) = cache.get().await {
                let state = VisualizationState::new(Arc::clone(&first))
                    .reduce(Action::Search("j0".to_string()))
                    .reduce(Action::Loaded(snapshot));
                let expected = filter(state.snapshot(), "j0").results.len();
                checks.check(state.filtered_count() == expected, || {
                    "query not re-applied after reload".to_string()
                });
            }
        });
    }
}

// ============================================================================
// CHECKS
// ============================================================================

/// Invariants every scenario must satisfy.
fn check_analytics(generated: &[GeneratedTrajectory], population: &[Trajectory], checks: &mut Checks) {
    let band = NormalizerConfig::default();

    for g in generated {
        let t = &g.trajectory;

        let detected = find_first_intervention(t).map(|ip| ip.index);
        checks.check(detected == g.intervention_index, || {
            format!("{}: detected {:?}, planted {:?}", t.user_code, detected, g.intervention_index)
        });

        let normalized = normalize(t.points());
        checks.check(
            normalized
                .magnitudes
                .iter()
                .all(|m| m.is_finite() && (band.min_magnitude..=band.max_magnitude).contains(m)),
            || format!("{}: magnitude outside clamp band", t.user_code),
        );

        let report = individual_impact(t);
        let has_later = g
            .intervention_index
            .is_some_and(|k| t.points().iter().any(|p| p.year > t.points()[k].year));
        if !has_later {
            checks.check(report.improvement == 0 && report.branch == ImpactBranch::Unavailable, || {
                format!("{}: improvement without a later point", t.user_code)
            });
        }
    }

    let stats = CohortStatistics::compute(population);
    let qualifying_count = qualifying(population).len();
    let breakdown = stats.progression_breakdown;
    for pct in [
        breakdown.progression_percentage,
        breakdown.stagnation_percentage,
        breakdown.regression_percentage,
    ] {
        checks.check((0..=100).contains(&pct), || format!("breakdown bucket {pct} outside [0,100]"));
    }
    checks.check(breakdown.total_count == qualifying_count, || {
        format!("breakdown counted {}, {} qualify", breakdown.total_count, qualifying_count)
    });
    checks.check(stats.program_distribution.total <= qualifying_count, || {
        "program distribution exceeds qualifying count".to_string()
    });
    checks.check(
        progression_breakdown(population.iter()).total_count
            == generated.iter().filter(|g| g.intervention_index.is_some()).count(),
        || "unfiltered breakdown does not match planted interventions".to_string(),
    );

    let visible: Vec<&str> = population
        .iter()
        .filter(|t| !t.is_hidden())
        .map(|t| t.id.as_str())
        .collect();
    checks.check(filter(population, "").ids() == visible, || {
        "empty query does not return the visible population".to_string()
    });

    for hidden in population.iter().filter(|t| t.is_hidden()).take(HIDDEN_LOOKUPS) {
        let outcome = filter(population, &hidden.user_code);
        checks.check(
            outcome.ids() == vec![hidden.id.as_str()] && outcome.is_direct_code_match,
            || format!("{}: hidden code lookup returned {:?}", hidden.user_code, outcome.ids()),
        );
    }
}

/// SIM-002: offsets lift the lowest score to the safety margin.
fn check_negative_offsets(population: &[Trajectory], checks: &mut Checks) {
    let config = NormalizerConfig::default();
    for t in population {
        let normalized = normalize(t.points());
        let min = t
            .points()
            .iter()
            .map(|p| p.cumulative_score)
            .fold(f64::INFINITY, f64::min);
        if min < 0.0 {
            checks.check((normalized.offset - (min.abs() + config.safety_margin)).abs() < 1e-9, || {
                format!("{}: offset {} for minimum {}", t.user_code, normalized.offset, min)
            });
        }
    }
}

/// SIM-004: with no intervention every statistic is zero.
fn check_no_intervention(population: &[Trajectory], checks: &mut Checks) {
    checks.check(CohortStatistics::compute(population) == CohortStatistics::default(), || {
        "statistics are not empty without interventions".to_string()
    });
    checks.check(
        population.iter().all(|t| individual_impact(t).improvement == 0),
        || "improvement reported without an intervention".to_string(),
    );
}

/// SIM-005: constant sequences normalize to the base and hit the zero branch.
fn check_constant_scores(population: &[Trajectory], checks: &mut Checks) {
    let config = NormalizerConfig::default();
    for t in population {
        let normalized = normalize(t.points());
        checks.check(
            normalized.scale.is_finite()
                && normalized.magnitudes.iter().all(|m| (m - config.base).abs() < 1e-12),
            || format!("{}: constant sequence not at base magnitude", t.user_code),
        );

        let report = individual_impact(t);
        if report.final_score.is_some() {
            checks.check(report.branch == ImpactBranch::ZeroBaseline && report.improvement == 0, || {
                format!("{}: expected zero-baseline branch, got {:?}", t.user_code, report.branch)
            });
        }
    }
}

/// SIM-006: a reversed payload ingests back into canonical order.
fn check_payload_round_trip(population: &[Trajectory], checks: &mut Checks) {
    let json = match serde_json::to_string(&to_payload(population, true)) {
        Ok(json) => json,
        Err(e) => {
            checks.check(false, || format!("payload serialization failed: {e}"));
            return;
        }
    };
    match ingest_payload(&json) {
        Ok(snapshot) => checks.check(&snapshot[..] == population, || {
            "ingested snapshot differs from generated cohort".to_string()
        }),
        Err(e) => checks.check(false, || format!("ingestion failed: {e}")),
    }
}

// ============================================================================
// CHART GEOMETRY
// ============================================================================

const SLOT_WIDTH: f64 = 40.0;
const BASELINE_Y: f64 = 400.0;
const SCORE_SCALE: f64 = 10.0;

fn to_pixels(series: &[Option<f64>]) -> Vec<Point2<f64>> {
    series
        .iter()
        .enumerate()
        .filter_map(|(slot, value)| {
            value.map(|v| Point2::new(slot as f64 * SLOT_WIDTH, BASELINE_Y - v * SCORE_SCALE))
        })
        .collect()
}

/// Lays out the full year-by-year chart: one line per visible trajectory
/// plus the average and progression lines. Gaps are spanned.
pub fn render_chart(population: &[Trajectory]) -> Vec<RenderedLine> {
    let visible: Vec<Trajectory> = population.iter().filter(|t| !t.is_hidden()).cloned().collect();
    let axis = year_axis(&visible);

    let mut lines: Vec<RenderedLine> = visible
        .iter()
        .map(|t| {
            RenderedLine::new(
                LineId::Trajectory(t.id.clone()),
                to_pixels(&trajectory_series(&axis, t)),
            )
        })
        .collect();

    let average = average_series(&axis, &visible);
    let progression = progression_series(&average, false);
    lines.push(RenderedLine::new(LineId::Average, to_pixels(&average)));
    lines.push(RenderedLine::new(LineId::Progression, to_pixels(&progression)));
    lines
}
