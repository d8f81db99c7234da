//! PeakView Simulator CLI
//!
//! Runs cohort scenarios, or loads a real payload and prints its statistics.

use clap::Parser;
use peakview_core::{Action, CohortStatistics, FilterStats, VisualizationState};
use peakview_env::{JsonFileSource, SnapshotCache, TokioContext};
use peakview_sim::scenarios::ScenarioId;
use peakview_sim::{ScenarioResult, ScenarioRunner, SimError, SimExport};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

/// PeakView cohort simulation CLI
#[derive(Parser, Debug)]
#[command(name = "peakview-sim")]
#[command(about = "Run deterministic cohort scenarios for PeakView", long_about = None)]
struct Args {
    /// Master seed for determinism (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Scenario to run (baseline, negative_drift, hidden_codes, ..., all)
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,

    /// Number of consecutive seeds to test
    #[arg(long, default_value = "1")]
    seeds: usize,

    /// Cohort size per scenario
    #[arg(short, long, default_value = "50")]
    population: usize,

    /// Load this payload instead of generating cohorts
    #[arg(short, long)]
    input: Option<String>,

    /// Search query applied to the loaded payload
    #[arg(short, long)]
    query: Option<String>,

    /// Export statistics and trajectory summaries to a JSON file
    #[arg(long)]
    export: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,
}

/// Loads a payload, applies the query and reports cohort statistics.
fn run_input(path: &str, args: &Args) -> Result<(), SimError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;

    let snapshot = runtime.block_on(async {
        let mut cache = SnapshotCache::new(JsonFileSource::new(path), TokioContext::shared());
        cache.get().await
    })?;

    let query = args.query.clone().unwrap_or_default();
    let state = VisualizationState::new(snapshot).reduce(Action::Search(query.clone()));
    let filtered: Vec<_> = state.filtered().cloned().collect();
    let stats = CohortStatistics::compute(&filtered);
    let filter_stats = FilterStats::new(state.snapshot().len(), filtered.len(), &query);

    if args.json {
        let summary = serde_json::json!({
            "input": path,
            "filter": filter_stats,
            "direct_code_match": state.is_direct_code_match(),
            "statistics": stats,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        info!(
            "Loaded {} trajectories, {} shown (query={:?})",
            filter_stats.original_count, filter_stats.filtered_count, query
        );
        info!("Mean improvement: {}%", stats.improvement_percentage);
        let b = stats.progression_breakdown;
        info!(
            "Progression {}% | stagnation {}% | regression {}% (n={})",
            b.progression_percentage, b.stagnation_percentage, b.regression_percentage, b.total_count
        );
        let d = stats.program_distribution;
        info!("Programs: MISt={} School={} (total {})", d.mist, d.school, d.total);
        for event in &stats.top_post_intervention_events {
            info!("  {} x{} ({}%)", event.event, event.count, event.percentage);
        }
    }

    if let Some(export_path) = &args.export {
        let mut export = SimExport::new(path, 0, &filtered);
        export.finalize(true, None);
        export.write_to_file(export_path)?;
        info!("Exported {} trajectories to {}", export.trajectories.len(), export_path);
    }
    Ok(())
}

/// Runs one scenario and writes its export.
fn run_with_export(runner: &ScenarioRunner, scenario: ScenarioId, seed: u64, path: &str) -> ScenarioResult {
    let result = runner.run(scenario);
    let population: Vec<_> = runner
        .cohort(scenario)
        .into_iter()
        .map(|g| g.trajectory)
        .collect();

    let mut export = SimExport::new(scenario.name(), seed, &population);
    export.finalize(result.passed, result.failure_reason.clone());

    match export.write_to_file(path) {
        Ok(()) => info!("Exported {} trajectories to {}", export.trajectories.len(), path),
        Err(e) => error!("Failed to write export: {}", e),
    }
    result
}

fn main() {
    let args = Args::parse();

    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }

    if let Some(path) = &args.input {
        if let Err(e) = run_input(path, &args) {
            error!("{}: {}", path, e);
            std::process::exit(1);
        }
        return;
    }

    if !args.json {
        info!("PeakView Simulator v0.1.0");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    let scenarios: Vec<ScenarioId> = if args.scenario == "all" {
        ScenarioId::all()
    } else {
        match args.scenario.parse() {
            Ok(scenario) => vec![scenario],
            Err(e) => {
                eprintln!("Error: {}", e);
                let names: Vec<&str> = ScenarioId::all().iter().map(|s| s.name()).collect();
                eprintln!("Available scenarios: {}, all", names.join(", "));
                std::process::exit(1);
            }
        }
    };

    let base_seed = if args.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(42)
    } else {
        args.seed
    };

    if let Some(export_path) = &args.export {
        if scenarios.len() > 1 {
            eprintln!("Error: --export only supports a single scenario, not 'all'");
            std::process::exit(1);
        }

        let runner = ScenarioRunner::new(base_seed).with_population(args.population);
        let result = run_with_export(&runner, scenarios[0], base_seed, export_path);
        if result.passed {
            info!("✓ {} (seed={}) PASSED - exported to {}", scenarios[0].name(), base_seed, export_path);
        } else {
            error!(
                "✗ {} FAILED: {}",
                scenarios[0].name(),
                result.failure_reason.as_deref().unwrap_or("unknown")
            );
            std::process::exit(1);
        }
        return;
    }

    let mut all_results: Vec<ScenarioResult> = Vec::new();
    let mut failed_count = 0;

    for seed_offset in 0..args.seeds {
        let seed = base_seed.wrapping_add(seed_offset as u64);
        let runner = ScenarioRunner::new(seed).with_population(args.population);

        for scenario in &scenarios {
            let result = runner.run(*scenario);

            if !args.json {
                if result.passed {
                    info!(
                        "✓ {} (seed={}) PASSED [{} checks, {} trajectories]",
                        scenario.name(),
                        seed,
                        result.metrics.checks,
                        result.population
                    );
                } else {
                    error!(
                        "✗ {} (seed={}) FAILED: {}",
                        scenario.name(),
                        seed,
                        result.failure_reason.as_deref().unwrap_or("unknown")
                    );
                }
            }

            if !result.passed {
                failed_count += 1;
            }
            all_results.push(result);
        }
    }

    let total = all_results.len();
    let passed = total - failed_count;

    if args.json {
        let summary = serde_json::json!({
            "total": total,
            "passed": passed,
            "failed": failed_count,
            "results": all_results.iter().map(|r| {
                serde_json::json!({
                    "scenario": r.scenario.name(),
                    "seed": r.seed,
                    "passed": r.passed,
                    "population": r.population,
                    "metrics": r.metrics,
                    "failure_reason": r.failure_reason,
                })
            }).collect::<Vec<_>>(),
        });
        match serde_json::to_string_pretty(&summary) {
            Ok(text) => println!("{}", text),
            Err(e) => error!("Failed to render summary: {}", e),
        }
    } else {
        info!("");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        if failed_count == 0 {
            info!("✅ All {} scenario runs passed!", total);
        } else {
            error!("❌ {}/{} scenario runs failed!", failed_count, total);
            for result in all_results.iter().filter(|r| !r.passed) {
                error!(
                    "  - {} seed={}: {}",
                    result.scenario.name(),
                    result.seed,
                    result.failure_reason.as_deref().unwrap_or("unknown")
                );
            }
        }
    }

    if failed_count > 0 {
        std::process::exit(1);
    }
}
