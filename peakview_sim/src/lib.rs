//! PeakView Deterministic Simulation Harness
//!
//! Generates synthetic cohorts from a single 64-bit seed and runs the whole
//! analytics pipeline over them, checking invariants against what the
//! generator planted.
//!
//! # Core Principle: Planted Ground Truth
//!
//! - **Cohorts**: the [`Oracle`] remembers where each intervention was placed
//! - **Time**: [`SimContext`] is a manual clock, so cache expiry is exact
//! - **Randomness**: all entropy comes from ChaCha8 seeded per run
//!
//! # Usage
//!
//! ```ignore
//! use peakview_sim::{ScenarioRunner, scenarios::ScenarioId};
//!
//! let result = ScenarioRunner::new(42).run(ScenarioId::Baseline);
//! assert!(result.passed);
//! ```

mod context;
mod error;
mod exporter;
mod oracle;
mod runner;
pub mod scenarios;

pub use context::SimContext;
pub use error::SimError;
pub use exporter::{SimExport, TrajectorySummary};
pub use oracle::{to_payload, user_code, GeneratedTrajectory, GeneratorConfig, Oracle, GENERIC_INTERVENTION_LABEL};
pub use runner::{render_chart, ScenarioMetrics, ScenarioResult, ScenarioRunner};
