//! PeakView Core - Trajectory Analytics and Normalization Engine
//!
//! Pure, synchronous analytics shared by every presentation surface:
//! 1. **Normalization**: cumulative scores -> bounded visual magnitudes
//! 2. **Impact**: intervention detection, individual and cohort improvement
//! 3. **Selection**: free-text filtering and cursor hit-testing over rendered lines
//!
//! Data enters through [`ingest`] as an immutable [`Snapshot`]; everything
//! else is derived from it and recomputed on reload.

pub mod trajectory;
pub mod intervention;
pub mod normalizer;
pub mod impact;
pub mod cohort;
pub mod search;
pub mod proximity;
pub mod ingest;
pub mod series;
pub mod state;

// Re-export key types for convenience
pub use trajectory::{Category, Completion, Point, Snapshot, Trajectory, MIN_VISIBLE_POINTS};
pub use intervention::{find_first_intervention_year, is_intervention_event, ProgramType};
pub use normalizer::{normalize, normalize_with, NormalizedSequence, NormalizerConfig};
pub use impact::{individual_impact, individual_improvement, ImpactBranch, ImpactReport};
pub use cohort::{CohortStatistics, ProgressionBreakdown};
pub use search::{filter, FilterOutcome, FilterStats};
pub use proximity::{closest_line, LineId, ProximityConfig, RenderedLine};
pub use ingest::{ingest_payload, IngestError, RawPayload};
pub use state::{Action, VisualizationState};
