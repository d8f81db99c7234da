//! PeakView Environment Layer
//!
//! Everything around the pure analytics core that touches the outside
//! world: where trajectories come from, what time it is, and how long a
//! loaded snapshot stays valid.
//!
//! # Core Concept: Snapshot In, Derived State Out
//!
//! A [`SnapshotCache`] loads a population through a [`TrajectorySource`]
//! and hands out shared, immutable snapshots. Time is read through a
//! [`PeakViewContext`], so expiry can be driven by a manual clock in tests
//! and simulation.
//!
//! # Example
//!
//! ```ignore
//! use peakview_env::{JsonFileSource, SnapshotCache, TokioContext};
//!
//! let mut cache = SnapshotCache::new(JsonFileSource::new("payload.json"), TokioContext::shared());
//! let snapshot = cache.get().await?;
//! let stats = peakview_core::CohortStatistics::compute(&snapshot);
//! ```

mod cache;
mod context;
mod error;
mod source;
mod tokio_impl;

pub use cache::{CacheConfig, SnapshotCache};
pub use context::PeakViewContext;
pub use error::EnvError;
pub use source::{JsonFileSource, StaticSource, TrajectorySource};
pub use tokio_impl::TokioContext;
