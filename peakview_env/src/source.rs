//! Trajectory data sources.

use crate::error::EnvError;
use async_trait::async_trait;
use peakview_core::ingest::{ingest, parse_payload};
use peakview_core::Trajectory;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Anything that can produce a fresh population of trajectories.
///
/// # Implementations
///
/// - `JsonFileSource` - an upstream payload saved to disk
/// - `StaticSource` - an in-memory population (tests, simulation)
///
/// Returned trajectories are in canonical point order.
#[async_trait]
pub trait TrajectorySource: Send + Sync + 'static {
    /// Loads the full population.
    async fn fetch(&self) -> Result<Vec<Trajectory>, EnvError>;

    /// Short human-readable name for logs.
    fn describe(&self) -> String;
}

/// Reads an upstream payload document from a file.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl TrajectorySource for JsonFileSource {
    async fn fetch(&self) -> Result<Vec<Trajectory>, EnvError> {
        let json = tokio::fs::read_to_string(&self.path).await?;
        let trajectories = ingest(parse_payload(&json)?);
        tracing::debug!(path = %self.path.display(), count = trajectories.len(), "payload file loaded");
        Ok(trajectories)
    }

    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }
}

/// Serves a fixed population, or a fixed failure.
#[derive(Debug, Default)]
pub struct StaticSource {
    trajectories: Vec<Trajectory>,
    failure: Option<String>,
    fetches: AtomicUsize,
}

impl StaticSource {
    pub fn new(trajectories: Vec<Trajectory>) -> Self {
        Self {
            trajectories,
            failure: None,
            fetches: AtomicUsize::new(0),
        }
    }

    /// A source whose every fetch fails with `reason`.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            trajectories: Vec::new(),
            failure: Some(reason.into()),
            fetches: AtomicUsize::new(0),
        }
    }

    /// Number of `fetch` calls so far, failed ones included.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TrajectorySource for StaticSource {
    async fn fetch(&self) -> Result<Vec<Trajectory>, EnvError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        match &self.failure {
            Some(reason) => Err(EnvError::unavailable(reason.clone())),
            None => Ok(self.trajectories.clone()),
        }
    }

    fn describe(&self) -> String {
        format!("static:{}", self.trajectories.len())
    }
}
