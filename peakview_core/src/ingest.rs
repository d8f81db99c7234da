//! Payload ingestion.
//!
//! Converts the upstream JSON payload into canonical [`Trajectory`]
//! records: categories are mapped through the static table and points are
//! put into `(year, original index)` order.

use crate::trajectory::{Completion, Point, Snapshot, Trajectory};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Errors raised while reading a payload.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Top-level upstream document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPayload {
    pub trajectories: Vec<RawTrajectory>,
    #[serde(default)]
    pub metadata: Option<PayloadMetadata>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadMetadata {
    pub total_count: usize,
    #[serde(default)]
    pub last_updated: String,
    #[serde(default)]
    pub api_version: String,
}

/// A trajectory as sent upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTrajectory {
    pub id: String,
    pub user_code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub type_mesure: String,
    #[serde(default)]
    pub start_year: Option<i32>,
    #[serde(default)]
    pub points: Vec<RawPoint>,
    #[serde(default)]
    pub max_height: f64,
}

/// A point as sent upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPoint {
    pub year: i32,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub event: String,
    #[serde(default)]
    pub categorie: String,
    #[serde(default)]
    pub sous_categorie: Option<String>,
    pub cumulative_score: f64,
    #[serde(default)]
    pub termine: Option<bool>,
}

impl From<RawPoint> for Point {
    fn from(raw: RawPoint) -> Self {
        Point {
            year: raw.year,
            score: raw.score,
            cumulative_score: raw.cumulative_score,
            event: raw.event,
            category: raw.categorie,
            subcategory: raw.sous_categorie,
            completion: Completion::from(raw.termine),
        }
    }
}

impl RawTrajectory {
    /// Builds the canonical record.
    ///
    /// An empty display name falls back to the user code; a missing start
    /// year falls back to the earliest point.
    pub fn into_trajectory(self) -> Trajectory {
        let points = self.points.into_iter().map(Point::from).collect();
        let mut trajectory = Trajectory::new(&self.id, &self.user_code, &self.type_mesure, points)
            .with_max_height(self.max_height);

        if !self.name.is_empty() {
            trajectory = trajectory.with_name(&self.name);
        }
        if let Some(start_year) = self.start_year {
            trajectory = trajectory.with_start_year(start_year);
        }
        trajectory
    }
}

/// Parses a payload document without converting it.
pub fn parse_payload(json: &str) -> Result<RawPayload, IngestError> {
    Ok(serde_json::from_str(json)?)
}

/// Converts a parsed payload into canonical trajectories, in payload order.
pub fn ingest(payload: RawPayload) -> Vec<Trajectory> {
    if let Some(meta) = &payload.metadata {
        if meta.total_count != payload.trajectories.len() {
            tracing::debug!(
                declared = meta.total_count,
                received = payload.trajectories.len(),
                "payload count differs from metadata"
            );
        }
    }

    let mut seen = HashSet::new();
    payload
        .trajectories
        .into_iter()
        .map(|raw| {
            if !seen.insert(raw.id.clone()) {
                tracing::warn!(id = %raw.id, "duplicate trajectory id in payload");
            }
            raw.into_trajectory()
        })
        .collect()
}

/// Parses and converts a payload into an immutable snapshot.
pub fn ingest_payload(json: &str) -> Result<Snapshot, IngestError> {
    let trajectories = ingest(parse_payload(json)?);
    tracing::debug!(count = trajectories.len(), "payload ingested");
    Ok(trajectories.into())
}
