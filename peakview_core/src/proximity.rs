//! Proximity/Selection Resolver
//! ============================
//!
//! Given a cursor position and the rendered 2D geometry of a set of
//! polylines, decides which line the cursor is "on":
//!
//! 1. Skip invisible lines and lines with fewer than two points
//! 2. Take each line's minimum point-to-segment distance
//! 3. Discard lines farther than `max_distance`
//! 4. Among lines within `tie_threshold` of the nearest one, the line whose
//!    centroid is nearer the cursor wins

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

// ============================================================================
// TYPES
// ============================================================================

/// Identifies a rendered line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "id")]
pub enum LineId {
    /// A single trajectory, by its id
    Trajectory(String),
    /// The cohort average line
    Average,
    /// The relative-progression line
    Progression,
}

/// A polyline as drawn on screen, in pixel coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedLine {
    pub id: LineId,
    pub points: Vec<Point2<f64>>,
    pub visible: bool,
}

impl RenderedLine {
    pub fn new(id: LineId, points: Vec<Point2<f64>>) -> Self {
        Self {
            id,
            points,
            visible: true,
        }
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }
}

/// Pixel thresholds for hit testing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProximityConfig {
    /// Segment distances closer than this are decided by centroid distance
    pub tie_threshold: f64,
    /// Maximum hit distance in the full year-by-year chart
    pub full_view_max_distance: f64,
    /// Maximum hit distance in the three-point chart
    pub three_point_max_distance: f64,
}

impl Default for ProximityConfig {
    fn default() -> Self {
        Self {
            tie_threshold: 2.0,
            full_view_max_distance: 15.0,
            three_point_max_distance: 25.0,
        }
    }
}

impl ProximityConfig {
    /// Hit radius for the given chart mode.
    pub fn max_distance(&self, three_point_view: bool) -> f64 {
        if three_point_view {
            self.three_point_max_distance
        } else {
            self.full_view_max_distance
        }
    }

    /// Resolves the line under `cursor` using this configuration.
    pub fn resolve(
        &self,
        cursor: Point2<f64>,
        lines: &[RenderedLine],
        three_point_view: bool,
    ) -> Option<LineId> {
        select(cursor, lines, self.max_distance(three_point_view), self.tie_threshold)
    }
}

// ============================================================================
// GEOMETRY
// ============================================================================

/// Distance from `p` to the segment `[a, b]`.
///
/// The projection onto the segment is clamped to its endpoints; a
/// zero-length segment degenerates to the point distance.
pub fn distance_to_segment(p: Point2<f64>, a: Point2<f64>, b: Point2<f64>) -> f64 {
    let ab = b - a;
    let ap = p - a;
    let len_sq = ab.norm_squared();

    if len_sq == 0.0 {
        return ap.norm();
    }

    let t = (ap.dot(&ab) / len_sq).clamp(0.0, 1.0);
    let projection = a + ab * t;
    (p - projection).norm()
}

/// Mean of the finite points of a line.
pub fn centroid(points: &[Point2<f64>]) -> Option<Point2<f64>> {
    let finite: Vec<&Point2<f64>> = points
        .iter()
        .filter(|p| p.x.is_finite() && p.y.is_finite())
        .collect();
    if finite.is_empty() {
        return None;
    }

    let n = finite.len() as f64;
    let (sx, sy) = finite
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
    Some(Point2::new(sx / n, sy / n))
}

fn min_segment_distance(cursor: Point2<f64>, points: &[Point2<f64>]) -> f64 {
    points
        .windows(2)
        .map(|w| distance_to_segment(cursor, w[0], w[1]))
        .fold(f64::INFINITY, f64::min)
}

// ============================================================================
// SELECTION
// ============================================================================

struct Candidate<'a> {
    id: &'a LineId,
    segment_distance: f64,
    centroid_distance: f64,
}

fn select(
    cursor: Point2<f64>,
    lines: &[RenderedLine],
    max_distance: f64,
    tie_threshold: f64,
) -> Option<LineId> {
    let candidates: Vec<Candidate<'_>> = lines
        .iter()
        .filter(|line| line.visible && line.points.len() >= 2)
        .filter_map(|line| {
            let segment_distance = min_segment_distance(cursor, &line.points);
            if segment_distance.is_nan() || segment_distance > max_distance {
                return None;
            }
            let centroid_distance = centroid(&line.points)
                .map(|c| (cursor - c).norm())
                .filter(|d| d.is_finite())
                .unwrap_or(f64::INFINITY);
            Some(Candidate {
                id: &line.id,
                segment_distance,
                centroid_distance,
            })
        })
        .collect();

    let nearest = candidates
        .iter()
        .map(|c| c.segment_distance)
        .fold(f64::INFINITY, f64::min);

    // Only lines within the tie band of the nearest one compete on centroid
    // distance; the earliest line wins exact ties.
    let mut best: Option<&Candidate<'_>> = None;
    for candidate in candidates
        .iter()
        .filter(|c| c.segment_distance == nearest || c.segment_distance - nearest < tie_threshold)
    {
        if best.map_or(true, |current| candidate.centroid_distance < current.centroid_distance) {
            best = Some(candidate);
        }
    }

    best.map(|c| c.id.clone())
}

/// Returns the line nearest to `cursor`, or `None` when no visible line of
/// at least two points lies within `max_distance`.
pub fn closest_line(
    cursor: Point2<f64>,
    lines: &[RenderedLine],
    max_distance: f64,
) -> Option<LineId> {
    select(cursor, lines, max_distance, ProximityConfig::default().tie_threshold)
}

/// Index of the rendered point horizontally nearest to `cursor_x`.
///
/// Used to anchor the tooltip of a selected line. The first point wins ties.
pub fn closest_point_index(line: &RenderedLine, cursor_x: f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (index, point) in line.points.iter().enumerate() {
        let distance = (point.x - cursor_x).abs();
        if distance.is_nan() {
            continue;
        }
        if best.map_or(true, |(_, current)| distance < current) {
            best = Some((index, distance));
        }
    }
    best.map(|(index, _)| index)
}

// ============================================================================
// TESTS
// ============================================================================
