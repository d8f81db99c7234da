//! Sequence Normalizer
//! ==================
//!
//! Maps a trajectory's cumulative scores onto bounded "visual magnitudes"
//! so that peaks built from very different score ranges stay comparable:
//!
//! 1. **Offset**: shift every score so the minimum sits `safety_margin` above zero
//! 2. **Amplify**: multiply by a fixed factor
//! 3. **Rescale**: stretch the amplified range onto `target_range`
//! 4. **Clamp**: keep the result inside `[min_magnitude, max_magnitude]`
//!
//! The output is finite and inside the clamp band for every input,
//! including empty, single-point, constant and negative sequences.

use crate::trajectory::Point;
use serde::{Deserialize, Serialize};

/// Tuning for [`normalize`]. The defaults are shared by every surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizerConfig {
    /// Gap kept between the lowest offset score and zero
    pub safety_margin: f64,
    /// Linear amplification applied to offset scores
    pub amplification: f64,
    /// Output span between the lowest and highest point
    pub target_range: f64,
    /// Magnitude assigned to the lowest point
    pub base: f64,
    pub min_magnitude: f64,
    pub max_magnitude: f64,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            safety_margin: 5.0,
            amplification: 6.0,
            target_range: 0.5,
            base: 0.2,
            min_magnitude: 0.05,
            max_magnitude: 1.2,
        }
    }
}

/// Result of normalizing one sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedSequence {
    /// One magnitude per input point, in input order
    pub magnitudes: Vec<f64>,
    /// Shift added to every cumulative score
    pub offset: f64,
    /// Factor mapping amplified scores onto the target range
    pub scale: f64,
    /// Lowest amplified score (anchor of the rescale)
    pub current_min: f64,
    pub min_offset_score: f64,
    pub max_offset_score: f64,
    /// `max_offset_score - min_offset_score`
    pub variation: f64,
    config: NormalizerConfig,
}

impl NormalizedSequence {
    fn neutral(config: NormalizerConfig) -> Self {
        Self {
            magnitudes: Vec::new(),
            offset: 0.0,
            scale: 1.0,
            current_min: 0.0,
            min_offset_score: 0.0,
            max_offset_score: 0.0,
            variation: 0.0,
            config,
        }
    }

    /// Places an arbitrary cumulative score on this sequence's scale.
    ///
    /// Non-finite scores map to the base magnitude.
    pub fn magnitude_for(&self, cumulative_score: f64) -> f64 {
        if !cumulative_score.is_finite() {
            return self.config.base;
        }
        let raw = (cumulative_score + self.offset) * self.config.amplification;
        self.config.bounded(self.config.base + (raw - self.current_min) * self.scale)
    }

    /// Highest magnitude, or `None` for an empty sequence.
    pub fn peak(&self) -> Option<f64> {
        self.magnitudes.iter().copied().reduce(f64::max)
    }
}

impl NormalizerConfig {
    fn bounded(&self, magnitude: f64) -> f64 {
        let magnitude = if magnitude.is_finite() { magnitude } else { self.base };
        magnitude.clamp(self.min_magnitude, self.max_magnitude)
    }
}

/// Normalizes with [`NormalizerConfig::default`].
pub fn normalize(points: &[Point]) -> NormalizedSequence {
    normalize_with(points, NormalizerConfig::default())
}

/// Normalizes the cumulative scores of `points`.
pub fn normalize_with(points: &[Point], config: NormalizerConfig) -> NormalizedSequence {
    if points.is_empty() {
        return NormalizedSequence::neutral(config);
    }

    let min_score = points
        .iter()
        .map(|p| p.cumulative_score)
        .filter(|s| s.is_finite())
        .fold(f64::INFINITY, f64::min);
    let min_score = if min_score.is_finite() { min_score } else { 0.0 };

    let offset = if min_score < 0.0 {
        min_score.abs() + config.safety_margin
    } else {
        config.safety_margin
    };

    let offset_scores: Vec<f64> = points
        .iter()
        .map(|p| {
            let shifted = p.cumulative_score + offset;
            if shifted.is_finite() { shifted } else { offset }
        })
        .collect();

    let min_offset_score = offset_scores.iter().copied().fold(f64::INFINITY, f64::min);
    let max_offset_score = offset_scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let raw: Vec<f64> = offset_scores.iter().map(|s| s * config.amplification).collect();

    let current_min = raw.iter().copied().fold(f64::INFINITY, f64::min);
    let mut current_max = raw.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    // Constant or degenerate sequences still get a usable, non-zero span.
    if current_max == current_min || !current_max.is_finite() || !current_min.is_finite() {
        current_max = current_min + 1.0;
    }

    let scale = config.target_range / (current_max - current_min);

    let magnitudes = raw
        .iter()
        .map(|r| config.bounded(config.base + (r - current_min) * scale))
        .collect();

    NormalizedSequence {
        magnitudes,
        offset,
        scale,
        current_min,
        min_offset_score,
        max_offset_score,
        variation: max_offset_score - min_offset_score,
        config,
    }
}

// =============================================================================
// TESTS
// =============================================================================
