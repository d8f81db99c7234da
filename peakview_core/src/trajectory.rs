//! Canonical trajectory records.
//!
//! A [`Trajectory`] is one person's ordered sequence of dated events. Records
//! are built once per data load and never mutated afterwards; every derived
//! view (filters, statistics, magnitudes) is recomputed from them.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Trajectories with fewer points than this are hidden from default views.
pub const MIN_VISIBLE_POINTS: usize = 3;

/// An immutable population produced by one load.
pub type Snapshot = Arc<[Trajectory]>;

/// Top-level category of a trajectory, derived from its first event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    Education,
    Career,
    Entrepreneurship,
    Health,
    Personal,
}

impl Category {
    /// Maps an upstream (French) category label onto a [`Category`].
    ///
    /// Unknown labels fall back to [`Category::Education`].
    pub fn from_raw(raw: &str) -> Self {
        match raw {
            "Formation" => Category::Education,
            "Expérience professionnelle" => Category::Career,
            "Mesures de Transition 1" => Category::Entrepreneurship,
            "Phase pré-professionnelle" => Category::Education,
            "Période de transition / suspension d'activité" => Category::Health,
            "Facteurs contextuels" => Category::Health,
            _ => Category::Education,
        }
    }

    /// Returns the lowercase name used for display and search.
    pub fn name(&self) -> &'static str {
        match self {
            Category::Education => "education",
            Category::Career => "career",
            Category::Entrepreneurship => "entrepreneurship",
            Category::Health => "health",
            Category::Personal => "personal",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Completion status of a step (`termine` upstream).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Completion {
    /// No flag was supplied.
    #[default]
    Unknown,
    Completed,
    /// The step is explicitly marked as not finished.
    Incomplete,
}

impl From<Option<bool>> for Completion {
    fn from(flag: Option<bool>) -> Self {
        match flag {
            None => Completion::Unknown,
            Some(true) => Completion::Completed,
            Some(false) => Completion::Incomplete,
        }
    }
}

/// One dated event within a trajectory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub year: i32,

    /// Signed contribution of this event alone
    pub score: f64,

    /// Running total through this event (may be negative)
    pub cumulative_score: f64,

    pub event: String,
    pub category: String,
    pub subcategory: Option<String>,

    #[serde(default)]
    pub completion: Completion,
}

impl Point {
    /// Creates a point with no category information.
    pub fn new(year: i32, score: f64, cumulative_score: f64, event: &str) -> Self {
        Self {
            year,
            score,
            cumulative_score,
            event: event.to_string(),
            category: String::new(),
            subcategory: None,
            completion: Completion::Unknown,
        }
    }

    pub fn with_category(mut self, category: &str, subcategory: Option<&str>) -> Self {
        self.category = category.to_string();
        self.subcategory = subcategory.map(str::to_string);
        self
    }

    pub fn with_completion(mut self, completion: Completion) -> Self {
        self.completion = completion;
        self
    }

    /// True when the step is explicitly flagged as unfinished.
    pub fn is_incomplete(&self) -> bool {
        self.completion == Completion::Incomplete
    }
}

/// One person's life path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    /// Opaque identifier, stable across reloads
    pub id: String,

    /// Short human-facing code (treated as unique for display/search)
    pub user_code: String,

    pub name: String,
    pub category: Category,

    /// Free-text label of the intervention program (`typeMesure`)
    pub program_type: String,

    pub start_year: i32,
    pub max_height: f64,

    /// Points in canonical `(year, original index)` order
    points: Vec<Point>,
}

impl Trajectory {
    /// Creates a trajectory, putting `points` into canonical order.
    ///
    /// Points are stably sorted by year, so events sharing a year keep
    /// their original sequence position. The category is derived from the
    /// first point in that order.
    pub fn new(id: &str, user_code: &str, program_type: &str, mut points: Vec<Point>) -> Self {
        points.sort_by_key(|p| p.year);
        let category = points
            .first()
            .map(|p| Category::from_raw(&p.category))
            .unwrap_or_default();
        let start_year = points.first().map(|p| p.year).unwrap_or_default();

        Self {
            id: id.to_string(),
            user_code: user_code.to_string(),
            name: user_code.to_string(),
            category,
            program_type: program_type.to_string(),
            start_year,
            max_height: 0.0,
            points,
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_start_year(mut self, start_year: i32) -> Self {
        self.start_year = start_year;
        self
    }

    pub fn with_max_height(mut self, max_height: f64) -> Self {
        self.max_height = max_height;
        self
    }

    /// Points in canonical order.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_point(&self) -> Option<&Point> {
        self.points.first()
    }

    pub fn last_point(&self) -> Option<&Point> {
        self.points.last()
    }

    /// True for "minor" trajectories that only surface through search.
    pub fn is_hidden(&self) -> bool {
        self.points.len() < MIN_VISIBLE_POINTS
    }

    /// Checks `cumulative[i] == cumulative[i - 1] + score[i]` along the path.
    pub fn has_consistent_cumulative_scores(&self) -> bool {
        const TOLERANCE: f64 = 1e-9;

        let Some(first) = self.points.first() else {
            return true;
        };
        if (first.cumulative_score - first.score).abs() > TOLERANCE {
            return false;
        }
        self.points
            .windows(2)
            .all(|w| (w[1].cumulative_score - (w[0].cumulative_score + w[1].score)).abs() <= TOLERANCE)
    }
}

/// Builds a trajectory whose cumulative scores are the running sum of
/// `(year, score, event)` steps.
pub fn accumulate(id: &str, user_code: &str, program_type: &str, steps: &[(i32, f64, &str)]) -> Trajectory {
    let mut total = 0.0;
    let points = steps
        .iter()
        .map(|&(year, score, event)| {
            total += score;
            Point::new(year, score, total, event)
        })
        .collect();
    Trajectory::new(id, user_code, program_type, points)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_points_sorted_stably_by_year() {
        let t = Trajectory::new(
            "t1",
            "J0001",
            "MISt",
            vec![
                Point::new(2021, 1.0, 3.0, "late"),
                Point::new(2019, 1.0, 1.0, "first of 2019"),
                Point::new(2019, 1.0, 2.0, "second of 2019"),
            ],
        );

        let events: Vec<&str> = t.points().iter().map(|p| p.event.as_str()).collect();
        assert_eq!(events, vec!["first of 2019", "second of 2019", "late"]);
    }

    #[test]
    fn test_category_from_first_point() {
        let t = Trajectory::new(
            "t1",
            "J0001",
            "",
            vec![
                Point::new(2020, 1.0, 1.0, "job").with_category("Expérience professionnelle", None),
                Point::new(2018, 1.0, 1.0, "school").with_category("Facteurs contextuels", None),
            ],
        );
        assert_eq!(t.category, Category::Health);
        assert_eq!(Category::from_raw("unmapped"), Category::Education);
        assert_eq!(Trajectory::new("e", "E", "", vec![]).category, Category::Education);
    }

    #[test]
    fn test_hidden_threshold() {
        let short = accumulate("a", "A", "", &[(2020, 1.0, "x"), (2021, 1.0, "y")]);
        let long = accumulate("b", "B", "", &[(2020, 1.0, "x"), (2021, 1.0, "y"), (2022, 1.0, "z")]);
        assert!(short.is_hidden());
        assert!(!long.is_hidden());
    }

    #[test]
    fn test_cumulative_consistency() {
        let good = accumulate("a", "A", "", &[(2020, 2.0, "x"), (2021, -3.0, "y")]);
        assert!(good.has_consistent_cumulative_scores());

        let bad = Trajectory::new(
            "b",
            "B",
            "",
            vec![Point::new(2020, 2.0, 2.0, "x"), Point::new(2021, 1.0, 7.0, "y")],
        );
        assert!(!bad.has_consistent_cumulative_scores());
    }

    #[test]
    fn test_completion_from_flag() {
        assert_eq!(Completion::from(None), Completion::Unknown);
        assert_eq!(Completion::from(Some(true)), Completion::Completed);
        assert!(Point::new(2020, 0.0, 0.0, "x")
            .with_completion(Completion::from(Some(false)))
            .is_incomplete());
    }
}
