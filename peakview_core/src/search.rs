//! Search/Filter Matcher.
//!
//! Free-text search over trajectories with a two-tier policy:
//! visible trajectories (three points or more) are searched first; only when
//! none match is the hidden population consulted, and a hidden trajectory
//! surfaces only if it is the single match.

use crate::trajectory::{Trajectory, MIN_VISIBLE_POINTS};
use serde::Serialize;
use unicode_normalization::UnicodeNormalization;

/// Combining diacritical marks removed after decomposition.
const COMBINING_MARKS: std::ops::RangeInclusive<char> = '\u{0300}'..='\u{036f}';

/// Normalizes text for matching.
///
/// Applied in order: lowercase, trim, collapse whitespace runs, NFD
/// decomposition, drop combining marks, drop anything that is neither an
/// ASCII word character nor whitespace.
pub fn normalize_text(input: &str) -> String {
    let lowered = input.to_lowercase();
    let collapsed = lowered.split_whitespace().collect::<Vec<_>>().join(" ");

    collapsed
        .nfd()
        .filter(|c| !COMBINING_MARKS.contains(c))
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect()
}

/// True when `query` still has content after normalization.
pub fn is_valid_query(query: &str) -> bool {
    !normalize_text(query).is_empty()
}

/// Normalized text a query is matched against.
pub fn searchable_text(trajectory: &Trajectory) -> String {
    let mut fields: Vec<&str> = vec![
        trajectory.user_code.as_str(),
        trajectory.program_type.as_str(),
        trajectory.category.name(),
    ];
    fields.extend(
        trajectory
            .points()
            .iter()
            .filter_map(|p| p.subcategory.as_deref())
            .filter(|s| !s.is_empty()),
    );
    fields.extend(
        trajectory
            .points()
            .iter()
            .map(|p| p.event.as_str())
            .filter(|e| !e.is_empty()),
    );
    normalize_text(&fields.join(" "))
}

/// Outcome of one filter pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterOutcome<'a> {
    pub results: Vec<&'a Trajectory>,
    /// The query is contained in the user code of at least one result
    pub is_direct_code_match: bool,
}

impl FilterOutcome<'_> {
    fn empty() -> Self {
        Self {
            results: Vec::new(),
            is_direct_code_match: false,
        }
    }

    pub fn ids(&self) -> Vec<&str> {
        self.results.iter().map(|t| t.id.as_str()).collect()
    }
}

fn code_matches(trajectory: &Trajectory, query: &str) -> bool {
    !trajectory.user_code.is_empty() && normalize_text(&trajectory.user_code).contains(query)
}

fn outcome<'a>(results: Vec<&'a Trajectory>, query: &str) -> FilterOutcome<'a> {
    let is_direct_code_match = results.iter().any(|t| code_matches(t, query));
    FilterOutcome {
        results,
        is_direct_code_match,
    }
}

/// Filters `trajectories` by a free-text query.
pub fn filter<'a>(trajectories: &'a [Trajectory], query: &str) -> FilterOutcome<'a> {
    let query = normalize_text(query);

    if query.is_empty() {
        return FilterOutcome {
            results: trajectories.iter().filter(|t| !t.is_hidden()).collect(),
            is_direct_code_match: false,
        };
    }

    let matches = |t: &&Trajectory| searchable_text(t).contains(&query);

    let visible: Vec<&Trajectory> = trajectories
        .iter()
        .filter(|t| t.len() >= MIN_VISIBLE_POINTS)
        .filter(matches)
        .collect();
    if !visible.is_empty() {
        return outcome(visible, &query);
    }

    let hidden: Vec<&Trajectory> = trajectories
        .iter()
        .filter(|t| t.is_hidden())
        .filter(matches)
        .collect();

    match hidden.len() {
        1 => outcome(hidden, &query),
        0 => {
            tracing::debug!(query = %query, "no trajectory matches query");
            FilterOutcome::empty()
        }
        n => {
            tracing::debug!(query = %query, hidden_matches = n, "ambiguous hidden matches");
            FilterOutcome::empty()
        }
    }
}

/// Summary of a filter pass for status displays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterStats {
    pub original_count: usize,
    pub filtered_count: usize,
    pub is_filtered: bool,
    pub has_results: bool,
    pub query: String,
}

impl FilterStats {
    pub fn new(original_count: usize, filtered_count: usize, query: &str) -> Self {
        Self {
            original_count,
            filtered_count,
            is_filtered: is_valid_query(query),
            has_results: filtered_count > 0,
            query: query.trim().to_string(),
        }
    }
}
