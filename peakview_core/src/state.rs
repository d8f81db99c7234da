//! Visualization state reducer.
//!
//! Presentation surfaces hold one [`VisualizationState`] and replace it with
//! the result of [`VisualizationState::reduce`] on every user or data event.
//! The snapshot is shared, never mutated; derived fields are recomputed.

use crate::search::filter;
use crate::trajectory::{Snapshot, Trajectory};
use std::sync::Arc;

/// Events that change what is shown.
#[derive(Debug, Clone)]
pub enum Action {
    /// A new snapshot replaced the previous one
    Loaded(Snapshot),
    /// The search box changed
    Search(String),
    /// A trajectory was picked (or the selection cleared)
    Select(Option<String>),
}

#[derive(Debug, Clone)]
pub struct VisualizationState {
    snapshot: Snapshot,
    query: String,
    /// Indices into `snapshot`, in snapshot order
    filtered: Vec<usize>,
    is_direct_code_match: bool,
    selected: Option<String>,
}

impl Default for VisualizationState {
    fn default() -> Self {
        Self::new(Arc::from(Vec::new()))
    }
}

impl VisualizationState {
    /// Initial state for a snapshot: no query, no selection.
    pub fn new(snapshot: Snapshot) -> Self {
        let mut state = Self {
            snapshot,
            query: String::new(),
            filtered: Vec::new(),
            is_direct_code_match: false,
            selected: None,
        };
        state.apply_query();
        state
    }

    pub fn reduce(mut self, action: Action) -> Self {
        match action {
            Action::Loaded(snapshot) => {
                self.snapshot = snapshot;
                self.apply_query();
                if let Some(id) = &self.selected {
                    if self.find(id).is_none() {
                        tracing::debug!(id = %id, "selection dropped after reload");
                        self.selected = None;
                    }
                }
            }
            Action::Search(query) => {
                self.query = query;
                self.apply_query();
            }
            Action::Select(Some(id)) => {
                if self.find(&id).is_some() {
                    self.selected = Some(id);
                } else {
                    tracing::debug!(id = %id, "ignoring selection of unknown trajectory");
                    self.selected = None;
                }
            }
            Action::Select(None) => self.selected = None,
        }
        self
    }

    fn apply_query(&mut self) {
        let outcome = filter(&self.snapshot, &self.query);
        let mut results = outcome.results.iter().peekable();

        // Results come back in snapshot order
        self.filtered = self
            .snapshot
            .iter()
            .enumerate()
            .filter_map(|(index, trajectory)| {
                if results.peek().is_some_and(|r| std::ptr::eq(**r, trajectory)) {
                    results.next();
                    Some(index)
                } else {
                    None
                }
            })
            .collect();
        self.is_direct_code_match = outcome.is_direct_code_match;
    }

    fn find(&self, id: &str) -> Option<&Trajectory> {
        self.snapshot.iter().find(|t| t.id == id)
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// True when the raw query is non-empty (even if it normalizes to nothing).
    pub fn is_filtering(&self) -> bool {
        !self.query.is_empty()
    }

    pub fn is_direct_code_match(&self) -> bool {
        self.is_direct_code_match
    }

    /// Trajectories currently shown, in snapshot order.
    pub fn filtered(&self) -> impl Iterator<Item = &Trajectory> + '_ {
        self.filtered.iter().map(|&index| &self.snapshot[index])
    }

    pub fn filtered_count(&self) -> usize {
        self.filtered.len()
    }

    pub fn selected(&self) -> Option<&Trajectory> {
        self.selected.as_deref().and_then(|id| self.find(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trajectory::accumulate;

    fn snapshot(codes: &[(&str, &str)]) -> Snapshot {
        codes
            .iter()
            .map(|(id, code)| {
                accumulate(id, code, "", &[(2018, 1.0, "Ecole"), (2019, 1.0, "Stage"), (2020, 1.0, "Emploi")])
            })
            .collect::<Vec<_>>()
            .into()
    }

    fn ids(state: &VisualizationState) -> Vec<&str> {
        state.filtered().map(|t| t.id.as_str()).collect()
    }

    #[test]
    fn test_initial_state_shows_visible() {
        let state = VisualizationState::new(snapshot(&[("1", "J01"), ("2", "J02")]));
        assert_eq!(ids(&state), vec!["1", "2"]);
        assert!(!state.is_filtering());
        assert!(state.selected().is_none());
    }

    #[test]
    fn test_search_filters() {
        let state = VisualizationState::new(snapshot(&[("1", "J01"), ("2", "K02")]))
            .reduce(Action::Search("k0".to_string()));
        assert_eq!(ids(&state), vec!["2"]);
        assert!(state.is_filtering());
        assert!(state.is_direct_code_match());
        assert_eq!(state.filtered_count(), 1);
    }

    #[test]
    fn test_reload_reapplies_query_and_drops_stale_selection() {
        let state = VisualizationState::new(snapshot(&[("1", "J01"), ("2", "K02")]))
            .reduce(Action::Search("j0".to_string()))
            .reduce(Action::Select(Some("1".to_string())));
        assert_eq!(state.selected().map(|t| t.id.as_str()), Some("1"));

        let state = state.reduce(Action::Loaded(snapshot(&[("3", "J03"), ("4", "K04")])));
        assert_eq!(state.query(), "j0");
        assert_eq!(ids(&state), vec!["3"]);
        assert!(state.selected().is_none());
    }

    #[test]
    fn test_reload_keeps_existing_selection() {
        let state = VisualizationState::new(snapshot(&[("1", "J01")]))
            .reduce(Action::Select(Some("1".to_string())))
            .reduce(Action::Loaded(snapshot(&[("1", "J01"), ("2", "J02")])));
        assert_eq!(state.selected().map(|t| t.id.as_str()), Some("1"));
    }

    #[test]
    fn test_select_unknown_and_clear() {
        let state = VisualizationState::new(snapshot(&[("1", "J01")]))
            .reduce(Action::Select(Some("nope".to_string())));
        assert!(state.selected().is_none());

        let state = state
            .reduce(Action::Select(Some("1".to_string())))
            .reduce(Action::Select(None));
        assert!(state.selected().is_none());
    }

    #[test]
    fn test_whitespace_query_counts_as_filtering() {
        let state = VisualizationState::default().reduce(Action::Search("  ".to_string()));
        assert!(state.is_filtering());
        assert_eq!(state.filtered_count(), 0);
    }
}
