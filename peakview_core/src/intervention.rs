//! Intervention detection.
//!
//! Every component that needs "the" intervention point of a trajectory goes
//! through [`find_first_intervention`]. The marker strings are the single
//! definition of what counts as an intervention event.

use crate::trajectory::{Point, Trajectory};
use serde::{Deserialize, Serialize};

/// Marker for the MISt program (program A).
pub const PROGRAM_A_MARKER: &str = "Mesure MISt Jobtrek";

/// Marker for the school program (program B).
pub const PROGRAM_B_MARKER: &str = "JobtrekSchool";

/// Generic marker present in every intervention label.
pub const GENERIC_MARKER: &str = "Jobtrek";

/// All substrings that classify an event label as an intervention.
pub const INTERVENTION_MARKERS: [&str; 3] = [PROGRAM_A_MARKER, PROGRAM_B_MARKER, GENERIC_MARKER];

/// Neutral "nothing happened" label, ignored by event rankings.
pub const NEUTRAL_EVENT: &str = "Année stable";

/// Case-sensitive substring test against [`INTERVENTION_MARKERS`].
pub fn is_intervention_event(label: &str) -> bool {
    INTERVENTION_MARKERS.iter().any(|marker| label.contains(marker))
}

/// The first intervention point of a trajectory and its position.
#[derive(Debug, Clone, Copy)]
pub struct InterventionPoint<'a> {
    pub index: usize,
    pub point: &'a Point,
}

impl InterventionPoint<'_> {
    pub fn year(&self) -> i32 {
        self.point.year
    }
}

/// Scans points in canonical order for the first intervention event.
pub fn find_first_intervention(trajectory: &Trajectory) -> Option<InterventionPoint<'_>> {
    trajectory
        .points()
        .iter()
        .enumerate()
        .find(|(_, p)| is_intervention_event(&p.event))
        .map(|(index, point)| InterventionPoint { index, point })
}

/// Year of the first intervention event, or `None` when there is none.
pub fn find_first_intervention_year(trajectory: &Trajectory) -> Option<i32> {
    find_first_intervention(trajectory).map(|ip| ip.year())
}

/// Intervention program a trajectory belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgramType {
    /// "Mesure MISt Jobtrek"
    Mist,
    /// "JobtrekSchool"
    School,
}

impl ProgramType {
    /// Buckets a trajectory by priority: program A if any label carries its
    /// marker, else program B, else no bucket.
    pub fn classify(trajectory: &Trajectory) -> Option<Self> {
        let points = trajectory.points();
        if points.iter().any(|p| p.event.contains(PROGRAM_A_MARKER)) {
            Some(ProgramType::Mist)
        } else if points.iter().any(|p| p.event.contains(PROGRAM_B_MARKER)) {
            Some(ProgramType::School)
        } else {
            None
        }
    }

    pub fn marker(&self) -> &'static str {
        match self {
            ProgramType::Mist => PROGRAM_A_MARKER,
            ProgramType::School => PROGRAM_B_MARKER,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trajectory::accumulate;

    #[test]
    fn test_marker_matching_is_case_sensitive() {
        assert!(is_intervention_event("Mesure MISt Jobtrek"));
        assert!(is_intervention_event("Entrée JobtrekSchool"));
        assert!(is_intervention_event("Suivi Jobtrek"));
        assert!(!is_intervention_event("suivi jobtrek"));
        assert!(!is_intervention_event("Apprentissage"));
    }

    #[test]
    fn test_first_match_wins() {
        let t = accumulate(
            "t",
            "T",
            "",
            &[
                (2018, 1.0, "Ecole"),
                (2019, 2.0, "JobtrekSchool"),
                (2021, 1.0, "Mesure MISt Jobtrek"),
            ],
        );
        let ip = find_first_intervention(&t).unwrap();
        assert_eq!(ip.index, 1);
        assert_eq!(find_first_intervention_year(&t), Some(2019));
    }

    #[test]
    fn test_not_found() {
        let t = accumulate("t", "T", "", &[(2018, 1.0, "Ecole"), (2019, 1.0, "CFC")]);
        assert!(find_first_intervention_year(&t).is_none());
        assert!(find_first_intervention_year(&accumulate("e", "E", "", &[])).is_none());
    }

    #[test]
    fn test_program_priority() {
        let both = accumulate(
            "t",
            "T",
            "",
            &[(2018, 1.0, "JobtrekSchool"), (2019, 1.0, "Mesure MISt Jobtrek")],
        );
        let school = accumulate("s", "S", "", &[(2018, 1.0, "JobtrekSchool")]);
        let generic = accumulate("g", "G", "", &[(2018, 1.0, "Suivi Jobtrek")]);

        assert_eq!(ProgramType::classify(&both), Some(ProgramType::Mist));
        assert_eq!(ProgramType::classify(&school), Some(ProgramType::School));
        assert_eq!(ProgramType::classify(&generic), None);
    }
}
