//! Payload -> snapshot -> filter -> statistics, on a five-person cohort.

use peakview_core::cohort::qualifying;
use peakview_core::series::{average_series, three_point_view, THREE_POINT_AXIS};
use peakview_core::{
    ingest_payload, normalize, Action, CohortStatistics, ImpactBranch, ProgramType, Snapshot,
    VisualizationState,
};
use serde_json::json;

fn point(year: i32, score: f64, cumulative: f64, event: &str) -> serde_json::Value {
    json!({
        "year": year,
        "score": score,
        "event": event,
        "categorie": "Formation",
        "sousCategorie": null,
        "cumulativeScore": cumulative,
        "termine": null
    })
}

fn cohort() -> Snapshot {
    let payload = json!({
        "trajectories": [
            { "id": "1", "userCode": "J0001", "typeMesure": "MISt", "points": [
                point(2018, 2.0, 2.0, "Ecole"),
                point(2019, 2.0, 4.0, "Mesure MISt Jobtrek"),
                point(2021, 2.0, 6.0, "CFC"),
            ]},
            { "id": "2", "userCode": "J0002", "typeMesure": "School", "points": [
                point(2018, 3.0, 3.0, "Ecole"),
                point(2019, 1.0, 4.0, "JobtrekSchool"),
                point(2020, -2.0, 2.0, "Rupture"),
            ]},
            { "id": "3", "userCode": "J0003", "typeMesure": "", "points": [
                point(2017, 1.0, 1.0, "Stage"),
                point(2018, 1.0, 2.0, "Suivi Jobtrek"),
                point(2019, 0.0, 2.0, "Année stable"),
            ]},
            { "id": "4", "userCode": "J0004", "typeMesure": "", "points": [
                point(2017, 1.0, 1.0, "Ecole"),
                point(2018, 1.0, 2.0, "Stage"),
                point(2019, 1.0, 3.0, "Emploi"),
                point(2020, 1.0, 4.0, "Emploi"),
            ]},
            { "id": "5", "userCode": "J0005", "typeMesure": "MISt", "points": [
                point(2019, 1.0, 1.0, "Mesure MISt Jobtrek"),
                point(2020, 1.0, 2.0, "Stage"),
            ]}
        ],
        "metadata": { "totalCount": 5, "lastUpdated": "2024-06-01", "apiVersion": "1" }
    });
    ingest_payload(&payload.to_string()).unwrap()
}

#[test]
fn test_cohort_statistics() {
    let snapshot = cohort();
    assert_eq!(qualifying(&snapshot).len(), 3);

    let stats = CohortStatistics::compute(&snapshot);
    assert_eq!(stats.progression_breakdown.total_count, 3);
    assert_eq!(stats.progression_breakdown.progression_percentage, 33);
    assert_eq!(stats.progression_breakdown.stagnation_percentage, 33);
    assert_eq!(stats.progression_breakdown.regression_percentage, 33);
    assert_eq!(stats.improvement_percentage, 0);

    let dist = stats.program_distribution;
    assert!(dist.total <= 3);
    assert_eq!(dist.count(ProgramType::Mist), 1);
    assert_eq!(dist.count(ProgramType::School), 1);

    let events: Vec<(&str, i64)> = stats
        .top_post_intervention_events
        .iter()
        .map(|e| (e.event.as_str(), e.percentage))
        .collect();
    assert_eq!(events, vec![("CFC", 50), ("Rupture", 50)]);
}

#[test]
fn test_individual_reports() {
    let snapshot = cohort();
    let report = peakview_core::individual_impact(&snapshot[0]);
    assert_eq!(report.improvement, 50);
    assert_eq!(report.branch, ImpactBranch::Relative);
    assert_eq!(peakview_core::individual_improvement(&snapshot[3]), 0);
}

#[test]
fn test_default_view_and_hidden_lookup() {
    let state = VisualizationState::new(cohort());
    let shown: Vec<&str> = state.filtered().map(|t| t.id.as_str()).collect();
    assert_eq!(shown, vec!["1", "2", "3", "4"]);

    let state = state.reduce(Action::Search("J0005".to_string()));
    let shown: Vec<&str> = state.filtered().map(|t| t.id.as_str()).collect();
    assert_eq!(shown, vec!["5"]);
    assert!(state.is_direct_code_match());
}

#[test]
fn test_rendering_inputs_are_bounded() {
    let snapshot = cohort();
    for trajectory in snapshot.iter() {
        let normalized = normalize(trajectory.points());
        assert!(normalized.magnitudes.iter().all(|m| (0.05..=1.2).contains(m)));
    }

    let view = three_point_view(&snapshot);
    let avg = average_series(&THREE_POINT_AXIS, &view);
    assert_eq!(avg.len(), 3);
    assert!(avg.iter().all(Option::is_some));
}
