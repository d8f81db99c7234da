//! Cohort scenarios for the simulation harness.

use crate::oracle::GeneratorConfig;

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// SIM-001: Default cohort, every analytics invariant
    Baseline,

    /// SIM-002: Scores fall after the intervention and go negative
    NegativeDrift,

    /// SIM-003: Mostly hidden trajectories, reachable only by code
    HiddenCodes,

    /// SIM-004: Nobody receives an intervention
    NoIntervention,

    /// SIM-005: Every score is zero
    ConstantScores,

    /// SIM-006: Many events per year, shuffled payload order
    SameYearBursts,

    /// SIM-007: Hit-testing rendered chart lines
    ProximityStress,

    /// SIM-008: Snapshot cache expiry on a virtual clock
    CacheExpiry,

    /// SIM-009: Large cohort
    LargeCohort,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::Baseline,
            ScenarioId::NegativeDrift,
            ScenarioId::HiddenCodes,
            ScenarioId::NoIntervention,
            ScenarioId::ConstantScores,
            ScenarioId::SameYearBursts,
            ScenarioId::ProximityStress,
            ScenarioId::CacheExpiry,
            ScenarioId::LargeCohort,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::Baseline => "baseline",
            ScenarioId::NegativeDrift => "negative_drift",
            ScenarioId::HiddenCodes => "hidden_codes",
            ScenarioId::NoIntervention => "no_intervention",
            ScenarioId::ConstantScores => "constant_scores",
            ScenarioId::SameYearBursts => "same_year_bursts",
            ScenarioId::ProximityStress => "proximity_stress",
            ScenarioId::CacheExpiry => "cache_expiry",
            ScenarioId::LargeCohort => "large_cohort",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::Baseline => "Default cohort: normalizer band, impact, breakdown, search",
            ScenarioId::NegativeDrift => "Post-intervention decline with negative cumulative scores",
            ScenarioId::HiddenCodes => "80% hidden trajectories, unique code lookups must surface them",
            ScenarioId::NoIntervention => "No intervention events: statistics degrade to zero",
            ScenarioId::ConstantScores => "All-zero scores: constant normalization and zero-baseline branch",
            ScenarioId::SameYearBursts => "Same-year events in reversed payload order must ingest canonically",
            ScenarioId::ProximityStress => "Random chart geometry: hit-test results stay within range",
            ScenarioId::CacheExpiry => "5 minute TTL: reuse, expiry, refresh on a virtual clock",
            ScenarioId::LargeCohort => "5000 trajectories through the full pipeline",
        }
    }

    /// Cohort shape for this scenario; `population` overrides the default size.
    pub fn generator_config(&self, population: usize) -> GeneratorConfig {
        let base = GeneratorConfig {
            population,
            ..Default::default()
        };
        match self {
            ScenarioId::Baseline | ScenarioId::ProximityStress | ScenarioId::CacheExpiry => base,
            ScenarioId::NegativeDrift => GeneratorConfig {
                score_mean: -1.0,
                post_intervention_drift: -3.0,
                ..base
            },
            ScenarioId::HiddenCodes => GeneratorConfig {
                hidden_rate: 0.8,
                ..base
            },
            ScenarioId::NoIntervention => GeneratorConfig {
                intervention_rate: 0.0,
                ..base
            },
            ScenarioId::ConstantScores => GeneratorConfig {
                score_mean: 0.0,
                score_std: 0.0,
                post_intervention_drift: 0.0,
                ..base
            },
            ScenarioId::SameYearBursts => GeneratorConfig {
                same_year_rate: 0.7,
                max_points: 12,
                ..base
            },
            ScenarioId::LargeCohort => GeneratorConfig {
                population: population.max(5000),
                ..base
            },
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "baseline" | "sim-001" => Ok(ScenarioId::Baseline),
            "negative_drift" | "negativedrift" | "sim-002" => Ok(ScenarioId::NegativeDrift),
            "hidden_codes" | "hiddencodes" | "sim-003" => Ok(ScenarioId::HiddenCodes),
            "no_intervention" | "nointervention" | "sim-004" => Ok(ScenarioId::NoIntervention),
            "constant_scores" | "constantscores" | "sim-005" => Ok(ScenarioId::ConstantScores),
            "same_year_bursts" | "sameyearbursts" | "sim-006" => Ok(ScenarioId::SameYearBursts),
            "proximity_stress" | "proximitystress" | "sim-007" => Ok(ScenarioId::ProximityStress),
            "cache_expiry" | "cacheexpiry" | "sim-008" => Ok(ScenarioId::CacheExpiry),
            "large_cohort" | "largecohort" | "sim-009" => Ok(ScenarioId::LargeCohort),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_parse_back() {
        for scenario in ScenarioId::all() {
            assert_eq!(scenario.name().parse::<ScenarioId>(), Ok(scenario));
            assert!(!scenario.description().is_empty());
        }
        assert_eq!("SIM-004".parse::<ScenarioId>(), Ok(ScenarioId::NoIntervention));
        assert!("warp".parse::<ScenarioId>().is_err());
    }

    #[test]
    fn test_generator_overrides() {
        assert_eq!(ScenarioId::NoIntervention.generator_config(10).intervention_rate, 0.0);
        assert_eq!(ScenarioId::LargeCohort.generator_config(10).population, 5000);
        assert_eq!(ScenarioId::Baseline.generator_config(10), GeneratorConfig {
            population: 10,
            ..Default::default()
        });
    }
}
