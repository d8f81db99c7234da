//! Ground truth oracle for simulation.
//!
//! The Oracle generates synthetic cohorts from a single seed and remembers
//! what it planted in them:
//! - Where the intervention was placed (if anywhere)
//! - Which program it belongs to
//!
//! Same seed, same config, same cohort.

use peakview_core::ingest::{PayloadMetadata, RawPayload, RawPoint, RawTrajectory};
use peakview_core::intervention::{PROGRAM_A_MARKER, PROGRAM_B_MARKER};
use peakview_core::{Completion, Point, ProgramType, Trajectory};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Intervention label that carries only the generic marker.
pub const GENERIC_INTERVENTION_LABEL: &str = "Suivi Jobtrek";

const BEFORE_EVENTS: [&str; 6] = [
    "Ecole obligatoire",
    "Stage",
    "Gymnase",
    "Apprentissage",
    "Chômage",
    "Année stable",
];

const AFTER_EVENTS: [&str; 7] = [
    "CFC",
    "Emploi",
    "Stage",
    "Formation continue",
    "Rupture",
    "Attestation fédérale",
    "Année stable",
];

const RAW_CATEGORIES: [&str; 7] = [
    "Formation",
    "Expérience professionnelle",
    "Mesures de Transition 1",
    "Phase pré-professionnelle",
    "Période de transition / suspension d'activité",
    "Facteurs contextuels",
    "Autre",
];

const SUBCATEGORIES: [&str; 4] = ["Vente", "Logistique", "Santé", "Informatique"];

/// Shape of a generated cohort.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    pub population: usize,

    /// Share of trajectories with fewer than three points
    pub hidden_rate: f64,
    pub max_points: usize,

    /// Share of trajectories that receive an intervention event
    pub intervention_rate: f64,
    /// Among interventions, share labelled for program A
    pub program_a_share: f64,
    /// Among interventions, share carrying only the generic marker
    pub generic_share: f64,

    pub start_year_min: i32,
    pub start_year_max: i32,
    /// Probability that a point shares the previous point's year
    pub same_year_rate: f64,

    pub score_mean: f64,
    pub score_std: f64,
    /// Added to the mean of every score after the intervention
    pub post_intervention_drift: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            population: 50,
            hidden_rate: 0.15,
            max_points: 8,
            intervention_rate: 0.7,
            program_a_share: 0.5,
            generic_share: 0.1,
            start_year_min: 2010,
            start_year_max: 2018,
            same_year_rate: 0.2,
            score_mean: 0.5,
            score_std: 2.0,
            post_intervention_drift: 1.0,
        }
    }
}

/// A generated trajectory together with what was planted in it.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedTrajectory {
    pub trajectory: Trajectory,
    /// Index of the planted intervention point
    pub intervention_index: Option<usize>,
    pub program: Option<ProgramType>,
}

/// The Oracle - seeded cohort generator.
pub struct Oracle {
    seed: u64,
    rng: ChaCha8Rng,
}

impl Oracle {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Generates a full cohort.
    pub fn generate(&mut self, config: &GeneratorConfig) -> Vec<GeneratedTrajectory> {
        (0..config.population)
            .map(|index| self.generate_one(index, config))
            .collect()
    }

    /// Generates a cohort and keeps only the trajectories.
    pub fn cohort(&mut self, config: &GeneratorConfig) -> Vec<Trajectory> {
        self.generate(config)
            .into_iter()
            .map(|g| g.trajectory)
            .collect()
    }

    fn sample_score(&mut self, mean: f64, std: f64) -> f64 {
        match Normal::new(mean, std) {
            Ok(normal) => normal.sample(&mut self.rng).round(),
            Err(_) => mean.round(),
        }
    }

    fn pick<'a>(&mut self, choices: &[&'a str]) -> &'a str {
        choices.choose(&mut self.rng).copied().unwrap_or_default()
    }

    fn generate_one(&mut self, index: usize, config: &GeneratorConfig) -> GeneratedTrajectory {
        let len = if self.rng.gen_bool(config.hidden_rate.clamp(0.0, 1.0)) {
            self.rng.gen_range(1..=2)
        } else {
            self.rng.gen_range(3..=config.max_points.max(3))
        };

        let intervention_index = if self.rng.gen_bool(config.intervention_rate.clamp(0.0, 1.0)) {
            Some(self.rng.gen_range(0..len))
        } else {
            None
        };

        let (program, marker) = match intervention_index {
            None => (None, None),
            Some(_) => {
                let roll: f64 = self.rng.gen();
                if roll < config.generic_share {
                    (None, Some(GENERIC_INTERVENTION_LABEL))
                } else if roll < config.generic_share + (1.0 - config.generic_share) * config.program_a_share {
                    (Some(ProgramType::Mist), Some(PROGRAM_A_MARKER))
                } else {
                    (Some(ProgramType::School), Some(PROGRAM_B_MARKER))
                }
            }
        };

        let low = config.start_year_min.min(config.start_year_max);
        let high = config.start_year_min.max(config.start_year_max);
        let mut year = self.rng.gen_range(low..=high);
        let mut cumulative = 0.0;
        let mut points = Vec::with_capacity(len);

        for i in 0..len {
            if i > 0 && !self.rng.gen_bool(config.same_year_rate.clamp(0.0, 1.0)) {
                year += 1;
            }

            let after = intervention_index.is_some_and(|k| i > k);
            let mean = if after {
                config.score_mean + config.post_intervention_drift
            } else {
                config.score_mean
            };
            let score = self.sample_score(mean, config.score_std);
            cumulative += score;

            let event = match (intervention_index, marker) {
                (Some(k), Some(label)) if k == i => label,
                _ if after => self.pick(&AFTER_EVENTS),
                _ => self.pick(&BEFORE_EVENTS),
            };
            let category = self.pick(&RAW_CATEGORIES);
            let subcategory = if self.rng.gen_bool(0.3) {
                Some(self.pick(&SUBCATEGORIES))
            } else {
                None
            };
            let completion = *[Completion::Unknown, Completion::Completed, Completion::Incomplete]
                .choose(&mut self.rng)
                .unwrap_or(&Completion::Unknown);

            points.push(
                Point::new(year, score, cumulative, event)
                    .with_category(category, subcategory)
                    .with_completion(completion),
            );
        }

        let program_type = match program {
            Some(ProgramType::Mist) => "MISt",
            Some(ProgramType::School) => "School",
            None => "",
        };
        let id = Uuid::from_bytes(self.rng.gen()).to_string();
        let code = user_code(index, config.population);

        let trajectory = Trajectory::new(&id, &code, program_type, points)
            .with_name(&format!("Parcours {index}"));

        GeneratedTrajectory {
            trajectory,
            intervention_index,
            program,
        }
    }
}

/// User code for the `index`-th member of a cohort of `population`.
///
/// Every code in a cohort has the same width (at least four digits), so no
/// code is a substring of another.
pub fn user_code(index: usize, population: usize) -> String {
    let width = population.saturating_sub(1).to_string().len().max(4);
    format!("J{index:0width$}")
}

/// Converts trajectories back into an upstream payload.
///
/// With `reverse_years`, points are emitted latest year first (same-year
/// points keep their relative order), so ingestion has to restore the
/// canonical order.
pub fn to_payload(trajectories: &[Trajectory], reverse_years: bool) -> RawPayload {
    let raw = trajectories
        .iter()
        .map(|t| {
            let mut points: Vec<&Point> = t.points().iter().collect();
            if reverse_years {
                points.sort_by(|a, b| b.year.cmp(&a.year));
            }
            RawTrajectory {
                id: t.id.clone(),
                user_code: t.user_code.clone(),
                name: t.name.clone(),
                type_mesure: t.program_type.clone(),
                start_year: Some(t.start_year),
                points: points
                    .into_iter()
                    .map(|p| RawPoint {
                        year: p.year,
                        score: p.score,
                        event: p.event.clone(),
                        categorie: p.category.clone(),
                        sous_categorie: p.subcategory.clone(),
                        cumulative_score: p.cumulative_score,
                        termine: match p.completion {
                            Completion::Unknown => None,
                            Completion::Completed => Some(true),
                            Completion::Incomplete => Some(false),
                        },
                    })
                    .collect(),
                max_height: t.max_height,
            }
        })
        .collect::<Vec<_>>();

    RawPayload {
        metadata: Some(PayloadMetadata {
            total_count: raw.len(),
            last_updated: "2024-01-01T00:00:00Z".to_string(),
            api_version: "1.0".to_string(),
        }),
        trajectories: raw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use peakview_core::intervention::find_first_intervention;

    #[test]
    fn test_oracle_is_deterministic() {
        let config = GeneratorConfig::default();
        let a = Oracle::new(42).cohort(&config);
        let b = Oracle::new(42).cohort(&config);
        let c = Oracle::new(43).cohort(&config);

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_generated_shape() {
        let config = GeneratorConfig {
            population: 200,
            ..Default::default()
        };
        let cohort = Oracle::new(7).generate(&config);
        assert_eq!(cohort.len(), 200);

        for g in &cohort {
            let t = &g.trajectory;
            assert!(!t.is_empty() && t.len() <= config.max_points);
            assert!(t.has_consistent_cumulative_scores());
            assert!(t.points().windows(2).all(|w| w[0].year <= w[1].year));
        }
    }

    #[test]
    fn test_planted_intervention_is_detected() {
        let cohort = Oracle::new(11).generate(&GeneratorConfig::default());
        for g in &cohort {
            let detected = find_first_intervention(&g.trajectory).map(|ip| ip.index);
            assert_eq!(detected, g.intervention_index);
            assert_eq!(ProgramType::classify(&g.trajectory), g.program);
        }
    }

    #[test]
    fn test_user_codes_share_a_width() {
        assert_eq!(user_code(7, 50), "J0007");
        assert_eq!(user_code(9999, 10_000), "J9999");
        assert_eq!(user_code(1000, 10_001), "J01000");
        assert_eq!(user_code(10_000, 10_001), "J10000");
        assert_eq!(user_code(0, 0), "J0000");
    }

    #[test]
    fn test_large_cohort_codes_are_unique_and_equal_width() {
        let config = GeneratorConfig {
            population: 10_001,
            max_points: 3,
            ..Default::default()
        };
        let cohort = Oracle::new(2).cohort(&config);
        let codes: std::collections::HashSet<&str> =
            cohort.iter().map(|t| t.user_code.as_str()).collect();

        assert_eq!(codes.len(), cohort.len());
        assert!(codes.iter().all(|c| c.len() == 6));
    }

    #[test]
    fn test_constant_config_gives_zero_scores() {
        let config = GeneratorConfig {
            score_mean: 0.0,
            score_std: 0.0,
            post_intervention_drift: 0.0,
            ..Default::default()
        };
        let cohort = Oracle::new(3).cohort(&config);
        assert!(cohort
            .iter()
            .flat_map(|t| t.points())
            .all(|p| p.cumulative_score == 0.0));
    }

    #[test]
    fn test_payload_round_trip_restores_order() {
        let cohort = Oracle::new(5).cohort(&GeneratorConfig::default());
        let json = serde_json::to_string(&to_payload(&cohort, true)).unwrap();
        let snapshot = peakview_core::ingest_payload(&json).unwrap();
        assert_eq!(&snapshot[..], &cohort[..]);
    }
}
