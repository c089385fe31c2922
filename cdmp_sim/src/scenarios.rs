//! Named bargaining scenarios.

use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Uniform};

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScenarioId {
    /// Two thirds of the actors cluster low, the rest sit high
    ClearMajority,

    /// Two equal camps at opposite ends
    Polarized,

    /// Random positions and weights drawn from the run seed
    RandomField,

    /// Every actor already holds (nearly) the same position
    Consensus,
}

/// Initial positions and voting weights of a scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioSetup {
    pub positions: Vec<f64>,
    pub weights: Vec<f64>,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::ClearMajority,
            ScenarioId::Polarized,
            ScenarioId::RandomField,
            ScenarioId::Consensus,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::ClearMajority => "clear_majority",
            ScenarioId::Polarized => "polarized",
            ScenarioId::RandomField => "random_field",
            ScenarioId::Consensus => "consensus",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::ClearMajority => "Majority bloc near 0.2 against a minority near 0.8",
            ScenarioId::Polarized => "Two equal camps at 0.1 and 0.9",
            ScenarioId::RandomField => "Uniform random positions on [0,1], weights on [1,10]",
            ScenarioId::Consensus => "All actors within tolerance of 0.5",
        }
    }

    /// Builds the initial positions and weights for `num_actors` actors.
    ///
    /// Only `RandomField` consumes randomness.
    pub fn setup(&self, num_actors: usize, pos_tol: f64, rng: &mut ChaCha8Rng) -> ScenarioSetup {
        let n = num_actors;
        let (positions, weights) = match self {
            ScenarioId::ClearMajority => {
                let majority = n - n / 3;
                let minority = n - majority;
                let positions = (0..n)
                    .map(|k| {
                        if k < majority {
                            0.2 + 0.2 * k as f64 / majority as f64
                        } else {
                            0.8 + 0.15 * (k - majority) as f64 / minority as f64
                        }
                    })
                    .collect();
                (positions, vec![1.0; n])
            }
            ScenarioId::Polarized => {
                let positions = (0..n).map(|k| if k < n / 2 { 0.1 } else { 0.9 }).collect();
                (positions, vec![1.0; n])
            }
            ScenarioId::RandomField => {
                let pos_dist = Uniform::new_inclusive(0.0, 1.0);
                let w_dist = Uniform::new_inclusive(1.0, 10.0);
                let positions = (0..n).map(|_| pos_dist.sample(rng)).collect();
                let weights = (0..n).map(|_| w_dist.sample(rng)).collect();
                (positions, weights)
            }
            ScenarioId::Consensus => {
                // spread well inside the tolerance so all positions are equivalent
                let step = pos_tol / (4.0 * n as f64);
                let positions = (0..n).map(|k| 0.5 + step * k as f64).collect();
                let weights = (0..n).map(|k| 1.0 + (k % 3) as f64).collect();
                (positions, weights)
            }
        };
        ScenarioSetup { positions, weights }
    }

    /// Whether `winner` is an acceptable winning position for this scenario.
    pub fn expects_winner(&self, winner: f64) -> bool {
        match self {
            ScenarioId::ClearMajority => winner < 0.5,
            ScenarioId::Consensus => (winner - 0.5).abs() < 0.01,
            ScenarioId::Polarized | ScenarioId::RandomField => (0.0..=1.0).contains(&winner),
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
            "clear_majority" | "clearmajority" | "majority" => Ok(ScenarioId::ClearMajority),
            "polarized" | "polarised" => Ok(ScenarioId::Polarized),
            "random_field" | "randomfield" | "random" => Ok(ScenarioId::RandomField),
            "consensus" => Ok(ScenarioId::Consensus),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}
