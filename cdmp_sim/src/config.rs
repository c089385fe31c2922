//! Harness configuration.

use crate::error::{Result, SimError};
use cdmp_core::{PolicyConfig, ReportingLevel, MAX_NUM_ACTOR, MIN_NUM_ACTOR};
use serde::{Deserialize, Serialize};

/// Configuration for a batch of scenario runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    /// Master seed for determinism (0 = draw one and report it)
    pub seed: u64,

    /// Number of actors in the generated scenarios
    pub num_actors: usize,

    /// Maximum number of turns before the run stops
    pub max_turns: usize,

    /// Voting, victory-probability and PCE policy
    pub policy: PolicyConfig,

    /// Scalar positions closer than this are the same position
    pub pos_tol: f64,

    /// Fraction of the distance to the target outcome covered each turn
    pub drift_rate: f64,

    /// Half-width of the uniform noise in other actors' utility estimates
    pub util_noise: f64,

    /// Diagnostic verbosity passed to the core
    pub reporting: ReportingLevel,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            num_actors: 6,
            max_turns: 10,
            policy: PolicyConfig::default(),
            pos_tol: 1e-3,
            drift_rate: 0.25,
            util_noise: 0.0,
            reporting: ReportingLevel::Silent,
        }
    }
}

impl SimConfig {
    /// Rejects configurations the harness cannot run.
    pub fn validate(&self) -> Result<()> {
        if !(MIN_NUM_ACTOR..=MAX_NUM_ACTOR).contains(&self.num_actors) {
            return Err(SimError::Config(format!(
                "num_actors {} outside [{}, {}]",
                self.num_actors, MIN_NUM_ACTOR, MAX_NUM_ACTOR
            )));
        }
        if self.max_turns == 0 {
            return Err(SimError::Config("max_turns must be at least 1".to_string()));
        }
        if !(self.pos_tol > 0.0) {
            return Err(SimError::Config(format!("pos_tol must be positive, got {}", self.pos_tol)));
        }
        if !(self.drift_rate > 0.0 && self.drift_rate <= 1.0) {
            return Err(SimError::Config(format!(
                "drift_rate must be in (0, 1], got {}",
                self.drift_rate
            )));
        }
        if !(self.util_noise >= 0.0) {
            return Err(SimError::Config(format!(
                "util_noise must be non-negative, got {}",
                self.util_noise
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(SimConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let few = SimConfig {
            num_actors: 2,
            ..Default::default()
        };
        assert!(matches!(few.validate(), Err(SimError::Config(_))));

        let still = SimConfig {
            drift_rate: 0.0,
            ..Default::default()
        };
        assert!(still.validate().is_err());

        let no_turns = SimConfig {
            max_turns: 0,
            ..Default::default()
        };
        assert!(no_turns.validate().is_err());
    }

    #[test]
    fn test_config_json() {
        let json = serde_json::to_string(&SimConfig::default()).unwrap();
        assert!(json.contains("\"Silent\""));
        let back: SimConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, SimConfig::default());
    }
}
