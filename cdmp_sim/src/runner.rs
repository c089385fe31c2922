//! Scenario runner - builds a model per scenario and drives its turn loop.

use crate::config::SimConfig;
use crate::domain::{scalar_positions, ScalarActor, ScalarParams, ScalarState, ScalarStep};
use crate::error::{Result, SimError};
use crate::exporter::RunExport;
use crate::scenarios::ScenarioId;

use cdmp_core::{record_history, ActorInfo, Model, PolicyConfig, State};
use std::rc::Rc;
use tracing::{debug, info, warn};

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Whether the outcome met the scenario's expectations
    pub passed: bool,

    /// Turns stepped after the initial state
    pub turns: usize,

    /// Distinct positions at the last turn
    pub final_unique_positions: usize,

    /// Most probable position at the last turn
    pub winning_position: f64,

    /// Its probability
    pub winner_probability: f64,

    /// Failure message if any
    pub failure_reason: Option<String>,

    /// Metrics collected during run
    pub metrics: ScenarioMetrics,
}

/// Metrics collected during scenario execution.
#[derive(Debug, Clone, Default)]
pub struct ScenarioMetrics {
    /// Range of positions at turn 0
    pub initial_spread: f64,

    /// Range of positions at the last turn
    pub final_spread: f64,

    /// Largest single-turn move by any actor
    pub max_shift: f64,

    /// Winner probability averaged over all turns
    pub mean_winner_probability: f64,

    /// Whether every actor ended on the same position
    pub converged: bool,
}

/// Runs bargaining scenarios.
pub struct ScenarioRunner {
    config: SimConfig,
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new(config: SimConfig) -> Self {
        Self { config }
    }

    /// Sets the maximum number of turns.
    pub fn with_turns(mut self, max_turns: usize) -> Self {
        self.config.max_turns = max_turns;
        self
    }

    /// Sets the seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    /// Sets the policy.
    pub fn with_policy(mut self, policy: PolicyConfig) -> Self {
        self.config.policy = policy;
        self
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Runs a scenario and returns the result.
    pub fn run(&self, scenario: ScenarioId) -> Result<ScenarioResult> {
        let mut model = self.build_model(scenario)?;
        model.run()?;
        self.summarize(scenario, &model)
    }

    /// Runs a scenario and also returns every turn's record.
    pub fn run_recorded(&self, scenario: ScenarioId) -> Result<(ScenarioResult, RunExport)> {
        let mut model = self.build_model(scenario)?;
        model.run()?;
        let result = self.summarize(scenario, &model)?;

        let mut export = RunExport::new(scenario.name(), model.seed(), *model.policy());
        let recorded = record_history(&model, &mut export)?;
        export.finalize(result.passed, Some(result.winning_position));
        debug!("Recorded {} turns", recorded);
        Ok((result, export))
    }

    /// Builds a model holding the scenario's actors and prepared initial state.
    pub fn build_model(&self, scenario: ScenarioId) -> Result<Model> {
        self.config.validate()?;
        let cfg = &self.config;
        let mut model = Model::new(cfg.policy, cfg.seed)
            .with_scenario(scenario.name(), scenario.description())?;
        info!("Starting scenario: {} (seed={})", scenario.name(), model.seed());
        let setup = model.with_rng(|rng| scenario.setup(cfg.num_actors, cfg.pos_tol, rng));

        for (k, w) in setup.weights.iter().enumerate() {
            let info = ActorInfo::new(format!("A{:02}", k), format!("{} actor {}", scenario.name(), k))?;
            model.add_actor(Box::new(ScalarActor::new(info, k, *w, cfg.policy.voting_rule)));
        }

        let params = Rc::new(ScalarParams {
            weights: setup.weights.clone(),
            pos_tol: cfg.pos_tol,
            drift_rate: cfg.drift_rate,
            util_noise: cfg.util_noise,
            reporting: cfg.reporting,
        });
        let mut s0 = ScalarState::new(&model, Rc::clone(&params), &setup.positions)?;
        s0.prepare(&model)?;
        s0.core_mut().step = Some(Box::new(ScalarStep::new(params)));
        model.add_state(Box::new(s0))?;

        let max_turns = cfg.max_turns;
        model.set_stop(move |iter: usize, s: &dyn State| {
            iter >= max_turns || s.u_indices().len() == 1
        });
        Ok(model)
    }

    fn summarize(&self, scenario: ScenarioId, model: &Model) -> Result<ScenarioResult> {
        let history = model.history();
        let first = history.first().ok_or_else(|| SimError::Config("empty history".to_string()))?;
        let last = history.last().ok_or_else(|| SimError::Config("empty history".to_string()))?;

        let mut winner_probs = Vec::with_capacity(history.len());
        let mut max_shift: f64 = 0.0;
        let mut prev: Option<Vec<f64>> = None;
        for s in history {
            let (_, p) = winner_of(s.as_ref())?;
            winner_probs.push(p);
            let xs = scalar_positions(s.as_ref())?;
            if let Some(prev) = &prev {
                let shift = xs.iter().zip(prev).map(|(a, b)| (a - b).abs()).fold(0.0, f64::max);
                max_shift = max_shift.max(shift);
            }
            prev = Some(xs);
        }

        let (winning_position, winner_probability) = winner_of(last.as_ref())?;
        let initial_spread = spread(&scalar_positions(first.as_ref())?);
        let final_spread = spread(&scalar_positions(last.as_ref())?);
        let final_unique_positions = last.u_indices().len();

        let metrics = ScenarioMetrics {
            initial_spread,
            final_spread,
            max_shift,
            mean_winner_probability: winner_probs.iter().sum::<f64>() / winner_probs.len() as f64,
            converged: final_unique_positions == 1,
        };

        let failure_reason = if !scenario.expects_winner(winning_position) {
            Some(format!("unexpected winning position {:.4}", winning_position))
        } else if final_spread > initial_spread + 1e-12 {
            Some(format!(
                "positions diverged: spread {:.4} -> {:.4}",
                initial_spread, final_spread
            ))
        } else {
            None
        };
        if let Some(reason) = &failure_reason {
            warn!("{}: {}", scenario.name(), reason);
        }

        info!(
            "{}: {} turns, winner {:.4} (p={:.3}), spread {:.4} -> {:.4}",
            scenario.name(),
            history.len() - 1,
            winning_position,
            winner_probability,
            initial_spread,
            final_spread
        );

        Ok(ScenarioResult {
            scenario,
            seed: model.seed(),
            passed: failure_reason.is_none(),
            turns: history.len() - 1,
            final_unique_positions,
            winning_position,
            winner_probability,
            failure_reason,
            metrics,
        })
    }
}

/// Most probable position of a prepared state and its probability.
///
/// Ties go to the lowest-indexed holder.
pub fn winner_of(s: &dyn State) -> Result<(f64, f64)> {
    let p = s
        .u_prob()
        .ok_or_else(|| SimError::Config("state probabilities not computed".to_string()))?;
    let unq = s.unique_ndx()?;
    let xs = scalar_positions(s)?;
    let mut best = 0;
    for k in 1..p.len() {
        if p[k] > p[best] {
            best = k;
        }
    }
    Ok((xs[unq[best]], p[best]))
}

fn spread(xs: &[f64]) -> f64 {
    let hi = xs.iter().cloned().fold(f64::MIN, f64::max);
    let lo = xs.iter().cloned().fold(f64::MAX, f64::min);
    hi - lo
}
