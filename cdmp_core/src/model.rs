//! The model: actor roster, state history, policy and the turn loop.

use crate::actor::Actor;
use crate::error::{ModelError, Result};
use crate::policy::PolicyConfig;
use crate::state::State;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

/// Fewest actors a state may index.
pub const MIN_NUM_ACTOR: usize = 3;

/// Most actors a state may index (10-30 is typical).
pub const MAX_NUM_ACTOR: usize = 250;

/// Longest scenario name accepted.
pub const MAX_SCEN_NAME_LEN: usize = 512;

static NEXT_MODEL_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique model identifier; states carry it as their back-reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModelId(pub u64);

impl ModelId {
    fn next() -> Self {
        Self(NEXT_MODEL_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "M{}", self.0)
    }
}

/// Produces the successor of a state.
pub trait StepFn {
    fn step(&mut self, model: &Model, state: &dyn State) -> Result<Box<dyn State>>;
}

impl<F> StepFn for F
where
    F: FnMut(&Model, &dyn State) -> Result<Box<dyn State>>,
{
    fn step(&mut self, model: &Model, state: &dyn State) -> Result<Box<dyn State>> {
        self(model, state)
    }
}

/// Decides when the turn loop ends, given the iteration count (from 1) and
/// the newest state.
pub trait StopCondition {
    fn should_stop(&mut self, iteration: usize, state: &dyn State) -> bool;
}

impl<F> StopCondition for F
where
    F: FnMut(usize, &dyn State) -> bool,
{
    fn should_stop(&mut self, iteration: usize, state: &dyn State) -> bool {
        self(iteration, state)
    }
}

/// Stops after a fixed number of steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaxTurns(pub usize);

impl StopCondition for MaxTurns {
    fn should_stop(&mut self, iteration: usize, _state: &dyn State) -> bool {
        iteration >= self.0
    }
}

/// Owns the actors and the state history of one scenario.
///
/// States refer back to their model only by [`ModelId`] and to actors only
/// by index into the roster.
pub struct Model {
    id: ModelId,
    scen_name: String,
    scen_desc: String,
    seed: u64,
    policy: PolicyConfig,
    actors: Vec<Box<dyn Actor>>,
    history: Vec<Box<dyn State>>,
    rng: RefCell<ChaCha8Rng>,
    stop: Option<Box<dyn StopCondition>>,
}

impl Model {
    /// Creates an empty model.
    ///
    /// A seed of 0 draws a fresh random seed, which is recorded so the run
    /// can be reproduced.
    pub fn new(policy: PolicyConfig, seed: u64) -> Self {
        let seed = if seed == 0 { fresh_seed() } else { seed };
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let id = ModelId::next();
        debug!(model = %id, seed, "Created model");
        Self {
            id,
            scen_name: format!("Scenario-UTC-{}", secs),
            scen_desc: String::new(),
            seed,
            policy,
            actors: Vec::new(),
            history: Vec::new(),
            rng: RefCell::new(ChaCha8Rng::seed_from_u64(seed)),
            stop: None,
        }
    }

    /// Names and describes the scenario.
    pub fn with_scenario(mut self, name: &str, desc: &str) -> Result<Self> {
        let len = name.chars().count();
        if len > MAX_SCEN_NAME_LEN {
            return Err(ModelError::TooLong {
                what: "scenario name",
                len,
                max: MAX_SCEN_NAME_LEN,
            });
        }
        self.scen_name = name.to_string();
        self.scen_desc = desc.to_string();
        Ok(self)
    }

    /// Sets the stop condition, builder style.
    pub fn with_stop(mut self, stop: impl StopCondition + 'static) -> Self {
        self.stop = Some(Box::new(stop));
        self
    }

    pub fn set_stop(&mut self, stop: impl StopCondition + 'static) {
        self.stop = Some(Box::new(stop));
    }

    pub fn id(&self) -> ModelId {
        self.id
    }

    pub fn scenario_name(&self) -> &str {
        &self.scen_name
    }

    pub fn scenario_desc(&self) -> &str {
        &self.scen_desc
    }

    /// The seed actually in use (never 0).
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn policy(&self) -> &PolicyConfig {
        &self.policy
    }

    /// Runs `f` with exclusive access to the model's random generator.
    ///
    /// The model is single-threaded; `f` must not call `with_rng` again.
    pub fn with_rng<R>(&self, f: impl FnOnce(&mut ChaCha8Rng) -> R) -> R {
        f(&mut self.rng.borrow_mut())
    }

    /// Adds an actor, returning the new roster size.
    pub fn add_actor(&mut self, actor: Box<dyn Actor>) -> usize {
        self.actors.push(actor);
        self.actors.len()
    }

    pub fn num_act(&self) -> usize {
        self.actors.len()
    }

    pub fn actor(&self, i: usize) -> Option<&dyn Actor> {
        self.actors.get(i).map(|a| a.as_ref())
    }

    pub fn actors(&self) -> &[Box<dyn Actor>] {
        &self.actors
    }

    /// Index of the first actor with the given name.
    pub fn actor_ndx(&self, name: &str) -> Option<usize> {
        self.actors.iter().position(|a| a.name() == name)
    }

    /// Appends a state to the history, returning its turn number.
    ///
    /// The state must have been built for this model.
    pub fn add_state(&mut self, s: Box<dyn State>) -> Result<usize> {
        if s.model_id() != self.id {
            return Err(ModelError::WrongModel {
                model: self.id.0,
                state_model: s.model_id().0,
            });
        }
        self.history.push(s);
        Ok(self.history.len() - 1)
    }

    pub fn history(&self) -> &[Box<dyn State>] {
        &self.history
    }

    /// The state at turn `t`.
    pub fn state(&self, t: usize) -> Option<&dyn State> {
        self.history.get(t).map(|s| s.as_ref())
    }

    pub fn state_mut(&mut self, t: usize) -> Option<&mut (dyn State + 'static)> {
        self.history.get_mut(t).map(|s| s.as_mut())
    }

    /// The newest state.
    pub fn latest(&self) -> Option<&dyn State> {
        self.history.last().map(|s| s.as_ref())
    }

    /// Steps the model until the stop condition fires.
    ///
    /// Requires exactly one state in history. Each iteration asks the newest
    /// state's step function for a successor, appends it, then consults the
    /// stop condition. Returns the number of iterations run.
    pub fn run(&mut self) -> Result<usize> {
        if self.history.len() != 1 {
            return Err(ModelError::HistoryNotReady(self.history.len()));
        }
        let mut stop = self.stop.take().ok_or(ModelError::MissingStop)?;
        let result = self.run_loop(stop.as_mut());
        self.stop = Some(stop);
        result
    }

    fn run_loop(&mut self, stop: &mut dyn StopCondition) -> Result<usize> {
        info!(model = %self.id, scenario = %self.scen_name, seed = self.seed, "Starting run");
        let mut iter = 0;
        loop {
            iter += 1;
            let t = self.history.len() - 1;
            let mut step = self.history[t]
                .core_mut()
                .step
                .take()
                .ok_or(ModelError::MissingStep(t))?;
            let next = step.step(self, self.history[t].as_ref());
            self.history[t].core_mut().step = Some(step);

            let turn = self.add_state(next?)?;
            debug!(iteration = iter, turn, "Stepped");

            let newest = self.history[turn].as_ref();
            if stop.should_stop(iter, newest) {
                break;
            }
        }
        info!(model = %self.id, iterations = iter, "Run complete");
        Ok(iter)
    }
}

impl Drop for Model {
    fn drop(&mut self) {
        while let Some(s) = self.history.pop() {
            drop(s);
        }
        while let Some(a) = self.actors.pop() {
            drop(a);
        }
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("id", &self.id)
            .field("scen_name", &self.scen_name)
            .field("seed", &self.seed)
            .field("policy", &self.policy)
            .field("num_act", &self.actors.len())
            .field("history_len", &self.history.len())
            .finish()
    }
}

fn fresh_seed() -> u64 {
    loop {
        let s: u64 = rand::random();
        if s != 0 {
            return s;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{line_model, line_step, LineState};
    use std::cell::Cell;
    use std::rc::Rc;

    fn ready_model(num_act: usize) -> Model {
        let mut model = line_model(num_act);
        let xs: Vec<f64> = (0..num_act).map(|i| i as f64 / num_act as f64).collect();
        let s0 = LineState::new(&model, &xs).unwrap();
        let s0 = s0.with_step(line_step);
        model.add_state(Box::new(s0)).unwrap();
        model
    }

    #[test]
    fn test_run_until_fifth_iteration() {
        let mut model = ready_model(3).with_stop(|iter: usize, _s: &dyn State| iter >= 5);
        let iterations = model.run().unwrap();
        assert_eq!(iterations, 5);
        assert_eq!(model.history().len(), 6);
        for t in 0..6 {
            assert_eq!(model.state(t).unwrap().my_turn(&model), Ok(t));
        }
    }

    #[test]
    fn test_run_with_max_turns() {
        let mut model = ready_model(4).with_stop(MaxTurns(3));
        model.run().unwrap();
        assert_eq!(model.history().len(), 4);
    }

    #[test]
    fn test_stop_sees_newest_state() {
        let seen = Rc::new(Cell::new(0usize));
        let seen_in_stop = Rc::clone(&seen);
        let mut model = ready_model(3).with_stop(move |iter: usize, s: &dyn State| {
            seen_in_stop.set(s.num_act());
            iter >= 2
        });
        model.run().unwrap();
        assert_eq!(seen.get(), 3);
    }

    #[test]
    fn test_run_requires_single_state() {
        let mut model = line_model(3).with_stop(MaxTurns(1));
        assert_eq!(model.run(), Err(ModelError::HistoryNotReady(0)));

        let mut model = ready_model(3).with_stop(MaxTurns(1));
        let extra = LineState::new(&model, &[0.0, 0.1, 0.2]).unwrap();
        model.add_state(Box::new(extra)).unwrap();
        assert_eq!(model.run(), Err(ModelError::HistoryNotReady(2)));
    }

    #[test]
    fn test_run_requires_step_and_stop() {
        let mut model = ready_model(3);
        assert_eq!(model.run(), Err(ModelError::MissingStop));

        let mut model = line_model(3).with_stop(MaxTurns(1));
        let s0 = LineState::new(&model, &[0.0, 0.1, 0.2]).unwrap();
        model.add_state(Box::new(s0)).unwrap();
        assert_eq!(model.run(), Err(ModelError::MissingStep(0)));
    }

    #[test]
    fn test_add_state_from_other_model() {
        let a = line_model(3);
        let mut b = line_model(3);
        assert_ne!(a.id(), b.id());
        let s = LineState::new(&a, &[0.0, 0.5, 1.0]).unwrap();
        assert!(matches!(b.add_state(Box::new(s)), Err(ModelError::WrongModel { .. })));
    }

    #[test]
    fn test_actor_lookup() {
        let model = line_model(3);
        assert_eq!(model.num_act(), 3);
        assert_eq!(model.actor_ndx("A1"), Some(1));
        assert_eq!(model.actor_ndx("nobody"), None);
        assert_eq!(model.actor(2).unwrap().name(), "A2");
    }

    #[test]
    fn test_seed_zero_is_replaced() {
        let model = Model::new(PolicyConfig::default(), 0);
        assert_ne!(model.seed(), 0);
        assert!(model.scenario_name().starts_with("Scenario-UTC-"));
    }

    #[test]
    fn test_same_seed_same_stream() {
        let a = Model::new(PolicyConfig::default(), 42);
        let b = Model::new(PolicyConfig::default(), 42);
        let xa: u64 = a.with_rng(|r| rand::Rng::gen(r));
        let xb: u64 = b.with_rng(|r| rand::Rng::gen(r));
        assert_eq!(xa, xb);

        // the generator state carries over between calls
        let ya: u64 = a.with_rng(|r| rand::Rng::gen(r));
        assert_ne!(xa, ya);
        let yb: u64 = b.with_rng(|r| rand::Rng::gen(r));
        assert_eq!(ya, yb);
    }

    #[test]
    fn test_scenario_name_limit() {
        let long = "x".repeat(MAX_SCEN_NAME_LEN + 1);
        let r = Model::new(PolicyConfig::default(), 1).with_scenario(&long, "");
        assert!(matches!(r, Err(ModelError::TooLong { .. })));
        let m = Model::new(PolicyConfig::default(), 1)
            .with_scenario("Baseline", "three actors")
            .unwrap();
        assert_eq!(m.scenario_name(), "Baseline");
        assert_eq!(m.scenario_desc(), "three actors");
    }
}
