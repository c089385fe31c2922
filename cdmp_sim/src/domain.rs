//! A concrete bargaining domain: scalar positions on [0, 1].
//!
//! The utility to actor `i` of actor `j`'s position is `1 - |x_i - x_j|`.
//! Each turn every actor drifts toward the outcome the PCE predicts, either
//! its expectation (deterministic mode) or a sampled winner (stochastic).

use cdmp_core::{
    coalitions, prob_ce_from_coalitions, scalar_pce, ue_indices, Actor, ActorInfo, Model,
    ModelError, Perspective, ReportingLevel, State, StateCore, StateTransMode, StepFn, VctrPstn,
    VotingRule,
};
use nalgebra::{DMatrix, DVector};
use rand::distributions::WeightedIndex;
use rand_distr::{Distribution, Uniform};
use std::rc::Rc;
use tracing::debug;

/// An actor with a fixed voting weight and its own voting rule.
#[derive(Debug, Clone)]
pub struct ScalarActor {
    info: ActorInfo,
    index: usize,
    weight: f64,
    voting_rule: VotingRule,
}

impl ScalarActor {
    pub fn new(info: ActorInfo, index: usize, weight: f64, voting_rule: VotingRule) -> Self {
        Self {
            info,
            index,
            weight,
            voting_rule,
        }
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn voting_rule(&self) -> VotingRule {
        self.voting_rule
    }
}

impl Actor for ScalarActor {
    fn name(&self) -> &str {
        &self.info.name
    }

    fn desc(&self) -> &str {
        &self.info.desc
    }

    fn vote(
        &self,
        est: usize,
        i: usize,
        j: usize,
        state: &dyn State,
        _model: &Model,
    ) -> cdmp_core::Result<f64> {
        let u = state.a_util(est)?;
        cdmp_core::vote(
            self.voting_rule,
            self.weight,
            u[(self.index, i)],
            u[(self.index, j)],
        )
    }
}

/// Parameters shared by every state of one run.
#[derive(Debug, Clone)]
pub struct ScalarParams {
    /// Voting weights, one per actor
    pub weights: Vec<f64>,

    /// Equivalence tolerance for positions
    pub pos_tol: f64,

    /// Fraction of the way to the target covered per turn
    pub drift_rate: f64,

    /// Half-width of perception noise on other actors' utilities
    pub util_noise: f64,

    pub reporting: ReportingLevel,
}

/// Utility to an actor at `xi` of an outcome at `xj`.
pub fn scalar_utility(xi: f64, xj: f64) -> f64 {
    1.0 - (xi - xj).abs()
}

/// One turn of the scalar domain.
pub struct ScalarState {
    core: StateCore,
    params: Rc<ScalarParams>,
}

impl ScalarState {
    /// Creates a state holding the given positions.
    pub fn new(model: &Model, params: Rc<ScalarParams>, xs: &[f64]) -> cdmp_core::Result<Self> {
        if params.weights.len() != model.num_act() {
            return Err(ModelError::shape("actor weights", model.num_act(), params.weights.len()));
        }
        let mut s = Self {
            core: StateCore::new(model),
            params,
        };
        for x in xs {
            s.add_pstn(Box::new(VctrPstn::scalar(*x)))?;
        }
        Ok(s)
    }

    /// Fills every cache: utilities, equivalence indices, unique-position probabilities.
    pub fn prepare(&mut self, model: &Model) -> cdmp_core::Result<()> {
        self.set_a_util(Perspective::All, model, self.params.reporting)?;
        self.set_ue_ndx()?;
        self.set_u_prob(model)
    }

    pub fn params(&self) -> &Rc<ScalarParams> {
        &self.params
    }

    fn unique_or_compute(&self) -> cdmp_core::Result<Vec<usize>> {
        if self.u_indices().is_empty() {
            Ok(ue_indices(self.num_act(), |i, j| self.equiv_ndx(i, j))?.0)
        } else {
            Ok(self.u_indices().to_vec())
        }
    }
}

/// Coordinates of every position in a scalar state.
pub fn scalar_positions(s: &dyn State) -> cdmp_core::Result<Vec<f64>> {
    s.pstns()
        .iter()
        .map(|p| {
            p.as_any()
                .downcast_ref::<VctrPstn>()
                .filter(|v| v.dim() == 1)
                .map(|v| v.coords[0])
                .ok_or_else(|| ModelError::Unsupported(format!("{} is not a scalar position", p)))
        })
        .collect()
}

impl State for ScalarState {
    fn core(&self) -> &StateCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut StateCore {
        &mut self.core
    }

    fn p_dist(
        &self,
        persp: Perspective,
        model: &Model,
    ) -> cdmp_core::Result<(DVector<f64>, Vec<usize>)> {
        let xs = scalar_positions(self)?;
        let na = xs.len();
        let unq = self.unique_or_compute()?;
        let nu = unq.len();
        let policy = model.policy();

        let p = match persp {
            Perspective::All => {
                let w = DMatrix::from_row_slice(1, na, &self.params.weights);
                let u = DMatrix::from_fn(na, nu, |i, m| scalar_utility(xs[i], xs[unq[m]]));
                scalar_pce(
                    na,
                    nu,
                    &w,
                    &u,
                    policy.voting_rule,
                    policy.vp_model,
                    policy.pce_model,
                    self.params.reporting,
                )?
            }
            Perspective::Actor(h) => {
                // votes of every actor as h imagines them
                let actors = model.actors();
                let c = coalitions(
                    |k, i, j| actors[k].vote(h, unq[i], unq[j], self, model),
                    na,
                    nu,
                )?;
                prob_ce_from_coalitions(policy.pce_model, policy.vp_model, &c)?.0
            }
        };
        Ok((p, unq))
    }

    fn equiv_ndx(&self, i: usize, j: usize) -> bool {
        match (self.pstn(i), self.pstn(j)) {
            (Some(a), Some(b)) => {
                let a = a.as_any().downcast_ref::<VctrPstn>();
                let b = b.as_any().downcast_ref::<VctrPstn>();
                matches!((a, b), (Some(a), Some(b)) if a.distance(b) < self.params.pos_tol)
            }
            _ => false,
        }
    }

    fn estimate_all_a_util(
        &self,
        model: &Model,
        _rl: ReportingLevel,
    ) -> cdmp_core::Result<Vec<DMatrix<f64>>> {
        let xs = scalar_positions(self)?;
        let na = self.num_act();
        if xs.len() != na {
            return Err(ModelError::shape("positions", na, xs.len()));
        }
        let truth = DMatrix::from_fn(na, na, |i, j| scalar_utility(xs[i], xs[j]));
        let noise = self.params.util_noise;
        if noise <= 0.0 {
            return Ok(vec![truth; na]);
        }

        // each estimator knows its own row exactly and misjudges the others
        let estimates: Vec<DMatrix<f64>> = model.with_rng(|rng| {
            let dist = Uniform::new_inclusive(-noise, noise);
            (0..na)
                .map(|h| {
                    DMatrix::from_fn(na, na, |i, j| {
                        if i == h {
                            truth[(i, j)]
                        } else {
                            (truth[(i, j)] + dist.sample(rng)).clamp(0.0, 1.0)
                        }
                    })
                })
                .collect()
        });
        Ok(estimates)
    }
}

/// Step function of the scalar domain; every successor gets a copy.
#[derive(Debug, Clone)]
pub struct ScalarStep {
    params: Rc<ScalarParams>,
}

impl ScalarStep {
    pub fn new(params: Rc<ScalarParams>) -> Self {
        Self { params }
    }
}

impl StepFn for ScalarStep {
    fn step(&mut self, model: &Model, state: &dyn State) -> cdmp_core::Result<Box<dyn State>> {
        let xs = scalar_positions(state)?;
        let (p, unq) = match state.u_prob() {
            Some(p) => (p.clone(), state.unique_ndx()?),
            None => state.p_dist(Perspective::All, model)?,
        };

        let target = match model.policy().state_trans_mode {
            StateTransMode::Deterministic => {
                unq.iter().zip(p.iter()).map(|(&k, pk)| pk * xs[k]).sum::<f64>()
            }
            StateTransMode::Stochastic => {
                let dist = WeightedIndex::new(p.iter().map(|pk| pk.max(0.0)))
                    .map_err(|e| ModelError::probability("outcome sampling", e.to_string()))?;
                let k = model.with_rng(|rng| dist.sample(rng));
                xs[unq[k]]
            }
        };

        let rate = self.params.drift_rate;
        let next: Vec<f64> = xs.iter().map(|x| x + rate * (target - x)).collect();
        debug!(target, unique = unq.len(), "Scalar step");

        let mut s = ScalarState::new(model, Rc::clone(&self.params), &next)?;
        s.prepare(model)?;
        s.core_mut().step = Some(Box::new(self.clone()));
        Ok(Box::new(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::runner::ScenarioRunner;
    use crate::scenarios::ScenarioId;
    use approx::assert_relative_eq;
    use cdmp_core::PolicyConfig;

    fn three_actor_model(noise: f64) -> (Model, Rc<ScalarParams>) {
        let mut model = Model::new(PolicyConfig::default(), 11);
        for k in 0..3 {
            let info = ActorInfo::new(format!("A{}", k), "test actor").unwrap();
            model.add_actor(Box::new(ScalarActor::new(info, k, 1.0, VotingRule::PropBin)));
        }
        let params = Rc::new(ScalarParams {
            weights: vec![1.0; 3],
            pos_tol: 1e-3,
            drift_rate: 0.5,
            util_noise: noise,
            reporting: ReportingLevel::Silent,
        });
        (model, params)
    }

    #[test]
    fn test_actor_votes_with_its_own_rule() {
        let (mut model, params) = three_actor_model(0.0);
        let info = ActorInfo::new("B", "binary voter").unwrap();
        let binary = ScalarActor::new(info, 0, 2.0, VotingRule::Binary);
        assert_eq!(binary.voting_rule(), VotingRule::Binary);

        let mut s = ScalarState::new(&model, params, &[0.1, 0.15, 0.9]).unwrap();
        s.prepare(&model).unwrap();
        model.add_state(Box::new(s)).unwrap();
        let s = model.latest().unwrap();

        // the model policy says PropBin, the actor still votes binary
        assert_eq!(model.policy().voting_rule, VotingRule::PropBin);
        assert_relative_eq!(binary.vote(0, 1, 2, s, &model).unwrap(), 2.0);
        assert_relative_eq!(binary.vote(0, 2, 1, s, &model).unwrap(), -2.0);
        let prop_bin = model.actor(0).unwrap().vote(0, 1, 2, s, &model).unwrap();
        assert!(prop_bin < 2.0 && prop_bin > 0.0);
    }

    #[test]
    fn test_scalar_utility() {
        assert_relative_eq!(scalar_utility(0.2, 0.2), 1.0);
        assert_relative_eq!(scalar_utility(0.0, 1.0), 0.0);
        assert_relative_eq!(scalar_utility(0.7, 0.4), 0.7);
    }

    #[test]
    fn test_weights_must_match_actors() {
        let (model, _) = three_actor_model(0.0);
        let params = Rc::new(ScalarParams {
            weights: vec![1.0; 2],
            pos_tol: 1e-3,
            drift_rate: 0.5,
            util_noise: 0.0,
            reporting: ReportingLevel::Silent,
        });
        assert!(matches!(
            ScalarState::new(&model, params, &[0.1, 0.2, 0.3]),
            Err(ModelError::Shape { .. })
        ));
    }

    #[test]
    fn test_prepare_majority() {
        let (model, params) = three_actor_model(0.0);
        let mut s = ScalarState::new(&model, params, &[0.1, 0.15, 0.9]).unwrap();
        s.prepare(&model).unwrap();
        assert_eq!(scalar_positions(&s).unwrap(), vec![0.1, 0.15, 0.9]);
        let p = s.u_prob().unwrap();
        assert_relative_eq!(p.sum(), 1.0, epsilon = 1e-6);
        assert!(p[2] < p[0] && p[2] < p[1]);
    }

    #[test]
    fn test_actor_perspective_matches_all_without_noise() {
        let model = ScenarioRunner::new(SimConfig::default())
            .build_model(ScenarioId::ClearMajority)
            .unwrap();
        let s = model.latest().unwrap();
        let (p_all, u_all) = s.p_dist(Perspective::All, &model).unwrap();
        for h in 0..model.num_act() {
            let (p_h, u_h) = s.p_dist(Perspective::Actor(h), &model).unwrap();
            assert_eq!(u_h, u_all);
            for k in 0..p_all.len() {
                assert_relative_eq!(p_h[k], p_all[k], epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn test_noisy_estimates_keep_own_row() {
        let (model, params) = three_actor_model(0.2);
        let s = ScalarState::new(&model, params, &[0.1, 0.5, 0.9]).unwrap();
        let all = s.estimate_all_a_util(&model, ReportingLevel::Silent).unwrap();
        assert_eq!(all.len(), 3);
        for (h, u) in all.iter().enumerate() {
            for j in 0..3 {
                assert_relative_eq!(u[(h, j)], scalar_utility([0.1, 0.5, 0.9][h], [0.1, 0.5, 0.9][j]));
            }
            assert!(u.iter().all(|x| (0.0..=1.0).contains(x)));
        }
        assert_ne!(all[0], all[1]);
    }

    #[test]
    fn test_step_moves_toward_expectation() {
        let (mut model, params) = three_actor_model(0.0);
        let mut s0 = ScalarState::new(&model, Rc::clone(&params), &[0.1, 0.15, 0.9]).unwrap();
        s0.prepare(&model).unwrap();
        model.add_state(Box::new(s0)).unwrap();

        let mut step = ScalarStep::new(params);
        let s1 = step.step(&model, model.latest().unwrap()).unwrap();
        let xs = scalar_positions(s1.as_ref()).unwrap();
        assert!(xs[0] > 0.1 && xs[2] < 0.9);
        assert!(s1.u_prob().is_some());
        assert!(s1.core().step.is_some());
    }
}
