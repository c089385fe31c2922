//! A minimal one-dimensional domain used by the unit tests.

use crate::actor::{Actor, ActorInfo};
use crate::error::{ModelError, Result};
use crate::model::{Model, StepFn};
use crate::pce::scalar_pce;
use crate::policy::{PolicyConfig, ReportingLevel};
use crate::position::VctrPstn;
use crate::state::{ue_indices, Perspective, State, StateCore};
use crate::voting::vote;
use nalgebra::{DMatrix, DVector};

#[derive(Debug)]
pub(crate) struct LineActor {
    info: ActorInfo,
    index: usize,
    weight: f64,
}

impl Actor for LineActor {
    fn name(&self) -> &str {
        &self.info.name
    }

    fn desc(&self) -> &str {
        &self.info.desc
    }

    fn vote(&self, est: usize, i: usize, j: usize, state: &dyn State, model: &Model) -> Result<f64> {
        let u = match state.a_util(est) {
            Ok(u) => u.clone(),
            Err(_) => state.estimate_a_util(est, model, ReportingLevel::Silent)?,
        };
        vote(
            model.policy().voting_rule,
            self.weight,
            u[(self.index, i)],
            u[(self.index, j)],
        )
    }
}

pub(crate) fn with_line_actors(mut model: Model, n: usize) -> Model {
    for index in 0..n {
        let info = ActorInfo::new(format!("A{}", index), "line actor").unwrap();
        model.add_actor(Box::new(LineActor {
            info,
            index,
            weight: 1.0,
        }));
    }
    model
}

pub(crate) fn line_model(n: usize) -> Model {
    with_line_actors(Model::new(PolicyConfig::default(), 17), n)
}

pub(crate) struct LineState {
    core: StateCore,
}

impl LineState {
    pub(crate) fn new(model: &Model, xs: &[f64]) -> Result<Self> {
        let mut s = Self {
            core: StateCore::new(model),
        };
        for x in xs {
            s.add_pstn(Box::new(VctrPstn::scalar(*x)))?;
        }
        Ok(s)
    }

    pub(crate) fn with_step(mut self, step: impl StepFn + 'static) -> Self {
        self.core.step = Some(Box::new(step));
        self
    }
}

fn xs_of(s: &dyn State) -> Result<Vec<f64>> {
    s.pstns()
        .iter()
        .map(|p| {
            p.as_any()
                .downcast_ref::<VctrPstn>()
                .map(|v| v.coords[0])
                .ok_or_else(|| ModelError::Unsupported("not a line position".to_string()))
        })
        .collect()
}

fn line_utils(xs: &[f64], cols: &[usize]) -> DMatrix<f64> {
    DMatrix::from_fn(xs.len(), cols.len(), |i, m| 1.0 - (xs[i] - xs[cols[m]]).abs())
}

impl State for LineState {
    fn core(&self) -> &StateCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut StateCore {
        &mut self.core
    }

    fn p_dist(&self, persp: Perspective, model: &Model) -> Result<(DVector<f64>, Vec<usize>)> {
        let xs = xs_of(self)?;
        let na = xs.len();
        let unq = if self.u_indices().is_empty() {
            ue_indices(na, |i, j| self.equiv_ndx(i, j))?.0
        } else {
            self.u_indices().to_vec()
        };
        let u = match persp {
            Perspective::All => line_utils(&xs, &unq),
            Perspective::Actor(h) => {
                let full = self.a_util(h)?;
                DMatrix::from_fn(na, unq.len(), |i, m| full[(i, unq[m])])
            }
        };
        let w = DMatrix::from_element(1, na, 1.0);
        let policy = model.policy();
        let p = scalar_pce(
            na,
            unq.len(),
            &w,
            &u,
            policy.voting_rule,
            policy.vp_model,
            policy.pce_model,
            ReportingLevel::Silent,
        )?;
        Ok((p, unq))
    }

    fn equiv_ndx(&self, i: usize, j: usize) -> bool {
        match xs_of(self) {
            Ok(xs) => (xs[i] - xs[j]).abs() < 1e-6,
            Err(_) => false,
        }
    }

    fn estimate_all_a_util(&self, _model: &Model, _rl: ReportingLevel) -> Result<Vec<DMatrix<f64>>> {
        let xs = xs_of(self)?;
        if xs.len() != self.num_act() {
            return Err(ModelError::shape("positions", self.num_act(), xs.len()));
        }
        let all: Vec<usize> = (0..xs.len()).collect();
        Ok(vec![line_utils(&xs, &all); xs.len()])
    }
}

/// Every actor moves halfway toward the mean position.
pub(crate) fn line_step(model: &Model, s: &dyn State) -> Result<Box<dyn State>> {
    let xs = xs_of(s)?;
    let mean = xs.iter().sum::<f64>() / xs.len() as f64;
    let next: Vec<f64> = xs.iter().map(|x| (x + mean) / 2.0).collect();
    Ok(Box::new(LineState::new(model, &next)?.with_step(line_step)))
}

#[test]
fn test_line_actor_vote() {
    let model = line_model(3);
    let s = LineState::new(&model, &[0.0, 0.4, 1.0]).unwrap();
    // actor 0 prefers position 1 (u = 0.6) over position 2 (u = 0.0)
    let v = model.actor(0).unwrap().vote(0, 1, 2, &s, &model).unwrap();
    assert!(v > 0.0);
    let back = model.actor(0).unwrap().vote(0, 2, 1, &s, &model).unwrap();
    assert!((v + back).abs() < 1e-12);
}
