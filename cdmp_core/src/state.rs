//! States: the positions held at one turn plus the caches derived from them.
//!
//! A concrete domain embeds a [`StateCore`] in its own state type and
//! implements the four required hooks of [`State`]. Everything else
//! (caching, equivalence indexing, turn lookup) is provided.
//!
//! Lifecycle: constructed → populated (`add_pstn`) → utility-computed
//! (`set_a_util`) → indexed (`set_ue_ndx`) → queried (`p_dist`, `pos_prob`)
//! → succeeded via its step function, or dropped. The caches are
//! write-once; recomputing one without `clear()` is an error.

use crate::error::{ModelError, Result};
use crate::model::{Model, ModelId, StepFn, MAX_NUM_ACTOR, MIN_NUM_ACTOR};
use crate::policy::ReportingLevel;
use crate::position::Position;
use nalgebra::{DMatrix, DVector};
use rand_distr::{Distribution, Uniform};
use std::fmt;

/// Whose estimate of the world a computation uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Perspective {
    /// Every actor's perspective at once
    All,
    /// A single actor's perspective
    Actor(usize),
}

/// Data shared by every concrete state.
pub struct StateCore {
    model_id: ModelId,
    num_act: usize,
    pstns: Vec<Box<dyn Position>>,
    /// `a_util[h][(i, j)]`: actor h's estimate of the utility to i of j's position
    a_util: Vec<Option<DMatrix<f64>>>,
    u_indices: Vec<usize>,
    e_indices: Vec<usize>,
    u_prob: Option<DVector<f64>>,
    /// Produces the successor state
    pub step: Option<Box<dyn StepFn>>,
}

impl StateCore {
    /// Creates an empty core bound to `model`, with room for one position per actor.
    pub fn new(model: &Model) -> Self {
        let num_act = model.num_act();
        Self {
            model_id: model.id(),
            num_act,
            pstns: Vec::with_capacity(num_act),
            a_util: vec![None; num_act],
            u_indices: Vec::new(),
            e_indices: Vec::new(),
            u_prob: None,
            step: None,
        }
    }

    /// Sets the step function, builder style.
    pub fn with_step(mut self, step: impl StepFn + 'static) -> Self {
        self.step = Some(Box::new(step));
        self
    }
}

impl fmt::Debug for StateCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateCore")
            .field("model_id", &self.model_id)
            .field("num_act", &self.num_act)
            .field("pstns", &self.pstns)
            .field("u_indices", &self.u_indices)
            .field("e_indices", &self.e_indices)
            .field("has_step", &self.step.is_some())
            .finish()
    }
}

/// Computes `(u_indices, e_indices)` for `n` actors under an equivalence test.
///
/// `e[i]` is the lowest `j <= i` whose position is equivalent to `i`'s, and
/// `u` lists the `i` with `e[i] == i`, i.e. the first holder of each
/// distinct position.
pub fn ue_indices<F>(n: usize, equiv: F) -> Result<(Vec<usize>, Vec<usize>)>
where
    F: Fn(usize, usize) -> bool,
{
    let mut e = Vec::with_capacity(n);
    for i in 0..n {
        let ei = (0..=i)
            .find(|&j| equiv(i, j))
            .ok_or(ModelError::MissingEquivalence { actor: i })?;
        e.push(ei);
    }
    let u = (0..n).filter(|&i| e[i] == i).collect();
    Ok((u, e))
}

/// A snapshot of the world at one turn.
pub trait State {
    /// Shared state data.
    fn core(&self) -> &StateCore;

    /// Mutable shared state data.
    fn core_mut(&mut self) -> &mut StateCore;

    /// Probability distribution over unique positions, with the indices of
    /// the actors holding them.
    fn p_dist(&self, persp: Perspective, model: &Model) -> Result<(DVector<f64>, Vec<usize>)>;

    /// Whether the positions of actors `i` and `j` count as the same.
    fn equiv_ndx(&self, i: usize, j: usize) -> bool;

    /// Every actor's estimate of the utility matrix, indexed by estimator.
    fn estimate_all_a_util(&self, model: &Model, rl: ReportingLevel) -> Result<Vec<DMatrix<f64>>>;

    /// Actor `h`'s estimate of the utility matrix.
    fn estimate_a_util(&self, h: usize, model: &Model, rl: ReportingLevel) -> Result<DMatrix<f64>> {
        let mut all = self.estimate_all_a_util(model, rl)?;
        if h >= all.len() {
            return Err(ModelError::PerspectiveOutOfRange {
                perspective: h,
                num_act: all.len(),
            });
        }
        Ok(all.swap_remove(h))
    }

    fn model_id(&self) -> ModelId {
        self.core().model_id
    }

    fn num_act(&self) -> usize {
        self.core().num_act
    }

    /// Appends a position, returning its actor index.
    fn add_pstn(&mut self, p: Box<dyn Position>) -> Result<usize> {
        let core = self.core_mut();
        if core.pstns.len() >= core.num_act {
            return Err(ModelError::PositionsFull {
                num_act: core.num_act,
            });
        }
        core.pstns.push(p);
        Ok(core.pstns.len() - 1)
    }

    fn pstn(&self, i: usize) -> Option<&dyn Position> {
        self.core().pstns.get(i).map(|p| p.as_ref())
    }

    fn pstns(&self) -> &[Box<dyn Position>] {
        &self.core().pstns
    }

    /// Drops every position, every derived cache and the step function.
    fn clear(&mut self) {
        let core = self.core_mut();
        core.pstns.clear();
        core.step = None;
        core.a_util.iter_mut().for_each(|h| *h = None);
        core.u_indices.clear();
        core.e_indices.clear();
        core.u_prob = None;
    }

    /// Computes and caches utility estimates from one or all perspectives.
    fn set_a_util(&mut self, persp: Perspective, model: &Model, rl: ReportingLevel) -> Result<()> {
        let na = self.num_act();
        match persp {
            Perspective::All => {
                if self.core().a_util.iter().any(|h| h.is_some()) {
                    return Err(ModelError::already("utility estimates"));
                }
                let all = self.estimate_all_a_util(model, rl)?;
                if all.len() != na {
                    return Err(ModelError::shape("utility estimates", na, all.len()));
                }
                for u in &all {
                    check_square(u, na)?;
                }
                self.core_mut().a_util = all.into_iter().map(Some).collect();
            }
            Perspective::Actor(h) => {
                if h >= na {
                    return Err(ModelError::PerspectiveOutOfRange {
                        perspective: h,
                        num_act: na,
                    });
                }
                if self.core().a_util[h].is_some() {
                    return Err(ModelError::already(format!("utility estimate of actor {}", h)));
                }
                let u = self.estimate_a_util(h, model, rl)?;
                check_square(&u, na)?;
                self.core_mut().a_util[h] = Some(u);
            }
        }
        Ok(())
    }

    /// Actor `h`'s cached utility estimate.
    fn a_util(&self, h: usize) -> Result<&DMatrix<f64>> {
        let core = self.core();
        match core.a_util.get(h) {
            Some(Some(u)) => Ok(u),
            Some(None) => Err(ModelError::NotComputed {
                what: "utility estimate",
            }),
            None => Err(ModelError::PerspectiveOutOfRange {
                perspective: h,
                num_act: core.num_act,
            }),
        }
    }

    /// Computes the unique/equivalent position indices.
    fn set_ue_ndx(&mut self) -> Result<()> {
        let na = self.num_act();
        if !(MIN_NUM_ACTOR..=MAX_NUM_ACTOR).contains(&na) {
            return Err(ModelError::ActorCount {
                count: na,
                min: MIN_NUM_ACTOR,
                max: MAX_NUM_ACTOR,
            });
        }
        if !self.core().u_indices.is_empty() || !self.core().e_indices.is_empty() {
            return Err(ModelError::already("unique/equivalent indices"));
        }
        let (u, e) = ue_indices(na, |i, j| self.equiv_ndx(i, j))?;
        let core = self.core_mut();
        core.u_indices = u;
        core.e_indices = e;
        Ok(())
    }

    fn u_indices(&self) -> &[usize] {
        &self.core().u_indices
    }

    fn e_indices(&self) -> &[usize] {
        &self.core().e_indices
    }

    /// Indices of the actors holding distinct positions.
    fn unique_ndx(&self) -> Result<Vec<usize>> {
        let u = &self.core().u_indices;
        if u.is_empty() {
            return Err(ModelError::NotComputed {
                what: "unique indices",
            });
        }
        Ok(u.clone())
    }

    /// Probability of the unique position that actor `i`'s position maps to.
    fn pos_prob(&self, i: usize, unq: &[usize], pdt: &DVector<f64>) -> Result<f64> {
        if unq.len() != pdt.len() {
            return Err(ModelError::shape(
                "unique position probabilities",
                format!("{}x1", unq.len()),
                format!("{}x1", pdt.len()),
            ));
        }
        let ei = *self
            .core()
            .e_indices
            .get(i)
            .ok_or(ModelError::MissingEquivalence { actor: i })?;
        let k = unq
            .iter()
            .position(|&u| u == ei)
            .ok_or(ModelError::MissingEquivalence { actor: i })?;
        Ok(pdt[k])
    }

    /// Caches the all-perspective distribution over unique positions.
    fn set_u_prob(&mut self, model: &Model) -> Result<()> {
        if self.core().u_prob.is_some() {
            return Err(ModelError::already("unique position probabilities"));
        }
        let (p, _) = self.p_dist(Perspective::All, model)?;
        self.core_mut().u_prob = Some(p);
        Ok(())
    }

    fn u_prob(&self) -> Option<&DVector<f64>> {
        self.core().u_prob.as_ref()
    }

    /// Index of this state in its model's history.
    fn my_turn(&self, model: &Model) -> Result<usize> {
        let me = self.core() as *const StateCore;
        model
            .history()
            .iter()
            .position(|s| std::ptr::eq(s.core(), me))
            .ok_or(ModelError::StateNotInHistory)
    }

    /// Fills every perspective with a shared random base matrix, uniform in
    /// `[min_u, max_u]`, plus per-perspective noise uniform in `[-noise, noise]`.
    fn randomize_utils(&mut self, model: &Model, min_u: f64, max_u: f64, noise: f64) -> Result<()> {
        if !(min_u < max_u) || !(noise >= 0.0) {
            return Err(ModelError::Unsupported(format!(
                "random utilities need min < max and noise >= 0, got [{}, {}] +/- {}",
                min_u, max_u, noise
            )));
        }
        let na = self.num_act();
        let a_util: Vec<Option<DMatrix<f64>>> = model.with_rng(|rng| {
            let base_dist = Uniform::new_inclusive(min_u, max_u);
            let base = DMatrix::from_fn(na, na, |_, _| base_dist.sample(rng));
            if noise > 0.0 {
                let noise_dist = Uniform::new_inclusive(-noise, noise);
                (0..na)
                    .map(|_| &base + DMatrix::from_fn(na, na, |_, _| noise_dist.sample(rng)))
                    .map(Some)
                    .collect()
            } else {
                vec![Some(base); na]
            }
        });
        self.core_mut().a_util = a_util;
        Ok(())
    }
}

fn check_square(u: &DMatrix<f64>, na: usize) -> Result<()> {
    if u.nrows() != na || u.ncols() != na {
        return Err(ModelError::shape(
            "utility estimate",
            format!("{}x{}", na, na),
            format!("{}x{}", u.nrows(), u.ncols()),
        ));
    }
    Ok(())
}
