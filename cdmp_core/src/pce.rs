//! Probabilistic Condorcet Election (PCE) resolution.
//!
//! A PCE turns a square matrix of pairwise victory probabilities
//! `pv[(i, j)] = P[i defeats j]` into a column of per-option win
//! probabilities. Three resolutions are available, selected explicitly by
//! [`PCEModel`]:
//!
//! - **Conditional**: probability that `i` beats every alternative, renormalized.
//! - **MarkovUniform**: fixed point of a challenge process where every option
//!   is equally likely to challenge the incumbent.
//! - **MarkovIncentive**: as above, but challenges arise in proportion to the
//!   coalition incentive behind them (needs coalition strengths).

use crate::error::{ModelError, Result};
use crate::policy::{PCEModel, ReportingLevel, VPModel, VotingRule};
use crate::voting::{check_weights, coalitions, vote, vprob_matrix, vprob_voting};
use nalgebra::{DMatrix, DVector};
use tracing::debug;

/// Convergence and normalization tolerance for PCE resolution.
pub const PCE_TOL: f64 = 1e-6;

/// Hard cap on Markov iterations; 10-30 is typical.
pub const MAX_PCE_ITER: usize = 1000;

// Incentive added on the diagonal so that every column has a challenger.
const EPS_SUPPORT: f64 = 1e-10;

// Agreement required between the two scalar PCE computation paths.
const CROSS_CHECK_TOL: f64 = 1e-8;

// Matrices larger than this are not dumped to the log.
const MAX_LOGGED_DIM: usize = 20;

/// Validates the pairwise-symmetry invariant of a victory matrix.
pub fn check_victory_matrix(pv: &DMatrix<f64>) -> Result<()> {
    let n = pv.nrows();
    if n == 0 || n != pv.ncols() {
        return Err(ModelError::shape(
            "victory matrix",
            "non-empty square",
            format!("{}x{}", pv.nrows(), pv.ncols()),
        ));
    }
    for i in 0..n {
        for j in 0..n {
            let pij = pv[(i, j)];
            if !(pij >= 0.0) {
                return Err(ModelError::probability(
                    "victory matrix",
                    format!("pv({}, {}) = {}", i, j, pij),
                ));
            }
            let pair = pij + pv[(j, i)];
            if (pair - 1.0).abs() >= PCE_TOL {
                return Err(ModelError::probability(
                    "victory matrix",
                    format!("pv({i}, {j}) + pv({j}, {i}) = {pair}"),
                ));
            }
        }
    }
    Ok(())
}

fn check_normalized(what: &'static str, p: &DVector<f64>) -> Result<()> {
    let total = p.sum();
    if (total - 1.0).abs() >= PCE_TOL {
        return Err(ModelError::probability(what, format!("sum = {}", total)));
    }
    Ok(())
}

/// One-step conditional PCE.
///
/// `p(i)` is proportional to `prod_j pv(i, j)`, conditioned on exactly one
/// option beating all others.
pub fn cond_pce(pv: &DMatrix<f64>) -> Result<DVector<f64>> {
    check_victory_matrix(pv)?;
    let n = pv.nrows();
    let raw = DVector::from_fn(n, |i, _| pv.row(i).iter().product::<f64>());
    let prob_one = raw.sum();
    if !(prob_one > 0.0) {
        return Err(ModelError::probability(
            "conditional PCE",
            "no option has a positive chance of beating all others",
        ));
    }
    let p = raw / prob_one;
    check_normalized("conditional PCE", &p)?;
    Ok(p)
}

/// Markov PCE with uniformly random challenges.
///
/// Starts from the uniform distribution and iterates
/// `q(i) = (1/n) * sum_j pv(i, j) * (p(i) + p(j))` until the largest change
/// drops below [`PCE_TOL`]. Exceeding [`MAX_PCE_ITER`] is an error; no
/// partial result is returned.
pub fn markov_pce(pv: &DMatrix<f64>) -> Result<DVector<f64>> {
    markov_pce_with_cap(pv, MAX_PCE_ITER)
}

fn markov_pce_with_cap(pv: &DMatrix<f64>, cap: usize) -> Result<DVector<f64>> {
    check_victory_matrix(pv)?;
    let n = pv.nrows();
    let nf = n as f64;
    let mut p = DVector::from_element(n, 1.0 / nf);
    let mut change = 1.0;
    let mut iter = 0;

    while PCE_TOL < change {
        if iter >= cap {
            return Err(ModelError::NonConvergence {
                iterations: iter,
                change,
            });
        }
        let q = DVector::from_fn(n, |i, _| {
            (0..n).map(|j| pv[(i, j)] * (p[i] + p[j])).sum::<f64>() / nf
        });
        change = (&q - &p).amax();
        // averaging with the previous iterate damps oscillation without moving the fixed point
        p = (&p + &q) / 2.0;
        iter += 1;
        check_normalized("Markov PCE", &p)?;
    }

    debug!(iterations = iter, options = n, "Markov PCE converged");
    Ok(p)
}

/// Markov PCE whose challenges follow coalition incentives.
///
/// The incentive for `i` to challenge `j` is `c(i, j) * pv(i, j)`; the
/// probability that `i` is the challenger of incumbent `j` is that incentive
/// normalized over all challengers of `j`.
pub fn markov_incentive_pce(c: &DMatrix<f64>, vpm: VPModel) -> Result<DVector<f64>> {
    markov_incentive_pce_with_cap(c, vpm, MAX_PCE_ITER)
}

fn markov_incentive_pce_with_cap(
    c: &DMatrix<f64>,
    vpm: VPModel,
    cap: usize,
) -> Result<DVector<f64>> {
    let n = c.nrows();
    let pv = vprob_matrix(vpm, c)?;
    check_victory_matrix(&pv)?;

    let incentive = DMatrix::from_fn(n, n, |i, j| {
        let inc = c[(i, j)] * pv[(i, j)];
        if i == j {
            inc + EPS_SUPPORT
        } else {
            inc
        }
    });
    let column_totals: Vec<f64> = (0..n).map(|j| incentive.column(j).sum()).collect();
    let challenge = DMatrix::from_fn(n, n, |i, j| incentive[(i, j)] / column_totals[j]);

    let mut p = DVector::from_element(n, 1.0 / n as f64);
    let mut change = 1.0;
    let mut iter = 0;

    while PCE_TOL < change {
        if iter >= cap {
            return Err(ModelError::NonConvergence {
                iterations: iter,
                change,
            });
        }
        // ct(i, j): i is the incumbent and j challenges it
        let ct = DMatrix::from_fn(n, n, |i, j| p[i] * challenge[(j, i)]);
        let q = DVector::from_fn(n, |i, _| {
            (0..n).map(|j| pv[(i, j)] * (ct[(i, j)] + ct[(j, i)])).sum::<f64>()
        });
        change = (&q - &p).amax();
        p = (&p + &q) / 2.0;
        iter += 1;
        check_normalized("Markov incentive PCE", &p)?;
    }

    debug!(iterations = iter, options = n, "Markov incentive PCE converged");
    Ok(p)
}

/// Resolves a victory matrix into option probabilities under `pcm`.
///
/// The incentive model needs coalition strengths rather than `pv`; use
/// [`prob_ce_from_coalitions`] for it.
pub fn prob_ce(pcm: PCEModel, pv: &DMatrix<f64>) -> Result<DVector<f64>> {
    check_victory_matrix(pv)?;
    match pcm {
        PCEModel::Conditional => cond_pce(pv),
        PCEModel::MarkovUniform => markov_pce(pv),
        PCEModel::MarkovIncentive => Err(ModelError::Unsupported(
            "MarkovIncentive PCE needs coalition strengths".to_string(),
        )),
    }
}

/// Resolves coalition strengths into `(option probabilities, victory matrix)`.
pub fn prob_ce_from_coalitions(
    pcm: PCEModel,
    vpm: VPModel,
    c: &DMatrix<f64>,
) -> Result<(DVector<f64>, DMatrix<f64>)> {
    let pv = vprob_matrix(vpm, c)?;
    check_victory_matrix(&pv)?;
    let p = match pcm {
        PCEModel::Conditional => cond_pce(&pv)?,
        PCEModel::MarkovUniform => markov_pce(&pv)?,
        PCEModel::MarkovIncentive => markov_incentive_pce(c, vpm)?,
    };
    Ok((p, pv))
}

/// End-to-end PCE for actors with scalar capabilities.
///
/// `w` is a `1 x num_act` row of strengths and `u` is `num_act x num_opt`.
/// Above `ReportingLevel::Low` the intermediate matrices are logged; from
/// `ReportingLevel::High` the victory matrix is recomputed through
/// [`vprob_voting`] and the two paths must agree.
#[allow(clippy::too_many_arguments)]
pub fn scalar_pce(
    num_act: usize,
    num_opt: usize,
    w: &DMatrix<f64>,
    u: &DMatrix<f64>,
    vr: VotingRule,
    vpm: VPModel,
    pcm: PCEModel,
    rl: ReportingLevel,
) -> Result<DVector<f64>> {
    check_weights(w, num_act)?;
    if u.nrows() != num_act || u.ncols() != num_opt {
        return Err(ModelError::shape(
            "utility matrix",
            format!("{}x{}", num_act, num_opt),
            format!("{}x{}", u.nrows(), u.ncols()),
        ));
    }

    let c = coalitions(|k, i, j| vote(vr, w[(0, k)], u[(k, i)], u[(k, j)]), num_act, num_opt)?;
    let (p, pv) = prob_ce_from_coalitions(pcm, vpm, &c)?;

    if rl > ReportingLevel::Low {
        debug!(num_act, num_opt, %vr, %vpm, %pcm, "Scalar PCE");
        if num_act <= MAX_LOGGED_DIM && num_opt <= MAX_LOGGED_DIM {
            debug!("Actor strengths: {}", w);
            debug!("Utility to actors of options: {}", u);
            debug!("Coalition strengths of (i:j): {}", c);
            debug!("Probability Opt_i > Opt_j: {}", pv);
            debug!("Probability Opt_i: {}", p);
        }
    }

    if rl >= ReportingLevel::High {
        let pv2 = vprob_voting(vr, vpm, w, u)?;
        let diff = (&pv - &pv2).amax();
        if diff >= CROSS_CHECK_TOL {
            return Err(ModelError::Inconsistent {
                what: "scalar PCE",
                detail: format!("victory matrices differ by {:.3e}", diff),
            });
        }
    }

    Ok(p)
}
