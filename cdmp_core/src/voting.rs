//! Voting primitives: per-actor votes, coalition strengths and victory probabilities.
//!
//! Matrices follow one convention throughout: `u[(i, j)]` is the utility to
//! actor `i` of option `j` (actors are rows), weights form a `1 x numAct`
//! row, and `c[(i, j)]` / `pv[(i, j)]` describe option `i` against option `j`.

use crate::error::{ModelError, Result};
use crate::policy::{VPModel, VotingRule};
use nalgebra::DMatrix;

/// Width of the linear band inside which a binary vote interpolates.
pub const BINARY_VOTE_TOL: f64 = 1e-10;

/// Floor applied to every coalition-strength cell.
pub const MIN_COALITION: f64 = 1e-8;

/// Strength ratio past which the binary victory law treats the result as certain.
pub const BINARY_VP_THRESHOLD: f64 = 1.10;

/// Probability-sum tolerance for pairwise victory probabilities.
pub const VP_TOL: f64 = 1e-8;

// The hybrids deviate from proportional voting by at most 0.2 in both
// families: 0.2 * max|bin - x| = 0.2 and r * max|x^3 - x| = r * 2 / (3 * sqrt 3).
const PROP_BIN_MIX: f64 = 0.2;
const PROP_CUBIC_MIX: f64 = 0.519_615_242_270_663_2; // 0.3 * sqrt(3)

// x-value given to the losing side by the binary victory law
const BINARY_VP_FLOOR: f64 = 1e-6;

/// Signed influence that an actor of weight `w` exerts for option `j` over `k`.
///
/// Positive means support for `j`. Weights must be strictly positive.
pub fn vote(vr: VotingRule, w: f64, u_j: f64, u_k: f64) -> Result<f64> {
    if !(w > 0.0) {
        return Err(ModelError::NonPositiveWeight(w));
    }
    let du = u_j - u_k;

    let r_bin = (du / BINARY_VOTE_TOL).clamp(-1.0, 1.0);
    let r_prop = du;
    let r_cubic = du * du * du;

    let r = match vr {
        VotingRule::Binary => r_bin,
        VotingRule::PropBin => (1.0 - PROP_BIN_MIX) * r_prop + PROP_BIN_MIX * r_bin,
        VotingRule::Proportional => r_prop,
        VotingRule::PropCbc => (1.0 - PROP_CUBIC_MIX) * r_prop + PROP_CUBIC_MIX * r_cubic,
        VotingRule::Cubic => r_cubic,
    };
    Ok(w * r)
}

/// Aggregates signed votes into a square coalition-strength matrix.
///
/// `vfn(k, i, j)` is actor `k`'s vote for option `i` over `j`. For each pair
/// with `j < i`, positive votes accumulate into `c[(i, j)]` and the magnitude
/// of negative votes into `c[(j, i)]`. Every cell starts from
/// [`MIN_COALITION`], and so does the diagonal.
pub fn coalitions<F>(vfn: F, num_act: usize, num_opt: usize) -> Result<DMatrix<f64>>
where
    F: Fn(usize, usize, usize) -> Result<f64>,
{
    let mut c = DMatrix::from_element(num_opt, num_opt, MIN_COALITION);
    for i in 0..num_opt {
        for j in 0..i {
            let mut cij = MIN_COALITION;
            let mut cji = MIN_COALITION;
            for k in 0..num_act {
                let vkij = vfn(k, i, j)?;
                if vkij > 0.0 {
                    cij += vkij;
                } else if vkij < 0.0 {
                    cji -= vkij;
                }
            }
            c[(i, j)] = cij;
            c[(j, i)] = cji;
        }
    }
    Ok(c)
}

/// Converts two non-negative strengths into win probabilities `(p1, p2)`.
pub fn vprob(vpm: VPModel, s1: f64, s2: f64) -> Result<(f64, f64)> {
    vprob_indexed(vpm, s1, s2, 0, 1)
}

fn vprob_indexed(vpm: VPModel, s1: f64, s2: f64, i: usize, j: usize) -> Result<(f64, f64)> {
    let valid = s1.is_finite() && s2.is_finite() && s1 >= 0.0 && s2 >= 0.0 && (s1 > 0.0 || s2 > 0.0);
    if !valid {
        return Err(ModelError::InvalidStrength { i, j, s1, s2 });
    }

    let (x1, x2) = match vpm {
        VPModel::Linear => (s1, s2),
        VPModel::Square => (s1.powi(2), s2.powi(2)),
        VPModel::Quartic => (s1.powi(4), s2.powi(4)),
        VPModel::Octic => (s1.powi(8), s2.powi(8)),
        VPModel::Binary => {
            let t = BINARY_VP_THRESHOLD;
            if s1 >= t * s2 {
                (1.0, BINARY_VP_FLOOR)
            } else if s2 >= t * s1 {
                (BINARY_VP_FLOOR, 1.0)
            } else {
                // Linear in r12 = s1/(s1+s2): p12 = 1 at s1/s2 = t, 0 at s2/s1 = t,
                // and exactly 1/2 when the strengths tie.
                let half_gap = (s1 - s2) / (2.0 * (s1 + s2));
                let p12 = (0.5 + half_gap * (t + 1.0) / (t - 1.0)).clamp(0.0, 1.0);
                (p12, 1.0 - p12)
            }
        }
    };

    let sum = x1 + x2;
    if !(sum > 0.0) || !sum.is_finite() {
        // e.g. tiny strengths underflowing under the octic law
        return Err(ModelError::InvalidStrength { i, j, s1, s2 });
    }
    let p1 = x1 / sum;
    let p2 = x2 / sum;
    if (p1 + p2 - 1.0).abs() >= VP_TOL {
        return Err(ModelError::Inconsistent {
            what: "vprob",
            detail: format!("p1 + p2 = {}", p1 + p2),
        });
    }
    Ok((p1, p2))
}

/// Computes `pv[(i, j)] = P[option i defeats option j]` from coalition strengths.
///
/// The result satisfies `pv[(i, j)] + pv[(j, i)] = 1` with 1/2 on the diagonal.
pub fn vprob_matrix(vpm: VPModel, c: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    let num_opt = c.nrows();
    if num_opt != c.ncols() {
        return Err(ModelError::shape(
            "coalition matrix",
            "square",
            format!("{}x{}", c.nrows(), c.ncols()),
        ));
    }
    let mut p = DMatrix::zeros(num_opt, num_opt);
    for i in 0..num_opt {
        for j in 0..i {
            let (pij, pji) = vprob_indexed(vpm, c[(i, j)], c[(j, i)], i, j)?;
            p[(i, j)] = pij;
            p[(j, i)] = pji;
        }
        p[(i, i)] = 0.5;
    }
    Ok(p)
}

/// Checks that `w` is a `1 x num_act` row of weights.
pub(crate) fn check_weights(w: &DMatrix<f64>, num_act: usize) -> Result<()> {
    if w.nrows() != 1 || w.ncols() != num_act {
        return Err(ModelError::shape(
            "weight row-vector",
            format!("1x{}", num_act),
            format!("{}x{}", w.nrows(), w.ncols()),
        ));
    }
    Ok(())
}

/// Simple voting over options: votes from `w` and `u`, then coalitions, then `pv`.
///
/// `w` is a `1 x numAct` row and `u` is `numAct x numOpt`.
pub fn vprob_voting(
    vr: VotingRule,
    vpm: VPModel,
    w: &DMatrix<f64>,
    u: &DMatrix<f64>,
) -> Result<DMatrix<f64>> {
    let num_act = u.nrows();
    let num_opt = u.ncols();
    check_weights(w, num_act)?;

    let c = coalitions(|k, i, j| vote(vr, w[(0, k)], u[(k, i)], u[(k, j)]), num_act, num_opt)?;
    vprob_matrix(vpm, &c)
}
