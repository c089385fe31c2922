//! Risk-attitude helpers.
//!
//! Actors that are likely to win are assumed to be risk averse, and likely
//! losers risk seeking. These helpers turn a probability vector into such
//! attitudes and blend one actor's attitude into another's estimate.

use crate::error::{ModelError, Result};
use crate::policy::{BigRAdjust, BigRRange};
use nalgebra::DVector;

const PROB_SUM_TOL: f64 = 1e-8;

/// Rescales win probabilities into risk attitudes.
///
/// - `Min`: `(p - pMin) / (pMax - pMin)`, range `[0, 1]`
/// - `Mid`: `(3p - (pMax + 2 pMin)) / (2 (pMax - pMin))`, range `[-1/2, 1]`
/// - `Max`: `(2p - (pMax + pMin)) / (pMax - pMin)`, range `[-1, 1]`
pub fn big_r_from_prob(p: &DVector<f64>, rr: BigRRange) -> Result<DVector<f64>> {
    if p.is_empty() {
        return Err(ModelError::shape("probability vector", "non-empty", "0x1"));
    }
    if let Some(bad) = p.iter().find(|x| !(**x >= 0.0)) {
        return Err(ModelError::probability("risk attitude", format!("negative entry {}", bad)));
    }
    let total = p.sum();
    if (total - 1.0).abs() >= PROB_SUM_TOL {
        return Err(ModelError::probability("risk attitude", format!("sum = {}", total)));
    }
    let p_min = p.min();
    let p_max = p.max();
    let span = p_max - p_min;
    if !(span > 0.0) {
        return Err(ModelError::probability(
            "risk attitude",
            "all probabilities equal; attitudes are undefined",
        ));
    }

    let r = match rr {
        BigRRange::Min => p.map(|x| (x - p_min) / span),
        BigRRange::Mid => p.map(|x| (3.0 * x - (p_max + 2.0 * p_min)) / (2.0 * span)),
        BigRRange::Max => p.map(|x| (2.0 * x - (p_max + p_min)) / span),
    };
    Ok(r)
}

/// Actor h's estimate of actor i's risk attitude.
pub fn est_nra(rh: f64, ri: f64, ra: BigRAdjust) -> f64 {
    match ra {
        BigRAdjust::NoRA => rh,
        BigRAdjust::OneThirdRA => (2.0 * rh + ri) / 3.0,
        BigRAdjust::HalfRA => (rh + ri) / 2.0,
        BigRAdjust::TwoThirdsRA => (rh + 2.0 * ri) / 3.0,
        BigRAdjust::FullRA => ri,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_big_r_ranges() {
        let p = DVector::from_vec(vec![0.1, 0.3, 0.6]);

        let r = big_r_from_prob(&p, BigRRange::Min).unwrap();
        assert_relative_eq!(r[0], 0.0, epsilon = 1e-12);
        assert_relative_eq!(r[1], 0.4, epsilon = 1e-12);
        assert_relative_eq!(r[2], 1.0, epsilon = 1e-12);

        let r = big_r_from_prob(&p, BigRRange::Mid).unwrap();
        assert_relative_eq!(r[0], -0.5, epsilon = 1e-12);
        assert_relative_eq!(r[2], 1.0, epsilon = 1e-12);

        let r = big_r_from_prob(&p, BigRRange::Max).unwrap();
        assert_relative_eq!(r[0], -1.0, epsilon = 1e-12);
        assert_relative_eq!(r[2], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_big_r_rejects_bad_input() {
        let unnormalized = DVector::from_vec(vec![0.2, 0.3]);
        assert!(big_r_from_prob(&unnormalized, BigRRange::Min).is_err());

        let negative = DVector::from_vec(vec![-0.2, 1.2]);
        assert!(big_r_from_prob(&negative, BigRRange::Min).is_err());

        let flat = DVector::from_element(4, 0.25);
        assert!(big_r_from_prob(&flat, BigRRange::Max).is_err());
    }

    #[test]
    fn test_est_nra() {
        assert_relative_eq!(est_nra(0.9, 0.0, BigRAdjust::NoRA), 0.9);
        assert_relative_eq!(est_nra(0.9, 0.0, BigRAdjust::OneThirdRA), 0.6, epsilon = 1e-12);
        assert_relative_eq!(est_nra(0.9, 0.0, BigRAdjust::HalfRA), 0.45, epsilon = 1e-12);
        assert_relative_eq!(est_nra(0.9, 0.0, BigRAdjust::TwoThirdsRA), 0.3, epsilon = 1e-12);
        assert_relative_eq!(est_nra(0.9, 0.0, BigRAdjust::FullRA), 0.0);
    }
}
