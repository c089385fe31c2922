//! Actors and the third-party influence calculations they share.

use crate::error::{ModelError, Result};
use crate::model::Model;
use crate::policy::{ThirdPartyCommit, VotingRule};
use crate::state::State;
use crate::voting::vote;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Longest actor name accepted (1-5 characters is typical).
pub const MAX_ACT_NAME_LEN: usize = 25;

/// Longest actor description accepted.
pub const MAX_ACT_DESC_LEN: usize = 256;

// pik + pjk must sum to one within this
const THIRD_PARTY_TOL: f64 = 1e-8;

/// A participant in the collective decision.
pub trait Actor: fmt::Debug {
    /// Short name, usually 2-5 characters.
    fn name(&self) -> &str;

    /// A line or two of description.
    fn desc(&self) -> &str;

    /// This actor's vote for position `i` over position `j` in `state`, as
    /// estimated by actor `est`.
    fn vote(&self, est: usize, i: usize, j: usize, state: &dyn State, model: &Model) -> Result<f64>;
}

/// Validated name and description for an actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorInfo {
    pub name: String,
    pub desc: String,
}

impl ActorInfo {
    pub fn new(name: impl Into<String>, desc: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let desc = desc.into();
        check_len("actor name", &name, MAX_ACT_NAME_LEN)?;
        check_len("actor description", &desc, MAX_ACT_DESC_LEN)?;
        Ok(Self { name, desc })
    }
}

fn check_len(what: &'static str, s: &str, max: usize) -> Result<()> {
    let len = s.chars().count();
    if len > max {
        return Err(ModelError::TooLong { what, len, max });
    }
    Ok(())
}

/// How a third party `k` weighs in on a dispute between `i` and `j`.
///
/// `pik` and `pjk` are the chances that `i` (resp. `j`) beats `k`, and must
/// sum to one. `uki`, `ukj` and `ukk` are k's utilities for the three
/// positions. Returns `(vote, u_ik_def_j, u_i_def_jk)`: k's signed vote for
/// "i backed by k" over "j backed by k", and the two synthetic utilities of
/// i's outcomes from which it was derived.
///
/// Utilities of positions unchanged by the dispute cancel in the vote, so
/// every synthetic utility is a sum of three position utilities.
#[allow(clippy::too_many_arguments)]
pub fn third_party_vote_su(
    wk: f64,
    vr: VotingRule,
    comm: ThirdPartyCommit,
    pik: f64,
    pjk: f64,
    uki: f64,
    ukj: f64,
    ukk: f64,
) -> Result<(f64, f64, f64)> {
    if pik < 0.0 || pjk < 0.0 || (pik + pjk - 1.0).abs() >= THIRD_PARTY_TOL {
        return Err(ModelError::probability(
            "third-party vote",
            format!("pik = {}, pjk = {}", pik, pjk),
        ));
    }

    let (u_ik_def_j, u_j_def_ik, u_i_def_jk, u_jk_def_i) = match comm {
        ThirdPartyCommit::FullCommit => (3.0 * uki, 3.0 * ukj, 3.0 * uki, 3.0 * ukj),
        ThirdPartyCommit::SemiCommit => (
            2.0 * uki + ukk,
            3.0 * ukj,
            3.0 * uki,
            2.0 * ukj + ukk,
        ),
        ThirdPartyCommit::NoCommit => (
            2.0 * uki + ukk,
            2.0 * ukj + ukk,
            2.0 * uki + ukk,
            2.0 * ukj + ukk,
        ),
    };

    // ik beats j with probability pik; i beats jk with probability pik
    let u_ik_j = pik * u_ik_def_j + pjk * u_j_def_ik;
    let u_i_jk = pik * u_i_def_jk + pjk * u_jk_def_i;
    let vk = vote(vr, wk, u_ik_j, u_i_jk)?;
    Ok((vk, u_ik_def_j, u_i_def_jk))
}

/// Probability that `i` beats `j` once actor `n` joins whichever side it favors.
///
/// Both primary contributions must be strictly positive.
pub fn vprob_little(
    vr: VotingRule,
    wn: f64,
    uni: f64,
    unj: f64,
    contrib_i: f64,
    contrib_j: f64,
) -> Result<f64> {
    if !(contrib_i > 0.0) || !(contrib_j > 0.0) {
        return Err(ModelError::probability(
            "little conflict",
            format!("contributions must be positive, got ({}, {})", contrib_i, contrib_j),
        ));
    }
    let vn = vote(vr, wn, uni, unj)?;
    let cni = contrib_i + vn.max(0.0);
    let cnj = contrib_j + (-vn).max(0.0);
    Ok(cni / (cni + cnj))
}
