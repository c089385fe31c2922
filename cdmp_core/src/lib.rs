//! CDMP Core - collective decision-making primitives
//!
//! This crate provides the domain-independent machinery for modeling a group
//! of actors who bargain over positions, turn by turn:
//!
//! - **Voting**: per-actor votes, coalition strengths and victory probabilities
//! - **PCE**: probabilistic Condorcet elections over a set of options
//! - **Framework**: the [`Actor`], [`Position`] and [`State`] traits and the
//!   [`Model`] that owns them and drives the turn loop
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                        Model                          │
//! │   actors: Vec<Box<dyn Actor>>    policy, seed, rng    │
//! │   history: Vec<Box<dyn State>>   stop condition       │
//! │                                                       │
//! │   State t ──step──► State t+1 ──step──► ...           │
//! │     │                                                 │
//! │     ├─ positions (Box<dyn Position>)                  │
//! │     └─ caches: aUtil, uIndices/eIndices, uProb        │
//! └──────────────────────────────────────────────────────┘
//!          │ utilities                  ▲ probabilities
//!          ▼                            │
//!   vote ─► coalitions ─► vprob_matrix ─► prob_ce
//! ```
//!
//! # Usage
//!
//! ```
//! use cdmp_core::{scalar_pce, PCEModel, ReportingLevel, VPModel, VotingRule};
//! use nalgebra::DMatrix;
//!
//! let w = DMatrix::from_row_slice(1, 3, &[1.0, 1.0, 1.0]);
//! let u = DMatrix::from_row_slice(3, 3, &[
//!     1.0, 0.6, 0.2,
//!     1.0, 0.3, 0.5,
//!     0.9, 1.0, 0.1,
//! ]);
//! let p = scalar_pce(
//!     3, 3, &w, &u,
//!     VotingRule::Proportional, VPModel::Linear, PCEModel::MarkovUniform,
//!     ReportingLevel::Silent,
//! ).unwrap();
//! assert!(p[0] > p[1] && p[0] > p[2]);
//! ```

pub mod actor;
pub mod error;
pub mod model;
pub mod pce;
pub mod policy;
pub mod position;
pub mod record;
pub mod risk;
pub mod state;
pub mod voting;

#[cfg(test)]
mod testing;

pub use actor::{third_party_vote_su, vprob_little, Actor, ActorInfo};
pub use error::{ModelError, Result};
pub use model::{MaxTurns, Model, ModelId, StepFn, StopCondition, MAX_NUM_ACTOR, MIN_NUM_ACTOR};
pub use pce::{cond_pce, markov_incentive_pce, markov_pce, prob_ce, prob_ce_from_coalitions, scalar_pce};
pub use policy::{
    BigRAdjust, BigRRange, PCEModel, PolicyConfig, ReportingLevel, StateTransMode,
    ThirdPartyCommit, VPModel, VotingRule,
};
pub use position::{Position, VctrPstn};
pub use record::{record_history, TurnRecord, TurnRecorder, VecRecorder};
pub use risk::{big_r_from_prob, est_nra};
pub use state::{ue_indices, Perspective, State, StateCore};
pub use voting::{coalitions, vote, vprob, vprob_matrix, vprob_voting};
