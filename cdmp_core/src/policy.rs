//! Policy enumerations that parameterize the voting mathematics.
//!
//! Every enum is closed: its canonical names live in exactly one place (the
//! `policy_enum!` invocation), and both name and ordinal lookups fail with a
//! typed error instead of falling back to a default.

use crate::error::{ModelError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! policy_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $( $(#[$vmeta:meta])* $variant:ident => $label:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// All variants, in ordinal order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Returns the canonical display name.
            pub fn name(&self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }

            /// Returns the position of this variant in `ALL`.
            pub fn ordinal(&self) -> usize {
                *self as usize
            }

            /// Looks a variant up by ordinal.
            pub fn from_ordinal(ordinal: usize) -> Result<Self> {
                Self::ALL
                    .get(ordinal)
                    .copied()
                    .ok_or(ModelError::UnknownOrdinal { kind: $kind, ordinal })
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.name())
            }
        }

        impl FromStr for $name {
            type Err = ModelError;

            fn from_str(s: &str) -> Result<Self> {
                let wanted = s.trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.name().eq_ignore_ascii_case(wanted))
                    .ok_or_else(|| ModelError::UnknownName {
                        kind: $kind,
                        name: s.to_string(),
                    })
            }
        }

        impl TryFrom<String> for $name {
            type Error = ModelError;

            fn try_from(s: String) -> Result<Self> {
                s.parse()
            }
        }

        impl From<$name> for String {
            fn from(v: $name) -> String {
                v.name().to_string()
            }
        }
    };
}

policy_enum! {
    /// How much influence to exert (vote) given a difference in utility.
    VotingRule, "VotingRule" {
        Binary => "Binary",
        PropBin => "PropBin",
        Proportional => "Proportional",
        PropCbc => "PropCbc",
        Cubic => "Cubic",
    }
}

policy_enum! {
    /// How the probability of victory grows with the ratio of coalition strengths.
    ///
    /// Linear says 2:1 gives 2/3 and 11:10 gives 52.4%; Square says 2:1 gives
    /// 4/5; Quartic says 2:1 gives 16/17. Binary treats any advantage past a
    /// 10% threshold as certain, interpolating linearly inside it.
    VPModel, "VPModel" {
        Linear => "Linear",
        Square => "Square",
        Quartic => "Quartic",
        Octic => "Octic",
        Binary => "Binary",
    }
}

policy_enum! {
    /// Which probabilistic Condorcet election resolution to apply.
    PCEModel, "PCEModel" {
        /// One-step conditional probability that an option beats all others
        Conditional => "Conditional",
        /// Markov process whose challenges follow coalition incentives
        MarkovIncentive => "MarkovIncentive",
        /// Markov process with uniformly random challenges
        MarkovUniform => "MarkovUniform",
    }
}

policy_enum! {
    /// Whether state transitions are deterministic or stochastic.
    StateTransMode, "StateTransMode" {
        Deterministic => "Deterministic",
        Stochastic => "Stochastic",
    }
}

policy_enum! {
    /// How strongly a third party's post-resolution utility tracks the winner.
    ThirdPartyCommit, "ThirdPartyCommit" {
        NoCommit => "NoCommit",
        SemiCommit => "SemiCommit",
        FullCommit => "FullCommit",
    }
}

policy_enum! {
    /// Range used when turning outcome probabilities into risk attitudes.
    BigRRange, "BigRRange" {
        Min => "Min",
        Mid => "Mid",
        Max => "Max",
    }
}

policy_enum! {
    /// How far one actor adjusts its estimate of another's risk attitude.
    BigRAdjust, "BigRAdjust" {
        NoRA => "NoRA",
        OneThirdRA => "OneThirdRA",
        HalfRA => "HalfRA",
        TwoThirdsRA => "TwoThirdsRA",
        FullRA => "FullRA",
    }
}

policy_enum! {
    /// Verbosity of diagnostic reporting, ordered from quiet to noisy.
    ReportingLevel, "ReportingLevel" {
        Silent => "Silent",
        Low => "Low",
        Medium => "Medium",
        High => "High",
        Debugging => "Debugging",
    }
}

/// The policy selections a model applies to its voting mathematics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Voting rule used by actors in coalition building
    pub voting_rule: VotingRule,

    /// Victory-probability law
    pub vp_model: VPModel,

    /// PCE resolution
    pub pce_model: PCEModel,

    /// Deterministic or stochastic state transitions
    pub state_trans_mode: StateTransMode,

    /// Third-party commitment policy
    pub third_party_commit: ThirdPartyCommit,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            voting_rule: VotingRule::PropBin,
            vp_model: VPModel::Linear,
            pce_model: PCEModel::MarkovUniform,
            state_trans_mode: StateTransMode::Deterministic,
            third_party_commit: ThirdPartyCommit::SemiCommit,
        }
    }
}
