//! Error types for the CDMP simulation core.

use thiserror::Error;

/// Errors raised by the voting mathematics and the model/state machinery.
///
/// Every variant is a caller-contract or invariant violation; none of them
/// is recovered inside the core.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    // --- Configuration ---
    /// A policy name did not match any variant
    #[error("Unknown {kind} name: '{name}'")]
    UnknownName { kind: &'static str, name: String },

    /// A policy ordinal was out of range
    #[error("Unknown {kind} ordinal: {ordinal}")]
    UnknownOrdinal { kind: &'static str, ordinal: usize },

    // --- Preconditions ---
    /// A matrix or vector had the wrong dimensions
    #[error("Shape error in {what}: expected {expected}, got {actual}")]
    Shape {
        what: &'static str,
        expected: String,
        actual: String,
    },

    /// Actor count outside the supported range
    #[error("Actor count {count} outside [{min}, {max}]")]
    ActorCount { count: usize, min: usize, max: usize },

    /// Voting weights must be strictly positive
    #[error("Non-positive voting weight: {0}")]
    NonPositiveWeight(f64),

    /// Coalition strengths must be non-negative and not both zero
    #[error("Invalid strengths ({s1}, {s2}) for options ({i}, {j})")]
    InvalidStrength { i: usize, j: usize, s1: f64, s2: f64 },

    /// A probability (or probability matrix) broke its invariants
    #[error("Invalid probability in {what}: {detail}")]
    InvalidProbability { what: &'static str, detail: String },

    /// A cache was computed twice without being cleared
    #[error("{what} already computed")]
    AlreadyComputed { what: String },

    /// A cache was read before being computed
    #[error("{what} not yet computed")]
    NotComputed { what: &'static str },

    /// Position equivalence could not be resolved for an actor
    #[error("No unique position found for actor {actor}")]
    MissingEquivalence { actor: usize },

    /// A perspective index did not name an actor
    #[error("Perspective {perspective} out of range for {num_act} actors")]
    PerspectiveOutOfRange { perspective: usize, num_act: usize },

    /// A name or description exceeded its length limit
    #[error("{what} is {len} characters long, limit is {max}")]
    TooLong { what: &'static str, len: usize, max: usize },

    /// A state already holds one position per actor
    #[error("State already holds {num_act} positions")]
    PositionsFull { num_act: usize },

    /// The operation is not available in this configuration
    #[error("Unsupported: {0}")]
    Unsupported(String),

    // --- Numerics ---
    /// Markov PCE exceeded its iteration cap
    #[error("No convergence after {iterations} iterations (last change {change:.3e})")]
    NonConvergence { iterations: usize, change: f64 },

    /// Two computation paths that must agree did not
    #[error("Inconsistent results in {what}: {detail}")]
    Inconsistent { what: &'static str, detail: String },

    // --- Structural ---
    /// A state was not found in its model's history
    #[error("State not found in model history")]
    StateNotInHistory,

    /// A state was bound to a different model
    #[error("State bound to model {state_model}, not {model}")]
    WrongModel { model: u64, state_model: u64 },

    /// `run()` requires exactly one state in history
    #[error("Model history must hold exactly one state at run start, found {0}")]
    HistoryNotReady(usize),

    /// The current state has no step function
    #[error("State at turn {0} has no step function")]
    MissingStep(usize),

    /// The model has no stop condition
    #[error("Model has no stop condition")]
    MissingStop,

    // --- Collaborators ---
    /// A persistence collaborator failed
    #[error("Record error: {0}")]
    Record(String),
}

impl ModelError {
    /// Creates a shape error from anything displayable.
    pub fn shape(
        what: &'static str,
        expected: impl std::fmt::Display,
        actual: impl std::fmt::Display,
    ) -> Self {
        Self::Shape {
            what,
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Creates an invalid-probability error.
    pub fn probability(what: &'static str, detail: impl Into<String>) -> Self {
        Self::InvalidProbability {
            what,
            detail: detail.into(),
        }
    }

    /// Creates an already-computed error.
    pub fn already(what: impl Into<String>) -> Self {
        Self::AlreadyComputed { what: what.into() }
    }

    /// True for configuration errors (bad names or ordinals).
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::UnknownName { .. } | Self::UnknownOrdinal { .. })
    }
}

impl From<serde_json::Error> for ModelError {
    fn from(e: serde_json::Error) -> Self {
        Self::Record(e.to_string())
    }
}

/// Result alias used throughout the core.
pub type Result<T> = std::result::Result<T, ModelError>;
