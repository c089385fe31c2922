//! Positions: what an actor advocates at a given turn.

use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;

/// An actor's advocated outcome.
///
/// The core never looks inside a position; concrete domains downcast through
/// [`Position::as_any`] when they need the payload back.
pub trait Position: fmt::Debug + fmt::Display {
    /// Access to the concrete type.
    fn as_any(&self) -> &dyn Any;

    /// Owned copy, used when a successor state starts from its predecessor.
    fn box_clone(&self) -> Box<dyn Position>;
}

impl Clone for Box<dyn Position> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

/// A position that is a point in a real vector space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VctrPstn {
    /// Coordinates
    pub coords: DVector<f64>,
}

impl VctrPstn {
    /// Wraps a coordinate vector.
    pub fn new(coords: DVector<f64>) -> Self {
        Self { coords }
    }

    /// A one-dimensional position.
    pub fn scalar(x: f64) -> Self {
        Self::new(DVector::from_element(1, x))
    }

    /// Number of dimensions.
    pub fn dim(&self) -> usize {
        self.coords.len()
    }

    /// Euclidean distance to another position.
    pub fn distance(&self, other: &VctrPstn) -> f64 {
        (&self.coords - &other.coords).norm()
    }
}

impl fmt::Display for VctrPstn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (k, x) in self.coords.iter().enumerate() {
            if k > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{:.4}", x)?;
        }
        write!(f, "]")
    }
}

impl Position for VctrPstn {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn box_clone(&self) -> Box<dyn Position> {
        Box::new(self.clone())
    }
}
