//! Error types for the cart-pole core.

use thiserror::Error;

/// Errors reported by the physics and control engine.
///
/// All of them are deterministic numerical conditions: retrying the same
/// call with the same inputs fails the same way.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CartPoleError {
    /// A physical constant is out of its admissible range.
    #[error("invalid parameter `{name}` = {value}: {reason}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Rejected value.
        value: f64,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// A mass-matrix determinant is numerically zero.
    #[error("singular model in {context}: determinant {determinant:e}")]
    SingularModel {
        /// Offending determinant.
        determinant: f64,
        /// Which evaluation detected it.
        context: &'static str,
    },

    /// No stabilizing solution of the algebraic Riccati equation exists.
    #[error("Riccati equation unsolvable: {0}")]
    RiccatiUnsolvable(String),
}

impl CartPoleError {
    /// Creates an invalid parameter error.
    #[must_use]
    pub const fn invalid_parameter(name: &'static str, value: f64, reason: &'static str) -> Self {
        Self::InvalidParameter { name, value, reason }
    }

    /// Creates a singular model error.
    #[must_use]
    pub const fn singular(determinant: f64, context: &'static str) -> Self {
        Self::SingularModel { determinant, context }
    }

    /// Creates a Riccati failure error.
    #[must_use]
    pub fn riccati(reason: impl Into<String>) -> Self {
        Self::RiccatiUnsolvable(reason.into())
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CartPoleError>;
