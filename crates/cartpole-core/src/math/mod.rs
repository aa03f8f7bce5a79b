//! Mathematical utilities for the cart-pole engine
//!
//! Implements the fixed-step Runge-Kutta integrator and
//! finite-difference Jacobians used to cross-check linearizations.

pub mod integrator;
pub mod jacobian;

pub use integrator::*;
pub use jacobian::*;
