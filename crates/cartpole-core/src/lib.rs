//! # Cart-Pole Core
//!
//! Physics and control engine for an inverted pendulum on a cart.
//!
//! The pole is a rigid body made of a uniform rod plus a point mass (ball)
//! at its tip. It pivots on a cart that translates along one axis. The
//! engine derives the rigid-body parameters, integrates the nonlinear
//! Lagrangian equations of motion with RK4, and stabilizes the upright
//! equilibrium with an LQR state-feedback law.
//!
//! ## Modules
//!
//! - [`math`]: Numerical utilities (RK4 integrator, finite-difference Jacobians)
//! - [`dynamics`]: Physical parameters and cart-pole equations of motion
//! - [`control`]: Riccati solver, LQR gain synthesis, feedback controller
//! - [`simulation`]: Fixed-step simulation loop for hosts (renderers, plotters)
//!
//! ## State convention
//!
//! Every state vector is ordered `[theta, theta_dot, x, x_dot]`: pole angle
//! from vertical [rad], angular rate [rad/s], cart position [m] and cart
//! velocity [m/s].

pub mod error;
pub mod math;
pub mod dynamics;
pub mod control;
pub mod simulation;

pub use error::{CartPoleError, Result};

// Common type aliases
use nalgebra::{Matrix1x4, Matrix4, Vector4};

/// State vector `[theta, theta_dot, x, x_dot]`
pub type StateVector = Vector4<f64>;

/// Linearized state matrix A (4x4)
pub type StateMatrix = Matrix4<f64>;

/// Linearized input matrix B (4x1)
pub type InputMatrix = Vector4<f64>;

/// State-feedback gain row K (1x4)
pub type GainMatrix = Matrix1x4<f64>;

/// Gravity constant [m/s²]
pub const GRAVITY: f64 = 9.81;

/// Default sampling interval [s] (50 Hz)
pub const DEFAULT_DT: f64 = 0.02;

/// Mass-matrix determinants below this fraction of the product of the
/// diagonal entries are treated as singular
pub const SINGULARITY_EPS: f64 = 1e-12;

/// Upright, centered equilibrium
pub fn target_state() -> StateVector {
    StateVector::zeros()
}

/// Index of each component inside a [`StateVector`]
pub mod idx {
    pub const THETA: usize = 0;
    pub const THETA_DOT: usize = 1;
    pub const X: usize = 2;
    pub const X_DOT: usize = 3;
}
