//! Linear-quadratic regulator synthesis
//!
//! Minimizes ∫ (eᵀQe + R·u²) dt for the plant linearized about the upright
//! equilibrium, with Q = diag(q_θ, q_θ̇, q_x, q_ẋ). The optimal gain is
//!
//! K = R⁻¹BᵀP
//!
//! where P is the stabilizing solution of the CARE.

use nalgebra::Complex;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::dynamics::CartPoleDynamics;
use crate::error::{CartPoleError, Result};
use crate::{GainMatrix, StateMatrix, StateVector};

use super::solve_care;

/// LQR weighting
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LqrWeights {
    /// Diagonal state weights [θ, θ̇, x, ẋ]
    pub q: [f64; 4],
    /// Input weight
    pub r: f64,
}

impl Default for LqrWeights {
    fn default() -> Self {
        Self {
            q: [100.0, 1.0, 10.0, 1.0],
            r: 0.1,
        }
    }
}

impl LqrWeights {
    pub fn new(q: [f64; 4], r: f64) -> Self {
        Self { q, r }
    }

    /// Weights must satisfy q ≥ 0 and r > 0
    pub fn validate(&self) -> Result<()> {
        if let Some(w) = self.q.iter().find(|w| !w.is_finite() || **w < 0.0) {
            return Err(CartPoleError::riccati(format!(
                "state weight {w} must be finite and non-negative"
            )));
        }
        if !self.r.is_finite() || self.r <= 0.0 {
            return Err(CartPoleError::riccati(format!(
                "input weight {} must be finite and positive",
                self.r
            )));
        }
        Ok(())
    }

    /// Q = diag(q)
    pub fn q_matrix(&self) -> StateMatrix {
        StateMatrix::from_diagonal(&StateVector::from(self.q))
    }
}

/// Result of an LQR synthesis
#[derive(Debug, Clone, PartialEq)]
pub struct LqrGains {
    /// Feedback gain row K
    pub k: GainMatrix,
    /// Riccati solution P
    pub p: StateMatrix,
    /// Eigenvalues of A − B·K
    pub closed_loop_poles: Vec<Complex<f64>>,
    /// Weights the gains were computed for
    pub weights: LqrWeights,
}

impl LqrGains {
    /// Slowest closed-loop decay rate (−max Re λ)
    pub fn stability_margin(&self) -> f64 {
        -self
            .closed_loop_poles
            .iter()
            .map(|p| p.re)
            .fold(f64::NEG_INFINITY, f64::max)
    }
}

/// Compute the optimal state-feedback gain for the current parameters
///
/// Linearizes `dynamics`, solves the CARE and returns K = R⁻¹BᵀP. Does not
/// mutate the parameters.
pub fn compute_gains(dynamics: &CartPoleDynamics, weights: &LqrWeights) -> Result<LqrGains> {
    weights.validate()?;

    let (a, b) = dynamics.linearize()?;
    let solution = solve_care(&a, &b, &weights.q_matrix(), weights.r)?;

    let k: GainMatrix = b.transpose() * solution.p / weights.r;

    info!(
        q = ?weights.q,
        r = weights.r,
        k_theta = k[0],
        k_theta_dot = k[1],
        k_x = k[2],
        k_x_dot = k[3],
        iterations = solution.iterations,
        "LQR gains computed"
    );

    Ok(LqrGains {
        k,
        p: solution.p,
        closed_loop_poles: solution.closed_loop_poles,
        weights: *weights,
    })
}
