//! State-feedback controller
//!
//! u = −K · (x − x_target)
//!
//! The gain is optional: until one has been computed the controller is
//! unarmed and commands zero force, leaving the plant open-loop.

use crate::dynamics::CartPoleDynamics;
use crate::error::Result;
use crate::{target_state, GainMatrix, StateVector};

use super::{compute_gains, LqrGains, LqrWeights};

/// Feedback force for `state`, or 0 when no gain is available
pub fn feedback_force(state: &StateVector, gain: Option<&GainMatrix>, target: &StateVector) -> f64 {
    match gain {
        Some(k) => -(k * (state - target))[0],
        None => 0.0,
    }
}

/// LQR state-feedback controller
#[derive(Debug, Clone)]
pub struct LqrController {
    gains: Option<LqrGains>,
    target: StateVector,
}

impl Default for LqrController {
    fn default() -> Self {
        Self::new()
    }
}

impl LqrController {
    /// Unarmed controller regulating to the upright equilibrium
    pub fn new() -> Self {
        Self {
            gains: None,
            target: target_state(),
        }
    }

    pub fn with_gains(gains: LqrGains) -> Self {
        Self {
            gains: Some(gains),
            target: target_state(),
        }
    }

    /// Synthesize gains for `dynamics` and return an armed controller
    pub fn from_dynamics(dynamics: &CartPoleDynamics, weights: &LqrWeights) -> Result<Self> {
        Ok(Self::with_gains(compute_gains(dynamics, weights)?))
    }

    /// Recompute the gains; on error the previous gains are kept
    pub fn recompute(&mut self, dynamics: &CartPoleDynamics, weights: &LqrWeights) -> Result<&LqrGains> {
        let gains = compute_gains(dynamics, weights)?;
        Ok(self.set_gains(gains))
    }

    /// Install precomputed gains
    pub fn set_gains(&mut self, gains: LqrGains) -> &LqrGains {
        self.gains.insert(gains)
    }

    /// Drop the gains; the controller falls back to zero force
    pub fn disarm(&mut self) {
        self.gains = None;
    }

    pub fn is_armed(&self) -> bool {
        self.gains.is_some()
    }

    pub fn gains(&self) -> Option<&LqrGains> {
        self.gains.as_ref()
    }

    pub fn gain_matrix(&self) -> Option<&GainMatrix> {
        self.gains.as_ref().map(|g| &g.k)
    }

    pub fn target(&self) -> &StateVector {
        &self.target
    }

    pub fn set_target(&mut self, target: StateVector) {
        self.target = target;
    }

    /// Control force [N] for the current state
    pub fn action(&self, state: &StateVector) -> f64 {
        feedback_force(state, self.gain_matrix(), &self.target)
    }
}
