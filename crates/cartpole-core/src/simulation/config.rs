//! Simulation configuration
//!
//! Defines configuration structures for setting up simulations.

use serde::{Deserialize, Serialize};

use crate::control::LqrWeights;
use crate::dynamics::{PhysParams, PhysicalConstants};
use crate::error::{CartPoleError, Result};
use crate::{StateVector, DEFAULT_DT};

/// Simulation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    /// Simulation time step [s]
    pub dt: f64,
    /// Default run duration [s]
    pub duration: f64,
    /// Physical constants
    pub physics: PhysicalConstants,
    /// LQR weighting
    pub weights: LqrWeights,
    /// State restored on reset
    pub initial_state: InitialStateConfig,
    /// Magnitude of a manual push [N]
    pub push_force: f64,
    /// Plot history settings
    pub history: HistoryConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            dt: DEFAULT_DT, // 50 Hz
            duration: 5.0,
            physics: PhysicalConstants::default(),
            weights: LqrWeights::default(),
            initial_state: InitialStateConfig::default(),
            push_force: 15.0,
            history: HistoryConfig::default(),
        }
    }
}

impl SimConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.dt.is_finite() || self.dt <= 0.0 {
            return Err(CartPoleError::invalid_parameter("dt", self.dt, "must be positive and finite"));
        }
        if !self.duration.is_finite() || self.duration <= 0.0 {
            return Err(CartPoleError::invalid_parameter(
                "duration",
                self.duration,
                "must be positive and finite",
            ));
        }
        if !self.push_force.is_finite() {
            return Err(CartPoleError::invalid_parameter(
                "push_force",
                self.push_force,
                "must be finite",
            ));
        }
        if !self.initial_state.to_state().iter().all(|v| v.is_finite()) {
            return Err(CartPoleError::invalid_parameter(
                "initial_state",
                f64::NAN,
                "must be finite",
            ));
        }
        self.history.validate()?;
        self.physics.validate()
    }

    /// Validated physical parameters sampled at `dt`
    pub fn to_params(&self) -> Result<PhysParams> {
        self.physics.to_params()?.with_dt(self.dt)
    }
}

/// Initial state configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InitialStateConfig {
    /// Pole angle from vertical [rad]
    pub theta: f64,
    /// Pole angular rate [rad/s]
    pub theta_dot: f64,
    /// Cart position [m]
    pub x: f64,
    /// Cart velocity [m/s]
    pub x_dot: f64,
}

impl Default for InitialStateConfig {
    fn default() -> Self {
        Self {
            theta: 0.1,
            theta_dot: 0.0,
            x: 0.0,
            x_dot: 0.0,
        }
    }
}

impl InitialStateConfig {
    pub fn to_state(&self) -> StateVector {
        StateVector::new(self.theta, self.theta_dot, self.x, self.x_dot)
    }
}

/// Bounded plot history
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Number of samples kept
    pub capacity: usize,
    /// Minimum time between samples [s]
    pub sample_interval: f64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: 300,
            sample_interval: 0.033, // ~30 FPS
        }
    }
}

impl HistoryConfig {
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(CartPoleError::invalid_parameter(
                "history.capacity",
                0.0,
                "must be at least one sample",
            ));
        }
        if !self.sample_interval.is_finite() || self.sample_interval < 0.0 {
            return Err(CartPoleError::invalid_parameter(
                "history.sample_interval",
                self.sample_interval,
                "must be non-negative and finite",
            ));
        }
        Ok(())
    }
}
