//! Main simulation runner
//!
//! Owns the parameter set, the dynamics bound to it and the LQR
//! controller, and advances the cart-pole one fixed step per tick.
//! Parameter and weight edits re-derive the model and recompute the gains
//! in one call, so the loop never runs with gains computed for stale
//! parameters.

use std::collections::VecDeque;

use tracing::{debug, warn};

use crate::control::{compute_gains, LqrController, LqrGains, LqrWeights};
use crate::dynamics::{CartPoleDynamics, PhysParams, PhysicalConstants};
use crate::error::{CartPoleError, Result};
use crate::{idx, StateVector};

use super::{HistoryConfig, SensorPacket, SimConfig};

/// Run state of the loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimStatus {
    /// Constructed or reset, not started
    Idle,
    /// Ticks advance the state
    Running,
    /// Halted by the host, a sensor injection or a model error
    Stopped,
}

/// Simulation output for one timestep
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimStep {
    /// Simulation time after the step [s]
    pub time: f64,
    /// State after the step
    pub state: StateVector,
    /// Controller force applied during the step [N]
    pub control_force: f64,
    /// External disturbance applied during the step [N]
    pub disturbance: f64,
}

/// One plotted sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimSample {
    pub time: f64,
    pub state: StateVector,
}

/// State component of a history sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Theta,
    ThetaDot,
    X,
    XDot,
}

impl Channel {
    pub const ALL: [Channel; 4] = [Channel::Theta, Channel::ThetaDot, Channel::X, Channel::XDot];

    /// Position inside a [`StateVector`]
    pub fn index(self) -> usize {
        match self {
            Channel::Theta => idx::THETA,
            Channel::ThetaDot => idx::THETA_DOT,
            Channel::X => idx::X,
            Channel::XDot => idx::X_DOT,
        }
    }
}

/// Bounded, rate-limited simulation history
#[derive(Debug, Clone)]
pub struct SimHistory {
    samples: VecDeque<SimSample>,
    config: HistoryConfig,
}

impl SimHistory {
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            samples: VecDeque::with_capacity(config.capacity),
            config,
        }
    }

    /// Record a sample if `sample_interval` has elapsed since the last one
    ///
    /// Returns whether the sample was kept. The oldest sample is evicted
    /// once `capacity` is reached.
    pub fn record(&mut self, time: f64, state: &StateVector) -> bool {
        if let Some(last) = self.samples.back() {
            if time - last.time < self.config.sample_interval {
                return false;
            }
        }

        if self.samples.len() == self.config.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(SimSample {
            time,
            state: *state,
        });
        true
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn samples(&self) -> impl Iterator<Item = &SimSample> {
        self.samples.iter()
    }

    pub fn latest(&self) -> Option<&SimSample> {
        self.samples.back()
    }

    /// Time stamps [s]
    pub fn times(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.time).collect()
    }

    /// One state component over time
    pub fn channel(&self, channel: Channel) -> Vec<f64> {
        let index = channel.index();
        self.samples.iter().map(|s| s.state[index]).collect()
    }

    /// Get time span covered by the history
    pub fn duration(&self) -> f64 {
        match (self.samples.front(), self.samples.back()) {
            (Some(first), Some(last)) => last.time - first.time,
            _ => 0.0,
        }
    }

    /// Get number of recorded samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if history is empty
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Main simulator
pub struct Simulator {
    /// Configuration (kept in sync with accepted updates)
    config: SimConfig,
    /// Parameters the dynamics and gains were derived from
    params: PhysParams,
    /// Dynamics model bound to `params`
    dynamics: CartPoleDynamics,
    /// Feedback controller
    controller: LqrController,
    /// Current state
    state: StateVector,
    /// Current simulation time
    time: f64,
    /// Held external force [N]
    disturbance: f64,
    status: SimStatus,
    history: SimHistory,
}

impl Simulator {
    /// Create a simulator with gains computed for the configured parameters
    pub fn new(config: SimConfig) -> Result<Self> {
        config.validate()?;

        let params = config.to_params()?;
        let dynamics = CartPoleDynamics::new(params.clone());
        let controller = LqrController::from_dynamics(&dynamics, &config.weights)?;

        Ok(Self {
            state: config.initial_state.to_state(),
            history: SimHistory::new(config.history),
            config,
            params,
            dynamics,
            controller,
            time: 0.0,
            disturbance: 0.0,
            status: SimStatus::Idle,
        })
    }

    pub fn start(&mut self) {
        self.status = SimStatus::Running;
    }

    pub fn stop(&mut self) {
        self.status = SimStatus::Stopped;
    }

    /// Stop and restore the configured initial state
    pub fn reset(&mut self) {
        self.status = SimStatus::Idle;
        self.state = self.config.initial_state.to_state();
        self.time = 0.0;
        self.disturbance = 0.0;
        self.history.clear();
        debug!("simulation reset");
    }

    /// Advance one step if running
    ///
    /// Returns `Ok(None)` when the loop is not running. On a model error the
    /// state is left untouched and the loop is stopped.
    pub fn tick(&mut self) -> Result<Option<SimStep>> {
        if self.status != SimStatus::Running {
            return Ok(None);
        }
        self.advance().map(Some)
    }

    /// Start and advance for `seconds` of simulated time
    ///
    /// `seconds` must be finite and non-negative.
    pub fn run_for(&mut self, seconds: f64) -> Result<&SimHistory> {
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(CartPoleError::invalid_parameter(
                "seconds",
                seconds,
                "must be non-negative and finite",
            ));
        }
        let steps = (seconds / self.params.dt() - 1e-9).ceil().max(0.0) as usize;

        self.start();
        for _ in 0..steps {
            self.advance()?;
        }
        Ok(&self.history)
    }

    /// Run for the configured duration
    pub fn run(&mut self) -> Result<&SimHistory> {
        self.run_for(self.config.duration)
    }

    fn advance(&mut self) -> Result<SimStep> {
        let dt = self.params.dt();
        let control_force = self.controller.action(&self.state);
        let force = control_force + self.disturbance;

        let next = match self.dynamics.step(&self.state, force, dt) {
            Ok(next) => next,
            Err(err) => {
                warn!(time = self.time, error = %err, "simulation step refused");
                self.status = SimStatus::Stopped;
                return Err(err);
            }
        };

        self.state = next;
        self.time += dt;
        self.history.record(self.time, &self.state);

        Ok(SimStep {
            time: self.time,
            state: self.state,
            control_force,
            disturbance: self.disturbance,
        })
    }

    /// Hold an external force on the cart until released [N]
    pub fn apply_force(&mut self, force: f64) {
        self.disturbance = force;
    }

    pub fn push_left(&mut self) {
        self.apply_force(-self.config.push_force);
    }

    pub fn push_right(&mut self) {
        self.apply_force(self.config.push_force);
    }

    pub fn release(&mut self) {
        self.apply_force(0.0);
    }

    /// Overwrite angle and position from a measurement, zero the velocities
    /// and stop the loop
    ///
    /// A packet with a non-finite reading is rejected and changes nothing.
    pub fn inject_measurement(&mut self, packet: SensorPacket) -> Result<()> {
        for (name, value) in [("measurement.theta", packet.theta), ("measurement.x", packet.x)] {
            if !value.is_finite() {
                return Err(CartPoleError::invalid_parameter(name, value, "must be finite"));
            }
        }

        self.state = packet.to_state();
        self.stop();
        debug!(theta = packet.theta, x = packet.x, "sensor packet injected");
        Ok(())
    }

    /// Edit the physical constants and recompute the gains atomically
    ///
    /// If either the parameters are invalid or no stabilizing gain exists
    /// for them, nothing changes and the error is returned.
    pub fn update_physics<F>(&mut self, edit: F) -> Result<&LqrGains>
    where
        F: FnOnce(&mut PhysicalConstants),
    {
        let mut params = self.params.clone();
        params.update(edit)?;
        self.rebind(params, self.config.weights)
    }

    /// Replace all physical constants
    pub fn set_physics(&mut self, constants: PhysicalConstants) -> Result<&LqrGains> {
        self.update_physics(|c| *c = constants)
    }

    /// Replace the LQR weights and recompute the gains atomically
    pub fn update_weights(&mut self, weights: LqrWeights) -> Result<&LqrGains> {
        self.rebind(self.params.clone(), weights)
    }

    /// Change the sampling interval
    pub fn set_dt(&mut self, dt: f64) -> Result<()> {
        self.params.set_dt(dt)?;
        self.dynamics.set_params(self.params.clone());
        self.config.dt = dt;
        Ok(())
    }

    fn rebind(&mut self, params: PhysParams, weights: LqrWeights) -> Result<&LqrGains> {
        let dynamics = CartPoleDynamics::new(params.clone());
        let gains = compute_gains(&dynamics, &weights).map_err(|err| {
            warn!(error = %err, "update rejected, keeping previous parameters");
            err
        })?;

        self.config.physics = *params.constants();
        self.config.weights = weights;
        self.params = params;
        self.dynamics = dynamics;
        Ok(self.controller.set_gains(gains))
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn params(&self) -> &PhysParams {
        &self.params
    }

    pub fn dynamics(&self) -> &CartPoleDynamics {
        &self.dynamics
    }

    pub fn controller(&self) -> &LqrController {
        &self.controller
    }

    /// Drop the gains and run open-loop until the next accepted physics or
    /// weight update
    pub fn disarm(&mut self) {
        self.controller.disarm();
    }

    /// Get current state
    pub fn state(&self) -> &StateVector {
        &self.state
    }

    /// Get current simulation time
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn status(&self) -> SimStatus {
        self.status
    }

    pub fn disturbance(&self) -> f64 {
        self.disturbance
    }

    /// Get simulation history
    pub fn history(&self) -> &SimHistory {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::InitialStateConfig;
    use approx::assert_relative_eq;

    fn default_sim() -> Simulator {
        Simulator::new(SimConfig::default()).unwrap()
    }

    #[test]
    fn test_simulator_creation() {
        let sim = default_sim();

        assert_eq!(sim.time(), 0.0);
        assert_eq!(sim.status(), SimStatus::Idle);
        assert!(sim.controller().is_armed());
        assert_eq!(*sim.state(), StateVector::new(0.1, 0.0, 0.0, 0.0));
    }

    #[test]
    fn test_tick_requires_running() {
        let mut sim = default_sim();
        assert_eq!(sim.tick().unwrap(), None);
        assert_eq!(sim.time(), 0.0);

        sim.start();
        let step = sim.tick().unwrap().unwrap();
        assert_relative_eq!(step.time, 0.02, epsilon = 1e-12);
        assert_relative_eq!(sim.time(), 0.02, epsilon = 1e-12);
        assert!(step.control_force > 0.0);
        assert_eq!(step.disturbance, 0.0);

        sim.stop();
        assert_eq!(sim.tick().unwrap(), None);
    }

    #[test]
    fn test_tick_matches_manual_control_loop() {
        let mut sim = default_sim();
        let dynamics = sim.dynamics().clone();
        let controller = sim.controller().clone();

        let mut state = *sim.state();
        sim.start();
        for _ in 0..10 {
            let u = controller.action(&state);
            state = dynamics.step(&state, u, 0.02).unwrap();
            sim.tick().unwrap();
        }

        assert_eq!(*sim.state(), state);
    }

    #[test]
    fn test_disturbance_is_added_to_control() {
        let mut sim = default_sim();
        sim.start();
        sim.push_right();

        let step = sim.tick().unwrap().unwrap();
        assert_eq!(step.disturbance, 15.0);

        sim.push_left();
        assert_eq!(sim.disturbance(), -15.0);
        sim.release();
        assert_eq!(sim.disturbance(), 0.0);
    }

    #[test]
    fn test_reset() {
        let mut sim = default_sim();
        sim.run_for(1.0).unwrap();
        assert!(sim.time() > 0.0);
        assert!(!sim.history().is_empty());

        sim.reset();

        assert_eq!(sim.time(), 0.0);
        assert_eq!(sim.status(), SimStatus::Idle);
        assert!(sim.history().is_empty());
        assert_eq!(*sim.state(), StateVector::new(0.1, 0.0, 0.0, 0.0));
    }

    #[test]
    fn test_run_for_step_count() {
        let mut sim = default_sim();
        sim.run_for(1.0).unwrap();
        assert_relative_eq!(sim.time(), 1.0, epsilon = 1e-9);
        assert_eq!(sim.status(), SimStatus::Running);
    }

    #[test]
    fn test_run_for_rejects_invalid_duration() {
        let mut sim = default_sim();

        for seconds in [f64::NAN, -3.0, f64::INFINITY] {
            assert!(matches!(
                sim.run_for(seconds),
                Err(CartPoleError::InvalidParameter { name: "seconds", .. })
            ));
        }

        assert_eq!(sim.time(), 0.0);
        assert_eq!(sim.status(), SimStatus::Idle);

        sim.run_for(0.0).unwrap();
        assert_eq!(sim.time(), 0.0);
    }

    #[test]
    fn test_model_error_stops_loop_and_keeps_state() {
        // θ̇² overflows inside the RK4 stages
        let config = SimConfig {
            initial_state: InitialStateConfig {
                theta_dot: 1e160,
                ..InitialStateConfig::default()
            },
            ..SimConfig::default()
        };
        let mut sim = Simulator::new(config).unwrap();
        let before = *sim.state();
        sim.start();

        let err = sim.tick().unwrap_err();

        assert!(matches!(err, CartPoleError::SingularModel { .. }));
        assert_eq!(sim.status(), SimStatus::Stopped);
        assert_eq!(*sim.state(), before);
        assert_eq!(sim.time(), 0.0);
        assert!(sim.history().is_empty());
        assert_eq!(sim.tick().unwrap(), None);
    }

    #[test]
    fn test_run_for_propagates_model_error() {
        let config = SimConfig {
            initial_state: InitialStateConfig {
                theta_dot: 1e160,
                ..InitialStateConfig::default()
            },
            ..SimConfig::default()
        };
        let mut sim = Simulator::new(config).unwrap();

        assert!(matches!(
            sim.run_for(1.0),
            Err(CartPoleError::SingularModel { .. })
        ));
        assert_eq!(sim.status(), SimStatus::Stopped);
    }

    #[test]
    fn test_non_finite_measurement_rejected() {
        let mut sim = default_sim();
        sim.start();

        for packet in [SensorPacket::new(f64::NAN, 0.0), SensorPacket::new(0.1, f64::INFINITY)] {
            assert!(matches!(
                sim.inject_measurement(packet),
                Err(CartPoleError::InvalidParameter { .. })
            ));
        }

        assert_eq!(sim.status(), SimStatus::Running);
        assert_eq!(*sim.state(), StateVector::new(0.1, 0.0, 0.0, 0.0));
    }

    #[test]
    fn test_inject_measurement_stops_and_zeroes_velocities() {
        let mut sim = default_sim();
        sim.run_for(0.2).unwrap();

        sim.inject_measurement("0.2, -0.3".parse().unwrap()).unwrap();

        assert_eq!(sim.status(), SimStatus::Stopped);
        assert_eq!(*sim.state(), StateVector::new(0.2, 0.0, -0.3, 0.0));
    }

    #[test]
    fn test_update_physics_recomputes_gains() {
        let mut sim = default_sim();
        let before = *sim.controller().gain_matrix().unwrap();

        let after = sim.update_physics(|c| c.pole_length = 0.6).unwrap().k;

        assert_ne!(before, after);
        assert_eq!(sim.params().pole_length(), 0.6);
        assert_eq!(sim.dynamics().params().pole_length(), 0.6);
        assert_eq!(sim.config().physics.pole_length, 0.6);
        assert_eq!(*sim.controller().gain_matrix().unwrap(), after);
    }

    #[test]
    fn test_rejected_update_keeps_everything() {
        let mut sim = default_sim();
        let gains = *sim.controller().gain_matrix().unwrap();
        let params = sim.params().clone();

        let err = sim.update_physics(|c| c.cart_mass = -1.0).unwrap_err();
        assert!(matches!(err, CartPoleError::InvalidParameter { .. }));

        let err = sim
            .update_weights(LqrWeights::new([100.0, 1.0, 10.0, 1.0], 0.0))
            .unwrap_err();
        assert!(matches!(err, CartPoleError::RiccatiUnsolvable(_)));

        assert_eq!(*sim.params(), params);
        assert_eq!(*sim.controller().gain_matrix().unwrap(), gains);
        assert_eq!(sim.config().weights, LqrWeights::default());
    }

    #[test]
    fn test_set_dt() {
        let mut sim = default_sim();
        sim.set_dt(0.01).unwrap();
        sim.start();
        let step = sim.tick().unwrap().unwrap();
        assert_relative_eq!(step.time, 0.01, epsilon = 1e-12);
        assert!(sim.set_dt(0.0).is_err());
    }

    #[test]
    fn test_history_is_rate_limited_and_bounded() {
        let mut history = SimHistory::new(HistoryConfig {
            capacity: 3,
            sample_interval: 0.05,
        });
        let state = StateVector::zeros();

        assert!(history.record(0.00, &state));
        assert!(!history.record(0.02, &state));
        assert!(history.record(0.06, &state));
        assert!(history.record(0.12, &state));
        assert!(history.record(0.18, &state));

        assert_eq!(history.len(), 3);
        assert_eq!(history.times(), vec![0.06, 0.12, 0.18]);
        assert_relative_eq!(history.duration(), 0.12, epsilon = 1e-12);
    }

    #[test]
    fn test_history_channels() {
        let mut sim = default_sim();
        sim.run_for(2.0).unwrap();

        let history = sim.history();
        let theta = history.channel(Channel::Theta);
        assert_eq!(theta.len(), history.len());
        assert!(history.len() <= 300);
        assert!(history.latest().map_or(false, |s| s.time <= sim.time()));
    }

    #[test]
    fn test_channels_map_to_state_indices() {
        let mut history = SimHistory::new(HistoryConfig::default());
        history.record(0.0, &StateVector::new(1.0, 2.0, 3.0, 4.0));

        let values: Vec<f64> = Channel::ALL.iter().map(|c| history.channel(*c)[0]).collect();
        assert_eq!(values, vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(Channel::X.index(), idx::X);
    }

    #[test]
    fn test_unarmed_simulator_falls_over() {
        let mut sim = default_sim();
        sim.disarm();
        assert!(!sim.controller().is_armed());
        sim.run_for(2.0).unwrap();

        let peak = sim
            .history()
            .channel(Channel::Theta)
            .iter()
            .fold(0.0_f64, |acc, t| acc.max(t.abs()));
        assert!(peak > 0.5);
    }
}
