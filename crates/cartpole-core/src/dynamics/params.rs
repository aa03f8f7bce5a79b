//! Physical parameters of the cart-pole
//!
//! The pole is a uniform rod of length L with a point mass (ball) at its
//! tip. From the primitive constants the following rigid-body quantities
//! about the pivot are derived:
//!
//! m = m_pole + m_ball
//! l_cm = (m_pole · L/2 + m_ball · L) / m
//! J = ⅓ m_pole L² + m_ball L²
//!
//! Derived quantities live next to the primitives inside [`PhysParams`] and
//! are recomputed by every mutation before anything can read them.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CartPoleError, Result};
use crate::{target_state, StateVector, DEFAULT_DT, GRAVITY};

/// Primitive physical constants
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysicalConstants {
    /// Cart mass M [kg]
    pub cart_mass: f64,
    /// Pole length L [m] (pivot to ball)
    pub pole_length: f64,
    /// Gravitational acceleration g [m/s²]
    pub gravity: f64,
    /// Viscous cart friction d [N·s/m]
    pub friction: f64,
    /// Rod mass [kg]
    pub pole_mass: f64,
    /// Tip point-mass [kg]
    pub ball_mass: f64,
}

impl Default for PhysicalConstants {
    fn default() -> Self {
        Self {
            cart_mass: 0.5,
            pole_length: 0.3,
            gravity: GRAVITY,
            friction: 0.0,
            pole_mass: 0.1,
            ball_mass: 0.1,
        }
    }
}

impl PhysicalConstants {
    /// Check every constant against its admissible range
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("cart_mass", self.cart_mass),
            ("pole_length", self.pole_length),
            ("gravity", self.gravity),
            ("friction", self.friction),
            ("pole_mass", self.pole_mass),
            ("ball_mass", self.ball_mass),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(CartPoleError::invalid_parameter(name, value, "must be finite"));
            }
        }

        if self.cart_mass <= 0.0 {
            return Err(CartPoleError::invalid_parameter(
                "cart_mass",
                self.cart_mass,
                "must be positive",
            ));
        }
        if self.pole_length <= 0.0 {
            return Err(CartPoleError::invalid_parameter(
                "pole_length",
                self.pole_length,
                "must be positive",
            ));
        }
        for (name, value) in [
            ("pole_mass", self.pole_mass),
            ("ball_mass", self.ball_mass),
            ("friction", self.friction),
            ("gravity", self.gravity),
        ] {
            if value < 0.0 {
                return Err(CartPoleError::invalid_parameter(name, value, "must be non-negative"));
            }
        }

        let total = self.pole_mass + self.ball_mass;
        if total <= 0.0 {
            return Err(CartPoleError::invalid_parameter(
                "total_mass",
                total,
                "pole and ball cannot both be massless",
            ));
        }

        Ok(())
    }

    /// Build validated parameters with the default sampling interval
    pub fn to_params(&self) -> Result<PhysParams> {
        PhysParams::new(*self)
    }
}

/// Rigid-body quantities of the pole about the pivot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RigidBodyProperties {
    /// Total pole mass m [kg]
    pub total_mass: f64,
    /// Pivot to center-of-mass distance l_cm [m]
    pub com_distance: f64,
    /// Moment of inertia about the pivot J [kg·m²]
    pub inertia: f64,
}

impl RigidBodyProperties {
    /// Derive the aggregate quantities from validated constants
    pub fn from_constants(constants: &PhysicalConstants) -> Result<Self> {
        constants.validate()?;
        Ok(Self::compute(constants))
    }

    fn compute(c: &PhysicalConstants) -> Self {
        let total_mass = c.pole_mass + c.ball_mass;

        // Rod centroid at L/2, ball at L. Kept as L·(ratio) so that a massless
        // rod gives exactly l_cm = L.
        let com_distance = c.pole_length * ((0.5 * c.pole_mass + c.ball_mass) / total_mass);

        let l2 = c.pole_length * c.pole_length;
        let rod_inertia = c.pole_mass * l2 / 3.0;
        let ball_inertia = c.ball_mass * l2;

        Self {
            total_mass,
            com_distance,
            inertia: rod_inertia + ball_inertia,
        }
    }
}

/// Physical parameter set: primitives, derived cache and sampling interval
#[derive(Debug, Clone, PartialEq)]
pub struct PhysParams {
    constants: PhysicalConstants,
    derived: RigidBodyProperties,
    dt: f64,
}

impl Default for PhysParams {
    fn default() -> Self {
        let constants = PhysicalConstants::default();
        Self {
            derived: RigidBodyProperties::compute(&constants),
            constants,
            dt: DEFAULT_DT,
        }
    }
}

impl PhysParams {
    /// Create parameters from primitive constants
    pub fn new(constants: PhysicalConstants) -> Result<Self> {
        let derived = RigidBodyProperties::from_constants(&constants)?;
        debug!(
            total_mass = derived.total_mass,
            com_distance = derived.com_distance,
            inertia = derived.inertia,
            "derived rigid-body parameters"
        );
        Ok(Self {
            constants,
            derived,
            dt: DEFAULT_DT,
        })
    }

    /// Replace the sampling interval
    pub fn with_dt(mut self, dt: f64) -> Result<Self> {
        self.set_dt(dt)?;
        Ok(self)
    }

    /// Recompute `m`, `l_cm` and `J` from the current primitives
    pub fn recompute_derived(&mut self) -> Result<()> {
        self.derived = RigidBodyProperties::from_constants(&self.constants)?;
        Ok(())
    }

    /// Apply an edit to the primitives
    ///
    /// The edit runs on a copy; derived quantities are recomputed and the
    /// result is committed only if it validates. On error `self` is unchanged.
    pub fn update<F>(&mut self, edit: F) -> Result<()>
    where
        F: FnOnce(&mut PhysicalConstants),
    {
        let mut constants = self.constants;
        edit(&mut constants);

        let derived = RigidBodyProperties::from_constants(&constants)?;
        debug!(
            total_mass = derived.total_mass,
            com_distance = derived.com_distance,
            inertia = derived.inertia,
            "parameters updated"
        );

        self.constants = constants;
        self.derived = derived;
        Ok(())
    }

    /// Replace all primitives at once
    pub fn set_constants(&mut self, constants: PhysicalConstants) -> Result<()> {
        self.update(|c| *c = constants)
    }

    pub fn set_cart_mass(&mut self, value: f64) -> Result<()> {
        self.update(|c| c.cart_mass = value)
    }

    pub fn set_pole_length(&mut self, value: f64) -> Result<()> {
        self.update(|c| c.pole_length = value)
    }

    pub fn set_gravity(&mut self, value: f64) -> Result<()> {
        self.update(|c| c.gravity = value)
    }

    pub fn set_friction(&mut self, value: f64) -> Result<()> {
        self.update(|c| c.friction = value)
    }

    pub fn set_pole_mass(&mut self, value: f64) -> Result<()> {
        self.update(|c| c.pole_mass = value)
    }

    pub fn set_ball_mass(&mut self, value: f64) -> Result<()> {
        self.update(|c| c.ball_mass = value)
    }

    /// Set the integrator sampling interval [s]
    pub fn set_dt(&mut self, dt: f64) -> Result<()> {
        if !dt.is_finite() || dt <= 0.0 {
            return Err(CartPoleError::invalid_parameter("dt", dt, "must be positive and finite"));
        }
        self.dt = dt;
        Ok(())
    }

    pub fn constants(&self) -> &PhysicalConstants {
        &self.constants
    }

    pub fn rigid_body(&self) -> &RigidBodyProperties {
        &self.derived
    }

    /// Cart mass M [kg]
    pub fn cart_mass(&self) -> f64 {
        self.constants.cart_mass
    }

    /// Pole length L [m]
    pub fn pole_length(&self) -> f64 {
        self.constants.pole_length
    }

    pub fn gravity(&self) -> f64 {
        self.constants.gravity
    }

    pub fn friction(&self) -> f64 {
        self.constants.friction
    }

    pub fn pole_mass(&self) -> f64 {
        self.constants.pole_mass
    }

    pub fn ball_mass(&self) -> f64 {
        self.constants.ball_mass
    }

    /// Total pole mass m = m_pole + m_ball [kg]
    pub fn total_mass(&self) -> f64 {
        self.derived.total_mass
    }

    /// Pivot to center-of-mass distance l_cm [m]
    pub fn com_distance(&self) -> f64 {
        self.derived.com_distance
    }

    /// Moment of inertia about the pivot J [kg·m²]
    pub fn inertia(&self) -> f64 {
        self.derived.inertia
    }

    /// Sampling interval [s]
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Equilibrium the controller regulates to
    pub fn target_state(&self) -> StateVector {
        target_state()
    }
}
