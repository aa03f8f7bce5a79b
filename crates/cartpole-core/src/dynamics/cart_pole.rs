//! Cart-pole equations of motion
//!
//! Lagrangian dynamics of a cart (mass M) carrying a rigid pole (mass m,
//! center of mass l, pivot inertia J), driven by a horizontal force F:
//!
//! (M+m)·ẍ + m·l·cosθ·θ̈ − m·l·sinθ·θ̇² = F − d·ẋ
//! m·l·cosθ·ẍ + J·θ̈ − m·g·l·sinθ = 0
//!
//! Written as a 2×2 linear system in (ẍ, θ̈) and solved by Cramer's rule.
//! θ is measured from the upright vertical, so θ = 0 is the unstable
//! equilibrium.

use nalgebra::{Matrix2, Vector2};

use crate::error::{CartPoleError, Result};
use crate::math::{central_derivative, central_jacobian, rk4};
use crate::{target_state, InputMatrix, StateMatrix, StateVector, SINGULARITY_EPS};

use super::PhysParams;

/// Nonlinear and linearized cart-pole model bound to one parameter set
///
/// The dynamics own a copy of the parameters. After the caller edits its
/// parameters it must rebind with [`CartPoleDynamics::set_params`].
#[derive(Debug, Clone, Default)]
pub struct CartPoleDynamics {
    params: PhysParams,
}

impl CartPoleDynamics {
    pub fn new(params: PhysParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &PhysParams {
        &self.params
    }

    /// Rebind to a new parameter set
    pub fn set_params(&mut self, params: PhysParams) {
        self.params = params;
    }

    /// Mass-matrix of the (ẍ, θ̈) system at angle θ
    ///
    /// [ M+m        m·l·cosθ ]
    /// [ m·l·cosθ   J        ]
    pub fn mass_matrix(&self, theta: f64) -> Matrix2<f64> {
        let (big_m, m, l, j) = self.lumped();
        let coupling = m * l * theta.cos();
        Matrix2::new(big_m + m, coupling, coupling, j)
    }

    /// Linearization about the upright equilibrium
    ///
    /// Returns `(A, B)` for ẋ = A·x + B·u with x = [θ, θ̇, x, ẋ], using
    /// Det = J·(M+m) − (m·l)². Fails with `SingularModel` if Det is
    /// negligible relative to J·(M+m).
    pub fn linearize(&self) -> Result<(StateMatrix, InputMatrix)> {
        let (big_m, m, l, j) = self.lumped();
        let g = self.params.gravity();
        let d = self.params.friction();

        let det = self.checked_determinant(
            j * (big_m + m) - (m * l).powi(2),
            "linearized mass matrix",
        )?;

        #[rustfmt::skip]
        let a = StateMatrix::new(
            0.0,                               1.0, 0.0, 0.0,
            m * g * l * (big_m + m) / det,     0.0, 0.0, m * l * d / det,
            0.0,                               0.0, 0.0, 1.0,
            -(m * l).powi(2) * g / det,        0.0, 0.0, -j * d / det,
        );

        let b = InputMatrix::new(0.0, -m * l / det, 0.0, j / det);

        Ok((a, b))
    }

    /// Nonlinear state derivative [θ̇, θ̈, ẋ, ẍ] under horizontal force `force`
    ///
    /// D = (M+m)·J − (m·l·cosθ)²
    /// rhs₁ = F − d·ẋ + m·l·sinθ·θ̇²
    /// rhs₂ = m·g·l·sinθ
    /// ẍ = (rhs₁·J − rhs₂·m·l·cosθ) / D
    /// θ̈ = ((M+m)·rhs₂ − rhs₁·m·l·cosθ) / D
    ///
    /// A non-finite angle leaves D undefined and fails with `SingularModel`.
    pub fn derivative(&self, state: &StateVector, force: f64) -> Result<StateVector> {
        let (big_m, m, l, j) = self.lumped();
        let g = self.params.gravity();
        let d = self.params.friction();

        let theta = state[0];
        let theta_dot = state[1];
        let x_dot = state[3];
        let (sin_t, cos_t) = theta.sin_cos();

        let det = self.checked_determinant(
            (big_m + m) * j - (m * l * cos_t).powi(2),
            "nonlinear mass matrix",
        )?;

        let rhs1 = force - d * x_dot + m * l * sin_t * theta_dot * theta_dot;
        let rhs2 = m * g * l * sin_t;

        let x_ddot = (rhs1 * j - rhs2 * m * l * cos_t) / det;
        let theta_ddot = ((big_m + m) * rhs2 - rhs1 * m * l * cos_t) / det;

        Ok(StateVector::new(theta_dot, theta_ddot, x_dot, x_ddot))
    }

    /// Generalized accelerations (ẍ, θ̈) by a direct solve of the mass matrix
    ///
    /// Slower than [`CartPoleDynamics::derivative`]; kept for cross-checking
    /// the closed-form Cramer solution.
    pub fn accelerations(&self, state: &StateVector, force: f64) -> Result<Vector2<f64>> {
        let (_, m, l, _) = self.lumped();
        let g = self.params.gravity();
        let d = self.params.friction();
        let (sin_t, _) = state[0].sin_cos();

        let mass = self.mass_matrix(state[0]);
        let det = self.checked_determinant(mass.determinant(), "nonlinear mass matrix")?;

        let rhs = Vector2::new(
            force - d * state[3] + m * l * sin_t * state[1] * state[1],
            m * g * l * sin_t,
        );

        mass.lu()
            .solve(&rhs)
            .ok_or(CartPoleError::singular(det, "nonlinear mass matrix"))
    }

    /// Advance the state by one RK4 step of length `dt` under constant `force`
    pub fn step(&self, state: &StateVector, force: f64, dt: f64) -> Result<StateVector> {
        rk4(state, 0.0, dt, |_t, s| self.derivative(s, force))
    }

    /// Advance by one step of the configured sampling interval
    pub fn step_default(&self, state: &StateVector, force: f64) -> Result<StateVector> {
        self.step(state, force, self.params.dt())
    }

    /// Jacobians (A, B) of [`CartPoleDynamics::derivative`] at the target
    /// state by central differences with step `h`
    pub fn linearize_numerically(&self, h: f64) -> Result<(StateMatrix, InputMatrix)> {
        let equilibrium = target_state();

        let a = central_jacobian(|s: &StateVector| self.derivative(s, 0.0), &equilibrium, h)?;
        let b = central_derivative(|u| self.derivative(&equilibrium, u), 0.0, h)?;

        Ok((a, b))
    }

    /// Total mechanical energy [J], zero potential at the pivot height
    ///
    /// E = ½(M+m)ẋ² + m·l·cosθ·ẋ·θ̇ + ½J·θ̇² + m·g·l·cosθ
    pub fn energy(&self, state: &StateVector) -> f64 {
        let (big_m, m, l, j) = self.lumped();
        let g = self.params.gravity();
        let (theta, theta_dot, x_dot) = (state[0], state[1], state[3]);
        let cos_t = theta.cos();

        let kinetic = 0.5 * (big_m + m) * x_dot * x_dot
            + m * l * cos_t * x_dot * theta_dot
            + 0.5 * j * theta_dot * theta_dot;
        let potential = m * g * l * cos_t;

        kinetic + potential
    }

    /// Reject a mass-matrix determinant that is not finite or is negligible
    /// against the product of the diagonal, J·(M+m)
    fn checked_determinant(&self, det: f64, context: &'static str) -> Result<f64> {
        let (big_m, m, _, j) = self.lumped();
        let scale = j * (big_m + m);

        if !det.is_finite() || det.abs() <= SINGULARITY_EPS * scale {
            return Err(CartPoleError::singular(det, context));
        }
        Ok(det)
    }

    fn lumped(&self) -> (f64, f64, f64, f64) {
        (
            self.params.cart_mass(),
            self.params.total_mass(),
            self.params.com_distance(),
            self.params.inertia(),
        )
    }
}
