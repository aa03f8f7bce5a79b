//! Numerical integration methods
//!
//! Classical 4th-order Runge-Kutta for state vectors whose derivative
//! evaluation can fail (e.g. a singular mass matrix). The first error
//! encountered by any stage is returned unchanged.

use nalgebra::SVector;

/// Generic RK4 integrator for any state vector
///
/// Solves dx/dt = f(t, x) using 4th-order Runge-Kutta method:
///
/// x₊ = x + dt/6 · (k₁ + 2k₂ + 2k₃ + k₄)
///
/// # Arguments
/// * `x` - Current state
/// * `t` - Current time
/// * `dt` - Time step
/// * `f` - Derivative function f(t, x) -> dx/dt
///
/// # Returns
/// New state after integration, or the first error raised by `f`
pub fn rk4<const N: usize, F, E>(
    x: &SVector<f64, N>,
    t: f64,
    dt: f64,
    f: F,
) -> Result<SVector<f64, N>, E>
where
    F: Fn(f64, &SVector<f64, N>) -> Result<SVector<f64, N>, E>,
{
    let k1 = f(t, x)?;
    let k2 = f(t + dt / 2.0, &(x + k1 * (dt / 2.0)))?;
    let k3 = f(t + dt / 2.0, &(x + k2 * (dt / 2.0)))?;
    let k4 = f(t + dt, &(x + k3 * dt))?;

    Ok(x + (k1 + k2 * 2.0 + k3 * 2.0 + k4) * (dt / 6.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::convert::Infallible;
    use std::f64::consts::PI;

    /// `steps` equal RK4 steps over `[0, duration]`
    fn integrate<const N: usize, F, E>(
        x0: &SVector<f64, N>,
        duration: f64,
        steps: usize,
        f: F,
    ) -> Result<SVector<f64, N>, E>
    where
        F: Fn(f64, &SVector<f64, N>) -> Result<SVector<f64, N>, E>,
    {
        let dt = duration / steps as f64;
        let mut state = *x0;
        for i in 0..steps {
            state = rk4(&state, i as f64 * dt, dt, &f)?;
        }
        Ok(state)
    }

    #[test]
    fn test_rk4_exponential_decay() {
        // dx/dt = -x, x(0) = 1  =>  x(1) = e^-1
        let x0 = SVector::<f64, 1>::new(1.0);

        let x = integrate(&x0, 1.0, 100, |_t, x| Ok::<_, Infallible>(-*x))
            .unwrap();

        assert_relative_eq!(x[0], (-1.0_f64).exp(), epsilon = 1e-9);
    }

    #[test]
    fn test_rk4_harmonic_oscillator() {
        // [x, v]' = [v, -x] with x(0) = 1: at t = π/2, x ≈ 0 and v ≈ -1
        let x0 = SVector::<f64, 2>::new(1.0, 0.0);

        let x = integrate(&x0, PI / 2.0, 1000, |_t, s| {
            Ok::<_, Infallible>(SVector::<f64, 2>::new(s[1], -s[0]))
        })
        .unwrap();

        assert_relative_eq!(x[0], 0.0, epsilon = 1e-9);
        assert_relative_eq!(x[1], -1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_rk4_uses_stage_times() {
        // dx/dt = t² is integrated exactly by RK4 (Simpson's rule)
        let x0 = SVector::<f64, 1>::new(0.0);

        let x = rk4(&x0, 1.0, 0.5, |t, _x| {
            Ok::<_, Infallible>(SVector::<f64, 1>::new(t * t))
        })
        .unwrap();

        let exact = (1.5_f64.powi(3) - 1.0) / 3.0;
        assert_relative_eq!(x[0], exact, epsilon = 1e-12);
    }

    #[test]
    fn test_rk4_fourth_order_convergence() {
        // Halving dt should shrink the global error by ~2⁴
        let x0 = SVector::<f64, 1>::new(1.0);
        let exact = (-2.0_f64).exp();
        let f = |_t: f64, x: &SVector<f64, 1>| Ok::<_, Infallible>(-*x);

        let coarse = integrate(&x0, 2.0, 10, f).unwrap();
        let fine = integrate(&x0, 2.0, 20, f).unwrap();

        let ratio = (coarse[0] - exact).abs() / (fine[0] - exact).abs();
        assert!(ratio > 12.0 && ratio < 20.0, "error ratio {ratio}");
    }

    #[test]
    fn test_rk4_propagates_error() {
        let x0 = SVector::<f64, 1>::new(1.0);

        let result = rk4(&x0, 0.0, 0.1, |_t, x| {
            if x[0] > 1.0 {
                Err("diverged")
            } else {
                Ok(SVector::<f64, 1>::new(10.0))
            }
        });

        assert_eq!(result, Err("diverged"));
    }
}
