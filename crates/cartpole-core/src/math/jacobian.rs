//! Finite-difference Jacobians
//!
//! Central differences of a fallible vector field, used to validate
//! analytic linearizations against the nonlinear model.

use nalgebra::{SMatrix, SVector};

/// Jacobian ∂f/∂x at `x` by central differences with step `h`
///
/// Column j is (f(x + h·eⱼ) − f(x − h·eⱼ)) / 2h. Truncation error is O(h²).
pub fn central_jacobian<const R: usize, const C: usize, F, E>(
    f: F,
    x: &SVector<f64, C>,
    h: f64,
) -> Result<SMatrix<f64, R, C>, E>
where
    F: Fn(&SVector<f64, C>) -> Result<SVector<f64, R>, E>,
{
    let mut jac = SMatrix::<f64, R, C>::zeros();

    for j in 0..C {
        let mut forward = *x;
        let mut backward = *x;
        forward[j] += h;
        backward[j] -= h;

        let column = (f(&forward)? - f(&backward)?) / (2.0 * h);
        jac.set_column(j, &column);
    }

    Ok(jac)
}

/// Scalar-input derivative df/du at `u` by central differences
pub fn central_derivative<const R: usize, F, E>(f: F, u: f64, h: f64) -> Result<SVector<f64, R>, E>
where
    F: Fn(f64) -> Result<SVector<f64, R>, E>,
{
    Ok((f(u + h)? - f(u - h)?) / (2.0 * h))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Matrix2, Vector2};
    use std::convert::Infallible;

    #[test]
    fn test_jacobian_of_linear_map_is_exact() {
        let a = Matrix2::new(1.0, -2.0, 0.5, 3.0);

        let jac: Matrix2<f64> =
            central_jacobian(|x: &Vector2<f64>| Ok::<_, Infallible>(a * x), &Vector2::new(0.3, -0.7), 1e-4)
                .unwrap();

        assert_relative_eq!(jac, a, epsilon = 1e-9);
    }

    #[test]
    fn test_jacobian_of_nonlinear_map() {
        // f(x, y) = [x·y, sin x]
        let x = Vector2::new(0.4, 2.0);

        let jac: Matrix2<f64> = central_jacobian(
            |v: &Vector2<f64>| Ok::<_, Infallible>(Vector2::new(v[0] * v[1], v[0].sin())),
            &x,
            1e-5,
        )
        .unwrap();

        let expected = Matrix2::new(2.0, 0.4, 0.4_f64.cos(), 0.0);
        assert_relative_eq!(jac, expected, epsilon = 1e-8);
    }

    #[test]
    fn test_scalar_derivative() {
        let d = central_derivative(|u| Ok::<_, Infallible>(Vector2::new(u * u, 3.0 * u)), 2.0, 1e-5)
            .unwrap();

        assert_relative_eq!(d, Vector2::new(4.0, 3.0), epsilon = 1e-8);
    }
}
