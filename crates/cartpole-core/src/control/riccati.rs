//! Continuous-time algebraic Riccati equation
//!
//! Solves
//!
//! AᵀP + PA − PBR⁻¹BᵀP + Q = 0
//!
//! for the unique stabilizing symmetric solution P via the matrix sign
//! function of the Hamiltonian
//!
//! H = [  A   −BR⁻¹Bᵀ ]
//!     [ −Q     −Aᵀ   ]
//!
//! The stable invariant subspace of H is ker(sign(H) + I) and is spanned by
//! the columns of [I; P]. The sign iteration uses determinant scaling and
//! converges quadratically; it fails only when H has eigenvalues on the
//! imaginary axis, i.e. when (A, B) is not stabilizable or (A, Q^½) is not
//! detectable. The result is verified by its residual and by the
//! eigenvalues of A − BK, computed from nalgebra's real Schur form.

use nalgebra::{Complex, DMatrix};

use crate::error::{CartPoleError, Result};
use crate::{InputMatrix, StateMatrix};

/// Maximum sign-function iterations
const MAX_SIGN_ITERATIONS: usize = 100;

/// Relative step size at which the sign iteration has converged
const SIGN_TOLERANCE: f64 = 1e-12;

/// Singular values below this (relative) are treated as zero
const SUBSPACE_RANK_TOLERANCE: f64 = 1e-10;

/// Largest admissible relative residual of the returned solution
const RESIDUAL_TOLERANCE: f64 = 1e-8;

/// Stabilizing solution of a CARE with diagnostics
#[derive(Debug, Clone, PartialEq)]
pub struct CareSolution<M> {
    /// Symmetric positive-semidefinite solution P
    pub p: M,
    /// Eigenvalues of the closed loop A − BR⁻¹BᵀP
    pub closed_loop_poles: Vec<Complex<f64>>,
    /// Sign-function iterations used
    pub iterations: usize,
    /// Relative residual ‖AᵀP + PA − PGP + Q‖ / (1 + ‖Q‖ + ‖P‖)
    pub residual: f64,
}

/// Solve the CARE for the 4-state, single-input cart-pole plant
///
/// # Arguments
/// * `a` - State matrix (4×4)
/// * `b` - Input matrix (4×1)
/// * `q` - State weight (4×4, symmetric positive semidefinite)
/// * `r` - Input weight (scalar, positive)
pub fn solve_care(
    a: &StateMatrix,
    b: &InputMatrix,
    q: &StateMatrix,
    r: f64,
) -> Result<CareSolution<StateMatrix>> {
    if !r.is_finite() || r <= 0.0 {
        return Err(CartPoleError::riccati(format!("input weight R = {r} must be positive")));
    }

    let solution = solve_care_dyn(
        &DMatrix::from_column_slice(4, 4, a.as_slice()),
        &DMatrix::from_column_slice(4, 1, b.as_slice()),
        &DMatrix::from_column_slice(4, 4, q.as_slice()),
        &DMatrix::from_element(1, 1, r),
    )?;

    Ok(CareSolution {
        p: StateMatrix::from_fn(|i, j| solution.p[(i, j)]),
        closed_loop_poles: solution.closed_loop_poles,
        iterations: solution.iterations,
        residual: solution.residual,
    })
}

/// Solve the CARE for arbitrary dimensions
///
/// `a` is n×n, `b` is n×m, `q` is n×n and `r` is m×m positive definite.
pub fn solve_care_dyn(
    a: &DMatrix<f64>,
    b: &DMatrix<f64>,
    q: &DMatrix<f64>,
    r: &DMatrix<f64>,
) -> Result<CareSolution<DMatrix<f64>>> {
    let n = a.nrows();
    check_dimensions(a, b, q, r)?;

    if ![a, b, q, r].iter().all(|m| m.iter().all(|v| v.is_finite())) {
        return Err(CartPoleError::riccati("matrices contain non-finite entries"));
    }

    let r_inv = r
        .clone()
        .cholesky()
        .ok_or_else(|| CartPoleError::riccati("R must be symmetric positive definite"))?
        .inverse();

    let q_min = q.clone().symmetric_eigen().eigenvalues.min();
    if q_min < -1e-12 * q.norm().max(1.0) {
        return Err(CartPoleError::riccati(format!(
            "Q must be positive semidefinite (min eigenvalue {q_min:e})"
        )));
    }

    let g = b * &r_inv * b.transpose();
    let hamiltonian = hamiltonian(a, &g, q);
    let (sign, iterations) = matrix_sign(&hamiltonian)?;

    // (sign(H) + I)·[I; P] = 0  =>  [W12; W22 + I]·P = −[W11 + I; W21]
    let lhs = DMatrix::from_fn(2 * n, n, |i, j| {
        sign[(i, n + j)] + if i >= n && i - n == j { 1.0 } else { 0.0 }
    });
    let rhs = DMatrix::from_fn(2 * n, n, |i, j| {
        -(sign[(i, j)] + if i == j { 1.0 } else { 0.0 })
    });

    let svd = lhs.svd(true, true);
    let sigma_max = svd.singular_values.max();
    let sigma_min = svd.singular_values.min();
    if sigma_max <= 0.0 || sigma_min / sigma_max < SUBSPACE_RANK_TOLERANCE {
        return Err(CartPoleError::riccati(
            "stable invariant subspace is not complementary (plant not stabilizable or not detectable)",
        ));
    }
    let p = svd
        .solve(&rhs, SUBSPACE_RANK_TOLERANCE * sigma_max)
        .map_err(CartPoleError::riccati)?;
    let p = (&p + p.transpose()) * 0.5;

    if !p.iter().all(|v| v.is_finite()) {
        return Err(CartPoleError::riccati("solution contains non-finite entries"));
    }

    let residual_matrix = a.transpose() * &p + &p * a - &p * &g * &p + q;
    let residual = residual_matrix.norm() / (1.0 + q.norm() + p.norm());
    if residual > RESIDUAL_TOLERANCE {
        return Err(CartPoleError::riccati(format!(
            "solution residual {residual:e} exceeds tolerance"
        )));
    }

    let closed_loop = a - &g * &p;
    let closed_loop_poles: Vec<Complex<f64>> =
        closed_loop.complex_eigenvalues().iter().copied().collect();
    if let Some(pole) = closed_loop_poles.iter().find(|pole| pole.re >= 0.0) {
        return Err(CartPoleError::riccati(format!(
            "closed loop is not asymptotically stable (pole {pole})"
        )));
    }

    Ok(CareSolution {
        p,
        closed_loop_poles,
        iterations,
        residual,
    })
}

fn check_dimensions(
    a: &DMatrix<f64>,
    b: &DMatrix<f64>,
    q: &DMatrix<f64>,
    r: &DMatrix<f64>,
) -> Result<()> {
    let n = a.nrows();
    let m = b.ncols();
    let ok = a.is_square()
        && n > 0
        && b.nrows() == n
        && q.shape() == (n, n)
        && r.shape() == (m, m)
        && m > 0;
    if ok {
        Ok(())
    } else {
        Err(CartPoleError::riccati(format!(
            "inconsistent dimensions: A {:?}, B {:?}, Q {:?}, R {:?}",
            a.shape(),
            b.shape(),
            q.shape(),
            r.shape()
        )))
    }
}

/// H = [A, −G; −Q, −Aᵀ]
fn hamiltonian(a: &DMatrix<f64>, g: &DMatrix<f64>, q: &DMatrix<f64>) -> DMatrix<f64> {
    let n = a.nrows();
    DMatrix::from_fn(2 * n, 2 * n, |i, j| match (i < n, j < n) {
        (true, true) => a[(i, j)],
        (true, false) => -g[(i, j - n)],
        (false, true) => -q[(i - n, j)],
        (false, false) => -a[(j - n, i - n)],
    })
}

/// Matrix sign function by the scaled Newton iteration
///
/// Z₊ = ½ (Z/c + c·Z⁻¹),  c = |det Z|^(1/n)
fn matrix_sign(h: &DMatrix<f64>) -> Result<(DMatrix<f64>, usize)> {
    let dim = h.nrows() as f64;
    let mut z = h.clone();

    for iteration in 1..=MAX_SIGN_ITERATIONS {
        let lu = z.clone().lu();

        // log|det Z| from the LU diagonal avoids overflow in the scaling
        let diagonal = lu.u().diagonal();
        if diagonal.iter().any(|u| *u == 0.0 || !u.is_finite()) {
            return Err(CartPoleError::riccati(
                "Hamiltonian has eigenvalues on the imaginary axis",
            ));
        }
        let log_det: f64 = diagonal.iter().map(|u| u.abs().ln()).sum();
        let scale = (log_det / dim).exp();

        let z_inv = lu.try_inverse().ok_or_else(|| {
            CartPoleError::riccati("Hamiltonian has eigenvalues on the imaginary axis")
        })?;

        let next = (&z / scale + z_inv * scale) * 0.5;
        let step = (&next - &z).norm();
        z = next;

        if !step.is_finite() {
            return Err(CartPoleError::riccati("sign iteration diverged"));
        }
        if step <= SIGN_TOLERANCE * z.norm() {
            return Ok((z, iteration));
        }
    }

    Err(CartPoleError::riccati(format!(
        "sign iteration did not converge in {MAX_SIGN_ITERATIONS} iterations"
    )))
}
