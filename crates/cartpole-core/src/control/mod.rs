//! Control algorithms for the cart-pole
//!
//! - Continuous-time algebraic Riccati equation (CARE) solver
//! - LQR gain synthesis from the linearized plant
//! - State-feedback controller u = −K·(x − x_target)

pub mod riccati;
pub mod lqr;
pub mod controller;

pub use riccati::*;
pub use lqr::*;
pub use controller::*;
