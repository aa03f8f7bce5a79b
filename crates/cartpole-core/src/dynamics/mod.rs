//! Dynamics models for the cart-pole
//!
//! - Physical parameters (primitive constants + derived rigid-body quantities)
//! - Nonlinear Lagrangian equations of motion and their linearization

pub mod params;
pub mod cart_pole;

pub use params::*;
pub use cart_pole::*;
