//! Simulation framework for the cart-pole
//!
//! Fixed-step loop that hosts (renderers, plotters, dashboards) drive at
//! the sampling rate: controller action plus external disturbance,
//! RK4 step, bounded history for live plots.

pub mod simulator;
pub mod config;
pub mod sensors;

pub use simulator::*;
pub use config::*;
pub use sensors::*;
