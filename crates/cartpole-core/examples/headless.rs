//! Headless cart-pole run
//!
//! Balances the pole from the default 0.1 rad tilt, pushes the cart
//! halfway through, then changes the pole length and lets the controller
//! recover with the recomputed gains.
//!
//! Run with: cargo run -p cartpole-core --example headless

use cartpole_core::idx;
use cartpole_core::simulation::{SimConfig, Simulator};
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::FmtSubscriber;

fn main() -> cartpole_core::Result<()> {
    tracing::subscriber::set_global_default(
        FmtSubscriber::builder()
            .with_max_level(LevelFilter::DEBUG)
            .finish(),
    )
    .expect("failed to install tracing subscriber");

    let config = SimConfig::default();
    let report_every = (0.5 / config.dt).round() as usize;
    let mut sim = Simulator::new(config)?;

    sim.start();
    let mut n = 0;
    while sim.time() < 5.0 {
        if n == 125 {
            info!("pushing cart right");
            sim.push_right();
        }
        if n == 130 {
            sim.release();
        }

        if let Some(step) = sim.tick()? {
            if n % report_every == 0 {
                info!(
                    t = step.time,
                    theta = step.state[idx::THETA],
                    x = step.state[idx::X],
                    u = step.control_force + step.disturbance,
                    "state"
                );
            }
        }
        n += 1;
    }

    let gains = sim.update_physics(|c| c.pole_length = 0.5)?;
    info!(k = ?gains.k, "pole lengthened to 0.5 m");

    sim.run_for(5.0)?;
    let state = sim.state();
    info!(
        t = sim.time(),
        theta = state[idx::THETA],
        x = state[idx::X],
        samples = sim.history().len(),
        "done"
    );

    Ok(())
}
