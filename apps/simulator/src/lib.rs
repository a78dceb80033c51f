//! Scripted driver for the in-call proximity policy.
//!
//! Wires a [`ProximitySession`](nearcall_policy::ProximitySession) to
//! simulated devices, replays a scenario step by step and prints every
//! actuator call the policy makes.

mod devices;
mod runner;
mod scenario;

pub use devices::{ActuatorCall, Transcript};
pub use runner::Simulation;
pub use scenario::{Scenario, ScenarioError, ScenarioStep};

use std::path::Path;

use anyhow::Context;

/// Run the scenario at `path`, or the built-in one when `None`.
pub async fn run(path: Option<String>) -> anyhow::Result<()> {
    let scenario = match &path {
        Some(path) => Scenario::load(Path::new(path))
            .with_context(|| format!("failed to load scenario {path}"))?,
        None => Scenario::builtin()?,
    };

    println!("=== {} ===", scenario.name);
    tracing::info!(
        name = %scenario.name,
        steps = scenario.steps.len(),
        sensor = scenario.has_proximity_sensor,
        "running scenario"
    );

    let simulation = Simulation::new(&scenario)?;
    simulation.run(&scenario.steps).await;

    let transcript = simulation.transcript();
    println!("\n{} actuator calls.", transcript.len());
    Ok(())
}
