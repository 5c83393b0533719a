//! CLI interface for stpsim
//!
//! Argument parsing, the built-in demo scenarios and the tick loop that drives
//! a network on a manual clock.

pub mod args;
pub mod demo;
pub mod report;

pub use args::{Cli, Commands, SimArgs};
pub use report::PortTable;

use tracing::info;

use stpsim_core::{Error, ManualTime, Network, Result};
use stpsim_protocols::topology;

/// Start the clock and tick every `step` time units up to `until`
pub fn simulate(network: &mut Network, time: &ManualTime, until: f64, step: f64) -> Result<()> {
    if !step.is_finite() || step <= 0.0 {
        return Err(Error::InvalidSpeed(step));
    }
    if !network.is_running() {
        network.start()?;
    }
    loop {
        network.tick();
        if network.time() + step > until {
            break;
        }
        time.advance(step);
    }
    info!(time = network.time(), "Simulation finished");
    Ok(())
}

fn run(network: &mut Network, time: &ManualTime, sim: &SimArgs) -> Result<()> {
    simulate(network, time, sim.until, sim.step)?;
    print!("{}", PortTable(network));
    if let Some(path) = &sim.save {
        topology::save_file(network, path)?;
        info!(path = %path.display(), "Topology saved");
    }
    Ok(())
}

/// Execute a parsed command line
pub fn execute(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Run { topology: path, sim } => {
            let time = ManualTime::new();
            let mut network = Network::manual(sim.network_config(), &time)?;
            topology::load_file(&mut network, path)?;
            run(&mut network, &time, sim)
        }
        Commands::Demo { scenario, sim } => {
            let time = ManualTime::new();
            let mut network = Network::manual(sim.network_config(), &time)?;
            demo::build(*scenario, &mut network)?;
            run(&mut network, &time, sim)
        }
        Commands::SaveDemo { scenario, out } => {
            let mut network = Network::new();
            demo::build(*scenario, &mut network)?;
            topology::save_file(&network, out)?;
            println!("{:?} written to {}", scenario, out.display());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stpsim_core::{NetworkConfig, SpanningTreeParticipant};

    #[test]
    fn test_simulate_demo_pair() {
        let time = ManualTime::new();
        let mut net = Network::manual(NetworkConfig::default(), &time).unwrap();
        demo::build(demo::Scenario::Pair, &mut net).unwrap();
        simulate(&mut net, &time, 40.0, 1.0).unwrap();

        assert_eq!(net.time(), 40.0);
        let s2 = net.device("s2").unwrap().as_spanning_tree().unwrap();
        assert_eq!(s2.root_port(), Some("eth0"));
        assert!(PortTable(&net).to_string().contains("forwarding"));
    }

    #[test]
    fn test_simulate_rejects_bad_step() {
        let time = ManualTime::new();
        let mut net = Network::manual(NetworkConfig::default(), &time).unwrap();
        assert!(simulate(&mut net, &time, 10.0, 0.0).is_err());
    }
}
