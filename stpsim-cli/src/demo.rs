//! Built-in scenarios

use clap::ValueEnum;

use stpsim_core::{MacAddr, Network, Result};
use stpsim_protocols::{Host, StpSwitch};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Scenario {
    /// Three switches in a ring with a host on each of the lower two
    Triangle,
    /// One switch with two of its ports cabled together
    SelfLoop,
    /// Two switches on a single link
    Pair,
}

fn switch(name: &str, id: u8, ports: usize) -> Result<StpSwitch> {
    let mut switch = StpSwitch::with_ports(name, ports)?;
    switch.set_bridge_mac(MacAddr([0x02, 0, 0, 0, 0, id]))?;
    Ok(switch)
}

/// Add the scenario's devices and links to `network`
pub fn build(scenario: Scenario, network: &mut Network) -> Result<()> {
    match scenario {
        Scenario::Triangle => {
            network.add(switch("s1", 1, 2)?)?;
            network.add(switch("s2", 2, 3)?)?;
            network.add(switch("s3", 3, 3)?)?;
            network.add(Host::with_interface("h1")?)?;
            network.add(Host::with_interface("h2")?)?;
            network.add_link(("s1", "eth0"), ("s2", "eth0"))?;
            network.add_link(("s1", "eth1"), ("s3", "eth0"))?;
            network.add_link(("s2", "eth1"), ("s3", "eth1"))?;
            network.add_link(("h1", "eth0"), ("s2", "eth2"))?;
            network.add_link(("h2", "eth0"), ("s3", "eth2"))?;
        }
        Scenario::SelfLoop => {
            network.add(switch("s1", 1, 2)?)?;
            network.add_link(("s1", "eth0"), ("s1", "eth1"))?;
        }
        Scenario::Pair => {
            network.add(switch("s1", 1, 1)?)?;
            network.add(switch("s2", 2, 1)?)?;
            network.add_link(("s1", "eth0"), ("s2", "eth0"))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenarios_build() {
        for (scenario, devices, links) in [
            (Scenario::Triangle, 5, 5),
            (Scenario::SelfLoop, 1, 1),
            (Scenario::Pair, 2, 1),
        ] {
            let mut net = Network::new();
            build(scenario, &mut net).unwrap();
            assert_eq!(net.len(), devices, "{:?}", scenario);
            assert_eq!(net.links().len(), links, "{:?}", scenario);
        }
    }
}
