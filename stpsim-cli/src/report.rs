//! Plain-text port tables

use std::fmt;

use stpsim_core::Network;
use stpsim_protocols::stp::Identifier;

/// Role, state and cost of every spanning tree port in a network
pub struct PortTable<'a>(pub &'a Network);

impl fmt::Display for PortTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "t = {:.1}", self.0.time())?;
        for device in self.0.devices() {
            let Some(stp) = device.as_spanning_tree() else {
                continue;
            };
            let bridge = Identifier::new(stp.bridge_priority(), stp.bridge_mac());
            let root = if stp.is_root() { ", root" } else { "" };
            writeln!(f, "{} (bridge {}{})", device.name(), bridge, root)?;
            writeln!(f, "  {:<8} {:<11} {:<11} {:>5}", "PORT", "ROLE", "STATE", "COST")?;
            for iface in device.core().interface_names() {
                let role = stp.port_role(&iface).map(|r| r.to_string()).unwrap_or_default();
                let state = stp.port_state(&iface).map(|s| s.to_string()).unwrap_or_default();
                let cost = stp.path_cost(&iface).unwrap_or_default();
                writeln!(f, "  {:<8} {:<11} {:<11} {:>5}", iface, role, state, cost)?;
            }
        }
        Ok(())
    }
}
