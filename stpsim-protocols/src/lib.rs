//! Simulated devices for stpsim
//!
//! Every device implements [`stpsim_core::Device`] and is driven by
//! [`stpsim_core::Network::tick`].
//!
//! ## Available Devices
//!
//! ### Hub
//! Repeats every frame on all other interfaces. See [`hub`].
//!
//! ### Switch
//! Transparent learning bridge. See [`switch`].
//!
//! ### STP Switch
//! Learning bridge running IEEE 802.1D spanning tree. See [`stp`].
//!
//! ### Host
//! End station able to run an LLC TEST connectivity check. See [`host`].
//!
//! Topologies are saved and loaded as JSON through [`topology`].

pub mod host;
pub mod hub;
pub mod stp;
pub mod switch;
pub mod timer;
pub mod topology;

pub use host::Host;
pub use hub::Hub;
pub use stp::{StpSwitch, StpTimers};
pub use switch::Switch;
pub use topology::TopologyFile;

use stpsim_core::{Device, MacAddr, Result};

/// Name of the `index`-th generated port
pub fn port_name(index: usize) -> String {
    format!("eth{}", index)
}

/// Give `device` `count` more interfaces with random unicast addresses
///
/// Names continue after the interfaces the device already has.
pub fn add_ports<D: Device + ?Sized>(device: &mut D, count: usize) -> Result<()> {
    let first = device.core().interfaces().len();
    for index in first..first + count {
        device.add_interface(&port_name(index), MacAddr::random_unicast())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_ports_continues_numbering() {
        let mut hub = Hub::with_ports("hub", 2).unwrap();
        add_ports(&mut hub, 2).unwrap();
        assert_eq!(
            hub.core().interface_names(),
            vec!["eth0", "eth1", "eth2", "eth3"]
        );
    }

    #[test]
    fn test_add_ports_reaches_stp_ports() {
        let switch = StpSwitch::with_ports("s1", 3).unwrap();
        assert_eq!(switch.ports().len(), 3);
    }
}
