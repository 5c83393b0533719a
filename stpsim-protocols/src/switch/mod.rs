//! Learning switch
//!
//! Learns the source address of every frame against its ingress interface,
//! sends frames for known unicast destinations out of that interface only,
//! and floods everything else.

pub mod table;

pub use table::MacTable;

use bytes::Bytes;
use std::any::Any;
use tracing::{debug, warn};

use stpsim_core::{
    Context, Device, DeviceCore, DeviceKind, Interface, LearningBridge, MacAddr, Result,
};
use stpsim_packet::peek_addresses;

/// Transparent learning bridge
#[derive(Debug)]
pub struct Switch {
    core: DeviceCore,
    table: MacTable,
}

impl Switch {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            core: DeviceCore::new(name),
            table: MacTable::new(),
        }
    }

    /// Switch with `ports` interfaces named eth0, eth1, ...
    pub fn with_ports(name: impl Into<String>, ports: usize) -> Result<Self> {
        let mut switch = Self::new(name);
        crate::add_ports(&mut switch, ports)?;
        Ok(switch)
    }

    pub fn table(&self) -> &MacTable {
        &self.table
    }
}

impl Device for Switch {
    fn kind(&self) -> DeviceKind {
        DeviceKind::Switch
    }

    fn core(&self) -> &DeviceCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut DeviceCore {
        &mut self.core
    }

    fn remove_interface(&mut self, name: &str) -> Result<Interface> {
        let iface = self.core.remove_interface(name)?;
        self.table.forget_interface(name);
        Ok(iface)
    }

    fn on_frame(&mut self, ctx: &mut Context, ingress: &str, frame: Bytes) {
        let (dst, src) = match peek_addresses(&frame) {
            Ok(addrs) => addrs,
            Err(e) => {
                warn!(device = %self.core.name(), port = %ingress, error = %e, "Dropping malformed frame");
                return;
            }
        };

        if self.table.learn(src, ingress) {
            debug!(device = %self.core.name(), mac = %src, port = %ingress, "Learned address");
            ctx.changed();
        }

        let ports = self.core.interfaces().iter().map(|i| i.name());
        for egress in self.table.egress(&dst, ingress, ports) {
            ctx.send(&egress, frame.clone());
        }
    }

    fn reset(&mut self) {
        self.table.clear();
    }

    fn as_learning_bridge(&self) -> Option<&dyn LearningBridge> {
        Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl LearningBridge for Switch {
    fn lookup(&self, mac: &MacAddr) -> Option<&str> {
        self.table.lookup(mac)
    }

    fn entries(&self) -> Vec<(MacAddr, String)> {
        self.table.entries()
    }
}
