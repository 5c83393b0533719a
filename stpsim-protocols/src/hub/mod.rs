//! Repeater hub: every frame goes out of every other interface

use bytes::Bytes;
use std::any::Any;
use tracing::trace;

use stpsim_core::{Context, Device, DeviceCore, DeviceKind, Result};

#[derive(Debug)]
pub struct Hub {
    core: DeviceCore,
}

impl Hub {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            core: DeviceCore::new(name),
        }
    }

    pub fn with_ports(name: impl Into<String>, ports: usize) -> Result<Self> {
        let mut hub = Self::new(name);
        crate::add_ports(&mut hub, ports)?;
        Ok(hub)
    }
}

impl Device for Hub {
    fn kind(&self) -> DeviceKind {
        DeviceKind::Hub
    }

    fn core(&self) -> &DeviceCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut DeviceCore {
        &mut self.core
    }

    fn on_frame(&mut self, ctx: &mut Context, ingress: &str, frame: Bytes) {
        trace!(device = %self.core.name(), port = %ingress, "Repeating frame");
        for iface in self.core.interfaces() {
            if iface.name() != ingress {
                ctx.send(iface.name(), frame.clone());
            }
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
