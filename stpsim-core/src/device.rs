//! Device trait, shared device state and capability traits

use bytes::Bytes;
use std::any::Any;
use std::fmt;

use crate::event::Event;
use crate::interface::Interface;
use crate::types::{DeviceKind, MacAddr, NetworkId, PortRole, PortState};
use crate::{Error, Result};

/// Per-callback handle a device uses to talk to the network
///
/// Frames queued with [`Context::send`] are delivered to the peer queue as
/// soon as the callback returns, in the order they were sent.
#[derive(Debug)]
pub struct Context {
    now: f64,
    device: String,
    outbox: Vec<(String, Bytes)>,
    events: Vec<Event>,
}

impl Context {
    pub fn new(now: f64, device: impl Into<String>) -> Self {
        Self {
            now,
            device: device.into(),
            outbox: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Simulated time of the current tick
    pub fn now(&self) -> f64 {
        self.now
    }

    /// Name of the device being driven
    pub fn device(&self) -> &str {
        &self.device
    }

    /// Send a frame out of `interface`; a no-op if it is not connected
    pub fn send(&mut self, interface: &str, frame: impl Into<Bytes>) {
        self.outbox.push((interface.to_string(), frame.into()));
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Tell observers this device's visible state changed
    pub fn changed(&mut self) {
        let device = self.device.clone();
        self.events.push(Event::Changed { device });
    }

    /// Frames sent so far during this callback
    pub fn sent(&self) -> &[(String, Bytes)] {
        &self.outbox
    }

    /// Events emitted so far during this callback
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub(crate) fn into_parts(self) -> (Vec<(String, Bytes)>, Vec<Event>) {
        (self.outbox, self.events)
    }
}

/// State every device variant carries: name, position and interfaces
#[derive(Debug, Clone)]
pub struct DeviceCore {
    name: String,
    /// Cosmetic canvas position
    position: (f64, f64),
    interfaces: Vec<Interface>,
    network: Option<NetworkId>,
}

impl DeviceCore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            position: (0.0, 0.0),
            interfaces: Vec::new(),
            network: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn position(&self) -> (f64, f64) {
        self.position
    }

    pub fn set_position(&mut self, x: f64, y: f64) {
        self.position = (x, y);
    }

    /// Network the device is attached to, if any
    pub fn network(&self) -> Option<NetworkId> {
        self.network
    }

    pub(crate) fn set_network(&mut self, network: Option<NetworkId>) {
        self.network = network;
    }

    /// Interfaces in insertion order
    pub fn interfaces(&self) -> &[Interface] {
        &self.interfaces
    }

    pub(crate) fn interfaces_mut(&mut self) -> &mut [Interface] {
        &mut self.interfaces
    }

    pub fn interface(&self, name: &str) -> Option<&Interface> {
        self.interfaces.iter().find(|i| i.name() == name)
    }

    pub fn interface_mut(&mut self, name: &str) -> Option<&mut Interface> {
        self.interfaces.iter_mut().find(|i| i.name() == name)
    }

    pub fn interface_names(&self) -> Vec<String> {
        self.interfaces.iter().map(|i| i.name().to_string()).collect()
    }

    /// Append an interface; its address must be unicast
    pub fn add_interface(&mut self, name: &str, mac: MacAddr) -> Result<()> {
        if !mac.is_unicast() {
            return Err(Error::invalid_address(format!(
                "{} on '{}.{}' is not a unicast address",
                mac, self.name, name
            )));
        }
        if self.interface(name).is_some() {
            return Err(Error::NameCollision(format!(
                "interface '{}' on device '{}'",
                name, self.name
            )));
        }
        self.interfaces.push(Interface::new(name, mac));
        Ok(())
    }

    /// Remove a disconnected interface
    pub fn remove_interface(&mut self, name: &str) -> Result<Interface> {
        let index = self
            .interfaces
            .iter()
            .position(|i| i.name() == name)
            .ok_or_else(|| Error::not_found(format!("interface '{}.{}'", self.name, name)))?;
        if self.interfaces[index].is_connected() {
            return Err(Error::AlreadyConnected(format!("{}.{}", self.name, name)));
        }
        Ok(self.interfaces.remove(index))
    }

    /// First unconnected interface not named in `skip`
    pub fn first_free_interface(&self, skip: Option<&str>) -> Option<&str> {
        self.interfaces
            .iter()
            .find(|i| !i.is_connected() && Some(i.name()) != skip)
            .map(|i| i.name())
    }

    /// Reset every interface queue
    pub fn reset_interfaces(&mut self) {
        for iface in self.interfaces.iter_mut() {
            iface.reset();
        }
    }
}

/// Behavior shared by every simulated device
pub trait Device: Send + fmt::Debug {
    fn kind(&self) -> DeviceKind;

    fn core(&self) -> &DeviceCore;

    fn core_mut(&mut self) -> &mut DeviceCore;

    fn name(&self) -> &str {
        self.core().name()
    }

    fn add_interface(&mut self, name: &str, mac: MacAddr) -> Result<()> {
        self.core_mut().add_interface(name, mac)
    }

    fn remove_interface(&mut self, name: &str) -> Result<Interface> {
        self.core_mut().remove_interface(name)
    }

    /// A frame was delivered on `ingress`
    fn on_frame(&mut self, ctx: &mut Context, ingress: &str, frame: Bytes);

    /// Periodic protocol and timer logic, run after interface delivery
    fn tick(&mut self, _ctx: &mut Context) {}

    /// Clear protocol state (tables, timers); configuration survives
    fn reset(&mut self) {}

    fn as_learning_bridge(&self) -> Option<&dyn LearningBridge> {
        None
    }

    fn as_spanning_tree(&self) -> Option<&dyn SpanningTreeParticipant> {
        None
    }

    fn as_spanning_tree_mut(&mut self) -> Option<&mut dyn SpanningTreeParticipant> {
        None
    }

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Devices that associate source addresses with ports
pub trait LearningBridge {
    /// Interface a MAC was learned on
    fn lookup(&self, mac: &MacAddr) -> Option<&str>;

    /// Every learned (MAC, interface) pair
    fn entries(&self) -> Vec<(MacAddr, String)>;
}

/// Devices running the spanning tree engine
pub trait SpanningTreeParticipant {
    fn bridge_priority(&self) -> u16;

    fn set_bridge_priority(&mut self, priority: u16);

    fn bridge_mac(&self) -> MacAddr;

    /// True when the best known root is this bridge
    fn is_root(&self) -> bool;

    fn root_port(&self) -> Option<&str>;

    fn port_role(&self, interface: &str) -> Option<PortRole>;

    fn port_state(&self, interface: &str) -> Option<PortState>;

    fn path_cost(&self, interface: &str) -> Option<u32>;

    fn set_path_cost(&mut self, interface: &str, cost: u32) -> Result<()>;

    /// Force the port to Disabled
    fn disable_port(&mut self, interface: &str) -> Result<()>;

    /// Reinitialize a disabled port
    fn enable_port(&mut self, interface: &str) -> Result<()>;
}
