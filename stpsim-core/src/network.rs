//! Network: devices, links, simulated clock and the tick loop

use bytes::Bytes;
use std::collections::HashMap;
use tracing::{debug, info, trace, warn};

use crate::clock::{Clock, ManualTime, SystemTimeSource, TimeSource};
use crate::device::{Context, Device};
use crate::event::{Direction, Event, EventBus, Observation, SubscriptionId};
use crate::interface::QueueDiscipline;
use crate::types::{MacAddr, NetworkId, PortRef};
use crate::{Error, Result};

/// Configuration for a network
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Receive queue drain order
    pub queue_discipline: QueueDiscipline,
    /// Initial clock speed multiplier
    pub speed: f64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            queue_discipline: QueueDiscipline::default(),
            speed: 1.0,
        }
    }
}

/// A set of devices joined by point-to-point links, driven by [`Network::tick`]
#[derive(Debug)]
pub struct Network {
    id: NetworkId,
    config: NetworkConfig,
    devices: HashMap<String, Box<dyn Device>>,
    /// Device names in insertion order
    order: Vec<String>,
    clock: Clock,
    events: EventBus,
}

impl Network {
    /// Network on the wall clock with default configuration
    pub fn new() -> Self {
        Self {
            id: NetworkId::next(),
            config: NetworkConfig::default(),
            devices: HashMap::new(),
            order: Vec::new(),
            clock: Clock::new(Box::new(SystemTimeSource::new())),
            events: EventBus::new(),
        }
    }

    /// Network reading time from `source`
    pub fn with_source(config: NetworkConfig, source: Box<dyn TimeSource>) -> Result<Self> {
        let mut clock = Clock::new(source);
        clock.set_speed(config.speed)?;
        Ok(Self {
            id: NetworkId::next(),
            config,
            devices: HashMap::new(),
            order: Vec::new(),
            clock,
            events: EventBus::new(),
        })
    }

    /// Network driven by a [`ManualTime`] handle the caller keeps
    pub fn manual(config: NetworkConfig, time: &ManualTime) -> Result<Self> {
        Self::with_source(config, Box::new(time.clone()))
    }

    pub fn id(&self) -> NetworkId {
        self.id
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    // ----- clock -----

    pub fn time(&self) -> f64 {
        self.clock.time()
    }

    pub fn is_running(&self) -> bool {
        self.clock.is_running()
    }

    pub fn start(&mut self) -> Result<()> {
        self.clock.start()?;
        let at = self.clock.time();
        info!(network = %self.id, at, "Network started");
        self.events.emit(&Event::ClockStarted { at });
        Ok(())
    }

    pub fn stop(&mut self) -> Result<()> {
        self.clock.stop()?;
        self.stopped(self.clock.time());
        Ok(())
    }

    fn stopped(&mut self, at: f64) {
        info!(network = %self.id, at, "Network stopped");
        self.events.emit(&Event::ClockStopped { at });
    }

    pub fn speed(&self) -> f64 {
        self.clock.speed()
    }

    pub fn set_speed(&mut self, speed: f64) -> Result<()> {
        self.clock.set_speed(speed)?;
        debug!(network = %self.id, speed, "Clock speed changed");
        Ok(())
    }

    /// Stop the clock, zero it, and reset every device and interface
    pub fn reset(&mut self) {
        let was_running = self.clock.is_running();
        let at = self.clock.time();
        self.clock.reset();
        if was_running {
            self.stopped(at);
        }
        for name in &self.order {
            if let Some(device) = self.devices.get_mut(name) {
                device.reset();
                device.core_mut().reset_interfaces();
            }
        }
        info!(network = %self.id, "Network reset");
        self.events.emit(&Event::Reset);
    }

    // ----- events -----

    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&Event) + Send + 'static,
    {
        self.events.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    // ----- devices -----

    /// Attach a device; its name must be unused in this network
    pub fn add_device(&mut self, mut device: Box<dyn Device>) -> Result<()> {
        let name = device.name().to_string();
        if self.devices.contains_key(&name) {
            warn!(device = %name, "Device name already used");
            return Err(Error::NameCollision(format!("device '{}'", name)));
        }
        if let Some(other) = device.core().network() {
            return Err(Error::CrossNetwork(format!(
                "device '{}' already belongs to {}",
                name, other
            )));
        }
        if device.core().interfaces().iter().any(|i| i.is_connected()) {
            return Err(Error::AlreadyConnected(format!(
                "an interface of device '{}'",
                name
            )));
        }

        device.core_mut().set_network(Some(self.id));
        info!(device = %name, kind = %device.kind(), "Device added");
        self.devices.insert(name.clone(), device);
        self.order.push(name.clone());
        self.events.emit(&Event::DeviceAdded { device: name });
        Ok(())
    }

    /// Convenience wrapper around [`Network::add_device`]
    pub fn add<D: Device + 'static>(&mut self, device: D) -> Result<()> {
        self.add_device(Box::new(device))
    }

    /// Disconnect every interface of the device, then detach and return it
    pub fn remove_device(&mut self, name: &str) -> Result<Box<dyn Device>> {
        let connected: Vec<String> = self
            .device(name)?
            .core()
            .interfaces()
            .iter()
            .filter(|i| i.is_connected())
            .map(|i| i.name().to_string())
            .collect();
        for iface in connected {
            let port = PortRef::new(self.id, name, iface);
            // a self-link may already have been torn down from the other end
            if self.is_connected(&port) {
                self.disconnect(&port)?;
            }
        }

        let mut device = self
            .devices
            .remove(name)
            .ok_or_else(|| Error::not_found(format!("device '{}'", name)))?;
        self.order.retain(|n| n != name);
        device.core_mut().set_network(None);
        info!(device = %name, "Device removed");
        self.events.emit(&Event::DeviceRemoved {
            device: name.to_string(),
        });
        Ok(device)
    }

    /// Remove every device
    pub fn clear(&mut self) {
        for name in std::mem::take(&mut self.order) {
            if let Some(mut device) = self.devices.remove(&name) {
                for iface in device.core_mut().interfaces_mut() {
                    iface.set_peer(None);
                }
                device.core_mut().set_network(None);
                self.events.emit(&Event::DeviceRemoved { device: name });
            }
        }
        info!(network = %self.id, "Network cleared");
    }

    pub fn contains(&self, name: &str) -> bool {
        self.devices.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Device names in insertion order
    pub fn device_names(&self) -> &[String] {
        &self.order
    }

    /// Devices in insertion order
    pub fn devices(&self) -> impl Iterator<Item = &dyn Device> + '_ {
        self.order
            .iter()
            .filter_map(move |name| self.devices.get(name).map(|d| d.as_ref()))
    }

    pub fn device(&self, name: &str) -> Result<&dyn Device> {
        self.devices
            .get(name)
            .map(|d| d.as_ref())
            .ok_or_else(|| Error::not_found(format!("device '{}'", name)))
    }

    pub fn device_mut(&mut self, name: &str) -> Result<&mut dyn Device> {
        self.devices
            .get_mut(name)
            .map(|d| -> &mut dyn Device { d.as_mut() })
            .ok_or_else(|| Error::not_found(format!("device '{}'", name)))
    }

    /// Borrow a device as its concrete type
    pub fn downcast<D: Device + 'static>(&self, name: &str) -> Result<&D> {
        self.device(name)?
            .as_any()
            .downcast_ref::<D>()
            .ok_or_else(|| wrong_kind::<D>(name))
    }

    pub fn downcast_mut<D: Device + 'static>(&mut self, name: &str) -> Result<&mut D> {
        self.device_mut(name)?
            .as_any_mut()
            .downcast_mut::<D>()
            .ok_or_else(|| wrong_kind::<D>(name))
    }

    /// Run an operator action on a device with a send context
    ///
    /// Frames the action sends are delivered like frames sent during a tick.
    pub fn invoke<D, R, F>(&mut self, name: &str, action: F) -> Result<R>
    where
        D: Device + 'static,
        F: FnOnce(&mut D, &mut Context) -> R,
    {
        let now = self.clock.time();
        let device = self
            .devices
            .get_mut(name)
            .ok_or_else(|| Error::not_found(format!("device '{}'", name)))?
            .as_any_mut()
            .downcast_mut::<D>()
            .ok_or_else(|| wrong_kind::<D>(name))?;
        let mut ctx = Context::new(now, name);
        let result = action(device, &mut ctx);
        self.flush(name, ctx, now);
        Ok(result)
    }

    // ----- interfaces and links -----

    pub fn add_interface(&mut self, device: &str, name: &str, mac: MacAddr) -> Result<()> {
        self.device_mut(device)?.add_interface(name, mac)?;
        self.events.emit(&Event::Changed {
            device: device.to_string(),
        });
        Ok(())
    }

    /// Disconnect the interface if needed, then remove it from its device
    pub fn remove_interface(&mut self, device: &str, name: &str) -> Result<()> {
        let port = self.port(device, name)?;
        if self.is_connected(&port) {
            self.disconnect(&port)?;
        }
        self.device_mut(device)?.remove_interface(name)?;
        self.events.emit(&Event::Changed {
            device: device.to_string(),
        });
        Ok(())
    }

    /// Reference to an existing interface of this network
    pub fn port(&self, device: &str, interface: &str) -> Result<PortRef> {
        let dev = self.device(device)?;
        if dev.core().interface(interface).is_none() {
            return Err(Error::not_found(format!(
                "interface '{}.{}'",
                device, interface
            )));
        }
        Ok(PortRef::new(self.id, device, interface))
    }

    /// Peer of an interface, if connected
    pub fn peer(&self, port: &PortRef) -> Result<Option<PortRef>> {
        self.check_owned(port)?;
        let iface = self
            .device(&port.device)?
            .core()
            .interface(&port.interface)
            .ok_or_else(|| Error::not_found(format!("interface '{}'", port)))?;
        Ok(iface.peer().cloned())
    }

    fn is_connected(&self, port: &PortRef) -> bool {
        matches!(self.peer(port), Ok(Some(_)))
    }

    fn check_owned(&self, port: &PortRef) -> Result<()> {
        if port.network != self.id {
            return Err(Error::CrossNetwork(format!(
                "{} belongs to {}, not {}",
                port, port.network, self.id
            )));
        }
        Ok(())
    }

    /// Join two interfaces
    pub fn connect(&mut self, a: &PortRef, b: &PortRef) -> Result<()> {
        self.check_owned(a)?;
        self.check_owned(b)?;
        if a == b {
            return Err(Error::SelfConnect(a.to_string()));
        }
        if self.peer(a)?.is_some() {
            return Err(Error::AlreadyConnected(a.to_string()));
        }
        if self.peer(b)?.is_some() {
            return Err(Error::AlreadyConnected(b.to_string()));
        }

        self.set_peer(a, Some(b.clone()))?;
        self.set_peer(b, Some(a.clone()))?;
        info!(a = %a, b = %b, "Link up");
        self.events.emit(&Event::LinkUp {
            a: a.clone(),
            b: b.clone(),
        });
        Ok(())
    }

    /// Tear down the link `port` is part of; returns the former peer
    pub fn disconnect(&mut self, port: &PortRef) -> Result<PortRef> {
        let peer = self
            .peer(port)?
            .ok_or_else(|| Error::NotConnected(port.to_string()))?;
        self.set_peer(port, None)?;
        self.set_peer(&peer, None)?;
        info!(a = %port, b = %peer, "Link down");
        self.events.emit(&Event::LinkDown {
            a: port.clone(),
            b: peer.clone(),
        });
        Ok(peer)
    }

    fn set_peer(&mut self, port: &PortRef, peer: Option<PortRef>) -> Result<()> {
        let iface = self
            .device_mut(&port.device)?
            .core_mut()
            .interface_mut(&port.interface)
            .ok_or_else(|| Error::not_found(format!("interface '{}'", port)))?;
        iface.set_peer(peer);
        Ok(())
    }

    /// Connect two named interfaces
    pub fn add_link(&mut self, a: (&str, &str), b: (&str, &str)) -> Result<()> {
        let a = self.port(a.0, a.1)?;
        let b = self.port(b.0, b.1)?;
        self.connect(&a, &b)
    }

    /// Connect the first free interface of each device
    ///
    /// Linking a device to itself uses two distinct free interfaces.
    pub fn link_devices(&mut self, first: &str, second: &str) -> Result<(PortRef, PortRef)> {
        let a = self
            .device(first)?
            .core()
            .first_free_interface(None)
            .ok_or_else(|| Error::not_found(format!("free interface on device '{}'", first)))?
            .to_string();
        let skip = if first == second { Some(a.as_str()) } else { None };
        let b = self
            .device(second)?
            .core()
            .first_free_interface(skip)
            .ok_or_else(|| Error::not_found(format!("free interface on device '{}'", second)))?
            .to_string();

        let a = PortRef::new(self.id, first, a);
        let b = PortRef::new(self.id, second, b);
        self.connect(&a, &b)?;
        Ok((a, b))
    }

    /// Disconnect a specific pair of interfaces
    pub fn remove_link(&mut self, a: (&str, &str), b: (&str, &str)) -> Result<()> {
        let a = self.port(a.0, a.1)?;
        let b = self.port(b.0, b.1)?;
        match self.peer(&a)? {
            Some(peer) if peer == b => {
                self.disconnect(&a)?;
                Ok(())
            }
            _ => Err(Error::NotConnected(format!("{} to {}", a, b))),
        }
    }

    /// Disconnect every link between two devices; returns how many were removed
    pub fn unlink_devices(&mut self, first: &str, second: &str) -> Result<usize> {
        self.device(second)?;
        let linked: Vec<String> = self
            .device(first)?
            .core()
            .interfaces()
            .iter()
            .filter(|i| i.peer().map(|p| p.device == second).unwrap_or(false))
            .map(|i| i.name().to_string())
            .collect();

        let mut removed = 0;
        for iface in linked {
            let port = PortRef::new(self.id, first, iface);
            if self.is_connected(&port) {
                self.disconnect(&port)?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Every link, listed once, in device/interface insertion order
    pub fn links(&self) -> Vec<(PortRef, PortRef)> {
        let mut seen: Vec<(PortRef, PortRef)> = Vec::new();
        for device in self.devices() {
            for iface in device.core().interfaces() {
                if let Some(peer) = iface.peer() {
                    let here = PortRef::new(self.id, device.name(), iface.name());
                    if !seen.iter().any(|(a, b)| *a == *peer && *b == here) {
                        seen.push((here, peer.clone()));
                    }
                }
            }
        }
        seen
    }

    // ----- simulation -----

    /// One unit of simulated progress
    ///
    /// For every device in insertion order, each interface in insertion order
    /// delivers at most one queued frame, then the device runs its own tick.
    pub fn tick(&mut self) {
        let now = self.clock.time();
        let discipline = self.config.queue_discipline;

        for index in 0..self.order.len() {
            let name = self.order[index].clone();
            let interfaces = match self.devices.get(&name) {
                Some(device) => device.core().interface_names(),
                None => continue,
            };

            for iface in interfaces {
                let Some(device) = self.devices.get_mut(&name) else {
                    break;
                };
                let Some(frame) = device
                    .core_mut()
                    .interface_mut(&iface)
                    .and_then(|i| i.dequeue(discipline))
                else {
                    continue;
                };

                trace!(device = %name, port = %iface, len = frame.len(), "Frame delivered");
                self.events.emit(&Event::PacketReceived(Observation {
                    timestamp: now,
                    device: name.clone(),
                    interface: iface.clone(),
                    direction: Direction::Ingoing,
                    data: frame.clone(),
                }));

                let mut ctx = Context::new(now, name.as_str());
                device.on_frame(&mut ctx, &iface, frame);
                self.flush(&name, ctx, now);
            }

            if let Some(device) = self.devices.get_mut(&name) {
                let mut ctx = Context::new(now, name.as_str());
                device.tick(&mut ctx);
                self.flush(&name, ctx, now);
            }
        }
    }

    /// Deliver what a device sent during a callback, then publish its events
    fn flush(&mut self, sender: &str, ctx: Context, now: f64) {
        let (outbox, events) = ctx.into_parts();
        for (iface, frame) in outbox {
            self.transmit(sender, &iface, frame, now);
        }
        for event in events {
            self.events.emit(&event);
        }
    }

    fn transmit(&mut self, sender: &str, iface: &str, frame: Bytes, now: f64) {
        let peer = match self
            .devices
            .get(sender)
            .and_then(|d| d.core().interface(iface))
        {
            Some(i) => i.peer().cloned(),
            None => {
                warn!(device = %sender, port = %iface, "Send on unknown interface dropped");
                return;
            }
        };
        let Some(peer) = peer else {
            trace!(device = %sender, port = %iface, "Send on unconnected interface");
            return;
        };

        if let Some(target) = self
            .devices
            .get_mut(&peer.device)
            .and_then(|d| d.core_mut().interface_mut(&peer.interface))
        {
            target.enqueue(frame.clone());
        }
        trace!(device = %sender, port = %iface, to = %peer, len = frame.len(), "Frame sent");
        self.events.emit(&Event::PacketSent(Observation {
            timestamp: now,
            device: sender.to_string(),
            interface: iface.to_string(),
            direction: Direction::Outgoing,
            data: frame,
        }));
    }
}

impl Default for Network {
    fn default() -> Self {
        Self::new()
    }
}

fn wrong_kind<D>(name: &str) -> Error {
    Error::not_found(format!(
        "device '{}' of type {}",
        name,
        std::any::type_name::<D>()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceCore;
    use crate::types::DeviceKind;
    use parking_lot::Mutex;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::any::Any;
    use std::sync::Arc;

    /// Records deliveries and echoes frames starting with b"ping" as b"pong"
    #[derive(Debug)]
    struct Echo {
        core: DeviceCore,
        received: Vec<(String, Bytes)>,
        ticks: usize,
    }

    impl Echo {
        fn new(name: &str, ports: usize) -> Self {
            let mut core = DeviceCore::new(name);
            for i in 0..ports {
                core.add_interface(&format!("eth{}", i), MacAddr::random_unicast())
                    .unwrap();
            }
            Self {
                core,
                received: Vec::new(),
                ticks: 0,
            }
        }
    }

    impl Device for Echo {
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
            if frame.starts_with(b"ping") {
                ctx.send(ingress, Bytes::from_static(b"pong"));
            }
            self.received.push((ingress.to_string(), frame));
        }

        fn tick(&mut self, _ctx: &mut Context) {
            self.ticks += 1;
        }

        fn reset(&mut self) {
            self.received.clear();
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    fn manual_network() -> (ManualTime, Network) {
        let time = ManualTime::new();
        let network = Network::manual(NetworkConfig::default(), &time).unwrap();
        (time, network)
    }

    fn assert_symmetric(network: &Network) {
        for device in network.devices() {
            for iface in device.core().interfaces() {
                if let Some(peer) = iface.peer() {
                    let back = network
                        .device(&peer.device)
                        .unwrap()
                        .core()
                        .interface(&peer.interface)
                        .unwrap()
                        .peer()
                        .cloned()
                        .unwrap();
                    assert_eq!(back.device, device.name());
                    assert_eq!(back.interface, iface.name());
                }
            }
        }
    }

    #[test]
    fn test_add_and_remove_device() {
        let (_time, mut net) = manual_network();
        net.add(Echo::new("a", 1)).unwrap();
        assert!(matches!(
            net.add(Echo::new("a", 1)),
            Err(Error::NameCollision(_))
        ));

        let removed = net.remove_device("a").unwrap();
        assert!(removed.core().network().is_none());
        assert!(matches!(net.device("a"), Err(Error::NotFound(_))));
        assert!(matches!(net.remove_device("a"), Err(Error::NotFound(_))));

        net.add_device(removed).unwrap();
        assert!(net.contains("a"));
    }

    #[test]
    fn test_remove_device_disconnects_peers() {
        let (_time, mut net) = manual_network();
        net.add(Echo::new("a", 1)).unwrap();
        net.add(Echo::new("b", 1)).unwrap();
        net.add_link(("a", "eth0"), ("b", "eth0")).unwrap();

        net.remove_device("a").unwrap();
        let b = net.device("b").unwrap();
        assert!(!b.core().interface("eth0").unwrap().is_connected());
    }

    #[test]
    fn test_link_errors() {
        let (_time, mut net) = manual_network();
        net.add(Echo::new("a", 2)).unwrap();
        net.add(Echo::new("b", 1)).unwrap();

        assert!(matches!(
            net.add_link(("a", "eth0"), ("a", "eth0")),
            Err(Error::SelfConnect(_))
        ));
        net.add_link(("a", "eth0"), ("b", "eth0")).unwrap();
        assert!(matches!(
            net.add_link(("a", "eth1"), ("b", "eth0")),
            Err(Error::AlreadyConnected(_))
        ));
        assert!(matches!(
            net.add_link(("a", "eth1"), ("c", "eth0")),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            net.remove_link(("a", "eth1"), ("b", "eth0")),
            Err(Error::NotConnected(_))
        ));
    }

    #[test]
    fn test_cross_network_connect() {
        let (_t1, mut first) = manual_network();
        let (_t2, mut second) = manual_network();
        first.add(Echo::new("a", 1)).unwrap();
        second.add(Echo::new("b", 1)).unwrap();

        let a = first.port("a", "eth0").unwrap();
        let b = second.port("b", "eth0").unwrap();
        assert!(matches!(first.connect(&a, &b), Err(Error::CrossNetwork(_))));
    }

    #[test]
    fn test_link_devices_picks_free_interfaces() {
        let (_time, mut net) = manual_network();
        net.add(Echo::new("a", 2)).unwrap();
        net.add(Echo::new("b", 2)).unwrap();

        let (a, b) = net.link_devices("a", "b").unwrap();
        assert_eq!((a.interface.as_str(), b.interface.as_str()), ("eth0", "eth0"));
        let (a, b) = net.link_devices("a", "b").unwrap();
        assert_eq!((a.interface.as_str(), b.interface.as_str()), ("eth1", "eth1"));
        assert!(matches!(net.link_devices("a", "b"), Err(Error::NotFound(_))));

        assert_eq!(net.unlink_devices("a", "b").unwrap(), 2);
        assert!(net.links().is_empty());
    }

    #[test]
    fn test_self_link_uses_two_interfaces() {
        let (_time, mut net) = manual_network();
        net.add(Echo::new("a", 2)).unwrap();
        let (x, y) = net.link_devices("a", "a").unwrap();
        assert_eq!(x.interface, "eth0");
        assert_eq!(y.interface, "eth1");
        assert_eq!(net.links().len(), 1);

        assert_eq!(net.unlink_devices("a", "a").unwrap(), 1);
        assert!(net.links().is_empty());
    }

    #[test]
    fn test_tick_delivers_and_echoes() {
        let (_time, mut net) = manual_network();
        net.add(Echo::new("a", 1)).unwrap();
        net.add(Echo::new("b", 1)).unwrap();
        net.add_link(("a", "eth0"), ("b", "eth0")).unwrap();

        net.invoke::<Echo, _, _>("a", |_, ctx| ctx.send("eth0", Bytes::from_static(b"ping")))
            .unwrap();
        net.tick();
        // b answered during the same tick, a sees it next tick
        assert_eq!(net.downcast::<Echo>("b").unwrap().received.len(), 1);
        assert_eq!(net.downcast::<Echo>("a").unwrap().received.len(), 0);

        net.tick();
        let a = net.downcast::<Echo>("a").unwrap();
        assert_eq!(a.received[0].1, "pong");
        assert_eq!(a.ticks, 2);
    }

    #[test]
    fn test_unconnected_send_is_noop() {
        let (_time, mut net) = manual_network();
        net.add(Echo::new("a", 1)).unwrap();
        let sent = Arc::new(Mutex::new(0usize));
        let sink = sent.clone();
        net.subscribe(move |e| {
            if matches!(e, Event::PacketSent(_)) {
                *sink.lock() += 1;
            }
        });

        net.invoke::<Echo, _, _>("a", |_, ctx| ctx.send("eth0", Bytes::from_static(b"x")))
            .unwrap();
        assert_eq!(*sent.lock(), 0);
    }

    #[test]
    fn test_observations_are_published() {
        let (time, mut net) = manual_network();
        net.add(Echo::new("a", 1)).unwrap();
        net.add(Echo::new("b", 1)).unwrap();
        net.add_link(("a", "eth0"), ("b", "eth0")).unwrap();
        net.start().unwrap();
        time.advance(1.25);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        net.subscribe(move |e| match e {
            Event::PacketSent(o) | Event::PacketReceived(o) => sink.lock().push(o.clone()),
            _ => {}
        });

        net.invoke::<Echo, _, _>("a", |_, ctx| ctx.send("eth0", Bytes::from_static(b"hi")))
            .unwrap();
        net.tick();

        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].direction, Direction::Outgoing);
        assert_eq!(seen[0].device, "a");
        assert_eq!(seen[1].direction, Direction::Ingoing);
        assert_eq!(seen[1].device, "b");
        assert_eq!(seen[1].timestamp, 1.25);
        assert_eq!(seen[1].data(), b"hi");
    }

    #[test]
    fn test_fifo_discipline() {
        let time = ManualTime::new();
        let config = NetworkConfig {
            queue_discipline: QueueDiscipline::Fifo,
            ..Default::default()
        };
        let mut net = Network::manual(config, &time).unwrap();
        net.add(Echo::new("a", 1)).unwrap();
        net.add(Echo::new("b", 1)).unwrap();
        net.add_link(("a", "eth0"), ("b", "eth0")).unwrap();

        net.invoke::<Echo, _, _>("a", |_, ctx| {
            ctx.send("eth0", Bytes::from_static(b"one"));
            ctx.send("eth0", Bytes::from_static(b"two"));
        })
        .unwrap();
        net.tick();
        net.tick();
        let b = net.downcast::<Echo>("b").unwrap();
        assert_eq!(b.received[0].1, "one");
        assert_eq!(b.received[1].1, "two");
    }

    #[test]
    fn test_lifo_discipline() {
        let (_time, mut net) = manual_network();
        net.add(Echo::new("a", 1)).unwrap();
        net.add(Echo::new("b", 1)).unwrap();
        net.add_link(("a", "eth0"), ("b", "eth0")).unwrap();

        net.invoke::<Echo, _, _>("a", |_, ctx| {
            ctx.send("eth0", Bytes::from_static(b"one"));
            ctx.send("eth0", Bytes::from_static(b"two"));
        })
        .unwrap();
        net.tick();
        let b = net.downcast::<Echo>("b").unwrap();
        assert_eq!(b.received[0].1, "two");
    }

    #[test]
    fn test_stop_keeps_queue_and_reset_clears_it() {
        let (time, mut net) = manual_network();
        net.add(Echo::new("a", 1)).unwrap();
        net.add(Echo::new("b", 1)).unwrap();
        net.add_link(("a", "eth0"), ("b", "eth0")).unwrap();
        net.start().unwrap();
        time.advance(3.0);

        net.invoke::<Echo, _, _>("a", |_, ctx| ctx.send("eth0", Bytes::from_static(b"x")))
            .unwrap();
        net.stop().unwrap();
        let pending = |net: &Network| {
            net.device("b")
                .unwrap()
                .core()
                .interface("eth0")
                .unwrap()
                .pending()
        };
        assert_eq!(pending(&net), 1);
        assert_eq!(net.time(), 3.0);

        net.reset();
        assert_eq!(pending(&net), 0);
        assert_eq!(net.time(), 0.0);
        assert!(!net.is_running());
        assert_eq!(net.len(), 2);

        net.clear();
        assert!(net.is_empty());
    }

    #[test]
    fn test_reset_while_running_reports_stop() {
        let (time, mut net) = manual_network();
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        net.subscribe(move |event| sink.lock().push(event.clone()));
        net.start().unwrap();
        time.advance(2.0);

        net.reset();
        assert!(!net.is_running());
        assert_eq!(net.time(), 0.0);
        let events = events.lock();
        let tail: Vec<&Event> = events.iter().rev().take(2).collect();
        assert!(matches!(tail[0], Event::Reset));
        assert!(matches!(tail[1], Event::ClockStopped { at } if *at == 2.0));
        drop(events);

        net.start().unwrap();
        time.advance(1.0);
        assert_eq!(net.time(), 1.0);
    }

    #[test]
    fn test_remove_interface_disconnects() {
        let (_time, mut net) = manual_network();
        net.add(Echo::new("a", 1)).unwrap();
        net.add(Echo::new("b", 1)).unwrap();
        net.add_link(("a", "eth0"), ("b", "eth0")).unwrap();

        net.remove_interface("a", "eth0").unwrap();
        assert!(net.device("a").unwrap().core().interfaces().is_empty());
        assert!(net.links().is_empty());
        net.add_interface("a", "eth0", MacAddr::random_unicast()).unwrap();
        assert!(matches!(
            net.add_interface("a", "eth0", MacAddr::random_unicast()),
            Err(Error::NameCollision(_))
        ));
    }

    #[test]
    fn test_random_operations_keep_links_symmetric() {
        let (_time, mut net) = manual_network();
        let mut rng = StdRng::seed_from_u64(7);
        let names = ["a", "b", "c", "d"];

        for step in 0..400 {
            let first = names[rng.gen_range(0..names.len())];
            let second = names[rng.gen_range(0..names.len())];
            match rng.gen_range(0..5) {
                0 => {
                    let _ = net.add(Echo::new(first, 3));
                }
                1 => {
                    let _ = net.remove_device(first);
                }
                2 | 3 => {
                    let _ = net.link_devices(first, second);
                }
                _ => {
                    let _ = net.unlink_devices(first, second);
                }
            }
            assert_symmetric(&net);

            let mut unique = net.device_names().to_vec();
            unique.sort();
            unique.dedup();
            assert_eq!(unique.len(), net.len(), "duplicate device after step {}", step);
        }
    }
}
