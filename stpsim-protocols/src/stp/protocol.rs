//! Spanning tree switch

use bytes::Bytes;
use std::any::Any;
use tracing::{debug, trace, warn};

use stpsim_core::{
    Context, Device, DeviceCore, DeviceKind, Error, Interface, LearningBridge, MacAddr, PortRole,
    PortState, Result, SpanningTreeParticipant,
};
use stpsim_packet::bpdu::stp_frame;
use stpsim_packet::{dissect, peek_addresses, ConfigBpdu, LayerTable, STP_MULTICAST};

use super::constants::{DEFAULT_BRIDGE_PRIORITY, DEFAULT_PATH_COST};
use super::packet::{Bpdu, Identifier};
use super::port::PortData;
use super::StpTimers;
use crate::switch::MacTable;
use crate::timer::Timer;

/// Learning bridge running 802.1D spanning tree on every interface
#[derive(Debug)]
pub struct StpSwitch {
    core: DeviceCore,
    bridge: Identifier,
    timers: StpTimers,
    ports: Vec<PortData>,
    next_port_id: u16,
    hello: Timer,
    table: MacTable,
    layers: LayerTable,
    needs_assignation: bool,
}

impl StpSwitch {
    /// Switch with default priority and a random bridge MAC
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            core: DeviceCore::new(name),
            bridge: Identifier::new(DEFAULT_BRIDGE_PRIORITY, MacAddr::random_unicast()),
            timers: StpTimers::default(),
            ports: Vec::new(),
            next_port_id: 1,
            hello: Timer::new(),
            table: MacTable::new(),
            layers: LayerTable::standard(),
            needs_assignation: true,
        }
    }

    /// Switch with `ports` interfaces named eth0, eth1, ...
    pub fn with_ports(name: impl Into<String>, ports: usize) -> Result<Self> {
        let mut switch = Self::new(name);
        crate::add_ports(&mut switch, ports)?;
        Ok(switch)
    }

    pub fn bridge(&self) -> Identifier {
        self.bridge
    }

    /// Change the bridge address; ports go back to their self-declared BPDU
    pub fn set_bridge_mac(&mut self, mac: MacAddr) -> Result<()> {
        if !mac.is_unicast() {
            return Err(Error::invalid_address(format!(
                "bridge address {} is not unicast",
                mac
            )));
        }
        self.bridge.mac = mac;
        self.reinit_ports();
        Ok(())
    }

    pub fn timers(&self) -> &StpTimers {
        &self.timers
    }

    pub fn set_timers(&mut self, timers: StpTimers) {
        self.timers = timers;
    }

    pub fn ports(&self) -> &[PortData] {
        &self.ports
    }

    pub fn port(&self, interface: &str) -> Option<&PortData> {
        self.ports.iter().find(|p| p.name() == interface)
    }

    pub fn table(&self) -> &MacTable {
        &self.table
    }

    /// Best stored BPDU over enabled ports
    pub fn best_bpdu(&self) -> Bpdu {
        self.ports
            .iter()
            .filter(|p| !p.is_disabled())
            .map(|p| *p.stored())
            .min()
            .unwrap_or_else(|| Bpdu::own(self.bridge, 0))
    }

    fn index_of(&self, interface: &str) -> Option<usize> {
        self.ports.iter().position(|p| p.name() == interface)
    }

    fn port_mut(&mut self, interface: &str) -> Result<&mut PortData> {
        let device = self.core.name().to_string();
        self.ports
            .iter_mut()
            .find(|p| p.name() == interface)
            .ok_or_else(|| Error::not_found(format!("interface '{}.{}'", device, interface)))
    }

    fn root_index(&self) -> Option<usize> {
        self.ports.iter().position(|p| p.role() == PortRole::Root)
    }

    fn reinit_ports(&mut self) {
        for port in self.ports.iter_mut().filter(|p| !p.is_disabled()) {
            port.reinit(self.bridge);
        }
        self.hello.disarm();
        self.needs_assignation = true;
    }

    /// Recompute every enabled port's role from the stored BPDUs
    fn assign(&mut self, ctx: &mut Context) {
        self.needs_assignation = false;
        let now = ctx.now();
        let best = self.best_bpdu();
        let is_root = best.root == self.bridge;
        let bridge = self.bridge;
        let mut root_chosen = false;
        let mut changed = false;

        for port in self.ports.iter_mut().filter(|p| !p.is_disabled()) {
            let stored = *port.stored();
            let role = if !is_root && !root_chosen && stored == best {
                root_chosen = true;
                PortRole::Root
            } else if stored.is_own(bridge, port.id()) || port.would_send(&best, bridge) < stored {
                PortRole::Designated
            } else {
                PortRole::Blocking
            };

            if port.assign(role, now, &self.timers) {
                debug!(
                    device = %self.core.name(),
                    port = %port.name(),
                    role = %port.role(),
                    state = %port.state(),
                    "Port role changed"
                );
                changed = true;
            }
        }

        if !is_root {
            self.hello.disarm();
        }
        if changed {
            ctx.changed();
        }
    }

    /// Send the current configuration on every port allowed to speak
    fn broadcast(&mut self, ctx: &mut Context) {
        let now = ctx.now();
        let best = self.best_bpdu();
        let config = |port: u16| -> ConfigBpdu {
            Bpdu {
                root: best.root,
                cost: best.cost,
                bridge: self.bridge,
                port,
            }
            .to_config()
        };

        for index in 0..self.ports.len() {
            let port = &self.ports[index];
            if !port.can_send(now) {
                continue;
            }
            let Some(mac) = self.core.interface(port.name()).map(|i| i.mac()) else {
                continue;
            };
            match stp_frame(mac, &config(port.id())).raw() {
                Ok(frame) => {
                    trace!(device = %self.core.name(), port = %port.name(), "Sending BPDU");
                    ctx.send(port.name(), frame);
                    self.ports[index].sent(now, &self.timers);
                }
                Err(e) => warn!(device = %self.core.name(), error = %e, "Cannot encode BPDU"),
            }
        }
    }

    fn handle_bpdu(&mut self, ctx: &mut Context, index: usize, incoming: Bpdu) {
        let best = self.best_bpdu();
        let port = &self.ports[index];
        let candidate = incoming.with_added_cost(port.path_cost());
        let stored = *port.stored();

        let (current, same_sender) = if stored.is_own(self.bridge, port.id()) {
            (port.would_send(&best, self.bridge), false)
        } else {
            (
                stored,
                stored.bridge == candidate.bridge && stored.port == candidate.port,
            )
        };

        if candidate > current && !same_sender {
            trace!(device = %self.core.name(), port = %port.name(), bpdu = %candidate, "Ignoring inferior BPDU");
            return;
        }

        debug!(device = %self.core.name(), port = %port.name(), bpdu = %candidate, "Stored BPDU");
        self.ports[index].store(candidate, ctx.now(), &self.timers);
        self.assign(ctx);

        if self.root_index() == Some(index) {
            self.broadcast(ctx);
        }
    }

    fn receive_bpdu(&mut self, ctx: &mut Context, index: usize, frame: &[u8]) {
        let bpdu = dissect(&self.layers, frame)
            .and_then(|packet| match packet.find("BPDU") {
                Some(layer) => ConfigBpdu::from_packet(layer),
                None => Err(Error::parsing("STP frame without BPDU payload")),
            })
            .map(|config| Bpdu::from_config(&config));

        match bpdu {
            Ok(bpdu) => self.handle_bpdu(ctx, index, bpdu),
            Err(e) => warn!(
                device = %self.core.name(),
                port = %self.ports[index].name(),
                error = %e,
                "Dropping malformed BPDU"
            ),
        }
    }
}

impl Device for StpSwitch {
    fn kind(&self) -> DeviceKind {
        DeviceKind::StpSwitch
    }

    fn core(&self) -> &DeviceCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut DeviceCore {
        &mut self.core
    }

    fn add_interface(&mut self, name: &str, mac: MacAddr) -> Result<()> {
        if self.next_port_id == u16::MAX {
            return Err(Error::construction(format!(
                "no port identifiers left on '{}'",
                self.core.name()
            )));
        }
        self.core.add_interface(name, mac)?;
        self.ports.push(PortData::new(
            name,
            self.next_port_id,
            self.bridge,
            DEFAULT_PATH_COST,
        ));
        self.next_port_id += 1;
        self.needs_assignation = true;
        Ok(())
    }

    fn remove_interface(&mut self, name: &str) -> Result<Interface> {
        let iface = self.core.remove_interface(name)?;
        self.ports.retain(|p| p.name() != name);
        self.table.forget_interface(name);
        self.needs_assignation = true;
        Ok(iface)
    }

    fn on_frame(&mut self, ctx: &mut Context, ingress: &str, frame: Bytes) {
        let Some(index) = self.index_of(ingress) else {
            return;
        };
        let (dst, src) = match peek_addresses(&frame) {
            Ok(addrs) => addrs,
            Err(e) => {
                warn!(device = %self.core.name(), port = %ingress, error = %e, "Dropping malformed frame");
                return;
            }
        };

        let state = self.ports[index].state();
        if dst == STP_MULTICAST {
            if state != PortState::Disabled {
                self.receive_bpdu(ctx, index, &frame);
            }
            return;
        }

        if !state.learns() {
            trace!(device = %self.core.name(), port = %ingress, state = %state, "Discarding data frame");
            return;
        }
        if self.table.learn(src, ingress) {
            debug!(device = %self.core.name(), mac = %src, port = %ingress, "Learned address");
            ctx.changed();
        }
        if !state.forwards() {
            return;
        }

        let forwarding = self
            .ports
            .iter()
            .filter(|p| p.state().forwards())
            .map(|p| p.name());
        for egress in self.table.egress(&dst, ingress, forwarding) {
            ctx.send(&egress, frame.clone());
        }
    }

    fn tick(&mut self, ctx: &mut Context) {
        let now = ctx.now();
        if self.needs_assignation {
            self.assign(ctx);
        }

        if self.is_root() && self.hello.ready(now) {
            self.broadcast(ctx);
            self.hello.arm(now, self.timers.hello_time);
        }

        let mut changed = false;
        for port in self.ports.iter_mut() {
            if port.advance(now, &self.timers) {
                debug!(device = %self.core.name(), port = %port.name(), state = %port.state(), "Port state changed");
                changed = true;
            }
        }

        let mut expired = false;
        for port in self.ports.iter_mut() {
            if port.expire_message_age(now, self.bridge, &self.timers) {
                debug!(device = %self.core.name(), port = %port.name(), "Stored BPDU aged out");
                expired = true;
            }
        }
        if expired {
            self.assign(ctx);
            changed = true;
        }

        if changed {
            ctx.changed();
        }
    }

    fn reset(&mut self) {
        self.reinit_ports();
        self.table.clear();
    }

    fn as_learning_bridge(&self) -> Option<&dyn LearningBridge> {
        Some(self)
    }

    fn as_spanning_tree(&self) -> Option<&dyn SpanningTreeParticipant> {
        Some(self)
    }

    fn as_spanning_tree_mut(&mut self) -> Option<&mut dyn SpanningTreeParticipant> {
        Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl LearningBridge for StpSwitch {
    fn lookup(&self, mac: &MacAddr) -> Option<&str> {
        self.table.lookup(mac)
    }

    fn entries(&self) -> Vec<(MacAddr, String)> {
        self.table.entries()
    }
}

impl SpanningTreeParticipant for StpSwitch {
    fn bridge_priority(&self) -> u16 {
        self.bridge.priority
    }

    fn set_bridge_priority(&mut self, priority: u16) {
        self.bridge.priority = priority;
        self.reinit_ports();
    }

    fn bridge_mac(&self) -> MacAddr {
        self.bridge.mac
    }

    fn is_root(&self) -> bool {
        self.best_bpdu().root == self.bridge
    }

    fn root_port(&self) -> Option<&str> {
        self.root_index().map(|i| self.ports[i].name())
    }

    fn port_role(&self, interface: &str) -> Option<PortRole> {
        self.port(interface).map(|p| p.role())
    }

    fn port_state(&self, interface: &str) -> Option<PortState> {
        self.port(interface).map(|p| p.state())
    }

    fn path_cost(&self, interface: &str) -> Option<u32> {
        self.port(interface).map(|p| p.path_cost())
    }

    fn set_path_cost(&mut self, interface: &str, cost: u32) -> Result<()> {
        self.port_mut(interface)?.set_path_cost(cost);
        self.needs_assignation = true;
        Ok(())
    }

    fn disable_port(&mut self, interface: &str) -> Result<()> {
        let bridge = self.bridge;
        self.port_mut(interface)?.disable(bridge);
        self.table.forget_interface(interface);
        self.needs_assignation = true;
        Ok(())
    }

    fn enable_port(&mut self, interface: &str) -> Result<()> {
        let bridge = self.bridge;
        let port = self.port_mut(interface)?;
        if port.is_disabled() {
            port.reinit(bridge);
            self.needs_assignation = true;
        }
        Ok(())
    }
}
