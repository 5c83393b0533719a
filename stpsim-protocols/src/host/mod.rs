//! End host with an LLC connectivity test
//!
//! [`Host::start_test`] sends an 802.3 LLC TEST command to a peer and waits
//! [`TEST_TIMEOUT`] time units for the answer. Hosts answer TEST commands they
//! are not waiting for with a single TEST response.

use bytes::Bytes;
use std::any::Any;
use tracing::{debug, info, trace, warn};

use stpsim_core::{
    Context, Device, DeviceCore, DeviceKind, Error, Event, MacAddr, Result, TestOutcome,
};
use stpsim_packet::llc::{self, control};
use stpsim_packet::{dissect, LayerTable};

use crate::timer::Timer;

/// Time units a connectivity test waits for the peer
pub const TEST_TIMEOUT: f64 = 5.0;

#[derive(Debug, Clone)]
struct PendingTest {
    peer: MacAddr,
    interface: String,
    timer: Timer,
}

/// End station
#[derive(Debug)]
pub struct Host {
    core: DeviceCore,
    layers: LayerTable,
    pending: Option<PendingTest>,
    last_outcome: Option<(MacAddr, TestOutcome)>,
}

impl Host {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            core: DeviceCore::new(name),
            layers: LayerTable::standard(),
            pending: None,
            last_outcome: None,
        }
    }

    /// Host with a single interface, eth0
    pub fn with_interface(name: impl Into<String>) -> Result<Self> {
        let mut host = Self::new(name);
        crate::add_ports(&mut host, 1)?;
        Ok(host)
    }

    /// Address of the first interface
    pub fn mac(&self) -> Option<MacAddr> {
        self.core.interfaces().first().map(|i| i.mac())
    }

    /// Peer of the test in progress
    pub fn pending_test(&self) -> Option<MacAddr> {
        self.pending.as_ref().map(|t| t.peer)
    }

    /// Peer and outcome of the last finished test
    pub fn last_outcome(&self) -> Option<(MacAddr, TestOutcome)> {
        self.last_outcome
    }

    /// Send a TEST command to `peer`, replacing any test in progress
    ///
    /// Goes out of the first connected interface, or the first interface if
    /// none is connected.
    pub fn start_test(&mut self, ctx: &mut Context, peer: MacAddr) -> Result<()> {
        let iface = self
            .core
            .interfaces()
            .iter()
            .find(|i| i.is_connected())
            .or_else(|| self.core.interfaces().first())
            .ok_or_else(|| Error::not_found(format!("interface on host '{}'", self.core.name())))?;
        let (interface, mac) = (iface.name().to_string(), iface.mac());

        let frame = llc::test_frame(peer, mac, control::TEST_REQUEST).raw()?;
        ctx.send(&interface, frame);

        let mut timer = Timer::new();
        timer.arm(ctx.now(), TEST_TIMEOUT);
        info!(device = %self.core.name(), peer = %peer, port = %interface, "Connectivity test started");
        self.pending = Some(PendingTest {
            peer,
            interface,
            timer,
        });
        Ok(())
    }

    fn finish(&mut self, ctx: &mut Context, outcome: TestOutcome) {
        if let Some(test) = self.pending.take() {
            info!(
                device = %self.core.name(),
                peer = %test.peer,
                port = %test.interface,
                outcome = ?outcome,
                "Connectivity test finished"
            );
            self.last_outcome = Some((test.peer, outcome));
            ctx.emit(Event::LinkTest {
                device: self.core.name().to_string(),
                peer: test.peer,
                outcome,
            });
        }
    }

    fn reply(&self, ctx: &mut Context, ingress: &str, own: MacAddr, peer: MacAddr) {
        match llc::test_frame(peer, own, control::TEST_REPLY).raw() {
            Ok(frame) => {
                debug!(device = %self.core.name(), peer = %peer, "Answering TEST");
                ctx.send(ingress, frame);
            }
            Err(e) => warn!(device = %self.core.name(), error = %e, "Cannot encode TEST response"),
        }
    }
}

impl Device for Host {
    fn kind(&self) -> DeviceKind {
        DeviceKind::Host
    }

    fn core(&self) -> &DeviceCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut DeviceCore {
        &mut self.core
    }

    fn on_frame(&mut self, ctx: &mut Context, ingress: &str, frame: Bytes) {
        let packet = match dissect(&self.layers, &frame) {
            Ok(packet) => packet,
            Err(e) => {
                warn!(device = %self.core.name(), port = %ingress, error = %e, "Dropping malformed frame");
                return;
            }
        };
        let Some(own) = self.core.interface(ingress).map(|i| i.mac()) else {
            return;
        };
        let (Ok(dst), Ok(src)) = (packet.mac("dst"), packet.mac("src")) else {
            return;
        };
        if dst != own && !dst.is_broadcast() {
            trace!(device = %self.core.name(), dst = %dst, "Frame not for us");
            return;
        }
        let Some(llc) = packet.find("LLC") else {
            return;
        };

        let awaited = self.pending.as_ref().map_or(false, |t| t.peer == src);
        let code = llc.u64("control").ok().and_then(|v| u8::try_from(v).ok());
        match code {
            Some(control::TEST_REPLY) | Some(control::TEST_REQUEST) if awaited => {
                self.finish(ctx, TestOutcome::Success);
            }
            Some(control::TEST_REQUEST) => self.reply(ctx, ingress, own, src),
            _ => trace!(device = %self.core.name(), "Ignoring LLC frame"),
        }
    }

    fn tick(&mut self, ctx: &mut Context) {
        if self
            .pending
            .as_ref()
            .map_or(false, |t| t.timer.expired(ctx.now()))
        {
            self.finish(ctx, TestOutcome::Timeout);
        }
    }

    fn reset(&mut self) {
        self.pending = None;
        self.last_outcome = None;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
