//! Per-port spanning tree state

use stpsim_core::{PortRole, PortState};

use super::packet::{Bpdu, Identifier};
use super::StpTimers;
use crate::timer::Timer;

/// Role, state, stored BPDU and timers of one bridge port
#[derive(Debug, Clone)]
pub struct PortData {
    name: String,
    id: u16,
    role: PortRole,
    state: PortState,
    stored: Bpdu,
    path_cost: u32,
    hold: Timer,
    message_age: Timer,
    forward_delay: Timer,
}

impl PortData {
    /// Blocking port holding its own BPDU
    pub fn new(name: impl Into<String>, id: u16, bridge: Identifier, path_cost: u32) -> Self {
        Self {
            name: name.into(),
            id,
            role: PortRole::Blocking,
            state: PortState::Blocking,
            stored: Bpdu::own(bridge, id),
            path_cost,
            hold: Timer::new(),
            message_age: Timer::new(),
            forward_delay: Timer::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> u16 {
        self.id
    }

    pub fn role(&self) -> PortRole {
        self.role
    }

    pub fn state(&self) -> PortState {
        self.state
    }

    pub fn stored(&self) -> &Bpdu {
        &self.stored
    }

    pub fn path_cost(&self) -> u32 {
        self.path_cost
    }

    pub fn hold(&self) -> &Timer {
        &self.hold
    }

    pub fn message_age(&self) -> &Timer {
        &self.message_age
    }

    pub fn forward_delay(&self) -> &Timer {
        &self.forward_delay
    }

    pub fn is_disabled(&self) -> bool {
        self.role == PortRole::Disabled
    }

    pub(crate) fn set_path_cost(&mut self, cost: u32) {
        self.path_cost = cost;
    }

    /// Back to a Blocking port holding its own BPDU, timers stopped
    pub(crate) fn reinit(&mut self, bridge: Identifier) {
        self.role = PortRole::Blocking;
        self.state = PortState::Blocking;
        self.stored = Bpdu::own(bridge, self.id);
        self.hold.disarm();
        self.message_age.disarm();
        self.forward_delay.disarm();
    }

    pub(crate) fn disable(&mut self, bridge: Identifier) {
        self.reinit(bridge);
        self.role = PortRole::Disabled;
        self.state = PortState::Disabled;
    }

    /// BPDU this bridge would advertise on the port given its best BPDU
    pub(crate) fn would_send(&self, best: &Bpdu, bridge: Identifier) -> Bpdu {
        Bpdu {
            root: best.root,
            cost: best.cost.saturating_add(self.path_cost),
            bridge,
            port: self.id,
        }
    }

    /// Not Blocking/Disabled and outside the hold window
    pub(crate) fn can_send(&self, now: f64) -> bool {
        !matches!(self.state, PortState::Blocking | PortState::Disabled) && self.hold.ready(now)
    }

    pub(crate) fn sent(&mut self, now: f64, timers: &StpTimers) {
        self.hold.arm(now, timers.hold_time);
    }

    pub(crate) fn store(&mut self, bpdu: Bpdu, now: f64, timers: &StpTimers) {
        self.stored = bpdu;
        self.message_age.arm(now, timers.max_age);
    }

    /// Apply a role; returns true if role or state changed
    ///
    /// Only Blocking ports start Listening, so a Root/Designated swap keeps
    /// the state and its forward delay.
    pub(crate) fn assign(&mut self, role: PortRole, now: f64, timers: &StpTimers) -> bool {
        let before = (self.role, self.state);
        self.role = role;
        match role {
            PortRole::Root | PortRole::Designated => {
                if self.state == PortState::Blocking {
                    self.state = PortState::Listening;
                    self.forward_delay.arm(now, timers.forward_delay);
                }
            }
            PortRole::Blocking => {
                self.state = PortState::Blocking;
                self.forward_delay.disarm();
            }
            PortRole::Disabled => {
                self.state = PortState::Disabled;
                self.forward_delay.disarm();
            }
        }
        before != (self.role, self.state)
    }

    /// Listening → Learning → Forwarding once the forward delay is up
    pub(crate) fn advance(&mut self, now: f64, timers: &StpTimers) -> bool {
        if !self.forward_delay.expired(now) {
            return false;
        }
        match self.state {
            PortState::Listening => {
                self.state = PortState::Learning;
                self.forward_delay.arm(now, timers.forward_delay);
                true
            }
            PortState::Learning => {
                self.state = PortState::Forwarding;
                self.forward_delay.disarm();
                true
            }
            _ => {
                self.forward_delay.disarm();
                false
            }
        }
    }

    /// Drop stale information: back to the own BPDU as a Designated port
    pub(crate) fn expire_message_age(
        &mut self,
        now: f64,
        bridge: Identifier,
        timers: &StpTimers,
    ) -> bool {
        if self.is_disabled() || !self.message_age.expired(now) {
            return false;
        }
        self.message_age.disarm();
        self.stored = Bpdu::own(bridge, self.id);
        self.assign(PortRole::Designated, now, timers);
        true
    }
}
