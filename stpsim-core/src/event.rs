//! Event bus and frame observations
//!
//! Every notification the simulator produces travels through one [`EventBus`]
//! as an [`Event`]. Frame observations carry everything an external capture
//! writer needs: raw bytes, simulated timestamp, interface and direction.

use bytes::Bytes;
use std::fmt;

use crate::types::{MacAddr, PortRef};

/// Direction of an observed frame relative to the interface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ingoing,
    Outgoing,
}

/// A frame seen on an interface
#[derive(Debug, Clone)]
pub struct Observation {
    /// Simulated time of the send or delivery
    pub timestamp: f64,
    /// Device that owns the interface
    pub device: String,
    /// Interface the frame went through
    pub interface: String,
    pub direction: Direction,
    /// Frame data (including all headers)
    pub data: Bytes,
}

impl Observation {
    /// Get frame data as slice
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Get frame length
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the frame is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Result of an LLC connectivity test
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestOutcome {
    Success,
    Timeout,
}

/// Everything observers can be told about
#[derive(Debug, Clone)]
pub enum Event {
    PacketSent(Observation),
    PacketReceived(Observation),
    DeviceAdded { device: String },
    DeviceRemoved { device: String },
    LinkUp { a: PortRef, b: PortRef },
    LinkDown { a: PortRef, b: PortRef },
    /// Device state visible to observers changed (port roles, tables, ...)
    Changed { device: String },
    LinkTest {
        device: String,
        peer: MacAddr,
        outcome: TestOutcome,
    },
    ClockStarted { at: f64 },
    ClockStopped { at: f64 },
    Reset,
}

/// Handle returned by [`EventBus::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber = Box<dyn FnMut(&Event) + Send>;

/// Ordered list of observer callbacks
#[derive(Default)]
pub struct EventBus {
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_id: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&Event) + Send + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    /// Returns false if the id was unknown
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    pub fn emit(&mut self, event: &Event) {
        for (_, callback) in self.subscribers.iter_mut() {
            callback(event);
        }
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}
