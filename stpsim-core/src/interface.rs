//! Simulated network interface

use bytes::Bytes;
use std::collections::VecDeque;
use std::fmt;

use crate::types::{MacAddr, PortRef};

/// Order in which a backlog of received frames is drained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueueDiscipline {
    /// Newest frame first
    #[default]
    Lifo,
    /// Oldest frame first
    Fifo,
}

/// Network interface owned by exactly one device
#[derive(Debug, Clone)]
pub struct Interface {
    /// Interface name (e.g., "eth0")
    name: String,
    /// MAC address
    mac: MacAddr,
    /// Peer interface, always mirrored on the other side
    peer: Option<PortRef>,
    /// Frames waiting for delivery to the owner
    queue: VecDeque<Bytes>,
}

impl Interface {
    /// Create a new, unconnected interface
    pub fn new(name: impl Into<String>, mac: MacAddr) -> Self {
        Self {
            name: name.into(),
            mac,
            peer: None,
            queue: VecDeque::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mac(&self) -> MacAddr {
        self.mac
    }

    pub fn peer(&self) -> Option<&PortRef> {
        self.peer.as_ref()
    }

    pub fn is_connected(&self) -> bool {
        self.peer.is_some()
    }

    pub(crate) fn set_peer(&mut self, peer: Option<PortRef>) {
        self.peer = peer;
    }

    /// Append a frame to the receive queue
    pub(crate) fn enqueue(&mut self, frame: Bytes) {
        self.queue.push_back(frame);
    }

    /// Take the next frame to deliver
    pub(crate) fn dequeue(&mut self, discipline: QueueDiscipline) -> Option<Bytes> {
        match discipline {
            QueueDiscipline::Lifo => self.queue.pop_back(),
            QueueDiscipline::Fifo => self.queue.pop_front(),
        }
    }

    /// Number of frames waiting
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Drop every queued frame
    pub fn reset(&mut self) {
        self.queue.clear();
    }
}

impl fmt::Display for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.peer {
            Some(peer) => write!(f, "{} ({}) <-> {}", self.name, self.mac, peer),
            None => write!(f, "{} ({})", self.name, self.mac),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames(iface: &mut Interface) {
        iface.enqueue(Bytes::from_static(b"first"));
        iface.enqueue(Bytes::from_static(b"second"));
    }

    #[test]
    fn test_lifo_drains_newest_first() {
        let mut iface = Interface::new("eth0", MacAddr::zero());
        frames(&mut iface);
        assert_eq!(iface.dequeue(QueueDiscipline::Lifo).unwrap(), "second");
        assert_eq!(iface.dequeue(QueueDiscipline::Lifo).unwrap(), "first");
        assert!(iface.dequeue(QueueDiscipline::Lifo).is_none());
    }

    #[test]
    fn test_fifo_drains_oldest_first() {
        let mut iface = Interface::new("eth0", MacAddr::zero());
        frames(&mut iface);
        assert_eq!(iface.dequeue(QueueDiscipline::Fifo).unwrap(), "first");
        assert_eq!(iface.pending(), 1);
    }

    #[test]
    fn test_reset_clears_queue() {
        let mut iface = Interface::new("eth0", MacAddr::zero());
        frames(&mut iface);
        iface.reset();
        assert_eq!(iface.pending(), 0);
    }
}
