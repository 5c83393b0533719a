//! Layer bindings
//!
//! Which packet type follows a decoded layer is looked up in a [`LayerTable`]:
//! per protocol name, an ordered list of predicates over the partially decoded
//! packet. The first predicate that matches picks the next type; no match ends
//! the chain.

use std::collections::HashMap;
use std::fmt;

use crate::bpdu::BPDU;
use crate::dot3::DOT3;
use crate::ethernet::{ether_type, ETHERNET};
use crate::llc::LLC;
use crate::packet::{Packet, PacketType};

/// Decides whether a binding applies to a decoded layer
pub type Predicate = fn(&Packet) -> bool;

#[derive(Clone)]
struct Binding {
    predicate: Predicate,
    next: &'static PacketType,
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("next", &self.next.protocol)
            .finish()
    }
}

/// Protocol name → ordered (predicate, next type) bindings
#[derive(Debug, Clone, Default)]
pub struct LayerTable {
    bindings: HashMap<&'static str, Vec<Binding>>,
}

impl LayerTable {
    /// A table with no bindings: every packet decodes as a single layer
    pub fn new() -> Self {
        Self::default()
    }

    /// Bindings for the frames the simulator exchanges
    ///
    /// Ethernet II carries a BPDU when its type is `0x8042`; 802.3 always
    /// carries LLC.
    pub fn standard() -> Self {
        let mut table = Self::new();
        table.bind(ETHERNET.protocol, is_stp, &BPDU);
        table.bind(DOT3.protocol, |_| true, &LLC);
        table
    }

    /// Append a binding; earlier bindings for the same protocol win
    pub fn bind(&mut self, protocol: &'static str, predicate: Predicate, next: &'static PacketType) {
        self.bindings
            .entry(protocol)
            .or_default()
            .push(Binding { predicate, next });
    }

    /// Next layer type for a decoded packet, if any binding matches
    pub fn next_for(&self, packet: &Packet) -> Option<&'static PacketType> {
        self.bindings
            .get(packet.protocol())?
            .iter()
            .find(|b| (b.predicate)(packet))
            .map(|b| b.next)
    }
}

fn is_stp(packet: &Packet) -> bool {
    matches!(packet.u64("type"), Ok(t) if t == ether_type::STP as u64)
}
