//! Configuration BPDU payload
//!
//! 22 bytes: root priority(2) + root MAC(6) + root path cost(4) +
//! bridge priority(2) + bridge MAC(6) + port id(2), carried in Ethernet II
//! frames of type `0x8042` sent to [`STP_MULTICAST`].

use stpsim_core::{MacAddr, Result};

use crate::ethernet::{self, ether_type};
use crate::field::{MacField, UInt};
use crate::packet::{Packet, PacketType, Payload};

/// Encoded payload size
pub const LEN: usize = 22;

/// Destination of every STP frame
pub const STP_MULTICAST: MacAddr = MacAddr([0x01, 0x81, 0xC2, 0x00, 0x00, 0x00]);

pub static ROOT_PRIORITY: UInt = UInt::u16("root_priority");
pub static ROOT_MAC: MacField = MacField::new("root_mac");
pub static ROOT_COST: UInt = UInt::u32("root_cost");
pub static BRIDGE_PRIORITY: UInt = UInt::u16("bridge_priority");
pub static BRIDGE_MAC: MacField = MacField::new("bridge_mac");
pub static PORT: UInt = UInt::u16("port").hex();

pub static BPDU: PacketType = PacketType {
    protocol: "BPDU",
    header: &[
        &ROOT_PRIORITY,
        &ROOT_MAC,
        &ROOT_COST,
        &BRIDGE_PRIORITY,
        &BRIDGE_MAC,
        &PORT,
    ],
    payload: Payload::Rest,
    trailer: &[],
};

/// Typed view of a configuration BPDU
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigBpdu {
    pub root_priority: u16,
    pub root_mac: MacAddr,
    pub root_cost: u32,
    pub bridge_priority: u16,
    pub bridge_mac: MacAddr,
    pub port: u16,
}

impl ConfigBpdu {
    pub fn to_packet(&self) -> Packet {
        let mut packet = Packet::empty(&BPDU);
        packet.insert("root_priority", self.root_priority.into());
        packet.insert("root_mac", self.root_mac.into());
        packet.insert("root_cost", self.root_cost.into());
        packet.insert("bridge_priority", self.bridge_priority.into());
        packet.insert("bridge_mac", self.bridge_mac.into());
        packet.insert("port", self.port.into());
        packet
    }

    pub fn from_packet(packet: &Packet) -> Result<Self> {
        Ok(Self {
            root_priority: packet.u16("root_priority")?,
            root_mac: packet.mac("root_mac")?,
            root_cost: packet.u32("root_cost")?,
            bridge_priority: packet.u16("bridge_priority")?,
            bridge_mac: packet.mac("bridge_mac")?,
            port: packet.u16("port")?,
        })
    }
}

/// Ethernet II frame from `src` to [`STP_MULTICAST`] carrying `bpdu`
pub fn stp_frame(src: MacAddr, bpdu: &ConfigBpdu) -> Packet {
    ethernet::frame(STP_MULTICAST, src, ether_type::STP).with_next(bpdu.to_packet())
}
