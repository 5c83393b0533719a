//! IEEE 802.2 LLC header

use stpsim_core::MacAddr;

use crate::dot3;
use crate::field::UInt;
use crate::packet::{Packet, PacketType, Payload};

/// Control field values
pub mod control {
    /// Unnumbered information
    pub const UI: u8 = 0x03;
    /// TEST command
    pub const TEST_REQUEST: u8 = 0xE3;
    /// TEST response (final bit set)
    pub const TEST_REPLY: u8 = 0xF3;
}

/// The null service access point
pub const NULL_SAP: u8 = 0x00;

pub static DSAP: UInt = UInt::u8("dsap").hex();
pub static SSAP: UInt = UInt::u8("ssap").hex();
pub static CONTROL: UInt = UInt::u8("control").hex();

pub static LLC: PacketType = PacketType {
    protocol: "LLC",
    header: &[&DSAP, &SSAP, &CONTROL],
    payload: Payload::Rest,
    trailer: &[],
};

pub fn header(dsap: u8, ssap: u8, control: u8) -> Packet {
    let mut packet = Packet::empty(&LLC);
    packet.insert("dsap", dsap.into());
    packet.insert("ssap", ssap.into());
    packet.insert("control", control.into());
    packet
}

/// 802.3 frame with a null-SAP LLC header and the given control byte
pub fn test_frame(dst: MacAddr, src: MacAddr, control: u8) -> Packet {
    dot3::frame(dst, src, header(NULL_SAP, NULL_SAP, control))
}
