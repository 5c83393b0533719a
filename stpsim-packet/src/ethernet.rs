//! Ethernet II framing and frame dissection
//!
//! Ethernet II and 802.3 share the destination and source address fields and
//! differ in how the next two bytes are read: values up to 1500 are a length
//! (802.3, see [`crate::dot3`]), larger ones an EtherType.

use bytes::Buf;

use stpsim_core::{Error, MacAddr, Result};

use crate::dot3::DOT3;
use crate::field::{MacField, UInt};
use crate::layer::LayerTable;
use crate::packet::{Packet, PacketType, Payload};

/// dst + src + type/length
pub const HEADER_LEN: usize = 14;

/// Largest type/length value that is a length
pub const MAX_LENGTH: u16 = 1500;

/// EtherType values the simulator uses
pub mod ether_type {
    /// BPDUs in Ethernet II framing
    pub const STP: u16 = 0x8042;
}

pub static DST: MacField = MacField::new("dst");
pub static SRC: MacField = MacField::new("src");
pub static TYPE: UInt = UInt::u16("type").hex();

pub static ETHERNET: PacketType = PacketType {
    protocol: "Ethernet",
    header: &[&DST, &SRC, &TYPE],
    payload: Payload::Rest,
    trailer: &[],
};

/// Ethernet II header with no payload yet
pub fn frame(dst: MacAddr, src: MacAddr, ether_type: u16) -> Packet {
    let mut packet = Packet::empty(&ETHERNET);
    packet.insert("dst", dst.into());
    packet.insert("src", src.into());
    packet.insert("type", ether_type.into());
    packet
}

/// Decode a frame as Ethernet II or 802.3 depending on its type/length field
pub fn dissect(layers: &LayerTable, bytes: &[u8]) -> Result<Packet> {
    if bytes.len() < HEADER_LEN {
        return Err(Error::parsing(format!(
            "frame of {} bytes is shorter than an Ethernet header",
            bytes.len()
        )));
    }
    let type_or_length = (&bytes[12..14]).get_u16();
    let kind = if type_or_length <= MAX_LENGTH {
        &DOT3
    } else {
        &ETHERNET
    };
    Packet::from_bytes(layers, kind, bytes)
}

/// Destination and source addresses, without decoding the rest
pub fn peek_addresses(bytes: &[u8]) -> Result<(MacAddr, MacAddr)> {
    if bytes.len() < 12 {
        return Err(Error::parsing(format!(
            "frame of {} bytes has no address fields",
            bytes.len()
        )));
    }
    let mut dst = [0u8; 6];
    let mut src = [0u8; 6];
    dst.copy_from_slice(&bytes[0..6]);
    src.copy_from_slice(&bytes[6..12]);
    Ok((MacAddr(dst), MacAddr(src)))
}
