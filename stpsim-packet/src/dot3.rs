//! IEEE 802.3 framing
//!
//! dst + src + length, then the LLC payload, zero padding up to a 60 byte
//! frame, and a CRC-32 frame check sequence over everything before it.

use stpsim_core::MacAddr;

use crate::ethernet::{DST, SRC};
use crate::field::{Crc32, LengthField, Padding};
use crate::packet::{Packet, PacketType, Payload};

/// Minimum frame size before the FCS
pub const MIN_FRAME: usize = 60;

/// Length of the trailing frame check sequence
pub const FCS_LEN: usize = 4;

pub static LENGTH: LengthField = LengthField::new("length");
pub static PADDING: Padding = Padding::new("padding", MIN_FRAME);
pub static FCS: Crc32 = Crc32::new("fcs");

pub static DOT3: PacketType = PacketType {
    protocol: "Dot3",
    header: &[&DST, &SRC, &LENGTH],
    payload: Payload::Length("length"),
    trailer: &[&PADDING, &FCS],
};

/// 802.3 frame carrying `payload`; length, padding and FCS are derived on encode
pub fn frame(dst: MacAddr, src: MacAddr, payload: Packet) -> Packet {
    let mut packet = Packet::empty(&DOT3);
    packet.insert("dst", dst.into());
    packet.insert("src", src.into());
    packet.with_next(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum;
    use crate::ethernet::dissect;
    use crate::layer::LayerTable;
    use crate::llc::{self, control};
    use stpsim_core::Error;

    fn addrs() -> (MacAddr, MacAddr) {
        (
            "02:00:00:00:00:02".parse().unwrap(),
            "02:00:00:00:00:01".parse().unwrap(),
        )
    }

    #[test]
    fn test_encode_pads_and_appends_fcs() {
        let (dst, src) = addrs();
        let packet = frame(dst, src, llc::header(0, 0, control::TEST_REQUEST));
        let raw = packet.raw().unwrap();

        assert_eq!(raw.len(), MIN_FRAME + FCS_LEN);
        assert_eq!(&raw[12..14], &[0x00, 0x03]);
        assert_eq!(&raw[14..17], &[0x00, 0x00, 0xE3]);
        assert!(raw[17..MIN_FRAME].iter().all(|b| *b == 0));
        assert!(checksum::fcs_matches(&raw));
    }

    #[test]
    fn test_round_trip() {
        let (dst, src) = addrs();
        let payload = llc::header(0, 0, control::TEST_REPLY).with_load(vec![0xAAu8; 50]);
        let raw = frame(dst, src, payload).raw().unwrap();
        // payload already exceeds the minimum, so no padding
        assert_eq!(raw.len(), 14 + 53 + FCS_LEN);

        let layers = LayerTable::standard();
        let decoded = dissect(&layers, &raw).unwrap();
        assert_eq!(decoded.protocol(), "Dot3");
        assert_eq!(decoded.u64("length").unwrap(), 53);
        let inner = decoded.next().unwrap();
        assert_eq!(inner.u64("control").unwrap(), control::TEST_REPLY as u64);
        assert_eq!(inner.load().len(), 50);
        assert_eq!(decoded.raw().unwrap(), raw);
    }

    #[test]
    fn test_decoded_frame_equals_built_frame() {
        let (dst, src) = addrs();
        let built = frame(dst, src, llc::header(0, 0, control::TEST_REQUEST));
        let decoded = dissect(&LayerTable::standard(), &built.raw().unwrap()).unwrap();

        assert_eq!(decoded, built);
        assert_eq!(decoded.u64("length").unwrap(), 3);
        assert_eq!(
            decoded.get("padding").and_then(|v| v.as_bytes()).map(|b| b.len()),
            Some(MIN_FRAME - 17)
        );

        let other = frame(dst, src, llc::header(0, 0, control::TEST_REPLY));
        assert_ne!(decoded, other);
    }

    #[test]
    fn test_missing_padding_is_error() {
        let (dst, src) = addrs();
        let raw = frame(dst, src, llc::header(0, 0, control::TEST_REQUEST))
            .raw()
            .unwrap();
        let layers = LayerTable::standard();
        assert!(matches!(
            dissect(&layers, &raw[..30]),
            Err(Error::PacketParsing(_))
        ));
        assert!(dissect(&layers, &raw[..MIN_FRAME + 2]).is_err());
    }
}
