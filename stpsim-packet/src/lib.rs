//! Packet codec for the STP simulator
//!
//! Frames are described declaratively: each protocol layer is a static
//! [`PacketType`] built from [`Field`] primitives, and a [`LayerTable`]
//! decides which layer follows which. The concrete layouts are:
//!
//! - [`ethernet`] - Ethernet II header and frame dissection
//! - [`dot3`] - IEEE 802.3 framing with padding and FCS
//! - [`llc`] - LLC header, including the TEST command/response
//! - [`bpdu`] - configuration BPDU payload
//!
//! ```rust
//! use stpsim_packet::{bpdu, ethernet, LayerTable};
//!
//! let config = bpdu::ConfigBpdu {
//!     root_priority: 32768,
//!     root_mac: "00:00:00:00:00:01".parse().unwrap(),
//!     root_cost: 0,
//!     bridge_priority: 32768,
//!     bridge_mac: "00:00:00:00:00:01".parse().unwrap(),
//!     port: 1,
//! };
//! let raw = bpdu::stp_frame(config.bridge_mac, &config).raw().unwrap();
//!
//! let packet = ethernet::dissect(&LayerTable::standard(), &raw).unwrap();
//! assert!(packet.find("BPDU").is_some());
//! ```

pub mod bpdu;
pub mod checksum;
pub mod dot3;
pub mod ethernet;
pub mod field;
pub mod layer;
pub mod llc;
pub mod packet;

// Re-export commonly used types for convenience
pub use bpdu::{ConfigBpdu, BPDU, STP_MULTICAST};
pub use dot3::DOT3;
pub use ethernet::{dissect, peek_addresses, ETHERNET};
pub use field::{Cursor, Field, Value};
pub use layer::LayerTable;
pub use llc::LLC;
pub use packet::{Packet, PacketType, Payload};
