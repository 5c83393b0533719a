//! IEEE 802.1D Spanning Tree Protocol
//!
//! [`StpSwitch`] runs the spanning tree algorithm over a learning bridge:
//!
//! - every port stores the best configuration BPDU heard on it
//! - the best stored BPDU decides the root bridge and the root port
//! - a port is Designated while the BPDU this bridge would send on it beats
//!   the stored one, and Blocking otherwise
//! - Root and Designated ports move Listening → Learning → Forwarding one
//!   forward delay at a time
//!
//! ## Packet Format
//!
//! Configuration BPDUs travel in Ethernet II frames of type `0x8042` to
//! `01:81:C2:00:00:00`; see [`stpsim_packet::bpdu`].

pub mod packet;
pub mod port;
pub mod protocol;

pub use packet::{Bpdu, Identifier};
pub use port::PortData;
pub use protocol::StpSwitch;

/// STP protocol constants
pub mod constants {
    /// Bridge priority unless configured
    pub const DEFAULT_BRIDGE_PRIORITY: u16 = 32768;

    /// Path cost of a new port
    pub const DEFAULT_PATH_COST: u32 = 1;

    /// Default timing values, in network time units
    pub const DEFAULT_HELLO_TIME: f64 = 2.0;
    pub const DEFAULT_MAX_AGE: f64 = 20.0;
    pub const DEFAULT_FORWARD_DELAY: f64 = 15.0;
    pub const DEFAULT_HOLD_TIME: f64 = 1.0;
}

/// Protocol timer configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StpTimers {
    /// Interval between configuration BPDUs sent by the root
    pub hello_time: f64,
    /// Lifetime of stored BPDU information
    pub max_age: f64,
    /// Time spent in each of Listening and Learning
    pub forward_delay: f64,
    /// Minimum gap between two BPDUs sent on one port
    pub hold_time: f64,
}

impl Default for StpTimers {
    fn default() -> Self {
        Self {
            hello_time: constants::DEFAULT_HELLO_TIME,
            max_age: constants::DEFAULT_MAX_AGE,
            forward_delay: constants::DEFAULT_FORWARD_DELAY,
            hold_time: constants::DEFAULT_HOLD_TIME,
        }
    }
}
