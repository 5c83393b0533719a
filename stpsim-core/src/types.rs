//! Common types used throughout stpsim

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::{Error, Result};

/// MAC Address (6 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct MacAddr(pub [u8; 6]);

impl MacAddr {
    /// Largest value a 48-bit address can hold
    pub const MAX_VALUE: u64 = 0xFFFF_FFFF_FFFF;

    /// Create a new MAC address
    pub const fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    /// Broadcast MAC address (ff:ff:ff:ff:ff:ff)
    pub const fn broadcast() -> Self {
        Self([0xff, 0xff, 0xff, 0xff, 0xff, 0xff])
    }

    /// Zero MAC address (00:00:00:00:00:00)
    pub const fn zero() -> Self {
        Self([0x00, 0x00, 0x00, 0x00, 0x00, 0x00])
    }

    /// Random locally administered unicast address
    pub fn random_unicast() -> Self {
        use rand::Rng;
        let mut mac: [u8; 6] = rand::thread_rng().gen();
        mac[0] &= 0xFE;
        mac[0] |= 0x02;
        Self(mac)
    }

    /// Build from the low 48 bits of `value`
    pub fn from_u64(value: u64) -> Result<Self> {
        if value > Self::MAX_VALUE {
            return Err(Error::invalid_address(format!(
                "0x{:x} does not fit in 48 bits",
                value
            )));
        }
        let b = value.to_be_bytes();
        Ok(Self([b[2], b[3], b[4], b[5], b[6], b[7]]))
    }

    /// Numeric value of the address
    pub fn to_u64(&self) -> u64 {
        let mut b = [0u8; 8];
        b[2..].copy_from_slice(&self.0);
        u64::from_be_bytes(b)
    }

    /// Address `offset` positions after this one; overflowing 48 bits is an error
    pub fn checked_add(&self, offset: u64) -> Result<Self> {
        let value = self
            .to_u64()
            .checked_add(offset)
            .ok_or_else(|| Error::invalid_address(format!("{} + 0x{:x} overflows", self, offset)))?;
        Self::from_u64(value).map_err(|_| {
            Error::invalid_address(format!("{} + 0x{:x} overflows", self, offset))
        })
    }

    /// Parse and require the individual/group bit to be clear
    pub fn parse_unicast(s: &str) -> Result<Self> {
        let mac: MacAddr = s.parse()?;
        if !mac.is_unicast() {
            return Err(Error::invalid_address(format!("{} is not a unicast address", mac)));
        }
        Ok(mac)
    }

    /// Get bytes as slice
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Convert to array
    pub fn octets(&self) -> [u8; 6] {
        self.0
    }

    /// Check if this is the broadcast address
    pub fn is_broadcast(&self) -> bool {
        self.0 == [0xff; 6]
    }

    /// Check if this is a multicast address (bit 0 of first octet is 1)
    pub fn is_multicast(&self) -> bool {
        self.0[0] & 0x01 == 0x01
    }

    /// Check if this is a unicast address
    pub fn is_unicast(&self) -> bool {
        !self.is_multicast()
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

impl FromStr for MacAddr {
    type Err = Error;

    /// Accepts exactly six colon-separated two-digit hex groups
    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 6 {
            return Err(Error::invalid_address(format!("'{}' is not a MAC address", s)));
        }

        let mut bytes = [0u8; 6];
        for (i, part) in parts.iter().enumerate() {
            if part.len() != 2 || !part.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(Error::invalid_address(format!("'{}' is not a MAC address", s)));
            }
            bytes[i] = u8::from_str_radix(part, 16)
                .map_err(|_| Error::invalid_address(format!("'{}' is not a MAC address", s)))?;
        }

        Ok(MacAddr(bytes))
    }
}

impl From<[u8; 6]> for MacAddr {
    fn from(bytes: [u8; 6]) -> Self {
        MacAddr(bytes)
    }
}

/// Process-unique network identity, used to reject cross-network links
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NetworkId(pub u64);

impl NetworkId {
    /// Allocate a fresh identifier
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "net#{}", self.0)
    }
}

/// Interface address inside a network: device name + interface name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PortRef {
    pub network: NetworkId,
    pub device: String,
    pub interface: String,
}

impl PortRef {
    pub fn new(network: NetworkId, device: impl Into<String>, interface: impl Into<String>) -> Self {
        Self {
            network,
            device: device.into(),
            interface: interface.into(),
        }
    }
}

impl fmt::Display for PortRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.device, self.interface)
    }
}

/// Device variants known to the simulator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    Host,
    Hub,
    Switch,
    StpSwitch,
}

impl DeviceKind {
    /// Name used in persisted topologies
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceKind::Host => "Host",
            DeviceKind::Hub => "Hub",
            DeviceKind::Switch => "Switch",
            DeviceKind::StpSwitch => "STPSwitch",
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Host" => Ok(DeviceKind::Host),
            "Hub" => Ok(DeviceKind::Hub),
            "Switch" => Ok(DeviceKind::Switch),
            "STPSwitch" => Ok(DeviceKind::StpSwitch),
            other => Err(Error::persisted(format!("unknown device type '{}'", other))),
        }
    }
}

/// Logical position of a port in the spanning tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortRole {
    Root,
    Designated,
    Blocking,
    Disabled,
}

impl fmt::Display for PortRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PortRole::Root => "root",
            PortRole::Designated => "designated",
            PortRole::Blocking => "blocking",
            PortRole::Disabled => "disabled",
        };
        f.write_str(s)
    }
}

/// Frame-forwarding behavior of a port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortState {
    Blocking,
    Listening,
    Learning,
    Forwarding,
    Disabled,
}

impl PortState {
    /// Source addresses are recorded in these states
    pub fn learns(&self) -> bool {
        matches!(self, PortState::Learning | PortState::Forwarding)
    }

    /// Data frames pass in this state only
    pub fn forwards(&self) -> bool {
        matches!(self, PortState::Forwarding)
    }
}

impl fmt::Display for PortState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PortState::Blocking => "blocking",
            PortState::Listening => "listening",
            PortState::Learning => "learning",
            PortState::Forwarding => "forwarding",
            PortState::Disabled => "disabled",
        };
        f.write_str(s)
    }
}
