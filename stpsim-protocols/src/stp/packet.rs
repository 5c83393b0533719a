//! Bridge identifiers and BPDU ordering

use std::cmp::Ordering;
use std::fmt;

use stpsim_core::MacAddr;
use stpsim_packet::ConfigBpdu;

/// Bridge ID: priority in the high 16 bits, MAC in the low 48
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Identifier {
    /// Bridge priority (0-65535, default 32768)
    pub priority: u16,
    /// Bridge MAC address
    pub mac: MacAddr,
}

impl Identifier {
    pub fn new(priority: u16, mac: MacAddr) -> Self {
        Self { priority, mac }
    }

    /// Numeric ordering key
    pub fn value(&self) -> u64 {
        ((self.priority as u64) << 48) | self.mac.to_u64()
    }
}

impl Ord for Identifier {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value().cmp(&other.value())
    }
}

impl PartialOrd for Identifier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}.{}", self.priority, self.mac)
    }
}

/// Configuration BPDU contents; smaller is better
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bpdu {
    pub root: Identifier,
    /// Path cost to the root
    pub cost: u32,
    /// Sending bridge
    pub bridge: Identifier,
    /// Sending port
    pub port: u16,
}

impl Bpdu {
    /// What a bridge believes before hearing anyone: it is the root
    pub fn own(bridge: Identifier, port: u16) -> Self {
        Self {
            root: bridge,
            cost: 0,
            bridge,
            port,
        }
    }

    pub fn is_own(&self, bridge: Identifier, port: u16) -> bool {
        *self == Self::own(bridge, port)
    }

    pub fn with_added_cost(self, cost: u32) -> Self {
        Self {
            cost: self.cost.saturating_add(cost),
            ..self
        }
    }

    pub fn to_config(&self) -> ConfigBpdu {
        ConfigBpdu {
            root_priority: self.root.priority,
            root_mac: self.root.mac,
            root_cost: self.cost,
            bridge_priority: self.bridge.priority,
            bridge_mac: self.bridge.mac,
            port: self.port,
        }
    }

    pub fn from_config(config: &ConfigBpdu) -> Self {
        Self {
            root: Identifier::new(config.root_priority, config.root_mac),
            cost: config.root_cost,
            bridge: Identifier::new(config.bridge_priority, config.bridge_mac),
            port: config.port,
        }
    }
}

impl Ord for Bpdu {
    fn cmp(&self, other: &Self) -> Ordering {
        self.root
            .cmp(&other.root)
            .then(self.cost.cmp(&other.cost))
            .then(self.bridge.cmp(&other.bridge))
            .then(self.port.cmp(&other.port))
    }
}

impl PartialOrd for Bpdu {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Bpdu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "root {} cost {} bridge {} port {}",
            self.root, self.cost, self.bridge, self.port
        )
    }
}
