//! JSON topology files
//!
//! ```json
//! {"devices": [{"type": "STPSwitch", "name": "s1", "x": 0, "y": 0, "priority": 4096,
//!   "interfaces": [{"name": "eth0", "mac": "02:00:00:00:00:01",
//!                   "connected_to": {"device": "s2", "interface": "eth0"}, "cost": 4}]}]}
//! ```
//!
//! Every link is recorded on both of its ends. Loading instantiates all
//! devices first and wires links second, skipping a link when either side is
//! already connected.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use stpsim_core::{Device, DeviceKind, Error, MacAddr, Network, Result};

use crate::host::Host;
use crate::hub::Hub;
use crate::stp::StpSwitch;
use crate::switch::Switch;

/// Top-level document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopologyFile {
    pub devices: Vec<DeviceRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    /// `Host`, `Hub`, `Switch` or `STPSwitch`
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    /// Bridge priority, STP switches only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u16>,
    /// Bridge MAC, STP switches only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac: Option<String>,
    #[serde(default)]
    pub interfaces: Vec<InterfaceRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceRecord {
    pub name: String,
    /// Random unicast when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connected_to: Option<PeerRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<u32>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub disabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerRecord {
    pub device: String,
    pub interface: String,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl TopologyFile {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Snapshot of every device and link in `network`
    pub fn capture(network: &Network) -> Self {
        Self {
            devices: network.devices().map(record).collect(),
        }
    }

    /// Names and peers must resolve before the network is touched
    fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();
        for device in &self.devices {
            device.kind.parse::<DeviceKind>()?;
            if !names.insert(device.name.as_str()) {
                return Err(Error::persisted(format!("duplicate device '{}'", device.name)));
            }
            let mut ifaces = HashSet::new();
            for iface in &device.interfaces {
                if !ifaces.insert(iface.name.as_str()) {
                    return Err(Error::persisted(format!(
                        "duplicate interface '{}.{}'",
                        device.name, iface.name
                    )));
                }
            }
        }

        for device in &self.devices {
            for iface in &device.interfaces {
                let Some(peer) = &iface.connected_to else {
                    continue;
                };
                if peer.device == device.name && peer.interface == iface.name {
                    return Err(Error::persisted(format!(
                        "'{}.{}' is connected to itself",
                        device.name, iface.name
                    )));
                }
                let known = self
                    .devices
                    .iter()
                    .find(|d| d.name == peer.device)
                    .map_or(false, |d| d.interfaces.iter().any(|i| i.name == peer.interface));
                if !known {
                    return Err(Error::persisted(format!(
                        "'{}.{}' is connected to unknown '{}.{}'",
                        device.name, iface.name, peer.device, peer.interface
                    )));
                }
            }
        }
        Ok(())
    }

    /// Replace the contents of `network` with this topology
    pub fn apply(&self, network: &mut Network) -> Result<()> {
        self.validate()?;
        let devices = self
            .devices
            .iter()
            .map(instantiate)
            .collect::<Result<Vec<_>>>()?;

        network.clear();
        for device in devices {
            network.add_device(device).map_err(persisted)?;
        }

        let mut links = 0;
        for device in &self.devices {
            for iface in &device.interfaces {
                let Some(peer) = &iface.connected_to else {
                    continue;
                };
                let a = network.port(&device.name, &iface.name)?;
                let b = network.port(&peer.device, &peer.interface)?;
                if network.peer(&a)?.is_some() || network.peer(&b)?.is_some() {
                    continue;
                }
                network.connect(&a, &b).map_err(persisted)?;
                links += 1;
            }
        }

        info!(devices = self.devices.len(), links, "Topology loaded");
        Ok(())
    }
}

fn persisted(err: Error) -> Error {
    match err {
        Error::InvalidPersistedData(_) => err,
        other => Error::persisted(other.to_string()),
    }
}

fn parse_mac(text: &str) -> Result<MacAddr> {
    MacAddr::parse_unicast(text).map_err(persisted)
}

fn instantiate(record: &DeviceRecord) -> Result<Box<dyn Device>> {
    let name = record.name.clone();
    let mut device: Box<dyn Device> = match record.kind.parse::<DeviceKind>()? {
        DeviceKind::Host => Box::new(Host::new(name)),
        DeviceKind::Hub => Box::new(Hub::new(name)),
        DeviceKind::Switch => Box::new(Switch::new(name)),
        DeviceKind::StpSwitch => {
            let mut switch = StpSwitch::new(name);
            if let Some(mac) = &record.mac {
                switch.set_bridge_mac(parse_mac(mac)?)?;
            }
            Box::new(switch)
        }
    };
    device.core_mut().set_position(record.x, record.y);

    for iface in &record.interfaces {
        let mac = match &iface.mac {
            Some(text) => parse_mac(text)?,
            None => MacAddr::random_unicast(),
        };
        device.add_interface(&iface.name, mac).map_err(persisted)?;
    }

    let device_name = record.name.clone();
    match device.as_spanning_tree_mut() {
        Some(stp) => {
            if let Some(priority) = record.priority {
                stp.set_bridge_priority(priority);
            }
            for iface in &record.interfaces {
                if let Some(cost) = iface.cost {
                    stp.set_path_cost(&iface.name, cost)?;
                }
                if iface.disabled {
                    stp.disable_port(&iface.name)?;
                }
            }
        }
        None if record.priority.is_some() || record.mac.is_some() => {
            warn!(device = %device_name, "Ignoring bridge settings on a non-STP device");
        }
        None => {}
    }
    Ok(device)
}

fn record(device: &dyn Device) -> DeviceRecord {
    let stp = device.as_spanning_tree();
    let (x, y) = device.core().position();
    DeviceRecord {
        kind: device.kind().as_str().to_string(),
        name: device.name().to_string(),
        x,
        y,
        priority: stp.map(|s| s.bridge_priority()),
        mac: stp.map(|s| s.bridge_mac().to_string()),
        interfaces: device
            .core()
            .interfaces()
            .iter()
            .map(|iface| InterfaceRecord {
                name: iface.name().to_string(),
                mac: Some(iface.mac().to_string()),
                connected_to: iface.peer().map(|peer| PeerRecord {
                    device: peer.device.clone(),
                    interface: peer.interface.clone(),
                }),
                cost: stp.and_then(|s| s.path_cost(iface.name())),
                disabled: stp
                    .and_then(|s| s.port_state(iface.name()))
                    .map_or(false, |state| state == stpsim_core::PortState::Disabled),
            })
            .collect(),
    }
}

/// Replace the contents of `network` with the topology in `json`
pub fn load(network: &mut Network, json: &str) -> Result<()> {
    TopologyFile::from_json(json)?.apply(network)
}

/// Serialize `network` as pretty-printed JSON
pub fn save(network: &Network) -> Result<String> {
    TopologyFile::capture(network).to_json()
}

pub fn load_file(network: &mut Network, path: impl AsRef<Path>) -> Result<()> {
    let json = fs::read_to_string(path)?;
    load(network, &json)
}

pub fn save_file(network: &Network, path: impl AsRef<Path>) -> Result<()> {
    fs::write(path, save(network)?)?;
    Ok(())
}
