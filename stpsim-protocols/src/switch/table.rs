//! MAC address table of a learning bridge

use std::collections::HashMap;

use stpsim_core::MacAddr;

/// Source address → interface it was last seen on
#[derive(Debug, Clone, Default)]
pub struct MacTable {
    entries: HashMap<MacAddr, String>,
}

impl MacTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `mac` as reachable through `interface`
    ///
    /// Group addresses are never learned. Returns true if the table changed.
    pub fn learn(&mut self, mac: MacAddr, interface: &str) -> bool {
        if mac.is_multicast() {
            return false;
        }
        match self.entries.get(&mac) {
            Some(known) if known == interface => false,
            _ => {
                self.entries.insert(mac, interface.to_string());
                true
            }
        }
    }

    pub fn lookup(&self, mac: &MacAddr) -> Option<&str> {
        self.entries.get(mac).map(String::as_str)
    }

    /// Drop every entry pointing at `interface`
    pub fn forget_interface(&mut self, interface: &str) {
        self.entries.retain(|_, port| port != interface);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries sorted by address
    pub fn entries(&self) -> Vec<(MacAddr, String)> {
        let mut entries: Vec<_> = self
            .entries
            .iter()
            .map(|(mac, port)| (*mac, port.clone()))
            .collect();
        entries.sort();
        entries
    }

    /// Interfaces a frame for `dst` that arrived on `ingress` goes out of
    ///
    /// `candidates` are the interfaces allowed to transmit. A known unicast
    /// destination goes to its port only, and nowhere if that port is the
    /// ingress or not a candidate; anything else floods every candidate
    /// except the ingress.
    pub fn egress<'a, I>(&self, dst: &MacAddr, ingress: &str, candidates: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        if dst.is_unicast() {
            if let Some(port) = self.lookup(dst) {
                if port == ingress {
                    return Vec::new();
                }
                return candidates
                    .into_iter()
                    .filter(|c| *c == port)
                    .map(str::to_string)
                    .collect();
            }
        }
        candidates
            .into_iter()
            .filter(|c| *c != ingress)
            .map(str::to_string)
            .collect()
    }
}
