//! Packet types and decoded packets
//!
//! A [`PacketType`] is a static layout: header fields, a payload bound and
//! trailer fields. A [`Packet`] holds the values for one layout plus either a
//! decoded next layer or the undecoded payload bytes.

use bytes::{Bytes, BytesMut};
use std::collections::HashMap;
use std::fmt;

use stpsim_core::{Error, MacAddr, Result};

use crate::field::{Cursor, Field, Value};
use crate::layer::LayerTable;

/// Where a packet's payload ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Payload {
    /// Everything after the header
    Rest,
    /// As many bytes as the named length field says
    Length(&'static str),
}

/// Static description of one protocol layer
#[derive(Debug)]
pub struct PacketType {
    /// Key into the layer table
    pub protocol: &'static str,
    pub header: &'static [&'static dyn Field],
    pub payload: Payload,
    pub trailer: &'static [&'static dyn Field],
}

impl PacketType {
    pub fn fields(&self) -> impl Iterator<Item = &'static dyn Field> + '_ {
        self.header.iter().chain(self.trailer.iter()).copied()
    }

    pub fn field(&self, name: &str) -> Option<&'static dyn Field> {
        self.fields().find(|f| f.name() == name)
    }
}

/// One decoded (or to-be-encoded) layer and whatever it carries
#[derive(Debug, Clone)]
pub struct Packet {
    kind: &'static PacketType,
    values: HashMap<&'static str, Value>,
    next: Option<Box<Packet>>,
    /// Payload bytes no layer binding claimed
    load: Bytes,
}

impl Packet {
    /// A packet of `kind` with no values set
    pub fn empty(kind: &'static PacketType) -> Self {
        Self {
            kind,
            values: HashMap::new(),
            next: None,
            load: Bytes::new(),
        }
    }

    /// Build from field values; every name must belong to `kind`
    pub fn new<I, V>(kind: &'static PacketType, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'static str, V)>,
        V: Into<Value>,
    {
        let mut packet = Self::empty(kind);
        for (name, value) in values {
            packet.set(name, value)?;
        }
        Ok(packet)
    }

    /// Decode `bytes` as `kind`, following the layer table for nested layers
    pub fn from_bytes(layers: &LayerTable, kind: &'static PacketType, bytes: &[u8]) -> Result<Self> {
        let mut packet = Self::empty(kind);
        let mut cursor = Cursor::new(bytes);
        packet.parse(layers, &mut cursor)?;
        Ok(packet)
    }

    fn parse(&mut self, layers: &LayerTable, cursor: &mut Cursor<'_>) -> Result<()> {
        for field in self.kind.header {
            field.parse(cursor, self)?;
        }

        let payload = match self.kind.payload {
            Payload::Rest => cursor.take_rest(),
            Payload::Length(name) => {
                let len = self.u64(name)? as usize;
                cursor.take(len, self.kind.protocol)?
            }
        };

        match layers.next_for(self) {
            Some(kind) => {
                let mut inner = Packet::empty(kind);
                inner.parse(layers, &mut Cursor::new(payload))?;
                self.next = Some(Box::new(inner));
            }
            None => self.load = Bytes::copy_from_slice(payload),
        }

        for field in self.kind.trailer {
            field.parse(cursor, self)?;
        }
        Ok(())
    }

    /// Encode header fields, then the next layer (or load), then trailer fields
    pub fn raw(&self) -> Result<Bytes> {
        let mut buf = BytesMut::new();
        for field in self.kind.header {
            field.raw(&mut buf, self)?;
        }
        buf.extend_from_slice(&self.payload()?);
        for field in self.kind.trailer {
            field.raw(&mut buf, self)?;
        }
        Ok(buf.freeze())
    }

    /// Encoded payload: the next layer if there is one, the load otherwise
    pub fn payload(&self) -> Result<Bytes> {
        match &self.next {
            Some(next) => next.raw(),
            None => Ok(self.load.clone()),
        }
    }

    pub fn kind(&self) -> &'static PacketType {
        self.kind
    }

    pub fn protocol(&self) -> &'static str {
        self.kind.protocol
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn require(&self, name: &str) -> Result<&Value> {
        self.values.get(name).ok_or_else(|| {
            Error::construction(format!("{} has no value for '{}'", self.kind.protocol, name))
        })
    }

    pub fn u64(&self, name: &str) -> Result<u64> {
        self.require(name)?.as_u64().ok_or_else(|| {
            Error::construction(format!("{}.{} is not an unsigned integer", self.kind.protocol, name))
        })
    }

    pub fn u16(&self, name: &str) -> Result<u16> {
        u16::try_from(self.u64(name)?).map_err(|_| {
            Error::construction(format!("{}.{} does not fit in 16 bits", self.kind.protocol, name))
        })
    }

    pub fn u32(&self, name: &str) -> Result<u32> {
        u32::try_from(self.u64(name)?).map_err(|_| {
            Error::construction(format!("{}.{} does not fit in 32 bits", self.kind.protocol, name))
        })
    }

    pub fn mac(&self, name: &str) -> Result<MacAddr> {
        self.require(name)?.as_mac().ok_or_else(|| {
            Error::construction(format!("{}.{} is not a MAC address", self.kind.protocol, name))
        })
    }

    /// Set a field declared by this packet's type
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let field = self.kind.field(name).ok_or_else(|| {
            Error::construction(format!("{} has no field '{}'", self.kind.protocol, name))
        })?;
        self.values.insert(field.name(), value.into());
        Ok(())
    }

    pub(crate) fn insert(&mut self, name: &'static str, value: Value) {
        self.values.insert(name, value);
    }

    pub fn next(&self) -> Option<&Packet> {
        self.next.as_deref()
    }

    pub fn set_next(&mut self, next: Option<Packet>) {
        self.next = next.map(Box::new);
    }

    pub fn with_next(mut self, next: Packet) -> Self {
        self.next = Some(Box::new(next));
        self
    }

    /// Undecoded payload bytes
    pub fn load(&self) -> &Bytes {
        &self.load
    }

    pub fn with_load(mut self, load: impl Into<Bytes>) -> Self {
        self.load = load.into();
        self
    }

    /// First layer in the chain (this one included) speaking `protocol`
    pub fn find(&self, protocol: &str) -> Option<&Packet> {
        let mut layer = Some(self);
        while let Some(packet) = layer {
            if packet.protocol() == protocol {
                return Some(packet);
            }
            layer = packet.next();
        }
        None
    }

    /// One-line rendering of the whole chain
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        let mut layer = Some(self);
        while let Some(packet) = layer {
            let fields: Vec<String> = packet
                .kind
                .fields()
                .map(|f| format!("{}={}", f.name(), f.render(packet)))
                .collect();
            parts.push(format!("{}({})", packet.protocol(), fields.join(", ")));
            if packet.next.is_none() && !packet.load.is_empty() {
                parts.push(format!("Raw({} bytes)", packet.load.len()));
            }
            layer = packet.next();
        }
        parts.join(" / ")
    }
}

/// Derived fields (length, padding, checksum) are left out of the comparison
impl PartialEq for Packet {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.kind, other.kind)
            && self
                .kind
                .fields()
                .filter(|f| !f.derived())
                .all(|f| self.get(f.name()) == other.get(f.name()))
            && self.next == other.next
            && self.load == other.load
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}
