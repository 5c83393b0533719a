//! Field primitives
//!
//! A [`Field`] knows how to read its value from the front of a [`Cursor`],
//! append its encoding to a buffer, and render itself for humans. Fields are
//! declared as statics and grouped into a [`PacketType`](crate::PacketType).

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::fmt;

use stpsim_core::{Error, MacAddr, Result};

use crate::checksum;
use crate::packet::Packet;

/// Bounds-checked reader over one packet's bytes
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Bytes consumed since the start of the packet
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    pub fn len(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Consume exactly `n` bytes, or fail with a length error naming `what`
    pub fn take(&mut self, n: usize, what: &str) -> Result<&'a [u8]> {
        if self.len() < n {
            return Err(Error::parsing(format!(
                "{}: need {} bytes, {} left",
                what,
                n,
                self.len()
            )));
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    /// Consume everything left
    pub fn take_rest(&mut self) -> &'a [u8] {
        let out = &self.data[self.pos..];
        self.pos = self.data.len();
        out
    }
}

/// A decoded field value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    Mac(MacAddr),
    Bytes(Bytes),
}

impl Value {
    /// Unsigned view; negative numbers and non-numeric values yield `None`
    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Value::U8(v) => Some(v as u64),
            Value::U16(v) => Some(v as u64),
            Value::U32(v) => Some(v as u64),
            Value::U64(v) => Some(v),
            Value::I8(v) => u64::try_from(v).ok(),
            Value::I16(v) => u64::try_from(v).ok(),
            Value::I32(v) => u64::try_from(v).ok(),
            Value::I64(v) => u64::try_from(v).ok(),
            Value::Mac(_) | Value::Bytes(_) => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::I8(v) => Some(v as i64),
            Value::I16(v) => Some(v as i64),
            Value::I32(v) => Some(v as i64),
            Value::I64(v) => Some(v),
            Value::U8(v) => Some(v as i64),
            Value::U16(v) => Some(v as i64),
            Value::U32(v) => Some(v as i64),
            Value::U64(v) => i64::try_from(v).ok(),
            Value::Mac(_) | Value::Bytes(_) => None,
        }
    }

    pub fn as_mac(&self) -> Option<MacAddr> {
        match self {
            Value::Mac(mac) => Some(*mac),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::U8(v) => write!(f, "{}", v),
            Value::U16(v) => write!(f, "{}", v),
            Value::U32(v) => write!(f, "{}", v),
            Value::U64(v) => write!(f, "{}", v),
            Value::I8(v) => write!(f, "{}", v),
            Value::I16(v) => write!(f, "{}", v),
            Value::I32(v) => write!(f, "{}", v),
            Value::I64(v) => write!(f, "{}", v),
            Value::Mac(mac) => write!(f, "{}", mac),
            Value::Bytes(b) => write!(f, "{} bytes", b.len()),
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

value_from! {
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    MacAddr => Mac,
    Bytes => Bytes,
}

/// One named field of a packet layout
pub trait Field: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    /// Read this field from the front of `cursor` into `packet`
    fn parse(&self, cursor: &mut Cursor<'_>, packet: &mut Packet) -> Result<()>;

    /// Append the encoding; `buf` holds the packet's bytes written so far
    fn raw(&self, buf: &mut BytesMut, packet: &Packet) -> Result<()>;

    /// Recomputed from the rest of the packet on every encode
    fn derived(&self) -> bool {
        false
    }

    /// Human-readable value
    fn render(&self, packet: &Packet) -> String {
        match packet.get(self.name()) {
            Some(value) => value.to_string(),
            None => "-".to_string(),
        }
    }
}

/// Byte width of a fixed-size integer field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    One,
    Two,
    Four,
    Eight,
}

impl Width {
    pub const fn bytes(self) -> usize {
        match self {
            Width::One => 1,
            Width::Two => 2,
            Width::Four => 4,
            Width::Eight => 8,
        }
    }
}

/// Big-endian unsigned integer
#[derive(Debug)]
pub struct UInt {
    name: &'static str,
    width: Width,
    hex: bool,
}

impl UInt {
    pub const fn new(name: &'static str, width: Width) -> Self {
        Self {
            name,
            width,
            hex: false,
        }
    }

    pub const fn u8(name: &'static str) -> Self {
        Self::new(name, Width::One)
    }

    pub const fn u16(name: &'static str) -> Self {
        Self::new(name, Width::Two)
    }

    pub const fn u32(name: &'static str) -> Self {
        Self::new(name, Width::Four)
    }

    pub const fn u64(name: &'static str) -> Self {
        Self::new(name, Width::Eight)
    }

    /// Render as zero-padded hex
    pub const fn hex(self) -> Self {
        Self { hex: true, ..self }
    }
}

impl Field for UInt {
    fn name(&self) -> &'static str {
        self.name
    }

    fn parse(&self, cursor: &mut Cursor<'_>, packet: &mut Packet) -> Result<()> {
        let mut raw = cursor.take(self.width.bytes(), self.name)?;
        let value = match self.width {
            Width::One => Value::U8(raw.get_u8()),
            Width::Two => Value::U16(raw.get_u16()),
            Width::Four => Value::U32(raw.get_u32()),
            Width::Eight => Value::U64(raw.get_u64()),
        };
        packet.insert(self.name, value);
        Ok(())
    }

    fn raw(&self, buf: &mut BytesMut, packet: &Packet) -> Result<()> {
        let value = packet.u64(self.name)?;
        let bits = self.width.bytes() * 8;
        if bits < 64 && value >> bits != 0 {
            return Err(Error::construction(format!(
                "{} = {} does not fit in {} bytes",
                self.name,
                value,
                self.width.bytes()
            )));
        }
        match self.width {
            Width::One => buf.put_u8(value as u8),
            Width::Two => buf.put_u16(value as u16),
            Width::Four => buf.put_u32(value as u32),
            Width::Eight => buf.put_u64(value),
        }
        Ok(())
    }

    fn render(&self, packet: &Packet) -> String {
        match packet.get(self.name).and_then(Value::as_u64) {
            Some(v) if self.hex => format!("0x{:0width$x}", v, width = self.width.bytes() * 2),
            Some(v) => v.to_string(),
            None => "-".to_string(),
        }
    }
}

/// Big-endian two's-complement integer
#[derive(Debug)]
pub struct Int {
    name: &'static str,
    width: Width,
    hex: bool,
}

impl Int {
    pub const fn new(name: &'static str, width: Width) -> Self {
        Self {
            name,
            width,
            hex: false,
        }
    }

    pub const fn hex(self) -> Self {
        Self { hex: true, ..self }
    }
}

impl Field for Int {
    fn name(&self) -> &'static str {
        self.name
    }

    fn parse(&self, cursor: &mut Cursor<'_>, packet: &mut Packet) -> Result<()> {
        let mut raw = cursor.take(self.width.bytes(), self.name)?;
        let value = match self.width {
            Width::One => Value::I8(raw.get_i8()),
            Width::Two => Value::I16(raw.get_i16()),
            Width::Four => Value::I32(raw.get_i32()),
            Width::Eight => Value::I64(raw.get_i64()),
        };
        packet.insert(self.name, value);
        Ok(())
    }

    fn raw(&self, buf: &mut BytesMut, packet: &Packet) -> Result<()> {
        let value = packet
            .require(self.name)?
            .as_i64()
            .ok_or_else(|| Error::construction(format!("{} is not a signed integer", self.name)))?;
        let bits = self.width.bytes() * 8;
        if bits < 64 {
            let max = (1i64 << (bits - 1)) - 1;
            let min = -(1i64 << (bits - 1));
            if value < min || value > max {
                return Err(Error::construction(format!(
                    "{} = {} does not fit in {} bytes",
                    self.name,
                    value,
                    self.width.bytes()
                )));
            }
        }
        match self.width {
            Width::One => buf.put_i8(value as i8),
            Width::Two => buf.put_i16(value as i16),
            Width::Four => buf.put_i32(value as i32),
            Width::Eight => buf.put_i64(value),
        }
        Ok(())
    }

    fn render(&self, packet: &Packet) -> String {
        let bits = self.width.bytes() * 8;
        match packet.get(self.name).and_then(Value::as_i64) {
            Some(v) if self.hex => {
                let mask = if bits == 64 { u64::MAX } else { (1u64 << bits) - 1 };
                format!("0x{:0width$x}", (v as u64) & mask, width = bits / 4)
            }
            Some(v) => v.to_string(),
            None => "-".to_string(),
        }
    }
}

/// Six-byte hardware address
#[derive(Debug)]
pub struct MacField {
    name: &'static str,
}

impl MacField {
    pub const fn new(name: &'static str) -> Self {
        Self { name }
    }
}

impl Field for MacField {
    fn name(&self) -> &'static str {
        self.name
    }

    fn parse(&self, cursor: &mut Cursor<'_>, packet: &mut Packet) -> Result<()> {
        let raw = cursor.take(6, self.name)?;
        let mut octets = [0u8; 6];
        octets.copy_from_slice(raw);
        packet.insert(self.name, Value::Mac(MacAddr(octets)));
        Ok(())
    }

    fn raw(&self, buf: &mut BytesMut, packet: &Packet) -> Result<()> {
        buf.put_slice(packet.mac(self.name)?.as_bytes());
        Ok(())
    }
}

/// Two-byte length of the encoded payload, derived on serialization
#[derive(Debug)]
pub struct LengthField {
    name: &'static str,
}

impl LengthField {
    pub const fn new(name: &'static str) -> Self {
        Self { name }
    }
}

impl Field for LengthField {
    fn name(&self) -> &'static str {
        self.name
    }

    fn derived(&self) -> bool {
        true
    }

    fn parse(&self, cursor: &mut Cursor<'_>, packet: &mut Packet) -> Result<()> {
        let mut raw = cursor.take(2, self.name)?;
        packet.insert(self.name, Value::U16(raw.get_u16()));
        Ok(())
    }

    fn raw(&self, buf: &mut BytesMut, packet: &Packet) -> Result<()> {
        let len = packet.payload()?.len();
        let len = u16::try_from(len).map_err(|_| {
            Error::construction(format!("{}: payload of {} bytes is too long", self.name, len))
        })?;
        buf.put_u16(len);
        Ok(())
    }
}

/// Zero bytes up to a minimum packet size
#[derive(Debug)]
pub struct Padding {
    name: &'static str,
    min_size: usize,
}

impl Padding {
    pub const fn new(name: &'static str, min_size: usize) -> Self {
        Self { name, min_size }
    }
}

impl Field for Padding {
    fn name(&self) -> &'static str {
        self.name
    }

    fn derived(&self) -> bool {
        true
    }

    fn parse(&self, cursor: &mut Cursor<'_>, packet: &mut Packet) -> Result<()> {
        let needed = self.min_size.saturating_sub(cursor.position());
        let pad = cursor.take(needed, self.name)?;
        packet.insert(self.name, Value::Bytes(Bytes::copy_from_slice(pad)));
        Ok(())
    }

    fn raw(&self, buf: &mut BytesMut, _packet: &Packet) -> Result<()> {
        let needed = self.min_size.saturating_sub(buf.len());
        buf.put_bytes(0, needed);
        Ok(())
    }

    fn render(&self, packet: &Packet) -> String {
        let len = packet
            .get(self.name)
            .and_then(Value::as_bytes)
            .map(|b| b.len())
            .unwrap_or(0);
        format!("{} bytes", len)
    }
}

/// Ethernet FCS over every byte written before it, little-endian on the wire
#[derive(Debug)]
pub struct Crc32 {
    name: &'static str,
}

impl Crc32 {
    pub const fn new(name: &'static str) -> Self {
        Self { name }
    }
}

impl Field for Crc32 {
    fn name(&self) -> &'static str {
        self.name
    }

    fn derived(&self) -> bool {
        true
    }

    fn parse(&self, cursor: &mut Cursor<'_>, packet: &mut Packet) -> Result<()> {
        let mut raw = cursor.take(4, self.name)?;
        packet.insert(self.name, Value::U32(raw.get_u32_le()));
        Ok(())
    }

    fn raw(&self, buf: &mut BytesMut, _packet: &Packet) -> Result<()> {
        let crc = checksum::fcs(&buf[..]);
        buf.put_u32_le(crc);
        Ok(())
    }

    fn render(&self, packet: &Packet) -> String {
        match packet.get(self.name).and_then(Value::as_u64) {
            Some(v) => format!("0x{:08x}", v),
            None => "-".to_string(),
        }
    }
}
