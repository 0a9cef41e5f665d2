//! The bounded byte image of a module.
//!
//! `ImageByteMap` wraps a [`ByteMap`] with load metadata and an inclusive
//! `[min, max]` address window. Every read and write is checked against the
//! window before the underlying map is touched, so a rejected write never
//! leaves partial data behind.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::core::addr::Addr;
use crate::core::addr_range::AddrRange;
use crate::core::byte_map::ByteMap;
use crate::core::node::{fresh_uuid, Extension, Node, NodeKind};
use crate::error::{IrError, Result};

/// Byte order of multi-byte values stored in the image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ByteOrder {
    #[default]
    Undefined,
    Big,
    Little,
}

impl ByteOrder {
    pub fn to_wire(self) -> u32 {
        match self {
            ByteOrder::Undefined => 0,
            ByteOrder::Big => 1,
            ByteOrder::Little => 2,
        }
    }

    pub fn from_wire(value: u32) -> Option<Self> {
        match value {
            0 => Some(ByteOrder::Undefined),
            1 => Some(ByteOrder::Big),
            2 => Some(ByteOrder::Little),
            _ => None,
        }
    }
}

impl fmt::Display for ByteOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ByteOrder::Undefined => write!(f, "undefined"),
            ByteOrder::Big => write!(f, "big"),
            ByteOrder::Little => write!(f, "little"),
        }
    }
}

/// A module's raw bytes plus the metadata describing where they load.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageByteMap {
    uuid: Uuid,
    /// Path of the file the bytes were read from
    pub file_name: String,
    /// Address the image is loaded at
    pub base_address: Addr,
    /// Address execution starts at
    pub entry_point_address: Addr,
    /// Difference between the actual and the preferred load address
    pub rebase_delta: i64,
    /// Byte order used by typed reads
    pub byte_order: ByteOrder,
    min: Addr,
    max: Addr,
    is_relocated: bool,
    bytes: ByteMap,
    extensions: Vec<Extension>,
}

impl Default for ImageByteMap {
    fn default() -> Self {
        Self::with_uuid(fresh_uuid())
    }
}

impl ImageByteMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty image that keeps a known identity (used when decoding).
    pub fn with_uuid(uuid: Uuid) -> Self {
        Self {
            uuid,
            file_name: String::new(),
            base_address: Addr::MIN,
            entry_point_address: Addr::MIN,
            rebase_delta: 0,
            byte_order: ByteOrder::Undefined,
            min: Addr::MIN,
            max: Addr::MIN,
            is_relocated: false,
            bytes: ByteMap::new(),
            extensions: Vec::new(),
        }
    }

    /// Empty image accepting accesses within `[min, max]`.
    pub fn with_bounds(min: Addr, max: Addr) -> Result<Self> {
        let mut image = Self::new();
        image.set_addr_min_max(min, max)?;
        Ok(image)
    }

    /// Replace the legal address window. Fails, leaving the window unchanged,
    /// when `min > max`.
    pub fn set_addr_min_max(&mut self, min: Addr, max: Addr) -> Result<()> {
        if min > max {
            return Err(IrError::InvalidInput(format!(
                "image bounds are inverted: min {} > max {}",
                min, max
            )));
        }
        self.min = min;
        self.max = max;
        Ok(())
    }

    pub fn addr_min_max(&self) -> (Addr, Addr) {
        (self.min, self.max)
    }

    /// The window as a half-open range (`None` for the full address space).
    pub fn bounds(&self) -> Option<AddrRange> {
        AddrRange::from_bounds(self.min, self.max)
    }

    pub fn is_relocated(&self) -> bool {
        self.is_relocated
    }

    pub fn mark_relocated(&mut self) {
        self.is_relocated = true;
    }

    pub(crate) fn set_relocated(&mut self, relocated: bool) {
        self.is_relocated = relocated;
    }

    pub fn extensions(&self) -> &[Extension] {
        &self.extensions
    }

    pub(crate) fn set_extensions(&mut self, extensions: Vec<Extension>) {
        self.extensions = extensions;
    }

    /// Read-only view of the stored runs.
    pub fn byte_map(&self) -> &ByteMap {
        &self.bytes
    }

    pub(crate) fn replace_byte_map(&mut self, bytes: ByteMap) {
        self.bytes = bytes;
    }

    fn check_window(&self, address: Addr, length: u64) -> Result<()> {
        let inside = match address.last_of(length) {
            Some(last) => address >= self.min && last <= self.max,
            // An empty access only has to start inside the window.
            None if length == 0 => address >= self.min && address <= self.max,
            None => false,
        };
        if inside {
            Ok(())
        } else {
            Err(IrError::OutOfRange {
                address,
                length,
                min: self.min,
                max: self.max,
            })
        }
    }

    /// Store `data` at `address`; the whole run must lie within `[min, max]`.
    pub fn set_data(&mut self, address: Addr, data: &[u8]) -> Result<()> {
        self.check_window(address, data.len() as u64)?;
        self.bytes.set_data(address, data)
    }

    /// Store `length` copies of `value` at `address`.
    pub fn fill(&mut self, address: Addr, length: u64, value: u8) -> Result<()> {
        self.check_window(address, length)?;
        self.bytes.fill(address, length, value)
    }

    pub fn get_data(&self, address: Addr, length: u64) -> Result<Vec<u8>> {
        self.check_window(address, length)?;
        self.bytes.get_data(address, length)
    }

    pub fn get_slice(&self, address: Addr, length: u64) -> Result<&[u8]> {
        self.check_window(address, length)?;
        self.bytes.get_slice(address, length)
    }

    fn read_array<const N: usize>(&self, address: Addr) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.get_slice(address, N as u64)?);
        Ok(out)
    }

    fn require_byte_order(&self) -> Result<ByteOrder> {
        match self.byte_order {
            ByteOrder::Undefined => Err(IrError::InvalidInput(
                "typed read from an image with undefined byte order".to_string(),
            )),
            order => Ok(order),
        }
    }

    /// Read a u16 in the image byte order.
    pub fn read_u16(&self, address: Addr) -> Result<u16> {
        let order = self.require_byte_order()?;
        let b = self.read_array::<2>(address)?;
        Ok(match order {
            ByteOrder::Big => u16::from_be_bytes(b),
            _ => u16::from_le_bytes(b),
        })
    }

    /// Read a u32 in the image byte order.
    pub fn read_u32(&self, address: Addr) -> Result<u32> {
        let order = self.require_byte_order()?;
        let b = self.read_array::<4>(address)?;
        Ok(match order {
            ByteOrder::Big => u32::from_be_bytes(b),
            _ => u32::from_le_bytes(b),
        })
    }

    /// Read a u64 in the image byte order.
    pub fn read_u64(&self, address: Addr) -> Result<u64> {
        let order = self.require_byte_order()?;
        let b = self.read_array::<8>(address)?;
        Ok(match order {
            ByteOrder::Big => u64::from_be_bytes(b),
            _ => u64::from_le_bytes(b),
        })
    }
}

impl Node for ImageByteMap {
    fn uuid(&self) -> Uuid {
        self.uuid
    }

    fn kind(&self) -> NodeKind {
        NodeKind::ImageByteMap
    }
}
