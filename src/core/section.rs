//! Section type for named address-range views into a module image.
//!
//! A section does not store bytes; its contents are whatever the owning
//! module's [`ImageByteMap`](crate::core::image_byte_map::ImageByteMap) holds
//! inside its range.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::core::addr::Addr;
use crate::core::addr_range::AddrRange;
use crate::core::node::{fresh_uuid, Extension, Node, NodeKind};

bitflags! {
    /// Attribute flags for sections
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct SectionFlags: u32 {
        const READABLE = 1 << 0;
        const WRITABLE = 1 << 1;
        const EXECUTABLE = 1 << 2;
        const LOADED = 1 << 3;
        const INITIALIZED = 1 << 4;
        const THREAD_LOCAL = 1 << 5;
    }
}

impl SectionFlags {
    /// Check if section is readable and executable (code section)
    pub fn is_code(&self) -> bool {
        self.contains(Self::READABLE | Self::EXECUTABLE) && !self.contains(Self::WRITABLE)
    }

    /// Check if section is readable and writable (data section)
    pub fn is_data(&self) -> bool {
        self.contains(Self::READABLE | Self::WRITABLE) && !self.contains(Self::EXECUTABLE)
    }
}

impl fmt::Display for SectionFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut perms = String::with_capacity(3);
        perms.push(if self.contains(Self::READABLE) { 'r' } else { '-' });
        perms.push(if self.contains(Self::WRITABLE) { 'w' } else { '-' });
        perms.push(if self.contains(Self::EXECUTABLE) { 'x' } else { '-' });
        write!(f, "{}", perms)
    }
}

/// A named region of a module's address space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    uuid: Uuid,
    /// Section name (e.g., ".text", ".data")
    pub name: String,
    pub address: Addr,
    pub size: u64,
    pub flags: SectionFlags,
    extensions: Vec<Extension>,
}

impl Section {
    pub fn new(name: impl Into<String>, address: Addr, size: u64) -> Self {
        Self::with_uuid(fresh_uuid(), name, address, size)
    }

    pub fn with_uuid(uuid: Uuid, name: impl Into<String>, address: Addr, size: u64) -> Self {
        Self {
            uuid,
            name: name.into(),
            address,
            size,
            flags: SectionFlags::empty(),
            extensions: Vec::new(),
        }
    }

    /// Builder-style flag setter.
    pub fn with_flags(mut self, flags: SectionFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn range(&self) -> AddrRange {
        AddrRange::new(self.address, self.size)
    }

    pub fn contains_address(&self, address: Addr) -> bool {
        self.range().contains(address)
    }

    pub fn extensions(&self) -> &[Extension] {
        &self.extensions
    }

    pub(crate) fn set_extensions(&mut self, extensions: Vec<Extension>) {
        self.extensions = extensions;
    }
}

impl Node for Section {
    fn uuid(&self) -> Uuid {
        self.uuid
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Section
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Section '{}' {} {}", self.name, self.range(), self.flags)
    }
}
