//! Code blocks and proxy blocks, the vertices of a module's CFG.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::core::addr::Addr;
use crate::core::addr_range::AddrRange;
use crate::core::node::{fresh_uuid, Extension, Node, NodeKind};

/// A contiguous run of code in a module's address space.
///
/// The block only records where the code lives; the bytes themselves are in
/// the module image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    uuid: Uuid,
    pub address: Addr,
    pub size: u64,
    /// ISA-specific decoding mode (e.g. ARM vs Thumb); 0 when the ISA has one
    pub decode_mode: u64,
    extensions: Vec<Extension>,
}

impl Block {
    pub fn new(address: Addr, size: u64) -> Self {
        Self::with_uuid(fresh_uuid(), address, size)
    }

    pub fn with_uuid(uuid: Uuid, address: Addr, size: u64) -> Self {
        Self {
            uuid,
            address,
            size,
            decode_mode: 0,
            extensions: Vec::new(),
        }
    }

    pub fn with_decode_mode(mut self, decode_mode: u64) -> Self {
        self.decode_mode = decode_mode;
        self
    }

    pub fn range(&self) -> AddrRange {
        AddrRange::new(self.address, self.size)
    }

    pub fn extensions(&self) -> &[Extension] {
        &self.extensions
    }

    pub(crate) fn set_extensions(&mut self, extensions: Vec<Extension>) {
        self.extensions = extensions;
    }
}

impl Node for Block {
    fn uuid(&self) -> Uuid {
        self.uuid
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Block
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Block {} {}", self.uuid, self.range())
    }
}

/// CFG vertex standing in for code the IR does not contain, such as the
/// target of an indirect jump or a call into another module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyBlock {
    uuid: Uuid,
    extensions: Vec<Extension>,
}

impl Default for ProxyBlock {
    fn default() -> Self {
        Self::with_uuid(fresh_uuid())
    }
}

impl ProxyBlock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_uuid(uuid: Uuid) -> Self {
        Self {
            uuid,
            extensions: Vec::new(),
        }
    }

    pub fn extensions(&self) -> &[Extension] {
        &self.extensions
    }

    pub(crate) fn set_extensions(&mut self, extensions: Vec<Extension>) {
        self.extensions = extensions;
    }
}

impl Node for ProxyBlock {
    fn uuid(&self) -> Uuid {
        self.uuid
    }

    fn kind(&self) -> NodeKind {
        NodeKind::ProxyBlock
    }
}

/// A position inside a node: the element's UUID plus a byte displacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Offset {
    pub element_id: Uuid,
    pub displacement: u64,
}

impl Offset {
    pub fn new(element_id: Uuid, displacement: u64) -> Self {
        Self {
            element_id,
            displacement,
        }
    }
}

impl fmt::Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+{:#x}", self.element_id, self.displacement)
    }
}
