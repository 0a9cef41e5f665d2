//! Data objects: address ranges in a module that hold data rather than code.

use std::fmt;
use uuid::Uuid;

use crate::core::addr::Addr;
use crate::core::addr_range::AddrRange;
use crate::core::node::{fresh_uuid, Extension, Node, NodeKind};

/// A run of data in a module's address space. Not a CFG vertex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataObject {
    uuid: Uuid,
    pub address: Addr,
    pub size: u64,
    extensions: Vec<Extension>,
}

impl DataObject {
    pub fn new(address: Addr, size: u64) -> Self {
        Self::with_uuid(fresh_uuid(), address, size)
    }

    pub fn with_uuid(uuid: Uuid, address: Addr, size: u64) -> Self {
        Self {
            uuid,
            address,
            size,
            extensions: Vec::new(),
        }
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

impl Node for DataObject {
    fn uuid(&self) -> Uuid {
        self.uuid
    }

    fn kind(&self) -> NodeKind {
        NodeKind::DataObject
    }
}

impl fmt::Display for DataObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DataObject {} {}", self.uuid, self.range())
    }
}
