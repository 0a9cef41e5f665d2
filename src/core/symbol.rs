//! Symbol type for named program entities.
//!
//! A symbol names either a raw address or another node of the IR (a block or
//! a data object). Node referents are stored as UUIDs and resolved through
//! the owning tree's registry.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::core::addr::Addr;
use crate::core::node::{fresh_uuid, Extension, Node, NodeKind};

/// Linkage/storage class of a symbol
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageKind {
    #[default]
    Undefined,
    Normal,
    Static,
    Extern,
    Local,
}

impl StorageKind {
    pub fn to_wire(self) -> u32 {
        match self {
            StorageKind::Undefined => 0,
            StorageKind::Normal => 1,
            StorageKind::Static => 2,
            StorageKind::Extern => 3,
            StorageKind::Local => 4,
        }
    }

    pub fn from_wire(value: u32) -> Option<Self> {
        match value {
            0 => Some(StorageKind::Undefined),
            1 => Some(StorageKind::Normal),
            2 => Some(StorageKind::Static),
            3 => Some(StorageKind::Extern),
            4 => Some(StorageKind::Local),
            _ => None,
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageKind::Undefined => write!(f, "Undefined"),
            StorageKind::Normal => write!(f, "Normal"),
            StorageKind::Static => write!(f, "Static"),
            StorageKind::Extern => write!(f, "Extern"),
            StorageKind::Local => write!(f, "Local"),
        }
    }
}

/// What a symbol points at
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SymbolReferent {
    /// Undefined symbol (e.g. an import)
    #[default]
    None,
    /// A raw address
    Address(Addr),
    /// A block or data object, by UUID
    Node(Uuid),
}

impl SymbolReferent {
    pub fn node(&self) -> Option<Uuid> {
        match self {
            SymbolReferent::Node(id) => Some(*id),
            _ => None,
        }
    }
}

/// A named program entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    uuid: Uuid,
    pub name: String,
    pub referent: SymbolReferent,
    pub storage_kind: StorageKind,
    extensions: Vec<Extension>,
}

impl Symbol {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_uuid(fresh_uuid(), name)
    }

    pub fn with_uuid(uuid: Uuid, name: impl Into<String>) -> Self {
        Self {
            uuid,
            name: name.into(),
            referent: SymbolReferent::None,
            storage_kind: StorageKind::Undefined,
            extensions: Vec::new(),
        }
    }

    /// Symbol naming a raw address.
    pub fn at_address(name: impl Into<String>, address: Addr) -> Self {
        Self::new(name).with_referent(SymbolReferent::Address(address))
    }

    /// Symbol naming a block or data object.
    pub fn for_node(name: impl Into<String>, node: Uuid) -> Self {
        Self::new(name).with_referent(SymbolReferent::Node(node))
    }

    pub fn with_referent(mut self, referent: SymbolReferent) -> Self {
        self.referent = referent;
        self
    }

    pub fn with_storage_kind(mut self, storage_kind: StorageKind) -> Self {
        self.storage_kind = storage_kind;
        self
    }

    pub fn extensions(&self) -> &[Extension] {
        &self.extensions
    }

    pub(crate) fn set_extensions(&mut self, extensions: Vec<Extension>) {
        self.extensions = extensions;
    }

    /// The address referent, when the symbol names a raw address.
    pub fn address(&self) -> Option<Addr> {
        match self.referent {
            SymbolReferent::Address(address) => Some(address),
            _ => None,
        }
    }
}

impl Node for Symbol {
    fn uuid(&self) -> Uuid {
        self.uuid
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Symbol
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.referent {
            SymbolReferent::None => write!(f, "{} (undefined)", self.name),
            SymbolReferent::Address(address) => write!(f, "{} @ {}", self.name, address),
            SymbolReferent::Node(id) => write!(f, "{} -> {}", self.name, id),
        }
    }
}
