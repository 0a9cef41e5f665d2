//! Node identity and the per-tree node registry.
//!
//! Every IR entity carries a UUID. A `NodeRegistry` maps the UUIDs of the live
//! entities of one IR tree to their kind and owner; cross-references between
//! entities (symbol referents, CFG vertices, symbolic expressions) are UUIDs
//! resolved through it, never pointers.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::trace;
use uuid::Uuid;

use crate::error::{IrError, Result};

/// Unknown optional wire field, kept so it can be written back out.
pub type Extension = (u32, Vec<u8>);

/// The kinds of entity that can live in an IR tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Ir,
    Module,
    Section,
    Block,
    ProxyBlock,
    DataObject,
    Symbol,
    ImageByteMap,
}

impl NodeKind {
    /// Kinds that may serve as CFG vertices.
    pub fn is_cfg_vertex(&self) -> bool {
        matches!(self, NodeKind::Block | NodeKind::ProxyBlock)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Ir => write!(f, "IR"),
            NodeKind::Module => write!(f, "Module"),
            NodeKind::Section => write!(f, "Section"),
            NodeKind::Block => write!(f, "Block"),
            NodeKind::ProxyBlock => write!(f, "ProxyBlock"),
            NodeKind::DataObject => write!(f, "DataObject"),
            NodeKind::Symbol => write!(f, "Symbol"),
            NodeKind::ImageByteMap => write!(f, "ImageByteMap"),
        }
    }
}

/// Identity shared by every IR entity.
pub trait Node {
    fn uuid(&self) -> Uuid;
    fn kind(&self) -> NodeKind;
}

/// Fresh random identity for a newly constructed node.
pub fn fresh_uuid() -> Uuid {
    Uuid::new_v4()
}

/// What the registry knows about a live node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeEntry {
    pub kind: NodeKind,
    /// Owning container; `None` only for the IR root.
    pub owner: Option<Uuid>,
}

/// UUID table for the live nodes of a single IR tree.
#[derive(Debug, Clone, Default)]
pub struct NodeRegistry {
    entries: HashMap<Uuid, NodeEntry>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a live node under its UUID.
    pub fn register<N: Node + ?Sized>(&mut self, node: &N, owner: Option<Uuid>) -> Result<Uuid> {
        self.register_id(node.uuid(), node.kind(), owner)
    }

    pub fn register_id(&mut self, uuid: Uuid, kind: NodeKind, owner: Option<Uuid>) -> Result<Uuid> {
        if uuid.is_nil() {
            return Err(IrError::InvalidInput(format!(
                "{} cannot be registered with the nil UUID",
                kind
            )));
        }
        if self.entries.contains_key(&uuid) {
            return Err(IrError::DuplicateUuid(uuid));
        }
        self.entries.insert(uuid, NodeEntry { kind, owner });
        trace!(%uuid, %kind, "registered node");
        Ok(uuid)
    }

    /// Register a batch of nodes, all or nothing.
    pub fn register_all(&mut self, nodes: &[(Uuid, NodeEntry)]) -> Result<()> {
        let mut batch = HashSet::with_capacity(nodes.len());
        for (uuid, entry) in nodes {
            if uuid.is_nil() {
                return Err(IrError::InvalidInput(format!(
                    "{} cannot be registered with the nil UUID",
                    entry.kind
                )));
            }
            if self.entries.contains_key(uuid) || !batch.insert(*uuid) {
                return Err(IrError::DuplicateUuid(*uuid));
            }
        }
        for (uuid, entry) in nodes {
            self.entries.insert(*uuid, *entry);
        }
        trace!(count = nodes.len(), "registered node batch");
        Ok(())
    }

    pub fn lookup(&self, uuid: &Uuid) -> Option<NodeEntry> {
        self.entries.get(uuid).copied()
    }

    pub fn contains(&self, uuid: &Uuid) -> bool {
        self.entries.contains_key(uuid)
    }

    pub fn unregister(&mut self, uuid: &Uuid) -> Option<NodeEntry> {
        let removed = self.entries.remove(uuid);
        if let Some(entry) = removed {
            trace!(%uuid, kind = %entry.kind, "unregistered node");
        }
        removed
    }

    /// Re-parent a live node.
    pub fn set_owner(&mut self, uuid: &Uuid, owner: Option<Uuid>) -> Result<()> {
        match self.entries.get_mut(uuid) {
            Some(entry) => {
                entry.owner = owner;
                Ok(())
            }
            None => Err(IrError::UnknownNode(*uuid)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Uuid, &NodeEntry)> {
        self.entries.iter()
    }
}

/// Insertion-ordered collection of owned nodes with UUID lookup.
///
/// Removal shifts later elements down; the relative order of the remaining
/// nodes never changes.
#[derive(Debug, Clone)]
pub struct NodeList<T> {
    items: Vec<T>,
    index: HashMap<Uuid, usize>,
}

impl<T> Default for NodeList<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<T: Node> NodeList<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.items.iter().map(|item| item.uuid())
    }

    pub fn contains(&self, uuid: &Uuid) -> bool {
        self.index.contains_key(uuid)
    }

    pub fn get(&self, uuid: &Uuid) -> Option<&T> {
        self.index.get(uuid).map(|&i| &self.items[i])
    }

    pub fn get_mut(&mut self, uuid: &Uuid) -> Option<&mut T> {
        match self.index.get(uuid) {
            Some(&i) => Some(&mut self.items[i]),
            None => None,
        }
    }

    /// Append a node; its UUID must not already be present.
    pub fn push(&mut self, item: T) -> Result<Uuid> {
        let uuid = item.uuid();
        if self.index.contains_key(&uuid) {
            return Err(IrError::DuplicateUuid(uuid));
        }
        self.index.insert(uuid, self.items.len());
        self.items.push(item);
        Ok(uuid)
    }

    pub fn remove(&mut self, uuid: &Uuid) -> Option<T> {
        let position = self.index.remove(uuid)?;
        let item = self.items.remove(position);
        for slot in self.index.values_mut() {
            if *slot > position {
                *slot -= 1;
            }
        }
        Some(item)
    }
}

impl<T: PartialEq> PartialEq for NodeList<T> {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl<'a, T: Node> IntoIterator for &'a NodeList<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Dummy(Uuid, u32);

    impl Node for Dummy {
        fn uuid(&self) -> Uuid {
            self.0
        }
        fn kind(&self) -> NodeKind {
            NodeKind::Section
        }
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = NodeRegistry::new();
        let node = Dummy(fresh_uuid(), 0);
        let owner = fresh_uuid();
        let id = registry.register(&node, Some(owner)).unwrap();

        assert_eq!(id, node.0);
        let entry = registry.lookup(&id).unwrap();
        assert_eq!(entry.kind, NodeKind::Section);
        assert_eq!(entry.owner, Some(owner));
    }

    #[test]
    fn test_duplicate_uuid_rejected() {
        let mut registry = NodeRegistry::new();
        let id = fresh_uuid();
        registry.register_id(id, NodeKind::Block, None).unwrap();
        let err = registry.register_id(id, NodeKind::Symbol, None).unwrap_err();
        assert!(matches!(err, IrError::DuplicateUuid(u) if u == id));
        assert_eq!(registry.lookup(&id).unwrap().kind, NodeKind::Block);
    }

    #[test]
    fn test_nil_uuid_rejected() {
        let mut registry = NodeRegistry::new();
        assert!(matches!(
            registry.register_id(Uuid::nil(), NodeKind::Block, None),
            Err(IrError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_lookup_after_unregister_is_absent() {
        let mut registry = NodeRegistry::new();
        let id = registry
            .register_id(fresh_uuid(), NodeKind::Block, None)
            .unwrap();
        assert!(registry.unregister(&id).is_some());
        assert!(registry.lookup(&id).is_none());
        assert!(registry.unregister(&id).is_none());
        // The UUID may be reused once its node is gone.
        registry.register_id(id, NodeKind::Block, None).unwrap();
    }

    #[test]
    fn test_register_all_is_atomic() {
        let mut registry = NodeRegistry::new();
        let live = registry
            .register_id(fresh_uuid(), NodeKind::Block, None)
            .unwrap();
        let fresh = fresh_uuid();
        let entry = NodeEntry {
            kind: NodeKind::Symbol,
            owner: None,
        };

        let err = registry
            .register_all(&[(fresh, entry), (live, entry)])
            .unwrap_err();
        assert!(matches!(err, IrError::DuplicateUuid(u) if u == live));
        assert!(!registry.contains(&fresh));

        let err = registry
            .register_all(&[(fresh, entry), (fresh, entry)])
            .unwrap_err();
        assert!(matches!(err, IrError::DuplicateUuid(_)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_node_list_order_survives_removal() {
        let mut list = NodeList::new();
        let ids: Vec<Uuid> = (0..4)
            .map(|i| list.push(Dummy(fresh_uuid(), i)).unwrap())
            .collect();

        assert_eq!(list.remove(&ids[1]).unwrap().1, 1);
        let order: Vec<u32> = list.iter().map(|d| d.1).collect();
        assert_eq!(order, vec![0, 2, 3]);
        assert_eq!(list.get(&ids[3]).unwrap().1, 3);
        assert!(list.get(&ids[1]).is_none());
    }

    #[test]
    fn test_node_list_rejects_duplicates() {
        let mut list = NodeList::new();
        let id = fresh_uuid();
        list.push(Dummy(id, 0)).unwrap();
        assert!(matches!(list.push(Dummy(id, 1)), Err(IrError::DuplicateUuid(_))));
        assert_eq!(list.len(), 1);
    }
}
