//! The IR root: an ordered list of modules, an AuxData table and the node
//! registry for the whole tree.
//!
//! The IR is the only place nodes get registered. Modules enter through
//! [`Ir::add_module`], which registers the module and all of its descendants
//! in one step, and are edited in place through [`ModuleEditor`], which
//! keeps the registry in step with every structural change.

use std::fmt;
use std::ops::Deref;
use tracing::debug;
use uuid::Uuid;

use crate::core::addr::Addr;
use crate::core::aux_data::AuxDataTable;
use crate::core::block::{Block, ProxyBlock};
use crate::core::cfg::{Cfg, Edge, EdgeLabel};
use crate::core::data_object::DataObject;
use crate::core::image_byte_map::ImageByteMap;
use crate::core::module::{Extension, FileFormat, Isa, Module};
use crate::core::node::{fresh_uuid, Node, NodeEntry, NodeKind, NodeList, NodeRegistry};
use crate::core::section::Section;
use crate::core::symbol::{Symbol, SymbolReferent};
use crate::core::symbolic_expression::SymbolicExpression;
use crate::error::{IrError, Result};

/// Borrowed view of any live node of a tree
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    Ir(&'a Ir),
    Module(&'a Module),
    Section(&'a Section),
    Block(&'a Block),
    ProxyBlock(&'a ProxyBlock),
    DataObject(&'a DataObject),
    Symbol(&'a Symbol),
    ImageByteMap(&'a ImageByteMap),
}

impl NodeRef<'_> {
    pub fn uuid(&self) -> Uuid {
        match self {
            NodeRef::Ir(n) => n.uuid(),
            NodeRef::Module(n) => n.uuid(),
            NodeRef::Section(n) => n.uuid(),
            NodeRef::Block(n) => n.uuid(),
            NodeRef::ProxyBlock(n) => n.uuid(),
            NodeRef::DataObject(n) => n.uuid(),
            NodeRef::Symbol(n) => n.uuid(),
            NodeRef::ImageByteMap(n) => n.uuid(),
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            NodeRef::Ir(_) => NodeKind::Ir,
            NodeRef::Module(_) => NodeKind::Module,
            NodeRef::Section(_) => NodeKind::Section,
            NodeRef::Block(_) => NodeKind::Block,
            NodeRef::ProxyBlock(_) => NodeKind::ProxyBlock,
            NodeRef::DataObject(_) => NodeKind::DataObject,
            NodeRef::Symbol(_) => NodeKind::Symbol,
            NodeRef::ImageByteMap(_) => NodeKind::ImageByteMap,
        }
    }

    /// Address of a node that has one (blocks and data objects).
    pub fn address(&self) -> Option<Addr> {
        match self {
            NodeRef::Block(b) => Some(b.address),
            NodeRef::DataObject(d) => Some(d.address),
            NodeRef::Section(s) => Some(s.address),
            _ => None,
        }
    }
}

/// Root of an IR tree
#[derive(Debug, Clone)]
pub struct Ir {
    uuid: Uuid,
    modules: NodeList<Module>,
    pub aux_data: AuxDataTable,
    registry: NodeRegistry,
    extensions: Vec<Extension>,
}

impl Default for Ir {
    fn default() -> Self {
        Self::new()
    }
}

impl Ir {
    pub fn new() -> Self {
        Self::with_uuid(fresh_uuid())
    }

    /// Empty tree with a known root identity. A nil UUID is replaced by a
    /// fresh one.
    pub fn with_uuid(uuid: Uuid) -> Self {
        let uuid = if uuid.is_nil() { fresh_uuid() } else { uuid };
        let mut registry = NodeRegistry::new();
        // A brand-new registry cannot hold a duplicate of a non-nil UUID.
        let _ = registry.register_id(uuid, NodeKind::Ir, None);
        Self {
            uuid,
            modules: NodeList::new(),
            aux_data: AuxDataTable::new(),
            registry,
            extensions: Vec::new(),
        }
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    pub fn modules(&self) -> &NodeList<Module> {
        &self.modules
    }

    pub fn module(&self, id: &Uuid) -> Option<&Module> {
        self.modules.get(id)
    }

    /// Attach a module, registering it and every descendant. On failure
    /// nothing is registered and the tree is unchanged.
    pub fn add_module(&mut self, module: Module) -> Result<Uuid> {
        let module_id = module.uuid();
        let mut batch = Vec::with_capacity(1 + module.descendants().len());
        batch.push((
            module_id,
            NodeEntry {
                kind: NodeKind::Module,
                owner: Some(self.uuid),
            },
        ));
        batch.extend(module.descendants().into_iter().map(|(id, kind)| {
            (
                id,
                NodeEntry {
                    kind,
                    owner: Some(module_id),
                },
            )
        }));
        self.registry.register_all(&batch)?;
        debug!(module = %module.name, nodes = batch.len(), "added module");
        self.modules.push(module).inspect_err(|_| {
            for (id, _) in &batch {
                self.registry.unregister(id);
            }
        })
    }

    /// Detach a module, unregistering it and its descendants.
    pub fn remove_module(&mut self, id: &Uuid) -> Option<Module> {
        let module = self.modules.remove(id)?;
        for (child, _) in module.descendants() {
            self.registry.unregister(&child);
        }
        self.registry.unregister(id);
        debug!(module = %module.name, "removed module");
        Some(module)
    }

    /// Registry-aware mutable access to a module.
    pub fn edit_module(&mut self, id: &Uuid) -> Option<ModuleEditor<'_>> {
        let module = self.modules.get_mut(id)?;
        Some(ModuleEditor {
            module,
            registry: &mut self.registry,
        })
    }

    /// Resolve any live node of the tree.
    pub fn lookup(&self, id: &Uuid) -> Option<NodeRef<'_>> {
        let entry = self.registry.lookup(id)?;
        match entry.kind {
            NodeKind::Ir => Some(NodeRef::Ir(self)),
            NodeKind::Module => self.modules.get(id).map(NodeRef::Module),
            kind => {
                let owner = entry.owner?;
                self.modules.get(&owner)?.find(id, kind)
            }
        }
    }

    /// Module that owns the given node.
    pub fn owning_module(&self, id: &Uuid) -> Option<&Module> {
        let entry = self.registry.lookup(id)?;
        match entry.kind {
            NodeKind::Ir | NodeKind::Module => None,
            _ => self.modules.get(&entry.owner?),
        }
    }

    /// Move a symbol to another module, updating ownership atomically.
    pub fn move_symbol(&mut self, symbol: &Uuid, to_module: &Uuid) -> Result<()> {
        let entry = self
            .registry
            .lookup(symbol)
            .filter(|e| e.kind == NodeKind::Symbol)
            .ok_or(IrError::UnknownNode(*symbol))?;
        let from_module = entry.owner.ok_or(IrError::UnknownNode(*symbol))?;
        if !self.modules.contains(to_module) {
            return Err(IrError::UnknownNode(*to_module));
        }
        if from_module == *to_module {
            return Ok(());
        }
        if self.modules.get(to_module).is_some_and(|m| m.holds(symbol)) {
            return Err(IrError::DuplicateUuid(*symbol));
        }
        let moved = self
            .modules
            .get_mut(&from_module)
            .and_then(|m| m.remove_symbol(symbol))
            .ok_or(IrError::UnknownNode(*symbol))?;
        let target = self
            .modules
            .get_mut(to_module)
            .ok_or(IrError::UnknownNode(*to_module))?;
        target.add_symbol(moved)?;
        self.registry.set_owner(symbol, Some(*to_module))?;
        debug!(%symbol, from = %from_module, to = %to_module, "moved symbol");
        Ok(())
    }

    fn live_symbol(&self, id: &Uuid) -> Result<&Symbol> {
        match self.lookup(id) {
            Some(NodeRef::Symbol(symbol)) => Ok(symbol),
            _ => Err(IrError::UnknownReferent(*id)),
        }
    }

    /// The node a symbol refers to, `None` for address or empty referents.
    pub fn resolve_referent(&self, symbol: &Uuid) -> Result<Option<NodeRef<'_>>> {
        let symbol = self.live_symbol(symbol)?;
        match symbol.referent {
            SymbolReferent::Node(target) => match self.lookup(&target) {
                Some(node @ (NodeRef::Block(_) | NodeRef::DataObject(_))) => Ok(Some(node)),
                _ => Err(IrError::UnknownReferent(target)),
            },
            _ => Ok(None),
        }
    }

    /// Effective address of a symbol: its address referent, or the address
    /// of the block or data object it refers to.
    pub fn symbol_address(&self, symbol: &Uuid) -> Result<Option<Addr>> {
        let live = self.live_symbol(symbol)?;
        match live.referent {
            SymbolReferent::Address(address) => Ok(Some(address)),
            SymbolReferent::Node(_) => Ok(self.resolve_referent(symbol)?.and_then(|n| n.address())),
            SymbolReferent::None => Ok(None),
        }
    }

    /// The live symbols an expression refers to, in operand order.
    pub fn resolve_symbolic_expression(&self, expr: &SymbolicExpression) -> Result<Vec<&Symbol>> {
        expr.symbols()
            .iter()
            .map(|id| self.live_symbol(id))
            .collect()
    }

    /// Symbol UUIDs whose node referent is not a live block or data object.
    pub fn dangling_referents(&self) -> Vec<Uuid> {
        self.modules
            .iter()
            .flat_map(|m| m.symbols().iter())
            .filter(|s| s.referent.node().is_some() && self.resolve_referent(&s.uuid()).is_err())
            .map(|s| s.uuid())
            .collect()
    }

    pub fn extensions(&self) -> &[Extension] {
        &self.extensions
    }

    pub(crate) fn set_extensions(&mut self, extensions: Vec<Extension>) {
        self.extensions = extensions;
    }
}

impl Node for Ir {
    fn uuid(&self) -> Uuid {
        self.uuid
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Ir
    }
}

/// Trees compare by content; registries are derived state.
impl PartialEq for Ir {
    fn eq(&self, other: &Self) -> bool {
        self.uuid == other.uuid
            && self.modules == other.modules
            && self.aux_data == other.aux_data
            && self.extensions == other.extensions
    }
}

impl fmt::Display for Ir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IR {} ({} modules)", self.uuid, self.modules.len())
    }
}

/// Mutable handle on a module of an IR.
///
/// Reads go through `Deref<Target = Module>`; every write that adds or
/// removes a node also updates the tree registry.
pub struct ModuleEditor<'a> {
    module: &'a mut Module,
    registry: &'a mut NodeRegistry,
}

impl Deref for ModuleEditor<'_> {
    type Target = Module;

    fn deref(&self) -> &Module {
        &*self.module
    }
}

impl ModuleEditor<'_> {
    fn attach<N, F>(&mut self, node: N, insert: F) -> Result<Uuid>
    where
        N: Node,
        F: FnOnce(&mut Module, N) -> Result<Uuid>,
    {
        let id = self.registry.register(&node, Some(self.module.uuid()))?;
        match insert(&mut *self.module, node) {
            Ok(id) => Ok(id),
            Err(err) => {
                self.registry.unregister(&id);
                Err(err)
            }
        }
    }

    fn detach<T>(&mut self, removed: Option<T>, id: &Uuid) -> Option<T> {
        if removed.is_some() {
            self.registry.unregister(id);
        }
        removed
    }

    pub fn add_section(&mut self, section: Section) -> Result<Uuid> {
        self.attach(section, Module::add_section)
    }

    pub fn remove_section(&mut self, id: &Uuid) -> Option<Section> {
        let removed = self.module.remove_section(id);
        self.detach(removed, id)
    }

    pub fn add_block(&mut self, block: Block) -> Result<Uuid> {
        self.attach(block, Module::add_block)
    }

    pub fn remove_block(&mut self, id: &Uuid) -> Option<Block> {
        let removed = self.module.remove_block(id);
        self.detach(removed, id)
    }

    pub fn add_proxy_block(&mut self, proxy: ProxyBlock) -> Result<Uuid> {
        self.attach(proxy, Module::add_proxy_block)
    }

    pub fn remove_proxy_block(&mut self, id: &Uuid) -> Option<ProxyBlock> {
        let removed = self.module.remove_proxy_block(id);
        self.detach(removed, id)
    }

    pub fn add_data_object(&mut self, data_object: DataObject) -> Result<Uuid> {
        self.attach(data_object, Module::add_data_object)
    }

    pub fn remove_data_object(&mut self, id: &Uuid) -> Option<DataObject> {
        let removed = self.module.remove_data_object(id);
        self.detach(removed, id)
    }

    pub fn add_symbol(&mut self, symbol: Symbol) -> Result<Uuid> {
        self.attach(symbol, Module::add_symbol)
    }

    pub fn remove_symbol(&mut self, id: &Uuid) -> Option<Symbol> {
        let removed = self.module.remove_symbol(id);
        self.detach(removed, id)
    }

    /// Install the byte image, unregistering the one it replaces.
    pub fn set_image_byte_map(&mut self, image: ImageByteMap) -> Result<Option<ImageByteMap>> {
        let new_id = image.uuid();
        let old_id = self.module.image_byte_map().map(Node::uuid);
        if old_id != Some(new_id) {
            self.registry.register(&image, Some(self.module.uuid()))?;
        }
        match self.module.set_image_byte_map(image) {
            Ok(previous) => {
                if let Some(old) = old_id.filter(|old| *old != new_id) {
                    self.registry.unregister(&old);
                }
                Ok(previous)
            }
            Err(err) => {
                if old_id != Some(new_id) {
                    self.registry.unregister(&new_id);
                }
                Err(err)
            }
        }
    }

    pub fn take_image_byte_map(&mut self) -> Option<ImageByteMap> {
        let image = self.module.take_image_byte_map()?;
        self.registry.unregister(&image.uuid());
        Some(image)
    }

    pub fn image_byte_map_mut(&mut self) -> Option<&mut ImageByteMap> {
        self.module.image_byte_map_mut()
    }

    pub fn section_mut(&mut self, id: &Uuid) -> Option<&mut Section> {
        self.module.section_mut(id)
    }

    pub fn block_mut(&mut self, id: &Uuid) -> Option<&mut Block> {
        self.module.block_mut(id)
    }

    pub fn data_object_mut(&mut self, id: &Uuid) -> Option<&mut DataObject> {
        self.module.data_object_mut(id)
    }

    pub fn symbol_mut(&mut self, id: &Uuid) -> Option<&mut Symbol> {
        self.module.symbol_mut(id)
    }

    pub fn cfg_mut(&mut self) -> &mut Cfg {
        self.module.cfg_mut()
    }

    pub fn add_edge(&mut self, source: Uuid, target: Uuid, label: Option<EdgeLabel>) -> Result<()> {
        self.module.add_edge(source, target, label)
    }

    pub fn push_edge(&mut self, edge: Edge) -> Result<()> {
        self.module.cfg_mut().push_edge(edge)
    }

    pub fn set_entry_point(&mut self, block: Option<Uuid>) -> Result<()> {
        self.module.set_entry_point(block)
    }

    pub fn add_symbolic_expression(
        &mut self,
        address: Addr,
        expr: SymbolicExpression,
    ) -> Option<SymbolicExpression> {
        self.module.add_symbolic_expression(address, expr)
    }

    pub fn remove_symbolic_expression(&mut self, address: Addr) -> Option<SymbolicExpression> {
        self.module.remove_symbolic_expression(address)
    }

    pub fn aux_data_mut(&mut self) -> &mut AuxDataTable {
        &mut self.module.aux_data
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.module.name = name.into();
    }

    pub fn set_binary_path(&mut self, path: impl Into<String>) {
        self.module.binary_path = path.into();
    }

    pub fn set_preferred_addr(&mut self, address: Addr) {
        self.module.preferred_addr = address;
    }

    pub fn set_rebase_delta(&mut self, delta: i64) {
        self.module.rebase_delta = delta;
    }

    pub fn set_file_format(&mut self, format: FileFormat) {
        self.module.file_format = format;
    }

    pub fn set_isa(&mut self, isa: Isa) {
        self.module.isa = isa;
    }
}
