//! Module: one loaded binary and everything the IR knows about it.
//!
//! A module exclusively owns its sections, blocks, proxy blocks, data objects,
//! symbols and optional byte image, together with the CFG over its blocks,
//! the symbolic expressions attached to its addresses and an AuxData table.
//! Child collections iterate in insertion order.
//!
//! A standalone module only guards its own UUID uniqueness. Once a module is
//! part of an [`Ir`](crate::core::ir::Ir), structural edits go through
//! [`ModuleEditor`](crate::core::ir::ModuleEditor) so the tree registry stays
//! in step.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::RangeBounds;
use tracing::debug;
use uuid::Uuid;

use crate::core::addr::Addr;
use crate::core::aux_data::AuxDataTable;
use crate::core::block::{Block, ProxyBlock};
use crate::core::cfg::{Cfg, EdgeLabel};
use crate::core::data_object::DataObject;
use crate::core::image_byte_map::ImageByteMap;
use crate::core::ir::NodeRef;
pub use crate::core::node::Extension;
use crate::core::node::{fresh_uuid, Node, NodeKind, NodeList};
use crate::core::section::Section;
use crate::core::symbol::Symbol;
use crate::core::symbolic_expression::SymbolicExpression;
use crate::error::{IrError, Result};

/// Container format of the binary a module was lifted from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileFormat {
    #[default]
    Undefined,
    /// Common Object File Format
    Coff,
    /// Executable and Linkable Format
    Elf,
    /// IDA Pro database (32-bit)
    IdaProDb32,
    /// IDA Pro database (64-bit)
    IdaProDb64,
    /// Mach Object file format
    MachO,
    /// Portable Executable
    Pe,
    /// Raw binary (no format)
    Raw,
    /// Extended COFF (AIX)
    Xcoff,
}

impl FileFormat {
    pub fn to_wire(self) -> u32 {
        match self {
            FileFormat::Undefined => 0,
            FileFormat::Coff => 1,
            FileFormat::Elf => 2,
            FileFormat::IdaProDb32 => 3,
            FileFormat::IdaProDb64 => 4,
            FileFormat::MachO => 5,
            FileFormat::Pe => 6,
            FileFormat::Raw => 7,
            FileFormat::Xcoff => 8,
        }
    }

    pub fn from_wire(value: u32) -> Option<Self> {
        match value {
            0 => Some(FileFormat::Undefined),
            1 => Some(FileFormat::Coff),
            2 => Some(FileFormat::Elf),
            3 => Some(FileFormat::IdaProDb32),
            4 => Some(FileFormat::IdaProDb64),
            5 => Some(FileFormat::MachO),
            6 => Some(FileFormat::Pe),
            7 => Some(FileFormat::Raw),
            8 => Some(FileFormat::Xcoff),
            _ => None,
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileFormat::Undefined => write!(f, "Undefined"),
            FileFormat::Coff => write!(f, "COFF"),
            FileFormat::Elf => write!(f, "ELF"),
            FileFormat::IdaProDb32 => write!(f, "IdaProDb32"),
            FileFormat::IdaProDb64 => write!(f, "IdaProDb64"),
            FileFormat::MachO => write!(f, "MachO"),
            FileFormat::Pe => write!(f, "PE"),
            FileFormat::Raw => write!(f, "RAW"),
            FileFormat::Xcoff => write!(f, "XCOFF"),
        }
    }
}

/// Instruction set of a module
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Isa {
    #[default]
    Undefined,
    /// 32-bit x86
    Ia32,
    /// 32-bit PowerPC
    Ppc32,
    /// 64-bit x86
    X64,
    /// 32-bit ARM
    Arm,
    /// Recognized but not modelled
    ValidButUnsupported,
}

impl Isa {
    pub fn to_wire(self) -> u32 {
        match self {
            Isa::Undefined => 0,
            Isa::Ia32 => 1,
            Isa::Ppc32 => 2,
            Isa::X64 => 3,
            Isa::Arm => 4,
            Isa::ValidButUnsupported => 5,
        }
    }

    pub fn from_wire(value: u32) -> Option<Self> {
        match value {
            0 => Some(Isa::Undefined),
            1 => Some(Isa::Ia32),
            2 => Some(Isa::Ppc32),
            3 => Some(Isa::X64),
            4 => Some(Isa::Arm),
            5 => Some(Isa::ValidButUnsupported),
            _ => None,
        }
    }
}

impl fmt::Display for Isa {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Isa::Undefined => write!(f, "Undefined"),
            Isa::Ia32 => write!(f, "IA32"),
            Isa::Ppc32 => write!(f, "PPC32"),
            Isa::X64 => write!(f, "X64"),
            Isa::Arm => write!(f, "ARM"),
            Isa::ValidButUnsupported => write!(f, "ValidButUnsupported"),
        }
    }
}

/// A single binary within an IR
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    uuid: Uuid,
    pub name: String,
    pub binary_path: String,
    pub preferred_addr: Addr,
    pub rebase_delta: i64,
    pub file_format: FileFormat,
    pub isa: Isa,
    entry_point: Option<Uuid>,
    sections: NodeList<Section>,
    blocks: NodeList<Block>,
    proxies: NodeList<ProxyBlock>,
    data_objects: NodeList<DataObject>,
    symbols: NodeList<Symbol>,
    image_byte_map: Option<ImageByteMap>,
    cfg: Cfg,
    symbolic_expressions: BTreeMap<Addr, SymbolicExpression>,
    expression_extensions: BTreeMap<Addr, Vec<Extension>>,
    pub aux_data: AuxDataTable,
    extensions: Vec<Extension>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_uuid(fresh_uuid(), name)
    }

    pub fn with_uuid(uuid: Uuid, name: impl Into<String>) -> Self {
        Self {
            uuid,
            name: name.into(),
            binary_path: String::new(),
            preferred_addr: Addr::MIN,
            rebase_delta: 0,
            file_format: FileFormat::Undefined,
            isa: Isa::Undefined,
            entry_point: None,
            sections: NodeList::new(),
            blocks: NodeList::new(),
            proxies: NodeList::new(),
            data_objects: NodeList::new(),
            symbols: NodeList::new(),
            image_byte_map: None,
            cfg: Cfg::new(),
            symbolic_expressions: BTreeMap::new(),
            expression_extensions: BTreeMap::new(),
            aux_data: AuxDataTable::new(),
            extensions: Vec::new(),
        }
    }

    /// Address the module actually loads at.
    pub fn load_address(&self) -> Addr {
        self.preferred_addr.offset_by(self.rebase_delta)
    }

    /// True if `id` is this module or one of its descendants.
    pub fn holds(&self, id: &Uuid) -> bool {
        self.uuid == *id
            || self.sections.contains(id)
            || self.blocks.contains(id)
            || self.proxies.contains(id)
            || self.data_objects.contains(id)
            || self.symbols.contains(id)
            || self
                .image_byte_map
                .as_ref()
                .is_some_and(|image| image.uuid() == *id)
    }

    fn check_fresh(&self, id: Uuid) -> Result<()> {
        if self.holds(&id) {
            Err(IrError::DuplicateUuid(id))
        } else {
            Ok(())
        }
    }

    /// UUID and kind of every descendant node, the module itself excluded.
    pub fn descendants(&self) -> Vec<(Uuid, NodeKind)> {
        let mut out = Vec::with_capacity(
            self.sections.len()
                + self.blocks.len()
                + self.proxies.len()
                + self.data_objects.len()
                + self.symbols.len()
                + 1,
        );
        out.extend(self.sections.ids().map(|id| (id, NodeKind::Section)));
        out.extend(self.blocks.ids().map(|id| (id, NodeKind::Block)));
        out.extend(self.proxies.ids().map(|id| (id, NodeKind::ProxyBlock)));
        out.extend(self.data_objects.ids().map(|id| (id, NodeKind::DataObject)));
        out.extend(self.symbols.ids().map(|id| (id, NodeKind::Symbol)));
        if let Some(image) = &self.image_byte_map {
            out.push((image.uuid(), NodeKind::ImageByteMap));
        }
        out
    }

    /// Find a descendant of the given kind.
    pub fn find(&self, id: &Uuid, kind: NodeKind) -> Option<NodeRef<'_>> {
        match kind {
            NodeKind::Section => self.sections.get(id).map(NodeRef::Section),
            NodeKind::Block => self.blocks.get(id).map(NodeRef::Block),
            NodeKind::ProxyBlock => self.proxies.get(id).map(NodeRef::ProxyBlock),
            NodeKind::DataObject => self.data_objects.get(id).map(NodeRef::DataObject),
            NodeKind::Symbol => self.symbols.get(id).map(NodeRef::Symbol),
            NodeKind::ImageByteMap => self
                .image_byte_map
                .as_ref()
                .filter(|image| image.uuid() == *id)
                .map(NodeRef::ImageByteMap),
            NodeKind::Module if self.uuid == *id => Some(NodeRef::Module(self)),
            NodeKind::Module | NodeKind::Ir => None,
        }
    }

    pub fn add_section(&mut self, section: Section) -> Result<Uuid> {
        self.check_fresh(section.uuid())?;
        debug!(module = %self.name, section = %section.name, "added section");
        self.sections.push(section)
    }

    pub fn remove_section(&mut self, id: &Uuid) -> Option<Section> {
        self.sections.remove(id)
    }

    pub fn add_block(&mut self, block: Block) -> Result<Uuid> {
        self.check_fresh(block.uuid())?;
        let id = self.blocks.push(block)?;
        self.cfg.insert_vertex(id);
        Ok(id)
    }

    /// Remove a block, its CFG edges and, if it was the entry point, the
    /// entry point.
    pub fn remove_block(&mut self, id: &Uuid) -> Option<Block> {
        let block = self.blocks.remove(id)?;
        let dropped = self.cfg.remove_vertex(id);
        if self.entry_point == Some(*id) {
            self.entry_point = None;
        }
        debug!(module = %self.name, block = %id, dropped_edges = dropped, "removed block");
        Some(block)
    }

    pub fn add_proxy_block(&mut self, proxy: ProxyBlock) -> Result<Uuid> {
        self.check_fresh(proxy.uuid())?;
        let id = self.proxies.push(proxy)?;
        self.cfg.insert_vertex(id);
        Ok(id)
    }

    pub fn remove_proxy_block(&mut self, id: &Uuid) -> Option<ProxyBlock> {
        let proxy = self.proxies.remove(id)?;
        self.cfg.remove_vertex(id);
        Some(proxy)
    }

    pub fn add_data_object(&mut self, data_object: DataObject) -> Result<Uuid> {
        self.check_fresh(data_object.uuid())?;
        self.data_objects.push(data_object)
    }

    pub fn remove_data_object(&mut self, id: &Uuid) -> Option<DataObject> {
        self.data_objects.remove(id)
    }

    pub fn add_symbol(&mut self, symbol: Symbol) -> Result<Uuid> {
        self.check_fresh(symbol.uuid())?;
        self.symbols.push(symbol)
    }

    pub fn remove_symbol(&mut self, id: &Uuid) -> Option<Symbol> {
        self.symbols.remove(id)
    }

    /// Install the byte image, returning the one it replaces.
    pub fn set_image_byte_map(&mut self, image: ImageByteMap) -> Result<Option<ImageByteMap>> {
        let current = self.image_byte_map.as_ref().map(Node::uuid);
        if current != Some(image.uuid()) {
            self.check_fresh(image.uuid())?;
        }
        Ok(self.image_byte_map.replace(image))
    }

    pub fn take_image_byte_map(&mut self) -> Option<ImageByteMap> {
        self.image_byte_map.take()
    }

    pub fn image_byte_map(&self) -> Option<&ImageByteMap> {
        self.image_byte_map.as_ref()
    }

    pub fn image_byte_map_mut(&mut self) -> Option<&mut ImageByteMap> {
        self.image_byte_map.as_mut()
    }

    pub fn entry_point(&self) -> Option<Uuid> {
        self.entry_point
    }

    /// Point the module entry at one of its blocks, or clear it.
    pub fn set_entry_point(&mut self, block: Option<Uuid>) -> Result<()> {
        if let Some(id) = block {
            if !self.blocks.contains(&id) {
                return Err(IrError::UnknownReferent(id));
            }
        }
        self.entry_point = block;
        Ok(())
    }

    pub fn sections(&self) -> &NodeList<Section> {
        &self.sections
    }

    pub fn blocks(&self) -> &NodeList<Block> {
        &self.blocks
    }

    pub fn proxy_blocks(&self) -> &NodeList<ProxyBlock> {
        &self.proxies
    }

    pub fn data_objects(&self) -> &NodeList<DataObject> {
        &self.data_objects
    }

    pub fn symbols(&self) -> &NodeList<Symbol> {
        &self.symbols
    }

    pub fn section_mut(&mut self, id: &Uuid) -> Option<&mut Section> {
        self.sections.get_mut(id)
    }

    pub fn block_mut(&mut self, id: &Uuid) -> Option<&mut Block> {
        self.blocks.get_mut(id)
    }

    pub fn data_object_mut(&mut self, id: &Uuid) -> Option<&mut DataObject> {
        self.data_objects.get_mut(id)
    }

    pub fn symbol_mut(&mut self, id: &Uuid) -> Option<&mut Symbol> {
        self.symbols.get_mut(id)
    }

    pub fn find_symbols<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Symbol> + 'a {
        self.symbols.iter().filter(move |s| s.name == name)
    }

    pub fn find_section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }

    pub fn sections_containing(&self, address: Addr) -> impl Iterator<Item = &Section> {
        self.sections
            .iter()
            .filter(move |s| s.contains_address(address))
    }

    pub fn blocks_containing(&self, address: Addr) -> impl Iterator<Item = &Block> {
        self.blocks
            .iter()
            .filter(move |b| b.range().contains(address))
    }

    pub fn data_objects_containing(&self, address: Addr) -> impl Iterator<Item = &DataObject> {
        self.data_objects
            .iter()
            .filter(move |d| d.range().contains(address))
    }

    pub fn cfg(&self) -> &Cfg {
        &self.cfg
    }

    /// Edge edits only; the vertex set follows the module's blocks.
    pub fn cfg_mut(&mut self) -> &mut Cfg {
        &mut self.cfg
    }

    pub fn add_edge(&mut self, source: Uuid, target: Uuid, label: Option<EdgeLabel>) -> Result<()> {
        self.cfg.add_edge(source, target, label)
    }

    pub(crate) fn replace_cfg(&mut self, cfg: Cfg) {
        self.cfg = cfg;
    }

    /// Attach an expression at `address`, returning the one it replaces.
    /// Unknown wire fields of the replaced expression are dropped with it.
    pub fn add_symbolic_expression(
        &mut self,
        address: Addr,
        expr: SymbolicExpression,
    ) -> Option<SymbolicExpression> {
        self.expression_extensions.remove(&address);
        self.symbolic_expressions.insert(address, expr)
    }

    pub fn remove_symbolic_expression(&mut self, address: Addr) -> Option<SymbolicExpression> {
        self.expression_extensions.remove(&address);
        self.symbolic_expressions.remove(&address)
    }

    /// Unknown wire fields carried by the expression at `address`.
    pub fn symbolic_expression_extensions(&self, address: Addr) -> &[Extension] {
        self.expression_extensions
            .get(&address)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub(crate) fn set_symbolic_expression_extensions(
        &mut self,
        address: Addr,
        extensions: Vec<Extension>,
    ) {
        if extensions.is_empty() || !self.symbolic_expressions.contains_key(&address) {
            self.expression_extensions.remove(&address);
        } else {
            self.expression_extensions.insert(address, extensions);
        }
    }

    pub fn symbolic_expression(&self, address: Addr) -> Option<&SymbolicExpression> {
        self.symbolic_expressions.get(&address)
    }

    /// Expressions in address order.
    pub fn symbolic_expressions(&self) -> impl Iterator<Item = (Addr, &SymbolicExpression)> {
        self.symbolic_expressions.iter().map(|(a, e)| (*a, e))
    }

    pub fn symbolic_expressions_in<R: RangeBounds<Addr>>(
        &self,
        range: R,
    ) -> impl Iterator<Item = (Addr, &SymbolicExpression)> {
        self.symbolic_expressions.range(range).map(|(a, e)| (*a, e))
    }

    pub fn extensions(&self) -> &[Extension] {
        &self.extensions
    }

    pub(crate) fn set_extensions(&mut self, extensions: Vec<Extension>) {
        self.extensions = extensions;
    }
}

impl Node for Module {
    fn uuid(&self) -> Uuid {
        self.uuid
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Module
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Module '{}' ({} {}, {} sections, {} blocks, {} symbols)",
            self.name,
            self.file_format,
            self.isa,
            self.sections.len(),
            self.blocks.len(),
            self.symbols.len()
        )
    }
}
