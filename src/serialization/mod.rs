//! Conversion of IR entities to and from their wire messages.
//!
//! Every entity kind implements [`WireMessage`]; [`encode`] and [`decode`]
//! turn any of them into bytes and back. Decoding validates structure as it
//! goes (required UUIDs present, enum values known, references internal to a
//! module resolvable) and fails with `MalformedMessage` otherwise. A module or
//! tree that fails to decode is never partially registered.
//!
//! The IR file format wraps the bincode payload of an [`IrMsg`] in an 8-byte
//! magic and a little-endian `u32` format version.

pub mod messages;

use bincode::config;
use std::collections::HashSet;
use tracing::debug;
use uuid::Uuid;

use crate::config::CodecConfig;
use crate::core::addr::Addr;
use crate::core::aux_data::{AuxDataTable, AuxSchema, RawAuxData};
use crate::core::block::{Block, ProxyBlock};
use crate::core::byte_map::ByteMap;
use crate::core::cfg::{Cfg, Edge, EdgeLabel, EdgeType};
use crate::core::data_object::DataObject;
use crate::core::image_byte_map::{ByteOrder, ImageByteMap};
use crate::core::ir::Ir;
use crate::core::module::{Extension, FileFormat, Isa, Module};
use crate::core::node::Node;
use crate::core::section::{Section, SectionFlags};
use crate::core::symbol::{StorageKind, Symbol, SymbolReferent};
use crate::core::symbolic_expression::{ExprKind, SymbolicExpression};
use crate::error::{IrError, Result};

use self::messages::*;

/// Leading bytes of an encoded IR file.
pub const IR_MAGIC: [u8; 8] = *b"BINIR\0\0\0";
/// Current IR file format version.
pub const IR_FORMAT_VERSION: u32 = 1;

const HEADER_LEN: usize = IR_MAGIC.len() + 4;
/// Upper bound on the bytes a single decode may claim for containers.
const WIRE_LIMIT: usize = 1 << 30;

/// Settings that shape decoding.
#[derive(Debug, Clone)]
pub struct DecodeContext {
    pub codec: CodecConfig,
    /// AuxData shapes decoded eagerly when `codec.eager_aux_data` is set
    pub schema: AuxSchema,
}

impl Default for DecodeContext {
    fn default() -> Self {
        Self {
            codec: CodecConfig::default(),
            schema: AuxSchema::standard(),
        }
    }
}

impl DecodeContext {
    pub fn new(codec: CodecConfig, schema: AuxSchema) -> Self {
        Self { codec, schema }
    }
}

/// An entity with a wire message representation.
pub trait WireMessage: Sized {
    type Message: bincode::Encode + bincode::Decode<()>;

    fn to_message(&self) -> Self::Message;

    fn from_message(message: Self::Message, ctx: &DecodeContext) -> Result<Self>;
}

/// Encode an entity as a standalone message.
pub fn encode<T: WireMessage>(value: &T) -> Result<Vec<u8>> {
    Ok(bincode::encode_to_vec(value.to_message(), config::standard())?)
}

/// Decode an entity with the default context.
pub fn decode<T: WireMessage>(bytes: &[u8]) -> Result<T> {
    decode_with(bytes, &DecodeContext::default())
}

/// Decode an entity; the message must span all of `bytes`.
pub fn decode_with<T: WireMessage>(bytes: &[u8], ctx: &DecodeContext) -> Result<T> {
    if bytes.len() > ctx.codec.max_message_bytes {
        return Err(IrError::ResourceExhausted {
            resource: "message bytes".to_string(),
            used: bytes.len(),
            limit: ctx.codec.max_message_bytes,
        });
    }
    let (message, read): (T::Message, usize) =
        bincode::decode_from_slice(bytes, config::standard().with_limit::<WIRE_LIMIT>())?;
    if read != bytes.len() {
        return Err(IrError::malformed(format!(
            "{} trailing byte(s) after message",
            bytes.len() - read
        )));
    }
    T::from_message(message, ctx)
}

fn wire_uuid(id: Uuid) -> WireUuid {
    *id.as_bytes()
}

fn required_uuid(bytes: WireUuid, what: &str) -> Result<Uuid> {
    let id = Uuid::from_bytes(bytes);
    if id.is_nil() {
        Err(IrError::malformed(format!("{} is missing its UUID", what)))
    } else {
        Ok(id)
    }
}

fn known<T>(value: Option<T>, raw: u32, what: &str) -> Result<T> {
    value.ok_or_else(|| IrError::malformed(format!("unknown {} value {}", what, raw)))
}

fn extensions_to_message(extensions: &[Extension]) -> Vec<ExtensionMsg> {
    extensions
        .iter()
        .map(|(tag, bytes)| ExtensionMsg {
            tag: *tag,
            bytes: bytes.clone(),
        })
        .collect()
}

fn extensions_from_message(extensions: Vec<ExtensionMsg>) -> Vec<Extension> {
    extensions.into_iter().map(|e| (e.tag, e.bytes)).collect()
}

impl WireMessage for Section {
    type Message = SectionMsg;

    fn to_message(&self) -> SectionMsg {
        SectionMsg {
            uuid: wire_uuid(self.uuid()),
            name: self.name.clone(),
            address: self.address.value(),
            size: self.size,
            flags: self.flags.bits(),
            extensions: extensions_to_message(self.extensions()),
        }
    }

    fn from_message(msg: SectionMsg, _ctx: &DecodeContext) -> Result<Self> {
        let uuid = required_uuid(msg.uuid, "section")?;
        // Unknown flag bits are kept so they re-encode unchanged.
        let mut section = Section::with_uuid(uuid, msg.name, Addr::new(msg.address), msg.size)
            .with_flags(SectionFlags::from_bits_retain(msg.flags));
        section.set_extensions(extensions_from_message(msg.extensions));
        Ok(section)
    }
}

impl WireMessage for Block {
    type Message = BlockMsg;

    fn to_message(&self) -> BlockMsg {
        BlockMsg {
            uuid: wire_uuid(self.uuid()),
            address: self.address.value(),
            size: self.size,
            decode_mode: self.decode_mode,
            extensions: extensions_to_message(self.extensions()),
        }
    }

    fn from_message(msg: BlockMsg, _ctx: &DecodeContext) -> Result<Self> {
        let uuid = required_uuid(msg.uuid, "block")?;
        let mut block =
            Block::with_uuid(uuid, Addr::new(msg.address), msg.size).with_decode_mode(msg.decode_mode);
        block.set_extensions(extensions_from_message(msg.extensions));
        Ok(block)
    }
}

impl WireMessage for ProxyBlock {
    type Message = ProxyBlockMsg;

    fn to_message(&self) -> ProxyBlockMsg {
        ProxyBlockMsg {
            uuid: wire_uuid(self.uuid()),
            extensions: extensions_to_message(self.extensions()),
        }
    }

    fn from_message(msg: ProxyBlockMsg, _ctx: &DecodeContext) -> Result<Self> {
        let mut proxy = ProxyBlock::with_uuid(required_uuid(msg.uuid, "proxy block")?);
        proxy.set_extensions(extensions_from_message(msg.extensions));
        Ok(proxy)
    }
}

impl WireMessage for DataObject {
    type Message = DataObjectMsg;

    fn to_message(&self) -> DataObjectMsg {
        DataObjectMsg {
            uuid: wire_uuid(self.uuid()),
            address: self.address.value(),
            size: self.size,
            extensions: extensions_to_message(self.extensions()),
        }
    }

    fn from_message(msg: DataObjectMsg, _ctx: &DecodeContext) -> Result<Self> {
        let uuid = required_uuid(msg.uuid, "data object")?;
        let mut data = DataObject::with_uuid(uuid, Addr::new(msg.address), msg.size);
        data.set_extensions(extensions_from_message(msg.extensions));
        Ok(data)
    }
}

impl WireMessage for Symbol {
    type Message = SymbolMsg;

    fn to_message(&self) -> SymbolMsg {
        let referent = match self.referent {
            SymbolReferent::None => ReferentMsg::None,
            SymbolReferent::Address(address) => ReferentMsg::Address(address.value()),
            SymbolReferent::Node(id) => ReferentMsg::Node(wire_uuid(id)),
        };
        SymbolMsg {
            uuid: wire_uuid(self.uuid()),
            name: self.name.clone(),
            referent,
            storage_kind: self.storage_kind.to_wire(),
            extensions: extensions_to_message(self.extensions()),
        }
    }

    fn from_message(msg: SymbolMsg, _ctx: &DecodeContext) -> Result<Self> {
        let uuid = required_uuid(msg.uuid, "symbol")?;
        let referent = match msg.referent {
            ReferentMsg::None => SymbolReferent::None,
            ReferentMsg::Address(address) => SymbolReferent::Address(Addr::new(address)),
            ReferentMsg::Node(id) => SymbolReferent::Node(required_uuid(id, "symbol referent")?),
        };
        let storage_kind = known(
            StorageKind::from_wire(msg.storage_kind),
            msg.storage_kind,
            "storage kind",
        )?;
        let mut symbol = Symbol::with_uuid(uuid, msg.name)
            .with_referent(referent)
            .with_storage_kind(storage_kind);
        symbol.set_extensions(extensions_from_message(msg.extensions));
        Ok(symbol)
    }
}

impl WireMessage for ByteMap {
    type Message = ByteMapMsg;

    fn to_message(&self) -> ByteMapMsg {
        ByteMapMsg {
            runs: self
                .runs()
                .map(|(address, bytes)| ByteRunMsg {
                    address: address.value(),
                    bytes: bytes.to_vec(),
                })
                .collect(),
        }
    }

    fn from_message(msg: ByteMapMsg, _ctx: &DecodeContext) -> Result<Self> {
        let mut map = ByteMap::new();
        let mut previous_end: Option<u128> = None;
        for run in msg.runs {
            if run.bytes.is_empty() {
                return Err(IrError::malformed(format!("empty byte run at {:#x}", run.address)));
            }
            let start = run.address as u128;
            if previous_end.is_some_and(|end| start <= end) {
                return Err(IrError::malformed(format!(
                    "byte run at {:#x} overlaps or touches the previous run",
                    run.address
                )));
            }
            previous_end = Some(start + run.bytes.len() as u128);
            map.set_data(Addr::new(run.address), &run.bytes)
                .map_err(|e| IrError::malformed(e.to_string()))?;
        }
        Ok(map)
    }
}

impl WireMessage for ImageByteMap {
    type Message = ImageByteMapMsg;

    fn to_message(&self) -> ImageByteMapMsg {
        let (min, max) = self.addr_min_max();
        ImageByteMapMsg {
            uuid: wire_uuid(self.uuid()),
            file_name: self.file_name.clone(),
            base_address: self.base_address.value(),
            entry_point_address: self.entry_point_address.value(),
            addr_min: min.value(),
            addr_max: max.value(),
            rebase_delta: self.rebase_delta,
            is_relocated: self.is_relocated(),
            byte_order: self.byte_order.to_wire(),
            byte_map: self.byte_map().to_message(),
            extensions: extensions_to_message(self.extensions()),
        }
    }

    fn from_message(msg: ImageByteMapMsg, ctx: &DecodeContext) -> Result<Self> {
        let uuid = required_uuid(msg.uuid, "image byte map")?;
        let mut image = ImageByteMap::with_uuid(uuid);
        image.file_name = msg.file_name;
        image.base_address = Addr::new(msg.base_address);
        image.entry_point_address = Addr::new(msg.entry_point_address);
        image.rebase_delta = msg.rebase_delta;
        image.byte_order = known(ByteOrder::from_wire(msg.byte_order), msg.byte_order, "byte order")?;
        image.set_relocated(msg.is_relocated);
        image.set_extensions(extensions_from_message(msg.extensions));
        let (min, max) = (Addr::new(msg.addr_min), Addr::new(msg.addr_max));
        image
            .set_addr_min_max(min, max)
            .map_err(|e| IrError::malformed(e.to_string()))?;

        let bytes = ByteMap::from_message(msg.byte_map, ctx)?;
        for range in bytes.ranges() {
            let inside = range.start >= min && range.last().is_some_and(|last| last <= max);
            if !inside {
                return Err(IrError::malformed(format!(
                    "stored bytes {} fall outside image bounds [{}, {}]",
                    range, min, max
                )));
            }
        }
        image.replace_byte_map(bytes);
        Ok(image)
    }
}

fn label_to_message(label: &EdgeLabel) -> EdgeLabelMsg {
    EdgeLabelMsg {
        edge_type: label.edge_type.to_wire(),
        conditional: label.conditional,
        direct: label.direct,
    }
}

fn label_from_message(msg: EdgeLabelMsg) -> Result<EdgeLabel> {
    let edge_type = known(EdgeType::from_wire(msg.edge_type), msg.edge_type, "edge type")?;
    Ok(EdgeLabel::new(edge_type, msg.conditional, msg.direct))
}

impl WireMessage for Cfg {
    type Message = CfgMsg;

    fn to_message(&self) -> CfgMsg {
        CfgMsg {
            vertices: self.vertices().iter().copied().map(wire_uuid).collect(),
            edges: self
                .edges()
                .iter()
                .map(|edge| EdgeMsg {
                    source: wire_uuid(edge.source),
                    target: wire_uuid(edge.target),
                    label: edge.label.as_ref().map(label_to_message),
                    switch_value: edge.switch_value,
                    extensions: extensions_to_message(edge.extensions()),
                })
                .collect(),
        }
    }

    fn from_message(msg: CfgMsg, _ctx: &DecodeContext) -> Result<Self> {
        let mut cfg = Cfg::new();
        for vertex in msg.vertices {
            let id = required_uuid(vertex, "CFG vertex")?;
            if cfg.contains_vertex(&id) {
                return Err(IrError::malformed(format!("CFG vertex {} listed twice", id)));
            }
            cfg.insert_vertex(id);
        }
        for edge in msg.edges {
            let source = required_uuid(edge.source, "CFG edge source")?;
            let target = required_uuid(edge.target, "CFG edge target")?;
            let label = edge.label.map(label_from_message).transpose()?;
            let mut decoded = Edge::new(source, target, label);
            decoded.switch_value = edge.switch_value;
            decoded.set_extensions(extensions_from_message(edge.extensions));
            cfg.push_edge(decoded).map_err(|e| match e {
                IrError::UnknownVertex(id) => {
                    IrError::malformed(format!("CFG edge endpoint {} is not a vertex", id))
                }
                other => other,
            })?;
        }
        Ok(cfg)
    }
}

impl WireMessage for AuxDataTable {
    type Message = AuxDataTableMsg;

    fn to_message(&self) -> AuxDataTableMsg {
        AuxDataTableMsg {
            entries: self
                .iter()
                .map(|(key, entry)| {
                    let raw = entry.to_raw();
                    AuxDataEntryMsg {
                        key: key.to_string(),
                        value: AuxDataMsg {
                            type_name: raw.type_name,
                            data: raw.bytes,
                        },
                        extensions: extensions_to_message(self.entry_extensions(key)),
                    }
                })
                .collect(),
        }
    }

    fn from_message(msg: AuxDataTableMsg, ctx: &DecodeContext) -> Result<Self> {
        let mut table = AuxDataTable::new();
        for entry in msg.entries {
            if table.contains_key(&entry.key) {
                return Err(IrError::malformed(format!(
                    "aux data key '{}' appears twice",
                    entry.key
                )));
            }
            table.insert_raw(
                entry.key.clone(),
                RawAuxData::new(entry.value.type_name, entry.value.data),
            );
            table.set_entry_extensions(&entry.key, extensions_from_message(entry.extensions));
        }
        if ctx.codec.eager_aux_data {
            table.upgrade_with(&ctx.schema);
        }
        Ok(table)
    }
}

impl WireMessage for SymbolicExpression {
    type Message = SymbolicExpressionMsg;

    fn to_message(&self) -> SymbolicExpressionMsg {
        match *self {
            SymbolicExpression::AddrConst {
                kind,
                symbol,
                offset,
            } => SymbolicExpressionMsg::AddrConst {
                kind: kind.to_wire(),
                symbol: wire_uuid(symbol),
                offset,
            },
            SymbolicExpression::AddrAddr {
                kind,
                scale,
                offset,
                symbol1,
                symbol2,
            } => SymbolicExpressionMsg::AddrAddr {
                kind: kind.to_wire(),
                scale,
                offset,
                symbol1: wire_uuid(symbol1),
                symbol2: wire_uuid(symbol2),
            },
            SymbolicExpression::StackConst {
                kind,
                symbol,
                offset,
            } => SymbolicExpressionMsg::StackConst {
                kind: kind.to_wire(),
                symbol: symbol.map(wire_uuid),
                offset,
            },
        }
    }

    fn from_message(msg: SymbolicExpressionMsg, _ctx: &DecodeContext) -> Result<Self> {
        let expr_kind = |raw: u32| known(ExprKind::from_wire(raw), raw, "expression kind");
        Ok(match msg {
            SymbolicExpressionMsg::AddrConst {
                kind,
                symbol,
                offset,
            } => SymbolicExpression::AddrConst {
                kind: expr_kind(kind)?,
                symbol: required_uuid(symbol, "expression symbol")?,
                offset,
            },
            SymbolicExpressionMsg::AddrAddr {
                kind,
                scale,
                offset,
                symbol1,
                symbol2,
            } => SymbolicExpression::AddrAddr {
                kind: expr_kind(kind)?,
                scale,
                offset,
                symbol1: required_uuid(symbol1, "expression symbol")?,
                symbol2: required_uuid(symbol2, "expression symbol")?,
            },
            SymbolicExpressionMsg::StackConst {
                kind,
                symbol,
                offset,
            } => SymbolicExpression::StackConst {
                kind: expr_kind(kind)?,
                symbol: symbol
                    .map(|s| required_uuid(s, "expression symbol"))
                    .transpose()?,
                offset,
            },
        })
    }
}

impl WireMessage for Module {
    type Message = ModuleMsg;

    fn to_message(&self) -> ModuleMsg {
        ModuleMsg {
            uuid: wire_uuid(self.uuid()),
            name: self.name.clone(),
            binary_path: self.binary_path.clone(),
            preferred_addr: self.preferred_addr.value(),
            rebase_delta: self.rebase_delta,
            file_format: self.file_format.to_wire(),
            isa: self.isa.to_wire(),
            entry_point: self.entry_point().map(wire_uuid),
            sections: self.sections().iter().map(Section::to_message).collect(),
            blocks: self.blocks().iter().map(Block::to_message).collect(),
            proxies: self.proxy_blocks().iter().map(ProxyBlock::to_message).collect(),
            data_objects: self.data_objects().iter().map(DataObject::to_message).collect(),
            symbols: self.symbols().iter().map(Symbol::to_message).collect(),
            image_byte_map: self.image_byte_map().map(ImageByteMap::to_message),
            cfg: self.cfg().to_message(),
            symbolic_expressions: self
                .symbolic_expressions()
                .map(|(address, expr)| SymbolicExpressionEntryMsg {
                    address: address.value(),
                    expression: expr.to_message(),
                    extensions: extensions_to_message(self.symbolic_expression_extensions(address)),
                })
                .collect(),
            aux_data: self.aux_data.to_message(),
            extensions: extensions_to_message(self.extensions()),
        }
    }

    fn from_message(msg: ModuleMsg, ctx: &DecodeContext) -> Result<Self> {
        let uuid = required_uuid(msg.uuid, "module")?;
        let mut module = Module::with_uuid(uuid, msg.name);
        module.binary_path = msg.binary_path;
        module.preferred_addr = Addr::new(msg.preferred_addr);
        module.rebase_delta = msg.rebase_delta;
        module.file_format = known(FileFormat::from_wire(msg.file_format), msg.file_format, "file format")?;
        module.isa = known(Isa::from_wire(msg.isa), msg.isa, "ISA")?;

        for section in msg.sections {
            module.add_section(Section::from_message(section, ctx)?)?;
        }
        for block in msg.blocks {
            module.add_block(Block::from_message(block, ctx)?)?;
        }
        for proxy in msg.proxies {
            module.add_proxy_block(ProxyBlock::from_message(proxy, ctx)?)?;
        }
        for data_object in msg.data_objects {
            module.add_data_object(DataObject::from_message(data_object, ctx)?)?;
        }
        for symbol in msg.symbols {
            module.add_symbol(Symbol::from_message(symbol, ctx)?)?;
        }
        if let Some(image) = msg.image_byte_map {
            module.set_image_byte_map(ImageByteMap::from_message(image, ctx)?)?;
        }

        // The vertex list fixes vertex order; it must name exactly the
        // module's blocks and proxies.
        let cfg = Cfg::from_message(msg.cfg, ctx)?;
        let expected: HashSet<Uuid> = module
            .blocks()
            .ids()
            .chain(module.proxy_blocks().ids())
            .collect();
        if cfg.vertex_count() != expected.len()
            || !cfg.vertices().iter().all(|v| expected.contains(v))
        {
            return Err(IrError::malformed(format!(
                "CFG vertices of module {} do not match its blocks",
                uuid
            )));
        }
        module.replace_cfg(cfg);

        if let Some(entry) = msg.entry_point {
            let entry = required_uuid(entry, "entry point")?;
            module.set_entry_point(Some(entry)).map_err(|_| {
                IrError::malformed(format!("entry point {} is not a block of module {}", entry, uuid))
            })?;
        }

        for entry in msg.symbolic_expressions {
            let expr = SymbolicExpression::from_message(entry.expression, ctx)?;
            let address = Addr::new(entry.address);
            if module.add_symbolic_expression(address, expr).is_some() {
                return Err(IrError::malformed(format!(
                    "two symbolic expressions at {:#x}",
                    entry.address
                )));
            }
            module.set_symbolic_expression_extensions(address, extensions_from_message(entry.extensions));
        }

        module.aux_data = AuxDataTable::from_message(msg.aux_data, ctx)?;
        module.set_extensions(extensions_from_message(msg.extensions));
        debug!(module = %module.name, blocks = module.blocks().len(), "decoded module");
        Ok(module)
    }
}

impl WireMessage for Ir {
    type Message = IrMsg;

    fn to_message(&self) -> IrMsg {
        IrMsg {
            uuid: wire_uuid(self.uuid()),
            modules: self.modules().iter().map(Module::to_message).collect(),
            aux_data: self.aux_data.to_message(),
            extensions: extensions_to_message(self.extensions()),
        }
    }

    fn from_message(msg: IrMsg, ctx: &DecodeContext) -> Result<Self> {
        let uuid = required_uuid(msg.uuid, "IR")?;
        let mut ir = Ir::with_uuid(uuid);
        for module in msg.modules {
            ir.add_module(Module::from_message(module, ctx)?)?;
        }
        if ctx.codec.strict_symbol_referents {
            if let Some(symbol) = ir.dangling_referents().first() {
                ir.resolve_referent(symbol)?;
            }
        }
        ir.aux_data = AuxDataTable::from_message(msg.aux_data, ctx)?;
        ir.set_extensions(extensions_from_message(msg.extensions));
        Ok(ir)
    }
}

fn strip_header(bytes: &[u8]) -> Result<&[u8]> {
    if bytes.len() < HEADER_LEN {
        return Err(IrError::malformed(format!(
            "IR file too short for its header: {} byte(s)",
            bytes.len()
        )));
    }
    if bytes[..IR_MAGIC.len()] != IR_MAGIC {
        return Err(IrError::malformed("not an IR file: bad magic"));
    }
    let mut version = [0u8; 4];
    version.copy_from_slice(&bytes[IR_MAGIC.len()..HEADER_LEN]);
    let version = u32::from_le_bytes(version);
    if version != IR_FORMAT_VERSION {
        return Err(IrError::malformed(format!(
            "unsupported IR format version {}",
            version
        )));
    }
    Ok(&bytes[HEADER_LEN..])
}

impl Ir {
    /// Encode the whole tree as an IR file.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let span = crate::span_trace!("encode_ir", modules = self.modules().len());
        let _guard = span.enter();
        let payload = encode(self)?;
        let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
        out.extend_from_slice(&IR_MAGIC);
        out.extend_from_slice(&IR_FORMAT_VERSION.to_le_bytes());
        out.extend_from_slice(&payload);
        Ok(out)
    }

    /// Decode an IR file with the default context.
    pub fn from_bytes(bytes: &[u8]) -> Result<Ir> {
        Self::from_bytes_with(bytes, &DecodeContext::default())
    }

    pub fn from_bytes_with(bytes: &[u8], ctx: &DecodeContext) -> Result<Ir> {
        let span = crate::span_trace!("decode_ir", bytes = bytes.len());
        let _guard = span.enter();
        let payload = strip_header(bytes).map_err(|e| crate::log_error!(e, "decode_ir"))?;
        decode_with(payload, ctx).map_err(|e| crate::log_error!(e, "decode_ir"))
    }

    /// Decode a module message and attach it. On failure the tree and its
    /// registry are unchanged.
    pub fn decode_module_into(&mut self, bytes: &[u8], ctx: &DecodeContext) -> Result<Uuid> {
        let span = crate::span_trace!("decode_module", bytes = bytes.len());
        let _guard = span.enter();
        let module: Module =
            decode_with(bytes, ctx).map_err(|e| crate::log_error!(e, "decode_module"))?;
        self.add_module(module)
    }
}
