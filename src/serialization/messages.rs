//! Wire messages, one per entity kind.
//!
//! These are plain data carriers encoded with bincode. UUIDs travel as 16 raw
//! bytes, enums as `u32` discriminants, and addresses as `u64`.
//!
//! # Evolution
//!
//! bincode fields are positional, so the field list of every message below is
//! frozen for a given `IR_FORMAT_VERSION`. Each entity message (IR, module,
//! section, block, proxy block, data object, symbol, image, CFG edge, AuxData
//! entry and symbolic expression entry) ends with an `extensions` list. A
//! writer adds an optional field by sending it there under a new tag; a reader
//! keeps every entry it does not understand and writes it back unchanged.
//! Sub-records without an `extensions` list (byte runs, edge labels,
//! referents, expression variants) change only with a format version bump.

use bincode::{Decode, Encode};

/// A UUID as it appears on the wire.
pub type WireUuid = [u8; 16];

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct SectionMsg {
    pub uuid: WireUuid,
    pub name: String,
    pub address: u64,
    pub size: u64,
    pub flags: u32,
    pub extensions: Vec<ExtensionMsg>,
}

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct BlockMsg {
    pub uuid: WireUuid,
    pub address: u64,
    pub size: u64,
    pub decode_mode: u64,
    pub extensions: Vec<ExtensionMsg>,
}

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct ProxyBlockMsg {
    pub uuid: WireUuid,
    pub extensions: Vec<ExtensionMsg>,
}

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct DataObjectMsg {
    pub uuid: WireUuid,
    pub address: u64,
    pub size: u64,
    pub extensions: Vec<ExtensionMsg>,
}

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub enum ReferentMsg {
    None,
    Address(u64),
    Node(WireUuid),
}

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct SymbolMsg {
    pub uuid: WireUuid,
    pub name: String,
    pub referent: ReferentMsg,
    pub storage_kind: u32,
    pub extensions: Vec<ExtensionMsg>,
}

/// One contiguous run of stored bytes.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct ByteRunMsg {
    pub address: u64,
    pub bytes: Vec<u8>,
}

/// Runs in ascending, non-touching address order.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct ByteMapMsg {
    pub runs: Vec<ByteRunMsg>,
}

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct ImageByteMapMsg {
    pub uuid: WireUuid,
    pub file_name: String,
    pub base_address: u64,
    pub entry_point_address: u64,
    pub addr_min: u64,
    pub addr_max: u64,
    pub rebase_delta: i64,
    pub is_relocated: bool,
    pub byte_order: u32,
    pub byte_map: ByteMapMsg,
    pub extensions: Vec<ExtensionMsg>,
}

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct EdgeLabelMsg {
    pub edge_type: u32,
    pub conditional: bool,
    pub direct: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct EdgeMsg {
    pub source: WireUuid,
    pub target: WireUuid,
    pub label: Option<EdgeLabelMsg>,
    pub switch_value: Option<u64>,
    pub extensions: Vec<ExtensionMsg>,
}

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct CfgMsg {
    pub vertices: Vec<WireUuid>,
    pub edges: Vec<EdgeMsg>,
}

/// A single AuxData value: its type name and encoded bytes.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct AuxDataMsg {
    pub type_name: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct AuxDataEntryMsg {
    pub key: String,
    pub value: AuxDataMsg,
    pub extensions: Vec<ExtensionMsg>,
}

/// Entries in ascending key order.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct AuxDataTableMsg {
    pub entries: Vec<AuxDataEntryMsg>,
}

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub enum SymbolicExpressionMsg {
    AddrConst {
        kind: u32,
        symbol: WireUuid,
        offset: i64,
    },
    AddrAddr {
        kind: u32,
        scale: i64,
        offset: i64,
        symbol1: WireUuid,
        symbol2: WireUuid,
    },
    StackConst {
        kind: u32,
        symbol: Option<WireUuid>,
        offset: i64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct SymbolicExpressionEntryMsg {
    pub address: u64,
    pub expression: SymbolicExpressionMsg,
    pub extensions: Vec<ExtensionMsg>,
}

/// Unknown optional field, preserved verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct ExtensionMsg {
    pub tag: u32,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct ModuleMsg {
    pub uuid: WireUuid,
    pub name: String,
    pub binary_path: String,
    pub preferred_addr: u64,
    pub rebase_delta: i64,
    pub file_format: u32,
    pub isa: u32,
    pub entry_point: Option<WireUuid>,
    pub sections: Vec<SectionMsg>,
    pub blocks: Vec<BlockMsg>,
    pub proxies: Vec<ProxyBlockMsg>,
    pub data_objects: Vec<DataObjectMsg>,
    pub symbols: Vec<SymbolMsg>,
    pub image_byte_map: Option<ImageByteMapMsg>,
    pub cfg: CfgMsg,
    pub symbolic_expressions: Vec<SymbolicExpressionEntryMsg>,
    pub aux_data: AuxDataTableMsg,
    pub extensions: Vec<ExtensionMsg>,
}

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct IrMsg {
    pub uuid: WireUuid,
    pub modules: Vec<ModuleMsg>,
    pub aux_data: AuxDataTableMsg,
    pub extensions: Vec<ExtensionMsg>,
}
