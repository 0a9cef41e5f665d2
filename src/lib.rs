//! binir: a serializable intermediate representation for disassembled binaries.
//!
//! An [`Ir`] owns [`Module`]s; each module owns its sections, blocks, data
//! objects, symbols, an optional [`ImageByteMap`] and a [`Cfg`]. Every entity
//! carries a UUID, and the whole tree encodes to a compact binary form and
//! decodes back with identities intact.

/// Core data types module
pub mod core;

pub mod config;
pub mod error;
pub mod io;
pub mod logging;
pub mod serialization;

pub use crate::config::{CodecConfig, IoConfig, IrConfig, LoggingConfig};
pub use crate::core::addr::Addr;
pub use crate::core::addr_range::AddrRange;
pub use crate::core::aux_data::{AuxData, AuxDataTable, AuxDataType, AuxSchema, RawAuxData};
pub use crate::core::block::{Block, Offset, ProxyBlock};
pub use crate::core::byte_map::ByteMap;
pub use crate::core::cfg::{Cfg, Edge, EdgeLabel, EdgeType};
pub use crate::core::data_object::DataObject;
pub use crate::core::image_byte_map::{ByteOrder, ImageByteMap};
pub use crate::core::ir::{Ir, ModuleEditor, NodeRef};
pub use crate::core::module::{FileFormat, Isa, Module};
pub use crate::core::node::{Extension, Node, NodeKind, NodeRegistry};
pub use crate::core::section::{Section, SectionFlags};
pub use crate::core::symbol::{StorageKind, Symbol, SymbolReferent};
pub use crate::core::symbolic_expression::{ExprKind, SymbolicExpression};
pub use crate::error::{IrError, Result};
pub use crate::serialization::{decode, decode_with, encode, DecodeContext, WireMessage};
