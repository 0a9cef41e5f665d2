//! Core data types for the binir intermediate representation.
//!
//! Leaf types first: [`addr::Addr`] and [`addr_range::AddrRange`] name
//! locations, [`node`] gives every entity an identity, [`byte_map`] stores
//! bytes, and [`ir::Ir`] ties modules and their children into one tree.

pub mod addr;
pub mod addr_range;
pub mod aux_data;
pub mod block;
pub mod byte_map;
pub mod cfg;
pub mod data_object;
pub mod image_byte_map;
pub mod ir;
pub mod module;
pub mod node;
pub mod section;
pub mod symbol;
pub mod symbolic_expression;
