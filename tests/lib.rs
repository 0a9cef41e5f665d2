//! Integration tests for the binir library.
//!
//! These exercise whole trees end-to-end: building, editing, encoding,
//! decoding and moving them through files.

mod common;
mod ir;
