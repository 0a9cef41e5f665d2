//! Integration tests for the IR tree and its wire form.

mod cfg;
mod image_bounds;
mod registry;
mod roundtrip;
mod transport;
