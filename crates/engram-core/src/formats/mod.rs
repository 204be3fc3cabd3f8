//! # Formats Module
//!
//! Byte-level encodings of a snapshot. File I/O lives in the app layer.

mod persistence;

pub use persistence::*;
