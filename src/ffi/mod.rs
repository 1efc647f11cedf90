//! FFI (Foreign Function Interface) layer for C bindings.
//!
//! This module provides C-compatible functions that can be called from
//! Python via cffi, or from any other language that supports C FFI.

pub mod analysis;
pub mod curve;
pub mod types;

pub use analysis::*;
pub use curve::*;
pub use types::*;
