//! Structural parameters derived from a reduced curve.

pub mod guinier;
pub mod invariants;

pub use guinier::{GuinierConfig, GuinierFit, GuinierRangeFinder};
pub use invariants::{porod_invariant, porod_volume, vc_molecular_weight, MwConfig, VcEstimate};
