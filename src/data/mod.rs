//! Data structures for SAXS curves.

pub mod curve;
pub mod provenance;
pub mod stats;

pub use curve::{pixel_axis, Curve, Layer};
pub use provenance::{HistoryEntry, Operation, Provenance};
pub use stats::{grids_match, interp, linear_fit, median, LinearFit, RunningStats};
