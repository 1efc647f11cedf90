//! SAXS reduction - area-detector images to calibrated 1D curves.
//!
//! This crate turns 2D small-angle X-ray scattering frames into intensity
//! curves and provides the operations applied to them afterwards:
//!
//! - Mask rasterization (beamstop, readout-noise and region-of-interest shapes)
//! - Radial reduction with single-pass ring statistics and zinger rejection
//! - Layered curves (raw, binned, active) with non-destructive transforms
//! - Curve algebra (subtract, average, merge, interpolate, superimpose, differences)
//! - Automatic Guinier range search, Porod and Vc estimates
//! - An ordered, rayon-parallel processing pipeline
//! - FFI layer for Python (cffi) and other language bindings
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │        FFI Layer (saxsred.h)            │
//! │   C-compatible functions & types        │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  ┌──────────┐   ┌──────────┐            │
//! │  │   Mask   │──▶│  Reduce  │──▶ Curve   │
//! │  └──────────┘   └──────────┘     │      │
//! │  ┌──────────┐   ┌──────────┐     ▼      │
//! │  │ Analysis │◀──│ Pipeline │◀─ Algebra  │
//! │  └──────────┘   └──────────┘            │
//! │  ┌──────────┐   ┌──────────┐            │
//! │  │ .dat I/O │   │  GNOM    │            │
//! │  └──────────┘   └──────────┘            │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # FFI Usage
//!
//! ```c
//! // Reduce a frame
//! CurveHandle curve;
//! saxs_radial_reduce(pixels, mask, rows, cols, cx, cy, false, "frame_001", &curve);
//!
//! // Guinier fit
//! CGuinierFit fit;
//! saxs_auto_rg(curve, &fit);
//! if (fit.rg < 0) { /* no Guinier region */ }
//!
//! // Cleanup
//! saxs_curve_free(curve);
//! ```

pub mod algebra;
pub mod analysis;
pub mod config;
pub mod data;
pub mod error;
pub mod external;
pub mod ffi;
pub mod io;
pub mod mask;
pub mod pipeline;
pub mod reduce;

// Re-export commonly used items
pub use algebra::{
    absolute_difference, align, average, interpolate_to_fit, merge, relative_difference, smooth,
    subtract, superimpose, weighted_average, SmoothConfig, WeightConfig,
};
pub use analysis::{GuinierConfig, GuinierFit, GuinierRangeFinder, MwConfig};
pub use config::{Calibration, ProcessingConfig};
pub use data::{Curve, Layer, Operation, Provenance};
pub use error::{Result, SaxsError};
pub use external::{DatgnomService, Dmax, PddfResult, PddfService};
pub use io::{load_dat, save_dat};
pub use mask::{DetectorMasks, MaskKind, MaskShape, PixelMask, Shape};
pub use pipeline::{CurveReport, Pipeline, PipelineConfig, Stage, StageId, StageRegistry};
pub use reduce::{BeamCenter, ImageLoader, RadialProfile, RadialReducer, ReduceConfig};

// Re-export FFI types for cbindgen
pub use ffi::analysis::*;
pub use ffi::curve::*;
pub use ffi::types::*;
