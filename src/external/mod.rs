//! Pair-distance distribution computed by an external program.

pub mod gnom;

pub use gnom::{parse_gnom_out, DatgnomService};

use serde::{Deserialize, Serialize};

use crate::data::Curve;
use crate::error::Result;

/// Maximum particle dimension handed to the PDDF program.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Dmax {
    /// Let the program choose.
    Auto,
    Explicit(f64),
}

/// P(r) and the real-space parameters derived from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PddfResult {
    pub r: Vec<f64>,
    pub pr: Vec<f64>,
    pub pr_err: Vec<f64>,
    /// Largest r of the distribution.
    pub dmax: f64,
    pub rg: f64,
    pub rg_err: f64,
    pub i0: f64,
    pub i0_err: f64,
    pub reciprocal_rg: f64,
    pub reciprocal_i0: f64,
    pub total_estimate: Option<f64>,
    /// Verbal rating of the solution, e.g. "A GOOD solution".
    pub quality: Option<String>,
    pub chi_squared: Option<f64>,
}

/// Something that turns a curve into a P(r) function.
pub trait PddfService: Send + Sync {
    fn compute(&self, curve: &Curve, dmax: Dmax) -> Result<PddfResult>;
}
