//! Stage trait definitions.

use serde::{Deserialize, Serialize};

use crate::analysis::GuinierFit;
use crate::data::Curve;
use crate::error::Result;

/// Identifier for a stage type.
///
/// Declaration order is execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(C)]
pub enum StageId {
    /// Scale by a fixed factor or align to a reference.
    Scale,
    /// Subtract the buffer curve.
    Subtract,
    /// Savitzky-Golay smoothing.
    Smooth,
    /// Restrict the q-range.
    Crop,
    /// Automatic Guinier fit.
    Guinier,
}

impl StageId {
    /// Get the string name of this stage.
    pub fn name(&self) -> &'static str {
        match self {
            StageId::Scale => "scale",
            StageId::Subtract => "subtract",
            StageId::Smooth => "smooth",
            StageId::Crop => "crop",
            StageId::Guinier => "guinier",
        }
    }
}

/// What happened to one curve on its way through a pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveReport {
    /// Label of the input curve.
    pub label: String,
    /// Stages run, in order.
    pub stages: Vec<StageId>,
    pub guinier: Option<GuinierFit>,
}

impl CurveReport {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            stages: Vec::new(),
            guinier: None,
        }
    }
}

/// Trait for processing stages.
pub trait Stage: Send + Sync {
    /// Get the stage identifier.
    fn id(&self) -> StageId;

    /// Transform `curve`, noting results in `report`.
    fn process(&self, curve: Curve, report: &mut CurveReport) -> Result<Curve>;

    /// Get the stage name.
    fn name(&self) -> &'static str {
        self.id().name()
    }
}
