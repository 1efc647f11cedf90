//! Built-in stages.

use std::sync::Arc;

use log::debug;
use serde::{Deserialize, Serialize};

use super::traits::{CurveReport, Stage, StageId};
use crate::algebra::{align, smooth, subtract, SmoothConfig};
use crate::analysis::{GuinierConfig, GuinierRangeFinder};
use crate::data::Curve;
use crate::error::{Result, SaxsError};

/// How the scale stage sets the curve's scale factor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum ScaleConfig {
    /// Multiply by a fixed factor.
    Factor { factor: f64 },
    /// Match the reference's mean intensity in `[q_min, q_max]`.
    Align { q_min: f64, q_max: f64 },
}

impl Default for ScaleConfig {
    fn default() -> Self {
        ScaleConfig::Factor { factor: 1.0 }
    }
}

/// Stage that scales curves.
pub struct ScaleStage {
    config: ScaleConfig,
    reference: Option<Arc<Curve>>,
}

impl ScaleStage {
    /// `reference` is needed by [`ScaleConfig::Align`].
    pub fn new(config: ScaleConfig, reference: Option<Arc<Curve>>) -> Self {
        Self { config, reference }
    }
}

impl Stage for ScaleStage {
    fn id(&self) -> StageId {
        StageId::Scale
    }

    fn process(&self, mut curve: Curve, _report: &mut CurveReport) -> Result<Curve> {
        match (&self.config, &self.reference) {
            (ScaleConfig::Factor { factor }, _) => curve.set_scale(*factor),
            (ScaleConfig::Align { q_min, q_max }, Some(reference)) => {
                let factor = align(reference, &mut curve, *q_min, *q_max)?;
                debug!("{}: aligned with factor {:.6e}", curve.label(), factor);
            }
            (ScaleConfig::Align { .. }, None) => {
                return Err(SaxsError::invalid("scale", "alignment needs a reference curve"))
            }
        }
        Ok(curve)
    }
}

/// Options of the subtract stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubtractConfig {
    /// Resample when the buffer's q grid differs.
    pub forced: bool,
}

/// Stage that subtracts one buffer from every curve.
pub struct SubtractStage {
    buffer: Arc<Curve>,
    forced: bool,
}

impl SubtractStage {
    pub fn new(buffer: Arc<Curve>, config: &SubtractConfig) -> Self {
        Self {
            buffer,
            forced: config.forced,
        }
    }
}

impl Stage for SubtractStage {
    fn id(&self) -> StageId {
        StageId::Subtract
    }

    fn process(&self, curve: Curve, _report: &mut CurveReport) -> Result<Curve> {
        subtract(&curve, &self.buffer, self.forced)
    }
}

/// Stage that smooths intensities.
#[derive(Default)]
pub struct SmoothStage {
    config: SmoothConfig,
}

impl SmoothStage {
    pub fn new(config: SmoothConfig) -> Self {
        Self { config }
    }
}

impl Stage for SmoothStage {
    fn id(&self) -> StageId {
        StageId::Smooth
    }

    fn process(&self, curve: Curve, _report: &mut CurveReport) -> Result<Curve> {
        smooth(&curve, &self.config)
    }
}

/// q window kept by the crop stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropConfig {
    pub q_min: f64,
    pub q_max: f64,
}

/// Stage that restricts the selected q-range.
pub struct CropStage {
    config: CropConfig,
}

impl CropStage {
    pub fn new(config: CropConfig) -> Self {
        Self { config }
    }
}

impl Stage for CropStage {
    fn id(&self) -> StageId {
        StageId::Crop
    }

    fn process(&self, mut curve: Curve, _report: &mut CurveReport) -> Result<Curve> {
        curve.crop_q(self.config.q_min, self.config.q_max)?;
        Ok(curve)
    }
}

/// Stage that runs the Guinier search and stores the fit in the report.
#[derive(Default)]
pub struct GuinierStage {
    finder: GuinierRangeFinder,
}

impl GuinierStage {
    pub fn new(config: GuinierConfig) -> Self {
        Self {
            finder: GuinierRangeFinder::new(config),
        }
    }
}

impl Stage for GuinierStage {
    fn id(&self) -> StageId {
        StageId::Guinier
    }

    fn process(&self, curve: Curve, report: &mut CurveReport) -> Result<Curve> {
        report.guinier = Some(self.finder.find(&curve));
        Ok(curve)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Operation;
    use approx::assert_relative_eq;

    fn curve(label: &str, level: f64) -> Curve {
        let q: Vec<f64> = (1..=40).map(|k| 0.005 * k as f64).collect();
        let i = q.iter().map(|v| level * (1.0 + v)).collect();
        Curve::new(label, q, i, vec![0.1; 40]).unwrap()
    }

    #[test]
    fn test_scale_factor_and_align() {
        let mut report = CurveReport::new("s");
        let scaled = ScaleStage::new(ScaleConfig::Factor { factor: 3.0 }, None)
            .process(curve("s", 1.0), &mut report)
            .unwrap();
        assert_eq!(scaled.scale(), 3.0);

        let reference = Arc::new(curve("ref", 4.0));
        let aligned = ScaleStage::new(ScaleConfig::Align { q_min: 0.0, q_max: 1.0 }, Some(reference))
            .process(curve("s", 1.0), &mut report)
            .unwrap();
        assert_relative_eq!(aligned.scale(), 4.0, epsilon = 1e-12);

        let missing = ScaleStage::new(ScaleConfig::Align { q_min: 0.0, q_max: 1.0 }, None)
            .process(curve("s", 1.0), &mut report);
        assert!(matches!(missing, Err(SaxsError::InvalidParameter { .. })));
    }

    #[test]
    fn test_subtract_and_crop() {
        let mut report = CurveReport::new("s");
        let stage = SubtractStage::new(Arc::new(curve("buf", 1.0)), &SubtractConfig::default());
        let out = stage.process(curve("s", 3.0), &mut report).unwrap();
        assert_relative_eq!(out.i()[0], 2.0 * (1.0 + 0.005), epsilon = 1e-12);
        assert_eq!(out.provenance().last_operation(), Some(Operation::Subtract));

        let cropped = CropStage::new(CropConfig { q_min: 0.0475, q_max: 0.1025 })
            .process(out, &mut report)
            .unwrap();
        assert_eq!(cropped.len(), 40);
        assert_eq!(cropped.q().len(), 11);
    }

    #[test]
    fn test_guinier_stage_fills_report() {
        let q: Vec<f64> = (1..=100).map(|k| 0.001 * k as f64).collect();
        let i = q.iter().map(|v| 500.0 * (-v * v * 400.0 / 3.0f64).exp()).collect();
        let c = Curve::new("g", q, i, vec![1.0; 100]).unwrap();
        let mut report = CurveReport::new("g");
        GuinierStage::default().process(c, &mut report).unwrap();
        let fit = report.guinier.unwrap();
        assert!(fit.is_valid());
        assert_relative_eq!(fit.rg, 20.0, max_relative = 0.01);
    }
}
