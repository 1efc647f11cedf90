//! Processing settings persisted as JSON.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::algebra::WeightConfig;
use crate::analysis::MwConfig;
use crate::data::Curve;
use crate::error::Result;
use crate::pipeline::PipelineConfig;
use crate::reduce::ReduceConfig;

/// Detector geometry for converting pixel radius to q.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    /// Sample-detector distance, same unit as `pixel_size`.
    pub distance: f64,
    pub pixel_size: f64,
    /// Wavelength; q comes out in its inverse unit.
    pub wavelength: f64,
}

impl Calibration {
    pub fn apply(&self, curve: &mut Curve) -> Result<()> {
        curve.calibrate_q(self.distance, self.pixel_size, self.wavelength)
    }
}

/// Every setting of a reduction session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    pub reduce: ReduceConfig,
    pub pipeline: PipelineConfig,
    pub weights: WeightConfig,
    pub molecular_weight: MwConfig,
    pub calibration: Option<Calibration>,
}

impl ProcessingConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config = serde_json::from_reader(BufReader::new(File::open(path)?))?;
        debug!("loaded settings from {}", path.display());
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }
}
