//! Ordered execution of configured stages over one or many curves.

use std::sync::Arc;

use log::{debug, info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::registry::StageRegistry;
use super::stages::{
    CropConfig, CropStage, GuinierStage, ScaleConfig, ScaleStage, SmoothStage, SubtractConfig,
    SubtractStage,
};
use super::traits::{CurveReport, Stage};
use crate::algebra::SmoothConfig;
use crate::analysis::GuinierConfig;
use crate::data::Curve;
use crate::error::{Result, SaxsError};

fn default_worker_count() -> usize {
    num_cpus::get()
}

/// Which stages run and with which settings. Absent stages are skipped.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub scale: Option<ScaleConfig>,
    pub subtract: Option<SubtractConfig>,
    pub smooth: Option<SmoothConfig>,
    pub crop: Option<CropConfig>,
    pub guinier: Option<GuinierConfig>,
    /// Threads used by [`Pipeline::run_batch`].
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            scale: None,
            subtract: None,
            smooth: None,
            crop: None,
            guinier: Some(GuinierConfig::default()),
            worker_count: default_worker_count(),
        }
    }
}

/// A fixed sequence of stages applied to every curve.
pub struct Pipeline {
    registry: StageRegistry,
    worker_count: usize,
}

impl Pipeline {
    /// Pipeline running the stages of `registry` in execution order.
    pub fn new(registry: StageRegistry, worker_count: usize) -> Self {
        Self {
            registry,
            worker_count: worker_count.max(1),
        }
    }

    /// Build the stages named by `config`.
    ///
    /// `reference` is used by the align mode of the scale stage, `buffer` by
    /// the subtract stage; either is an error when the stage needing it is
    /// configured and it is missing.
    pub fn from_config(
        config: &PipelineConfig,
        reference: Option<Curve>,
        buffer: Option<Curve>,
    ) -> Result<Self> {
        let mut registry = StageRegistry::new();

        if let Some(scale) = &config.scale {
            let reference = reference.map(Arc::new);
            if matches!(scale, ScaleConfig::Align { .. }) && reference.is_none() {
                return Err(SaxsError::invalid("scale", "alignment needs a reference curve"));
            }
            registry.register(ScaleStage::new(scale.clone(), reference));
        }
        if let Some(subtract) = &config.subtract {
            let buffer = buffer
                .ok_or_else(|| SaxsError::invalid("subtract", "no buffer curve was given"))?;
            registry.register(SubtractStage::new(Arc::new(buffer), subtract));
        }
        if let Some(smooth) = &config.smooth {
            registry.register(SmoothStage::new(smooth.clone()));
        }
        if let Some(crop) = &config.crop {
            registry.register(CropStage::new(crop.clone()));
        }
        if let Some(guinier) = &config.guinier {
            registry.register(GuinierStage::new(guinier.clone()));
        }

        debug!(
            "pipeline: {}",
            registry
                .stage_ids()
                .iter()
                .map(|id| id.name())
                .collect::<Vec<_>>()
                .join(" -> ")
        );
        Ok(Self::new(registry, config.worker_count))
    }

    pub fn registry(&self) -> &StageRegistry {
        &self.registry
    }

    /// Run every stage on one curve.
    pub fn run(&self, curve: Curve) -> Result<(Curve, CurveReport)> {
        let mut report = CurveReport::new(curve.label());
        let mut current = curve;
        for stage in self.registry.stages() {
            current = stage.process(current, &mut report)?;
            report.stages.push(stage.id());
        }
        Ok((current, report))
    }

    /// Run every curve through the pipeline on a pool of `worker_count`
    /// threads. Results keep the input order; one failing curve does not
    /// stop the others.
    pub fn run_batch(&self, curves: Vec<Curve>) -> Result<Vec<Result<(Curve, CurveReport)>>> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.worker_count)
            .build()
            .map_err(|e| SaxsError::invalid("worker_count", e.to_string()))?;

        let total = curves.len();
        let results: Vec<Result<(Curve, CurveReport)>> =
            pool.install(|| curves.into_par_iter().map(|c| self.run(c)).collect());

        let failed = results.iter().filter(|r| r.is_err()).count();
        if failed > 0 {
            warn!("pipeline: {} of {} curves failed", failed, total);
        }
        info!(
            "pipeline: processed {} curves on {} workers",
            total, self.worker_count
        );
        Ok(results)
    }
}
