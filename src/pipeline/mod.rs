//! Stage-based processing of reduced curves.

pub mod registry;
pub mod runner;
pub mod stages;
pub mod traits;

pub use registry::StageRegistry;
pub use runner::{Pipeline, PipelineConfig};
pub use stages::{
    CropConfig, CropStage, GuinierStage, ScaleConfig, ScaleStage, SmoothStage, SubtractConfig,
    SubtractStage,
};
pub use traits::{CurveReport, Stage, StageId};
