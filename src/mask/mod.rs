//! Detector masks: shape rasterization and composition into pixel grids.

pub mod pixel_mask;
pub mod shape;

pub use pixel_mask::{DetectorMasks, MaskKind, PixelMask};
pub use shape::{
    point_in_polygon, rasterize_circle, rasterize_polygon, rasterize_rectangle, MaskShape, Shape,
};
