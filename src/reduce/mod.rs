//! Radial reduction of detector images.

pub mod dezinger;
pub mod radial;

pub use dezinger::RingWindow;
pub use radial::{BeamCenter, NoiseLevel, RadialProfile, RadialReducer, ReduceConfig, ERROR_SENTINEL};

use std::collections::HashMap;
use std::path::Path;

use log::info;
use ndarray::Array2;

use crate::data::Curve;
use crate::error::Result;
use crate::mask::DetectorMasks;

/// Image file reader supplied by the caller.
pub trait ImageLoader: Send + Sync {
    /// Read pixel values (row 0 at the top) and the header key/value pairs.
    fn load(&self, path: &Path) -> Result<(Array2<f64>, HashMap<String, String>)>;
}

/// Load one image and reduce it with the beam and readout masks of `masks`.
///
/// The curve is labelled with the file stem; numeric header entries become
/// curve counters.
pub fn reduce_image_file(
    loader: &dyn ImageLoader,
    path: &Path,
    reducer: &RadialReducer,
    center: BeamCenter,
    masks: &DetectorMasks,
) -> Result<Curve> {
    let (image, header) = loader.load(path)?;
    let profile = reducer.reduce(
        image.view(),
        center,
        Some(masks.beam_mask()),
        masks.readout_noise_mask(),
    )?;

    let label = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    info!(
        "{}: {} rings from {} pixels",
        label,
        profile.len(),
        profile.pixels_used
    );

    let mut curve = profile.into_curve(label);
    for (key, value) in header {
        if let Ok(v) = value.trim().parse::<f64>() {
            curve.set_counter(key, v);
        }
    }
    Ok(curve)
}
