//! Boolean pixel masks and their composition from shapes.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use ndarray::{s, Array2};
use serde::{Deserialize, Serialize};

use super::shape::MaskShape;
use crate::error::{Result, SaxsError};

/// Per-pixel usage flags in image orientation (row 0 at the top).
///
/// `true` marks a pixel that takes part in reduction.
#[derive(Clone, Debug, PartialEq)]
pub struct PixelMask {
    grid: Array2<bool>,
}

impl PixelMask {
    /// Mask using every pixel of a `rows` x `cols` image.
    pub fn full(rows: usize, cols: usize) -> Self {
        Self {
            grid: Array2::from_elem((rows, cols), true),
        }
    }

    pub fn from_array(grid: Array2<bool>) -> Self {
        Self { grid }
    }

    /// Rasterize and combine shapes on a `rows` x `cols` grid.
    ///
    /// Starts from all-set when every shape is positive, all-clear otherwise.
    /// Positive shapes clear their pixels first, negative shapes set theirs
    /// afterwards, then the grid is flipped from physical (bottom-up) row
    /// order to image row order. Out-of-grid coordinates are ignored.
    pub fn compose(rows: usize, cols: usize, shapes: &[MaskShape]) -> Self {
        let all_positive = shapes.iter().all(|s| !s.negative);
        let mut grid = Array2::from_elem((rows, cols), all_positive);

        let mut apply = |shape: &MaskShape, value: bool| {
            for (x, y) in shape.shape.rasterize(cols, rows) {
                if x >= 0 && y >= 0 && (x as usize) < cols && (y as usize) < rows {
                    grid[[y as usize, x as usize]] = value;
                }
            }
        };
        for shape in shapes.iter().filter(|s| !s.negative) {
            apply(shape, false);
        }
        for shape in shapes.iter().filter(|s| s.negative) {
            apply(shape, true);
        }

        Self {
            grid: grid.slice(s![..;-1, ..]).to_owned(),
        }
    }

    /// `(rows, cols)`.
    #[inline]
    pub fn dim(&self) -> (usize, usize) {
        self.grid.dim()
    }

    /// Whether the pixel at image `(row, col)` is used.
    #[inline]
    pub fn is_used(&self, row: usize, col: usize) -> bool {
        self.grid[[row, col]]
    }

    pub fn count_used(&self) -> usize {
        self.grid.iter().filter(|v| **v).count()
    }

    pub fn as_array(&self) -> &Array2<bool> {
        &self.grid
    }

    /// Fail with a size error unless this mask matches `image_dim`.
    pub fn check_dim(&self, image_dim: (usize, usize)) -> Result<()> {
        if self.dim() != image_dim {
            return Err(SaxsError::MaskSize {
                mask: self.dim(),
                image: image_dim,
            });
        }
        Ok(())
    }
}

/// Role of a group of mask shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaskKind {
    /// Beamstop and dead areas.
    Beamstop,
    /// Shielded area whose counts measure the detector readout level.
    ReadoutNoise,
    /// Region the reduction is restricted to.
    RegionOfInterest,
}

/// Mask shapes of one detector geometry, composed on demand and cached.
#[derive(Debug, Clone)]
pub struct DetectorMasks {
    rows: usize,
    cols: usize,
    shapes: BTreeMap<MaskKind, Vec<MaskShape>>,
    beam: OnceLock<PixelMask>,
    readout: OnceLock<Option<PixelMask>>,
}

impl DetectorMasks {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            shapes: BTreeMap::new(),
            beam: OnceLock::new(),
            readout: OnceLock::new(),
        }
    }

    #[inline]
    pub fn dim(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Add a shape to one sub-mask.
    pub fn add(&mut self, kind: MaskKind, shape: MaskShape) {
        self.shapes.entry(kind).or_default().push(shape);
        self.invalidate();
    }

    /// Replace every shape of one sub-mask.
    pub fn set(&mut self, kind: MaskKind, shapes: Vec<MaskShape>) {
        self.shapes.insert(kind, shapes);
        self.invalidate();
    }

    pub fn shapes(&self, kind: MaskKind) -> &[MaskShape] {
        self.shapes.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Composite of the beamstop and region-of-interest shapes.
    pub fn beam_mask(&self) -> &PixelMask {
        self.beam.get_or_init(|| {
            let shapes: Vec<MaskShape> = self
                .shapes(MaskKind::Beamstop)
                .iter()
                .chain(self.shapes(MaskKind::RegionOfInterest))
                .cloned()
                .collect();
            PixelMask::compose(self.rows, self.cols, &shapes)
        })
    }

    /// Composite of the readout-noise shapes, `None` when there are none.
    ///
    /// Readout pixels are the ones this composite leaves unused.
    pub fn readout_noise_mask(&self) -> Option<&PixelMask> {
        self.readout
            .get_or_init(|| {
                let shapes = self.shapes(MaskKind::ReadoutNoise);
                if shapes.is_empty() {
                    None
                } else {
                    Some(PixelMask::compose(self.rows, self.cols, shapes))
                }
            })
            .as_ref()
    }

    fn invalidate(&mut self) {
        self.beam = OnceLock::new();
        self.readout = OnceLock::new();
    }
}
