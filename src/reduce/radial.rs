//! Radial averaging of a 2D detector image into a 1D profile.

use log::{debug, warn};
use ndarray::ArrayView2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::dezinger::Dezinger;
use crate::data::stats::RunningStats;
use crate::data::{pixel_axis, Curve, Layer};
use crate::error::{Result, SaxsError};
use crate::mask::PixelMask;

/// Error value written where the uncertainty is undefined.
pub const ERROR_SENTINEL: f64 = 1e-10;

/// Configuration for radial reduction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReduceConfig {
    /// Enable zinger rejection.
    pub dezinger: bool,
    /// Threshold in standard deviations above the window median.
    pub dezinger_sensitivity: f64,
    /// Samples kept per ring for zinger tests.
    pub dezinger_window: usize,
    /// Outermost rings dropped from the profile.
    pub trim_rings: usize,
    /// Scan rows in parallel when zinger rejection is off.
    pub parallel: bool,
}

impl Default for ReduceConfig {
    fn default() -> Self {
        Self {
            dezinger: false,
            dezinger_sensitivity: 4.0,
            dezinger_window: 30,
            trim_rings: 5,
            parallel: true,
        }
    }
}

/// Beam position in image pixel coordinates (`x` column, `y` row).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeamCenter {
    pub x: f64,
    pub y: f64,
}

impl BeamCenter {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Ring index of a pixel.
    #[inline]
    fn ring_of(&self, row: usize, col: usize) -> usize {
        (col as f64 - self.x).hypot(row as f64 - self.y).round() as usize
    }
}

/// Readout level measured on the shielded pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseLevel {
    pub mean: f64,
    pub err: f64,
    pub pixels: usize,
}

/// Output of one reduction, q in pixel units.
#[derive(Debug, Clone, PartialEq)]
pub struct RadialProfile {
    pub q: Vec<f64>,
    pub i: Vec<f64>,
    pub err: Vec<f64>,
    /// Largest ring index before trimming.
    pub max_radius: usize,
    /// Pixels that contributed to some ring.
    pub pixels_used: usize,
    pub noise: Option<NoiseLevel>,
    pub zingers_replaced: usize,
}

impl RadialProfile {
    #[inline]
    pub fn len(&self) -> usize {
        self.q.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.q.is_empty()
    }

    /// Wrap the profile in a curve.
    pub fn into_curve(self, label: impl Into<String>) -> Curve {
        Curve::from_layer(
            label,
            Layer {
                q: self.q,
                i: self.i,
                err: self.err,
            },
        )
    }
}

/// Per-ring partial state of a scan.
#[derive(Clone)]
struct Accumulator {
    rings: Vec<RunningStats>,
    noise: RunningStats,
}

impl Accumulator {
    fn new(n_rings: usize) -> Self {
        Self {
            rings: vec![RunningStats::new(); n_rings],
            noise: RunningStats::new(),
        }
    }

    fn merge(mut self, other: Accumulator) -> Self {
        for (mine, theirs) in self.rings.iter_mut().zip(&other.rings) {
            mine.merge(theirs);
        }
        self.noise.merge(&other.noise);
        self
    }
}

/// Pixel-to-ring reducer.
#[derive(Debug, Clone, Default)]
pub struct RadialReducer {
    config: ReduceConfig,
}

impl RadialReducer {
    /// Create with custom configuration.
    pub fn new(config: ReduceConfig) -> Self {
        Self { config }
    }

    /// Create with default configuration.
    pub fn with_defaults() -> Self {
        Self::default()
    }

    pub fn config(&self) -> &ReduceConfig {
        &self.config
    }

    /// Reduce an image around `center`.
    ///
    /// `mask` selects the pixels to average (all when `None`). Pixels left
    /// unused by `readout_noise` provide a scalar background that is
    /// subtracted from every ring.
    pub fn reduce(
        &self,
        image: ArrayView2<'_, f64>,
        center: BeamCenter,
        mask: Option<&PixelMask>,
        readout_noise: Option<&PixelMask>,
    ) -> Result<RadialProfile> {
        let dim = image.dim();
        if let Some(m) = mask {
            m.check_dim(dim)?;
        }
        if let Some(m) = readout_noise {
            m.check_dim(dim)?;
        }
        let (rows, cols) = dim;
        if rows == 0 || cols == 0 || mask.map_or(false, |m| m.count_used() == 0) {
            return Err(SaxsError::NoUsablePixels);
        }

        let max_radius = max_radius(dim, center);
        let n_rings = max_radius + 1;

        let (acc, zingers_replaced) = if self.config.dezinger {
            let coords = (0..rows).flat_map(|row| (0..cols).map(move |col| (row, col)));
            self.scan_dezinger(image, center, mask, readout_noise, n_rings, coords)
        } else if self.config.parallel {
            (self.scan_parallel(image, center, mask, readout_noise, n_rings), 0)
        } else {
            let coords = (0..rows).flat_map(|row| (0..cols).map(move |col| (row, col)));
            (scan(image, center, mask, readout_noise, n_rings, coords), 0)
        };

        let pixels_used: usize = acc.rings.iter().map(|r| r.count()).sum();
        if pixels_used == 0 {
            return Err(SaxsError::NoUsablePixels);
        }

        let mut intensity = Vec::with_capacity(n_rings);
        let mut errors = Vec::with_capacity(n_rings);
        for stats in &acc.rings {
            if stats.count() > 0 {
                intensity.push(stats.mean());
                errors.push(stats.std_err());
            } else {
                intensity.push(0.0);
                errors.push(0.0);
            }
        }

        // Ring 0 holds only the centre pixel.
        let cx = center.x.round();
        let cy = center.y.round();
        intensity[0] = if cx >= 0.0 && cy >= 0.0 && (cx as usize) < cols && (cy as usize) < rows {
            image[[cy as usize, cx as usize]]
        } else {
            0.0
        };
        errors[0] = 0.0;

        let noise = match readout_noise {
            Some(_) if acc.noise.count() > 0 => {
                let level = NoiseLevel {
                    mean: acc.noise.mean(),
                    err: acc.noise.std_err(),
                    pixels: acc.noise.count(),
                };
                debug!(
                    "readout level {:.4} +/- {:.4} over {} pixels",
                    level.mean, level.err, level.pixels
                );
                for (i, e) in intensity.iter_mut().zip(errors.iter_mut()) {
                    *i -= level.mean;
                    *e = (*e * *e + level.err * level.err).sqrt();
                }
                Some(level)
            }
            Some(_) => {
                warn!("readout-noise mask selects no pixels, skipping background subtraction");
                None
            }
            None => None,
        };

        let keep = n_rings.saturating_sub(self.config.trim_rings);
        intensity.truncate(keep);
        errors.truncate(keep);
        for v in intensity.iter_mut().filter(|v| !v.is_finite()) {
            *v = 0.0;
        }
        for v in errors.iter_mut().filter(|v| !v.is_finite()) {
            *v = ERROR_SENTINEL;
        }

        if zingers_replaced > 0 {
            debug!("replaced {} zingers", zingers_replaced);
        }

        Ok(RadialProfile {
            q: pixel_axis(keep),
            i: intensity,
            err: errors,
            max_radius,
            pixels_used,
            noise,
            zingers_replaced,
        })
    }

    fn scan_parallel(
        &self,
        image: ArrayView2<'_, f64>,
        center: BeamCenter,
        mask: Option<&PixelMask>,
        readout_noise: Option<&PixelMask>,
        n_rings: usize,
    ) -> Accumulator {
        let cols = image.ncols();
        (0..image.nrows())
            .into_par_iter()
            .fold(
                || Accumulator::new(n_rings),
                |mut acc, row| {
                    for col in 0..cols {
                        accumulate(&mut acc, image, center, mask, readout_noise, row, col);
                    }
                    acc
                },
            )
            .reduce(|| Accumulator::new(n_rings), Accumulator::merge)
    }

    fn scan_dezinger(
        &self,
        image: ArrayView2<'_, f64>,
        center: BeamCenter,
        mask: Option<&PixelMask>,
        readout_noise: Option<&PixelMask>,
        n_rings: usize,
        coords: impl Iterator<Item = (usize, usize)>,
    ) -> (Accumulator, usize) {
        let mut acc = Accumulator::new(n_rings);
        let mut dezinger = Dezinger::new(
            n_rings,
            self.config.dezinger_window.max(2),
            self.config.dezinger_sensitivity,
        );
        for (row, col) in coords {
            if let Some(ring) = accumulate(&mut acc, image, center, mask, readout_noise, row, col) {
                let value = image[[row, col]];
                dezinger.observe(ring, value, &mut acc.rings[ring]);
            }
        }
        dezinger.finish(&mut acc.rings);
        let replaced = dezinger.replaced();
        (acc, replaced)
    }
}

/// Sequential scan over `coords`.
fn scan(
    image: ArrayView2<'_, f64>,
    center: BeamCenter,
    mask: Option<&PixelMask>,
    readout_noise: Option<&PixelMask>,
    n_rings: usize,
    coords: impl Iterator<Item = (usize, usize)>,
) -> Accumulator {
    let mut acc = Accumulator::new(n_rings);
    for (row, col) in coords {
        accumulate(&mut acc, image, center, mask, readout_noise, row, col);
    }
    acc
}

/// Feed one pixel into the accumulator. Returns the ring it landed in.
#[inline]
fn accumulate(
    acc: &mut Accumulator,
    image: ArrayView2<'_, f64>,
    center: BeamCenter,
    mask: Option<&PixelMask>,
    readout_noise: Option<&PixelMask>,
    row: usize,
    col: usize,
) -> Option<usize> {
    let value = image[[row, col]];
    if let Some(noise) = readout_noise {
        if !noise.is_used(row, col) {
            acc.noise.push(value);
        }
    }
    if mask.map_or(true, |m| m.is_used(row, col)) {
        let ring = center.ring_of(row, col);
        if ring > 0 && ring < acc.rings.len() {
            acc.rings[ring].push(value);
            return Some(ring);
        }
    }
    None
}

/// Ceiling of the largest distance from `center` to an image corner or
/// edge midpoint.
fn max_radius(dim: (usize, usize), center: BeamCenter) -> usize {
    let (rows, cols) = dim;
    let x_max = cols.saturating_sub(1) as f64;
    let y_max = rows.saturating_sub(1) as f64;
    let probes = [
        (0.0, 0.0),
        (x_max, 0.0),
        (0.0, y_max),
        (x_max, y_max),
        (x_max / 2.0, 0.0),
        (x_max / 2.0, y_max),
        (0.0, y_max / 2.0),
        (x_max, y_max / 2.0),
    ];
    probes
        .iter()
        .map(|(x, y)| (x - center.x).hypot(y - center.y))
        .fold(0.0f64, f64::max)
        .ceil() as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::Array2;
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::{Rng, SeedableRng};

    fn sequential() -> RadialReducer {
        RadialReducer::new(ReduceConfig {
            parallel: false,
            ..Default::default()
        })
    }

    #[test]
    fn test_uniform_image() {
        let image = Array2::from_elem((100, 100), 10.0);
        let mask = PixelMask::full(100, 100);
        let profile = RadialReducer::with_defaults()
            .reduce(image.view(), BeamCenter::new(50.0, 50.0), Some(&mask), None)
            .unwrap();

        assert_eq!(profile.max_radius, 71);
        assert_eq!(profile.len(), 72 - 5);
        assert_eq!(profile.q[3], 3.0);
        for r in 0..profile.len() {
            assert_relative_eq!(profile.i[r], 10.0, epsilon = 1e-12);
            assert_relative_eq!(profile.err[r], 0.0, epsilon = 1e-12);
        }
        assert_eq!(profile.pixels_used, 100 * 100 - 1);
    }

    #[test]
    fn test_center_ring_from_center_pixel() {
        let mut image = Array2::from_elem((21, 21), 1.0);
        image[[10, 10]] = 42.0;
        let profile = sequential()
            .reduce(image.view(), BeamCenter::new(10.0, 10.0), None, None)
            .unwrap();
        assert_eq!(profile.i[0], 42.0);
        assert_relative_eq!(profile.i[1], 1.0);

        let outside = sequential()
            .reduce(image.view(), BeamCenter::new(-5.0, 10.0), None, None)
            .unwrap();
        assert_eq!(outside.i[0], 0.0);
    }

    #[test]
    fn test_ring_statistics() {
        // Value equals the column, so ring means are averages over the ring.
        let image = Array2::from_shape_fn((31, 31), |(r, c)| (r + c) as f64);
        let profile = sequential()
            .reduce(image.view(), BeamCenter::new(15.0, 15.0), None, None)
            .unwrap();
        // Rings are symmetric about the centre, whose value is 30.
        for r in 1..10 {
            assert_relative_eq!(profile.i[r], 30.0, epsilon = 1e-9);
            assert!(profile.err[r] > 0.0);
        }
    }

    #[test]
    fn test_scan_order_invariance() {
        let mut rng = StdRng::seed_from_u64(7);
        let image = Array2::from_shape_fn((40, 50), |_| rng.gen_range(0.0..100.0));
        let center = BeamCenter::new(21.3, 17.8);
        let n_rings = max_radius(image.dim(), center) + 1;

        let mut coords: Vec<(usize, usize)> = (0..40)
            .flat_map(|r| (0..50).map(move |c| (r, c)))
            .collect();
        let forward = scan(image.view(), center, None, None, n_rings, coords.iter().copied());
        coords.shuffle(&mut rng);
        let shuffled = scan(image.view(), center, None, None, n_rings, coords.iter().copied());

        for (a, b) in forward.rings.iter().zip(&shuffled.rings) {
            assert_eq!(a.count(), b.count());
            assert_relative_eq!(a.mean(), b.mean(), epsilon = 1e-9);
            assert_relative_eq!(a.variance(), b.variance(), epsilon = 1e-7);
        }
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let mut rng = StdRng::seed_from_u64(11);
        let image = Array2::from_shape_fn((64, 48), |_| rng.gen_range(0.0..10.0));
        let center = BeamCenter::new(30.0, 20.0);

        let seq = sequential().reduce(image.view(), center, None, None).unwrap();
        let par = RadialReducer::with_defaults()
            .reduce(image.view(), center, None, None)
            .unwrap();

        assert_eq!(seq.len(), par.len());
        for k in 0..seq.len() {
            assert_relative_eq!(seq.i[k], par.i[k], epsilon = 1e-9);
            assert_relative_eq!(seq.err[k], par.err[k], epsilon = 1e-9);
        }
    }

    #[test]
    fn test_masked_annulus_is_zero() {
        let image = Array2::from_elem((41, 41), 3.0);
        let grid = Array2::from_shape_fn((41, 41), |(r, c)| {
            let d = (c as f64 - 20.0).hypot(r as f64 - 20.0).round();
            d != 5.0
        });
        let mask = PixelMask::from_array(grid);
        let profile = sequential()
            .reduce(image.view(), BeamCenter::new(20.0, 20.0), Some(&mask), None)
            .unwrap();
        assert_eq!(profile.i[5], 0.0);
        assert_eq!(profile.err[5], 0.0);
        assert_relative_eq!(profile.i[4], 3.0);
    }

    #[test]
    fn test_mask_size_mismatch() {
        let image = Array2::from_elem((10, 12), 1.0);
        let mask = PixelMask::full(12, 10);
        let result = sequential().reduce(image.view(), BeamCenter::new(5.0, 5.0), Some(&mask), None);
        assert!(matches!(result, Err(SaxsError::MaskSize { .. })));
    }

    #[test]
    fn test_fully_masked_image() {
        let image = Array2::from_elem((10, 10), 1.0);
        let mask = PixelMask::from_array(Array2::from_elem((10, 10), false));
        let result = sequential().reduce(image.view(), BeamCenter::new(5.0, 5.0), Some(&mask), None);
        assert!(matches!(result, Err(SaxsError::NoUsablePixels)));
    }

    #[test]
    fn test_readout_noise_subtracted() {
        let mut image = Array2::from_elem((30, 30), 12.0);
        // Shielded column reads 2.0 +/- 1.0.
        for row in 0..30 {
            image[[row, 29]] = if row % 2 == 0 { 1.0 } else { 3.0 };
        }
        let noise_grid = Array2::from_shape_fn((30, 30), |(_, c)| c != 29);
        let noise_mask = PixelMask::from_array(noise_grid.clone());
        let beam_mask = PixelMask::from_array(noise_grid);

        let profile = sequential()
            .reduce(
                image.view(),
                BeamCenter::new(15.0, 15.0),
                Some(&beam_mask),
                Some(&noise_mask),
            )
            .unwrap();

        let noise = profile.noise.unwrap();
        assert_eq!(noise.pixels, 30);
        assert_relative_eq!(noise.mean, 2.0);
        assert_relative_eq!(noise.err, 1.0 / 30f64.sqrt(), epsilon = 1e-12);
        assert_relative_eq!(profile.i[3], 10.0, epsilon = 1e-12);
        assert_relative_eq!(profile.err[3], noise.err, epsilon = 1e-12);
    }

    #[test]
    fn test_dezinger_removes_hot_pixel() {
        let mut image = Array2::from_elem((101, 101), 5.0);
        image[[50, 80]] = 5000.0;
        let center = BeamCenter::new(50.0, 50.0);

        let plain = sequential().reduce(image.view(), center, None, None).unwrap();
        let cleaned = RadialReducer::new(ReduceConfig {
            dezinger: true,
            ..Default::default()
        })
        .reduce(image.view(), center, None, None)
        .unwrap();

        assert!(plain.i[30] > 10.0);
        assert_eq!(cleaned.zingers_replaced, 1);
        assert_relative_eq!(cleaned.i[30], 5.0, epsilon = 1e-9);
        assert!((cleaned.i[20] - plain.i[20]).abs() < 1e-9);
    }

    #[test]
    fn test_dezinger_catches_first_pixel_of_ring() {
        let mut image = Array2::from_elem((101, 101), 5.0);
        // Sixth ring-30 sample of the row-major scan, inside the first half-window.
        image[[20, 50]] = 5000.0;
        let cleaned = RadialReducer::new(ReduceConfig {
            dezinger: true,
            ..Default::default()
        })
        .reduce(image.view(), BeamCenter::new(50.0, 50.0), None, None)
        .unwrap();

        assert_eq!(cleaned.zingers_replaced, 1);
        assert_relative_eq!(cleaned.i[30], 5.0, epsilon = 1e-9);
    }

    #[test]
    fn test_into_curve() {
        let image = Array2::from_elem((20, 20), 2.0);
        let curve = sequential()
            .reduce(image.view(), BeamCenter::new(10.0, 10.0), None, None)
            .unwrap()
            .into_curve("frame_0001");
        assert_eq!(curve.label(), "frame_0001");
        assert_eq!(curve.q()[1], 1.0);
        assert_relative_eq!(curve.i()[2], 2.0);
    }
}
