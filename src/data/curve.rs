//! SAXS curve data structure.
//!
//! A curve keeps three layers of `(q, I, E)` arrays:
//!
//! - `raw`: the values the curve was created with, never modified.
//! - `binned`: rebinned/calibrated copy of `raw`, changed only by the
//!   curve's own setters.
//! - `active`: `binned` with the transform parameters applied, computed on
//!   first access and invalidated by every setter.
//!
//! All accessors returning slices (`q()`, `i()`, `err()`) expose the active
//! arrays restricted to the selected index window.

use std::collections::BTreeMap;
use std::f64::consts::PI;
use std::sync::OnceLock;

use super::provenance::{Operation, Provenance};
use super::stats::{linspace, logspace, mean, simpson, std_dev};
use crate::error::{Result, SaxsError};

/// One `(q, I, E)` triple of equal-length arrays.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Layer {
    /// Scattering vector values.
    pub q: Vec<f64>,
    /// Intensity values.
    pub i: Vec<f64>,
    /// Intensity uncertainties.
    pub err: Vec<f64>,
}

impl Layer {
    /// Create a layer, checking the arrays have equal length.
    pub fn new(q: Vec<f64>, i: Vec<f64>, err: Vec<f64>) -> Result<Self> {
        let len = q.len();
        if i.len() != len || err.len() != len {
            return Err(SaxsError::LengthMismatch {
                q_len: len,
                intensity_len: i.len(),
                err_len: err.len(),
            });
        }
        Ok(Self { q, i, err })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.q.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.q.is_empty()
    }

    /// Copy of the index window `[start, end)`.
    pub fn slice(&self, start: usize, end: usize) -> Layer {
        Layer {
            q: self.q[start..end].to_vec(),
            i: self.i[start..end].to_vec(),
            err: self.err[start..end].to_vec(),
        }
    }

    fn check_lengths(&self) -> Result<()> {
        if self.i.len() != self.q.len() || self.err.len() != self.q.len() {
            return Err(SaxsError::LengthMismatch {
                q_len: self.q.len(),
                intensity_len: self.i.len(),
                err_len: self.err.len(),
            });
        }
        Ok(())
    }

    fn push(&mut self, q: f64, i: f64, err: f64) {
        self.q.push(q);
        self.i.push(i);
        self.err.push(err);
    }

    /// Mean q and I of `[start, end)`, error `sqrt(sum E^2) / sqrt(N)`.
    fn bin_mean(&self, start: usize, end: usize) -> (f64, f64, f64) {
        let n = (end - start) as f64;
        let q = self.q[start..end].iter().sum::<f64>() / n;
        let i = self.i[start..end].iter().sum::<f64>() / n;
        let err = self.err[start..end].iter().map(|e| e * e).sum::<f64>().sqrt() / n.sqrt();
        (q, i, err)
    }
}

/// A single SAXS measurement with its transform parameters and history.
#[derive(Clone, Debug)]
pub struct Curve {
    provenance: Provenance,
    raw: Layer,
    binned: Layer,
    scale: f64,
    offset: f64,
    norm: f64,
    q_scale: f64,
    bin_size: usize,
    selected: (usize, usize),
    counters: BTreeMap<String, f64>,
    active: OnceLock<Layer>,
}

impl Curve {
    /// Create a curve from raw arrays.
    pub fn new(label: impl Into<String>, q: Vec<f64>, i: Vec<f64>, err: Vec<f64>) -> Result<Self> {
        Ok(Self::from_layer(label, Layer::new(q, i, err)?))
    }

    /// Create a curve whose raw layer is `layer`.
    pub fn from_layer(label: impl Into<String>, layer: Layer) -> Self {
        Self::with_provenance(Provenance::new(label), layer)
    }

    /// Create a curve with an existing identity.
    pub fn with_provenance(provenance: Provenance, layer: Layer) -> Self {
        let len = layer.len();
        Self {
            provenance,
            binned: layer.clone(),
            raw: layer,
            scale: 1.0,
            offset: 0.0,
            norm: 1.0,
            q_scale: 1.0,
            bin_size: 1,
            selected: (0, len),
            counters: BTreeMap::new(),
            active: OnceLock::new(),
        }
    }

    /// Create a curve produced by `operation` from `inputs`.
    pub(crate) fn derived(
        label: impl Into<String>,
        layer: Layer,
        operation: Operation,
        inputs: &[&Curve],
    ) -> Self {
        let parents: Vec<&Provenance> = inputs.iter().map(|c| &c.provenance).collect();
        Self::with_provenance(Provenance::derived(label, operation, &parents), layer)
    }

    // ---------------------------------------------------------------------
    // Identity
    // ---------------------------------------------------------------------

    #[inline]
    pub fn label(&self) -> &str {
        &self.provenance.label
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.provenance.label = label.into();
    }

    #[inline]
    pub fn provenance(&self) -> &Provenance {
        &self.provenance
    }

    /// Append an entry to this curve's history.
    pub fn record(&mut self, operation: Operation, inputs: &[&Provenance]) {
        self.provenance.record(operation, inputs);
    }

    /// Per-curve scalar counters (exposure monitors, beam current, ...).
    pub fn counters(&self) -> &BTreeMap<String, f64> {
        &self.counters
    }

    pub fn counter(&self, name: &str) -> Option<f64> {
        self.counters.get(name).copied()
    }

    pub fn set_counter(&mut self, name: impl Into<String>, value: f64) {
        self.counters.insert(name.into(), value);
    }

    // ---------------------------------------------------------------------
    // Layers
    // ---------------------------------------------------------------------

    #[inline]
    pub fn raw(&self) -> &Layer {
        &self.raw
    }

    #[inline]
    pub fn binned(&self) -> &Layer {
        &self.binned
    }

    /// Full active layer (all binned points, transforms applied).
    pub fn active(&self) -> &Layer {
        self.active.get_or_init(|| self.compute_active())
    }

    /// Active values restricted to the selected range.
    pub fn selected_layer(&self) -> Layer {
        let (start, end) = self.selected;
        self.active().slice(start, end)
    }

    /// Number of binned points.
    #[inline]
    pub fn len(&self) -> usize {
        self.binned.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.binned.is_empty()
    }

    /// Active q over the selected range.
    pub fn q(&self) -> &[f64] {
        let (start, end) = self.selected;
        &self.active().q[start..end]
    }

    /// Active intensity over the selected range.
    pub fn i(&self) -> &[f64] {
        let (start, end) = self.selected;
        &self.active().i[start..end]
    }

    /// Active error over the selected range.
    pub fn err(&self) -> &[f64] {
        let (start, end) = self.selected;
        &self.active().err[start..end]
    }

    #[inline]
    pub fn selected_range(&self) -> (usize, usize) {
        self.selected
    }

    // ---------------------------------------------------------------------
    // Transform parameters
    // ---------------------------------------------------------------------

    #[inline]
    pub fn scale(&self) -> f64 {
        self.scale
    }

    #[inline]
    pub fn offset(&self) -> f64 {
        self.offset
    }

    #[inline]
    pub fn norm(&self) -> f64 {
        self.norm
    }

    #[inline]
    pub fn q_scale(&self) -> f64 {
        self.q_scale
    }

    #[inline]
    pub fn bin_size(&self) -> usize {
        self.bin_size
    }

    /// Set the intensity scale factor. Replaces any previous scale.
    pub fn set_scale(&mut self, factor: f64) {
        self.scale = factor;
        self.invalidate();
    }

    /// Set the additive intensity offset. Replaces any previous offset.
    pub fn set_offset(&mut self, offset: f64) {
        self.offset = offset;
        self.invalidate();
    }

    /// Set the normalization divisor. Replaces any previous normalization.
    pub fn set_norm(&mut self, norm: f64) -> Result<()> {
        if norm == 0.0 || !norm.is_finite() {
            return Err(SaxsError::invalid("norm", format!("{} is not a usable divisor", norm)));
        }
        self.norm = norm;
        self.invalidate();
        Ok(())
    }

    /// Set the q multiplier. Replaces any previous q scale.
    pub fn set_q_scale(&mut self, factor: f64) {
        self.q_scale = factor;
        self.invalidate();
    }

    // ---------------------------------------------------------------------
    // Binned-layer mutators
    // ---------------------------------------------------------------------

    /// Average every `bin_size` consecutive raw points into one.
    ///
    /// A leftover tail shorter than `bin_size` is appended unbinned. The
    /// selected range is reset to the whole curve.
    pub fn set_binning(&mut self, bin_size: usize) -> Result<()> {
        if bin_size == 0 {
            return Err(SaxsError::invalid("bin_size", "must be at least 1"));
        }
        let n = self.raw.len();
        let n_bins = n / bin_size;
        let mut binned = Layer::default();
        for b in 0..n_bins {
            let (q, i, err) = self.raw.bin_mean(b * bin_size, (b + 1) * bin_size);
            binned.push(q, i, err);
        }
        for k in n_bins * bin_size..n {
            binned.push(self.raw.q[k], self.raw.i[k], self.raw.err[k]);
        }
        binned.check_lengths()?;

        self.binned = binned;
        self.bin_size = bin_size;
        self.selected = (0, self.binned.len());
        self.invalidate();
        Ok(())
    }

    /// Rebin the raw points into about `n_points` geometrically growing bins.
    ///
    /// Bin widths follow the spacing of `logspace(1, log10(N), n_points)`;
    /// the first bin and any bin narrower than two points copy a single raw
    /// point verbatim.
    pub fn set_log_binning(&mut self, n_points: usize) -> Result<()> {
        if n_points == 0 {
            return Err(SaxsError::invalid("n_points", "must be at least 1"));
        }
        let n = self.raw.len();
        let bounds = logspace(1.0, (n.max(1) as f64).log10(), n_points);

        let mut binned = Layer::default();
        let mut idx = 0;
        for k in 0..bounds.len() {
            if idx >= n {
                break;
            }
            let width = if k == 0 {
                1
            } else {
                (bounds[k] - bounds[k - 1]).floor().max(1.0) as usize
            };
            let end = (idx + width).min(n);
            if end - idx == 1 {
                binned.push(self.raw.q[idx], self.raw.i[idx], self.raw.err[idx]);
            } else {
                let (q, i, err) = self.raw.bin_mean(idx, end);
                binned.push(q, i, err);
            }
            idx = end;
        }
        for k in idx..n {
            binned.push(self.raw.q[k], self.raw.i[k], self.raw.err[k]);
        }
        binned.check_lengths()?;

        self.binned = binned;
        self.selected = (0, self.binned.len());
        self.invalidate();
        Ok(())
    }

    /// Convert pixel-index q values into momentum transfer.
    ///
    /// `distance` and `pixel_size` share one length unit; q comes out in the
    /// inverse of the `wavelength` unit. Overwrites `binned.q` and cannot be
    /// undone short of [`Curve::reset`].
    pub fn calibrate_q(&mut self, distance: f64, pixel_size: f64, wavelength: f64) -> Result<()> {
        if !(distance > 0.0) {
            return Err(SaxsError::invalid("distance", "must be positive"));
        }
        if !(wavelength > 0.0) {
            return Err(SaxsError::invalid("wavelength", "must be positive"));
        }
        for q in self.binned.q.iter_mut() {
            let theta = 0.5 * (*q * pixel_size / distance).atan();
            *q = 4.0 * PI * theta.sin() / wavelength;
        }
        self.binned.check_lengths()?;
        self.invalidate();
        Ok(())
    }

    /// Select the binned index window `[start, end)`.
    pub fn set_q_range(&mut self, start: usize, end: usize) -> Result<()> {
        let len = self.binned.len();
        if start > end || end > len {
            return Err(SaxsError::Range { start, end, len });
        }
        self.selected = (start, end);
        Ok(())
    }

    /// Select the points whose active q lies in `[q_min, q_max]`.
    pub fn crop_q(&mut self, q_min: f64, q_max: f64) -> Result<()> {
        let q = &self.active().q;
        let start = q.partition_point(|v| *v < q_min);
        let end = q.partition_point(|v| *v <= q_max);
        if start >= end {
            return Err(SaxsError::Range {
                start,
                end,
                len: q.len(),
            });
        }
        self.set_q_range(start, end)
    }

    /// Restore `binned` from `raw` and every transform to identity.
    pub fn reset(&mut self) {
        self.binned = self.raw.clone();
        self.scale = 1.0;
        self.offset = 0.0;
        self.norm = 1.0;
        self.q_scale = 1.0;
        self.bin_size = 1;
        self.selected = (0, self.binned.len());
        self.invalidate();
    }

    /// Replace binned intensities that exceed the trailing-window mean by
    /// more than `stds` standard deviations. Returns the number replaced.
    pub fn remove_zingers(&mut self, start: usize, window: usize, stds: f64) -> Result<usize> {
        if window < 2 {
            return Err(SaxsError::invalid("window", "must hold at least two points"));
        }
        let intensity = &mut self.binned.i;
        let mut replaced = 0;
        for k in (start + window)..intensity.len() {
            let trailing = &intensity[k - window..k];
            let window_mean = mean(trailing);
            let threshold = window_mean + stds * std_dev(trailing);
            if intensity[k] > threshold {
                intensity[k] = window_mean;
                replaced += 1;
            }
        }
        if replaced > 0 {
            self.invalidate();
        }
        Ok(replaced)
    }

    // ---------------------------------------------------------------------
    // Summaries
    // ---------------------------------------------------------------------

    /// Integral of I over q in the selected range (Simpson's rule).
    pub fn total_intensity(&self) -> f64 {
        simpson(self.i(), self.q())
    }

    /// Mean active intensity over the selected range.
    pub fn mean_intensity(&self) -> f64 {
        mean(self.i())
    }

    fn invalidate(&mut self) {
        self.active = OnceLock::new();
    }

    fn compute_active(&self) -> Layer {
        let scale_abs = self.scale.abs();
        Layer {
            q: self.binned.q.iter().map(|q| q * self.q_scale).collect(),
            i: self
                .binned
                .i
                .iter()
                .map(|i| i / self.norm * self.scale + self.offset)
                .collect(),
            err: self
                .binned
                .err
                .iter()
                .map(|e| e / self.norm * scale_abs)
                .collect(),
        }
    }
}

/// Evenly spaced pixel-index q axis `0, 1, ..., n-1`.
pub fn pixel_axis(n: usize) -> Vec<f64> {
    linspace(0.0, n.saturating_sub(1) as f64, n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ramp(n: usize) -> Curve {
        let q: Vec<f64> = (0..n).map(|k| 0.01 * (k + 1) as f64).collect();
        let i: Vec<f64> = (0..n).map(|k| 100.0 - k as f64).collect();
        let e = vec![1.0; n];
        Curve::new("ramp", q, i, e).unwrap()
    }

    #[test]
    fn test_curve_creation() {
        let curve = ramp(10);
        assert_eq!(curve.label(), "ramp");
        assert_eq!(curve.len(), 10);
        assert_eq!(curve.selected_range(), (0, 10));
        assert_eq!(curve.raw(), curve.binned());
        assert_eq!(curve.i(), curve.raw().i.as_slice());
    }

    #[test]
    fn test_curve_length_mismatch() {
        let result = Curve::new("bad", vec![1.0, 2.0], vec![10.0, 20.0, 30.0], vec![0.1, 0.2]);
        assert!(matches!(result, Err(SaxsError::LengthMismatch { .. })));
    }

    #[test]
    fn test_scale_does_not_compound() {
        let mut curve = ramp(5);
        curve.set_scale(2.0);
        curve.set_scale(0.5);
        for (active, binned) in curve.i().iter().zip(&curve.binned().i) {
            assert_relative_eq!(*active, binned * 0.5);
        }
    }

    #[test]
    fn test_active_transform() {
        let mut curve = ramp(5);
        curve.set_norm(4.0).unwrap();
        curve.set_scale(-2.0);
        curve.set_offset(3.0);
        curve.set_q_scale(10.0);

        let binned = curve.binned().clone();
        for k in 0..5 {
            assert_relative_eq!(curve.i()[k], binned.i[k] / 4.0 * -2.0 + 3.0);
            assert_relative_eq!(curve.err()[k], binned.err[k] / 4.0 * 2.0);
            assert_relative_eq!(curve.q()[k], binned.q[k] * 10.0);
        }
        assert!(curve.set_norm(0.0).is_err());
    }

    #[test]
    fn test_set_q_range() {
        let mut curve = ramp(10);
        curve.set_q_range(2, 5).unwrap();
        assert_eq!(curve.q().len(), 3);
        assert_relative_eq!(curve.q()[0], 0.03);

        assert!(matches!(
            curve.set_q_range(0, 11),
            Err(SaxsError::Range { len: 10, .. })
        ));
        assert!(curve.set_q_range(6, 5).is_err());
        assert_eq!(curve.selected_range(), (2, 5));
    }

    #[test]
    fn test_crop_q() {
        let mut curve = ramp(10);
        curve.crop_q(0.025, 0.075).unwrap();
        assert_eq!(curve.selected_range(), (2, 7));
        assert!(curve.crop_q(1.0, 2.0).is_err());
    }

    #[test]
    fn test_set_binning_with_tail() {
        let mut curve = ramp(10);
        curve.set_binning(3).unwrap();
        let binned = curve.binned();
        assert_eq!(binned.len(), 4);
        assert_relative_eq!(binned.q[0], 0.02);
        assert_relative_eq!(binned.i[0], 99.0);
        assert_relative_eq!(binned.err[0], 3f64.sqrt() / 3f64.sqrt());
        // Leftover tail point is copied as is.
        assert_relative_eq!(binned.q[3], 0.10);
        assert_relative_eq!(binned.i[3], 91.0);
        assert_eq!(curve.selected_range(), (0, 4));
        assert_eq!(curve.bin_size(), 3);
        assert!(curve.set_binning(0).is_err());
    }

    #[test]
    fn test_set_log_binning() {
        let mut curve = ramp(100);
        curve.set_log_binning(20).unwrap();
        let binned = curve.binned();

        assert!(binned.len() < 100);
        assert_eq!(binned.q[0], curve.raw().q[0]);
        assert_eq!(binned.i[0], curve.raw().i[0]);
        // q stays strictly increasing after geometric binning.
        assert!(binned.q.windows(2).all(|w| w[1] > w[0]));
        assert_relative_eq!(*binned.q.last().unwrap(), 1.0);
    }

    #[test]
    fn test_calibrate_q() {
        let mut curve = Curve::new("pix", vec![0.0, 100.0], vec![1.0, 1.0], vec![0.1, 0.1]).unwrap();
        curve.calibrate_q(1000.0, 0.172, 1.0).unwrap();
        let theta = 0.5 * (100.0f64 * 0.172 / 1000.0).atan();
        assert_relative_eq!(curve.q()[0], 0.0);
        assert_relative_eq!(curve.q()[1], 4.0 * PI * theta.sin());
        assert!(curve.calibrate_q(0.0, 0.172, 1.0).is_err());
    }

    #[test]
    fn test_reset_restores_identity() {
        let mut curve = ramp(10);
        curve.set_binning(2).unwrap();
        curve.set_scale(3.0);
        curve.set_offset(1.0);
        curve.set_q_range(1, 3).unwrap();
        curve.reset();

        assert_eq!(curve.binned(), curve.raw());
        assert_eq!(curve.scale(), 1.0);
        assert_eq!(curve.offset(), 0.0);
        assert_eq!(curve.selected_range(), (0, 10));
        assert_eq!(curve.i(), curve.raw().i.as_slice());
    }

    #[test]
    fn test_remove_zingers() {
        let q: Vec<f64> = (0..40).map(|k| k as f64).collect();
        let mut i: Vec<f64> = (0..40).map(|k| 10.0 + 0.1 * ((k % 3) as f64)).collect();
        i[25] = 500.0;
        let mut curve = Curve::new("z", q, i, vec![1.0; 40]).unwrap();

        let replaced = curve.remove_zingers(0, 10, 4.0).unwrap();
        assert_eq!(replaced, 1);
        assert!(curve.i()[25] < 11.0);
    }

    #[test]
    fn test_counters_and_summaries() {
        let mut curve = Curve::new("c", vec![0.0, 1.0, 2.0], vec![2.0, 2.0, 2.0], vec![0.1; 3]).unwrap();
        curve.set_counter("i0", 1.5e5);
        assert_eq!(curve.counter("i0"), Some(1.5e5));
        assert_eq!(curve.counter("missing"), None);
        assert_relative_eq!(curve.total_intensity(), 4.0);
        assert_relative_eq!(curve.mean_intensity(), 2.0);
    }

    #[test]
    fn test_pixel_axis() {
        assert_eq!(pixel_axis(4), vec![0.0, 1.0, 2.0, 3.0]);
        assert!(pixel_axis(0).is_empty());
    }
}
