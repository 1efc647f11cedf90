//! Scaling curves onto a reference.

use log::debug;
use nalgebra::{Matrix2, Vector2};

use crate::data::stats::{interp, mean};
use crate::data::{Curve, Operation};
use crate::error::{Result, SaxsError};

/// Scale and offset found for one curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleFit {
    pub scale: f64,
    pub offset: f64,
}

/// Intensities of `curve` before its own scale and offset.
fn unscaled_intensity(curve: &Curve) -> Vec<f64> {
    let (start, end) = curve.selected_range();
    curve.binned().i[start..end]
        .iter()
        .map(|i| i / curve.norm())
        .collect()
}

/// Fit `scale * I + offset` of every curve to `reference` by least squares.
///
/// Each curve is interpolated onto the reference points inside its q-range
/// and the 2x2 normal equations are solved there. The fit is applied through
/// [`Curve::set_scale`] and [`Curve::set_offset`], replacing any previous
/// values.
pub fn superimpose(reference: &Curve, curves: &mut [Curve]) -> Result<Vec<ScaleFit>> {
    let (q_ref, i_ref) = (reference.q(), reference.i());
    let mut fits = Vec::with_capacity(curves.len());

    for curve in curves.iter_mut() {
        let base = unscaled_intensity(curve);
        let q = curve.q();
        if q.len() < 2 {
            return Err(SaxsError::DataNotCompatible(format!(
                "`{}` has fewer than two points",
                curve.label()
            )));
        }
        let (lo, hi) = (q[0], q[q.len() - 1]);

        let mut s_xx = 0.0;
        let mut s_x = 0.0;
        let mut s_xy = 0.0;
        let mut s_y = 0.0;
        let mut n = 0usize;
        for (qr, ir) in q_ref.iter().zip(i_ref) {
            if *qr < lo || *qr > hi {
                continue;
            }
            let x = interp(*qr, q, &base);
            s_xx += x * x;
            s_x += x;
            s_xy += x * ir;
            s_y += ir;
            n += 1;
        }
        if n < 2 {
            return Err(SaxsError::DataNotCompatible(format!(
                "`{}` overlaps `{}` in fewer than two points",
                curve.label(),
                reference.label()
            )));
        }

        let normal = Matrix2::new(s_xx, s_x, s_x, n as f64);
        let rhs = Vector2::new(s_xy, s_y);
        let solution = normal.lu().solve(&rhs).ok_or_else(|| {
            SaxsError::DataNotCompatible(format!("`{}` has constant intensity", curve.label()))
        })?;
        let fit = ScaleFit {
            scale: solution[0],
            offset: solution[1],
        };
        debug!(
            "{}: scale {:.6e}, offset {:.6e} over {} points",
            curve.label(),
            fit.scale,
            fit.offset,
            n
        );

        curve.set_scale(fit.scale);
        curve.set_offset(fit.offset);
        curve.record(Operation::Superimpose, &[reference.provenance()]);
        fits.push(fit);
    }
    Ok(fits)
}

/// Scale `curve` so its mean intensity in `[q_min, q_max]` equals the
/// reference's. Returns the scale applied.
pub fn align(reference: &Curve, curve: &mut Curve, q_min: f64, q_max: f64) -> Result<f64> {
    let window_mean = |q: &[f64], i: &[f64]| {
        let values: Vec<f64> = q
            .iter()
            .zip(i)
            .filter(|(q, _)| **q >= q_min && **q <= q_max)
            .map(|(_, i)| *i)
            .collect();
        mean(&values)
    };

    let target = window_mean(reference.q(), reference.i());
    let base = unscaled_intensity(curve);
    let current = window_mean(curve.q(), &base);
    if !target.is_finite() || !current.is_finite() || current == 0.0 {
        return Err(SaxsError::DataNotCompatible(format!(
            "no usable points of `{}` and `{}` in q window [{}, {}]",
            reference.label(),
            curve.label(),
            q_min,
            q_max
        )));
    }

    let factor = target / current;
    curve.set_scale(factor);
    curve.record(Operation::Align, &[reference.provenance()]);
    Ok(factor)
}
