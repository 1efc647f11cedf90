//! Savitzky-Golay smoothing of curve intensities.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::data::{Curve, Layer, Operation};
use crate::error::{Result, SaxsError};

/// Configuration for smoothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothConfig {
    /// Odd number of points in each local fit.
    pub window: usize,
    /// Degree of the local polynomial.
    pub poly_order: usize,
}

impl Default for SmoothConfig {
    fn default() -> Self {
        Self {
            window: 25,
            poly_order: 5,
        }
    }
}

/// Least-squares projector of a polynomial fit over `window` points.
///
/// Row `c` maps window samples to the coefficient of `u^c`, with `u` the
/// offset from the window centre scaled into `[-1, 1]`.
fn projector(window: usize, poly_order: usize) -> Result<DMatrix<f64>> {
    let half = (window / 2) as f64;
    let a = DMatrix::from_fn(window, poly_order + 1, |r, c| {
        ((r as f64 - half) / half).powi(c as i32)
    });
    let at = a.transpose();
    let normal = &at * &a;
    let inverse = normal
        .try_inverse()
        .ok_or_else(|| SaxsError::invalid("poly_order", "local fit is singular"))?;
    Ok(inverse * at)
}

/// Weights that evaluate the local fit at scaled offset `u`.
fn weights_at(projector: &DMatrix<f64>, u: f64) -> Vec<f64> {
    (0..projector.ncols())
        .map(|j| {
            (0..projector.nrows())
                .map(|c| u.powi(c as i32) * projector[(c, j)])
                .sum::<f64>()
        })
        .collect()
}

/// Smooth `y` with a Savitzky-Golay filter.
///
/// Interior points use the centred fit; the first and last `window / 2`
/// points are evaluated from the polynomial fitted to the edge window.
pub fn savgol_filter(y: &[f64], window: usize, poly_order: usize) -> Result<Vec<f64>> {
    if window % 2 == 0 || window < 3 {
        return Err(SaxsError::invalid("window", "must be odd and at least 3"));
    }
    if poly_order >= window {
        return Err(SaxsError::invalid("poly_order", "must be less than the window"));
    }
    let n = y.len();
    if n < window {
        return Err(SaxsError::invalid(
            "window",
            format!("{} points cannot fill a window of {}", n, window),
        ));
    }

    let proj = projector(window, poly_order)?;
    let half = window / 2;
    let centre = weights_at(&proj, 0.0);
    let apply = |weights: &[f64], start: usize| -> f64 {
        weights
            .iter()
            .zip(&y[start..start + window])
            .map(|(w, v)| w * v)
            .sum()
    };

    let mut out = vec![0.0; n];
    for k in half..n - half {
        out[k] = apply(&centre, k - half);
    }
    for k in 0..half {
        let u = (k as f64 - half as f64) / half as f64;
        out[k] = apply(&weights_at(&proj, u), 0);
        out[n - 1 - k] = apply(&weights_at(&proj, -u), n - window);
    }
    Ok(out)
}

/// Smoothed copy of a curve's selected range. Errors are kept as they are.
pub fn smooth(curve: &Curve, config: &SmoothConfig) -> Result<Curve> {
    let selected = curve.selected_layer();
    let i = savgol_filter(&selected.i, config.window, config.poly_order)?;
    let layer = Layer {
        q: selected.q,
        i,
        err: selected.err,
    };
    Ok(Curve::derived(curve.label(), layer, Operation::Smooth, &[curve]))
}
