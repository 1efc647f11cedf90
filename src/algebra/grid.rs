//! q-grid comparison and reconciliation shared by the algebra operations.

use log::warn;

use crate::data::stats::{grids_match, interp, linspace, round_to, GRID_DECIMALS};
use crate::data::{Curve, Layer};
use crate::error::{Result, SaxsError};

/// Closed q interval covered by both grids, `None` when disjoint.
pub fn overlap(a: &[f64], b: &[f64]) -> Option<(f64, f64)> {
    let (a0, a1) = (*a.first()?, *a.last()?);
    let (b0, b1) = (*b.first()?, *b.last()?);
    let start = a0.max(b0);
    let end = a1.min(b1);
    if start > end {
        None
    } else {
        Some((start, end))
    }
}

/// Index window of `q` whose rounded values fall inside `[start, end]`.
pub fn window_in(q: &[f64], start: f64, end: f64) -> (usize, usize) {
    let lo = round_to(start, GRID_DECIMALS);
    let hi = round_to(end, GRID_DECIMALS);
    let first = q.partition_point(|v| round_to(*v, GRID_DECIMALS) < lo);
    let last = q.partition_point(|v| round_to(*v, GRID_DECIMALS) <= hi);
    (first, last.max(first))
}

/// Mean point spacing of an ascending grid.
pub fn mean_spacing(q: &[f64]) -> Option<f64> {
    if q.len() < 2 {
        return None;
    }
    let spacing = (q[q.len() - 1] - q[0]) / (q.len() - 1) as f64;
    (spacing > 0.0).then_some(spacing)
}

/// Linear resampling of intensity and error onto `grid`.
pub fn resample(layer: &Layer, grid: &[f64]) -> Layer {
    Layer {
        q: grid.to_vec(),
        i: grid.iter().map(|q| interp(*q, &layer.q, &layer.i)).collect(),
        err: grid.iter().map(|q| interp(*q, &layer.q, &layer.err)).collect(),
    }
}

/// Bring two layers onto one q-grid.
///
/// Identical grids pass through. Otherwise, and only when `forced`, both are
/// cut to their q overlap; if the overlapping parts share a grid they are
/// sliced to it, else both are resampled onto an even grid spaced like the
/// finer input.
pub fn reconcile_pair(a: &Layer, b: &Layer, forced: bool) -> Result<(Layer, Layer)> {
    if a.is_empty() || b.is_empty() {
        return Err(SaxsError::DataNotCompatible("empty q-range".to_string()));
    }
    if grids_match(&a.q, &b.q) {
        return Ok((a.clone(), b.clone()));
    }
    if !forced {
        return Err(SaxsError::DataNotCompatible(
            "q-grids differ; reconciliation was not requested".to_string(),
        ));
    }
    let (start, end) = overlap(&a.q, &b.q)
        .ok_or_else(|| SaxsError::DataNotCompatible("q-ranges do not overlap".to_string()))?;

    let (a0, a1) = window_in(&a.q, start, end);
    let (b0, b1) = window_in(&b.q, start, end);
    if a1 > a0 && grids_match(&a.q[a0..a1], &b.q[b0..b1]) {
        warn!("q-grids differ, slicing to the shared sub-grid [{}, {}]", start, end);
        return Ok((a.slice(a0, a1), b.slice(b0, b1)));
    }

    let spacing = match (mean_spacing(&a.q), mean_spacing(&b.q)) {
        (Some(x), Some(y)) => x.min(y),
        (Some(x), None) | (None, Some(x)) => x,
        (None, None) => {
            return Err(SaxsError::DataNotCompatible(
                "single-point curves on different q values".to_string(),
            ))
        }
    };
    let n_points = ((end - start) / spacing).round() as usize + 1;
    let grid = linspace(start, end, n_points);
    warn!(
        "q-grids differ, resampling both curves onto {} points in [{}, {}]",
        n_points, start, end
    );
    Ok((resample(a, &grid), resample(b, &grid)))
}

/// Bring the selected ranges of several curves onto the first curve's grid.
///
/// Without `forced` every grid must match. With it, the first curve is cut
/// to the common q overlap and the others are interpolated onto its points.
pub fn reconcile_all(curves: &[&Curve], forced: bool) -> Result<Vec<Layer>> {
    let layers: Vec<Layer> = curves.iter().map(|c| c.selected_layer()).collect();
    let first = layers.first().ok_or(SaxsError::EmptyCurveList)?;
    if first.is_empty() {
        return Err(SaxsError::DataNotCompatible("empty q-range".to_string()));
    }
    if layers.iter().all(|l| grids_match(&first.q, &l.q)) {
        return Ok(layers);
    }
    if !forced {
        let odd = layers
            .iter()
            .zip(curves)
            .find(|(l, _)| !grids_match(&first.q, &l.q))
            .map(|(_, c)| c.label().to_string())
            .unwrap_or_default();
        return Err(SaxsError::DataNotCompatible(format!(
            "q-grid of `{}` differs from `{}`",
            odd,
            curves[0].label()
        )));
    }

    let mut start = first.q[0];
    let mut end = first.q[first.len() - 1];
    for layer in &layers[1..] {
        let (s, e) = overlap(&[start, end], &layer.q)
            .ok_or_else(|| SaxsError::DataNotCompatible("q-ranges do not overlap".to_string()))?;
        start = s;
        end = e;
    }
    let (lo, hi) = window_in(&first.q, start, end);
    if hi <= lo {
        return Err(SaxsError::DataNotCompatible(
            "q overlap holds no grid point".to_string(),
        ));
    }
    let base = first.slice(lo, hi);
    warn!(
        "q-grids differ, interpolating {} curves onto {} shared points",
        layers.len(),
        base.len()
    );
    Ok(layers
        .iter()
        .enumerate()
        .map(|(k, l)| if k == 0 { base.clone() } else { resample(l, &base.q) })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn layer(q: Vec<f64>) -> Layer {
        let n = q.len();
        let i = q.iter().map(|v| 2.0 * v).collect();
        Layer::new(q, i, vec![0.5; n]).unwrap()
    }

    #[test]
    fn test_overlap() {
        assert_eq!(overlap(&[0.0, 1.0], &[0.5, 2.0]), Some((0.5, 1.0)));
        assert_eq!(overlap(&[0.0, 1.0], &[1.5, 2.0]), None);
        assert_eq!(overlap(&[], &[1.5, 2.0]), None);
    }

    #[test]
    fn test_window_in() {
        let q = [0.1, 0.2, 0.3, 0.4, 0.5];
        assert_eq!(window_in(&q, 0.2, 0.4), (1, 4));
        assert_eq!(window_in(&q, 0.6, 0.7), (5, 5));
    }

    #[test]
    fn test_reconcile_identical() {
        let a = layer(vec![0.1, 0.2, 0.3]);
        let (x, y) = reconcile_pair(&a, &a, false).unwrap();
        assert_eq!(x, a);
        assert_eq!(y, a);
    }

    #[test]
    fn test_reconcile_requires_force() {
        let a = layer(vec![0.1, 0.2, 0.3]);
        let b = layer(vec![0.15, 0.25, 0.35]);
        assert!(matches!(
            reconcile_pair(&a, &b, false),
            Err(SaxsError::DataNotCompatible(_))
        ));
    }

    #[test]
    fn test_reconcile_shared_subgrid() {
        let a = layer(vec![0.1, 0.2, 0.3, 0.4]);
        let b = layer(vec![0.2, 0.3, 0.4, 0.5, 0.6]);
        let (x, y) = reconcile_pair(&a, &b, true).unwrap();
        assert_eq!(x.q, vec![0.2, 0.3, 0.4]);
        assert_eq!(y.q, vec![0.2, 0.3, 0.4]);
    }

    #[test]
    fn test_reconcile_resamples_on_finer_spacing() {
        let a = layer(vec![0.0, 0.1, 0.2, 0.3, 0.4]);
        let b = layer(vec![0.05, 0.25, 0.35]);
        let (x, y) = reconcile_pair(&a, &b, true).unwrap();
        assert_eq!(x.len(), 4);
        assert_relative_eq!(x.q[0], 0.05);
        assert_relative_eq!(x.q[3], 0.35);
        assert_eq!(x.q, y.q);
        // Both inputs are the same line, so resampled intensities agree.
        for k in 0..4 {
            assert_relative_eq!(x.i[k], y.i[k], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_reconcile_disjoint() {
        let a = layer(vec![0.1, 0.2]);
        let b = layer(vec![0.3, 0.4]);
        assert!(reconcile_pair(&a, &b, true).is_err());
    }
}
