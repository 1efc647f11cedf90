//! Difference curves against a baseline measurement.

use super::grid::reconcile_pair;
use crate::data::{Curve, Layer, Operation};
use crate::error::{Result, SaxsError};
use crate::reduce::ERROR_SENTINEL;

/// `curve - baseline` over their selected ranges.
///
/// Same arithmetic as [`subtract`](super::subtract), kept as its own
/// operation so the history tells a comparison from a buffer subtraction.
pub fn absolute_difference(curve: &Curve, baseline: &Curve, forced: bool) -> Result<Curve> {
    let (a, b) = reconcile_pair(&curve.selected_layer(), &baseline.selected_layer(), forced)?;
    let layer = Layer {
        i: a.i.iter().zip(&b.i).map(|(x, y)| x - y).collect(),
        err: a.err.iter().zip(&b.err).map(|(x, y)| x.hypot(*y)).collect(),
        q: a.q,
    };
    Ok(Curve::derived(
        format!("D_{}", curve.label()),
        layer,
        Operation::AbsoluteDifference,
        &[curve, baseline],
    ))
}

/// Percent change from `baseline`, `100 * (I - I_base) / I_base`.
///
/// Points where the baseline is zero carry intensity 0 and the error
/// sentinel.
pub fn relative_difference(curve: &Curve, baseline: &Curve, forced: bool) -> Result<Curve> {
    let (a, b) = reconcile_pair(&curve.selected_layer(), &baseline.selected_layer(), forced)?;
    let n = a.len();
    let mut i = Vec::with_capacity(n);
    let mut err = Vec::with_capacity(n);
    for k in 0..n {
        let (x, base) = (a.i[k], b.i[k]);
        let value = 100.0 * (x - base) / base;
        let sigma = 100.0 * a.err[k].hypot(x * b.err[k] / base) / base.abs();
        if value.is_finite() && sigma.is_finite() {
            i.push(value);
            err.push(sigma);
        } else {
            i.push(0.0);
            err.push(ERROR_SENTINEL);
        }
    }
    Ok(Curve::derived(
        format!("R_{}", curve.label()),
        Layer { q: a.q, i, err },
        Operation::RelativeDifference,
        &[curve, baseline],
    ))
}

/// Relative differences of every curve against `curves[baseline]`.
pub fn relative_series(curves: &[&Curve], baseline: usize, forced: bool) -> Result<Vec<Curve>> {
    let base = curves.get(baseline).ok_or(SaxsError::Range {
        start: baseline,
        end: baseline + 1,
        len: curves.len(),
    })?;
    curves
        .iter()
        .map(|c| relative_difference(c, base, forced))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn curve(label: &str, i: Vec<f64>) -> Curve {
        let n = i.len();
        let q = (1..=n).map(|k| 0.01 * k as f64).collect();
        Curve::new(label, q, i, vec![0.5; n]).unwrap()
    }

    #[test]
    fn test_absolute_difference() {
        let a = curve("a", vec![5.0, 7.0, 9.0]);
        let base = curve("base", vec![4.0, 4.0, 4.0]);
        let d = absolute_difference(&a, &base, false).unwrap();

        assert_eq!(d.i(), &[1.0, 3.0, 5.0]);
        assert_relative_eq!(d.err()[0], 0.5 * 2f64.sqrt(), epsilon = 1e-12);
        assert_eq!(d.label(), "D_a");
        assert_eq!(d.provenance().last_operation(), Some(Operation::AbsoluteDifference));
    }

    #[test]
    fn test_relative_difference_percent() {
        let a = curve("a", vec![110.0, 50.0, 200.0]);
        let base = curve("base", vec![100.0, 100.0, 100.0]);
        let r = relative_difference(&a, &base, false).unwrap();

        assert_relative_eq!(r.i()[0], 10.0, epsilon = 1e-12);
        assert_relative_eq!(r.i()[1], -50.0, epsilon = 1e-12);
        assert_relative_eq!(r.i()[2], 100.0, epsilon = 1e-12);
        // 100 / 100 * sqrt(0.5^2 + (1.1 * 0.5)^2)
        assert_relative_eq!(r.err()[0], 0.5f64.hypot(0.55), epsilon = 1e-12);
    }

    #[test]
    fn test_relative_difference_zero_baseline() {
        let a = curve("a", vec![1.0, 2.0]);
        let base = curve("base", vec![0.0, 1.0]);
        let r = relative_difference(&a, &base, false).unwrap();
        assert_eq!(r.i()[0], 0.0);
        assert_eq!(r.err()[0], ERROR_SENTINEL);
        assert_relative_eq!(r.i()[1], 100.0, epsilon = 1e-12);
    }

    #[test]
    fn test_grid_mismatch_needs_forcing() {
        let a = curve("a", vec![1.0, 2.0, 3.0]);
        let other = Curve::new("b", vec![0.015, 0.025, 0.035], vec![1.0; 3], vec![0.1; 3]).unwrap();
        assert!(matches!(
            relative_difference(&a, &other, false),
            Err(SaxsError::DataNotCompatible(_))
        ));
        assert!(absolute_difference(&a, &other, true).is_ok());
    }

    #[test]
    fn test_relative_series_against_first() {
        let a = curve("a", vec![2.0, 2.0]);
        let b = curve("b", vec![3.0, 1.0]);
        let series = relative_series(&[&a, &b], 0, false).unwrap();

        assert_eq!(series.len(), 2);
        assert!(series[0].i().iter().all(|v| *v == 0.0));
        assert_eq!(series[1].i(), &[50.0, -50.0]);
        assert!(matches!(
            relative_series(&[&a, &b], 2, false),
            Err(SaxsError::Range { .. })
        ));
    }
}
