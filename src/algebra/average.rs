//! Plain and weighted averaging of curves.

use serde::{Deserialize, Serialize};

use super::grid::reconcile_all;
use crate::data::{Curve, Layer, Operation};
use crate::error::{Result, SaxsError};
use crate::reduce::ERROR_SENTINEL;

/// Source of the weights used by [`weighted_average`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightConfig {
    /// Weight every point by `1 / E^2`. Takes precedence over `counter`.
    pub by_error: bool,
    /// Weight every curve by the named counter.
    pub counter: Option<String>,
}

impl WeightConfig {
    pub fn by_error() -> Self {
        Self {
            by_error: true,
            counter: None,
        }
    }

    pub fn by_counter(name: impl Into<String>) -> Self {
        Self {
            by_error: false,
            counter: Some(name.into()),
        }
    }
}

/// Pointwise mean of several curves.
///
/// `I = mean(I_k)`, `E = sqrt(sum E_k^2) / N`. Grids must match unless
/// `forced`.
pub fn average(curves: &[&Curve], forced: bool) -> Result<Curve> {
    let layers = reconcile_all(curves, forced)?;
    let n = layers.len() as f64;
    let len = layers[0].len();

    let mut out = Layer {
        q: layers[0].q.clone(),
        i: vec![0.0; len],
        err: vec![0.0; len],
    };
    for layer in &layers {
        for k in 0..len {
            out.i[k] += layer.i[k];
            out.err[k] += layer.err[k] * layer.err[k];
        }
    }
    for k in 0..len {
        out.i[k] /= n;
        out.err[k] = out.err[k].sqrt() / n;
    }

    Ok(Curve::derived(
        format!("A_{}", curves[0].label()),
        out,
        Operation::Average,
        curves,
    ))
}

/// Weighted pointwise mean.
///
/// With error weighting, `w = 1 / E^2`, `E_avg = 1 / sqrt(sum w)`. With a
/// counter, each curve's weight is its counter value and errors propagate
/// as `sqrt(sum w^2 E^2) / sum w`.
pub fn weighted_average(curves: &[&Curve], weights: &WeightConfig, forced: bool) -> Result<Curve> {
    if !weights.by_error && weights.counter.is_none() {
        return Err(SaxsError::NoWeighting);
    }
    let layers = reconcile_all(curves, forced)?;
    let len = layers[0].len();
    let mut out = Layer {
        q: layers[0].q.clone(),
        i: vec![0.0; len],
        err: vec![0.0; len],
    };

    if weights.by_error {
        let mut weight_sum = vec![0.0; len];
        for layer in &layers {
            for k in 0..len {
                let e = if layer.err[k] > 0.0 {
                    layer.err[k]
                } else {
                    ERROR_SENTINEL
                };
                let w = 1.0 / (e * e);
                out.i[k] += w * layer.i[k];
                weight_sum[k] += w;
            }
        }
        for k in 0..len {
            out.i[k] /= weight_sum[k];
            out.err[k] = 1.0 / weight_sum[k].sqrt();
        }
    } else if let Some(name) = &weights.counter {
        let mut counter_weights = Vec::with_capacity(curves.len());
        for curve in curves {
            let w = curve.counter(name).ok_or_else(|| SaxsError::MissingCounter {
                label: curve.label().to_string(),
                counter: name.clone(),
            })?;
            counter_weights.push(w);
        }
        let total: f64 = counter_weights.iter().sum();
        if total == 0.0 || !total.is_finite() {
            return Err(SaxsError::invalid(
                "counter",
                format!("weights of `{}` sum to {}", name, total),
            ));
        }
        for (layer, w) in layers.iter().zip(&counter_weights) {
            for k in 0..len {
                out.i[k] += w * layer.i[k];
                out.err[k] += w * w * layer.err[k] * layer.err[k];
            }
        }
        for k in 0..len {
            out.i[k] /= total;
            out.err[k] = out.err[k].sqrt() / total;
        }
    }

    Ok(Curve::derived(
        format!("W_{}", curves[0].label()),
        out,
        Operation::WeightedAverage,
        curves,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn curve(label: &str, level: f64, err: f64) -> Curve {
        let q = vec![0.01, 0.02, 0.03, 0.04];
        let i = q.iter().map(|v| level - v).collect();
        Curve::new(label, q, i, vec![err; 4]).unwrap()
    }

    #[test]
    fn test_average_self() {
        let a = curve("a", 10.0, 0.4);
        let avg = average(&[&a, &a], false).unwrap();
        for k in 0..4 {
            assert_relative_eq!(avg.i()[k], a.i()[k]);
            assert_relative_eq!(avg.err()[k], a.err()[k] / 2f64.sqrt(), epsilon = 1e-12);
        }
        assert_eq!(avg.label(), "A_a");
    }

    #[test]
    fn test_average_empty_list() {
        assert!(matches!(average(&[], false), Err(SaxsError::EmptyCurveList)));
    }

    #[test]
    fn test_average_grid_mismatch() {
        let a = curve("a", 10.0, 0.4);
        let b = Curve::new(
            "b",
            vec![0.015, 0.025, 0.035],
            vec![8.0, 8.0, 8.0],
            vec![0.4; 3],
        )
        .unwrap();
        assert!(matches!(
            average(&[&a, &b], false),
            Err(SaxsError::DataNotCompatible(_))
        ));

        let forced = average(&[&a, &b], true).unwrap();
        // First curve is cut to the shared span [0.015, 0.035].
        assert_eq!(forced.q(), &[0.02, 0.03]);
        assert_relative_eq!(forced.i()[0], (a.i()[1] + 8.0) / 2.0);
    }

    #[test]
    fn test_weighted_by_error() {
        let a = curve("a", 10.0, 1.0);
        let b = curve("b", 20.0, 2.0);
        let w = weighted_average(&[&a, &b], &WeightConfig::by_error(), false).unwrap();
        // Weights 1 and 1/4.
        let expected = (a.i()[0] + 0.25 * b.i()[0]) / 1.25;
        assert_relative_eq!(w.i()[0], expected, epsilon = 1e-12);
        assert_relative_eq!(w.err()[0], 1.0 / 1.25f64.sqrt(), epsilon = 1e-12);
        assert_eq!(w.provenance().last_operation(), Some(Operation::WeightedAverage));
    }

    #[test]
    fn test_weighted_by_counter() {
        let mut a = curve("a", 10.0, 1.0);
        let mut b = curve("b", 20.0, 1.0);
        a.set_counter("I1", 3.0);
        b.set_counter("I1", 1.0);
        let w = weighted_average(&[&a, &b], &WeightConfig::by_counter("I1"), false).unwrap();
        assert_relative_eq!(w.i()[0], (3.0 * a.i()[0] + b.i()[0]) / 4.0, epsilon = 1e-12);
        assert_relative_eq!(w.err()[0], 10f64.sqrt() / 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_weighted_requires_source() {
        let a = curve("a", 10.0, 1.0);
        assert!(matches!(
            weighted_average(&[&a], &WeightConfig::default(), false),
            Err(SaxsError::NoWeighting)
        ));
        assert!(matches!(
            weighted_average(&[&a], &WeightConfig::by_counter("I1"), false),
            Err(SaxsError::MissingCounter { .. })
        ));
    }
}
