//! Background subtraction.

use super::grid::reconcile_pair;
use crate::data::{Curve, Layer, Operation};
use crate::error::Result;

/// Subtract `buffer` from `sample` over their selected ranges.
///
/// Errors add in quadrature. Curves on different q-grids are rejected with
/// `DataNotCompatible` unless `forced`, in which case they are cut or
/// resampled onto a common grid first.
pub fn subtract(sample: &Curve, buffer: &Curve, forced: bool) -> Result<Curve> {
    let (a, b) = reconcile_pair(&sample.selected_layer(), &buffer.selected_layer(), forced)?;
    let layer = Layer {
        i: a.i.iter().zip(&b.i).map(|(x, y)| x - y).collect(),
        err: a
            .err
            .iter()
            .zip(&b.err)
            .map(|(x, y)| (x * x + y * y).sqrt())
            .collect(),
        q: a.q,
    };
    Ok(Curve::derived(
        format!("S_{}", sample.label()),
        layer,
        Operation::Subtract,
        &[sample, buffer],
    ))
}
