//! Stitching curves that cover adjacent q-ranges.

use crate::data::stats::interp;
use crate::data::{Curve, Layer, Operation};
use crate::error::{Result, SaxsError};

/// Merge `primary` with `others` into one curve spanning all of them.
///
/// Curves are ordered by their lowest q and stitched pairwise: disjoint
/// ranges concatenate; where they overlap, the later curve is interpolated
/// onto the earlier curve's points, the two are averaged, and the later
/// curve continues past the end of the earlier one.
pub fn merge(primary: &Curve, others: &[&Curve]) -> Result<Curve> {
    let mut inputs: Vec<&Curve> = Vec::with_capacity(others.len() + 1);
    inputs.push(primary);
    inputs.extend_from_slice(others);

    let mut layers: Vec<Layer> = inputs.iter().map(|c| c.selected_layer()).collect();
    if let Some(curve) = inputs.iter().zip(&layers).find(|(_, l)| l.is_empty()) {
        return Err(SaxsError::DataNotCompatible(format!(
            "`{}` has an empty q-range",
            curve.0.label()
        )));
    }
    layers.sort_by(|a, b| a.q[0].total_cmp(&b.q[0]));

    let mut layers = layers.into_iter();
    let first = layers.next().ok_or(SaxsError::EmptyCurveList)?;
    let merged = layers.fold(first, |acc, next| stitch(&acc, &next));

    Ok(Curve::derived(
        format!("M_{}", primary.label()),
        merged,
        Operation::Merge,
        &inputs,
    ))
}

/// Join `low` with `high`, where `high` starts at or after `low`'s first q.
fn stitch(low: &Layer, high: &Layer) -> Layer {
    let low_end = low.q[low.len() - 1];
    let high_start = high.q[0];
    let high_end = high.q[high.len() - 1];

    let mut out = Layer {
        q: Vec::with_capacity(low.len() + high.len()),
        i: Vec::with_capacity(low.len() + high.len()),
        err: Vec::with_capacity(low.len() + high.len()),
    };

    for k in 0..low.len() {
        let q = low.q[k];
        out.q.push(q);
        if q >= high_start && q <= high_end {
            let i = interp(q, &high.q, &high.i);
            let e = interp(q, &high.q, &high.err);
            out.i.push(0.5 * (low.i[k] + i));
            out.err.push(0.5 * (low.err[k] * low.err[k] + e * e).sqrt());
        } else {
            out.i.push(low.i[k]);
            out.err.push(low.err[k]);
        }
    }
    for k in 0..high.len() {
        if high.q[k] > low_end {
            out.q.push(high.q[k]);
            out.i.push(high.i[k]);
            out.err.push(high.err[k]);
        }
    }
    out
}
