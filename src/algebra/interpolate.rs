//! Putting one curve onto another curve's q points.

use crate::data::stats::interp;
use crate::data::{Curve, Layer, Operation};
use crate::error::{Result, SaxsError};

/// Linearly interpolate `curve` onto the q points of `reference`.
///
/// `curve` is restricted to the part of its range inside `reference`'s span,
/// widened by one point on each side when available so the interpolation
/// brackets the span edges. Only reference points covered by that restricted
/// range are kept. Error bars are taken from `reference`.
pub fn interpolate_to_fit(reference: &Curve, curve: &Curve) -> Result<Curve> {
    let (q_ref, e_ref) = (reference.q(), reference.err());
    let (q, i) = (curve.q(), curve.i());
    if q_ref.is_empty() || q.len() < 2 {
        return Err(SaxsError::DataNotCompatible(
            "interpolation needs a non-empty reference and two curve points".to_string(),
        ));
    }
    let (ref_lo, ref_hi) = (q_ref[0], q_ref[q_ref.len() - 1]);

    let mut start = q.partition_point(|v| *v < ref_lo);
    let mut end = q.partition_point(|v| *v <= ref_hi);
    start = start.saturating_sub(1);
    end = (end + 1).min(q.len());
    if end <= start + 1 {
        return Err(SaxsError::DataNotCompatible(format!(
            "`{}` does not cover the q-range of `{}`",
            curve.label(),
            reference.label()
        )));
    }
    let (q_sub, i_sub) = (&q[start..end], &i[start..end]);
    let (lo, hi) = (q_sub[0], q_sub[q_sub.len() - 1]);

    let mut out = Layer::default();
    for (k, &qr) in q_ref.iter().enumerate() {
        if qr >= lo && qr <= hi {
            out.q.push(qr);
            out.i.push(interp(qr, q_sub, i_sub));
            out.err.push(e_ref[k]);
        }
    }
    if out.is_empty() {
        return Err(SaxsError::DataNotCompatible(format!(
            "`{}` and `{}` share no q points",
            curve.label(),
            reference.label()
        )));
    }

    Ok(Curve::derived(
        format!("I_{}", curve.label()),
        out,
        Operation::InterpolateToFit,
        &[reference, curve],
    ))
}
