//! Integral shape invariants and molecular weight estimates.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use super::guinier::GuinierFit;
use crate::data::stats::simpson;
use crate::data::Curve;
use crate::error::{Result, SaxsError};

/// Porod invariant `Q = ∫ I q^2 dq` over the selected range.
pub fn porod_invariant(curve: &Curve) -> f64 {
    let integrand: Vec<f64> = curve
        .q()
        .iter()
        .zip(curve.i())
        .map(|(q, i)| i * q * q)
        .collect();
    simpson(&integrand, curve.q())
}

/// Porod volume `2 π^2 I0 / Q`.
pub fn porod_volume(curve: &Curve, i0: f64) -> Result<f64> {
    let invariant = porod_invariant(curve);
    if !(invariant > 0.0) {
        return Err(SaxsError::invalid(
            "curve",
            format!("Porod invariant of `{}` is {}", curve.label(), invariant),
        ));
    }
    Ok(2.0 * PI * PI * i0 / invariant)
}

/// Empirical constants of the volume-of-correlation mass relation
/// `MW = (Qr / B)^A`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MwConfig {
    pub a: f64,
    pub b: f64,
}

impl MwConfig {
    pub fn protein() -> Self {
        Self { a: 1.0, b: 0.1231 }
    }

    pub fn rna() -> Self {
        Self { a: 0.808, b: 0.00934 }
    }
}

impl Default for MwConfig {
    fn default() -> Self {
        Self::protein()
    }
}

/// Molecular weight estimate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VcEstimate {
    /// Volume of correlation `I0 / ∫ q I dq`.
    pub vc: f64,
    /// `Vc^2 / Rg`.
    pub qr: f64,
    /// Molecular weight in kDa.
    pub mw: f64,
}

/// Molecular weight from the volume of correlation.
///
/// Needs a valid Guinier fit for `I0` and `Rg`.
pub fn vc_molecular_weight(curve: &Curve, fit: &GuinierFit, config: &MwConfig) -> Result<VcEstimate> {
    if !fit.is_valid() {
        return Err(SaxsError::invalid("fit", "no Guinier region was found"));
    }
    let integrand: Vec<f64> = curve.q().iter().zip(curve.i()).map(|(q, i)| q * i).collect();
    let area = simpson(&integrand, curve.q());
    if !(area > 0.0) {
        return Err(SaxsError::invalid(
            "curve",
            format!("q*I integral of `{}` is {}", curve.label(), area),
        ));
    }

    let vc = fit.i0 / area;
    let qr = vc * vc / fit.rg;
    let mw = (qr / config.b).powf(config.a) / 1000.0;
    Ok(VcEstimate { vc, qr, mw })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn flat(level: f64) -> Curve {
        let q: Vec<f64> = (0..=100).map(|k| 0.01 * k as f64).collect();
        Curve::new("flat", q, vec![level; 101], vec![0.1; 101]).unwrap()
    }

    fn fit(rg: f64, i0: f64) -> GuinierFit {
        GuinierFit {
            rg,
            rg_err: 0.1,
            i0,
            i0_err: 0.1,
            q_index_min: 0,
            q_index_max: 10,
            quality: 0.9,
        }
    }

    #[test]
    fn test_porod_invariant_of_constant() {
        // ∫_0^1 2 q^2 dq = 2/3
        assert_relative_eq!(porod_invariant(&flat(2.0)), 2.0 / 3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_porod_volume() {
        let v = porod_volume(&flat(2.0), 5.0).unwrap();
        assert_relative_eq!(v, 2.0 * PI * PI * 5.0 * 1.5, epsilon = 1e-6);
        assert!(porod_volume(&flat(0.0), 5.0).is_err());
    }

    #[test]
    fn test_vc_molecular_weight() {
        // ∫_0^1 q dq = 1/2
        let est = vc_molecular_weight(&flat(1.0), &fit(20.0, 10.0), &MwConfig::protein()).unwrap();
        assert_relative_eq!(est.vc, 20.0, epsilon = 1e-9);
        assert_relative_eq!(est.qr, 20.0, epsilon = 1e-9);
        assert_relative_eq!(est.mw, 20.0 / 0.1231 / 1000.0, epsilon = 1e-9);

        let rna = vc_molecular_weight(&flat(1.0), &fit(20.0, 10.0), &MwConfig::rna()).unwrap();
        assert_relative_eq!(rna.mw, (20.0f64 / 0.00934).powf(0.808) / 1000.0, epsilon = 1e-9);
    }

    #[test]
    fn test_vc_needs_valid_fit() {
        assert!(vc_molecular_weight(&flat(1.0), &GuinierFit::not_found(), &MwConfig::default()).is_err());
    }
}
