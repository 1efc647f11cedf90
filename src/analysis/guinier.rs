//! Automatic Guinier range search.
//!
//! The search fits `ln I = a + b q^2` over a sampled grid of windows in the
//! low-q region, rejects fits that break the Guinier approximation and ranks
//! the rest on a weighted set of normalized criteria. The reported radius of
//! gyration and forward intensity are averaged over every candidate whose
//! score lies close to the best one.

use log::{debug, info};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::data::stats::{linear_fit, mean, std_dev};
use crate::data::Curve;

/// Thresholds and weights of the Guinier search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuinierConfig {
    /// Smallest window, in points.
    pub min_window: usize,
    /// The window size grid steps by `range / window_divisions`.
    pub window_divisions: usize,
    /// The window start grid steps by `range / start_divisions`.
    pub start_divisions: usize,
    pub max_qmin_rg: f64,
    pub max_qmax_rg: f64,
    /// `qmax * Rg` value that scores best.
    pub target_qmax_rg: f64,
    pub min_rg: f64,
    pub max_rg_rel_err: f64,
    pub min_r_squared: f64,
    /// Best score must exceed this for a result to be reported.
    pub quality_threshold: f64,
    /// Candidates within this distance of the best score are averaged.
    pub cluster_width: f64,
    /// Weights of the criteria, in order: qmax*Rg closeness, qmin*Rg,
    /// Rg relative error, I0 relative error, R^2, reduced chi^2, window size.
    pub weights: [f64; 7],
}

impl Default for GuinierConfig {
    fn default() -> Self {
        Self {
            min_window: 10,
            window_divisions: 10,
            start_divisions: 50,
            max_qmin_rg: 1.0,
            max_qmax_rg: 1.35,
            target_qmax_rg: 1.3,
            min_rg: 0.1,
            max_rg_rel_err: 1.0,
            min_r_squared: 0.15,
            quality_threshold: 0.6,
            cluster_width: 0.1,
            weights: [1.0, 1.0, 1.0, 1.0, 4.0, 0.0, 4.0],
        }
    }
}

/// Result of a Guinier search.
///
/// `rg == -1` (with every other field also `-1`) means no reliable Guinier
/// region was found; check [`GuinierFit::is_valid`] before using the values.
/// Indices refer to the curve's binned points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GuinierFit {
    pub rg: f64,
    pub rg_err: f64,
    pub i0: f64,
    pub i0_err: f64,
    pub q_index_min: i64,
    pub q_index_max: i64,
    pub quality: f64,
}

impl GuinierFit {
    /// The "no Guinier region" sentinel.
    pub fn not_found() -> Self {
        Self {
            rg: -1.0,
            rg_err: -1.0,
            i0: -1.0,
            i0_err: -1.0,
            q_index_min: -1,
            q_index_max: -1,
            quality: -1.0,
        }
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.rg > 0.0
    }
}

/// One accepted window.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    start: usize,
    window: usize,
    rg: f64,
    rg_err: f64,
    i0: f64,
    i0_err: f64,
    r_squared: f64,
    reduced_chi2: f64,
}

/// Brute-force search for the best Guinier window of a curve.
#[derive(Debug, Clone, Default)]
pub struct GuinierRangeFinder {
    config: GuinierConfig,
}

impl GuinierRangeFinder {
    pub fn new(config: GuinierConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::default()
    }

    pub fn config(&self) -> &GuinierConfig {
        &self.config
    }

    /// Search the selected range of `curve`.
    pub fn find(&self, curve: &Curve) -> GuinierFit {
        let (q, i, err) = (curve.q(), curve.i(), curve.err());
        if i.is_empty() {
            return GuinierFit::not_found();
        }
        let offset = curve.selected_range().0;

        let cutoff = i[0] / 10.0;
        let data_end = i.iter().position(|v| *v < cutoff).unwrap_or(i.len());
        let range = data_end;
        if range < self.config.min_window.max(3) {
            debug!("{}: {} points before the intensity cutoff", curve.label(), range);
            return GuinierFit::not_found();
        }

        let (largest, jobs) = self.search_grid(range);
        let largest = largest as f64;

        let candidates: Vec<Candidate> = jobs
            .par_iter()
            .filter_map(|&(w, s)| self.evaluate(&q[s..s + w], &i[s..s + w], &err[s..s + w], s))
            .collect();

        let scored: Vec<(f64, Candidate)> = candidates
            .into_iter()
            .map(|c| (self.score(&c, q, largest), c))
            .collect();

        let Some(&(best_score, best)) = scored
            .iter()
            .fold(None, |acc: Option<&(f64, Candidate)>, item| match acc {
                Some(current) if current.0 >= item.0 => Some(current),
                _ => Some(item),
            })
        else {
            info!("{}: no window passed the Guinier criteria", curve.label());
            return GuinierFit::not_found();
        };

        if best_score <= self.config.quality_threshold {
            info!(
                "{}: best Guinier score {:.3} is below {}",
                curve.label(),
                best_score,
                self.config.quality_threshold
            );
            return GuinierFit::not_found();
        }

        let cluster: Vec<&Candidate> = scored
            .iter()
            .filter(|(score, _)| *score > best_score - self.config.cluster_width)
            .map(|(_, c)| c)
            .collect();
        let rgs: Vec<f64> = cluster.iter().map(|c| c.rg).collect();
        let i0s: Vec<f64> = cluster.iter().map(|c| c.i0).collect();
        let (rg_err, i0_err) = if cluster.len() > 1 {
            (std_dev(&rgs), std_dev(&i0s))
        } else {
            (best.rg_err, best.i0_err)
        };

        let fit = GuinierFit {
            rg: mean(&rgs),
            rg_err,
            i0: mean(&i0s),
            i0_err,
            q_index_min: (offset + best.start) as i64,
            q_index_max: (offset + best.start + best.window - 1) as i64,
            quality: best_score,
        };
        info!(
            "{}: Rg {:.4} +- {:.4}, I0 {:.4e}, points {}..={}, quality {:.3} ({} of {} candidates averaged)",
            curve.label(),
            fit.rg,
            fit.rg_err,
            fit.i0,
            fit.q_index_min,
            fit.q_index_max,
            fit.quality,
            cluster.len(),
            scored.len()
        );
        fit
    }

    /// Sampled `(window, start)` pairs over the first `range` points, plus
    /// the largest window size tried.
    ///
    /// Window sizes run from `min_window` in steps of `range / window_divisions`
    /// for as long as they stay below `range + step`, so the last size may
    /// exceed `range`; that size still normalizes the window-size score.
    /// Starts run over `0..range - window` (exclusive), so a window never
    /// reaches the cutoff point itself.
    fn search_grid(&self, range: usize) -> (usize, Vec<(usize, usize)>) {
        let min_window = self.config.min_window.max(3);
        let window_step = (range / self.config.window_divisions.max(1)).max(1);
        let start_step = (range / self.config.start_divisions.max(1)).max(1);
        let windows: Vec<usize> = (min_window..range + window_step).step_by(window_step).collect();
        let largest = windows.last().copied().unwrap_or(range);

        let jobs = windows
            .iter()
            .flat_map(|&w| (0..range.saturating_sub(w)).step_by(start_step).map(move |s| (w, s)))
            .collect();
        (largest, jobs)
    }

    /// Fit one window and apply the acceptance rules.
    fn evaluate(&self, q: &[f64], i: &[f64], err: &[f64], start: usize) -> Option<Candidate> {
        let cfg = &self.config;
        let q2: Vec<f64> = q.iter().map(|v| v * v).collect();
        let ln_i: Vec<f64> = i.iter().map(|v| v.ln()).collect();
        let fit = linear_fit(&q2, &ln_i)?;

        if fit.slope >= 0.0 {
            return None;
        }
        let rg = (-3.0 * fit.slope).sqrt();
        let (q_min, q_max) = (q[0], q[q.len() - 1]);
        if rg <= cfg.min_rg || q_min * rg >= cfg.max_qmin_rg || q_max * rg >= cfg.max_qmax_rg {
            return None;
        }
        let rg_err = (0.5 * (-3.0 / fit.slope).sqrt()).abs() * fit.slope_var.sqrt();
        if !(rg_err / rg <= cfg.max_rg_rel_err) || fit.r_squared <= cfg.min_r_squared {
            return None;
        }
        let i0 = fit.intercept.exp();
        let i0_err = i0 * fit.intercept_var.sqrt();

        // Errors on ln I are E / I.
        let chi2: f64 = q2
            .iter()
            .zip(&ln_i)
            .zip(i.iter().zip(err))
            .filter(|((x, y), _)| x.is_finite() && y.is_finite())
            .map(|((x, y), (iv, ev))| {
                let sigma = ev / iv;
                let r = (y - (fit.intercept + fit.slope * x)) / sigma;
                r * r
            })
            .sum();
        let reduced_chi2 = chi2 / (fit.n as f64 - 2.0);

        Some(Candidate {
            start,
            window: q.len(),
            rg,
            rg_err,
            i0,
            i0_err,
            r_squared: fit.r_squared,
            reduced_chi2,
        })
    }

    /// Weighted mean of the normalized criteria. Zero-weight terms are skipped.
    fn score(&self, c: &Candidate, q: &[f64], largest_window: f64) -> f64 {
        let cfg = &self.config;
        let q_min_rg = q[c.start] * c.rg;
        let q_max_rg = q[c.start + c.window - 1] * c.rg;
        let criteria = [
            1.0 - (q_max_rg - cfg.target_qmax_rg).abs() / cfg.target_qmax_rg,
            1.0 - q_min_rg,
            1.0 - c.rg_err / c.rg,
            1.0 - c.i0_err / c.i0,
            c.r_squared,
            1.0 / c.reduced_chi2,
            c.window as f64 / largest_window,
        ];

        let mut total = 0.0;
        let mut weight = 0.0;
        for (value, w) in criteria.iter().zip(&cfg.weights) {
            if *w == 0.0 {
                continue;
            }
            total += w * value;
            weight += w;
        }
        if weight == 0.0 {
            0.0
        } else {
            total / weight
        }
    }
}
