//! Numeric building blocks: streaming statistics, robust window statistics,
//! least-squares lines, interpolation and integration.

use std::cmp::Ordering;

/// Decimal places used when comparing q-grids.
pub const GRID_DECIMALS: i32 = 5;

/// Single-pass mean/variance accumulator (Welford).
///
/// Holds the running count, mean and sum of squared deviations, so an
/// arbitrary number of samples can be absorbed without storing them.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RunningStats {
    count: usize,
    mean: f64,
    m2: f64,
}

impl RunningStats {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Absorb one sample.
    #[inline]
    pub fn push(&mut self, x: f64) {
        self.count += 1;
        let delta = x - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (x - self.mean);
    }

    /// Swap a previously absorbed sample for another value.
    ///
    /// Used when an outlier already counted is corrected after the fact. Has
    /// no effect on an empty accumulator.
    pub fn replace(&mut self, old: f64, new: f64) {
        if self.count == 0 {
            return;
        }
        let d = new - old;
        let prev_mean = self.mean;
        self.mean += d / self.count as f64;
        self.m2 += d * (new - self.mean + old - prev_mean);
        if self.m2 < 0.0 {
            self.m2 = 0.0;
        }
    }

    /// Fold another partial state into this one (Chan et al. pairwise update).
    pub fn merge(&mut self, other: &RunningStats) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = *other;
            return;
        }
        let n = (self.count + other.count) as f64;
        let delta = other.mean - self.mean;
        self.mean += delta * other.count as f64 / n;
        self.m2 += other.m2 + delta * delta * self.count as f64 * other.count as f64 / n;
        self.count += other.count;
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Population variance, zero when empty.
    pub fn variance(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.m2 / self.count as f64
        }
    }

    pub fn std(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Standard error of the mean, zero when empty.
    pub fn std_err(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.std() / (self.count as f64).sqrt()
        }
    }
}

/// Median of a slice (NaN-tolerant ordering). Returns NaN when empty.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        0.5 * (sorted[mid - 1] + sorted[mid])
    } else {
        sorted[mid]
    }
}

/// Arithmetic mean. Returns NaN when empty.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation. Returns NaN when empty.
pub fn std_dev(values: &[f64]) -> f64 {
    let m = mean(values);
    let var = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

/// Round to `decimals` places.
#[inline]
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Compare two q-grids after rounding every value to [`GRID_DECIMALS`].
pub fn grids_match(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len()
        && a
            .iter()
            .zip(b)
            .all(|(x, y)| round_to(*x, GRID_DECIMALS) == round_to(*y, GRID_DECIMALS))
}

/// `n` evenly spaced values from `start` to `end` inclusive.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n).map(|k| start + step * k as f64).collect()
        }
    }
}

/// `n` values spaced evenly on a log10 scale from `10^start` to `10^end`.
pub fn logspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    linspace(start, end, n)
        .into_iter()
        .map(|e| 10f64.powf(e))
        .collect()
}

/// Piecewise-linear interpolation of `(xs, ys)` at `x`.
///
/// `xs` must be ascending. Values outside the sampled span clamp to the
/// nearest end point.
pub fn interp(x: f64, xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len().min(ys.len());
    if n == 0 {
        return f64::NAN;
    }
    if x <= xs[0] {
        return ys[0];
    }
    if x >= xs[n - 1] {
        return ys[n - 1];
    }
    // First index with xs[idx] > x; x lies in [xs[idx-1], xs[idx]).
    let idx = xs[..n].partition_point(|v| v.partial_cmp(&x) != Some(Ordering::Greater));
    let (x0, x1) = (xs[idx - 1], xs[idx]);
    let (y0, y1) = (ys[idx - 1], ys[idx]);
    if x1 == x0 {
        return y0;
    }
    y0 + (y1 - y0) * (x - x0) / (x1 - x0)
}

/// Integrate sampled `y(x)` with Simpson's rule for uneven spacing.
///
/// An odd number of intervals closes with one trapezoid.
pub fn simpson(y: &[f64], x: &[f64]) -> f64 {
    let n = y.len().min(x.len());
    if n < 2 {
        return 0.0;
    }
    let mut total = 0.0;
    let mut i = 0;
    while i + 2 < n {
        let h0 = x[i + 1] - x[i];
        let h1 = x[i + 2] - x[i + 1];
        let hsum = h0 + h1;
        if h0 == 0.0 || h1 == 0.0 {
            total += 0.5 * h0 * (y[i] + y[i + 1]) + 0.5 * h1 * (y[i + 1] + y[i + 2]);
        } else {
            total += hsum / 6.0
                * (y[i] * (2.0 - h1 / h0)
                    + y[i + 1] * hsum * hsum / (h0 * h1)
                    + y[i + 2] * (2.0 - h0 / h1));
        }
        i += 2;
    }
    if i + 1 < n {
        total += 0.5 * (x[i + 1] - x[i]) * (y[i] + y[i + 1]);
    }
    total
}

/// Ordinary least-squares line `y = intercept + slope * x` with parameter
/// variances scaled by the residual variance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinearFit {
    pub intercept: f64,
    pub slope: f64,
    pub intercept_var: f64,
    pub slope_var: f64,
    pub r_squared: f64,
    /// Sum of squared residuals.
    pub sse: f64,
    pub n: usize,
}

/// Fit a straight line, skipping pairs where either value is not finite.
///
/// Returns `None` with fewer than three usable points or a degenerate x.
pub fn linear_fit(x: &[f64], y: &[f64]) -> Option<LinearFit> {
    let pairs: Vec<(f64, f64)> = x
        .iter()
        .zip(y)
        .filter(|(a, b)| a.is_finite() && b.is_finite())
        .map(|(a, b)| (*a, *b))
        .collect();
    let n = pairs.len();
    if n < 3 {
        return None;
    }
    let nf = n as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / nf;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / nf;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    let mut syy = 0.0;
    let mut sum_x2 = 0.0;
    for (a, b) in &pairs {
        let dx = a - mean_x;
        let dy = b - mean_y;
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
        sum_x2 += a * a;
    }
    if sxx <= 0.0 {
        return None;
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;
    let sse = pairs
        .iter()
        .map(|(a, b)| {
            let r = b - (intercept + slope * a);
            r * r
        })
        .sum::<f64>();
    let s2 = sse / (nf - 2.0);
    let r_squared = if syy > 0.0 { 1.0 - sse / syy } else { 1.0 };

    Some(LinearFit {
        intercept,
        slope,
        intercept_var: s2 * sum_x2 / (nf * sxx),
        slope_var: s2 / sxx,
        r_squared,
        sse,
        n,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_running_stats_matches_two_pass() {
        let data = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let mut stats = RunningStats::new();
        for v in data {
            stats.push(v);
        }
        assert_eq!(stats.count(), 8);
        assert_relative_eq!(stats.mean(), 5.0);
        assert_relative_eq!(stats.std(), 2.0);
        assert_relative_eq!(stats.std_err(), 2.0 / 8f64.sqrt());
    }

    #[test]
    fn test_running_stats_merge() {
        let data: Vec<f64> = (0..100).map(|k| (k as f64 * 0.37).sin() * 10.0).collect();
        let mut whole = RunningStats::new();
        data.iter().for_each(|v| whole.push(*v));

        let mut left = RunningStats::new();
        let mut right = RunningStats::new();
        data[..37].iter().for_each(|v| left.push(*v));
        data[37..].iter().for_each(|v| right.push(*v));
        left.merge(&right);

        assert_eq!(left.count(), whole.count());
        assert_relative_eq!(left.mean(), whole.mean(), epsilon = 1e-12);
        assert_relative_eq!(left.variance(), whole.variance(), epsilon = 1e-10);
    }

    #[test]
    fn test_running_stats_replace() {
        let mut stats = RunningStats::new();
        for v in [1.0, 2.0, 100.0, 4.0] {
            stats.push(v);
        }
        stats.replace(100.0, 3.0);

        let mut expected = RunningStats::new();
        for v in [1.0, 2.0, 3.0, 4.0] {
            expected.push(v);
        }
        assert_relative_eq!(stats.mean(), expected.mean(), epsilon = 1e-12);
        assert_relative_eq!(stats.variance(), expected.variance(), epsilon = 1e-10);
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
        assert!(median(&[]).is_nan());
    }

    #[test]
    fn test_interp_inside_and_clamped() {
        let xs = [0.0, 1.0, 2.0];
        let ys = [0.0, 10.0, 30.0];
        assert_relative_eq!(interp(0.5, &xs, &ys), 5.0);
        assert_relative_eq!(interp(1.5, &xs, &ys), 20.0);
        assert_relative_eq!(interp(1.0, &xs, &ys), 10.0);
        assert_eq!(interp(-1.0, &xs, &ys), 0.0);
        assert_eq!(interp(5.0, &xs, &ys), 30.0);
    }

    #[test]
    fn test_grids_match_rounding() {
        assert!(grids_match(&[0.1, 0.2], &[0.100001, 0.2000004]));
        assert!(!grids_match(&[0.1, 0.2], &[0.1, 0.21]));
        assert!(!grids_match(&[0.1], &[0.1, 0.2]));
    }

    #[test]
    fn test_linspace_logspace() {
        assert_eq!(linspace(0.0, 1.0, 5), vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        let l = logspace(1.0, 3.0, 3);
        assert_relative_eq!(l[0], 10.0);
        assert_relative_eq!(l[2], 1000.0, epsilon = 1e-9);
    }

    #[test]
    fn test_simpson_polynomial() {
        let x = linspace(0.0, 2.0, 21);
        let y: Vec<f64> = x.iter().map(|v| v * v).collect();
        assert_relative_eq!(simpson(&y, &x), 8.0 / 3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_linear_fit_exact_line() {
        let x: Vec<f64> = (0..10).map(|k| k as f64).collect();
        let y: Vec<f64> = x.iter().map(|v| 3.0 - 0.5 * v).collect();
        let fit = linear_fit(&x, &y).unwrap();
        assert_relative_eq!(fit.slope, -0.5, epsilon = 1e-12);
        assert_relative_eq!(fit.intercept, 3.0, epsilon = 1e-12);
        assert_relative_eq!(fit.r_squared, 1.0, epsilon = 1e-12);
        assert!(fit.slope_var < 1e-20);
    }

    #[test]
    fn test_linear_fit_skips_non_finite() {
        let x = [0.0, 1.0, 2.0, 3.0, 4.0];
        let y = [1.0, f64::NAN, 5.0, f64::INFINITY, 9.0];
        let fit = linear_fit(&x, &y).unwrap();
        assert_eq!(fit.n, 3);
        assert_relative_eq!(fit.slope, 2.0, epsilon = 1e-12);
        assert!(linear_fit(&[0.0, 1.0], &[1.0, 2.0]).is_none());
    }
}
