//! Zinger rejection on per-ring sample streams.
//!
//! Every ring keeps a circular buffer of its most recent samples. Once the
//! buffer is full, the sample in the middle of the window is compared with
//! `median + k * std` of the window and replaced by the median when above
//! it; the ring's running statistics are corrected in place. The first full
//! window also tests its older half, and `finish` tests the newest half of
//! the last one, so every sample of a ring holding at least one window is
//! checked.

use crate::data::stats::{median, std_dev, RunningStats};

/// Fixed-capacity circular buffer of the latest samples of one ring.
#[derive(Clone, Debug)]
pub struct RingWindow {
    buf: Vec<f64>,
    head: usize,
    capacity: usize,
}

impl RingWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
            head: 0,
            capacity,
        }
    }

    /// Push a sample, evicting the oldest when full.
    #[inline]
    pub fn push(&mut self, value: f64) {
        if self.buf.len() < self.capacity {
            self.buf.push(value);
        } else {
            self.buf[self.head] = value;
        }
        self.head = (self.head + 1) % self.capacity;
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.buf.len() == self.capacity
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Sample pushed `age` pushes ago (0 is the newest).
    pub fn get(&self, age: usize) -> f64 {
        self.buf[self.slot(age)]
    }

    pub fn set(&mut self, age: usize, value: f64) {
        let slot = self.slot(age);
        self.buf[slot] = value;
    }

    /// Buffered samples in storage order.
    pub fn values(&self) -> &[f64] {
        &self.buf
    }

    fn slot(&self, age: usize) -> usize {
        let len = self.buf.len();
        (self.head + len * 2 - 1 - age) % len
    }
}

/// Zinger detector state for all rings of one reduction.
pub(crate) struct Dezinger {
    windows: Vec<RingWindow>,
    sensitivity: f64,
    window: usize,
    replaced: usize,
}

impl Dezinger {
    pub(crate) fn new(n_rings: usize, window: usize, sensitivity: f64) -> Self {
        Self {
            windows: (0..n_rings).map(|_| RingWindow::new(window)).collect(),
            sensitivity,
            window,
            replaced: 0,
        }
    }

    /// Age of the sample sitting in the middle of a full window.
    #[inline]
    fn mid_age(&self) -> usize {
        self.window - 1 - self.window / 2
    }

    /// Record a sample already pushed into `stats` and test the mid-window one.
    ///
    /// When the window first fills, the samples older than the mid-window
    /// position are tested too, since no later window centres on them.
    pub(crate) fn observe(&mut self, ring: usize, value: f64, stats: &mut RunningStats) {
        self.windows[ring].push(value);
        let mid = self.mid_age();
        if stats.count() == self.window {
            for age in (mid + 1..self.window).rev() {
                self.test(ring, age, stats);
            }
        }
        if stats.count() >= self.window {
            self.test(ring, mid, stats);
        }
    }

    /// Test the samples newer than the mid-window position, which the
    /// streaming pass never reached.
    pub(crate) fn finish(&mut self, rings: &mut [RunningStats]) {
        let mid = self.mid_age();
        for (ring, stats) in rings.iter_mut().enumerate() {
            if ring >= self.windows.len() || stats.count() < self.window {
                continue;
            }
            for age in (0..mid).rev() {
                self.test(ring, age, stats);
            }
        }
    }

    pub(crate) fn replaced(&self) -> usize {
        self.replaced
    }

    fn test(&mut self, ring: usize, age: usize, stats: &mut RunningStats) {
        let window = &mut self.windows[ring];
        let values = window.values();
        let med = median(values);
        let threshold = med + self.sensitivity * std_dev(values);
        let candidate = window.get(age);
        if candidate > threshold {
            window.set(age, med);
            stats.replace(candidate, med);
            self.replaced += 1;
        }
    }
}
