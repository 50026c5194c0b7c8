//! Rolling Window Statistics
//!
//! Fixed-length FIFO window over the spread with incrementally maintained
//! mean and variance (Welford, with a windowed replace step on eviction).
//!
//! Z-Score: z = (value - rolling_mean) / rolling_std
//!
//! The score is 0 until the window is full and whenever the window has no
//! dispersion (std below `MIN_STD`).

use std::collections::VecDeque;

use crate::strategy::params::MIN_STD;

/// Snapshot returned on every update
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RollingStats {
    pub mean: f64,
    /// Population standard deviation of the window
    pub std_dev: f64,
    /// True once `lookback` values have been observed
    pub ready: bool,
}

impl RollingStats {
    /// Standardize `value` against this window; 0 when undefined
    pub fn z_score(&self, value: f64) -> f64 {
        if !self.ready || self.std_dev < MIN_STD {
            return 0.0;
        }
        (value - self.mean) / self.std_dev
    }
}

/// Rolling mean/std estimator over the last `lookback` spreads
#[derive(Debug, Clone)]
pub struct RollingWindow {
    lookback: usize,
    values: VecDeque<f64>,
    mean: f64,
    /// Sum of squared deviations from the mean
    m2: f64,
    /// Evictions since the last exact recomputation
    evictions: usize,
}

impl RollingWindow {
    pub fn new(lookback: usize) -> Self {
        Self {
            lookback,
            values: VecDeque::with_capacity(lookback + 1),
            mean: 0.0,
            m2: 0.0,
            evictions: 0,
        }
    }

    /// Add a spread value, evicting the oldest once full
    pub fn update(&mut self, value: f64) -> RollingStats {
        if self.values.len() < self.lookback {
            self.push(value);
        } else {
            self.replace_oldest(value);
        }
        self.stats()
    }

    fn push(&mut self, value: f64) {
        self.values.push_back(value);
        let n = self.values.len() as f64;
        let delta = value - self.mean;
        self.mean += delta / n;
        self.m2 += delta * (value - self.mean);
    }

    fn replace_oldest(&mut self, value: f64) {
        let Some(oldest) = self.values.pop_front() else {
            return;
        };
        self.values.push_back(value);

        let n = self.lookback as f64;
        let old_mean = self.mean;
        self.mean = old_mean + (value - oldest) / n;
        self.m2 += (value - oldest) * (value - self.mean + oldest - old_mean);
        if self.m2 < 0.0 {
            self.m2 = 0.0;
        }

        // Re-anchor once per full window turnover to bound drift
        self.evictions += 1;
        if self.evictions >= self.lookback {
            self.recompute();
        }
    }

    fn recompute(&mut self) {
        let n = self.values.len() as f64;
        self.mean = self.values.iter().sum::<f64>() / n;
        self.m2 = self.values.iter().map(|v| (v - self.mean).powi(2)).sum();
        self.evictions = 0;
    }

    pub fn stats(&self) -> RollingStats {
        let std_dev = if self.values.is_empty() {
            0.0
        } else {
            (self.m2 / self.values.len() as f64).max(0.0).sqrt()
        };
        RollingStats {
            mean: self.mean,
            std_dev,
            ready: self.is_ready(),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.values.len() >= self.lookback
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn lookback(&self) -> usize {
        self.lookback
    }

    /// Window contents, oldest first
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().copied()
    }

    pub fn reset(&mut self) {
        self.values.clear();
        self.mean = 0.0;
        self.m2 = 0.0;
        self.evictions = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn naive(values: &[f64]) -> (f64, f64) {
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        (mean, var.sqrt())
    }

    #[test]
    fn test_window_creation() {
        let window = RollingWindow::new(10);
        assert_eq!(window.len(), 0);
        assert!(!window.is_ready());
        assert_eq!(window.stats().std_dev, 0.0);
    }

    #[test]
    fn test_not_ready_until_full() {
        let mut window = RollingWindow::new(10);
        for i in 1..=9 {
            let stats = window.update(i as f64);
            assert!(!stats.ready);
            assert_eq!(stats.z_score(100.0), 0.0);
        }
        let stats = window.update(10.0);
        assert!(stats.ready);
        assert!(stats.z_score(10.0) > 0.0);
    }

    #[test]
    fn test_known_mean_and_std() {
        let mut window = RollingWindow::new(10);
        let values = [100.0, 101.0, 102.0, 103.0, 104.0, 106.0, 107.0, 108.0, 109.0, 110.0];
        let mut stats = window.stats();
        for &v in &values {
            stats = window.update(v);
        }
        let (mean, std) = naive(&values);
        assert_relative_eq!(stats.mean, 105.0, epsilon = 1e-9);
        assert_relative_eq!(stats.mean, mean, epsilon = 1e-9);
        assert_relative_eq!(stats.std_dev, std, epsilon = 1e-9);
    }

    #[test]
    fn test_fifo_eviction() {
        let mut window = RollingWindow::new(10);
        for i in 1..=11 {
            window.update(i as f64);
        }
        assert_eq!(window.len(), 10);
        let contents: Vec<f64> = window.values().collect();
        assert_eq!(contents[0], 2.0);
        assert_eq!(*contents.last().unwrap(), 11.0);
        assert_relative_eq!(window.stats().mean, 6.5, epsilon = 1e-9);
    }

    #[test]
    fn test_constant_window_has_zero_std() {
        let mut window = RollingWindow::new(200);
        let mut stats = window.stats();
        for _ in 0..450 {
            stats = window.update(0.035);
        }
        assert!(stats.ready);
        assert!(stats.std_dev < MIN_STD);
        assert_eq!(stats.z_score(0.035), 0.0);
        assert_eq!(stats.z_score(1.0), 0.0);
    }

    #[test]
    fn test_oversold_value_has_negative_z() {
        let mut window = RollingWindow::new(10);
        for _ in 0..9 {
            window.update(100.0);
        }
        let stats = window.update(90.0);
        assert!(stats.z_score(90.0) < 0.0);
    }

    #[test]
    fn test_reset() {
        let mut window = RollingWindow::new(5);
        for i in 0..5 {
            window.update(i as f64);
        }
        assert!(window.is_ready());
        window.reset();
        assert!(window.is_empty());
        assert!(!window.is_ready());
        assert_eq!(window.stats().mean, 0.0);
    }

    proptest! {
        #[test]
        fn prop_matches_naive_window(
            values in prop::collection::vec(-5.0f64..5.0, 1..400),
            lookback in 2usize..50,
        ) {
            let mut window = RollingWindow::new(lookback);
            let mut stats = window.stats();
            for &v in &values {
                stats = window.update(v);
            }
            let start = values.len().saturating_sub(lookback);
            let (mean, std) = naive(&values[start..]);
            prop_assert!((stats.mean - mean).abs() < 1e-9);
            prop_assert!((stats.std_dev - std).abs() < 1e-6);
            prop_assert_eq!(stats.ready, values.len() >= lookback);
            prop_assert!(window.len() <= lookback);
        }
    }
}
