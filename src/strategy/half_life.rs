//! Ornstein-Uhlenbeck Half-Life Estimation
//!
//! Treats the spread window as a discretely sampled OU process,
//! dX(t) = theta(mu - X(t))dt + sigma*dW(t), and estimates the speed of
//! mean reversion from the lag-1 autocorrelation of the window:
//!
//! - AR(1): X(t+1) = rho * X(t) + noise, theta = -ln(rho) / dt
//! - half-life: t_1/2 = ln(2) / theta
//!
//! Used to size the adaptive holding period. Estimation runs on demand (at
//! entry), not every bar.

use serde::{Deserialize, Serialize};

/// Minimum rho: below this the series is closer to white noise than to OU
const MIN_RHO: f64 = 0.01;
/// Maximum rho: at or above this the series is indistinguishable from a unit root
const MAX_RHO: f64 = 0.999;
/// Minimum variance for a meaningful autocorrelation
const MIN_VARIANCE: f64 = 1e-14;

/// Mean-reversion estimate for the current window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HalfLife {
    /// Lag-1 autocorrelation
    pub rho: f64,
    /// Mean reversion speed per bar
    pub theta: f64,
    /// Half-life in bars
    pub bars: f64,
    /// Half-life in minutes given the bar interval
    pub minutes: f64,
}

#[derive(Debug, Clone)]
pub struct HalfLifeEstimator {
    min_samples: usize,
}

impl Default for HalfLifeEstimator {
    fn default() -> Self {
        Self { min_samples: 30 }
    }
}

impl HalfLifeEstimator {
    pub fn new(min_samples: usize) -> Self {
        Self {
            min_samples: min_samples.max(3),
        }
    }

    /// Estimate the half-life of `values` sampled every `bar_minutes`.
    ///
    /// Returns None with too few samples, no dispersion, or an
    /// autocorrelation outside the mean-reverting range.
    pub fn estimate<I>(&self, values: I, bar_minutes: f64) -> Option<HalfLife>
    where
        I: IntoIterator<Item = f64>,
    {
        if !bar_minutes.is_finite() || bar_minutes <= 0.0 {
            return None;
        }

        let series: Vec<f64> = values.into_iter().collect();
        let n = series.len();
        if n < self.min_samples {
            return None;
        }

        let lagged = &series[..n - 1];
        let leading = &series[1..];
        let mean_x = lagged.iter().sum::<f64>() / (n - 1) as f64;
        let mean_y = leading.iter().sum::<f64>() / (n - 1) as f64;

        let mut cov_sum = 0.0;
        let mut var_sum_x = 0.0;
        let mut var_sum_y = 0.0;
        for (x, y) in lagged.iter().zip(leading) {
            let dx = x - mean_x;
            let dy = y - mean_y;
            cov_sum += dx * dy;
            var_sum_x += dx * dx;
            var_sum_y += dy * dy;
        }

        let denom = (n - 1) as f64;
        if var_sum_x / denom < MIN_VARIANCE || var_sum_y / denom < MIN_VARIANCE {
            return None;
        }

        let rho = cov_sum / (var_sum_x * var_sum_y).sqrt();
        if !(MIN_RHO..MAX_RHO).contains(&rho) {
            return None;
        }

        let theta = -rho.ln();
        let bars = std::f64::consts::LN_2 / theta;

        Some(HalfLife {
            rho,
            theta,
            bars,
            minutes: bars * bar_minutes,
        })
    }

    pub fn min_samples(&self) -> usize {
        self.min_samples
    }
}
