//! Kalman Filter for the latent "true" spread.
//!
//! One-dimensional linear-Gaussian model:
//!
//! ```text
//! state:        s[t] = s[t-1] + w,   w ~ N(0, Q)
//! observation:  y[t] = s[t]   + v,   v ~ N(0, R)
//! ```
//!
//! Per update: `P = P + Q`, `K = P / (P + R)`, `s = s + K (y - s)`,
//! `P = (1 - K) P`, with `P` clamped at 0.

use tracing::debug;

use crate::strategy::params::KalmanConfig;

/// Scalar filter state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KalmanState {
    pub estimate: f64,
    pub error_covariance: f64,
}

#[derive(Debug, Clone)]
pub struct KalmanSpreadFilter {
    config: KalmanConfig,
    /// None until the first observation
    state: Option<KalmanState>,
    last_gain: f64,
    update_count: u64,
}

impl KalmanSpreadFilter {
    pub fn new(config: KalmanConfig) -> Self {
        Self {
            config,
            state: None,
            last_gain: 0.0,
            update_count: 0,
        }
    }

    /// Feed one observed spread and return the filtered estimate.
    ///
    /// The first observation seeds the estimate with the configured prior
    /// covariance and is returned unchanged.
    pub fn update(&mut self, observed: f64) -> f64 {
        self.update_count += 1;

        let Some(state) = self.state.as_mut() else {
            self.state = Some(KalmanState {
                estimate: observed,
                error_covariance: self.config.initial_covariance,
            });
            return observed;
        };

        // Predict: random walk keeps the estimate, uncertainty grows by Q
        let predicted = state.estimate;
        let cov_pred = state.error_covariance + self.config.process_variance;

        let innovation = observed - predicted;
        let gain = cov_pred / (cov_pred + self.config.observation_variance);

        state.estimate = predicted + gain * innovation;
        let cov = (1.0 - gain) * cov_pred;
        if cov < 0.0 {
            debug!("kalman covariance {:e} clamped to 0", cov);
        }
        state.error_covariance = cov.max(0.0);
        self.last_gain = gain;

        state.estimate
    }

    pub fn state(&self) -> Option<KalmanState> {
        self.state
    }

    pub fn estimate(&self) -> Option<f64> {
        self.state.map(|s| s.estimate)
    }

    pub fn covariance(&self) -> Option<f64> {
        self.state.map(|s| s.error_covariance)
    }

    /// Gain applied on the most recent update (0 before the second one)
    pub fn last_gain(&self) -> f64 {
        self.last_gain
    }

    pub fn update_count(&self) -> u64 {
        self.update_count
    }

    pub fn reset(&mut self) {
        self.state = None;
        self.last_gain = 0.0;
        self.update_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn default_filter() -> KalmanSpreadFilter {
        KalmanSpreadFilter::new(KalmanConfig::default())
    }

    #[test]
    fn test_first_observation_initializes() {
        let mut kalman = default_filter();
        assert!(kalman.state().is_none());

        assert_eq!(kalman.update(0.042), 0.042);
        let state = kalman.state().unwrap();
        assert_eq!(state.estimate, 0.042);
        assert_eq!(state.error_covariance, 1.0);
        assert_eq!(kalman.last_gain(), 0.0);
    }

    #[test]
    fn test_single_step_matches_equations() {
        let mut kalman = default_filter();
        kalman.update(0.0);
        let estimate = kalman.update(1.0);

        // cov_pred = 1.01, K = 1.01 / 2.01
        let gain = 1.01 / 2.01;
        assert!((kalman.last_gain() - gain).abs() < 1e-12);
        assert!((estimate - gain).abs() < 1e-12);
        assert!((kalman.covariance().unwrap() - (1.0 - gain) * 1.01).abs() < 1e-12);
    }

    #[test]
    fn test_converges_monotonically_to_constant() {
        let mut kalman = default_filter();
        kalman.update(0.0);

        let target = 0.5;
        let mut prev_estimate = 0.0;
        let mut prev_cov = kalman.covariance().unwrap();
        for _ in 0..500 {
            let estimate = kalman.update(target);
            let cov = kalman.covariance().unwrap();
            assert!(estimate >= prev_estimate);
            assert!(estimate <= target + 1e-12);
            assert!(cov <= prev_cov + 1e-15);
            assert!(cov >= 0.0);
            prev_estimate = estimate;
            prev_cov = cov;
        }
        assert!((prev_estimate - target).abs() < 1e-3);
    }

    #[test]
    fn test_zero_process_noise_clamps_at_zero() {
        let mut kalman = KalmanSpreadFilter::new(KalmanConfig {
            observation_variance: 1e-300,
            process_variance: 0.0,
            initial_covariance: 0.0,
        });
        kalman.update(1.0);
        for _ in 0..10 {
            kalman.update(1.0);
            assert!(kalman.covariance().unwrap() >= 0.0);
        }
        assert_eq!(kalman.estimate(), Some(1.0));
    }

    #[test]
    fn test_smooths_noise() {
        let mut kalman = default_filter();
        let mut max_dev: f64 = 0.0;
        kalman.update(0.0);
        for i in 0..300 {
            let noisy = if i % 2 == 0 { 0.1 } else { -0.1 };
            let estimate = kalman.update(noisy);
            if i > 50 {
                max_dev = max_dev.max(estimate.abs());
            }
        }
        assert!(max_dev < 0.1);
    }

    #[test]
    fn test_reset() {
        let mut kalman = default_filter();
        kalman.update(1.0);
        kalman.update(2.0);
        kalman.reset();
        assert!(kalman.state().is_none());
        assert_eq!(kalman.update_count(), 0);
    }

    proptest! {
        #[test]
        fn prop_covariance_never_negative(
            obs in prop::collection::vec(-10.0f64..10.0, 1..200),
            r in 1e-9f64..10.0,
            q in 0.0f64..1.0,
        ) {
            let mut kalman = KalmanSpreadFilter::new(KalmanConfig {
                observation_variance: r,
                process_variance: q,
                initial_covariance: 1.0,
            });
            for &y in &obs {
                let estimate = kalman.update(y);
                prop_assert!(estimate.is_finite());
                prop_assert!(kalman.covariance().unwrap() >= 0.0);
                prop_assert!(kalman.last_gain() >= 0.0 && kalman.last_gain() <= 1.0);
            }
        }
    }
}
