//! Engine Parameters
//!
//! Configuration structs for the spread engine. Defaults reproduce the
//! documented minute-bar setup: 200-bar lookback, ±2.0 / ±2.5 entries,
//! 0.5 exit, 45 minute holding period.

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Lower bound on any standard deviation used as a divisor
pub const MIN_STD: f64 = 1e-10;

/// Which estimator feeds the z-score and which signal rule applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyVariant {
    /// Raw spread vs rolling statistics, plain threshold rule
    Base,
    /// Kalman-smoothed spread vs rolling statistics, oscillator-confirmed rule
    Enhanced,
}

impl std::fmt::Display for StrategyVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StrategyVariant::Base => write!(f, "base"),
            StrategyVariant::Enhanced => write!(f, "enhanced"),
        }
    }
}

/// Main engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub variant: StrategyVariant,
    /// Rolling window length in bars
    pub lookback: usize,
    /// |z| entry threshold in Base mode
    pub entry_z_base: f64,
    /// |z| entry threshold in Enhanced mode
    pub entry_z_enhanced: f64,
    /// |z| at which an open position is considered reverted
    pub exit_z: f64,
    pub kalman: KalmanConfig,
    pub oscillator: OscillatorConfig,
    pub risk: RiskConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            variant: StrategyVariant::Base,
            lookback: 200,
            entry_z_base: 2.0,
            entry_z_enhanced: 2.5,
            exit_z: 0.5,
            kalman: KalmanConfig::default(),
            oscillator: OscillatorConfig::default(),
            risk: RiskConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn with_variant(mut self, variant: StrategyVariant) -> Self {
        self.variant = variant;
        self
    }

    pub fn with_lookback(mut self, lookback: usize) -> Self {
        self.lookback = lookback;
        self
    }

    /// Override the entry threshold of the active variant
    pub fn with_entry_z(mut self, entry_z: f64) -> Self {
        match self.variant {
            StrategyVariant::Base => self.entry_z_base = entry_z,
            StrategyVariant::Enhanced => self.entry_z_enhanced = entry_z,
        }
        self
    }

    pub fn with_exit_z(mut self, exit_z: f64) -> Self {
        self.exit_z = exit_z;
        self
    }

    /// Entry threshold of the active variant
    pub fn entry_z(&self) -> f64 {
        match self.variant {
            StrategyVariant::Base => self.entry_z_base,
            StrategyVariant::Enhanced => self.entry_z_enhanced,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lookback < 2 {
            return Err(ConfigError::InvalidLookback(self.lookback));
        }
        for (field, value) in [
            ("entry_z_base", self.entry_z_base),
            ("entry_z_enhanced", self.entry_z_enhanced),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::InvalidEntryThreshold { field, value });
            }
        }
        if !self.exit_z.is_finite() || self.exit_z < 0.0 {
            return Err(ConfigError::InvalidExitThreshold(self.exit_z));
        }
        let entry_z = self.entry_z();
        if self.exit_z >= entry_z {
            return Err(ConfigError::ExitWiderThanEntry {
                exit_z: self.exit_z,
                entry_z,
            });
        }
        self.kalman.validate()?;
        self.oscillator.validate()?;
        self.risk.validate()?;
        Ok(())
    }
}

/// Kalman filter noise model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KalmanConfig {
    /// R: variance of the observation noise
    pub observation_variance: f64,
    /// Q: variance of the random-walk step
    pub process_variance: f64,
    /// Prior error covariance at initialization
    pub initial_covariance: f64,
}

impl Default for KalmanConfig {
    fn default() -> Self {
        Self {
            observation_variance: 1.0,
            process_variance: 0.01,
            initial_covariance: 1.0,
        }
    }
}

impl KalmanConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.observation_variance.is_finite() || self.observation_variance <= 0.0 {
            return Err(ConfigError::InvalidKalman {
                field: "observation_variance",
                value: self.observation_variance,
            });
        }
        if !self.process_variance.is_finite() || self.process_variance < 0.0 {
            return Err(ConfigError::InvalidKalman {
                field: "process_variance",
                value: self.process_variance,
            });
        }
        if !self.initial_covariance.is_finite() || self.initial_covariance < 0.0 {
            return Err(ConfigError::InvalidKalman {
                field: "initial_covariance",
                value: self.initial_covariance,
            });
        }
        Ok(())
    }
}

/// RSI confirmation bounds used by the Enhanced variant
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OscillatorConfig {
    pub period: usize,
    pub overbought: f64,
    pub oversold: f64,
}

impl Default for OscillatorConfig {
    fn default() -> Self {
        Self {
            period: 14,
            overbought: 70.0,
            oversold: 30.0,
        }
    }
}

impl OscillatorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.period == 0 {
            return Err(ConfigError::InvalidOscillatorPeriod);
        }
        let in_range = |v: f64| (0.0..=100.0).contains(&v);
        if !in_range(self.oversold) || !in_range(self.overbought) || self.oversold >= self.overbought {
            return Err(ConfigError::InvalidOscillatorBounds {
                oversold: self.oversold,
                overbought: self.overbought,
            });
        }
        Ok(())
    }
}

/// How long a position may stay open before the time-based exit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HoldingPeriod {
    Fixed {
        minutes: f64,
    },
    /// `multiple` × estimated half-life, clamped to [min, max]
    HalfLife {
        multiple: f64,
        min_minutes: f64,
        max_minutes: f64,
        fallback_minutes: f64,
    },
}

impl HoldingPeriod {
    /// Resolve to a concrete duration given the current half-life estimate
    pub fn resolve(&self, half_life_minutes: Option<f64>) -> Duration {
        let minutes = match *self {
            HoldingPeriod::Fixed { minutes } => minutes,
            HoldingPeriod::HalfLife {
                multiple,
                min_minutes,
                max_minutes,
                fallback_minutes,
            } => match half_life_minutes {
                Some(h) if h.is_finite() && h > 0.0 => (h * multiple).clamp(min_minutes, max_minutes),
                _ => fallback_minutes,
            },
        };
        Duration::milliseconds((minutes * 60_000.0).round() as i64)
    }

    pub fn needs_half_life(&self) -> bool {
        matches!(self, HoldingPeriod::HalfLife { .. })
    }

    fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            HoldingPeriod::Fixed { minutes } => {
                if !minutes.is_finite() || minutes <= 0.0 {
                    return Err(ConfigError::InvalidHoldingPeriod(format!(
                        "holding_period_minutes must be > 0, got {minutes}"
                    )));
                }
            }
            HoldingPeriod::HalfLife {
                multiple,
                min_minutes,
                max_minutes,
                fallback_minutes,
            } => {
                if !multiple.is_finite() || multiple <= 0.0 {
                    return Err(ConfigError::InvalidHoldingPeriod(format!(
                        "half_life_multiple must be > 0, got {multiple}"
                    )));
                }
                if !(min_minutes > 0.0 && min_minutes <= max_minutes && max_minutes.is_finite()) {
                    return Err(ConfigError::InvalidHoldingPeriod(format!(
                        "need 0 < min_minutes <= max_minutes, got {min_minutes}..{max_minutes}"
                    )));
                }
                if !fallback_minutes.is_finite() || fallback_minutes <= 0.0 {
                    return Err(ConfigError::InvalidHoldingPeriod(format!(
                        "fallback_minutes must be > 0, got {fallback_minutes}"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Stop-loss trigger
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StopLoss {
    /// Stop once z moves past `entry_z * multiple` in the adverse direction
    ZMultiple { multiple: f64 },
    /// Stop once unrealized pnl falls to `-max_loss`
    SpreadLoss { max_loss: f64 },
    Disabled,
}

/// Entry sizing rule
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PositionSizing {
    Fixed { units: f64 },
    /// `risk_budget / rolling_std`, capped at `max_units`
    VolatilityScaled { risk_budget: f64, max_units: f64 },
}

impl PositionSizing {
    pub fn units(&self, rolling_std: f64) -> f64 {
        match *self {
            PositionSizing::Fixed { units } => units,
            PositionSizing::VolatilityScaled {
                risk_budget,
                max_units,
            } => {
                if rolling_std < MIN_STD {
                    max_units
                } else {
                    (risk_budget / rolling_std).min(max_units)
                }
            }
        }
    }
}

/// Risk management configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskConfig {
    pub holding_period: HoldingPeriod,
    pub stop_loss: StopLoss,
    pub sizing: PositionSizing,
    /// Minutes after an exit during which new entries are suppressed
    pub cooldown_minutes: u64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            holding_period: HoldingPeriod::Fixed { minutes: 45.0 },
            stop_loss: StopLoss::ZMultiple { multiple: 2.0 },
            sizing: PositionSizing::Fixed { units: 1.0 },
            cooldown_minutes: 0,
        }
    }
}

impl RiskConfig {
    /// Cooldown as a duration, `None` when chrono cannot represent it
    pub fn cooldown(&self) -> Option<Duration> {
        i64::try_from(self.cooldown_minutes)
            .ok()
            .and_then(Duration::try_minutes)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.holding_period.validate()?;
        if self.cooldown().is_none() {
            return Err(ConfigError::InvalidCooldown(self.cooldown_minutes));
        }
        match self.stop_loss {
            StopLoss::ZMultiple { multiple } if !multiple.is_finite() || multiple <= 1.0 => {
                return Err(ConfigError::InvalidStopLoss(format!(
                    "stop_loss_z_multiple must be > 1, got {multiple}"
                )));
            }
            StopLoss::SpreadLoss { max_loss } if !max_loss.is_finite() || max_loss <= 0.0 => {
                return Err(ConfigError::InvalidStopLoss(format!(
                    "max_spread_loss must be > 0, got {max_loss}"
                )));
            }
            _ => {}
        }
        match self.sizing {
            PositionSizing::Fixed { units } if !units.is_finite() || units <= 0.0 => {
                return Err(ConfigError::InvalidPositionSize(units));
            }
            PositionSizing::VolatilityScaled {
                risk_budget,
                max_units,
            } if !(risk_budget > 0.0 && max_units > 0.0 && max_units.is_finite()) => {
                return Err(ConfigError::InvalidPositionSize(risk_budget.min(max_units)));
            }
            _ => {}
        }
        Ok(())
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid lookback: {0} (minimum 2)")]
    InvalidLookback(usize),
    #[error("Invalid {field}: {value} (must be > 0)")]
    InvalidEntryThreshold { field: &'static str, value: f64 },
    #[error("Invalid exit_z: {0} (must be >= 0)")]
    InvalidExitThreshold(f64),
    #[error("exit_z {exit_z} must be narrower than the entry threshold {entry_z}")]
    ExitWiderThanEntry { exit_z: f64, entry_z: f64 },
    #[error("Invalid kalman {field}: {value}")]
    InvalidKalman { field: &'static str, value: f64 },
    #[error("Invalid rsi period: must be > 0")]
    InvalidOscillatorPeriod,
    #[error("Invalid rsi bounds: oversold {oversold} must be below overbought {overbought}, both in 0-100")]
    InvalidOscillatorBounds { oversold: f64, overbought: f64 },
    #[error("Invalid holding period: {0}")]
    InvalidHoldingPeriod(String),
    #[error("Invalid stop loss: {0}")]
    InvalidStopLoss(String),
    #[error("Invalid position size: {0} (must be > 0)")]
    InvalidPositionSize(f64),
    #[error("Invalid cooldown_minutes: {0} (out of range)")]
    InvalidCooldown(u64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.lookback, 200);
        assert_eq!(config.entry_z_base, 2.0);
        assert_eq!(config.entry_z_enhanced, 2.5);
        assert_eq!(config.exit_z, 0.5);
        assert_eq!(config.oscillator.overbought, 70.0);
        assert_eq!(config.oscillator.oversold, 30.0);
        assert_eq!(config.kalman.observation_variance, 1.0);
        assert_eq!(config.kalman.process_variance, 0.01);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = EngineConfig::default()
            .with_variant(StrategyVariant::Enhanced)
            .with_entry_z(3.0)
            .with_exit_z(0.0)
            .with_lookback(60);
        assert_eq!(config.entry_z_enhanced, 3.0);
        assert_eq!(config.entry_z_base, 2.0);
        assert_eq!(config.entry_z(), 3.0);
        assert_eq!(config.lookback, 60);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_lookback() {
        let config = EngineConfig::default().with_lookback(1);
        assert!(matches!(config.validate(), Err(ConfigError::InvalidLookback(1))));
    }

    #[test]
    fn test_exit_wider_than_entry() {
        let config = EngineConfig::default().with_exit_z(2.0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ExitWiderThanEntry { .. })
        ));
    }

    #[test]
    fn test_invalid_entry_threshold() {
        let config = EngineConfig::default().with_entry_z(-1.0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidEntryThreshold { field: "entry_z_base", .. })
        ));
    }

    #[test]
    fn test_invalid_kalman() {
        let mut config = EngineConfig::default();
        config.kalman.observation_variance = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidKalman { field: "observation_variance", .. })
        ));

        let mut config = EngineConfig::default();
        config.kalman.process_variance = -0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_oscillator_bounds() {
        let mut config = EngineConfig::default();
        config.oscillator.oversold = 75.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidOscillatorBounds { .. })
        ));
    }

    #[test]
    fn test_risk_config_validation() {
        let mut risk = RiskConfig::default();
        assert!(risk.validate().is_ok());

        risk.stop_loss = StopLoss::ZMultiple { multiple: 0.8 };
        assert!(matches!(risk.validate(), Err(ConfigError::InvalidStopLoss(_))));

        risk.stop_loss = StopLoss::Disabled;
        risk.sizing = PositionSizing::Fixed { units: 0.0 };
        assert!(matches!(risk.validate(), Err(ConfigError::InvalidPositionSize(_))));

        risk.sizing = PositionSizing::Fixed { units: 1.0 };
        risk.holding_period = HoldingPeriod::Fixed { minutes: 0.0 };
        assert!(matches!(risk.validate(), Err(ConfigError::InvalidHoldingPeriod(_))));
    }

    #[test]
    fn test_cooldown_out_of_range_rejected() {
        let mut risk = RiskConfig {
            cooldown_minutes: 200_000_000_000_000,
            ..RiskConfig::default()
        };
        assert!(risk.cooldown().is_none());
        assert_eq!(
            risk.validate(),
            Err(ConfigError::InvalidCooldown(200_000_000_000_000))
        );

        risk.cooldown_minutes = u64::MAX;
        assert!(matches!(risk.validate(), Err(ConfigError::InvalidCooldown(_))));

        risk.cooldown_minutes = 60 * 24 * 365;
        assert!(risk.validate().is_ok());
        assert_eq!(risk.cooldown(), Some(Duration::days(365)));
    }

    #[test]
    fn test_holding_period_resolution() {
        let fixed = HoldingPeriod::Fixed { minutes: 45.0 };
        assert_eq!(fixed.resolve(Some(3.0)), Duration::minutes(45));
        assert!(!fixed.needs_half_life());

        let adaptive = HoldingPeriod::HalfLife {
            multiple: 2.0,
            min_minutes: 10.0,
            max_minutes: 120.0,
            fallback_minutes: 45.0,
        };
        assert!(adaptive.needs_half_life());
        assert_eq!(adaptive.resolve(Some(20.0)), Duration::minutes(40));
        assert_eq!(adaptive.resolve(Some(1.0)), Duration::minutes(10));
        assert_eq!(adaptive.resolve(Some(500.0)), Duration::minutes(120));
        assert_eq!(adaptive.resolve(None), Duration::minutes(45));
    }

    #[test]
    fn test_volatility_scaled_sizing() {
        let sizing = PositionSizing::VolatilityScaled {
            risk_budget: 0.02,
            max_units: 5.0,
        };
        assert!((sizing.units(0.01) - 2.0).abs() < 1e-12);
        assert_eq!(sizing.units(0.001), 5.0);
        assert_eq!(sizing.units(0.0), 5.0);
        assert_eq!(PositionSizing::Fixed { units: 3.0 }.units(0.5), 3.0);
    }
}
