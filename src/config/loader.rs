//! Configuration Loader
//!
//! Loads and validates engine configuration from TOML files matching
//! config/default.toml. Every field has a default, so a partial file (or an
//! empty one) is a valid configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::strategy::params::{
    ConfigError, EngineConfig, HoldingPeriod, KalmanConfig, OscillatorConfig, PositionSizing,
    RiskConfig, StopLoss, StrategyVariant,
};

/// Main configuration structure matching config/default.toml
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub strategy: StrategySection,
    pub kalman: KalmanSection,
    pub oscillator: OscillatorSection,
    pub risk: RiskSection,
}

/// Strategy configuration section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategySection {
    /// "base" or "enhanced"
    pub variant: StrategyVariant,
    /// Rolling window length in bars
    pub lookback: usize,
    pub entry_z_base: f64,
    pub entry_z_enhanced: f64,
    pub exit_z: f64,
}

impl Default for StrategySection {
    fn default() -> Self {
        let defaults = EngineConfig::default();
        Self {
            variant: defaults.variant,
            lookback: defaults.lookback,
            entry_z_base: defaults.entry_z_base,
            entry_z_enhanced: defaults.entry_z_enhanced,
            exit_z: defaults.exit_z,
        }
    }
}

/// Kalman filter section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KalmanSection {
    /// R
    pub observation_variance: f64,
    /// Q
    pub process_variance: f64,
    pub initial_covariance: f64,
}

impl Default for KalmanSection {
    fn default() -> Self {
        let defaults = KalmanConfig::default();
        Self {
            observation_variance: defaults.observation_variance,
            process_variance: defaults.process_variance,
            initial_covariance: defaults.initial_covariance,
        }
    }
}

/// RSI confirmation section (Enhanced variant)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OscillatorSection {
    pub rsi_period: usize,
    pub rsi_overbought: f64,
    pub rsi_oversold: f64,
}

impl Default for OscillatorSection {
    fn default() -> Self {
        let defaults = OscillatorConfig::default();
        Self {
            rsi_period: defaults.period,
            rsi_overbought: defaults.overbought,
            rsi_oversold: defaults.oversold,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopLossKind {
    ZMultiple,
    SpreadLoss,
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizingKind {
    Fixed,
    VolatilityScaled,
}

/// Risk management section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskSection {
    /// Fixed holding period, and the fallback when adaptive holding has no estimate
    pub holding_period_minutes: f64,
    /// Size the holding period from the spread's half-life
    pub adaptive_holding: bool,
    pub half_life_multiple: f64,
    pub min_holding_minutes: f64,
    pub max_holding_minutes: f64,
    pub stop_loss: StopLossKind,
    pub stop_loss_z_multiple: f64,
    /// Spread units, used with stop_loss = "spread_loss"
    pub max_spread_loss: f64,
    pub position_sizing: SizingKind,
    pub position_size: f64,
    /// Spread-std units risked per entry, used with "volatility_scaled"
    pub risk_budget: f64,
    pub max_position_size: f64,
    pub cooldown_minutes: u64,
}

impl Default for RiskSection {
    fn default() -> Self {
        Self {
            holding_period_minutes: 45.0,
            adaptive_holding: false,
            half_life_multiple: 2.0,
            min_holding_minutes: 5.0,
            max_holding_minutes: 240.0,
            stop_loss: StopLossKind::ZMultiple,
            stop_loss_z_multiple: 2.0,
            max_spread_loss: 0.05,
            position_sizing: SizingKind::Fixed,
            position_size: 1.0,
            risk_budget: 0.01,
            max_position_size: 10.0,
            cooldown_minutes: 0,
        }
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to read config file")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML")]
    ParseError(#[from] toml::de::Error),
    #[error("Validation failed")]
    ValidationError(#[from] ConfigError),
}

/// Load and validate configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, LoadError> {
    let config = read_config(path)?;
    config.validate()?;
    Ok(config)
}

/// Load configuration from a TOML file without validating it.
///
/// For callers that layer overrides on top and validate the result.
pub fn read_config<P: AsRef<Path>>(path: P) -> Result<Config, LoadError> {
    let content = std::fs::read_to_string(path)?;
    Config::from_toml(&content)
}

/// Parse and validate configuration from TOML text
pub fn parse_config(content: &str) -> Result<Config, LoadError> {
    let config = Config::from_toml(content)?;
    config.validate()?;
    Ok(config)
}

impl Config {
    /// Parse TOML text, unchecked
    pub fn from_toml(content: &str) -> Result<Self, LoadError> {
        Ok(toml::from_str(content)?)
    }

    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        EngineConfig::from(self).validate()
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::from(self)
    }
}

impl RiskSection {
    fn holding_period(&self) -> HoldingPeriod {
        if self.adaptive_holding {
            HoldingPeriod::HalfLife {
                multiple: self.half_life_multiple,
                min_minutes: self.min_holding_minutes,
                max_minutes: self.max_holding_minutes,
                fallback_minutes: self.holding_period_minutes,
            }
        } else {
            HoldingPeriod::Fixed {
                minutes: self.holding_period_minutes,
            }
        }
    }

    fn stop_loss(&self) -> StopLoss {
        match self.stop_loss {
            StopLossKind::ZMultiple => StopLoss::ZMultiple {
                multiple: self.stop_loss_z_multiple,
            },
            StopLossKind::SpreadLoss => StopLoss::SpreadLoss {
                max_loss: self.max_spread_loss,
            },
            StopLossKind::Disabled => StopLoss::Disabled,
        }
    }

    fn sizing(&self) -> PositionSizing {
        match self.position_sizing {
            SizingKind::Fixed => PositionSizing::Fixed {
                units: self.position_size,
            },
            SizingKind::VolatilityScaled => PositionSizing::VolatilityScaled {
                risk_budget: self.risk_budget,
                max_units: self.max_position_size,
            },
        }
    }
}

// Conversion from Config to EngineConfig
impl From<&Config> for EngineConfig {
    fn from(config: &Config) -> Self {
        EngineConfig {
            variant: config.strategy.variant,
            lookback: config.strategy.lookback,
            entry_z_base: config.strategy.entry_z_base,
            entry_z_enhanced: config.strategy.entry_z_enhanced,
            exit_z: config.strategy.exit_z,
            kalman: KalmanConfig {
                observation_variance: config.kalman.observation_variance,
                process_variance: config.kalman.process_variance,
                initial_covariance: config.kalman.initial_covariance,
            },
            oscillator: OscillatorConfig {
                period: config.oscillator.rsi_period,
                overbought: config.oscillator.rsi_overbought,
                oversold: config.oscillator.rsi_oversold,
            },
            risk: RiskConfig {
                holding_period: config.risk.holding_period(),
                stop_loss: config.risk.stop_loss(),
                sizing: config.risk.sizing(),
                cooldown_minutes: config.risk.cooldown_minutes,
            },
        }
    }
}
