//! Strategy Layer - Spread estimation and signal classification
//!
//! Streaming estimators over the IV spread, each owned by a single run:
//! - Rolling mean/std over a configurable lookback (z-score source)
//! - 1-D Kalman filter for the latent spread (Enhanced variant)
//! - Wilder RSI over the spread (Enhanced confirmation)
//! - OU half-life from the window's lag-1 autocorrelation (adaptive holding)
//!
//! `SignalGenerator` turns the resulting score into Long / Short / Flat.

pub mod half_life;
pub mod kalman;
pub mod params;
pub mod rolling_window;
pub mod rsi;
pub mod signal_generator;

pub use half_life::{HalfLife, HalfLifeEstimator};
pub use kalman::{KalmanSpreadFilter, KalmanState};
pub use params::{
    ConfigError, EngineConfig, HoldingPeriod, KalmanConfig, OscillatorConfig, PositionSizing,
    RiskConfig, StopLoss, StrategyVariant, MIN_STD,
};
pub use rolling_window::{RollingStats, RollingWindow};
pub use rsi::RsiOscillator;
pub use signal_generator::{EntryThresholds, SignalGenerator};
