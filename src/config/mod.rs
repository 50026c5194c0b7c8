//! Configuration Module
//!
//! Loads and validates engine configuration from TOML files.

pub mod loader;

pub use loader::{
    load_config, parse_config, read_config, Config, KalmanSection, LoadError, OscillatorSection,
    RiskSection, SizingKind, StopLossKind, StrategySection,
};
