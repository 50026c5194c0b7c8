//! iv-spread - Implied-volatility spread engine
//!
//! Estimates a mean-reverting spread between two implied-volatility series and
//! trades it with deterministic entry and exit rules.
//!
//! # Modules
//!
//! - `domain`: Core types (Observation, Position, Trade, EquityCurve, PositionRiskManager)
//! - `ports`: Trait abstractions (ObservationSource)
//! - `strategy`: Estimators and signal generation (RollingWindow, Kalman, RSI, half-life)
//! - `adapters`: External implementations (CSV source, export, CLI)
//! - `config`: Configuration loading and validation
//! - `application`: Backtest engine and parameter sweeps

pub mod domain;
pub mod ports;
pub mod strategy;
pub mod adapters;
pub mod config;
pub mod application;
