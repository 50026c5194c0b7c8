//! Domain Layer - Core types of the spread engine
//!
//! Pure value types and the position state machine. No I/O happens here;
//! observations arrive already loaded and trades leave as plain records.
//!
//! - `observation`: paired IV input and stream validation
//! - `signal`: per-step Long/Short/Flat classification
//! - `position` / `trade`: the single open position and the closed-trade ledger
//! - `risk`: entry, stop-loss, timeout and reversion rules
//! - `portfolio`: equity curve and performance summary

pub mod observation;
pub mod portfolio;
pub mod position;
pub mod risk;
pub mod signal;
pub mod trade;

pub use observation::{DataError, Leg, Observation};
pub use portfolio::{EquityCurve, EquityPoint, PerformanceSummary};
pub use position::{Position, PositionError, Side};
pub use risk::{MarketContext, PositionRiskManager, RiskAction};
pub use signal::Signal;
pub use trade::{ExitReason, Trade};
