//! Application Layer - Backtest runs and parameter sweeps

pub mod backtest;
pub mod sweep;

pub use backtest::{run, BacktestEngine, BacktestError, BacktestReport, StepOutcome};
pub use sweep::{best_by_pnl, ParamGrid, SweepResult, SweepRunner};
