//! Backtest Engine
//!
//! Drives the estimators, the signal generator and the risk manager over an
//! ordered observation stream. One engine is one run: all state is owned here
//! and nothing is shared between runs.
//!
//! Per observation:
//! 1. validate (finite, non-negative IVs, strictly increasing timestamps)
//! 2. spread = leg_b - leg_a
//! 3. update rolling window, Kalman filter and RSI
//! 4. z from the active variant, classify, step the risk manager
//! 5. append an equity point
//!
//! `finish` force-closes any open position at the last observation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::domain::{
    DataError, EquityCurve, EquityPoint, ExitReason, MarketContext, Observation,
    PerformanceSummary, PositionError, PositionRiskManager, RiskAction, Signal, Trade,
};
use crate::strategy::{
    ConfigError, EngineConfig, HalfLifeEstimator, KalmanSpreadFilter, RollingWindow,
    RsiOscillator, SignalGenerator, StrategyVariant, MIN_STD,
};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BacktestError {
    #[error("Configuration error")]
    Config(#[from] ConfigError),
    #[error("Data error")]
    Data(#[from] DataError),
    #[error("Position state violated")]
    Position(#[from] PositionError),
}

/// Everything the engine computed for one observation
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub timestamp: DateTime<Utc>,
    pub spread: f64,
    /// Kalman estimate of the spread after this observation
    pub filtered_spread: f64,
    pub z_score: f64,
    /// Rolling window is full
    pub ready: bool,
    pub oscillator: Option<f64>,
    pub signal: Signal,
    pub action: RiskAction,
    pub equity: EquityPoint,
}

/// Result of a completed run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    pub config: EngineConfig,
    pub observations: usize,
    pub trades: Vec<Trade>,
    pub equity_curve: EquityCurve,
    pub summary: PerformanceSummary,
}

pub struct BacktestEngine {
    config: EngineConfig,
    window: RollingWindow,
    kalman: KalmanSpreadFilter,
    rsi: RsiOscillator,
    half_life: HalfLifeEstimator,
    signals: SignalGenerator,
    risk: PositionRiskManager,
    equity: EquityCurve,
    /// Context of the last processed observation, used for the final close
    last: Option<MarketContext>,
    /// Minutes between the last two observations
    bar_minutes: f64,
    processed: usize,
    flat_window: bool,
}

impl BacktestEngine {
    /// Validate `config` and build a fresh engine
    pub fn new(config: EngineConfig) -> Result<Self, BacktestError> {
        config.validate()?;

        Ok(Self {
            window: RollingWindow::new(config.lookback),
            kalman: KalmanSpreadFilter::new(config.kalman),
            rsi: RsiOscillator::new(config.oscillator.period),
            half_life: HalfLifeEstimator::default(),
            signals: SignalGenerator::from_config(&config),
            risk: PositionRiskManager::new(config.risk, config.exit_z),
            equity: EquityCurve::new(),
            last: None,
            bar_minutes: 1.0,
            processed: 0,
            flat_window: false,
            config,
        })
    }

    /// Process one observation.
    ///
    /// An invalid observation is rejected before any state changes.
    pub fn step(&mut self, observation: &Observation) -> Result<StepOutcome, BacktestError> {
        let previous = self.last.map(|ctx| ctx.timestamp);
        observation.validate(self.processed, previous)?;

        let timestamp = observation.timestamp;
        let spread = observation.spread();
        if let Some(previous) = previous {
            self.bar_minutes = (timestamp - previous).num_milliseconds() as f64 / 60_000.0;
        }

        let filtered_spread = self.kalman.update(spread);
        let stats = self.window.update(spread);
        let oscillator = self.rsi.update(spread);

        if stats.ready && stats.std_dev < MIN_STD {
            if !self.flat_window {
                debug!("rolling std {:e} below floor at {}, z forced to 0", stats.std_dev, timestamp);
            }
            self.flat_window = true;
        } else {
            self.flat_window = false;
        }

        let z_score = match self.config.variant {
            StrategyVariant::Base => stats.z_score(spread),
            StrategyVariant::Enhanced => stats.z_score(filtered_spread),
        };

        let signal = if stats.ready {
            self.signals.classify(z_score, oscillator, self.config.variant)
        } else {
            Signal::Flat
        };

        let half_life_minutes = if signal.is_entry()
            && !self.risk.is_open()
            && self.config.risk.holding_period.needs_half_life()
        {
            let estimate = self.half_life.estimate(self.window.values(), self.bar_minutes);
            debug!("half-life at {}: {:?}", timestamp, estimate);
            estimate.map(|h| h.minutes)
        } else {
            None
        };

        let ctx = MarketContext {
            timestamp,
            spread,
            z_score,
            rolling_std: stats.std_dev,
            half_life_minutes,
        };
        let action = self.risk.step(&ctx, signal)?;

        let equity = EquityPoint::new(
            timestamp,
            self.risk.realized_pnl(),
            self.risk.unrealized_pnl(spread),
        );
        self.equity.push(equity);

        if self.processed + 1 == self.config.lookback {
            debug!("rolling window ready after {} observations", self.config.lookback);
        }
        self.last = Some(ctx);
        self.processed += 1;

        Ok(StepOutcome {
            timestamp,
            spread,
            filtered_spread,
            z_score,
            ready: stats.ready,
            oscillator,
            signal,
            action,
            equity,
        })
    }

    /// End the run: force-close any open position at the last observation
    /// and assemble the report.
    pub fn finish(mut self) -> Result<BacktestReport, BacktestError> {
        if let Some(ctx) = self.last {
            if self.risk.is_open() {
                let trade = self.risk.close(&ctx, ExitReason::EndOfData)?;
                debug!("end of data close: {}", trade);
                self.equity
                    .restate_last(EquityPoint::new(ctx.timestamp, self.risk.realized_pnl(), 0.0));
            }
        }

        let trades = self.risk.into_trades();
        let summary = PerformanceSummary::from_run(&trades, &self.equity);

        info!(
            "Backtest complete: {} observations, {} trades, pnl {:+.4}, win rate {:.1}%, max drawdown {:.4}",
            self.processed,
            summary.total_trades,
            summary.total_pnl,
            summary.win_rate(),
            summary.max_drawdown
        );

        Ok(BacktestReport {
            config: self.config,
            observations: self.processed,
            trades,
            equity_curve: self.equity,
            summary,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn risk(&self) -> &PositionRiskManager {
        &self.risk
    }

    pub fn equity_curve(&self) -> &EquityCurve {
        &self.equity
    }

    pub fn processed(&self) -> usize {
        self.processed
    }

    pub fn kalman(&self) -> &KalmanSpreadFilter {
        &self.kalman
    }
}

/// Run `config` over the whole stream.
///
/// Any invalid observation rejects the run; no partial ledger is returned.
pub fn run(config: EngineConfig, observations: &[Observation]) -> Result<BacktestReport, BacktestError> {
    info!(
        "Backtest starting: {} variant, lookback {}, entry |z| {}, exit |z| {}, {} observations",
        config.variant,
        config.lookback,
        config.entry_z(),
        config.exit_z,
        observations.len()
    );

    let mut engine = BacktestEngine::new(config)?;
    for observation in observations {
        engine.step(observation)?;
    }
    engine.finish()
}
