//! Position lifecycle and exit rules.
//!
//! `PositionRiskManager` is a two-state machine (Flat / Open). While open, exits
//! are checked every step in priority order: stop-loss, timeout, reversion.
//! Entry signals are ignored while a position is open.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::position::{Position, PositionError, Side};
use super::signal::Signal;
use super::trade::{ExitReason, Trade};
use crate::strategy::params::{RiskConfig, StopLoss};

/// Market state the risk manager needs for one step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarketContext {
    pub timestamp: DateTime<Utc>,
    /// Raw spread; all pnl is marked against this
    pub spread: f64,
    /// Standardized score from the active estimator
    pub z_score: f64,
    /// Rolling standard deviation, used for volatility sizing
    pub rolling_std: f64,
    /// Latest half-life estimate in minutes, when one is available
    pub half_life_minutes: Option<f64>,
}

/// What the risk manager did on a step
#[derive(Debug, Clone, PartialEq)]
pub enum RiskAction {
    /// Flat and no entry signal
    Idle,
    /// Opened a new position
    Opened(Side),
    /// Position remains open
    Held,
    /// Closed the position; the trade was appended to the ledger
    Closed(Trade),
    /// Entry signal ignored during the post-exit cooldown
    Suppressed(Side),
}

/// Manages at most one open spread position
#[derive(Debug, Clone)]
pub struct PositionRiskManager {
    config: RiskConfig,
    exit_z: f64,
    position: Option<Position>,
    ledger: Vec<Trade>,
    realized_pnl: f64,
    last_exit: Option<DateTime<Utc>>,
}

impl PositionRiskManager {
    pub fn new(config: RiskConfig, exit_z: f64) -> Self {
        Self {
            config,
            exit_z,
            position: None,
            ledger: Vec::new(),
            realized_pnl: 0.0,
            last_exit: None,
        }
    }

    /// Advance one step: evaluate exits if open, otherwise act on `signal`.
    ///
    /// A step that closes a position never opens a new one.
    pub fn step(&mut self, ctx: &MarketContext, signal: Signal) -> Result<RiskAction, PositionError> {
        if let Some(position) = &self.position {
            return match self.exit_reason(position, ctx) {
                Some(reason) => {
                    let trade = self.close(ctx, reason)?;
                    Ok(RiskAction::Closed(trade))
                }
                None => Ok(RiskAction::Held),
            };
        }

        let Some(side) = signal.side() else {
            return Ok(RiskAction::Idle);
        };

        if self.in_cooldown(ctx.timestamp) {
            debug!("{} entry suppressed during cooldown at {}", side, ctx.timestamp);
            return Ok(RiskAction::Suppressed(side));
        }

        self.open(side, ctx)?;
        Ok(RiskAction::Opened(side))
    }

    /// Open a position. Fails if one is already open.
    pub fn open(&mut self, side: Side, ctx: &MarketContext) -> Result<&Position, PositionError> {
        if let Some(open) = &self.position {
            return Err(PositionError::AlreadyOpen {
                open: open.side,
                requested: side,
                timestamp: ctx.timestamp,
            });
        }

        let size = self.config.sizing.units(ctx.rolling_std);
        let holding_period = self.config.holding_period.resolve(ctx.half_life_minutes);
        let position = Position::new(
            side,
            ctx.timestamp,
            ctx.spread,
            ctx.z_score,
            size,
            holding_period,
        )?;

        info!(
            "OPEN {} spread {:.4} z {:.2} size {:.3} hold {}m (confidence {:.3})",
            side,
            ctx.spread,
            ctx.z_score,
            size,
            holding_period.num_minutes(),
            Signal::confidence(ctx.z_score)
        );

        Ok(self.position.insert(position))
    }

    /// Close the open position at the context's spread and append the trade.
    pub fn close(&mut self, ctx: &MarketContext, reason: ExitReason) -> Result<Trade, PositionError> {
        let position = self
            .position
            .take()
            .ok_or(PositionError::NotOpen(ctx.timestamp))?;

        let trade = Trade::close(&position, ctx.timestamp, ctx.spread, ctx.z_score, reason);
        info!("CLOSE {}", trade);

        self.realized_pnl += trade.pnl;
        self.last_exit = Some(ctx.timestamp);
        self.ledger.push(trade.clone());
        Ok(trade)
    }

    fn exit_reason(&self, position: &Position, ctx: &MarketContext) -> Option<ExitReason> {
        if self.stop_triggered(position, ctx) {
            return Some(ExitReason::StopLoss);
        }
        if position.is_expired(ctx.timestamp) {
            return Some(ExitReason::Timeout);
        }
        let reverted = match position.side {
            Side::Long => ctx.z_score >= -self.exit_z,
            Side::Short => ctx.z_score <= self.exit_z,
        };
        reverted.then_some(ExitReason::Reversion)
    }

    fn stop_triggered(&self, position: &Position, ctx: &MarketContext) -> bool {
        match self.config.stop_loss {
            StopLoss::ZMultiple { multiple } => {
                let stop_z = position.entry_z * multiple;
                match position.side {
                    Side::Long => ctx.z_score <= stop_z,
                    Side::Short => ctx.z_score >= stop_z,
                }
            }
            StopLoss::SpreadLoss { max_loss } => position.pnl_at(ctx.spread) <= -max_loss,
            StopLoss::Disabled => false,
        }
    }

    fn in_cooldown(&self, now: DateTime<Utc>) -> bool {
        if self.config.cooldown_minutes == 0 {
            return false;
        }
        // Out-of-range cooldowns are rejected by validation; treat one as unbounded
        match self.config.cooldown() {
            Some(cooldown) => self.last_exit.is_some_and(|exit| now - exit < cooldown),
            None => self.last_exit.is_some(),
        }
    }

    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.position.is_some()
    }

    pub fn unrealized_pnl(&self, spread: f64) -> f64 {
        self.position.as_ref().map_or(0.0, |p| p.pnl_at(spread))
    }

    pub fn realized_pnl(&self) -> f64 {
        self.realized_pnl
    }

    pub fn trades(&self) -> &[Trade] {
        &self.ledger
    }

    pub fn into_trades(self) -> Vec<Trade> {
        self.ledger
    }
}
