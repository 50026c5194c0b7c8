use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::BTreeMap;

use super::trade::{ExitReason, Trade};

/// Cumulative pnl after one processed observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub realized_pnl: f64,
    pub unrealized_pnl: f64,
    pub equity: f64,
}

impl EquityPoint {
    pub fn new(timestamp: DateTime<Utc>, realized_pnl: f64, unrealized_pnl: f64) -> Self {
        EquityPoint {
            timestamp,
            realized_pnl,
            unrealized_pnl,
            equity: realized_pnl + unrealized_pnl,
        }
    }
}

/// One point per observation, in input order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EquityCurve {
    points: Vec<EquityPoint>,
}

impl EquityCurve {
    pub fn new() -> Self {
        EquityCurve { points: Vec::new() }
    }

    pub fn push(&mut self, point: EquityPoint) {
        self.points.push(point);
    }

    /// Replace the most recent point (used when the final bar force-closes)
    pub fn restate_last(&mut self, point: EquityPoint) {
        if let Some(last) = self.points.last_mut() {
            *last = point;
        }
    }

    pub fn points(&self) -> &[EquityPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn final_equity(&self) -> f64 {
        self.points.last().map_or(0.0, |p| p.equity)
    }

    /// Largest peak-to-trough decline in absolute pnl units
    pub fn max_drawdown(&self) -> f64 {
        let mut peak = 0.0_f64;
        let mut max_dd = 0.0_f64;
        for point in &self.points {
            peak = peak.max(point.equity);
            max_dd = max_dd.max(peak - point.equity);
        }
        max_dd
    }

    pub fn into_points(self) -> Vec<EquityPoint> {
        self.points
    }
}

/// Aggregate statistics over a finished run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub total_pnl: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub max_drawdown: f64,
    /// Per-trade Sharpe (mean / std of trade pnl); None below 10 trades
    pub sharpe_per_trade: Option<f64>,
    pub exits: BTreeMap<ExitReason, usize>,
}

impl PerformanceSummary {
    /// Minimum closed trades before a Sharpe figure is reported
    pub const MIN_TRADES_FOR_SHARPE: usize = 10;

    pub fn from_run(trades: &[Trade], equity: &EquityCurve) -> Self {
        let wins: Vec<f64> = trades.iter().filter(|t| t.pnl > 0.0).map(|t| t.pnl).collect();
        let losses: Vec<f64> = trades.iter().filter(|t| t.pnl < 0.0).map(|t| t.pnl).collect();

        let mut exits = BTreeMap::new();
        for trade in trades {
            *exits.entry(trade.exit_reason).or_insert(0) += 1;
        }

        PerformanceSummary {
            total_trades: trades.len(),
            winning_trades: wins.len(),
            losing_trades: losses.len(),
            total_pnl: trades.iter().map(|t| t.pnl).sum(),
            avg_win: average(&wins),
            avg_loss: average(&losses),
            max_drawdown: equity.max_drawdown(),
            sharpe_per_trade: sharpe(trades),
            exits,
        }
    }

    /// Win rate as a percentage (0-100)
    pub fn win_rate(&self) -> f64 {
        if self.total_trades == 0 {
            return 0.0;
        }
        (self.winning_trades as f64 / self.total_trades as f64) * 100.0
    }

    /// Gross profits / gross losses
    pub fn profit_factor(&self) -> f64 {
        let gross_win = self.avg_win * self.winning_trades as f64;
        let gross_loss = (self.avg_loss * self.losing_trades as f64).abs();
        if gross_loss < 1e-10 {
            if gross_win > 0.0 {
                return f64::INFINITY;
            }
            return 0.0;
        }
        gross_win / gross_loss
    }

    pub fn exit_count(&self, reason: ExitReason) -> usize {
        self.exits.get(&reason).copied().unwrap_or(0)
    }
}

fn average(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn sharpe(trades: &[Trade]) -> Option<f64> {
    if trades.len() < PerformanceSummary::MIN_TRADES_FOR_SHARPE {
        return None;
    }
    let pnls: Vec<f64> = trades.iter().map(|t| t.pnl).collect();
    let mean = pnls.iter().mean();
    let std_dev = pnls.iter().std_dev();
    if !std_dev.is_finite() || std_dev < 1e-10 {
        return None;
    }
    Some(mean / std_dev)
}
