//! Report export - JSON, trade tape CSV and equity curve CSV.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::application::{BacktestReport, SweepResult};
use crate::domain::{EquityPoint, Trade};

/// Serialize a full report to pretty JSON.
pub fn export_json(report: &BacktestReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize BacktestReport to JSON")
}

/// Deserialize a report previously written by `export_json`.
pub fn import_json(json: &str) -> Result<BacktestReport> {
    serde_json::from_str(json).context("failed to deserialize BacktestReport from JSON")
}

/// Export the trade ledger as CSV.
///
/// Columns: direction, entry_timestamp, exit_timestamp, entry_spread,
/// exit_spread, entry_z, exit_z, size, pnl, holding_minutes, exit_reason
pub fn export_trades_csv(trades: &[Trade]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "direction",
        "entry_timestamp",
        "exit_timestamp",
        "entry_spread",
        "exit_spread",
        "entry_z",
        "exit_z",
        "size",
        "pnl",
        "holding_minutes",
        "exit_reason",
    ])?;

    for t in trades {
        wtr.write_record([
            &t.direction.to_string(),
            &t.entry_timestamp.to_rfc3339(),
            &t.exit_timestamp.to_rfc3339(),
            &format!("{:.6}", t.entry_spread),
            &format!("{:.6}", t.exit_spread),
            &format!("{:.4}", t.entry_z),
            &format!("{:.4}", t.exit_z),
            &format!("{:.4}", t.size),
            &format!("{:.6}", t.pnl),
            &t.holding_minutes().to_string(),
            &t.exit_reason.to_string(),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export the equity curve as CSV, one row per observation.
pub fn export_equity_csv(points: &[EquityPoint]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["timestamp", "realized_pnl", "unrealized_pnl", "equity"])?;
    for p in points {
        wtr.write_record([
            &p.timestamp.to_rfc3339(),
            &format!("{:.6}", p.realized_pnl),
            &format!("{:.6}", p.unrealized_pnl),
            &format!("{:.6}", p.equity),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export sweep results as CSV, in grid order.
pub fn export_sweep_csv(results: &[SweepResult]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "lookback",
        "entry_z",
        "exit_z",
        "trades",
        "win_rate",
        "total_pnl",
        "profit_factor",
        "max_drawdown",
        "sharpe_per_trade",
    ])?;
    for r in results {
        let s = &r.summary;
        wtr.write_record([
            &r.lookback.to_string(),
            &format!("{:.2}", r.entry_z),
            &format!("{:.2}", r.exit_z),
            &s.total_trades.to_string(),
            &format!("{:.1}", s.win_rate()),
            &format!("{:.6}", s.total_pnl),
            &format!("{:.3}", s.profit_factor()),
            &format!("{:.6}", s.max_drawdown),
            &s.sharpe_per_trade.map(|v| format!("{:.3}", v)).unwrap_or_default(),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Write `trades.csv` and `equity.csv` into `dir`, creating it if needed.
pub fn save_csv(report: &BacktestReport, dir: &Path) -> Result<(PathBuf, PathBuf)> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create export dir: {}", dir.display()))?;

    let trades_path = dir.join("trades.csv");
    std::fs::write(&trades_path, export_trades_csv(&report.trades)?)
        .with_context(|| format!("failed to write {}", trades_path.display()))?;

    let equity_path = dir.join("equity.csv");
    std::fs::write(&equity_path, export_equity_csv(report.equity_curve.points())?)
        .with_context(|| format!("failed to write {}", equity_path.display()))?;

    Ok((trades_path, equity_path))
}

/// Write the JSON report to `path`.
pub fn save_json(report: &BacktestReport, path: &Path) -> Result<()> {
    let json = export_json(report)?;
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}
