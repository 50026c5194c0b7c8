use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::position::{Position, Side};

/// Why a position was closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    StopLoss,
    Timeout,
    Reversion,
    EndOfData,
}

impl ExitReason {
    pub const ALL: [ExitReason; 4] = [
        ExitReason::StopLoss,
        ExitReason::Timeout,
        ExitReason::Reversion,
        ExitReason::EndOfData,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExitReason::StopLoss => "stop_loss",
            ExitReason::Timeout => "timeout",
            ExitReason::Reversion => "reversion",
            ExitReason::EndOfData => "end_of_data",
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable record of a closed position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub direction: Side,
    pub entry_timestamp: DateTime<Utc>,
    pub exit_timestamp: DateTime<Utc>,
    pub entry_spread: f64,
    pub exit_spread: f64,
    pub entry_z: f64,
    pub exit_z: f64,
    pub size: f64,
    pub pnl: f64,
    pub exit_reason: ExitReason,
}

impl Trade {
    /// Build the ledger record for `position` closed at `exit_spread`
    pub fn close(
        position: &Position,
        exit_timestamp: DateTime<Utc>,
        exit_spread: f64,
        exit_z: f64,
        exit_reason: ExitReason,
    ) -> Self {
        Self {
            direction: position.side,
            entry_timestamp: position.entry_timestamp,
            exit_timestamp,
            entry_spread: position.entry_spread,
            exit_spread,
            entry_z: position.entry_z,
            exit_z,
            size: position.size,
            pnl: position.pnl_at(exit_spread),
            exit_reason,
        }
    }

    pub fn holding_minutes(&self) -> i64 {
        (self.exit_timestamp - self.entry_timestamp).num_minutes()
    }

    pub fn is_win(&self) -> bool {
        self.pnl > 0.0
    }
}

impl fmt::Display for Trade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:.4} -> {:.4} ({}, {}m) pnl {:+.4}",
            self.direction,
            self.entry_spread,
            self.exit_spread,
            self.exit_reason,
            self.holding_minutes(),
            self.pnl
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn position(side: Side, entry_spread: f64) -> Position {
        let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
        Position::new(side, t0, entry_spread, -2.4, 3.0, Duration::minutes(45)).unwrap()
    }

    #[test]
    fn test_trade_from_position() {
        let pos = position(Side::Long, -0.05);
        let exit = pos.entry_timestamp + Duration::minutes(12);
        let trade = Trade::close(&pos, exit, -0.01, -0.3, ExitReason::Reversion);

        assert_eq!(trade.direction, Side::Long);
        assert_eq!(trade.exit_reason, ExitReason::Reversion);
        assert_eq!(trade.holding_minutes(), 12);
        assert!((trade.pnl - 0.12).abs() < 1e-12);
        assert!(trade.is_win());
    }

    #[test]
    fn test_short_trade_loss() {
        let pos = position(Side::Short, 0.02);
        let trade = Trade::close(&pos, pos.entry_timestamp, 0.03, 3.1, ExitReason::StopLoss);
        assert!(trade.pnl < 0.0);
        assert!(!trade.is_win());
    }

    #[test]
    fn test_exit_reason_strings() {
        let names: Vec<&str> = ExitReason::ALL.iter().map(|r| r.as_str()).collect();
        assert_eq!(names, vec!["stop_loss", "timeout", "reversion", "end_of_data"]);
        assert_eq!(
            serde_json::to_string(&ExitReason::EndOfData).unwrap(),
            "\"end_of_data\""
        );
    }

    #[test]
    fn test_display_trade() {
        let pos = position(Side::Long, -0.05);
        let trade = Trade::close(
            &pos,
            pos.entry_timestamp + Duration::minutes(45),
            -0.05,
            -2.0,
            ExitReason::Timeout,
        );
        let text = trade.to_string();
        assert!(text.starts_with("LONG"));
        assert!(text.contains("timeout"));
        assert!(text.contains("45m"));
    }
}
