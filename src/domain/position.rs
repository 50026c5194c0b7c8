use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// Long the spread: profits when leg_b - leg_a widens back up
    Long,
    /// Short the spread: profits when leg_b - leg_a narrows back down
    Short,
}

impl Side {
    /// +1 for long, -1 for short
    pub fn sign(self) -> f64 {
        match self {
            Side::Long => 1.0,
            Side::Short => -1.0,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Long => write!(f, "LONG"),
            Side::Short => write!(f, "SHORT"),
        }
    }
}

/// The single open spread position
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub side: Side,
    pub entry_timestamp: DateTime<Utc>,
    pub entry_spread: f64,
    pub entry_z: f64,
    pub size: f64,
    /// Time-based exit horizon, fixed at entry
    pub holding_period: Duration,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PositionError {
    #[error("cannot open {requested} at {timestamp}: a {open} position is already open")]
    AlreadyOpen {
        open: Side,
        requested: Side,
        timestamp: DateTime<Utc>,
    },
    #[error("no open position to close at {0}")]
    NotOpen(DateTime<Utc>),
    #[error("Invalid position size: {0}")]
    InvalidSize(f64),
    #[error("Invalid entry spread: {0}")]
    InvalidEntrySpread(f64),
}

impl Position {
    pub fn new(
        side: Side,
        entry_timestamp: DateTime<Utc>,
        entry_spread: f64,
        entry_z: f64,
        size: f64,
        holding_period: Duration,
    ) -> Result<Self, PositionError> {
        if !size.is_finite() || size <= 0.0 {
            return Err(PositionError::InvalidSize(size));
        }
        if !entry_spread.is_finite() {
            return Err(PositionError::InvalidEntrySpread(entry_spread));
        }

        Ok(Self {
            side,
            entry_timestamp,
            entry_spread,
            entry_z,
            size,
            holding_period,
        })
    }

    /// Direction-signed spread change since entry, scaled by size
    pub fn pnl_at(&self, spread: f64) -> f64 {
        self.side.sign() * (spread - self.entry_spread) * self.size
    }

    pub fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        now - self.entry_timestamp
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.elapsed(now) >= self.holding_period
    }
}
