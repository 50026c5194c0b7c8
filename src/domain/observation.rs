//! Paired implied-volatility observations and input validation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One unit of input: both legs' implied volatility at a single bar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub timestamp: DateTime<Utc>,
    pub leg_a_iv: f64,
    pub leg_b_iv: f64,
}

/// Which leg of the pair a value belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Leg {
    A,
    B,
}

impl std::fmt::Display for Leg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Leg::A => write!(f, "leg_a_iv"),
            Leg::B => write!(f, "leg_b_iv"),
        }
    }
}

/// Input stream violations. A run that hits one of these is rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataError {
    #[error("observation {index} at {timestamp}: {leg} is not finite ({value})")]
    NonFiniteIv {
        index: usize,
        timestamp: DateTime<Utc>,
        leg: Leg,
        value: f64,
    },
    #[error("observation {index} at {timestamp}: {leg} is negative ({value})")]
    NegativeIv {
        index: usize,
        timestamp: DateTime<Utc>,
        leg: Leg,
        value: f64,
    },
    #[error("observation {index}: timestamp {current} does not follow {previous}")]
    NonMonotonicTimestamp {
        index: usize,
        previous: DateTime<Utc>,
        current: DateTime<Utc>,
    },
}

impl Observation {
    pub fn new(timestamp: DateTime<Utc>, leg_a_iv: f64, leg_b_iv: f64) -> Self {
        Self {
            timestamp,
            leg_a_iv,
            leg_b_iv,
        }
    }

    /// Spread traded by the engine: `leg_b_iv - leg_a_iv`
    pub fn spread(&self) -> f64 {
        self.leg_b_iv - self.leg_a_iv
    }

    /// Check this observation against the stream contract.
    ///
    /// `index` is the position in the input sequence and `previous` the
    /// timestamp of the last accepted observation, if any.
    pub fn validate(
        &self,
        index: usize,
        previous: Option<DateTime<Utc>>,
    ) -> Result<(), DataError> {
        for (leg, value) in [(Leg::A, self.leg_a_iv), (Leg::B, self.leg_b_iv)] {
            if !value.is_finite() {
                return Err(DataError::NonFiniteIv {
                    index,
                    timestamp: self.timestamp,
                    leg,
                    value,
                });
            }
            if value < 0.0 {
                return Err(DataError::NegativeIv {
                    index,
                    timestamp: self.timestamp,
                    leg,
                    value,
                });
            }
        }

        if let Some(previous) = previous {
            if self.timestamp <= previous {
                return Err(DataError::NonMonotonicTimestamp {
                    index,
                    previous,
                    current: self.timestamp,
                });
            }
        }

        Ok(())
    }
}
