//! Streaming Relative Strength Index over the spread.
//!
//! Wilder smoothing of average gains and losses:
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss).
//! The first value is available after `period` changes (period + 1 inputs),
//! seeded with simple averages. No movement at all reads 50.

#[derive(Debug, Clone)]
pub struct RsiOscillator {
    period: usize,
    prev: Option<f64>,
    changes_seen: usize,
    avg_gain: f64,
    avg_loss: f64,
    value: Option<f64>,
}

impl RsiOscillator {
    pub fn new(period: usize) -> Self {
        Self {
            period: period.max(1),
            prev: None,
            changes_seen: 0,
            avg_gain: 0.0,
            avg_loss: 0.0,
            value: None,
        }
    }

    /// Feed the next value; returns the RSI once warmed up
    pub fn update(&mut self, value: f64) -> Option<f64> {
        let prev = self.prev.replace(value)?;

        let change = value - prev;
        let gain = change.max(0.0);
        let loss = (-change).max(0.0);
        self.changes_seen += 1;

        if self.changes_seen <= self.period {
            // Seed phase: accumulate sums, average on the last seed change
            self.avg_gain += gain;
            self.avg_loss += loss;
            if self.changes_seen == self.period {
                self.avg_gain /= self.period as f64;
                self.avg_loss /= self.period as f64;
                self.value = Some(compute_rsi(self.avg_gain, self.avg_loss));
            }
        } else {
            let alpha = 1.0 / self.period as f64;
            self.avg_gain = alpha * gain + (1.0 - alpha) * self.avg_gain;
            self.avg_loss = alpha * loss + (1.0 - alpha) * self.avg_loss;
            self.value = Some(compute_rsi(self.avg_gain, self.avg_loss));
        }

        self.value
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }

    pub fn is_ready(&self) -> bool {
        self.value.is_some()
    }

    pub fn period(&self) -> usize {
        self.period
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.period);
    }
}

fn compute_rsi(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 && avg_gain == 0.0 {
        50.0
    } else if avg_loss == 0.0 {
        100.0
    } else if avg_gain == 0.0 {
        0.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}
