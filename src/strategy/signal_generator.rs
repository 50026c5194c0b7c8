//! Signal Generator
//!
//! Maps a z-score (and, in Enhanced mode, an oscillator reading) to
//! Long / Short / Flat.
//!
//! - Base: Long if z <= entry_low, Short if z >= entry_high.
//! - Enhanced: wider thresholds, and the oscillator must not already be
//!   extreme in the entry direction (Long needs osc > oversold, Short needs
//!   osc < overbought). A missing reading never confirms.
//!
//! If both directions qualify at once (entry_low > entry_high), the step is Flat.

use crate::domain::Signal;
use crate::strategy::params::{EngineConfig, StrategyVariant};

/// Entry thresholds for one mode
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntryThresholds {
    pub low: f64,
    pub high: f64,
}

impl EntryThresholds {
    /// ±`entry_z`
    pub fn symmetric(entry_z: f64) -> Self {
        Self {
            low: -entry_z,
            high: entry_z,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SignalGenerator {
    base: EntryThresholds,
    enhanced: EntryThresholds,
    oversold: f64,
    overbought: f64,
}

impl SignalGenerator {
    pub fn new(base: EntryThresholds, enhanced: EntryThresholds, oversold: f64, overbought: f64) -> Self {
        Self {
            base,
            enhanced,
            oversold,
            overbought,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            EntryThresholds::symmetric(config.entry_z_base),
            EntryThresholds::symmetric(config.entry_z_enhanced),
            config.oscillator.oversold,
            config.oscillator.overbought,
        )
    }

    pub fn classify(&self, z_score: f64, oscillator: Option<f64>, mode: StrategyVariant) -> Signal {
        if !z_score.is_finite() {
            return Signal::Flat;
        }

        let (wants_long, wants_short) = match mode {
            StrategyVariant::Base => (z_score <= self.base.low, z_score >= self.base.high),
            StrategyVariant::Enhanced => {
                let long_ok = oscillator.is_some_and(|osc| osc > self.oversold);
                let short_ok = oscillator.is_some_and(|osc| osc < self.overbought);
                (
                    z_score <= self.enhanced.low && long_ok,
                    z_score >= self.enhanced.high && short_ok,
                )
            }
        };

        match (wants_long, wants_short) {
            (true, false) => Signal::Long,
            (false, true) => Signal::Short,
            _ => Signal::Flat,
        }
    }

    pub fn thresholds(&self, mode: StrategyVariant) -> EntryThresholds {
        match mode {
            StrategyVariant::Base => self.base,
            StrategyVariant::Enhanced => self.enhanced,
        }
    }
}

impl Default for SignalGenerator {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}
