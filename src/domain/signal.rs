use serde::{Deserialize, Serialize};
use std::fmt;

use super::position::Side;

/// Per-step classification emitted by the signal generator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    Long,
    Short,
    Flat,
}

impl Signal {
    /// Side a position would take on this signal, `None` for Flat
    pub fn side(&self) -> Option<Side> {
        match self {
            Signal::Long => Some(Side::Long),
            Signal::Short => Some(Side::Short),
            Signal::Flat => None,
        }
    }

    pub fn is_entry(&self) -> bool {
        !matches!(self, Signal::Flat)
    }

    /// Two-sided confidence that a deviation of `z_score` is not noise.
    ///
    /// Standard normal: 2 * Φ(|z|) - 1, in [0, 1).
    pub fn confidence(z_score: f64) -> f64 {
        use statrs::function::erf::erf;
        if !z_score.is_finite() {
            return 0.0;
        }
        erf(z_score.abs() / f64::sqrt(2.0))
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Long => write!(f, "Long"),
            Signal::Short => write!(f, "Short"),
            Signal::Flat => write!(f, "Flat"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_signal_side() {
        assert_eq!(Signal::Long.side(), Some(Side::Long));
        assert_eq!(Signal::Short.side(), Some(Side::Short));
        assert_eq!(Signal::Flat.side(), None);
        assert!(Signal::Long.is_entry());
        assert!(!Signal::Flat.is_entry());
    }

    #[test]
    fn test_confidence_calculation() {
        assert_relative_eq!(Signal::confidence(0.0), 0.0, epsilon = 0.001);
        assert_relative_eq!(Signal::confidence(1.0), 0.683, epsilon = 0.001);
        assert_relative_eq!(Signal::confidence(-2.0), 0.954, epsilon = 0.001);
        assert_relative_eq!(Signal::confidence(2.5), 0.988, epsilon = 0.001);
        assert_eq!(Signal::confidence(f64::NAN), 0.0);
    }
}
