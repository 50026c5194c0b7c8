//! Parameter sweep over lookback × entry_z × exit_z.
//!
//! Each grid point is an independent run with its own engine, so runs execute
//! in parallel with rayon. Results keep grid order.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::backtest::{self, BacktestError};
use crate::domain::{Observation, PerformanceSummary};
use crate::strategy::EngineConfig;

/// Parameter values to combine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamGrid {
    pub lookbacks: Vec<usize>,
    /// Entry thresholds, applied to the active variant
    pub entry_zs: Vec<f64>,
    pub exit_zs: Vec<f64>,
}

impl Default for ParamGrid {
    fn default() -> Self {
        Self {
            lookbacks: vec![100, 200, 300],
            entry_zs: vec![1.5, 2.0, 2.5],
            exit_zs: vec![0.0, 0.5, 1.0],
        }
    }
}

impl ParamGrid {
    /// Number of raw combinations, before invalid ones are skipped
    pub fn size(&self) -> usize {
        self.lookbacks.len() * self.entry_zs.len() * self.exit_zs.len()
    }

    /// Expand the grid over `base`, skipping exit_z >= entry_z.
    pub fn generate_configs(&self, base: &EngineConfig) -> Vec<EngineConfig> {
        let mut configs = Vec::new();

        for &lookback in &self.lookbacks {
            for &entry_z in &self.entry_zs {
                for &exit_z in &self.exit_zs {
                    if exit_z >= entry_z {
                        continue;
                    }
                    configs.push(
                        base.clone()
                            .with_lookback(lookback)
                            .with_entry_z(entry_z)
                            .with_exit_z(exit_z),
                    );
                }
            }
        }

        configs
    }
}

/// Outcome of one grid point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepResult {
    pub lookback: usize,
    pub entry_z: f64,
    pub exit_z: f64,
    pub summary: PerformanceSummary,
}

pub struct SweepRunner {
    parallel: bool,
}

impl Default for SweepRunner {
    fn default() -> Self {
        Self { parallel: true }
    }
}

impl SweepRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Run every grid configuration over `observations`.
    ///
    /// The first failing run fails the sweep.
    pub fn sweep(
        &self,
        grid: &ParamGrid,
        base: &EngineConfig,
        observations: &[Observation],
    ) -> Result<Vec<SweepResult>, BacktestError> {
        let configs = grid.generate_configs(base);
        info!(
            "Sweeping {} configurations ({} skipped) over {} observations",
            configs.len(),
            grid.size() - configs.len(),
            observations.len()
        );

        let run_one = |config: &EngineConfig| -> Result<SweepResult, BacktestError> {
            let report = backtest::run(config.clone(), observations)?;
            Ok(SweepResult {
                lookback: config.lookback,
                entry_z: config.entry_z(),
                exit_z: config.exit_z,
                summary: report.summary,
            })
        };

        if self.parallel {
            configs.par_iter().map(run_one).collect()
        } else {
            configs.iter().map(run_one).collect()
        }
    }
}

/// Result with the highest total pnl
pub fn best_by_pnl(results: &[SweepResult]) -> Option<&SweepResult> {
    results
        .iter()
        .max_by(|a, b| a.summary.total_pnl.total_cmp(&b.summary.total_pnl))
}
