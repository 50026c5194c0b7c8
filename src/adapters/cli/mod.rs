//! CLI Adapter
//!
//! Command-line interface for the iv-spread engine.
//! Uses clap derive macros for argument parsing.

mod commands;

pub use commands::{
    resolve_backtest_config, BacktestCmd, CliApp, Command, ModeArg, SweepCmd, ValidateConfigCmd,
};

use anyhow::Result;

/// Initialize the CLI application
pub fn init() -> CliApp {
    use clap::Parser;
    CliApp::parse()
}

/// Execute the CLI command
pub fn execute(app: CliApp) -> Result<()> {
    commands::execute(app)
}
