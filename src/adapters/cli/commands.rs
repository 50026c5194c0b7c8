//! CLI Command Handlers
//!
//! Implementation of all CLI commands for the iv-spread engine.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

use crate::adapters::export;
use crate::adapters::market_data::CsvObservationSource;
use crate::application::{self, best_by_pnl, BacktestReport, ParamGrid, SweepRunner};
use crate::config::{load_config, read_config};
use crate::domain::{ExitReason, Observation};
use crate::ports::ObservationSource;
use crate::strategy::{EngineConfig, StrategyVariant};

/// iv-spread - Implied-volatility spread mean reversion engine
#[derive(Parser, Debug)]
#[command(
    name = "iv-spread",
    version = env!("CARGO_PKG_VERSION"),
    author = env!("CARGO_PKG_AUTHORS"),
    about = "Implied-volatility spread mean reversion engine",
    long_about = "iv-spread filters the spread between two implied-volatility series, \
                  standardizes it against a rolling window and trades reversion with \
                  stop-loss, timeout and reversion exits."
)]
pub struct CliApp {
    /// The command to execute
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest over historical IV observations
    Backtest(BacktestCmd),

    /// Sweep lookback / entry / exit thresholds in parallel
    Sweep(SweepCmd),

    /// Load and validate a configuration file
    ValidateConfig(ValidateConfigCmd),
}

/// Strategy variant selectable on the command line
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModeArg {
    Base,
    Enhanced,
}

impl From<ModeArg> for StrategyVariant {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Base => StrategyVariant::Base,
            ModeArg::Enhanced => StrategyVariant::Enhanced,
        }
    }
}

/// Run a backtest
#[derive(Parser, Debug)]
pub struct BacktestCmd {
    /// CSV file with timestamp,leg_a_iv,leg_b_iv columns
    #[arg(short = 'i', long, value_name = "FILE")]
    pub data: PathBuf,

    /// Path to configuration file (defaults apply when omitted)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Strategy variant override
    #[arg(short, long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Override lookback period
    #[arg(long, value_name = "BARS")]
    pub lookback: Option<usize>,

    /// Override the active variant's entry threshold
    #[arg(long, value_name = "Z")]
    pub entry_z: Option<f64>,

    /// Override exit threshold
    #[arg(long, value_name = "Z")]
    pub exit_z: Option<f64>,

    /// Print every closed trade
    #[arg(short, long)]
    pub trades: bool,

    /// Write trades.csv and equity.csv into this directory
    #[arg(long, value_name = "DIR")]
    pub export_csv: Option<PathBuf>,

    /// Write the full report as JSON
    #[arg(long, value_name = "FILE")]
    pub export_json: Option<PathBuf>,
}

/// Run a parameter sweep
#[derive(Parser, Debug)]
pub struct SweepCmd {
    /// CSV file with timestamp,leg_a_iv,leg_b_iv columns
    #[arg(short = 'i', long, value_name = "FILE")]
    pub data: PathBuf,

    /// Path to configuration file (defaults apply when omitted)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Strategy variant override
    #[arg(short, long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Lookbacks to test
    #[arg(long, value_delimiter = ',', default_value = "100,200,300")]
    pub lookbacks: Vec<usize>,

    /// Entry thresholds to test
    #[arg(long, value_delimiter = ',', default_value = "1.5,2.0,2.5")]
    pub entry_zs: Vec<f64>,

    /// Exit thresholds to test
    #[arg(long, value_delimiter = ',', default_value = "0.0,0.5,1.0")]
    pub exit_zs: Vec<f64>,

    /// Run configurations one at a time
    #[arg(long)]
    pub sequential: bool,

    /// Write results as CSV
    #[arg(long, value_name = "FILE")]
    pub export_csv: Option<PathBuf>,
}

/// Validate configuration
#[derive(Parser, Debug)]
pub struct ValidateConfigCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config/default.toml")]
    pub config: PathBuf,
}

/// Execute the CLI command
pub fn execute(app: CliApp) -> Result<()> {
    // Initialize logging based on flags
    init_logging(app.verbose, app.debug)?;

    match app.command {
        Command::Backtest(cmd) => backtest_command(cmd),
        Command::Sweep(cmd) => sweep_command(cmd),
        Command::ValidateConfig(cmd) => validate_config_command(cmd),
    }
}

/// Initialize logging system
fn init_logging(verbose: bool, debug: bool) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = if debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))?;

    Ok(())
}

/// Expand `~` in a user-supplied path
fn expand(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned())
}

/// Config file (or defaults) with the variant override applied.
///
/// Not validated here; callers validate once every override is in.
fn base_config(config: Option<&Path>, mode: Option<ModeArg>) -> Result<EngineConfig> {
    let mut engine = match config {
        Some(path) => {
            let path = expand(path);
            read_config(&path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?
                .engine_config()
        }
        None => EngineConfig::default(),
    };
    if let Some(mode) = mode {
        engine = engine.with_variant(mode.into());
    }
    Ok(engine)
}

/// Apply backtest overrides on top of the loaded configuration
pub fn resolve_backtest_config(cmd: &BacktestCmd) -> Result<EngineConfig> {
    let mut engine = base_config(cmd.config.as_deref(), cmd.mode)?;
    if let Some(lookback) = cmd.lookback {
        engine = engine.with_lookback(lookback);
    }
    if let Some(entry_z) = cmd.entry_z {
        engine = engine.with_entry_z(entry_z);
    }
    if let Some(exit_z) = cmd.exit_z {
        engine = engine.with_exit_z(exit_z);
    }
    engine.validate().context("Invalid configuration after overrides")?;
    Ok(engine)
}

fn load_observations(path: &Path) -> Result<Vec<Observation>> {
    let source = CsvObservationSource::new(expand(path));
    source
        .load()
        .with_context(|| format!("Failed to load observations from {}", source.describe()))
}

/// Handle backtest command
fn backtest_command(cmd: BacktestCmd) -> Result<()> {
    let config = resolve_backtest_config(&cmd)?;
    let observations = load_observations(&cmd.data)?;

    let report = application::run(config, &observations).context("Backtest failed")?;
    print_report(&report, cmd.trades);

    if let Some(ref dir) = cmd.export_csv {
        let (trades, equity) = export::save_csv(&report, &expand(dir))?;
        println!("  Exported: {}, {}", trades.display(), equity.display());
    }
    if let Some(ref path) = cmd.export_json {
        let path = expand(path);
        export::save_json(&report, &path)?;
        println!("  Exported: {}", path.display());
    }

    Ok(())
}

/// Handle sweep command
fn sweep_command(cmd: SweepCmd) -> Result<()> {
    let base = base_config(cmd.config.as_deref(), cmd.mode)?;
    let observations = load_observations(&cmd.data)?;

    let grid = ParamGrid {
        lookbacks: cmd.lookbacks,
        entry_zs: cmd.entry_zs,
        exit_zs: cmd.exit_zs,
    };
    let results = SweepRunner::new()
        .with_parallelism(!cmd.sequential)
        .sweep(&grid, &base, &observations)
        .context("Sweep failed")?;

    println!("{:>8} {:>7} {:>6} {:>7} {:>7} {:>12} {:>10}", "lookback", "entry", "exit", "trades", "win%", "pnl", "max_dd");
    for r in &results {
        println!(
            "{:>8} {:>7.2} {:>6.2} {:>7} {:>7.1} {:>12.6} {:>10.6}",
            r.lookback,
            r.entry_z,
            r.exit_z,
            r.summary.total_trades,
            r.summary.win_rate(),
            r.summary.total_pnl,
            r.summary.max_drawdown
        );
    }
    if let Some(best) = best_by_pnl(&results) {
        println!(
            "\nBest: lookback {} entry {:.2} exit {:.2} pnl {:+.6}",
            best.lookback, best.entry_z, best.exit_z, best.summary.total_pnl
        );
    }

    if let Some(ref path) = cmd.export_csv {
        let path = expand(path);
        std::fs::write(&path, export::export_sweep_csv(&results)?)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Exported: {}", path.display());
    }

    Ok(())
}

/// Handle validate-config command
fn validate_config_command(cmd: ValidateConfigCmd) -> Result<()> {
    let path = expand(&cmd.config);
    let config = load_config(&path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
    let engine = config.engine_config();

    println!("✓ {} is valid", path.display());
    println!("  Variant:   {}", engine.variant);
    println!("  Lookback:  {}", engine.lookback);
    println!("  Entry |z|: {} (base {}, enhanced {})", engine.entry_z(), engine.entry_z_base, engine.entry_z_enhanced);
    println!("  Exit |z|:  {}", engine.exit_z);
    println!("  Holding:   {:?}", engine.risk.holding_period);
    println!("  Stop:      {:?}", engine.risk.stop_loss);
    Ok(())
}

fn print_report(report: &BacktestReport, show_trades: bool) {
    let s = &report.summary;
    let config = &report.config;

    println!("Backtest Results");
    println!("  Variant:        {}", config.variant);
    println!("  Lookback:       {}", config.lookback);
    println!("  Entry / Exit:   {:.2} / {:.2}", config.entry_z(), config.exit_z);
    println!("  Observations:   {}", report.observations);
    println!("  Trades:         {} ({} wins, {} losses)", s.total_trades, s.winning_trades, s.losing_trades);
    println!("  Win rate:       {:.1}%", s.win_rate());
    println!("  Total pnl:      {:+.6}", s.total_pnl);
    println!("  Avg win/loss:   {:+.6} / {:+.6}", s.avg_win, s.avg_loss);
    println!("  Profit factor:  {:.3}", s.profit_factor());
    println!("  Max drawdown:   {:.6}", s.max_drawdown);
    match s.sharpe_per_trade {
        Some(sharpe) => println!("  Sharpe/trade:   {:.3}", sharpe),
        None => println!("  Sharpe/trade:   n/a (< {} trades)", crate::domain::PerformanceSummary::MIN_TRADES_FOR_SHARPE),
    }
    for reason in ExitReason::ALL {
        println!("  Exits {:<12} {}", format!("{}:", reason), s.exit_count(reason));
    }

    if show_trades {
        println!();
        for trade in &report.trades {
            println!("  {} {}", trade.entry_timestamp.format("%Y-%m-%d %H:%M"), trade);
        }
    }
}
