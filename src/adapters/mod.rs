//! Adapters Layer - External System Implementations
//!
//! - CLI: Command-line interface handlers
//! - Market Data: CSV observation source
//! - Export: CSV and JSON report writers

pub mod cli;
pub mod export;
pub mod market_data;

pub use cli::CliApp;
pub use market_data::CsvObservationSource;
