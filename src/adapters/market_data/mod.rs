//! Market Data Adapters
//!
//! Historical IV sources feeding the backtest engine:
//! - `CsvObservationSource`: `timestamp,leg_a_iv,leg_b_iv` files

mod csv_source;

pub use csv_source::CsvObservationSource;
