//! Ports Layer - Trait definitions for external dependencies
//!
//! The engine consumes an ordered observation stream; where that stream
//! comes from (CSV on disk, a fixture in memory) sits behind this port.

pub mod market_data;

pub use market_data::{ObservationSource, SourceError};
