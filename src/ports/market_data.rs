use thiserror::Error;

use crate::domain::Observation;

/// Observation source error type
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("I/O error reading {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Data parsing error at record {record}: {message}")]
    ParseError { record: usize, message: String },

    #[error("Source contained no observations")]
    Empty,
}

/// Source of historical paired IV observations.
///
/// Implementations return observations in input order; validation of the
/// stream contract happens in the engine, not here.
pub trait ObservationSource {
    /// Human-readable description for logs
    fn describe(&self) -> String;

    /// Load every observation from the source
    fn load(&self) -> Result<Vec<Observation>, SourceError>;
}

impl ObservationSource for Vec<Observation> {
    fn describe(&self) -> String {
        format!("in-memory ({} observations)", self.len())
    }

    fn load(&self) -> Result<Vec<Observation>, SourceError> {
        Ok(self.clone())
    }
}
