//! CSV observation source.
//!
//! Expected header: `timestamp,leg_a_iv,leg_b_iv`, timestamps in RFC 3339.
//! Rows are returned in file order; the engine checks ordering and values.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::domain::Observation;
use crate::ports::{ObservationSource, SourceError};

#[derive(Debug, Deserialize)]
struct ObservationRecord {
    timestamp: DateTime<Utc>,
    leg_a_iv: f64,
    leg_b_iv: f64,
}

impl From<ObservationRecord> for Observation {
    fn from(record: ObservationRecord) -> Self {
        Observation::new(record.timestamp, record.leg_a_iv, record.leg_b_iv)
    }
}

/// Observations read from a CSV file on disk
#[derive(Debug, Clone)]
pub struct CsvObservationSource {
    path: PathBuf,
}

impl CsvObservationSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse observations from any CSV reader
    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<Observation>, SourceError> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .comment(Some(b'#'))
            .from_reader(reader);

        let mut observations = Vec::new();
        for (record, row) in rdr.deserialize::<ObservationRecord>().enumerate() {
            let row = row.map_err(|e| SourceError::ParseError {
                record: record + 1,
                message: e.to_string(),
            })?;
            observations.push(Observation::from(row));
        }

        if observations.is_empty() {
            return Err(SourceError::Empty);
        }
        debug!("parsed {} observations", observations.len());
        Ok(observations)
    }
}

impl ObservationSource for CsvObservationSource {
    fn describe(&self) -> String {
        format!("csv {}", self.path.display())
    }

    fn load(&self) -> Result<Vec<Observation>, SourceError> {
        let file = std::fs::File::open(&self.path).map_err(|source| SourceError::Io {
            path: self.path.display().to_string(),
            source,
        })?;
        let observations = Self::from_reader(file)?;
        info!("Loaded {} observations from {}", observations.len(), self.path.display());
        Ok(observations)
    }
}
