//! Tabular observation feed
//!
//! One row per target. The target id sits in the `Aircraft ID` column and
//! each receiver's reception time in a `Time at Tower <id> (sec)` column.
//! Other columns (serial number, heading, ground speed) are ignored.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

use crate::processing::batch::{TargetObservations, TimedReception};

/// Column holding the target id
pub const TARGET_ID_COLUMN: &str = "Aircraft ID";

/// Column holding the reception time of receiver `receiver_id`
pub fn reception_time_column(receiver_id: &str) -> String {
    format!("Time at Tower {} (sec)", receiver_id)
}

/// Observation feed errors
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Missing required column '{0}'")]
    MissingColumn(String),

    #[error("Row {row}: invalid time '{value}' in column '{column}'")]
    InvalidTime { row: usize, column: String, value: String },

    #[error("Row {row}: empty target id")]
    EmptyTargetId { row: usize },
}

impl TargetObservations {
    /// Read one target per CSV row for the given receiver ids.
    ///
    /// Every receiver needs a time column; a missing column fails the whole
    /// feed. An empty time cell leaves that receiver out of the target's
    /// receptions, which the solver later reports as a mismatch.
    pub fn from_csv_reader<R: Read>(reader: R, receiver_ids: &[&str]) -> Result<Vec<TargetObservations>, FeedError> {
        let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let headers = reader.headers()?.clone();
        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| FeedError::MissingColumn(name.to_string()))
        };

        let id_index = column(TARGET_ID_COLUMN)?;
        let time_columns = receiver_ids
            .iter()
            .map(|id| {
                let name = reception_time_column(id);
                column(&name).map(|index| (id.to_string(), name, index))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut targets = Vec::new();
        for (i, record) in reader.records().enumerate() {
            let record = record?;
            // Header is line 1
            let row = i + 2;

            let target_id = record.get(id_index).unwrap_or_default();
            if target_id.is_empty() {
                return Err(FeedError::EmptyTargetId { row });
            }

            let mut receptions = Vec::with_capacity(time_columns.len());
            for (receiver_id, name, index) in &time_columns {
                let cell = record.get(*index).unwrap_or_default();
                if cell.is_empty() {
                    continue;
                }
                let time_s = cell.parse::<f64>().map_err(|_| FeedError::InvalidTime {
                    row,
                    column: name.clone(),
                    value: cell.to_string(),
                })?;
                receptions.push(TimedReception {
                    receiver_id: receiver_id.clone(),
                    time_s,
                });
            }

            targets.push(TargetObservations {
                target_id: target_id.to_string(),
                receptions,
            });
        }

        debug!(targets = targets.len(), receivers = receiver_ids.len(), "Parsed observation feed");
        Ok(targets)
    }

    /// Read a CSV observation file
    pub fn from_csv_path<P: AsRef<Path>>(path: P, receiver_ids: &[&str]) -> Result<Vec<TargetObservations>, FeedError> {
        let file = File::open(&path).map_err(|source| FeedError::Io {
            path: path.as_ref().to_string_lossy().to_string(),
            source,
        })?;
        Self::from_csv_reader(file, receiver_ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOWERS: [&str; 5] = ["1", "2", "3", "4", "5"];

    const HEADER: &str = "Serial No.,Aircraft ID,Heading,Ground Speed (knots),Time at Tower 1 (sec),Time at Tower 2 (sec),Time at Tower 3 (sec),Time at Tower 4 (sec),Time at Tower 5 (sec)";

    #[test]
    fn test_reads_aircraft_rows() {
        let data = format!(
            "{}\n1,VT-ABC,270,250,0.0000101,0.0000112,0.0000098,0.0000105,0.0000110\n2, VT-XYZ ,90,180,1.5,1.6,1.7,1.8,1.9\n",
            HEADER
        );
        let targets = TargetObservations::from_csv_reader(data.as_bytes(), &TOWERS).unwrap();
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].target_id, "VT-ABC");
        assert_eq!(targets[0].receptions.len(), 5);
        assert_eq!(targets[0].receptions[2].receiver_id, "3");
        assert!((targets[0].receptions[2].time_s - 0.0000098).abs() < 1e-15);
        assert_eq!(targets[1].target_id, "VT-XYZ");

        let observation = targets[1].to_observation().unwrap();
        assert_eq!(observation.get("5"), Some(1.9));
    }

    #[test]
    fn test_header_only_file() {
        let targets = TargetObservations::from_csv_reader(HEADER.as_bytes(), &TOWERS).unwrap();
        assert!(targets.is_empty());
    }

    #[test]
    fn test_missing_column() {
        let data = "Aircraft ID,Time at Tower 1 (sec),Time at Tower 2 (sec),Time at Tower 3 (sec),Time at Tower 4 (sec)\nVT-ABC,1,2,3,4\n";
        match TargetObservations::from_csv_reader(data.as_bytes(), &TOWERS) {
            Err(FeedError::MissingColumn(name)) => assert_eq!(name, "Time at Tower 5 (sec)"),
            other => panic!("unexpected result: {:?}", other),
        }

        let data = "Serial No.,Time at Tower 1 (sec)\n1,0.5\n";
        let err = TargetObservations::from_csv_reader(data.as_bytes(), &["1"]).unwrap_err();
        assert!(matches!(err, FeedError::MissingColumn(ref name) if name == TARGET_ID_COLUMN));
    }

    #[test]
    fn test_invalid_and_empty_cells() {
        let data = "Aircraft ID,Time at Tower 1 (sec),Time at Tower 2 (sec)\nA,0.1,\nB,0.1,soon\n";
        match TargetObservations::from_csv_reader(data.as_bytes(), &["1", "2"]) {
            Err(FeedError::InvalidTime { row, column, value }) => {
                assert_eq!(row, 3);
                assert_eq!(column, "Time at Tower 2 (sec)");
                assert_eq!(value, "soon");
            }
            other => panic!("unexpected result: {:?}", other),
        }

        let data = "Aircraft ID,Time at Tower 1 (sec),Time at Tower 2 (sec)\nA,0.1,\n";
        let targets = TargetObservations::from_csv_reader(data.as_bytes(), &["1", "2"]).unwrap();
        assert_eq!(targets[0].receptions.len(), 1);
    }

    #[test]
    fn test_missing_file() {
        let err = TargetObservations::from_csv_path("/nonexistent/observations.csv", &TOWERS).unwrap_err();
        assert!(matches!(err, FeedError::Io { .. }));
    }
}
