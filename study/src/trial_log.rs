//! CSV log of participant ratings.
//!
//! Rows are appended and flushed one at a time so an aborted session keeps
//! every rating given so far. The header is only written into a new or empty
//! file.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::conditions::Condition;

/// Local time with microseconds, e.g. `2024-05-03 14:02:11.052113`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

#[derive(Error, Debug)]
pub enum TrialLogError {
    #[error("Trial log IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Trial log CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// One row of the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialRecord {
    /// Participant id
    pub id: String,
    pub timestamp: String,
    /// Scenario shown in the trial
    pub task: String,
    pub framerate: u32,
    pub marker: String,
    pub rating: u8,
}

impl TrialRecord {
    pub fn new(
        participant: &str,
        condition: &Condition,
        rating: u8,
        timestamp: DateTime<Local>,
    ) -> Self {
        Self {
            id: participant.to_string(),
            timestamp: timestamp.format(TIMESTAMP_FORMAT).to_string(),
            task: condition.scenario.clone(),
            framerate: condition.framerate,
            marker: condition.marker.clone(),
            rating,
        }
    }
}

pub struct TrialLog {
    path: PathBuf,
    writer: csv::Writer<File>,
    rows: usize,
}

impl TrialLog {
    /// Open `path` for appending, creating it and its parent directories.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TrialLogError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let needs_header = file.metadata()?.len() == 0;
        let writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);

        Ok(Self {
            path: path.to_path_buf(),
            writer,
            rows: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rows written through this handle.
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn append(&mut self, record: &TrialRecord) -> Result<(), TrialLogError> {
        self.writer.serialize(record)?;
        self.writer.flush()?;
        self.rows += 1;
        Ok(())
    }

    /// Read every record of an existing log.
    pub fn read_all(path: impl AsRef<Path>) -> Result<Vec<TrialRecord>, TrialLogError> {
        let mut reader = csv::Reader::from_path(path)?;
        let records = reader.deserialize().collect::<Result<Vec<TrialRecord>, _>>()?;
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn condition() -> Condition {
        Condition {
            marker: "point".to_string(),
            scenario: "text_d".to_string(),
            framerate: 120,
        }
    }

    fn record(rating: u8) -> TrialRecord {
        let t = Local.with_ymd_and_hms(2024, 5, 3, 14, 2, 11).unwrap();
        TrialRecord::new("P07", &condition(), rating, t)
    }

    #[test]
    fn test_record_fields() {
        let r = record(4);
        assert_eq!(r.id, "P07");
        assert_eq!(r.timestamp, "2024-05-03 14:02:11.000000");
        assert_eq!(r.task, "text_d");
        assert_eq!(r.framerate, 120);
        assert_eq!(r.marker, "point");
    }

    #[test]
    fn test_header_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logfiles").join("log.csv");

        let mut log = TrialLog::open(&path).unwrap();
        log.append(&record(1)).unwrap();
        drop(log);

        let mut log = TrialLog::open(&path).unwrap();
        log.append(&record(5)).unwrap();
        assert_eq!(log.rows(), 1);
        drop(log);

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "id,timestamp,task,framerate,marker,rating");
        assert!(lines[1].starts_with("P07,2024-05-03 14:02:11.000000,text_d,120,point,1"));

        let records = TrialLog::read_all(&path).unwrap();
        assert_eq!(records, vec![record(1), record(5)]);
    }

    #[test]
    fn test_existing_empty_file_gets_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.csv");
        std::fs::write(&path, "").unwrap();

        let mut log = TrialLog::open(&path).unwrap();
        log.append(&record(3)).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("id,timestamp"));
    }
}
