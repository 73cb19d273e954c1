//! Append-only JSON-lines journal for persisted rows. The durable store
//! itself (time-series tick store,
//! relational trade log) is an external collaborator; this just gives a
//! downstream process something to tail.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use parking_lot::Mutex;
use serde::Serialize;

use crate::error::ConfigError;

pub struct Journal {
    file: Mutex<File>,
}

impl Journal {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| ConfigError::ReadFile { path: path.display().to_string(), source })?;
        Ok(Self { file: Mutex::new(file) })
    }

    /// Serialize `record` and append it as one JSON line. Failures are
    /// logged by the caller rather than treated as fatal: a dropped journal
    /// line must never stop the trading loop.
    pub fn append<T: Serialize>(&self, record: &T) -> std::io::Result<()> {
        let line = serde_json::to_string(record).map_err(std::io::Error::other)?;
        let mut file = self.file.lock();
        writeln!(file, "{line}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::NamedTempFile;

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Row {
        id: u32,
        name: String,
    }

    #[test]
    fn append_writes_one_json_line_per_call() {
        let tmp = NamedTempFile::new().unwrap();
        let journal = Journal::open(tmp.path()).unwrap();
        journal.append(&Row { id: 1, name: "a".into() }).unwrap();
        journal.append(&Row { id: 2, name: "b".into() }).unwrap();

        let contents = std::fs::read_to_string(tmp.path()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        let row: Row = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(row, Row { id: 1, name: "a".into() });
    }
}
