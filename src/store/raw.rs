//! Append-only audit log of routed journal lines.
//!
//! Unlike the keyed tables, raw texts carry no natural key: the same line
//! is legitimately logged again when a photo is re-submitted.

use anyhow::{anyhow, Context, Result};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use super::records::RawTextRecord;

pub struct RawTextLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl RawTextLog {
    pub fn open(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    /// Appends one audit row.
    pub fn append(&self, record: &RawTextRecord) -> Result<()> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| anyhow!("Audit log lock poisoned: {}", self.path.display()))?;
        let line = serde_json::to_string(record).context("Failed to serialize audit row")?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .context(format!("Failed to open audit log: {}", self.path.display()))?;
        writeln!(file, "{}", line)
            .context(format!("Failed to append to audit log: {}", self.path.display()))?;
        Ok(())
    }

    /// Reads every audit row. Malformed rows are skipped with a warning.
    pub fn read_all(&self) -> Result<Vec<RawTextRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let contents = std::fs::read_to_string(&self.path)
            .context(format!("Failed to read audit log: {}", self.path.display()))?;
        let mut records = Vec::new();
        for (line_num, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(line) {
                Ok(record) => records.push(record),
                Err(e) => {
                    crate::log(&format!(
                        "Warning: skipping malformed audit row {} in {}: {}",
                        line_num + 1,
                        self.path.display(),
                        e
                    ));
                }
            }
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn make_record(parsed: bool) -> RawTextRecord {
        RawTextRecord {
            dt: 100,
            message: "в результате события получено: скорпион (3".to_string(),
            kind: "creature".to_string(),
            source_file: "1678769672_42.jpg".to_string(),
            parsed,
        }
    }

    #[test]
    fn test_append_and_read() {
        let dir = tempdir().unwrap();
        let log = RawTextLog::open(dir.path().join("raw_texts.jsonl"));

        log.append(&make_record(true)).unwrap();
        log.append(&make_record(false)).unwrap();

        let rows = log.read_all().unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].parsed);
        assert!(!rows[1].parsed);
    }

    #[test]
    fn test_duplicates_are_allowed() {
        let dir = tempdir().unwrap();
        let log = RawTextLog::open(dir.path().join("raw_texts.jsonl"));

        log.append(&make_record(true)).unwrap();
        log.append(&make_record(true)).unwrap();
        assert_eq!(log.read_all().unwrap().len(), 2);
    }

    #[test]
    fn test_read_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let log = RawTextLog::open(dir.path().join("raw_texts.jsonl"));
        assert!(log.read_all().unwrap().is_empty());
    }
}
