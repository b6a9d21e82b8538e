//! Append-only kill-stat history, one JSON line per snapshot batch.
//!
//! The keyed kill-stat table answers "has this row been stored"; this log
//! answers "what did this user's last two snapshots look like", which is all
//! the differ needs. It is also the source for maintenance re-imports of the
//! kill-stat table.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

/// One ranking-page snapshot: every alliance's kill count at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsBatch {
    /// Snapshot time, `YYYY-MM-DD HH:MM:SS`.
    pub date: String,
    /// Snapshot time, epoch seconds (UTC).
    pub date_sec: i64,
    pub user_id: i64,
    pub username: String,
    /// Alliance tag → cumulative kills.
    pub stats: BTreeMap<String, i64>,
}

pub struct HistoryLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl HistoryLog {
    pub fn open(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    /// Appends one snapshot batch.
    pub fn append(&self, batch: &StatsBatch) -> Result<()> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| anyhow!("History lock poisoned: {}", self.path.display()))?;
        let line = serde_json::to_string(batch).context("Failed to serialize snapshot batch")?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .context(format!("Failed to open history: {}", self.path.display()))?;
        writeln!(file, "{}", line)
            .context(format!("Failed to append to history: {}", self.path.display()))?;
        Ok(())
    }

    /// Reads every snapshot batch, in file order.
    /// Malformed lines are skipped with a warning.
    pub fn read_all(&self) -> Result<Vec<StatsBatch>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let contents = std::fs::read_to_string(&self.path)
            .context(format!("Failed to read history: {}", self.path.display()))?;
        let mut batches = Vec::new();
        for (line_num, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(line) {
                Ok(batch) => batches.push(batch),
                Err(e) => {
                    crate::log(&format!(
                        "Warning: skipping malformed history line {} in {}: {}",
                        line_num + 1,
                        self.path.display(),
                        e
                    ));
                }
            }
        }
        Ok(batches)
    }

    /// Reads one user's snapshot batches, in file order.
    pub fn read_user(&self, user_id: i64) -> Result<Vec<StatsBatch>> {
        Ok(self
            .read_all()?
            .into_iter()
            .filter(|batch| batch.user_id == user_id)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn make_batch(user_id: i64, date_sec: i64, kills: i64) -> StatsBatch {
        StatsBatch {
            date: "2023-03-14 04:54:32".to_string(),
            date_sec,
            user_id,
            username: "scout".to_string(),
            stats: BTreeMap::from([("BaS".to_string(), kills)]),
        }
    }

    #[test]
    fn test_append_and_read_roundtrip() {
        let dir = tempdir().unwrap();
        let log = HistoryLog::open(dir.path().join("stats_history.jsonl"));

        log.append(&make_batch(42, 100, 10)).unwrap();
        log.append(&make_batch(42, 200, 25)).unwrap();

        let batches = log.read_all().unwrap();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].stats["BaS"], 10);
        assert_eq!(batches[1].stats["BaS"], 25);
    }

    #[test]
    fn test_read_user_filters() {
        let dir = tempdir().unwrap();
        let log = HistoryLog::open(dir.path().join("stats_history.jsonl"));

        log.append(&make_batch(42, 100, 10)).unwrap();
        log.append(&make_batch(7, 150, 99)).unwrap();
        log.append(&make_batch(42, 200, 25)).unwrap();

        let batches = log.read_user(42).unwrap();
        assert_eq!(batches.len(), 2);
        assert!(batches.iter().all(|b| b.user_id == 42));
    }

    #[test]
    fn test_malformed_lines_skipped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stats_history.jsonl");
        let good = serde_json::to_string(&make_batch(42, 100, 10)).unwrap();
        std::fs::write(&path, format!("garbage\n{}\n", good)).unwrap();

        let log = HistoryLog::open(path);
        assert_eq!(log.read_all().unwrap().len(), 1);
    }
}
