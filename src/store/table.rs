//! Append-only JSON-lines tables with natural-key dedup.
//!
//! Each logical table is one file, one JSON object per line. Rows are only
//! ever appended; the file is reopened per write so a crash loses at most
//! the row being written. The natural-key index is rebuilt from the file at
//! open and consulted under a lock before every insert, which is what makes
//! concurrent duplicate submissions collapse into a single row.

use anyhow::{anyhow, Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

/// Result of an insert attempt against a natural key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    AlreadyExists,
}

/// Types stored under a composite natural key.
pub trait Keyed {
    /// The composite natural key, fields joined with '|'.
    fn natural_key(&self) -> String;
}

/// One append-only table of keyed records.
pub struct Table<R> {
    path: PathBuf,
    inner: Mutex<TableInner<R>>,
}

struct TableInner<R> {
    keys: HashSet<String>,
    records: Vec<R>,
}

impl<R: Serialize + DeserializeOwned + Keyed + Clone> Table<R> {
    /// Opens a table, rebuilding the key index from the file.
    ///
    /// A missing file is an empty table. Malformed rows are skipped with a
    /// warning (preserves everything else after a partial write).
    pub fn open(path: PathBuf) -> Result<Self> {
        let mut keys = HashSet::new();
        let mut records = Vec::new();

        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .context(format!("Failed to read table: {}", path.display()))?;
            for (line_num, line) in contents.lines().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<R>(line) {
                    Ok(record) => {
                        keys.insert(record.natural_key());
                        records.push(record);
                    }
                    Err(e) => {
                        crate::log(&format!(
                            "Warning: skipping malformed row {} in {}: {}",
                            line_num + 1,
                            path.display(),
                            e
                        ));
                    }
                }
            }
        }

        Ok(Self {
            path,
            inner: Mutex::new(TableInner { keys, records }),
        })
    }

    /// Inserts the record unless its natural key is already present.
    ///
    /// A duplicate is logged and reported, never an error: re-submitted
    /// screenshots re-route the same lines and must stay a no-op.
    pub fn upsert_if_absent(&self, record: &R) -> Result<UpsertOutcome> {
        let mut inner = self.lock()?;
        let key = record.natural_key();
        if inner.keys.contains(&key) {
            crate::log(&format!(
                "Duplicate key in {}: {}",
                self.path.display(),
                key
            ));
            return Ok(UpsertOutcome::AlreadyExists);
        }

        let line = serde_json::to_string(record).context("Failed to serialize record")?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .context(format!("Failed to open table for append: {}", self.path.display()))?;
        writeln!(file, "{}", line)
            .context(format!("Failed to append to table: {}", self.path.display()))?;

        inner.keys.insert(key);
        inner.records.push(record.clone());
        Ok(UpsertOutcome::Inserted)
    }

    /// True if a record with this natural key is stored.
    pub fn exists_by_key(&self, key: &str) -> bool {
        self.lock()
            .map(|inner| inner.keys.contains(key))
            .unwrap_or(false)
    }

    /// True if any stored record matches the predicate.
    pub fn any(&self, pred: impl Fn(&R) -> bool) -> bool {
        self.lock()
            .map(|inner| inner.records.iter().any(|r| pred(r)))
            .unwrap_or(false)
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.lock().map(|inner| inner.records.len()).unwrap_or(0)
    }

    /// Check if the table has no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every row, file included. Only maintenance re-imports call this.
    pub fn clear(&self) -> Result<()> {
        let mut inner = self.lock()?;
        if self.path.exists() {
            std::fs::remove_file(&self.path)
                .context(format!("Failed to remove table: {}", self.path.display()))?;
        }
        inner.keys.clear();
        inner.records.clear();
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, TableInner<R>>> {
        self.inner
            .lock()
            .map_err(|_| anyhow!("Table lock poisoned: {}", self.path.display()))
    }
}
