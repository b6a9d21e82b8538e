//! Persistence gateway: append-only JSON-lines tables under composite
//! natural keys, plus the raw-text audit log and the kill-stat history.
//!
//! Inserts go through `upsert_if_absent`: a duplicate natural key is logged
//! and swallowed, never an error, so re-submitted screenshots are idempotent.

pub mod history;
pub mod raw;
pub mod records;
pub mod table;

pub use history::{HistoryLog, StatsBatch};
pub use raw::RawTextLog;
pub use records::{AntGrantRecord, CreatureEventRecord, KillStatRecord, RawTextRecord};
pub use table::{Keyed, Table, UpsertOutcome};

use anyhow::{Context, Result};
use std::path::Path;

/// The four logical tables, rooted in one data directory.
pub struct Store {
    pub ants: Table<AntGrantRecord>,
    pub creatures: Table<CreatureEventRecord>,
    pub kill_stats: Table<KillStatRecord>,
    pub raw_texts: RawTextLog,
}

impl Store {
    /// Opens every table under `data_dir`, creating the directory if needed.
    pub fn open(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .context(format!("Failed to create data dir: {}", data_dir.display()))?;
        Ok(Self {
            ants: Table::open(data_dir.join("ants.jsonl"))?,
            creatures: Table::open(data_dir.join("wild_creatures.jsonl"))?,
            kill_stats: Table::open(data_dir.join("kill_stats.jsonl"))?,
            raw_texts: RawTextLog::open(data_dir.join("raw_texts.jsonl")),
        })
    }

    /// Drops the kill-stat table and rebuilds it from history batches.
    ///
    /// The only sanctioned full-table rebuild; everything else is
    /// append-only. Returns the number of rows inserted.
    pub fn rebuild_kill_stats(&self, batches: &[StatsBatch]) -> Result<usize> {
        self.kill_stats.clear()?;
        let mut inserted = 0;
        for batch in batches {
            for (alliance, &kills) in &batch.stats {
                let record = KillStatRecord {
                    dt: batch.date_sec,
                    user_id: batch.user_id,
                    alliance: alliance.clone(),
                    username: batch.username.clone(),
                    kills,
                };
                if self.kill_stats.upsert_if_absent(&record)? == UpsertOutcome::Inserted {
                    inserted += 1;
                }
            }
        }
        Ok(inserted)
    }
}
