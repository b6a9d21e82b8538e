//! Record types for the four logical tables.

use super::table::Keyed;
use serde::{Deserialize, Serialize};

/// An ant granted by another ant's effect. One row per (time, ant).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AntGrantRecord {
    /// Event time, epoch seconds (UTC).
    pub dt: i64,
    pub ant: String,
    /// The granting mechanism phrase.
    pub source: String,
}

impl Keyed for AntGrantRecord {
    fn natural_key(&self) -> String {
        format!("{}|{}", self.dt, self.ant)
    }
}

/// A wild-creature journal event: a grant or a star-upgrade outcome.
/// Donor fields are present only for upgrade outcomes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatureEventRecord {
    /// Event time, epoch seconds (UTC).
    pub dt: i64,
    /// Grant source phrase, or the upgrade outcome label.
    pub event_type: String,
    pub creature: String,
    pub creature_level: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub donor_creature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub donor_creature_level: Option<u8>,
}

impl Keyed for CreatureEventRecord {
    fn natural_key(&self) -> String {
        format!(
            "{}|{}|{}|{}",
            self.dt, self.event_type, self.creature, self.creature_level
        )
    }
}

/// One alliance's kill count from a ranking-page snapshot.
/// A snapshot batch produces one row per alliance at the same `dt`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KillStatRecord {
    /// Snapshot time, epoch seconds (UTC).
    pub dt: i64,
    pub user_id: i64,
    /// Three-letter alliance tag.
    pub alliance: String,
    pub username: String,
    pub kills: i64,
}

impl Keyed for KillStatRecord {
    fn natural_key(&self) -> String {
        format!("{}|{}", self.dt, self.alliance)
    }
}

/// Audit row for one routed journal line, parsed or not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTextRecord {
    /// Entry time, epoch seconds (UTC).
    pub dt: i64,
    /// The normalized body as the classifiers saw it.
    pub message: String,
    /// Which pipeline routed the line.
    pub kind: String,
    /// Archived photo the line came from.
    pub source_file: String,
    pub parsed: bool,
}
