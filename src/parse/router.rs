//! Ordered trigger dispatch for segmented journal entries.
//!
//! Each entry body is matched against an explicit dispatch table: the first
//! trigger found in the body selects the grammar, and only that grammar
//! runs. Ignorable lines are checked before any grammar so cost listings
//! never reach a classifier. The router also owns the dedup checks, so a
//! re-submitted screenshot yields `Skipped` instead of duplicate rows.

use crate::parse::classify::{
    classify_ant, classify_degrade, classify_grant, classify_success, ANT_TRIGGER,
    DEGRADE_TRIGGER, GRANT_TRIGGER, IGNORABLE_TRIGGERS, SUCCESS_TRIGGER,
};
use crate::spelling::Dictionary;
use crate::store::{AntGrantRecord, CreatureEventRecord, Keyed, Table};

// Exclusive star-level bounds per grammar. Grant lines accept a single
// digit; upgrade lines also accept a 10, except the donor on a successful
// upgrade. Each call site names its own bound.
const GRANT_LEVEL_BOUND: u8 = 10;
const DEGRADE_LEVEL_BOUND: u8 = 11;
const DEGRADE_DONOR_LEVEL_BOUND: u8 = 11;
const SUCCESS_LEVEL_BOUND: u8 = 11;
const SUCCESS_DONOR_LEVEL_BOUND: u8 = 10;

/// Why an entry was skipped rather than stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// A record with this natural key is already stored.
    DuplicateEvent,
    /// An upgrade outcome with this label is already recorded at this
    /// timestamp. The check ignores the creature name: the journal logs at
    /// most one upgrade outcome per second.
    UpgradeAlreadyRecorded,
}

/// Routing verdict for one segmented entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// Cost listings and blank bodies: nothing to store, nothing to review.
    Ignored,
    /// A typed record ready for upsert.
    Parsed(T),
    /// Structurally valid but already recorded.
    Skipped(SkipReason),
    /// No grammar matched, or a star level failed its bound; needs human
    /// review.
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Arm {
    Ignore,
    Grant,
    Degrade,
    Success,
}

/// Dispatch table for creature-journal entries. First trigger present in
/// the body wins; the order here is the contract.
const DISPATCH: &[(&str, Arm)] = &[
    (IGNORABLE_TRIGGERS[0], Arm::Ignore),
    (IGNORABLE_TRIGGERS[1], Arm::Ignore),
    (GRANT_TRIGGER, Arm::Grant),
    (DEGRADE_TRIGGER, Arm::Degrade),
    (SUCCESS_TRIGGER, Arm::Success),
];

/// Routes one normalized creature-journal entry.
pub fn route_creature_entry(
    dt: i64,
    body: &str,
    creatures: &Table<CreatureEventRecord>,
    dictionary: &Dictionary,
) -> Outcome<CreatureEventRecord> {
    if body.is_empty() {
        return Outcome::Ignored;
    }

    for (trigger, arm) in DISPATCH {
        if !body.contains(trigger) {
            continue;
        }
        return match arm {
            Arm::Ignore => Outcome::Ignored,
            Arm::Grant => route_grant(dt, body, creatures, dictionary),
            Arm::Degrade => route_upgrade(dt, body, creatures, dictionary, Arm::Degrade),
            Arm::Success => route_upgrade(dt, body, creatures, dictionary, Arm::Success),
        };
    }

    Outcome::Failed
}

fn route_grant(
    dt: i64,
    body: &str,
    creatures: &Table<CreatureEventRecord>,
    dictionary: &Dictionary,
) -> Outcome<CreatureEventRecord> {
    let Some(event) = classify_grant(body, GRANT_LEVEL_BOUND) else {
        return Outcome::Failed;
    };
    let record = CreatureEventRecord {
        dt,
        event_type: dictionary.correct(&event.source),
        creature: dictionary.correct(&event.creature),
        creature_level: event.level,
        donor_creature: None,
        donor_creature_level: None,
    };
    if creatures.exists_by_key(&record.natural_key()) {
        return Outcome::Skipped(SkipReason::DuplicateEvent);
    }
    Outcome::Parsed(record)
}

fn route_upgrade(
    dt: i64,
    body: &str,
    creatures: &Table<CreatureEventRecord>,
    dictionary: &Dictionary,
    arm: Arm,
) -> Outcome<CreatureEventRecord> {
    let label = match arm {
        Arm::Degrade => DEGRADE_TRIGGER,
        _ => SUCCESS_TRIGGER,
    };
    // Existence is checked before the grammar runs: an already-recorded
    // upgrade must skip even when the re-OCR'd body no longer parses.
    if creatures.any(|r| r.dt == dt && r.event_type == label) {
        return Outcome::Skipped(SkipReason::UpgradeAlreadyRecorded);
    }

    let event = match arm {
        Arm::Degrade => classify_degrade(body, DEGRADE_LEVEL_BOUND, DEGRADE_DONOR_LEVEL_BOUND),
        _ => classify_success(body, SUCCESS_LEVEL_BOUND, SUCCESS_DONOR_LEVEL_BOUND),
    };
    let Some(event) = event else {
        return Outcome::Failed;
    };

    Outcome::Parsed(CreatureEventRecord {
        dt,
        event_type: dictionary.correct(&event.label),
        creature: dictionary.correct(&event.creature),
        creature_level: event.level,
        donor_creature: Some(dictionary.correct(&event.donor)),
        donor_creature_level: Some(event.donor_level),
    })
}

/// Routes one normalized ant-record entry.
pub fn route_ant_entry(
    dt: i64,
    body: &str,
    ants: &Table<AntGrantRecord>,
    dictionary: &Dictionary,
) -> Outcome<AntGrantRecord> {
    if body.is_empty() {
        return Outcome::Ignored;
    }
    if !body.contains(ANT_TRIGGER) {
        return Outcome::Failed;
    }
    let Some(event) = classify_ant(body) else {
        return Outcome::Failed;
    };
    let record = AntGrantRecord {
        dt,
        ant: dictionary.correct(&event.ant),
        source: dictionary.correct(&event.source),
    };
    if ants.exists_by_key(&record.natural_key()) {
        return Outcome::Skipped(SkipReason::DuplicateEvent);
    }
    Outcome::Parsed(record)
}
