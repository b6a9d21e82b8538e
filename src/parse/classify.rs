//! Grammar matchers for journal entry bodies.
//!
//! Each matcher is a pure function over a normalized body (see
//! `segment::normalize_body`) returning the typed event or `None`. Star
//! levels are validated against a caller-supplied exclusive bound: the game
//! never awards double-digit stars, so a two-digit level is an OCR misread
//! and the whole entry is rejected rather than stored with garbage.

use regex::Regex;
use std::sync::OnceLock;

/// Trigger keyword for creature grant entries ("obtained").
pub const GRANT_TRIGGER: &str = "получено";
/// Trigger keyword for failed star-upgrade entries.
pub const DEGRADE_TRIGGER: &str = "неудачное повышение звезды";
/// Trigger keyword for successful star-upgrade entries.
pub const SUCCESS_TRIGGER: &str = "успешное повышение звезды";
/// Trigger keyword for ant grant entries ("because of ant", hyphen already
/// normalized to a space).
pub const ANT_TRIGGER: &str = "из за муравья";

/// Keywords of journal lines that carry no event: upgrade-cost listings.
pub const IGNORABLE_TRIGGERS: [&str; 2] = ["для прорыва", "для быстрого повышения"];

// The `.` after "получено"/"потрачено" stands for a colon the OCR may have
// mangled; `\(.*?(\d+)` tolerates junk between the paren and the star count.
const GRANT_PATTERN: &str = r"^в результате (.+?) получено. (.+?) ?\(.*?(\d+)";
const DEGRADE_PATTERN: &str =
    r"^(неудачное повышение звезды) (.+?) \(.*?(\d+).*[,.] (.+?) ?\(.*?(\d+).*деградировал";
const SUCCESS_PATTERN: &str =
    r"^(успешное повышение звезды) (.+?) ?\(.*?(\d+).*? потрачено. (.+?) ?\(.*?(\d+)";
const ANT_PATTERN: &str = r"^из за муравья(.+?), получил\(.\) (.+?)$";

fn grant_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(GRANT_PATTERN).expect("grant pattern is valid"))
}

fn degrade_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(DEGRADE_PATTERN).expect("degrade pattern is valid"))
}

fn success_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(SUCCESS_PATTERN).expect("success pattern is valid"))
}

fn ant_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(ANT_PATTERN).expect("ant pattern is valid"))
}

/// A creature obtained through some in-game mechanism.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatureGrant {
    /// The mechanism phrase ("события", "вылупления", "покупки набора", ...).
    pub source: String,
    pub creature: String,
    pub level: u8,
}

/// Outcome of a star-upgrade action consuming a donor creature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StarUpgrade {
    /// The full outcome phrase, kept verbatim as the event label.
    pub label: String,
    pub creature: String,
    pub level: u8,
    pub donor: String,
    pub donor_level: u8,
}

/// An ant obtained because of another ant's effect. Ants carry no level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AntGrant {
    pub source: String,
    pub ant: String,
}

fn parse_level(digits: &str) -> Option<u8> {
    digits.parse().ok()
}

/// Matches a creature grant entry. `level_bound` is exclusive.
pub fn classify_grant(body: &str, level_bound: u8) -> Option<CreatureGrant> {
    let caps = grant_regex().captures(body)?;
    let level = parse_level(&caps[3])?;
    if level >= level_bound {
        return None;
    }
    Some(CreatureGrant {
        source: caps[1].to_string(),
        creature: caps[2].to_string(),
        level,
    })
}

/// Matches a failed star-upgrade entry. Both bounds are exclusive.
pub fn classify_degrade(
    body: &str,
    level_bound: u8,
    donor_level_bound: u8,
) -> Option<StarUpgrade> {
    let caps = degrade_regex().captures(body)?;
    let level = parse_level(&caps[3])?;
    let donor_level = parse_level(&caps[5])?;
    if level >= level_bound || donor_level >= donor_level_bound {
        return None;
    }
    Some(StarUpgrade {
        label: caps[1].to_string(),
        creature: caps[2].to_string(),
        level,
        donor: caps[4].to_string(),
        donor_level,
    })
}

/// Matches a successful star-upgrade entry. Both bounds are exclusive.
pub fn classify_success(
    body: &str,
    level_bound: u8,
    donor_level_bound: u8,
) -> Option<StarUpgrade> {
    let caps = success_regex().captures(body)?;
    let level = parse_level(&caps[3])?;
    let donor_level = parse_level(&caps[5])?;
    if level >= level_bound || donor_level >= donor_level_bound {
        return None;
    }
    Some(StarUpgrade {
        label: caps[1].to_string(),
        creature: caps[2].to_string(),
        level,
        donor: caps[4].to_string(),
        donor_level,
    })
}

/// Matches an ant grant entry.
pub fn classify_ant(body: &str) -> Option<AntGrant> {
    let caps = ant_regex().captures(body)?;
    Some(AntGrant {
        source: caps[1].trim().to_string(),
        ant: caps[2].trim().to_string(),
    })
}
