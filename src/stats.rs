//! Kill-ranking parsing and snapshot diffing.
//!
//! The ranking page lists alliances as `#744 (BaS)Black Sins 3,140,163,399`.
//! Fragments are keyed by the three-letter tag in parentheses; the first
//! digit run after it is the cumulative kill count. The differ compares a
//! user's two most recent snapshots and formats the per-alliance deltas for
//! the review channel.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Tag-and-kills pattern, applied per `#`-fragment after comma removal.
const ALLIANCE_PATTERN: &str = r"\((\w{3})\)\D*?(\d+)";

fn alliance_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(ALLIANCE_PATTERN).expect("alliance pattern is valid"))
}

/// Alliance kill counts parsed from one ranking page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KillStats {
    /// Alliance tag → cumulative kills.
    pub stats: BTreeMap<String, i64>,
    /// Fragments the pattern could not read.
    pub unparsed: usize,
}

/// Parses alliance kill counts out of raw ranking-page text.
///
/// The text is split on `#`; the leading fragment (page header) is dropped.
/// Commas are stripped per fragment so grouped counts read as one digit run.
/// Unreadable fragments are counted and logged, never fatal.
pub fn parse_kill_stats(text: &str) -> KillStats {
    let mut stats = BTreeMap::new();
    let mut unparsed = 0;

    for fragment in text.split('#').skip(1) {
        let fragment = fragment.replace(',', "");
        match alliance_regex().captures(&fragment) {
            Some(caps) => {
                if let Ok(kills) = caps[2].parse::<i64>() {
                    stats.insert(caps[1].to_string(), kills);
                } else {
                    crate::log(&format!("Can't parse kill count in: {}", fragment));
                    unparsed += 1;
                }
            }
            None => {
                crate::log(&format!("Can't parse: {}", fragment));
                unparsed += 1;
            }
        }
    }

    KillStats { stats, unparsed }
}

/// Delta between a user's two most recent snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatDiff {
    /// Date of the older snapshot, `YYYY-MM-DD HH:MM:SS`.
    pub prev_date: String,
    /// Seconds between the two snapshots.
    pub interval_sec: i64,
    /// Alliance tag → kills gained. Alliances absent from the older
    /// snapshot count from zero.
    pub diff: BTreeMap<String, i64>,
}

/// Computes the delta between the last two of a user's snapshot batches.
///
/// Returns `None` with fewer than two batches. Batches are ordered by their
/// date string, matching the append order of a well-formed history.
pub fn diff_latest(batches: &[crate::store::StatsBatch]) -> Option<StatDiff> {
    if batches.len() < 2 {
        return None;
    }
    let mut sorted: Vec<_> = batches.iter().collect();
    sorted.sort_by(|a, b| a.date.cmp(&b.date));

    let prev = sorted[sorted.len() - 2];
    let last = sorted[sorted.len() - 1];

    let diff = last
        .stats
        .iter()
        .map(|(alliance, &kills)| {
            let gained = kills - prev.stats.get(alliance).copied().unwrap_or(0);
            (alliance.clone(), gained)
        })
        .collect();

    Some(StatDiff {
        prev_date: prev.date.clone(),
        interval_sec: last.date_sec - prev.date_sec,
        diff,
    })
}

/// Formats a diff for the review channel (HTML, Russian locale).
///
/// Alliances are listed by kills gained, descending.
pub fn format_diff(diff: Option<&StatDiff>) -> String {
    let Some(diff) = diff else {
        return "Не найдены первоначальные данные\nНужно больше данных".to_string();
    };

    let mut result = format!(
        "Сравнение с {}\nПрошло {}\n\n",
        diff.prev_date,
        format_interval(diff.interval_sec)
    );

    let mut rows: Vec<_> = diff.diff.iter().collect();
    rows.sort_by(|a, b| b.1.cmp(a.1));
    for (alliance, &gained) in rows {
        result.push_str(&format!(
            "<code>{}: {:>14}</code>\n",
            alliance,
            group_thousands(gained)
        ));
    }

    result
}

/// Renders a second count as `H:MM:SS`, with a day part past 24 hours.
fn format_interval(total_sec: i64) -> String {
    let days = total_sec / 86_400;
    let rem = total_sec % 86_400;
    let hours = rem / 3_600;
    let minutes = rem % 3_600 / 60;
    let seconds = rem % 60;
    if days == 1 {
        format!("1 day, {}:{:02}:{:02}", hours, minutes, seconds)
    } else if days > 1 {
        format!("{} days, {}:{:02}:{:02}", days, hours, minutes, seconds)
    } else {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    }
}

/// Groups digits in threes: 3140163 → "3,140,163".
fn group_thousands(value: i64) -> String {
    let negative = value < 0;
    let digits = value.abs().to_string();
    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if negative {
        format!("-{}", grouped)
    } else {
        grouped
    }
}
