//! Timestamp-anchored segmentation of OCR'd log text.
//!
//! A recognized journal page comes back from the vision service as one blob
//! in which every entry starts with a `YYYY-MM-DD HH:MM:SS` token. Each
//! entry's body runs up to the next timestamp token or the end of the text.

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use regex::Regex;
use std::sync::OnceLock;

/// Literal date-time token that anchors every journal entry.
const TIMESTAMP_PATTERN: &str = r"\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}";

fn timestamp_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(TIMESTAMP_PATTERN).expect("timestamp pattern is valid"))
}

/// One segmented journal entry, borrowed from the source text.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry<'a> {
    /// The matched `YYYY-MM-DD HH:MM:SS` token.
    pub timestamp: &'a str,
    /// Everything between this timestamp and the next one (un-normalized).
    pub body: &'a str,
}

/// Splits a text blob into timestamped entries.
///
/// Yields one entry per timestamp token, in order; an entry's body is the
/// text up to (but not including) the next token or end of input. Text with
/// no timestamp tokens yields nothing. Calling again on the same text yields
/// a fresh sequence.
pub fn segment(text: &str) -> impl Iterator<Item = LogEntry<'_>> + '_ {
    let anchors: Vec<(usize, usize)> = timestamp_regex()
        .find_iter(text)
        .map(|m| (m.start(), m.end()))
        .collect();

    (0..anchors.len()).map(move |i| {
        let (start, end) = anchors[i];
        let body_end = anchors
            .get(i + 1)
            .map(|&(next_start, _)| next_start)
            .unwrap_or(text.len());
        LogEntry {
            timestamp: &text[start..end],
            body: &text[end..body_end],
        }
    })
}

/// Normalizes an entry body for classification: hyphens become spaces (the
/// OCR corrupts dashes inside parenthesized star counts), everything is
/// lower-cased, then trimmed. Every classifier sees exactly this form.
pub fn normalize_body(body: &str) -> String {
    body.replace('-', " ").to_lowercase().trim().to_string()
}

/// Parses a segmented timestamp as a UTC instant and returns epoch seconds.
pub fn parse_timestamp(timestamp: &str) -> Result<i64> {
    let naive = NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%d %H:%M:%S")
        .context(format!("Invalid timestamp: {}", timestamp))?;
    Ok(naive.and_utc().timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;

    const JOURNAL_SAMPLE: &str = "13:19 Журнал Оранжевых Существ \
2023-03-14 04:54:32 В результате события получено: Скорпион (3 \
2023-03-12 19:53:32 В результате вылупления получено: Паук-Скакун (1 *) \
2023-03-05 21:06:48 Неудачное повышение звезды Гигантский Богомол (9*), Скоwрпион (8*) деградировал(а) в Скорпион (7*) ";

    #[test]
    fn test_no_timestamps_yields_nothing() {
        assert_eq!(segment("").count(), 0);
        assert_eq!(segment("Рейтинг Убийств Альянса (Сезон)").count(), 0);
        // A bare date without the time part is not an anchor
        assert_eq!(segment("2023-03-14 журнал").count(), 0);
    }

    #[test]
    fn test_one_entry_per_timestamp() {
        let entries: Vec<_> = segment(JOURNAL_SAMPLE).collect();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].timestamp, "2023-03-14 04:54:32");
        assert_eq!(entries[1].timestamp, "2023-03-12 19:53:32");
        assert_eq!(entries[2].timestamp, "2023-03-05 21:06:48");
    }

    #[test]
    fn test_body_runs_to_next_timestamp() {
        let entries: Vec<_> = segment(JOURNAL_SAMPLE).collect();
        assert_eq!(
            entries[0].body.trim(),
            "В результате события получено: Скорпион (3"
        );
        assert!(entries[2].body.contains("деградировал"));
    }

    #[test]
    fn test_segmentation_loses_no_text() {
        // Everything from the first anchor onward is covered by the
        // returned slices, in order.
        let reassembled: String = segment(JOURNAL_SAMPLE)
            .map(|e| format!("{}{}", e.timestamp, e.body))
            .collect();
        let first_anchor = JOURNAL_SAMPLE.find("2023-").unwrap();
        assert_eq!(reassembled, JOURNAL_SAMPLE[first_anchor..]);
    }

    #[test]
    fn test_restartable() {
        let first: Vec<_> = segment(JOURNAL_SAMPLE).collect();
        let second: Vec<_> = segment(JOURNAL_SAMPLE).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_normalize_body() {
        assert_eq!(
            normalize_body("  В результате события получено: Скорпион (3 "),
            "в результате события получено: скорпион (3"
        );
        // Hyphens become spaces before lower-casing
        assert_eq!(
            normalize_body("Из-за муравья Легионер, получил(и) Жнец"),
            "из за муравья легионер, получил(и) жнец"
        );
        assert_eq!(normalize_body("   "), "");
    }

    #[test]
    fn test_parse_timestamp_utc_epoch() {
        assert_eq!(parse_timestamp("1970-01-01 00:00:10").unwrap(), 10);
        assert_eq!(parse_timestamp("2023-03-14 04:54:32").unwrap(), 1_678_769_672);
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert!(parse_timestamp("2023-13-99 99:99:99").is_err());
        assert!(parse_timestamp("not a timestamp").is_err());
    }
}
