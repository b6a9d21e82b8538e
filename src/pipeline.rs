//! Report dispatch and per-report pipelines.
//!
//! One submitted photo produces one synchronous run: recognize which report
//! page the text came from, segment it, route every entry, persist what
//! parsed, and send what didn't to the review channel. A single bad line
//! never stops its siblings; the batch summary carries the tally.

use anyhow::{Context, Result};

use crate::notify::Notifier;
use crate::parse::{
    normalize_body, parse_timestamp, route_ant_entry, route_creature_entry, segment, Outcome,
};
use crate::spelling::Dictionary;
use crate::stats::{diff_latest, format_diff, parse_kill_stats};
use crate::store::{HistoryLog, KillStatRecord, RawTextRecord, StatsBatch, Store, UpsertOutcome};

/// Heading phrase of the alliance kill-ranking page.
pub const KILL_STATS_HEADING: &str = "Рейтинг Убийств Альянса (Сезон)";
/// Heading phrase of the ant-grant record page.
pub const ANT_GRANT_HEADING: &str = "Запись о получении Оранжевых Спец";
/// Heading phrase of the wild-creature journal page.
pub const CREATURE_LOG_HEADING: &str = "Журнал Оранжевых Существ";

/// Who submitted the photo, and when. Provided by the transport layer.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub user_id: i64,
    pub username: String,
    /// Submission time, epoch seconds (UTC).
    pub date: i64,
    /// Archived photo name, recorded on audit rows.
    pub source_file: String,
}

/// Per-batch tally of routing outcomes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub parsed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub ignored: usize,
}

/// Routes one OCR'd text blob to the pipeline matching its report heading.
///
/// Returns `None` when no heading matches — the photo was not one of the
/// supported report pages.
pub fn process_text(
    text: &str,
    message: &IncomingMessage,
    store: &Store,
    history: &HistoryLog,
    dictionary: &Dictionary,
    notifier: &dyn Notifier,
) -> Result<Option<BatchSummary>> {
    crate::log(text);

    if text.contains(KILL_STATS_HEADING) {
        return Ok(Some(process_kill_stats(text, message, store, history, notifier)?));
    }
    if text.contains(ANT_GRANT_HEADING) {
        return Ok(Some(process_ants(text, message, store, dictionary, notifier)?));
    }
    if text.contains(CREATURE_LOG_HEADING) {
        return Ok(Some(process_creatures(text, message, store, dictionary, notifier)?));
    }
    Ok(None)
}

/// Wild-creature journal: every routed entry leaves an audit row except the
/// ignorable ones.
fn process_creatures(
    text: &str,
    message: &IncomingMessage,
    store: &Store,
    dictionary: &Dictionary,
    notifier: &dyn Notifier,
) -> Result<BatchSummary> {
    let mut summary = BatchSummary::default();

    for entry in segment(text) {
        let dt = match parse_timestamp(entry.timestamp) {
            Ok(dt) => dt,
            Err(e) => {
                crate::log(&format!("Warning: {}", e));
                summary.failed += 1;
                continue;
            }
        };
        let body = normalize_body(entry.body);

        match route_creature_entry(dt, &body, &store.creatures, dictionary) {
            Outcome::Ignored => summary.ignored += 1,
            Outcome::Parsed(record) => {
                store.creatures.upsert_if_absent(&record)?;
                append_audit(store, dt, &body, message, true)?;
                summary.parsed += 1;
            }
            Outcome::Skipped(_) => {
                append_audit(store, dt, &body, message, true)?;
                summary.skipped += 1;
            }
            Outcome::Failed => {
                notifier.notify(message.user_id, &format!("Can't parse: {}", body));
                crate::log(&format!(
                    "{} Can't parse {}  {}",
                    message.source_file, entry.timestamp, body
                ));
                append_audit(store, dt, &body, message, false)?;
                summary.failed += 1;
            }
        }
    }

    Ok(summary)
}

fn append_audit(
    store: &Store,
    dt: i64,
    body: &str,
    message: &IncomingMessage,
    parsed: bool,
) -> Result<()> {
    store.raw_texts.append(&RawTextRecord {
        dt,
        message: body.to_string(),
        kind: "creature".to_string(),
        source_file: message.source_file.clone(),
        parsed,
    })
}

/// Ant-grant record: no audit rows, duplicates are silent no-ops.
fn process_ants(
    text: &str,
    message: &IncomingMessage,
    store: &Store,
    dictionary: &Dictionary,
    notifier: &dyn Notifier,
) -> Result<BatchSummary> {
    let mut summary = BatchSummary::default();

    for entry in segment(text) {
        let dt = match parse_timestamp(entry.timestamp) {
            Ok(dt) => dt,
            Err(e) => {
                crate::log(&format!("Warning: {}", e));
                summary.failed += 1;
                continue;
            }
        };
        let body = normalize_body(entry.body);

        match route_ant_entry(dt, &body, &store.ants, dictionary) {
            Outcome::Ignored => summary.ignored += 1,
            Outcome::Parsed(record) => {
                store.ants.upsert_if_absent(&record)?;
                summary.parsed += 1;
            }
            Outcome::Skipped(_) => summary.skipped += 1,
            Outcome::Failed => {
                notifier.notify(message.user_id, &format!("Can't parse: {}", body));
                crate::log(&format!("Can't parse {}", body));
                summary.failed += 1;
            }
        }
    }

    Ok(summary)
}

/// Kill-ranking page: store one row per alliance, append the snapshot batch
/// to the user's history, and message back the diff against their previous
/// snapshot.
fn process_kill_stats(
    text: &str,
    message: &IncomingMessage,
    store: &Store,
    history: &HistoryLog,
    notifier: &dyn Notifier,
) -> Result<BatchSummary> {
    let parsed = parse_kill_stats(text);
    crate::log(&format!(
        "{} {} {}",
        message.user_id, message.username, message.date
    ));

    let mut summary = BatchSummary {
        failed: parsed.unparsed,
        ..BatchSummary::default()
    };

    for (alliance, &kills) in &parsed.stats {
        let record = KillStatRecord {
            dt: message.date,
            user_id: message.user_id,
            alliance: alliance.clone(),
            username: message.username.clone(),
            kills,
        };
        match store.kill_stats.upsert_if_absent(&record)? {
            UpsertOutcome::Inserted => summary.parsed += 1,
            UpsertOutcome::AlreadyExists => summary.skipped += 1,
        }
    }

    history.append(&StatsBatch {
        date: format_epoch(message.date)?,
        date_sec: message.date,
        user_id: message.user_id,
        username: message.username.clone(),
        stats: parsed.stats,
    })?;

    let batches = history.read_user(message.user_id)?;
    let diff = diff_latest(&batches);
    notifier.notify(message.user_id, &format_diff(diff.as_ref()));

    Ok(summary)
}

fn format_epoch(epoch: i64) -> Result<String> {
    let instant = chrono::DateTime::from_timestamp(epoch, 0)
        .context(format!("Epoch seconds out of range: {}", epoch))?;
    Ok(instant.format("%Y-%m-%d %H:%M:%S").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::{tempdir, TempDir};

    struct RecordingNotifier {
        messages: Mutex<Vec<(i64, String)>>,
    }

    impl RecordingNotifier {
        fn new() -> Self {
            Self {
                messages: Mutex::new(Vec::new()),
            }
        }

        fn messages(&self) -> Vec<(i64, String)> {
            self.messages.lock().unwrap().clone()
        }
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, user_id: i64, message: &str) {
            self.messages.lock().unwrap().push((user_id, message.to_string()));
        }
    }

    struct Fixture {
        _dir: TempDir,
        store: Store,
        history: HistoryLog,
        dictionary: Dictionary,
        notifier: RecordingNotifier,
    }

    fn make_fixture() -> Fixture {
        let dir = tempdir().unwrap();
        let store = Store::open(&dir.path().join("data")).unwrap();
        let history = HistoryLog::open(dir.path().join("data").join("stats_history.jsonl"));
        let dictionary = Dictionary::new(vec![
            "скорпион".to_string(),
            "гигантский богомол".to_string(),
            "муравей жнец".to_string(),
        ]);
        Fixture {
            _dir: dir,
            store,
            history,
            dictionary,
            notifier: RecordingNotifier::new(),
        }
    }

    fn make_message(date: i64) -> IncomingMessage {
        IncomingMessage {
            user_id: 42,
            username: "scout".to_string(),
            date,
            source_file: format!("{}_42.jpg", date),
        }
    }

    fn run(fx: &Fixture, text: &str, date: i64) -> Option<BatchSummary> {
        process_text(
            text,
            &make_message(date),
            &fx.store,
            &fx.history,
            &fx.dictionary,
            &fx.notifier,
        )
        .unwrap()
    }

    const CREATURE_TEXT: &str = "13:19 Журнал Оранжевых Существ \
2023-03-14 04:54:32 В результате события получено: Скоwрпион (3 \
2023-03-12 05:10:26 Для быстрого повышения звезды потрачены следующие Дикие Существа \
2023-03-11 05:37:22 совершенно нечитаемая строка";

    #[test]
    fn test_unrecognized_text_is_dropped() {
        let fx = make_fixture();
        assert_eq!(run(&fx, "какой то другой экран", 1000), None);
        assert!(fx.store.creatures.is_empty());
        assert!(fx.notifier.messages().is_empty());
    }

    #[test]
    fn test_creature_journal_batch() {
        let fx = make_fixture();
        let summary = run(&fx, CREATURE_TEXT, 1000).unwrap();

        assert_eq!(
            summary,
            BatchSummary {
                parsed: 1,
                skipped: 0,
                failed: 1,
                ignored: 1
            }
        );
        assert_eq!(fx.store.creatures.len(), 1);
        // Name was corrected before storage
        assert!(fx
            .store
            .creatures
            .any(|r| r.creature == "скорпион" && r.creature_level == 3));

        // Audit: one parsed row, one failed row, nothing for the cost line
        let audit = fx.store.raw_texts.read_all().unwrap();
        assert_eq!(audit.len(), 2);
        assert_eq!(audit.iter().filter(|r| r.parsed).count(), 1);
        assert_eq!(audit.iter().filter(|r| !r.parsed).count(), 1);
        assert!(audit.iter().all(|r| r.kind == "creature"));
        assert!(audit.iter().all(|r| r.source_file == "1000_42.jpg"));

        // The unreadable line went to review
        let messages = fx.notifier.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].1.contains("Can't parse"));
    }

    #[test]
    fn test_creature_journal_resubmission_skips() {
        let fx = make_fixture();
        run(&fx, CREATURE_TEXT, 1000).unwrap();
        let summary = run(&fx, CREATURE_TEXT, 2000).unwrap();

        assert_eq!(
            summary,
            BatchSummary {
                parsed: 0,
                skipped: 1,
                failed: 1,
                ignored: 1
            }
        );
        // Still a single structured row, but the skip left an audit row
        assert_eq!(fx.store.creatures.len(), 1);
        assert_eq!(fx.store.raw_texts.read_all().unwrap().len(), 4);
    }

    #[test]
    fn test_ant_record_batch_writes_no_audit() {
        let fx = make_fixture();
        let text = "Запись о получении Оранжевых Спец Муравьев \
2023-03-14 05:00:00 Из-за муравья Легионер, получил(и) Муравей Жнeц \
2023-03-13 05:00:00 бессмысленный обрывок";

        let summary = run(&fx, text, 1000).unwrap();
        assert_eq!(
            summary,
            BatchSummary {
                parsed: 1,
                skipped: 0,
                failed: 1,
                ignored: 0
            }
        );
        assert_eq!(fx.store.ants.len(), 1);
        assert!(fx.store.ants.any(|r| r.ant == "муравей жнец"));
        assert!(fx.store.raw_texts.read_all().unwrap().is_empty());

        // Resubmission is a silent skip
        let summary = run(&fx, text, 2000).unwrap();
        assert_eq!(summary.skipped, 1);
        assert_eq!(fx.store.ants.len(), 1);
    }

    #[test]
    fn test_kill_stats_first_batch_needs_more_data() {
        let fx = make_fixture();
        let text = "Рейтинг Убийств Альянса (Сезон) \
#744 (BaS)Black Sins 3,140,163,399 #745 (RoT)Rise of Titans 2,971,004,112";

        let summary = run(&fx, text, 1_678_769_672).unwrap();
        assert_eq!(summary.parsed, 2);
        assert_eq!(summary.failed, 0);
        assert_eq!(fx.store.kill_stats.len(), 2);
        assert!(fx.store.kill_stats.exists_by_key("1678769672|BaS"));

        let messages = fx.notifier.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].1.contains("Нужно больше данных"));
    }

    #[test]
    fn test_kill_stats_second_batch_reports_diff() {
        let fx = make_fixture();
        let first = "Рейтинг Убийств Альянса (Сезон) #744 (BaS)Black Sins 100 ";
        let second = "Рейтинг Убийств Альянса (Сезон) #744 (BaS)Black Sins 2,600 ";

        run(&fx, first, 1000).unwrap();
        run(&fx, second, 4600).unwrap();

        let messages = fx.notifier.messages();
        assert_eq!(messages.len(), 2);
        let diff_message = &messages[1].1;
        assert!(diff_message.contains("Сравнение с 1970-01-01 00:16:40"));
        assert!(diff_message.contains("Прошло 1:00:00"));
        assert!(diff_message.contains("2,500"));
    }

    #[test]
    fn test_kill_stats_resubmission_skips_rows() {
        let fx = make_fixture();
        let text = "Рейтинг Убийств Альянса (Сезон) #744 (BaS)Black Sins 100 ";

        run(&fx, text, 1000).unwrap();
        let summary = run(&fx, text, 1000).unwrap();
        assert_eq!(summary.parsed, 0);
        assert_eq!(summary.skipped, 1);
        assert_eq!(fx.store.kill_stats.len(), 1);
    }
}
