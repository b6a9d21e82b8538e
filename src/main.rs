//! antlog
//!
//! Ingests screenshots of in-game log pages submitted by scouts: extracts
//! text through a cloud vision API, parses the noisy Russian/English log
//! lines into structured events with dictionary-corrected entity names, and
//! persists everything to append-only tables with natural-key dedup.

mod config;
mod notify;
mod ocr;
mod parse;
mod paths;
mod pipeline;
mod spelling;
mod stats;
mod store;

use anyhow::{Context, Result};
use chrono::Local;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use notify::{ConsoleNotifier, Notifier};
use ocr::{TextExtractor, VisionClient};
use pipeline::IncomingMessage;
use spelling::Dictionary;
use store::{HistoryLog, Store};

/// Logs a message to both console and log file with timestamp.
pub fn log(msg: &str) {
    let timestamp = Local::now().format("%H:%M:%S%.3f");
    let line = format!("[{}] {}\n", timestamp, msg);
    print!("{}", line);
    let log_path = paths::get_logs_dir().join("antlog.log");
    if let Ok(mut file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        let _ = file.write_all(line.as_bytes());
    }
}

fn main() -> Result<()> {
    paths::ensure_directories()?;
    config::init_config();
    let config = config::get_config();

    let data_dir = config
        .data_dir
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(paths::get_data_dir);
    let store = Store::open(&data_dir)?;
    let history = HistoryLog::open(data_dir.join("stats_history.jsonl"));
    log(&format!(
        "Store opened at {}: {} creature events, {} ants, {} kill stat rows",
        data_dir.display(),
        store.creatures.len(),
        store.ants.len(),
        store.kill_stats.len()
    ));

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        log("Usage: antlog [--rebuild-stats] <photo.jpg|text.txt> ...");
        return Ok(());
    }

    if args.iter().any(|arg| arg == "--rebuild-stats") {
        let batches = history.read_all()?;
        let inserted = store.rebuild_kill_stats(&batches)?;
        log(&format!(
            "Rebuilt kill stats: {} rows from {} batches",
            inserted,
            batches.len()
        ));
        return Ok(());
    }

    let dictionary = Dictionary::load(&resolve_resource(&config.dictionary_path))?;
    if dictionary.is_empty() {
        log("Warning: dictionary is empty, entity names will not be corrected");
    } else {
        log(&format!("Dictionary loaded: {} entries", dictionary.len()));
    }

    let extractor = VisionClient::new(config)?;
    let notifier = ConsoleNotifier;

    for arg in &args {
        if let Err(e) = process_file(
            Path::new(arg),
            &extractor,
            &store,
            &history,
            &dictionary,
            &notifier,
        ) {
            log(&format!("Failed to process {}: {:#}", arg, e));
        }
    }

    Ok(())
}

/// Runs one submitted file through the pipeline: `.txt` files are read as
/// already-extracted text, anything else is archived and OCR'd.
fn process_file(
    path: &Path,
    extractor: &dyn TextExtractor,
    store: &Store,
    history: &HistoryLog,
    dictionary: &Dictionary,
    notifier: &dyn Notifier,
) -> Result<()> {
    let config = config::get_config();
    let date = chrono::Utc::now().timestamp();
    let message = IncomingMessage {
        user_id: config.default_user_id,
        username: config.default_username.clone(),
        date,
        source_file: format!("{}_{}.jpg", date, config.default_user_id),
    };

    let text = if path.extension().is_some_and(|ext| ext == "txt") {
        std::fs::read_to_string(path)
            .context(format!("Failed to read text file: {}", path.display()))?
    } else {
        let bytes = std::fs::read(path)
            .context(format!("Failed to read photo: {}", path.display()))?;
        archive_photo(&bytes, &message.source_file);
        extractor.text_from_image(&bytes)?
    };

    match pipeline::process_text(&text, &message, store, history, dictionary, notifier)? {
        Some(summary) => log(&format!(
            "{}: parsed {}, skipped {}, failed {}, ignored {}",
            path.display(),
            summary.parsed,
            summary.skipped,
            summary.failed,
            summary.ignored
        )),
        None => log(&format!(
            "{}: no recognized report heading, dropped",
            path.display()
        )),
    }

    Ok(())
}

/// Keeps a copy of the submitted photo for the audit trail. Best-effort:
/// a failed archive never blocks parsing.
fn archive_photo(bytes: &[u8], name: &str) {
    let path = paths::get_img_dir().join(name);
    if let Err(e) = std::fs::write(&path, bytes) {
        log(&format!(
            "Warning: failed to archive photo {}: {}",
            path.display(),
            e
        ));
    }
}

/// Resolves a configured resource path against the exe directory.
fn resolve_resource(configured: &str) -> PathBuf {
    let path = Path::new(configured);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        paths::get_exe_dir().join(path)
    }
}
