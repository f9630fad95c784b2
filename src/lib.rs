// Declare modules
pub mod content;
pub mod data;
pub mod db;
pub mod error;
pub mod models;
pub mod parse;
pub mod progress;

// Re-export key types for easier use
pub use content::{ContentNode, ExtractedContent, extract_content};
pub use db::{LoadStats, TagBankStats};
pub use error::{DictError, Result};
pub use models::{
    AlternativeForm, Definition, Entry, Example, NewsRank, TagRecord, TermRecord,
};

use crate::progress::ProgressCallback;
use log::{debug, info};
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Default database filename when no path is supplied.
pub const DEFAULT_DB_FILENAME: &str = "dictionary.db";

/// Options for loading a dictionary into the database.
#[derive(Debug, Default, Clone)]
pub struct LoadOptions {
    /// A term bank file, or a directory of `term_bank_*.json` files.
    pub term_bank_path: PathBuf,
    /// The tag bank file defining the controlled vocabularies.
    pub tag_bank_path: PathBuf,
    /// Optional path to a specific database file to use or create.
    /// If None, `dictionary.db` in the working directory is used.
    pub db_path: Option<PathBuf>,
}

/// The main dictionary database interface.
///
/// Owns the single SQLite connection for the run; the connection is
/// acquired once at load time and released when the handle is dropped,
/// on every exit path.
#[derive(Clone)] // Clone is cheap due to Arc<Mutex<...>>
pub struct Dictionary {
    conn: Arc<Mutex<Connection>>,
    db_file_path: Arc<PathBuf>,
}

// Helper function to open/create the database connection
// This encapsulates the logic of setting flags and pragmas
fn open_db_connection(path: &Path) -> Result<Connection> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
    )?;

    // Use WAL mode for better concurrency (readers don't block writers)
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "cache_size", "-64000")?; // 64MB
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    // Child rows cascade with their entry
    conn.pragma_update(None, "foreign_keys", "ON")?;

    Ok(conn)
}

impl Dictionary {
    /// Loads a tag bank and term bank(s) into the database with specific
    /// options.
    ///
    /// The tag bank is loaded first: entry normalization resolves tag
    /// tokens by name against the vocabulary tables it populates. Term
    /// bank files are then processed strictly sequentially on the shared
    /// connection, each in two passes. Every insert is conflict-tolerant,
    /// so repeating a load is safe and idempotent.
    pub fn load_with_options(
        options: LoadOptions,
        progress: Option<ProgressCallback>,
    ) -> Result<Self> {
        let db_path = options
            .db_path
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_FILENAME));
        info!("Using database path: {:?}", db_path);

        let mut conn = open_db_connection(&db_path)?;
        db::initialize_database(&mut conn)?;

        // Tag bank first (correctness dependency for tag resolution).
        let tag_json = data::read_bank_file(&options.tag_bank_path)?;
        let tag_bank = parse::parse_tag_bank(&tag_json)?;
        db::load_tag_bank(&mut conn, &tag_bank.records)?;

        let reporter = Arc::new(Mutex::new(progress));
        let term_files = data::discover_term_banks(&options.term_bank_path)?;
        let mut totals = LoadStats::default();
        for file in &term_files {
            info!("Loading term bank file: {:?}", file);
            let term_json = data::read_bank_file(file)?;
            let parsed = parse::parse_term_bank(&term_json)?;
            let stats = db::load_term_bank(&mut conn, &parsed.records, reporter.clone())?;
            totals.entries += stats.entries;
            totals.definitions += stats.definitions;
            totals.examples += stats.examples;
            totals.alternative_forms += stats.alternative_forms;
            totals.skipped_short += parsed.skipped_short;
        }
        info!(
            "Dictionary load complete: {} entries, {} definitions, {} examples, \
             {} alternative forms across {} file(s) ({} malformed record(s) skipped).",
            totals.entries,
            totals.definitions,
            totals.examples,
            totals.alternative_forms,
            term_files.len(),
            totals.skipped_short
        );

        Ok(Dictionary {
            conn: Arc::new(Mutex::new(conn)),
            db_file_path: Arc::new(db_path),
        })
    }

    /// Path of the database file backing this handle.
    pub fn db_path(&self) -> &Path {
        &self.db_file_path
    }

    // --- Query Methods ---

    /// Retrieves an entry row by its absolute ID.
    pub fn entry(&self, id: i64) -> Result<Option<Entry>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, term, reading, priority_score, news_freq, is_redirect, redirects_to
             FROM entries WHERE id = ?1",
        )?;
        stmt.query_row(params![id], |row| {
            Ok(Entry {
                id: row.get(0)?,
                term: row.get(1)?,
                reading: row.get(2)?,
                priority_score: row.get(3)?,
                news_freq: row.get(4)?,
                is_redirect: row.get(5)?,
                redirects_to: row.get(6)?,
            })
        })
        .optional()
        .map_err(DictError::from)
    }

    /// Retrieves an entry's definitions in position order.
    pub fn definitions(&self, entry_id: i64) -> Result<Vec<Definition>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(
            "SELECT entry_id, content, position FROM definitions
             WHERE entry_id = ?1 ORDER BY position",
        )?;
        let iter = stmt.query_map(params![entry_id], |row| {
            Ok(Definition {
                entry_id: row.get(0)?,
                content: row.get(1)?,
                position: row.get(2)?,
            })
        })?;
        iter.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(DictError::from)
    }

    /// Retrieves an entry's example pairs in position order.
    pub fn examples(&self, entry_id: i64) -> Result<Vec<Example>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(
            "SELECT entry_id, source_text, target_text, position FROM examples
             WHERE entry_id = ?1 ORDER BY position",
        )?;
        let iter = stmt.query_map(params![entry_id], |row| {
            Ok(Example {
                entry_id: row.get(0)?,
                source_text: row.get(1)?,
                target_text: row.get(2)?,
                position: row.get(3)?,
            })
        })?;
        iter.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(DictError::from)
    }

    /// Retrieves an entry's alternative surface forms.
    pub fn alternative_forms(&self, entry_id: i64) -> Result<Vec<AlternativeForm>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(
            "SELECT entry_id, term, reading FROM alternative_forms WHERE entry_id = ?1",
        )?;
        let iter = stmt.query_map(params![entry_id], |row| {
            Ok(AlternativeForm {
                entry_id: row.get(0)?,
                term: row.get(1)?,
                reading: row.get(2)?,
            })
        })?;
        iter.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(DictError::from)
    }

    /// Row counts per table, for summaries and verification.
    pub fn table_counts(&self) -> Result<Vec<(&'static str, i64)>> {
        const TABLES: [&str; 16] = [
            "entries",
            "definitions",
            "examples",
            "alternative_forms",
            "parts_of_speech",
            "fields",
            "dialects",
            "usage_types",
            "name_types",
            "entry_pos",
            "entry_fields",
            "entry_dialects",
            "entry_usage",
            "entry_names",
            "special_markers",
            "news_freq_ranks",
        ];
        let conn = self.lock_conn()?;
        let mut counts = Vec::with_capacity(TABLES.len());
        for table in TABLES {
            let count: i64 =
                conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                    row.get(0)
                })?;
            debug!("Table {}: {} row(s)", table, count);
            counts.push((table, count));
        }
        Ok(counts)
    }

    fn lock_conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| DictError::Internal("Mutex poisoned".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::ProgressUpdate;
    use serde_json::json;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    const TAG_BANK: &str = r#"[
        ["n", "partOfSpeech", -3, "noun (common)", 0],
        ["v1", "partOfSpeech", -3, "Ichidan verb", 0],
        ["uk", "", 0, "usually written in kana", 0],
        ["ksb", "", 0, "Kansai-ben", 0],
        ["med", "", 0, "medicine", 0],
        ["surname", "name", 4, "family name", 0]
    ]"#;

    fn term_bank_one() -> String {
        json!([
            [
                "猫", "ねこ", "n", "uk", 10,
                [{
                    "tag": "div",
                    "data": { "content": "glossary" },
                    "content": [{ "tag": "li", "content": "cat" }]
                },
                {
                    "tag": "div",
                    "data": { "content": "examples" },
                    "content": [
                        { "tag": "li", "content": "猫がいる。" },
                        { "tag": "li", "lang": "en", "content": "There is a cat." }
                    ]
                }],
                1, "⭐ news1k"
            ],
            ["short"]
        ])
        .to_string()
    }

    fn term_bank_two() -> String {
        json!([
            ["ネコ", "ねこ", "n", "", 5, [], -1],
            [
                "医者", "いしゃ", "n", "med", 20,
                [{
                    "tag": "div",
                    "data": { "content": "glossary" },
                    "content": [{ "tag": "li", "content": "doctor" }]
                }],
                2
            ]
        ])
        .to_string()
    }

    fn write_banks(dir: &Path) -> (PathBuf, PathBuf) {
        let bank_dir = dir.join("dict");
        fs::create_dir(&bank_dir).unwrap();
        fs::write(bank_dir.join("term_bank_1.json"), term_bank_one()).unwrap();
        fs::write(bank_dir.join("term_bank_2.json"), term_bank_two()).unwrap();
        let tag_path = dir.join("tag_bank_1.json");
        fs::write(&tag_path, TAG_BANK).unwrap();
        (bank_dir, tag_path)
    }

    fn load(dir: &Path) -> Dictionary {
        let (bank_dir, tag_path) = (dir.join("dict"), dir.join("tag_bank_1.json"));
        Dictionary::load_with_options(
            LoadOptions {
                term_bank_path: bank_dir,
                tag_bank_path: tag_path,
                db_path: Some(dir.join("test.db")),
            },
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_end_to_end_load() {
        let dir = tempdir().unwrap();
        write_banks(dir.path());
        let dict = load(dir.path());

        let cat = dict.entry(1).unwrap().unwrap();
        assert_eq!(cat.term, "猫");
        assert!(cat.news_freq);
        assert!(!cat.is_redirect);

        let defs = dict.definitions(1).unwrap();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].content, "cat");
        assert_eq!(defs[0].position, 0);

        let examples = dict.examples(1).unwrap();
        assert_eq!(examples.len(), 1);
        assert_eq!(examples[0].source_text, "猫がいる。");
        assert_eq!(examples[0].target_text, "There is a cat.");

        // Entry 1 was written by file one; the redirect in file two with the
        // same absolute ID was ignored (first write wins) and added no
        // alternative form.
        let forms = dict.alternative_forms(1).unwrap();
        assert_eq!(forms.len(), 1);
        assert_eq!(forms[0].term, "猫");

        let doctor = dict.entry(2).unwrap().unwrap();
        assert_eq!(doctor.term, "医者");
        assert_eq!(dict.definitions(2).unwrap().len(), 1);

        assert!(dict.entry(999).unwrap().is_none());
    }

    #[test]
    fn test_reload_is_idempotent() {
        let dir = tempdir().unwrap();
        write_banks(dir.path());
        let first = load(dir.path());
        let counts_once = first.table_counts().unwrap();
        drop(first);

        let second = load(dir.path());
        let counts_twice = second.table_counts().unwrap();
        assert_eq!(counts_once, counts_twice);
    }

    #[test]
    fn test_progress_callback_invoked() {
        let dir = tempdir().unwrap();
        write_banks(dir.path());

        let updates = Arc::new(AtomicUsize::new(0));
        let counter = updates.clone();
        let callback: ProgressCallback = Box::new(move |_update: ProgressUpdate| {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        });

        Dictionary::load_with_options(
            LoadOptions {
                term_bank_path: dir.path().join("dict"),
                tag_bank_path: dir.path().join("tag_bank_1.json"),
                db_path: Some(dir.path().join("progress.db")),
            },
            Some(callback),
        )
        .unwrap();

        // Two stage announcements plus one update per record per pass,
        // per file: file one has 1 record after decode, file two has 2.
        assert!(updates.load(Ordering::SeqCst) >= 6);
    }

    #[test]
    fn test_missing_tag_bank_is_fatal() {
        let dir = tempdir().unwrap();
        write_banks(dir.path());
        let result = Dictionary::load_with_options(
            LoadOptions {
                term_bank_path: dir.path().join("dict"),
                tag_bank_path: dir.path().join("absent.json"),
                db_path: Some(dir.path().join("test.db")),
            },
            None,
        );
        assert!(matches!(result, Err(DictError::DataFileNotFound(_))));
    }

    #[test]
    fn test_invalid_json_term_bank_is_fatal() {
        let dir = tempdir().unwrap();
        write_banks(dir.path());
        fs::write(dir.path().join("dict").join("term_bank_3.json"), "oops").unwrap();
        let result = Dictionary::load_with_options(
            LoadOptions {
                term_bank_path: dir.path().join("dict"),
                tag_bank_path: dir.path().join("tag_bank_1.json"),
                db_path: Some(dir.path().join("test.db")),
            },
            None,
        );
        assert!(matches!(result, Err(DictError::Json(_))));
    }
}
