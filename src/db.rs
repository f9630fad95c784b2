use crate::content::extract_content;
use crate::error::Result;
use crate::models::{
    DIALECT_NAMES, FIELD_NAMES, NAME_CATEGORY, POS_CATEGORY, TagRecord, TermRecord, USAGE_NAMES,
    split_tags,
};
use crate::progress::{ProgressCallback, ProgressUpdate};
use log::{debug, info, warn};
use rusqlite::{Connection, OptionalExtension, params};
use std::sync::{Arc, Mutex};
use std::time::Instant;

// --- Schema Definition ---

const SCHEMA_VERSION: u32 = 1;

const CREATE_METADATA_TABLE: &str = "
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);";

const CREATE_ENTRIES_TABLE: &str = "
CREATE TABLE IF NOT EXISTS entries (
    id INTEGER PRIMARY KEY,
    term TEXT NOT NULL,
    reading TEXT NOT NULL,
    priority_score INTEGER NOT NULL DEFAULT 0,
    news_freq INTEGER NOT NULL DEFAULT 0, -- 0 for false, 1 for true
    is_redirect INTEGER NOT NULL DEFAULT 0,
    redirects_to INTEGER, -- Self-referential; equals id for redirect rows
    FOREIGN KEY (redirects_to) REFERENCES entries(id)
);";

const CREATE_DEFINITIONS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS definitions (
    entry_id INTEGER NOT NULL,
    content TEXT NOT NULL,
    position INTEGER NOT NULL, -- 0-based document order within the entry
    PRIMARY KEY (entry_id, position),
    FOREIGN KEY (entry_id) REFERENCES entries(id) ON DELETE CASCADE
);";

const CREATE_EXAMPLES_TABLE: &str = "
CREATE TABLE IF NOT EXISTS examples (
    entry_id INTEGER NOT NULL,
    source_text TEXT NOT NULL,
    target_text TEXT NOT NULL,
    position INTEGER NOT NULL,
    PRIMARY KEY (entry_id, position),
    FOREIGN KEY (entry_id) REFERENCES entries(id) ON DELETE CASCADE
);";

const CREATE_ALTERNATIVE_FORMS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS alternative_forms (
    entry_id INTEGER NOT NULL,
    term TEXT NOT NULL,
    reading TEXT NOT NULL,
    PRIMARY KEY (entry_id, term, reading),
    FOREIGN KEY (entry_id) REFERENCES entries(id) ON DELETE CASCADE
);";

const CREATE_PARTS_OF_SPEECH_TABLE: &str = "
CREATE TABLE IF NOT EXISTS parts_of_speech (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    priority_score REAL NOT NULL DEFAULT 0,
    description TEXT NOT NULL,
    category TEXT NOT NULL
);";

const CREATE_FIELDS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS fields (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    description TEXT NOT NULL
);";

const CREATE_DIALECTS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS dialects (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    description TEXT NOT NULL
);";

const CREATE_USAGE_TYPES_TABLE: &str = "
CREATE TABLE IF NOT EXISTS usage_types (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    description TEXT NOT NULL,
    category TEXT NOT NULL
);";

const CREATE_NAME_TYPES_TABLE: &str = "
CREATE TABLE IF NOT EXISTS name_types (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    description TEXT NOT NULL
);";

const CREATE_ENTRY_POS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS entry_pos (
    entry_id INTEGER NOT NULL,
    pos_id INTEGER NOT NULL,
    PRIMARY KEY (entry_id, pos_id),
    FOREIGN KEY (entry_id) REFERENCES entries(id) ON DELETE CASCADE,
    FOREIGN KEY (pos_id) REFERENCES parts_of_speech(id)
);";

const CREATE_ENTRY_FIELDS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS entry_fields (
    entry_id INTEGER NOT NULL,
    field_id INTEGER NOT NULL,
    PRIMARY KEY (entry_id, field_id),
    FOREIGN KEY (entry_id) REFERENCES entries(id) ON DELETE CASCADE,
    FOREIGN KEY (field_id) REFERENCES fields(id)
);";

const CREATE_ENTRY_DIALECTS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS entry_dialects (
    entry_id INTEGER NOT NULL,
    dialect_id INTEGER NOT NULL,
    PRIMARY KEY (entry_id, dialect_id),
    FOREIGN KEY (entry_id) REFERENCES entries(id) ON DELETE CASCADE,
    FOREIGN KEY (dialect_id) REFERENCES dialects(id)
);";

const CREATE_ENTRY_USAGE_TABLE: &str = "
CREATE TABLE IF NOT EXISTS entry_usage (
    entry_id INTEGER NOT NULL,
    usage_type_id INTEGER NOT NULL,
    PRIMARY KEY (entry_id, usage_type_id),
    FOREIGN KEY (entry_id) REFERENCES entries(id) ON DELETE CASCADE,
    FOREIGN KEY (usage_type_id) REFERENCES usage_types(id)
);";

const CREATE_ENTRY_NAMES_TABLE: &str = "
CREATE TABLE IF NOT EXISTS entry_names (
    entry_id INTEGER NOT NULL,
    name_type_id INTEGER NOT NULL,
    PRIMARY KEY (entry_id, name_type_id),
    FOREIGN KEY (entry_id) REFERENCES entries(id) ON DELETE CASCADE,
    FOREIGN KEY (name_type_id) REFERENCES name_types(id)
);";

const CREATE_SPECIAL_MARKERS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS special_markers (
    entry_id INTEGER NOT NULL,
    marker TEXT NOT NULL,
    PRIMARY KEY (entry_id, marker),
    FOREIGN KEY (entry_id) REFERENCES entries(id) ON DELETE CASCADE
);";

const CREATE_NEWS_FREQ_RANKS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS news_freq_ranks (
    entry_id INTEGER NOT NULL,
    rank_type TEXT NOT NULL,
    rank_start INTEGER NOT NULL,
    rank_end INTEGER NOT NULL,
    PRIMARY KEY (entry_id, rank_type),
    FOREIGN KEY (entry_id) REFERENCES entries(id) ON DELETE CASCADE
);";

// --- Indices ---

const CREATE_ENTRY_TERM_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_entry_term ON entries (term);";
const CREATE_ENTRY_READING_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_entry_reading ON entries (reading);";
const CREATE_DEFINITION_ENTRY_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_definition_entry ON definitions (entry_id);";
const CREATE_EXAMPLE_ENTRY_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_example_entry ON examples (entry_id);";
const CREATE_ALT_FORM_ENTRY_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_alt_form_entry ON alternative_forms (entry_id);";

// --- Initialization Function ---

/// Creates all tables and indices in the database if they don't exist.
/// Also checks and sets the schema version. Safe to call on every run.
pub fn initialize_database(conn: &mut Connection) -> Result<()> {
    info!(
        "Initializing database schema (version {})...",
        SCHEMA_VERSION
    );
    let tx = conn.transaction()?;

    // Create tables
    tx.execute(CREATE_METADATA_TABLE, [])?;
    tx.execute(CREATE_ENTRIES_TABLE, [])?;
    tx.execute(CREATE_DEFINITIONS_TABLE, [])?;
    tx.execute(CREATE_EXAMPLES_TABLE, [])?;
    tx.execute(CREATE_ALTERNATIVE_FORMS_TABLE, [])?;
    tx.execute(CREATE_PARTS_OF_SPEECH_TABLE, [])?;
    tx.execute(CREATE_FIELDS_TABLE, [])?;
    tx.execute(CREATE_DIALECTS_TABLE, [])?;
    tx.execute(CREATE_USAGE_TYPES_TABLE, [])?;
    tx.execute(CREATE_NAME_TYPES_TABLE, [])?;
    tx.execute(CREATE_ENTRY_POS_TABLE, [])?;
    tx.execute(CREATE_ENTRY_FIELDS_TABLE, [])?;
    tx.execute(CREATE_ENTRY_DIALECTS_TABLE, [])?;
    tx.execute(CREATE_ENTRY_USAGE_TABLE, [])?;
    tx.execute(CREATE_ENTRY_NAMES_TABLE, [])?;
    tx.execute(CREATE_SPECIAL_MARKERS_TABLE, [])?;
    tx.execute(CREATE_NEWS_FREQ_RANKS_TABLE, [])?;

    // Create indices
    tx.execute(CREATE_ENTRY_TERM_INDEX, [])?;
    tx.execute(CREATE_ENTRY_READING_INDEX, [])?;
    tx.execute(CREATE_DEFINITION_ENTRY_INDEX, [])?;
    tx.execute(CREATE_EXAMPLE_ENTRY_INDEX, [])?;
    tx.execute(CREATE_ALT_FORM_ENTRY_INDEX, [])?;

    // Check schema version
    let existing_version: Option<String> = tx
        .query_row(
            "SELECT value FROM metadata WHERE key = 'schema_version'",
            [],
            |row| row.get(0),
        )
        .optional()?;

    match existing_version {
        Some(v) if v == SCHEMA_VERSION.to_string() => {
            debug!("Database schema version ({}) matches expected version.", v);
        }
        Some(v) => {
            warn!(
                "Database schema version ({}) differs from expected ({}). Proceeding anyway.",
                v, SCHEMA_VERSION
            );
        }
        None => {
            tx.execute(
                "INSERT INTO metadata (key, value) VALUES ('schema_version', ?1)",
                params![SCHEMA_VERSION.to_string()],
            )?;
            debug!("Set initial schema version in metadata table.");
        }
    }

    tx.commit()?;
    info!("Database schema initialization complete.");
    Ok(())
}

// --- Tag Bank Loader ---

/// Row counts written to each vocabulary table by one tag bank load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TagBankStats {
    pub parts_of_speech: usize,
    pub fields: usize,
    pub dialects: usize,
    pub usage_types: usize,
    pub name_types: usize,
}

/// Buckets tag-definition records into the five controlled-vocabulary
/// tables by fixed-membership rules.
///
/// The rules are independent: a record may legitimately land in more than
/// one table, and that ambiguity is kept rather than deduplicated. Must run
/// before any term bank load, since entry normalization resolves tag tokens
/// by name against these tables.
pub fn load_tag_bank(conn: &mut Connection, records: &[TagRecord]) -> Result<TagBankStats> {
    info!("Loading tag bank ({} records)...", records.len());
    let tx = conn.transaction()?;
    let mut stats = TagBankStats::default();

    {
        let mut pos_stmt = tx.prepare(
            "INSERT OR IGNORE INTO parts_of_speech (name, priority_score, description, category)
             VALUES (?1, ?2, ?3, ?4)",
        )?;
        let mut field_stmt =
            tx.prepare("INSERT OR IGNORE INTO fields (name, description) VALUES (?1, ?2)")?;
        let mut dialect_stmt =
            tx.prepare("INSERT OR IGNORE INTO dialects (name, description) VALUES (?1, ?2)")?;
        let mut usage_stmt = tx.prepare(
            "INSERT OR IGNORE INTO usage_types (name, description, category) VALUES (?1, ?2, ?3)",
        )?;
        let mut name_stmt =
            tx.prepare("INSERT OR IGNORE INTO name_types (name, description) VALUES (?1, ?2)")?;

        for record in records {
            if record.category == POS_CATEGORY {
                stats.parts_of_speech += pos_stmt.execute(params![
                    record.name,
                    record.priority_score,
                    record.description,
                    record.category,
                ])?;
            }
            if record.category.is_empty() && FIELD_NAMES.contains(&record.name.as_str()) {
                stats.fields += field_stmt.execute(params![record.name, record.description])?;
            }
            if DIALECT_NAMES.contains(&record.name.as_str()) {
                stats.dialects += dialect_stmt.execute(params![record.name, record.description])?;
            }
            if USAGE_NAMES.contains(&record.name.as_str()) {
                stats.usage_types +=
                    usage_stmt.execute(params![record.name, record.description, record.category])?;
            }
            if record.category == NAME_CATEGORY {
                stats.name_types += name_stmt.execute(params![record.name, record.description])?;
            }
        }
    }

    tx.commit()?;
    info!(
        "Tag bank loaded: {} parts of speech, {} fields, {} dialects, {} usage types, {} name types.",
        stats.parts_of_speech, stats.fields, stats.dialects, stats.usage_types, stats.name_types
    );
    Ok(stats)
}

// --- Term Bank Loader ---

/// Row counts written by one term bank load, plus the count of raw records
/// skipped at decode time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub entries: usize,
    pub definitions: usize,
    pub examples: usize,
    pub alternative_forms: usize,
    pub skipped_short: usize,
}

/// Loads one term bank's records in two passes.
///
/// Pass 1 normalizes every record: the entry row, its definitions and
/// example pairs from the content tree, and its tag, marker, and frequency
/// facts. Pass 2 inserts each non-redirect entry's (term, reading) as an
/// alternative form of itself; it is a separate pass so that alternative
/// forms never depend on content parsing. Every insert is conflict-tolerant,
/// so re-running a load is idempotent.
pub fn load_term_bank(
    conn: &mut Connection,
    records: &[TermRecord],
    reporter: Arc<Mutex<Option<ProgressCallback>>>,
) -> Result<LoadStats> {
    info!("Loading term bank ({} records)...", records.len());
    let start_time = Instant::now();
    let total = records.len() as u64;

    // Helper closure to invoke the callback inside the Arc<Mutex<>>
    let maybe_report = |update: ProgressUpdate| {
        if let Some(cb) = reporter.lock().unwrap().as_mut() {
            let _ = cb(update);
        }
    };

    let mut stats = LoadStats::default();
    let tx = conn.transaction()?;

    {
        // --- Prepare Statements ---
        let mut entry_stmt = tx.prepare(
            "INSERT OR IGNORE INTO entries
                 (id, term, reading, priority_score, news_freq, is_redirect, redirects_to)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        let mut def_stmt = tx.prepare(
            "INSERT OR IGNORE INTO definitions (entry_id, content, position) VALUES (?1, ?2, ?3)",
        )?;
        let mut example_stmt = tx.prepare(
            "INSERT OR IGNORE INTO examples (entry_id, source_text, target_text, position)
             VALUES (?1, ?2, ?3, ?4)",
        )?;
        let mut pos_stmt = tx.prepare(
            "INSERT OR IGNORE INTO entry_pos (entry_id, pos_id)
             SELECT ?1, id FROM parts_of_speech WHERE name = ?2",
        )?;
        let mut field_stmt = tx.prepare(
            "INSERT OR IGNORE INTO entry_fields (entry_id, field_id)
             SELECT ?1, id FROM fields WHERE name = ?2",
        )?;
        let mut dialect_stmt = tx.prepare(
            "INSERT OR IGNORE INTO entry_dialects (entry_id, dialect_id)
             SELECT ?1, id FROM dialects WHERE name = ?2",
        )?;
        let mut usage_stmt = tx.prepare(
            "INSERT OR IGNORE INTO entry_usage (entry_id, usage_type_id)
             SELECT ?1, id FROM usage_types WHERE name = ?2",
        )?;
        let mut name_stmt = tx.prepare(
            "INSERT OR IGNORE INTO entry_names (entry_id, name_type_id)
             SELECT ?1, id FROM name_types WHERE name = ?2",
        )?;
        let mut marker_stmt = tx
            .prepare("INSERT OR IGNORE INTO special_markers (entry_id, marker) VALUES (?1, ?2)")?;
        let mut news_stmt = tx.prepare(
            "INSERT OR IGNORE INTO news_freq_ranks (entry_id, rank_type, rank_start, rank_end)
             VALUES (?1, ?2, ?3, ?4)",
        )?;

        // --- Pass 1: Entries and derived facts ---
        info!("Pass 1/2: Inserting entries and derived facts...");
        maybe_report(ProgressUpdate::new_stage(
            "Pass 1/2: Loading entries".to_string(),
            Some(total),
        ));

        for (i, record) in records.iter().enumerate() {
            let abs_id = record.abs_id();
            let is_redirect = record.is_redirect();

            stats.entries += entry_stmt.execute(params![
                abs_id,
                record.term,
                record.reading,
                record.priority_score,
                record.news_freq(),
                is_redirect,
                if is_redirect { Some(abs_id) } else { None },
            ])?;

            // Redirects carry no independent content; only the entry row.
            if !is_redirect {
                let extracted = extract_content(&record.content);
                for (position, definition) in extracted.definitions.iter().enumerate() {
                    stats.definitions +=
                        def_stmt.execute(params![abs_id, definition, position as i64])?;
                }
                for (position, (source, target)) in extracted.examples.iter().enumerate() {
                    stats.examples +=
                        example_stmt.execute(params![abs_id, source, target, position as i64])?;
                }

                for token in split_tags(&record.pos_tags) {
                    // Unknown tokens match nothing and are dropped silently.
                    pos_stmt.execute(params![abs_id, token])?;
                }
                for token in split_tags(&record.other_tags) {
                    // Each vocabulary is checked independently; a token may
                    // match more than one table.
                    field_stmt.execute(params![abs_id, token])?;
                    dialect_stmt.execute(params![abs_id, token])?;
                    usage_stmt.execute(params![abs_id, token])?;
                    name_stmt.execute(params![abs_id, token])?;
                }

                for marker in record.special_markers() {
                    marker_stmt.execute(params![abs_id, marker])?;
                }
                if let Some(rank) = record.news_rank() {
                    news_stmt.execute(params![
                        abs_id,
                        rank.rank_type,
                        rank.rank_start,
                        rank.rank_end,
                    ])?;
                }
            }

            maybe_report(ProgressUpdate {
                stage_description: "Pass 1/2: Loading entries".to_string(),
                current_item: (i + 1) as u64,
                total_items: Some(total),
                message: Some(record.term.clone()),
            });
        }
        info!("Pass 1 complete.");

        // --- Pass 2: Alternative forms ---
        info!("Pass 2/2: Inserting alternative forms...");
        maybe_report(ProgressUpdate::new_stage(
            "Pass 2/2: Alternative forms".to_string(),
            Some(total),
        ));

        let mut alt_stmt = tx.prepare(
            "INSERT OR IGNORE INTO alternative_forms (entry_id, term, reading)
             VALUES (?1, ?2, ?3)",
        )?;
        for (i, record) in records.iter().enumerate() {
            if !record.is_redirect() {
                stats.alternative_forms +=
                    alt_stmt.execute(params![record.abs_id(), record.term, record.reading])?;
            }
            maybe_report(ProgressUpdate {
                stage_description: "Pass 2/2: Alternative forms".to_string(),
                current_item: (i + 1) as u64,
                total_items: Some(total),
                message: None,
            });
        }
        info!("Pass 2 complete.");
    }

    tx.commit()?;
    info!(
        "Term bank loaded: {} entries, {} definitions, {} examples, {} alternative forms. Took {:.2?}",
        stats.entries,
        stats.definitions,
        stats.examples,
        stats.alternative_forms,
        start_time.elapsed()
    );
    Ok(stats)
}
