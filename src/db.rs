use crate::error::{LexinError, Result};
use log::{debug, info, warn};
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use std::fs;
use std::path::Path;

// --- Schema Definition ---

const SCHEMA_VERSION: u32 = 1;

const CREATE_METADATA_TABLE: &str = "
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);";

const CREATE_DICTIONARIES_TABLE: &str = "
CREATE TABLE IF NOT EXISTS dictionaries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    base_lang TEXT NOT NULL,
    target_lang TEXT NOT NULL,
    version TEXT NOT NULL,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);";

const CREATE_WORDS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS words (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    dictionary_id INTEGER NOT NULL,
    value TEXT NOT NULL,
    variant TEXT,
    type TEXT NOT NULL,
    original_id TEXT NOT NULL,
    variant_id TEXT NOT NULL,
    matching_id TEXT,
    FOREIGN KEY (dictionary_id) REFERENCES dictionaries(id) ON DELETE CASCADE
);";

const CREATE_BASE_LANGS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS base_langs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    word_id INTEGER NOT NULL,
    meaning TEXT,
    matching_id TEXT,
    FOREIGN KEY (word_id) REFERENCES words(id) ON DELETE CASCADE
);";

// `references` is an SQL keyword, hence the quoting.
const CREATE_REFERENCES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS "references" (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    base_lang_id INTEGER NOT NULL,
    type TEXT NOT NULL CHECK (type IN ('animation', 'compare', 'phonetic', 'see')),
    value TEXT NOT NULL,
    matching_id TEXT,
    FOREIGN KEY (base_lang_id) REFERENCES base_langs(id) ON DELETE CASCADE
);"#;

const CREATE_COMMENTS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS comments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    base_lang_id INTEGER NOT NULL,
    content TEXT NOT NULL,
    matching_id TEXT,
    FOREIGN KEY (base_lang_id) REFERENCES base_langs(id) ON DELETE CASCADE
);";

const CREATE_EXPLANATIONS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS explanations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    base_lang_id INTEGER NOT NULL,
    content TEXT NOT NULL,
    matching_id TEXT,
    FOREIGN KEY (base_lang_id) REFERENCES base_langs(id) ON DELETE CASCADE
);";

const CREATE_ALTERNATES_TABLE: &str = "
CREATE TABLE IF NOT EXISTS alternates (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    base_lang_id INTEGER NOT NULL,
    content TEXT NOT NULL,
    FOREIGN KEY (base_lang_id) REFERENCES base_langs(id) ON DELETE CASCADE
);";

const CREATE_USAGES_TABLE: &str = "
CREATE TABLE IF NOT EXISTS usages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    base_lang_id INTEGER NOT NULL,
    content TEXT NOT NULL,
    matching_id TEXT,
    FOREIGN KEY (base_lang_id) REFERENCES base_langs(id) ON DELETE CASCADE
);";

const CREATE_PHONETICS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS phonetics (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    base_lang_id INTEGER NOT NULL,
    content TEXT,
    file TEXT,
    FOREIGN KEY (base_lang_id) REFERENCES base_langs(id) ON DELETE CASCADE
);";

const CREATE_ILLUSTRATIONS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS illustrations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    base_lang_id INTEGER NOT NULL,
    type TEXT NOT NULL,
    value TEXT NOT NULL,
    norlexin TEXT,
    FOREIGN KEY (base_lang_id) REFERENCES base_langs(id) ON DELETE CASCADE
);";

const CREATE_INFLECTIONS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS inflections (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    base_lang_id INTEGER NOT NULL,
    content TEXT,
    FOREIGN KEY (base_lang_id) REFERENCES base_langs(id) ON DELETE CASCADE
);";

const CREATE_INFLECTION_VARIANTS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS inflection_variants (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    inflection_id INTEGER NOT NULL,
    content TEXT NOT NULL,
    description TEXT,
    FOREIGN KEY (inflection_id) REFERENCES inflections(id) ON DELETE CASCADE
);";

const CREATE_GRAMINFOS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS graminfos (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    base_lang_id INTEGER NOT NULL,
    content TEXT NOT NULL,
    FOREIGN KEY (base_lang_id) REFERENCES base_langs(id) ON DELETE CASCADE
);";

const CREATE_INDEXES_TABLE: &str = "
CREATE TABLE IF NOT EXISTS indexes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    base_lang_id INTEGER NOT NULL,
    value TEXT NOT NULL,
    type TEXT CHECK (type IN ('prefix', 'suffix')),
    FOREIGN KEY (base_lang_id) REFERENCES base_langs(id) ON DELETE CASCADE
);";

const CREATE_TARGET_LANGS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS target_langs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    word_id INTEGER NOT NULL,
    comment TEXT,
    FOREIGN KEY (word_id) REFERENCES words(id) ON DELETE CASCADE
);";

const CREATE_TRANSLATIONS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS translations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    target_lang_id INTEGER NOT NULL,
    content TEXT NOT NULL,
    FOREIGN KEY (target_lang_id) REFERENCES target_langs(id) ON DELETE CASCADE
);";

const CREATE_SYNONYMS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS synonyms (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    target_lang_id INTEGER NOT NULL,
    content TEXT NOT NULL,
    FOREIGN KEY (target_lang_id) REFERENCES target_langs(id) ON DELETE CASCADE
);";

const CREATE_TARGET_COMMENTS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS target_comments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    target_lang_id INTEGER NOT NULL,
    content TEXT NOT NULL,
    FOREIGN KEY (target_lang_id) REFERENCES target_langs(id) ON DELETE CASCADE
);";

const CREATE_TARGET_EXPLANATIONS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS target_explanations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    target_lang_id INTEGER NOT NULL,
    content TEXT NOT NULL,
    FOREIGN KEY (target_lang_id) REFERENCES target_langs(id) ON DELETE CASCADE
);";

// --- Shared child tables (owned by a base sense XOR a target sense) ---

const CREATE_ANTONYMS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS antonyms (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    base_lang_id INTEGER,
    target_lang_id INTEGER,
    value TEXT NOT NULL,
    CHECK ((base_lang_id IS NULL) <> (target_lang_id IS NULL)),
    FOREIGN KEY (base_lang_id) REFERENCES base_langs(id) ON DELETE CASCADE,
    FOREIGN KEY (target_lang_id) REFERENCES target_langs(id) ON DELETE CASCADE
);";

const CREATE_EXAMPLES_TABLE: &str = "
CREATE TABLE IF NOT EXISTS examples (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    base_lang_id INTEGER,
    target_lang_id INTEGER,
    content TEXT NOT NULL,
    original_id TEXT NOT NULL,
    matching_id TEXT,
    CHECK ((base_lang_id IS NULL) <> (target_lang_id IS NULL)),
    FOREIGN KEY (base_lang_id) REFERENCES base_langs(id) ON DELETE CASCADE,
    FOREIGN KEY (target_lang_id) REFERENCES target_langs(id) ON DELETE CASCADE
);";

const CREATE_IDIOMS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS idioms (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    base_lang_id INTEGER,
    target_lang_id INTEGER,
    content TEXT NOT NULL,
    original_id TEXT NOT NULL,
    matching_id TEXT,
    CHECK ((base_lang_id IS NULL) <> (target_lang_id IS NULL)),
    FOREIGN KEY (base_lang_id) REFERENCES base_langs(id) ON DELETE CASCADE,
    FOREIGN KEY (target_lang_id) REFERENCES target_langs(id) ON DELETE CASCADE
);";

const CREATE_COMPOUNDS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS compounds (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    base_lang_id INTEGER,
    target_lang_id INTEGER,
    content TEXT,
    original_id TEXT NOT NULL,
    description TEXT,
    matching_id TEXT,
    CHECK ((base_lang_id IS NULL) <> (target_lang_id IS NULL)),
    FOREIGN KEY (base_lang_id) REFERENCES base_langs(id) ON DELETE CASCADE,
    FOREIGN KEY (target_lang_id) REFERENCES target_langs(id) ON DELETE CASCADE
);";

const CREATE_COMPOUND_INFLECTIONS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS compound_inflections (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    compound_id INTEGER NOT NULL,
    content TEXT NOT NULL,
    FOREIGN KEY (compound_id) REFERENCES compounds(id) ON DELETE CASCADE
);";

const CREATE_DERIVATIONS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS derivations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    base_lang_id INTEGER,
    target_lang_id INTEGER,
    content TEXT,
    original_id TEXT NOT NULL,
    description TEXT,
    CHECK ((base_lang_id IS NULL) <> (target_lang_id IS NULL)),
    FOREIGN KEY (base_lang_id) REFERENCES base_langs(id) ON DELETE CASCADE,
    FOREIGN KEY (target_lang_id) REFERENCES target_langs(id) ON DELETE CASCADE
);";

const CREATE_DERIVATION_INFLECTIONS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS derivation_inflections (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    derivation_id INTEGER NOT NULL,
    content TEXT NOT NULL,
    FOREIGN KEY (derivation_id) REFERENCES derivations(id) ON DELETE CASCADE
);";

// --- Indices ---

const CREATE_WORD_VALUE_INDEX: &str = "CREATE INDEX IF NOT EXISTS idx_word_value ON words (value);";
const CREATE_WORD_DICTIONARY_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_word_dictionary ON words (dictionary_id);";
const CREATE_DICTIONARY_LANGS_INDEX: &str = "CREATE UNIQUE INDEX IF NOT EXISTS idx_dictionary_langs ON dictionaries (base_lang, target_lang);";
const CREATE_TRANSLATION_CONTENT_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_translation_content ON translations (content);";

/// Every table, parents before children.
const TABLES: &[&str] = &[
    CREATE_METADATA_TABLE,
    CREATE_DICTIONARIES_TABLE,
    CREATE_WORDS_TABLE,
    CREATE_BASE_LANGS_TABLE,
    CREATE_TARGET_LANGS_TABLE,
    CREATE_REFERENCES_TABLE,
    CREATE_COMMENTS_TABLE,
    CREATE_EXPLANATIONS_TABLE,
    CREATE_ALTERNATES_TABLE,
    CREATE_USAGES_TABLE,
    CREATE_PHONETICS_TABLE,
    CREATE_ILLUSTRATIONS_TABLE,
    CREATE_INFLECTIONS_TABLE,
    CREATE_INFLECTION_VARIANTS_TABLE,
    CREATE_GRAMINFOS_TABLE,
    CREATE_INDEXES_TABLE,
    CREATE_TRANSLATIONS_TABLE,
    CREATE_SYNONYMS_TABLE,
    CREATE_TARGET_COMMENTS_TABLE,
    CREATE_TARGET_EXPLANATIONS_TABLE,
    CREATE_ANTONYMS_TABLE,
    CREATE_EXAMPLES_TABLE,
    CREATE_IDIOMS_TABLE,
    CREATE_COMPOUNDS_TABLE,
    CREATE_COMPOUND_INFLECTIONS_TABLE,
    CREATE_DERIVATIONS_TABLE,
    CREATE_DERIVATION_INFLECTIONS_TABLE,
];

const INDICES: &[&str] = &[
    CREATE_WORD_VALUE_INDEX,
    CREATE_WORD_DICTIONARY_INDEX,
    CREATE_DICTIONARY_LANGS_INDEX,
    CREATE_TRANSLATION_CONTENT_INDEX,
];

// --- Connection Setup ---

/// Opens (creating if needed) the database at `path`, applies pragmas and
/// initializes the schema.
pub fn open_database(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
    )?;
    apply_pragmas(&conn)?;
    initialize_database(&mut conn)?;
    Ok(conn)
}

/// Opens a private in-memory database with the full schema.
pub fn open_in_memory() -> Result<Connection> {
    let mut conn = Connection::open_in_memory()?;
    apply_pragmas(&conn)?;
    initialize_database(&mut conn)?;
    Ok(conn)
}

fn apply_pragmas(conn: &Connection) -> Result<()> {
    // journal_mode reports the resulting mode ("memory" for in-memory databases)
    let mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    debug!("Journal mode: {}", mode);
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    // Cascades and ownership checks depend on this
    conn.pragma_update(None, "foreign_keys", true)?;
    Ok(())
}

// --- Initialization ---

/// Creates the tables and indexes that are missing, then records
/// [`SCHEMA_VERSION`] in `metadata`. Safe to run on every open.
pub fn initialize_database(conn: &mut Connection) -> Result<()> {
    debug!("Ensuring schema version {}", SCHEMA_VERSION);
    let tx = conn.transaction()?;

    for statement in TABLES.iter().chain(INDICES) {
        tx.execute(statement, [])?;
    }
    sync_schema_version(&tx)?;

    tx.commit()?;
    info!("Database schema ready.");
    Ok(())
}

/// An older stored version is bumped; a newer one is kept and only warned
/// about, since every statement here is `IF NOT EXISTS`.
fn sync_schema_version(conn: &Connection) -> Result<()> {
    let stored: Option<String> = conn
        .query_row(
            "SELECT value FROM metadata WHERE key = 'schema_version'",
            [],
            |row| row.get(0),
        )
        .optional()?;

    let Some(raw) = stored else {
        conn.execute(
            "INSERT INTO metadata (key, value) VALUES ('schema_version', ?1)",
            params![SCHEMA_VERSION.to_string()],
        )?;
        debug!("Recorded schema version {} in a fresh database", SCHEMA_VERSION);
        return Ok(());
    };

    let found: u32 = raw.trim().parse().map_err(|_| {
        LexinError::Schema(format!("metadata.schema_version is not a number: '{}'", raw))
    })?;
    if found < SCHEMA_VERSION {
        warn!(
            "Database has schema version {}, upgrading the marker to {}",
            found, SCHEMA_VERSION
        );
        conn.execute(
            "UPDATE metadata SET value = ?1 WHERE key = 'schema_version'",
            params![SCHEMA_VERSION.to_string()],
        )?;
    } else if found > SCHEMA_VERSION {
        warn!(
            "Database has schema version {}, newer than {} understood by this build",
            found, SCHEMA_VERSION
        );
    }
    Ok(())
}

// --- Lookups ---

/// A stored `dictionaries` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictionaryRecord {
    pub id: i64,
    pub base_lang: String,
    pub target_lang: String,
    pub version: String,
}

/// Finds the dictionary for a (base, target) language pair.
pub fn find_dictionary(
    conn: &Connection,
    base_lang: &str,
    target_lang: &str,
) -> Result<Option<DictionaryRecord>> {
    let record = conn
        .query_row(
            "SELECT id, base_lang, target_lang, version
             FROM dictionaries
             WHERE base_lang = ?1 AND target_lang = ?2",
            params![base_lang, target_lang],
            |row| {
                Ok(DictionaryRecord {
                    id: row.get(0)?,
                    base_lang: row.get(1)?,
                    target_lang: row.get(2)?,
                    version: row.get(3)?,
                })
            },
        )
        .optional()?;
    Ok(record)
}

/// Counts the words stored under a dictionary.
pub fn count_dictionary_words(conn: &Connection, dictionary_id: i64) -> Result<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM words WHERE dictionary_id = ?1",
        params![dictionary_id],
        |row| row.get(0),
    )?;
    Ok(count)
}
