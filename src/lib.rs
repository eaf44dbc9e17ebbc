// Declare modules
pub mod config;
pub mod db;
pub mod error;
pub mod loader;
pub mod models;
pub mod parse;
pub mod progress;

// Re-export key types for easier use
pub use config::ImportConfig;
pub use error::{LexinError, Result};
pub use loader::{StoreOutcome, store_dictionary};
pub use models::{
    Alternate,
    Antonym,
    BaseSense,
    Comment,
    Compound,
    Derivation,
    Dictionary,
    Example,
    Explanation,
    Idiom,
    Illustration,
    Index,
    Inflection,
    InflectionVariant,
    Meaning,
    Phonetic,
    Reference,
    SenseOwner,
    TargetSense,
    Usage,
    Word,
};
pub use parse::{parse_dictionary, parse_dictionary_file, parse_dictionary_str};

use log::{info, warn};
use progress::ProgressCallback;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Result of a completed import.
#[derive(Debug, Clone)]
pub struct ImportSummary {
    pub dictionary_id: i64,
    pub base_lang: String,
    pub target_lang: String,
    /// `false` when words were appended to an existing dictionary.
    pub created: bool,
    /// Words read from the document.
    pub words_parsed: usize,
    /// Words now stored under the dictionary, including earlier imports.
    pub entry_count: i64,
    pub db_path: PathBuf,
    pub parse_time: Duration,
    pub store_time: Duration,
}

/// Runs a whole import: opens the database, parses the source and stores it.
///
/// A target language differing from the one the document declares is logged
/// as a warning and does not stop the import.
pub fn run_import(
    config: &ImportConfig,
    reporter: Option<&mut ProgressCallback>,
) -> Result<ImportSummary> {
    info!("Using database path: {:?}", config.db_path);
    let mut conn = db::open_database(&config.db_path)?;

    info!("Parsing XML file: {:?}", config.source);
    let parse_start = Instant::now();
    let dict = parse_dictionary_file(&config.source)?;
    let parse_time = parse_start.elapsed();
    info!("Parsed {} words in {:.2?}", dict.words.len(), parse_time);

    if dict.target_lang != config.target_lang {
        warn!(
            "XML file has target language '{}', but '{}' was specified",
            dict.target_lang, config.target_lang
        );
    }

    let store_start = Instant::now();
    let outcome = store_dictionary(&mut conn, &dict, reporter)?;
    let store_time = store_start.elapsed();

    // Best effort: the import is already committed
    let entry_count = match db::count_dictionary_words(&conn, outcome.dictionary_id) {
        Ok(count) => count,
        Err(e) => {
            warn!("Error counting entries: {}", e);
            dict.words.len() as i64
        }
    };

    Ok(ImportSummary {
        dictionary_id: outcome.dictionary_id,
        base_lang: dict.base_lang,
        target_lang: dict.target_lang,
        created: outcome.created,
        words_parsed: outcome.words_stored,
        entry_count,
        db_path: config.db_path.clone(),
        parse_time,
        store_time,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const SWE_ENG_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Dictionary BaseLang="sv" TargetLang="en" Version="1.0">
  <Word Value="hus" Type="noun" ID="1" VariantID="1">
    <BaseLang><Meaning>house (building)</Meaning></BaseLang>
    <TargetLang><Translation>house</Translation></TargetLang>
  </Word>
  <Word Value="bil" Type="noun" ID="2" VariantID="1">
    <TargetLang><Translation>car</Translation></TargetLang>
  </Word>
</Dictionary>
"#;

    #[test]
    fn test_run_import_twice_appends() {
        let _ = env_logger::builder().is_test(true).try_init();
        let dir = tempdir().expect("Failed to create temp dir");
        let source = dir.path().join("swe_eng.xml");
        std::fs::write(&source, SWE_ENG_XML).unwrap();
        let db_path = dir.path().join("out").join("lexin.db");

        let config = ImportConfig::new(Some(source), db_path.clone(), Some("en".to_string())).unwrap();

        let first = run_import(&config, None).expect("first import failed");
        assert!(first.created);
        assert_eq!(first.base_lang, "sv");
        assert_eq!(first.target_lang, "en");
        assert_eq!(first.words_parsed, 2);
        assert_eq!(first.entry_count, 2);
        assert!(db_path.exists());

        let second = run_import(&config, None).expect("second import failed");
        assert!(!second.created);
        assert_eq!(second.dictionary_id, first.dictionary_id);
        assert_eq!(second.entry_count, 4);
    }

    #[test]
    fn test_target_mismatch_only_warns() {
        let _ = env_logger::builder().is_test(true).try_init();
        let dir = tempdir().unwrap();
        let source = dir.path().join("swe_eng.xml");
        std::fs::write(&source, SWE_ENG_XML).unwrap();
        let config = ImportConfig::new(
            Some(source),
            dir.path().join("lexin.db"),
            Some("arabic".to_string()),
        )
        .unwrap();

        let summary = run_import(&config, None).expect("mismatch must not abort");
        assert_eq!(summary.target_lang, "en");
        assert_eq!(summary.entry_count, 2);
    }

    #[test]
    fn test_malformed_source_stores_nothing() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("broken.xml");
        std::fs::write(&source, "<Dictionary BaseLang=\"sv\"><Word>").unwrap();
        let db_path = dir.path().join("lexin.db");
        let config = ImportConfig::new(Some(source), db_path.clone(), Some("en".to_string())).unwrap();

        let result = run_import(&config, None);
        assert!(matches!(result, Err(LexinError::XmlParse(_))));

        let conn = db::open_database(&db_path).unwrap();
        let dictionaries: i64 = conn
            .query_row("SELECT COUNT(*) FROM dictionaries", [], |row| row.get(0))
            .unwrap();
        assert_eq!(dictionaries, 0);
    }
}
