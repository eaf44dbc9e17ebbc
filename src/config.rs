//! Validated settings for one import run.

use crate::error::{LexinError, Result};
use std::path::PathBuf;

/// Database file used when none is given.
pub const DEFAULT_DB_PATH: &str = "lexin.db";

/// Everything an import needs, checked before any database is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportConfig {
    /// Lexin XML export, plain or gzip-compressed.
    pub source: PathBuf,
    /// SQLite database to create or append to.
    pub db_path: PathBuf,
    /// Target language the caller expects the document to declare.
    /// A mismatch is only warned about.
    pub target_lang: String,
}

impl ImportConfig {
    /// Validates raw command-line values.
    ///
    /// Fails when the source path or target language is missing, or when the
    /// source file does not exist.
    pub fn new(
        source: Option<PathBuf>,
        db_path: PathBuf,
        target_lang: Option<String>,
    ) -> Result<Self> {
        let source = source
            .filter(|path| !path.as_os_str().is_empty())
            .ok_or_else(|| LexinError::InvalidArgument("XML file path is required".to_string()))?;
        let target_lang = target_lang
            .filter(|lang| !lang.trim().is_empty())
            .ok_or_else(|| {
                LexinError::InvalidArgument("target language code is required".to_string())
            })?;

        if !source.is_file() {
            return Err(LexinError::SourceNotFound(source));
        }
        if db_path.as_os_str().is_empty() {
            return Err(LexinError::InvalidArgument(
                "database path must not be empty".to_string(),
            ));
        }

        Ok(ImportConfig {
            source,
            db_path,
            target_lang,
        })
    }
}
