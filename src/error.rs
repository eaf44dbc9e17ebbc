use std::path::PathBuf;
use thiserror::Error;

/// Custom Result type for this crate.
pub type Result<T> = std::result::Result<T, LexinError>;

/// Enum representing all possible errors in the lexin_rs library.
#[derive(Error, Debug)]
pub enum LexinError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to open source file {path:?}: {source}")]
    SourceOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Source file does not exist: {0:?}")]
    SourceNotFound(PathBuf),

    #[error("XML parsing error: {0}")]
    XmlParse(#[from] quick_xml::DeError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Unusable database schema: {0}")]
    Schema(String),

    #[error("{context}: {source}")]
    Load {
        context: String,
        #[source]
        source: Box<LexinError>,
    },

    #[error("Import cancelled")]
    Cancelled,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl LexinError {
    /// Wraps an error with a description of what was being stored.
    pub fn context(self, context: impl Into<String>) -> Self {
        LexinError::Load {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

/// Attaches load context to a fallible result.
pub(crate) trait ResultExt<T> {
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T, E: Into<LexinError>> ResultExt<T> for std::result::Result<T, E> {
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| e.into().context(f()))
    }
}
