//! Error types for the dictionary converters.

use thiserror::Error;

/// Everything that can go wrong while converting a dictionary.
///
/// Only `SourceFormat`, `Io`, `Csv`, `Json` and `Vocabulary` abort a run.
/// `EntryParse` is recovered by the pipeline: the entry is skipped, counted and logged.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// The whole document is unreadable (malformed XML, not UTF-8, ...).
    #[error("cannot read {source_name}: {message}")]
    SourceFormat { source_name: String, message: String },

    /// A single entry candidate could not be turned into an entry.
    #[error("skipped entry at {locator}: {reason}")]
    EntryParse { locator: String, reason: String },

    /// The vocabulary tables could not be loaded.
    #[error("vocabulary error: {0}")]
    Vocabulary(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ConvertError {
    pub fn source_format(source_name: impl Into<String>, message: impl ToString) -> Self {
        Self::SourceFormat {
            source_name: source_name.into(),
            message: message.to_string(),
        }
    }

    pub fn entry_parse(locator: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::EntryParse {
            locator: locator.into(),
            reason: reason.into(),
        }
    }

    /// True for errors the pipeline recovers from by skipping one entry.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::EntryParse { .. })
    }
}

pub type Result<T> = std::result::Result<T, ConvertError>;
