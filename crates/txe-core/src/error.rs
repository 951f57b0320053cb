//! Error types for txe-core

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// The document could not be parsed into the expected shape.
    #[error("malformed document: {0}")]
    MalformedDocument(String),

    #[error("record not found: {0}")]
    RecordNotFound(String),

    /// A field failed the "integer >= -1" rule or a required text field was empty.
    #[error("invalid value {value:?} for {field}")]
    Validation { field: String, value: String },

    /// A backing file is missing or unreadable, or could not be parsed while
    /// deriving another document from it.
    #[error("cannot read {}: {reason}", path.display())]
    SourceUnreadable { path: PathBuf, reason: String },

    /// Writing failed after validation passed; in-memory state may disagree with disk.
    #[error("write failed for {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no active document")]
    NoActiveDocument,
}

impl Error {
    pub(crate) fn validation(field: impl Into<String>, value: impl Into<String>) -> Self {
        Error::Validation {
            field: field.into(),
            value: value.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
