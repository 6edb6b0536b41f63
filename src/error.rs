use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a run before anything is downloaded or deleted
#[derive(Debug, Error)]
pub enum SyncError {
    /// The local image directory could not be created
    #[error("Failed to create image directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The local image directory could not be listed
    #[error("Failed to list image directory {path}: {source}")]
    ListDirectory {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    /// A retention date fell outside the calendar range
    #[error("Cannot compute date {reference} minus {offset}")]
    Calendar { reference: String, offset: String },

    /// Configuration values that cannot be turned into sync options
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

/// Why a single item was skipped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipKind {
    /// The archive page could not be fetched
    PageUnavailable,
    /// The page has no anchor/thumbnail pair
    NoUsableImage,
    /// The image could not be fetched or written
    DownloadFailed,
    /// A stale file could not be removed
    RemoveFailed,
}

/// Non-fatal failure on one basename or file, retried on the next run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedItem {
    /// Basename or file name the failure relates to
    pub name: String,
    /// Human-readable message
    pub message: String,
    pub kind: SkipKind,
}

impl SkippedItem {
    pub fn new(name: impl Into<String>, message: impl Into<String>, kind: SkipKind) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            kind,
        }
    }

    /// Wrap a transport or I/O error, keeping its context chain in the message
    pub fn from_error(name: impl Into<String>, error: &anyhow::Error, kind: SkipKind) -> Self {
        Self::new(name, format!("{:#}", error), kind)
    }
}

impl std::fmt::Display for SkippedItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.name, self.message)
    }
}
