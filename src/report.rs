use crate::error::SkippedItem;
use crate::models::{Basename, Resolution};
use std::io::Write;

/// Why the cleanup phase did or did not delete anything
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupOutcome {
    /// Cleanup was switched off for this run
    Disabled,
    /// Nothing was downloaded, so the archive may be unreachable
    NoSuccessfulDownload,
    /// Stale files were processed
    Completed { deleted: usize, failed: usize },
}

/// Progress notification sent after each step of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    NamesGenerated { count: usize },
    FileClassified { file_name: String, stale: bool },
    Checking { basename: Basename },
    AlreadyPresent { basename: Basename },
    ImageChosen { basename: Basename, remote_path: String, resolution: Resolution },
    Downloaded { file_name: String, bytes: u64 },
    Skipped(SkippedItem),
    Deleted { file_name: String },
    Cleanup(CleanupOutcome),
    Finished { downloaded: usize, deleted: usize },
}

impl SyncEvent {
    /// Indentation level of the event in console output
    pub fn depth(&self) -> usize {
        match self {
            SyncEvent::NamesGenerated { .. }
            | SyncEvent::Cleanup(_)
            | SyncEvent::Finished { .. } => 0,
            SyncEvent::FileClassified { .. } | SyncEvent::Checking { .. } | SyncEvent::Deleted { .. } => 1,
            SyncEvent::AlreadyPresent { .. }
            | SyncEvent::ImageChosen { .. }
            | SyncEvent::Downloaded { .. }
            | SyncEvent::Skipped(_) => 2,
        }
    }

    pub fn message(&self) -> String {
        match self {
            SyncEvent::NamesGenerated { count } => format!("Generated {} file names", count),
            SyncEvent::FileClassified { file_name, stale: true } => format!("File {} (stale)", file_name),
            SyncEvent::FileClassified { file_name, stale: false } => format!("File {}", file_name),
            SyncEvent::Checking { basename } => format!("... {}", basename),
            SyncEvent::AlreadyPresent { basename } => format!("{} already present", basename),
            SyncEvent::ImageChosen {
                remote_path,
                resolution,
                ..
            } => format!("Downloading {} ({})", remote_path, resolution),
            SyncEvent::Downloaded { file_name, bytes } => format!("Saved {} ({} bytes)", file_name, bytes),
            SyncEvent::Skipped(item) => format!("Skipped {}", item),
            SyncEvent::Deleted { file_name } => format!("Deleted {}", file_name),
            SyncEvent::Cleanup(CleanupOutcome::Disabled) => "Cleanup disabled".to_string(),
            SyncEvent::Cleanup(CleanupOutcome::NoSuccessfulDownload) => {
                "Cleanup skipped: no image was downloaded".to_string()
            }
            SyncEvent::Cleanup(CleanupOutcome::Completed { deleted, failed }) => {
                format!("Cleanup done: {} deleted, {} failed", deleted, failed)
            }
            SyncEvent::Finished { downloaded, deleted } => {
                format!("Done: {} downloaded, {} deleted", downloaded, deleted)
            }
        }
    }
}

/// Receives progress events from a sync run
pub trait Reporter {
    fn report(&mut self, event: SyncEvent);
}

/// Writes one indented line per event
pub struct ConsoleReporter<W: Write> {
    out: W,
}

impl ConsoleReporter<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self { out: std::io::stdout() }
    }
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Reporter for ConsoleReporter<W> {
    fn report(&mut self, event: SyncEvent) {
        if let SyncEvent::Skipped(item) = &event {
            tracing::warn!(name = %item.name, kind = ?item.kind, "{}", item.message);
        }

        let line = format!("{}{}", "\t".repeat(event.depth()), event.message());
        if let Err(e) = writeln!(self.out, "{}", line) {
            tracing::debug!("Failed to write progress line: {}", e);
        }
    }
}

/// Keeps every event in memory
#[derive(Debug, Default)]
pub struct RecordingReporter {
    pub events: Vec<SyncEvent>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deleted(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|event| match event {
                SyncEvent::Deleted { file_name } => Some(file_name.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn skipped(&self) -> Vec<&SkippedItem> {
        self.events
            .iter()
            .filter_map(|event| match event {
                SyncEvent::Skipped(item) => Some(item),
                _ => None,
            })
            .collect()
    }
}

impl Reporter for RecordingReporter {
    fn report(&mut self, event: SyncEvent) {
        self.events.push(event);
    }
}
