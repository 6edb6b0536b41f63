use crate::constants::{
    BASENAME_DATE_FORMAT, BASENAME_PREFIX, DEFAULT_DAYS, DEFAULT_SIZE_LIMIT, DEFAULT_YEARS, MAX_RETENTION_NAMES,
};
use crate::error::SyncError;
use chrono::NaiveDate;
use serde::Deserialize;
use std::borrow::Borrow;
use std::fmt;
use std::path::PathBuf;

/// Extension-free identifier of one day's image, e.g. `ap230105`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Basename(String);

impl Basename {
    /// Build the basename for the given date
    pub fn from_date(date: NaiveDate) -> Self {
        Self(format!("{}{}", BASENAME_PREFIX, date.format(BASENAME_DATE_FORMAT)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Basename {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for Basename {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// How far back the retention policy reaches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RetentionWindow {
    /// Days kept before the reference date
    pub days: u32,
    /// Yearly anniversaries kept
    pub years: u32,
    /// Keep the days window around every anniversary too
    pub square: bool,
}

impl RetentionWindow {
    /// Number of basenames the policy generates, duplicates included
    pub fn expected_len(&self) -> usize {
        let days = self.days as usize;
        let years = self.years as usize;
        if self.square {
            years.saturating_mul(days.saturating_add(1)).saturating_add(1)
        } else {
            days.saturating_add(years).saturating_add(1)
        }
    }

    /// Reject windows too large to list in memory
    pub fn validate(&self) -> Result<(), SyncError> {
        if self.expected_len() > MAX_RETENTION_NAMES {
            return Err(SyncError::InvalidConfig {
                message: format!(
                    "retention window of {} days and {} years keeps more than {} images",
                    self.days, self.years, MAX_RETENTION_NAMES
                ),
            });
        }
        Ok(())
    }
}

impl Default for RetentionWindow {
    fn default() -> Self {
        Self {
            days: DEFAULT_DAYS,
            years: DEFAULT_YEARS,
            square: false,
        }
    }
}

/// Which resolution to download
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeLimit {
    /// Always take the full-size image (`-1`)
    AlwaysHigh,
    /// Always take the thumbnail (`0`)
    AlwaysLow,
    /// Take the full-size image unless it is larger than this many bytes
    Threshold(u64),
}

impl TryFrom<i64> for SizeLimit {
    type Error = SyncError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Self::AlwaysHigh),
            0 => Ok(Self::AlwaysLow),
            n if n > 0 => Ok(Self::Threshold(n as u64)),
            n => Err(SyncError::InvalidConfig {
                message: format!("size limit must be -1, 0 or a positive byte count, got {}", n),
            }),
        }
    }
}

impl Default for SizeLimit {
    fn default() -> Self {
        Self::Threshold(DEFAULT_SIZE_LIMIT as u64)
    }
}

/// Fully resolved settings for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    /// Directory the images are mirrored into
    pub local_path: PathBuf,
    pub retention: RetentionWindow,
    /// Download canonical images again even when present
    pub force: bool,
    /// Never delete stale files
    pub skip_cleanup: bool,
    pub size_limit: SizeLimit,
}

impl SyncOptions {
    pub fn new(local_path: impl Into<PathBuf>) -> Self {
        Self {
            local_path: local_path.into(),
            retention: RetentionWindow::default(),
            force: false,
            skip_cleanup: false,
            size_limit: SizeLimit::default(),
        }
    }
}

/// Full-size and thumbnail links found on one archive page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageLinks {
    /// Target of the anchor, relative to the archive root
    pub high_res: String,
    /// Source of the thumbnail inside the anchor
    pub low_res: String,
    /// Extension shared by both links, without the dot
    pub extension: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    High,
    Low,
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::High => f.write_str("high resolution"),
            Resolution::Low => f.write_str("low resolution"),
        }
    }
}

/// The image chosen for a basename
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImage {
    pub basename: Basename,
    /// Path relative to the archive root
    pub remote_path: String,
    pub extension: String,
    pub resolution: Resolution,
}

impl ResolvedImage {
    /// Name of the local file this image is stored as
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.basename, self.extension)
    }
}
