/// Constants used throughout apod-sync
/// This module centralizes all constant values for better maintainability

/// Root of the Astronomy Picture of the Day archive
pub const DEFAULT_ARCHIVE_URL: &str = "https://apod.nasa.gov/apod/";

/// User agent sent with every archive request
pub const DEFAULT_USER_AGENT: &str = concat!("apod-sync/", env!("CARGO_PKG_VERSION"));

/// Number of days kept before the reference date
pub const DEFAULT_DAYS: u32 = 3;

/// Upper bound on the basenames one run may keep
pub const MAX_RETENTION_NAMES: usize = 100_000;

/// Number of yearly anniversaries kept
pub const DEFAULT_YEARS: u32 = 5;

/// High resolution images above this many bytes are replaced by their thumbnail
pub const DEFAULT_SIZE_LIMIT: i64 = 15_000_000;

/// Every archive page and canonical file name starts with this prefix
pub const BASENAME_PREFIX: &str = "ap";

/// `chrono` format for the date part of a basename (YYMMDD)
pub const BASENAME_DATE_FORMAT: &str = "%y%m%d";

/// Extension of the archive's daily pages
pub const PAGE_EXTENSION: &str = "html";

/// Suffix appended to an image while it is being downloaded
pub const PARTIAL_SUFFIX: &str = "part";

/// Names starting with this marker are never touched
pub const HIDDEN_PREFIX: char = '.';

/// OS artifacts that live next to the images and must survive cleanup
pub const EXCLUDED_FILES: &[&str] = &[
    "Thumbs.db", // Windows thumbnail cache
];

/// Environment variable holding the tracing filter
pub const LOG_ENV: &str = "APOD_SYNC_LOG";

/// Default configuration file locations, searched in order
pub const CONFIG_PATHS: &[&str] = &[
    "config/settings.toml",
    "~/.config/apod-sync/settings.toml",
];
