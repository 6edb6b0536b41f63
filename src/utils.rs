use crate::constants::{EXCLUDED_FILES, HIDDEN_PREFIX};
use std::path::{Path, PathBuf};

/// File name without its last extension (`ap230105.jpg` -> `ap230105`)
pub fn file_basename(file_name: &str) -> &str {
    Path::new(file_name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(file_name)
}

/// Hidden entries and OS artifacts are never classified
pub fn is_excluded(file_name: &str) -> bool {
    file_name.starts_with(HIDDEN_PREFIX) || EXCLUDED_FILES.contains(&file_name)
}

/// Expand `~` and environment variables in a user supplied path
pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::full(path).map(|p| p.into_owned()).unwrap_or_else(|_| path.to_string()))
}
