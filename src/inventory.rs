use crate::error::SyncError;
use crate::models::Basename;
use crate::utils;
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::PathBuf;
use walkdir::WalkDir;

/// Source of the file names present in the image directory
pub trait DirectoryListing {
    /// Names of the files directly inside the directory
    fn file_names(&self) -> Result<Vec<String>, SyncError>;
}

impl<S: AsRef<str>> DirectoryListing for [S] {
    fn file_names(&self) -> Result<Vec<String>, SyncError> {
        Ok(self.iter().map(|name| name.as_ref().to_string()).collect())
    }
}

impl<S: AsRef<str>> DirectoryListing for Vec<S> {
    fn file_names(&self) -> Result<Vec<String>, SyncError> {
        self.as_slice().file_names()
    }
}

/// The flat directory images are mirrored into
#[derive(Debug, Clone)]
pub struct LocalDirectory {
    path: PathBuf,
}

impl LocalDirectory {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// Create the directory and its parents if missing
    pub fn ensure_exists(&self) -> Result<(), SyncError> {
        if self.path.is_dir() {
            return Ok(());
        }
        std::fs::create_dir_all(&self.path).map_err(|source| SyncError::CreateDirectory {
            path: self.path.clone(),
            source,
        })
    }

    pub fn file_path(&self, file_name: &str) -> PathBuf {
        self.path.join(file_name)
    }

    /// Delete one file from the directory
    pub async fn remove(&self, file_name: &str) -> Result<()> {
        let path = self.file_path(file_name);
        tokio::fs::remove_file(&path)
            .await
            .with_context(|| format!("Failed to delete {}", path.display()))
    }
}

impl DirectoryListing for LocalDirectory {
    fn file_names(&self) -> Result<Vec<String>, SyncError> {
        let mut names = Vec::new();
        let entries = WalkDir::new(&self.path)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name();

        for entry in entries {
            let entry = entry.map_err(|source| SyncError::ListDirectory {
                path: self.path.clone(),
                source,
            })?;

            if entry.file_type().is_dir() {
                continue;
            }

            match entry.file_name().to_str() {
                Some(name) => names.push(name.to_string()),
                None => tracing::warn!(path = %entry.path().display(), "Ignoring non UTF-8 file name"),
            }
        }

        Ok(names)
    }
}

/// Local files split by the retention policy
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory {
    /// Basenames of files that match a canonical name
    pub keep: Vec<String>,
    /// File names whose basename is not canonical
    pub stale: Vec<String>,
}

impl Inventory {
    /// Whether some local file, whatever its extension, has this basename
    pub fn contains(&self, basename: &str) -> bool {
        self.keep.iter().any(|kept| kept == basename)
    }
}

/// Classify every listed file as kept or stale.
///
/// Hidden entries and OS artifacts are left out of both lists.
pub fn scan<L>(listing: &L, names: &HashSet<Basename>) -> Result<Inventory, SyncError>
where
    L: DirectoryListing + ?Sized,
{
    let mut inventory = Inventory::default();

    for file_name in listing.file_names()? {
        if utils::is_excluded(&file_name) {
            continue;
        }

        let basename = utils::file_basename(&file_name);
        if names.contains(basename) {
            inventory.keep.push(basename.to_string());
        } else {
            inventory.stale.push(file_name);
        }
    }

    Ok(inventory)
}
