pub mod archive;
pub mod config;
pub mod constants;
pub mod error;
pub mod inventory;
pub mod logging;
pub mod models;
pub mod policy;
pub mod report;
pub mod resolver;
pub mod sync;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

pub use archive::{HttpArchive, ImageArchive};
pub use error::{SkipKind, SkippedItem, SyncError};
pub use models::{Basename, RetentionWindow, SizeLimit, SyncOptions};
pub use report::{ConsoleReporter, Reporter, SyncEvent};
pub use sync::{SyncReport, Synchronizer};
