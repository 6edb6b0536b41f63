use crate::archive::ImageArchive;
use crate::constants::PARTIAL_SUFFIX;
use crate::error::{SkipKind, SkippedItem, SyncError};
use crate::inventory::{self, Inventory, LocalDirectory};
use crate::models::{Basename, ResolvedImage, SyncOptions};
use crate::policy;
use crate::report::{CleanupOutcome, Reporter, SyncEvent};
use crate::resolver::Resolver;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use futures::StreamExt;
use std::collections::HashSet;
use std::path::Path;
use tokio::io::AsyncWriteExt;

/// What a run is going to do, decided before any network access
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncPlan {
    /// Canonical basenames to fetch, in retention order, without duplicates
    pub to_download: Vec<Basename>,
    /// Canonical basenames already present and left alone
    pub present: Vec<Basename>,
    /// Stale local file names
    pub to_remove: Vec<String>,
}

/// Decide downloads and removals from the retention names and the inventory.
/// With `force`, present images are fetched again.
pub fn plan(names: &[Basename], inventory: &Inventory, force: bool) -> SyncPlan {
    let mut plan = SyncPlan {
        to_remove: inventory.stale.clone(),
        ..SyncPlan::default()
    };
    let mut seen = HashSet::new();

    for name in names {
        if !seen.insert(name.as_str()) {
            continue;
        }
        if force || !inventory.contains(name.as_str()) {
            plan.to_download.push(name.clone());
        } else {
            plan.present.push(name.clone());
        }
    }

    plan
}

/// Outcome of a completed run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub downloaded: usize,
    pub deleted: usize,
    pub failed_deletions: usize,
    /// Items skipped this run, retried on the next one
    pub skipped: Vec<SkippedItem>,
    pub cleanup: CleanupOutcome,
}

/// Mirrors the retention window of an archive into a local directory
pub struct Synchronizer<'a, A: ImageArchive + ?Sized> {
    options: &'a SyncOptions,
    archive: &'a A,
    directory: LocalDirectory,
}

impl<'a, A: ImageArchive + ?Sized> Synchronizer<'a, A> {
    pub fn new(options: &'a SyncOptions, archive: &'a A) -> Self {
        Self {
            options,
            archive,
            directory: LocalDirectory::new(&options.local_path),
        }
    }

    /// Run one full pass for the `reference` date.
    ///
    /// Fails only when the directory cannot be prepared or listed, or the
    /// retention dates cannot be computed; nothing is downloaded or deleted in
    /// that case. Every other failure skips one item and is reported.
    pub async fn run<R>(&self, reference: NaiveDate, reporter: &mut R) -> Result<SyncReport, SyncError>
    where
        R: Reporter + ?Sized,
    {
        self.directory.ensure_exists()?;

        let names = policy::retention_names(reference, &self.options.retention)?;
        reporter.report(SyncEvent::NamesGenerated { count: names.len() });

        let canonical: HashSet<Basename> = names.iter().cloned().collect();
        let inventory = inventory::scan(&self.directory, &canonical)?;
        for basename in &inventory.keep {
            reporter.report(SyncEvent::FileClassified {
                file_name: basename.clone(),
                stale: false,
            });
        }
        for file_name in &inventory.stale {
            reporter.report(SyncEvent::FileClassified {
                file_name: file_name.clone(),
                stale: true,
            });
        }

        let plan = plan(&names, &inventory, self.options.force);
        tracing::info!(
            download = plan.to_download.len(),
            present = plan.present.len(),
            stale = plan.to_remove.len(),
            "Sync planned"
        );

        for basename in &plan.present {
            reporter.report(SyncEvent::AlreadyPresent {
                basename: basename.clone(),
            });
        }

        let mut skipped = Vec::new();
        let mut downloaded = 0;
        let resolver = Resolver::new(self.archive, self.options.size_limit);

        for basename in &plan.to_download {
            reporter.report(SyncEvent::Checking {
                basename: basename.clone(),
            });

            let image = match resolver.resolve(basename).await {
                Ok(image) => image,
                Err(item) => {
                    reporter.report(SyncEvent::Skipped(item.clone()));
                    skipped.push(item);
                    continue;
                }
            };
            reporter.report(SyncEvent::ImageChosen {
                basename: basename.clone(),
                remote_path: image.remote_path.clone(),
                resolution: image.resolution,
            });

            match self.download(&image).await {
                Ok(bytes) => {
                    downloaded += 1;
                    reporter.report(SyncEvent::Downloaded {
                        file_name: image.file_name(),
                        bytes,
                    });
                }
                Err(e) => {
                    let item = SkippedItem::from_error(basename.as_str(), &e, SkipKind::DownloadFailed);
                    reporter.report(SyncEvent::Skipped(item.clone()));
                    skipped.push(item);
                }
            }
        }

        let cleanup = if self.options.skip_cleanup {
            CleanupOutcome::Disabled
        } else if downloaded == 0 {
            CleanupOutcome::NoSuccessfulDownload
        } else {
            let (deleted, failures) = self.remove_stale(&plan.to_remove, reporter).await;
            let failed = failures.len();
            skipped.extend(failures);
            CleanupOutcome::Completed { deleted, failed }
        };
        reporter.report(SyncEvent::Cleanup(cleanup));

        let (deleted, failed_deletions) = match cleanup {
            CleanupOutcome::Completed { deleted, failed } => (deleted, failed),
            _ => (0, 0),
        };
        reporter.report(SyncEvent::Finished { downloaded, deleted });

        Ok(SyncReport {
            downloaded,
            deleted,
            failed_deletions,
            skipped,
            cleanup,
        })
    }

    /// Stream an image into `<basename>.<ext>.part`, then move it into place.
    /// On failure the partial file is removed and the image stays absent.
    async fn download(&self, image: &ResolvedImage) -> Result<u64> {
        let file_name = image.file_name();
        let target = self.directory.file_path(&file_name);
        let partial = self
            .directory
            .file_path(&format!("{}.{}", file_name, PARTIAL_SUFFIX));

        let outcome = async {
            let bytes = self.write_partial(image, &partial).await?;
            tokio::fs::rename(&partial, &target)
                .await
                .with_context(|| format!("Failed to move {} into place", partial.display()))?;
            Ok::<u64, anyhow::Error>(bytes)
        }
        .await;

        if outcome.is_err() {
            let _ = tokio::fs::remove_file(&partial).await;
        }
        outcome
    }

    async fn write_partial(&self, image: &ResolvedImage, partial: &Path) -> Result<u64> {
        let mut stream = self.archive.open_image(&image.remote_path).await?;
        let mut file = tokio::fs::File::create(partial)
            .await
            .with_context(|| format!("Failed to create {}", partial.display()))?;

        let mut written = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk)
                .await
                .with_context(|| format!("Failed to write {}", partial.display()))?;
            written += chunk.len() as u64;
        }
        file.flush()
            .await
            .with_context(|| format!("Failed to write {}", partial.display()))?;

        Ok(written)
    }

    /// Delete every stale file; failures are collected, not propagated
    pub(crate) async fn remove_stale<R>(&self, files: &[String], reporter: &mut R) -> (usize, Vec<SkippedItem>)
    where
        R: Reporter + ?Sized,
    {
        let mut deleted = 0;
        let mut failures = Vec::new();

        for file_name in files {
            match self.directory.remove(file_name).await {
                Ok(()) => {
                    deleted += 1;
                    reporter.report(SyncEvent::Deleted {
                        file_name: file_name.clone(),
                    });
                }
                Err(e) => {
                    let item = SkippedItem::from_error(file_name.as_str(), &e, SkipKind::RemoveFailed);
                    reporter.report(SyncEvent::Skipped(item.clone()));
                    failures.push(item);
                }
            }
        }

        (deleted, failures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RetentionWindow, SizeLimit};
    use crate::report::RecordingReporter;
    use crate::testing::FakeArchive;
    use std::fs;
    use tempfile::TempDir;

    fn reference() -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 1, 5).unwrap()
    }

    fn options(dir: &Path) -> SyncOptions {
        SyncOptions {
            retention: RetentionWindow { days: 3, years: 0, square: false },
            size_limit: SizeLimit::AlwaysHigh,
            ..SyncOptions::new(dir)
        }
    }

    /// Archive publishing 2023-01-02 through 2023-01-05
    fn archive() -> FakeArchive {
        (2..=5).fold(FakeArchive::new(), |archive, day| {
            let high = format!("image/2301/Day{}_2048.jpg", day);
            let low = format!("image/2301/Day{}_960.jpg", day);
            archive.with_day(
                &format!("ap23010{}", day),
                (high.as_str(), format!("high-{}", day).as_bytes()),
                (low.as_str(), format!("low-{}", day).as_bytes()),
            )
        })
    }

    fn files(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    fn inventory(keep: &[&str], stale: &[&str]) -> Inventory {
        Inventory {
            keep: keep.iter().map(|s| s.to_string()).collect(),
            stale: stale.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn basenames(names: &[&str]) -> Vec<Basename> {
        let canonical = policy::retention_names(reference(), &RetentionWindow { days: 4, years: 0, square: false })
            .unwrap();
        names
            .iter()
            .map(|name| canonical.iter().find(|b| b.as_str() == *name).unwrap().clone())
            .collect()
    }

    #[test]
    fn test_plan_downloads_missing_names() {
        let names = basenames(&["ap230105", "ap230104", "ap230103"]);
        let plan = plan(&names, &inventory(&["ap230104"], &["ap230101.jpg"]), false);

        assert_eq!(plan.to_download, basenames(&["ap230105", "ap230103"]));
        assert_eq!(plan.present, basenames(&["ap230104"]));
        assert_eq!(plan.to_remove, vec!["ap230101.jpg"]);
    }

    #[test]
    fn test_plan_force_downloads_everything_once() {
        let names = basenames(&["ap230105", "ap230104", "ap230105"]);
        let plan = plan(&names, &inventory(&["ap230104"], &[]), true);

        assert_eq!(plan.to_download, basenames(&["ap230105", "ap230104"]));
        assert!(plan.present.is_empty());
    }

    #[test]
    fn test_plan_collapses_duplicates() {
        let names = basenames(&["ap230105", "ap230102", "ap230105", "ap230102"]);
        let plan = plan(&names, &Inventory::default(), false);
        assert_eq!(plan.to_download, basenames(&["ap230105", "ap230102"]));
    }

    #[tokio::test]
    async fn test_run_downloads_window_and_removes_stale() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("ap230101.jpg"), b"old").unwrap();
        let archive = archive();
        let options = options(temp_dir.path());
        let mut reporter = RecordingReporter::new();

        let report = Synchronizer::new(&options, &archive)
            .run(reference(), &mut reporter)
            .await
            .unwrap();

        assert_eq!(report.downloaded, 4);
        assert_eq!(report.deleted, 1);
        assert_eq!(report.cleanup, CleanupOutcome::Completed { deleted: 1, failed: 0 });
        assert!(report.skipped.is_empty());
        assert_eq!(
            files(temp_dir.path()),
            vec!["ap230102.jpg", "ap230103.jpg", "ap230104.jpg", "ap230105.jpg"]
        );
        assert_eq!(fs::read(temp_dir.path().join("ap230105.jpg")).unwrap(), b"high-5");
        assert_eq!(reporter.deleted(), vec!["ap230101.jpg"]);
    }

    #[tokio::test]
    async fn test_second_run_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let options = options(temp_dir.path());

        let first = archive();
        Synchronizer::new(&options, &first)
            .run(reference(), &mut RecordingReporter::new())
            .await
            .unwrap();

        let second = archive();
        let report = Synchronizer::new(&options, &second)
            .run(reference(), &mut RecordingReporter::new())
            .await
            .unwrap();

        assert_eq!(report.downloaded, 0);
        assert_eq!(report.deleted, 0);
        assert!(second.requests().is_empty());
        assert_eq!(files(temp_dir.path()).len(), 4);
    }

    #[tokio::test]
    async fn test_cleanup_disabled_keeps_stale_files() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("ap230101.jpg"), b"old").unwrap();
        let archive = archive();
        let options = SyncOptions {
            skip_cleanup: true,
            ..options(temp_dir.path())
        };
        let mut reporter = RecordingReporter::new();

        let report = Synchronizer::new(&options, &archive)
            .run(reference(), &mut reporter)
            .await
            .unwrap();

        assert_eq!(report.downloaded, 4);
        assert_eq!(report.cleanup, CleanupOutcome::Disabled);
        assert!(temp_dir.path().join("ap230101.jpg").exists());
        assert!(reporter.deleted().is_empty());
    }

    #[tokio::test]
    async fn test_no_download_means_no_cleanup() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("ap230101.jpg"), b"old").unwrap();
        let archive = FakeArchive::new();
        let options = options(temp_dir.path());
        let mut reporter = RecordingReporter::new();

        let report = Synchronizer::new(&options, &archive)
            .run(reference(), &mut reporter)
            .await
            .unwrap();

        assert_eq!(report.downloaded, 0);
        assert_eq!(report.cleanup, CleanupOutcome::NoSuccessfulDownload);
        assert_eq!(report.skipped.len(), 4);
        assert!(report.skipped.iter().all(|item| item.kind == SkipKind::PageUnavailable));
        assert!(temp_dir.path().join("ap230101.jpg").exists());
    }

    #[tokio::test]
    async fn test_force_downloads_present_images_again() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("ap230105.jpg"), b"stale bytes").unwrap();
        let archive = archive();
        let options = SyncOptions {
            force: true,
            ..options(temp_dir.path())
        };

        let report = Synchronizer::new(&options, &archive)
            .run(reference(), &mut RecordingReporter::new())
            .await
            .unwrap();

        assert_eq!(report.downloaded, 4);
        assert_eq!(fs::read(temp_dir.path().join("ap230105.jpg")).unwrap(), b"high-5");
    }

    #[tokio::test]
    async fn test_present_image_with_other_extension_is_kept() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("ap230105.png"), b"png").unwrap();
        let archive = archive();
        let options = options(temp_dir.path());

        let report = Synchronizer::new(&options, &archive)
            .run(reference(), &mut RecordingReporter::new())
            .await
            .unwrap();

        assert_eq!(report.downloaded, 3);
        assert_eq!(report.deleted, 0);
        assert!(temp_dir.path().join("ap230105.png").exists());
        assert!(!archive.requests().contains(&"page ap230105".to_string()));
    }

    #[tokio::test]
    async fn test_low_resolution_by_size_limit() {
        let temp_dir = TempDir::new().unwrap();
        let archive = archive();
        let options = SyncOptions {
            size_limit: SizeLimit::AlwaysLow,
            ..options(temp_dir.path())
        };

        Synchronizer::new(&options, &archive)
            .run(reference(), &mut RecordingReporter::new())
            .await
            .unwrap();

        assert_eq!(fs::read(temp_dir.path().join("ap230103.jpg")).unwrap(), b"low-3");
    }

    #[tokio::test]
    async fn test_broken_download_leaves_no_file() {
        let temp_dir = TempDir::new().unwrap();
        let archive = archive().with_broken_image("image/2301/Day4_2048.jpg");
        let options = options(temp_dir.path());

        let report = Synchronizer::new(&options, &archive)
            .run(reference(), &mut RecordingReporter::new())
            .await
            .unwrap();

        assert_eq!(report.downloaded, 3);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].name, "ap230104");
        assert_eq!(report.skipped[0].kind, SkipKind::DownloadFailed);
        assert_eq!(
            files(temp_dir.path()),
            vec!["ap230102.jpg", "ap230103.jpg", "ap230105.jpg"]
        );
    }

    #[tokio::test]
    async fn test_hidden_and_system_files_survive_cleanup() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(".keep"), b"").unwrap();
        fs::write(temp_dir.path().join("Thumbs.db"), b"").unwrap();
        fs::create_dir(temp_dir.path().join("favorites")).unwrap();
        let archive = archive();
        let options = options(temp_dir.path());

        let report = Synchronizer::new(&options, &archive)
            .run(reference(), &mut RecordingReporter::new())
            .await
            .unwrap();

        assert_eq!(report.deleted, 0);
        assert!(temp_dir.path().join(".keep").exists());
        assert!(temp_dir.path().join("Thumbs.db").exists());
        assert!(temp_dir.path().join("favorites").is_dir());
    }

    #[tokio::test]
    async fn test_remove_failure_does_not_stop_cleanup() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("ap230101.jpg"), b"old").unwrap();
        let archive = FakeArchive::new();
        let options = options(temp_dir.path());
        let synchronizer = Synchronizer::new(&options, &archive);
        let mut reporter = RecordingReporter::new();

        let stale = vec!["ap221231.jpg".to_string(), "ap230101.jpg".to_string()];
        let (deleted, failures) = synchronizer.remove_stale(&stale, &mut reporter).await;

        assert_eq!(deleted, 1);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].name, "ap221231.jpg");
        assert_eq!(failures[0].kind, SkipKind::RemoveFailed);
        assert!(!temp_dir.path().join("ap230101.jpg").exists());
        assert_eq!(reporter.skipped().len(), 1);
    }

    #[tokio::test]
    async fn test_unusable_directory_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("not-a-dir");
        fs::write(&file_path, b"x").unwrap();
        let archive = archive();
        let options = options(&file_path);

        let err = Synchronizer::new(&options, &archive)
            .run(reference(), &mut RecordingReporter::new())
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::CreateDirectory { .. }));
        assert!(archive.requests().is_empty());
    }

    #[tokio::test]
    async fn test_calendar_failure_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("ap230101.jpg"), b"old").unwrap();
        let archive = archive();
        let options = options(temp_dir.path());

        let err = Synchronizer::new(&options, &archive)
            .run(NaiveDate::MIN, &mut RecordingReporter::new())
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::Calendar { .. }));
        assert!(temp_dir.path().join("ap230101.jpg").exists());
    }
}
