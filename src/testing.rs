//! In-memory archive used by unit tests.

use crate::archive::{ByteStream, ImageArchive};
use crate::models::Basename;
use anyhow::Result;
use futures::stream::{self, StreamExt};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// Minimal APOD-like page linking `high` and showing `low`
pub(crate) fn apod_page(high: &str, low: &str) -> String {
    format!(
        "<html><body><center>\n<a href=\"{}\">\n<IMG SRC=\"{}\" alt=\"See Explanation.\"></a>\n</center></body></html>",
        high, low
    )
}

#[derive(Default)]
pub(crate) struct FakeArchive {
    pages: HashMap<String, String>,
    images: HashMap<String, Vec<u8>>,
    declared_sizes: HashMap<String, Option<u64>>,
    broken_images: HashSet<String>,
    probe_fails: bool,
    requests: Mutex<Vec<String>>,
}

impl FakeArchive {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_page(mut self, basename: &str, html: impl Into<String>) -> Self {
        self.pages.insert(basename.to_string(), html.into());
        self
    }

    pub(crate) fn with_image(mut self, path: &str, bytes: &[u8]) -> Self {
        self.images.insert(path.to_string(), bytes.to_vec());
        self
    }

    /// Publish a day with a high and low resolution image
    pub(crate) fn with_day(self, basename: &str, high: (&str, &[u8]), low: (&str, &[u8])) -> Self {
        self.with_page(basename, apod_page(high.0, low.0))
            .with_image(high.0, high.1)
            .with_image(low.0, low.1)
    }

    /// Override the size reported by `probe_size`
    pub(crate) fn with_declared_size(mut self, path: &str, size: Option<u64>) -> Self {
        self.declared_sizes.insert(path.to_string(), size);
        self
    }

    /// The image stream fails after its first chunk
    pub(crate) fn with_broken_image(mut self, path: &str) -> Self {
        self.broken_images.insert(path.to_string());
        self
    }

    pub(crate) fn with_failing_probe(mut self) -> Self {
        self.probe_fails = true;
        self
    }

    pub(crate) fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    fn record(&self, request: String) {
        self.requests.lock().unwrap().push(request);
    }
}

#[async_trait::async_trait]
impl ImageArchive for FakeArchive {
    async fn fetch_page(&self, basename: &Basename) -> Result<String> {
        self.record(format!("page {}", basename));
        self.pages
            .get(basename.as_str())
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("Archive returned error 404 Not Found for {}", basename))
    }

    async fn probe_size(&self, path: &str) -> Result<Option<u64>> {
        self.record(format!("probe {}", path));
        if self.probe_fails {
            anyhow::bail!("Failed to connect to {}", path);
        }
        if let Some(size) = self.declared_sizes.get(path) {
            return Ok(*size);
        }
        self.images
            .get(path)
            .map(|bytes| Some(bytes.len() as u64))
            .ok_or_else(|| anyhow::anyhow!("Archive returned error 404 Not Found for {}", path))
    }

    async fn open_image(&self, path: &str) -> Result<ByteStream> {
        self.record(format!("image {}", path));
        let bytes = self
            .images
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("Archive returned error 404 Not Found for {}", path))?;

        let mut chunks: Vec<Result<Vec<u8>>> = bytes.chunks(4).map(|chunk| Ok(chunk.to_vec())).collect();
        if self.broken_images.contains(path) {
            chunks.truncate(1);
            chunks.push(Err(anyhow::anyhow!("connection reset while streaming {}", path)));
        }
        Ok(stream::iter(chunks).boxed())
    }
}
