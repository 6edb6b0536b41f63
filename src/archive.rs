use crate::constants::{DEFAULT_ARCHIVE_URL, DEFAULT_USER_AGENT, PAGE_EXTENSION};
use crate::models::Basename;
use anyhow::{Context, Result};
use futures::stream::{BoxStream, StreamExt};
use reqwest::header::CONTENT_LENGTH;
use reqwest::{Client, Response};

/// Image bytes as they arrive from the archive
pub type ByteStream = BoxStream<'static, Result<Vec<u8>>>;

/// Remote archive holding one HTML page per day and the images it links to
#[async_trait::async_trait]
pub trait ImageArchive: Send + Sync {
    /// Fetch the HTML page published for `basename`
    async fn fetch_page(&self, basename: &Basename) -> Result<String>;

    /// Size in bytes of the resource at `path`, if the archive reports one
    async fn probe_size(&self, path: &str) -> Result<Option<u64>>;

    /// Open the resource at `path` for streaming
    async fn open_image(&self, path: &str) -> Result<ByteStream>;
}

/// `ImageArchive` backed by the public APOD web site
pub struct HttpArchive {
    base_url: String,
    client: Client,
}

impl HttpArchive {
    /// Create a client for the archive rooted at `base_url`
    /// Default URL: https://apod.nasa.gov/apod/
    pub fn new(base_url: Option<&str>, user_agent: Option<&str>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent.unwrap_or(DEFAULT_USER_AGENT))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.unwrap_or(DEFAULT_ARCHIVE_URL).trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Absolute URL of a path relative to the archive root
    pub fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn get(&self, url: &str) -> Result<Response> {
        tracing::debug!(%url, "GET");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to connect to {}", url))?;
        ensure_success(response, url)
    }
}

fn ensure_success(response: Response, url: &str) -> Result<Response> {
    if !response.status().is_success() {
        anyhow::bail!("Archive returned error {} for {}", response.status(), url);
    }
    Ok(response)
}

/// Declared body length. `Response::content_length` reports 0 for HEAD
/// responses, so the header is read directly.
fn declared_length(response: &Response) -> Option<u64> {
    response
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
}

#[async_trait::async_trait]
impl ImageArchive for HttpArchive {
    async fn fetch_page(&self, basename: &Basename) -> Result<String> {
        let url = self.url_for(&format!("{}.{}", basename, PAGE_EXTENSION));
        let response = self.get(&url).await?;
        response
            .text()
            .await
            .with_context(|| format!("Failed to read page body from {}", url))
    }

    async fn probe_size(&self, path: &str) -> Result<Option<u64>> {
        let url = self.url_for(path);
        tracing::debug!(%url, "HEAD");

        let head = self
            .client
            .head(&url)
            .send()
            .await
            .map_err(anyhow::Error::from)
            .and_then(|response| ensure_success(response, &url));

        match head {
            Ok(response) => {
                if let Some(length) = declared_length(&response) {
                    return Ok(Some(length));
                }
            }
            Err(e) => tracing::debug!(%url, "HEAD failed, falling back to GET: {:#}", e),
        }

        // The body is never read; dropping the response closes the transfer.
        let response = self.get(&url).await?;
        Ok(declared_length(&response))
    }

    async fn open_image(&self, path: &str) -> Result<ByteStream> {
        let url = self.url_for(path);
        let response = self.get(&url).await?;
        let stream = response.bytes_stream().map(move |chunk| {
            chunk
                .map(|bytes| bytes.to_vec())
                .context("Failed while streaming image body")
        });
        Ok(stream.boxed())
    }
}
