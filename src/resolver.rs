use crate::archive::ImageArchive;
use crate::error::{SkipKind, SkippedItem};
use crate::models::{Basename, ImageLinks, Resolution, ResolvedImage, SizeLimit};
use regex::Regex;
use std::sync::OnceLock;

/// Anchor whose content starts with an image tag
fn anchor_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?i)<a\s+href\s*=\s*"([^"]+)"[^>]*>\s*<img\s[^>]*?src\s*=\s*"([^"]+)""#)
            .expect("anchor pattern must compile")
    })
}

/// Link target split into stem and extension
fn link_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)^(.+)\.([a-z0-9_]+)$").expect("link pattern must compile"))
}

/// Trailing size marker such as `_2048` or `1024`
fn size_suffix_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"_?[0-9]+$").expect("size suffix pattern must compile"))
}

fn split_link(link: &str) -> Option<(&str, &str)> {
    let captures = link_pattern().captures(link)?;
    Some((captures.get(1)?.as_str(), captures.get(2)?.as_str()))
}

/// The stem as written and the stem without its size marker
fn stem_forms(stem: &str) -> [&str; 2] {
    let trimmed = size_suffix_pattern()
        .find(stem)
        .map_or(stem, |suffix| &stem[..suffix.start()]);
    [stem, trimmed]
}

/// Stems match when they are equal once either side drops its size marker
fn same_image(high_stem: &str, low_stem: &str) -> bool {
    let low_forms = stem_forms(low_stem);
    stem_forms(high_stem)
        .iter()
        .filter(|stem| !stem.is_empty())
        .any(|high| low_forms.iter().any(|low| high.eq_ignore_ascii_case(low)))
}

/// Find the full-size image and its thumbnail on an archive page.
///
/// The first anchor wrapping an `<img>` whose link and source share a stem
/// (ignoring a trailing size marker like `_2048` or `1024` on either side) and
/// an extension wins. Anchors around unrelated images, such as the site logo,
/// are passed over. Video days have no such pair and yield `None`.
pub fn parse_image_links(html: &str) -> Option<ImageLinks> {
    anchor_pattern().captures_iter(html).find_map(|captures| {
        let high_res = captures.get(1)?.as_str();
        let low_res = captures.get(2)?.as_str();
        let (high_stem, extension) = split_link(high_res)?;
        let (low_stem, low_extension) = split_link(low_res)?;

        let same_extension = extension.eq_ignore_ascii_case(low_extension);
        (same_extension && same_image(high_stem, low_stem)).then(|| ImageLinks {
            high_res: high_res.to_string(),
            low_res: low_res.to_string(),
            extension: extension.to_string(),
        })
    })
}

/// Turns a basename into the remote image to download
pub struct Resolver<'a, A: ImageArchive + ?Sized> {
    archive: &'a A,
    size_limit: SizeLimit,
}

impl<'a, A: ImageArchive + ?Sized> Resolver<'a, A> {
    pub fn new(archive: &'a A, size_limit: SizeLimit) -> Self {
        Self { archive, size_limit }
    }

    /// Fetch the page for `basename`, extract its image pair and pick one
    pub async fn resolve(&self, basename: &Basename) -> Result<ResolvedImage, SkippedItem> {
        let html = self
            .archive
            .fetch_page(basename)
            .await
            .map_err(|e| SkippedItem::from_error(basename.as_str(), &e, SkipKind::PageUnavailable))?;

        let links = parse_image_links(&html).ok_or_else(|| {
            SkippedItem::new(basename.as_str(), "No usable image on page", SkipKind::NoUsableImage)
        })?;

        let resolution = self.choose(&links).await;
        let remote_path = match resolution {
            Resolution::High => links.high_res,
            Resolution::Low => links.low_res,
        };

        Ok(ResolvedImage {
            basename: basename.clone(),
            remote_path,
            extension: links.extension,
            resolution,
        })
    }

    /// Apply the size limit to a link pair. Only a threshold triggers a probe;
    /// an unknown or empty size falls back to the thumbnail.
    pub async fn choose(&self, links: &ImageLinks) -> Resolution {
        let limit = match self.size_limit {
            SizeLimit::AlwaysHigh => return Resolution::High,
            SizeLimit::AlwaysLow => return Resolution::Low,
            SizeLimit::Threshold(limit) => limit,
        };

        match self.archive.probe_size(&links.high_res).await {
            Ok(Some(size)) if size > 0 && size <= limit => Resolution::High,
            Ok(Some(size)) if size > 0 => {
                tracing::debug!(path = %links.high_res, size, limit, "High resolution image over limit");
                Resolution::Low
            }
            Ok(_) => {
                tracing::debug!(path = %links.high_res, "Size unknown, using low resolution");
                Resolution::Low
            }
            Err(e) => {
                tracing::warn!(path = %links.high_res, "Size probe failed, using low resolution: {:#}", e);
                Resolution::Low
            }
        }
    }
}
