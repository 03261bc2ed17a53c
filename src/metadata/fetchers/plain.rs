use crate::metadata::fetchers::MetadataFetcher;
use crate::metadata::normalize::{absolutize, hostname};
use crate::metadata::types::{ResolvedMetadata, SourceKind};
use crate::scrape::{self, platform, HeaderProfile, PageTags};
use scraper::Html;
use std::time::Duration;
use url::Url;

const PARAGRAPH_DESCRIPTION_CHARS: usize = 160;

/// Build metadata from a page using Open Graph, Twitter Card and generic tags,
/// then let platform hooks override with embedded structured data.
pub fn static_metadata(html: &str, url: &Url) -> ResolvedMetadata {
    let document = Html::parse_document(html);
    let tags = PageTags::from_document(&document);

    let mut title = tags.title().unwrap_or_default();
    let mut description = tags.description().unwrap_or_default();
    let mut image = tags.image().unwrap_or_default();
    let site_name = tags.site_name().unwrap_or_else(|| hostname(url));

    for hook in platform::hooks_for(url) {
        let found = hook.embedded_data(&document);
        if !found.is_empty() {
            log::debug!("{url}: {} embedded data applied", hook.name());
        }
        found.apply(&mut title, &mut description, &mut image);
    }

    ResolvedMetadata {
        title,
        description,
        image: absolutize(&image, url),
        site_name,
        source_kind: SourceKind::Static,
    }
    .trimmed()
}

/// Like [`static_metadata`] with body-level fallbacks (first heading, first
/// paragraph, first image) and selector-based platform hooks.
pub fn permissive_metadata(html: &str, url: &Url) -> ResolvedMetadata {
    let document = Html::parse_document(html);
    let tags = PageTags::from_document(&document);

    let mut title = tags
        .title()
        .or_else(|| tags.first_heading.clone())
        .unwrap_or_default();
    let mut description = tags
        .description()
        .or_else(|| {
            tags.first_paragraph
                .as_deref()
                .map(|p| scrape::truncate_chars(p, PARAGRAPH_DESCRIPTION_CHARS))
        })
        .unwrap_or_default();
    let mut image = tags
        .image()
        .or_else(|| tags.first_image.clone())
        .unwrap_or_default();
    let site_name = tags.site_name().unwrap_or_else(|| hostname(url));

    for hook in platform::hooks_for(url) {
        let found = hook.selector_candidates(&document);
        if !found.is_empty() {
            log::debug!("{url}: {} selector candidates applied", hook.name());
        }
        found.apply(&mut title, &mut description, &mut image);
    }

    ResolvedMetadata {
        title,
        description,
        image: absolutize(&image, url),
        site_name,
        source_kind: SourceKind::HeadlessFallback,
    }
    .trimmed()
}

/// Plain fetch with an identifying user agent.
pub struct StaticFetcher {
    profile: HeaderProfile,
    timeout: Duration,
}

impl StaticFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> Self {
        Self {
            profile: HeaderProfile::Identifying {
                user_agent: user_agent.to_string(),
            },
            timeout,
        }
    }
}

impl MetadataFetcher for StaticFetcher {
    fn fetch(&self, url: &Url) -> anyhow::Result<Option<ResolvedMetadata>> {
        let html = scrape::fetch_page(url.as_str(), &self.profile, self.timeout)?;
        log::debug!("plain request successful");
        Ok(Some(static_metadata(&html, url)))
    }

    fn name(&self) -> &'static str {
        "Static"
    }
}

/// Fetch with a desktop-browser header set, used when the static fetch fails.
/// It does not execute JavaScript.
pub struct PermissiveFetcher {
    timeout: Duration,
}

impl PermissiveFetcher {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl MetadataFetcher for PermissiveFetcher {
    fn fetch(&self, url: &Url) -> anyhow::Result<Option<ResolvedMetadata>> {
        let html = scrape::fetch_page(url.as_str(), &HeaderProfile::Browser, self.timeout)?;
        log::debug!("browser-header request successful");
        Ok(Some(permissive_metadata(&html, url)))
    }

    fn name(&self) -> &'static str {
        "HeadlessFallback"
    }
}
