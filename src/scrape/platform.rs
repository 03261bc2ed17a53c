//! Per-platform augmentation hooks.
//!
//! Some platforms strip or genericize their Open Graph tags. A hook runs after
//! generic tag extraction on the same parsed document and returns an override
//! record whose present fields win.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;
use url::Url;

use super::{element_text, first_element, selector, truncate_chars};
use crate::metadata::MetadataOverride;

pub trait PlatformHook: Send + Sync {
    fn name(&self) -> &'static str;

    fn matches(&self, url: &Url) -> bool;

    /// Structured data embedded in the page; used by the static scraper.
    fn embedded_data(&self, document: &Html) -> MetadataOverride;

    /// Ordered selector candidates; used by the permissive scraper.
    fn selector_candidates(&self, document: &Html) -> MetadataOverride;
}

static HOOKS: Lazy<Vec<Box<dyn PlatformHook>>> = Lazy::new(|| vec![Box::new(Instagram)]);

pub fn hooks_for<'a>(url: &'a Url) -> impl Iterator<Item = &'static dyn PlatformHook> + 'a {
    HOOKS.iter().map(|h| &**h).filter(move |h| h.matches(url))
}

static SHARED_DATA_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"window\._sharedData = (\{.+\});").expect("Failed to compile sharedData regex")
});

const IMAGE_CANDIDATES: [&str; 5] = [
    r#"meta[property="og:image"]"#,
    r#"meta[name="twitter:image"]"#,
    r#"link[rel="image_src"]"#,
    r#"img[src*="cdninstagram"]"#,
    r#"img[alt*="photo"]"#,
];

const CAPTION_CANDIDATES: [&str; 5] = [
    r#"meta[property="og:description"]"#,
    r#"meta[name="twitter:description"]"#,
    ".Caption",
    r#"[data-testid="post-caption"]"#,
    "h2",
];

const TITLE_CANDIDATES: [&str; 4] = [
    r#"meta[property="og:title"]"#,
    r#"meta[name="twitter:title"]"#,
    "title",
    "h1",
];

const MIN_CAPTION_CHARS: usize = 10;
const MAX_CAPTION_CHARS: usize = 200;

pub struct Instagram;

impl Instagram {
    fn from_json_ld(document: &Html, found: &mut MetadataOverride) {
        let Some(sel) = selector(r#"script[type="application/ld+json"]"#) else {
            return;
        };

        for element in document.select(&sel) {
            let json_text = element_text(&element);
            let Ok(json) = serde_json::from_str::<serde_json::Value>(&json_text) else {
                continue;
            };

            if let Some(url) = json
                .get("image")
                .and_then(|img| img.get("url").or(Some(img)))
                .and_then(|v| v.as_str())
            {
                found.image = Some(url.to_string());
            }
            if let Some(name) = json.get("name").and_then(|v| v.as_str()) {
                found.title = Some(name.to_string());
            }
            if let Some(desc) = json.get("description").and_then(|v| v.as_str()) {
                found.description = Some(desc.to_string());
            }
        }
    }

    fn from_shared_data(document: &Html, found: &mut MetadataOverride) {
        let Some(sel) = selector("script") else {
            return;
        };

        let Some(script) = document
            .select(&sel)
            .map(|el| element_text(&el))
            .find(|text| text.contains("window._sharedData"))
        else {
            return;
        };

        let Some(blob) = SHARED_DATA_REGEX.captures(&script).and_then(|c| c.get(1)) else {
            return;
        };

        let Ok(shared) = serde_json::from_str::<serde_json::Value>(blob.as_str()) else {
            log::debug!("instagram: malformed _sharedData blob");
            return;
        };

        let Some(media) = shared.pointer("/entry_data/PostPage/0/graphql/shortcode_media") else {
            return;
        };

        if let Some(url) = media.get("display_url").and_then(|v| v.as_str()) {
            found.image = Some(url.to_string());
        }
        if let Some(name) = media.pointer("/owner/full_name").and_then(|v| v.as_str()) {
            found.title = Some(name.to_string());
        }
        if let Some(caption) = media
            .pointer("/edge_media_to_caption/edges/0/node/text")
            .and_then(|v| v.as_str())
        {
            found.description = Some(caption.to_string());
        }
    }

    /// `content`, `href` or `src` of the first element matching `css`.
    fn candidate_link(document: &Html, css: &str) -> Option<String> {
        let el = first_element(document, css)?;
        let value = el.value();
        value
            .attr("content")
            .filter(|v| !v.is_empty())
            .or_else(|| value.attr("href").filter(|v| !v.is_empty()))
            .or_else(|| value.attr("src"))
            .map(str::to_string)
    }

    /// `content` of the first element matching `css`, or its text.
    fn candidate_text(document: &Html, css: &str) -> Option<String> {
        let el = first_element(document, css)?;
        let text = match el.value().attr("content").filter(|v| !v.is_empty()) {
            Some(content) => content.to_string(),
            None => element_text(&el),
        };
        Some(text.trim().to_string())
    }
}

impl PlatformHook for Instagram {
    fn name(&self) -> &'static str {
        "instagram"
    }

    fn matches(&self, url: &Url) -> bool {
        url.host_str()
            .map(|host| host == "instagram.com" || host.ends_with(".instagram.com"))
            .unwrap_or(false)
    }

    fn embedded_data(&self, document: &Html) -> MetadataOverride {
        let mut found = MetadataOverride::default();
        Self::from_json_ld(document, &mut found);
        Self::from_shared_data(document, &mut found);
        found
    }

    fn selector_candidates(&self, document: &Html) -> MetadataOverride {
        let image = IMAGE_CANDIDATES
            .iter()
            .filter_map(|css| Self::candidate_link(document, css))
            .find(|src| src.starts_with("http"));

        let description = CAPTION_CANDIDATES
            .iter()
            .filter_map(|css| Self::candidate_text(document, css))
            .find(|text| text.chars().count() >= MIN_CAPTION_CHARS)
            .map(|text| truncate_chars(&text, MAX_CAPTION_CHARS));

        let title = TITLE_CANDIDATES
            .iter()
            .filter_map(|css| Self::candidate_text(document, css))
            .find(|text| !text.is_empty());

        MetadataOverride {
            title,
            description,
            image,
        }
    }
}
