pub mod platform;

use reqwest::header::{self, HeaderMap, HeaderValue};
use scraper::{ElementRef, Html, Selector};
use std::{error::Error, io::Read, time::Duration};

/// Largest page body read before giving up.
pub const MAX_BODY_SIZE: u64 = 1024 * 1024;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Request header sets used when fetching a page.
#[derive(Debug, Clone)]
pub enum HeaderProfile {
    /// Honest bot identification with standard accept and no-cache headers.
    Identifying { user_agent: String },
    /// Full desktop-browser header set.
    Browser,
}

impl HeaderProfile {
    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        match self {
            HeaderProfile::Identifying { user_agent } => {
                if let Ok(ua) = HeaderValue::from_str(user_agent) {
                    headers.insert(header::USER_AGENT, ua);
                }
                headers.insert(
                    header::ACCEPT,
                    HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
                );
                headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
                headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
                headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
            }
            HeaderProfile::Browser => {
                headers.insert(header::USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
                headers.insert(
                    header::ACCEPT,
                    HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.7"),
                );
                headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
                headers.insert(header::ACCEPT_ENCODING, HeaderValue::from_static("gzip, deflate, br"));
                headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
                headers.insert(header::UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
                headers.insert("sec-fetch-dest", HeaderValue::from_static("document"));
                headers.insert("sec-fetch-mode", HeaderValue::from_static("navigate"));
                headers.insert("sec-fetch-site", HeaderValue::from_static("none"));
                headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
            }
        }
        headers
    }
}

pub fn get_error(error: &reqwest::Error) -> String {
    match error.source() {
        Some(e) => match e.source() {
            Some(e) => e.to_string(),
            None => e.to_string(),
        },
        None => error.to_string(),
    }
}

/// Single GET with its own timeout. A non-success status or a body over
/// [`MAX_BODY_SIZE`] is an error; the body is decoded lossily so non-UTF8 pages still parse.
pub fn fetch_page(url: &str, profile: &HeaderProfile, timeout: Duration) -> anyhow::Result<String> {
    let client = reqwest::blocking::Client::builder()
        .default_headers(profile.headers())
        .timeout(timeout)
        .build()?;

    log::debug!("{url}: requesting");

    let resp = client.get(url).send().map_err(|err| {
        let cause = get_error(&err);
        anyhow::anyhow!("request failed: {err}: {cause}")
    })?;

    let status = resp.status();
    if !status.is_success() {
        anyhow::bail!("HTTP {status}");
    }

    if let Some(len) = resp.content_length() {
        if len > MAX_BODY_SIZE {
            anyhow::bail!("body too large: {len} bytes");
        }
    }

    let mut bytes = Vec::new();
    resp.take(MAX_BODY_SIZE + 1).read_to_end(&mut bytes)?;
    if bytes.len() as u64 > MAX_BODY_SIZE {
        anyhow::bail!("body exceeds {MAX_BODY_SIZE} bytes");
    }

    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Parse a CSS selector, returning `None` for selectors the parser rejects.
pub fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

pub fn first_element<'a>(document: &'a Html, css: &str) -> Option<ElementRef<'a>> {
    let sel = selector(css)?;
    document.select(&sel).next()
}

pub fn element_text(element: &ElementRef) -> String {
    element.text().collect::<String>()
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Attribute of the first element matching `css`, if non-blank.
pub fn first_attr(document: &Html, css: &str, attr: &str) -> Option<String> {
    first_element(document, css)
        .and_then(|el| el.value().attr(attr).map(str::to_string))
        .and_then(non_empty)
}

/// Text content of the first element matching `css`, if non-blank.
pub fn first_text(document: &Html, css: &str) -> Option<String> {
    first_element(document, css)
        .map(|el| element_text(&el))
        .and_then(non_empty)
}

/// First `max` characters of `text`.
pub fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Every preview-relevant tag a page may declare, as found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageTags {
    pub og_title: Option<String>,
    pub twitter_title: Option<String>,
    pub title_tag: Option<String>,
    pub first_heading: Option<String>,

    pub og_description: Option<String>,
    pub twitter_description: Option<String>,
    pub meta_description: Option<String>,
    pub first_paragraph: Option<String>,

    pub og_image: Option<String>,
    pub twitter_image: Option<String>,
    pub image_src: Option<String>,
    pub first_image: Option<String>,

    pub og_site_name: Option<String>,
    pub twitter_site: Option<String>,
}

impl PageTags {
    pub fn from_document(document: &Html) -> Self {
        Self {
            og_title: first_attr(document, r#"meta[property="og:title"]"#, "content"),
            twitter_title: first_attr(document, r#"meta[name="twitter:title"]"#, "content"),
            title_tag: first_text(document, "title"),
            first_heading: first_text(document, "h1"),

            og_description: first_attr(document, r#"meta[property="og:description"]"#, "content"),
            twitter_description: first_attr(document, r#"meta[name="twitter:description"]"#, "content"),
            meta_description: first_attr(document, r#"meta[name="description"]"#, "content"),
            first_paragraph: first_text(document, "p"),

            og_image: first_attr(document, r#"meta[property="og:image"]"#, "content"),
            twitter_image: first_attr(document, r#"meta[name="twitter:image"]"#, "content"),
            image_src: first_attr(document, r#"link[rel="image_src"]"#, "href"),
            first_image: first_attr(document, "img", "src"),

            og_site_name: first_attr(document, r#"meta[property="og:site_name"]"#, "content"),
            twitter_site: first_attr(document, r#"meta[name="twitter:site"]"#, "content"),
        }
    }

    pub fn title(&self) -> Option<String> {
        self.og_title
            .clone()
            .or_else(|| self.twitter_title.clone())
            .or_else(|| self.title_tag.clone())
    }

    pub fn description(&self) -> Option<String> {
        self.og_description
            .clone()
            .or_else(|| self.twitter_description.clone())
            .or_else(|| self.meta_description.clone())
    }

    pub fn image(&self) -> Option<String> {
        self.og_image
            .clone()
            .or_else(|| self.twitter_image.clone())
            .or_else(|| self.image_src.clone())
    }

    pub fn site_name(&self) -> Option<String> {
        self.og_site_name.clone().or_else(|| self.twitter_site.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn html_with_meta(meta_tags: &str, title_tag: &str) -> Html {
        Html::parse_document(&format!(
            r#"<html><head>{meta_tags}<title>{title_tag}</title></head><body></body></html>"#
        ))
    }

    #[test]
    fn test_og_title_priority_over_twitter_and_title_tag() {
        let doc = html_with_meta(
            r#"<meta name="twitter:title" content="Twitter Title"><meta property="og:title" content="OG Title">"#,
            "HTML Title",
        );
        assert_eq!(PageTags::from_document(&doc).title().as_deref(), Some("OG Title"));
    }

    #[test]
    fn test_parse_twitter_title_fallback() {
        let doc = html_with_meta(r#"<meta name="twitter:title" content="Twitter Title">"#, "Generic");
        assert_eq!(PageTags::from_document(&doc).title().as_deref(), Some("Twitter Title"));
    }

    #[test]
    fn test_blank_og_title_falls_through() {
        let doc = html_with_meta(r#"<meta property="og:title" content="   ">"#, "Fallback Title");
        assert_eq!(PageTags::from_document(&doc).title().as_deref(), Some("Fallback Title"));
    }

    #[test]
    fn test_description_chain() {
        let doc = html_with_meta(r#"<meta name="description" content="plain description">"#, "T");
        assert_eq!(
            PageTags::from_document(&doc).description().as_deref(),
            Some("plain description")
        );

        let doc = html_with_meta(
            r#"<meta name="description" content="plain"><meta name="twitter:description" content="A twitter description">"#,
            "T",
        );
        assert_eq!(
            PageTags::from_document(&doc).description().as_deref(),
            Some("A twitter description")
        );
    }

    #[test]
    fn test_image_src_link_fallback() {
        let doc = html_with_meta(r#"<link rel="image_src" href="https://example.com/cover.png">"#, "T");
        assert_eq!(
            PageTags::from_document(&doc).image().as_deref(),
            Some("https://example.com/cover.png")
        );
    }

    #[test]
    fn test_site_name_chain() {
        let doc = html_with_meta(r#"<meta name="twitter:site" content="@rustlang">"#, "T");
        assert_eq!(PageTags::from_document(&doc).site_name().as_deref(), Some("@rustlang"));

        let doc = html_with_meta("", "T");
        assert_eq!(PageTags::from_document(&doc).site_name(), None);
    }

    #[test]
    fn test_body_fallbacks_collected() {
        let doc = Html::parse_document(
            r#"<html><body><h1> Heading </h1><p>First para</p><p>Second</p><img src="/a.png"><img src="/b.png"></body></html>"#,
        );
        let tags = PageTags::from_document(&doc);
        assert_eq!(tags.first_heading.as_deref(), Some("Heading"));
        assert_eq!(tags.first_paragraph.as_deref(), Some("First para"));
        assert_eq!(tags.first_image.as_deref(), Some("/a.png"));
    }

    #[test]
    fn test_truncate_chars_counts_characters() {
        assert_eq!(truncate_chars("héllo wörld", 5), "héllo");
        assert_eq!(truncate_chars("short", 160), "short");
    }

    #[test]
    fn test_invalid_selector_is_none() {
        let doc = html_with_meta("", "T");
        assert!(first_element(&doc, "[[[").is_none());
    }

    #[test]
    fn test_browser_profile_headers() {
        let headers = HeaderProfile::Browser.headers();
        assert!(headers[header::USER_AGENT].to_str().unwrap().starts_with("Mozilla/5.0"));
        assert_eq!(headers["sec-fetch-mode"], "navigate");
        assert_eq!(headers[header::CACHE_CONTROL], "max-age=0");

        let headers = HeaderProfile::Identifying { user_agent: "LinkPreview-Bot/1.0".into() }.headers();
        assert_eq!(headers[header::USER_AGENT], "LinkPreview-Bot/1.0");
        assert_eq!(headers[header::PRAGMA], "no-cache");
        assert!(headers.get("sec-fetch-mode").is_none());
    }

    #[test]
    fn test_fetch_page_rejects_oversized_body() {
        let server = MockServer::start();
        let huge = "a".repeat(MAX_BODY_SIZE as usize + 1);
        let page = server.mock(|when, then| {
            when.method(GET).path("/huge");
            then.status(200).body(&huge);
        });

        let profile = HeaderProfile::Identifying { user_agent: "LinkPreview-Bot/1.0".into() };
        let result = fetch_page(&server.url("/huge"), &profile, Duration::from_secs(5));

        page.assert();
        assert!(result.is_err());
    }

    #[test]
    fn test_fetch_page_accepts_body_at_limit() {
        let server = MockServer::start();
        let body = "a".repeat(MAX_BODY_SIZE as usize);
        server.mock(|when, then| {
            when.method(GET).path("/limit");
            then.status(200).body(&body);
        });

        let profile = HeaderProfile::Browser;
        let page = fetch_page(&server.url("/limit"), &profile, Duration::from_secs(5)).unwrap();
        assert_eq!(page.len(), MAX_BODY_SIZE as usize);
    }
}
