use url::Url;

/// Parse a submitted URL as-is. Protocol-relative input (`//host/...`) is upgraded to https;
/// path, query and fragment are never rewritten.
pub fn parse_submitted(raw: &str) -> Result<Url, url::ParseError> {
    if raw.starts_with("//") {
        Url::parse(&format!("https:{raw}"))
    } else {
        Url::parse(raw)
    }
}

/// Resolve a scraped image reference against the page it was found on.
///
/// Empty values stay empty. Values that already parse as absolute URLs are kept as-is.
pub fn absolutize(image: &str, page_url: &Url) -> String {
    let image = image.trim();
    if image.is_empty() || Url::parse(image).is_ok() {
        return image.to_string();
    }

    match page_url.join(image) {
        Ok(joined) => joined.to_string(),
        Err(err) => {
            log::debug!("{page_url}: cannot resolve image {image:?}: {err}");
            String::new()
        }
    }
}

pub fn hostname(url: &Url) -> String {
    url.host_str().unwrap_or_default().to_string()
}
