use crate::metadata::fetchers::MetadataFetcher;
use crate::metadata::normalize::absolutize;
use crate::metadata::providers::{Provider, ProviderRegistry};
use crate::metadata::types::{ResolvedMetadata, SourceKind};
use serde::Deserialize;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, Default, Deserialize)]
struct OembedResponse {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    author_name: Option<String>,
    #[serde(default)]
    thumbnail_url: Option<String>,
    #[serde(default)]
    author_icon: Option<String>,
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

pub struct OembedFetcher {
    registry: ProviderRegistry,
    user_agent: String,
    timeout: Duration,
}

impl OembedFetcher {
    pub fn new(registry: ProviderRegistry, user_agent: &str, timeout: Duration) -> Self {
        Self {
            registry,
            user_agent: user_agent.to_string(),
            timeout,
        }
    }

    /// Fetch oEmbed data from the provider's endpoint
    fn fetch_oembed(&self, provider: &Provider, target_url: &str) -> anyhow::Result<OembedResponse> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(&self.user_agent)
            .timeout(self.timeout)
            .build()?;

        let request_url = provider.request_url(target_url)?;
        log::debug!("Fetching oEmbed from: {}", request_url);

        let response = client.get(request_url).send()?;

        if !response.status().is_success() {
            anyhow::bail!("oEmbed endpoint returned status {}", response.status());
        }

        let oembed: OembedResponse = response.json()?;
        Ok(oembed)
    }

    /// Convert oEmbed response to ResolvedMetadata
    fn oembed_to_metadata(oembed: OembedResponse, provider: &Provider, page_url: &Url) -> ResolvedMetadata {
        let description = present(oembed.description).or(present(oembed.author_name));
        let image = present(oembed.thumbnail_url).or(present(oembed.author_icon));

        ResolvedMetadata {
            title: present(oembed.title).unwrap_or_default(),
            description: description.unwrap_or_default(),
            image: absolutize(&image.unwrap_or_default(), page_url),
            site_name: provider.site_name(),
            source_kind: SourceKind::Oembed,
        }
        .trimmed()
    }
}

impl MetadataFetcher for OembedFetcher {
    fn fetch(&self, url: &Url) -> anyhow::Result<Option<ResolvedMetadata>> {
        if self.registry.find(url.as_str()).is_none() {
            log::debug!("No oEmbed provider matched URL: {}", url);
            return Ok(None);
        }

        let mut last_error = None;

        for provider in self.registry.matching(url.as_str()) {
            log::debug!("URL {} matched provider {}", url, provider.name);

            match self.fetch_oembed(provider, url.as_str()) {
                Ok(oembed) => return Ok(Some(Self::oembed_to_metadata(oembed, provider, url))),
                Err(e) => {
                    log::warn!("oEmbed failed for {}: {}", provider.name, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("no oEmbed provider succeeded")))
    }

    fn name(&self) -> &'static str {
        "oEmbed"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn provider(name: &str, pattern: &str, endpoint: &str) -> Provider {
        Provider::new(name, &[pattern], endpoint).unwrap()
    }

    fn fetcher(providers: Vec<Provider>) -> OembedFetcher {
        OembedFetcher::new(
            ProviderRegistry::new(providers),
            "LinkPreview-Bot/1.0",
            Duration::from_secs(5),
        )
    }

    #[test]
    fn test_oembed_json_parsing() {
        let json = serde_json::json!({
            "type": "video",
            "title": "Test Video",
            "author_name": "Test Author",
            "provider_name": "YouTube",
            "thumbnail_url": "https://example.com/thumb.jpg",
            "html": "<iframe></iframe>"
        });

        let oembed: OembedResponse = serde_json::from_value(json).unwrap();
        assert_eq!(oembed.title.as_deref(), Some("Test Video"));
        assert_eq!(oembed.author_name.as_deref(), Some("Test Author"));
        assert_eq!(oembed.thumbnail_url.as_deref(), Some("https://example.com/thumb.jpg"));
        assert!(oembed.description.is_none());
    }

    #[test]
    fn test_description_and_image_fallbacks() {
        let p = provider("twitter", "status", "https://publish.twitter.com/oembed");
        let page = Url::parse("https://twitter.com/rustlang/status/1").unwrap();
        let oembed = OembedResponse {
            title: None,
            description: Some(String::new()),
            author_name: Some("Rust Language".into()),
            thumbnail_url: None,
            author_icon: Some("https://pbs.twimg.com/icon.png".into()),
        };

        let meta = OembedFetcher::oembed_to_metadata(oembed, &p, &page);
        assert_eq!(meta.title, "");
        assert_eq!(meta.description, "Rust Language");
        assert_eq!(meta.image, "https://pbs.twimg.com/icon.png");
        assert_eq!(meta.site_name, "Twitter");
        assert_eq!(meta.source_kind, SourceKind::Oembed);
    }

    #[test]
    fn test_description_preferred_over_author() {
        let p = provider("vimeo", "vimeo", "https://vimeo.com/api/oembed.json");
        let page = Url::parse("https://vimeo.com/1").unwrap();
        let oembed = OembedResponse {
            title: Some(" A film ".into()),
            description: Some("About the film".into()),
            author_name: Some("Director".into()),
            thumbnail_url: Some("https://i.vimeocdn.com/thumb.jpg".into()),
            author_icon: Some("https://i.vimeocdn.com/icon.jpg".into()),
        };

        let meta = OembedFetcher::oembed_to_metadata(oembed, &p, &page);
        assert_eq!(meta.title, "A film");
        assert_eq!(meta.description, "About the film");
        assert_eq!(meta.image, "https://i.vimeocdn.com/thumb.jpg");
    }

    #[test]
    fn test_no_matching_provider_skips() {
        let f = fetcher(vec![provider("youtube", r"youtube\.com/watch", "http://127.0.0.1:1/oembed")]);
        let url = Url::parse("https://example.com/page").unwrap();
        assert!(matches!(f.fetch(&url), Ok(None)));
    }

    #[test]
    fn test_fetch_success() {
        let server = MockServer::start();
        let page = server.url("/watch?v=abc");
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/oembed")
                .query_param("url", page.as_str())
                .query_param("format", "json")
                .header("user-agent", "LinkPreview-Bot/1.0");
            then.status(200).json_body(serde_json::json!({
                "title": "Never Gonna Give You Up",
                "author_name": "Rick Astley",
                "thumbnail_url": "https://i.ytimg.com/vi/abc/hqdefault.jpg"
            }));
        });

        let f = fetcher(vec![provider("youtube", r"/watch\?v=", &server.url("/oembed"))]);
        let meta = f.fetch(&Url::parse(&page).unwrap()).unwrap().unwrap();

        mock.assert();
        assert_eq!(meta.title, "Never Gonna Give You Up");
        assert_eq!(meta.description, "Rick Astley");
        assert_eq!(meta.image, "https://i.ytimg.com/vi/abc/hqdefault.jpg");
        assert_eq!(meta.site_name, "Youtube");
    }

    #[test]
    fn test_failed_provider_continues_to_next() {
        let server = MockServer::start();
        let broken = server.mock(|when, then| {
            when.method(GET).path("/broken");
            then.status(500);
        });
        let not_json = server.mock(|when, then| {
            when.method(GET).path("/html");
            then.status(200).body("<html>not json</html>");
        });
        let working = server.mock(|when, then| {
            when.method(GET).path("/working");
            then.status(200).json_body(serde_json::json!({ "title": "Second" }));
        });

        let f = fetcher(vec![
            provider("first", r"/video/", &server.url("/broken")),
            provider("second", r"/video/", &server.url("/html")),
            provider("third", r"/video/", &server.url("/working")),
        ]);
        let meta = f
            .fetch(&Url::parse(&server.url("/video/1")).unwrap())
            .unwrap()
            .unwrap();

        broken.assert();
        not_json.assert();
        working.assert();
        assert_eq!(meta.title, "Second");
        assert_eq!(meta.site_name, "Third");
    }

    #[test]
    fn test_stops_after_first_success() {
        let server = MockServer::start();
        let first = server.mock(|when, then| {
            when.method(GET).path("/first");
            then.status(200).json_body(serde_json::json!({ "title": "First" }));
        });
        let second = server.mock(|when, then| {
            when.method(GET).path("/second");
            then.status(200).json_body(serde_json::json!({ "title": "Second" }));
        });

        let f = fetcher(vec![
            provider("first", r"/video/", &server.url("/first")),
            provider("second", r"/video/", &server.url("/second")),
        ]);
        let meta = f
            .fetch(&Url::parse(&server.url("/video/1")).unwrap())
            .unwrap()
            .unwrap();

        first.assert();
        second.assert_hits(0);
        assert_eq!(meta.title, "First");
    }

    #[test]
    fn test_all_providers_failing_is_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/oembed");
            then.status(404);
        });

        let f = fetcher(vec![provider("only", r"/video/", &server.url("/oembed"))]);
        assert!(f.fetch(&Url::parse(&server.url("/video/1")).unwrap()).is_err());
    }
}
