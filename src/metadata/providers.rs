use once_cell::sync::Lazy;
use regex::Regex;

/// A platform exposing an oEmbed endpoint.
#[derive(Debug, Clone)]
pub struct Provider {
    pub name: String,
    pub patterns: Vec<Regex>,
    pub endpoint: String,
}

impl Provider {
    pub fn new(name: &str, patterns: &[&str], endpoint: &str) -> anyhow::Result<Self> {
        let patterns = patterns
            .iter()
            .map(|p| Regex::new(p))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            name: name.to_string(),
            patterns,
            endpoint: endpoint.to_string(),
        })
    }

    pub fn matches(&self, url: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(url))
    }

    /// Provider key with its first letter uppercased, e.g. `youtube` -> `Youtube`.
    pub fn site_name(&self) -> String {
        let mut chars = self.name.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }

    pub fn request_url(&self, target_url: &str) -> anyhow::Result<reqwest::Url> {
        let url = reqwest::Url::parse_with_params(
            &self.endpoint,
            &[("url", target_url), ("format", "json")],
        )?;
        Ok(url)
    }
}

static BUILTIN: Lazy<ProviderRegistry> = Lazy::new(|| {
    let table: [(&str, &[&str], &str); 6] = [
        (
            "youtube",
            &[r"youtube\.com/watch\?v=([^&]+)", r"youtu\.be/([^?]+)"],
            "https://www.youtube.com/oembed",
        ),
        (
            "tiktok",
            &[r"tiktok\.com/@([^/]+)/video/([^/]+)"],
            "https://www.tiktok.com/oembed",
        ),
        (
            "twitter",
            &[r"twitter\.com/[^/]+/status/([^/]+)", r"x\.com/[^/]+/status/([^/]+)"],
            "https://publish.twitter.com/oembed",
        ),
        (
            "instagram",
            &[r"instagram\.com/p/([^/]+)", r"instagram\.com/reel/([^/]+)"],
            "https://api.instagram.com/oembed",
        ),
        ("vimeo", &[r"vimeo\.com/([^/]+)"], "https://vimeo.com/api/oembed.json"),
        (
            "spotify",
            &[r"spotify\.com/track/([^/]+)", r"spotify\.com/album/([^/]+)"],
            "https://open.spotify.com/oembed/",
        ),
    ];

    let providers = table
        .into_iter()
        .map(|(name, patterns, endpoint)| {
            Provider::new(name, patterns, endpoint).expect("built-in provider patterns are valid")
        })
        .collect();

    ProviderRegistry::new(providers)
});

/// Ordered, immutable provider table. Lookup is a linear scan; the first
/// provider whose any pattern matches wins.
#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    providers: Vec<Provider>,
}

impl ProviderRegistry {
    pub fn new(providers: Vec<Provider>) -> Self {
        Self { providers }
    }

    pub fn builtin() -> &'static ProviderRegistry {
        &BUILTIN
    }

    /// Providers matching `url`, in registration order.
    pub fn matching<'a>(&'a self, url: &'a str) -> impl Iterator<Item = &'a Provider> + 'a {
        self.providers.iter().filter(move |p| p.matches(url))
    }

    pub fn find(&self, url: &str) -> Option<&Provider> {
        self.providers.iter().find(|p| p.matches(url))
    }
}
