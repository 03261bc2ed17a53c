use serde::{Deserialize, Serialize};

/// Which resolution stage produced a [`ResolvedMetadata`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    Oembed,
    Static,
    HeadlessFallback,
    Fallback,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SourceKind::Oembed => "oembed",
            SourceKind::Static => "static",
            SourceKind::HeadlessFallback => "headless-fallback",
            SourceKind::Fallback => "fallback",
        };
        write!(f, "{name}")
    }
}

/// Preview data for a single URL.
///
/// Absent fields are empty strings, never missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedMetadata {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub site_name: String,
    #[serde(alias = "type")]
    pub source_kind: SourceKind,
}

impl ResolvedMetadata {
    /// Last-resort record built from the hostname alone.
    pub fn stub(hostname: &str) -> Self {
        Self {
            title: hostname.to_string(),
            description: "No description available".to_string(),
            image: String::new(),
            site_name: hostname.to_string(),
            source_kind: SourceKind::Fallback,
        }
    }

    pub fn trimmed(mut self) -> Self {
        self.title = self.title.trim().to_string();
        self.description = self.description.trim().to_string();
        self.image = self.image.trim().to_string();
        self.site_name = self.site_name.trim().to_string();
        self
    }
}

/// Partial record returned by a platform augmentation hook.
/// Present fields replace the generic-tag values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataOverride {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
}

impl MetadataOverride {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.image.is_none()
    }

    pub fn apply(self, title: &mut String, description: &mut String, image: &mut String) {
        if let Some(t) = self.title {
            *title = t;
        }
        if let Some(d) = self.description {
            *description = d;
        }
        if let Some(i) = self.image {
            *image = i;
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct MetaOptions {
    /// Neither read nor write the cache.
    #[serde(default)]
    pub no_cache: bool,
    /// Skip the browser-header fallback fetch.
    #[serde(default)]
    pub no_headless: bool,
}
