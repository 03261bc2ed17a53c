pub mod oembed;
pub mod plain;

use crate::metadata::types::ResolvedMetadata;
use url::Url;

pub use oembed::OembedFetcher;
pub use plain::{PermissiveFetcher, StaticFetcher};

/// One stage of the resolution pipeline.
pub trait MetadataFetcher: Send + Sync {
    /// Attempt to resolve metadata for `url`.
    ///
    /// `Ok(None)` when this fetcher does not apply to the URL, `Err` when it
    /// applied and failed. The resolver treats both as "try the next stage".
    fn fetch(&self, url: &Url) -> anyhow::Result<Option<ResolvedMetadata>>;

    /// Get the name of this fetcher for logging/debugging
    fn name(&self) -> &'static str;
}

/// Describe which fields are non-empty (for logging)
pub(crate) fn describe_fields(m: &ResolvedMetadata) -> String {
    let mut fields = Vec::new();
    if !m.title.is_empty() { fields.push("title"); }
    if !m.description.is_empty() { fields.push("description"); }
    if !m.image.is_empty() { fields.push("image"); }
    if !m.site_name.is_empty() { fields.push("site_name"); }
    fields.join(",")
}
