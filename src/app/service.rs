use super::errors::AppError;
use crate::{
    cache::{self, CacheEntry, CacheStore, StorageCache},
    config::Config,
    metadata::{normalize, MetaOptions, ProviderRegistry, ResolvedMetadata, Resolver},
    storage::BackendLocal,
};
use std::{sync::Arc, time::Duration};
use url::Url;

/// Entry point shared by the daemon and the CLI.
pub struct App {
    resolver: Resolver,
    cache: StorageCache,
    ttl: Duration,
}

impl App {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        Self::with_registry(config, ProviderRegistry::builtin().clone())
    }

    pub fn with_registry(config: &Config, registry: ProviderRegistry) -> anyhow::Result<Self> {
        let storage = BackendLocal::new(&config.cache_dir())?;
        let cache = StorageCache::new(Arc::new(storage));
        let resolver = Resolver::with_registry(Arc::new(cache.clone()), config, registry);

        Ok(Self {
            resolver,
            cache,
            ttl: config.cache_ttl(),
        })
    }

    /// Validate user input into a fetchable URL. The submitted path and query are kept verbatim.
    pub fn parse_url(raw: Option<&str>) -> Result<Url, AppError> {
        let raw = raw.map(str::trim).filter(|s| !s.is_empty());
        let Some(raw) = raw else {
            return Err(AppError::MissingUrl);
        };

        let url = normalize::parse_submitted(raw)?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(AppError::UnsupportedUrl(format!(
                "scheme '{}' is not http(s)",
                url.scheme()
            )));
        }

        if url.host_str().map(str::is_empty).unwrap_or(true) {
            return Err(AppError::UnsupportedUrl("url has no host".to_string()));
        }

        Ok(url)
    }

    pub fn lookup(&self, raw: Option<&str>, opts: MetaOptions) -> Result<ResolvedMetadata, AppError> {
        let url = Self::parse_url(raw)?;
        log::debug!("lookup {url} opts={opts:?}");
        let metadata = self.resolver.resolve(&url, opts)?;
        log::info!("{url}: resolved via {}", metadata.source_kind);
        Ok(metadata)
    }

    /// Every stored entry with its freshness, oldest first.
    pub fn cache_entries(&self) -> Result<Vec<(CacheEntry, bool)>, AppError> {
        let now = cache::now_millis();
        let mut entries: Vec<(CacheEntry, bool)> = self
            .cache
            .entries()?
            .into_iter()
            .map(|(_, e)| {
                let fresh = e.is_fresh(now, self.ttl);
                (e, fresh)
            })
            .collect();
        entries.sort_by_key(|(e, _)| e.timestamp);
        Ok(entries)
    }

    /// Stored entry for `raw` and whether it is still fresh.
    pub fn cached(&self, raw: &str) -> Result<Option<(CacheEntry, bool)>, AppError> {
        let url = Self::parse_url(Some(raw))?;
        let entry = self.cache.get(url.as_str())?;
        Ok(entry.map(|e| {
            let fresh = e.is_fresh(cache::now_millis(), self.ttl);
            (e, fresh)
        }))
    }

    pub fn purge_cache(&self, all: bool) -> Result<usize, AppError> {
        Ok(self.cache.purge(cache::now_millis(), self.ttl, all)?)
    }
}
