use crate::cache::{self, CacheStore};
use crate::config::Config;
use crate::metadata::fetchers::{
    describe_fields, MetadataFetcher, OembedFetcher, PermissiveFetcher, StaticFetcher,
};
use crate::metadata::normalize::hostname;
use crate::metadata::providers::ProviderRegistry;
use crate::metadata::types::{MetaOptions, ResolvedMetadata};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Cache, then oEmbed, static scrape and permissive scrape in order, then a
/// hostname stub. The winner is written back to the cache.
pub struct Resolver {
    cache: Arc<dyn CacheStore>,
    oembed: OembedFetcher,
    static_fetcher: StaticFetcher,
    permissive: PermissiveFetcher,
    ttl: Duration,
}

impl Resolver {
    pub fn new(cache: Arc<dyn CacheStore>, config: &Config) -> Self {
        Self::with_registry(cache, config, ProviderRegistry::builtin().clone())
    }

    pub fn with_registry(
        cache: Arc<dyn CacheStore>,
        config: &Config,
        registry: ProviderRegistry,
    ) -> Self {
        Self {
            cache,
            oembed: OembedFetcher::new(registry, &config.user_agent, config.timeouts.oembed()),
            static_fetcher: StaticFetcher::new(&config.user_agent, config.timeouts.static_fetch()),
            permissive: PermissiveFetcher::new(config.timeouts.fallback()),
            ttl: config.cache_ttl(),
        }
    }

    fn stages(&self, opts: MetaOptions) -> Vec<&dyn MetadataFetcher> {
        let mut stages: Vec<&dyn MetadataFetcher> = vec![&self.oembed, &self.static_fetcher];
        if !opts.no_headless {
            stages.push(&self.permissive);
        }
        stages
    }

    /// Run the fetch stages only, without touching the cache.
    pub fn fetch(&self, url: &Url, opts: MetaOptions) -> ResolvedMetadata {
        self.stages(opts)
            .into_iter()
            .find_map(|fetcher| {
                let name = fetcher.name();
                match fetcher.fetch(url) {
                    Ok(Some(m)) => {
                        let fields = describe_fields(&m);
                        log::info!("fetcher={name} outcome=success fields=[{fields}]");
                        Some(m)
                    }
                    Ok(None) => {
                        log::info!("fetcher={name} outcome=skip");
                        None
                    }
                    Err(e) => {
                        log::warn!("fetcher={name} outcome=error err={e}");
                        None
                    }
                }
            })
            .unwrap_or_else(|| {
                log::info!("{url}: every stage failed, using hostname stub");
                ResolvedMetadata::stub(&hostname(url))
            })
    }

    pub fn resolve(&self, url: &Url, opts: MetaOptions) -> anyhow::Result<ResolvedMetadata> {
        let key = url.as_str();

        if !opts.no_cache {
            if let Some(entry) = self.cache.get(key)? {
                if entry.is_fresh(cache::now_millis(), self.ttl) {
                    log::debug!("{key}: cache hit");
                    return Ok(entry.metadata);
                }
                log::debug!("{key}: cache entry is stale");
            }
        }

        let metadata = self.fetch(url, opts);

        if !opts.no_cache {
            self.cache.put(key, &metadata)?;
        }

        Ok(metadata)
    }
}
