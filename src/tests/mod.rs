
use crate::app::App;
use crate::cache::StorageCache;
use crate::config::Config;
use crate::metadata::ProviderRegistry;
use crate::storage::BackendLocal;
use std::sync::Arc;

/// Config rooted in a fresh temp directory, with short timeouts.
pub fn create_config() -> (Config, tempfile::TempDir) {
    let tmp = tempfile::tempdir().expect("failed to create temp dir");
    let mut config =
        Config::load_with(tmp.path().to_str().unwrap()).expect("failed to load config");
    config.timeouts.oembed_secs = 2;
    config.timeouts.static_secs = 2;
    config.timeouts.fallback_secs = 2;
    (config, tmp)
}

pub fn create_app(registry: ProviderRegistry) -> (App, Config, tempfile::TempDir) {
    let (config, tmp) = create_config();
    let app = App::with_registry(&config, registry).expect("failed to create app");
    (app, config, tmp)
}

/// Direct handle on the cache directory the app writes to.
pub fn cache_of(config: &Config) -> StorageCache {
    let backend = BackendLocal::new(&config.cache_dir()).expect("failed to open cache dir");
    StorageCache::new(Arc::new(backend))
}
