use crate::storage::{self, StorageManager};
use anyhow::{bail, Context};
use homedir::my_home;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

const CONFIG_FILE: &str = "config.yaml";

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";
/// 24 hours
const DEFAULT_CACHE_TTL_SECS: u64 = 86_400;
const DEFAULT_USER_AGENT: &str = "LinkPreview-Bot/1.0";

const DEFAULT_OEMBED_TIMEOUT_SECS: u64 = 5;
const DEFAULT_STATIC_TIMEOUT_SECS: u64 = 10;
const DEFAULT_FALLBACK_TIMEOUT_SECS: u64 = 15;

/// Per-stage request timeouts, in seconds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_oembed_secs")]
    pub oembed_secs: u64,
    #[serde(default = "default_static_secs")]
    pub static_secs: u64,
    #[serde(default = "default_fallback_secs")]
    pub fallback_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            oembed_secs: DEFAULT_OEMBED_TIMEOUT_SECS,
            static_secs: DEFAULT_STATIC_TIMEOUT_SECS,
            fallback_secs: DEFAULT_FALLBACK_TIMEOUT_SECS,
        }
    }
}

impl TimeoutConfig {
    pub fn oembed(&self) -> Duration {
        Duration::from_secs(self.oembed_secs)
    }

    pub fn static_fetch(&self) -> Duration {
        Duration::from_secs(self.static_secs)
    }

    pub fn fallback(&self) -> Duration {
        Duration::from_secs(self.fallback_secs)
    }
}

fn default_oembed_secs() -> u64 {
    DEFAULT_OEMBED_TIMEOUT_SECS
}

fn default_static_secs() -> u64 {
    DEFAULT_STATIC_TIMEOUT_SECS
}

fn default_fallback_secs() -> u64 {
    DEFAULT_FALLBACK_TIMEOUT_SECS
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// How long a cached resolution stays fresh.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Sent by the oEmbed and static stages.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default)]
    pub timeouts: TimeoutConfig,

    #[serde(skip_serializing, skip_deserializing)]
    base_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeouts: TimeoutConfig::default(),
            base_path: String::new(),
        }
    }
}

fn default_listen_addr() -> String {
    DEFAULT_LISTEN_ADDR.to_string()
}

fn default_cache_ttl_secs() -> u64 {
    DEFAULT_CACHE_TTL_SECS
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

/// `LINKMETA_BASE_PATH`, or `~/.local/share/linkmeta`.
pub fn base_path() -> anyhow::Result<String> {
    if let Ok(path) = std::env::var("LINKMETA_BASE_PATH") {
        return Ok(path);
    }

    let home = my_home()
        .ok()
        .flatten()
        .context("could not determine home directory")?;
    Ok(format!("{}/.local/share/linkmeta", home.to_string_lossy()))
}

impl Config {
    fn validate(&self) -> anyhow::Result<()> {
        if self.listen_addr.parse::<SocketAddr>().is_err() {
            bail!("listen_addr '{}' is not a valid socket address", self.listen_addr);
        }

        if self.cache_ttl_secs == 0 {
            bail!("cache_ttl_secs must be greater than 0");
        }

        if self.user_agent.trim().is_empty() {
            bail!("user_agent must not be empty");
        }

        let t = &self.timeouts;
        if t.oembed_secs == 0 || t.static_secs == 0 || t.fallback_secs == 0 {
            bail!("timeouts must be greater than 0");
        }

        Ok(())
    }

    pub fn load() -> anyhow::Result<Self> {
        Self::load_with(&base_path()?)
    }

    pub fn load_with(base_path: &str) -> anyhow::Result<Self> {
        let store = storage::BackendLocal::new(base_path)?;

        // create new if does not exist
        if !store.exists(CONFIG_FILE) {
            log::info!("writing default config to {base_path}/{CONFIG_FILE}");
            store.write(CONFIG_FILE, serde_yml::to_string(&Self::default())?.as_bytes())?;
        }

        let config_str =
            String::from_utf8(store.read(CONFIG_FILE)?).context("config file is not valid utf8")?;
        let mut config: Self = serde_yml::from_str(&config_str).context("config is malformed")?;

        config.base_path = base_path.to_string();

        config.validate()?;

        // resave in case config version needs an upgrade
        if config_str != serde_yml::to_string(&config)? {
            config.save()?;
        }

        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let store = storage::BackendLocal::new(&self.base_path)?;

        let config_str = serde_yml::to_string(&self)?;
        store.write(CONFIG_FILE, config_str.as_bytes())?;
        Ok(())
    }

    pub fn cache_dir(&self) -> String {
        format!("{}/cache", self.base_path)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}
