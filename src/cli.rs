use clap::{Args as ClapArgs, Parser, Subcommand};

use crate::metadata::MetaOptions;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct MetaArgs {
    /// Don't read or write the cache
    #[clap(long, default_value = "false")]
    pub no_cache: bool,

    /// Don't retry with browser-like headers
    /// when the plain fetch fails
    #[clap(long, default_value = "false")]
    pub no_headless: bool,
}

impl From<MetaArgs> for MetaOptions {
    fn from(args: MetaArgs) -> Self {
        MetaOptions {
            no_cache: args.no_cache,
            no_headless: args.no_headless,
        }
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum CacheArgs {
    /// List cached urls with their source and freshness
    List,
    /// Print the cached entry for a url
    Show {
        /// a url
        url: String,
    },
    /// Delete stale cache entries
    Purge {
        /// Delete every entry, fresh ones included
        #[clap(long, default_value = "false")]
        all: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP daemon
    Daemon {
        /// Listen address, overrides the config file
        #[clap(long)]
        addr: Option<String>,
    },

    /// Resolve preview metadata for a url and print it as JSON
    Meta {
        /// a url
        url: String,

        #[command(flatten)]
        meta_args: MetaArgs,
    },

    /// Inspect or clean the metadata cache
    Cache {
        #[command(subcommand)]
        action: CacheArgs,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_meta_flags() {
        let args = Args::parse_from(["linkmeta", "meta", "https://example.com", "--no-headless"]);
        match args.command {
            Command::Meta { url, meta_args } => {
                assert_eq!(url, "https://example.com");
                let opts = MetaOptions::from(meta_args);
                assert!(opts.no_headless);
                assert!(!opts.no_cache);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_cache_purge() {
        let args = Args::parse_from(["linkmeta", "cache", "purge", "--all"]);
        assert!(matches!(
            args.command,
            Command::Cache {
                action: CacheArgs::Purge { all: true }
            }
        ));
    }

    #[test]
    fn test_parse_daemon_addr() {
        let args = Args::parse_from(["linkmeta", "daemon", "--addr", "127.0.0.1:9000"]);
        assert!(matches!(args.command, Command::Daemon { addr: Some(a) } if a == "127.0.0.1:9000"));
    }
}
