use clap::Parser;
use tracing_subscriber::EnvFilter;

mod app;
mod cache;
mod cli;
mod config;
mod metadata;
mod scrape;
mod storage;
#[cfg(test)]
mod tests;
mod web;

use cli::{CacheArgs, Command};
use config::Config;

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let args = cli::Args::parse();

    init_logging();

    let config = Config::load()?;
    let app = app::App::new(&config)?;

    match args.command {
        Command::Daemon { addr } => {
            let addr = addr.unwrap_or_else(|| config.listen_addr.clone());
            web::start_daemon(app, &addr)
        }

        Command::Meta { url, meta_args } => {
            let metadata = app.lookup(Some(&url), meta_args.into())?;
            println!("{}", serde_json::to_string_pretty(&metadata)?);
            Ok(())
        }

        Command::Cache { action } => match action {
            CacheArgs::List => {
                for (entry, fresh) in app.cache_entries()? {
                    let state = if fresh { "fresh" } else { "stale" };
                    println!("{state}\t{}\t{}", entry.metadata.source_kind, entry.url);
                }
                Ok(())
            }
            CacheArgs::Show { url } => {
                match app.cached(&url)? {
                    Some((entry, fresh)) => {
                        println!("{}", serde_json::to_string_pretty(&entry)?);
                        println!("fresh: {fresh}");
                    }
                    None => println!("no cache entry for {url}"),
                }
                Ok(())
            }
            CacheArgs::Purge { all } => {
                let removed = app.purge_cache(all)?;
                println!("{removed} entries removed");
                Ok(())
            }
        },
    }
}
