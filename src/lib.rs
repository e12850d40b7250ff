pub mod cache;
pub mod cli;
pub mod connectivity;
pub mod core;
pub mod feed;
pub mod providers;
pub mod repository;
pub mod store;
pub mod telemetry;

use crate::cache::PersistentCache;
use crate::connectivity::NetworkMonitor;
use crate::core::config::AppConfig;
use crate::feed::RateFeed;
use crate::providers::RateFetcher;
use crate::repository::{RateRepository, RateRepositoryDeps};
use crate::telemetry::EventLog;
use anyhow::Result;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info};

pub enum AppCommand {
    Watch { show_events: bool },
    Fetch,
    Rate { history: bool, page: usize },
    Balance { adjust: Option<Decimal> },
}

/// Wires the fetcher, connectivity monitor and cache into a repository.
pub async fn build_repository(
    config: &AppConfig,
    cache: PersistentCache,
    events: EventLog,
) -> Result<RateRepository> {
    let feed = RateFeed::new();
    let fetcher = RateFetcher::from_config(&config.provider, events.clone(), feed.clone())?;
    let monitor = NetworkMonitor::start(config.connectivity.clone()).await;

    Ok(RateRepository::new(RateRepositoryDeps {
        source: Arc::new(fetcher),
        cache,
        connectivity: Arc::new(monitor),
        events,
        feed,
        interval: config.update_interval(),
    }))
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("ratewatch starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let events = EventLog::new(config.analytics.max_events);
    let cache = PersistentCache::new(store::open_record_store(&config), events.clone());

    match command {
        AppCommand::Watch { show_events } => {
            let repository = build_repository(&config, cache, events).await?;
            cli::watch::run(&repository, show_events).await
        }
        AppCommand::Fetch => {
            let repository = build_repository(&config, cache, events).await?;
            cli::fetch::run(&repository).await
        }
        AppCommand::Rate { history, page } => cli::rate::run(&cache, history, page),
        AppCommand::Balance { adjust } => cli::balance::run(&cache, adjust),
    }
}
