//! CLI command implementations.

pub mod backfill;
pub mod once;
pub mod run;
pub mod stats;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use feedvault_core::{IngestConfig, RatePolicyConfig};
use feedvault_fetch::{MicroblogClient, RateGovernor, RedditClient, SourceClient};
use feedvault_store::SqliteStore;

use crate::{Cli, Upstream};

/// Environment variable holding the microblog API bearer token.
pub const BEARER_TOKEN_ENV: &str = "FEEDVAULT_BEARER_TOKEN";

/// Builds and validates the ingest configuration from CLI flags.
/// `sources` overrides the global flag (backfill's positional source).
pub fn build_config(cli: &Cli, sources: Option<Vec<String>>) -> Result<IngestConfig> {
    let defaults = IngestConfig::default();
    let rate = match (cli.rate_window_requests, cli.rate_window_secs) {
        (Some(max_requests), Some(window_secs)) => RatePolicyConfig::Window {
            max_requests,
            window_secs,
        },
        _ => RatePolicyConfig::FixedDelay {
            delay_secs: cli.rate_delay,
        },
    };

    let config = IngestConfig {
        db_path: cli.db.clone(),
        sources: sources.unwrap_or_else(|| cli.sources.clone()),
        poll_interval: Duration::from_secs(cli.interval),
        page_size: cli.page_size,
        max_pages_per_cycle: cli.max_pages,
        user_agent: cli.user_agent.clone().unwrap_or(defaults.user_agent),
        rate,
        ..defaults
    };
    config.validate().context("invalid configuration")?;
    Ok(config)
}

/// Builds the source client for the selected upstream.
pub fn build_client(cli: &Cli, config: &IngestConfig) -> Result<Arc<dyn SourceClient>> {
    match cli.upstream {
        Upstream::Reddit => {
            let probe_source = config
                .sources
                .first()
                .map_or_else(|| "all".to_string(), Clone::clone);
            Ok(Arc::new(RedditClient::new(&config.user_agent, &probe_source)))
        }
        Upstream::Microblog => {
            let token = std::env::var(BEARER_TOKEN_ENV)
                .with_context(|| format!("{BEARER_TOKEN_ENV} must be set for --upstream microblog"))?;
            Ok(Arc::new(MicroblogClient::new(&token, &config.user_agent)))
        }
    }
}

/// Opens the SQLite archive named in the configuration.
pub fn open_store(config: &IngestConfig) -> Result<Arc<SqliteStore>> {
    let store = SqliteStore::open(&config.db_path)
        .with_context(|| format!("cannot open archive at {}", config.db_path.display()))?;
    Ok(Arc::new(store))
}

/// Builds the shared rate governor.
pub fn build_governor(config: &IngestConfig) -> Arc<RateGovernor> {
    Arc::new(RateGovernor::from_config(config.rate))
}
