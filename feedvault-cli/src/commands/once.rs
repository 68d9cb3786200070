//! Once command - a single polling cycle.

use anyhow::Result;
use feedvault_core::Shutdown;
use feedvault_ingest::Poller;

use crate::commands::{build_client, build_config, build_governor, open_store};
use crate::{Cli, ExitCode};

/// Runs one polling cycle and reports the outcome.
pub async fn run(cli: &Cli) -> Result<ExitCode> {
    let config = build_config(cli, None)?;
    let client = build_client(cli, &config)?;
    let store = open_store(&config)?;
    let governor = build_governor(&config);

    let shutdown = Shutdown::new();
    crate::shutdown::install(&shutdown);

    let poller = Poller::new(client, store, governor, config, shutdown);
    let outcome = poller.run_once().await?;

    if !cli.quiet {
        println!(
            "sources_ok={} sources_failed={} stored={} duplicates={}",
            outcome.sources_ok, outcome.sources_failed, outcome.stored, outcome.duplicates
        );
    }

    if outcome.had_failures() {
        Ok(ExitCode::SourceFailures)
    } else {
        Ok(ExitCode::Success)
    }
}
