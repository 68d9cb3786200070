//! Run command - continuous polling.

use anyhow::Result;
use feedvault_core::Shutdown;
use feedvault_ingest::Poller;

use crate::commands::{build_client, build_config, build_governor, open_store};
use crate::{Cli, ExitCode};

/// Runs the polling loop until interrupted.
pub async fn run(cli: &Cli) -> Result<ExitCode> {
    let config = build_config(cli, None)?;
    let client = build_client(cli, &config)?;
    let store = open_store(&config)?;
    let governor = build_governor(&config);

    let shutdown = Shutdown::new();
    crate::shutdown::install(&shutdown);

    let poller = Poller::new(client, store, governor, config, shutdown);
    let snapshot = poller.run().await?;

    if !cli.quiet {
        println!("{snapshot}");
    }
    Ok(ExitCode::Success)
}
