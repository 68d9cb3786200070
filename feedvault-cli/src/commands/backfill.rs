//! Backfill command - historical strategy walk for one source.

use anyhow::Result;
use clap::Args;
use feedvault_core::Shutdown;
use feedvault_ingest::BackfillEngine;

use crate::commands::{build_client, build_config, build_governor, open_store};
use crate::{Cli, ExitCode};

/// Arguments for backfill command.
#[derive(Args)]
pub struct BackfillArgs {
    /// Source to backfill (subreddit or hashtag).
    pub source: String,

    /// Per-strategy item budget.
    #[arg(long)]
    pub budget: Option<u32>,
}

/// Runs the backfill strategies for one source.
pub async fn run(args: &BackfillArgs, cli: &Cli) -> Result<ExitCode> {
    let mut config = build_config(cli, Some(vec![args.source.clone()]))?;
    if let Some(budget) = args.budget {
        config.backfill_budget = budget;
        config.validate()?;
    }

    let client = build_client(cli, &config)?;
    let store = open_store(&config)?;
    let governor = build_governor(&config);

    let shutdown = Shutdown::new();
    crate::shutdown::install(&shutdown);

    let engine = BackfillEngine::new(client, store, governor, config, shutdown);
    let report = engine.run(&args.source).await?;

    if !cli.quiet {
        println!("{report}");
    }

    if report.fetch_errors > 0 || report.store_errors > 0 {
        Ok(ExitCode::SourceFailures)
    } else {
        Ok(ExitCode::Success)
    }
}
