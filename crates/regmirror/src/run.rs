use std::time::Duration;

use anyhow::{Context, Result, ensure};
use regmirror_fetch::{NpmRegistry, ReqwestClient};
use regmirror_state::CommitLedger;
use regmirror_sync::{Mirror, MirrorOptions};
use tracing::info;

use crate::cli::{Commands, StatusArg, SyncArg};
use crate::config::Config;

pub async fn execute(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Sync(arg) => sync(arg).await,
        Commands::Status(arg) => status(arg),
    }
}

fn load_config(explicit: Option<&std::path::Path>) -> Result<Config> {
    if let Some(path) = explicit {
        ensure!(path.is_file(), "config file {} does not exist", path.display());
    }
    Config::load(explicit).context("invalid configuration")
}

async fn sync(arg: SyncArg) -> Result<()> {
    let config = load_config(arg.config.as_deref())?.with_sync_args(&arg);
    config.validate()?;

    let ledger_path = config.ledger_path();
    let ledger = CommitLedger::open(&ledger_path)
        .with_context(|| format!("cannot open ledger at {}", ledger_path.display()))?;

    let client = ReqwestClient::new(
        Duration::from_secs(config.connect_timeout_secs),
        config.read_timeout_secs.map(Duration::from_secs),
    )
        .context("cannot build HTTP client")?;
    let registry = NpmRegistry::new(config.registry_url.clone(), client.clone());

    let mut options = MirrorOptions::new(config.feed_path(), config.download_root());
    options.workers = config.workers;
    options.max_packages = config.max_packages;
    info!(
        registry = %config.registry_url,
        feed = %options.feed_path.display(),
        root = %options.download_root.display(),
        workers = options.workers,
        "starting mirror pass"
    );

    let summary = Mirror::new(registry, client, options)
        .run(&ledger)
        .await
        .context("mirror pass aborted")?;
    println!("{summary}");

    ledger.close().context("cannot close ledger")?;
    Ok(())
}

fn status(arg: StatusArg) -> Result<()> {
    let config = load_config(arg.config.as_deref())?;
    let ledger_path = config.ledger_path();
    let ledger = CommitLedger::open(&ledger_path)
        .with_context(|| format!("cannot open ledger at {}", ledger_path.display()))?;

    println!("ledger:  {}", ledger_path.display());
    println!("synced:  {}", ledger.count_successful()?);
    println!("errors:  {}", ledger.count_errors()?);

    if arg.errors {
        for (id, detail) in ledger.errors()? {
            println!("\n{id}");
            for line in detail.lines() {
                println!("  {line}");
            }
        }
    }

    ledger.close()?;
    Ok(())
}
