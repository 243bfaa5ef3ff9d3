//! # hodor
//!
//! Hook-driven release deployment daemon.
//!
//! CI announces a new release archive with a POST to
//! `/api/hook/{release_key}`; hodor downloads it, unpacks it and swaps it
//! into the directory configured for that key.
//!
//! ## Usage
//!
//! ```text
//! hodor --config releases.toml --db /var/lib/hodor/hodor.db --listen 0.0.0.0:3333
//! ```
//!
//! Log verbosity follows `RUST_LOG`; `--log-json` switches to JSON lines.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use hodor_deployer::{DeploymentEngine, HttpFetcher, ReleaseConfig};
use hodor_store::{KvStore, StatusStore};

/// Hook-driven release deployment daemon.
#[derive(Parser)]
#[command(name = "hodor", version, about = "Hook-driven release deployment daemon")]
struct Cli {
    /// Release configuration (JSON, or TOML when the file ends in .toml).
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// SQLite file holding job statuses and deployed tags.
    #[arg(short, long, default_value = "hodor.db")]
    db: PathBuf,

    /// Address the HTTP API listens on.
    #[arg(short, long, default_value = "0.0.0.0:3333")]
    listen: SocketAddr,

    /// Emit logs as JSON lines.
    #[arg(long)]
    log_json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        db = %cli.db.display(),
        "starting hodor"
    );

    let config = ReleaseConfig::load(&cli.config)
        .with_context(|| format!("failed to load config {}", cli.config.display()))?;
    config.validate().context("invalid release config")?;
    tracing::info!(releases = config.entries.len(), "release config loaded");

    let kv = KvStore::open(&cli.db)
        .with_context(|| format!("failed to open status db {}", cli.db.display()))?;
    let fetcher = Arc::new(HttpFetcher::new().context("failed to build HTTP client")?);
    let engine = Arc::new(DeploymentEngine::new(config, StatusStore::new(kv), fetcher));

    // The worker owns a thread of its own; the blocking HTTP client must not
    // run on the async runtime.
    let worker = {
        let engine = Arc::clone(&engine);
        thread::Builder::new()
            .name("hodor-worker".to_string())
            .spawn(move || engine.start())
            .context("failed to spawn worker thread")?
    };

    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    let served = runtime.block_on(hodor_daemon::serve(
        cli.listen,
        engine.clone(),
        shutdown_signal(),
    ));

    engine.stop();
    let worked = worker
        .join()
        .map_err(|_| anyhow::anyhow!("worker thread panicked"))?;

    served.context("HTTP server failed")?;
    worked.context("deployment worker failed")?;

    tracing::info!("hodor stopped");
    Ok(())
}

fn init_tracing(json: bool) -> Result<()> {
    let filter = EnvFilter::from_default_env()
        .add_directive("hodor=info".parse()?)
        .add_directive("hodor_daemon=info".parse()?)
        .add_directive("hodor_deployer=info".parse()?)
        .add_directive("hodor_store=info".parse()?)
        .add_directive("tower_http=info".parse()?);

    // Logs go to stderr; stdout stays free for whatever wraps the daemon.
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.with_ansi(false).init();
    }
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutdown signal received"),
        Err(e) => {
            tracing::error!(error = %e, "failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}
