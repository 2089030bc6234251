//! Shoebox standalone pipeline.
//!
//! Reads newline-delimited JSON (storage notifications or update triggers)
//! from stdin or a file, runs the full topology against an in-memory table
//! with a logging notifier, and exits once the input is exhausted and both
//! queues have drained.

use anyhow::{Context, Result};
use clap::Parser;
use shoebox::{Config, InMemoryRecordStore, LogNotifier, Topology};
use std::{path::PathBuf, sync::Arc, time::Duration};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Shoebox - photo album event pipeline
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Read events from this file instead of stdin
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Give up waiting for the queues to drain after this many seconds
    #[arg(long, default_value_t = 120)]
    drain_timeout_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::from_env().context("refusing to start")?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_new(&config.log_filter).context("invalid log filter")?)
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting shoebox");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let store = Arc::new(InMemoryRecordStore::new(config.table_name.clone()));
    let topology = Topology::build(&config, store.clone(), Arc::new(LogNotifier))?;

    let input: Box<dyn AsyncBufRead + Unpin + Send> = match &args.input {
        Some(path) => Box::new(BufReader::new(
            tokio::fs::File::open(path)
                .await
                .with_context(|| format!("cannot open {}", path.display()))?,
        )),
        None => Box::new(BufReader::new(tokio::io::stdin())),
    };

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let shutdown = async move {
        tokio::select! {
            _ = stop_rx => {}
            _ = tokio::signal::ctrl_c() => info!("interrupted"),
        }
    };

    let topology = &topology;
    let drain_timeout = Duration::from_secs(args.drain_timeout_secs);
    let feeding = async move {
        let outcome = feed(topology, input).await;
        if tokio::time::timeout(drain_timeout, topology.drained(Duration::from_millis(100)))
            .await
            .is_err()
        {
            tracing::warn!(
                pending = topology.create_queue().len() + topology.dead_letter_queue().len(),
                "queues not drained, stopping anyway"
            );
        }
        let _ = stop_tx.send(());
        outcome
    };

    let ((), fed) = tokio::join!(topology.run(shutdown), feeding);
    let fed = fed?;

    let records = store.snapshot().await;
    info!(lines = fed, records = records.len(), "input exhausted");
    for record in records.values() {
        info!(file_name = %record.file_name, content = record.content.as_deref().unwrap_or(""), "record");
    }
    Ok(())
}

/// Publishes every non-empty line, returning how many were accepted.
async fn feed(topology: &Topology, input: Box<dyn AsyncBufRead + Unpin + Send>) -> Result<usize> {
    let mut lines = input.lines();
    let mut accepted = 0;
    while let Some(line) = lines.next_line().await.context("reading input")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match topology.ingest(line).await {
            Ok(result) => {
                accepted += 1;
                tracing::debug!(
                    delivered = result.delivered,
                    skipped = result.skipped,
                    failed = result.failed,
                    "published"
                );
            }
            Err(error) => tracing::warn!(%error, "skipping unreadable input line"),
        }
    }
    Ok(accepted)
}
