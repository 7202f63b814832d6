//! Wiring between the CLI options and the replication loop.

use anyhow::{Context, Result};
use sync_core::{CycleOutcome, LogSink, Replicator, ReplicatorConfig, RunSummary, Watermark};
use tracing::{info, warn};

use crate::mssql::MssqlSource;
use crate::postgresql::PostgresSink;
use crate::{DestinationOpts, ReplicationOpts, SourceOpts};

pub type LogReplicator = Replicator<MssqlSource, PostgresSink>;

/// Build the source and sink and, when asked, create the destination table.
pub async fn build_replicator(
    from_opts: &SourceOpts,
    to_opts: &DestinationOpts,
    replication: &ReplicationOpts,
) -> Result<LogReplicator> {
    let source = MssqlSource::new(&from_opts.into()).context("Invalid source options")?;
    let sink = build_sink(to_opts).await?;
    let config = ReplicatorConfig::from(replication);

    info!(
        "Replicating {} -> {} every {:?}",
        source.table(),
        sink.table(),
        config.interval
    );

    Ok(Replicator::new(source, sink, config))
}

async fn build_sink(to_opts: &DestinationOpts) -> Result<PostgresSink> {
    let sink = PostgresSink::new(&to_opts.into()).context("Invalid destination options")?;
    if to_opts.create_table {
        sink.ensure_table()
            .await
            .context("Failed to create destination table")?;
    }
    Ok(sink)
}

/// Run cycles until Ctrl+C or SIGTERM.
pub async fn run_replication(
    from_opts: SourceOpts,
    to_opts: DestinationOpts,
    replication: ReplicationOpts,
) -> Result<RunSummary> {
    let mut replicator = build_replicator(&from_opts, &to_opts, &replication).await?;

    // An unreachable source is retried every cycle, so only warn here
    if let Err(e) = replicator.source().check_connection().await {
        warn!("SQL Server is not reachable yet: {e}");
    }

    let shutdown = crate::shutdown::setup_shutdown_handler();
    info!("Waiting for new records... (Press Ctrl+C to stop)");
    Ok(replicator.run(shutdown).await)
}

/// Run exactly one cycle.
pub async fn run_once(
    from_opts: SourceOpts,
    to_opts: DestinationOpts,
    replication: ReplicationOpts,
) -> Result<CycleOutcome> {
    let mut replicator = build_replicator(&from_opts, &to_opts, &replication).await?;
    let outcome = replicator
        .run_cycle()
        .await
        .context("Replication cycle failed")?;
    Ok(outcome)
}

/// Read the destination's current watermark.
pub async fn read_watermark(to_opts: DestinationOpts) -> Result<Watermark> {
    let sink = build_sink(&to_opts).await?;
    let watermark = sink
        .watermark()
        .await
        .context("Failed to read destination watermark")?;
    Ok(watermark)
}
