//! Tests against a live PostgreSQL server.
//!
//! Set `POSTGRES_TEST_CONNECTION_STRING` and run with `--ignored`. Each test
//! works in its own table and drops it afterwards.

use attendance_sync_postgresql_sink::{connect, PostgresSink, SinkOpts};
use sync_core::testing::sample_record;
use sync_core::{LogRecord, LogSink, Watermark};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_logging() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

fn connection_string() -> String {
    std::env::var("POSTGRES_TEST_CONNECTION_STRING").unwrap_or_else(|_| {
        "host=localhost port=5432 user=postgres password=postgres dbname=postgres".to_string()
    })
}

async fn new_sink(suffix: &str) -> anyhow::Result<PostgresSink> {
    init_logging();
    let table = format!("public.sync_test_logs_{}_{suffix}", std::process::id());
    let sink = PostgresSink::new(&SinkOpts {
        connection_string: connection_string(),
        table,
    })?;
    sink.ensure_table().await?;
    Ok(sink)
}

async fn drop_table(sink: &PostgresSink) -> anyhow::Result<()> {
    let client = connect(&connection_string()).await?;
    client
        .batch_execute(&format!("DROP TABLE IF EXISTS {}", sink.table()))
        .await?;
    Ok(())
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL"]
async fn test_watermark_and_insert() -> anyhow::Result<()> {
    let sink = new_sink("insert").await?;

    assert_eq!(sink.watermark().await?, Watermark::ZERO);

    let records: Vec<LogRecord> = [3, 7, 2].map(sample_record).to_vec();
    assert_eq!(sink.insert_batch(&records).await?, 3);
    assert_eq!(sink.watermark().await?, Watermark::new(7));

    drop_table(&sink).await
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL"]
async fn test_duplicate_rolls_back_whole_batch() -> anyhow::Result<()> {
    let sink = new_sink("rollback").await?;

    let records: Vec<LogRecord> = [1, 2, 1, 4, 5].map(sample_record).to_vec();
    let err = sink.insert_batch(&records).await.unwrap_err();

    assert!(err.is_constraint(), "unexpected error: {err}");
    assert_eq!(sink.watermark().await?, Watermark::ZERO);

    drop_table(&sink).await
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL"]
async fn test_large_batch_spans_chunks() -> anyhow::Result<()> {
    let sink = new_sink("chunks").await?;

    let records: Vec<LogRecord> = (1..=2500).map(sample_record).collect();
    assert_eq!(sink.insert_batch(&records).await?, 2500);
    assert_eq!(sink.watermark().await?, Watermark::new(2500));

    drop_table(&sink).await
}
