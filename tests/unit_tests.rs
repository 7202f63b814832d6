use std::num::NonZeroUsize;
use std::time::Duration;

use attendance_sync::{mssql, postgresql, DestinationOpts, ReplicationOpts, SourceOpts};
use clap::Parser;
use sync_core::ReplicatorConfig;

#[test]
fn test_source_opts_defaults() {
    let opts = SourceOpts::try_parse_from([
        "test",
        "--source-connection-string",
        "server=tcp:127.0.0.1,1433;user id=sync;password=x",
    ])
    .unwrap();

    assert_eq!(opts.source_table, "dbo.logs");

    let lib_opts = mssql::SourceOpts::from(&opts);
    assert_eq!(
        lib_opts.connection_string,
        "server=tcp:127.0.0.1,1433;user id=sync;password=x"
    );
    assert_eq!(lib_opts.table, "dbo.logs");
}

#[test]
fn test_destination_opts_creation() {
    let opts = DestinationOpts {
        destination_connection_string: "host=localhost user=postgres".to_string(),
        destination_table: "attendance.logs".to_string(),
        create_table: true,
    };

    let lib_opts = postgresql::SinkOpts::from(&opts);
    assert_eq!(lib_opts.connection_string, "host=localhost user=postgres");
    assert_eq!(lib_opts.table, "attendance.logs");
}

#[test]
fn test_destination_opts_parse() {
    let opts = DestinationOpts::try_parse_from([
        "test",
        "--destination-connection-string",
        "postgresql://postgres@localhost/casa",
        "--create-table",
    ])
    .unwrap();

    assert_eq!(opts.destination_table, "public.logs");
    assert!(opts.create_table);
}

#[test]
fn test_replication_opts_defaults() {
    let opts = ReplicationOpts::try_parse_from(["test"]).unwrap();
    let config = ReplicatorConfig::from(&opts);

    assert_eq!(config.interval, Duration::from_secs(10));
    assert_eq!(config.batch_size, NonZeroUsize::new(5000));
    assert_eq!(config.store_timeout, Some(Duration::from_secs(60)));
}

#[test]
fn test_zero_disables_paging_and_timeout() {
    let opts = ReplicationOpts::try_parse_from([
        "test",
        "--batch-size",
        "0",
        "--store-timeout",
        "0",
        "--interval",
        "1m",
    ])
    .unwrap();
    let config = ReplicatorConfig::from(&opts);

    assert_eq!(config.interval, Duration::from_secs(60));
    assert_eq!(config.batch_size, None);
    assert_eq!(config.store_timeout, None);
}

#[test]
fn test_invalid_interval_rejected() {
    let result = ReplicationOpts::try_parse_from(["test", "--interval", "soon"]);
    assert!(result.is_err());
}
