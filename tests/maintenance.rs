#![cfg(unix)]

use std::time::Duration;

use attendance_sync::config::{CommandSpec, MaintenanceConfig};
use attendance_sync::maintenance::{clear_cache, run_command, MaintenanceRunner, PassReport};
use tempfile::TempDir;
use tokio::sync::broadcast;
use tokio_test::{assert_err, assert_ok};

fn command(program: &str, args: &[&str]) -> CommandSpec {
    CommandSpec {
        name: None,
        program: program.to_string(),
        args: args.iter().map(|a| a.to_string()).collect(),
    }
}

fn cache_with_files(tmp: &TempDir) -> std::path::PathBuf {
    let cache = tmp.path().join("cache");
    std::fs::create_dir_all(cache.join("nested")).unwrap();
    std::fs::write(cache.join("a.bin"), b"data").unwrap();
    std::fs::write(cache.join("nested/b.bin"), b"data").unwrap();
    cache
}

#[tokio::test]
async fn test_run_command_captures_output() {
    let output = assert_ok!(run_command(&command("sh", &["-c", "echo out; echo err >&2"])).await);
    assert!(output.contains("out"));
    assert!(output.contains("err"));
}

#[tokio::test]
async fn test_run_command_reports_non_zero_exit() {
    let err = assert_err!(run_command(&command("sh", &["-c", "echo broken; exit 3"])).await);
    let message = format!("{err:#}");
    assert!(message.contains("broken"), "{message}");
}

#[tokio::test]
async fn test_run_command_reports_missing_program() {
    assert_err!(run_command(&command("definitely-not-a-real-program-xyz", &[])).await);
}

#[tokio::test]
async fn test_clear_cache_removes_tree() {
    let tmp = TempDir::new().unwrap();
    let cache = cache_with_files(&tmp);

    assert!(assert_ok!(clear_cache(&cache).await));
    assert!(!cache.exists());

    // Second call finds nothing to remove
    assert!(!assert_ok!(clear_cache(&cache).await));
}

#[tokio::test]
async fn test_pass_continues_after_failed_command() {
    let tmp = TempDir::new().unwrap();
    let cache = cache_with_files(&tmp);
    let marker = tmp.path().join("ran");

    let config = MaintenanceConfig {
        interval: "1m".to_string(),
        cache_dir: Some(cache.clone()),
        commands: vec![
            command("false", &[]),
            command("touch", &[marker.to_str().unwrap()]),
        ],
    };
    let runner = MaintenanceRunner::new(config).unwrap();

    let report = runner.run_pass().await;

    assert_eq!(
        report,
        PassReport {
            commands_succeeded: 1,
            commands_failed: 1,
            cache_cleared: Some(true),
        }
    );
    assert!(marker.exists());
    assert!(!cache.exists());
}

#[tokio::test]
async fn test_pass_without_cache_dir() {
    let config = MaintenanceConfig::from_toml(
        r#"
        [[commands]]
        program = "true"
        "#,
    )
    .unwrap();
    let runner = MaintenanceRunner::new(config).unwrap();

    let report = runner.run_pass().await;
    assert_eq!(report.commands_succeeded, 1);
    assert_eq!(report.cache_cleared, None);
}

#[tokio::test]
async fn test_loop_repeats_until_shutdown() {
    let tmp = TempDir::new().unwrap();
    let log = tmp.path().join("passes.log");
    let script = format!("echo pass >> {}", log.display());

    let config = MaintenanceConfig {
        interval: "100ms".to_string(),
        cache_dir: None,
        commands: vec![command("sh", &["-c", &script])],
    };
    let runner = MaintenanceRunner::new(config).unwrap();
    assert_eq!(runner.interval(), Duration::from_millis(100));

    let (tx, rx) = broadcast::channel(1);
    let handle = tokio::spawn(async move { runner.run(rx).await });
    tokio::time::sleep(Duration::from_millis(350)).await;
    tx.send(()).unwrap();
    let passes = handle.await.unwrap();

    let recorded = std::fs::read_to_string(&log).unwrap().lines().count() as u64;
    assert!(passes >= 2, "only {passes} passes");
    assert_eq!(recorded, passes);
}
