//! Periodic maintenance: run administrative commands, then clear a cache
//! directory.
//!
//! Every failure is logged and the pass carries on with the next step; the
//! loop itself only stops on shutdown.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::process::Command;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;
use tracing::{error, info, warn};

use crate::config::{CommandSpec, MaintenanceConfig};

/// What happened during one maintenance pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    pub commands_succeeded: usize,
    pub commands_failed: usize,
    /// `Some(true)` if the cache directory was removed, `Some(false)` if it
    /// was already absent, `None` if no cache directory is configured or
    /// removal failed
    pub cache_cleared: Option<bool>,
}

pub struct MaintenanceRunner {
    config: MaintenanceConfig,
    interval: Duration,
}

impl MaintenanceRunner {
    pub fn new(config: MaintenanceConfig) -> Result<Self> {
        let interval = config.interval()?;
        Ok(Self { config, interval })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run every configured command in order, then clear the cache.
    pub async fn run_pass(&self) -> PassReport {
        let mut report = PassReport::default();

        for spec in &self.config.commands {
            match run_command(spec).await {
                Ok(output) => {
                    report.commands_succeeded += 1;
                    info!("Command '{}' output: {}", spec, output.trim_end());
                }
                Err(e) => {
                    report.commands_failed += 1;
                    error!("Error running '{}' command: {e:#}", spec);
                }
            }
        }

        if let Some(dir) = &self.config.cache_dir {
            match clear_cache(dir).await {
                Ok(true) => {
                    info!("Cache cleared successfully ({})", dir.display());
                    report.cache_cleared = Some(true);
                }
                Ok(false) => {
                    info!("Cache directory {} already absent", dir.display());
                    report.cache_cleared = Some(false);
                }
                Err(e) => error!("Error clearing cache: {e:#}"),
            }
        }

        report
    }

    /// Run passes until `shutdown` fires. Returns the number of passes.
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) -> u64 {
        let mut passes = 0;
        info!(
            "Starting maintenance loop ({} commands, interval {:?})",
            self.config.commands.len(),
            self.interval
        );

        loop {
            passes += 1;
            let report = self.run_pass().await;
            if report.commands_failed > 0 {
                warn!(
                    "Maintenance pass {} finished with {} failed commands",
                    passes, report.commands_failed
                );
            }

            match shutdown.try_recv() {
                Err(TryRecvError::Empty) => {}
                _ => {
                    info!("Received shutdown signal");
                    break;
                }
            }

            tokio::select! {
                _ = shutdown.recv() => {
                    info!("Received shutdown signal");
                    break;
                }
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        passes
    }
}

/// Run one command and return its combined stdout and stderr.
///
/// A non-zero exit status is an error carrying the output.
pub async fn run_command(spec: &CommandSpec) -> Result<String> {
    let output = Command::new(&spec.program)
        .args(&spec.args)
        .stdin(Stdio::null())
        .output()
        .await
        .with_context(|| format!("Failed to start '{spec}'"))?;

    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));

    if !output.status.success() {
        anyhow::bail!(
            "'{spec}' exited with {}: {}",
            output.status,
            combined.trim_end()
        );
    }
    Ok(combined)
}

/// Delete `dir` and everything in it.
///
/// Returns `false` when the directory did not exist.
pub async fn clear_cache(dir: &Path) -> Result<bool> {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e).with_context(|| format!("Failed to remove {}", dir.display())),
    }
}
