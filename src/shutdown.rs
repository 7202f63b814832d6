//! Process signal handling for the long-running loops.

use tokio::sync::broadcast;
use tracing::{error, info};

/// Sets up a shutdown signal handler
///
/// The returned receiver fires once on Ctrl+C, or on SIGTERM where
/// available (container stop).
pub fn setup_shutdown_handler() -> broadcast::Receiver<()> {
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

    tokio::spawn(async move {
        wait_for_signal().await;
        let _ = shutdown_tx.send(());
    });

    shutdown_rx
}

async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    result = tokio::signal::ctrl_c() => on_ctrl_c(result).await,
                    _ = terminate.recv() => info!("Received SIGTERM, finishing current cycle"),
                }
                return;
            }
            Err(e) => error!("Failed to install SIGTERM handler: {e}"),
        }
    }

    on_ctrl_c(tokio::signal::ctrl_c().await).await;
}

async fn on_ctrl_c(result: std::io::Result<()>) {
    match result {
        Ok(()) => info!("Received interrupt signal (Ctrl+C), finishing current cycle"),
        Err(e) => {
            // Without a handler there is nothing to wait for; never fire.
            error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    }
}
