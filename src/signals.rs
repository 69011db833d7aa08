#![forbid(unsafe_code)]
#![deny(warnings)]
#![warn(clippy::pedantic)]

//! Turns SIGINT/SIGTERM into a shutdown notification.

use crate::context::ShutdownTrigger;

/// Exit status used when a second signal forces the process down.
pub const FORCED_EXIT_CODE: i32 = 130;

/// Spawns a task that fires `trigger` on the first termination signal and
/// exits the process on the second one.
pub fn spawn_signal_listener(trigger: ShutdownTrigger) {
    tokio::spawn(async move {
        if let Err(e) = wait_for_shutdown_signal().await {
            tracing::error!("failed to register signal handlers: {}", e);
            return;
        }
        trigger.trigger();
        tracing::warn!("releasing held resources; signal again to exit immediately");
        if let Err(e) = wait_for_shutdown_signal().await {
            tracing::error!("failed to register signal handlers: {}", e);
            return;
        }
        tracing::error!("second termination signal; exiting without cleanup");
        std::process::exit(FORCED_EXIT_CODE);
    });
}

/// Waits for SIGTERM or SIGINT.
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                tracing::info!("Received SIGINT");
            }
        }
        Ok(())
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        tracing::info!("Received Ctrl+C");
        Ok(())
    }
}
