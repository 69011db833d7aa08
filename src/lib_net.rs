#![forbid(unsafe_code)]
#![deny(warnings)]
#![warn(clippy::pedantic)]

use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::process::{Child, Command};
use tracing::{info, warn};

use crate::context::RunContext;
use crate::error::StressError;

pub const DEFAULT_IPERF_BIN: &str = "iperf3";

/// How long the client may outlive the requested duration before it is killed.
pub const DEFAULT_EXIT_GRACE: Duration = Duration::from_secs(10);

#[derive(Clone, Debug)]
pub struct NetworkSettings {
    pub program: String,
    pub exit_grace: Duration,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            program: DEFAULT_IPERF_BIN.to_string(),
            exit_grace: DEFAULT_EXIT_GRACE,
        }
    }
}

/// Client arguments for a timed throughput run bound to `interface`.
#[must_use]
pub fn iperf_args(peer_hostname: &str, duration_seconds: u64, interface: &str) -> Vec<String> {
    vec![
        "--client".into(),
        peer_hostname.into(),
        "--time".into(),
        duration_seconds.to_string(),
        "--bind-dev".into(),
        interface.into(),
    ]
}

enum Finish {
    Exited(std::io::Result<ExitStatus>),
    Held(Result<(), StressError>),
}

async fn terminate(child: &mut Child, program: &str) {
    if let Err(e) = child.kill().await {
        warn!(program, error = %e, "failed to terminate throughput client");
    }
}

pub async fn network_load(
    ctx: &RunContext,
    settings: &NetworkSettings,
    duration_seconds: u64,
    interface: &str,
    peer_hostname: &str,
) -> Result<(), StressError> {
    if duration_seconds == 0 {
        return Err(StressError::Validation(
            "non-positive running time specified (--seconds)".into(),
        ));
    }
    if interface.trim().is_empty() {
        return Err(StressError::Validation("no interface specified (--interface)".into()));
    }
    if peer_hostname.trim().is_empty() {
        return Err(StressError::Validation("no peer hostname specified (--hostname)".into()));
    }
    info!("Starting Network Stress Test");
    let program = settings.program.as_str();
    let args = iperf_args(peer_hostname, duration_seconds, interface);
    info!(program, args = ?args, "launching throughput client");
    let mut child = Command::new(program)
        .args(&args)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| StressError::External {
            program: program.to_string(),
            reason: format!("failed to start: {e}"),
        })?;

    let finish = tokio::select! {
        status = child.wait() => Finish::Exited(status),
        held = ctx.hold(duration_seconds) => Finish::Held(held),
    };
    let status = match finish {
        Finish::Exited(status) => status,
        Finish::Held(Err(e)) => {
            ctx.releasing();
            terminate(&mut child, program).await;
            return Err(e);
        }
        Finish::Held(Ok(())) => {
            if let Ok(status) = tokio::time::timeout(settings.exit_grace, child.wait()).await {
                status
            } else {
                warn!(program, "throughput client still running after test duration; terminating");
                ctx.releasing();
                terminate(&mut child, program).await;
                info!("***** Network Stress Test Complete.");
                return Ok(());
            }
        }
    };

    ctx.releasing();
    let status = status.map_err(|e| StressError::External {
        program: program.to_string(),
        reason: e.to_string(),
    })?;
    if !status.success() {
        return Err(StressError::External {
            program: program.to_string(),
            reason: format!("exited with {status}"),
        });
    }
    info!("***** Network Stress Test Complete.");
    Ok(())
}
