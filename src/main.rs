#![forbid(unsafe_code)]
#![deny(warnings)]
#![warn(clippy::pedantic)]

use std::fs::OpenOptions;
use std::path::Path;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result as AnyResult};
use chimp_stress::lib_net::NetworkSettings;
use chimp_stress::signals::spawn_signal_listener;
use chimp_stress::{
    shutdown_channel, spawn_status_server, AppState, Cli, Metrics, RunnerSettings, StatusBoard,
    StressRunner, SysInventory,
};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

fn init_tracing(log_file: &Path) -> AnyResult<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .with_context(|| format!("open log file {}", log_file.display()))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().json())
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .try_init()
        .context("init tracing")?;
    Ok(())
}

async fn run(cli: Cli) -> AnyResult<ExitCode> {
    info!(pid = std::process::id(), test = %cli.stress.test, "starting stress harness");
    if usize::BITS <= 32 {
        warn!("32-bit build detected; large allocations may not be addressable");
    }
    let metrics = Metrics::new().context("metrics init")?;
    let board = StatusBoard::default();
    let (trigger, shutdown) = shutdown_channel();
    spawn_signal_listener(trigger);

    let server = match &cli.listen {
        Some(bind) => Some(
            spawn_status_server(
                bind.clone(),
                AppState {
                    board: board.clone(),
                    metrics: metrics.clone(),
                },
            )
            .with_context(|| format!("bind status server on {bind}"))?,
        ),
        None => None,
    };

    let settings = RunnerSettings {
        network: NetworkSettings {
            program: cli.iperf_bin.clone(),
            ..NetworkSettings::default()
        },
    };
    let runner = StressRunner::new(
        board.clone(),
        metrics,
        Arc::new(SysInventory),
        settings,
        shutdown,
    );
    let outcome = runner.run(&cli.stress).await;

    let final_status = board.snapshot(chrono::Utc::now().timestamp());
    info!(
        status = %serde_json::to_string(&final_status).context("encode final status")?,
        "final run status"
    );
    if let Some(handle) = server {
        handle.stop(true).await;
    }
    Ok(match outcome {
        Ok(report) => {
            info!(kind = %report.kind, held_bytes = report.held_bytes, "done");
            ExitCode::SUCCESS
        }
        Err(e) => ExitCode::from(e.exit_code()),
    })
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = init_tracing(&cli.log_file) {
        eprintln!("{e:#}");
        return ExitCode::FAILURE;
    }
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %format!("{e:#}"), "fatal");
            ExitCode::FAILURE
        }
    }
}
