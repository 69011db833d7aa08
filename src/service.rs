#![forbid(unsafe_code)]
#![deny(warnings)]
#![warn(clippy::pedantic)]

use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, info_span, Instrument};

use crate::cli::StressArgs;
use crate::context::{RunContext, Shutdown};
use crate::domain::{RunState, StatusBoard, StressKind, StressRequest};
use crate::error::StressError;
use crate::inventory::Inventory;
use crate::lib_net::NetworkSettings;
use crate::metrics::Metrics;
use crate::validation::validate_args;

#[derive(Clone, Debug, Default)]
pub struct RunnerSettings {
    pub network: NetworkSettings,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub kind: StressKind,
    pub duration_seconds: u64,
    pub held_bytes: u64,
    pub cpu_workers: usize,
}

/// Runs exactly one stress test per call and drives the run state machine.
#[derive(Clone)]
pub struct StressRunner {
    board: StatusBoard,
    metrics: Metrics,
    inventory: Arc<dyn Inventory>,
    settings: RunnerSettings,
    shutdown: Shutdown,
}

impl StressRunner {
    pub fn new(
        board: StatusBoard,
        metrics: Metrics,
        inventory: Arc<dyn Inventory>,
        settings: RunnerSettings,
        shutdown: Shutdown,
    ) -> Self {
        Self {
            board,
            metrics,
            inventory,
            settings,
            shutdown,
        }
    }

    #[must_use]
    pub fn board(&self) -> &StatusBoard {
        &self.board
    }

    pub fn validate(&self, args: &StressArgs) -> Result<StressRequest, StressError> {
        self.board.transition(RunState::Validating);
        validate_args(args).inspect_err(|e| self.fail(e))
    }

    pub async fn run(&self, args: &StressArgs) -> Result<RunReport, StressError> {
        let request = self.validate(args)?;
        let kind = request.kind();
        let span = info_span!("stress_test", kind = kind.cli_name());
        self.execute(request).instrument(span).await
    }

    async fn execute(&self, request: StressRequest) -> Result<RunReport, StressError> {
        let kind = request.kind();
        self.board.transition(RunState::Running(kind));
        self.metrics.mark_test_started(request.target_percent());
        let ctx = RunContext::new(
            self.board.clone(),
            self.metrics.clone(),
            self.shutdown.clone(),
        );
        let outcome = self.dispatch(&ctx, &request).await;
        self.metrics.mark_test_finished();
        match outcome {
            Ok(report) => {
                if matches!(self.board.current(), RunState::Running(_)) {
                    self.board.transition(RunState::Releasing);
                }
                self.board.transition(RunState::Done);
                self.board.set_message("completed");
                info!(held_bytes = report.held_bytes, "stress test complete");
                Ok(report)
            }
            Err(e) => {
                self.fail(&e);
                Err(e)
            }
        }
    }

    async fn dispatch(
        &self,
        ctx: &RunContext,
        request: &StressRequest,
    ) -> Result<RunReport, StressError> {
        let inventory = self.inventory.as_ref();
        let mut report = RunReport {
            kind: request.kind(),
            duration_seconds: request.duration_seconds(),
            held_bytes: 0,
            cpu_workers: 0,
        };
        match request {
            StressRequest::Memory {
                target_percent,
                duration_seconds,
            } => {
                report.held_bytes =
                    crate::lib_mem::memory_load(ctx, inventory, *target_percent, *duration_seconds)
                        .await?;
            }
            StressRequest::Disk {
                target_percent,
                duration_seconds,
                volumes,
            } => {
                report.held_bytes = crate::lib_disk::disk_load(
                    ctx,
                    inventory,
                    *target_percent,
                    *duration_seconds,
                    volumes,
                )
                .await?;
            }
            StressRequest::Cpu {
                duration_seconds,
                core_count,
            } => {
                report.cpu_workers =
                    crate::lib_cpu::cpu_load(ctx, inventory, *duration_seconds, *core_count)
                        .await?;
            }
            StressRequest::Network {
                duration_seconds,
                interface,
                peer_hostname,
            } => {
                crate::lib_net::network_load(
                    ctx,
                    &self.settings.network,
                    *duration_seconds,
                    interface,
                    peer_hostname,
                )
                .await?;
            }
        }
        Ok(report)
    }

    fn fail(&self, e: &StressError) {
        error!(error = %e, "stress test failed");
        self.board.set_message(e.to_string());
        self.board.transition(RunState::Failed);
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct HealthReport {
    pub status: String,
    pub state: RunState,
    pub metrics_ok: bool,
    pub registry_metrics: usize,
    pub invariants_ok: bool,
}

#[must_use]
pub fn health_report(board: &StatusBoard, metrics: &Metrics, now_ts: i64) -> HealthReport {
    let st = board.snapshot(now_ts);
    let invariants_ok = st.ends_ts_seconds == 0
        || (st.ends_ts_seconds >= st.started_ts_seconds
            && u64::try_from(st.ends_ts_seconds - st.started_ts_seconds).ok()
                == Some(st.total_duration_seconds)
            && st.remaining_seconds <= st.total_duration_seconds);
    let metrics_ok = metrics.encode_text().is_ok();
    let registry_metrics = metrics.registry.gather().len();
    let status = if metrics_ok && invariants_ok {
        "ok"
    } else {
        "degraded"
    };
    HealthReport {
        status: status.to_string(),
        state: st.state,
        metrics_ok,
        registry_metrics,
        invariants_ok,
    }
}
