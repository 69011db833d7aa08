#![forbid(unsafe_code)]
#![deny(warnings)]
#![warn(clippy::pedantic)]

use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chimp_stress::context::{shutdown_channel, RunContext, Shutdown};
use chimp_stress::domain::StatusBoard;
use chimp_stress::error::StressError;
use chimp_stress::inventory::{MemorySnapshot, StaticInventory};
use chimp_stress::lib_cpu::{cpu_load, select_cores, CoreSelection, CpuWorkers};
use chimp_stress::metrics::Metrics;
use parking_lot::Mutex;

/// In-memory log sink for asserting on emitted lines.
#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Captured {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl Write for Captured {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn ctx_with(shutdown: Shutdown) -> RunContext {
    RunContext::new(
        StatusBoard::default(),
        Metrics::new().expect("metrics"),
        shutdown,
    )
}

async fn cpu_logs(present: usize, requested: usize) -> String {
    let logs = Captured::default();
    let sink = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_writer(move || sink.clone())
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);
    cpu_load(&ctx_with(Shutdown::never()), &inventory(present), 1, requested)
        .await
        .expect("ok");
    logs.text()
}

fn inventory(cpus: usize) -> StaticInventory {
    StaticInventory {
        memory: MemorySnapshot {
            total: 0,
            available: 0,
        },
        volumes: Vec::new(),
        cpus,
    }
}

#[test]
fn clamps_to_present_cores() {
    assert_eq!(
        select_cores(9999, 8),
        CoreSelection {
            cores: 8,
            all_cores: true
        }
    );
    assert_eq!(
        select_cores(8, 8),
        CoreSelection {
            cores: 8,
            all_cores: true
        }
    );
    assert_eq!(
        select_cores(3, 8),
        CoreSelection {
            cores: 3,
            all_cores: false
        }
    );
}

#[tokio::test]
async fn workers_stop_on_request() {
    let workers = CpuWorkers::spawn(2, Duration::from_secs(60)).expect("spawn");
    assert_eq!(workers.len(), 2);
    tokio::time::sleep(Duration::from_millis(50)).await;
    let started = std::time::Instant::now();
    workers.stop().await;
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn cpu_runs_on_clamped_cores() {
    let ctx = RunContext::new(
        StatusBoard::default(),
        Metrics::new().expect("metrics"),
        Shutdown::never(),
    );
    let used = cpu_load(&ctx, &inventory(2), 1, 9999).await.expect("ok");
    assert_eq!(used, 2);
    assert_eq!(ctx.metrics.cpu_workers.get(), 0);
}

#[tokio::test]
async fn cpu_rejects_zero_cores() {
    let ctx = RunContext::new(
        StatusBoard::default(),
        Metrics::new().expect("metrics"),
        Shutdown::never(),
    );
    assert!(matches!(
        cpu_load(&ctx, &inventory(2), 1, 0).await,
        Err(StressError::Validation(_))
    ));
}

#[tokio::test]
async fn logs_all_cores_when_request_exceeds_present() {
    let logs = cpu_logs(2, 9999).await;
    assert!(logs.contains("All cores will be used."), "{logs}");
    assert!(!logs.contains("cores will be used;"), "{logs}");
}

#[tokio::test]
async fn logs_share_when_subset_requested() {
    let logs = cpu_logs(4, 1).await;
    assert!(logs.contains("1 of 4 cores will be used; 25.00%"), "{logs}");
    assert!(!logs.contains("All cores will be used."), "{logs}");
}

#[tokio::test]
async fn cpu_workers_joined_when_interrupted_mid_hold() {
    let (trigger, shutdown) = shutdown_channel();
    let ctx = ctx_with(shutdown);
    let gauge = ctx.metrics.cpu_workers.clone();
    let watcher = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        let busy = gauge.get();
        trigger.trigger();
        busy
    });
    let started = Instant::now();
    let err = cpu_load(&ctx, &inventory(2), 30, 2)
        .await
        .expect_err("interrupted");
    assert!(matches!(err, StressError::Interrupted));
    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(watcher.await.expect("watcher"), 2);
    assert_eq!(ctx.metrics.cpu_workers.get(), 0);
}
