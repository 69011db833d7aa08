#![forbid(unsafe_code)]
#![deny(warnings)]
#![warn(clippy::pedantic)]

use anyhow::{Context, Result as AnyResult};
use prometheus::{Encoder, IntCounter, IntGauge, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,
    pub test_active: IntGauge,
    pub target_percent: IntGauge,
    pub held_bytes: IntGauge,
    pub cpu_workers: IntGauge,
    pub hold_total_seconds: IntGauge,
    pub hold_remaining_seconds: IntGauge,
    pub filler_bytes_written_total: IntCounter,
}

fn gauge(registry: &Registry, name: &str, help: &str) -> AnyResult<IntGauge> {
    let g = IntGauge::with_opts(Opts::new(name, help)).with_context(|| format!("create {name}"))?;
    registry
        .register(Box::new(g.clone()))
        .with_context(|| format!("register {name}"))?;
    Ok(g)
}

impl Metrics {
    pub fn new() -> AnyResult<Self> {
        let registry = Registry::new();
        let test_active = gauge(&registry, "stress_test_active", "1 while a stress test is running")?;
        let target_percent = gauge(&registry, "stress_target_percent", "requested utilization percent")?;
        let held_bytes = gauge(&registry, "stress_held_bytes", "bytes of memory or disk currently held")?;
        let cpu_workers = gauge(&registry, "stress_cpu_workers", "busy cpu workers")?;
        let hold_total_seconds =
            gauge(&registry, "stress_hold_total_seconds", "configured hold seconds")?;
        let hold_remaining_seconds =
            gauge(&registry, "stress_hold_remaining_seconds", "remaining hold seconds")?;
        let filler_bytes_written_total = IntCounter::with_opts(Opts::new(
            "stress_filler_bytes_written_total",
            "filler bytes written to disk",
        ))
        .context("create filler_bytes_written_total")?;
        registry
            .register(Box::new(filler_bytes_written_total.clone()))
            .context("register filler_bytes_written_total")?;
        Ok(Self {
            registry,
            test_active,
            target_percent,
            held_bytes,
            cpu_workers,
            hold_total_seconds,
            hold_remaining_seconds,
            filler_bytes_written_total,
        })
    }

    pub fn mark_test_started(&self, target_percent: Option<u32>) {
        self.test_active.set(1);
        self.target_percent
            .set(target_percent.map_or(0, i64::from));
    }

    pub fn mark_hold(&self, total_seconds: u64) {
        let secs = i64::try_from(total_seconds).unwrap_or(i64::MAX);
        self.hold_total_seconds.set(secs);
        self.hold_remaining_seconds.set(secs);
    }

    pub fn set_held_bytes(&self, bytes: u64) {
        self.held_bytes.set(i64::try_from(bytes).unwrap_or(i64::MAX));
    }

    pub fn mark_test_finished(&self) {
        self.test_active.set(0);
        self.held_bytes.set(0);
        self.cpu_workers.set(0);
        self.hold_remaining_seconds.set(0);
    }

    pub fn encode_text(&self) -> AnyResult<Vec<u8>> {
        let mut buf = Vec::new();
        let encoder = TextEncoder::new();
        let mf = self.registry.gather();
        encoder.encode(&mf, &mut buf).context("encode metrics")?;
        Ok(buf)
    }
}
