#![forbid(unsafe_code)]
#![deny(warnings)]
#![warn(clippy::pedantic)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::context::RunContext;
use crate::error::StressError;
use crate::inventory::Inventory;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CoreSelection {
    pub cores: usize,
    pub all_cores: bool,
}

/// Clamps the requested core count to what the host has.
#[must_use]
pub fn select_cores(requested: usize, present: usize) -> CoreSelection {
    let present = present.max(1);
    if requested >= present {
        CoreSelection {
            cores: present,
            all_cores: true,
        }
    } else {
        CoreSelection {
            cores: requested,
            all_cores: false,
        }
    }
}

fn fib(n: u32) -> u64 {
    if n < 2 {
        1
    } else {
        fib(n - 1) + fib(n - 2)
    }
}

fn burn(deadline: Instant, stop: &AtomicBool) -> u64 {
    let mut rounds = 0u64;
    while !stop.load(Ordering::Relaxed) && Instant::now() < deadline {
        std::hint::black_box(fib(std::hint::black_box(24)));
        rounds += 1;
    }
    rounds
}

/// Busy worker threads. Dropping the set signals every worker to stop.
pub struct CpuWorkers {
    stop: Arc<AtomicBool>,
    handles: Vec<JoinHandle<u64>>,
}

impl CpuWorkers {
    pub fn spawn(count: usize, duration: Duration) -> Result<Self, StressError> {
        let deadline = Instant::now() + duration;
        let mut workers = Self {
            stop: Arc::new(AtomicBool::new(false)),
            handles: Vec::with_capacity(count),
        };
        for id in 0..count {
            let stop = Arc::clone(&workers.stop);
            let handle = std::thread::Builder::new()
                .name(format!("cpu-burn-{id}"))
                .spawn(move || burn(deadline, &stop))
                .map_err(|e| StressError::External {
                    program: "cpu worker".into(),
                    reason: e.to_string(),
                })?;
            workers.handles.push(handle);
        }
        Ok(workers)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Stops and joins every worker; returns total completed rounds.
    pub async fn stop(mut self) -> u64 {
        self.stop.store(true, Ordering::Relaxed);
        let handles = std::mem::take(&mut self.handles);
        tokio::task::spawn_blocking(move || {
            handles
                .into_iter()
                .map(|h| h.join().unwrap_or(0))
                .sum::<u64>()
        })
        .await
        .unwrap_or(0)
    }
}

impl Drop for CpuWorkers {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

pub async fn cpu_load(
    ctx: &RunContext,
    inventory: &dyn Inventory,
    duration_seconds: u64,
    core_count: usize,
) -> Result<usize, StressError> {
    if duration_seconds == 0 {
        return Err(StressError::Validation(
            "non-positive running time specified (--seconds)".into(),
        ));
    }
    if core_count == 0 {
        return Err(StressError::Validation(
            "non-positive CPU core count specified (--core_count)".into(),
        ));
    }
    info!("Starting CPU Stress Test");
    let present = inventory.cpu_count();
    info!(
        "{present} cores present on machine. {core_count} cores to stress test for {duration_seconds} seconds."
    );
    let selection = select_cores(core_count, present);
    if selection.all_cores {
        info!("All cores will be used.");
    } else {
        #[allow(clippy::cast_precision_loss)]
        let share = selection.cores as f64 / present as f64 * 100.0;
        info!("{} of {} cores will be used; {:.2}%", selection.cores, present, share);
    }

    let workers = CpuWorkers::spawn(selection.cores, Duration::from_secs(duration_seconds))?;
    ctx.metrics
        .cpu_workers
        .set(i64::try_from(workers.len()).unwrap_or(i64::MAX));
    let held = ctx.hold(duration_seconds).await;

    ctx.releasing();
    let rounds = workers.stop().await;
    ctx.metrics.cpu_workers.set(0);
    debug!(rounds, "cpu workers joined");
    held?;
    info!("***** CPU Stress Test Complete.");
    Ok(selection.cores)
}
