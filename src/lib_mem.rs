#![forbid(unsafe_code)]
#![deny(warnings)]
#![warn(clippy::pedantic)]

use tracing::{info, warn};

use crate::context::RunContext;
use crate::error::StressError;
use crate::inventory::{log_memory, Inventory};
use crate::planner::{plan, AllocationPlan};
use crate::units::{bytes_to_english, group_digits};

/// Filler block owned for the hold period. Content is irrelevant, only size.
#[derive(Debug, Default)]
pub struct MemoryHold {
    block: Option<Vec<u8>>,
}

impl MemoryHold {
    /// Allocates and touches exactly `bytes` bytes so the pages are resident.
    pub fn allocate(bytes: u64) -> Result<Self, StressError> {
        let len = usize::try_from(bytes).map_err(|_| StressError::Allocation { bytes })?;
        let mut block = Vec::new();
        block
            .try_reserve_exact(len)
            .map_err(|_| StressError::Allocation { bytes })?;
        block.resize(len, b' ');
        Ok(Self { block: Some(block) })
    }

    #[must_use]
    pub fn held_bytes(&self) -> u64 {
        self.block.as_ref().map_or(0, |b| b.len() as u64)
    }

    #[must_use]
    pub fn is_released(&self) -> bool {
        self.block.is_none()
    }

    /// Drops the block. Returns how many bytes were released.
    pub fn release(&mut self) -> u64 {
        self.block.take().map_or(0, |b| b.len() as u64)
    }
}

pub async fn memory_load(
    ctx: &RunContext,
    inventory: &dyn Inventory,
    target_percent: u32,
    duration_seconds: u64,
) -> Result<u64, StressError> {
    if duration_seconds == 0 {
        return Err(StressError::Validation(
            "non-positive running time specified (--seconds)".into(),
        ));
    }
    if target_percent == 0 {
        return Err(StressError::Validation(
            "non-positive RAM percentage specified (--percent)".into(),
        ));
    }
    info!("Starting RAM Stress Test");
    let mem = inventory.memory();
    log_memory(&mem);

    let bytes = match plan(mem.total, mem.used(), target_percent) {
        AllocationPlan::Consume { bytes } => bytes,
        AllocationPlan::TargetMet { desired_used, used } => {
            warn!(desired_used, used, "System already exceeds {target_percent}% RAM use.");
            return Err(StressError::CapacityExceeded {
                resource: "RAM".into(),
                target_percent,
            });
        }
    };
    info!(
        bytes,
        "Consuming additional {} bytes ({}) of RAM to take total RAM use to > {}%...",
        group_digits(bytes),
        bytes_to_english(bytes),
        target_percent
    );
    let mut hold = tokio::task::spawn_blocking(move || MemoryHold::allocate(bytes))
        .await
        .map_err(|_| StressError::Allocation { bytes })??;
    ctx.set_held_bytes(hold.held_bytes());
    info!("RAM allocation complete.");
    log_memory(&inventory.memory());
    info!("RAM will be held for {duration_seconds} seconds, then released.");

    let held = ctx.hold(duration_seconds).await;

    ctx.releasing();
    info!("De-allocating RAM.");
    let released = hold.release();
    ctx.set_held_bytes(0);
    log_memory(&inventory.memory());
    held?;
    info!("***** RAM Stress Test Complete.");
    Ok(released)
}
