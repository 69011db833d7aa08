#![forbid(unsafe_code)]
#![deny(warnings)]
#![warn(clippy::pedantic)]

//! Point-in-time views of host memory, cores and mounted volumes.

use std::path::{Path, PathBuf};

use serde::Serialize;
use sysinfo::{Disks, System};
use tracing::info;

use crate::units::{bytes_to_english, group_digits, percent_of};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct MemorySnapshot {
    pub total: u64,
    pub available: u64,
}

impl MemorySnapshot {
    #[must_use]
    pub fn used(&self) -> u64 {
        self.total.saturating_sub(self.available)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VolumeSnapshot {
    pub mount_point: PathBuf,
    pub file_system: String,
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub free_bytes: u64,
    pub used_percent: f64,
    pub is_writable: bool,
}

impl VolumeSnapshot {
    /// Builds a snapshot from capacity and the space available to the caller.
    pub fn new(
        mount_point: impl Into<PathBuf>,
        file_system: impl Into<String>,
        total_bytes: u64,
        free_bytes: u64,
        is_writable: bool,
    ) -> Self {
        let used_bytes = total_bytes.saturating_sub(free_bytes);
        Self {
            mount_point: mount_point.into(),
            file_system: file_system.into(),
            total_bytes,
            used_bytes,
            free_bytes,
            used_percent: percent_of(used_bytes, total_bytes),
            is_writable,
        }
    }
}

/// Source of resource snapshots. Every call queries afresh.
pub trait Inventory: Send + Sync {
    fn memory(&self) -> MemorySnapshot;
    fn volumes(&self) -> Vec<VolumeSnapshot>;
    fn cpu_count(&self) -> usize;

    fn volume(&self, mount_point: &Path) -> Option<VolumeSnapshot> {
        self.volumes()
            .into_iter()
            .find(|v| v.mount_point == mount_point)
    }
}

/// Host inventory backed by `sysinfo`.
#[derive(Clone, Copy, Debug, Default)]
pub struct SysInventory;

impl Inventory for SysInventory {
    fn memory(&self) -> MemorySnapshot {
        let mut sys = System::new();
        sys.refresh_memory();
        MemorySnapshot {
            total: sys.total_memory(),
            available: sys.available_memory(),
        }
    }

    fn volumes(&self) -> Vec<VolumeSnapshot> {
        let disks = Disks::new_with_refreshed_list();
        disks
            .list()
            .iter()
            .map(|disk| {
                VolumeSnapshot::new(
                    disk.mount_point(),
                    disk.file_system().to_string_lossy(),
                    disk.total_space(),
                    disk.available_space(),
                    !disk.is_read_only(),
                )
            })
            .collect()
    }

    fn cpu_count(&self) -> usize {
        std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
    }
}

/// Fixed inventory, returned verbatim on every query.
#[derive(Clone, Debug)]
pub struct StaticInventory {
    pub memory: MemorySnapshot,
    pub volumes: Vec<VolumeSnapshot>,
    pub cpus: usize,
}

impl Inventory for StaticInventory {
    fn memory(&self) -> MemorySnapshot {
        self.memory
    }

    fn volumes(&self) -> Vec<VolumeSnapshot> {
        self.volumes.clone()
    }

    fn cpu_count(&self) -> usize {
        self.cpus
    }
}

pub fn log_memory(mem: &MemorySnapshot) {
    info!(
        total = mem.total,
        "    Total RAM: {} - ({} bytes)",
        bytes_to_english(mem.total),
        group_digits(mem.total)
    );
    info!(
        available = mem.available,
        "Available RAM: {} - ({} bytes)",
        bytes_to_english(mem.available),
        group_digits(mem.available)
    );
    info!(
        "Available RAM: {:.2}% - Used RAM: {:.2}%",
        percent_of(mem.available, mem.total),
        percent_of(mem.used(), mem.total)
    );
}

pub fn log_volumes(volumes: &[VolumeSnapshot]) {
    info!(count = volumes.len(), "drive & partition info");
    for v in volumes {
        info!(
            mount = %v.mount_point.display(),
            fs = %v.file_system,
            writable = v.is_writable,
            "total size: {}, bytes used: {} ({:.1}%), bytes free: {}",
            group_digits(v.total_bytes),
            group_digits(v.used_bytes),
            v.used_percent,
            group_digits(v.free_bytes)
        );
    }
}
