#![forbid(unsafe_code)]
#![deny(warnings)]
#![warn(clippy::pedantic)]

//! Filler files sized to push selected volumes to a target usage.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use prometheus::IntCounter;
use tracing::{debug, error, info, warn};

use crate::context::{RunContext, Shutdown};
use crate::error::StressError;
use crate::inventory::{log_volumes, Inventory, VolumeSnapshot};
use crate::planner::{plan, AllocationPlan};
use crate::units::{bytes_to_english, group_digits};

/// Name of the filler file created at the root of each targeted volume.
pub const FILLER_FILE_NAME: &str = "MAGIC_HDD_STRESS_TEST_FILENAME";

/// Upper bound on a single write call. Shutdown is checked between chunks.
pub const WRITE_CHUNK_BYTES: u64 = 64 << 20;

#[must_use]
pub fn filler_path(mount_point: &Path) -> PathBuf {
    mount_point.join(FILLER_FILE_NAME)
}

/// Probes a fresh temp file under a different letter case.
#[must_use]
pub fn is_file_system_case_sensitive() -> bool {
    let Ok(tmp) = tempfile::NamedTempFile::new() else {
        return true;
    };
    let original = tmp.path().to_string_lossy().into_owned();
    let upper = original.to_uppercase();
    let probe = if upper == original {
        original.to_lowercase()
    } else {
        upper
    };
    if probe == original {
        return true;
    }
    !Path::new(&probe).exists()
}

/// Strips trailing separators, keeping a bare root intact.
fn normalize_identifier(id: &str) -> String {
    let id = id.trim();
    let trimmed = id.trim_end_matches(['/', '\\']);
    if trimmed.is_empty() {
        id.chars().next().map(String::from).unwrap_or_default()
    } else {
        trimmed.to_string()
    }
}

fn identifiers_match(a: &str, b: &str, case_insensitive: bool) -> bool {
    let (a, b) = (normalize_identifier(a), normalize_identifier(b));
    if case_insensitive {
        a.to_lowercase() == b.to_lowercase()
    } else {
        a == b
    }
}

/// Intersects requested identifiers with reported volumes, keeping inventory
/// order. Read-only matches are logged and dropped.
#[must_use]
pub fn select_volumes(
    requested: &[String],
    reported: &[VolumeSnapshot],
    case_insensitive: bool,
) -> Vec<VolumeSnapshot> {
    let mut valid = Vec::new();
    for volume in reported {
        let mount = volume.mount_point.to_string_lossy();
        if !requested
            .iter()
            .any(|id| identifiers_match(id, &mount, case_insensitive))
        {
            continue;
        }
        if volume.is_writable {
            valid.push(volume.clone());
        } else {
            let err = StressError::NotWritable {
                mount_point: mount.into_owned(),
            };
            error!(fs = %volume.file_system, "{err}");
        }
    }
    for id in requested {
        if !reported.iter().any(|v| {
            identifiers_match(id, &v.mount_point.to_string_lossy(), case_insensitive)
        }) {
            warn!(volume = %id, "requested volume is not a mounted volume");
        }
    }
    valid
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub removed: usize,
    pub failed: usize,
}

/// Deletes the filler file under every mount point. Missing files are fine,
/// other failures are logged and counted.
pub fn sweep_filler_files(mount_points: &[PathBuf]) -> SweepReport {
    let mut report = SweepReport::default();
    for mount in mount_points {
        let path = filler_path(mount);
        match std::fs::remove_file(&path) {
            Ok(()) => {
                info!(path = %path.display(), "Found and removed hdd stress test file");
                report.removed += 1;
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to remove hdd stress test file");
                report.failed += 1;
            }
        }
    }
    report
}

/// Filler files created by one disk run plus the mount points swept on release.
///
/// Release happens once: explicitly through [`FillerFiles::release`], or on
/// drop if the run ended any other way.
#[derive(Debug)]
pub struct FillerFiles {
    sweep: Vec<PathBuf>,
    created: Vec<(PathBuf, u64)>,
    released: bool,
}

impl FillerFiles {
    /// Registers the sweep list and removes leftovers of an earlier run.
    pub fn register(mount_points: impl IntoIterator<Item = PathBuf>) -> Self {
        let mut sweep: Vec<PathBuf> = Vec::new();
        for mount in mount_points {
            if !sweep.contains(&mount) {
                sweep.push(mount);
            }
        }
        let leftovers = sweep_filler_files(&sweep);
        if leftovers.removed > 0 {
            warn!(removed = leftovers.removed, "removed filler files left by a previous run");
        }
        Self {
            sweep,
            created: Vec::new(),
            released: false,
        }
    }

    fn record(&mut self, path: PathBuf, bytes: u64) {
        self.created.push((path, bytes));
    }

    #[must_use]
    pub fn created(&self) -> Vec<PathBuf> {
        self.created.iter().map(|(p, _)| p.clone()).collect()
    }

    #[must_use]
    pub fn held_bytes(&self) -> u64 {
        self.created.iter().map(|(_, b)| *b).sum()
    }

    #[must_use]
    pub fn is_released(&self) -> bool {
        self.released
    }

    pub fn release(&mut self) -> SweepReport {
        self.released = true;
        self.created.clear();
        sweep_filler_files(&self.sweep)
    }
}

impl Drop for FillerFiles {
    fn drop(&mut self) {
        if !self.released {
            let report = self.release();
            info!(removed = report.removed, failed = report.failed, "filler files released on exit");
        }
    }
}

fn chunk_len(n: u64, chunk_bytes: u64) -> usize {
    usize::try_from(n.min(chunk_bytes)).unwrap_or(usize::MAX)
}

/// Writes exactly `size` bytes of filler to `path` in chunks of at most
/// `chunk_bytes`. `stop` is polled before every chunk; once it returns true
/// the write ends with [`ErrorKind::Interrupted`] and the partial file is left
/// for the caller to remove.
pub fn write_filler_file(
    path: &Path,
    size: u64,
    chunk_bytes: u64,
    written_total: &IntCounter,
    stop: &dyn Fn() -> bool,
) -> std::io::Result<()> {
    let chunk_bytes = chunk_bytes.max(1);
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;
    let chunk = vec![b' '; chunk_len(size, chunk_bytes)];
    let writes = size.div_ceil(chunk_bytes);
    let mut written = 0u64;
    let mut n = 1u64;
    while written < size {
        if stop() {
            return Err(std::io::Error::new(
                ErrorKind::Interrupted,
                format!("stopped after {written} of {size} bytes"),
            ));
        }
        let len = chunk_len(size - written, chunk_bytes);
        file.write_all(&chunk[..len])?;
        written += len as u64;
        written_total.inc_by(len as u64);
        debug!(path = %path.display(), "write {n}/{writes}");
        n += 1;
    }
    file.sync_all()
}

async fn create_filler(
    path: PathBuf,
    bytes: u64,
    written_total: IntCounter,
    shutdown: Shutdown,
) -> std::io::Result<()> {
    tokio::task::spawn_blocking(move || {
        write_filler_file(&path, bytes, WRITE_CHUNK_BYTES, &written_total, &|| {
            shutdown.is_triggered()
        })
    })
    .await
    .map_err(|e| std::io::Error::other(e.to_string()))?
}

fn remove_partial(path: &Path) {
    if let Err(rm) = std::fs::remove_file(path) {
        if rm.kind() != ErrorKind::NotFound {
            warn!(path = %path.display(), error = %rm, "failed to remove partial filler file");
        }
    }
}

pub async fn disk_load(
    ctx: &RunContext,
    inventory: &dyn Inventory,
    target_percent: u32,
    duration_seconds: u64,
    volumes: &[String],
) -> Result<u64, StressError> {
    let requested: Vec<String> = volumes
        .iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect();
    if target_percent == 0 || duration_seconds == 0 || requested.is_empty() {
        return Err(StressError::Validation(
            "--volumes, --percent and --seconds must all be specified and positive for hard drive stress testing".into(),
        ));
    }
    info!("Starting Hard Drive Stress Test");
    let case_insensitive = !is_file_system_case_sensitive();
    debug!(case_insensitive, "volume identifier matching");

    let reported = inventory.volumes();
    log_volumes(&reported);
    let valid = select_volumes(&requested, &reported, case_insensitive);
    if valid.is_empty() {
        warn!("No valid mount points found. Exiting.");
        return Err(StressError::NoUsableVolumes);
    }

    let mut fillers = FillerFiles::register(
        reported
            .iter()
            .chain(valid.iter())
            .map(|v| v.mount_point.clone()),
    );
    let mut first_io_error = None;
    for volume in &valid {
        if ctx.shutdown.is_triggered() {
            warn!("shutdown requested while creating filler files");
            ctx.set_held_bytes(0);
            return Err(StressError::Interrupted);
        }
        let current = inventory
            .volume(&volume.mount_point)
            .unwrap_or_else(|| volume.clone());
        let mount = current.mount_point.display().to_string();
        let bytes = match plan(current.total_bytes, current.used_bytes, target_percent) {
            AllocationPlan::Consume { bytes } => bytes,
            AllocationPlan::TargetMet { .. } => {
                warn!(
                    mount = %mount,
                    "Current disk usage on volume ({:.1}%) exceeds specified percentage ({}%). Nothing will be written to disk.",
                    current.used_percent,
                    target_percent
                );
                continue;
            }
        };
        let path = filler_path(&current.mount_point);
        info!(
            bytes,
            "Creating new {} byte ({}) file: {}",
            group_digits(bytes),
            bytes_to_english(bytes),
            path.display()
        );
        let written = create_filler(
            path.clone(),
            bytes,
            ctx.metrics.filler_bytes_written_total.clone(),
            ctx.shutdown.clone(),
        )
        .await;
        match written {
            Ok(()) => {
                fillers.record(path, bytes);
                ctx.set_held_bytes(fillers.held_bytes());
            }
            Err(e) if e.kind() == ErrorKind::Interrupted && ctx.shutdown.is_triggered() => {
                warn!(path = %path.display(), error = %e, "shutdown requested while writing filler file");
                remove_partial(&path);
                ctx.set_held_bytes(0);
                return Err(StressError::Interrupted);
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "failed to create filler file");
                remove_partial(&path);
                if first_io_error.is_none() {
                    first_io_error = Some(StressError::io(path, e));
                }
            }
        }
    }

    if fillers.created().is_empty() {
        fillers.release();
        return Err(first_io_error.unwrap_or(StressError::CapacityExceeded {
            resource: "disk".into(),
            target_percent,
        }));
    }

    let held_bytes = fillers.held_bytes();
    info!(
        files = fillers.created().len(),
        "All temp files created. Files will be deleted after {duration_seconds} seconds."
    );
    let held = ctx.hold(duration_seconds).await;

    ctx.releasing();
    info!("Deleting temp files...");
    let report = fillers.release();
    ctx.set_held_bytes(0);
    info!(removed = report.removed, failed = report.failed, "Done");
    held?;
    info!("***** HDD Stress Test Complete.");
    Ok(held_bytes)
}
