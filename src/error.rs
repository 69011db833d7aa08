#![forbid(unsafe_code)]
#![deny(warnings)]
#![warn(clippy::pedantic)]

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StressError {
    #[error("invalid parameters: {0}")]
    Validation(String),
    #[error("system already exceeds {target_percent}% {resource} use")]
    CapacityExceeded {
        resource: String,
        target_percent: u32,
    },
    #[error("{mount_point} found, but is not writable")]
    NotWritable { mount_point: String },
    #[error("no valid mount points found")]
    NoUsableVolumes,
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unable to allocate {bytes} bytes of memory")]
    Allocation { bytes: u64 },
    #[error("{program}: {reason}")]
    External { program: String, reason: String },
    #[error("interrupted by shutdown signal")]
    Interrupted,
}

impl StressError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StressError::Io {
            path: path.into(),
            source,
        }
    }

    /// Process exit code for this error.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            StressError::Validation(_) => 2,
            StressError::Interrupted => 130,
            _ => 1,
        }
    }
}
