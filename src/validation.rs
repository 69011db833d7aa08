#![forbid(unsafe_code)]
#![deny(warnings)]
#![warn(clippy::pedantic)]

use std::str::FromStr;

use crate::cli::StressArgs;
use crate::domain::{StressKind, StressRequest};
use crate::error::StressError;

fn positive(value: Option<i64>, flag: &str, problems: &mut Vec<String>) -> u64 {
    match value {
        None => {
            problems.push(format!("{flag} is required"));
            0
        }
        Some(v) if v <= 0 => {
            problems.push(format!("{flag} must be positive (got {v})"));
            0
        }
        Some(v) => u64::try_from(v).unwrap_or(0),
    }
}

fn percent(value: Option<i64>, problems: &mut Vec<String>) -> u32 {
    match value {
        Some(v) if v > 100 => {
            problems.push(format!("--percent must be at most 100 (got {v})"));
            0
        }
        other => u32::try_from(positive(other, "--percent", problems)).unwrap_or(0),
    }
}

fn non_empty(value: Option<&String>, flag: &str, problems: &mut Vec<String>) -> String {
    match value.map(|s| s.trim()) {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => {
            problems.push(format!("{flag} is required"));
            String::new()
        }
    }
}

/// Checks every parameter the selected test needs and builds the request.
/// All problems are reported together.
pub fn validate_args(args: &StressArgs) -> Result<StressRequest, StressError> {
    let kind = StressKind::from_str(args.test.trim())
        .map_err(|e| StressError::Validation(format!("{e}; expected ram, hdd, cpu or net (--test)")))?;
    let mut problems = Vec::new();
    let duration_seconds = positive(args.seconds, "--seconds", &mut problems);
    let request = match kind {
        StressKind::Memory => StressRequest::Memory {
            target_percent: percent(args.percent, &mut problems),
            duration_seconds,
        },
        StressKind::Disk => {
            let target_percent = percent(args.percent, &mut problems);
            let volumes: Vec<String> = args
                .volumes
                .iter()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .collect();
            if volumes.is_empty() {
                problems.push("--volumes is required".into());
            }
            StressRequest::Disk {
                target_percent,
                duration_seconds,
                volumes,
            }
        }
        StressKind::Cpu => StressRequest::Cpu {
            duration_seconds,
            core_count: usize::try_from(positive(args.core_count, "--core_count", &mut problems))
                .unwrap_or(usize::MAX),
        },
        StressKind::Network => StressRequest::Network {
            duration_seconds,
            interface: non_empty(args.interface.as_ref(), "--interface", &mut problems),
            peer_hostname: non_empty(args.hostname.as_ref(), "--hostname", &mut problems),
        },
    };
    if problems.is_empty() {
        Ok(request)
    } else {
        Err(StressError::Validation(format!(
            "{} test: {}",
            kind.cli_name(),
            problems.join("; ")
        )))
    }
}
