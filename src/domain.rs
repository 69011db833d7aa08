#![forbid(unsafe_code)]
#![deny(warnings)]
#![warn(clippy::pedantic)]

use anyhow::{bail, Result as AnyResult};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StressKind {
    Memory,
    Disk,
    Cpu,
    Network,
}

impl StressKind {
    /// Command-line name of the test.
    #[must_use]
    pub fn cli_name(self) -> &'static str {
        match self {
            StressKind::Memory => "ram",
            StressKind::Disk => "hdd",
            StressKind::Cpu => "cpu",
            StressKind::Network => "net",
        }
    }
}

impl std::fmt::Display for StressKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StressKind::Memory => f.write_str("RAM"),
            StressKind::Disk => f.write_str("HDD"),
            StressKind::Cpu => f.write_str("CPU"),
            StressKind::Network => f.write_str("Network"),
        }
    }
}

impl FromStr for StressKind {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> AnyResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "ram" => Ok(Self::Memory),
            "hdd" => Ok(Self::Disk),
            "cpu" => Ok(Self::Cpu),
            "net" => Ok(Self::Network),
            other => bail!(format!("invalid test name '{other}'")),
        }
    }
}

/// Validated input for exactly one driver.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StressRequest {
    Memory {
        target_percent: u32,
        duration_seconds: u64,
    },
    Disk {
        target_percent: u32,
        duration_seconds: u64,
        volumes: Vec<String>,
    },
    Cpu {
        duration_seconds: u64,
        core_count: usize,
    },
    Network {
        duration_seconds: u64,
        interface: String,
        peer_hostname: String,
    },
}

impl StressRequest {
    #[must_use]
    pub fn kind(&self) -> StressKind {
        match self {
            StressRequest::Memory { .. } => StressKind::Memory,
            StressRequest::Disk { .. } => StressKind::Disk,
            StressRequest::Cpu { .. } => StressKind::Cpu,
            StressRequest::Network { .. } => StressKind::Network,
        }
    }

    #[must_use]
    pub fn duration_seconds(&self) -> u64 {
        match self {
            StressRequest::Memory {
                duration_seconds, ..
            }
            | StressRequest::Disk {
                duration_seconds, ..
            }
            | StressRequest::Cpu {
                duration_seconds, ..
            }
            | StressRequest::Network {
                duration_seconds, ..
            } => *duration_seconds,
        }
    }

    #[must_use]
    pub fn target_percent(&self) -> Option<u32> {
        match self {
            StressRequest::Memory { target_percent, .. }
            | StressRequest::Disk { target_percent, .. } => Some(*target_percent),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "kind", rename_all = "snake_case")]
pub enum RunState {
    #[default]
    Idle,
    Validating,
    Running(StressKind),
    Releasing,
    Done,
    Failed,
}

impl RunState {
    #[must_use]
    pub fn can_transition_to(self, next: RunState) -> bool {
        matches!(
            (self, next),
            (RunState::Idle, RunState::Validating)
                | (
                    RunState::Validating,
                    RunState::Running(_) | RunState::Failed
                )
                | (RunState::Running(_), RunState::Releasing | RunState::Failed)
                | (RunState::Releasing, RunState::Done | RunState::Failed)
        )
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Done | RunState::Failed)
    }
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct RunStatus {
    pub state: RunState,
    pub kind: Option<StressKind>,
    pub total_duration_seconds: u64,
    pub remaining_seconds: u64,
    pub started_ts_seconds: i64,
    pub ends_ts_seconds: i64,
    pub held_bytes: u64,
    pub message: Option<String>,
}

impl RunStatus {
    #[must_use]
    pub fn remaining_seconds(&self, now_ts: i64) -> u64 {
        if self.ends_ts_seconds == 0 || now_ts >= self.ends_ts_seconds {
            0
        } else {
            u64::try_from(self.ends_ts_seconds - now_ts).unwrap_or(0)
        }
    }
}

/// Shared view of the single run in this process.
#[derive(Clone, Default)]
pub struct StatusBoard {
    pub state: Arc<Mutex<RunStatus>>,
}

impl StatusBoard {
    /// Moves to `next` if the state machine allows it.
    pub fn transition(&self, next: RunState) -> bool {
        let mut st = self.state.lock();
        if !st.state.can_transition_to(next) {
            tracing::warn!(from = ?st.state, to = ?next, "illegal run state transition");
            return false;
        }
        st.state = next;
        if let RunState::Running(kind) = next {
            st.kind = Some(kind);
        }
        true
    }

    pub fn begin_hold(&self, duration_seconds: u64, now_ts: i64) {
        let mut st = self.state.lock();
        st.total_duration_seconds = duration_seconds;
        st.started_ts_seconds = now_ts;
        st.ends_ts_seconds = now_ts.saturating_add(i64::try_from(duration_seconds).unwrap_or(i64::MAX));
    }

    pub fn set_held_bytes(&self, bytes: u64) {
        self.state.lock().held_bytes = bytes;
    }

    pub fn set_message(&self, message: impl Into<String>) {
        self.state.lock().message = Some(message.into());
    }

    #[must_use]
    pub fn current(&self) -> RunState {
        self.state.lock().state
    }

    #[must_use]
    pub fn snapshot(&self, now_ts: i64) -> RunStatus {
        let mut st = self.state.lock().clone();
        st.remaining_seconds = st.remaining_seconds(now_ts);
        st
    }
}

#[derive(Clone)]
pub struct AppState {
    pub board: StatusBoard,
    pub metrics: crate::metrics::Metrics,
}
