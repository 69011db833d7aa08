#![forbid(unsafe_code)]
#![deny(warnings)]
#![warn(clippy::pedantic)]

pub mod cli;
pub mod context;
pub mod domain;
pub mod error;
pub mod http;
pub mod inventory;
pub mod lib_cpu;
pub mod lib_disk;
pub mod lib_mem;
pub mod lib_net;
pub mod metrics;
pub mod planner;
pub mod service;
pub mod signals;
pub mod units;
pub mod validation;

pub use cli::{Cli, StressArgs};
pub use context::{shutdown_channel, RunContext, Shutdown, ShutdownTrigger};
pub use domain::{AppState, RunState, RunStatus, StatusBoard, StressKind, StressRequest};
pub use error::StressError;
pub use http::{healthz, scrape_metrics, spawn_status_server, status};
pub use inventory::{Inventory, MemorySnapshot, StaticInventory, SysInventory, VolumeSnapshot};
pub use metrics::Metrics;
pub use planner::{plan, AllocationPlan};
pub use service::{RunReport, RunnerSettings, StressRunner};
pub use validation::validate_args;
