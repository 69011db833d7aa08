#![forbid(unsafe_code)]
#![deny(warnings)]
#![warn(clippy::pedantic)]

use serde::Serialize;

/// Additional bytes a resource must absorb to reach a target utilization.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "plan", rename_all = "snake_case")]
pub enum AllocationPlan {
    Consume { bytes: u64 },
    /// Current usage already meets or exceeds the target.
    TargetMet { desired_used: u64, used: u64 },
}

impl AllocationPlan {
    #[must_use]
    pub fn bytes_to_consume(&self) -> Option<u64> {
        match self {
            AllocationPlan::Consume { bytes } => Some(*bytes),
            AllocationPlan::TargetMet { .. } => None,
        }
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, AllocationPlan::Consume { .. })
    }
}

/// `floor(target_percent / 100 * total)`, exact.
#[must_use]
pub fn desired_used(total: u64, target_percent: u32) -> u64 {
    let desired = u128::from(total) * u128::from(target_percent) / 100;
    u64::try_from(desired).unwrap_or(u64::MAX)
}

#[must_use]
pub fn plan(total: u64, used: u64, target_percent: u32) -> AllocationPlan {
    let desired_used = desired_used(total, target_percent);
    if desired_used > used {
        AllocationPlan::Consume {
            bytes: desired_used - used,
        }
    } else {
        AllocationPlan::TargetMet { desired_used, used }
    }
}
