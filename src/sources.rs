//! Collaborator interfaces for raw OS data.
//!
//! The core never talks to IOKit, `proc_pid_rusage`, or the workspace
//! directly; it reads battery registers, power-source state, per-process CPU
//! counters, and the set of known interactive applications through these
//! traits. Production implementations live in the embedding binary; tests
//! use the generated mocks.

use std::collections::HashMap;

use crate::error::Result;

#[cfg(test)]
use mockall::automock;

/// Raw register map reported by the smart-battery controller.
///
/// Keys follow the hardware's own naming (`AppleRawCurrentCapacity`,
/// `DesignCapacity`, `CycleCount`, ...). An empty map means no battery is
/// present.
pub type BatteryRegisters = HashMap<String, i64>;

/// Power-source state as reported by the system, alongside the raw
/// registers. Percentage here is the system-optimized value shown in the
/// status bar, which can differ slightly from the raw capacity ratio.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PowerSourceSnapshot {
    pub is_charging: bool,
    pub is_plugged_in: bool,
    /// Minutes until empty, -1 when unknown.
    pub time_to_empty: i64,
    /// Minutes until full, -1 when unknown.
    pub time_to_full: i64,
    pub system_percentage: Option<i64>,
}

/// Reads the smart-battery register map.
#[cfg_attr(test, automock)]
pub trait BatterySnapshotSource: Send + Sync {
    fn read(&self) -> Result<BatteryRegisters>;
}

/// Reads the system power-source description.
#[cfg_attr(test, automock)]
pub trait SystemPowerSourceInfo: Send + Sync {
    fn read(&self) -> Result<PowerSourceSnapshot>;
}

/// Enumerates processes and reads their cumulative CPU time.
#[cfg_attr(test, automock)]
pub trait ProcessRegistry: Send + Sync {
    fn list_all_pids(&self) -> Result<Vec<i32>>;
    fn name_of(&self, pid: i32) -> Result<String>;
    /// Cumulative user+system CPU time in nanoseconds since process start.
    fn cpu_time_of(&self, pid: i32) -> Result<u64>;
}

/// Currently-known interactive applications, pid → display name.
#[cfg_attr(test, automock)]
pub trait LiveAppRegistry: Send + Sync {
    fn snapshot(&self) -> HashMap<i32, String>;
}
