use std::sync::Arc;

use tracing::debug;

use crate::error::Result;
use crate::sources::{BatteryRegisters, BatterySnapshotSource, PowerSourceSnapshot, SystemPowerSourceInfo};

/// Smart-battery register keys. Capacities are raw controller units
/// (mAh-equivalent); temperature is deci-Kelvin; amperage and voltage are
/// native micro-units.
const KEY_CURRENT_CAPACITY: &str = "AppleRawCurrentCapacity";
const KEY_MAX_CAPACITY: &str = "AppleRawMaxCapacity";
const KEY_NOMINAL_CAPACITY: &str = "NominalChargeCapacity";
const KEY_DESIGN_CAPACITY: &str = "DesignCapacity";
const KEY_CYCLE_COUNT: &str = "CycleCount";
const KEY_TEMPERATURE: &str = "Temperature";
const KEY_AMPERAGE: &str = "Amperage";
const KEY_VOLTAGE: &str = "Voltage";
const KEY_SYSTEM_HEALTH: &str = "MaximumCapacityPercent";

/// A decoded snapshot of the battery's state.
#[derive(Debug, Clone, PartialEq)]
pub struct BatteryInfo {
    pub current_capacity: i64,
    pub max_capacity: i64,
    pub design_capacity: i64,
    /// Charge percentage 0-100, preferring the system-optimized value.
    pub percentage: i64,
    pub is_charging: bool,
    pub is_plugged_in: bool,
    pub cycle_count: i64,
    /// Degrees Celsius.
    pub temperature: f64,
    pub amperage: i64,
    pub voltage: i64,
    /// Minutes until empty, -1 when unknown.
    pub time_to_empty: i64,
    /// Minutes until full, -1 when unknown.
    pub time_to_full: i64,
    /// Health percentage as reported by the system, when available.
    pub system_health_percent: Option<i64>,
}

impl BatteryInfo {
    /// Battery health as a percentage of design capacity. Prefers the
    /// system-reported value so the figure matches system settings.
    pub fn health_percentage(&self) -> i64 {
        if let Some(health) = self.system_health_percent {
            return health.clamp(0, 100);
        }
        if self.design_capacity <= 0 {
            return 0;
        }
        let computed = (self.max_capacity as f64 / self.design_capacity as f64 * 100.0).round() as i64;
        computed.clamp(0, 100)
    }

    /// Instantaneous power draw in watts.
    pub fn power_watts(&self) -> f64 {
        (self.amperage.abs() as f64) * (self.voltage as f64) / 1_000_000.0
    }
}

/// Reads battery registers and power-source state and decodes them into a
/// [`BatteryInfo`].
#[derive(Clone)]
pub struct BatterySampler {
    registers: Arc<dyn BatterySnapshotSource>,
    power_source: Arc<dyn SystemPowerSourceInfo>,
}

impl BatterySampler {
    pub fn new(registers: Arc<dyn BatterySnapshotSource>, power_source: Arc<dyn SystemPowerSourceInfo>) -> Self {
        Self { registers, power_source }
    }

    /// Returns `Ok(None)` when the host reports no battery. Callers treat
    /// that as an unknown state, never as a failure.
    pub fn sample(&self) -> Result<Option<BatteryInfo>> {
        let registers = self.registers.read()?;
        if registers.is_empty() {
            return Ok(None);
        }

        let power = match self.power_source.read() {
            Ok(power) => power,
            Err(err) => {
                debug!(%err, "power source info unavailable, using raw registers only");
                PowerSourceSnapshot { time_to_empty: -1, time_to_full: -1, ..Default::default() }
            },
        };

        Ok(Some(decode(&registers, &power)))
    }
}

fn decode(registers: &BatteryRegisters, power: &PowerSourceSnapshot) -> BatteryInfo {
    let reg = |key: &str| registers.get(key).copied().unwrap_or(0);

    let current_capacity = reg(KEY_CURRENT_CAPACITY);
    let max_capacity = match registers.get(KEY_MAX_CAPACITY) {
        Some(&v) => v,
        None => reg(KEY_NOMINAL_CAPACITY),
    };
    let raw_temperature = reg(KEY_TEMPERATURE);

    let percentage = power.system_percentage.unwrap_or_else(|| {
        if max_capacity > 0 {
            (current_capacity as f64 / max_capacity as f64 * 100.0).round() as i64
        } else {
            0
        }
    });

    BatteryInfo {
        current_capacity,
        max_capacity,
        design_capacity: reg(KEY_DESIGN_CAPACITY),
        percentage,
        is_charging: power.is_charging,
        is_plugged_in: power.is_plugged_in,
        cycle_count: reg(KEY_CYCLE_COUNT),
        temperature: raw_temperature as f64 / 10.0 - 273.15,
        amperage: reg(KEY_AMPERAGE),
        voltage: reg(KEY_VOLTAGE),
        time_to_empty: power.time_to_empty,
        time_to_full: power.time_to_full,
        system_health_percent: registers.get(KEY_SYSTEM_HEALTH).copied(),
    }
}

impl std::fmt::Debug for BatterySampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatterySampler").finish_non_exhaustive()
    }
}
