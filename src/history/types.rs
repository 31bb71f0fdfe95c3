use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One battery reading. Immutable once appended; series order is time order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatteryPoint {
    pub time: DateTime<Utc>,
    /// Raw capacity in mAh-equivalent controller units.
    pub capacity: i64,
    /// Charge percentage 0-100.
    pub percentage: i64,
    #[serde(rename = "isCharging")]
    pub is_charging: bool,
}

/// One application CPU reading, stored per-app. Serialized in the compact
/// on-disk form `{"t": ..., "c": ..., "total": null}`; the `total` field is
/// a fossil of the file format and always null.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AppCpuPoint {
    #[serde(rename = "t")]
    pub time: DateTime<Utc>,
    #[serde(rename = "c")]
    pub cpu_percent: f64,
    #[serde(rename = "total", default)]
    total: Option<f64>,
}

impl AppCpuPoint {
    pub fn new(time: DateTime<Utc>, cpu_percent: f64) -> Self {
        Self { time, cpu_percent, total: None }
    }
}

/// Sum of all applications' CPU percent at one tick; the denominator for
/// contribution-share calculations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TotalCpuPoint {
    #[serde(rename = "t")]
    pub time: DateTime<Utc>,
    #[serde(rename = "v")]
    pub total_cpu_percent: f64,
}
