//! Rolling telemetry history.
//!
//! Three append-only time series (battery points, per-app CPU points, and
//! total-CPU points), retained for 48 hours, periodically flushed to a JSON
//! snapshot, and queried by the attribution engine. The store itself has no
//! interior locking: the history service serializes every mutation and query
//! on one consumer task, so readers always observe a consistent state.

mod persist;
pub mod service;
mod types;


pub use service::{HistoryService, LiveSnapshot, Sources};
pub use types::{AppCpuPoint, BatteryPoint, TotalCpuPoint};

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use crate::config::RETENTION_HOURS;

/// In-memory history for all three series.
#[derive(Debug, Clone, Default)]
pub struct HistoryStore {
    app_history: HashMap<String, Vec<AppCpuPoint>>,
    battery_history: Vec<BatteryPoint>,
    total_cpu_history: Vec<TotalCpuPoint>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one tick's worth of samples. Per-app points with
    /// non-positive CPU are dropped here so the invariant holds no matter
    /// who calls; the battery point is absent on battery-less hosts.
    pub fn append(
        &mut self,
        app_points: Vec<(String, AppCpuPoint)>,
        battery_point: Option<BatteryPoint>,
        total_point: TotalCpuPoint,
    ) {
        for (name, point) in app_points {
            if point.cpu_percent > 0.0 {
                self.app_history.entry(name).or_default().push(point);
            }
        }
        if let Some(point) = battery_point {
            self.battery_history.push(point);
        }
        self.total_cpu_history.push(total_point);
    }

    /// Drop everything older than the retention window. Per-app series that
    /// become empty are removed entirely. Idempotent.
    pub fn trim(&mut self, now: DateTime<Utc>) {
        let cutoff = now - Duration::hours(RETENTION_HOURS);
        self.battery_history.retain(|p| p.time > cutoff);
        self.total_cpu_history.retain(|p| p.time > cutoff);
        for points in self.app_history.values_mut() {
            points.retain(|p| p.time > cutoff);
        }
        self.app_history.retain(|_, points| !points.is_empty());
    }

    /// Battery points with `time > cutoff`, in time order.
    pub fn battery_since(&self, cutoff: DateTime<Utc>) -> &[BatteryPoint] {
        let start = self.battery_history.partition_point(|p| p.time <= cutoff);
        &self.battery_history[start..]
    }

    /// One app's CPU points with `time > cutoff`, in time order.
    pub fn app_points_since(&self, name: &str, cutoff: DateTime<Utc>) -> &[AppCpuPoint] {
        match self.app_history.get(name) {
            Some(points) => {
                let start = points.partition_point(|p| p.time <= cutoff);
                &points[start..]
            },
            None => &[],
        }
    }

    /// Total-CPU points with `time > cutoff`, in time order.
    pub fn totals_since(&self, cutoff: DateTime<Utc>) -> &[TotalCpuPoint] {
        let start = self.total_cpu_history.partition_point(|p| p.time <= cutoff);
        &self.total_cpu_history[start..]
    }

    /// Every canonical app name with at least one retained point.
    pub fn app_names(&self) -> impl Iterator<Item = &str> {
        self.app_history.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.app_history.is_empty() && self.battery_history.is_empty() && self.total_cpu_history.is_empty()
    }

    pub(crate) fn from_parts(
        app_history: HashMap<String, Vec<AppCpuPoint>>,
        battery_history: Vec<BatteryPoint>,
        total_cpu_history: Vec<TotalCpuPoint>,
    ) -> Self {
        Self { app_history, battery_history, total_cpu_history }
    }

    pub(crate) fn parts(&self) -> (&HashMap<String, Vec<AppCpuPoint>>, &[BatteryPoint], &[TotalCpuPoint]) {
        (&self.app_history, &self.battery_history, &self.total_cpu_history)
    }

    pub(crate) fn parts_mut(
        &mut self,
    ) -> (&mut HashMap<String, Vec<AppCpuPoint>>, &mut Vec<BatteryPoint>, &mut Vec<TotalCpuPoint>) {
        (&mut self.app_history, &mut self.battery_history, &mut self.total_cpu_history)
    }
}

pub use persist::{load, save};
