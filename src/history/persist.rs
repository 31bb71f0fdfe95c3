//! Snapshot persistence.
//!
//! One JSON document per installation. Saves are atomic: the snapshot is
//! written to a temporary file in the same directory and renamed over the
//! target, so an external reader never observes a torn write. Loads try the
//! current schema first, then the legacy flat-record schema, and otherwise
//! degrade to an empty store; a damaged history file is never fatal.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::types::{AppCpuPoint, BatteryPoint, TotalCpuPoint};
use super::HistoryStore;
use crate::error::{Error, Result};

/// Current on-disk schema.
#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    #[serde(rename = "appData")]
    app_data: HashMap<String, Vec<AppCpuPoint>>,
    #[serde(rename = "batteryHistory")]
    battery_history: Vec<BatteryPoint>,
    /// Absent in files written before total-CPU tracking existed.
    #[serde(rename = "totalCPUHistory", default, skip_serializing_if = "Option::is_none")]
    total_cpu_history: Option<Vec<TotalCpuPoint>>,
}

/// Legacy schema: one flat record per app per tick.
#[derive(Debug, Deserialize)]
struct LegacySnapshot {
    records: Vec<LegacyRecord>,
    #[serde(rename = "batteryHistory")]
    battery_history: Vec<BatteryPoint>,
}

#[derive(Debug, Deserialize)]
struct LegacyRecord {
    name: String,
    #[allow(dead_code)]
    pid: i64,
    timestamp: DateTime<Utc>,
    #[serde(rename = "cpuPercent")]
    cpu_percent: f64,
}

/// Serialize the store to `path`, atomically.
pub fn save(store: &HistoryStore, path: &Path) -> Result<()> {
    let (app_history, battery_history, total_cpu_history) = store.parts();
    let snapshot = Snapshot {
        app_data: app_history.clone(),
        battery_history: battery_history.to_vec(),
        total_cpu_history: Some(total_cpu_history.to_vec()),
    };

    let json = serde_json::to_vec(&snapshot).map_err(|e| Error::persistence(format!("encode history: {e}")))?;

    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)?;
        }
    }

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, &json)?;
    fs::rename(&tmp, path)?;
    debug!(path = %path.display(), bytes = json.len(), "history snapshot written");
    Ok(())
}

/// Load the store from `path`. Missing or undecodable files yield an empty
/// store; the error is logged, never propagated.
pub fn load(path: &Path) -> HistoryStore {
    let raw = match fs::read(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no history snapshot, starting empty");
            return HistoryStore::new();
        },
        Err(err) => {
            warn!(path = %path.display(), %err, "history snapshot unreadable, starting empty");
            return HistoryStore::new();
        },
    };

    if let Ok(snapshot) = serde_json::from_slice::<Snapshot>(&raw) {
        let mut store = HistoryStore::from_parts(
            snapshot.app_data,
            snapshot.battery_history,
            snapshot.total_cpu_history.unwrap_or_default(),
        );
        sort_series(&mut store);
        return store;
    }

    match serde_json::from_slice::<LegacySnapshot>(&raw) {
        Ok(legacy) => {
            debug!(path = %path.display(), records = legacy.records.len(), "migrating legacy history snapshot");
            let mut store = migrate_legacy(legacy);
            sort_series(&mut store);
            store
        },
        Err(err) => {
            warn!(path = %path.display(), %err, "history snapshot matches no known schema, starting empty");
            HistoryStore::new()
        },
    }
}

/// Rebuild the per-app index from the legacy flat record list. The original
/// pid is not representable in the per-app compact form and is not needed
/// for historical aggregation, so it is simply dropped.
fn migrate_legacy(legacy: LegacySnapshot) -> HistoryStore {
    let mut app_history: HashMap<String, Vec<AppCpuPoint>> = HashMap::new();
    for record in legacy.records {
        if record.cpu_percent > 0.0 {
            app_history
                .entry(record.name)
                .or_default()
                .push(AppCpuPoint::new(record.timestamp, record.cpu_percent));
        }
    }
    HistoryStore::from_parts(app_history, legacy.battery_history, Vec::new())
}

/// Windowed queries binary-search on time, so each loaded series must be
/// ordered even if the file was edited or merged by hand.
fn sort_series(store: &mut HistoryStore) {
    let (app_history, battery_history, total_cpu_history) = store.parts_mut();
    for points in app_history.values_mut() {
        points.sort_by_key(|p| p.time);
    }
    battery_history.sort_by_key(|p| p.time);
    total_cpu_history.sort_by_key(|p| p.time);
}
