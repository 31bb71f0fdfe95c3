//! Raw telemetry sampling.
//!
//! Two samplers feed the history service: [`BatterySampler`] decodes the
//! smart-battery register map, and [`AppSampler`] turns per-pid cumulative
//! CPU counters into per-application CPU percentages using the classifier.
//! Both read the OS only through the collaborator traits in
//! [`crate::sources`].

mod battery;
mod cpu;


pub use battery::{BatteryInfo, BatterySampler};
pub use cpu::{CpuSampleCacheEntry, CpuSampler};

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::classify::{Classifier, Decision};
use crate::error::Result;
use crate::sources::{LiveAppRegistry, ProcessRegistry};

/// One application's aggregated CPU usage for a single sampling tick.
///
/// `pid` is the first pid observed for the application this tick; it exists
/// for the live force-quit path and carries no meaning in history.
#[derive(Debug, Clone, PartialEq)]
pub struct AppSample {
    pub name: String,
    pub pid: i32,
    pub cpu_percent: f64,
}

/// Samples all processes, classifies them, and aggregates CPU usage per
/// canonical application name.
///
/// Owns the per-pid delta cache between ticks; each tick's cache fully
/// replaces the last, so two `AppSampler`s (the slow history tick and the
/// fast live tick) can run on independent cadences without sharing state.
pub struct AppSampler {
    cpu: CpuSampler,
    processes: Arc<dyn ProcessRegistry>,
    apps: Arc<dyn LiveAppRegistry>,
    classifier: Classifier,
    cache: HashMap<i32, CpuSampleCacheEntry>,
}

impl AppSampler {
    pub fn new(processes: Arc<dyn ProcessRegistry>, apps: Arc<dyn LiveAppRegistry>, classifier: Classifier) -> Self {
        Self {
            cpu: CpuSampler::new(Arc::clone(&processes)),
            processes,
            apps,
            classifier,
            cache: HashMap::new(),
        }
    }

    /// Sample every process and return per-application CPU usage, sorted
    /// descending. The first tick after construction reports 0% everywhere,
    /// which is expected.
    pub fn sample(&mut self, now: DateTime<Utc>) -> Result<Vec<AppSample>> {
        let pids = self.processes.list_all_pids()?;
        let (cache, percents) = self.cpu.sample(&pids, now, &self.cache);
        self.cache = cache;

        let known_apps = self.apps.snapshot().into_values().collect();

        let mut by_app: HashMap<String, AppSample> = HashMap::new();
        for &pid in &pids {
            let Some(&cpu_percent) = percents.get(&pid) else {
                continue;
            };
            let raw_name = match self.processes.name_of(pid) {
                Ok(name) => name,
                Err(err) => {
                    debug!(pid, %err, "process vanished before naming");
                    continue;
                },
            };
            let Decision::Included(name) = self.classifier.classify(&raw_name, &known_apps) else {
                continue;
            };
            by_app
                .entry(name.clone())
                .and_modify(|sample| sample.cpu_percent += cpu_percent)
                .or_insert(AppSample { name, pid, cpu_percent });
        }

        let mut samples: Vec<AppSample> = by_app.into_values().collect();
        samples.sort_by(|a, b| b.cpu_percent.total_cmp(&a.cpu_percent));
        Ok(samples)
    }
}

impl std::fmt::Debug for AppSampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppSampler").field("cached_pids", &self.cache.len()).finish_non_exhaustive()
    }
}
