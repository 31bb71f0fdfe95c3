use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::sources::ProcessRegistry;

/// Minimum wall-clock gap between two reads of the same pid before a delta
/// is meaningful.
const MIN_SAMPLE_INTERVAL_MS: i64 = 100;

/// One cached counter read, keyed by pid in the sampler's cache.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CpuSampleCacheEntry {
    pub pid: i32,
    pub timestamp: DateTime<Utc>,
    pub cumulative_cpu_time_nanos: u64,
}

/// Converts successive reads of cumulative per-process CPU time into
/// CPU-percent-over-interval figures.
///
/// The sampler itself is stateless; the caller owns the cache and passes the
/// previous tick's map in. The returned cache fully replaces it, so pids
/// that disappeared simply drop out; no eviction pass is needed.
#[derive(Clone)]
pub struct CpuSampler {
    registry: Arc<dyn ProcessRegistry>,
}

impl CpuSampler {
    pub fn new(registry: Arc<dyn ProcessRegistry>) -> Self {
        Self { registry }
    }

    /// Sample the given pids at `now` against `previous`.
    ///
    /// Returns the replacement cache and per-pid CPU percent. A pid with no
    /// prior entry, or one re-read within 100 ms, reports 0 for this tick;
    /// the first tick after startup therefore reports 0 for everything. A
    /// counter that went backwards (pid reuse) is clamped to a zero delta.
    pub fn sample(
        &self,
        pids: &[i32],
        now: DateTime<Utc>,
        previous: &HashMap<i32, CpuSampleCacheEntry>,
    ) -> (HashMap<i32, CpuSampleCacheEntry>, HashMap<i32, f64>) {
        let mut cache = HashMap::with_capacity(pids.len());
        let mut percents = HashMap::with_capacity(pids.len());

        for &pid in pids {
            let nanos = match self.registry.cpu_time_of(pid) {
                Ok(nanos) => nanos,
                Err(err) => {
                    // Processes exit between listing and reading; not an error.
                    debug!(pid, %err, "skipping unreadable process");
                    continue;
                },
            };

            let percent = previous
                .get(&pid)
                .and_then(|prev| {
                    let elapsed_ms = (now - prev.timestamp).num_milliseconds();
                    if elapsed_ms < MIN_SAMPLE_INTERVAL_MS {
                        return None;
                    }
                    let delta = nanos.saturating_sub(prev.cumulative_cpu_time_nanos);
                    let elapsed_secs = elapsed_ms as f64 / 1_000.0;
                    Some(delta as f64 / elapsed_secs / 1e9 * 100.0)
                })
                .unwrap_or(0.0);

            cache.insert(pid, CpuSampleCacheEntry { pid, timestamp: now, cumulative_cpu_time_nanos: nanos });
            percents.insert(pid, percent);
        }

        (cache, percents)
    }
}

impl std::fmt::Debug for CpuSampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpuSampler").finish_non_exhaustive()
    }
}
