//! Drain attribution.
//!
//! Queries over the history store that apportion observed battery drain
//! across applications proportionally to their CPU share within a window.
//! These are pure functions; the history service runs them on its consumer
//! task so every query sees a consistent snapshot.
//!
//! Drain is the sum of the *decreasing* deltas between consecutive battery
//! points, not first-minus-last: a charge blip inside the window resets the
//! baseline, so each discharge stretch counts and charging stretches
//! contribute zero.

pub mod export;

#[cfg(test)]
mod tests;

use std::collections::HashSet;

use chrono::{DateTime, Duration, Local, TimeZone, Utc};

use crate::classify::Classifier;
use crate::history::{AppCpuPoint, BatteryPoint, HistoryStore};
use crate::sampler::AppSample;

/// Tolerance when aligning an app CPU point with the total-CPU series.
const TOTAL_CPU_MATCH_TOLERANCE_SECS: i64 = 5;

/// Cumulative battery drain over a window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainSummary {
    pub mah: i64,
    pub percent: i64,
}

/// One application's share of the drain in a window.
#[derive(Debug, Clone, PartialEq)]
pub struct AppDrainEstimate {
    pub name: String,
    /// This app's share of all sampled CPU activity, 0-100.
    pub cpu_share: f64,
    pub mah_estimate: f64,
    pub percent_estimate: f64,
    pub is_running: bool,
}

/// The most recent unbroken run of non-charging, non-increasing battery
/// samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DischargeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub drop_percent: i64,
    pub drop_mah: i64,
}

/// One point of an app's contribution-percent series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContributionPoint {
    pub time: DateTime<Utc>,
    /// 0-100; capped at 100.
    pub contribution_percent: f64,
}

/// Battery drain over the last `hours` hours.
pub fn battery_drain(store: &HistoryStore, now: DateTime<Utc>, hours: i64) -> DrainSummary {
    drain_over(store.battery_since(now - Duration::hours(hours)))
}

/// Sum of the decreasing inter-sample deltas across `points`.
fn drain_over(points: &[BatteryPoint]) -> DrainSummary {
    let mut summary = DrainSummary::default();
    for pair in points.windows(2) {
        summary.mah += (pair[0].capacity - pair[1].capacity).max(0);
        summary.percent += (pair[0].percentage - pair[1].percentage).max(0);
    }
    summary
}

/// Top applications by CPU share over the last `hours` hours, with drain
/// apportioned by share.
pub fn top_apps(
    store: &HistoryStore,
    classifier: &Classifier,
    running: &HashSet<String>,
    now: DateTime<Utc>,
    hours: i64,
    limit: usize,
) -> Vec<AppDrainEstimate> {
    let from = now - Duration::hours(hours);
    let drain = drain_over(store.battery_since(from));
    let mut ranked = rank_apps(store, classifier, running, from, now, drain);
    ranked.sort_by(|a, b| b.cpu_share.total_cmp(&a.cpu_share));
    ranked.truncate(limit);
    ranked
}

/// Today's ranking: the same apportionment restricted to
/// `[start of local day, now]` and ordered by estimated percent drain.
pub fn today_top_apps(
    store: &HistoryStore,
    classifier: &Classifier,
    running: &HashSet<String>,
    now: DateTime<Utc>,
    count: usize,
) -> Vec<AppDrainEstimate> {
    let from = start_of_local_day(now);
    let drain = drain_over(store.battery_since(from));
    let mut ranked = rank_apps(store, classifier, running, from, now, drain);
    // Historical classification gap: a literal "System" aggregate can occur
    // in old data and is filtered here rather than in the classifier, which
    // would also hide it from the windowed rankings.
    ranked.retain(|app| app.name != "System");
    ranked.sort_by(|a, b| b.percent_estimate.total_cmp(&a.percent_estimate));
    ranked.truncate(count);
    ranked
}

/// Walk the battery series backward from the most recent point and return
/// the latest discharge window, if it dropped at least `min_drop_percent`.
pub fn last_discharge_window(
    store: &HistoryStore,
    now: DateTime<Utc>,
    min_drop_percent: i64,
) -> Option<DischargeWindow> {
    let points = store.battery_since(now - Duration::hours(crate::config::RETENTION_HOURS));
    let last = points.last()?;
    // A window is a run of non-charging samples; if the battery is charging
    // right now there is no current discharge to attribute.
    if last.is_charging {
        return None;
    }

    let mut start = *last;
    let mut drop_percent = 0;
    let mut drop_mah = 0;
    for pair in points.windows(2).rev() {
        let (earlier, later) = (pair[0], pair[1]);
        if earlier.is_charging || later.is_charging || later.percentage > earlier.percentage {
            break;
        }
        drop_percent += earlier.percentage - later.percentage;
        drop_mah += (earlier.capacity - later.capacity).max(0);
        start = earlier;
    }

    if drop_percent >= min_drop_percent {
        Some(DischargeWindow { start: start.time, end: last.time, drop_percent, drop_mah })
    } else {
        None
    }
}

/// Ranking scoped to the latest discharge window; `None` when no qualifying
/// window exists (callers fall back to the today ranking).
pub fn last_discharge_ranking(
    store: &HistoryStore,
    classifier: &Classifier,
    running: &HashSet<String>,
    now: DateTime<Utc>,
    min_drop_percent: i64,
    count: usize,
) -> Option<Vec<AppDrainEstimate>> {
    let window = last_discharge_window(store, now, min_drop_percent)?;
    let drain = DrainSummary { mah: window.drop_mah, percent: window.drop_percent };
    // The window starts *at* its first point; widen the exclusive cutoff a
    // hair so that point's CPU samples are included.
    let from = window.start - Duration::seconds(1);
    let mut ranked = rank_apps(store, classifier, running, from, window.end, drain);
    ranked.sort_by(|a, b| b.cpu_share.total_cmp(&a.cpu_share));
    ranked.truncate(count);
    Some(ranked)
}

/// Raw CPU-percent series for one app over the last `hours` hours.
pub fn app_cpu_history(store: &HistoryStore, name: &str, now: DateTime<Utc>, hours: i64) -> Vec<AppCpuPoint> {
    store.app_points_since(name, now - Duration::hours(hours)).to_vec()
}

/// Per-point share of total CPU for one app over the last `hours` hours.
///
/// Each app point is matched against the first total-CPU point within ±5
/// seconds; with no match (or a zero total) the contribution is 0.
pub fn app_energy_contribution_history(
    store: &HistoryStore,
    name: &str,
    now: DateTime<Utc>,
    hours: i64,
) -> Vec<ContributionPoint> {
    let cutoff = now - Duration::hours(hours);
    let totals = store.totals_since(cutoff);

    store
        .app_points_since(name, cutoff)
        .iter()
        .map(|point| {
            let total_cpu = totals
                .iter()
                .find(|t| (t.time - point.time).num_seconds().abs() < TOTAL_CPU_MATCH_TOLERANCE_SECS)
                .map(|t| t.total_cpu_percent)
                .unwrap_or(0.0);
            let contribution_percent =
                if total_cpu > 0.0 { (point.cpu_percent / total_cpu * 100.0).min(100.0) } else { 0.0 };
            ContributionPoint { time: point.time, contribution_percent }
        })
        .collect()
}

/// Largest single-app CPU percent among the live samples, floored at 1 so
/// chart scaling never divides by zero.
pub fn max_cpu(live_apps: &[AppSample]) -> f64 {
    live_apps.iter().map(|app| app.cpu_percent).fold(1.0, f64::max)
}

/// Shared apportionment: per-app CPU sums over `(from, to]`, CPU share
/// against the all-app total, and drain estimates scaled by share.
fn rank_apps(
    store: &HistoryStore,
    classifier: &Classifier,
    running: &HashSet<String>,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    drain: DrainSummary,
) -> Vec<AppDrainEstimate> {
    let mut sums: Vec<(String, f64)> = Vec::new();
    let mut total_cpu = 0.0;

    for name in store.app_names() {
        // Tables evolve; re-check historical names against today's rules.
        if classifier.is_excluded_name(name) {
            continue;
        }
        let sum: f64 = store
            .app_points_since(name, from)
            .iter()
            .take_while(|p| p.time <= to)
            .map(|p| p.cpu_percent)
            .sum();
        if sum > 0.0 {
            total_cpu += sum;
            sums.push((name.to_string(), sum));
        }
    }

    sums.into_iter()
        .map(|(name, sum)| {
            let cpu_share = if total_cpu > 0.0 { sum / total_cpu * 100.0 } else { 0.0 };
            let is_running = running.contains(&name);
            AppDrainEstimate {
                name,
                cpu_share,
                mah_estimate: drain.mah as f64 * cpu_share / 100.0,
                percent_estimate: drain.percent as f64 * cpu_share / 100.0,
                is_running,
            }
        })
        .collect()
}

/// Midnight of the current local day, in UTC. Falls back to `now` on a
/// nonexistent local midnight (DST edge).
fn start_of_local_day(now: DateTime<Utc>) -> DateTime<Utc> {
    let local = now.with_timezone(&Local);
    let Some(midnight) = local.date_naive().and_hms_opt(0, 0, 0) else {
        return now;
    };
    match Local.from_local_datetime(&midnight).earliest() {
        Some(start) => start.with_timezone(&Utc),
        None => now,
    }
}
