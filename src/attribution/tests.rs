use std::collections::HashSet;

use approx::assert_relative_eq;
use chrono::{DateTime, Duration, TimeZone, Utc};

use super::*;
use crate::classify::Classifier;
use crate::history::{AppCpuPoint, BatteryPoint, HistoryStore, TotalCpuPoint};
use crate::sampler::AppSample;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

fn battery(minute: i64, capacity: i64, percentage: i64, is_charging: bool) -> BatteryPoint {
    BatteryPoint { time: t0() + Duration::minutes(minute), capacity, percentage, is_charging }
}

/// Store with one battery series and no CPU data.
fn battery_store(points: &[BatteryPoint]) -> HistoryStore {
    let mut store = HistoryStore::new();
    for &point in points {
        store.append(Vec::new(), Some(point), TotalCpuPoint { time: point.time, total_cpu_percent: 0.0 });
    }
    store
}

fn app_point(store: &mut HistoryStore, name: &str, minute: i64, cpu: f64) {
    let time = t0() + Duration::minutes(minute);
    store.append(
        vec![(name.to_string(), AppCpuPoint::new(time, cpu))],
        None,
        TotalCpuPoint { time, total_cpu_percent: 0.0 },
    );
}

fn no_running() -> HashSet<String> {
    HashSet::new()
}

#[test]
fn drain_over_monotonic_series_equals_first_minus_last() {
    let store = battery_store(&[
        battery(0, 5000, 100, false),
        battery(1, 4900, 98, false),
        battery(2, 4700, 94, false),
        battery(3, 4500, 90, false),
    ]);
    let drain = battery_drain(&store, t0() + Duration::minutes(3), 24);
    assert_eq!(drain.mah, 500);
    assert_eq!(drain.percent, 10);
}

#[test]
fn charge_blip_resets_baseline_instead_of_netting_out() {
    // 100 -> 90 discharges 10, 90 -> 95 charges, 95 -> 80 discharges 15.
    // Net drop is 20 but true drain is 25.
    let store = battery_store(&[
        battery(0, 5000, 100, false),
        battery(1, 4500, 90, false),
        battery(2, 4750, 95, true),
        battery(3, 4000, 80, false),
    ]);
    let drain = battery_drain(&store, t0() + Duration::minutes(3), 24);
    assert_eq!(drain.percent, 25);
    assert_eq!(drain.mah, 1250);
}

#[test]
fn drain_of_single_point_is_zero() {
    let store = battery_store(&[battery(0, 5000, 100, false)]);
    assert_eq!(battery_drain(&store, t0(), 24), DrainSummary::default());
}

#[test]
fn cpu_shares_sum_to_one_hundred() {
    let mut store = HistoryStore::new();
    app_point(&mut store, "Safari", 0, 30.0);
    app_point(&mut store, "Xcode", 1, 50.0);
    app_point(&mut store, "Terminal", 2, 20.0);

    let apps = top_apps(&store, &Classifier::default(), &no_running(), t0() + Duration::minutes(3), 24, 10);
    assert_eq!(apps.len(), 3);
    let total: f64 = apps.iter().map(|a| a.cpu_share).sum();
    assert_relative_eq!(total, 100.0, epsilon = 1e-9);
    // Sorted by CPU share, descending.
    assert_eq!(apps[0].name, "Xcode");
    assert_relative_eq!(apps[0].cpu_share, 50.0, epsilon = 1e-9);
}

#[test]
fn top_apps_apportions_drain_by_share() {
    let mut store = battery_store(&[battery(0, 5000, 100, false), battery(10, 4000, 90, false)]);
    app_point(&mut store, "Safari", 1, 75.0);
    app_point(&mut store, "Xcode", 2, 25.0);

    let apps = top_apps(&store, &Classifier::default(), &no_running(), t0() + Duration::minutes(10), 24, 10);
    let safari = apps.iter().find(|a| a.name == "Safari").unwrap();
    assert_relative_eq!(safari.mah_estimate, 750.0, epsilon = 1e-6);
    assert_relative_eq!(safari.percent_estimate, 7.5, epsilon = 1e-6);
}

#[test]
fn top_apps_drops_names_excluded_under_current_rules() {
    let mut store = HistoryStore::new();
    app_point(&mut store, "Safari", 0, 10.0);
    // Persisted before the exclusion tables caught it.
    app_point(&mut store, "mdworker", 1, 90.0);

    let apps = top_apps(&store, &Classifier::default(), &no_running(), t0() + Duration::minutes(2), 24, 10);
    assert_eq!(apps.len(), 1);
    assert_eq!(apps[0].name, "Safari");
    assert_relative_eq!(apps[0].cpu_share, 100.0, epsilon = 1e-9);
}

#[test]
fn top_apps_marks_running_apps() {
    let mut store = HistoryStore::new();
    app_point(&mut store, "Safari", 0, 10.0);
    app_point(&mut store, "Xcode", 1, 10.0);

    let running: HashSet<String> = HashSet::from(["Safari".to_string()]);
    let apps = top_apps(&store, &Classifier::default(), &running, t0() + Duration::minutes(2), 24, 10);
    assert!(apps.iter().find(|a| a.name == "Safari").unwrap().is_running);
    assert!(!apps.iter().find(|a| a.name == "Xcode").unwrap().is_running);
}

#[test]
fn today_top_apps_filters_system_aggregate() {
    let mut store = HistoryStore::new();
    app_point(&mut store, "System", 0, 90.0);
    app_point(&mut store, "Safari", 1, 10.0);

    let apps = today_top_apps(&store, &Classifier::default(), &no_running(), t0() + Duration::minutes(2), 5);
    assert!(apps.iter().all(|a| a.name != "System"));
}

#[test]
fn discharge_window_stops_at_charging_point() {
    let store = battery_store(&[
        battery(0, 5000, 100, false),
        battery(1, 4900, 98, false),
        battery(2, 4950, 99, true),
        battery(3, 4800, 96, false),
        battery(4, 4600, 92, false),
    ]);
    // The walk stops at the charging point; the window starts at the first
    // discharging point after it.
    let window = last_discharge_window(&store, t0() + Duration::minutes(4), 1).unwrap();
    assert_eq!(window.start, t0() + Duration::minutes(3));
    assert_eq!(window.end, t0() + Duration::minutes(4));
    assert_eq!(window.drop_percent, 4);
    assert_eq!(window.drop_mah, 200);
}

#[test]
fn discharge_window_below_threshold_is_none() {
    let store = battery_store(&[battery(0, 5000, 100, false), battery(1, 4950, 99, false)]);
    assert!(last_discharge_window(&store, t0() + Duration::minutes(1), 3).is_none());
    assert!(last_discharge_window(&store, t0() + Duration::minutes(1), 1).is_some());
}

#[test]
fn discharge_window_of_empty_store_is_none() {
    assert!(last_discharge_window(&HistoryStore::new(), t0(), 1).is_none());
}

#[test]
fn series_ending_on_a_charging_point_has_no_window() {
    // Plugged in now: the earlier discharge stretch is not the *current*
    // window, however large its drop.
    let store = battery_store(&[
        battery(0, 5000, 100, false),
        battery(1, 4500, 90, false),
        battery(2, 4500, 90, true),
    ]);
    assert!(last_discharge_window(&store, t0() + Duration::minutes(2), 1).is_none());
}

#[test]
fn discharge_ranking_uses_window_drain() {
    let mut store = battery_store(&[
        battery(0, 5000, 100, true),
        battery(1, 5000, 100, false),
        battery(2, 4500, 90, false),
    ]);
    app_point(&mut store, "Safari", 1, 40.0);

    let ranked = last_discharge_ranking(
        &store,
        &Classifier::default(),
        &no_running(),
        t0() + Duration::minutes(2),
        3,
        5,
    )
    .unwrap();
    assert_eq!(ranked.len(), 1);
    assert_relative_eq!(ranked[0].percent_estimate, 10.0, epsilon = 1e-6);
    assert_relative_eq!(ranked[0].mah_estimate, 500.0, epsilon = 1e-6);
}

#[test]
fn contribution_matches_first_total_within_tolerance() {
    let mut store = HistoryStore::new();
    let time = t0();
    store.append(
        vec![("Safari".to_string(), AppCpuPoint::new(time, 20.0))],
        None,
        TotalCpuPoint { time: time - Duration::seconds(3), total_cpu_percent: 80.0 },
    );
    // A closer total exists but the earlier in-tolerance one wins.
    store.append(Vec::new(), None, TotalCpuPoint { time, total_cpu_percent: 40.0 });

    let points = app_energy_contribution_history(&store, "Safari", time + Duration::minutes(1), 24);
    assert_eq!(points.len(), 1);
    assert_relative_eq!(points[0].contribution_percent, 25.0, epsilon = 1e-9);
}

#[test]
fn contribution_without_total_match_is_zero() {
    let mut store = HistoryStore::new();
    let time = t0();
    store.append(
        vec![("Safari".to_string(), AppCpuPoint::new(time, 20.0))],
        None,
        TotalCpuPoint { time: time + Duration::seconds(30), total_cpu_percent: 80.0 },
    );

    let points = app_energy_contribution_history(&store, "Safari", time + Duration::minutes(1), 24);
    assert_eq!(points.len(), 1);
    assert_eq!(points[0].contribution_percent, 0.0);
}

#[test]
fn contribution_is_capped_at_one_hundred() {
    let mut store = HistoryStore::new();
    let time = t0();
    store.append(
        vec![("Safari".to_string(), AppCpuPoint::new(time, 90.0))],
        None,
        TotalCpuPoint { time, total_cpu_percent: 45.0 },
    );

    let points = app_energy_contribution_history(&store, "Safari", time + Duration::minutes(1), 24);
    assert_eq!(points[0].contribution_percent, 100.0);
}

#[test]
fn max_cpu_floors_at_one() {
    assert_eq!(max_cpu(&[]), 1.0);
    let quiet = vec![AppSample { name: "Safari".to_string(), pid: 1, cpu_percent: 0.3 }];
    assert_eq!(max_cpu(&quiet), 1.0);
    let busy = vec![
        AppSample { name: "Safari".to_string(), pid: 1, cpu_percent: 12.0 },
        AppSample { name: "Xcode".to_string(), pid: 2, cpu_percent: 48.0 },
    ];
    assert_eq!(max_cpu(&busy), 48.0);
}

#[test]
fn csv_export_lists_summary_then_apps() {
    let mut store = battery_store(&[battery(0, 5000, 100, false), battery(5, 4800, 96, false)]);
    app_point(&mut store, "Safari", 1, 50.0);

    let csv = export::export_csv(
        &store,
        &Classifier::default(),
        &no_running(),
        None,
        t0() + Duration::minutes(5),
        24,
    );
    assert!(csv.starts_with("Battery Drain Report,"));
    assert!(csv.contains("Total Drain (mAh),200\n"));
    assert!(csv.contains("Total Drain (%),4\n"));
    assert!(csv.contains("\"Safari\",100.00,200.0,4.00,exited\n"));
}

#[test]
fn json_export_round_trips_through_serde() {
    let mut store = battery_store(&[battery(0, 5000, 100, false), battery(5, 4800, 96, false)]);
    app_point(&mut store, "Safari", 1, 50.0);

    let json = export::export_json(
        &store,
        &Classifier::default(),
        &no_running(),
        None,
        t0() + Duration::minutes(5),
        24,
    );
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["summary"]["totalDrainMah"], 200);
    assert_eq!(value["periodHours"], 24);
    assert_eq!(value["reportTime"], "2025-06-01 12:05:00");
    let app = &value["applications"][0];
    assert_eq!(app["name"], "Safari");
    assert_eq!(app["cpuShare"], 100.0);
    assert_eq!(app["mahEstimate"], 200.0);
    assert_eq!(app["percentEstimate"], 4.0);
    assert_eq!(app["isRunning"], false);
    assert!(value.get("batteryStatus").is_none());
}
