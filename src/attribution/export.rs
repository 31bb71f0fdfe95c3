//! Report export.
//!
//! Renders a windowed attribution report as CSV or JSON. Both formats carry
//! the same data: the drain summary, the current battery status when one is
//! available, and the ranked application estimates.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde_json::json;

use super::{battery_drain, top_apps, AppDrainEstimate};
use crate::classify::Classifier;
use crate::history::HistoryStore;
use crate::sampler::BatteryInfo;

/// Apps per exported report.
const EXPORT_APP_LIMIT: usize = 50;

/// CSV report over the last `hours` hours.
pub fn export_csv(
    store: &HistoryStore,
    classifier: &Classifier,
    running: &HashSet<String>,
    battery: Option<&BatteryInfo>,
    now: DateTime<Utc>,
    hours: i64,
) -> String {
    let drain = battery_drain(store, now, hours);
    let apps = top_apps(store, classifier, running, now, hours, EXPORT_APP_LIMIT);

    let mut out = String::new();
    out.push_str(&format!("Battery Drain Report,{}\n", now.format("%Y-%m-%d %H:%M:%S")));
    out.push_str(&format!("Period,{hours}h\n"));
    out.push_str(&format!("Total Drain (mAh),{}\n", drain.mah));
    out.push_str(&format!("Total Drain (%),{}\n", drain.percent));
    if let Some(info) = battery {
        out.push_str(&format!("Current Charge (%),{}\n", info.percentage));
        out.push_str(&format!("Battery Health (%),{}\n", info.health_percentage()));
    }
    out.push('\n');
    out.push_str("Application,CPU Share (%),Est. Drain (mAh),Est. Drain (%),Status\n");
    for app in &apps {
        out.push_str(&format!(
            "\"{}\",{:.2},{:.1},{:.2},{}\n",
            app.name,
            app.cpu_share,
            app.mah_estimate,
            app.percent_estimate,
            status_label(app),
        ));
    }
    out
}

/// JSON report over the last `hours` hours.
pub fn export_json(
    store: &HistoryStore,
    classifier: &Classifier,
    running: &HashSet<String>,
    battery: Option<&BatteryInfo>,
    now: DateTime<Utc>,
    hours: i64,
) -> String {
    let drain = battery_drain(store, now, hours);
    let apps = top_apps(store, classifier, running, now, hours, EXPORT_APP_LIMIT);

    let mut report = json!({
        "reportTime": now.format("%Y-%m-%d %H:%M:%S").to_string(),
        "periodHours": hours,
        "summary": {
            "totalDrainMah": drain.mah,
            "totalDrainPercent": drain.percent,
        },
        "applications": apps
            .iter()
            .map(|app| {
                json!({
                    "name": app.name,
                    "cpuShare": app.cpu_share,
                    "mahEstimate": app.mah_estimate,
                    "percentEstimate": app.percent_estimate,
                    "isRunning": app.is_running,
                })
            })
            .collect::<Vec<_>>(),
    });

    if let Some(info) = battery {
        report["batteryStatus"] = json!({
            "currentCapacity": info.current_capacity,
            "maxCapacity": info.max_capacity,
            "percentage": info.percentage,
            "healthPercentage": info.health_percentage(),
            "cycleCount": info.cycle_count,
            "temperature": info.temperature,
            "isCharging": info.is_charging,
            "powerWatts": info.power_watts(),
        });
    }

    serde_json::to_string_pretty(&report).unwrap_or_else(|_| "{}".to_string())
}

fn status_label(app: &AppDrainEstimate) -> &'static str {
    if app.is_running {
        "running"
    } else {
        "exited"
    }
}
