//! Drainwatch - battery drain attribution for macOS
//!
//! This crate samples battery telemetry and per-process CPU usage, maps raw
//! process names to user-recognisable applications, and apportions observed
//! battery drain across those applications proportionally to their CPU
//! activity. History is retained for 48 hours in memory and persisted to a
//! JSON snapshot between runs.
//!
//! # Features
//!
//! - **Battery Sampling**: smart-battery register decoding with charge,
//!   health, temperature, and power draw
//! - **CPU Attribution**: per-process cumulative CPU counters turned into
//!   per-application percentages
//! - **Classification**: daemon and helper-process noise collapsed into
//!   canonical application identities
//! - **History**: 48-hour rolling series with atomic JSON persistence and
//!   legacy-format migration
//! - **Reports**: windowed drain rankings, per-app contribution series, and
//!   CSV/JSON export
//!
//! The crate never talks to the OS directly; the embedding binary provides
//! implementations of the traits in [`sources`], which keeps the whole
//! engine testable off-host.
//!
//! # Examples
//!
//! ```no_run
//! # async fn run(sources: drainwatch::history::Sources) -> drainwatch::Result<()> {
//! use drainwatch::prelude::*;
//!
//! let service = HistoryService::spawn(Config::default(), sources);
//! service.update().await?;
//!
//! let drain = service.battery_drain(24).await?;
//! println!("Drained {} mAh ({}%) over the last 24h", drain.mah, drain.percent);
//!
//! for app in service.top_apps(24, 5).await? {
//!     println!("{}: {:.1}% of CPU activity", app.name, app.cpu_share);
//! }
//!
//! service.shutdown().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! Fallible operations return [`Result`]. Sampling degrades rather than
//! fails: a missing battery yields `None`, an unreadable process is skipped,
//! and a damaged history file loads as empty.

pub mod attribution;
pub mod classify;
pub mod config;
pub mod error;
pub mod history;
pub mod sampler;
pub mod sources;

pub use config::Config;
pub use error::{Error, Result};

/// Re-export common types for convenience
pub mod prelude {
    pub use crate::attribution::{AppDrainEstimate, ContributionPoint, DischargeWindow, DrainSummary};
    pub use crate::classify::{Classifier, Decision};
    pub use crate::config::Config;
    pub use crate::history::{HistoryService, LiveSnapshot, Sources};
    pub use crate::sampler::{AppSample, BatteryInfo};
    pub use crate::{Error, Result};
}
