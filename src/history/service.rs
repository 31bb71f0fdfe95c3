//! The history service actor.
//!
//! One consumer task owns the [`HistoryStore`] and all attribution queries;
//! callers talk to it through a bounded command channel and receive answers
//! on oneshot channels, so every query observes a consistent store and no
//! lock is ever held across an await. Two ticker tasks drive the slow update
//! and the periodic save, and a third task refreshes the live CPU snapshot
//! every second, writing only to a shared `RwLock` the consumer never takes.
//!
//! # Example
//!
//! ```no_run
//! # async fn run(sources: drainwatch::history::Sources) -> drainwatch::Result<()> {
//! use drainwatch::config::Config;
//! use drainwatch::history::HistoryService;
//!
//! let service = HistoryService::spawn(Config::default(), sources);
//! service.update().await?;
//! let drain = service.battery_drain(24).await?;
//! println!("drained {} mAh over 24h", drain.mah);
//! service.shutdown().await?;
//! # Ok(())
//! # }
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::persist;
use super::types::{AppCpuPoint, BatteryPoint, TotalCpuPoint};
use super::HistoryStore;
use crate::attribution::{
    self, AppDrainEstimate, ContributionPoint, DrainSummary,
};
use crate::classify::Classifier;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::sampler::{AppSample, AppSampler, BatteryInfo, BatterySampler};
use crate::sources::{BatterySnapshotSource, LiveAppRegistry, ProcessRegistry, SystemPowerSourceInfo};

/// Command channel depth. Ticker sends use `try_send`, so a slow consumer
/// drops ticks instead of queueing a backlog of stale updates.
const COMMAND_BUFFER: usize = 32;

/// The OS collaborators the service samples from.
#[derive(Clone)]
pub struct Sources {
    pub battery: Arc<dyn BatterySnapshotSource>,
    pub power: Arc<dyn SystemPowerSourceInfo>,
    pub processes: Arc<dyn ProcessRegistry>,
    pub apps: Arc<dyn LiveAppRegistry>,
}

/// The most recent fast-tick CPU sample, for live display.
#[derive(Debug, Clone, Default)]
pub struct LiveSnapshot {
    /// Sorted by CPU percent, descending.
    pub apps: Vec<AppSample>,
    pub taken_at: Option<DateTime<Utc>>,
}

enum Command {
    Update { reply: Option<oneshot::Sender<()>> },
    Save { reply: Option<oneshot::Sender<Result<()>>> },
    BatteryInfo { reply: oneshot::Sender<Option<BatteryInfo>> },
    BatteryDrain { hours: i64, reply: oneshot::Sender<DrainSummary> },
    BatteryChart { hours: i64, reply: oneshot::Sender<Vec<BatteryPoint>> },
    TopApps { hours: i64, limit: usize, reply: oneshot::Sender<Vec<AppDrainEstimate>> },
    TodayTopApps { count: usize, reply: oneshot::Sender<Vec<AppDrainEstimate>> },
    LastDischargeRanking {
        min_drop_percent: i64,
        count: usize,
        reply: oneshot::Sender<Option<Vec<AppDrainEstimate>>>,
    },
    AppCpuHistory { name: String, hours: i64, reply: oneshot::Sender<Vec<AppCpuPoint>> },
    ContributionHistory { name: String, hours: i64, reply: oneshot::Sender<Vec<ContributionPoint>> },
    ExportCsv { hours: i64, reply: oneshot::Sender<String> },
    ExportJson { hours: i64, reply: oneshot::Sender<String> },
    Shutdown { reply: oneshot::Sender<()> },
}

/// Handle to a running history service.
///
/// Cheap to clone is not a goal; the embedding binary holds one instance and
/// shares it behind whatever it likes. Dropping the handle without calling
/// [`HistoryService::shutdown`] aborts the background tasks without a final
/// save.
pub struct HistoryService {
    tx: mpsc::Sender<Command>,
    live: Arc<RwLock<LiveSnapshot>>,
    config: Config,
    worker: Mutex<Option<JoinHandle<()>>>,
    tickers: Mutex<Vec<JoinHandle<()>>>,
}

impl HistoryService {
    /// Load any persisted history and start the consumer and ticker tasks.
    pub fn spawn(config: Config, sources: Sources) -> Self {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        let live = Arc::new(RwLock::new(LiveSnapshot::default()));
        let classifier = Classifier::new(config.own_process_name.clone());

        let worker = Worker {
            store: persist::load(&config.history_path),
            battery: BatterySampler::new(Arc::clone(&sources.battery), Arc::clone(&sources.power)),
            apps: AppSampler::new(
                Arc::clone(&sources.processes),
                Arc::clone(&sources.apps),
                classifier.clone(),
            ),
            classifier,
            last_battery: None,
            live: Arc::clone(&live),
            config: config.clone(),
        };
        let worker_handle = tokio::spawn(worker.run(rx));

        let mut tickers = Vec::with_capacity(3);
        tickers.push(spawn_ticker(tx.clone(), config.update_interval, || Command::Update { reply: None }));
        tickers.push(spawn_ticker(tx.clone(), config.save_interval, || Command::Save { reply: None }));
        tickers.push(spawn_live_tick(
            Arc::clone(&live),
            &config,
            Arc::clone(&sources.processes),
            Arc::clone(&sources.apps),
        ));

        info!(
            history_path = %config.history_path.display(),
            update_secs = config.update_interval.as_secs(),
            "history service started"
        );

        Self { tx, live, config, worker: Mutex::new(Some(worker_handle)), tickers: Mutex::new(tickers) }
    }

    /// Run a full update tick now and wait for it to land in the store.
    pub async fn update(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Update { reply: Some(reply) }).await?;
        rx.await.map_err(|_| unavailable())
    }

    /// Flush the store to disk and wait for the write to finish.
    pub async fn save(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Save { reply: Some(reply) }).await?;
        rx.await.map_err(|_| unavailable())?
    }

    /// Battery state from the most recent update tick; `None` before the
    /// first tick or on battery-less hosts.
    pub async fn battery_info(&self) -> Result<Option<BatteryInfo>> {
        self.query(|reply| Command::BatteryInfo { reply }).await
    }

    /// Cumulative drain over the last `hours` hours.
    pub async fn battery_drain(&self, hours: i64) -> Result<DrainSummary> {
        self.query(|reply| Command::BatteryDrain { hours, reply }).await
    }

    /// Battery points over the last `hours` hours, for charting.
    pub async fn battery_chart(&self, hours: i64) -> Result<Vec<BatteryPoint>> {
        self.query(|reply| Command::BatteryChart { hours, reply }).await
    }

    /// Top `limit` applications by CPU share over the last `hours` hours.
    pub async fn top_apps(&self, hours: i64, limit: usize) -> Result<Vec<AppDrainEstimate>> {
        self.query(|reply| Command::TopApps { hours, limit, reply }).await
    }

    /// Top `count` applications since local midnight, by estimated drain.
    pub async fn today_top_apps(&self, count: usize) -> Result<Vec<AppDrainEstimate>> {
        self.query(|reply| Command::TodayTopApps { count, reply }).await
    }

    /// Ranking over the latest discharge window of at least
    /// `min_drop_percent`, or `None` when no such window exists.
    pub async fn last_discharge_ranking(
        &self,
        min_drop_percent: i64,
        count: usize,
    ) -> Result<Option<Vec<AppDrainEstimate>>> {
        self.query(|reply| Command::LastDischargeRanking { min_drop_percent, count, reply }).await
    }

    /// One app's raw CPU series over the last `hours` hours.
    pub async fn app_cpu_history(&self, name: &str, hours: i64) -> Result<Vec<AppCpuPoint>> {
        let name = name.to_string();
        self.query(|reply| Command::AppCpuHistory { name, hours, reply }).await
    }

    /// One app's share-of-total-CPU series over the last `hours` hours.
    pub async fn contribution_history(&self, name: &str, hours: i64) -> Result<Vec<ContributionPoint>> {
        let name = name.to_string();
        self.query(|reply| Command::ContributionHistory { name, hours, reply }).await
    }

    /// CSV attribution report over the last `hours` hours.
    pub async fn export_csv(&self, hours: i64) -> Result<String> {
        self.query(|reply| Command::ExportCsv { hours, reply }).await
    }

    /// JSON attribution report over the last `hours` hours.
    pub async fn export_json(&self, hours: i64) -> Result<String> {
        self.query(|reply| Command::ExportJson { hours, reply }).await
    }

    /// The most recent live CPU sample. Never blocks on the consumer.
    pub fn live(&self) -> LiveSnapshot {
        self.live.read().clone()
    }

    /// Largest single-app CPU percent in the live sample, floored at 1.
    pub fn live_max_cpu(&self) -> f64 {
        attribution::max_cpu(&self.live.read().apps)
    }

    /// Pid of a live application by canonical name, for the force-quit path.
    pub fn pid_of(&self, name: &str) -> Option<i32> {
        self.live.read().apps.iter().find(|app| app.name == name).map(|app| app.pid)
    }

    /// The system is about to sleep: take a final sample and flush it.
    pub async fn handle_sleep(&self) -> Result<()> {
        debug!("system sleep, flushing history");
        self.update().await?;
        self.save().await
    }

    /// The system woke up. The post-wake update is delayed because sensors
    /// can report stale values immediately after resume, and it runs on a
    /// detached task so wake handling never blocks the caller.
    pub fn handle_wake(&self) {
        debug!(delay_secs = self.config.wake_delay.as_secs(), "system wake, scheduling update");
        let tx = self.tx.clone();
        let delay = self.config.wake_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if tx.send(Command::Update { reply: None }).await.is_err() {
                debug!("history worker gone before post-wake update");
            }
        });
    }

    /// Stop the tickers, run a final save, and wait for the consumer to
    /// exit.
    pub async fn shutdown(&self) -> Result<()> {
        for ticker in self.tickers.lock().drain(..) {
            ticker.abort();
        }

        let (reply, rx) = oneshot::channel();
        self.send(Command::Shutdown { reply }).await?;
        rx.await.map_err(|_| unavailable())?;

        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            worker.await.map_err(|e| Error::service_unavailable(format!("history worker panicked: {e}")))?;
        }
        Ok(())
    }

    async fn query<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.send(make(reply)).await?;
        rx.await.map_err(|_| unavailable())
    }

    async fn send(&self, command: Command) -> Result<()> {
        self.tx.send(command).await.map_err(|_| unavailable())
    }
}

impl Drop for HistoryService {
    fn drop(&mut self) {
        for ticker in self.tickers.lock().drain(..) {
            ticker.abort();
        }
        if let Some(worker) = self.worker.lock().take() {
            worker.abort();
        }
    }
}

fn unavailable() -> Error {
    Error::service_unavailable("history worker stopped")
}

fn spawn_ticker(
    tx: mpsc::Sender<Command>,
    period: std::time::Duration,
    make: impl Fn() -> Command + Send + 'static,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick fires immediately; the consumer already starts
        // fresh, so skip it.
        interval.tick().await;
        loop {
            interval.tick().await;
            if tx.try_send(make()).is_err() {
                debug!("history consumer busy, tick dropped");
            }
        }
    })
}

/// The fast tick owns its own sampler (and so its own delta cache) and never
/// touches the store; it only replaces the shared live snapshot.
fn spawn_live_tick(
    live: Arc<RwLock<LiveSnapshot>>,
    config: &Config,
    processes: Arc<dyn ProcessRegistry>,
    apps: Arc<dyn LiveAppRegistry>,
) -> JoinHandle<()> {
    let period = config.live_interval;
    let classifier = Classifier::new(config.own_process_name.clone());
    tokio::spawn(async move {
        let mut sampler = AppSampler::new(processes, apps, classifier);
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let now = Utc::now();
            match sampler.sample(now) {
                Ok(apps) => {
                    *live.write() = LiveSnapshot { apps, taken_at: Some(now) };
                },
                Err(err) => {
                    debug!(%err, "live sample failed, keeping previous snapshot");
                },
            }
        }
    })
}

struct Worker {
    store: HistoryStore,
    battery: BatterySampler,
    apps: AppSampler,
    classifier: Classifier,
    last_battery: Option<BatteryInfo>,
    live: Arc<RwLock<LiveSnapshot>>,
    config: Config,
}

impl Worker {
    async fn run(mut self, mut rx: mpsc::Receiver<Command>) {
        while let Some(command) = rx.recv().await {
            if self.handle(command).await {
                break;
            }
        }
        debug!("history worker exiting");
    }

    /// Returns `true` on shutdown.
    async fn handle(&mut self, command: Command) -> bool {
        match command {
            Command::Update { reply } => {
                self.update(Utc::now());
                if let Some(reply) = reply {
                    let _ = reply.send(());
                }
            },
            Command::Save { reply } => {
                let result = self.save().await;
                if let Err(err) = &result {
                    warn!(%err, "history save failed");
                }
                if let Some(reply) = reply {
                    let _ = reply.send(result);
                }
            },
            Command::BatteryInfo { reply } => {
                let _ = reply.send(self.last_battery.clone());
            },
            Command::BatteryDrain { hours, reply } => {
                let _ = reply.send(attribution::battery_drain(&self.store, Utc::now(), hours));
            },
            Command::BatteryChart { hours, reply } => {
                let cutoff = Utc::now() - chrono::Duration::hours(hours);
                let _ = reply.send(self.store.battery_since(cutoff).to_vec());
            },
            Command::TopApps { hours, limit, reply } => {
                let running = self.running_names();
                let _ = reply.send(attribution::top_apps(
                    &self.store,
                    &self.classifier,
                    &running,
                    Utc::now(),
                    hours,
                    limit,
                ));
            },
            Command::TodayTopApps { count, reply } => {
                let running = self.running_names();
                let _ = reply.send(attribution::today_top_apps(
                    &self.store,
                    &self.classifier,
                    &running,
                    Utc::now(),
                    count,
                ));
            },
            Command::LastDischargeRanking { min_drop_percent, count, reply } => {
                let running = self.running_names();
                let _ = reply.send(attribution::last_discharge_ranking(
                    &self.store,
                    &self.classifier,
                    &running,
                    Utc::now(),
                    min_drop_percent,
                    count,
                ));
            },
            Command::AppCpuHistory { name, hours, reply } => {
                let _ = reply.send(attribution::app_cpu_history(&self.store, &name, Utc::now(), hours));
            },
            Command::ContributionHistory { name, hours, reply } => {
                let _ = reply.send(attribution::app_energy_contribution_history(
                    &self.store,
                    &name,
                    Utc::now(),
                    hours,
                ));
            },
            Command::ExportCsv { hours, reply } => {
                let running = self.running_names();
                let _ = reply.send(attribution::export::export_csv(
                    &self.store,
                    &self.classifier,
                    &running,
                    self.last_battery.as_ref(),
                    Utc::now(),
                    hours,
                ));
            },
            Command::ExportJson { hours, reply } => {
                let running = self.running_names();
                let _ = reply.send(attribution::export::export_json(
                    &self.store,
                    &self.classifier,
                    &running,
                    self.last_battery.as_ref(),
                    Utc::now(),
                    hours,
                ));
            },
            Command::Shutdown { reply } => {
                if let Err(err) = persist::save(&self.store, &self.config.history_path) {
                    warn!(%err, "final history save failed");
                }
                let _ = reply.send(());
                return true;
            },
        }
        false
    }

    /// One full tick: sample battery and apps, append, trim.
    fn update(&mut self, now: DateTime<Utc>) {
        let battery = match self.battery.sample() {
            Ok(battery) => battery,
            Err(err) => {
                warn!(%err, "battery sample failed, recording CPU only");
                None
            },
        };

        let samples = match self.apps.sample(now) {
            Ok(samples) => samples,
            Err(err) => {
                // Without the process list there is nothing to attribute;
                // skip the whole tick rather than record a battery point
                // with no matching CPU data.
                warn!(%err, "process sample failed, skipping tick");
                return;
            },
        };

        let total_cpu: f64 = samples.iter().map(|s| s.cpu_percent).sum();
        let app_points = samples
            .into_iter()
            .map(|s| (s.name, AppCpuPoint::new(now, s.cpu_percent)))
            .collect();
        let battery_point = battery.as_ref().map(|b| BatteryPoint {
            time: now,
            capacity: b.current_capacity,
            percentage: b.percentage,
            is_charging: b.is_charging,
        });

        self.store.append(app_points, battery_point, TotalCpuPoint { time: now, total_cpu_percent: total_cpu });
        self.store.trim(now);
        self.last_battery = battery;
    }

    /// Saves run on the blocking pool against a clone of the store. The
    /// worker still awaits the write before the next command, keeping saves
    /// serialized with mutations; what the blocking pool buys is that the
    /// runtime worker thread stays free for other tasks meanwhile.
    async fn save(&self) -> Result<()> {
        let store = self.store.clone();
        let path = self.config.history_path.clone();
        tokio::task::spawn_blocking(move || persist::save(&store, &path))
            .await
            .map_err(|e| Error::service_unavailable(format!("save task: {e}")))?
    }

    fn running_names(&self) -> HashSet<String> {
        self.live.read().apps.iter().map(|app| app.name.clone()).collect()
    }
}
