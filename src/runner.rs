//! CollectorActor - drives the tick loop and executes due checks
//!
//! The actor owns the schedule: it loads the container tree once at spawn,
//! applies push events between ticks, and on every tick computes the due
//! work and dispatches it. Executions run as independent tasks; their
//! outcomes flow back to the hub through the resilient client.
//!
//! ## Message Flow
//!
//! ```text
//! Timer tick ──▶ select due work ──▶ spawn check runs ──▶ send_check_data ──▶ Hub
//!     ↑
//!     ├─── HierarchyEvent (upsert-asset, unset-assets, set-log-level)
//!     └─── Commands (TickNow, Shutdown)
//! ```
//!
//! A failing check never affects its siblings and never stops the loop;
//! its failure is normalized into a structured error record and submitted
//! like any result.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use chrono::Utc;
use tokio::sync::{mpsc, oneshot};
use tokio::time::interval;
use tracing::{debug, error, info, instrument, warn};

use crate::Asset;
use crate::check::{AssetCheck, BatchCheck, CheckExec, CheckOutcome, error_payload};
use crate::config::CollectorConfig;
use crate::hub::{CheckData, Framework, HubClient};
use crate::schedule::{ContainerSource, HierarchyEvent, ScheduleStore, TickState};

/// Pause between successive batch-result submissions, keeping a large
/// batch from saturating the hub link.
const BATCH_SUBMIT_PAUSE: Duration = Duration::from_millis(1);

/// Hook invoked on `set-log-level` events; the process bootstrap owns the
/// actual subscriber.
pub type LogLevelHook = Box<dyn Fn(&str) + Send>;

/// Commands that can be sent to the CollectorActor
#[derive(Debug)]
pub enum CollectorCommand {
    /// Compute and dispatch due work immediately (bypassing the ticker)
    ///
    /// Answers with the number of dispatched assets.
    TickNow {
        respond_to: oneshot::Sender<usize>,
    },

    /// Gracefully shut down the collector
    Shutdown,
}

/// Actor that schedules and executes this collector's checks.
pub struct CollectorActor {
    /// Check implementations by key
    checks: HashMap<String, CheckExec>,

    /// Schedule, exclusively owned so upserts are atomic for tick reads
    store: ScheduleStore,

    /// Last-tick scheduling state
    tick: TickState,

    /// Client used for result submission
    hub: HubClient,

    /// Tick cadence
    tick_interval: Duration,

    /// Flag submissions as excluded from hub-side statistics
    no_count: bool,

    on_log_level: Option<LogLevelHook>,

    command_rx: mpsc::Receiver<CollectorCommand>,

    event_rx: mpsc::Receiver<HierarchyEvent>,
}

impl CollectorActor {
    /// Run the actor's main loop until shutdown.
    #[instrument(skip(self), fields(collector = %self.store.collector_key()))]
    pub async fn run(mut self) {
        debug!("starting collector actor");

        let mut ticker = interval(self.tick_interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.dispatch_due_work(unix_now());
                }

                Some(event) = self.event_rx.recv() => {
                    self.apply_event(event);
                }

                Some(cmd) = self.command_rx.recv() => {
                    match cmd {
                        CollectorCommand::TickNow { respond_to } => {
                            let dispatched = self.dispatch_due_work(unix_now());
                            let _ = respond_to.send(dispatched);
                        }

                        CollectorCommand::Shutdown => {
                            debug!("received shutdown command");
                            break;
                        }
                    }
                }

                else => {
                    warn!("command channel closed, shutting down");
                    break;
                }
            }
        }

        self.hub.close().await;
        debug!("collector actor stopped");
    }

    /// Compute the due work for `now` and spawn its executions.
    ///
    /// Returns the number of dispatched assets. Unknown check kinds are
    /// logged and skipped.
    fn dispatch_due_work(&mut self, now: u64) -> usize {
        let work = self.tick.select(now, &self.store);
        let total = self.store.len();
        let due: usize = work.values().map(Vec::len).sum();

        let message = format!("work: {due} item(s), total: {total}");
        if work.is_empty() {
            debug!("{message}");
        } else {
            info!("{message}");
        }

        for (kind, assets) in work {
            match self.checks.get(&kind) {
                None => warn!("check `{kind}` is not implemented"),

                Some(CheckExec::Batch(check)) => {
                    tokio::spawn(run_batch(
                        check.clone(),
                        assets,
                        self.hub.clone(),
                        self.no_count,
                    ));
                }

                Some(CheckExec::Single(check)) => {
                    for asset in assets {
                        tokio::spawn(run_single(
                            check.clone(),
                            asset,
                            self.hub.clone(),
                            self.no_count,
                        ));
                    }
                }
            }
        }

        due
    }

    fn apply_event(&mut self, event: HierarchyEvent) {
        match event {
            HierarchyEvent::SetLogLevel { level } => {
                if let Some(hook) = &self.on_log_level {
                    hook(&level);
                }
            }

            HierarchyEvent::UpsertAsset {
                container_id,
                asset,
            } => {
                debug!("upsert asset {} in container {container_id}", asset.asset_id);
                self.store.apply_asset(container_id, &asset);
            }

            HierarchyEvent::UnsetAssets {
                container_id,
                asset_ids,
            } => {
                debug!("unset {} asset(s) in container {container_id}", asset_ids.len());
                self.store.remove_assets(container_id, &asset_ids);
            }
        }
    }
}

/// Execute a single-asset check and submit its outcome.
async fn run_single(check: Arc<dyn AssetCheck>, asset: Asset, hub: HubClient, no_count: bool) {
    let started = Instant::now();
    let timestamp = unix_now();

    let outcome = match check.run(timestamp, &asset).await {
        Ok(outcome) => outcome,
        Err(err) => CheckOutcome {
            result: None,
            error: Some(error_payload(&err)),
        },
    };

    submit_outcome(&hub, &asset, outcome, started, timestamp, no_count).await;
}

/// Execute a batch check and submit one outcome per asset, in input order.
///
/// A failed batch call assigns the same synthesized error to every asset.
async fn run_batch(check: Arc<dyn BatchCheck>, assets: Vec<Asset>, hub: HubClient, no_count: bool) {
    let started = Instant::now();
    let timestamp = unix_now();

    let outcomes = match check.run(timestamp, &assets).await {
        Ok(outcomes) if outcomes.len() == assets.len() => outcomes,
        Ok(outcomes) => {
            let err = anyhow::anyhow!(
                "batch check `{}` answered {} outcome(s) for {} asset(s)",
                check.key(),
                outcomes.len(),
                assets.len()
            );
            batch_failure(&err, assets.len())
        }
        Err(err) => batch_failure(&err, assets.len()),
    };

    for (asset, outcome) in assets.iter().zip(outcomes) {
        submit_outcome(&hub, asset, outcome, started, timestamp, no_count).await;
        tokio::time::sleep(BATCH_SUBMIT_PAUSE).await;
    }
}

fn batch_failure(err: &anyhow::Error, count: usize) -> Vec<CheckOutcome> {
    let outcome = CheckOutcome {
        result: None,
        error: Some(error_payload(err)),
    };
    vec![outcome; count]
}

/// Forward one asset's outcome to the hub with its timing metadata.
async fn submit_outcome(
    hub: &HubClient,
    asset: &Asset,
    outcome: CheckOutcome,
    started: Instant,
    timestamp: u64,
    no_count: bool,
) {
    if let Some(err) = &outcome.error {
        error!("{err}");
    }

    let data = CheckData {
        result: outcome.result,
        error: outcome.error,
        framework: Framework {
            duration: started.elapsed().as_secs_f64(),
            timestamp,
            no_count,
        },
    };

    match hub.send_check_data(asset.asset_id, asset.check_id, data).await {
        Ok(_) => debug!("successfully sent check data to hub; {asset}"),
        Err(e) => error!("failed to send check data to hub: {e}; {asset}"),
    }
}

fn unix_now() -> u64 {
    Utc::now().timestamp().max(0) as u64
}

/// Handle for controlling a CollectorActor
///
/// Cloneable; the event sender side feeds hierarchy updates into the
/// actor, the command side controls it.
#[derive(Clone)]
pub struct CollectorHandle {
    command_tx: mpsc::Sender<CollectorCommand>,
    event_tx: mpsc::Sender<HierarchyEvent>,
}

impl CollectorHandle {
    /// Load the schedule from `source`, then spawn the actor.
    ///
    /// The hub client should already be connected (or connecting); result
    /// submission relies on its delivery mode.
    pub async fn spawn(
        config: &CollectorConfig,
        collector_key: impl Into<String>,
        checks: Vec<CheckExec>,
        source: &dyn ContainerSource,
        hub: HubClient,
        on_log_level: Option<LogLevelHook>,
    ) -> anyhow::Result<Self> {
        let mut store = ScheduleStore::new(collector_key);
        store
            .load_all(source)
            .await
            .context("failed to load the container tree")?;

        let (command_tx, command_rx) = mpsc::channel(32);
        let (event_tx, event_rx) = mpsc::channel(64);

        let actor = CollectorActor {
            checks: checks
                .into_iter()
                .map(|check| (check.key().to_string(), check))
                .collect(),
            store,
            tick: TickState::new(unix_now()),
            hub,
            tick_interval: config.tick_duration(),
            no_count: config.no_count,
            on_log_level,
            command_rx,
            event_rx,
        };

        tokio::spawn(actor.run());

        Ok(Self {
            command_tx,
            event_tx,
        })
    }

    /// Sender half for hierarchy push events.
    pub fn events(&self) -> mpsc::Sender<HierarchyEvent> {
        self.event_tx.clone()
    }

    /// Trigger an immediate tick; answers with the number of dispatched
    /// assets.
    pub async fn tick_now(&self) -> anyhow::Result<usize> {
        let (tx, rx) = oneshot::channel();
        self.command_tx
            .send(CollectorCommand::TickNow { respond_to: tx })
            .await
            .context("failed to send TickNow command")?;

        rx.await.context("failed to receive response")
    }

    /// Gracefully shut down the collector.
    pub async fn shutdown(&self) -> anyhow::Result<()> {
        self.command_tx
            .send(CollectorCommand::Shutdown)
            .await
            .context("failed to send Shutdown command")?;
        Ok(())
    }
}
