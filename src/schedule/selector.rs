//! WorkSelector - computes the checks due this tick
//!
//! The spreading formula keys on the asset id so checks sharing an
//! interval do not all fire in the same tick, while every check still
//! fires on average once per interval.

use std::collections::HashMap;

use tracing::warn;

use crate::Asset;

use super::store::ScheduleStore;

/// Due work for one tick, keyed by check kind.
pub type WorkBatch = HashMap<String, Vec<Asset>>;

/// Whether a check is due this tick.
///
/// `diff` is the seconds elapsed since the previous tick. The check fires
/// iff `(asset_id % interval + now) % interval < diff`, which selects one
/// tick-sized window per interval, offset deterministically per asset.
pub fn is_due(asset_id: u64, interval: u64, now: u64, diff: u64) -> bool {
    (asset_id % interval + now) % interval < diff
}

/// Scheduling state of the tick loop: the time of the last computed tick.
#[derive(Debug)]
pub struct TickState {
    last: u64,
}

impl TickState {
    /// Start scheduling as if a tick had just happened one second ago, so
    /// the first real tick computes a one-second window.
    pub fn new(now: u64) -> Self {
        Self {
            last: now.saturating_sub(1),
        }
    }

    pub fn last(&self) -> u64 {
        self.last
    }

    /// Compute the work batch for `now` against the current schedule.
    ///
    /// A clock that did not advance (or moved backward) yields an empty
    /// batch and leaves the last-tick time untouched; the state advances
    /// only when work was actually computed.
    pub fn select(&mut self, now: u64, store: &ScheduleStore) -> WorkBatch {
        if now <= self.last {
            warn!("now before or equal to last tick; maybe the clock time has changed?");
            return WorkBatch::new();
        }

        let diff = now - self.last;
        let mut work = WorkBatch::new();
        for (container_id, asset_id, check_id, check) in store.iter() {
            if is_due(asset_id, check.config.interval(), now, diff) {
                work.entry(check.kind.clone()).or_default().push(Asset {
                    container_id,
                    asset_id,
                    check_id,
                    config: check.config.clone(),
                });
            }
        }

        self.last = now;
        work
    }
}
