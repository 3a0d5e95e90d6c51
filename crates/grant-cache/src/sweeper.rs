//! Background expiry sweeper.
//!
//! The sweeper is a Tokio task owned by the cache. Each tick it snapshots
//! the registration keys and purges every entry whose read and write
//! access have both expired. Shutdown is signalled over a watch channel
//! and only takes effect between ticks; a running sweep always completes.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::error::{CacheError, Result};
use crate::key::CacheKey;
use crate::payload::PayloadStore;
use crate::registration::RegistrationStore;

/// Result of one sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    /// Keys in the snapshot.
    pub scanned: usize,
    /// Keys removed from both stores.
    pub purged: usize,
    /// Keys whose evaluation failed and were left in place.
    pub skipped: usize,
}

/// Purge fully-expired entries from both stores.
///
/// Keys inserted after the snapshot are left for the next sweep. Each key
/// is re-checked under its shard lock, so an entry refreshed since the
/// snapshot survives.
pub fn sweep(registrations: &RegistrationStore, payloads: &PayloadStore, now: i64) -> SweepReport {
    sweep_with(registrations.snapshot_keys(), |key| {
        purge_one(registrations, payloads, key, now)
    })
}

/// Run `evaluate` over `keys`, counting purges and skipping keys whose
/// evaluation panics.
pub(crate) fn sweep_with(keys: Vec<CacheKey>, evaluate: impl Fn(&CacheKey) -> bool) -> SweepReport {
    let mut report = SweepReport {
        scanned: keys.len(),
        ..SweepReport::default()
    };

    for key in keys {
        match panic::catch_unwind(AssertUnwindSafe(|| evaluate(&key))) {
            Ok(true) => report.purged += 1,
            Ok(false) => {}
            Err(_) => {
                report.skipped += 1;
                tracing::warn!(%key, "skipping entry that failed evaluation during sweep");
            }
        }
    }

    tracing::debug!(
        scanned = report.scanned,
        purged = report.purged,
        skipped = report.skipped,
        "grant cache sweep finished"
    );
    report
}

fn purge_one(
    registrations: &RegistrationStore,
    payloads: &PayloadStore,
    key: &CacheKey,
    now: i64,
) -> bool {
    // Payload goes while the registration shard is locked, so a concurrent
    // register cannot slip its payload in between the two removals.
    registrations.remove_if_expired_with(key, now, || {
        payloads.unregister(key);
    })
}

/// Handle to the periodic sweep task.
///
/// Dropping the handle signals shutdown without waiting for the task.
#[derive(Debug)]
pub struct Sweeper {
    shutdown: watch::Sender<bool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Sweeper {
    /// Spawn a task that calls `tick` every `period`.
    ///
    /// The first call happens one full period after spawning. `tick` runs
    /// on the blocking pool so a long scan never stalls a runtime worker.
    /// Must be called from within a Tokio runtime.
    pub fn spawn<F>(period: Duration, tick: F) -> Result<Self>
    where
        F: Fn() + Send + Sync + 'static,
    {
        if period.is_zero() {
            return Err(CacheError::InvalidArgument(
                "sweep period must be non-zero".into(),
            ));
        }
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| CacheError::Runtime(e.to_string()))?;
        let (shutdown, mut stopped) = watch::channel(false);
        let tick = Arc::new(tick);

        let handle = runtime.spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            tracing::info!(?period, "grant cache sweeper started");

            loop {
                tokio::select! {
                    // The sweep is awaited inside this branch, so a stop
                    // signal is only seen once it has finished.
                    _ = interval.tick() => {
                        let tick = Arc::clone(&tick);
                        if let Err(e) = tokio::task::spawn_blocking(move || (*tick)()).await {
                            tracing::warn!("grant cache sweep failed: {}", e);
                        }
                    }
                    // Fires on an explicit stop and when the sender is dropped.
                    _ = stopped.changed() => break,
                }
            }

            tracing::info!("grant cache sweeper stopped");
        });

        Ok(Self {
            shutdown,
            handle: Mutex::new(Some(handle)),
        })
    }

    /// Whether the sweep task is still alive.
    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .map(|guard| guard.as_ref().is_some_and(|h| !h.is_finished()))
            .unwrap_or(false)
    }

    /// Stop future ticks and wait for the task to exit.
    ///
    /// A sweep already in progress runs to completion. Calling this more
    /// than once is a no-op.
    pub async fn shutdown(&self) {
        self.signal_stop();
        let handle = self.handle.lock().ok().and_then(|mut guard| guard.take());
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::warn!("grant cache sweeper exited abnormally: {}", e);
            }
        }
    }

    fn signal_stop(&self) {
        // Errors only when the task has already exited.
        let _ = self.shutdown.send(true);
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.signal_stop();
    }
}
