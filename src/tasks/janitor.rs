//! TTL Janitor Task
//!
//! Background thread that periodically sweeps expired cache entries.

use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, info, trace};

use crate::cache::CacheStore;
use crate::config::CacheConfig;
use crate::error::Result;

/// Outcome of one janitor sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Batches scanned, each under its own store lock
    pub batches: usize,
    /// Expired entries removed across all batches
    pub removed: usize,
}

// == Sweep Expired ==
/// Runs one janitor sweep over `store`.
///
/// Scans batches of `sweep_batch_size` entries, taking the store lock once per
/// batch. Another batch follows while the expired fraction of the last one
/// stays at or above `sweep_repeat_threshold` and the sweep is still inside
/// `sweep_time_budget`.
pub fn sweep_expired<V: Clone>(
    store: &Mutex<CacheStore<V>>,
    config: &CacheConfig,
) -> SweepReport {
    let started = Instant::now();
    let mut report = SweepReport::default();

    loop {
        let batch = store.lock().sweep_batch(config.sweep_batch_size);
        report.batches += 1;
        report.removed += batch.removed;

        if batch.expired_ratio() < config.sweep_repeat_threshold
            || started.elapsed() >= config.sweep_time_budget
        {
            return report;
        }
    }
}

#[derive(Default)]
struct StopSignal {
    stopped: Mutex<bool>,
    wake: Condvar,
}

// == Janitor Handle ==
/// Owner of the janitor thread.
///
/// Stopping (explicitly or by dropping the handle) wakes the thread and
/// waits for it to exit.
pub struct JanitorHandle {
    signal: Arc<StopSignal>,
    thread: Option<JoinHandle<()>>,
}

impl JanitorHandle {
    /// Signals the janitor to stop and waits for it. Idempotent.
    pub fn stop(&mut self) {
        *self.signal.stopped.lock() = true;
        self.signal.wake.notify_all();

        if let Some(thread) = self.thread.take() {
            // A sweep that panicked has already unwound; nothing left to clean up
            let _ = thread.join();
        }
    }

    pub fn is_running(&self) -> bool {
        self.thread
            .as_ref()
            .is_some_and(|thread| !thread.is_finished())
    }
}

impl Drop for JanitorHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

// == Spawn Janitor ==
/// Spawns the janitor thread for a cache store.
///
/// The thread sleeps `cleanup_interval` between sweeps. It holds only a weak
/// reference to the store and exits on its own once the store is gone.
///
/// # Example
/// ```ignore
/// let store = Arc::new(Mutex::new(CacheStore::new(1000, ttl)));
/// let mut janitor = spawn_janitor(Arc::downgrade(&store), config)?;
/// // Later, during shutdown:
/// janitor.stop();
/// ```
pub fn spawn_janitor<V>(
    store: Weak<Mutex<CacheStore<V>>>,
    config: CacheConfig,
) -> Result<JanitorHandle>
where
    V: Clone + Send + 'static,
{
    let signal = Arc::new(StopSignal::default());
    let thread_signal = Arc::clone(&signal);

    let thread = thread::Builder::new()
        .name("memo-cache-janitor".to_string())
        .spawn(move || run(store, config, thread_signal))?;

    Ok(JanitorHandle {
        signal,
        thread: Some(thread),
    })
}

fn run<V: Clone>(store: Weak<Mutex<CacheStore<V>>>, config: CacheConfig, signal: Arc<StopSignal>) {
    info!("Starting janitor with interval of {:?}", config.cleanup_interval);

    while wait_for_tick(&signal, config.cleanup_interval) {
        let Some(store) = store.upgrade() else {
            break;
        };

        let report = sweep_expired(&store, &config);
        if report.removed > 0 {
            debug!(
                "Janitor sweep: removed {} expired entries in {} batches",
                report.removed, report.batches
            );
        } else {
            trace!("Janitor sweep: no expired entries found");
        }
    }

    info!("Janitor stopped");
}

/// Sleeps one interval. Returns false if a stop was requested.
fn wait_for_tick(signal: &StopSignal, interval: Duration) -> bool {
    let mut stopped = signal.stopped.lock();
    if !*stopped {
        signal.wake.wait_for(&mut stopped, interval);
    }
    !*stopped
}
