//! Debounced local re-filtering.
//!
//! [`Debouncer`] keeps a single pending task: scheduling new work aborts the
//! previous task if it has not run yet. [`LiveFilter`] uses it to re-run the
//! local filter engine on every filter change and publish only the latest result.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::core::filters::filter_buildings;
use crate::models::{Building, FilterState, Language};

/// Default quiet period before a local re-filter runs
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Single-slot "latest pending work" handle
pub struct Debouncer {
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Mutex::new(None),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Run `work` after the delay unless something else is scheduled first
    pub fn schedule<F>(&self, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let delay = self.delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            work.await;
        });

        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = pending.replace(handle) {
            previous.abort();
        }
    }

    /// Drop whatever is pending
    pub fn cancel(&self) {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = pending.take() {
            previous.abort();
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Result of one local evaluation
#[derive(Debug, Clone, Default)]
pub struct LiveResult {
    pub generation: u64,
    pub buildings: Arc<Vec<Building>>,
}

/// Debounced [`filter_buildings`] over a fixed in-memory collection
pub struct LiveFilter {
    buildings: Arc<Vec<Building>>,
    debouncer: Debouncer,
    generation: Arc<AtomicU64>,
    sender: Arc<watch::Sender<LiveResult>>,
}

impl LiveFilter {
    pub fn new(buildings: Arc<Vec<Building>>, delay: Duration) -> Self {
        let (sender, _) = watch::channel(LiveResult::default());
        Self {
            buildings,
            debouncer: Debouncer::new(delay),
            generation: Arc::new(AtomicU64::new(0)),
            sender: Arc::new(sender),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<LiveResult> {
        self.sender.subscribe()
    }

    /// Schedule an evaluation of `filters`, superseding any earlier one.
    ///
    /// Returns the generation number the evaluation will publish under.
    pub fn update(&self, filters: FilterState, language: Language) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let latest = Arc::clone(&self.generation);
        let buildings = Arc::clone(&self.buildings);
        let sender = Arc::clone(&self.sender);

        self.debouncer.schedule(async move {
            let result = filter_buildings(&buildings, &filters, language);
            // A newer update arrived while we were filtering
            if latest.load(Ordering::SeqCst) != generation {
                tracing::trace!("Discarding superseded local evaluation {}", generation);
                return;
            }
            sender.send_replace(LiveResult {
                generation,
                buildings: Arc::new(result),
            });
        });

        generation
    }
}
