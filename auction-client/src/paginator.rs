//! Windowing over the newest-first auction list.
//!
//! The window starts at one page and grows one page per accepted load-more
//! request. Growth lands after [`SETTLE_DELAY`]; requests arriving while a delay
//! is outstanding are dropped. The delay runs on a task owned by the
//! paginator, so re-initialising or tearing down cancels it.

use crate::enricher::EnrichmentTable;
use auction_core::{ItemId, ListSnapshot, Metrics};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

pub const SETTLE_DELAY: Duration = Duration::from_millis(500);

/// Published to views after every change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowState {
    pub size: usize,
    pub total: usize,
    pub settling: bool,
}

impl WindowState {
    pub fn has_more(&self) -> bool {
        self.size < self.total
    }
}

#[derive(Default)]
struct Inner {
    snapshot: ListSnapshot,
    window: usize,
    settling: bool,
    generation: u64,
    torn_down: bool,
}

impl Inner {
    fn state(&self) -> WindowState {
        WindowState {
            size: self.window,
            total: self.snapshot.len(),
            settling: self.settling,
        }
    }
}

pub struct IncrementalPaginator {
    page_size: usize,
    inner: Arc<Mutex<Inner>>,
    timer: Mutex<Option<JoinHandle<()>>>,
    updates: Arc<watch::Sender<WindowState>>,
    enrichments: EnrichmentTable,
    metrics: Arc<Metrics>,
}

impl IncrementalPaginator {
    pub fn new(page_size: usize, metrics: Arc<Metrics>) -> Self {
        let (tx, _rx) = watch::channel(WindowState::default());
        Self {
            page_size: page_size.max(1),
            inner: Arc::new(Mutex::new(Inner::default())),
            timer: Mutex::new(None),
            updates: Arc::new(tx),
            enrichments: EnrichmentTable::default(),
            metrics,
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Installs a fresh snapshot; the window restarts at one page.
    pub fn initialize(&self, snapshot: ListSnapshot) {
        self.cancel_timer();
        let state = {
            let mut inner = self.inner.lock();
            inner.generation += 1;
            inner.window = self.page_size.min(snapshot.len());
            inner.snapshot = snapshot;
            inner.settling = false;
            inner.torn_down = false;
            inner.state()
        };
        debug!(target: "paginator", size = state.size, total = state.total, "window initialised");
        self.updates.send_replace(state);
    }

    /// Schedules one page of growth. Returns `false` when nothing was
    /// scheduled: list exhausted, a delay already running, or torn down.
    pub fn request_more(&self) -> bool {
        let generation = {
            let mut inner = self.inner.lock();
            if inner.torn_down || inner.settling || inner.window >= inner.snapshot.len() {
                return false;
            }
            inner.settling = true;
            self.updates.send_replace(inner.state());
            inner.generation
        };

        let inner = self.inner.clone();
        let updates = self.updates.clone();
        let metrics = self.metrics.clone();
        let page_size = self.page_size;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(SETTLE_DELAY).await;
            let mut guard = inner.lock();
            if guard.torn_down || guard.generation != generation {
                return;
            }
            guard.window = (guard.window + page_size).min(guard.snapshot.len());
            guard.settling = false;
            metrics.window_growths.inc();
            debug!(target: "paginator", size = guard.window, total = guard.snapshot.len(), "window grew");
            updates.send_replace(guard.state());
        });
        if let Some(previous) = self.timer.lock().replace(handle) {
            previous.abort();
        }
        true
    }

    pub fn current_window(&self) -> Vec<ItemId> {
        let inner = self.inner.lock();
        inner.snapshot.newest_first(inner.window)
    }

    pub fn has_more(&self) -> bool {
        self.state().has_more()
    }

    pub fn window_size(&self) -> usize {
        self.inner.lock().window
    }

    pub fn state(&self) -> WindowState {
        self.inner.lock().state()
    }

    pub fn subscribe(&self) -> watch::Receiver<WindowState> {
        self.updates.subscribe()
    }

    pub fn enrichments(&self) -> &EnrichmentTable {
        &self.enrichments
    }

    /// Cancels the settle delay; later requests are ignored until the next
    /// `initialize`.
    pub fn teardown(&self) {
        self.cancel_timer();
        let mut inner = self.inner.lock();
        inner.torn_down = true;
        inner.settling = false;
    }

    fn cancel_timer(&self) {
        if let Some(handle) = self.timer.lock().take() {
            handle.abort();
        }
    }
}

impl Drop for IncrementalPaginator {
    fn drop(&mut self) {
        self.cancel_timer();
    }
}
