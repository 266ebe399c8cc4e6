use auction_core::{ChainGateway, Enrichment, ItemId, Metrics};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub const LOADING_LABEL: &str = "Loading...";
pub const NO_DESCRIPTION: &str = "No Description";

/// Per-item memo of description fetches. An item is fetched at most once for
/// the lifetime of the table.
#[derive(Clone, Default)]
pub struct EnrichmentTable {
    entries: Arc<DashMap<ItemId, Enrichment>>,
}

impl EnrichmentTable {
    pub fn get(&self, item: &str) -> Enrichment {
        self.entries
            .get(item)
            .map(|e| e.value().clone())
            .unwrap_or_default()
    }

    /// Moves `item` from NotRequested to Loading. Returns `false` if it was
    /// already requested.
    pub fn claim(&self, item: &str) -> bool {
        match self.entries.entry(item.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(Enrichment::Loading);
                true
            }
        }
    }

    pub fn resolve(&self, item: &str, value: Option<String>) {
        self.entries
            .insert(item.to_string(), Enrichment::Loaded(value));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Text a card shows for its enrichment state.
pub fn card_label(enrichment: &Enrichment) -> &str {
    match enrichment {
        Enrichment::NotRequested | Enrichment::Loading => LOADING_LABEL,
        Enrichment::Loaded(Some(text)) if !text.trim().is_empty() => text.as_str(),
        Enrichment::Loaded(_) => NO_DESCRIPTION,
    }
}

pub struct ItemEnricher<G: ChainGateway + 'static> {
    gateway: Arc<G>,
    table: EnrichmentTable,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    closed: AtomicBool,
    metrics: Arc<Metrics>,
}

impl<G: ChainGateway + 'static> ItemEnricher<G> {
    pub fn new(gateway: Arc<G>, table: EnrichmentTable, metrics: Arc<Metrics>) -> Self {
        Self {
            gateway,
            table,
            tasks: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
            metrics,
        }
    }

    pub fn table(&self) -> &EnrichmentTable {
        &self.table
    }

    /// Starts the description fetch for `item` unless one was already made.
    /// A failed read resolves to "absent" and is never retried.
    pub fn fetch(&self, item: &ItemId) -> bool {
        if self.closed.load(Ordering::SeqCst) || !self.table.claim(item) {
            return false;
        }
        self.metrics.enrich_fetches.inc();
        let gateway = self.gateway.clone();
        let table = self.table.clone();
        let item = item.clone();
        let handle = tokio::spawn(async move {
            match gateway.read_description(&item).await {
                Ok(text) => {
                    debug!(target: "enricher", item = %item, "description loaded");
                    table.resolve(&item, Some(text));
                }
                Err(err) => {
                    warn!(target: "enricher", item = %item, ?err, "description unavailable");
                    table.resolve(&item, None);
                }
            }
        });
        let mut tasks = self.tasks.lock();
        tasks.retain(|h| !h.is_finished());
        tasks.push(handle);
        true
    }

    pub fn fetch_all<'a, I>(&self, items: I) -> usize
    where
        I: IntoIterator<Item = &'a ItemId>,
    {
        items.into_iter().filter(|item| self.fetch(item)).count()
    }

    /// Aborts outstanding fetches; nothing resolves afterwards.
    pub fn teardown(&self) {
        self.closed.store(true, Ordering::SeqCst);
        for handle in self.tasks.lock().drain(..) {
            handle.abort();
        }
    }
}

impl<G: ChainGateway + 'static> Drop for ItemEnricher<G> {
    fn drop(&mut self) {
        self.teardown();
    }
}
