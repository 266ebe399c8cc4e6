//! Controller behind the auction list screen.

use crate::enricher::{card_label, ItemEnricher};
use crate::paginator::{IncrementalPaginator, WindowState};
use crate::reader::RemoteCollectionReader;
use crate::scroll::{Footer, Observation, ScrollTrigger};
use auction_core::{ChainGateway, ClientError, CollectionId, ItemId, Metrics, NavigationHost};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

pub const EMPTY_LABEL: &str = "No auctions yet";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListStatus {
    Loading,
    Unavailable(String),
    Ready,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardModel {
    pub id: ItemId,
    pub label: String,
}

pub struct ListingView<G: ChainGateway + 'static> {
    reader: RemoteCollectionReader<G>,
    paginator: Arc<IncrementalPaginator>,
    enricher: ItemEnricher<G>,
    observation: Observation,
    navigation: Arc<dyn NavigationHost>,
    status: RwLock<ListStatus>,
}

impl<G: ChainGateway + 'static> ListingView<G> {
    pub fn new(
        gateway: Arc<G>,
        collection: CollectionId,
        page_size: usize,
        navigation: Arc<dyn NavigationHost>,
        metrics: Arc<Metrics>,
    ) -> Self {
        let paginator = Arc::new(IncrementalPaginator::new(page_size, metrics.clone()));
        let enricher = ItemEnricher::new(
            gateway.clone(),
            paginator.enrichments().clone(),
            metrics.clone(),
        );
        Self {
            reader: RemoteCollectionReader::new(gateway, collection, metrics),
            observation: ScrollTrigger::observe(paginator.clone()),
            paginator,
            enricher,
            navigation,
            status: RwLock::new(ListStatus::Loading),
        }
    }

    /// Reads the collection and restarts the window. Also used for manual
    /// refresh; descriptions already fetched are kept.
    pub async fn load(&self) -> Result<(), ClientError> {
        *self.status.write() = ListStatus::Loading;
        match self.reader.read().await {
            Ok(snapshot) => {
                self.paginator.initialize(snapshot);
                *self.status.write() = ListStatus::Ready;
                let started = self.sync_enrichment();
                info!(target: "listing", total = self.paginator.state().total, started, "listing ready");
                Ok(())
            }
            Err(err) => {
                *self.status.write() = ListStatus::Unavailable(err.to_string());
                Err(err)
            }
        }
    }

    pub fn status(&self) -> ListStatus {
        self.status.read().clone()
    }

    /// Message shown in place of the cards, if any.
    pub fn empty_message(&self) -> Option<String> {
        match self.status() {
            ListStatus::Loading => Some("Loading auctions...".to_string()),
            ListStatus::Unavailable(message) => Some(format!("Could not load auctions: {}", message)),
            ListStatus::Ready if self.paginator.state().total == 0 => Some(EMPTY_LABEL.to_string()),
            ListStatus::Ready => None,
        }
    }

    /// Starts description fetches for revealed cards that have none yet.
    pub fn sync_enrichment(&self) -> usize {
        self.enricher.fetch_all(&self.paginator.current_window())
    }

    /// Cards in display order. Rendering reveals them, so any card without a
    /// description fetch gets one here.
    pub fn cards(&self) -> Vec<CardModel> {
        self.sync_enrichment();
        let table = self.enricher.table();
        self.paginator
            .current_window()
            .into_iter()
            .map(|id| {
                let label = card_label(&table.get(&id)).to_string();
                CardModel { id, label }
            })
            .collect()
    }

    pub fn footer(&self) -> Footer {
        Footer::for_window(self.paginator.has_more())
    }

    pub fn window(&self) -> WindowState {
        self.paginator.state()
    }

    pub fn subscribe(&self) -> watch::Receiver<WindowState> {
        self.paginator.subscribe()
    }

    /// Feeds the footer marker's visibility after a layout pass.
    pub fn on_marker_visibility(&self, ratio: f32) -> bool {
        self.observation
            .on_visibility(ratio, self.paginator.window_size())
    }

    pub fn open(&self, index: usize) -> bool {
        match self.paginator.current_window().get(index) {
            Some(id) => {
                self.navigation.open_detail(id);
                true
            }
            None => false,
        }
    }

    pub fn create(&self) {
        self.navigation.open_create();
    }

    /// `false` once torn down.
    pub fn is_active(&self) -> bool {
        self.observation.is_active()
    }

    pub fn teardown(&self) {
        self.observation.unobserve();
        self.paginator.teardown();
        self.enricher.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{item_id, MockGateway, RecordingNavigation};
    use crate::paginator::SETTLE_DELAY;
    use std::time::Duration;

    fn listing(
        gw: Arc<MockGateway>,
        nav: Arc<RecordingNavigation>,
    ) -> ListingView<MockGateway> {
        ListingView::new(gw, "0xfactory".into(), 5, nav, Metrics::detached().unwrap())
    }

    async fn settle() {
        tokio::time::sleep(SETTLE_DELAY + Duration::from_millis(100)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn scrolling_through_twelve_auctions() {
        let gw = Arc::new(MockGateway::with_items(12));
        let view = listing(gw.clone(), Arc::new(RecordingNavigation::default()));
        view.load().await.unwrap();

        let cards = view.cards();
        assert_eq!(cards.len(), 5);
        assert_eq!(cards[0].id, item_id(11), "newest first");
        assert_eq!(view.footer(), Footer::Loading);

        assert!(view.on_marker_visibility(1.0));
        assert!(!view.on_marker_visibility(1.0));
        settle().await;
        assert_eq!(view.cards().len(), 10);
        assert_eq!(view.footer(), Footer::Loading);

        assert!(view.on_marker_visibility(1.0), "marker moved with the window");
        settle().await;
        let cards = view.cards();
        assert_eq!(cards.len(), 12);
        assert_eq!(cards.last().map(|c| c.id.clone()), Some(item_id(0)));
        assert_eq!(view.footer(), Footer::EndOfList);
        assert!(!view.on_marker_visibility(1.0));
    }

    #[tokio::test(start_paused = true)]
    async fn only_revealed_cards_are_enriched() {
        let gw = Arc::new(MockGateway::with_items(12));
        gw.descriptions.lock().insert(item_id(11), "Rare vinyl".into());
        let view = listing(gw.clone(), Arc::new(RecordingNavigation::default()));
        view.load().await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        let cards = view.cards();
        assert_eq!(cards[0].label, "Rare vinyl");
        assert_eq!(cards[1].label, "No Description");
        assert_eq!(gw.description_calls(&item_id(6)), 0);
        assert_eq!(gw.description_calls(&item_id(7)), 1);

        view.load().await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(gw.description_calls(&item_id(11)), 1, "refresh keeps descriptions");
        assert_eq!(*gw.collection_reads.lock(), 2);
    }

    #[tokio::test]
    async fn unavailable_list_shows_message() {
        let gw = Arc::new(MockGateway::default());
        let view = listing(gw, Arc::new(RecordingNavigation::default()));
        assert!(view.load().await.is_err());
        assert!(matches!(view.status(), ListStatus::Unavailable(_)));
        let message = view.empty_message().unwrap();
        assert!(message.starts_with("Could not load auctions"), "{message}");
        assert!(view.cards().is_empty());
    }

    #[tokio::test]
    async fn empty_collection() {
        let gw = Arc::new(MockGateway::with_items(0));
        let view = listing(gw, Arc::new(RecordingNavigation::default()));
        view.load().await.unwrap();
        assert_eq!(view.empty_message().as_deref(), Some(EMPTY_LABEL));
        assert_eq!(view.footer(), Footer::EndOfList);
    }

    #[tokio::test]
    async fn navigation_requests() {
        let gw = Arc::new(MockGateway::with_items(3));
        let nav = Arc::new(RecordingNavigation::default());
        let view = listing(gw, nav.clone());
        view.load().await.unwrap();
        assert!(view.open(0));
        assert!(!view.open(3));
        view.create();
        assert_eq!(
            *nav.visits.lock(),
            vec![format!("detail:{}", item_id(2)), "create".to_string()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_stops_growth() {
        let gw = Arc::new(MockGateway::with_items(12));
        let view = listing(gw, Arc::new(RecordingNavigation::default()));
        view.load().await.unwrap();
        assert!(view.on_marker_visibility(1.0));
        assert!(view.is_active());
        view.teardown();
        assert!(!view.is_active());
        settle().await;
        assert_eq!(view.window().size, 5);
        assert!(!view.on_marker_visibility(0.0));
        assert!(!view.on_marker_visibility(1.0));
    }
}
