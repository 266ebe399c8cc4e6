use crate::router::Route;
use crate::tui::ListCursor;
use auction_client::{AuctionView, ClientConfig, CreateForm, JsonRpcGateway, ListStatus, ListingView};
use auction_core::{ActionKind, Clock, Metrics, NavigationHost, SystemClock};
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub type Gateway = JsonRpcGateway;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CreateField {
    Description,
    Beneficiary,
    Duration,
}

impl CreateField {
    fn next(self) -> Self {
        match self {
            CreateField::Description => CreateField::Beneficiary,
            CreateField::Beneficiary => CreateField::Duration,
            CreateField::Duration => CreateField::Description,
        }
    }
}

pub enum Screen {
    Listing,
    Detail(AuctionView<Gateway>),
    Create,
}

pub struct App {
    pub cfg: ClientConfig,
    pub gateway: Arc<Gateway>,
    pub metrics: Arc<Metrics>,
    pub clock: Arc<dyn Clock>,
    pub navigation: Arc<dyn NavigationHost>,
    pub listing: Arc<ListingView<Gateway>>,
    listing_load: Option<JoinHandle<()>>,
    pub create: Arc<CreateForm<Gateway>>,
    pub create_focus: CreateField,
    pub cursor: ListCursor,
    pub list_viewport: usize,
    pub screen: Screen,
    pub status: Option<String>,
}

fn new_listing(
    cfg: &ClientConfig,
    gateway: &Arc<Gateway>,
    navigation: &Arc<dyn NavigationHost>,
    metrics: &Arc<Metrics>,
) -> Arc<ListingView<Gateway>> {
    Arc::new(ListingView::new(
        gateway.clone(),
        cfg.collection.factory_address.clone(),
        cfg.listing.page_size,
        navigation.clone(),
        metrics.clone(),
    ))
}

impl App {
    pub fn new(
        cfg: ClientConfig,
        gateway: Arc<Gateway>,
        metrics: Arc<Metrics>,
        navigation: Arc<dyn NavigationHost>,
    ) -> Self {
        let listing = new_listing(&cfg, &gateway, &navigation, &metrics);
        let create = Arc::new(CreateForm::new(
            gateway.clone(),
            cfg.collection.factory_address.clone(),
            cfg.account.address.clone(),
            navigation.clone(),
        ));
        Self {
            cfg,
            gateway,
            metrics,
            clock: Arc::new(SystemClock),
            navigation,
            listing,
            listing_load: None,
            create,
            create_focus: CreateField::Description,
            cursor: ListCursor::default(),
            list_viewport: 0,
            screen: Screen::Listing,
            status: None,
        }
    }

    pub fn reload_listing(&mut self) {
        self.cursor.reset();
        self.status = None;
        let listing = self.listing.clone();
        let handle = tokio::spawn(async move {
            if let Err(err) = listing.load().await {
                warn!(target: "tui", %err, "listing load failed");
            }
        });
        if let Some(previous) = self.listing_load.replace(handle) {
            previous.abort();
        }
    }

    /// Stops the listing and its background work while another screen is up.
    fn leave_listing(&mut self) {
        if let Some(load) = self.listing_load.take() {
            load.abort();
        }
        self.listing.teardown();
    }

    /// Replaces the torn-down listing with a fresh one and reads the
    /// collection again.
    fn return_to_listing(&mut self) {
        self.listing = new_listing(&self.cfg, &self.gateway, &self.navigation, &self.metrics);
        self.screen = Screen::Listing;
        self.reload_listing();
    }

    pub fn shutdown(&mut self) {
        self.leave_listing();
        self.screen = Screen::Listing;
    }

    pub fn navigate(&mut self, route: Route) {
        debug!(target: "tui", ?route, "navigate");
        self.status = None;
        match route {
            Route::Listing => {
                if !matches!(self.screen, Screen::Listing) {
                    self.return_to_listing();
                }
            }
            Route::Detail(item) => {
                if matches!(self.screen, Screen::Listing) {
                    self.leave_listing();
                }
                let view = AuctionView::new(
                    item,
                    self.gateway.clone(),
                    self.clock.clone(),
                    self.metrics.clone(),
                );
                view.start_polling(self.cfg.poll_interval());
                self.screen = Screen::Detail(view);
            }
            Route::Create => {
                if matches!(self.screen, Screen::Listing) {
                    self.leave_listing();
                }
                self.create_focus = CreateField::Description;
                self.screen = Screen::Create;
            }
        }
    }

    /// Visibility of the footer marker after the last draw, if the list is
    /// showing cards.
    pub fn marker_ratio(&self) -> Option<f32> {
        if !matches!(self.screen, Screen::Listing) || self.list_viewport == 0 {
            return None;
        }
        if self.listing.status() != ListStatus::Ready {
            return None;
        }
        let cards = self.listing.window().size;
        Some(self.cursor.marker_ratio(cards, self.list_viewport))
    }

    /// Returns `true` when the user asked to quit.
    pub fn handle_event(&mut self, event: Event) -> bool {
        let Event::Key(key) = event else {
            return false;
        };
        if key.kind != KeyEventKind::Press {
            return false;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return true;
        }
        match self.screen {
            Screen::Listing => self.listing_key(key),
            Screen::Detail(_) => {
                self.detail_key(key);
                false
            }
            Screen::Create => {
                self.create_key(key);
                false
            }
        }
    }

    fn listing_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Down | KeyCode::Char('j') => {
                self.cursor.down(self.listing.window().size);
            }
            KeyCode::Up | KeyCode::Char('k') => self.cursor.up(),
            KeyCode::Enter => {
                self.listing.open(self.cursor.selected);
            }
            KeyCode::Char('n') => self.listing.create(),
            KeyCode::Char('r') => self.reload_listing(),
            _ => {}
        }
        false
    }

    fn detail_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Esc {
            self.navigate(Route::Listing);
            return;
        }
        let Screen::Detail(view) = &self.screen else {
            return;
        };
        let outcome = match key.code {
            KeyCode::Char(c) if c.is_ascii_digit() || c == '.' => {
                view.edit_bid(|input| input.push(c));
                Ok(())
            }
            KeyCode::Backspace => {
                view.edit_bid(|input| input.pop());
                Ok(())
            }
            KeyCode::Enter => view.submit_bid().map(|_| ()),
            KeyCode::Char('w') => view.claim_returns().map(|_| ()),
            KeyCode::Char('s') => view.settle().map(|_| ()),
            KeyCode::Char('f') => view.force_end().map(|_| ()),
            KeyCode::Char('a') => {
                for kind in ActionKind::ALL {
                    view.acknowledge(kind);
                }
                Ok(())
            }
            _ => Ok(()),
        };
        self.status = outcome.err().map(|err| err.to_string());
    }

    fn create_key(&mut self, key: KeyEvent) {
        let form = self.create.clone();
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            if key.code == KeyCode::Char('a') {
                form.use_my_address();
            }
            return;
        }
        match (key.code, self.create_focus) {
            (KeyCode::Esc, _) => self.navigate(Route::Listing),
            (KeyCode::Tab, focus) => self.create_focus = focus.next(),
            (KeyCode::Enter, _) => {
                if form.can_submit() {
                    tokio::spawn(async move {
                        if let Err(err) = form.submit().await {
                            warn!(target: "tui", %err, "create submit failed");
                        }
                    });
                } else if let Err(err) = form.fields().validate() {
                    self.status = Some(err.to_string());
                }
            }
            (KeyCode::Left | KeyCode::Right, CreateField::Duration) => form.next_duration(),
            (KeyCode::Backspace, CreateField::Description) => {
                form.edit(|fields| {
                    fields.description.pop();
                });
            }
            (KeyCode::Backspace, CreateField::Beneficiary) => {
                form.edit(|fields| {
                    fields.beneficiary.pop();
                });
            }
            (KeyCode::Char(c), CreateField::Description) => {
                form.edit(|fields| fields.description.push(c));
            }
            (KeyCode::Char(c), CreateField::Beneficiary) => {
                form.edit(|fields| fields.beneficiary.push(c));
            }
            _ => {}
        }
    }
}
