use auction_core::{ItemId, NavigationHost};
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Listing,
    Detail(ItemId),
    Create,
}

/// Queues screen changes for the main loop.
pub struct ChannelNavigation {
    tx: UnboundedSender<Route>,
}

impl ChannelNavigation {
    pub fn new(tx: UnboundedSender<Route>) -> Self {
        Self { tx }
    }

    fn push(&self, route: Route) {
        if self.tx.send(route).is_err() {
            debug!(target: "router", "navigation after shutdown ignored");
        }
    }
}

impl NavigationHost for ChannelNavigation {
    fn open_detail(&self, item: &ItemId) {
        self.push(Route::Detail(item.clone()));
    }

    fn open_create(&self) {
        self.push(Route::Create);
    }

    fn open_listing(&self) {
        self.push(Route::Listing);
    }
}
