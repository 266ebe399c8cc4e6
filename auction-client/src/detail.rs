//! Controller behind the single-auction screen.

use crate::dispatcher::{ActionCallback, ActionDispatcher};
use auction_core::{
    format_ether, project_snapshot, remaining_secs, ActionIntent, ActionKind, ActionRun,
    AmountError, AuctionSnapshot, BidBlocker, BidControl, BidGate, ChainGateway, ClientError,
    Clock, ItemId, LifecyclePhase, Metrics, Projection,
};
use chrono::{Local, TimeZone};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub const FETCHING_LABEL: &str = "Fetching...";

/// Raw text of the bid field. Parsed on every projection, never cached.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BidInput {
    raw: String,
}

impl BidInput {
    pub fn set(&mut self, raw: impl Into<String>) {
        self.raw = raw.into();
    }

    pub fn push(&mut self, c: char) {
        self.raw.push(c);
    }

    pub fn pop(&mut self) {
        self.raw.pop();
    }

    pub fn clear(&mut self) {
        self.raw.clear();
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }
}

/// Display strings for one render of the detail screen.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailModel {
    pub address: ItemId,
    pub description: String,
    pub ends_at: String,
    pub remaining_secs: Option<i64>,
    pub highest_bid: String,
    pub badge: &'static str,
    pub bid: BidControl,
    pub bid_input: String,
    pub settle_emphasized: bool,
    /// Set while any auction field is still unresolved.
    pub loading: Option<String>,
    pub runs: Vec<(ActionKind, String)>,
    pub notice: Option<String>,
}

fn run_status(run: &ActionRun) -> String {
    match run {
        ActionRun::Idle => String::new(),
        ActionRun::Pending { .. } => "pending".to_string(),
        ActionRun::Succeeded { receipt, .. } => format!("confirmed in {}", receipt.tx_hash),
        ActionRun::Failed { message, .. } => message.clone(),
    }
}

fn local_time(secs: i64) -> Option<String> {
    Local
        .timestamp_opt(secs, 0)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
}

pub struct AuctionView<G: ChainGateway + 'static> {
    item: ItemId,
    gateway: Arc<G>,
    clock: Arc<dyn Clock>,
    dispatcher: ActionDispatcher<G>,
    snapshot: Arc<RwLock<AuctionSnapshot>>,
    bid_input: Arc<Mutex<BidInput>>,
    notice: Arc<Mutex<Option<String>>>,
    poller: Mutex<Option<JoinHandle<()>>>,
}

impl<G: ChainGateway + 'static> AuctionView<G> {
    pub fn new(item: ItemId, gateway: Arc<G>, clock: Arc<dyn Clock>, metrics: Arc<Metrics>) -> Self {
        Self {
            item,
            dispatcher: ActionDispatcher::new(gateway.clone(), metrics),
            gateway,
            clock,
            snapshot: Arc::new(RwLock::new(AuctionSnapshot::default())),
            bid_input: Arc::new(Mutex::new(BidInput::default())),
            notice: Arc::new(Mutex::new(None)),
            poller: Mutex::new(None),
        }
    }

    pub fn item(&self) -> &ItemId {
        &self.item
    }

    pub fn snapshot(&self) -> AuctionSnapshot {
        self.snapshot.read().clone()
    }

    /// Reads the auction and folds the result into the snapshot. Returns the
    /// fields that are still unresolved; those keep their loading placeholder.
    pub async fn refresh(&self) -> Vec<&'static str> {
        let fresh = self.gateway.read_auction(&self.item).await;
        let missing = {
            let mut snapshot = self.snapshot.write();
            snapshot.merge(fresh);
            snapshot.missing_fields()
        };
        if !missing.is_empty() {
            debug!(target: "detail", item = %self.item, ?missing, "partial auction read");
        }
        missing
    }

    /// Fields not resolved by any read so far.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        self.snapshot.read().missing_fields()
    }

    /// Read status for the screen; a partial read is shown, never raised.
    pub fn incomplete(&self) -> Option<ClientError> {
        let missing = self.missing_fields();
        (!missing.is_empty()).then(|| ClientError::ItemReadIncomplete {
            item: self.item.clone(),
            missing,
        })
    }

    /// Re-reads the auction every `interval` until teardown.
    pub fn start_polling(&self, interval: Duration) {
        let gateway = self.gateway.clone();
        let snapshot = self.snapshot.clone();
        let item = self.item.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let fresh = gateway.read_auction(&item).await;
                if !fresh.is_complete() {
                    debug!(target: "detail", item = %item, missing = ?fresh.missing_fields(), "poll read incomplete");
                }
                snapshot.write().merge(fresh);
            }
        });
        if let Some(previous) = self.poller.lock().replace(handle) {
            previous.abort();
        }
    }

    pub fn edit_bid<F: FnOnce(&mut BidInput)>(&self, edit: F) {
        edit(&mut self.bid_input.lock());
    }

    pub fn bid_input(&self) -> String {
        self.bid_input.lock().raw().to_string()
    }

    pub fn notice(&self) -> Option<String> {
        self.notice.lock().clone()
    }

    pub fn projection(&self) -> Projection {
        let gate = BidGate::from_input(
            self.bid_input.lock().raw(),
            self.dispatcher.is_pending(&self.item, ActionKind::Bid),
        );
        project_snapshot(&self.snapshot.read(), self.clock.now(), &gate)
    }

    pub fn run(&self, kind: ActionKind) -> ActionRun {
        self.dispatcher.run(&self.item, kind)
    }

    /// Returns a finished run to idle and clears its message.
    pub fn acknowledge(&self, kind: ActionKind) {
        if self.dispatcher.acknowledge(&self.item, kind) {
            self.notice.lock().take();
        }
    }

    /// Bids the amount in the input field. The field is cleared only once the
    /// bid is confirmed.
    pub fn submit_bid(&self) -> Result<ActionRun, ClientError> {
        let amount = match self.projection().allowed.bid {
            BidControl::Enabled(amount) => amount,
            BidControl::Hidden => return Err(ClientError::ActionUnavailable(ActionKind::Bid)),
            BidControl::Disabled(BidBlocker::Pending) => {
                return Err(ClientError::Busy {
                    item: self.item.clone(),
                    kind: ActionKind::Bid,
                })
            }
            BidControl::Disabled(BidBlocker::EmptyAmount) => {
                return Err(AmountError::Empty.into())
            }
            BidControl::Disabled(BidBlocker::InvalidAmount(err)) => return Err(err.into()),
        };
        self.perform(ActionIntent::bid(self.item.clone(), amount))
    }

    pub fn claim_returns(&self) -> Result<ActionRun, ClientError> {
        self.perform(ActionIntent::claim_returns(self.item.clone()))
    }

    pub fn settle(&self) -> Result<ActionRun, ClientError> {
        self.perform(ActionIntent::settle(self.item.clone()))
    }

    pub fn force_end(&self) -> Result<ActionRun, ClientError> {
        self.perform(ActionIntent::force_end(self.item.clone()))
    }

    fn perform(&self, intent: ActionIntent) -> Result<ActionRun, ClientError> {
        if !self.projection().allowed.offers(intent.kind) {
            return Err(ClientError::ActionUnavailable(intent.kind));
        }
        let bid_input = self.bid_input.clone();
        let notice = self.notice.clone();
        let callback: ActionCallback = Arc::new(move |intent: &ActionIntent, run: &ActionRun| match run {
            ActionRun::Succeeded { receipt, .. } => {
                if intent.kind == ActionKind::Bid {
                    bid_input.lock().clear();
                }
                *notice.lock() = Some(format!("{} confirmed ({})", intent.kind.label(), receipt.tx_hash));
            }
            ActionRun::Failed { message, .. } => {
                warn!(target: "detail", item = %intent.target, kind = ?intent.kind, %message, "action not applied");
                *notice.lock() = Some(format!("{} failed: {}", intent.kind.label(), message));
            }
            ActionRun::Idle | ActionRun::Pending { .. } => {}
        });
        let kind = intent.kind;
        let run = self.dispatcher.dispatch(intent, callback)?;
        info!(target: "detail", item = %self.item, ?kind, "action submitted");
        Ok(run)
    }

    pub fn model(&self) -> DetailModel {
        let snapshot = self.snapshot();
        let projection = self.projection();
        let now = self.clock.now();
        let runs = self
            .dispatcher
            .runs_for(&self.item)
            .into_iter()
            .map(|(kind, run)| (kind, run_status(&run)))
            .collect();
        DetailModel {
            address: self.item.clone(),
            description: snapshot
                .description
                .clone()
                .unwrap_or_else(|| crate::enricher::LOADING_LABEL.to_string()),
            ends_at: snapshot
                .deadline
                .and_then(local_time)
                .unwrap_or_else(|| FETCHING_LABEL.to_string()),
            remaining_secs: snapshot.deadline.map(|deadline| remaining_secs(deadline, now)),
            highest_bid: format_ether(projection.highest_bid),
            badge: match projection.phase {
                LifecyclePhase::Open => "Live",
                LifecyclePhase::Expired => "Ended",
            },
            bid: projection.allowed.bid,
            bid_input: self.bid_input(),
            settle_emphasized: projection.allowed.settle_emphasized,
            loading: self.incomplete().map(|status| status.to_string()),
            runs,
            notice: self.notice(),
        }
    }

    /// Stops polling and drops pending completions.
    pub fn teardown(&self) {
        if let Some(handle) = self.poller.lock().take() {
            handle.abort();
        }
        self.dispatcher.teardown();
    }
}

impl<G: ChainGateway + 'static> Drop for AuctionView<G> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{item_id, MockGateway};
    use auction_core::{parse_ether, ManualClock, TimestampSecs, U256};

    const T: TimestampSecs = 1_700_000_000;

    fn gateway() -> Arc<MockGateway> {
        let gw = Arc::new(MockGateway::with_items(1));
        gw.descriptions
            .lock()
            .insert(item_id(0), "Vintage synthesizer".into());
        *gw.highest_bid.lock() = Some(U256::ZERO);
        *gw.deadline.lock() = Some(T);
        gw
    }

    fn view(gw: Arc<MockGateway>, clock: Arc<ManualClock>) -> AuctionView<MockGateway> {
        AuctionView::new(item_id(0), gw, clock, Metrics::detached().unwrap())
    }

    #[tokio::test(start_paused = true)]
    async fn successful_bid_clears_input() {
        let gw = gateway();
        *gw.write_delay.lock() = Duration::from_secs(1);
        let v = view(gw.clone(), Arc::new(ManualClock::new(T - 3600)));
        assert!(v.refresh().await.is_empty());
        v.edit_bid(|b| b.set("1.5"));
        assert!(v.projection().allowed.bid.is_enabled());

        let run = v.submit_bid().unwrap();
        assert!(run.is_pending());
        assert_eq!(
            v.projection().allowed.bid,
            BidControl::Disabled(BidBlocker::Pending)
        );
        assert!(matches!(v.submit_bid(), Err(ClientError::Busy { .. })));

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(matches!(v.run(ActionKind::Bid), ActionRun::Succeeded { .. }));
        assert_eq!(v.bid_input(), "");
        let expected = parse_ether("1.5").unwrap();
        assert_eq!(
            gw.writes.lock()[0],
            (item_id(0), ActionKind::Bid, Some(expected))
        );

        assert!(v.refresh().await.is_empty());
        assert_eq!(v.model().highest_bid, "1.5");
    }

    #[tokio::test(start_paused = true)]
    async fn failed_bid_keeps_input_and_reports() {
        let gw = gateway();
        gw.fail_next_write("execution reverted: bid too low");
        let v = view(gw, Arc::new(ManualClock::new(T - 3600)));
        assert!(v.refresh().await.is_empty());
        v.edit_bid(|b| b.set("1.5"));
        v.submit_bid().unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(matches!(v.run(ActionKind::Bid), ActionRun::Failed { .. }));
        assert_eq!(v.bid_input(), "1.5");
        let notice = v.notice().unwrap();
        assert!(notice.contains("bid too low"), "{notice}");
        assert!(v.projection().allowed.bid.is_enabled(), "can retry by hand");

        v.acknowledge(ActionKind::Bid);
        assert_eq!(v.run(ActionKind::Bid), ActionRun::Idle);
        assert!(v.notice().is_none());
    }

    #[tokio::test]
    async fn deadline_passes_while_viewing() {
        let clock = Arc::new(ManualClock::new(T - 1));
        let v = view(gateway(), clock.clone());
        assert!(v.refresh().await.is_empty());
        v.edit_bid(|b| b.set("2"));

        let open = v.model();
        assert_eq!(open.badge, "Live");
        assert!(open.bid.is_enabled());
        assert!(!open.settle_emphasized);
        assert_eq!(open.remaining_secs, Some(1));

        clock.set(T);
        let ended = v.model();
        assert_eq!(ended.badge, "Ended");
        assert!(ended.bid.is_hidden());
        assert!(ended.settle_emphasized);
        assert_eq!(ended.remaining_secs, Some(0));
        assert!(matches!(
            v.submit_bid(),
            Err(ClientError::ActionUnavailable(ActionKind::Bid))
        ));
        assert!(v.settle().is_ok());
    }

    #[tokio::test]
    async fn invalid_or_empty_input_is_refused() {
        let v = view(gateway(), Arc::new(ManualClock::new(T - 10)));
        assert!(v.refresh().await.is_empty());
        assert_eq!(
            v.submit_bid(),
            Err(ClientError::InvalidAmount(AmountError::Empty))
        );
        v.edit_bid(|b| b.set("1.2.3"));
        assert!(matches!(
            v.submit_bid(),
            Err(ClientError::InvalidAmount(AmountError::Malformed(_)))
        ));
    }

    #[tokio::test]
    async fn partial_read_shows_placeholders() {
        let gw = Arc::new(MockGateway::with_items(1));
        let v = view(gw, Arc::new(ManualClock::new(T)));
        assert_eq!(
            v.refresh().await,
            vec!["description", "highest_bid", "deadline"]
        );
        assert!(matches!(
            v.incomplete(),
            Some(ClientError::ItemReadIncomplete { .. })
        ));
        let model = v.model();
        assert_eq!(model.description, "Loading...");
        assert_eq!(model.ends_at, FETCHING_LABEL);
        assert_eq!(model.highest_bid, "0");
        assert_eq!(model.badge, "Live");
        assert!(model.loading.is_some());
        assert!(v.claim_returns().is_ok());
        assert!(v.force_end().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn polling_updates_snapshot() {
        let gw = gateway();
        let v = view(gw.clone(), Arc::new(ManualClock::new(T - 100)));
        v.start_polling(Duration::from_secs(2));
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(v.snapshot().highest_bid, Some(U256::ZERO));

        *gw.highest_bid.lock() = Some(U256::from(7u64));
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(v.snapshot().highest_bid, Some(U256::from(7u64)));

        v.teardown();
        *gw.highest_bid.lock() = Some(U256::from(9u64));
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(v.snapshot().highest_bid, Some(U256::from(7u64)));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_poll_read_keeps_auction_expired() {
        let gw = gateway();
        *gw.deadline.lock() = Some(1_000);
        *gw.highest_bid.lock() = Some(U256::from(5u64));
        let v = view(gw.clone(), Arc::new(ManualClock::new(2_000)));
        v.start_polling(Duration::from_secs(2));
        tokio::time::sleep(Duration::from_millis(10)).await;
        let before = v.model();
        assert_eq!(before.badge, "Ended");
        assert!(before.bid.is_hidden());
        assert_eq!(before.highest_bid, "0.000000000000000005");

        *gw.deadline.lock() = None;
        *gw.highest_bid.lock() = None;
        tokio::time::sleep(Duration::from_secs(2)).await;
        let after = v.model();
        assert_eq!(after.badge, "Ended");
        assert!(after.bid.is_hidden());
        assert_eq!(after.highest_bid, "0.000000000000000005");
        assert!(v.missing_fields().is_empty());
        assert!(after.loading.is_none());
        v.teardown();
    }
}
