//! Per (auction, action) run tracking around the gateway write.

use crate::rpc::GatewayError;
use auction_core::{
    ActionIntent, ActionKey, ActionKind, ActionRun, ChainGateway, ClientError, ItemId, Metrics,
};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use prometheus::IntGauge;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Invoked once per dispatched run with its terminal state.
pub type ActionCallback = Arc<dyn Fn(&ActionIntent, &ActionRun) + Send + Sync>;

/// Maps a gateway failure onto the client taxonomy.
pub fn classify_failure(err: &anyhow::Error) -> ClientError {
    let network = err
        .chain()
        .filter_map(|cause| cause.downcast_ref::<GatewayError>())
        .any(GatewayError::is_network);
    let message = format!("{:#}", err);
    if network {
        ClientError::ActionNetworkFailure(message)
    } else {
        ClientError::ActionRejected(message)
    }
}

struct PendingGuard(IntGauge);

impl PendingGuard {
    fn new(gauge: &IntGauge) -> Self {
        gauge.inc();
        Self(gauge.clone())
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.dec();
    }
}

pub struct ActionDispatcher<G: ChainGateway + 'static> {
    gateway: Arc<G>,
    runs: Arc<DashMap<ActionKey, ActionRun>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    closed: Arc<AtomicBool>,
    metrics: Arc<Metrics>,
}

impl<G: ChainGateway + 'static> ActionDispatcher<G> {
    pub fn new(gateway: Arc<G>, metrics: Arc<Metrics>) -> Self {
        Self {
            gateway,
            runs: Arc::new(DashMap::new()),
            tasks: Mutex::new(Vec::new()),
            closed: Arc::new(AtomicBool::new(false)),
            metrics,
        }
    }

    /// Starts the write for `intent`. A second intent for the same auction
    /// and kind is refused with [`ClientError::Busy`] while the first is
    /// pending; an unacknowledged terminal run is simply replaced.
    pub fn dispatch(
        &self,
        intent: ActionIntent,
        callback: ActionCallback,
    ) -> Result<ActionRun, ClientError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ClientError::ActionUnavailable(intent.kind));
        }
        let key = intent.key();
        let run = ActionRun::pending();
        match self.runs.entry(key.clone()) {
            Entry::Occupied(slot) if slot.get().is_pending() => {
                return Err(ClientError::Busy {
                    item: key.target,
                    kind: key.kind,
                });
            }
            Entry::Occupied(mut slot) => {
                slot.insert(run.clone());
            }
            Entry::Vacant(slot) => {
                slot.insert(run.clone());
            }
        }
        let run_id = run.run_id().unwrap_or_default().to_string();
        info!(
            target: "dispatcher",
            item = %intent.target,
            kind = ?intent.kind,
            run_id = %run_id,
            "action dispatched"
        );
        self.metrics.actions_dispatched.inc();

        let gateway = self.gateway.clone();
        let runs = self.runs.clone();
        let closed = self.closed.clone();
        let metrics = self.metrics.clone();
        let pending = PendingGuard::new(&metrics.actions_pending);
        let handle = tokio::spawn(async move {
            let result = gateway
                .write_action(&intent.target, intent.kind, intent.amount)
                .await;
            drop(pending);
            let next = match result {
                Ok(receipt) => {
                    metrics.actions_succeeded.inc();
                    info!(
                        target: "dispatcher",
                        item = %intent.target,
                        kind = ?intent.kind,
                        tx = %receipt.tx_hash,
                        "action confirmed"
                    );
                    ActionRun::Succeeded { run_id, receipt }
                }
                Err(err) => {
                    metrics.actions_failed.inc();
                    let failure = classify_failure(&err);
                    warn!(
                        target: "dispatcher",
                        item = %intent.target,
                        kind = ?intent.kind,
                        error = %failure,
                        "action failed"
                    );
                    ActionRun::Failed {
                        run_id,
                        message: failure.to_string(),
                    }
                }
            };
            if closed.load(Ordering::SeqCst) {
                return;
            }
            {
                let Some(mut current) = runs.get_mut(&key) else {
                    return;
                };
                if current.run_id() != next.run_id() {
                    return;
                }
                *current = next.clone();
            }
            (callback)(&intent, &next);
        });

        let mut tasks = self.tasks.lock();
        tasks.retain(|h| !h.is_finished());
        tasks.push(handle);
        Ok(run)
    }

    pub fn run(&self, target: &str, kind: ActionKind) -> ActionRun {
        self.runs
            .get(&ActionKey::new(target, kind))
            .map(|r| r.value().clone())
            .unwrap_or_default()
    }

    pub fn is_pending(&self, target: &str, kind: ActionKind) -> bool {
        self.run(target, kind).is_pending()
    }

    /// Returns a terminal run to Idle. Pending runs are left alone.
    pub fn acknowledge(&self, target: &str, kind: ActionKind) -> bool {
        self.runs
            .remove_if(&ActionKey::new(target, kind), |_, run| run.is_terminal())
            .is_some()
    }

    pub fn runs_for(&self, target: &ItemId) -> Vec<(ActionKind, ActionRun)> {
        ActionKind::ALL
            .iter()
            .map(|kind| (*kind, self.run(target, *kind)))
            .filter(|(_, run)| *run != ActionRun::Idle)
            .collect()
    }

    /// Aborts outstanding writes' completions; no callback fires afterwards.
    pub fn teardown(&self) {
        self.closed.store(true, Ordering::SeqCst);
        for handle in self.tasks.lock().drain(..) {
            handle.abort();
        }
    }
}

impl<G: ChainGateway + 'static> Drop for ActionDispatcher<G> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{item_id, MockGateway};
    use auction_core::U256;
    use std::time::Duration;

    fn dispatcher(gw: Arc<MockGateway>) -> (ActionDispatcher<MockGateway>, Arc<Metrics>) {
        let metrics = Metrics::detached().unwrap();
        (ActionDispatcher::new(gw, metrics.clone()), metrics)
    }

    fn recorder() -> (ActionCallback, Arc<Mutex<Vec<ActionRun>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let cb: ActionCallback = Arc::new(move |_intent: &ActionIntent, run: &ActionRun| {
            sink.lock().push(run.clone())
        });
        (cb, seen)
    }

    #[tokio::test(start_paused = true)]
    async fn second_dispatch_while_pending_is_busy() {
        let gw = Arc::new(MockGateway::default());
        *gw.write_delay.lock() = Duration::from_secs(1);
        let (d, metrics) = dispatcher(gw.clone());
        let id = item_id(0);
        let (cb, seen) = recorder();

        let first = d.dispatch(ActionIntent::settle(id.clone()), cb.clone()).unwrap();
        assert!(first.is_pending());
        assert_eq!(metrics.actions_pending.get(), 1);

        let err = d.dispatch(ActionIntent::settle(id.clone()), cb.clone()).unwrap_err();
        assert_eq!(
            err,
            ClientError::Busy {
                item: id.clone(),
                kind: ActionKind::Settle
            }
        );
        assert_eq!(d.run(&id, ActionKind::Settle), first, "existing run untouched");

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(matches!(d.run(&id, ActionKind::Settle), ActionRun::Succeeded { .. }));
        assert_eq!(seen.lock().len(), 1);
        assert_eq!(gw.writes.lock().len(), 1);
        assert_eq!(metrics.actions_pending.get(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn distinct_kinds_run_concurrently() {
        let gw = Arc::new(MockGateway::default());
        *gw.write_delay.lock() = Duration::from_secs(1);
        let (d, _) = dispatcher(gw.clone());
        let id = item_id(0);
        let (cb, _) = recorder();

        d.dispatch(ActionIntent::bid(id.clone(), U256::from(1u64)), cb.clone())
            .unwrap();
        d.dispatch(ActionIntent::claim_returns(id.clone()), cb.clone())
            .unwrap();
        d.dispatch(ActionIntent::settle(item_id(1)), cb.clone())
            .unwrap();
        assert!(d.is_pending(&id, ActionKind::Bid));
        assert!(d.is_pending(&id, ActionKind::ClaimReturns));
        assert!(d.is_pending(&item_id(1), ActionKind::Settle));
    }

    #[tokio::test(start_paused = true)]
    async fn failure_is_recorded_and_acknowledged() {
        let gw = Arc::new(MockGateway::default());
        gw.fail_next_write("execution reverted: auction already ended");
        let (d, metrics) = dispatcher(gw.clone());
        let id = item_id(0);
        let (cb, seen) = recorder();

        d.dispatch(ActionIntent::force_end(id.clone()), cb).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        let run = d.run(&id, ActionKind::ForceEnd);
        match &run {
            ActionRun::Failed { message, .. } => {
                assert!(message.starts_with("action rejected"), "{message}");
                assert!(message.contains("already ended"));
            }
            other => panic!("unexpected run {other:?}"),
        }
        assert_eq!(seen.lock().as_slice(), &[run]);
        assert_eq!(metrics.actions_failed.get(), 1);

        assert!(d.acknowledge(&id, ActionKind::ForceEnd));
        assert_eq!(d.run(&id, ActionKind::ForceEnd), ActionRun::Idle);
        assert!(!d.acknowledge(&id, ActionKind::ForceEnd));
    }

    #[tokio::test(start_paused = true)]
    async fn transport_failure_is_classified_as_network() {
        let gw = Arc::new(MockGateway::default());
        gw.fail_next_write("timeout waiting for receipt");
        let (d, _) = dispatcher(gw);
        let id = item_id(0);
        let (cb, _) = recorder();
        d.dispatch(ActionIntent::claim_returns(id.clone()), cb).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        match d.run(&id, ActionKind::ClaimReturns) {
            ActionRun::Failed { message, .. } => assert!(message.starts_with("network failure")),
            other => panic!("unexpected run {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn acknowledge_leaves_pending_runs() {
        let gw = Arc::new(MockGateway::default());
        *gw.write_delay.lock() = Duration::from_secs(1);
        let (d, _) = dispatcher(gw);
        let id = item_id(0);
        let (cb, _) = recorder();
        d.dispatch(ActionIntent::settle(id.clone()), cb).unwrap();
        assert!(!d.acknowledge(&id, ActionKind::Settle));
        assert!(d.is_pending(&id, ActionKind::Settle));
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_suppresses_callbacks() {
        let gw = Arc::new(MockGateway::default());
        *gw.write_delay.lock() = Duration::from_secs(1);
        let (d, metrics) = dispatcher(gw);
        let id = item_id(0);
        let (cb, seen) = recorder();
        d.dispatch(ActionIntent::settle(id.clone()), cb.clone()).unwrap();
        d.teardown();
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(seen.lock().is_empty());
        assert_eq!(metrics.actions_pending.get(), 0);
        assert!(matches!(
            d.dispatch(ActionIntent::settle(id), cb),
            Err(ClientError::ActionUnavailable(ActionKind::Settle))
        ));
    }

    #[test]
    fn classifies_by_gateway_error() {
        let rpc: anyhow::Error = GatewayError::Rpc {
            code: -32000,
            message: "insufficient funds".into(),
        }
        .into();
        assert!(matches!(classify_failure(&rpc), ClientError::ActionRejected(_)));

        let timeout = anyhow::Error::from(GatewayError::ReceiptTimeout("0xabc".into()))
            .context("bid on 0x01");
        assert!(matches!(
            classify_failure(&timeout),
            ClientError::ActionNetworkFailure(_)
        ));
    }
}
