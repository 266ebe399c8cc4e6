use prometheus::{IntCounter, IntGauge, Opts, Registry};
use std::sync::Arc;

#[derive(Clone)]
pub struct Metrics {
    pub list_reads: IntCounter,
    pub list_read_failures: IntCounter,
    pub enrich_fetches: IntCounter,
    pub window_growths: IntCounter,
    pub actions_dispatched: IntCounter,
    pub actions_succeeded: IntCounter,
    pub actions_failed: IntCounter,
    pub actions_pending: IntGauge,
}

fn counter(registry: &Registry, name: &str, help: &str) -> prometheus::Result<IntCounter> {
    let c = IntCounter::with_opts(Opts::new(name, help))?;
    registry.register(Box::new(c.clone())).ok();
    Ok(c)
}

impl Metrics {
    pub fn new(registry: &Registry) -> prometheus::Result<Arc<Self>> {
        let actions_pending = IntGauge::with_opts(Opts::new(
            "auction_actions_pending",
            "Actions awaiting an outcome",
        ))?;
        registry.register(Box::new(actions_pending.clone())).ok();
        Ok(Arc::new(Self {
            list_reads: counter(registry, "auction_list_reads", "Collection reads")?,
            list_read_failures: counter(
                registry,
                "auction_list_read_failures",
                "Collection reads that failed",
            )?,
            enrich_fetches: counter(
                registry,
                "auction_enrich_fetches",
                "Per-card description fetches",
            )?,
            window_growths: counter(
                registry,
                "auction_window_growths",
                "Load-more steps applied to the list window",
            )?,
            actions_dispatched: counter(
                registry,
                "auction_actions_dispatched",
                "Actions sent to the chain",
            )?,
            actions_succeeded: counter(registry, "auction_actions_succeeded", "Actions succeeded")?,
            actions_failed: counter(registry, "auction_actions_failed", "Actions failed")?,
            actions_pending,
        }))
    }

    /// Metrics on a private registry.
    pub fn detached() -> prometheus::Result<Arc<Self>> {
        Self::new(&Registry::new())
    }
}
