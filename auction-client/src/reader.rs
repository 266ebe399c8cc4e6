use auction_core::{ChainGateway, ClientError, CollectionId, ListSnapshot, Metrics};
use std::sync::Arc;
use tracing::{info, warn};

/// Reads the factory's auction list in one shot.
pub struct RemoteCollectionReader<G: ChainGateway + 'static> {
    gateway: Arc<G>,
    collection: CollectionId,
    metrics: Arc<Metrics>,
}

impl<G: ChainGateway + 'static> RemoteCollectionReader<G> {
    pub fn new(gateway: Arc<G>, collection: CollectionId, metrics: Arc<Metrics>) -> Self {
        Self {
            gateway,
            collection,
            metrics,
        }
    }

    pub fn collection(&self) -> &CollectionId {
        &self.collection
    }

    /// No retry here; the user refreshes manually.
    pub async fn read(&self) -> Result<ListSnapshot, ClientError> {
        self.metrics.list_reads.inc();
        match self.gateway.read_collection(&self.collection).await {
            Ok(items) => {
                info!(
                    target: "reader",
                    collection = %self.collection,
                    count = items.len(),
                    "collection loaded"
                );
                Ok(ListSnapshot::new(items))
            }
            Err(err) => {
                self.metrics.list_read_failures.inc();
                warn!(target: "reader", collection = %self.collection, ?err, "collection read failed");
                Err(ClientError::ListUnavailable(format!("{:#}", err)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockGateway;

    #[tokio::test]
    async fn failure_maps_to_list_unavailable() {
        let gw = Arc::new(MockGateway::default());
        let metrics = Metrics::detached().unwrap();
        let reader = RemoteCollectionReader::new(gw.clone(), "0xfactory".into(), metrics.clone());
        let err = reader.read().await.unwrap_err();
        assert!(matches!(err, ClientError::ListUnavailable(_)));
        assert_eq!(metrics.list_read_failures.get(), 1);
        assert_eq!(*gw.collection_reads.lock(), 1);
    }

    #[tokio::test]
    async fn success_keeps_creation_order() {
        let gw = Arc::new(MockGateway::with_items(3));
        let reader =
            RemoteCollectionReader::new(gw, "0xfactory".into(), Metrics::detached().unwrap());
        let snap = reader.read().await.unwrap();
        assert_eq!(snap.len(), 3);
        assert_eq!(snap.items()[0], crate::mock::item_id(0));
    }
}
