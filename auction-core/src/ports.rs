use crate::model::*;
use alloy_primitives::U256;
use async_trait::async_trait;

/// Read/write access to the auction factory and its instances.
#[async_trait]
pub trait ChainGateway: Send + Sync {
    async fn read_collection(&self, collection: &CollectionId) -> anyhow::Result<Vec<ItemId>>;

    async fn read_description(&self, item: &ItemId) -> anyhow::Result<String>;

    async fn read_highest_bid(&self, item: &ItemId) -> anyhow::Result<U256>;

    async fn read_deadline(&self, item: &ItemId) -> anyhow::Result<TimestampSecs>;

    /// Reads every field concurrently and keeps whatever resolved.
    async fn read_auction(&self, item: &ItemId) -> AuctionSnapshot {
        let (description, highest_bid, deadline) = futures::future::join3(
            self.read_description(item),
            self.read_highest_bid(item),
            self.read_deadline(item),
        )
        .await;
        AuctionSnapshot {
            description: description.ok(),
            highest_bid: highest_bid.ok(),
            deadline: deadline.ok(),
        }
    }

    async fn write_action(
        &self,
        item: &ItemId,
        kind: ActionKind,
        amount: Option<U256>,
    ) -> anyhow::Result<ActionReceipt>;

    async fn create_member(
        &self,
        collection: &CollectionId,
        request: &CreateAuctionRequest,
    ) -> anyhow::Result<ActionReceipt>;
}

/// Screen changes requested by the core. Implementations must not block.
pub trait NavigationHost: Send + Sync {
    fn open_detail(&self, item: &ItemId);
    fn open_create(&self);
    fn open_listing(&self);
}
