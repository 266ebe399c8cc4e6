//! Scripted in-memory chain used by the unit tests.

use crate::rpc::GatewayError;
use alloy_primitives::U256;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use auction_core::*;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

#[derive(Default)]
pub struct MockGateway {
    pub collection: Mutex<Option<Vec<ItemId>>>,
    pub collection_reads: Mutex<usize>,
    pub descriptions: Mutex<HashMap<ItemId, String>>,
    pub description_calls: Mutex<HashMap<ItemId, usize>>,
    pub description_delay: Mutex<Duration>,
    pub highest_bid: Mutex<Option<U256>>,
    pub deadline: Mutex<Option<TimestampSecs>>,
    pub write_delay: Mutex<Duration>,
    /// Outcomes consumed in order; an empty queue means success. Messages
    /// starting with `timeout` surface as transport failures.
    pub write_outcomes: Mutex<VecDeque<Result<(), String>>>,
    pub writes: Mutex<Vec<(ItemId, ActionKind, Option<U256>)>>,
    pub creates: Mutex<Vec<CreateAuctionRequest>>,
}

impl MockGateway {
    pub fn with_items(n: usize) -> Self {
        let gw = Self::default();
        *gw.collection.lock() = Some((0..n).map(item_id).collect());
        gw
    }

    pub fn description_calls(&self, item: &str) -> usize {
        self.description_calls.lock().get(item).copied().unwrap_or(0)
    }

    pub fn fail_next_write(&self, message: &str) {
        self.write_outcomes
            .lock()
            .push_back(Err(message.to_string()));
    }
}

pub fn item_id(i: usize) -> ItemId {
    format!("0x{:040x}", i + 1)
}

#[async_trait]
impl ChainGateway for MockGateway {
    async fn read_collection(&self, _collection: &CollectionId) -> Result<Vec<ItemId>> {
        *self.collection_reads.lock() += 1;
        self.collection
            .lock()
            .clone()
            .ok_or_else(|| anyhow!("connection refused"))
    }

    async fn read_description(&self, item: &ItemId) -> Result<String> {
        *self
            .description_calls
            .lock()
            .entry(item.clone())
            .or_default() += 1;
        let delay = *self.description_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.descriptions
            .lock()
            .get(item)
            .cloned()
            .ok_or_else(|| anyhow!("execution reverted"))
    }

    async fn read_highest_bid(&self, _item: &ItemId) -> Result<U256> {
        self.highest_bid.lock().ok_or_else(|| anyhow!("pending"))
    }

    async fn read_deadline(&self, _item: &ItemId) -> Result<TimestampSecs> {
        self.deadline.lock().ok_or_else(|| anyhow!("pending"))
    }

    async fn write_action(
        &self,
        item: &ItemId,
        kind: ActionKind,
        amount: Option<U256>,
    ) -> Result<ActionReceipt> {
        self.writes.lock().push((item.clone(), kind, amount));
        let delay = *self.write_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let outcome = self.write_outcomes.lock().pop_front().unwrap_or(Ok(()));
        match outcome {
            Ok(()) => {
                if let (ActionKind::Bid, Some(amount)) = (kind, amount) {
                    *self.highest_bid.lock() = Some(amount);
                }
                Ok(ActionReceipt {
                    tx_hash: format!("0xmock{}", self.writes.lock().len()),
                    block_number: Some(1),
                })
            }
            Err(message) if message.starts_with("timeout") => {
                Err(GatewayError::ReceiptTimeout(message).into())
            }
            Err(message) => Err(anyhow!(message)),
        }
    }

    async fn create_member(
        &self,
        _collection: &CollectionId,
        request: &CreateAuctionRequest,
    ) -> Result<ActionReceipt> {
        self.creates.lock().push(request.clone());
        let outcome = self.write_outcomes.lock().pop_front().unwrap_or(Ok(()));
        outcome.map_err(|message| anyhow!(message))?;
        Ok(ActionReceipt {
            tx_hash: "0xcreate".into(),
            block_number: Some(1),
        })
    }
}

/// Records navigation requests instead of switching screens.
#[derive(Default)]
pub struct RecordingNavigation {
    pub visits: Mutex<Vec<String>>,
}

impl NavigationHost for RecordingNavigation {
    fn open_detail(&self, item: &ItemId) {
        self.visits.lock().push(format!("detail:{}", item));
    }

    fn open_create(&self) {
        self.visits.lock().push("create".into());
    }

    fn open_listing(&self) {
        self.visits.lock().push("listing".into());
    }
}
