use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Unix timestamp in seconds, as reported by the chain.
pub type TimestampSecs = i64;

/// Factory contract that owns the auction list.
pub type CollectionId = String;

/// Address of one auction instance.
pub type ItemId = String;

/// Identifier list read atomically from the factory, in creation order.
///
/// Cloning is cheap; the ids are shared. A snapshot is never patched in place,
/// a refresh replaces it wholesale.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListSnapshot {
    items: Arc<[ItemId]>,
}

impl ListSnapshot {
    pub fn new(items: Vec<ItemId>) -> Self {
        Self {
            items: items.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Ids in creation order.
    pub fn items(&self) -> &[ItemId] {
        &self.items
    }

    /// The first `n` ids of the newest-first ordering.
    pub fn newest_first(&self, n: usize) -> Vec<ItemId> {
        self.items.iter().rev().take(n).cloned().collect()
    }
}

impl From<Vec<ItemId>> for ListSnapshot {
    fn from(items: Vec<ItemId>) -> Self {
        Self::new(items)
    }
}

/// Latest read of one auction. Fields resolve independently; `None` means
/// "still loading", never "zero".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionSnapshot {
    pub description: Option<String>,
    pub highest_bid: Option<U256>,
    pub deadline: Option<TimestampSecs>,
}

impl AuctionSnapshot {
    pub fn is_complete(&self) -> bool {
        self.description.is_some() && self.highest_bid.is_some() && self.deadline.is_some()
    }

    /// Folds a fresh read into this snapshot. Fields the read resolved are
    /// overwritten; a failed read keeps the last resolved value.
    pub fn merge(&mut self, fresh: AuctionSnapshot) {
        if let Some(description) = fresh.description {
            self.description = Some(description);
        }
        if let Some(highest_bid) = fresh.highest_bid {
            self.highest_bid = Some(highest_bid);
        }
        if let Some(deadline) = fresh.deadline {
            self.deadline = Some(deadline);
        }
    }

    /// Names of the fields that have not resolved yet.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if self.description.is_none() {
            out.push("description");
        }
        if self.highest_bid.is_none() {
            out.push("highest_bid");
        }
        if self.deadline.is_none() {
            out.push("deadline");
        }
        out
    }
}

/// Per-card lazy display attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Enrichment {
    #[default]
    NotRequested,
    Loading,
    Loaded(Option<String>),
}

impl Enrichment {
    pub fn is_requested(&self) -> bool {
        !matches!(self, Enrichment::NotRequested)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Bid,
    ClaimReturns,
    Settle,
    ForceEnd,
}

impl ActionKind {
    pub const ALL: [ActionKind; 4] = [
        ActionKind::Bid,
        ActionKind::ClaimReturns,
        ActionKind::Settle,
        ActionKind::ForceEnd,
    ];

    /// Contract method invoked for this action.
    pub fn method(self) -> &'static str {
        match self {
            ActionKind::Bid => "bid",
            ActionKind::ClaimReturns => "claimReturns",
            ActionKind::Settle => "auctionEnd",
            ActionKind::ForceEnd => "forceEndAuction",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ActionKind::Bid => "Place bid",
            ActionKind::ClaimReturns => "Withdraw funds",
            ActionKind::Settle => "Settle auction",
            ActionKind::ForceEnd => "Force end",
        }
    }

    pub fn is_payable(self) -> bool {
        matches!(self, ActionKind::Bid)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A user request to change one auction's state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionIntent {
    pub kind: ActionKind,
    pub target: ItemId,
    /// Wei attached to the call; only bids carry a value.
    pub amount: Option<U256>,
}

impl ActionIntent {
    pub fn bid(target: impl Into<ItemId>, amount: U256) -> Self {
        Self {
            kind: ActionKind::Bid,
            target: target.into(),
            amount: Some(amount),
        }
    }

    pub fn claim_returns(target: impl Into<ItemId>) -> Self {
        Self::unpaid(ActionKind::ClaimReturns, target)
    }

    pub fn settle(target: impl Into<ItemId>) -> Self {
        Self::unpaid(ActionKind::Settle, target)
    }

    pub fn force_end(target: impl Into<ItemId>) -> Self {
        Self::unpaid(ActionKind::ForceEnd, target)
    }

    fn unpaid(kind: ActionKind, target: impl Into<ItemId>) -> Self {
        Self {
            kind,
            target: target.into(),
            amount: None,
        }
    }

    pub fn key(&self) -> ActionKey {
        ActionKey {
            target: self.target.clone(),
            kind: self.kind,
        }
    }
}

/// At most one pending run exists per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActionKey {
    pub target: ItemId,
    pub kind: ActionKind,
}

impl ActionKey {
    pub fn new(target: impl Into<ItemId>, kind: ActionKind) -> Self {
        Self {
            target: target.into(),
            kind,
        }
    }
}

/// Tracked outcome of one dispatched action.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ActionRun {
    #[default]
    Idle,
    Pending {
        run_id: String,
    },
    Succeeded {
        run_id: String,
        receipt: ActionReceipt,
    },
    Failed {
        run_id: String,
        message: String,
    },
}

impl ActionRun {
    pub fn pending() -> Self {
        ActionRun::Pending {
            run_id: new_run_id(),
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, ActionRun::Pending { .. })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ActionRun::Succeeded { .. } | ActionRun::Failed { .. })
    }

    pub fn run_id(&self) -> Option<&str> {
        match self {
            ActionRun::Idle => None,
            ActionRun::Pending { run_id }
            | ActionRun::Succeeded { run_id, .. }
            | ActionRun::Failed { run_id, .. } => Some(run_id),
        }
    }
}

/// What the gateway reports for a mined write.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionReceipt {
    pub tx_hash: String,
    pub block_number: Option<u64>,
}

/// Arguments for deploying a new auction through the factory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateAuctionRequest {
    pub description: String,
    pub service_charge_ratio: u64,
    pub bidding_time_secs: u64,
    pub beneficiary: String,
}

pub fn new_run_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newest_first_reverses_and_truncates() {
        let snap = ListSnapshot::new(vec!["a".into(), "b".into(), "c".into()]);
        assert_eq!(snap.newest_first(2), vec!["c".to_string(), "b".to_string()]);
        assert_eq!(snap.newest_first(10).len(), 3);
        assert!(ListSnapshot::default().newest_first(5).is_empty());
    }

    #[test]
    fn partial_snapshot_reports_missing_fields() {
        let snap = AuctionSnapshot {
            description: Some("lamp".into()),
            ..Default::default()
        };
        assert!(!snap.is_complete());
        assert_eq!(snap.missing_fields(), vec!["highest_bid", "deadline"]);
    }

    #[test]
    fn merge_keeps_resolved_fields_on_failed_reads() {
        let mut snap = AuctionSnapshot {
            description: Some("lamp".into()),
            highest_bid: Some(U256::from(5u64)),
            deadline: Some(1_000),
        };
        snap.merge(AuctionSnapshot {
            highest_bid: Some(U256::from(8u64)),
            ..Default::default()
        });
        assert_eq!(snap.description.as_deref(), Some("lamp"));
        assert_eq!(snap.highest_bid, Some(U256::from(8u64)));
        assert_eq!(snap.deadline, Some(1_000));
    }

    #[test]
    fn intents_carry_value_only_for_bids() {
        let bid = ActionIntent::bid("0xabc", U256::from(5u64));
        assert_eq!(bid.amount, Some(U256::from(5u64)));
        assert!(bid.kind.is_payable());
        let settle = ActionIntent::settle("0xabc");
        assert_eq!(settle.amount, None);
        assert_eq!(settle.kind.method(), "auctionEnd");
        assert_eq!(settle.key(), ActionKey::new("0xabc", ActionKind::Settle));
    }

    #[test]
    fn run_states() {
        let run = ActionRun::pending();
        assert!(run.is_pending());
        assert!(!run.is_terminal());
        assert!(run.run_id().is_some());
        assert_eq!(ActionRun::default(), ActionRun::Idle);
    }

    #[test]
    fn unavailable_action_message_uses_label() {
        let err = crate::errors::ClientError::ActionUnavailable(ActionKind::Settle);
        assert_eq!(err.to_string(), "Settle auction is not available right now");
        assert_eq!(ActionKind::ForceEnd.to_string(), "Force end");
    }
}
