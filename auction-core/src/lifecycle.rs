//! Lifecycle phase and action gating for a single auction.
//!
//! Everything here is a pure function of the last snapshot, the clock reading
//! and the local bid input; nothing is persisted between ticks.

use crate::errors::AmountError;
use crate::model::{ActionKind, AuctionSnapshot, TimestampSecs};
use crate::units::parse_bid_amount;
use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecyclePhase {
    Open,
    Expired,
}

impl LifecyclePhase {
    /// `now == deadline` already counts as expired.
    pub fn at(deadline: TimestampSecs, now: TimestampSecs) -> Self {
        if now >= deadline {
            LifecyclePhase::Expired
        } else {
            LifecyclePhase::Open
        }
    }

    pub fn is_expired(self) -> bool {
        matches!(self, LifecyclePhase::Expired)
    }
}

/// Why the bid control is shown but not clickable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BidBlocker {
    EmptyAmount,
    InvalidAmount(AmountError),
    Pending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BidControl {
    Enabled(U256),
    Disabled(BidBlocker),
    /// Expired auctions do not render a bid form at all.
    Hidden,
}

impl BidControl {
    pub fn is_enabled(&self) -> bool {
        matches!(self, BidControl::Enabled(_))
    }

    pub fn is_hidden(&self) -> bool {
        matches!(self, BidControl::Hidden)
    }
}

/// Local inputs that gate the bid control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BidGate {
    pub amount: Result<U256, AmountError>,
    pub pending: bool,
}

impl BidGate {
    pub fn from_input(raw: &str, pending: bool) -> Self {
        Self {
            amount: parse_bid_amount(raw),
            pending,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowedActions {
    pub bid: BidControl,
    /// Settlement is always offered; it is emphasized once the deadline passes.
    pub settle_emphasized: bool,
    pub claim_returns: bool,
    pub force_end: bool,
}

impl AllowedActions {
    pub fn offers(&self, kind: ActionKind) -> bool {
        match kind {
            ActionKind::Bid => !self.bid.is_hidden(),
            ActionKind::ClaimReturns => self.claim_returns,
            ActionKind::Settle => true,
            ActionKind::ForceEnd => self.force_end,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    pub phase: LifecyclePhase,
    pub highest_bid: U256,
    pub allowed: AllowedActions,
}

/// Administrative actions (withdraw, force end) are never gated on the phase;
/// the contract rejects calls that are invalid for its state.
pub fn project(
    deadline: TimestampSecs,
    now: TimestampSecs,
    highest_bid: U256,
    gate: &BidGate,
) -> Projection {
    project_phase(LifecyclePhase::at(deadline, now), highest_bid, gate)
}

/// Same as [`project`] for a snapshot whose fields may still be loading.
/// An unknown deadline is treated as open and a missing bid as zero.
pub fn project_snapshot(snapshot: &AuctionSnapshot, now: TimestampSecs, gate: &BidGate) -> Projection {
    let phase = snapshot
        .deadline
        .map(|deadline| LifecyclePhase::at(deadline, now))
        .unwrap_or(LifecyclePhase::Open);
    project_phase(phase, snapshot.highest_bid.unwrap_or_default(), gate)
}

fn project_phase(phase: LifecyclePhase, highest_bid: U256, gate: &BidGate) -> Projection {
    let bid = match phase {
        LifecyclePhase::Expired => BidControl::Hidden,
        LifecyclePhase::Open if gate.pending => BidControl::Disabled(BidBlocker::Pending),
        LifecyclePhase::Open => match &gate.amount {
            Ok(amount) => BidControl::Enabled(*amount),
            Err(AmountError::Empty) => BidControl::Disabled(BidBlocker::EmptyAmount),
            Err(err) => BidControl::Disabled(BidBlocker::InvalidAmount(err.clone())),
        },
    };
    Projection {
        phase,
        highest_bid,
        allowed: AllowedActions {
            bid,
            settle_emphasized: phase.is_expired(),
            claim_returns: true,
            force_end: true,
        },
    }
}

/// Seconds left before the deadline, zero once expired.
pub fn remaining_secs(deadline: TimestampSecs, now: TimestampSecs) -> i64 {
    (deadline - now).max(0)
}
