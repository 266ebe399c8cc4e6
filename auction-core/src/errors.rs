use crate::model::{ActionKind, ItemId};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("auction list unavailable: {0}")]
    ListUnavailable(String),

    #[error("auction {item} still loading: {missing:?}")]
    ItemReadIncomplete {
        item: ItemId,
        missing: Vec<&'static str>,
    },

    #[error("action rejected: {0}")]
    ActionRejected(String),

    #[error("network failure: {0}")]
    ActionNetworkFailure(String),

    #[error("{kind:?} already pending for {item}")]
    Busy { item: ItemId, kind: ActionKind },

    #[error("{0} is not available right now")]
    ActionUnavailable(ActionKind),

    #[error(transparent)]
    InvalidAmount(#[from] AmountError),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,

    #[error("amount is not a decimal number: {0}")]
    Malformed(String),

    #[error("amount has more than {max} decimal places")]
    TooPrecise { max: u8 },

    #[error("amount is too large")]
    Overflow,

    #[error("amount must be greater than zero")]
    Zero,
}
