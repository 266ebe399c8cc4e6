//! "New auction" form: field state, validation and submission through the
//! factory.

use alloy_primitives::Address;
use auction_core::{
    ActionReceipt, ChainGateway, CollectionId, CreateAuctionRequest, NavigationHost,
};
use parking_lot::Mutex;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Bidding periods offered by the form, in seconds.
pub const DURATIONS: [(u64, &str); 4] = [
    (600, "10 minutes"),
    (3_600, "1 hour"),
    (86_400, "24 hours"),
    (604_800, "7 days"),
];

pub const DEFAULT_DURATION: usize = 1;

/// Passed as the factory's service charge argument on every creation.
pub const SERVICE_CHARGE_RATIO: u64 = 100;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormError {
    #[error("description is required")]
    EmptyDescription,

    #[error("beneficiary is required")]
    EmptyBeneficiary,

    #[error("beneficiary is not an address: {0}")]
    InvalidBeneficiary(String),

    #[error("a submission is already in progress")]
    Pending,

    #[error("could not create auction: {0}")]
    Submit(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormFields {
    pub description: String,
    pub beneficiary: String,
    pub duration: usize,
}

impl Default for FormFields {
    fn default() -> Self {
        Self {
            description: String::new(),
            beneficiary: String::new(),
            duration: DEFAULT_DURATION,
        }
    }
}

impl FormFields {
    pub fn duration_secs(&self) -> u64 {
        DURATIONS[self.duration.min(DURATIONS.len() - 1)].0
    }

    pub fn duration_label(&self) -> &'static str {
        DURATIONS[self.duration.min(DURATIONS.len() - 1)].1
    }

    pub fn validate(&self) -> Result<CreateAuctionRequest, FormError> {
        let description = self.description.trim();
        if description.is_empty() {
            return Err(FormError::EmptyDescription);
        }
        let beneficiary = self.beneficiary.trim();
        if beneficiary.is_empty() {
            return Err(FormError::EmptyBeneficiary);
        }
        let address = Address::from_str(beneficiary)
            .map_err(|_| FormError::InvalidBeneficiary(beneficiary.to_string()))?;
        Ok(CreateAuctionRequest {
            description: description.to_string(),
            service_charge_ratio: SERVICE_CHARGE_RATIO,
            bidding_time_secs: self.duration_secs(),
            beneficiary: address.to_checksum(None),
        })
    }
}

pub struct CreateForm<G: ChainGateway + 'static> {
    gateway: Arc<G>,
    collection: CollectionId,
    account: String,
    navigation: Arc<dyn NavigationHost>,
    fields: Mutex<FormFields>,
    pending: AtomicBool,
    last_error: Mutex<Option<String>>,
}

impl<G: ChainGateway + 'static> CreateForm<G> {
    pub fn new(
        gateway: Arc<G>,
        collection: CollectionId,
        account: String,
        navigation: Arc<dyn NavigationHost>,
    ) -> Self {
        Self {
            gateway,
            collection,
            account,
            navigation,
            fields: Mutex::new(FormFields::default()),
            pending: AtomicBool::new(false),
            last_error: Mutex::new(None),
        }
    }

    pub fn fields(&self) -> FormFields {
        self.fields.lock().clone()
    }

    pub fn edit<F: FnOnce(&mut FormFields)>(&self, edit: F) {
        edit(&mut self.fields.lock());
    }

    pub fn next_duration(&self) {
        let mut fields = self.fields.lock();
        fields.duration = (fields.duration + 1) % DURATIONS.len();
    }

    /// Fills the beneficiary with the account that signs our transactions.
    pub fn use_my_address(&self) {
        self.fields.lock().beneficiary = self.account.clone();
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::SeqCst)
    }

    pub fn can_submit(&self) -> bool {
        !self.is_pending() && self.fields().validate().is_ok()
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().clone()
    }

    /// Deploys the auction and returns to the listing. On failure the fields
    /// are kept so the user can resubmit.
    pub async fn submit(&self) -> Result<ActionReceipt, FormError> {
        let request = self.fields().validate()?;
        if self.pending.swap(true, Ordering::SeqCst) {
            return Err(FormError::Pending);
        }
        let result = self.gateway.create_member(&self.collection, &request).await;
        self.pending.store(false, Ordering::SeqCst);
        match result {
            Ok(receipt) => {
                info!(
                    target: "create",
                    tx = %receipt.tx_hash,
                    duration = request.bidding_time_secs,
                    "auction created"
                );
                *self.fields.lock() = FormFields::default();
                self.last_error.lock().take();
                self.navigation.open_listing();
                Ok(receipt)
            }
            Err(err) => {
                warn!(target: "create", ?err, "auction creation failed");
                let failure = FormError::Submit(format!("{:#}", err));
                *self.last_error.lock() = Some(failure.to_string());
                Err(failure)
            }
        }
    }
}
