use crate::abi;
use crate::config::ClientConfig;
use alloy_primitives::U256;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use auction_core::{
    ActionKind, ActionReceipt, ChainGateway, CollectionId, CreateAuctionRequest, ItemId,
    TimestampSecs,
};
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("http {status}: {text}")]
    HttpStatus { status: StatusCode, text: String },

    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("transaction {0} reverted")]
    Reverted(String),

    #[error("no receipt for {0} before timeout")]
    ReceiptTimeout(String),

    #[error("unexpected rpc payload: {0}")]
    Decode(String),

    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),
}

impl GatewayError {
    /// Transport-level trouble, as opposed to the node or contract refusing.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            GatewayError::HttpStatus { .. } | GatewayError::ReceiptTimeout(_) | GatewayError::Reqwest(_)
        )
    }
}

/// Ethereum JSON-RPC implementation of [`ChainGateway`]. Writes go through
/// `eth_sendTransaction`, so the node must manage the sender's key.
pub struct JsonRpcGateway {
    client: reqwest::Client,
    url: String,
    from: String,
    receipt_poll: Duration,
    receipt_timeout: Duration,
    next_id: AtomicU64,
}

impl JsonRpcGateway {
    pub fn new(cfg: &ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(cfg.request_timeout())
            .build()
            .context("build reqwest client for json-rpc")?;
        Ok(Self {
            client,
            url: cfg.rpc.url.clone(),
            from: cfg.account.address.clone(),
            receipt_poll: Duration::from_millis(cfg.rpc.receipt_poll_ms.max(50)),
            receipt_timeout: Duration::from_millis(cfg.rpc.receipt_timeout_ms),
            next_id: AtomicU64::new(1),
        })
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, GatewayError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        let resp = self.client.post(&self.url).json(&body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(GatewayError::HttpStatus { status, text });
        }
        let payload: Value = resp.json().await?;
        parse_rpc_response(payload)
    }

    async fn eth_call(&self, to: &str, data: Vec<u8>) -> Result<Vec<u8>, GatewayError> {
        let params = json!([{ "to": to, "data": abi::to_hex(&data) }, "latest"]);
        let result = self.request("eth_call", params).await?;
        let raw = result
            .as_str()
            .ok_or_else(|| GatewayError::Decode(format!("eth_call result not a string: {}", result)))?;
        abi::from_hex(raw).map_err(|e| GatewayError::Decode(e.to_string()))
    }

    async fn send_transaction(
        &self,
        to: &str,
        data: Vec<u8>,
        value: Option<U256>,
    ) -> Result<String, GatewayError> {
        let mut tx = json!({
            "from": self.from,
            "to": to,
            "data": abi::to_hex(&data),
        });
        if let Some(value) = value {
            tx["value"] = Value::String(format!("0x{:x}", value));
        }
        let result = self.request("eth_sendTransaction", json!([tx])).await?;
        result
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| GatewayError::Decode(format!("tx hash not a string: {}", result)))
    }

    async fn wait_receipt(&self, tx_hash: &str) -> Result<ActionReceipt, GatewayError> {
        let deadline = Instant::now() + self.receipt_timeout;
        loop {
            let receipt = self
                .request("eth_getTransactionReceipt", json!([tx_hash]))
                .await?;
            if let Some(done) = parse_receipt(tx_hash, &receipt)? {
                return Ok(done);
            }
            if Instant::now() >= deadline {
                return Err(GatewayError::ReceiptTimeout(tx_hash.to_string()));
            }
            sleep(self.receipt_poll).await;
        }
    }

    async fn transact(&self, to: &str, data: Vec<u8>, value: Option<U256>) -> Result<ActionReceipt> {
        let tx_hash = self.send_transaction(to, data, value).await?;
        debug!(target: "rpc", %tx_hash, to, "transaction submitted");
        let receipt = self.wait_receipt(&tx_hash).await?;
        info!(
            target: "rpc",
            tx_hash = %receipt.tx_hash,
            block = ?receipt.block_number,
            "transaction mined"
        );
        Ok(receipt)
    }
}

/// Unwraps a JSON-RPC envelope into its `result`.
pub fn parse_rpc_response(payload: Value) -> Result<Value, GatewayError> {
    if let Some(err) = payload.get("error") {
        let code = err.get("code").and_then(Value::as_i64).unwrap_or(0);
        let message = err
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string();
        return Err(GatewayError::Rpc { code, message });
    }
    payload
        .get("result")
        .cloned()
        .ok_or_else(|| GatewayError::Decode(format!("missing result: {}", payload)))
}

/// `Ok(None)` while the transaction is not mined yet.
pub fn parse_receipt(tx_hash: &str, receipt: &Value) -> Result<Option<ActionReceipt>, GatewayError> {
    if receipt.is_null() {
        return Ok(None);
    }
    let status = receipt.get("status").and_then(Value::as_str).unwrap_or("0x1");
    if status == "0x0" {
        return Err(GatewayError::Reverted(tx_hash.to_string()));
    }
    let block_number = receipt
        .get("blockNumber")
        .and_then(Value::as_str)
        .and_then(|s| u64::from_str_radix(s.trim_start_matches("0x"), 16).ok());
    Ok(Some(ActionReceipt {
        tx_hash: tx_hash.to_string(),
        block_number,
    }))
}

#[async_trait]
impl ChainGateway for JsonRpcGateway {
    async fn read_collection(&self, collection: &CollectionId) -> Result<Vec<ItemId>> {
        let data = self
            .eth_call(collection, abi::get_auctions())
            .await?;
        let addresses = abi::decode_auctions(&data)?;
        Ok(addresses
            .into_iter()
            .map(|addr| addr.to_checksum(None))
            .collect())
    }

    async fn read_description(&self, item: &ItemId) -> Result<String> {
        let data = self.eth_call(item, abi::description()).await?;
        abi::decode_description(&data)
    }

    async fn read_highest_bid(&self, item: &ItemId) -> Result<U256> {
        let data = self.eth_call(item, abi::highest_bid()).await?;
        abi::decode_highest_bid(&data)
    }

    async fn read_deadline(&self, item: &ItemId) -> Result<TimestampSecs> {
        let data = self.eth_call(item, abi::auction_end_time()).await?;
        let raw = abi::decode_auction_end_time(&data)?;
        i64::try_from(raw).map_err(|_| anyhow!("auctionEndTime out of range: {}", raw))
    }

    async fn write_action(
        &self,
        item: &ItemId,
        kind: ActionKind,
        amount: Option<U256>,
    ) -> Result<ActionReceipt> {
        if amount.is_some() && !kind.is_payable() {
            warn!(target: "rpc", ?kind, "dropping value on non-payable call");
        }
        let value = if kind.is_payable() { amount } else { None };
        let data = abi::action_call(kind);
        self.transact(item, data, value).await
    }

    async fn create_member(
        &self,
        collection: &CollectionId,
        request: &CreateAuctionRequest,
    ) -> Result<ActionReceipt> {
        let data = abi::encode_create_auction(request)?;
        self.transact(collection, data, None).await
    }
}
