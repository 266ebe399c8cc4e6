//! Contract interfaces of the auction factory and its instances.

use alloy_primitives::{hex, Address, U256};
use alloy_sol_types::{sol, SolCall};
use anyhow::{Context, Result};
use auction_core::{ActionKind, CreateAuctionRequest};
use std::str::FromStr;

sol! {
    interface IAuctionFactory {
        function getAuctions() external view returns (address[] auctions);
        function createAuction(
            string description,
            uint256 serviceChargeRatio,
            uint256 biddingTime,
            address beneficiary
        ) external;
    }

    interface IAuction {
        function description() external view returns (string text);
        function highestBid() external view returns (uint256 amount);
        function auctionEndTime() external view returns (uint256 endTime);
        function bid() external payable;
        function claimReturns() external;
        function auctionEnd() external;
        function forceEndAuction() external;
    }
}

pub fn get_auctions() -> Vec<u8> {
    IAuctionFactory::getAuctionsCall {}.abi_encode()
}

pub fn decode_auctions(data: &[u8]) -> Result<Vec<Address>> {
    let ret = IAuctionFactory::getAuctionsCall::abi_decode_returns(data, true)
        .context("decode getAuctions")?;
    Ok(ret.auctions)
}

pub fn description() -> Vec<u8> {
    IAuction::descriptionCall {}.abi_encode()
}

pub fn decode_description(data: &[u8]) -> Result<String> {
    let ret = IAuction::descriptionCall::abi_decode_returns(data, true)
        .context("decode description")?;
    Ok(ret.text)
}

pub fn highest_bid() -> Vec<u8> {
    IAuction::highestBidCall {}.abi_encode()
}

pub fn decode_highest_bid(data: &[u8]) -> Result<U256> {
    let ret = IAuction::highestBidCall::abi_decode_returns(data, true)
        .context("decode highestBid")?;
    Ok(ret.amount)
}

pub fn auction_end_time() -> Vec<u8> {
    IAuction::auctionEndTimeCall {}.abi_encode()
}

pub fn decode_auction_end_time(data: &[u8]) -> Result<U256> {
    let ret = IAuction::auctionEndTimeCall::abi_decode_returns(data, true)
        .context("decode auctionEndTime")?;
    Ok(ret.endTime)
}

/// Calldata for one of the write actions. The bid value travels as the
/// transaction value, not as an argument.
pub fn action_call(kind: ActionKind) -> Vec<u8> {
    match kind {
        ActionKind::Bid => IAuction::bidCall {}.abi_encode(),
        ActionKind::ClaimReturns => IAuction::claimReturnsCall {}.abi_encode(),
        ActionKind::Settle => IAuction::auctionEndCall {}.abi_encode(),
        ActionKind::ForceEnd => IAuction::forceEndAuctionCall {}.abi_encode(),
    }
}

pub fn encode_create_auction(request: &CreateAuctionRequest) -> Result<Vec<u8>> {
    let beneficiary = Address::from_str(request.beneficiary.trim())
        .with_context(|| format!("invalid beneficiary address: {}", request.beneficiary))?;
    Ok(IAuctionFactory::createAuctionCall {
        description: request.description.clone(),
        serviceChargeRatio: U256::from(request.service_charge_ratio),
        biddingTime: U256::from(request.bidding_time_secs),
        beneficiary,
    }
    .abi_encode())
}

pub fn to_hex(data: &[u8]) -> String {
    hex::encode_prefixed(data)
}

pub fn from_hex(raw: &str) -> Result<Vec<u8>> {
    let stripped = raw.strip_prefix("0x").unwrap_or(raw);
    hex::decode(stripped).with_context(|| format!("invalid hex payload: {}", raw))
}
