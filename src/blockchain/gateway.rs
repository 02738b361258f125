// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Abstract chain capabilities consumed by the engine.
//!
//! Every method is a single round trip to the node. Implementations must
//! not retry: retry policy belongs to the caller.

use std::time::Duration;

use alloy::primitives::{Address, TxHash, U256};
use async_trait::async_trait;

use super::types::{SignedTx, TxReceipt, TxRequest};

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Errors that can occur during blockchain operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("Invalid RPC URL: {0}")]
    InvalidRpcUrl(String),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Contract error: {0}")]
    Contract(String),

    #[error("Gas estimation rejected: {0}")]
    Estimation(String),

    #[error("Broadcast rejected: {0}")]
    Broadcast(String),
}

/// Read and write operations against an EVM node.
#[async_trait]
pub trait ChainGateway: Send + Sync {
    /// Native balance in wei.
    async fn balance(&self, address: Address) -> GatewayResult<U256>;

    /// ERC-20 `balanceOf`.
    async fn token_balance(&self, token: Address, owner: Address) -> GatewayResult<U256>;

    /// ERC-20 `allowance`.
    async fn allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> GatewayResult<U256>;

    /// ERC-20 `symbol`.
    async fn token_symbol(&self, token: Address) -> GatewayResult<String>;

    /// ERC-20 `decimals`.
    async fn token_decimals(&self, token: Address) -> GatewayResult<u8>;

    /// Current gas price in wei.
    async fn gas_price(&self) -> GatewayResult<u128>;

    /// Next nonce for `address`, pending transactions included.
    async fn nonce(&self, address: Address) -> GatewayResult<u64>;

    async fn chain_id(&self) -> GatewayResult<u64>;

    /// Gas limit the node expects `request` to consume.
    async fn estimate_gas(&self, request: &TxRequest) -> GatewayResult<u64>;

    /// Broadcast a signed transaction and return its hash.
    async fn send_signed(&self, tx: &SignedTx) -> GatewayResult<TxHash>;

    /// Wait for the receipt of `hash`. `Ok(None)` means the timeout elapsed
    /// before the transaction was mined.
    async fn wait_for_receipt(
        &self,
        hash: TxHash,
        timeout: Duration,
    ) -> GatewayResult<Option<TxReceipt>>;
}
