// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Blockchain types shared by the gateway and the engine.

use alloy::primitives::{Address, Bytes, TxHash, U256};
use serde::{Deserialize, Serialize};

/// Native coin metadata for a network (statically configured, never read
/// from chain).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    /// Coin symbol (e.g., "ETH", "AVAX")
    pub symbol: String,
    /// Number of decimals (18 on every EVM chain we target)
    pub decimals: u8,
}

impl NativeCurrency {
    pub fn new(symbol: impl Into<String>, decimals: u8) -> Self {
        Self {
            symbol: symbol.into(),
            decimals,
        }
    }
}

/// Fully-populated legacy transaction, ready to sign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRequest {
    /// Sender (the active identity's address)
    pub from: Address,
    /// Recipient or contract address
    pub to: Address,
    /// Call data (empty for plain transfers)
    pub data: Bytes,
    /// Native value in wei
    pub value: U256,
    pub chain_id: u64,
    pub nonce: u64,
    /// Gas price in wei
    pub gas_price: u128,
    /// Unset until estimation succeeds
    pub gas_limit: Option<u64>,
}

/// A signed transaction in EIP-2718 encoding, with the metadata the
/// engine already knows about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTx {
    pub sender: Address,
    pub nonce: u64,
    pub hash: TxHash,
    pub encoded: Bytes,
}

/// Receipt of a mined transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TxReceipt {
    /// Transaction hash
    pub tx_hash: TxHash,
    /// Status field as reported by the node (1 = success)
    pub status: Option<u64>,
    /// Block number where transaction was included
    pub block_number: Option<u64>,
    /// Gas actually used
    pub gas_used: u64,
    /// Unparsed receipt as returned by the node
    pub raw: serde_json::Value,
}

impl TxReceipt {
    /// Only an explicit status of 1 counts as success.
    pub fn succeeded(&self) -> bool {
        self.status == Some(1)
    }
}
