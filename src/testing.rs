// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory chain used by unit tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use alloy::json_abi::JsonAbi;
use alloy::primitives::{address, Address, TxHash, U256};
use async_trait::async_trait;

use crate::blockchain::{
    ChainGateway, GatewayError, GatewayResult, SignedTx, TxReceipt, TxRequest,
};

/// Anvil default accounts #0, #1 and #2.
pub const KEY_A: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const KEY_B: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";
pub const KEY_C: &str = "0x5de4111afa1a4b94908f83103eb1f1706367c2e68ca870fc3fb9a804cdab365a";

pub const TOKEN: Address = address!("0xaf88d065e77c8cC2239327C5EDb3A432268e5831");
pub const OTHER_TOKEN: Address = address!("0xFd086bC7CD5C481DCC9C85ebE478A1C0b69FCbb9");
pub const ROUTER: Address = address!("0x9aEd3A8896A85FE9a8CAc52C9B402D092B629a30");
pub const RECIPIENT: Address = address!("0x70997970C51812dc3A010C7d01b50e0d17dc79C8");

pub const CHAIN_ID: u64 = 42161;

const ERC20_ABI_JSON: &str = r#"[
  {"type":"function","name":"symbol","inputs":[],"outputs":[{"name":"","type":"string","internalType":"string"}],"stateMutability":"view"},
  {"type":"function","name":"decimals","inputs":[],"outputs":[{"name":"","type":"uint8","internalType":"uint8"}],"stateMutability":"view"},
  {"type":"function","name":"balanceOf","inputs":[{"name":"account","type":"address","internalType":"address"}],"outputs":[{"name":"","type":"uint256","internalType":"uint256"}],"stateMutability":"view"},
  {"type":"function","name":"allowance","inputs":[{"name":"owner","type":"address","internalType":"address"},{"name":"spender","type":"address","internalType":"address"}],"outputs":[{"name":"","type":"uint256","internalType":"uint256"}],"stateMutability":"view"},
  {"type":"function","name":"approve","inputs":[{"name":"spender","type":"address","internalType":"address"},{"name":"amount","type":"uint256","internalType":"uint256"}],"outputs":[{"name":"","type":"bool","internalType":"bool"}],"stateMutability":"nonpayable"},
  {"type":"function","name":"transfer","inputs":[{"name":"to","type":"address","internalType":"address"},{"name":"amount","type":"uint256","internalType":"uint256"}],"outputs":[{"name":"","type":"bool","internalType":"bool"}],"stateMutability":"nonpayable"}
]"#;

/// Minimal ERC-20 ABI.
pub fn erc20_abi() -> JsonAbi {
    serde_json::from_str(ERC20_ABI_JSON).expect("static ABI parses")
}

pub fn erc20_abi_json() -> &'static str {
    ERC20_ABI_JSON
}

/// Gateway call counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallStats {
    pub reads: usize,
    pub estimates: usize,
    pub broadcasts: usize,
    pub receipts: usize,
}

impl CallStats {
    pub fn total(&self) -> usize {
        self.reads + self.estimates + self.broadcasts + self.receipts
    }
}

struct TokenMeta {
    symbol: String,
    decimals: u8,
}

struct MockState {
    balances: HashMap<Address, U256>,
    token_balances: HashMap<(Address, Address), U256>,
    allowances: HashMap<(Address, Address, Address), U256>,
    tokens: HashMap<Address, TokenMeta>,
    pending_nonces: HashMap<Address, u64>,
    gas_price: u128,
    receipt_status: Option<u64>,
    receipt_timeout: bool,
    fail_reads: bool,
    fail_estimate: bool,
    nonce_delay: Duration,
    sent: Vec<SignedTx>,
    estimated: Vec<TxRequest>,
    calls: CallStats,
}

/// [`ChainGateway`] over in-memory state.
///
/// `nonce` returns the number of transactions accepted so far for the
/// address, then yields before returning, so unsynchronized callers observe
/// stale nonces. `send_signed` rejects any nonce other than the next one.
pub struct MockGateway {
    state: Mutex<MockState>,
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGateway {
    pub fn new() -> Self {
        let mut tokens = HashMap::new();
        tokens.insert(
            TOKEN,
            TokenMeta {
                symbol: "USDC".to_string(),
                decimals: 6,
            },
        );
        tokens.insert(
            OTHER_TOKEN,
            TokenMeta {
                symbol: "USDT".to_string(),
                decimals: 6,
            },
        );

        Self {
            state: Mutex::new(MockState {
                balances: HashMap::new(),
                token_balances: HashMap::new(),
                allowances: HashMap::new(),
                tokens,
                pending_nonces: HashMap::new(),
                // 0.05 gwei
                gas_price: 50_000_000,
                receipt_status: Some(1),
                receipt_timeout: false,
                fail_reads: false,
                fail_estimate: false,
                nonce_delay: Duration::from_millis(2),
                sent: Vec::new(),
                estimated: Vec::new(),
                calls: CallStats::default(),
            }),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().expect("mock state poisoned")
    }

    pub fn set_balance(&self, owner: Address, wei: U256) {
        self.state().balances.insert(owner, wei);
    }

    pub fn set_token_balance(&self, token: Address, owner: Address, raw: U256) {
        self.state().token_balances.insert((token, owner), raw);
    }

    pub fn set_allowance(&self, token: Address, owner: Address, spender: Address, raw: U256) {
        self.state().allowances.insert((token, owner, spender), raw);
    }

    pub fn set_gas_price(&self, wei: u128) {
        self.state().gas_price = wei;
    }

    pub fn set_receipt_status(&self, status: Option<u64>) {
        self.state().receipt_status = status;
    }

    pub fn time_out_receipts(&self, timeout: bool) {
        self.state().receipt_timeout = timeout;
    }

    pub fn fail_reads(&self, fail: bool) {
        self.state().fail_reads = fail;
    }

    pub fn fail_estimate(&self, fail: bool) {
        self.state().fail_estimate = fail;
    }

    pub fn calls(&self) -> CallStats {
        self.state().calls
    }

    pub fn reset_calls(&self) {
        self.state().calls = CallStats::default();
    }

    /// Accepted transactions in broadcast order.
    pub fn sent(&self) -> Vec<SignedTx> {
        self.state().sent.clone()
    }

    pub fn estimated(&self) -> Vec<TxRequest> {
        self.state().estimated.clone()
    }

    fn read<T>(&self, f: impl FnOnce(&MockState) -> T) -> GatewayResult<T> {
        let mut state = self.state();
        state.calls.reads += 1;
        if state.fail_reads {
            return Err(GatewayError::Rpc("connection refused".to_string()));
        }
        Ok(f(&state))
    }

    fn token_meta<T>(&self, token: Address, f: impl FnOnce(&TokenMeta) -> T) -> GatewayResult<T> {
        self.read(|state| state.tokens.get(&token).map(f))?
            .ok_or_else(|| GatewayError::Contract(format!("no contract at {token}")))
    }
}

#[async_trait]
impl ChainGateway for MockGateway {
    async fn balance(&self, address: Address) -> GatewayResult<U256> {
        self.read(|state| state.balances.get(&address).copied().unwrap_or_default())
    }

    async fn token_balance(&self, token: Address, owner: Address) -> GatewayResult<U256> {
        self.read(|state| {
            state
                .token_balances
                .get(&(token, owner))
                .copied()
                .unwrap_or_default()
        })
    }

    async fn allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> GatewayResult<U256> {
        self.read(|state| {
            state
                .allowances
                .get(&(token, owner, spender))
                .copied()
                .unwrap_or_default()
        })
    }

    async fn token_symbol(&self, token: Address) -> GatewayResult<String> {
        self.token_meta(token, |meta| meta.symbol.clone())
    }

    async fn token_decimals(&self, token: Address) -> GatewayResult<u8> {
        self.token_meta(token, |meta| meta.decimals)
    }

    async fn gas_price(&self) -> GatewayResult<u128> {
        self.read(|state| state.gas_price)
    }

    async fn nonce(&self, address: Address) -> GatewayResult<u64> {
        let (nonce, delay) = self.read(|state| {
            (
                state.pending_nonces.get(&address).copied().unwrap_or(0),
                state.nonce_delay,
            )
        })?;
        tokio::time::sleep(delay).await;
        Ok(nonce)
    }

    async fn chain_id(&self) -> GatewayResult<u64> {
        self.read(|_| CHAIN_ID)
    }

    async fn estimate_gas(&self, request: &TxRequest) -> GatewayResult<u64> {
        let mut state = self.state();
        state.calls.estimates += 1;
        if state.fail_estimate {
            return Err(GatewayError::Estimation("execution reverted".to_string()));
        }
        state.estimated.push(request.clone());
        Ok(if request.data.is_empty() { 21_000 } else { 65_000 })
    }

    async fn send_signed(&self, tx: &SignedTx) -> GatewayResult<TxHash> {
        let mut state = self.state();
        state.calls.broadcasts += 1;
        let expected = state.pending_nonces.get(&tx.sender).copied().unwrap_or(0);
        if tx.nonce != expected {
            return Err(GatewayError::Broadcast(format!(
                "nonce mismatch: expected {expected}, got {}",
                tx.nonce
            )));
        }
        state.pending_nonces.insert(tx.sender, expected + 1);
        state.sent.push(tx.clone());
        Ok(tx.hash)
    }

    async fn wait_for_receipt(
        &self,
        hash: TxHash,
        _timeout: Duration,
    ) -> GatewayResult<Option<TxReceipt>> {
        let mut state = self.state();
        state.calls.receipts += 1;
        if state.fail_reads {
            return Err(GatewayError::Rpc("connection refused".to_string()));
        }
        if state.receipt_timeout {
            return Ok(None);
        }
        Ok(Some(TxReceipt {
            tx_hash: hash,
            status: state.receipt_status,
            block_number: Some(1),
            gas_used: 21_000,
            raw: serde_json::json!({ "status": state.receipt_status }),
        }))
    }
}
