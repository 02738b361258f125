// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JSON-RPC gateway backed by an alloy HTTP provider.

use std::time::Duration;

use alloy::{
    network::Ethereum,
    primitives::{Address, TxHash, U256},
    providers::{
        fillers::{BlobGasFiller, ChainIdFiller, FillProvider, GasFiller, JoinFill, NonceFiller},
        Identity, Provider, ProviderBuilder, RootProvider,
    },
    rpc::types::{TransactionReceipt, TransactionRequest},
};
use async_trait::async_trait;

use super::erc20::IERC20;
use super::gateway::{ChainGateway, GatewayError, GatewayResult};
use super::types::{SignedTx, TxReceipt, TxRequest};

/// Default interval between receipt lookups.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// HTTP provider type (with all fillers).
type HttpProvider = FillProvider<
    JoinFill<
        Identity,
        JoinFill<GasFiller, JoinFill<BlobGasFiller, JoinFill<NonceFiller, ChainIdFiller>>>,
    >,
    RootProvider<Ethereum>,
>;

/// [`ChainGateway`] over JSON-RPC.
pub struct RpcGateway {
    provider: HttpProvider,
    poll_interval: Duration,
}

impl RpcGateway {
    /// Create a gateway for the given RPC endpoint.
    pub fn new(rpc_url: &str) -> Result<Self, GatewayError> {
        let url: url::Url = rpc_url
            .parse()
            .map_err(|e: url::ParseError| GatewayError::InvalidRpcUrl(e.to_string()))?;

        let provider = ProviderBuilder::new().connect_http(url);

        Ok(Self {
            provider,
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    /// Override the receipt polling interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    async fn poll_receipt(&self, hash: TxHash) -> GatewayResult<TxReceipt> {
        loop {
            let receipt = self
                .provider
                .get_transaction_receipt(hash)
                .await
                .map_err(|e| GatewayError::Rpc(format!("Failed to get receipt: {}", e)))?;

            if let Some(receipt) = receipt {
                return Ok(convert_receipt(receipt));
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

fn rpc_error(e: impl std::fmt::Display) -> GatewayError {
    GatewayError::Rpc(e.to_string())
}

fn contract_error(e: impl std::fmt::Display) -> GatewayError {
    GatewayError::Contract(e.to_string())
}

fn convert_receipt(receipt: TransactionReceipt) -> TxReceipt {
    let raw = serde_json::to_value(&receipt).unwrap_or(serde_json::Value::Null);
    TxReceipt {
        tx_hash: receipt.transaction_hash,
        status: Some(u64::from(receipt.status())),
        block_number: receipt.block_number,
        gas_used: receipt.gas_used as u64,
        raw,
    }
}

fn to_rpc_request(request: &TxRequest) -> TransactionRequest {
    let mut tx = TransactionRequest::default()
        .from(request.from)
        .to(request.to)
        .value(request.value)
        .input(request.data.clone().into())
        .nonce(request.nonce)
        .gas_price(request.gas_price);
    if let Some(limit) = request.gas_limit {
        tx = tx.gas_limit(limit);
    }
    tx
}

#[async_trait]
impl ChainGateway for RpcGateway {
    async fn balance(&self, address: Address) -> GatewayResult<U256> {
        self.provider.get_balance(address).await.map_err(rpc_error)
    }

    async fn token_balance(&self, token: Address, owner: Address) -> GatewayResult<U256> {
        IERC20::new(token, self.provider.clone())
            .balanceOf(owner)
            .call()
            .await
            .map_err(contract_error)
    }

    async fn allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> GatewayResult<U256> {
        IERC20::new(token, self.provider.clone())
            .allowance(owner, spender)
            .call()
            .await
            .map_err(contract_error)
    }

    async fn token_symbol(&self, token: Address) -> GatewayResult<String> {
        IERC20::new(token, self.provider.clone())
            .symbol()
            .call()
            .await
            .map_err(contract_error)
    }

    async fn token_decimals(&self, token: Address) -> GatewayResult<u8> {
        IERC20::new(token, self.provider.clone())
            .decimals()
            .call()
            .await
            .map_err(contract_error)
    }

    async fn gas_price(&self) -> GatewayResult<u128> {
        self.provider.get_gas_price().await.map_err(rpc_error)
    }

    async fn nonce(&self, address: Address) -> GatewayResult<u64> {
        self.provider
            .get_transaction_count(address)
            .pending()
            .await
            .map_err(rpc_error)
    }

    async fn chain_id(&self) -> GatewayResult<u64> {
        self.provider.get_chain_id().await.map_err(rpc_error)
    }

    async fn estimate_gas(&self, request: &TxRequest) -> GatewayResult<u64> {
        self.provider
            .estimate_gas(to_rpc_request(request))
            .await
            .map_err(|e| GatewayError::Estimation(e.to_string()))
    }

    async fn send_signed(&self, tx: &SignedTx) -> GatewayResult<TxHash> {
        let pending = self
            .provider
            .send_raw_transaction(&tx.encoded)
            .await
            .map_err(|e| GatewayError::Broadcast(e.to_string()))?;
        Ok(*pending.tx_hash())
    }

    async fn wait_for_receipt(
        &self,
        hash: TxHash,
        timeout: Duration,
    ) -> GatewayResult<Option<TxReceipt>> {
        match tokio::time::timeout(timeout, self.poll_receipt(hash)).await {
            Ok(result) => result.map(Some),
            Err(_) => Ok(None),
        }
    }
}
