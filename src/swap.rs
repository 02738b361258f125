// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Router swaps with oracle-derived minimum output.
//!
//! The minimum acceptable output is `rate * amount * (1 - slippage / 100)`,
//! where `rate` is the oracle's spot price of the source token in units of
//! the destination token. It is encoded into the router call; the engine
//! submits the call like any other.

use alloy::json_abi::JsonAbi;
use alloy::primitives::{Address, Bytes, U256};
use alloy::sol;
use alloy::sol_types::SolCall;
use rust_decimal::Decimal;
use tracing::info;

use crate::amount::{Amount, AmountError};
use crate::blockchain::ChainGateway;
use crate::config::{ConfigError, ContractDescriptor, NetworkSettings};
use crate::engine::{TokenTransfer, TransferOutcome};
use crate::error::{ClientError, ClientResult};
use crate::oracle::PriceOracle;
use crate::token::{TokenContext, TokenDescriptor};
use crate::wallet::WalletClient;

sol! {
    interface IWooRouter {
        function swap(
            address fromToken,
            address toToken,
            uint256 fromAmount,
            uint256 minToAmount,
            address to,
            address rebateTo
        ) external payable returns (uint256 realToAmount);
    }
}

/// Minimum output for swapping `amount` at `rate` with `slippage` percent
/// tolerance, in the destination token's precision.
pub fn estimate_min_out(
    rate: Decimal,
    amount: &Amount,
    dst_decimals: u8,
    slippage: Decimal,
) -> Result<Amount, AmountError> {
    if slippage.is_sign_negative() || slippage > Decimal::ONE_HUNDRED {
        return Err(AmountError::Slippage(slippage));
    }
    let keep = Decimal::ONE - slippage / Decimal::ONE_HUNDRED;
    let value = rate
        .checked_mul(amount.to_decimal()?)
        .and_then(|v| v.checked_mul(keep))
        .ok_or(AmountError::Overflow)?;
    Amount::from_display(value, dst_decimals)
}

/// A WOOFi-style swap router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapRouter {
    address: Address,
    native_token: Address,
}

impl SwapRouter {
    pub fn new(address: Address, native_token: Address) -> Self {
        Self {
            address,
            native_token,
        }
    }

    /// Router from its contract descriptor; the ABI must expose `swap`.
    pub fn from_descriptor(
        descriptor: &ContractDescriptor,
        settings: &NetworkSettings,
    ) -> Result<Self, ConfigError> {
        check_swap_abi(descriptor.address, &descriptor.abi)?;
        Ok(Self::new(descriptor.address, settings.native_token_address))
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Address the router uses for the native coin.
    pub fn native_token(&self) -> Address {
        self.native_token
    }

    pub fn encode_swap(
        &self,
        from_token: Address,
        to_token: Address,
        from_amount: U256,
        min_to_amount: U256,
        recipient: Address,
    ) -> Bytes {
        IWooRouter::swapCall {
            fromToken: from_token,
            toToken: to_token,
            fromAmount: from_amount,
            minToAmount: min_to_amount,
            to: recipient,
            rebateTo: recipient,
        }
        .abi_encode()
        .into()
    }

    /// Swap `amount` of the native coin into `target`.
    ///
    /// The wallet's token selection is restored afterwards, also on error.
    pub async fn swap_native_to_token<G, O>(
        &self,
        wallet: &mut WalletClient<G>,
        oracle: &O,
        target: &TokenDescriptor,
        amount: Decimal,
        slippage: Decimal,
    ) -> ClientResult<TransferOutcome>
    where
        G: ChainGateway,
        O: PriceOracle + ?Sized,
    {
        let previous = wallet.replace_token(TokenContext::Native);
        let result = self
            .swap_current(wallet, oracle, target, amount, slippage)
            .await;
        wallet.replace_token(previous);
        result
    }

    /// Swap `amount` of `source` into `target`, approving the router first
    /// when its allowance is short.
    ///
    /// The wallet's token selection is restored afterwards, also on error.
    pub async fn swap_token_to_token<G, O>(
        &self,
        wallet: &mut WalletClient<G>,
        oracle: &O,
        source: &TokenDescriptor,
        target: &TokenDescriptor,
        amount: Decimal,
        slippage: Decimal,
    ) -> ClientResult<TransferOutcome>
    where
        G: ChainGateway,
        O: PriceOracle + ?Sized,
    {
        let previous = wallet.replace_token(TokenContext::Token(source.clone()));
        let result = self
            .swap_current(wallet, oracle, target, amount, slippage)
            .await;
        wallet.replace_token(previous);
        result
    }

    async fn swap_current<G, O>(
        &self,
        wallet: &mut WalletClient<G>,
        oracle: &O,
        target: &TokenDescriptor,
        amount: Decimal,
        slippage: Decimal,
    ) -> ClientResult<TransferOutcome>
    where
        G: ChainGateway,
        O: PriceOracle + ?Sized,
    {
        let gateway = wallet.engine().gateway().clone();
        let target_context = TokenContext::Token(target.clone());

        let from_symbol = wallet.symbol().await?;
        let from_amount = wallet.amount(amount).await?;
        let to_symbol = target_context
            .symbol(gateway.as_ref(), wallet.native())
            .await?;
        let to_decimals = target_context
            .decimals(gateway.as_ref(), wallet.native())
            .await?;

        let rate = oracle.price(&from_symbol, &to_symbol).await.ok_or_else(|| {
            ClientError::PriceUnavailable {
                base: from_symbol.clone(),
                quote: to_symbol.clone(),
            }
        })?;
        let min_out = estimate_min_out(rate, &from_amount, to_decimals, slippage)?;

        let from_token = wallet
            .token()
            .contract_address()
            .unwrap_or(self.native_token);
        let recipient = wallet.address()?;
        let call = self.encode_swap(
            from_token,
            target.address(),
            from_amount.raw(),
            min_out.raw(),
            recipient,
        );

        info!(
            router = %self.address,
            from = %from_symbol,
            to = %to_symbol,
            amount = %from_amount,
            min_out = %min_out,
            "Submitting swap"
        );
        wallet
            .send_current_token(&TokenTransfer::new(self.address, from_amount).with_call(call))
            .await
    }
}

fn check_swap_abi(address: Address, abi: &JsonAbi) -> Result<(), ConfigError> {
    if abi.function("swap").is_none() {
        return Err(ConfigError::IncompleteAbi {
            address: address.to_checksum(None),
            missing: "swap".to_string(),
        });
    }
    Ok(())
}
