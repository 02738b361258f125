// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Current-token context.
//!
//! A [`TokenContext`] is either the network's native coin or one ERC-20
//! contract. Balance, allowance, symbol and decimals queries are resolved
//! against it. The context is plain data owned by one client session; it is
//! not synchronized for sharing between tasks.

use alloy::json_abi::JsonAbi;
use alloy::primitives::{Address, U256};

use crate::amount::Amount;
use crate::blockchain::erc20::REQUIRED_FUNCTIONS;
use crate::blockchain::{ChainGateway, NativeCurrency};
use crate::config::ConfigError;
use crate::error::{ClientError, ClientResult};

/// An ERC-20 contract address together with its ABI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenDescriptor {
    address: Address,
    abi: JsonAbi,
}

impl TokenDescriptor {
    /// Fails when the ABI lacks any of the ERC-20 functions the engine calls.
    pub fn new(address: Address, abi: JsonAbi) -> Result<Self, ConfigError> {
        let missing: Vec<&str> = REQUIRED_FUNCTIONS
            .iter()
            .copied()
            .filter(|name| abi.function(name).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::IncompleteAbi {
                address: address.to_checksum(None),
                missing: missing.join(", "),
            });
        }
        Ok(Self { address, abi })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn abi(&self) -> &JsonAbi {
        &self.abi
    }
}

/// Explicit token selection, validated by [`TokenContext::select`].
///
/// - nothing set: native coin
/// - `native` only: native coin
/// - `address` and `abi` without `native`: that token
/// - anything else is rejected
#[derive(Debug, Clone, Default)]
pub struct TokenSelection {
    pub native: bool,
    pub address: Option<Address>,
    pub abi: Option<JsonAbi>,
}

impl TokenSelection {
    pub fn native() -> Self {
        Self {
            native: true,
            ..Self::default()
        }
    }

    pub fn token(address: Address, abi: JsonAbi) -> Self {
        Self {
            native: false,
            address: Some(address),
            abi: Some(abi),
        }
    }
}

/// The token all high-level queries are relative to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TokenContext {
    #[default]
    Native,
    Token(TokenDescriptor),
}

impl TokenContext {
    /// Build a context from an explicit selection.
    pub fn select(selection: TokenSelection) -> ClientResult<Self> {
        match (selection.native, selection.address, selection.abi) {
            (_, None, None) => Ok(Self::Native),
            (true, _, _) => Err(ClientError::InvalidTokenContext(
                "native coin and token contract requested together".to_string(),
            )),
            (false, Some(address), Some(abi)) => Ok(Self::Token(TokenDescriptor::new(address, abi)?)),
            (false, _, _) => Err(ClientError::InvalidTokenContext(
                "token address and ABI must be given together".to_string(),
            )),
        }
    }

    pub fn set_native(&mut self) {
        *self = Self::Native;
    }

    pub fn set_token(&mut self, descriptor: TokenDescriptor) {
        *self = Self::Token(descriptor);
    }

    /// Replace the context with a validated selection. On error the current
    /// context is left untouched.
    pub fn set(&mut self, selection: TokenSelection) -> ClientResult<()> {
        *self = Self::select(selection)?;
        Ok(())
    }

    pub fn is_native(&self) -> bool {
        matches!(self, Self::Native)
    }

    /// Contract address, `None` for the native coin.
    pub fn contract_address(&self) -> Option<Address> {
        match self {
            Self::Native => None,
            Self::Token(descriptor) => Some(descriptor.address()),
        }
    }

    pub async fn symbol<G>(&self, gateway: &G, native: &NativeCurrency) -> ClientResult<String>
    where
        G: ChainGateway + ?Sized,
    {
        match self {
            Self::Native => Ok(native.symbol.clone()),
            Self::Token(descriptor) => Ok(gateway.token_symbol(descriptor.address()).await?),
        }
    }

    pub async fn decimals<G>(&self, gateway: &G, native: &NativeCurrency) -> ClientResult<u8>
    where
        G: ChainGateway + ?Sized,
    {
        match self {
            Self::Native => Ok(native.decimals),
            Self::Token(descriptor) => Ok(gateway.token_decimals(descriptor.address()).await?),
        }
    }

    /// Balance of `owner` in the current token.
    pub async fn balance<G>(
        &self,
        gateway: &G,
        native: &NativeCurrency,
        owner: Address,
    ) -> ClientResult<Amount>
    where
        G: ChainGateway + ?Sized,
    {
        let raw = match self {
            Self::Native => gateway.balance(owner).await?,
            Self::Token(descriptor) => gateway.token_balance(descriptor.address(), owner).await?,
        };
        let decimals = self.decimals(gateway, native).await?;
        Ok(Amount::from_raw(raw, decimals)?)
    }

    /// Allowance granted by `owner` to `spender`.
    ///
    /// The native coin needs no approval, so its allowance is reported as
    /// the maximum `U256` without touching the network.
    pub async fn allowance<G>(
        &self,
        gateway: &G,
        native: &NativeCurrency,
        owner: Address,
        spender: Address,
    ) -> ClientResult<Amount>
    where
        G: ChainGateway + ?Sized,
    {
        match self {
            Self::Native => Ok(Amount::from_raw(U256::MAX, native.decimals)?),
            Self::Token(descriptor) => {
                let raw = gateway
                    .allowance(descriptor.address(), owner, spender)
                    .await?;
                let decimals = gateway.token_decimals(descriptor.address()).await?;
                Ok(Amount::from_raw(raw, decimals)?)
            }
        }
    }
}
