// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-session client.
//!
//! A [`WalletClient`] binds one [`ContextId`] and one [`TokenContext`] to a
//! shared [`TransactionEngine`]. Many clients can share an engine; each
//! keeps its own token selection and balance snapshot.
//!
//! A client created with [`WalletClient::new`] owns its context and drops
//! the context's account binding when it goes away. A context passed to
//! [`WalletClient::with_context`] belongs to the caller and is left bound.

use std::sync::Arc;

use alloy::primitives::{Address, TxHash};
use rust_decimal::Decimal;
use tracing::debug;

use crate::accounts::{AccountIdentity, ContextId};
use crate::amount::Amount;
use crate::blockchain::{ChainGateway, NativeCurrency};
use crate::engine::{Approval, TokenTransfer, TransactionEngine, TransferOutcome, TxCall, TxOutcome};
use crate::error::{ClientError, ClientResult};
use crate::token::{TokenContext, TokenDescriptor, TokenSelection};

/// Last balance observed for an (identity, token) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
struct BalanceSnapshot {
    owner: Address,
    token: Option<Address>,
    amount: Amount,
}

pub struct WalletClient<G> {
    engine: Arc<TransactionEngine<G>>,
    ctx: ContextId,
    native: NativeCurrency,
    token: TokenContext,
    snapshot: Option<BalanceSnapshot>,
    owns_context: bool,
}

impl<G: ChainGateway> WalletClient<G> {
    /// New client on a fresh context, starting on the native coin.
    pub fn new(engine: Arc<TransactionEngine<G>>, native: NativeCurrency) -> Self {
        let mut client = Self::with_context(engine, native, ContextId::next());
        client.owns_context = true;
        client
    }

    pub fn with_context(
        engine: Arc<TransactionEngine<G>>,
        native: NativeCurrency,
        ctx: ContextId,
    ) -> Self {
        Self {
            engine,
            ctx,
            native,
            token: TokenContext::Native,
            snapshot: None,
            owns_context: false,
        }
    }

    pub fn context(&self) -> ContextId {
        self.ctx
    }

    pub fn engine(&self) -> &Arc<TransactionEngine<G>> {
        &self.engine
    }

    pub fn native(&self) -> &NativeCurrency {
        &self.native
    }

    pub fn token(&self) -> &TokenContext {
        &self.token
    }

    pub fn identity(&self) -> ClientResult<AccountIdentity> {
        self.engine.registry().current_identity(self.ctx)
    }

    pub fn address(&self) -> ClientResult<Address> {
        Ok(self.identity()?.address())
    }

    // Token selection

    pub fn set_native(&mut self) {
        self.token.set_native();
        self.snapshot = None;
    }

    pub fn set_token(&mut self, descriptor: TokenDescriptor) {
        self.token.set_token(descriptor);
        self.snapshot = None;
    }

    pub fn set(&mut self, selection: TokenSelection) -> ClientResult<()> {
        self.token.set(selection)?;
        self.snapshot = None;
        Ok(())
    }

    /// Swap in another token context, returning the previous one.
    pub(crate) fn replace_token(&mut self, token: TokenContext) -> TokenContext {
        self.snapshot = None;
        std::mem::replace(&mut self.token, token)
    }

    // Identity

    /// Use `key` for this client only.
    pub fn switch_local(&mut self, key: &str) -> ClientResult<AccountIdentity> {
        let identity = self.engine.registry().switch_local(self.ctx, key)?;
        self.snapshot = None;
        Ok(identity)
    }

    /// Make `key` the process-wide default and use it for this client.
    /// Clients that already called [`fixate`](Self::fixate) keep their key.
    pub fn switch_global(&mut self, key: &str) -> ClientResult<AccountIdentity> {
        let identity = self.engine.registry().switch_global(self.ctx, key)?;
        self.snapshot = None;
        Ok(identity)
    }

    /// Pin the current process-wide default to this client.
    pub fn fixate(&mut self) -> ClientResult<AccountIdentity> {
        let identity = self.engine.registry().fixate(self.ctx)?;
        self.snapshot = None;
        Ok(identity)
    }

    // Queries

    pub async fn symbol(&self) -> ClientResult<String> {
        self.token
            .symbol(self.engine.gateway().as_ref(), &self.native)
            .await
    }

    pub async fn decimals(&self) -> ClientResult<u8> {
        self.token
            .decimals(self.engine.gateway().as_ref(), &self.native)
            .await
    }

    /// Read the balance of the active identity and remember it.
    pub async fn balance(&mut self) -> ClientResult<Amount> {
        let owner = self.address()?;
        let amount = self
            .token
            .balance(self.engine.gateway().as_ref(), &self.native, owner)
            .await?;
        self.snapshot = Some(BalanceSnapshot {
            owner,
            token: self.token.contract_address(),
            amount,
        });
        Ok(amount)
    }

    pub async fn allowance(&self, spender: Address) -> ClientResult<Amount> {
        let owner = self.address()?;
        self.token
            .allowance(self.engine.gateway().as_ref(), &self.native, owner, spender)
            .await
    }

    /// Convert a display value into the current token's precision.
    pub async fn amount(&self, value: Decimal) -> ClientResult<Amount> {
        let decimals = self.decimals().await?;
        Ok(Amount::from_display(value, decimals)?)
    }

    // Submission

    pub async fn send(&self, call: &TxCall) -> ClientResult<Option<TxHash>> {
        self.engine.send(self.ctx, call).await
    }

    pub async fn submit(&self, call: &TxCall) -> ClientResult<TxOutcome> {
        self.engine.submit(self.ctx, call).await
    }

    pub async fn approve(&self, spender: Address, amount: &Amount) -> ClientResult<Approval> {
        self.engine
            .approve(self.ctx, &self.token, spender, amount)
            .await
    }

    /// Transfer the current token after checking the last known balance.
    ///
    /// Uses the balance remembered by [`balance`](Self::balance) when it
    /// belongs to the same identity and token, otherwise reads it once.
    pub async fn send_current_token(
        &mut self,
        transfer: &TokenTransfer,
    ) -> ClientResult<TransferOutcome> {
        let owner = self.address()?;
        let token = self.token.contract_address();
        let available = match &self.snapshot {
            Some(snapshot) if snapshot.owner == owner && snapshot.token == token => {
                debug!(owner = %owner, "Using cached balance");
                snapshot.amount
            }
            _ => self.balance().await?,
        };

        let outcome = self
            .engine
            .send_current_token(self.ctx, &self.token, transfer, &available)
            .await;
        // balance moved (or may have)
        if !matches!(outcome, Err(ClientError::InsufficientBalance { .. })) {
            self.snapshot = None;
        }
        outcome
    }
}

impl<G> Drop for WalletClient<G> {
    fn drop(&mut self) {
        if self.owns_context {
            self.engine.registry().release(self.ctx);
        }
    }
}
