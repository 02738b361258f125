// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Transaction Engine
//!
//! Builds, signs, broadcasts and verifies transactions for the identity
//! active in a [`ContextId`].
//!
//! ## Submission
//!
//! 1. **Build**: read the live gas price, chain id and nonce.
//! 2. **Price guard**: if the gas price is above the configured ceiling the
//!    submission is skipped and `Ok(None)` is returned. Nothing is written.
//! 3. **Estimate**: a failed estimate aborts with
//!    [`ClientError::EstimationFailed`]. There is no fallback gas limit.
//! 4. **Critical section**: under the sender's [`SubmissionLock`] the nonce
//!    is read again, the transaction is signed and broadcast. Two
//!    submissions from the same key never share a nonce; different keys
//!    never wait on each other.
//! 5. **Verify**: poll for the receipt until the configured timeout. Only
//!    status `1` counts as confirmed. A failed verification is reported,
//!    never retried or rolled back.
//!
//! ## Approve before transfer
//!
//! [`TransactionEngine::send_current_token`] checks the amount against the
//! known balance, makes sure the recipient contract holds enough allowance
//! (submitting and verifying an `approve` if needed) and only then submits
//! the transfer. A failed approval aborts the transfer.
//!
//! [`SubmissionLock`]: crate::accounts::SubmissionLock

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, Bytes, TxHash, U256};
use tracing::{debug, info, warn};

use crate::accounts::{AccountRegistry, ContextId};
use crate::amount::Amount;
use crate::blockchain::erc20::{encode_approve, encode_transfer};
use crate::blockchain::signing::sign_request;
use crate::blockchain::{ChainGateway, GatewayError, TxReceipt, TxRequest};
use crate::config::{ConfigError, NetworkSettings, DEFAULT_RECEIPT_TIMEOUT_SECS};
use crate::error::{ClientError, ClientResult};
use crate::token::TokenContext;

/// Engine options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Skip submissions while the gas price (wei) is above this.
    pub gas_price_ceiling: Option<u128>,
    /// How long to wait for a receipt.
    pub receipt_timeout: Duration,
    /// Precision of native `value` amounts
    pub native_decimals: u8,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            gas_price_ceiling: None,
            receipt_timeout: Duration::from_secs(DEFAULT_RECEIPT_TIMEOUT_SECS),
            native_decimals: 18,
        }
    }
}

impl EngineConfig {
    pub fn from_settings(settings: &NetworkSettings) -> Result<Self, ConfigError> {
        Ok(Self {
            gas_price_ceiling: settings.gas_price_ceiling_wei()?,
            receipt_timeout: settings.receipt_timeout(),
            native_decimals: settings.native_decimals,
        })
    }
}

/// A call to submit: recipient plus optional data and native value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxCall {
    pub to: Address,
    pub data: Option<Bytes>,
    /// Native value, in the native coin's precision
    pub value: Option<Amount>,
}

impl TxCall {
    /// Plain native transfer.
    pub fn transfer(to: Address, value: Amount) -> Self {
        Self {
            to,
            data: None,
            value: Some(value),
        }
    }

    /// Contract call without value.
    pub fn contract(to: Address, data: Bytes) -> Self {
        Self {
            to,
            data: Some(data),
            value: None,
        }
    }
}

/// Why a broadcast transaction is not considered confirmed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerificationFailure {
    #[error("receipt status {0:?}")]
    Reverted(Option<u64>),

    #[error("no receipt within {0:?}")]
    Timeout(Duration),

    #[error("receipt lookup failed: {0}")]
    Gateway(GatewayError),
}

/// Result of polling for a receipt.
#[derive(Debug, Clone, PartialEq)]
pub enum Verification {
    Confirmed(TxReceipt),
    Failed(VerificationFailure),
}

impl Verification {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed(_))
    }
}

/// Terminal state of one submission.
#[derive(Debug, Clone, PartialEq)]
pub enum TxOutcome {
    Confirmed { hash: TxHash, receipt: TxReceipt },
    Failed { hash: TxHash, reason: VerificationFailure },
    /// Skipped by the gas price guard; nothing was broadcast.
    Dropped,
}

impl TxOutcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed { .. })
    }

    /// Hash of the broadcast transaction, if any.
    pub fn hash(&self) -> Option<TxHash> {
        match self {
            Self::Confirmed { hash, .. } | Self::Failed { hash, .. } => Some(*hash),
            Self::Dropped => None,
        }
    }

    /// `Ok(Some(hash))` when confirmed, `Ok(None)` when dropped, and
    /// [`ClientError::VerificationFailed`] otherwise.
    pub fn into_result(self) -> ClientResult<Option<TxHash>> {
        match self {
            Self::Confirmed { hash, .. } => Ok(Some(hash)),
            Self::Dropped => Ok(None),
            Self::Failed { hash, reason } => Err(ClientError::VerificationFailed { hash, reason }),
        }
    }
}

/// How the allowance requirement of a transfer was met.
#[derive(Debug, Clone, PartialEq)]
pub enum Approval {
    /// Native coin: nothing to approve.
    NotRequired,
    /// Existing allowance already covers the amount.
    Sufficient,
    /// An `approve` transaction was submitted.
    Submitted(TxOutcome),
}

impl Approval {
    pub fn is_granted(&self) -> bool {
        match self {
            Self::NotRequired | Self::Sufficient => true,
            Self::Submitted(outcome) => outcome.is_confirmed(),
        }
    }
}

/// Outcome of [`TransactionEngine::send_current_token`].
#[derive(Debug, Clone, PartialEq)]
pub struct TransferOutcome {
    pub approval: Approval,
    /// `None` when the approval failed and the transfer was not attempted.
    pub transfer: Option<TxOutcome>,
}

impl TransferOutcome {
    pub fn is_confirmed(&self) -> bool {
        self.transfer.as_ref().is_some_and(TxOutcome::is_confirmed)
    }
}

/// A transfer of the current token to a recipient or a spending contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenTransfer {
    /// Recipient; for ERC-20 tokens also the spender that gets approved
    pub to: Address,
    /// Amount in the current token's precision
    pub amount: Amount,
    /// Call executed on `to` instead of a plain transfer (e.g. a router swap)
    pub call: Option<Bytes>,
}

impl TokenTransfer {
    pub fn new(to: Address, amount: Amount) -> Self {
        Self {
            to,
            amount,
            call: None,
        }
    }

    pub fn with_call(mut self, call: Bytes) -> Self {
        self.call = Some(call);
        self
    }
}

/// Shared transaction engine.
pub struct TransactionEngine<G> {
    gateway: Arc<G>,
    registry: Arc<AccountRegistry>,
    config: EngineConfig,
}

impl<G> TransactionEngine<G> {
    pub fn new(gateway: Arc<G>, registry: Arc<AccountRegistry>, config: EngineConfig) -> Self {
        Self {
            gateway,
            registry,
            config,
        }
    }

    pub fn gateway(&self) -> &Arc<G> {
        &self.gateway
    }

    pub fn registry(&self) -> &Arc<AccountRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

impl<G: ChainGateway> TransactionEngine<G> {
    /// Build, sign and broadcast `call` from the identity active in `ctx`.
    ///
    /// Returns `Ok(None)` when the gas price guard skipped the submission.
    /// A `value` not in the native precision is rejected before any call.
    pub async fn send(&self, ctx: ContextId, call: &TxCall) -> ClientResult<Option<TxHash>> {
        if let Some(value) = &call.value {
            value.require_decimals(self.config.native_decimals)?;
        }
        let identity = self.registry.current_identity(ctx)?;
        let sender = identity.address();

        let gas_price = self.gateway.gas_price().await?;
        if let Some(ceiling) = self.config.gas_price_ceiling {
            if gas_price > ceiling {
                warn!(
                    sender = %sender,
                    gas_price,
                    ceiling,
                    "Gas price above ceiling, skipping submission"
                );
                return Ok(None);
            }
        }

        let chain_id = self.gateway.chain_id().await?;
        let nonce = self.gateway.nonce(sender).await?;
        let mut request = TxRequest {
            from: sender,
            to: call.to,
            data: call.data.clone().unwrap_or_default(),
            value: call.value.map(|v| v.raw()).unwrap_or(U256::ZERO),
            chain_id,
            nonce,
            gas_price,
            gas_limit: None,
        };

        let gas_limit = self.gateway.estimate_gas(&request).await.map_err(|e| {
            warn!(sender = %sender, to = %call.to, error = %e, "Gas estimation failed");
            ClientError::EstimationFailed(e)
        })?;
        request.gas_limit = Some(gas_limit);

        let lock = self.registry.submission_lock(sender)?;
        let hash = {
            let _guard = lock.acquire().await;
            request.nonce = self.gateway.nonce(sender).await?;
            let signed = sign_request(identity.signer(), &request)?;
            self.gateway.send_signed(&signed).await?
        };

        info!(
            sender = %sender,
            to = %call.to,
            nonce = request.nonce,
            gas_limit,
            tx_hash = %hash,
            "Transaction broadcast"
        );
        Ok(Some(hash))
    }

    /// Wait for the receipt of `hash` and classify it.
    pub async fn verify(&self, hash: TxHash) -> Verification {
        let timeout = self.config.receipt_timeout;
        let verification = match self.gateway.wait_for_receipt(hash, timeout).await {
            Ok(Some(receipt)) if receipt.succeeded() => Verification::Confirmed(receipt),
            Ok(Some(receipt)) => {
                Verification::Failed(VerificationFailure::Reverted(receipt.status))
            }
            Ok(None) => Verification::Failed(VerificationFailure::Timeout(timeout)),
            Err(e) => Verification::Failed(VerificationFailure::Gateway(e)),
        };

        match &verification {
            Verification::Confirmed(_) => info!(tx_hash = %hash, "Transaction confirmed"),
            Verification::Failed(reason) => {
                warn!(tx_hash = %hash, reason = %reason, "Transaction not confirmed")
            }
        }
        verification
    }

    /// [`send`](Self::send) followed by [`verify`](Self::verify).
    pub async fn submit(&self, ctx: ContextId, call: &TxCall) -> ClientResult<TxOutcome> {
        let Some(hash) = self.send(ctx, call).await? else {
            return Ok(TxOutcome::Dropped);
        };
        Ok(match self.verify(hash).await {
            Verification::Confirmed(receipt) => TxOutcome::Confirmed { hash, receipt },
            Verification::Failed(reason) => TxOutcome::Failed { hash, reason },
        })
    }

    /// Make sure `spender` may move `amount` of the current token on behalf
    /// of the identity active in `ctx`.
    ///
    /// `amount` must be in the token's own precision.
    pub async fn approve(
        &self,
        ctx: ContextId,
        token: &TokenContext,
        spender: Address,
        amount: &Amount,
    ) -> ClientResult<Approval> {
        let Some(contract) = token.contract_address() else {
            return Ok(Approval::NotRequired);
        };
        let decimals = self.gateway.token_decimals(contract).await?;
        amount.require_decimals(decimals)?;
        self.approve_contract(ctx, contract, spender, amount.raw())
            .await
    }

    async fn approve_contract(
        &self,
        ctx: ContextId,
        contract: Address,
        spender: Address,
        raw: U256,
    ) -> ClientResult<Approval> {
        let owner = self.registry.current_identity(ctx)?.address();

        let allowance = self.gateway.allowance(contract, owner, spender).await?;
        if allowance >= raw {
            debug!(
                owner = %owner,
                spender = %spender,
                allowance = %allowance,
                "Allowance sufficient, skipping approve"
            );
            return Ok(Approval::Sufficient);
        }

        let call = TxCall::contract(contract, encode_approve(spender, raw));
        let outcome = self.submit(ctx, &call).await?;
        Ok(Approval::Submitted(outcome))
    }

    /// Transfer the current token, approving the recipient first if needed.
    ///
    /// `available` is the caller's last known balance in the current token.
    /// The transfer amount must use the same precision
    /// ([`ClientError::InvalidAmount`] otherwise) and must not exceed it
    /// ([`ClientError::InsufficientBalance`]). Both checks are local.
    ///
    /// For ERC-20 tokens `to` is approved as spender before the transfer.
    /// On a plain transfer (no `call`) the recipient keeps that allowance
    /// afterwards: it may later pull up to `amount` more from the sender.
    pub async fn send_current_token(
        &self,
        ctx: ContextId,
        token: &TokenContext,
        transfer: &TokenTransfer,
        available: &Amount,
    ) -> ClientResult<TransferOutcome> {
        transfer.amount.require_decimals(available.decimals())?;
        if transfer.amount.raw() > available.raw() {
            let address = self.registry.current_identity(ctx)?.address();
            return Err(ClientError::InsufficientBalance {
                address,
                requested: transfer.amount,
                available: *available,
            });
        }

        let approval = match token.contract_address() {
            None => Approval::NotRequired,
            Some(contract) => {
                self.approve_contract(ctx, contract, transfer.to, transfer.amount.raw())
                    .await?
            }
        };
        if !approval.is_granted() {
            warn!(spender = %transfer.to, "Approval not confirmed, transfer aborted");
            return Ok(TransferOutcome {
                approval,
                transfer: None,
            });
        }

        let call = match (token.contract_address(), &transfer.call) {
            (None, call) => TxCall {
                to: transfer.to,
                data: call.clone(),
                value: Some(transfer.amount),
            },
            (Some(_), Some(call)) => TxCall::contract(transfer.to, call.clone()),
            (Some(contract), None) => {
                TxCall::contract(contract, encode_transfer(transfer.to, transfer.amount.raw()))
            }
        };

        let outcome = self.submit(ctx, &call).await?;
        Ok(TransferOutcome {
            approval,
            transfer: Some(outcome),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amount::AmountError;
    use crate::testing::{erc20_abi, MockGateway, KEY_A, KEY_B, RECIPIENT, ROUTER, TOKEN};
    use crate::token::TokenSelection;

    fn setup(config: EngineConfig) -> (Arc<MockGateway>, Arc<TransactionEngine<MockGateway>>) {
        let gateway = Arc::new(MockGateway::new());
        let registry = Arc::new(AccountRegistry::with_default(KEY_A).unwrap());
        let engine = Arc::new(TransactionEngine::new(gateway.clone(), registry, config));
        (gateway, engine)
    }

    fn eth(value: &str) -> Amount {
        Amount::parse(value, 18).unwrap()
    }

    fn usdc(value: &str) -> Amount {
        Amount::parse(value, 6).unwrap()
    }

    fn usdc_context() -> TokenContext {
        TokenContext::select(TokenSelection::token(TOKEN, erc20_abi())).unwrap()
    }

    fn sender(engine: &TransactionEngine<MockGateway>) -> Address {
        engine.registry().default_identity().unwrap().address()
    }

    #[tokio::test]
    async fn send_builds_signs_and_broadcasts() {
        let (gateway, engine) = setup(EngineConfig::default());
        let ctx = ContextId::next();

        let hash = engine
            .send(ctx, &TxCall::transfer(RECIPIENT, eth("2.5")))
            .await
            .unwrap()
            .unwrap();

        let sent = gateway.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].hash, hash);
        assert_eq!(sent[0].nonce, 0);
        assert_eq!(sent[0].sender, sender(&engine));

        let estimated = &gateway.estimated()[0];
        assert_eq!(estimated.to, RECIPIENT);
        assert_eq!(estimated.value, U256::from(2_500_000_000_000_000_000u128));
        assert_eq!(estimated.chain_id, crate::testing::CHAIN_ID);
    }

    #[tokio::test]
    async fn gas_price_above_ceiling_is_a_silent_skip() {
        let (gateway, engine) = setup(EngineConfig {
            // 0.1 gwei
            gas_price_ceiling: Some(100_000_000),
            ..EngineConfig::default()
        });
        // 0.2 gwei
        gateway.set_gas_price(200_000_000);

        let result = engine
            .send(ContextId::next(), &TxCall::transfer(RECIPIENT, eth("1")))
            .await
            .unwrap();

        assert_eq!(result, None);
        let calls = gateway.calls();
        assert_eq!(calls.estimates, 0);
        assert_eq!(calls.broadcasts, 0);

        let outcome = engine
            .submit(ContextId::next(), &TxCall::transfer(RECIPIENT, eth("1")))
            .await
            .unwrap();
        assert_eq!(outcome, TxOutcome::Dropped);
        assert_eq!(outcome.into_result().unwrap(), None);
    }

    #[tokio::test]
    async fn gas_price_at_ceiling_is_sent() {
        let (gateway, engine) = setup(EngineConfig {
            gas_price_ceiling: Some(100_000_000),
            ..EngineConfig::default()
        });
        gateway.set_gas_price(100_000_000);

        let result = engine
            .send(ContextId::next(), &TxCall::transfer(RECIPIENT, eth("1")))
            .await
            .unwrap();
        assert!(result.is_some());
    }

    #[tokio::test]
    async fn estimation_failure_aborts_before_broadcast() {
        let (gateway, engine) = setup(EngineConfig::default());
        gateway.fail_estimate(true);

        let err = engine
            .send(ContextId::next(), &TxCall::transfer(RECIPIENT, eth("1")))
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::EstimationFailed(_)));
        assert_eq!(gateway.calls().broadcasts, 0);
    }

    #[tokio::test]
    async fn unknown_context_without_default_fails() {
        let gateway = Arc::new(MockGateway::new());
        let engine = TransactionEngine::new(
            gateway.clone(),
            Arc::new(AccountRegistry::new()),
            EngineConfig::default(),
        );
        let err = engine
            .send(ContextId::next(), &TxCall::transfer(RECIPIENT, eth("1")))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::UnknownAccount(_)));
        assert_eq!(gateway.calls().total(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_sends_from_one_key_get_sequential_nonces() {
        const SENDS: u64 = 8;
        let (gateway, engine) = setup(EngineConfig::default());

        let handles: Vec<_> = (0..SENDS)
            .map(|_| {
                let engine = engine.clone();
                tokio::spawn(async move {
                    let ctx = ContextId::next();
                    engine.registry().fixate(ctx).unwrap();
                    engine
                        .send(ctx, &TxCall::transfer(RECIPIENT, Amount::parse("0.01", 18).unwrap()))
                        .await
                })
            })
            .collect();

        for handle in handles {
            assert!(handle.await.unwrap().unwrap().is_some());
        }

        let nonces: Vec<u64> = gateway.sent().iter().map(|tx| tx.nonce).collect();
        assert_eq!(nonces, (0..SENDS).collect::<Vec<_>>());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn different_keys_do_not_contend() {
        let (_gateway, engine) = setup(EngineConfig::default());
        let ctx_a = ContextId::next();
        let ctx_b = ContextId::next();
        engine.registry().fixate(ctx_a).unwrap();
        let b = engine.registry().switch_local(ctx_b, KEY_B).unwrap();

        let lock_a = engine.registry().submission_lock(sender(&engine)).unwrap();
        let held = lock_a.acquire().await;

        let call = TxCall::transfer(RECIPIENT, eth("1"));
        let sent_b = tokio::time::timeout(Duration::from_secs(5), engine.send(ctx_b, &call))
            .await
            .expect("key B must not wait on key A")
            .unwrap();
        assert!(sent_b.is_some());

        let blocked_a =
            tokio::time::timeout(Duration::from_millis(100), engine.send(ctx_a, &call)).await;
        assert!(blocked_a.is_err(), "key A is held");

        drop(held);
        assert!(engine.send(ctx_a, &call).await.unwrap().is_some());
        assert_ne!(b.address(), sender(&engine));
    }

    #[tokio::test]
    async fn verify_requires_status_one() {
        let (gateway, engine) = setup(EngineConfig::default());
        let hash = TxHash::repeat_byte(0xab);

        assert!(engine.verify(hash).await.is_confirmed());

        gateway.set_receipt_status(Some(0));
        assert_eq!(
            engine.verify(hash).await,
            Verification::Failed(VerificationFailure::Reverted(Some(0)))
        );

        gateway.set_receipt_status(None);
        assert_eq!(
            engine.verify(hash).await,
            Verification::Failed(VerificationFailure::Reverted(None))
        );
    }

    #[tokio::test]
    async fn verify_reports_timeout_and_gateway_errors() {
        let (gateway, engine) = setup(EngineConfig::default());
        let hash = TxHash::repeat_byte(0x01);

        gateway.time_out_receipts(true);
        assert_eq!(
            engine.verify(hash).await,
            Verification::Failed(VerificationFailure::Timeout(Duration::from_secs(120)))
        );

        gateway.fail_reads(true);
        assert!(matches!(
            engine.verify(hash).await,
            Verification::Failed(VerificationFailure::Gateway(_))
        ));
    }

    #[tokio::test]
    async fn failed_verification_is_an_outcome_not_an_error() {
        let (gateway, engine) = setup(EngineConfig::default());
        gateway.set_receipt_status(Some(0));

        let outcome = engine
            .submit(ContextId::next(), &TxCall::transfer(RECIPIENT, eth("1")))
            .await
            .unwrap();

        assert!(!outcome.is_confirmed());
        assert!(outcome.hash().is_some());
        assert!(matches!(
            outcome.into_result(),
            Err(ClientError::VerificationFailed { .. })
        ));
        // broadcast once, never retried
        assert_eq!(gateway.calls().broadcasts, 1);
    }

    #[tokio::test]
    async fn approve_skips_when_allowance_covers_amount() {
        let (gateway, engine) = setup(EngineConfig::default());
        gateway.set_allowance(TOKEN, sender(&engine), ROUTER, U256::from(5_000_000u64));

        let approval = engine
            .approve(ContextId::next(), &usdc_context(), ROUTER, &usdc("5"))
            .await
            .unwrap();

        assert_eq!(approval, Approval::Sufficient);
        let calls = gateway.calls();
        assert_eq!(calls.estimates, 0);
        assert_eq!(calls.broadcasts, 0);
    }

    #[tokio::test]
    async fn approve_is_noop_for_native() {
        let (gateway, engine) = setup(EngineConfig::default());

        let approval = engine
            .approve(ContextId::next(), &TokenContext::Native, ROUTER, &eth("5"))
            .await
            .unwrap();

        assert_eq!(approval, Approval::NotRequired);
        assert_eq!(gateway.calls().total(), 0);
    }

    #[tokio::test]
    async fn approve_submits_when_allowance_short() {
        let (gateway, engine) = setup(EngineConfig::default());
        gateway.set_allowance(TOKEN, sender(&engine), ROUTER, U256::from(1u8));

        let approval = engine
            .approve(ContextId::next(), &usdc_context(), ROUTER, &usdc("5"))
            .await
            .unwrap();

        assert!(approval.is_granted());
        let estimated = gateway.estimated();
        assert_eq!(estimated.len(), 1);
        assert_eq!(estimated[0].to, TOKEN);
        assert_eq!(estimated[0].data, encode_approve(ROUTER, U256::from(5_000_000u64)));
    }

    #[tokio::test]
    async fn insufficient_balance_makes_no_gateway_calls() {
        let (gateway, engine) = setup(EngineConfig::default());

        let err = engine
            .send_current_token(
                ContextId::next(),
                &usdc_context(),
                &TokenTransfer::new(RECIPIENT, usdc("10")),
                &usdc("9.999999"),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::InsufficientBalance { .. }));
        assert_eq!(gateway.calls().total(), 0);
    }

    #[tokio::test]
    async fn failed_approval_aborts_transfer() {
        let (gateway, engine) = setup(EngineConfig::default());
        gateway.set_receipt_status(Some(0));

        let outcome = engine
            .send_current_token(
                ContextId::next(),
                &usdc_context(),
                &TokenTransfer::new(ROUTER, usdc("1")),
                &usdc("2"),
            )
            .await
            .unwrap();

        assert!(!outcome.approval.is_granted());
        assert_eq!(outcome.transfer, None);
        assert_eq!(gateway.sent().len(), 1, "only the approve was broadcast");
    }

    #[tokio::test]
    async fn token_transfer_approves_then_transfers() {
        let (gateway, engine) = setup(EngineConfig::default());

        let outcome = engine
            .send_current_token(
                ContextId::next(),
                &usdc_context(),
                &TokenTransfer::new(RECIPIENT, usdc("1")),
                &usdc("2"),
            )
            .await
            .unwrap();

        assert!(outcome.is_confirmed());
        let estimated = gateway.estimated();
        assert_eq!(estimated.len(), 2);
        assert_eq!(estimated[0].data, encode_approve(RECIPIENT, U256::from(1_000_000u64)));
        assert_eq!(estimated[1].to, TOKEN);
        assert_eq!(estimated[1].data, encode_transfer(RECIPIENT, U256::from(1_000_000u64)));
        let nonces: Vec<u64> = gateway.sent().iter().map(|tx| tx.nonce).collect();
        assert_eq!(nonces, vec![0, 1]);
    }

    #[tokio::test]
    async fn token_call_goes_to_spender_without_value() {
        let (gateway, engine) = setup(EngineConfig::default());
        gateway.set_allowance(TOKEN, sender(&engine), ROUTER, U256::MAX);
        let swap = Bytes::from(vec![0x12, 0x34, 0x56, 0x78]);

        let outcome = engine
            .send_current_token(
                ContextId::next(),
                &usdc_context(),
                &TokenTransfer::new(ROUTER, usdc("1")).with_call(swap.clone()),
                &usdc("1"),
            )
            .await
            .unwrap();

        assert_eq!(outcome.approval, Approval::Sufficient);
        let estimated = gateway.estimated();
        assert_eq!(estimated.len(), 1);
        assert_eq!(estimated[0].to, ROUTER);
        assert_eq!(estimated[0].data, swap);
        assert_eq!(estimated[0].value, U256::ZERO);
    }

    #[tokio::test]
    async fn native_transfer_sends_value() {
        let (gateway, engine) = setup(EngineConfig::default());

        let outcome = engine
            .send_current_token(
                ContextId::next(),
                &TokenContext::Native,
                &TokenTransfer::new(RECIPIENT, eth("0.5")),
                &eth("2.5"),
            )
            .await
            .unwrap();

        assert_eq!(outcome.approval, Approval::NotRequired);
        assert!(outcome.is_confirmed());
        let estimated = gateway.estimated();
        assert_eq!(estimated.len(), 1);
        assert_eq!(estimated[0].to, RECIPIENT);
        assert_eq!(estimated[0].value, U256::from(500_000_000_000_000_000u64));
        assert!(estimated[0].data.is_empty());
    }

    #[tokio::test]
    async fn transfer_in_foreign_precision_is_rejected() {
        let (gateway, engine) = setup(EngineConfig::default());

        // 1.0 at 18 decimals against a 2 USDC balance
        let err = engine
            .send_current_token(
                ContextId::next(),
                &usdc_context(),
                &TokenTransfer::new(RECIPIENT, eth("1")),
                &usdc("2"),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ClientError::InvalidAmount(AmountError::Precision {
                expected: 6,
                actual: 18
            })
        ));
        assert_eq!(gateway.calls().total(), 0);
        assert!(gateway.sent().is_empty());
    }

    #[tokio::test]
    async fn native_value_in_foreign_precision_is_rejected() {
        let (gateway, engine) = setup(EngineConfig::default());

        let err = engine
            .send(ContextId::next(), &TxCall::transfer(RECIPIENT, usdc("1")))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ClientError::InvalidAmount(AmountError::Precision { .. })
        ));
        assert_eq!(gateway.calls().total(), 0);
    }

    #[tokio::test]
    async fn approve_in_foreign_precision_is_rejected() {
        let (gateway, engine) = setup(EngineConfig::default());

        let err = engine
            .approve(ContextId::next(), &usdc_context(), ROUTER, &eth("1"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ClientError::InvalidAmount(AmountError::Precision { .. })
        ));
        let calls = gateway.calls();
        assert_eq!(calls.estimates, 0);
        assert_eq!(calls.broadcasts, 0);
    }
}
