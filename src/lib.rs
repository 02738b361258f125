// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Relational Tx Engine - EVM account and transaction client
//!
//! Signs and submits transactions for a set of registered keys, one
//! submission at a time per key, with gas-price guarding, receipt
//! verification and approve-before-transfer for ERC-20 tokens.
//!
//! ## Modules
//!
//! - `accounts` - Key registry, per-context active identity, submission locks
//! - `amount` - Token quantities (base units and display form)
//! - `blockchain` - Chain gateway trait, alloy RPC client, signing, ERC-20
//! - `config` - Network settings and contract descriptors on disk
//! - `engine` - Build, guard, estimate, sign, broadcast, verify
//! - `oracle` - Spot prices for swap estimation
//! - `swap` - Router swaps with minimum-output protection
//! - `token` - Current token (native or ERC-20) and its queries
//! - `wallet` - Per-session client over a shared engine

pub mod accounts;
pub mod amount;
pub mod blockchain;
pub mod config;
pub mod engine;
pub mod error;
pub mod oracle;
pub mod swap;
pub mod token;
pub mod wallet;

#[cfg(test)]
mod testing;

pub use accounts::{AccountIdentity, AccountRegistry, ContextId, SubmissionLock};
pub use amount::{Amount, AmountError};
pub use blockchain::{ChainGateway, GatewayError, NativeCurrency, RpcGateway};
pub use config::{ConfigError, ConfigStore, NetworkSettings};
pub use engine::{
    Approval, EngineConfig, TokenTransfer, TransactionEngine, TransferOutcome, TxCall, TxOutcome,
    Verification, VerificationFailure,
};
pub use error::{ClientError, ClientResult};
pub use oracle::{ExchangePriceOracle, PriceOracle};
pub use swap::SwapRouter;
pub use token::{TokenContext, TokenDescriptor, TokenSelection};
pub use wallet::WalletClient;
