// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Crate-wide error type.
//!
//! Validation errors are returned immediately. Network failures abort the
//! operation that hit them. Receipt verification is reported as an outcome
//! value by the engine; [`ClientError::VerificationFailed`] only appears when
//! a caller converts that outcome with `into_result()`.

use alloy::primitives::{Address, TxHash};

use crate::amount::{Amount, AmountError};
use crate::blockchain::gateway::GatewayError;
use crate::blockchain::signing::SigningError;
use crate::config::ConfigError;
use crate::engine::VerificationFailure;

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid amount: {0}")]
    InvalidAmount(#[from] AmountError),

    #[error("invalid token context: {0}")]
    InvalidTokenContext(String),

    #[error("unknown account: {0}")]
    UnknownAccount(String),

    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("RPC error: {0}")]
    Rpc(#[from] GatewayError),

    #[error("gas estimation failed: {0}")]
    EstimationFailed(GatewayError),

    #[error("insufficient balance for {address}: requested {requested}, available {available}")]
    InsufficientBalance {
        address: Address,
        requested: Amount,
        available: Amount,
    },

    #[error("transaction {hash} not confirmed: {reason}")]
    VerificationFailed {
        hash: TxHash,
        reason: VerificationFailure,
    },

    #[error("signing failed: {0}")]
    Signing(#[from] SigningError),

    #[error("no price quote for {base}/{quote}")]
    PriceUnavailable { base: String, quote: String },
}
