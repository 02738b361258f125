// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Private key parsing and transaction signing.
//!
//! Keys are accepted either as hex (with or without `0x`) or as PEM
//! (SEC1 or PKCS#8). Transactions are signed as legacy transactions with
//! EIP-155 replay protection and encoded as EIP-2718 envelopes.

use alloy::{
    consensus::{SignableTransaction, TxEnvelope, TxLegacy},
    eips::eip2718::Encodable2718,
    primitives::TxKind,
    network::TxSignerSync,
    signers::local::PrivateKeySigner,
};
use k256::SecretKey;

use super::types::{SignedTx, TxRequest};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SigningError {
    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("Transaction has no gas limit")]
    MissingGasLimit,

    #[error("Signature failed: {0}")]
    Sign(String),
}

/// Parse a private key from hex or PEM.
pub fn parse_private_key(key: &str) -> Result<PrivateKeySigner, SigningError> {
    let key = key.trim();
    if key.starts_with("-----BEGIN") {
        signer_from_pem(key.as_bytes())
    } else {
        signer_from_hex(key)
    }
}

/// Create a signer from a hex private key (64 characters, `0x` optional).
pub fn signer_from_hex(private_key_hex: &str) -> Result<PrivateKeySigner, SigningError> {
    let stripped = private_key_hex
        .strip_prefix("0x")
        .unwrap_or(private_key_hex);
    let key_bytes = alloy::hex::decode(stripped)
        .map_err(|e| SigningError::InvalidPrivateKey(e.to_string()))?;

    PrivateKeySigner::from_slice(&key_bytes)
        .map_err(|e| SigningError::InvalidPrivateKey(e.to_string()))
}

/// Parse a private key from PEM format to hex string.
///
/// Tries SEC1 first, then PKCS#8.
pub fn pem_to_hex(pem_bytes: &[u8]) -> Result<String, SigningError> {
    let pem_str = std::str::from_utf8(pem_bytes)
        .map_err(|e| SigningError::InvalidPrivateKey(format!("Invalid UTF-8: {}", e)))?;

    let pem = pem::parse(pem_str)
        .map_err(|e| SigningError::InvalidPrivateKey(format!("Invalid PEM: {}", e)))?;

    let secret_key = SecretKey::from_sec1_der(pem.contents())
        .or_else(|_| parse_pkcs8_to_secret_key(pem.contents()))
        .map_err(|e| SigningError::InvalidPrivateKey(format!("Invalid key format: {}", e)))?;

    Ok(alloy::hex::encode(secret_key.to_bytes()))
}

fn parse_pkcs8_to_secret_key(der: &[u8]) -> Result<SecretKey, String> {
    use k256::pkcs8::DecodePrivateKey;
    SecretKey::from_pkcs8_der(der).map_err(|e| e.to_string())
}

/// Create a signer from PEM-encoded private key.
pub fn signer_from_pem(pem_bytes: &[u8]) -> Result<PrivateKeySigner, SigningError> {
    let hex_key = pem_to_hex(pem_bytes)?;
    signer_from_hex(&hex_key)
}

/// Sign `request` with `signer`.
///
/// The request must carry a gas limit; the caller is responsible for having
/// checked that `request.from` is the signer's address.
pub fn sign_request(
    signer: &PrivateKeySigner,
    request: &TxRequest,
) -> Result<SignedTx, SigningError> {
    let gas_limit = request.gas_limit.ok_or(SigningError::MissingGasLimit)?;

    let mut tx = TxLegacy {
        chain_id: Some(request.chain_id),
        nonce: request.nonce,
        gas_price: request.gas_price,
        gas_limit,
        to: TxKind::Call(request.to),
        value: request.value,
        input: request.data.clone(),
    };

    let signature = signer
        .sign_transaction_sync(&mut tx)
        .map_err(|e| SigningError::Sign(e.to_string()))?;
    let signed = tx.into_signed(signature);
    let hash = *signed.hash();
    let envelope = TxEnvelope::from(signed);

    Ok(SignedTx {
        sender: request.from,
        nonce: request.nonce,
        hash,
        encoded: envelope.encoded_2718().into(),
    })
}
