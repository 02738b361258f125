// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Blockchain integration for EVM networks.
//!
//! This module provides:
//! - The [`ChainGateway`] capability set the engine depends on
//! - A JSON-RPC implementation of it ([`RpcGateway`])
//! - ERC-20 call encoding
//! - Key parsing and transaction signing

pub mod client;
pub mod erc20;
pub mod gateway;
pub mod signing;
pub mod types;

pub use client::RpcGateway;
pub use gateway::{ChainGateway, GatewayError, GatewayResult};
pub use signing::{parse_private_key, SigningError};
pub use types::*;
