// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::env;
use std::sync::Arc;

use relational_tx_engine::config::{
    init_tracing, ConfigError, DEFAULT_NETWORK, NETWORK_ENV, PRIVATE_KEY_ENV,
};
use relational_tx_engine::{
    AccountRegistry, ClientResult, ConfigStore, EngineConfig, RpcGateway, TransactionEngine,
    WalletClient,
};
use tracing::info;

#[tokio::main]
async fn main() -> ClientResult<()> {
    init_tracing();

    let network = env::var(NETWORK_ENV).unwrap_or_else(|_| DEFAULT_NETWORK.to_string());
    let store = ConfigStore::from_env();
    let settings = store.network(&network)?;
    let key = env::var(PRIVATE_KEY_ENV).map_err(|_| ConfigError::EnvVarNotSet(PRIVATE_KEY_ENV))?;

    let gateway = RpcGateway::new(&settings.rpc_url)?
        .with_poll_interval(settings.receipt_poll_interval());
    let registry = AccountRegistry::with_default(&key)?;
    let engine = TransactionEngine::new(
        Arc::new(gateway),
        Arc::new(registry),
        EngineConfig::from_settings(&settings)?,
    );
    let mut wallet = WalletClient::new(Arc::new(engine), settings.native_currency());

    let identity = wallet.identity()?;
    info!(
        network = %settings.name,
        chain_id = settings.chain_id,
        address = %identity.checksum_address(),
        "Wallet ready"
    );

    let balance = wallet.balance().await?;
    println!("Network: {} (chain {})", settings.name, settings.chain_id);
    println!("Address: {}", identity.checksum_address());
    println!("Balance: {} {}", balance, wallet.symbol().await?);
    if let Some(explorer) = &settings.explorer_url {
        println!("Explorer: {}/address/{}", explorer.trim_end_matches('/'), identity.address());
    }

    Ok(())
}
