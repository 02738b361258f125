// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Spot price source used for swap estimation.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::ConfigError;

/// Default public ticker endpoint.
pub const DEFAULT_EXCHANGE_URL: &str = "https://api.binance.com";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Spot exchange rate between two token symbols.
#[async_trait]
pub trait PriceOracle: Send + Sync {
    /// Units of `quote` per one unit of `base`, or `None` when no quote is
    /// available. Never retried.
    async fn price(&self, base: &str, quote: &str) -> Option<Decimal>;
}

#[derive(Debug, Deserialize)]
struct TickerPrice {
    price: String,
}

/// Exchange ticker (`GET /api/v3/ticker/price?symbol=ETHUSDC`).
#[derive(Debug, Clone)]
pub struct ExchangePriceOracle {
    base_url: String,
    client: reqwest::Client,
}

impl ExchangePriceOracle {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ConfigError::Invalid(format!("HTTP client: {e}")))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    fn ticker_url(&self, base: &str, quote: &str) -> String {
        format!(
            "{}/api/v3/ticker/price?symbol={}{}",
            self.base_url,
            base.to_uppercase(),
            quote.to_uppercase()
        )
    }
}

fn parse_ticker(body: &str) -> Option<Decimal> {
    let ticker: TickerPrice = serde_json::from_str(body).ok()?;
    Decimal::from_str(&ticker.price).ok()
}

#[async_trait]
impl PriceOracle for ExchangePriceOracle {
    async fn price(&self, base: &str, quote: &str) -> Option<Decimal> {
        let url = self.ticker_url(base, quote);
        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(base, quote, error = %e, "Price request failed");
                return None;
            }
        };

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            warn!(base, quote, status = %status, "Price endpoint returned non-200");
            return None;
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!(base, quote, error = %e, "Failed to read price response");
                return None;
            }
        };

        let price = parse_ticker(&body);
        match price {
            Some(price) => debug!(base, quote, price = %price, "Price fetched"),
            None => warn!(base, quote, "Malformed price payload"),
        }
        price
    }
}

/// Fixed rates, for tests and offline use.
#[derive(Debug, Clone, Default)]
pub struct StaticPriceOracle {
    rates: std::collections::HashMap<(String, String), Decimal>,
}

impl StaticPriceOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rate(mut self, base: &str, quote: &str, rate: Decimal) -> Self {
        self.rates
            .insert((base.to_uppercase(), quote.to_uppercase()), rate);
        self
    }
}

#[async_trait]
impl PriceOracle for StaticPriceOracle {
    async fn price(&self, base: &str, quote: &str) -> Option<Decimal> {
        self.rates
            .get(&(base.to_uppercase(), quote.to_uppercase()))
            .copied()
    }
}
