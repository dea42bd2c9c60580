//! Coinbase spot price provider

use super::{normalize_price, PriceOracle, ProviderError};
use crate::config::OracleConfig;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use tracing::{debug, warn};

const EXPECTED_CURRENCY: &str = "USD";

/// Coinbase `/v2/prices/{pair}/spot` response
#[derive(Debug, Deserialize)]
struct SpotResponse {
    data: SpotData,
}

#[derive(Debug, Deserialize)]
struct SpotData {
    amount: String,
    #[serde(default)]
    base: Option<String>,
    currency: String,
}

/// Coinbase price provider
pub struct CoinbaseOracle {
    client: Client,
    url: String,
}

impl CoinbaseOracle {
    /// Creates a provider from the injected oracle configuration
    pub fn new(config: &OracleConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(ProviderError::NetworkError)?;

        Ok(Self {
            client,
            url: config.url.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Parses a spot response body into a normalized USD price
    fn parse_body(body: &str) -> Result<Decimal, ProviderError> {
        let response: SpotResponse = serde_json::from_str(body)
            .map_err(|e| ProviderError::InvalidResponse(format!("malformed spot body: {}", e)))?;

        let data = response.data;
        if !data.currency.eq_ignore_ascii_case(EXPECTED_CURRENCY) {
            return Err(ProviderError::InvalidResponse(format!(
                "expected {} quote, got {}",
                EXPECTED_CURRENCY, data.currency
            )));
        }

        let amount = Decimal::from_str(data.amount.trim()).map_err(|e| {
            ProviderError::InvalidResponse(format!("invalid amount {:?}: {}", data.amount, e))
        })?;

        debug!(
            base = data.base.as_deref().unwrap_or("?"),
            %amount,
            "Parsed spot price"
        );

        normalize_price(amount)
    }
}

fn map_transport_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout
    } else {
        ProviderError::NetworkError(err)
    }
}

#[async_trait]
impl PriceOracle for CoinbaseOracle {
    async fn current_price(&self) -> Result<Decimal, ProviderError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            warn!("Coinbase rate limit hit");
            return Err(ProviderError::RateLimitExceeded);
        }
        if !status.is_success() {
            return Err(ProviderError::ApiError(format!(
                "Coinbase returned HTTP {}",
                status
            )));
        }

        let body = response.text().await.map_err(map_transport_error)?;
        Self::parse_body(&body)
    }

    fn provider_name(&self) -> &'static str {
        "coinbase"
    }
}
