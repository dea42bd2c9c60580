//! Spot price source abstraction

pub mod coinbase;

pub use coinbase::CoinbaseOracle;

use async_trait::async_trait;
use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

/// Decimal places prices are normalized to (USD cents)
pub const PRICE_SCALE: u32 = 2;

/// Errors that can occur when fetching a price
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Network request failed
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// Invalid response from provider
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Provider API error
    #[error("Provider API error: {0}")]
    ApiError(String),

    /// Timeout waiting for response
    #[error("Request timeout")]
    Timeout,
}

/// Source of the current BTC-USD spot price
#[async_trait]
pub trait PriceOracle: Send + Sync {
    /// Fetch the current price, normalized with [`normalize_price`]
    async fn current_price(&self) -> Result<Decimal, ProviderError>;

    /// Returns the name of this provider
    fn provider_name(&self) -> &'static str;
}

/// Round to cents and reject quotes that are not positive after rounding
pub fn normalize_price(raw: Decimal) -> Result<Decimal, ProviderError> {
    let price = raw.round_dp_with_strategy(PRICE_SCALE, RoundingStrategy::MidpointAwayFromZero);
    if price <= Decimal::ZERO {
        return Err(ProviderError::InvalidResponse(format!(
            "non-positive price: {}",
            raw
        )));
    }
    Ok(price)
}
