use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::FeedConfig;
use crate::market::types::MarketState;

/// Client for a Yahoo-style quote endpoint, used only for its `marketState` field.
pub struct QuoteFeed {
    client: Client,
    quote_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteEnvelope {
    quote_response: QuoteResponse,
}

#[derive(Debug, Deserialize)]
struct QuoteResponse {
    #[serde(default)]
    result: Vec<Quote>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Quote {
    symbol: String,
    market_state: Option<String>,
}

impl QuoteFeed {
    pub fn new(config: &FeedConfig) -> Result<Self, FeedError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            quote_url: config.quote_url.clone(),
        })
    }

    /// Fetch the live session state for `symbol`.
    pub async fn fetch_market_state(&self, symbol: &str) -> Result<MarketState, FeedError> {
        let symbol = symbol.trim().to_uppercase();
        debug!("Fetching market state for {}", symbol);

        let response = self.client
            .get(&self.quote_url)
            .query(&[("symbols", symbol.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        parse_quote_response(&body, &symbol)
    }

    /// Like `fetch_market_state`, but a failed lookup means "not reported" so the caller
    /// falls back to the exchange calendar.
    pub async fn market_state_or_fallback(&self, symbol: &str) -> Option<MarketState> {
        reported_state(self.fetch_market_state(symbol).await, symbol)
    }
}

/// Turn a lookup outcome into the reported state; `None` selects the calendar fallback.
pub fn reported_state(
    lookup: Result<MarketState, FeedError>,
    symbol: &str,
) -> Option<MarketState> {
    match lookup {
        Ok(state) => Some(state),
        Err(FeedError::StateMissing(_)) => {
            debug!("No market state quoted for {} - using calendar", symbol);
            None
        }
        Err(e) => {
            warn!("Market state unavailable for {}: {} - using calendar", symbol, e);
            None
        }
    }
}

/// Extract the market state for `symbol` from a quote response body.
/// A quote without a `marketState` field is `StateMissing`, not UNKNOWN.
pub fn parse_quote_response(body: &str, symbol: &str) -> Result<MarketState, FeedError> {
    let envelope: QuoteEnvelope = serde_json::from_str(body)?;

    let quote = envelope
        .quote_response
        .result
        .into_iter()
        .find(|q| q.symbol.eq_ignore_ascii_case(symbol))
        .ok_or_else(|| FeedError::SymbolMissing(symbol.to_string()))?;

    quote
        .market_state
        .as_deref()
        .map(MarketState::from_feed)
        .ok_or(FeedError::StateMissing(quote.symbol))
}

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("Quote request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Quote endpoint returned HTTP {0}")]
    Status(u16),

    #[error("Malformed quote response: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Symbol {0} missing from quote response")]
    SymbolMissing(String),

    #[error("Quote for {0} carries no market state")]
    StateMissing(String),
}
