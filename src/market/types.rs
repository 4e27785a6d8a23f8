use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::ParseError;
use crate::market::exchanges::resolve_exchange;

/// Exchanges with a known trading calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExchangeId {
    Us,
    Xetra,
    Euronext,
    London,
    Istanbul,
    Crypto,
    Forex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    /// Weekdays between open and close, local time.
    Standard,
    /// Trades every minute of every day.
    Continuous,
    /// Opens Sunday at `open`, runs overnight, closes Friday at `close`.
    WeekendStraddling,
}

#[derive(Debug, Clone, Copy)]
pub struct ExchangeCalendar {
    pub id: ExchangeId,
    pub name: &'static str,
    pub timezone: Tz,
    /// Minutes after local midnight.
    pub open_minute: u32,
    pub close_minute: u32,
    pub kind: SessionKind,
}

impl ExchangeCalendar {
    pub fn is_continuous(&self) -> bool {
        self.kind == SessionKind::Continuous
    }

    pub fn is_weekend_straddling(&self) -> bool {
        self.kind == SessionKind::WeekendStraddling
    }

    /// True when a session runs across local midnight (close at or before open).
    pub fn is_overnight(&self) -> bool {
        self.close_minute <= self.open_minute
    }
}

/// Session status as reported by a live quote feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MarketState {
    Regular,
    Pre,
    Post,
    Closed,
    Unknown,
}

impl MarketState {
    /// REGULAR and PRE count as trading for the current day.
    pub fn is_tradable(self) -> bool {
        matches!(self, MarketState::Regular | MarketState::Pre)
    }

    /// Maps raw feed strings, folding the extended-hours variants.
    pub fn from_feed(raw: &str) -> Self {
        match raw.trim().to_uppercase().as_str() {
            "REGULAR" => MarketState::Regular,
            "PRE" => MarketState::Pre,
            "POST" | "POSTPOST" => MarketState::Post,
            "CLOSED" | "PREPRE" => MarketState::Closed,
            _ => MarketState::Unknown,
        }
    }
}

impl FromStr for MarketState {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "REGULAR" => Ok(MarketState::Regular),
            "PRE" => Ok(MarketState::Pre),
            "POST" => Ok(MarketState::Post),
            "CLOSED" => Ok(MarketState::Closed),
            "UNKNOWN" => Ok(MarketState::Unknown),
            _ => Err(ParseError::UnknownMarketState(s.to_string())),
        }
    }
}

impl fmt::Display for MarketState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MarketState::Regular => "REGULAR",
            MarketState::Pre => "PRE",
            MarketState::Post => "POST",
            MarketState::Closed => "CLOSED",
            MarketState::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

/// Everything the calculator needs to know about the asset being predicted.
#[derive(Debug, Clone)]
pub struct AssetMarketContext {
    pub symbol: String,
    pub exchange: ExchangeId,
    pub market_state: Option<MarketState>,
}

impl AssetMarketContext {
    pub fn new(symbol: &str, market_state: Option<MarketState>) -> Self {
        Self {
            symbol: symbol.trim().to_uppercase(),
            exchange: resolve_exchange(symbol),
            market_state,
        }
    }

    pub fn calendar(&self) -> &'static ExchangeCalendar {
        self.exchange.calendar()
    }
}
