pub mod exchanges;
pub mod hours;
pub mod quote_feed;
pub mod types;

pub use exchanges::resolve_exchange;
pub use types::{AssetMarketContext, ExchangeCalendar, ExchangeId, MarketState, SessionKind};
