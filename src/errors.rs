/// Failures turning user or feed input into typed values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("Unknown prediction timeframe: {0}")]
    UnknownTimeframe(String),

    #[error("Unknown market state: {0}")]
    UnknownMarketState(String),

    #[error("Unsupported locale: {0}")]
    UnknownLocale(String),
}
