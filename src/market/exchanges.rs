use chrono_tz::{America, Europe, UTC};
use regex::Regex;
use std::sync::OnceLock;

use crate::market::types::{ExchangeCalendar, ExchangeId, SessionKind};

const fn hm(hour: u32, minute: u32) -> u32 {
    hour * 60 + minute
}

static US: ExchangeCalendar = ExchangeCalendar {
    id: ExchangeId::Us,
    name: "US Market (NYSE/NASDAQ)",
    timezone: America::New_York,
    open_minute: hm(9, 30),
    close_minute: hm(16, 0),
    kind: SessionKind::Standard,
};

static XETRA: ExchangeCalendar = ExchangeCalendar {
    id: ExchangeId::Xetra,
    name: "Deutsche Börse (XETRA)",
    timezone: Europe::Berlin,
    open_minute: hm(9, 0),
    close_minute: hm(17, 30),
    kind: SessionKind::Standard,
};

static EURONEXT: ExchangeCalendar = ExchangeCalendar {
    id: ExchangeId::Euronext,
    name: "Euronext (Paris/Amsterdam)",
    timezone: Europe::Paris,
    open_minute: hm(9, 0),
    close_minute: hm(17, 30),
    kind: SessionKind::Standard,
};

static LONDON: ExchangeCalendar = ExchangeCalendar {
    id: ExchangeId::London,
    name: "London Stock Exchange",
    timezone: Europe::London,
    open_minute: hm(8, 0),
    close_minute: hm(16, 30),
    kind: SessionKind::Standard,
};

static ISTANBUL: ExchangeCalendar = ExchangeCalendar {
    id: ExchangeId::Istanbul,
    name: "Borsa Istanbul (BIST)",
    timezone: Europe::Istanbul,
    open_minute: hm(10, 0),
    close_minute: hm(18, 0),
    kind: SessionKind::Standard,
};

static CRYPTO: ExchangeCalendar = ExchangeCalendar {
    id: ExchangeId::Crypto,
    name: "Cryptocurrency",
    timezone: UTC,
    open_minute: hm(0, 0),
    close_minute: hm(23, 59),
    kind: SessionKind::Continuous,
};

static FOREX: ExchangeCalendar = ExchangeCalendar {
    id: ExchangeId::Forex,
    name: "Forex",
    timezone: America::New_York,
    open_minute: hm(17, 0),
    close_minute: hm(17, 0),
    kind: SessionKind::WeekendStraddling,
};

impl ExchangeId {
    pub const ALL: [ExchangeId; 7] = [
        ExchangeId::Us,
        ExchangeId::Xetra,
        ExchangeId::Euronext,
        ExchangeId::London,
        ExchangeId::Istanbul,
        ExchangeId::Crypto,
        ExchangeId::Forex,
    ];

    pub fn calendar(self) -> &'static ExchangeCalendar {
        match self {
            ExchangeId::Us => &US,
            ExchangeId::Xetra => &XETRA,
            ExchangeId::Euronext => &EURONEXT,
            ExchangeId::London => &LONDON,
            ExchangeId::Istanbul => &ISTANBUL,
            ExchangeId::Crypto => &CRYPTO,
            ExchangeId::Forex => &FOREX,
        }
    }

    /// Maps a listing suffix (the part after the last dot) to its exchange.
    fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "DE" => Some(ExchangeId::Xetra),
            "PA" | "AS" => Some(ExchangeId::Euronext),
            "L" => Some(ExchangeId::London),
            "IS" => Some(ExchangeId::Istanbul),
            _ => None,
        }
    }
}

fn crypto_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"-USD|(?:BTC|ETH)$").expect("valid crypto pattern"))
}

fn forex_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"=X|^GC=F$").expect("valid forex pattern"))
}

fn suffix_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\.([A-Z]+)$").expect("valid suffix pattern"))
}

/// Resolve the exchange a ticker trades on.
/// Order matters: crypto pairs, then forex/futures, then listing suffix. Unknown suffixes
/// and bare symbols are US listings.
pub fn resolve_exchange(ticker: &str) -> ExchangeId {
    let upper = ticker.trim().to_uppercase();
    if upper.is_empty() {
        return ExchangeId::Us;
    }

    if crypto_pattern().is_match(&upper) {
        return ExchangeId::Crypto;
    }

    if forex_pattern().is_match(&upper) {
        return ExchangeId::Forex;
    }

    suffix_pattern()
        .captures(&upper)
        .and_then(|cap| ExchangeId::from_suffix(&cap[1]))
        .unwrap_or(ExchangeId::Us)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_listing_suffixes() {
        assert_eq!(resolve_exchange("AAPL"), ExchangeId::Us);
        assert_eq!(resolve_exchange("SIE.DE"), ExchangeId::Xetra);
        assert_eq!(resolve_exchange("MC.PA"), ExchangeId::Euronext);
        assert_eq!(resolve_exchange("ASML.AS"), ExchangeId::Euronext);
        assert_eq!(resolve_exchange("BARC.L"), ExchangeId::London);
        assert_eq!(resolve_exchange("thyao.is"), ExchangeId::Istanbul);
    }

    #[test]
    fn test_resolve_crypto_and_forex() {
        assert_eq!(resolve_exchange("BTC-USD"), ExchangeId::Crypto);
        assert_eq!(resolve_exchange("ethbtc"), ExchangeId::Crypto);
        assert_eq!(resolve_exchange("SOLETH"), ExchangeId::Crypto);
        assert_eq!(resolve_exchange("EURUSD=X"), ExchangeId::Forex);
        assert_eq!(resolve_exchange("GC=F"), ExchangeId::Forex);
    }

    #[test]
    fn test_unknown_suffix_and_empty_default_to_us() {
        assert_eq!(resolve_exchange(""), ExchangeId::Us);
        assert_eq!(resolve_exchange("7203.T"), ExchangeId::Us);
        assert_eq!(resolve_exchange("BRK.B"), ExchangeId::Us);
    }

    #[test]
    fn test_calendars_are_consistent() {
        for id in ExchangeId::ALL {
            let cal = id.calendar();
            assert_eq!(cal.id, id);
            assert!(cal.open_minute < 24 * 60);
            assert!(cal.close_minute < 24 * 60);
        }
        assert!(ExchangeId::Crypto.calendar().is_continuous());
        assert!(ExchangeId::Forex.calendar().is_weekend_straddling());
        assert!(ExchangeId::Forex.calendar().is_overnight());
        assert!(!ExchangeId::Us.calendar().is_overnight());
    }
}
