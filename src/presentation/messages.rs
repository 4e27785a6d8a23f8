use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::errors::ParseError;
use crate::market::AssetMarketContext;
use crate::window::{PredictionWindowResult, TimeframeKind, WindowStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    En,
    Tr,
    De,
}

impl Locale {
    fn chrono_locale(self) -> chrono::Locale {
        match self {
            Locale::En => chrono::Locale::en_US,
            Locale::Tr => chrono::Locale::tr_TR,
            Locale::De => chrono::Locale::de_DE,
        }
    }

    /// Short weekday, short month, day of month.
    fn date_pattern(self) -> &'static str {
        match self {
            Locale::En => "%a, %b %-d",
            Locale::Tr => "%-d %b %a",
            Locale::De => "%a, %-d. %b",
        }
    }
}

impl FromStr for Locale {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lang = s.trim().split(['-', '_']).next().unwrap_or_default();
        match lang.to_lowercase().as_str() {
            "en" => Ok(Locale::En),
            "tr" => Ok(Locale::Tr),
            "de" => Ok(Locale::De),
            _ => Err(ParseError::UnknownLocale(s.to_string())),
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Locale::En => "en",
            Locale::Tr => "tr",
            Locale::De => "de",
        };
        f.write_str(tag)
    }
}

pub fn format_date(date: NaiveDate, locale: Locale) -> String {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
        .format_localized(locale.date_pattern(), locale.chrono_locale())
        .to_string()
}

pub fn render_status(status: &WindowStatus, locale: Locale) -> String {
    match (status, locale) {
        (WindowStatus::OpeningHour, Locale::En) => "Prediction for the opening hour".to_string(),
        (WindowStatus::OpeningHour, Locale::Tr) => "Açılış saati tahmini".to_string(),
        (WindowStatus::OpeningHour, Locale::De) => {
            "Prognose für die Eröffnungsstunde".to_string()
        }

        (WindowStatus::MaxScore { score }, Locale::En) => format!("Max Rating: {}", score),
        (WindowStatus::MaxScore { score }, Locale::Tr) => format!("Maks. Puan: {}", score),
        (WindowStatus::MaxScore { score }, Locale::De) => format!("Max. Bewertung: {}", score),

        (WindowStatus::ForDate { date }, Locale::En) => {
            format!("Prediction for {}", format_date(*date, locale))
        }
        (WindowStatus::ForDate { date }, Locale::Tr) => {
            format!("{} için tahmin", format_date(*date, locale))
        }
        (WindowStatus::ForDate { date }, Locale::De) => {
            format!("Prognose für {}", format_date(*date, locale))
        }

        (WindowStatus::MarketClosed, Locale::En) => "Market Closed".to_string(),
        (WindowStatus::MarketClosed, Locale::Tr) => "Piyasa Kapalı".to_string(),
        (WindowStatus::MarketClosed, Locale::De) => "Markt geschlossen".to_string(),

        (WindowStatus::InvalidType, Locale::En) => "Invalid prediction type".to_string(),
        (WindowStatus::InvalidType, Locale::Tr) => "Geçersiz tahmin türü".to_string(),
        (WindowStatus::InvalidType, Locale::De) => "Ungültiger Prognosetyp".to_string(),
    }
}

/// CSS-style width for the penalty bar, never negative.
pub fn progress_bar_width(progress: f64) -> String {
    format!("{}%", progress.max(0.0))
}

/// `1d 2h 3m 4s`, dropping leading zero units. Minutes are kept when nothing larger is
/// shown; an elapsed deadline reads `0m 0s`.
pub fn format_time_left(left: Duration, locale: Locale) -> String {
    let (d, h, m, s) = match locale {
        Locale::En => ("d", "h", "m", "s"),
        Locale::Tr => ("g", "sa", "dk", "sn"),
        Locale::De => ("T", "Std", "Min", "Sek"),
    };

    if left < Duration::zero() {
        return format!("0{} 0{}", m, s);
    }

    let total = left.num_seconds();
    let days = total / 86_400;
    let hours = (total % 86_400) / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    let mut parts = Vec::with_capacity(4);
    if days > 0 {
        parts.push(format!("{}{}", days, d));
    }
    if hours > 0 {
        parts.push(format!("{}{}", hours, h));
    }
    if minutes > 0 || (days == 0 && hours == 0) {
        parts.push(format!("{}{}", minutes, m));
    }
    parts.push(format!("{}{}", seconds, s));

    parts.join(" ")
}

/// A computed window plus everything a client needs to display it.
#[derive(Debug, Clone, Serialize)]
pub struct WindowView {
    pub ticker: String,
    pub exchange: &'static str,
    pub timeframe: String,
    #[serde(flatten)]
    pub result: PredictionWindowResult,
    pub message: String,
    pub bar_width: String,
    pub time_left: Option<String>,
}

impl WindowView {
    pub fn new(
        ctx: &AssetMarketContext,
        timeframe: TimeframeKind,
        result: PredictionWindowResult,
        now: DateTime<Utc>,
        locale: Locale,
    ) -> Self {
        Self {
            ticker: ctx.symbol.clone(),
            exchange: ctx.calendar().name,
            timeframe: timeframe.to_string(),
            message: render_status(&result.status, locale),
            bar_width: progress_bar_width(result.progress_fraction),
            time_left: result.deadline.map(|deadline| format_time_left(deadline - now, locale)),
            result,
        }
    }
}

impl fmt::Display for WindowView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {}: {} | bar {}",
            self.ticker, self.exchange, self.timeframe, self.message, self.bar_width
        )?;
        match (&self.result.deadline, &self.time_left) {
            (Some(deadline), Some(left)) => {
                write!(f, " | deadline {} ({})", deadline.to_rfc3339(), left)
            }
            _ => Ok(()),
        }
    }
}
