use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::ParseError;

/// Prediction categories, shortest horizon first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeframeKind {
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
}

impl TimeframeKind {
    pub const ALL: [TimeframeKind; 6] = [
        TimeframeKind::Hourly,
        TimeframeKind::Daily,
        TimeframeKind::Weekly,
        TimeframeKind::Monthly,
        TimeframeKind::Quarterly,
        TimeframeKind::Yearly,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TimeframeKind::Hourly => "Hourly",
            TimeframeKind::Daily => "Daily",
            TimeframeKind::Weekly => "Weekly",
            TimeframeKind::Monthly => "Monthly",
            TimeframeKind::Quarterly => "Quarterly",
            TimeframeKind::Yearly => "Yearly",
        }
    }
}

impl FromStr for TimeframeKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TimeframeKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseError::UnknownTimeframe(s.to_string()))
    }
}

impl fmt::Display for TimeframeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the status line should say. Rendering into a language happens in
/// `presentation`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum WindowStatus {
    /// Pre-open: the prediction targets the end of the first trading hour.
    OpeningHour,
    MaxScore { score: u8 },
    /// The prediction targets the close of a later day.
    ForDate { date: NaiveDate },
    MarketClosed,
    InvalidType,
}

impl WindowStatus {
    pub fn code(&self) -> &'static str {
        match self {
            WindowStatus::OpeningHour => "opening_hour",
            WindowStatus::MaxScore { .. } => "max_score",
            WindowStatus::ForDate { .. } => "for_date",
            WindowStatus::MarketClosed => "market_closed",
            WindowStatus::InvalidType => "invalid_type",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionWindowResult {
    /// Whether a new prediction of this kind may be submitted now.
    pub is_open: bool,
    /// When the prediction is assessed. `None` when the window is closed.
    pub deadline: Option<DateTime<Utc>>,
    /// Best score still achievable, 0-100.
    pub max_score_ceiling: u8,
    /// Share of the window still remaining, 0-100.
    pub progress_fraction: f64,
    pub status: WindowStatus,
}

impl PredictionWindowResult {
    pub fn market_closed() -> Self {
        Self {
            is_open: false,
            deadline: None,
            max_score_ceiling: 100,
            progress_fraction: 0.0,
            status: WindowStatus::MarketClosed,
        }
    }

    pub fn invalid_type() -> Self {
        Self {
            is_open: false,
            deadline: None,
            max_score_ceiling: 100,
            progress_fraction: 0.0,
            status: WindowStatus::InvalidType,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timeframe_case_insensitive() {
        assert_eq!("daily".parse::<TimeframeKind>().unwrap(), TimeframeKind::Daily);
        assert_eq!(" Quarterly ".parse::<TimeframeKind>().unwrap(), TimeframeKind::Quarterly);
        assert_eq!(
            "Biweekly".parse::<TimeframeKind>(),
            Err(ParseError::UnknownTimeframe("Biweekly".to_string()))
        );
    }

    #[test]
    fn test_timeframe_display_round_trips() {
        for kind in TimeframeKind::ALL {
            assert_eq!(kind.to_string().parse::<TimeframeKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_status_serializes_with_code_tag() {
        let json = serde_json::to_value(WindowStatus::MaxScore { score: 90 }).unwrap();
        assert_eq!(json["code"], "max_score");
        assert_eq!(json["score"], 90);

        let date = NaiveDate::from_ymd_opt(2023, 12, 26).unwrap();
        let json = serde_json::to_value(WindowStatus::ForDate { date }).unwrap();
        assert_eq!(json["code"], "for_date");
        assert_eq!(json["date"], "2023-12-26");
    }
}
