//! Session arithmetic in an exchange's local timezone.
//!
//! Without a reported market state the calendar is only an approximation: it knows
//! weekends and regular hours but nothing about holidays or shortened sessions. The
//! quote feed is the source of truth whenever it reports a state.

use chrono::{
    DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc,
    Weekday,
};
use chrono_tz::Tz;

use crate::market::types::{AssetMarketContext, ExchangeCalendar, MarketState, SessionKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Inside the window right before the open.
    PreOpen,
    Regular,
    Closed,
}

/// Convert a local wall-clock time to UTC. Ambiguous times (DST fall-back) take the
/// earlier instant; skipped times (spring-forward) move past the gap.
pub fn resolve_local(tz: Tz, naive: NaiveDateTime) -> DateTime<Utc> {
    if let Some(dt) = tz.from_local_datetime(&naive).earliest() {
        return dt.with_timezone(&Utc);
    }

    let shifted = naive + Duration::hours(1);
    match tz.from_local_datetime(&shifted).earliest() {
        Some(dt) => dt.with_timezone(&Utc),
        None => Utc.from_utc_datetime(&naive),
    }
}

fn at_minute(date: NaiveDate, minute_of_day: u32) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN) + Duration::minutes(i64::from(minute_of_day))
}

pub fn local_date(cal: &ExchangeCalendar, now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&cal.timezone).date_naive()
}

fn local_minute(cal: &ExchangeCalendar, now: DateTime<Utc>) -> u32 {
    let local = now.with_timezone(&cal.timezone);
    local.hour() * 60 + local.minute()
}

/// Days that have a session close. Continuous markets trade every day.
pub fn is_trading_day(cal: &ExchangeCalendar, date: NaiveDate) -> bool {
    match cal.kind {
        SessionKind::Continuous => true,
        SessionKind::Standard | SessionKind::WeekendStraddling => {
            !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
        }
    }
}

pub fn next_trading_day(cal: &ExchangeCalendar, date: NaiveDate) -> NaiveDate {
    let mut next = date + Duration::days(1);
    while !is_trading_day(cal, next) {
        next += Duration::days(1);
    }
    next
}

/// Close of the session that ends on `date`.
pub fn session_close(cal: &ExchangeCalendar, date: NaiveDate) -> DateTime<Utc> {
    resolve_local(cal.timezone, at_minute(date, cal.close_minute))
}

/// Open of the session that ends on `date`. Overnight sessions open the evening before.
pub fn session_open(cal: &ExchangeCalendar, date: NaiveDate) -> DateTime<Utc> {
    let open_date = if cal.is_overnight() {
        date - Duration::days(1)
    } else {
        date
    };
    resolve_local(cal.timezone, at_minute(open_date, cal.open_minute))
}

/// The opening bell on the calendar date `date`, whichever session it starts.
pub fn opening_bell(cal: &ExchangeCalendar, date: NaiveDate) -> DateTime<Utc> {
    resolve_local(cal.timezone, at_minute(date, cal.open_minute))
}

/// Local midnight starting `date`.
pub fn start_of_day(cal: &ExchangeCalendar, date: NaiveDate) -> DateTime<Utc> {
    resolve_local(cal.timezone, at_minute(date, 0))
}

/// Calendar-only open check.
pub fn calendar_is_open(cal: &ExchangeCalendar, now: DateTime<Utc>) -> bool {
    let weekday = now.with_timezone(&cal.timezone).weekday();
    let minute = local_minute(cal, now);

    match cal.kind {
        SessionKind::Continuous => true,
        SessionKind::WeekendStraddling => match weekday {
            Weekday::Sat => false,
            Weekday::Fri => minute < cal.close_minute,
            Weekday::Sun => minute >= cal.open_minute,
            _ => true,
        },
        SessionKind::Standard => {
            is_trading_day(cal, local_date(cal, now))
                && minute >= cal.open_minute
                && minute < cal.close_minute
        }
    }
}

/// The `window_minutes` right before a session opens. Overnight sessions only have one
/// real opening per week (Sunday evening); continuous markets never open.
pub fn in_pre_open_window(cal: &ExchangeCalendar, now: DateTime<Utc>, window_minutes: u32) -> bool {
    let weekday = now.with_timezone(&cal.timezone).weekday();
    let minute = local_minute(cal, now);
    let window_start = cal.open_minute.saturating_sub(window_minutes);
    let in_window = minute >= window_start && minute < cal.open_minute;

    match cal.kind {
        SessionKind::Continuous => false,
        SessionKind::WeekendStraddling => weekday == Weekday::Sun && in_window,
        SessionKind::Standard => is_trading_day(cal, local_date(cal, now)) && in_window,
    }
}

/// Reported state first, calendar second.
pub fn session_phase(
    ctx: &AssetMarketContext,
    now: DateTime<Utc>,
    pre_open_minutes: u32,
) -> SessionPhase {
    let cal = ctx.calendar();

    match ctx.market_state {
        Some(MarketState::Regular) => SessionPhase::Regular,
        Some(MarketState::Pre) if in_pre_open_window(cal, now, pre_open_minutes) => {
            SessionPhase::PreOpen
        }
        Some(_) => SessionPhase::Closed,
        None if calendar_is_open(cal, now) => SessionPhase::Regular,
        None if in_pre_open_window(cal, now, pre_open_minutes) => SessionPhase::PreOpen,
        None => SessionPhase::Closed,
    }
}

/// Whether today's close is still a valid target: the market must be trading today
/// (reported REGULAR/PRE, or a calendar trading day) and the close must not have passed.
pub fn trades_today(ctx: &AssetMarketContext, now: DateTime<Utc>) -> bool {
    let cal = ctx.calendar();
    let today = local_date(cal, now);

    let tradable = match ctx.market_state {
        Some(state) => state.is_tradable(),
        None => is_trading_day(cal, today),
    };

    tradable && now < session_close(cal, today)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::types::ExchangeId;
    use chrono_tz::America::New_York;

    fn ny(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        New_York.with_ymd_and_hms(y, m, d, h, min, 0).unwrap().with_timezone(&Utc)
    }

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn test_us_session_bounds_follow_dst() {
        let cal = ExchangeId::Us.calendar();
        let summer = NaiveDate::from_ymd_opt(2023, 10, 23).unwrap();
        let winter = NaiveDate::from_ymd_opt(2023, 12, 26).unwrap();

        assert_eq!(session_open(cal, summer), utc(2023, 10, 23, 13, 30));
        assert_eq!(session_close(cal, summer), utc(2023, 10, 23, 20, 0));
        assert_eq!(session_close(cal, winter), utc(2023, 12, 26, 21, 0));
    }

    #[test]
    fn test_forex_session_opens_previous_evening() {
        let cal = ExchangeId::Forex.calendar();
        let monday = NaiveDate::from_ymd_opt(2023, 10, 23).unwrap();
        assert_eq!(session_open(cal, monday), ny(2023, 10, 22, 17, 0));
        assert_eq!(session_close(cal, monday), ny(2023, 10, 23, 17, 0));
    }

    #[test]
    fn test_calendar_open_standard() {
        let cal = ExchangeId::Us.calendar();
        assert!(calendar_is_open(cal, ny(2023, 10, 23, 10, 0)));
        assert!(!calendar_is_open(cal, ny(2023, 10, 23, 9, 29)));
        assert!(!calendar_is_open(cal, ny(2023, 10, 23, 16, 0)));
        assert!(!calendar_is_open(cal, ny(2023, 10, 21, 12, 0)));
    }

    #[test]
    fn test_calendar_open_forex_weekend() {
        let cal = ExchangeId::Forex.calendar();
        assert!(calendar_is_open(cal, ny(2023, 10, 25, 20, 0)));
        assert!(calendar_is_open(cal, ny(2023, 10, 27, 16, 59)));
        assert!(!calendar_is_open(cal, ny(2023, 10, 27, 17, 0)));
        assert!(!calendar_is_open(cal, ny(2023, 10, 28, 12, 0)));
        assert!(!calendar_is_open(cal, ny(2023, 10, 29, 16, 59)));
        assert!(calendar_is_open(cal, ny(2023, 10, 29, 17, 0)));
    }

    #[test]
    fn test_calendar_open_crypto_always() {
        let cal = ExchangeId::Crypto.calendar();
        assert!(calendar_is_open(cal, utc(2023, 10, 21, 3, 0)));
        assert!(calendar_is_open(cal, utc(2023, 12, 25, 23, 59)));
    }

    #[test]
    fn test_pre_open_window() {
        let us = ExchangeId::Us.calendar();
        assert!(in_pre_open_window(us, ny(2023, 10, 23, 9, 0), 30));
        assert!(in_pre_open_window(us, ny(2023, 10, 23, 9, 29), 30));
        assert!(!in_pre_open_window(us, ny(2023, 10, 23, 8, 59), 30));
        assert!(!in_pre_open_window(us, ny(2023, 10, 23, 9, 30), 30));
        assert!(!in_pre_open_window(us, ny(2023, 10, 21, 9, 10), 30));

        let fx = ExchangeId::Forex.calendar();
        assert!(in_pre_open_window(fx, ny(2023, 10, 29, 16, 45), 30));
        assert!(!in_pre_open_window(fx, ny(2023, 10, 25, 16, 45), 30));

        let crypto = ExchangeId::Crypto.calendar();
        assert!(!in_pre_open_window(crypto, utc(2023, 10, 23, 23, 45), 30));
    }

    #[test]
    fn test_reported_state_overrides_calendar() {
        let now = ny(2023, 12, 25, 10, 0);
        let closed = AssetMarketContext::new("AAPL", Some(MarketState::Closed));
        let unreported = AssetMarketContext::new("AAPL", None);

        assert_eq!(session_phase(&closed, now, 30), SessionPhase::Closed);
        assert_eq!(session_phase(&unreported, now, 30), SessionPhase::Regular);
        assert!(!trades_today(&closed, now));
        assert!(trades_today(&unreported, now));
    }

    #[test]
    fn test_pre_state_outside_window_is_closed() {
        let ctx = AssetMarketContext::new("AAPL", Some(MarketState::Pre));
        assert_eq!(session_phase(&ctx, ny(2023, 10, 23, 6, 0), 30), SessionPhase::Closed);
        assert_eq!(session_phase(&ctx, ny(2023, 10, 23, 9, 15), 30), SessionPhase::PreOpen);
    }

    #[test]
    fn test_trades_today_requires_close_ahead() {
        let ctx = AssetMarketContext::new("AAPL", Some(MarketState::Regular));
        assert!(trades_today(&ctx, ny(2023, 10, 23, 15, 59)));
        assert!(!trades_today(&ctx, ny(2023, 10, 23, 16, 30)));
    }

    #[test]
    fn test_next_trading_day_skips_weekend() {
        let us = ExchangeId::Us.calendar();
        let friday = NaiveDate::from_ymd_opt(2023, 10, 27).unwrap();
        assert_eq!(next_trading_day(us, friday), NaiveDate::from_ymd_opt(2023, 10, 30).unwrap());

        let crypto = ExchangeId::Crypto.calendar();
        assert_eq!(
            next_trading_day(crypto, friday),
            NaiveDate::from_ymd_opt(2023, 10, 28).unwrap()
        );
    }

    #[test]
    fn test_resolve_local_spring_forward_gap() {
        // 2024-03-10 02:30 does not exist in New York.
        let naive = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap().and_hms_opt(2, 30, 0).unwrap();
        assert_eq!(resolve_local(New_York, naive), utc(2024, 3, 10, 7, 30));
    }
}
