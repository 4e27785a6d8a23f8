use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, Timelike, Utc};
use tracing::debug;

use crate::config::{PenaltyConfig, WEEKLY_MAX_LOSS_LIMIT};
use crate::market::hours::{self, SessionPhase};
use crate::market::AssetMarketContext;
use crate::window::types::{PredictionWindowResult, TimeframeKind, WindowStatus};

const FULL_SCORE: u8 = 100;
const SECS_PER_HOUR: i64 = 3600;
const SECS_PER_DAY: i64 = 86_400;

/// Computes prediction deadlines and score ceilings.
///
/// Every call is a pure function of `(timeframe, context, now)`: the clock is never read
/// here, so repeated calls with the same inputs give identical results.
#[derive(Debug, Clone, Default)]
pub struct WindowCalculator {
    penalties: PenaltyConfig,
}

impl WindowCalculator {
    pub fn new(penalties: PenaltyConfig) -> Self {
        Self { penalties }
    }

    /// Entry point for untyped input. An unknown timeframe is a caller error and yields
    /// a closed window with the invalid-type status instead of failing.
    pub fn compute_named(
        &self,
        timeframe: &str,
        ctx: &AssetMarketContext,
        now: DateTime<Utc>,
    ) -> PredictionWindowResult {
        match timeframe.parse::<TimeframeKind>() {
            Ok(kind) => self.compute(kind, ctx, now),
            Err(e) => {
                debug!("{}", e);
                PredictionWindowResult::invalid_type()
            }
        }
    }

    pub fn compute(
        &self,
        kind: TimeframeKind,
        ctx: &AssetMarketContext,
        now: DateTime<Utc>,
    ) -> PredictionWindowResult {
        let result = match kind {
            TimeframeKind::Hourly => self.hourly(ctx, now),
            TimeframeKind::Daily => self.daily(ctx, now),
            TimeframeKind::Weekly => self.weekly(ctx, now),
            TimeframeKind::Monthly => self.monthly(ctx, now),
            TimeframeKind::Quarterly => {
                self.calendar_period(ctx, now, quarter_bounds, self.penalties.quarterly_max_loss)
            }
            TimeframeKind::Yearly => {
                self.calendar_period(ctx, now, year_bounds, self.penalties.yearly_max_loss)
            }
        };

        debug!(
            "{} {} on {:?}: open={} ceiling={} deadline={:?}",
            kind,
            ctx.symbol,
            ctx.exchange,
            result.is_open,
            result.max_score_ceiling,
            result.deadline
        );

        result
    }

    fn hourly(&self, ctx: &AssetMarketContext, now: DateTime<Utc>) -> PredictionWindowResult {
        let cal = ctx.calendar();

        match hours::session_phase(ctx, now, self.penalties.pre_open_minutes) {
            SessionPhase::PreOpen => {
                let open = hours::opening_bell(cal, hours::local_date(cal, now));
                PredictionWindowResult {
                    is_open: true,
                    deadline: Some(open + Duration::hours(1)),
                    max_score_ceiling: FULL_SCORE,
                    progress_fraction: 100.0,
                    status: WindowStatus::OpeningHour,
                }
            }
            SessionPhase::Regular => {
                let local = now.with_timezone(&cal.timezone);
                let minute = local.minute();
                let secs_into_hour = i64::from(minute * 60 + local.second());

                // No loss during the grace period, then linear up to the cap at minute 60.
                let grace = self.penalties.hourly_grace_minutes;
                let penalty = if minute > grace {
                    linear_penalty(
                        i64::from(minute - grace),
                        i64::from(60 - grace),
                        self.penalties.hourly_max_loss,
                    )
                } else {
                    0
                };

                let top_of_hour = now
                    - Duration::nanoseconds(i64::from(now.timestamp_subsec_nanos()))
                    + Duration::seconds(SECS_PER_HOUR - secs_into_hour);
                let score = FULL_SCORE.saturating_sub(penalty);

                PredictionWindowResult {
                    is_open: true,
                    deadline: Some(top_of_hour),
                    max_score_ceiling: score,
                    progress_fraction: remaining_pct(secs_into_hour, SECS_PER_HOUR),
                    status: WindowStatus::MaxScore { score },
                }
            }
            SessionPhase::Closed => PredictionWindowResult::market_closed(),
        }
    }

    fn daily(&self, ctx: &AssetMarketContext, now: DateTime<Utc>) -> PredictionWindowResult {
        let cal = ctx.calendar();
        let today = hours::local_date(cal, now);

        if hours::trades_today(ctx, now) {
            let open = hours::session_open(cal, today);
            let close = hours::session_close(cal, today);
            let elapsed = (now - open).num_seconds();
            let total = (close - open).num_seconds();
            let penalty = linear_penalty(elapsed, total, self.penalties.daily_max_loss);
            let score = FULL_SCORE.saturating_sub(penalty);

            return PredictionWindowResult {
                is_open: true,
                deadline: Some(close),
                max_score_ceiling: score,
                progress_fraction: remaining_pct(elapsed, total),
                status: WindowStatus::MaxScore { score },
            };
        }

        let target = hours::next_trading_day(cal, today);
        PredictionWindowResult {
            is_open: true,
            deadline: Some(hours::session_close(cal, target)),
            max_score_ceiling: FULL_SCORE,
            progress_fraction: 100.0,
            status: WindowStatus::ForDate { date: target },
        }
    }

    fn weekly(&self, ctx: &AssetMarketContext, now: DateTime<Utc>) -> PredictionWindowResult {
        let cal = ctx.calendar();
        let today = hours::local_date(cal, now);

        // Monday = 0 .. Friday = 4; Saturday rolls six days ahead.
        let days_until_friday = (4 + 7 - today.weekday().num_days_from_monday()) % 7;
        let mut friday = today + Duration::days(i64::from(days_until_friday));
        let mut deadline = hours::session_close(cal, friday);
        if now >= deadline {
            friday += Duration::days(7);
            deadline = hours::session_close(cal, friday);
        }

        let week_open = hours::session_open(cal, friday - Duration::days(4));
        let elapsed = (now - week_open).num_seconds();
        let total = (deadline - week_open).num_seconds();
        // Weekly ceilings stay at or above 80 whatever the configured cap.
        let max_loss = self.penalties.weekly_max_loss.min(WEEKLY_MAX_LOSS_LIMIT);
        let score = FULL_SCORE.saturating_sub(linear_penalty(elapsed, total, max_loss));

        PredictionWindowResult {
            is_open: true,
            deadline: Some(deadline),
            max_score_ceiling: score,
            progress_fraction: remaining_pct(elapsed, total),
            status: WindowStatus::ForDate { date: friday },
        }
    }

    fn monthly(&self, ctx: &AssetMarketContext, now: DateTime<Utc>) -> PredictionWindowResult {
        let cal = ctx.calendar();
        let today = hours::local_date(cal, now);

        let mut last_day = month_end(today);
        let mut deadline = hours::session_close(cal, last_day);
        let mut elapsed_days = today.day();
        if now >= deadline {
            last_day = month_end(last_day + Duration::days(1));
            deadline = hours::session_close(cal, last_day);
            elapsed_days = 0;
        }

        let days_in_month = i64::from(last_day.day());
        let elapsed = i64::from(elapsed_days);
        let penalty = linear_penalty(elapsed, days_in_month, self.penalties.monthly_max_loss);
        let score = FULL_SCORE.saturating_sub(penalty);

        PredictionWindowResult {
            is_open: true,
            deadline: Some(deadline),
            max_score_ceiling: score,
            progress_fraction: remaining_pct(elapsed, days_in_month),
            status: WindowStatus::MaxScore { score },
        }
    }

    /// Quarter and year windows: elapsed share of the period's days, measured from local
    /// midnight of its first day; the deadline is the close on its last day.
    fn calendar_period(
        &self,
        ctx: &AssetMarketContext,
        now: DateTime<Utc>,
        bounds: fn(NaiveDate) -> (NaiveDate, NaiveDate),
        max_loss: u8,
    ) -> PredictionWindowResult {
        let cal = ctx.calendar();
        let today = hours::local_date(cal, now);

        let (mut first, mut last) = bounds(today);
        let mut deadline = hours::session_close(cal, last);
        if now >= deadline {
            (first, last) = bounds(last + Duration::days(1));
            deadline = hours::session_close(cal, last);
        }

        let total = ((last - first).num_days() + 1) * SECS_PER_DAY;
        let elapsed = (now - hours::start_of_day(cal, first)).num_seconds();
        let score = FULL_SCORE.saturating_sub(linear_penalty(elapsed, total, max_loss));

        PredictionWindowResult {
            is_open: true,
            deadline: Some(deadline),
            max_score_ceiling: score,
            progress_fraction: remaining_pct(elapsed, total),
            status: WindowStatus::MaxScore { score },
        }
    }
}

/// `floor(elapsed / total * max_loss)`, clamped to `[0, max_loss]`.
fn linear_penalty(elapsed: i64, total: i64, max_loss: u8) -> u8 {
    if elapsed <= 0 || total <= 0 {
        return 0;
    }
    let loss = elapsed.min(total) * i64::from(max_loss) / total;
    u8::try_from(loss).unwrap_or(max_loss).min(max_loss)
}

/// Share of the window left, in percent.
fn remaining_pct(elapsed: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    let elapsed = elapsed.clamp(0, total);
    100.0 - elapsed as f64 / total as f64 * 100.0
}

fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Day before the first of the following month.
fn month_end(date: NaiveDate) -> NaiveDate {
    month_start(date)
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(date)
}

fn quarter_bounds(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let mut first = month_start(date);
    while (first.month() - 1) % 3 != 0 {
        first = month_start(first - Duration::days(1));
    }

    let mut last = month_end(date);
    while last.month() % 3 != 0 {
        last = month_end(last + Duration::days(1));
    }

    (first, last)
}

fn year_bounds(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let first = date.with_ordinal(1).unwrap_or(date);
    let last = NaiveDate::from_ymd_opt(date.year(), 12, 31).unwrap_or(date);
    (first, last)
}
