use serde::Serialize;

use crate::scoring::rating::round_one_decimal;
use crate::window::TimeframeKind;

/// A submitted prediction, as far as profiling needs it.
#[derive(Debug, Clone)]
pub struct PredictionRecord {
    pub timeframe: TimeframeKind,
    pub target_price: f64,
    pub price_at_creation: Option<f64>,
}

/// A prediction that has been assessed against the actual price.
#[derive(Debug, Clone)]
pub struct AssessedRecord {
    pub target_price: f64,
    pub price_at_creation: Option<f64>,
    pub actual_price: Option<f64>,
    pub assessed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Distribution {
    pub defensive: usize,
    pub neutral: usize,
    pub offensive: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aggressiveness {
    pub distribution: Distribution,
    /// Mean absolute target move, percent.
    pub overall_score: f64,
    pub analyzed_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectionAccuracy {
    pub accuracy: f64,
    pub correct: usize,
    pub total: usize,
}

/// (defensive, neutral) upper bounds in percent; anything above neutral is offensive.
fn aggressiveness_thresholds(timeframe: TimeframeKind) -> (f64, f64) {
    match timeframe {
        TimeframeKind::Hourly => (1.0, 3.0),
        TimeframeKind::Daily => (3.0, 7.0),
        TimeframeKind::Weekly => (5.0, 10.0),
        TimeframeKind::Monthly => (8.0, 20.0),
        TimeframeKind::Quarterly => (10.0, 25.0),
        TimeframeKind::Yearly => (15.0, 35.0),
    }
}

fn positive(price: Option<f64>) -> Option<f64> {
    price.filter(|p| *p > 0.0)
}

/// Classify how bold a user's targets are. Records without a creation price are skipped.
pub fn aggressiveness(records: &[PredictionRecord]) -> Aggressiveness {
    let mut distribution = Distribution::default();
    let mut total_change = 0.0;
    let mut analyzed_count = 0;

    for record in records {
        let Some(base) = positive(record.price_at_creation) else {
            continue;
        };

        let change = ((record.target_price - base) / base).abs() * 100.0;
        total_change += change;
        analyzed_count += 1;

        let (defensive, neutral) = aggressiveness_thresholds(record.timeframe);
        if change <= defensive {
            distribution.defensive += 1;
        } else if change <= neutral {
            distribution.neutral += 1;
        } else {
            distribution.offensive += 1;
        }
    }

    let overall_score = if analyzed_count > 0 {
        round_one_decimal(total_change / analyzed_count as f64)
    } else {
        0.0
    };

    Aggressiveness {
        distribution,
        overall_score,
        analyzed_count,
    }
}

/// Share of assessed predictions that called the direction of the move correctly.
pub fn direction_accuracy(records: &[AssessedRecord]) -> DirectionAccuracy {
    let mut correct = 0;
    let mut total = 0;

    for record in records.iter().filter(|r| r.assessed) {
        let (Some(base), Some(actual)) = (positive(record.price_at_creation), record.actual_price)
        else {
            continue;
        };

        total += 1;
        if (record.target_price - base) * (actual - base) > 0.0 {
            correct += 1;
        }
    }

    let accuracy = if total > 0 {
        round_one_decimal(correct as f64 / total as f64 * 100.0)
    } else {
        0.0
    };

    DirectionAccuracy { accuracy, correct, total }
}

/// Percent move beyond which a new prediction is worth notifying followers about.
pub fn notification_threshold(timeframe: TimeframeKind) -> f64 {
    match timeframe {
        TimeframeKind::Hourly => 3.0,
        TimeframeKind::Daily => 10.0,
        TimeframeKind::Weekly => 15.0,
        TimeframeKind::Monthly => 20.0,
        TimeframeKind::Quarterly => 40.0,
        TimeframeKind::Yearly => 100.0,
    }
}

pub fn is_significant_move(timeframe: TimeframeKind, pct_change: f64) -> bool {
    pct_change.abs() > notification_threshold(timeframe)
}

pub fn is_short_term(timeframe: TimeframeKind) -> bool {
    matches!(
        timeframe,
        TimeframeKind::Hourly | TimeframeKind::Daily | TimeframeKind::Weekly
    )
}
