use serde::Serialize;

use crate::config::ScoringConfig;
use crate::window::TimeframeKind;

/// Outcome of assessing one prediction at its deadline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assessment {
    pub raw_rating: f64,
    /// Raw rating limited by the ceiling the prediction was created with.
    pub rating: f64,
    pub award: f64,
}

#[derive(Debug, Clone, Default)]
pub struct RatingEngine {
    config: ScoringConfig,
}

impl RatingEngine {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    /// How close the prediction landed, 0 to `max_rating`, one decimal.
    ///
    /// A prediction that called the wrong direction relative to the creation price
    /// scores zero, as does anything further off than `max_error_pct`.
    pub fn proximity_rating(
        &self,
        predicted: f64,
        actual: f64,
        price_at_creation: Option<f64>,
    ) -> f64 {
        if self.config.direction_check {
            if let Some(base) = price_at_creation.filter(|p| *p > 0.0) {
                if (predicted - base) * (actual - base) < 0.0 {
                    return 0.0;
                }
            }
        }

        if actual == 0.0 {
            return 0.0;
        }

        let error_pct = (predicted - actual).abs() / actual;
        if error_pct > self.config.max_error_pct {
            return 0.0;
        }

        let rating = self.config.max_rating * (1.0 - error_pct / self.config.max_error_pct);
        round_one_decimal(rating)
    }

    /// Accuracy tier plus the weighted target-hit bonus.
    pub fn analyst_award(&self, rating: f64, timeframe: TimeframeKind, target_hit: bool) -> f64 {
        let tier = if rating > 90.0 {
            self.config.tier_90_award
        } else if rating > 80.0 {
            self.config.tier_80_award
        } else if rating > 70.0 {
            self.config.tier_70_award
        } else {
            0.0
        };

        let bonus = if target_hit {
            self.config.base_target_hit_bonus * target_hit_weight(timeframe)
        } else {
            0.0
        };

        tier + bonus
    }

    pub fn assess(
        &self,
        timeframe: TimeframeKind,
        predicted: f64,
        actual: f64,
        price_at_creation: Option<f64>,
        ceiling: u8,
        target_hit: bool,
    ) -> Assessment {
        let raw_rating = self.proximity_rating(predicted, actual, price_at_creation);
        let rating = capped_rating(raw_rating, ceiling);
        let award = self.analyst_award(rating, timeframe, target_hit);

        tracing::debug!(
            "Assessed {} prediction: raw={:.1} capped={:.1} award={:.1}",
            timeframe, raw_rating, rating, award
        );

        Assessment { raw_rating, rating, award }
    }
}

/// The time-penalty cap: a rating can never exceed the ceiling in force when the
/// prediction was submitted.
pub fn capped_rating(raw: f64, ceiling: u8) -> f64 {
    raw.min(f64::from(ceiling))
}

/// Longer horizons earn a larger bonus for hitting the target.
pub fn target_hit_weight(timeframe: TimeframeKind) -> f64 {
    match timeframe {
        TimeframeKind::Hourly => 0.5,
        TimeframeKind::Daily => 1.0,
        TimeframeKind::Weekly => 2.0,
        TimeframeKind::Monthly => 4.0,
        TimeframeKind::Quarterly => 6.0,
        TimeframeKind::Yearly => 10.0,
    }
}

pub(crate) fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> RatingEngine {
        RatingEngine::default()
    }

    #[test]
    fn test_perfect_prediction() {
        assert_eq!(engine().proximity_rating(150.0, 150.0, Some(140.0)), 100.0);
    }

    #[test]
    fn test_small_error_rates_high() {
        // 1 / 149 = 0.67% error against a 20% tolerance
        let rating = engine().proximity_rating(150.0, 149.0, Some(140.0));
        assert!(rating > 80.0 && rating < 100.0);
        assert_eq!(rating, 96.6);
    }

    #[test]
    fn test_error_beyond_tolerance() {
        assert_eq!(engine().proximity_rating(150.0, 100.0, Some(140.0)), 0.0);
        assert_eq!(engine().proximity_rating(110.0, 150.0, Some(100.0)), 0.0);
    }

    #[test]
    fn test_wrong_direction() {
        assert_eq!(engine().proximity_rating(110.0, 90.0, Some(100.0)), 0.0);
    }

    #[test]
    fn test_direction_check_can_be_disabled() {
        let engine = RatingEngine::new(ScoringConfig {
            direction_check: false,
            ..ScoringConfig::default()
        });
        // 101 vs 99: 2.02% error, opposite directions from 100
        assert!(engine.proximity_rating(101.0, 99.0, Some(100.0)) > 80.0);
    }

    #[test]
    fn test_missing_creation_price_skips_direction_check() {
        assert!(engine().proximity_rating(101.0, 99.0, None) > 80.0);
        assert!(engine().proximity_rating(101.0, 99.0, Some(0.0)) > 80.0);
    }

    #[test]
    fn test_zero_actual_price() {
        assert_eq!(engine().proximity_rating(10.0, 0.0, None), 0.0);
    }

    #[test]
    fn test_ceiling_caps_rating() {
        assert_eq!(capped_rating(96.6, 90), 90.0);
        assert_eq!(capped_rating(42.0, 90), 42.0);
    }

    #[test]
    fn test_awards() {
        let engine = engine();
        assert_eq!(engine.analyst_award(95.0, TimeframeKind::Daily, false), 10.0);
        assert_eq!(engine.analyst_award(85.0, TimeframeKind::Daily, false), 5.0);
        assert_eq!(engine.analyst_award(75.0, TimeframeKind::Daily, false), 2.0);
        assert_eq!(engine.analyst_award(70.0, TimeframeKind::Daily, false), 0.0);
        assert_eq!(engine.analyst_award(0.0, TimeframeKind::Hourly, true), 2.5);
        assert_eq!(engine.analyst_award(95.0, TimeframeKind::Yearly, true), 60.0);
    }

    #[test]
    fn test_assess_applies_time_cap_before_award() {
        // Raw 96.6 would be tier 90; the 88 ceiling drops it to tier 80.
        let assessment =
            engine().assess(TimeframeKind::Weekly, 150.0, 149.0, Some(140.0), 88, true);
        assert_eq!(assessment.raw_rating, 96.6);
        assert_eq!(assessment.rating, 88.0);
        assert_eq!(assessment.award, 5.0 + 10.0);
    }
}
