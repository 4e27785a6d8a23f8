use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub penalties: PenaltyConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

/// Grace periods and maximum score losses per timeframe.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PenaltyConfig {
    #[serde(default = "default_hourly_grace")]
    pub hourly_grace_minutes: u32,
    #[serde(default = "default_hourly_max_loss")]
    pub hourly_max_loss: u8,
    #[serde(default = "default_pre_open")]
    pub pre_open_minutes: u32,
    #[serde(default = "default_daily_max_loss")]
    pub daily_max_loss: u8,
    #[serde(default = "default_weekly_max_loss")]
    pub weekly_max_loss: u8,
    #[serde(default = "default_monthly_max_loss")]
    pub monthly_max_loss: u8,
    #[serde(default = "default_quarterly_max_loss")]
    pub quarterly_max_loss: u8,
    #[serde(default = "default_yearly_max_loss")]
    pub yearly_max_loss: u8,
}

fn default_hourly_grace() -> u32 { 10 }
fn default_hourly_max_loss() -> u8 { 20 }
fn default_pre_open() -> u32 { 30 }
fn default_daily_max_loss() -> u8 { 20 }
fn default_weekly_max_loss() -> u8 { 20 }
fn default_monthly_max_loss() -> u8 { 25 }
fn default_quarterly_max_loss() -> u8 { 25 }
fn default_yearly_max_loss() -> u8 { 30 }

/// Weekly predictions never score below 80.
pub const WEEKLY_MAX_LOSS_LIMIT: u8 = 20;

impl Default for PenaltyConfig {
    fn default() -> Self {
        Self {
            hourly_grace_minutes: default_hourly_grace(),
            hourly_max_loss: default_hourly_max_loss(),
            pre_open_minutes: default_pre_open(),
            daily_max_loss: default_daily_max_loss(),
            weekly_max_loss: default_weekly_max_loss(),
            monthly_max_loss: default_monthly_max_loss(),
            quarterly_max_loss: default_quarterly_max_loss(),
            yearly_max_loss: default_yearly_max_loss(),
        }
    }
}

impl PenaltyConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hourly_grace_minutes >= 60 {
            return Err(ConfigError::GracePeriodTooLong(self.hourly_grace_minutes));
        }
        if self.pre_open_minutes >= 24 * 60 {
            return Err(ConfigError::PreOpenTooLong(self.pre_open_minutes));
        }

        let caps = [
            ("hourly", self.hourly_max_loss),
            ("daily", self.daily_max_loss),
            ("weekly", self.weekly_max_loss),
            ("monthly", self.monthly_max_loss),
            ("quarterly", self.quarterly_max_loss),
            ("yearly", self.yearly_max_loss),
        ];
        for (name, cap) in caps {
            if cap > 100 {
                return Err(ConfigError::MaxLossOutOfRange(name, cap));
            }
        }
        if self.weekly_max_loss > WEEKLY_MAX_LOSS_LIMIT {
            return Err(ConfigError::WeeklyFloorBreached(self.weekly_max_loss));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScoringConfig {
    #[serde(default = "default_max_rating")]
    pub max_rating: f64,
    #[serde(default = "default_max_error_pct")]
    pub max_error_pct: f64,
    #[serde(default = "default_direction_check")]
    pub direction_check: bool,
    #[serde(default = "default_target_hit_bonus")]
    pub base_target_hit_bonus: f64,
    #[serde(default = "default_tier_90")]
    pub tier_90_award: f64,
    #[serde(default = "default_tier_80")]
    pub tier_80_award: f64,
    #[serde(default = "default_tier_70")]
    pub tier_70_award: f64,
}

fn default_max_rating() -> f64 { 100.0 }
fn default_max_error_pct() -> f64 { 0.20 }
fn default_direction_check() -> bool { true }
fn default_target_hit_bonus() -> f64 { 5.0 }
fn default_tier_90() -> f64 { 10.0 }
fn default_tier_80() -> f64 { 5.0 }
fn default_tier_70() -> f64 { 2.0 }

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            max_rating: default_max_rating(),
            max_error_pct: default_max_error_pct(),
            direction_check: default_direction_check(),
            base_target_hit_bonus: default_target_hit_bonus(),
            tier_90_award: default_tier_90(),
            tier_80_award: default_tier_80(),
            tier_70_award: default_tier_70(),
        }
    }
}

impl ScoringConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.max_error_pct > 0.0 && self.max_error_pct <= 1.0) {
            return Err(ConfigError::MaxErrorOutOfRange(self.max_error_pct));
        }
        if self.max_rating <= 0.0 {
            return Err(ConfigError::MaxRatingOutOfRange(self.max_rating));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    #[serde(default = "default_quote_url")]
    pub quote_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_quote_url() -> String { "https://query1.finance.yahoo.com/v7/finance/quote".to_string() }
fn default_timeout() -> u64 { 10 }
fn default_user_agent() -> String { "PredictionWindow/1.0".to_string() }

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            quote_url: default_quote_url(),
            timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    #[serde(default)]
    pub csv_logging: bool,
    #[serde(default = "default_csv_path")]
    pub csv_log_path: String,
}

fn default_csv_path() -> String { "windows.csv".to_string() }

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            csv_logging: false,
            csv_log_path: default_csv_path(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub config_path: String,
    pub quote_feed_url: Option<String>,
    pub locale: String,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        Self::parse(&contents).with_context(|| format!("Failed to parse config file: {}", path))
    }

    /// Loads `path` if it exists, otherwise falls back to the built-in defaults.
    pub fn load_or_default(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            Self::load(path)
        } else {
            tracing::warn!("Config file {} not found, using defaults", path);
            Ok(Self::default())
        }
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.penalties.validate()?;
        config.scoring.validate()?;
        Ok(config)
    }

    /// Environment overrides win over the file.
    pub fn apply_env(&mut self, env: &EnvConfig) {
        if let Some(url) = &env.quote_feed_url {
            self.feed.quote_url = url.clone();
        }
    }
}

impl EnvConfig {
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        Ok(Self {
            config_path: std::env::var("CONFIG_PATH")
                .unwrap_or_else(|_| "config.toml".to_string()),
            quote_feed_url: std::env::var("QUOTE_FEED_URL").ok(),
            locale: std::env::var("PREDICTION_LOCALE")
                .unwrap_or_else(|_| "en".to_string()),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Hourly grace period must be under 60 minutes, got {0}")]
    GracePeriodTooLong(u32),

    #[error("Pre-open window must be under a day, got {0} minutes")]
    PreOpenTooLong(u32),

    #[error("Max loss for {0} must be at most 100, got {1}")]
    MaxLossOutOfRange(&'static str, u8),

    #[error("Max loss for weekly must be at most {limit}, got {0}", limit = WEEKLY_MAX_LOSS_LIMIT)]
    WeeklyFloorBreached(u8),

    #[error("Max error percentage must be in (0, 1], got {0}")]
    MaxErrorOutOfRange(f64),

    #[error("Max rating must be positive, got {0}")]
    MaxRatingOutOfRange(f64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.penalties, PenaltyConfig::default());
        assert_eq!(config.penalties.hourly_grace_minutes, 10);
        assert_eq!(config.penalties.yearly_max_loss, 30);
        assert!(!config.monitoring.csv_logging);
        assert!((config.scoring.max_error_pct - 0.20).abs() < f64::EPSILON);
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config = Config::parse(
            r#"
            [penalties]
            hourly_grace_minutes = 5
            monthly_max_loss = 40
            "#,
        )
        .unwrap();

        assert_eq!(config.penalties.hourly_grace_minutes, 5);
        assert_eq!(config.penalties.monthly_max_loss, 40);
        assert_eq!(config.penalties.daily_max_loss, 20);
    }

    #[test]
    fn test_invalid_grace_rejected() {
        let err = Config::parse("[penalties]\nhourly_grace_minutes = 60\n").unwrap_err();
        assert!(err.to_string().contains("under 60 minutes"));
    }

    #[test]
    fn test_invalid_max_loss_rejected() {
        let penalties = PenaltyConfig {
            weekly_max_loss: 150,
            ..PenaltyConfig::default()
        };
        assert!(matches!(
            penalties.validate(),
            Err(ConfigError::MaxLossOutOfRange("weekly", 150))
        ));
    }

    #[test]
    fn test_weekly_loss_above_floor_rejected() {
        let err = Config::parse("[penalties]\nweekly_max_loss = 40\n").unwrap_err();
        assert!(err.to_string().contains("at most 20"));

        let config = Config::parse("[penalties]\nweekly_max_loss = 20\n").unwrap();
        assert_eq!(config.penalties.weekly_max_loss, 20);
    }

    #[test]
    fn test_env_overrides_feed_url() {
        let mut config = Config::default();
        let env = EnvConfig {
            config_path: "config.toml".to_string(),
            quote_feed_url: Some("http://localhost:9000/quote".to_string()),
            locale: "tr".to_string(),
        };
        config.apply_env(&env);
        assert_eq!(config.feed.quote_url, "http://localhost:9000/quote");
    }
}
