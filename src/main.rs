use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use prediction_window::config::{Config, EnvConfig};
use prediction_window::market::quote_feed::QuoteFeed;
use prediction_window::market::{AssetMarketContext, MarketState};
use prediction_window::monitoring::CsvLogger;
use prediction_window::presentation::{Locale, WindowView};
use prediction_window::scoring::RatingEngine;
use prediction_window::window::{TimeframeKind, WindowCalculator};

#[derive(Parser, Debug)]
#[command(name = "prediction-window")]
#[command(about = "Prediction deadlines and score ceilings per exchange")]
struct Args {
    /// Path to the TOML config (overrides CONFIG_PATH)
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compute the current prediction window for a ticker
    Window {
        #[arg(long)]
        ticker: String,

        #[arg(long, default_value = "Daily")]
        timeframe: String,

        /// Reported market state (REGULAR, PRE, POST, CLOSED, UNKNOWN)
        #[arg(long)]
        state: Option<String>,

        /// Look the market state up on the quote feed
        #[arg(long, default_value = "false")]
        fetch_state: bool,

        /// Evaluate at this instant (RFC 3339) instead of now
        #[arg(long)]
        at: Option<String>,

        #[arg(long, env = "PREDICTION_LOCALE")]
        locale: Option<String>,

        #[arg(long, default_value = "false")]
        json: bool,

        /// Recompute every second until Ctrl-C
        #[arg(long, default_value = "false", conflicts_with = "at")]
        watch: bool,
    },

    /// Score a prediction against the actual price
    Assess {
        #[arg(long)]
        timeframe: String,

        #[arg(long)]
        predicted: f64,

        #[arg(long)]
        actual: f64,

        #[arg(long)]
        created_price: Option<f64>,

        /// Score ceiling in force when the prediction was made
        #[arg(long, default_value = "100")]
        ceiling: u8,

        #[arg(long, default_value = "false")]
        target_hit: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load .env before clap reads env-backed flags.
    let env_config = EnvConfig::load()?;
    let args = Args::parse();
    let config_path = args.config.clone().unwrap_or_else(|| env_config.config_path.clone());

    tracing::info!("Loading configuration from {}", config_path);
    let mut config = Config::load_or_default(&config_path)?;
    config.apply_env(&env_config);

    match args.command {
        Command::Window {
            ticker,
            timeframe,
            state,
            fetch_state,
            at,
            locale,
            json,
            watch,
        } => {
            let locale: Locale = locale
                .unwrap_or_else(|| env_config.locale.clone())
                .parse()?;
            let kind: TimeframeKind = timeframe.parse()?;
            let fixed_now = at
                .map(|raw| {
                    DateTime::parse_from_rfc3339(&raw)
                        .map(|dt| dt.with_timezone(&Utc))
                        .with_context(|| format!("Invalid --at timestamp: {}", raw))
                })
                .transpose()?;

            let market_state = match state {
                Some(raw) => Some(raw.parse::<MarketState>()?),
                None if fetch_state => {
                    let feed = QuoteFeed::new(&config.feed)?;
                    feed.market_state_or_fallback(&ticker).await
                }
                None => None,
            };

            let ctx = AssetMarketContext::new(&ticker, market_state);
            let calculator = WindowCalculator::new(config.penalties.clone());

            tracing::info!(
                "{} resolved to {} (state: {})",
                ctx.symbol,
                ctx.calendar().name,
                ctx.market_state.map(|s| s.to_string()).unwrap_or_else(|| "calendar".to_string())
            );

            if watch {
                watch_window(&calculator, &ctx, kind, locale, json, &config).await?;
            } else {
                let now = fixed_now.unwrap_or_else(Utc::now);
                let result = calculator.compute(kind, &ctx, now);
                let view = WindowView::new(&ctx, kind, result, now, locale);
                print_view(&view, json)?;
            }
        }
        Command::Assess {
            timeframe,
            predicted,
            actual,
            created_price,
            ceiling,
            target_hit,
        } => {
            let kind: TimeframeKind = timeframe.parse()?;
            let engine = RatingEngine::new(config.scoring.clone());
            let assessment =
                engine.assess(kind, predicted, actual, created_price, ceiling, target_hit);
            println!("{}", serde_json::to_string_pretty(&assessment)?);
        }
    }

    Ok(())
}

fn print_view(view: &WindowView, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(view)?);
    } else {
        println!("{}", view);
    }
    Ok(())
}

/// Re-evaluate once per second, the way an open prediction form refreshes its bar.
async fn watch_window(
    calculator: &WindowCalculator,
    ctx: &AssetMarketContext,
    kind: TimeframeKind,
    locale: Locale,
    json: bool,
    config: &Config,
) -> Result<()> {
    let csv = if config.monitoring.csv_logging {
        tracing::info!("Logging windows to {}", config.monitoring.csv_log_path);
        Some(CsvLogger::new(config.monitoring.csv_log_path.clone())?)
    } else {
        None
    };

    let mut ticker = tokio::time::interval(Duration::from_secs(1));

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let now = Utc::now();
                let result = calculator.compute(kind, ctx, now);
                let view = WindowView::new(ctx, kind, result, now, locale);
                print_view(&view, json)?;
                if let Some(logger) = &csv {
                    if let Err(e) = logger.log_window(now, &view) {
                        tracing::warn!("Failed to write CSV row: {}", e);
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down...");
                break;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watch_rejects_fixed_instant() {
        let parsed = Args::try_parse_from([
            "prediction-window",
            "window",
            "--ticker",
            "AAPL",
            "--at",
            "2023-10-23T14:00:00Z",
            "--watch",
        ]);
        assert!(parsed.is_err());

        let parsed =
            Args::try_parse_from(["prediction-window", "window", "--ticker", "AAPL", "--watch"]);
        assert!(parsed.is_ok());
    }
}
