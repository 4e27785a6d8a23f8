use anyhow::Result;
use chrono::{DateTime, Utc};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use crate::presentation::WindowView;

pub struct CsvLogger {
    log_path: String,
}

impl CsvLogger {
    pub fn new(log_path: String) -> Result<Self> {
        // Create CSV file with headers if it doesn't exist
        if !Path::new(&log_path).exists() {
            let mut file = OpenOptions::new()
                .create(true)
                .write(true)
                .open(&log_path)?;

            writeln!(
                file,
                "timestamp,ticker,exchange,timeframe,is_open,deadline,max_score,progress,status"
            )?;
        }

        Ok(Self { log_path })
    }

    /// Append one computed window.
    pub fn log_window(&self, at: DateTime<Utc>, view: &WindowView) -> Result<()> {
        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.log_path)?;

        let deadline = match view.result.deadline {
            Some(deadline) => deadline.to_rfc3339(),
            None => String::new(),
        };

        writeln!(
            file,
            "{},{},\"{}\",{},{},{},{},{:.2},{}",
            at.to_rfc3339(),
            view.ticker,
            view.exchange,
            view.timeframe,
            view.result.is_open,
            deadline,
            view.result.max_score_ceiling,
            view.result.progress_fraction,
            view.result.status.code()
        )?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::{AssetMarketContext, MarketState};
    use crate::presentation::Locale;
    use crate::window::{TimeframeKind, WindowCalculator};
    use chrono::TimeZone;
    use std::fs;

    #[test]
    fn test_header_written_once_and_rows_appended() {
        let path =
            std::env::temp_dir().join(format!("prediction-window-{}.csv", std::process::id()));
        let path_str = path.to_string_lossy().to_string();
        let _ = fs::remove_file(&path);

        let ctx = AssetMarketContext::new("AAPL", Some(MarketState::Closed));
        let now = Utc.with_ymd_and_hms(2023, 12, 25, 15, 0, 0).unwrap();
        let result = WindowCalculator::default().compute(TimeframeKind::Hourly, &ctx, now);
        let view = WindowView::new(&ctx, TimeframeKind::Hourly, result, now, Locale::En);

        let logger = CsvLogger::new(path_str.clone()).unwrap();
        logger.log_window(now, &view).unwrap();
        let logger = CsvLogger::new(path_str).unwrap();
        logger.log_window(now, &view).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("timestamp,"));
        assert!(lines[1]
            .contains(",AAPL,\"US Market (NYSE/NASDAQ)\",Hourly,false,,100,0.00,market_closed"));

        fs::remove_file(&path).unwrap();
    }
}
