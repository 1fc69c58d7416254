//! Back-test harness.
//!
//! Pre-fetches a historical window by back-paginating the exchange's
//! candle endpoint, installs it in the bot, and replays it through the
//! same control loop with no sleeping between iterations (fast mode) or
//! one second of pacing (slow mode). The final summary comes from the
//! loop itself when the window is exhausted.

use crate::application::bot::Bot;
use crate::config::{Config, ExchangeKind};
use crate::domain::candle::CandleSeries;
use crate::infrastructure::exchange::Exchange;
use anyhow::{Context, Result, bail};
use chrono::{DateTime, Duration, DurationRound, NaiveDate, NaiveDateTime, Utc};
use rand::Rng;
use std::sync::Arc;
use tracing::{info, warn};

/// The exchange is asked for at most this many pages per window.
const MAX_CHAINED_REQUESTS: usize = 10;
/// Candles per back-pagination page.
const PAGE_CANDLES: i64 = 300;

pub struct Simulator {
    bot: Bot,
    exchange: Arc<dyn Exchange>,
}

impl Simulator {
    pub fn new(bot: Bot, exchange: Arc<dyn Exchange>) -> Self {
        Self { bot, exchange }
    }

    /// Fetches the window and replays it through the control loop.
    pub async fn run(&mut self) -> Result<()> {
        let window = self
            .fetch_window()
            .await
            .context("Failed to assemble the simulation window")?;

        info!(
            "Simulator: replaying {} candles of {} at {}",
            window.len(),
            self.bot.config.market,
            self.bot.config.granularity
        );

        self.bot.set_simulation_data(window);
        self.bot.run().await
    }

    pub fn into_bot(self) -> Bot {
        self.bot
    }

    /// Back-paginates candle pages until the requested start date is
    /// reached, the request budget is spent, or the exchange refuses.
    async fn fetch_window(&self) -> Result<CandleSeries> {
        let config = &self.bot.config;
        let step = Duration::seconds(config.granularity.to_seconds());
        let (start, end) = window_bounds(config)?;

        let mut window = CandleSeries::new();
        let mut cursor_end = end;

        for request in 0..MAX_CHAINED_REQUESTS {
            let page_start = (cursor_end - step * PAGE_CANDLES as i32).max(start);
            let page = self
                .exchange
                .get_historical_data(
                    &config.market,
                    config.granularity,
                    Some(page_start),
                    Some(cursor_end),
                )
                .await
                .with_context(|| format!("Candle page {} fetch failed", request + 1))?;

            if page.is_empty() {
                // the exchange has no data this far back
                break;
            }
            window.merge_front(page);

            let earliest = window.first().expect("window is not empty").ts;
            if earliest <= start {
                break;
            }
            cursor_end = earliest - step;
        }

        if window.is_empty() {
            bail!("No data returned for the selected date range {} - {}", start, end);
        }

        if let Some(first) = window.first()
            && first.ts > start
        {
            warn!(
                "Simulator: {} is not returning data for the requested start date, \
                 switching to earliest available {}",
                config.exchange, first.ts
            );
        }

        if window.len() < config.adjust_total_periods {
            warn!(
                "Simulator: window has {} candles, fewer than the {} requested",
                window.len(),
                config.adjust_total_periods
            );
        }

        Ok(window)
    }
}

/// Resolves the simulation window. Without a configured start the date is
/// drawn uniformly from the exchange's lookback span (three years for
/// Coinbase Pro, one year otherwise) and rounded to the hour.
fn window_bounds(config: &Config) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let step = Duration::seconds(config.granularity.to_seconds());

    let start = match &config.sim_start_date {
        Some(text) => parse_sim_date(text)?,
        None => {
            let lookback_days = match config.exchange {
                ExchangeKind::CoinbasePro => 3 * 365,
                _ => 365,
            };
            let offset = rand::rng().random_range(0..lookback_days * 24 * 3600);
            (Utc::now() - Duration::seconds(offset))
                .duration_trunc(Duration::hours(1))
                .expect("hour truncation cannot fail")
        }
    };

    let end = match &config.sim_end_date {
        Some(text) => parse_sim_date(text)?,
        None if config.sim.is_sample() => {
            start + step * config.adjust_total_periods as i32
        }
        None => Utc::now(),
    };

    if end <= start {
        bail!("Simulation end date {} is not after start date {}", end, start);
    }
    Ok((start, end.min(Utc::now())))
}

fn parse_sim_date(text: &str) -> Result<DateTime<Utc>> {
    let text = text.trim().replace('T', " ");
    if let Ok(datetime) = NaiveDateTime::parse_from_str(&text, "%Y-%m-%d %H:%M:%S") {
        return Ok(datetime.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(&text, "%Y-%m-%d") {
        return Ok(date.and_hms_opt(0, 0, 0).expect("midnight is valid").and_utc());
    }
    bail!("Unrecognized simulation date: '{}'", text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use chrono::Timelike;

    #[test]
    fn test_parse_sim_date_formats() {
        let date = parse_sim_date("2024-03-01").unwrap();
        assert_eq!(date.hour(), 0);

        let datetime = parse_sim_date("2024-03-01 12:30:00").unwrap();
        assert_eq!(datetime.hour(), 12);

        let iso = parse_sim_date("2024-03-01T06:00:00").unwrap();
        assert_eq!(iso.hour(), 6);

        assert!(parse_sim_date("March 1st").is_err());
    }

    #[test]
    fn test_window_bounds_with_configured_dates() {
        let mut config = test_config();
        config.sim_start_date = Some("2024-01-01".to_string());
        config.sim_end_date = Some("2024-02-01".to_string());

        let (start, end) = window_bounds(&config).unwrap();
        assert_eq!(start, parse_sim_date("2024-01-01").unwrap());
        assert_eq!(end, parse_sim_date("2024-02-01").unwrap());
    }

    #[test]
    fn test_window_bounds_rejects_inverted_range() {
        let mut config = test_config();
        config.sim_start_date = Some("2024-02-01".to_string());
        config.sim_end_date = Some("2024-01-01".to_string());
        assert!(window_bounds(&config).is_err());
    }

    #[test]
    fn test_random_start_is_rounded_to_the_hour() {
        let config = test_config();
        for _ in 0..10 {
            let (start, end) = window_bounds(&config).unwrap();
            assert_eq!(start.minute(), 0);
            assert_eq!(start.second(), 0);
            assert!(start >= Utc::now() - Duration::days(366));
            assert!(end > start);
        }
    }

    #[test]
    fn test_sample_window_spans_adjust_total_periods() {
        let mut config = test_config();
        config.sim = crate::config::SimSpeed::FastSample;
        config.sim_start_date = Some("2024-01-01".to_string());

        let (start, end) = window_bounds(&config).unwrap();
        let expected = start
            + Duration::seconds(config.granularity.to_seconds())
                * config.adjust_total_periods as i32;
        assert_eq!(end, expected);
    }
}
