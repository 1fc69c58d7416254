//! The trading control loop.
//!
//! One cooperative task drives everything: fetch candles, decorate them
//! with indicators, ask the strategy for an action, act through the
//! account, persist diagnostics, sleep until the next tick. Granularity
//! smart-switching and auto-restart live here too.

use crate::application::margin;
use crate::application::strategy::{self, StrategyContext, custom};
use crate::config::Config;
use crate::domain::candle::CandleSeries;
use crate::domain::errors::TradingError;
use crate::domain::granularity::Granularity;
use crate::domain::order::{OrderSide, OrderStatus};
use crate::domain::position::{Action, LastAction, Position};
use crate::indicators::IndicatorFrame;
use crate::indicators::bands::fibonacci_retracement_levels;
use crate::indicators::moving_average::ema_unchecked;
use crate::infrastructure::account::TradingAccount;
use crate::infrastructure::control_file::{
    ControlFiles, ManualCommand, MarketSnapshot, TradeLogEntry,
};
use crate::infrastructure::exchange::Exchange;
use crate::infrastructure::notifier::Notifier;
use crate::infrastructure::tracker;
use anyhow::{Context, Result, bail};
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

const TRANSIENT_RETRY: Duration = Duration::from_secs(300);
const LIVE_POLL: Duration = Duration::from_secs(120);
const SMART_SWITCH_DELAY: Duration = Duration::from_secs(5);
const RESTART_DELAY: Duration = Duration::from_secs(30);

/// What the scheduler should do after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Reschedule(Duration),
    /// Next simulation iteration without sleeping.
    Immediate,
    /// The simulation window is exhausted.
    Finished,
}

pub struct Bot {
    pub config: Config,
    /// Current granularity; smart switching moves it between 15m and 1h.
    pub granularity: Granularity,
    exchange: Arc<dyn Exchange>,
    pub account: TradingAccount,
    notifier: Notifier,
    control_files: ControlFiles,
    pub position: Position,
    taker_fee: Decimal,
    /// Pre-loaded window the simulator replays.
    sim_data: Option<CandleSeries>,
    sim_frame: Option<IndicatorFrame>,
    pending_manual: Option<ManualCommand>,
    paused: bool,
}

impl Bot {
    pub fn new(config: Config, exchange: Arc<dyn Exchange>) -> Self {
        let account = TradingAccount::new(
            exchange.clone(),
            config.live,
            config.base_currency.clone(),
            config.quote_currency.clone(),
        );
        let notifier = Notifier::from_config(&config);
        let control_files = ControlFiles::new(config.telegram_data_dir.clone());
        let taker_fee = config.exchange.default_taker_fee();
        let granularity = config.granularity;

        Self {
            config,
            granularity,
            exchange,
            account,
            notifier,
            control_files,
            position: Position::new(),
            taker_fee,
            sim_data: None,
            sim_frame: None,
            pending_manual: None,
            paused: false,
        }
    }

    /// Installs the pre-fetched simulation window.
    pub fn set_simulation_data(&mut self, series: CandleSeries) {
        self.sim_data = Some(series);
        self.sim_frame = None;
    }

    /// Seeds position state from the exchange before the first tick:
    /// infer the last action from the balance split, then overlay the most
    /// recent DONE order.
    pub async fn seed_position(&mut self) -> Result<()> {
        if !self.config.live {
            return Ok(());
        }

        self.taker_fee = self.exchange.get_taker_fee(&self.config.market).await;

        let base = self
            .account
            .get_balance(&self.config.base_currency)
            .await
            .context("Failed to read base balance")?;
        let quote = self
            .account
            .get_balance(&self.config.quote_currency)
            .await
            .context("Failed to read quote balance")?;

        if base < quote {
            self.position.last_action = LastAction::Sell;
        } else if base > quote {
            self.position.last_action = LastAction::Buy;
        }

        let orders = self
            .account
            .get_orders(&self.config.market, None, Some(OrderStatus::Done))
            .await
            .context("Failed to read order history")?;

        if let Some(last) = orders.last() {
            if last.action == OrderSide::Buy {
                self.position.last_action = LastAction::Buy;
                self.position.last_buy_size = last.size;
                self.position.last_buy_filled = last.filled;
                self.position.last_buy_price = last.price;
                self.position.last_buy_high = last.price;
                self.position.last_buy_fee =
                    (last.filled * last.price * self.taker_fee).round_dp(2);
                self.position
                    .arm_tsl(self.config.trailing_stop_loss, self.config.trailing_stop_loss_trigger);
            } else {
                self.position.last_action = LastAction::Sell;
                self.position.last_buy_price = Decimal::ZERO;
            }
        }

        info!(
            "Bot: seeded position, last action {:?}, taker fee {}",
            self.position.last_action, self.taker_fee
        );
        Ok(())
    }

    /// Runs the loop until shutdown (live) or the simulation finishes,
    /// auto-restarting on failure when configured.
    pub async fn run(&mut self) -> Result<()> {
        loop {
            match self.run_loop().await {
                Ok(()) => return Ok(()),
                Err(e) if self.config.auto_restart => {
                    error!("Bot: tick failed: {:#}", e);
                    self.notifier
                        .notify(&format!(
                            "Auto restarting bot for {} after exception: {}",
                            self.config.market, e
                        ))
                        .await;
                    tokio::time::sleep(RESTART_DELAY).await;
                    info!("Bot: restarting after exception");
                }
                Err(e) => {
                    if !self.config.disable_telegram_error_msgs {
                        self.notifier
                            .notify(&format!(
                                "Bot for {} got an exception: {}",
                                self.config.market, e
                            ))
                            .await;
                    }
                    return Err(e);
                }
            }
        }
    }

    async fn run_loop(&mut self) -> Result<()> {
        loop {
            match self.tick().await? {
                TickOutcome::Reschedule(delay) => tokio::time::sleep(delay).await,
                TickOutcome::Immediate => {}
                TickOutcome::Finished => return Ok(()),
            }
        }
    }

    /// One tick of the control loop.
    pub async fn tick(&mut self) -> Result<TickOutcome> {
        // connectivity check, live only
        if self.config.live && self.exchange.get_time().await.is_none() {
            warn!("Bot: exchange connectivity is down, retrying in 5 minutes");
            return Ok(TickOutcome::Reschedule(TRANSIENT_RETRY));
        }

        self.position.iterations += 1;

        let is_sim = self.config.is_sim();
        let (series, frame) = if is_sim {
            let Some(series) = self.sim_data.clone() else {
                return Ok(TickOutcome::Finished);
            };
            if self.sim_frame.is_none() {
                self.sim_frame = Some(
                    IndicatorFrame::analyze(&series).context("Indicator analysis failed")?,
                );
            }
            (series, self.sim_frame.clone().expect("frame computed above"))
        } else {
            let series = match self
                .exchange
                .get_historical_data(&self.config.market, self.granularity, None, None)
                .await
            {
                Ok(series) => series,
                Err(e) if e.is_transient() => {
                    warn!("Bot: historical data fetch failed ({}), retrying in 5 minutes", e);
                    self.position.iterations -= 1;
                    return Ok(TickOutcome::Reschedule(TRANSIENT_RETRY));
                }
                Err(e) => return Err(e).context("Historical data fetch failed"),
            };
            if series.len() < 27 {
                warn!("Bot: data frame length is {} (< 27), retrying", series.len());
                self.position.iterations -= 1;
                return Ok(TickOutcome::Reschedule(TRANSIENT_RETRY));
            }
            let frame =
                IndicatorFrame::analyze(&series).context("Indicator analysis failed")?;
            (series, frame)
        };

        let index = if is_sim {
            let index = self.position.iterations - 1;
            if index >= series.len() {
                self.print_simulation_summary(&series);
                return Ok(TickOutcome::Finished);
            }
            index
        } else {
            series.len() - 1
        };

        // granularity smart switching, live only
        if !is_sim
            && let Some(outcome) = self.smart_switch().await
        {
            return Ok(outcome);
        }

        // length guard
        if !is_sim && series.len() < self.config.required_periods() {
            warn!(
                "Bot: data frame length is {} (< {}), retrying in 5 minutes",
                series.len(),
                self.config.required_periods()
            );
            self.position.iterations -= 1;
            return Ok(TickOutcome::Reschedule(TRANSIENT_RETRY));
        }

        let candle = series.get(index).expect("index bounded above").clone();

        // the ticker leads the candle close between candle boundaries
        let price = if is_sim {
            candle.close
        } else {
            match self.exchange.get_ticker(&self.config.market).await {
                Ok((_, ticker_price))
                    if ticker_price >= candle.low && !ticker_price.is_zero() =>
                {
                    ticker_price
                }
                Ok(_) => candle.close,
                Err(e) if e.is_transient() => {
                    warn!("Bot: ticker fetch failed ({}), retrying in 5 minutes", e);
                    self.position.iterations -= 1;
                    return Ok(TickOutcome::Reschedule(TRANSIENT_RETRY));
                }
                Err(e) => return Err(e).context("Ticker fetch failed"),
            }
        };

        if price < Decimal::new(1, 4) {
            bail!(TradingError::UnsuitableQuotePrice {
                market: self.config.market.clone(),
            });
        }

        self.position.update_buy_high(price);

        let row = frame.row(index, price.to_f64().unwrap_or(0.0));

        // first 200 simulation iterations run without the SMA200 window
        let goldencross = if is_sim && self.position.iterations < 200 {
            true
        } else {
            row.goldencross
        };

        let (margin_now, change_pcnt_high) = if self.position.is_long() {
            let outcome = margin::calculate(
                self.position.last_buy_size,
                self.position.last_buy_filled,
                self.position.last_buy_fee,
                self.config.sell_percent,
                price,
                self.taker_fee,
            );
            (
                outcome.margin,
                margin::change_pcnt_from_high(price, self.position.last_buy_high),
            )
        } else {
            (Decimal::ZERO, Decimal::ZERO)
        };

        let custom_scores = if self.config.enable_custom_strategy {
            let scores = custom::evaluate(&frame, index, &series.closes());
            if self.config.is_verbose {
                info!("Bot: custom strategy {}", scores.trace);
            }
            Some(scores)
        } else {
            None
        };

        let ctx = StrategyContext {
            row: &row,
            price,
            close_max: series.close_max(),
            goldencross,
            margin: margin_now,
            change_pcnt_high,
            price_exit: Decimal::from_f64(frame.trade_exit(index)).unwrap_or(Decimal::MAX),
            custom: custom_scores.as_ref(),
        };

        let mut decision = strategy::get_action(&self.config, &mut self.position, &ctx);

        // manual overrides from the control file take precedence
        if self.paused {
            decision.action = Action::Wait;
            decision.immediate = false;
        } else if let Some(command) = self.pending_manual.take() {
            match command {
                ManualCommand::Buy if !self.position.is_long() => {
                    info!("Bot: manual buy override");
                    decision.action = Action::Buy;
                    decision.immediate = true;
                }
                ManualCommand::Sell if self.position.is_long() => {
                    info!("Bot: manual sell override");
                    decision.action = Action::Sell;
                    decision.immediate = true;
                }
                _ => {}
            }
        }
        self.position.action = decision.action;

        // polling is faster than the candle period: only process each
        // candle once unless an immediate action fired
        let already_processed = self.position.last_df_index == Some(candle.ts);
        if already_processed && !decision.immediate {
            info!(
                "{} | {} | {} | Current Price: {}{}",
                candle.ts.format("%Y-%m-%d %H:%M:%S"),
                self.config.market,
                self.granularity,
                margin::truncate(price, 8),
                decision.trailing_log
            );
            self.position.iterations -= 1;
        } else {
            if !(is_sim && self.config.sim_result_only) {
                self.log_status_line(&candle.ts, &row, price, margin_now, decision.action);
                self.log_candlestick_patterns(&row.patterns);
            }
            if let Some(reason) = decision.exit_reason {
                warn!("! {}", reason.describe());
                self.notifier
                    .notify(&format!(
                        "{} ({}) {}",
                        self.config.market,
                        self.granularity.to_medium(),
                        reason.describe()
                    ))
                    .await;
            }

            match decision.action {
                Action::Buy => self.execute_buy(&series, price, candle.ts).await?,
                Action::Sell => {
                    self.execute_sell(&series, price, margin_now, candle.ts).await?
                }
                Action::Wait => {}
            }

            self.position.last_df_index = Some(candle.ts);
        }

        if self.config.live {
            if !self.config.disable_tracker {
                self.persist_tracker().await;
            }
            self.publish_snapshot(price, margin_now, &candle.ts.to_rfc3339()).await;
            match self.control_files.poll_command(&self.config.market).await {
                Some(ManualCommand::Pause) => {
                    if !self.paused {
                        info!("Bot: paused by control file");
                    }
                    self.paused = true;
                }
                Some(command) => {
                    self.paused = false;
                    self.pending_manual = Some(command);
                }
                None => self.paused = false,
            }
        }

        if is_sim {
            if self.position.iterations >= series.len() {
                self.print_simulation_summary(&series);
                return Ok(TickOutcome::Finished);
            }
            if self.config.sim.is_fast() {
                Ok(TickOutcome::Immediate)
            } else {
                Ok(TickOutcome::Reschedule(Duration::from_secs(1)))
            }
        } else {
            Ok(TickOutcome::Reschedule(LIVE_POLL))
        }
    }

    /// Smart-switch arbitration: drop from 1h to 15m when both the 1h and
    /// 6h EMA12/26 pairs are bullish, climb back when both are bearish.
    async fn smart_switch(&mut self) -> Option<TickOutcome> {
        if !self.config.smart_switch {
            return None;
        }

        match self.granularity {
            Granularity::OneHour => {
                if self.higher_timeframe_bull(Granularity::OneHour).await
                    && self.higher_timeframe_bull(Granularity::SixHours).await
                {
                    info!("*** smart switch from granularity 1h to 15m ***");
                    self.notifier
                        .notify(&format!(
                            "{} smart switch from granularity 1h (1 hour) to 15m (15 min)",
                            self.config.market
                        ))
                        .await;
                    self.granularity = Granularity::FifteenMinutes;
                    return Some(TickOutcome::Reschedule(SMART_SWITCH_DELAY));
                }
            }
            Granularity::FifteenMinutes => {
                if !self.higher_timeframe_bull(Granularity::OneHour).await
                    && !self.higher_timeframe_bull(Granularity::SixHours).await
                {
                    info!("*** smart switch from granularity 15m to 1h ***");
                    self.notifier
                        .notify(&format!(
                            "{} smart switch from granularity 15m (15 min) to 1h (1 hour)",
                            self.config.market
                        ))
                        .await;
                    self.granularity = Granularity::OneHour;
                    return Some(TickOutcome::Reschedule(SMART_SWITCH_DELAY));
                }
            }
            _ => {}
        }
        None
    }

    /// EMA12 above EMA26 on the last row of the given timeframe's frame.
    /// Fetch failures report not-bull rather than failing the tick.
    async fn higher_timeframe_bull(&self, granularity: Granularity) -> bool {
        let Ok(series) = self
            .exchange
            .get_historical_data(&self.config.market, granularity, None, None)
            .await
        else {
            return false;
        };
        if series.len() < 26 {
            return false;
        }
        let closes = series.closes();
        let ema12 = ema_unchecked(&closes, 12);
        let ema26 = ema_unchecked(&closes, 26);
        match (ema12.last(), ema26.last()) {
            (Some(fast), Some(slow)) => fast > slow,
            _ => false,
        }
    }

    async fn execute_buy(
        &mut self,
        series: &CandleSeries,
        price: Decimal,
        now: chrono::DateTime<Utc>,
    ) -> Result<()> {
        let available = self
            .account
            .get_balance(&self.config.quote_currency)
            .await
            .context("Failed to read quote balance before buy")?;

        let mut size = available * self.config.buy_percent / Decimal::from(100);
        if let Some(max) = self.config.buy_max_size {
            size = size.min(max);
        }
        if size <= Decimal::ZERO {
            warn!("Bot: no quote funds available, ignoring buy");
            return Ok(());
        }
        if let Some(min) = self.config.buy_min_size
            && size < min
        {
            warn!("Bot: buy size {} below minimum {}, ignoring buy", size, min);
            return Ok(());
        }

        let order = self
            .account
            .market_buy(&self.config.market, size, price, self.taker_fee, now)
            .await
            .context("Market buy failed")?;

        // simulated fills bake the fee into the conversion; the margin
        // formulas then see the whole quote size as the cost basis
        let position_fee = if self.config.live { order.fees } else { Decimal::ZERO };
        self.position.record_buy(price, size, order.filled, position_fee);
        self.position
            .arm_tsl(self.config.trailing_stop_loss, self.config.trailing_stop_loss_trigger);

        self.update_fib_band(series, price);

        let message = format!(
            "{} ({}) BUY at {}",
            self.config.market,
            self.granularity.to_medium(),
            margin::truncate(price, 8)
        );
        info!("{}", message);
        self.notifier.notify(&message).await;
        Ok(())
    }

    async fn execute_sell(
        &mut self,
        series: &CandleSeries,
        price: Decimal,
        margin_now: Decimal,
        now: chrono::DateTime<Utc>,
    ) -> Result<()> {
        let base_balance = if self.config.live {
            self.account
                .get_balance(&self.config.base_currency)
                .await
                .context("Failed to read base balance before sell")?
        } else {
            self.position.last_buy_filled
        };
        let quantity = base_balance * self.config.sell_percent / Decimal::from(100);
        if quantity <= Decimal::ZERO {
            warn!("Bot: no base funds available, ignoring sell");
            return Ok(());
        }

        let outcome = margin::calculate(
            self.position.last_buy_size,
            self.position.last_buy_filled,
            self.position.last_buy_fee,
            self.config.sell_percent,
            price,
            self.taker_fee,
        );

        self.account
            .market_sell(&self.config.market, quantity, price, self.taker_fee, now)
            .await
            .context("Market sell failed")?;

        let message = format!(
            "{} ({}) SELL at {} (margin: {}%, delta: {})",
            self.config.market,
            self.granularity.to_medium(),
            margin::truncate(price, 8),
            margin::truncate(margin_now, 2),
            margin::truncate(price - self.position.last_buy_price, 2)
        );
        info!("{}", message);
        if self.config.is_verbose {
            info!(
                "Bot: sell profit {} (margin {}%, fees {})",
                margin::truncate(outcome.profit, 2),
                margin::truncate(outcome.margin, 2),
                margin::truncate(outcome.sell_fee, 2)
            );
        }
        self.notifier.notify(&message).await;

        if self.config.live {
            self.control_files
                .append_trade(TradeLogEntry {
                    market: self.config.market.clone(),
                    action: Action::Sell.to_string(),
                    price,
                    margin: margin::truncate(outcome.margin, 2),
                    timestamp: now.to_rfc3339(),
                })
                .await;
        }

        self.position.record_sell(outcome.sell_filled);
        self.update_fib_band(series, price);
        Ok(())
    }

    /// Recomputes the surrounding Fibonacci retracement band after a
    /// trade; `fib_low` becomes the failsafe floor while long.
    fn update_fib_band(&mut self, series: &CandleSeries, price: Decimal) {
        let price_min = series.close_min().to_f64().unwrap_or(0.0);
        let price_max = series.close_max().to_f64().unwrap_or(0.0);
        let levels = fibonacci_retracement_levels(
            price_min,
            price_max,
            price.to_f64().unwrap_or(0.0),
        );

        match levels.as_slice() {
            [only] => {
                if only.ratio == 1.0 {
                    self.position.fib_low = Decimal::ZERO;
                    self.position.fib_high =
                        Decimal::from_f64(only.value).unwrap_or(Decimal::ZERO);
                } else if only.ratio == 1.618 {
                    let value = Decimal::from_f64(only.value).unwrap_or(Decimal::ZERO);
                    self.position.fib_low = value;
                    self.position.fib_high = value * Decimal::from(2);
                } else {
                    self.position.fib_low =
                        Decimal::from_f64(only.value).unwrap_or(Decimal::ZERO);
                }
            }
            [low, high] => {
                self.position.fib_low = Decimal::from_f64(low.value).unwrap_or(Decimal::ZERO);
                self.position.fib_high =
                    Decimal::from_f64(high.value).unwrap_or(Decimal::ZERO);
            }
            _ => {}
        }
    }

    fn log_status_line(
        &self,
        ts: &chrono::DateTime<Utc>,
        row: &crate::indicators::IndicatorRow,
        price: Decimal,
        margin_now: Decimal,
        action: Action,
    ) {
        let bullbear = if self.config.disable_bull_only || row.sma50 == row.sma200 {
            ""
        } else if row.goldencross {
            " (BULL)"
        } else {
            " (BEAR)"
        };

        let ema_marker = if row.ema12gtema26co {
            "*^"
        } else if row.ema12ltema26co {
            "*v"
        } else if row.ema12gtema26 {
            "^"
        } else if row.ema12ltema26 {
            "v"
        } else {
            "-"
        };
        let macd_marker = if row.macdgtsignalco {
            "*^"
        } else if row.macdltsignalco {
            "*v"
        } else if row.macdgtsignal {
            "^"
        } else {
            "v"
        };

        let margin_text = if self.position.is_long() {
            format!(" | {}% (delta: {})", margin::truncate(margin_now, 2), margin::truncate(price - self.position.last_buy_price, 2))
        } else {
            String::new()
        };

        info!(
            "{} | {}{} | {} | Close: {} | EMA12/26: {} | MACD: {} | OBV: {:.2}% | {}{}",
            ts.format("%Y-%m-%d %H:%M:%S"),
            self.config.market,
            bullbear,
            self.granularity,
            margin::truncate(price, 8),
            ema_marker,
            macd_marker,
            row.obv_pc,
            action,
            margin_text
        );
    }

    fn log_candlestick_patterns(&self, patterns: &crate::indicators::PatternFlags) {
        let detected = [
            (patterns.hammer, "Hammer (\"Weak - Reversal - Bullish Signal - Up\")"),
            (patterns.inverted_hammer, "Inverted Hammer (\"Weak - Continuation - Bullish Pattern - Up\")"),
            (patterns.hanging_man, "Hanging Man (\"Weak - Continuation - Bearish Pattern - Down\")"),
            (patterns.shooting_star, "Shooting Star (\"Weak - Reversal - Bearish Pattern - Down\")"),
            (patterns.three_white_soldiers, "Three White Soldiers (\"Strong - Reversal - Bullish Pattern - Up\")"),
            (patterns.three_black_crows, "Three Black Crows (\"Strong - Reversal - Bearish Pattern - Down\")"),
            (patterns.doji, "Doji (\"Indecision\")"),
            (patterns.three_line_strike, "Three Line Strike (\"Reliable - Reversal - Bullish Pattern - Up\")"),
            (patterns.two_black_gapping, "Two Black Gapping (\"Reliable - Reversal - Bearish Pattern - Down\")"),
            (patterns.morning_star, "Morning Star (\"Strong - Reversal - Bullish Pattern - Up\")"),
            (patterns.evening_star, "Evening Star (\"Strong - Reversal - Bearish Pattern - Down\")"),
            (patterns.abandoned_baby, "Abandoned Baby (\"Reliable - Reversal - Bullish Pattern - Up\")"),
            (patterns.morning_doji_star, "Morning Doji Star (\"Reliable - Reversal - Bullish Pattern - Up\")"),
            (patterns.evening_doji_star, "Evening Doji Star (\"Reliable - Reversal - Bearish Pattern - Down\")"),
            (patterns.astral_buy, "Astral Buy (Fibonacci 3, 5, 8)"),
            (patterns.astral_sell, "Astral Sell (Fibonacci 3, 5, 8)"),
        ];
        for (hit, label) in detected {
            if hit {
                info!("* Candlestick Detected: {}", label);
            }
        }
    }

    async fn persist_tracker(&self) {
        let orders = match self
            .account
            .get_orders(&self.config.market, None, Some(OrderStatus::Done))
            .await
        {
            Ok(orders) => orders,
            Err(e) => {
                warn!("Bot: tracker order fetch failed: {}", e);
                return;
            }
        };
        if let Err(e) = tracker::save_orders_csv(&orders, "orders.csv") {
            warn!("Bot: unable to save orders.csv: {}", e);
        }
        if let Err(e) = tracker::save_tracker_csv(&orders, "tracker.csv") {
            warn!("Bot: unable to save tracker.csv: {}", e);
        }
    }

    async fn publish_snapshot(&self, price: Decimal, margin_now: Decimal, timestamp: &str) {
        let snapshot = MarketSnapshot {
            exchange: self.config.exchange.to_string(),
            market: self.config.market.clone(),
            granularity: self.granularity.to_short().to_string(),
            price,
            margin: margin::truncate(margin_now, 2),
            last_action: format!("{:?}", self.position.last_action).to_uppercase(),
            action: self.position.action.to_string(),
            timestamp: timestamp.to_string(),
        };
        self.control_files
            .write_snapshot(&self.config.market, snapshot)
            .await;
    }

    /// End-of-window summary: counts, first/last trade sizes and the
    /// compounded margin over the whole run.
    fn print_simulation_summary(&mut self, series: &CandleSeries) {
        let Some(last) = series.last() else { return };
        let price = last.close;

        if self.position.buy_count > self.position.sell_count {
            if self.config.sell_at_loss {
                // assume the open trade closes at the window's final price
                let outcome = margin::calculate(
                    self.position.last_buy_size,
                    self.position.last_buy_filled,
                    self.position.last_buy_fee,
                    self.config.sell_percent,
                    price,
                    self.taker_fee,
                );
                self.position.record_sell(outcome.sell_filled);
            } else {
                info!(
                    "Note: sell at loss is disabled and the simulation ends with an open trade; \
                     the margin below assumes no final sell"
                );
            }
        }

        let margin_pcnt = if self.position.sell_count > 0
            && !self.position.first_buy_size.is_zero()
        {
            (self.position.last_sell_size - self.position.first_buy_size)
                / self.position.first_buy_size
                * Decimal::from(100)
        } else {
            Decimal::ZERO
        };

        info!("Simulation Summary");
        info!("   Buy Count : {}", self.position.buy_count);
        info!("  Sell Count : {}", self.position.sell_count);
        info!("  First Buy  : {}", margin::truncate(self.position.first_buy_size, 2));
        info!("  Last Sell  : {}", margin::truncate(self.position.last_sell_size, 2));
        if self.position.sell_count > 0 {
            info!("      Margin : {}%", margin::truncate(margin_pcnt, 2));
            info!("  ** non-live simulation, assuming highest fees");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ExchangeKind, SimSpeed, test_config};
    use crate::domain::candle::Candle;
    use crate::domain::errors::MarketDataError;
    use crate::domain::order::Order;
    use async_trait::async_trait;
    use chrono::{DateTime, Duration as ChronoDuration, TimeZone};
    use rust_decimal_macros::dec;

    /// Serves a linear trend on every timeframe.
    struct TrendExchange {
        rising: bool,
    }

    #[async_trait]
    impl Exchange for TrendExchange {
        fn kind(&self) -> ExchangeKind {
            ExchangeKind::Dummy
        }

        async fn get_historical_data(
            &self,
            market: &str,
            granularity: Granularity,
            _start: Option<DateTime<Utc>>,
            _end: Option<DateTime<Utc>>,
        ) -> Result<CandleSeries, MarketDataError> {
            let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
            let candles = (0..300)
                .map(|i| {
                    let base = if self.rising {
                        100.0 + i as f64
                    } else {
                        500.0 - i as f64
                    };
                    let close = Decimal::from_f64(base).unwrap();
                    Candle {
                        ts: start + ChronoDuration::seconds(granularity.to_seconds() * i as i64),
                        market: market.to_string(),
                        granularity,
                        open: close,
                        high: close + Decimal::ONE,
                        low: close - Decimal::ONE,
                        close,
                        volume: Decimal::from(100),
                    }
                })
                .collect();
            Ok(CandleSeries::from_candles(candles))
        }

        async fn get_ticker(
            &self,
            _market: &str,
        ) -> Result<(DateTime<Utc>, Decimal), MarketDataError> {
            Ok((Utc::now(), dec!(100)))
        }

        async fn get_time(&self) -> Option<DateTime<Utc>> {
            Some(Utc::now())
        }

        async fn get_balance(&self, _currency: &str) -> Result<Decimal, MarketDataError> {
            Ok(Decimal::ZERO)
        }

        async fn get_orders(
            &self,
            _market: &str,
            _action: Option<OrderSide>,
            _status: Option<OrderStatus>,
        ) -> Result<Vec<Order>, MarketDataError> {
            Ok(Vec::new())
        }

        async fn get_taker_fee(&self, _market: &str) -> Decimal {
            dec!(0.005)
        }

        async fn get_maker_fee(&self, _market: &str) -> Decimal {
            dec!(0.005)
        }

        async fn market_buy(
            &self,
            _market: &str,
            _quote_quantity: Decimal,
        ) -> Result<Order, MarketDataError> {
            Err(MarketDataError::Api {
                status: 400,
                body: "not under test".to_string(),
            })
        }

        async fn market_sell(
            &self,
            _market: &str,
            _base_quantity: Decimal,
        ) -> Result<Order, MarketDataError> {
            Err(MarketDataError::Api {
                status: 400,
                body: "not under test".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_smart_switch_fires_exactly_once() {
        let mut config = test_config();
        config.smart_switch = true;
        config.granularity = Granularity::OneHour;
        let mut bot = Bot::new(config, Arc::new(TrendExchange { rising: true }));

        // dual-timeframe bull drops the granularity to 15m
        let outcome = bot.smart_switch().await;
        assert_eq!(outcome, Some(TickOutcome::Reschedule(SMART_SWITCH_DELAY)));
        assert_eq!(bot.granularity, Granularity::FifteenMinutes);

        // the same conditions on the next tick cannot switch again
        assert_eq!(bot.smart_switch().await, None);
        assert_eq!(bot.granularity, Granularity::FifteenMinutes);
    }

    #[tokio::test]
    async fn test_smart_switch_climbs_back_on_dual_bear() {
        let mut config = test_config();
        config.smart_switch = true;
        config.granularity = Granularity::FifteenMinutes;
        let mut bot = Bot::new(config, Arc::new(TrendExchange { rising: false }));
        bot.granularity = Granularity::FifteenMinutes;

        let outcome = bot.smart_switch().await;
        assert_eq!(outcome, Some(TickOutcome::Reschedule(SMART_SWITCH_DELAY)));
        assert_eq!(bot.granularity, Granularity::OneHour);

        assert_eq!(bot.smart_switch().await, None);
    }

    #[tokio::test]
    async fn test_smart_switch_disabled_by_config() {
        let mut config = test_config();
        config.smart_switch = false;
        config.granularity = Granularity::OneHour;
        let mut bot = Bot::new(config, Arc::new(TrendExchange { rising: true }));

        assert_eq!(bot.smart_switch().await, None);
        assert_eq!(bot.granularity, Granularity::OneHour);
    }

    #[tokio::test]
    async fn test_seed_position_from_done_buy_order() {
        use crate::infrastructure::exchange::DummyExchange;

        let exchange = Arc::new(DummyExchange::new());
        exchange
            .get_historical_data("BTC-USD", Granularity::OneHour, None, None)
            .await
            .unwrap();
        exchange.market_buy("BTC-USD", dec!(600)).await.unwrap();

        let mut config = test_config();
        config.live = true;
        config.sim = SimSpeed::Off;
        let mut bot = Bot::new(config, exchange);
        bot.seed_position().await.unwrap();

        assert_eq!(bot.position.last_action, LastAction::Buy);
        assert_eq!(bot.position.last_buy_size, dec!(600));
        assert!(bot.position.last_buy_filled > Decimal::ZERO);
        assert!(bot.position.last_buy_price > Decimal::ZERO);
    }
}
