use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Decision produced by the strategy for the current tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    Buy,
    Sell,
    Wait,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Buy => write!(f, "BUY"),
            Action::Sell => write!(f, "SELL"),
            Action::Wait => write!(f, "WAIT"),
        }
    }
}

/// Last order side the bot acted on. `None` until the first trade (or
/// until seeded from the exchange's done orders at startup).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LastAction {
    #[default]
    None,
    Buy,
    Sell,
}

/// Mutable bot state: last-buy accounting, trailing latches and the
/// action ledger. One instance per bot, created at start, mutated only
/// inside a tick.
///
/// Invariants upheld by the mutators:
/// - `last_buy_price > 0` exactly when `last_action == Buy`
/// - `trailing_buy_immediate` implies `trailing_buy`
#[derive(Debug, Clone, Default)]
pub struct Position {
    pub last_action: LastAction,

    pub last_buy_price: Decimal,
    pub last_buy_size: Decimal,
    pub last_buy_filled: Decimal,
    pub last_buy_fee: Decimal,
    /// Running maximum of price since the buy; drives the trailing stop.
    pub last_buy_high: Decimal,

    /// Fibonacci retracement band immediately surrounding the last trade
    /// price, recomputed at every BUY and SELL.
    pub fib_low: Decimal,
    pub fib_high: Decimal,

    pub trailing_buy: bool,
    pub trailing_sell: bool,
    pub waiting_buy_price: Decimal,
    pub waiting_sell_price: Option<Decimal>,
    pub trailing_buy_immediate: bool,
    pub trailing_sell_immediate: bool,

    /// Latched once margin has exceeded the prevent-loss trigger.
    pub prevent_loss: bool,

    pub tsl_triggered: bool,
    pub tsl_trigger: Decimal,
    pub tsl_pcnt: Option<Decimal>,
    pub tsl_max: bool,

    pub iterations: usize,
    pub buy_count: usize,
    pub sell_count: usize,
    pub first_buy_size: Decimal,
    pub last_sell_size: Decimal,
    pub buy_sum: Decimal,
    pub sell_sum: Decimal,

    pub action: Action,
    /// Timestamp of the last processed candle, used to skip re-processing
    /// within one candle period.
    pub last_df_index: Option<DateTime<Utc>>,
}

impl Default for Action {
    fn default() -> Self {
        Action::Wait
    }
}

impl Position {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_long(&self) -> bool {
        self.last_action == LastAction::Buy
    }

    /// Records a filled buy. `size` is the quote amount spent, `filled`
    /// the base amount received, `fee` the quote fee charged.
    pub fn record_buy(&mut self, price: Decimal, size: Decimal, filled: Decimal, fee: Decimal) {
        self.last_action = LastAction::Buy;
        self.last_buy_price = price;
        self.last_buy_size = size;
        self.last_buy_filled = filled;
        self.last_buy_fee = fee;
        self.last_buy_high = price;

        self.buy_count += 1;
        if self.first_buy_size == Decimal::ZERO {
            self.first_buy_size = size;
        }
        self.buy_sum += size;

        self.clear_trailing();
        self.prevent_loss = false;
        self.tsl_triggered = false;
        self.tsl_max = false;
    }

    /// Records a filled sell (`proceeds` in quote currency) and clears
    /// the open-position fields.
    pub fn record_sell(&mut self, proceeds: Decimal) {
        self.last_action = LastAction::Sell;
        self.sell_count += 1;
        self.last_sell_size = proceeds;
        self.sell_sum += proceeds;

        self.last_buy_price = Decimal::ZERO;
        self.last_buy_size = Decimal::ZERO;
        self.last_buy_filled = Decimal::ZERO;
        self.last_buy_fee = Decimal::ZERO;
        self.last_buy_high = Decimal::ZERO;

        self.clear_trailing();
        self.prevent_loss = false;
        self.tsl_triggered = false;
        self.tsl_max = false;
    }

    /// Updates the buy-high watermark while long.
    pub fn update_buy_high(&mut self, price: Decimal) {
        if self.is_long() && price > self.last_buy_high {
            self.last_buy_high = price;
        }
    }

    /// Arms the trailing stop loss for a fresh position.
    pub fn arm_tsl(&mut self, tsl_pcnt: Option<Decimal>, tsl_trigger: Decimal) {
        self.tsl_pcnt = tsl_pcnt;
        self.tsl_trigger = tsl_trigger;
        self.tsl_triggered = false;
        self.tsl_max = false;
    }

    pub fn clear_trailing(&mut self) {
        self.trailing_buy = false;
        self.trailing_sell = false;
        self.waiting_buy_price = Decimal::ZERO;
        self.waiting_sell_price = None;
        self.trailing_buy_immediate = false;
        self.trailing_sell_immediate = false;
    }

    /// Latches the immediate-buy flag; arming implies the trailing buy
    /// machine itself is armed.
    pub fn set_trailing_buy_immediate(&mut self, immediate: bool) {
        self.trailing_buy_immediate = immediate;
        if immediate {
            self.trailing_buy = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_buy_sell_invariant() {
        let mut pos = Position::new();
        assert!(!pos.is_long());
        assert_eq!(pos.last_buy_price, Decimal::ZERO);

        pos.record_buy(dec!(100), dec!(1000), dec!(9.95), dec!(5));
        assert!(pos.is_long());
        assert!(pos.last_buy_price > Decimal::ZERO);
        assert_eq!(pos.last_buy_high, dec!(100));
        assert_eq!(pos.buy_count, 1);
        assert_eq!(pos.first_buy_size, dec!(1000));

        pos.record_sell(dec!(1100));
        assert!(!pos.is_long());
        assert_eq!(pos.last_buy_price, Decimal::ZERO);
        assert_eq!(pos.sell_count, 1);
        assert_eq!(pos.sell_sum, dec!(1100));
    }

    #[test]
    fn test_first_buy_size_only_set_once() {
        let mut pos = Position::new();
        pos.record_buy(dec!(100), dec!(1000), dec!(10), dec!(0));
        pos.record_sell(dec!(1100));
        pos.record_buy(dec!(110), dec!(1100), dec!(10), dec!(0));

        assert_eq!(pos.first_buy_size, dec!(1000));
        assert_eq!(pos.buy_sum, dec!(2100));
    }

    #[test]
    fn test_buy_high_watermark() {
        let mut pos = Position::new();
        pos.record_buy(dec!(100), dec!(1000), dec!(10), dec!(0));

        pos.update_buy_high(dec!(110));
        assert_eq!(pos.last_buy_high, dec!(110));

        pos.update_buy_high(dec!(105));
        assert_eq!(pos.last_buy_high, dec!(110), "Watermark never decreases");
    }

    #[test]
    fn test_immediate_implies_armed() {
        let mut pos = Position::new();
        pos.set_trailing_buy_immediate(true);
        assert!(pos.trailing_buy, "Immediate latch must arm the machine");
    }

    #[test]
    fn test_buy_rearms_latches() {
        let mut pos = Position::new();
        pos.prevent_loss = true;
        pos.tsl_triggered = true;
        pos.record_buy(dec!(100), dec!(1000), dec!(10), dec!(0));

        assert!(!pos.prevent_loss);
        assert!(!pos.tsl_triggered);
        assert!(!pos.tsl_max);
    }
}
