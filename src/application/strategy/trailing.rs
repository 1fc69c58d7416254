//! Trailing entry/exit state machines.
//!
//! A buy or sell that survives the signal and exit-trigger layers is not
//! executed immediately: the machine chases the price while it keeps
//! moving the wrong way and only confirms once the move back exceeds the
//! configured percent. A fixed 10% fluctuation band (the `* 0.9` factor)
//! avoids holding a full extra candle over a rounding-sized shortfall.

use crate::application::margin::truncate;
use crate::config::Config;
use crate::domain::position::{Action, Position};
use rust_decimal::Decimal;

/// Outcome of one trailing-machine step.
#[derive(Debug, Clone, PartialEq)]
pub struct TrailingDecision {
    pub action: Action,
    /// Confirmed mid-candle; the control loop acts without waiting for the
    /// candle close.
    pub immediate: bool,
    pub log_text: String,
}

fn price_change(waiting: Decimal, price: Decimal) -> Decimal {
    // signed percent relative to the waiting reference price
    truncate((waiting - price) / waiting * Decimal::from(-100), 2)
}

/// Advances the trailing-buy machine for a pending BUY.
pub fn check_trailing_buy(
    config: &Config,
    position: &mut Position,
    price: Decimal,
) -> TrailingDecision {
    let pricechange = if position.trailing_buy && position.waiting_buy_price > Decimal::ZERO {
        price_change(position.waiting_buy_price, price)
    } else {
        position.waiting_buy_price = price;
        position.trailing_buy = true;
        Decimal::ZERO
    };

    let threshold = config.trailing_buy_pcnt;

    if price < position.waiting_buy_price {
        position.waiting_buy_price = price;
        position.action = Action::Wait;
        TrailingDecision {
            action: Action::Wait,
            immediate: false,
            log_text: format!(" - Wait Chg: Dec {}%", pricechange),
        }
    } else if let Some(immediate_pcnt) = config.trailing_buy_immediate_pcnt
        && (position.trailing_buy_immediate || config.trailing_immediate_buy)
        && pricechange > immediate_pcnt
    {
        position.action = Action::Buy;
        TrailingDecision {
            action: Action::Buy,
            immediate: true,
            log_text: format!(" - Immediate Buy - Chg: {}%/{}%", pricechange, immediate_pcnt),
        }
    } else if pricechange < threshold * Decimal::new(9, 1) {
        position.action = Action::Wait;
        TrailingDecision {
            action: Action::Wait,
            immediate: false,
            log_text: if threshold > Decimal::ZERO {
                format!(" - Wait Chg: {}%/{}%", pricechange, threshold)
            } else {
                format!(" - Wait Chg: {}%", pricechange)
            },
        }
    } else {
        position.action = Action::Buy;
        TrailingDecision {
            action: Action::Buy,
            immediate: false,
            log_text: format!(" - Buy Chg: {}%/{}%", pricechange, threshold),
        }
    }
}

/// Advances the trailing-sell machine for a pending SELL. When the
/// machine is not armed the SELL passes through untouched.
pub fn check_trailing_sell(
    config: &Config,
    position: &mut Position,
    price: Decimal,
) -> TrailingDecision {
    if !position.trailing_sell {
        return TrailingDecision {
            action: position.action,
            immediate: false,
            log_text: String::new(),
        };
    }

    let pricechange = match position.waiting_sell_price {
        Some(waiting) => price_change(waiting, price),
        None => {
            position.waiting_sell_price = Some(price);
            Decimal::ZERO
        }
    };
    let waiting = position.waiting_sell_price.unwrap_or(price);

    if price >= waiting {
        position.waiting_sell_price = Some(price);
        position.action = Action::Wait;
        TrailingDecision {
            action: Action::Wait,
            immediate: false,
            log_text: format!(" - Wait Chg: Inc {}%", pricechange),
        }
    } else if let Some(bailout) = config.trailing_sell_bailout_pcnt
        && pricechange < bailout
    {
        position.action = Action::Sell;
        TrailingDecision {
            action: Action::Sell,
            immediate: true,
            log_text: format!(" - Bailout Immediately - Chg: {}%/{}%", pricechange, bailout),
        }
    } else if let Some(immediate_pcnt) = config.trailing_sell_immediate_pcnt
        && (position.trailing_sell_immediate || config.trailing_immediate_sell)
        && pricechange < immediate_pcnt
    {
        position.action = Action::Sell;
        TrailingDecision {
            action: Action::Sell,
            immediate: true,
            log_text: format!(" - Immediate Sell - Chg: {}%/{}%", pricechange, immediate_pcnt),
        }
    } else if pricechange > config.trailing_sell_pcnt * Decimal::new(9, 1) {
        position.action = Action::Wait;
        TrailingDecision {
            action: Action::Wait,
            immediate: false,
            log_text: format!(" - Wait Chg: {}%/{}%", pricechange, config.trailing_sell_pcnt),
        }
    } else {
        position.action = Action::Sell;
        TrailingDecision {
            action: Action::Sell,
            immediate: false,
            log_text: format!(" - Sell Chg: {}%/{}%", pricechange, config.trailing_sell_pcnt),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use rust_decimal_macros::dec;

    #[test]
    fn test_trailing_buy_confirm_sequence() {
        // trailingbuypcnt = 1: chase the falling price and confirm once the
        // rebound clears 0.9%
        let mut config = test_config();
        config.trailing_buy_pcnt = dec!(1);
        let mut pos = Position::new();

        let step = check_trailing_buy(&config, &mut pos, dec!(100));
        assert_eq!(step.action, Action::Wait);
        assert_eq!(pos.waiting_buy_price, dec!(100));

        let step = check_trailing_buy(&config, &mut pos, dec!(99.5));
        assert_eq!(step.action, Action::Wait);
        assert_eq!(pos.waiting_buy_price, dec!(99.5));

        let step = check_trailing_buy(&config, &mut pos, dec!(99.0));
        assert_eq!(step.action, Action::Wait);
        assert_eq!(pos.waiting_buy_price, dec!(99.0));

        // +0.80% is inside the 10% fluctuation band of 1%
        let step = check_trailing_buy(&config, &mut pos, dec!(99.8));
        assert_eq!(step.action, Action::Wait);
        assert_eq!(pos.waiting_buy_price, dec!(99.0));

        // +1.21% clears the threshold
        let step = check_trailing_buy(&config, &mut pos, dec!(100.2));
        assert_eq!(step.action, Action::Buy);
        assert!(!step.immediate);
        assert_eq!(pos.waiting_buy_price, dec!(99.0));
    }

    #[test]
    fn test_trailing_buy_zero_pcnt_confirms_at_once() {
        let mut config = test_config();
        config.trailing_buy_pcnt = Decimal::ZERO;
        let mut pos = Position::new();

        let step = check_trailing_buy(&config, &mut pos, dec!(100));
        assert_eq!(step.action, Action::Buy);
    }

    #[test]
    fn test_trailing_buy_waiting_price_is_non_increasing() {
        let mut config = test_config();
        config.trailing_buy_pcnt = dec!(2);
        let mut pos = Position::new();

        let prices = [dec!(100), dec!(99), dec!(99.5), dec!(98), dec!(98.5)];
        let mut last_waiting = Decimal::MAX;
        for price in prices {
            check_trailing_buy(&config, &mut pos, price);
            assert!(
                pos.waiting_buy_price <= last_waiting,
                "Waiting price may only reset downward"
            );
            last_waiting = pos.waiting_buy_price;
        }
    }

    #[test]
    fn test_trailing_buy_immediate() {
        let mut config = test_config();
        config.trailing_buy_pcnt = dec!(5);
        config.trailing_buy_immediate_pcnt = Some(dec!(1));
        let mut pos = Position::new();
        pos.set_trailing_buy_immediate(true);

        check_trailing_buy(&config, &mut pos, dec!(100));
        let step = check_trailing_buy(&config, &mut pos, dec!(101.5));
        assert_eq!(step.action, Action::Buy);
        assert!(step.immediate, "Above the immediate threshold the buy fires mid-candle");
    }

    #[test]
    fn test_trailing_sell_pass_through_when_unarmed() {
        let config = test_config();
        let mut pos = Position::new();
        pos.action = Action::Sell;

        let step = check_trailing_sell(&config, &mut pos, dec!(100));
        assert_eq!(step.action, Action::Sell);
        assert!(!step.immediate);
    }

    #[test]
    fn test_trailing_sell_chases_rising_price() {
        let mut config = test_config();
        config.trailing_sell_pcnt = dec!(-1);
        let mut pos = Position::new();
        pos.trailing_sell = true;
        pos.action = Action::Sell;

        // arming tick seeds the waiting price and waits
        let step = check_trailing_sell(&config, &mut pos, dec!(100));
        assert_eq!(step.action, Action::Wait);
        assert_eq!(pos.waiting_sell_price, Some(dec!(100)));

        // rising price resets the reference
        let step = check_trailing_sell(&config, &mut pos, dec!(101));
        assert_eq!(step.action, Action::Wait);
        assert_eq!(pos.waiting_sell_price, Some(dec!(101)));

        // -0.5% is inside the band of -1% * 0.9
        let step = check_trailing_sell(&config, &mut pos, dec!(100.5));
        assert_eq!(step.action, Action::Wait);

        // -1.49% clears it
        let step = check_trailing_sell(&config, &mut pos, dec!(99.5));
        assert_eq!(step.action, Action::Sell);
        assert!(!step.immediate);
    }

    #[test]
    fn test_trailing_sell_bailout() {
        let mut config = test_config();
        config.trailing_sell_pcnt = dec!(-1);
        config.trailing_sell_bailout_pcnt = Some(dec!(-2));
        let mut pos = Position::new();
        pos.trailing_sell = true;
        pos.action = Action::Sell;

        check_trailing_sell(&config, &mut pos, dec!(100));
        let step = check_trailing_sell(&config, &mut pos, dec!(97.5));
        assert_eq!(step.action, Action::Sell);
        assert!(step.immediate, "Bailout sells immediately");
    }

    #[test]
    fn test_trailing_sell_immediate_latch() {
        let mut config = test_config();
        config.trailing_sell_pcnt = dec!(-5);
        config.trailing_sell_immediate_pcnt = Some(dec!(-1));
        let mut pos = Position::new();
        pos.trailing_sell = true;
        pos.trailing_sell_immediate = true;
        pos.action = Action::Sell;

        check_trailing_sell(&config, &mut pos, dec!(100));
        let step = check_trailing_sell(&config, &mut pos, dec!(98.5));
        assert_eq!(step.action, Action::Sell);
        assert!(step.immediate);
    }
}
