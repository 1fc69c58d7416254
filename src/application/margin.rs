//! Margin accounting for the open position.
//!
//! All arithmetic is carried out in `Decimal` with 8 fractional digits;
//! display truncation floors to the requested precision.

use rust_decimal::Decimal;

/// Outcome of valuing the open position at a hypothetical sell price.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarginOutcome {
    pub sell_size: Decimal,
    pub sell_fee: Decimal,
    pub sell_filled: Decimal,
    pub buy_value: Decimal,
    pub profit: Decimal,
    /// Realized percent P&L relative to buy cost, fees included.
    pub margin: Decimal,
}

/// Values the last buy against `sell_price`.
///
/// `sell_percent` scales the sold fraction; `taker_fee` is the exchange's
/// taker rate (e.g. 0.005 for 0.5%).
pub fn calculate(
    last_buy_size: Decimal,
    last_buy_filled: Decimal,
    last_buy_fee: Decimal,
    sell_percent: Decimal,
    sell_price: Decimal,
    taker_fee: Decimal,
) -> MarginOutcome {
    let hundred = Decimal::from(100);

    let sell_size = (sell_percent / hundred) * (sell_price * last_buy_filled);
    let sell_fee = (sell_size * taker_fee).round_dp(8);
    let sell_filled = sell_size - sell_fee;

    let buy_value = last_buy_size - last_buy_fee;
    let profit = (sell_filled - buy_value).round_dp(8);

    let margin = if last_buy_size.is_zero() {
        Decimal::ZERO
    } else {
        ((profit / last_buy_size) * hundred).round_dp(8)
    };

    MarginOutcome {
        sell_size,
        sell_fee,
        sell_filled,
        buy_value,
        profit,
        margin,
    }
}

/// Signed percent change of `price` from the buy-high watermark, zero when
/// the watermark has not cleared 1 (fresh or dust-priced positions).
pub fn change_pcnt_from_high(price: Decimal, last_buy_high: Decimal) -> Decimal {
    if last_buy_high > Decimal::ONE {
        ((price / last_buy_high) - Decimal::ONE) * Decimal::from(100)
    } else {
        Decimal::ZERO
    }
}

/// Floor-truncates a decimal to `dp` fractional digits
/// (`floor(x * 10^dp) / 10^dp`).
pub fn truncate(value: Decimal, dp: u32) -> Decimal {
    let scale = Decimal::from(10u64.pow(dp));
    (value * scale).floor() / scale
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_margin_identity_round_trip() {
        // BUY at P1 with quote size Q, fee baked into the filled amount,
        // then SELL at P2 with the same fee tier:
        // margin == ((P2/P1) * (1-f)^2 - 1) * 100
        let p1 = dec!(100);
        let p2 = dec!(110);
        let q = dec!(1000);
        let fee = dec!(0.005);

        let filled = (q - q * fee) / p1;
        let outcome = calculate(q, filled, Decimal::ZERO, dec!(100), p2, fee);

        let expected = ((p2 / p1) * (Decimal::ONE - fee) * (Decimal::ONE - fee)
            - Decimal::ONE)
            * dec!(100);
        assert!(
            (outcome.margin - expected).abs() < dec!(0.000001),
            "margin {} should match identity {}",
            outcome.margin,
            expected
        );
    }

    #[test]
    fn test_flat_price_loses_the_fees() {
        let q = dec!(1000);
        let fee = dec!(0.005);
        let filled = (q - q * fee) / dec!(100);
        let outcome = calculate(q, filled, Decimal::ZERO, dec!(100), dec!(100), fee);

        assert!(outcome.margin < Decimal::ZERO, "Fees alone make a flat exit negative");
        assert!(outcome.profit < Decimal::ZERO);
    }

    #[test]
    fn test_partial_sell_percent() {
        let q = dec!(1000);
        let filled = dec!(10);
        let outcome = calculate(q, filled, Decimal::ZERO, dec!(50), dec!(100), dec!(0));

        assert_eq!(outcome.sell_size, dec!(500));
        assert_eq!(outcome.sell_filled, dec!(500));
    }

    #[test]
    fn test_zero_buy_size_yields_zero_margin() {
        let outcome = calculate(
            Decimal::ZERO,
            Decimal::ZERO,
            Decimal::ZERO,
            dec!(100),
            dec!(100),
            dec!(0.001),
        );
        assert_eq!(outcome.margin, Decimal::ZERO);
    }

    #[test]
    fn test_change_pcnt_from_high() {
        let change = change_pcnt_from_high(dec!(100), dec!(110));
        assert!((change - dec!(-9.0909090909)).abs() < dec!(0.0001));

        assert_eq!(
            change_pcnt_from_high(dec!(100), dec!(0.5)),
            Decimal::ZERO,
            "Watermark at or below 1 reports zero"
        );
    }

    #[test]
    fn test_truncate_floors() {
        assert_eq!(truncate(dec!(1.2399), 2), dec!(1.23));
        assert_eq!(truncate(dec!(-1.2399), 2), dec!(-1.24));
        assert_eq!(truncate(dec!(5), 2), dec!(5));
    }
}
