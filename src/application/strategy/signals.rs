//! Primary buy/sell signals from the EMA12/26 and MACD cross-overs, with
//! the OBV, Elder-Ray and bull-market qualifiers.

use crate::config::Config;
use crate::domain::position::Position;
use crate::indicators::IndicatorRow;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use tracing::warn;

/// Tick-local facts the signal layer consumes.
#[derive(Debug, Clone, Copy)]
pub struct SignalInputs<'a> {
    pub row: &'a IndicatorRow,
    pub price: Decimal,
    /// Maximum close of the analyzed window, for the near-high veto.
    pub close_max: Decimal,
    /// Golden-cross state after the simulation ramp-up override.
    pub goldencross: bool,
}

/// Buy exclusion: with `disable_buy_near_high` set, refuse to buy within
/// the configured percent of the analyzed window's close high.
pub fn near_high_veto(config: &Config, price: Decimal, close_max: Decimal) -> bool {
    if !config.disable_buy_near_high {
        return false;
    }
    let pcnt = config.no_buy_near_high_pcnt / Decimal::from(100);
    let ceiling = close_max * (Decimal::ONE - pcnt);
    if price > ceiling {
        warn!(
            "Ignoring Buy Signal (price {} within {}% of high {})",
            price, config.no_buy_near_high_pcnt, close_max
        );
        return true;
    }
    false
}

/// Buy signal for a flat position.
///
/// Fires when either the EMA12 crosses above the EMA26 with MACD
/// confirmation, or the EMA12 is already above and the MACD performs the
/// cross-over, both gated by the OBV, Elder-Ray and bull-only qualifiers.
pub fn is_buy_signal(config: &Config, position: &Position, inputs: &SignalInputs) -> bool {
    let row = inputs.row;

    if near_high_veto(config, inputs.price, inputs.close_max) {
        return false;
    }

    if position.is_long() {
        return false;
    }

    if config.disable_buy_ema && config.disable_buy_macd {
        warn!("EMA and MACD indicators are both disabled, no standard buy signal");
        return false;
    }

    let obv_pc = Decimal::from_f64(row.obv_pc).unwrap_or(Decimal::ZERO);
    let obv_ok = obv_pc > Decimal::from(-5) || config.disable_buy_obv;
    let eri_ok = row.eri_buy || config.disable_buy_elder_ray;
    let bull_ok = inputs.goldencross || config.disable_bull_only;

    // criteria 1: EMA cross-over with MACD already above its signal
    if (row.ema12gtema26co || config.disable_buy_ema)
        && (row.macdgtsignal || config.disable_buy_macd)
        && obv_ok
        && eri_ok
        && bull_ok
    {
        return true;
    }

    // criteria 2: EMA already above with the MACD cross-over
    if row.ema12gtema26 && row.macdgtsignalco && obv_ok && eri_ok && bull_ok {
        return true;
    }

    false
}

/// Sell signal for a long position: EMA12 crossing below the EMA26 with
/// MACD confirmation.
pub fn is_sell_signal(config: &Config, row: &IndicatorRow) -> bool {
    if config.disable_buy_ema && config.disable_buy_macd {
        return false;
    }
    row.ema12ltema26co && (row.macdltsignal || config.disable_buy_macd)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use crate::domain::position::LastAction;
    use rust_decimal_macros::dec;

    fn bullish_row() -> IndicatorRow {
        IndicatorRow {
            ema12gtema26co: true,
            macdgtsignal: true,
            eri_buy: true,
            obv_pc: 1.0,
            goldencross: true,
            ..IndicatorRow::default()
        }
    }

    fn signal_inputs(row: &IndicatorRow) -> SignalInputs<'_> {
        SignalInputs {
            row,
            price: dec!(100),
            close_max: dec!(200),
            goldencross: true,
        }
    }

    #[test]
    fn test_buy_on_ema_crossover() {
        let config = test_config();
        let pos = Position::new();
        let row = bullish_row();

        assert!(is_buy_signal(&config, &pos, &signal_inputs(&row)));
    }

    #[test]
    fn test_buy_on_macd_crossover() {
        let config = test_config();
        let pos = Position::new();
        let row = IndicatorRow {
            ema12gtema26: true,
            macdgtsignalco: true,
            eri_buy: true,
            obv_pc: 1.0,
            ..IndicatorRow::default()
        };

        assert!(is_buy_signal(&config, &pos, &signal_inputs(&row)));
    }

    #[test]
    fn test_no_buy_while_long() {
        let config = test_config();
        let mut pos = Position::new();
        pos.last_action = LastAction::Buy;
        pos.last_buy_price = dec!(100);
        let row = bullish_row();

        assert!(!is_buy_signal(&config, &pos, &signal_inputs(&row)));
    }

    #[test]
    fn test_obv_qualifier() {
        let mut config = test_config();
        let pos = Position::new();
        let mut row = bullish_row();
        row.obv_pc = -6.0;

        assert!(
            !is_buy_signal(&config, &pos, &signal_inputs(&row)),
            "OBV below -5% blocks the buy"
        );

        config.disable_buy_obv = true;
        assert!(is_buy_signal(&config, &pos, &signal_inputs(&row)));
    }

    #[test]
    fn test_bull_only_qualifier() {
        let mut config = test_config();
        let pos = Position::new();
        let row = bullish_row();
        let mut inputs = signal_inputs(&row);
        inputs.goldencross = false;

        assert!(
            !is_buy_signal(&config, &pos, &inputs),
            "Without a golden cross the bull-only gate blocks the buy"
        );

        config.disable_bull_only = true;
        assert!(is_buy_signal(&config, &pos, &inputs));
    }

    #[test]
    fn test_near_high_veto() {
        let mut config = test_config();
        config.disable_buy_near_high = true;
        let pos = Position::new();
        let row = bullish_row();

        let mut inputs = signal_inputs(&row);
        inputs.close_max = dec!(101);
        assert!(
            !is_buy_signal(&config, &pos, &inputs),
            "Price within 3% of the window high is vetoed"
        );

        inputs.close_max = dec!(200);
        assert!(is_buy_signal(&config, &pos, &inputs));
    }

    #[test]
    fn test_sell_signal_requires_macd_confirmation() {
        let config = test_config();
        let mut row = IndicatorRow {
            ema12ltema26co: true,
            macdltsignal: false,
            ..IndicatorRow::default()
        };

        assert!(!is_sell_signal(&config, &row));

        row.macdltsignal = true;
        assert!(is_sell_signal(&config, &row));
    }

    #[test]
    fn test_both_disabled_blocks_everything() {
        let mut config = test_config();
        config.disable_buy_ema = true;
        config.disable_buy_macd = true;
        let pos = Position::new();
        let row = bullish_row();

        assert!(!is_buy_signal(&config, &pos, &signal_inputs(&row)));
        assert!(!is_sell_signal(&config, &row));
    }
}
