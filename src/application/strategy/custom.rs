//! Points-based custom strategy.
//!
//! An alternative to the standard EMA/MACD signal pair: six indicator
//! families (RSI, ADX, MACD, OBV, MACD-Leader, EMA/WMA) each contribute
//! 0-2 points per side (2 for a strong reading) and a buy or sell fires
//! when the side's total clears its threshold with the required number
//! of core signals present. The exit-trigger layer still runs unchanged
//! on top of this.

use crate::config::Config;
use crate::domain::position::Position;
use crate::indicators::IndicatorFrame;
use crate::indicators::moving_average::{ema_unchecked, wma};

/// Highest score one side can reach (six families, two points each).
pub const MAX_PTS: u32 = 12;
/// Points required to fire a buy; higher demands broader agreement.
const PTS_TO_BUY: u32 = 8;
/// Points that latch the immediate-buy percent, when configured.
const IMMEDIATE_BUY_PTS: u32 = 10;
/// A couple of points are enough to start exiting.
const PTS_TO_SELL: u32 = 3;
const IMMEDIATE_SELL_PTS: u32 = 6;
/// Core buy signals (ADX, MACD, OBV, MACD-Leader) that must agree.
const SIG_REQUIRED_BUY: u32 = 3;
const SIG_REQUIRED_SELL: u32 = 0;
/// While the buy side still scores this high, `sell_trigger_override`
/// holds the exit-trigger layer back.
pub const SELL_OVERRIDE_PTS: u32 = 7;

/// Scores for one tick.
#[derive(Debug, Clone, Default)]
pub struct CustomSignals {
    pub buy_pts: u32,
    pub sell_pts: u32,
    pub sig_buy: u32,
    pub sig_sell: u32,
    pub trace: String,
}

/// MACD-Leader oscillator: the MACD line plus the smoothed distance of
/// price from each of its EMAs, which turns ahead of the plain MACD.
/// Returns the leader line and its EMA9 signal.
fn macd_leader(closes: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let ema12 = ema_unchecked(closes, 12);
    let ema26 = ema_unchecked(closes, 26);
    let diff_fast: Vec<f64> = closes.iter().zip(&ema12).map(|(c, e)| c - e).collect();
    let diff_slow: Vec<f64> = closes.iter().zip(&ema26).map(|(c, e)| c - e).collect();
    let fast_sm = ema_unchecked(&diff_fast, 12);
    let slow_sm = ema_unchecked(&diff_slow, 26);

    let leader: Vec<f64> = (0..closes.len())
        .map(|i| ema12[i] - ema26[i] + fast_sm[i] - slow_sm[i])
        .collect();
    let signal = ema_unchecked(&leader, 9);
    (leader, signal)
}

/// Signed percent of `delta` against the magnitude of `base`, zero for a
/// vanishing base.
fn pct_of(delta: f64, base: f64) -> f64 {
    if base.abs() > 1e-12 {
        delta / base.abs() * 100.0
    } else {
        0.0
    }
}

/// Scores row `i` of the frame.
pub fn evaluate(frame: &IndicatorFrame, i: usize, closes: &[f64]) -> CustomSignals {
    let mut s = CustomSignals::default();
    if i == 0 || i >= frame.len() {
        return s;
    }

    // RSI against its weighted mean
    let rsi = frame.rsi14[i];
    let rsi_pc = rsi - frame.rsi14[i - 1];
    let rsi_ma = wma(&frame.rsi14[..=i], 10)
        .map(|w| w[i.min(w.len() - 1)])
        .unwrap_or(rsi);
    let rsi_ma_pcnt = if rsi_ma > 0.0 {
        (rsi - rsi_ma) / rsi_ma * 100.0
    } else {
        0.0
    };
    let rsi_action = if rsi_ma_pcnt > 10.0 && rsi_pc >= 0.0 {
        if rsi_ma_pcnt > 20.0 && rsi > 50.0 {
            s.buy_pts += 2;
            "strongbuy"
        } else {
            s.buy_pts += 1;
            "buy"
        }
    } else if rsi_pc < 0.0 {
        if rsi_ma_pcnt < -10.0 {
            s.sell_pts += 2;
            "strongsell"
        } else {
            s.sell_pts += 1;
            "sell"
        }
    } else {
        "wait"
    };

    // ADX with the DI+/DI- spread for strength
    let di_plus = frame.di_plus[i];
    let di_minus = frame.di_minus[i];
    let adx = frame.adx14[i];
    let di_sum = (di_plus + di_minus).max(1e-9);
    let di_pcnt = (di_plus - di_minus) / di_sum * 100.0;
    let di_pc = di_plus - frame.di_plus[i - 1];
    let adx_action = if di_plus > di_minus && di_pcnt > 20.0 && di_pc > 0.0 {
        s.sig_buy += 1;
        if adx > 30.0 && (di_pcnt > 50.0 || di_plus > adx) {
            s.buy_pts += 2;
            "strongbuy"
        } else {
            s.buy_pts += 1;
            "buy"
        }
    } else if di_pc < 0.0 || di_plus < di_minus {
        if di_pcnt < -10.0 || di_minus > adx {
            s.sell_pts += 2;
            "strongsell"
        } else {
            s.sell_pts += 1;
            "sell"
        }
    } else {
        "wait"
    };

    // MACD histogram direction
    let macd = frame.macd[i];
    let signal = frame.signal[i];
    let macd_delta = macd - frame.macd[i - 1];
    let hist = macd - signal;
    let hist_prev = frame.macd[i - 1] - frame.signal[i - 1];
    let macd_action = if macd > signal && macd_delta > 0.0 {
        s.sig_buy += 1;
        if hist > hist_prev && macd > 0.0 {
            s.buy_pts += 2;
            "strongbuy"
        } else {
            s.buy_pts += 1;
            "buy"
        }
    } else if macd < signal && macd_delta < 0.0 {
        s.sig_sell += 1;
        if macd < 0.0 {
            s.sell_pts += 2;
            "strongsell"
        } else {
            s.sell_pts += 1;
            "sell"
        }
    } else {
        "wait"
    };

    // MACD-Leader against its own signal, percent terms for strength
    let (macdlead, macdl_sig) = macd_leader(closes);
    let macdlead_pc = pct_of(macdlead[i] - macdlead[i - 1], macdlead[i - 1]);
    let macdl_sg_diff = pct_of(macdlead[i] - macdl_sig[i], macdl_sig[i]);
    let macdl_action = if macdl_sg_diff > 50.0 && macdlead_pc > 20.0 && macdlead[i] > 0.0 {
        s.sig_buy += 1;
        if macdlead_pc > 40.0 && macdl_sg_diff > 100.0 {
            s.buy_pts += 2;
            "strongbuy"
        } else {
            s.buy_pts += 1;
            "buy"
        }
    } else if macdlead_pc < 0.0 {
        s.sig_sell += 1;
        if macdl_sg_diff < 0.0 {
            s.sell_pts += 2;
            "strongsell"
        } else {
            s.sell_pts += 1;
            "sell"
        }
    } else {
        "wait"
    };

    // OBV momentum
    let obv_pc = frame.obv_pc[i];
    let obv_action = if obv_pc > 0.0 {
        s.sig_buy += 1;
        if obv_pc > 2.0 {
            s.buy_pts += 2;
            "strongbuy"
        } else {
            s.buy_pts += 1;
            "buy"
        }
    } else if obv_pc < 0.0 {
        if obv_pc < -2.0 {
            s.sell_pts += 2;
            "strongsell"
        } else {
            s.sell_pts += 1;
            "sell"
        }
    } else {
        "wait"
    };

    // Fast EMA over WMA
    let ema5 = ema_unchecked(closes, 5);
    let wma5 = wma(closes, 5).unwrap_or_else(|_| ema5.clone());
    let spread_pcnt = if wma5[i] != 0.0 {
        (ema5[i] - wma5[i]) / wma5[i] * 100.0
    } else {
        0.0
    };
    let ema_rising = ema5[i] > ema5[i - 1];
    let emawma_action = if ema5[i] > wma5[i] && ema_rising {
        if spread_pcnt > 0.5 {
            s.buy_pts += 2;
            "strongbuy"
        } else {
            s.buy_pts += 1;
            "buy"
        }
    } else if ema5[i] < wma5[i] && !ema_rising {
        s.sig_sell += 1;
        if spread_pcnt < -0.5 {
            s.sell_pts += 2;
            "strongsell"
        } else {
            s.sell_pts += 1;
            "sell"
        }
    } else {
        "wait"
    };

    s.trace = format!(
        "RSI: {} ADX: {} MACD: {} MACDL: {} OBV: {} EMA/WMA: {} (buy {}/{} sell {}/{})",
        rsi_action, adx_action, macd_action, macdl_action, obv_action, emawma_action,
        s.buy_pts, MAX_PTS, s.sell_pts, MAX_PTS,
    );
    s
}

impl CustomSignals {
    /// True when the buy side clears its thresholds. Latches the
    /// immediate-buy flag when the score is overwhelming.
    pub fn buy_signal(&self, config: &Config, position: &mut Position) -> bool {
        if self.buy_pts >= PTS_TO_BUY && self.sig_buy >= SIG_REQUIRED_BUY {
            let immediate = config.trailing_buy_immediate_pcnt.is_some()
                && self.buy_pts >= IMMEDIATE_BUY_PTS;
            position.set_trailing_buy_immediate(immediate);
            true
        } else {
            false
        }
    }

    /// True when the sell side clears its thresholds.
    pub fn sell_signal(&self, config: &Config, position: &mut Position) -> bool {
        if self.sell_pts >= PTS_TO_SELL && self.sig_sell >= SIG_REQUIRED_SELL {
            position.trailing_sell_immediate = config.trailing_sell_immediate_pcnt.is_some()
                && self.sell_pts >= IMMEDIATE_SELL_PTS;
            true
        } else {
            false
        }
    }

    /// With `sell_trigger_override`, a still-strong buy side holds the
    /// exit-trigger layer back for this tick.
    pub fn holds_exit_triggers(&self, config: &Config) -> bool {
        config.sell_trigger_override && self.buy_pts >= SELL_OVERRIDE_PTS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use crate::domain::candle::CandleSeries;
    use crate::domain::candle::Candle;
    use crate::domain::granularity::Granularity;
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal::Decimal;
    use rust_decimal::prelude::FromPrimitive;

    fn trending_series(up: bool) -> CandleSeries {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let candles = (0..300)
            .map(|i| {
                let base = if up {
                    100.0 + i as f64
                } else {
                    500.0 - i as f64
                };
                let close = Decimal::from_f64(base).unwrap();
                Candle {
                    ts: start + Duration::hours(i as i64),
                    market: "BTC-USD".to_string(),
                    granularity: Granularity::OneHour,
                    open: close,
                    high: close + Decimal::ONE,
                    low: close - Decimal::ONE,
                    close,
                    volume: Decimal::from(100 + (i % 7) as i64),
                }
            })
            .collect();
        CandleSeries::from_candles(candles)
    }

    #[test]
    fn test_uptrend_scores_buy_side() {
        let series = trending_series(true);
        let frame = IndicatorFrame::analyze(&series).unwrap();
        let closes = series.closes();

        let scores = evaluate(&frame, 299, &closes);
        assert!(
            scores.buy_pts > scores.sell_pts,
            "Uptrend should favour the buy side (buy {} sell {})",
            scores.buy_pts,
            scores.sell_pts
        );
        assert!(scores.sig_buy >= 2);
    }

    #[test]
    fn test_downtrend_scores_sell_side() {
        let series = trending_series(false);
        let frame = IndicatorFrame::analyze(&series).unwrap();
        let closes = series.closes();

        let scores = evaluate(&frame, 299, &closes);
        assert!(scores.sell_pts > scores.buy_pts);
    }

    #[test]
    fn test_macd_leader_turns_with_acceleration() {
        // flat prefix, then compounding rally: the leader line is zero at
        // rest and pulls above its own lagging signal once price runs
        let mut closes = vec![100.0; 60];
        let mut price = 100.0;
        for _ in 0..20 {
            price *= 1.03;
            closes.push(price);
        }

        let (leader, signal) = macd_leader(&closes);
        assert!(leader[59].abs() < 1e-9, "Flat prices produce a flat leader");
        let last = closes.len() - 1;
        assert!(leader[last] > 0.0);
        assert!(
            leader[last] > signal[last],
            "A rising leader stays above its EMA9 signal"
        );
    }

    #[test]
    fn test_buy_signal_thresholds() {
        let config = test_config();
        let mut pos = Position::new();

        let weak = CustomSignals {
            buy_pts: PTS_TO_BUY - 1,
            sig_buy: SIG_REQUIRED_BUY,
            ..CustomSignals::default()
        };
        assert!(!weak.buy_signal(&config, &mut pos));

        let no_sigs = CustomSignals {
            buy_pts: MAX_PTS,
            sig_buy: SIG_REQUIRED_BUY - 1,
            ..CustomSignals::default()
        };
        assert!(!no_sigs.buy_signal(&config, &mut pos));

        let strong = CustomSignals {
            buy_pts: PTS_TO_BUY,
            sig_buy: SIG_REQUIRED_BUY,
            ..CustomSignals::default()
        };
        assert!(strong.buy_signal(&config, &mut pos));
        assert!(
            !pos.trailing_buy_immediate,
            "No immediate latch without the configured percent"
        );
    }

    #[test]
    fn test_immediate_latch_needs_config_and_score() {
        let mut config = test_config();
        config.trailing_buy_immediate_pcnt = Some(rust_decimal_macros::dec!(1));
        let mut pos = Position::new();

        let overwhelming = CustomSignals {
            buy_pts: IMMEDIATE_BUY_PTS,
            sig_buy: SIG_REQUIRED_BUY,
            ..CustomSignals::default()
        };
        assert!(overwhelming.buy_signal(&config, &mut pos));
        assert!(pos.trailing_buy_immediate);
        assert!(pos.trailing_buy, "The latch arms the trailing machine");
    }

    #[test]
    fn test_sell_override_holds_exits() {
        let mut config = test_config();
        config.sell_trigger_override = true;

        let strong_buy = CustomSignals {
            buy_pts: SELL_OVERRIDE_PTS,
            ..CustomSignals::default()
        };
        assert!(strong_buy.holds_exit_triggers(&config));

        config.sell_trigger_override = false;
        assert!(!strong_buy.holds_exit_triggers(&config));
    }
}
