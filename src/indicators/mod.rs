//! The indicator engine.
//!
//! Pure and deterministic: every column is a function of the OHLCV prefix
//! ending at that row. The engine decorates a [`CandleSeries`] with the
//! full set of columns the strategy consumes; callers take a per-row
//! snapshot with [`IndicatorFrame::row`].

pub mod bands;
pub mod crossover;
pub mod elder_ray;
pub mod moving_average;
pub mod oscillators;
pub mod patterns;

use crate::domain::candle::CandleSeries;
use crate::domain::errors::TechnicalAnalysisError;
use bands::{FibonacciBollingerBands, fibonacci_bollinger_bands};
use crossover::{Crossover, crossover};
use elder_ray::elder_ray;
use moving_average::{cma, ema, sma};
use oscillators::{adx, macd, obv, obv_pc, rsi};
use patterns::Ohlc;

/// Boolean candlestick pattern columns.
#[derive(Debug, Clone, Default)]
pub struct PatternColumns {
    pub hammer: Vec<bool>,
    pub inverted_hammer: Vec<bool>,
    pub hanging_man: Vec<bool>,
    pub shooting_star: Vec<bool>,
    pub three_white_soldiers: Vec<bool>,
    pub three_black_crows: Vec<bool>,
    pub doji: Vec<bool>,
    pub three_line_strike: Vec<bool>,
    pub two_black_gapping: Vec<bool>,
    pub morning_star: Vec<bool>,
    pub evening_star: Vec<bool>,
    pub abandoned_baby: Vec<bool>,
    pub morning_doji_star: Vec<bool>,
    pub evening_doji_star: Vec<bool>,
    pub astral_buy: Vec<bool>,
    pub astral_sell: Vec<bool>,
}

/// Per-row snapshot of the pattern flags.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternFlags {
    pub hammer: bool,
    pub inverted_hammer: bool,
    pub hanging_man: bool,
    pub shooting_star: bool,
    pub three_white_soldiers: bool,
    pub three_black_crows: bool,
    pub doji: bool,
    pub three_line_strike: bool,
    pub two_black_gapping: bool,
    pub morning_star: bool,
    pub evening_star: bool,
    pub abandoned_baby: bool,
    pub morning_doji_star: bool,
    pub evening_doji_star: bool,
    pub astral_buy: bool,
    pub astral_sell: bool,
}

/// A candle series decorated with every derived column.
#[derive(Debug, Clone)]
pub struct IndicatorFrame {
    len: usize,

    pub close_pc: Vec<f64>,
    pub close_cpc: Vec<f64>,
    pub cma: Vec<f64>,
    pub sma20: Vec<f64>,
    pub sma50: Vec<f64>,
    pub sma200: Vec<f64>,
    pub ema12: Vec<f64>,
    pub ema13: Vec<f64>,
    pub ema26: Vec<f64>,

    pub goldencross: Vec<bool>,
    pub deathcross: Vec<bool>,

    pub macd: Vec<f64>,
    pub signal: Vec<f64>,
    pub rsi14: Vec<f64>,
    pub obv: Vec<f64>,
    pub obv_pc: Vec<f64>,

    pub elder_ray_bull: Vec<f64>,
    pub elder_ray_bear: Vec<f64>,
    pub eri_buy: Vec<bool>,
    pub eri_sell: Vec<bool>,

    pub fbb: FibonacciBollingerBands,

    pub ema_cross: Crossover,
    pub sma_cross: Crossover,
    pub macd_cross: Crossover,

    pub adx14: Vec<f64>,
    pub di_plus: Vec<f64>,
    pub di_minus: Vec<f64>,

    pub patterns: PatternColumns,
}

/// Scalar view of one frame row, handed to the strategy and the log lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndicatorRow {
    pub close: f64,
    pub ema12: f64,
    pub ema26: f64,
    pub sma50: f64,
    pub sma200: f64,
    pub macd: f64,
    pub signal: f64,
    pub rsi14: f64,
    pub obv: f64,
    pub obv_pc: f64,

    pub goldencross: bool,
    pub ema12gtema26: bool,
    pub ema12gtema26co: bool,
    pub ema12ltema26: bool,
    pub ema12ltema26co: bool,
    pub macdgtsignal: bool,
    pub macdgtsignalco: bool,
    pub macdltsignal: bool,
    pub macdltsignalco: bool,
    pub eri_buy: bool,
    pub eri_sell: bool,

    pub fbb_mid: f64,
    pub fbb_upper: [f64; 6],
    pub fbb_lower: [f64; 6],

    pub adx14: f64,
    pub di_plus: f64,
    pub di_minus: f64,

    pub patterns: PatternFlags,
}

impl IndicatorFrame {
    /// Runs the full analysis pass over a candle series.
    ///
    /// Requires at least 26 rows (the MACD window). The SMA50/200 pair and
    /// the golden cross need their own windows; on shorter series those
    /// columns stay neutral (zeros, no cross) rather than failing.
    pub fn analyze(series: &CandleSeries) -> Result<Self, TechnicalAnalysisError> {
        let n = series.len();
        if n < 26 {
            return Err(TechnicalAnalysisError::SeriesTooShort { len: n, period: 26 });
        }

        let closes = series.closes();
        let opens = series.opens();
        let highs = series.highs();
        let lows = series.lows();
        let volumes = series.volumes();

        let mut close_pc = vec![0.0; n];
        let mut close_cpc = vec![1.0; n];
        for i in 1..n {
            close_pc[i] = if closes[i - 1] != 0.0 {
                closes[i] / closes[i - 1] - 1.0
            } else {
                0.0
            };
            close_cpc[i] = close_cpc[i - 1] * (1.0 + close_pc[i]);
        }

        let ema12 = ema(&closes, 12)?;
        let ema13 = ema(&closes, 13)?;
        let ema26 = ema(&closes, 26)?;
        let sma20 = sma(&closes, 20)?;

        let (sma50, sma200, goldencross, deathcross, sma_cross) = if n >= 200 {
            let sma50 = sma(&closes, 50)?;
            let sma200 = sma(&closes, 200)?;
            let goldencross: Vec<bool> =
                (0..n).map(|i| sma50[i] > sma200[i]).collect();
            let deathcross: Vec<bool> =
                (0..n).map(|i| sma50[i] < sma200[i]).collect();
            let sma_cross = crossover(&sma50, &sma200);
            (sma50, sma200, goldencross, deathcross, sma_cross)
        } else {
            // neutral default when the 200-period window is unavailable
            let zeros = vec![0.0; n];
            (
                zeros.clone(),
                zeros,
                vec![false; n],
                vec![false; n],
                crossover(&[], &[]),
            )
        };

        let (macd_line, signal) = macd(&ema12, &ema26)?;
        let rsi14 = rsi(&closes, 14)?;
        let obv_col = obv(&closes, &volumes);
        let obv_pc_col = obv_pc(&obv_col);

        let eri = elder_ray(&highs, &lows, &ema13);
        let fbb = fibonacci_bollinger_bands(&highs, &lows, &closes, 20, 3.0);

        let ema_cross = crossover(&ema12, &ema26);
        let macd_cross = crossover(&macd_line, &signal);

        let di = adx(&highs, &lows, &closes, 14)?;

        let d = Ohlc {
            open: &opens,
            high: &highs,
            low: &lows,
            close: &closes,
        };
        let pattern_columns = PatternColumns {
            hammer: patterns::hammer(&d),
            inverted_hammer: patterns::inverted_hammer(&d),
            hanging_man: patterns::hanging_man(&d),
            shooting_star: patterns::shooting_star(&d),
            three_white_soldiers: patterns::three_white_soldiers(&d),
            three_black_crows: patterns::three_black_crows(&d),
            doji: patterns::doji(&d),
            three_line_strike: patterns::three_line_strike(&d),
            two_black_gapping: patterns::two_black_gapping(&d),
            morning_star: patterns::morning_star(&d),
            evening_star: patterns::evening_star(&d),
            abandoned_baby: patterns::abandoned_baby(&d),
            morning_doji_star: patterns::morning_doji_star(&d),
            evening_doji_star: patterns::evening_doji_star(&d),
            astral_buy: patterns::astral_buy(&d),
            astral_sell: patterns::astral_sell(&d),
        };

        Ok(Self {
            len: n,
            close_pc,
            close_cpc,
            cma: cma(&closes),
            sma20,
            sma50,
            sma200,
            ema12,
            ema13,
            ema26,
            goldencross,
            deathcross,
            macd: macd_line,
            signal,
            rsi14,
            obv: obv_col,
            obv_pc: obv_pc_col,
            elder_ray_bull: eri.bull,
            elder_ray_bear: eri.bear,
            eri_buy: eri.buy,
            eri_sell: eri.sell,
            fbb,
            ema_cross,
            sma_cross,
            macd_cross,
            adx14: di.adx,
            di_plus: di.di_plus,
            di_minus: di.di_minus,
            patterns: pattern_columns,
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Snapshot of row `i`. Panics if out of range; callers index within
    /// the series they analyzed.
    pub fn row(&self, i: usize, close: f64) -> IndicatorRow {
        IndicatorRow {
            close,
            ema12: self.ema12[i],
            ema26: self.ema26[i],
            sma50: self.sma50[i],
            sma200: self.sma200[i],
            macd: self.macd[i],
            signal: self.signal[i],
            rsi14: self.rsi14[i],
            obv: self.obv[i],
            obv_pc: self.obv_pc[i],
            goldencross: self.goldencross[i],
            ema12gtema26: self.ema_cross.above[i],
            ema12gtema26co: self.ema_cross.above_co[i],
            ema12ltema26: self.ema_cross.below[i],
            ema12ltema26co: self.ema_cross.below_co[i],
            macdgtsignal: self.macd_cross.above[i],
            macdgtsignalco: self.macd_cross.above_co[i],
            macdltsignal: self.macd_cross.below[i],
            macdltsignalco: self.macd_cross.below_co[i],
            eri_buy: self.eri_buy[i],
            eri_sell: self.eri_sell[i],
            fbb_mid: self.fbb.mid[i],
            fbb_upper: std::array::from_fn(|b| self.fbb.upper[b][i]),
            fbb_lower: std::array::from_fn(|b| self.fbb.lower[b][i]),
            adx14: self.adx14[i],
            di_plus: self.di_plus[i],
            di_minus: self.di_minus[i],
            patterns: PatternFlags {
                hammer: self.patterns.hammer[i],
                inverted_hammer: self.patterns.inverted_hammer[i],
                hanging_man: self.patterns.hanging_man[i],
                shooting_star: self.patterns.shooting_star[i],
                three_white_soldiers: self.patterns.three_white_soldiers[i],
                three_black_crows: self.patterns.three_black_crows[i],
                doji: self.patterns.doji[i],
                three_line_strike: self.patterns.three_line_strike[i],
                two_black_gapping: self.patterns.two_black_gapping[i],
                morning_star: self.patterns.morning_star[i],
                evening_star: self.patterns.evening_star[i],
                abandoned_baby: self.patterns.abandoned_baby[i],
                morning_doji_star: self.patterns.morning_doji_star[i],
                evening_doji_star: self.patterns.evening_doji_star[i],
                astral_buy: self.patterns.astral_buy[i],
                astral_sell: self.patterns.astral_sell[i],
            },
        }
    }

    /// Resistance target for the sell-at-resistance trigger: the innermost
    /// upper Fibonacci Bollinger band of row `i`, or infinity while the
    /// band window has not filled.
    pub fn trade_exit(&self, i: usize) -> f64 {
        if self.fbb.mid[i] <= 0.0 {
            f64::INFINITY
        } else {
            self.fbb.upper[0][i]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::candle::Candle;
    use crate::domain::granularity::Granularity;
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal::Decimal;
    use rust_decimal::prelude::FromPrimitive;

    pub(crate) fn series_from_closes(closes: &[f64]) -> CandleSeries {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let candles = closes
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let close = Decimal::from_f64(*c).unwrap();
                Candle {
                    ts: start + Duration::hours(i as i64),
                    market: "BTC-USD".to_string(),
                    granularity: Granularity::OneHour,
                    open: close,
                    high: close + Decimal::ONE,
                    low: close - Decimal::ONE,
                    close,
                    volume: Decimal::from(100),
                }
            })
            .collect();
        CandleSeries::from_candles(candles)
    }

    #[test]
    fn test_macd_column_identity() {
        let closes: Vec<f64> = (0..300).map(|i| 100.0 + (i as f64) / 3.0).collect();
        let frame = IndicatorFrame::analyze(&series_from_closes(&closes)).unwrap();

        for i in 26..frame.len() {
            assert!(
                (frame.macd[i] - (frame.ema12[i] - frame.ema26[i])).abs() < 1e-9,
                "macd[i] must equal ema12[i] - ema26[i]"
            );
        }
    }

    #[test]
    fn test_crossover_invariant() {
        let closes: Vec<f64> = (0..300)
            .map(|i| 100.0 + 10.0 * ((i as f64) / 20.0).sin())
            .collect();
        let frame = IndicatorFrame::analyze(&series_from_closes(&closes)).unwrap();

        for i in 1..frame.len() {
            let expected =
                frame.ema_cross.above[i] && !frame.ema_cross.above[i - 1];
            assert_eq!(
                frame.ema_cross.above_co[i], expected,
                "co flag must mark exactly the transition row"
            );
        }
    }

    #[test]
    fn test_short_series_rejected() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        let result = IndicatorFrame::analyze(&series_from_closes(&closes));
        assert_eq!(
            result.err(),
            Some(TechnicalAnalysisError::SeriesTooShort { len: 20, period: 26 })
        );
    }

    #[test]
    fn test_goldencross_neutral_below_200_rows() {
        let closes: Vec<f64> = (0..100).map(|i| 100.0 + i as f64).collect();
        let frame = IndicatorFrame::analyze(&series_from_closes(&closes)).unwrap();
        assert!(frame.goldencross.iter().all(|g| !g));
    }

    #[test]
    fn test_goldencross_in_long_uptrend() {
        let closes: Vec<f64> = (0..300).map(|i| 100.0 + i as f64).collect();
        let frame = IndicatorFrame::analyze(&series_from_closes(&closes)).unwrap();
        assert!(
            frame.goldencross[299],
            "SMA50 should sit above SMA200 after a long rise"
        );
        assert!(!frame.deathcross[299]);
    }

    #[test]
    fn test_row_snapshot_matches_columns() {
        let closes: Vec<f64> = (0..300)
            .map(|i| 100.0 + 5.0 * ((i as f64) / 15.0).cos())
            .collect();
        let frame = IndicatorFrame::analyze(&series_from_closes(&closes)).unwrap();

        let row = frame.row(299, closes[299]);
        assert_eq!(row.ema12, frame.ema12[299]);
        assert_eq!(row.macdgtsignal, frame.macd_cross.above[299]);
        assert_eq!(row.fbb_upper[0], frame.fbb.upper[0][299]);
        assert_eq!(row.patterns.doji, frame.patterns.doji[299]);
    }

    #[test]
    fn test_trade_exit_uses_inner_band() {
        let closes: Vec<f64> = (0..300)
            .map(|i| 100.0 + 5.0 * ((i as f64) / 10.0).sin())
            .collect();
        let frame = IndicatorFrame::analyze(&series_from_closes(&closes)).unwrap();

        assert_eq!(frame.trade_exit(299), frame.fbb.upper[0][299]);
        assert!(frame.trade_exit(5).is_infinite());
    }
}
