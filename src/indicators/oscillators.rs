use crate::domain::errors::TechnicalAnalysisError;
use crate::indicators::moving_average::ema_unchecked;

/// MACD line (ema12 - ema26) and its EMA9 signal line.
pub fn macd(
    ema12: &[f64],
    ema26: &[f64],
) -> Result<(Vec<f64>, Vec<f64>), TechnicalAnalysisError> {
    if ema12.len() < 26 {
        return Err(TechnicalAnalysisError::SeriesTooShort {
            len: ema12.len(),
            period: 26,
        });
    }

    let macd: Vec<f64> = ema12.iter().zip(ema26).map(|(a, b)| a - b).collect();
    let signal = ema_unchecked(&macd, 9);
    Ok((macd, signal))
}

/// Wilder-style RSI: exponentially weighted gain/loss averages with
/// com = period - 1 and min-periods = period, prefix neutralized to 50.
pub fn rsi(closes: &[f64], period: usize) -> Result<Vec<f64>, TechnicalAnalysisError> {
    if !(7..=21).contains(&period) {
        return Err(TechnicalAnalysisError::PeriodOutOfRange {
            period,
            min: 7,
            max: 21,
        });
    }
    if closes.len() < period {
        return Err(TechnicalAnalysisError::SeriesTooShort {
            len: closes.len(),
            period,
        });
    }

    // The weighted form (adjust = true): y_t = sum w_i x_i / sum w_i with
    // w_i = (1 - alpha)^i, alpha = 1 / (1 + com).
    let decay = 1.0 - 1.0 / period as f64;

    let mut out = vec![50.0; closes.len()];
    let mut gain_num = 0.0;
    let mut loss_num = 0.0;
    let mut den = 0.0;

    for i in 1..closes.len() {
        let diff = closes[i] - closes[i - 1];
        let gain = if diff > 0.0 { diff } else { 0.0 };
        let loss = if diff < 0.0 { diff } else { 0.0 };

        gain_num = gain + decay * gain_num;
        loss_num = loss + decay * loss_num;
        den = 1.0 + decay * den;

        if i >= period {
            let avg_gain = gain_num / den;
            let avg_loss = loss_num / den;
            out[i] = if avg_loss == 0.0 {
                if avg_gain == 0.0 { 50.0 } else { 100.0 }
            } else {
                let rs = (avg_gain / avg_loss).abs();
                100.0 - 100.0 / (1.0 + rs)
            };
        }
    }
    Ok(out)
}

/// On-Balance Volume: cumulative signed volume. The first row carries its
/// own volume, matching the source accumulation.
pub fn obv(closes: &[f64], volumes: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(closes.len());
    let mut cum = 0.0;
    for i in 0..closes.len() {
        let delta = if i == 0 {
            volumes[0]
        } else if closes[i] > closes[i - 1] {
            volumes[i]
        } else if closes[i] < closes[i - 1] {
            -volumes[i]
        } else {
            0.0
        };
        cum += delta;
        out.push(cum);
    }
    out
}

/// Percent change of the OBV series, first row 0, rounded to 2 decimals.
pub fn obv_pc(obv: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(obv.len());
    for i in 0..obv.len() {
        let pc = if i == 0 || obv[i - 1] == 0.0 {
            0.0
        } else {
            (obv[i] / obv[i - 1] - 1.0) * 100.0
        };
        out.push((pc * 100.0).round() / 100.0);
    }
    out
}

/// Average Directional Index with DI+ / DI-, Wilder smoothing.
pub struct DirectionalIndex {
    pub adx: Vec<f64>,
    pub di_plus: Vec<f64>,
    pub di_minus: Vec<f64>,
}

pub fn adx(
    highs: &[f64],
    lows: &[f64],
    closes: &[f64],
    period: usize,
) -> Result<DirectionalIndex, TechnicalAnalysisError> {
    if closes.len() < period + 1 {
        return Err(TechnicalAnalysisError::SeriesTooShort {
            len: closes.len(),
            period: period + 1,
        });
    }

    let n = closes.len();
    let alpha = 1.0 / period as f64;

    let mut adx_out = vec![0.0; n];
    let mut di_plus_out = vec![0.0; n];
    let mut di_minus_out = vec![0.0; n];

    let mut tr_s = 0.0;
    let mut dm_plus_s = 0.0;
    let mut dm_minus_s = 0.0;
    let mut adx_s = 0.0;
    let mut adx_seeded = false;

    for i in 1..n {
        let up_move = highs[i] - highs[i - 1];
        let down_move = lows[i - 1] - lows[i];
        let dm_plus = if up_move > down_move && up_move > 0.0 { up_move } else { 0.0 };
        let dm_minus = if down_move > up_move && down_move > 0.0 { down_move } else { 0.0 };
        let tr = (highs[i] - lows[i])
            .max((highs[i] - closes[i - 1]).abs())
            .max((lows[i] - closes[i - 1]).abs());

        if i == 1 {
            tr_s = tr;
            dm_plus_s = dm_plus;
            dm_minus_s = dm_minus;
        } else {
            tr_s = alpha * tr + (1.0 - alpha) * tr_s;
            dm_plus_s = alpha * dm_plus + (1.0 - alpha) * dm_plus_s;
            dm_minus_s = alpha * dm_minus + (1.0 - alpha) * dm_minus_s;
        }

        if tr_s > 0.0 {
            di_plus_out[i] = 100.0 * dm_plus_s / tr_s;
            di_minus_out[i] = 100.0 * dm_minus_s / tr_s;
        }

        let di_sum = di_plus_out[i] + di_minus_out[i];
        let dx = if di_sum > 0.0 {
            100.0 * (di_plus_out[i] - di_minus_out[i]).abs() / di_sum
        } else {
            0.0
        };

        if !adx_seeded {
            adx_s = dx;
            adx_seeded = true;
        } else {
            adx_s = alpha * dx + (1.0 - alpha) * adx_s;
        }
        adx_out[i] = adx_s;
    }

    Ok(DirectionalIndex {
        adx: adx_out,
        di_plus: di_plus_out,
        di_minus: di_minus_out,
    })
}
