use crate::indicators::moving_average::sma_strict;

/// Band offsets applied either side of the 20-period typical-price mean.
pub const FBB_RATIOS: [f64; 6] = [0.236, 0.382, 0.5, 0.618, 0.764, 1.0];

/// Fibonacci Bollinger Bands: SMA20 of the typical price with six ratio
/// offsets of three standard deviations on each side. Rows without a full
/// window are zero.
#[derive(Debug, Clone)]
pub struct FibonacciBollingerBands {
    pub mid: Vec<f64>,
    pub upper: [Vec<f64>; 6],
    pub lower: [Vec<f64>; 6],
}

pub fn fibonacci_bollinger_bands(
    highs: &[f64],
    lows: &[f64],
    closes: &[f64],
    interval: usize,
    multiplier: f64,
) -> FibonacciBollingerBands {
    let n = closes.len();
    let tp: Vec<f64> = (0..n)
        .map(|i| (highs[i] + lows[i] + closes[i]) / 3.0)
        .collect();

    let mid = sma_strict(&tp, interval);
    let sd = rolling_std(&tp, interval);

    let mut upper: [Vec<f64>; 6] = Default::default();
    let mut lower: [Vec<f64>; 6] = Default::default();
    for (b, ratio) in FBB_RATIOS.iter().enumerate() {
        upper[b] = (0..n).map(|i| mid[i] + ratio * multiplier * sd[i]).collect();
        lower[b] = (0..n).map(|i| mid[i] - ratio * multiplier * sd[i]).collect();
    }

    FibonacciBollingerBands { mid, upper, lower }
}

/// Rolling sample standard deviation (ddof = 1), zero until a full window
/// is available.
fn rolling_std(values: &[f64], window: usize) -> Vec<f64> {
    let mut out = vec![0.0; values.len()];
    if window < 2 {
        return out;
    }
    for i in 0..values.len() {
        if i + 1 < window {
            continue;
        }
        let slice = &values[i + 1 - window..=i];
        let mean = slice.iter().sum::<f64>() / window as f64;
        let var = slice.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>()
            / (window - 1) as f64;
        out[i] = var.sqrt();
    }
    out
}

/// A Fibonacci retracement level: the ratio and its price value scaled
/// between the series close min/max, floor-truncated to 2 decimals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FibLevel {
    pub ratio: f64,
    pub value: f64,
}

/// Returns the retracement levels adjacent to `price`, or every level when
/// `price` is zero. Ratios come from the set
/// {0, 0.286, 0.382, 0.5, 0.618, 0.768, 1, 1.272, 1.414, 1.618} where
/// ratio r maps to `max - r * (max - min)` (extensions above 1 add to max).
pub fn fibonacci_retracement_levels(
    price_min: f64,
    price_max: f64,
    price: f64,
) -> Vec<FibLevel> {
    let diff = price_max - price_min;
    let level = |r: f64| -> f64 {
        if r <= 1.0 {
            truncate2(price_max - r * diff)
        } else {
            truncate2(price_max + (r - 1.0) * diff)
        }
    };

    let mut out: Vec<FibLevel> = Vec::new();
    let mut push = |ratio: f64| {
        if !out.iter().any(|l| l.ratio == ratio) {
            out.push(FibLevel {
                ratio,
                value: level(ratio),
            });
        }
    };

    if price == 0.0 {
        for ratio in [1.0, 0.768, 0.618, 0.5, 0.382, 0.286, 0.0, 1.272, 1.414, 1.618] {
            push(ratio);
        }
        return out;
    }

    if price <= price_min {
        push(1.0);
    }
    if price > price_min && price <= price_max - 0.768 * diff {
        push(1.0);
        push(0.768);
    }
    if price > price_max - 0.768 * diff && price <= price_max - 0.618 * diff {
        push(0.768);
        push(0.618);
    }
    if price > price_max - 0.618 * diff && price <= price_max - 0.5 * diff {
        push(0.618);
        push(0.5);
    }
    if price > price_max - 0.5 * diff && price <= price_max - 0.382 * diff {
        push(0.5);
        push(0.382);
    }
    if price > price_max - 0.382 * diff && price <= price_max - 0.286 * diff {
        push(0.382);
        push(0.286);
    }
    if price > price_max - 0.286 * diff && price <= price_max {
        push(0.286);
        push(0.0);
    }
    if price >= price_max && price < price_max + 0.272 * diff {
        push(0.0);
        push(1.272);
    }
    if price >= price_max + 0.272 * diff && price < price_max + 0.414 * diff {
        push(1.272);
        push(1.414);
    }
    if price >= price_max + 0.414 * diff && price < price_max + 0.618 * diff {
        push(1.618);
    }

    out
}

fn truncate2(value: f64) -> f64 {
    (value * 100.0).floor() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fbb_band_offsets() {
        let n = 40;
        let closes: Vec<f64> = (0..n).map(|i| 100.0 + (i % 7) as f64).collect();
        let highs: Vec<f64> = closes.iter().map(|c| c + 1.0).collect();
        let lows: Vec<f64> = closes.iter().map(|c| c - 1.0).collect();

        let fbb = fibonacci_bollinger_bands(&highs, &lows, &closes, 20, 3.0);

        let i = n - 1;
        let sd_unit = (fbb.upper[5][i] - fbb.mid[i]) / 1.0;
        for (b, ratio) in FBB_RATIOS.iter().enumerate() {
            assert!(
                (fbb.upper[b][i] - fbb.mid[i] - ratio * sd_unit).abs() < 1e-8,
                "Upper band {} must sit at ratio {} of 3 std",
                b,
                ratio
            );
            assert!((fbb.mid[i] - fbb.lower[b][i] - ratio * sd_unit).abs() < 1e-8);
        }
    }

    #[test]
    fn test_fbb_prefix_is_zero() {
        let closes = vec![100.0; 25];
        let fbb = fibonacci_bollinger_bands(&closes, &closes, &closes, 20, 3.0);
        assert_eq!(fbb.mid[18], 0.0);
        assert_eq!(fbb.upper[0][18], 0.0);
        assert!(fbb.mid[19] > 0.0);
    }

    #[test]
    fn test_rolling_std_matches_sample_formula() {
        let values = vec![1.0, 2.0, 3.0, 4.0];
        let out = rolling_std(&values, 4);
        // sample variance of 1..4 = 5/3
        assert!((out[3] - (5.0f64 / 3.0).sqrt()).abs() < 1e-12);
        assert_eq!(out[2], 0.0);
    }

    #[test]
    fn test_retracement_inside_band() {
        // min 100, max 200: price 155 sits between the 0.5 level (150)
        // and the 0.382 level (161.8)
        let levels = fibonacci_retracement_levels(100.0, 200.0, 155.0);
        assert_eq!(levels.len(), 2);
        assert_eq!(levels[0].ratio, 0.5);
        assert_eq!(levels[0].value, 150.0);
        assert_eq!(levels[1].ratio, 0.382);
        assert!((levels[1].value - 161.8).abs() < 0.011);
    }

    #[test]
    fn test_retracement_below_min() {
        let levels = fibonacci_retracement_levels(100.0, 200.0, 90.0);
        assert_eq!(levels.len(), 1);
        assert_eq!(levels[0].ratio, 1.0);
        assert_eq!(levels[0].value, 100.0);
    }

    #[test]
    fn test_retracement_above_max() {
        let levels = fibonacci_retracement_levels(100.0, 200.0, 210.0);
        assert_eq!(levels.len(), 2);
        assert_eq!(levels[0].ratio, 0.0);
        assert_eq!(levels[0].value, 200.0);
        assert_eq!(levels[1].ratio, 1.272);
        assert!((levels[1].value - 227.2).abs() < 0.011);
    }

    #[test]
    fn test_retracement_all_levels_for_zero_price() {
        let levels = fibonacci_retracement_levels(100.0, 200.0, 0.0);
        assert_eq!(levels.len(), 10);
        assert_eq!(levels[0].ratio, 1.0);
        assert_eq!(levels[6].ratio, 0.0);
    }

    #[test]
    fn test_retracement_truncates_down() {
        // diff = 99.99, 0.5 level = 150.005 -> truncated to 150.0
        let levels = fibonacci_retracement_levels(100.01, 200.0, 155.0);
        assert_eq!(levels[0].value, 150.0);
    }
}
