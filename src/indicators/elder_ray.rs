/// Elder-Ray Index: bull power (high - EMA13) and bear power (low - EMA13)
/// with the derived buy/sell strength flags.
#[derive(Debug, Clone)]
pub struct ElderRay {
    pub bull: Vec<f64>,
    pub bear: Vec<f64>,
    pub buy: Vec<bool>,
    pub sell: Vec<bool>,
}

pub fn elder_ray(highs: &[f64], lows: &[f64], ema13: &[f64]) -> ElderRay {
    let n = ema13.len();
    let mut bull = Vec::with_capacity(n);
    let mut bear = Vec::with_capacity(n);
    for i in 0..n {
        bull.push(highs[i] - ema13[i]);
        bear.push(lows[i] - ema13[i]);
    }

    let mut buy = vec![false; n];
    let mut sell = vec![false; n];
    for i in 1..n {
        // bear is negative but rising (less bearish), or bull is rising
        buy[i] = (bear[i] < 0.0 && bear[i] > bear[i - 1]) || bull[i] > bull[i - 1];
        // bull is positive but bear is falling, or bull is falling
        sell[i] = (bull[i] > 0.0 && bear[i] < bear[i - 1]) || bull[i] < bull[i - 1];
    }

    ElderRay { bull, bear, buy, sell }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::moving_average::ema_unchecked;

    #[test]
    fn test_powers_relative_to_ema13() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let highs: Vec<f64> = closes.iter().map(|c| c + 1.0).collect();
        let lows: Vec<f64> = closes.iter().map(|c| c - 1.0).collect();
        let ema13 = ema_unchecked(&closes, 13);

        let eri = elder_ray(&highs, &lows, &ema13);
        for i in 0..closes.len() {
            assert!((eri.bull[i] - (highs[i] - ema13[i])).abs() < 1e-12);
            assert!((eri.bear[i] - (lows[i] - ema13[i])).abs() < 1e-12);
        }
    }

    #[test]
    fn test_uptrend_flags_buy() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + 2.0 * i as f64).collect();
        let highs: Vec<f64> = closes.iter().map(|c| c + 1.0).collect();
        let lows: Vec<f64> = closes.iter().map(|c| c - 1.0).collect();
        let ema13 = ema_unchecked(&closes, 13);

        let eri = elder_ray(&highs, &lows, &ema13);
        assert!(eri.buy[29], "Rising bull power should flag a buy");
        assert!(!eri.buy[0], "First row has no previous row to compare");
    }

    #[test]
    fn test_downtrend_flags_sell() {
        let closes: Vec<f64> = (0..30).map(|i| 200.0 - 2.0 * i as f64).collect();
        let highs: Vec<f64> = closes.iter().map(|c| c + 1.0).collect();
        let lows: Vec<f64> = closes.iter().map(|c| c - 1.0).collect();
        let ema13 = ema_unchecked(&closes, 13);

        let eri = elder_ray(&highs, &lows, &ema13);
        assert!(eri.sell[29], "Falling bull power should flag a sell");
    }
}
