//! Candlestick pattern detection on OHLC series.
//!
//! Each detector returns one boolean per row. Rows without enough history
//! for the pattern's lookback are false, as are rows where a ratio's
//! denominator is degenerate (a candle with no range).

pub struct Ohlc<'a> {
    pub open: &'a [f64],
    pub high: &'a [f64],
    pub low: &'a [f64],
    pub close: &'a [f64],
}

impl<'a> Ohlc<'a> {
    fn len(&self) -> usize {
        self.close.len()
    }

    fn body(&self, i: usize) -> f64 {
        (self.close[i] - self.open[i]).abs()
    }

    fn range(&self, i: usize) -> f64 {
        self.high[i] - self.low[i]
    }

    fn body_top(&self, i: usize) -> f64 {
        self.open[i].max(self.close[i])
    }

    fn body_bottom(&self, i: usize) -> f64 {
        self.open[i].min(self.close[i])
    }
}

fn detect(len: usize, lookback: usize, f: impl Fn(usize) -> bool) -> Vec<bool> {
    (0..len).map(|i| i >= lookback && f(i)).collect()
}

/// Hammer ("Weak - Reversal - Bullish Signal - Up")
pub fn hammer(d: &Ohlc) -> Vec<bool> {
    detect(d.len(), 0, |i| {
        let shadow = 0.001 + d.range(i);
        d.range(i) > 3.0 * (d.open[i] - d.close[i])
            && (d.close[i] - d.low[i]) / shadow > 0.6
            && (d.open[i] - d.low[i]) / shadow > 0.6
    })
}

/// Inverted Hammer ("Weak - Continuation - Bullish Pattern - Up")
pub fn inverted_hammer(d: &Ohlc) -> Vec<bool> {
    detect(d.len(), 0, |i| {
        let shadow = 0.001 + d.range(i);
        d.range(i) > 3.0 * (d.open[i] - d.close[i])
            && (d.high[i] - d.close[i]) / shadow > 0.6
            && (d.high[i] - d.open[i]) / shadow > 0.6
    })
}

/// Shooting Star ("Weak - Reversal - Bearish Pattern - Down")
pub fn shooting_star(d: &Ohlc) -> Vec<bool> {
    detect(d.len(), 1, |i| {
        d.open[i - 1] < d.close[i - 1]
            && d.close[i - 1] < d.open[i]
            && d.high[i] - d.body_top(i) >= d.body(i) * 3.0
            && d.body_bottom(i) - d.low[i] <= d.body(i)
    })
}

/// Hanging Man ("Weak - Continuation - Bearish Pattern - Down")
pub fn hanging_man(d: &Ohlc) -> Vec<bool> {
    detect(d.len(), 2, |i| {
        let shadow = 0.001 + d.range(i);
        d.range(i) > 4.0 * (d.open[i] - d.close[i])
            && (d.close[i] - d.low[i]) / shadow >= 0.75
            && (d.open[i] - d.low[i]) / shadow >= 0.75
            && d.high[i - 1] < d.open[i]
            && d.high[i - 2] < d.open[i]
    })
}

/// Three White Soldiers ("Strong - Reversal - Bullish Pattern - Up")
pub fn three_white_soldiers(d: &Ohlc) -> Vec<bool> {
    detect(d.len(), 2, |i| {
        d.open[i] > d.open[i - 1]
            && d.open[i] < d.close[i - 1]
            && d.close[i] > d.high[i - 1]
            && d.high[i] - d.body_top(i) < d.body(i)
            && d.open[i - 1] > d.open[i - 2]
            && d.open[i - 1] < d.close[i - 2]
            && d.close[i - 1] > d.high[i - 2]
            && d.high[i - 1] - d.body_top(i - 1) < d.body(i - 1)
    })
}

/// Three Black Crows ("Strong - Reversal - Bearish Pattern - Down")
pub fn three_black_crows(d: &Ohlc) -> Vec<bool> {
    detect(d.len(), 2, |i| {
        d.open[i] < d.open[i - 1]
            && d.open[i] > d.close[i - 1]
            && d.close[i] < d.low[i - 1]
            && d.low[i] - d.body_top(i) < d.body(i)
            && d.open[i - 1] < d.open[i - 2]
            && d.open[i - 1] > d.close[i - 2]
            && d.close[i - 1] < d.low[i - 2]
            && d.low[i - 1] - d.body_top(i - 1) < d.body(i - 1)
    })
}

/// Doji ("Indecision")
pub fn doji(d: &Ohlc) -> Vec<bool> {
    detect(d.len(), 0, |i| {
        d.range(i) > 0.0
            && d.body(i) / d.range(i) < 0.1
            && d.high[i] - d.body_top(i) > 3.0 * d.body(i)
            && d.body_bottom(i) - d.low[i] > 3.0 * d.body(i)
    })
}

/// Three Line Strike ("Reliable - Reversal - Bullish Pattern - Up")
pub fn three_line_strike(d: &Ohlc) -> Vec<bool> {
    detect(d.len(), 3, |i| {
        d.open[i - 1] < d.open[i - 2]
            && d.open[i - 1] > d.close[i - 2]
            && d.close[i - 1] < d.low[i - 2]
            && d.low[i - 1] - d.body_top(i - 1) < d.body(i - 1)
            && d.open[i - 2] < d.open[i - 3]
            && d.open[i - 2] > d.close[i - 3]
            && d.close[i - 2] < d.low[i - 3]
            && d.low[i - 2] - d.body_top(i - 2) < d.body(i - 2)
            && d.open[i] < d.low[i - 1]
            && d.close[i] > d.high[i - 3]
    })
}

/// Two Black Gapping ("Reliable - Reversal - Bearish Pattern - Down")
pub fn two_black_gapping(d: &Ohlc) -> Vec<bool> {
    detect(d.len(), 2, |i| {
        d.open[i] < d.open[i - 1]
            && d.open[i] > d.close[i - 1]
            && d.close[i] < d.low[i - 1]
            && d.low[i] - d.body_top(i) < d.body(i)
            && d.high[i - 1] < d.low[i - 2]
    })
}

/// Morning Star ("Strong - Reversal - Bullish Pattern - Up")
pub fn morning_star(d: &Ohlc) -> Vec<bool> {
    detect(d.len(), 2, |i| {
        d.body_top(i - 1) < d.close[i - 2]
            && d.close[i - 2] < d.open[i - 2]
            && d.close[i] > d.open[i]
            && d.open[i] > d.body_top(i - 1)
    })
}

/// Evening Star ("Strong - Reversal - Bearish Pattern - Down")
pub fn evening_star(d: &Ohlc) -> Vec<bool> {
    detect(d.len(), 2, |i| {
        d.body_bottom(i - 1) > d.close[i - 2]
            && d.close[i - 2] > d.open[i - 2]
            && d.close[i] < d.open[i]
            && d.open[i] < d.body_bottom(i - 1)
    })
}

/// Abandoned Baby ("Reliable - Reversal - Bullish Pattern - Up")
pub fn abandoned_baby(d: &Ohlc) -> Vec<bool> {
    detect(d.len(), 2, |i| {
        d.open[i] < d.close[i]
            && d.high[i - 1] < d.low[i]
            && d.open[i - 2] > d.close[i - 2]
            && d.high[i - 1] < d.low[i - 2]
    })
}

/// Morning Doji Star ("Reliable - Reversal - Bullish Pattern - Up")
pub fn morning_doji_star(d: &Ohlc) -> Vec<bool> {
    detect(d.len(), 2, |i| {
        d.range(i) > 0.0
            && d.range(i - 1) > 0.0
            && d.range(i - 2) > 0.0
            && d.close[i - 2] < d.open[i - 2]
            && d.body(i - 2) / d.range(i - 2) >= 0.7
            && d.body(i - 1) / d.range(i - 1) < 0.1
            && d.close[i] > d.open[i]
            && d.body(i) / d.range(i) >= 0.7
            && d.close[i - 2] > d.close[i - 1]
            && d.close[i - 2] > d.open[i - 1]
            && d.close[i - 1] < d.open[i]
            && d.open[i - 1] < d.open[i]
            && d.close[i] > d.close[i - 2]
            && d.high[i - 1] - d.body_top(i - 1) > 3.0 * d.body(i - 1)
            && d.body_bottom(i - 1) - d.low[i - 1] > 3.0 * d.body(i - 1)
    })
}

/// Evening Doji Star ("Reliable - Reversal - Bearish Pattern - Down")
pub fn evening_doji_star(d: &Ohlc) -> Vec<bool> {
    detect(d.len(), 2, |i| {
        d.range(i) > 0.0
            && d.range(i - 1) > 0.0
            && d.range(i - 2) > 0.0
            && d.close[i - 2] > d.open[i - 2]
            && d.body(i - 2) / d.range(i - 2) >= 0.7
            && d.body(i - 1) / d.range(i - 1) < 0.1
            && d.close[i] < d.open[i]
            && d.body(i) / d.range(i) >= 0.7
            && d.close[i - 2] < d.close[i - 1]
            && d.close[i - 2] < d.open[i - 1]
            && d.close[i - 1] > d.open[i]
            && d.open[i - 1] > d.open[i]
            && d.close[i] < d.close[i - 2]
            && d.high[i - 1] - d.body_top(i - 1) > 3.0 * d.body(i - 1)
            && d.body_bottom(i - 1) - d.low[i - 1] > 3.0 * d.body(i - 1)
    })
}

/// Astral Buy (Fibonacci 3, 5, 8): eight consecutive rows where close is
/// below the close three back and low below the low five back.
pub fn astral_buy(d: &Ohlc) -> Vec<bool> {
    detect(d.len(), 12, |i| {
        (0..8).all(|k| {
            d.close[i - k] < d.close[i - k - 3] && d.low[i - k] < d.low[i - k - 5]
        })
    })
}

/// Astral Sell (Fibonacci 3, 5, 8): the bearish mirror of astral buy.
pub fn astral_sell(d: &Ohlc) -> Vec<bool> {
    detect(d.len(), 12, |i| {
        (0..8).all(|k| {
            d.close[i - k] > d.close[i - k - 3] && d.high[i - k] > d.high[i - k - 5]
        })
    })
}
