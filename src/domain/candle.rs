use crate::domain::errors::MarketDataError;
use crate::domain::granularity::Granularity;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// One OHLCV candle for a (market, granularity) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub ts: DateTime<Utc>,
    pub market: String,
    pub granularity: Granularity,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

/// Time-indexed, append-only candle table.
///
/// Candles are kept in ascending timestamp order with no duplicates.
/// Successive timestamps differ by exactly one granularity except across
/// gaps the exchange itself declines to fill.
#[derive(Debug, Clone, Default)]
pub struct CandleSeries {
    candles: Vec<Candle>,
}

impl CandleSeries {
    pub fn new() -> Self {
        Self { candles: Vec::new() }
    }

    pub fn from_candles(mut candles: Vec<Candle>) -> Self {
        candles.sort_by_key(|c| c.ts);
        candles.dedup_by_key(|c| c.ts);
        Self { candles }
    }

    /// Appends a candle, enforcing ascending order and uniqueness.
    pub fn push(&mut self, candle: Candle) -> Result<(), MarketDataError> {
        if let Some(last) = self.candles.last()
            && candle.ts <= last.ts
        {
            return Err(MarketDataError::OutOfOrderCandle {
                market: candle.market.clone(),
                ts: candle.ts.to_rfc3339(),
            });
        }
        self.candles.push(candle);
        Ok(())
    }

    /// Merges an older page of candles in front of this series, dropping
    /// duplicates. Used by the simulator's chained back-pagination.
    pub fn merge_front(&mut self, older: CandleSeries) {
        let mut merged = older.candles;
        merged.extend(self.candles.drain(..));
        merged.sort_by_key(|c| c.ts);
        merged.dedup_by_key(|c| c.ts);
        self.candles = merged;
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Candle> {
        self.candles.get(index)
    }

    pub fn first(&self) -> Option<&Candle> {
        self.candles.first()
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Candle> {
        self.candles.iter()
    }

    /// Prefix of the series ending at `index` inclusive.
    pub fn prefix(&self, index: usize) -> CandleSeries {
        let end = (index + 1).min(self.candles.len());
        CandleSeries {
            candles: self.candles[..end].to_vec(),
        }
    }

    pub fn closes(&self) -> Vec<f64> {
        self.candles
            .iter()
            .map(|c| c.close.to_f64().unwrap_or(0.0))
            .collect()
    }

    pub fn opens(&self) -> Vec<f64> {
        self.candles
            .iter()
            .map(|c| c.open.to_f64().unwrap_or(0.0))
            .collect()
    }

    pub fn highs(&self) -> Vec<f64> {
        self.candles
            .iter()
            .map(|c| c.high.to_f64().unwrap_or(0.0))
            .collect()
    }

    pub fn lows(&self) -> Vec<f64> {
        self.candles
            .iter()
            .map(|c| c.low.to_f64().unwrap_or(0.0))
            .collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.candles
            .iter()
            .map(|c| c.volume.to_f64().unwrap_or(0.0))
            .collect()
    }

    pub fn close_max(&self) -> Decimal {
        self.candles
            .iter()
            .map(|c| c.close)
            .max()
            .unwrap_or(Decimal::ZERO)
    }

    pub fn close_min(&self) -> Decimal {
        self.candles
            .iter()
            .map(|c| c.close)
            .min()
            .unwrap_or(Decimal::ZERO)
    }
}
