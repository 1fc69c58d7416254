//! Offline exchange for tests and network-free simulations.
//!
//! Serves a deterministic-seeded random walk as candle history and fills
//! market orders instantly against an in-memory ledger at the walk's
//! latest price.

use super::Exchange;
use crate::config::ExchangeKind;
use crate::domain::candle::{Candle, CandleSeries};
use crate::domain::errors::MarketDataError;
use crate::domain::granularity::Granularity;
use crate::domain::order::{Order, OrderSide, OrderStatus, OrderType};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use std::sync::Mutex;

struct Ledger {
    quote: Decimal,
    base: Decimal,
    orders: Vec<Order>,
    last_price: Decimal,
}

pub struct DummyExchange {
    ledger: Mutex<Ledger>,
    seed: u64,
}

impl DummyExchange {
    pub fn new() -> Self {
        Self::with_seed(42)
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            ledger: Mutex::new(Ledger {
                quote: Decimal::from(1000),
                base: Decimal::ZERO,
                orders: Vec::new(),
                last_price: Decimal::from(100),
            }),
            seed,
        }
    }

    fn walk(&self, n: usize) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut price = 100.0;
        (0..n)
            .map(|_| {
                price *= 1.0 + rng.random_range(-0.01..0.0101);
                price
            })
            .collect()
    }
}

impl Default for DummyExchange {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Exchange for DummyExchange {
    fn kind(&self) -> ExchangeKind {
        ExchangeKind::Dummy
    }

    async fn get_historical_data(
        &self,
        market: &str,
        granularity: Granularity,
        _start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<CandleSeries, MarketDataError> {
        let n = 300;
        let closes = self.walk(n);
        let end = end.unwrap_or_else(Utc::now);
        let step = Duration::seconds(granularity.to_seconds());

        let candles: Vec<Candle> = closes
            .iter()
            .enumerate()
            .map(|(i, close)| {
                let close = Decimal::from_f64(*close).unwrap_or(Decimal::from(100));
                Candle {
                    ts: end - step * ((n - 1 - i) as i32),
                    market: market.to_string(),
                    granularity,
                    open: close,
                    high: close * Decimal::new(101, 2),
                    low: close * Decimal::new(99, 2),
                    close,
                    volume: Decimal::from(100),
                }
            })
            .collect();

        let mut ledger = self.ledger.lock().expect("ledger lock");
        if let Some(last) = candles.last() {
            ledger.last_price = last.close;
        }
        Ok(CandleSeries::from_candles(candles))
    }

    async fn get_ticker(
        &self,
        _market: &str,
    ) -> Result<(DateTime<Utc>, Decimal), MarketDataError> {
        let ledger = self.ledger.lock().expect("ledger lock");
        Ok((Utc::now(), ledger.last_price))
    }

    async fn get_time(&self) -> Option<DateTime<Utc>> {
        Some(Utc::now())
    }

    async fn get_balance(&self, currency: &str) -> Result<Decimal, MarketDataError> {
        let ledger = self.ledger.lock().expect("ledger lock");
        // the dummy ledger has exactly one market: quote is any fiat-like
        // symbol, everything else is base
        if ["USD", "USDT", "EUR", "GBP", "USDC", "BUSD"].contains(&currency) {
            Ok(ledger.quote)
        } else {
            Ok(ledger.base)
        }
    }

    async fn get_orders(
        &self,
        market: &str,
        action: Option<OrderSide>,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>, MarketDataError> {
        let ledger = self.ledger.lock().expect("ledger lock");
        let mut orders: Vec<Order> = ledger
            .orders
            .iter()
            .filter(|o| o.market == market)
            .cloned()
            .collect();
        if let Some(side) = action {
            orders.retain(|o| o.action == side);
        }
        if let Some(wanted) = status {
            orders.retain(|o| o.status == wanted);
        }
        Ok(orders)
    }

    async fn get_taker_fee(&self, _market: &str) -> Decimal {
        ExchangeKind::Dummy.default_taker_fee()
    }

    async fn get_maker_fee(&self, _market: &str) -> Decimal {
        ExchangeKind::Dummy.default_taker_fee()
    }

    async fn market_buy(
        &self,
        market: &str,
        quote_quantity: Decimal,
    ) -> Result<Order, MarketDataError> {
        let mut ledger = self.ledger.lock().expect("ledger lock");
        if quote_quantity > ledger.quote {
            return Err(MarketDataError::Api {
                status: 400,
                body: "insufficient quote balance".to_string(),
            });
        }

        let fee = quote_quantity * ExchangeKind::Dummy.default_taker_fee();
        let filled = (quote_quantity - fee) / ledger.last_price;
        ledger.quote -= quote_quantity;
        ledger.base += filled;

        let order = Order {
            created_at: Utc::now(),
            market: market.to_string(),
            action: OrderSide::Buy,
            order_type: OrderType::Market,
            size: quote_quantity,
            filled,
            fees: fee,
            price: ledger.last_price,
            status: OrderStatus::Done,
        };
        ledger.orders.push(order.clone());
        Ok(order)
    }

    async fn market_sell(
        &self,
        market: &str,
        base_quantity: Decimal,
    ) -> Result<Order, MarketDataError> {
        let mut ledger = self.ledger.lock().expect("ledger lock");
        if base_quantity > ledger.base {
            return Err(MarketDataError::Api {
                status: 400,
                body: "insufficient base balance".to_string(),
            });
        }

        let gross = base_quantity * ledger.last_price;
        let fee = gross * ExchangeKind::Dummy.default_taker_fee();
        ledger.base -= base_quantity;
        ledger.quote += gross - fee;

        let order = Order {
            created_at: Utc::now(),
            market: market.to_string(),
            action: OrderSide::Sell,
            order_type: OrderType::Market,
            size: base_quantity,
            filled: gross - fee,
            fees: fee,
            price: ledger.last_price,
            status: OrderStatus::Done,
        };
        ledger.orders.push(order.clone());
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_history_is_deterministic_for_a_seed() {
        let a = DummyExchange::with_seed(7);
        let b = DummyExchange::with_seed(7);

        let series_a = a
            .get_historical_data("BTC-USD", Granularity::OneHour, None, None)
            .await
            .unwrap();
        let series_b = b
            .get_historical_data("BTC-USD", Granularity::OneHour, None, None)
            .await
            .unwrap();

        assert_eq!(series_a.len(), 300);
        assert_eq!(
            series_a.last().unwrap().close,
            series_b.last().unwrap().close
        );
    }

    #[tokio::test]
    async fn test_buy_then_sell_round_trip() {
        let exchange = DummyExchange::new();
        exchange
            .get_historical_data("BTC-USD", Granularity::OneHour, None, None)
            .await
            .unwrap();

        let buy = exchange.market_buy("BTC-USD", dec!(500)).await.unwrap();
        assert_eq!(buy.status, OrderStatus::Done);
        assert!(buy.filled > Decimal::ZERO);

        let base = exchange.get_balance("BTC").await.unwrap();
        assert_eq!(base, buy.filled);

        let sell = exchange.market_sell("BTC-USD", base).await.unwrap();
        assert_eq!(sell.status, OrderStatus::Done);

        let quote = exchange.get_balance("USD").await.unwrap();
        assert!(
            quote < dec!(1000),
            "Fees shave the round trip below the initial balance"
        );
        assert!(quote > dec!(990));
    }

    #[tokio::test]
    async fn test_rejects_overdraw() {
        let exchange = DummyExchange::new();
        let result = exchange.market_buy("BTC-USD", dec!(2000)).await;
        assert!(result.is_err());
    }
}
