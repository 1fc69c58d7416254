//! Exchange adapters.
//!
//! The core consumes exchanges only through the [`Exchange`] trait; all
//! exchange-identity branching (symbology, endpoints, signing, status
//! vocabularies) lives behind it.

mod binance;
mod coinbase;
mod dummy;
mod kucoin;

pub use binance::BinanceExchange;
pub use coinbase::CoinbaseProExchange;
pub use dummy::DummyExchange;
pub use kucoin::KucoinExchange;

use crate::config::{Config, ExchangeKind};
use crate::domain::candle::CandleSeries;
use crate::domain::errors::MarketDataError;
use crate::domain::granularity::Granularity;
use crate::domain::order::{Order, OrderSide, OrderStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;

/// Uniform read/write access to one exchange.
#[async_trait]
pub trait Exchange: Send + Sync {
    fn kind(&self) -> ExchangeKind;

    /// Fetches OHLCV candles, optionally bounded to a window. Without a
    /// window the exchange returns its most recent page.
    async fn get_historical_data(
        &self,
        market: &str,
        granularity: Granularity,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<CandleSeries, MarketDataError>;

    /// Latest traded price with the exchange's timestamp.
    async fn get_ticker(&self, market: &str)
    -> Result<(DateTime<Utc>, Decimal), MarketDataError>;

    /// Exchange server time; `None` signals a connectivity failure.
    async fn get_time(&self) -> Option<DateTime<Utc>>;

    async fn get_balance(&self, currency: &str) -> Result<Decimal, MarketDataError>;

    async fn get_orders(
        &self,
        market: &str,
        action: Option<OrderSide>,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>, MarketDataError>;

    async fn get_taker_fee(&self, market: &str) -> Decimal;

    async fn get_maker_fee(&self, market: &str) -> Decimal;

    /// Places a market buy for `quote_quantity` of the quote currency.
    async fn market_buy(
        &self,
        market: &str,
        quote_quantity: Decimal,
    ) -> Result<Order, MarketDataError>;

    /// Places a market sell of `base_quantity` of the base currency.
    async fn market_sell(
        &self,
        market: &str,
        base_quantity: Decimal,
    ) -> Result<Order, MarketDataError>;
}

/// Builds the adapter the configuration names.
pub fn build_exchange(config: &Config) -> Arc<dyn Exchange> {
    match config.exchange {
        ExchangeKind::CoinbasePro => Arc::new(CoinbaseProExchange::new(
            config.api_url.clone(),
            config.api_key.clone(),
            config.api_secret.clone(),
            config.api_passphrase.clone(),
        )),
        ExchangeKind::Binance => Arc::new(BinanceExchange::new(
            config.api_url.clone(),
            config.api_key.clone(),
            config.api_secret.clone(),
            config.recv_window,
        )),
        ExchangeKind::Kucoin => Arc::new(KucoinExchange::new(
            config.api_url.clone(),
            config.api_key.clone(),
            config.api_secret.clone(),
            config.api_passphrase.clone(),
        )),
        ExchangeKind::Dummy => Arc::new(DummyExchange::new()),
    }
}

pub(crate) fn transient(err: impl std::fmt::Display) -> MarketDataError {
    MarketDataError::Transient(err.to_string())
}

pub(crate) async fn check_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, MarketDataError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let code = status.as_u16();
    let body = response.text().await.unwrap_or_default();
    if code == 401 || code == 403 {
        Err(MarketDataError::Auth(body))
    } else {
        Err(MarketDataError::Api { status: code, body })
    }
}
