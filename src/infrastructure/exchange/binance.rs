//! Binance REST adapter.
//!
//! Public market data comes from the unsigned kline and ticker endpoints;
//! account and order endpoints use HMAC-SHA256 signed query strings with
//! the `X-MBX-APIKEY` header.

use super::{Exchange, check_status, transient};
use crate::config::ExchangeKind;
use crate::domain::candle::{Candle, CandleSeries};
use crate::domain::errors::MarketDataError;
use crate::domain::granularity::Granularity;
use crate::domain::order::{Order, OrderSide, OrderStatus, OrderType};
use crate::infrastructure::http::{HttpClientFactory, build_url_with_query};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest_middleware::ClientWithMiddleware;
use rust_decimal::Decimal;
use serde::Deserialize;
use sha2::Sha256;
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

pub struct BinanceExchange {
    client: ClientWithMiddleware,
    base_url: String,
    api_key: String,
    api_secret: String,
    recv_window: u64,
}

impl BinanceExchange {
    pub fn new(base_url: String, api_key: String, api_secret: String, recv_window: u64) -> Self {
        Self {
            client: HttpClientFactory::create_client(),
            base_url,
            api_key,
            api_secret,
            recv_window,
        }
    }

    fn sign(&self, query: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(self.api_secret.as_bytes())
            .expect("HMAC accepts any key length");
        mac.update(query.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    fn signed_url(&self, path: &str, params: &[(&str, String)]) -> String {
        let mut all: Vec<(String, String)> = params
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        all.push(("recvWindow".to_string(), self.recv_window.to_string()));
        all.push((
            "timestamp".to_string(),
            Utc::now().timestamp_millis().to_string(),
        ));

        let query: String = all
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");
        let signature = self.sign(&query);
        format!("{}{}?{}&signature={}", self.base_url, path, query, signature)
    }
}

#[async_trait]
impl Exchange for BinanceExchange {
    fn kind(&self) -> ExchangeKind {
        ExchangeKind::Binance
    }

    async fn get_historical_data(
        &self,
        market: &str,
        granularity: Granularity,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<CandleSeries, MarketDataError> {
        let url = format!("{}/api/v3/klines", self.base_url);
        let mut params: Vec<(&str, String)> = vec![
            ("symbol", market.to_string()),
            ("interval", granularity.to_binance().to_string()),
            ("limit", "300".to_string()),
        ];
        if let Some(start) = start {
            params.push(("startTime", start.timestamp_millis().to_string()));
        }
        if let Some(end) = end {
            params.push(("endTime", end.timestamp_millis().to_string()));
        }

        let url = build_url_with_query(&url, &params);
        let response = self.client.get(&url).send().await.map_err(transient)?;
        let response = check_status(response).await?;

        // kline format: [ open_time, open, high, low, close, volume, ... ]
        let klines: Vec<serde_json::Value> = response.json().await.map_err(transient)?;

        let candles: Vec<Candle> = klines
            .iter()
            .filter_map(|k| {
                let arr = k.as_array()?;
                if arr.len() < 6 {
                    return None;
                }
                let ts = DateTime::from_timestamp_millis(arr[0].as_i64()?)?;
                Some(Candle {
                    ts,
                    market: market.to_string(),
                    granularity,
                    open: arr[1].as_str()?.parse().ok()?,
                    high: arr[2].as_str()?.parse().ok()?,
                    low: arr[3].as_str()?.parse().ok()?,
                    close: arr[4].as_str()?.parse().ok()?,
                    volume: arr[5].as_str()?.parse().ok()?,
                })
            })
            .collect();

        debug!("BinanceExchange: fetched {} candles for {}", candles.len(), market);
        Ok(CandleSeries::from_candles(candles))
    }

    async fn get_ticker(
        &self,
        market: &str,
    ) -> Result<(DateTime<Utc>, Decimal), MarketDataError> {
        #[derive(Deserialize)]
        struct PriceTicker {
            price: String,
        }

        let url = build_url_with_query(
            &format!("{}/api/v3/ticker/price", self.base_url),
            &[("symbol", market)],
        );
        let response = self.client.get(&url).send().await.map_err(transient)?;
        let response = check_status(response).await?;
        let ticker: PriceTicker = response.json().await.map_err(transient)?;

        let price = Decimal::from_str_exact(&ticker.price)
            .map_err(|e| MarketDataError::Transient(format!("bad ticker price: {}", e)))?;
        Ok((Utc::now(), price))
    }

    async fn get_time(&self) -> Option<DateTime<Utc>> {
        #[derive(Deserialize)]
        struct ServerTime {
            #[serde(rename = "serverTime")]
            server_time: i64,
        }

        let url = format!("{}/api/v3/time", self.base_url);
        let response = self.client.get(&url).send().await.ok()?;
        let time: ServerTime = response.json().await.ok()?;
        DateTime::from_timestamp_millis(time.server_time)
    }

    async fn get_balance(&self, currency: &str) -> Result<Decimal, MarketDataError> {
        #[derive(Deserialize)]
        struct Balance {
            asset: String,
            free: String,
        }
        #[derive(Deserialize)]
        struct Account {
            balances: Vec<Balance>,
        }

        let url = self.signed_url("/api/v3/account", &[]);
        let response = self
            .client
            .get(&url)
            .header("X-MBX-APIKEY", &self.api_key)
            .send()
            .await
            .map_err(transient)?;
        let response = check_status(response).await?;
        let account: Account = response.json().await.map_err(transient)?;

        Ok(account
            .balances
            .iter()
            .find(|b| b.asset == currency)
            .and_then(|b| Decimal::from_str_exact(&b.free).ok())
            .unwrap_or(Decimal::ZERO))
    }

    async fn get_orders(
        &self,
        market: &str,
        action: Option<OrderSide>,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>, MarketDataError> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct BinanceOrder {
            time: i64,
            side: String,
            #[serde(rename = "type")]
            order_type: String,
            orig_qty: String,
            executed_qty: String,
            cummulative_quote_qty: String,
            status: String,
        }

        let url = self.signed_url("/api/v3/allOrders", &[("symbol", market.to_string())]);
        let response = self
            .client
            .get(&url)
            .header("X-MBX-APIKEY", &self.api_key)
            .send()
            .await
            .map_err(transient)?;
        let response = check_status(response).await?;
        let raw: Vec<BinanceOrder> = response.json().await.map_err(transient)?;

        let mut orders: Vec<Order> = raw
            .iter()
            .filter_map(|o| {
                let side = match o.side.as_str() {
                    "BUY" => OrderSide::Buy,
                    "SELL" => OrderSide::Sell,
                    _ => return None,
                };
                let executed = Decimal::from_str_exact(&o.executed_qty).ok()?;
                let quote = Decimal::from_str_exact(&o.cummulative_quote_qty).ok()?;
                let price = if executed.is_zero() { Decimal::ZERO } else { quote / executed };
                Some(Order {
                    created_at: DateTime::from_timestamp_millis(o.time)?,
                    market: market.to_string(),
                    action: side,
                    order_type: if o.order_type == "LIMIT" {
                        OrderType::Limit
                    } else {
                        OrderType::Market
                    },
                    size: match side {
                        OrderSide::Buy => quote,
                        OrderSide::Sell => Decimal::from_str_exact(&o.orig_qty).ok()?,
                    },
                    filled: executed,
                    fees: Decimal::ZERO,
                    price,
                    status: OrderStatus::from_exchange(&o.status),
                })
            })
            .collect();

        if let Some(side) = action {
            orders.retain(|o| o.action == side);
        }
        if let Some(wanted) = status {
            orders.retain(|o| o.status == wanted);
        }
        orders.sort_by_key(|o| o.created_at);
        Ok(orders)
    }

    async fn get_taker_fee(&self, market: &str) -> Decimal {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct TradeFee {
            taker_commission: String,
        }

        let url = self.signed_url("/sapi/v1/asset/tradeFee", &[("symbol", market.to_string())]);
        let fallback = ExchangeKind::Binance.default_taker_fee();
        let Ok(response) = self
            .client
            .get(&url)
            .header("X-MBX-APIKEY", &self.api_key)
            .send()
            .await
        else {
            return fallback;
        };
        let Ok(fees) = response.json::<Vec<TradeFee>>().await else {
            return fallback;
        };
        fees.first()
            .and_then(|f| Decimal::from_str_exact(&f.taker_commission).ok())
            .unwrap_or(fallback)
    }

    async fn get_maker_fee(&self, market: &str) -> Decimal {
        // same tier endpoint; fall back to the taker default
        self.get_taker_fee(market).await
    }

    async fn market_buy(
        &self,
        market: &str,
        quote_quantity: Decimal,
    ) -> Result<Order, MarketDataError> {
        self.place_market_order(market, OrderSide::Buy, quote_quantity).await
    }

    async fn market_sell(
        &self,
        market: &str,
        base_quantity: Decimal,
    ) -> Result<Order, MarketDataError> {
        self.place_market_order(market, OrderSide::Sell, base_quantity).await
    }
}

impl BinanceExchange {
    async fn place_market_order(
        &self,
        market: &str,
        side: OrderSide,
        quantity: Decimal,
    ) -> Result<Order, MarketDataError> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct OrderResponse {
            executed_qty: String,
            cummulative_quote_qty: String,
            status: String,
        }

        let qty_param = match side {
            OrderSide::Buy => ("quoteOrderQty", quantity.round_dp(8).to_string()),
            OrderSide::Sell => ("quantity", quantity.round_dp(8).to_string()),
        };
        let url = self.signed_url(
            "/api/v3/order",
            &[
                ("symbol", market.to_string()),
                ("side", if side == OrderSide::Buy { "BUY" } else { "SELL" }.to_string()),
                ("type", "MARKET".to_string()),
                qty_param,
            ],
        );

        let response = self
            .client
            .post(&url)
            .header("X-MBX-APIKEY", &self.api_key)
            .send()
            .await
            .map_err(transient)?;
        let response = check_status(response).await?;
        let placed: OrderResponse = response.json().await.map_err(transient)?;

        let executed = Decimal::from_str_exact(&placed.executed_qty).unwrap_or(Decimal::ZERO);
        let quote = Decimal::from_str_exact(&placed.cummulative_quote_qty).unwrap_or(Decimal::ZERO);
        let price = if executed.is_zero() { Decimal::ZERO } else { quote / executed };

        Ok(Order {
            created_at: Utc::now(),
            market: market.to_string(),
            action: side,
            order_type: OrderType::Market,
            size: quantity,
            filled: executed,
            fees: Decimal::ZERO,
            price,
            status: OrderStatus::from_exchange(&placed.status),
        })
    }
}
