//! Coinbase Pro REST adapter.
//!
//! Signed requests carry CB-ACCESS-KEY / CB-ACCESS-SIGN /
//! CB-ACCESS-TIMESTAMP / CB-ACCESS-PASSPHRASE headers; the signature is
//! the base64 HMAC-SHA256 of `timestamp + method + path + body` keyed
//! with the base64-decoded API secret.

use super::{Exchange, check_status, transient};
use crate::config::ExchangeKind;
use crate::domain::candle::{Candle, CandleSeries};
use crate::domain::errors::MarketDataError;
use crate::domain::granularity::Granularity;
use crate::domain::order::{Order, OrderSide, OrderStatus, OrderType};
use crate::infrastructure::http::{HttpClientFactory, build_url_with_query};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, SecondsFormat, Utc};
use hmac::{Hmac, Mac};
use reqwest_middleware::ClientWithMiddleware;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::Deserialize;
use sha2::Sha256;
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

pub struct CoinbaseProExchange {
    client: ClientWithMiddleware,
    base_url: String,
    api_key: String,
    api_secret: String,
    api_passphrase: String,
}

impl CoinbaseProExchange {
    pub fn new(
        base_url: String,
        api_key: String,
        api_secret: String,
        api_passphrase: String,
    ) -> Self {
        Self {
            client: HttpClientFactory::create_client(),
            base_url,
            api_key,
            api_secret,
            api_passphrase,
        }
    }

    fn signed_headers(
        &self,
        method: &str,
        path: &str,
        body: &str,
    ) -> Result<Vec<(&'static str, String)>, MarketDataError> {
        let timestamp = Utc::now().timestamp().to_string();
        let prehash = format!("{}{}{}{}", timestamp, method, path, body);

        let key = BASE64
            .decode(&self.api_secret)
            .map_err(|_| MarketDataError::Auth("API secret is not valid base64".to_string()))?;
        let mut mac =
            HmacSha256::new_from_slice(&key).expect("HMAC accepts any key length");
        mac.update(prehash.as_bytes());
        let signature = BASE64.encode(mac.finalize().into_bytes());

        Ok(vec![
            ("CB-ACCESS-KEY", self.api_key.clone()),
            ("CB-ACCESS-SIGN", signature),
            ("CB-ACCESS-TIMESTAMP", timestamp),
            ("CB-ACCESS-PASSPHRASE", self.api_passphrase.clone()),
        ])
    }

    async fn signed_get(&self, path: &str) -> Result<reqwest::Response, MarketDataError> {
        let headers = self.signed_headers("GET", path, "")?;
        let mut request = self.client.get(format!("{}{}", self.base_url, path));
        for (name, value) in headers {
            request = request.header(name, value);
        }
        let response = request.send().await.map_err(transient)?;
        check_status(response).await
    }

    async fn signed_post(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<reqwest::Response, MarketDataError> {
        let body_text = body.to_string();
        let headers = self.signed_headers("POST", path, &body_text)?;
        let mut request = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .header("Content-Type", "application/json");
        for (name, value) in headers {
            request = request.header(name, value);
        }
        let response = request.body(body_text).send().await.map_err(transient)?;
        check_status(response).await
    }
}

#[async_trait]
impl Exchange for CoinbaseProExchange {
    fn kind(&self) -> ExchangeKind {
        ExchangeKind::CoinbasePro
    }

    async fn get_historical_data(
        &self,
        market: &str,
        granularity: Granularity,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<CandleSeries, MarketDataError> {
        let granularity_param = granularity.to_coinbase().to_string();
        let mut params: Vec<(&str, String)> = vec![("granularity", granularity_param)];
        if let Some(start) = start {
            params.push(("start", start.to_rfc3339_opts(SecondsFormat::Secs, true)));
        }
        if let Some(end) = end {
            params.push(("end", end.to_rfc3339_opts(SecondsFormat::Secs, true)));
        }

        let url = build_url_with_query(
            &format!("{}/products/{}/candles", self.base_url, market),
            &params,
        );
        let response = self.client.get(&url).send().await.map_err(transient)?;
        let response = check_status(response).await?;

        // candle format, newest first: [ time, low, high, open, close, volume ]
        let rows: Vec<Vec<f64>> = response.json().await.map_err(transient)?;

        let candles: Vec<Candle> = rows
            .iter()
            .filter_map(|row| {
                if row.len() < 6 {
                    return None;
                }
                Some(Candle {
                    ts: DateTime::from_timestamp(row[0] as i64, 0)?,
                    market: market.to_string(),
                    granularity,
                    low: Decimal::from_f64(row[1])?,
                    high: Decimal::from_f64(row[2])?,
                    open: Decimal::from_f64(row[3])?,
                    close: Decimal::from_f64(row[4])?,
                    volume: Decimal::from_f64(row[5])?,
                })
            })
            .collect();

        debug!(
            "CoinbaseProExchange: fetched {} candles for {}",
            candles.len(),
            market
        );
        Ok(CandleSeries::from_candles(candles))
    }

    async fn get_ticker(
        &self,
        market: &str,
    ) -> Result<(DateTime<Utc>, Decimal), MarketDataError> {
        #[derive(Deserialize)]
        struct Ticker {
            price: String,
            time: String,
        }

        let url = format!("{}/products/{}/ticker", self.base_url, market);
        let response = self.client.get(&url).send().await.map_err(transient)?;
        let response = check_status(response).await?;
        let ticker: Ticker = response.json().await.map_err(transient)?;

        let time = DateTime::parse_from_rfc3339(&ticker.time)
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());
        let price = Decimal::from_str_exact(&ticker.price)
            .map_err(|e| MarketDataError::Transient(format!("bad ticker price: {}", e)))?;
        Ok((time, price))
    }

    async fn get_time(&self) -> Option<DateTime<Utc>> {
        #[derive(Deserialize)]
        struct ServerTime {
            iso: String,
        }

        let url = format!("{}/time", self.base_url);
        let response = self.client.get(&url).send().await.ok()?;
        let time: ServerTime = response.json().await.ok()?;
        DateTime::parse_from_rfc3339(&time.iso)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }

    async fn get_balance(&self, currency: &str) -> Result<Decimal, MarketDataError> {
        #[derive(Deserialize)]
        struct Account {
            currency: String,
            available: String,
        }

        let response = self.signed_get("/accounts").await?;
        let accounts: Vec<Account> = response.json().await.map_err(transient)?;

        Ok(accounts
            .iter()
            .find(|a| a.currency == currency)
            .and_then(|a| Decimal::from_str_exact(&a.available).ok())
            .unwrap_or(Decimal::ZERO))
    }

    async fn get_orders(
        &self,
        market: &str,
        action: Option<OrderSide>,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>, MarketDataError> {
        #[derive(Deserialize)]
        struct CbOrder {
            created_at: String,
            product_id: String,
            side: String,
            #[serde(rename = "type")]
            order_type: String,
            #[serde(default)]
            size: Option<String>,
            #[serde(default)]
            funds: Option<String>,
            #[serde(default)]
            filled_size: Option<String>,
            #[serde(default)]
            fill_fees: Option<String>,
            #[serde(default)]
            executed_value: Option<String>,
            status: String,
        }

        let path = format!("/orders?status=done&product_id={}", market);
        let response = self.signed_get(&path).await?;
        let raw: Vec<CbOrder> = response.json().await.map_err(transient)?;

        let parse = |s: &Option<String>| {
            s.as_deref()
                .and_then(|v| Decimal::from_str_exact(v).ok())
                .unwrap_or(Decimal::ZERO)
        };

        let mut orders: Vec<Order> = raw
            .iter()
            .filter_map(|o| {
                let side = match o.side.as_str() {
                    "buy" => OrderSide::Buy,
                    "sell" => OrderSide::Sell,
                    _ => return None,
                };
                let filled = parse(&o.filled_size);
                let executed_value = parse(&o.executed_value);
                let price = if filled.is_zero() {
                    Decimal::ZERO
                } else {
                    executed_value / filled
                };
                Some(Order {
                    created_at: DateTime::parse_from_rfc3339(&o.created_at)
                        .ok()?
                        .with_timezone(&Utc),
                    market: o.product_id.clone(),
                    action: side,
                    order_type: if o.order_type == "limit" {
                        OrderType::Limit
                    } else {
                        OrderType::Market
                    },
                    size: match side {
                        OrderSide::Buy => parse(&o.funds),
                        OrderSide::Sell => parse(&o.size),
                    },
                    filled,
                    fees: parse(&o.fill_fees),
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

    async fn get_taker_fee(&self, _market: &str) -> Decimal {
        #[derive(Deserialize)]
        struct Fees {
            taker_fee_rate: String,
        }

        let fallback = ExchangeKind::CoinbasePro.default_taker_fee();
        let Ok(response) = self.signed_get("/fees").await else {
            return fallback;
        };
        response
            .json::<Fees>()
            .await
            .ok()
            .and_then(|f| Decimal::from_str_exact(&f.taker_fee_rate).ok())
            .unwrap_or(fallback)
    }

    async fn get_maker_fee(&self, _market: &str) -> Decimal {
        #[derive(Deserialize)]
        struct Fees {
            maker_fee_rate: String,
        }

        let fallback = ExchangeKind::CoinbasePro.default_taker_fee();
        let Ok(response) = self.signed_get("/fees").await else {
            return fallback;
        };
        response
            .json::<Fees>()
            .await
            .ok()
            .and_then(|f| Decimal::from_str_exact(&f.maker_fee_rate).ok())
            .unwrap_or(fallback)
    }

    async fn market_buy(
        &self,
        market: &str,
        quote_quantity: Decimal,
    ) -> Result<Order, MarketDataError> {
        let body = serde_json::json!({
            "type": "market",
            "side": "buy",
            "product_id": market,
            "funds": quote_quantity.round_dp(2).to_string(),
        });
        let response = self.signed_post("/orders", body).await?;
        self.order_from_response(market, OrderSide::Buy, quote_quantity, response)
            .await
    }

    async fn market_sell(
        &self,
        market: &str,
        base_quantity: Decimal,
    ) -> Result<Order, MarketDataError> {
        let body = serde_json::json!({
            "type": "market",
            "side": "sell",
            "product_id": market,
            "size": base_quantity.round_dp(8).to_string(),
        });
        let response = self.signed_post("/orders", body).await?;
        self.order_from_response(market, OrderSide::Sell, base_quantity, response)
            .await
    }
}

impl CoinbaseProExchange {
    async fn order_from_response(
        &self,
        market: &str,
        side: OrderSide,
        size: Decimal,
        response: reqwest::Response,
    ) -> Result<Order, MarketDataError> {
        #[derive(Deserialize)]
        struct Placed {
            #[serde(default)]
            filled_size: Option<String>,
            #[serde(default)]
            fill_fees: Option<String>,
            #[serde(default)]
            executed_value: Option<String>,
            status: String,
        }

        let placed: Placed = response.json().await.map_err(transient)?;
        let parse = |s: &Option<String>| {
            s.as_deref()
                .and_then(|v| Decimal::from_str_exact(v).ok())
                .unwrap_or(Decimal::ZERO)
        };

        let filled = parse(&placed.filled_size);
        let executed_value = parse(&placed.executed_value);
        Ok(Order {
            created_at: Utc::now(),
            market: market.to_string(),
            action: side,
            order_type: OrderType::Market,
            size,
            filled,
            fees: parse(&placed.fill_fees),
            price: if filled.is_zero() {
                Decimal::ZERO
            } else {
                executed_value / filled
            },
            status: OrderStatus::from_exchange(&placed.status),
        })
    }
}
