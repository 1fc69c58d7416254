//! Kucoin REST adapter.
//!
//! Signed requests use the v2 scheme: KC-API-SIGN is the base64
//! HMAC-SHA256 of `timestamp + method + path + body`, and the passphrase
//! itself travels HMAC-signed.

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
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest_middleware::ClientWithMiddleware;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use sha2::Sha256;
use tracing::debug;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Kucoin wraps every payload in `{ code, data }`.
#[derive(Deserialize)]
struct Envelope<T> {
    code: String,
    data: Option<T>,
}

pub struct KucoinExchange {
    client: ClientWithMiddleware,
    base_url: String,
    api_key: String,
    api_secret: String,
    api_passphrase: String,
}

impl KucoinExchange {
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

    fn hmac_b64(&self, payload: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(self.api_secret.as_bytes())
            .expect("HMAC accepts any key length");
        mac.update(payload.as_bytes());
        BASE64.encode(mac.finalize().into_bytes())
    }

    fn signed_headers(&self, method: &str, path: &str, body: &str) -> Vec<(&'static str, String)> {
        let timestamp = Utc::now().timestamp_millis().to_string();
        let signature = self.hmac_b64(&format!("{}{}{}{}", timestamp, method, path, body));
        let passphrase = self.hmac_b64(&self.api_passphrase);

        vec![
            ("KC-API-KEY", self.api_key.clone()),
            ("KC-API-SIGN", signature),
            ("KC-API-TIMESTAMP", timestamp),
            ("KC-API-PASSPHRASE", passphrase),
            ("KC-API-KEY-VERSION", "2".to_string()),
        ]
    }

    async fn get_data<T: DeserializeOwned>(
        &self,
        path: &str,
        signed: bool,
    ) -> Result<T, MarketDataError> {
        let mut request = self.client.get(format!("{}{}", self.base_url, path));
        if signed {
            for (name, value) in self.signed_headers("GET", path, "") {
                request = request.header(name, value);
            }
        }
        let response = request.send().await.map_err(transient)?;
        let response = check_status(response).await?;
        let envelope: Envelope<T> = response.json().await.map_err(transient)?;

        if envelope.code != "200000" {
            return Err(MarketDataError::Api {
                status: 400,
                body: format!("kucoin error code {}", envelope.code),
            });
        }
        envelope.data.ok_or_else(|| {
            MarketDataError::Transient("kucoin response missing data".to_string())
        })
    }

    async fn post_data<T: DeserializeOwned>(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<T, MarketDataError> {
        let body_text = body.to_string();
        let mut request = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .header("Content-Type", "application/json");
        for (name, value) in self.signed_headers("POST", path, &body_text) {
            request = request.header(name, value);
        }
        let response = request.body(body_text).send().await.map_err(transient)?;
        let response = check_status(response).await?;
        let envelope: Envelope<T> = response.json().await.map_err(transient)?;

        if envelope.code != "200000" {
            return Err(MarketDataError::Api {
                status: 400,
                body: format!("kucoin error code {}", envelope.code),
            });
        }
        envelope.data.ok_or_else(|| {
            MarketDataError::Transient("kucoin response missing data".to_string())
        })
    }
}

#[async_trait]
impl Exchange for KucoinExchange {
    fn kind(&self) -> ExchangeKind {
        ExchangeKind::Kucoin
    }

    async fn get_historical_data(
        &self,
        market: &str,
        granularity: Granularity,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<CandleSeries, MarketDataError> {
        let mut params: Vec<(&str, String)> = vec![
            ("symbol", market.to_string()),
            ("type", granularity.to_kucoin().to_string()),
        ];
        if let Some(start) = start {
            params.push(("startAt", start.timestamp().to_string()));
        }
        if let Some(end) = end {
            params.push(("endAt", end.timestamp().to_string()));
        }

        let path = build_url_with_query("/api/v1/market/candles", &params);
        // kline format, newest first: [ time, open, close, high, low, volume, turnover ]
        let rows: Vec<Vec<String>> = self.get_data(&path, false).await?;

        let candles: Vec<Candle> = rows
            .iter()
            .filter_map(|row| {
                if row.len() < 6 {
                    return None;
                }
                Some(Candle {
                    ts: DateTime::from_timestamp(row[0].parse::<i64>().ok()?, 0)?,
                    market: market.to_string(),
                    granularity,
                    open: Decimal::from_str_exact(&row[1]).ok()?,
                    close: Decimal::from_str_exact(&row[2]).ok()?,
                    high: Decimal::from_str_exact(&row[3]).ok()?,
                    low: Decimal::from_str_exact(&row[4]).ok()?,
                    volume: Decimal::from_str_exact(&row[5]).ok()?,
                })
            })
            .collect();

        debug!("KucoinExchange: fetched {} candles for {}", candles.len(), market);
        Ok(CandleSeries::from_candles(candles))
    }

    async fn get_ticker(
        &self,
        market: &str,
    ) -> Result<(DateTime<Utc>, Decimal), MarketDataError> {
        #[derive(Deserialize)]
        struct Level1 {
            price: String,
            time: i64,
        }

        let path = build_url_with_query(
            "/api/v1/market/orderbook/level1",
            &[("symbol", market)],
        );
        let level1: Level1 = self.get_data(&path, false).await?;

        let time = DateTime::from_timestamp_millis(level1.time).unwrap_or_else(Utc::now);
        let price = Decimal::from_str_exact(&level1.price)
            .map_err(|e| MarketDataError::Transient(format!("bad ticker price: {}", e)))?;
        Ok((time, price))
    }

    async fn get_time(&self) -> Option<DateTime<Utc>> {
        let millis: i64 = self.get_data("/api/v1/timestamp", false).await.ok()?;
        DateTime::from_timestamp_millis(millis)
    }

    async fn get_balance(&self, currency: &str) -> Result<Decimal, MarketDataError> {
        #[derive(Deserialize)]
        struct Account {
            currency: String,
            #[serde(rename = "type")]
            account_type: String,
            available: String,
        }

        let accounts: Vec<Account> = self.get_data("/api/v1/accounts", true).await?;
        Ok(accounts
            .iter()
            .find(|a| a.currency == currency && a.account_type == "trade")
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
        #[serde(rename_all = "camelCase")]
        struct KucoinOrder {
            created_at: i64,
            symbol: String,
            side: String,
            #[serde(rename = "type")]
            order_type: String,
            size: String,
            funds: String,
            deal_size: String,
            deal_funds: String,
            fee: String,
            is_active: bool,
        }
        #[derive(Deserialize)]
        struct Page {
            items: Vec<KucoinOrder>,
        }

        let path = build_url_with_query(
            "/api/v1/orders",
            &[("symbol", market), ("status", "done")],
        );
        let page: Page = self.get_data(&path, true).await?;

        let parse = |s: &str| Decimal::from_str_exact(s).unwrap_or(Decimal::ZERO);

        let mut orders: Vec<Order> = page
            .items
            .iter()
            .filter_map(|o| {
                let side = match o.side.as_str() {
                    "buy" => OrderSide::Buy,
                    "sell" => OrderSide::Sell,
                    _ => return None,
                };
                let deal_size = parse(&o.deal_size);
                let deal_funds = parse(&o.deal_funds);
                Some(Order {
                    created_at: DateTime::from_timestamp_millis(o.created_at)?,
                    market: o.symbol.clone(),
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
                    filled: deal_size,
                    fees: parse(&o.fee),
                    price: if deal_size.is_zero() {
                        Decimal::ZERO
                    } else {
                        deal_funds / deal_size
                    },
                    status: if o.is_active {
                        OrderStatus::Active
                    } else {
                        OrderStatus::Done
                    },
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
            taker_fee_rate: String,
        }

        let fallback = ExchangeKind::Kucoin.default_taker_fee();
        let path = build_url_with_query("/api/v1/trade-fees", &[("symbols", market)]);
        match self.get_data::<Vec<TradeFee>>(&path, true).await {
            Ok(fees) => fees
                .first()
                .and_then(|f| Decimal::from_str_exact(&f.taker_fee_rate).ok())
                .unwrap_or(fallback),
            Err(_) => fallback,
        }
    }

    async fn get_maker_fee(&self, market: &str) -> Decimal {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct TradeFee {
            maker_fee_rate: String,
        }

        let fallback = ExchangeKind::Kucoin.default_taker_fee();
        let path = build_url_with_query("/api/v1/trade-fees", &[("symbols", market)]);
        match self.get_data::<Vec<TradeFee>>(&path, true).await {
            Ok(fees) => fees
                .first()
                .and_then(|f| Decimal::from_str_exact(&f.maker_fee_rate).ok())
                .unwrap_or(fallback),
            Err(_) => fallback,
        }
    }

    async fn market_buy(
        &self,
        market: &str,
        quote_quantity: Decimal,
    ) -> Result<Order, MarketDataError> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Placed {
            #[allow(dead_code)]
            order_id: String,
        }

        let body = serde_json::json!({
            "clientOid": Uuid::new_v4().to_string(),
            "side": "buy",
            "symbol": market,
            "type": "market",
            "funds": quote_quantity.round_dp(8).to_string(),
        });
        let _placed: Placed = self.post_data("/api/v1/orders", body).await?;

        Ok(Order {
            created_at: Utc::now(),
            market: market.to_string(),
            action: OrderSide::Buy,
            order_type: OrderType::Market,
            size: quote_quantity,
            filled: Decimal::ZERO,
            fees: Decimal::ZERO,
            price: Decimal::ZERO,
            status: OrderStatus::Pending,
        })
    }

    async fn market_sell(
        &self,
        market: &str,
        base_quantity: Decimal,
    ) -> Result<Order, MarketDataError> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Placed {
            #[allow(dead_code)]
            order_id: String,
        }

        let body = serde_json::json!({
            "clientOid": Uuid::new_v4().to_string(),
            "side": "sell",
            "symbol": market,
            "type": "market",
            "size": base_quantity.round_dp(8).to_string(),
        });
        let _placed: Placed = self.post_data("/api/v1/orders", body).await?;

        Ok(Order {
            created_at: Utc::now(),
            market: market.to_string(),
            action: OrderSide::Sell,
            order_type: OrderType::Market,
            size: base_quantity,
            filled: Decimal::ZERO,
            fees: Decimal::ZERO,
            price: Decimal::ZERO,
            status: OrderStatus::Pending,
        })
    }
}
