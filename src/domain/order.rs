use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "buy"),
            OrderSide::Sell => write!(f, "sell"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Market,
    Limit,
}

/// Normalized order status. Each exchange adapter maps its native status
/// vocabulary into this set (Binance FILLED -> Done,
/// PARTIALLY_FILLED -> Pending; Coinbase Pro has no partial state).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Open,
    Pending,
    Done,
    Active,
    Canceled,
}

impl OrderStatus {
    /// Normalizes a native exchange status string.
    pub fn from_exchange(raw: &str) -> Self {
        match raw.to_lowercase().as_str() {
            "filled" | "done" | "deal" | "settled" => OrderStatus::Done,
            "new" | "open" => OrderStatus::Open,
            "partially_filled" | "pending" => OrderStatus::Pending,
            "active" => OrderStatus::Active,
            "canceled" | "cancelled" | "expired" | "rejected" => OrderStatus::Canceled,
            _ => OrderStatus::Open,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderStatus::Open => "open",
            OrderStatus::Pending => "pending",
            OrderStatus::Done => "done",
            OrderStatus::Active => "active",
            OrderStatus::Canceled => "canceled",
        };
        write!(f, "{}", s)
    }
}

/// A completed or resting order as reported by an exchange adapter (or
/// booked by the simulated account).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub created_at: DateTime<Utc>,
    pub market: String,
    pub action: OrderSide,
    pub order_type: OrderType,
    /// Quote size for buys, base size for sells.
    pub size: Decimal,
    pub filled: Decimal,
    pub fees: Decimal,
    pub price: Decimal,
    pub status: OrderStatus,
}
