//! CSV trade tracking.
//!
//! `orders.csv` is the flat log of completed orders; `tracker.csv` pairs
//! each buy with the sell that closed it and adds profit and margin
//! columns.

use crate::domain::order::{Order, OrderSide};
use csv::Writer;
use rust_decimal::Decimal;
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Serialize)]
struct OrderRow<'a> {
    created_at: String,
    market: &'a str,
    action: String,
    #[serde(rename = "type")]
    order_type: String,
    size: Decimal,
    filled: Decimal,
    fees: Decimal,
    price: Decimal,
    status: String,
}

#[derive(Debug, Serialize)]
struct PairRow {
    status: String,
    market: String,
    buy_at: String,
    buy_size: Decimal,
    buy_filled: Decimal,
    buy_fees: Decimal,
    buy_price: Decimal,
    sell_at: String,
    sell_size: Decimal,
    sell_filled: Decimal,
    sell_fees: Decimal,
    sell_price: Decimal,
    profit: Decimal,
    margin: Decimal,
}

/// Writes the flat order log.
pub fn save_orders_csv(orders: &[Order], path: impl AsRef<Path>) -> csv::Result<()> {
    let mut writer = Writer::from_path(path)?;
    for order in orders {
        writer.serialize(OrderRow {
            created_at: order.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            market: &order.market,
            action: order.action.to_string(),
            order_type: format!("{:?}", order.order_type).to_lowercase(),
            size: order.size,
            filled: order.filled,
            fees: order.fees,
            price: order.price,
            status: order.status.to_string(),
        })?;
    }
    writer.flush()?;
    Ok(())
}

/// Pairs completed buys with the sell that followed them.
///
/// Walks the order log in time order keeping the most recent unmatched
/// buy; each sell closes it into one row. Buys abandoned without a sell
/// produce no row.
pub fn pair_trades(orders: &[Order]) -> Vec<(Order, Order)> {
    let mut sorted: Vec<&Order> = orders.iter().collect();
    sorted.sort_by_key(|o| o.created_at);

    let mut pairs = Vec::new();
    let mut open_buy: Option<&Order> = None;
    for order in sorted {
        match order.action {
            OrderSide::Buy => open_buy = Some(order),
            OrderSide::Sell => {
                if let Some(buy) = open_buy.take() {
                    pairs.push((buy.clone(), order.clone()));
                }
            }
        }
    }
    pairs
}

/// Writes the paired-trade tracker with profit and margin columns.
pub fn save_tracker_csv(orders: &[Order], path: impl AsRef<Path>) -> csv::Result<()> {
    let mut writer = Writer::from_path(path)?;
    for (buy, sell) in pair_trades(orders) {
        // buy.size is the quote spent, sell.filled the quote received
        let profit = sell.filled - buy.size;
        let margin = if buy.size.is_zero() {
            Decimal::ZERO
        } else {
            profit / buy.size * Decimal::from(100)
        };
        writer.serialize(PairRow {
            status: sell.status.to_string(),
            market: buy.market.clone(),
            buy_at: buy.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            buy_size: buy.size,
            buy_filled: buy.filled,
            buy_fees: buy.fees,
            buy_price: buy.price,
            sell_at: sell.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            sell_size: sell.size,
            sell_filled: sell.filled,
            sell_fees: sell.fees,
            sell_price: sell.price,
            profit,
            margin: margin.round_dp(2),
        })?;
    }
    writer.flush()?;
    Ok(())
}
