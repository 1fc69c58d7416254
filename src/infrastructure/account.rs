//! Live or test trading account.
//!
//! Live mode proxies the exchange adapter. Test mode books fills against
//! an in-memory ledger seeded with 1000 quote units, charging the
//! simulated taker fee inside the conversion, and keeps the order log the
//! tracker reads.

use crate::domain::errors::MarketDataError;
use crate::domain::order::{Order, OrderSide, OrderStatus, OrderType};
use crate::infrastructure::exchange::Exchange;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::info;

pub struct TradingAccount {
    exchange: Arc<dyn Exchange>,
    live: bool,
    base_currency: String,
    quote_currency: String,
    quote_balance: Decimal,
    base_balance: Decimal,
    orders: Vec<Order>,
}

impl TradingAccount {
    pub fn new(
        exchange: Arc<dyn Exchange>,
        live: bool,
        base_currency: String,
        quote_currency: String,
    ) -> Self {
        Self {
            exchange,
            live,
            base_currency,
            quote_currency,
            // test accounts are instantiated with a balance of 1000
            quote_balance: Decimal::from(1000),
            base_balance: Decimal::ZERO,
            orders: Vec::new(),
        }
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    pub async fn get_balance(&self, currency: &str) -> Result<Decimal, MarketDataError> {
        if self.live {
            return self.exchange.get_balance(currency).await;
        }
        if currency == self.quote_currency {
            Ok(self.quote_balance)
        } else if currency == self.base_currency {
            Ok(self.base_balance)
        } else {
            Ok(Decimal::ZERO)
        }
    }

    pub async fn get_orders(
        &self,
        market: &str,
        action: Option<OrderSide>,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>, MarketDataError> {
        if self.live {
            return self.exchange.get_orders(market, action, status).await;
        }
        let mut orders: Vec<Order> = self
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

    /// Spends `quote_quantity` on the base asset. Test fills convert at
    /// `price` with the taker fee deducted before conversion.
    pub async fn market_buy(
        &mut self,
        market: &str,
        quote_quantity: Decimal,
        price: Decimal,
        taker_fee: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Order, MarketDataError> {
        if self.live {
            return self.exchange.market_buy(market, quote_quantity).await;
        }

        if quote_quantity > self.quote_balance || price.is_zero() {
            return Err(MarketDataError::Api {
                status: 400,
                body: format!(
                    "insufficient funds for buy: {} > {}",
                    quote_quantity, self.quote_balance
                ),
            });
        }

        let fee = quote_quantity * taker_fee;
        let filled = (quote_quantity - fee) / price;
        self.quote_balance -= quote_quantity;
        self.base_balance += filled;

        let order = Order {
            created_at: now,
            market: market.to_string(),
            action: OrderSide::Buy,
            order_type: OrderType::Market,
            size: quote_quantity,
            filled,
            fees: fee,
            price,
            status: OrderStatus::Done,
        };
        self.orders.push(order.clone());
        info!(
            "TradingAccount: test buy {} {} at {} ({} filled)",
            quote_quantity, self.quote_currency, price, filled
        );
        Ok(order)
    }

    /// Sells `base_quantity` of the base asset. Test fills convert at
    /// `price` with the taker fee deducted from the proceeds.
    pub async fn market_sell(
        &mut self,
        market: &str,
        base_quantity: Decimal,
        price: Decimal,
        taker_fee: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Order, MarketDataError> {
        if self.live {
            return self.exchange.market_sell(market, base_quantity).await;
        }

        if base_quantity > self.base_balance {
            return Err(MarketDataError::Api {
                status: 400,
                body: format!(
                    "insufficient funds for sell: {} > {}",
                    base_quantity, self.base_balance
                ),
            });
        }

        let gross = base_quantity * price;
        let fee = gross * taker_fee;
        let proceeds = gross - fee;
        self.base_balance -= base_quantity;
        self.quote_balance += proceeds;

        let order = Order {
            created_at: now,
            market: market.to_string(),
            action: OrderSide::Sell,
            order_type: OrderType::Market,
            size: base_quantity,
            filled: proceeds,
            fees: fee,
            price,
            status: OrderStatus::Done,
        };
        self.orders.push(order.clone());
        info!(
            "TradingAccount: test sell {} {} at {} ({} {} proceeds)",
            base_quantity, self.base_currency, price, proceeds, self.quote_currency
        );
        Ok(order)
    }

    /// The full order log (test mode), for the tracker CSV.
    pub fn order_log(&self) -> &[Order] {
        &self.orders
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::exchange::DummyExchange;
    use rust_decimal_macros::dec;

    fn test_account() -> TradingAccount {
        TradingAccount::new(
            Arc::new(DummyExchange::new()),
            false,
            "BTC".to_string(),
            "USD".to_string(),
        )
    }

    #[tokio::test]
    async fn test_seeded_with_1000_quote() {
        let account = test_account();
        assert_eq!(account.get_balance("USD").await.unwrap(), dec!(1000));
        assert_eq!(account.get_balance("BTC").await.unwrap(), Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_buy_converts_net_of_fee() {
        let mut account = test_account();
        let order = account
            .market_buy("BTC-USD", dec!(1000), dec!(100), dec!(0.005), Utc::now())
            .await
            .unwrap();

        // 1000 less the 0.5% fee converts at 100
        assert_eq!(order.fees, dec!(5));
        assert_eq!(order.filled, dec!(9.95));
        assert_eq!(account.get_balance("USD").await.unwrap(), Decimal::ZERO);
        assert_eq!(account.get_balance("BTC").await.unwrap(), dec!(9.95));
    }

    #[tokio::test]
    async fn test_sell_deducts_fee_from_proceeds() {
        let mut account = test_account();
        account
            .market_buy("BTC-USD", dec!(1000), dec!(100), dec!(0), Utc::now())
            .await
            .unwrap();

        let order = account
            .market_sell("BTC-USD", dec!(10), dec!(110), dec!(0.005), Utc::now())
            .await
            .unwrap();

        assert_eq!(order.fees, dec!(5.5));
        assert_eq!(order.filled, dec!(1094.5));
        assert_eq!(account.get_balance("USD").await.unwrap(), dec!(1094.5));
    }

    #[tokio::test]
    async fn test_overdraw_is_rejected() {
        let mut account = test_account();
        let result = account
            .market_buy("BTC-USD", dec!(1001), dec!(100), dec!(0.005), Utc::now())
            .await;
        assert!(result.is_err());

        let result = account
            .market_sell("BTC-USD", dec!(1), dec!(100), dec!(0.005), Utc::now())
            .await;
        assert!(result.is_err(), "No base balance to sell");
    }

    #[tokio::test]
    async fn test_order_log_filtering() {
        let mut account = test_account();
        account
            .market_buy("BTC-USD", dec!(500), dec!(100), dec!(0), Utc::now())
            .await
            .unwrap();
        account
            .market_sell("BTC-USD", dec!(2), dec!(110), dec!(0), Utc::now())
            .await
            .unwrap();

        let buys = account
            .get_orders("BTC-USD", Some(OrderSide::Buy), None)
            .await
            .unwrap();
        assert_eq!(buys.len(), 1);

        let done = account
            .get_orders("BTC-USD", None, Some(OrderStatus::Done))
            .await
            .unwrap();
        assert_eq!(done.len(), 2);
    }
}
