use crate::config::ExchangeKind;
use crate::domain::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical market identifier, normalized from exchange-specific
/// symbology (`BTC-USD` vs `BTCUSD` vs `BTC-USDT`) at config time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Market {
    pub base: String,
    pub quote: String,
    pub exchange: ExchangeKind,
}

const BINANCE_QUOTES: [&str; 10] = [
    "USDT", "BUSD", "USDC", "TUSD", "BTC", "ETH", "BNB", "EUR", "GBP", "TRY",
];

impl Market {
    /// Parses an exchange-specific market string into its canonical form.
    pub fn parse(exchange: ExchangeKind, market: &str) -> Result<Self, ConfigError> {
        let invalid = || ConfigError::InvalidMarket {
            exchange: exchange.to_string(),
            market: market.to_string(),
        };

        match exchange {
            ExchangeKind::CoinbasePro | ExchangeKind::Kucoin => {
                let (base, quote) = market.split_once('-').ok_or_else(invalid)?;
                if base.len() < 2 || base.len() > 5 || quote.len() < 2 || quote.len() > 5 {
                    return Err(invalid());
                }
                if !is_symbol(base) || !is_symbol(quote) {
                    return Err(invalid());
                }
                Ok(Self {
                    base: base.to_string(),
                    quote: quote.to_string(),
                    exchange,
                })
            }
            ExchangeKind::Binance | ExchangeKind::Dummy => {
                // Binance concatenates base and quote; split on a known quote
                // asset suffix. A dash form is accepted for convenience.
                if let Some((base, quote)) = market.split_once('-') {
                    if !is_symbol(base) || !is_symbol(quote) {
                        return Err(invalid());
                    }
                    return Ok(Self {
                        base: base.to_string(),
                        quote: quote.to_string(),
                        exchange,
                    });
                }

                if market.len() < 6 || market.len() > 12 || !is_symbol(market) {
                    return Err(invalid());
                }

                let quote = BINANCE_QUOTES
                    .iter()
                    .find(|q| market.ends_with(**q) && market.len() > q.len())
                    .ok_or_else(invalid)?;

                Ok(Self {
                    base: market[..market.len() - quote.len()].to_string(),
                    quote: quote.to_string(),
                    exchange,
                })
            }
        }
    }

    /// The market id in the form the owning exchange's API expects.
    pub fn to_exchange_symbol(&self) -> String {
        match self.exchange {
            ExchangeKind::Binance => format!("{}{}", self.base, self.quote),
            _ => format!("{}-{}", self.base, self.quote),
        }
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.base, self.quote)
    }
}

fn is_symbol(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
}
