use rust_decimal::Decimal;
use thiserror::Error;

/// Errors raised while loading or validating configuration. Fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unknown exchange: {0}. Must be 'coinbasepro', 'binance' or 'kucoin'")]
    UnknownExchange(String),

    #[error("Invalid market for {exchange}: {market}")]
    InvalidMarket { exchange: String, market: String },

    #[error("Invalid option '{option}': {reason}")]
    InvalidOption { option: String, reason: String },

    #[error("Invalid API URL: {0}")]
    InvalidApiUrl(String),

    #[error("Unable to read config file {path}: {reason}")]
    Unreadable { path: String, reason: String },
}

/// Indicator precondition failures. Fatal within the indicator call; the
/// caller may catch and default to a neutral value.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TechnicalAnalysisError {
    #[error("Period {period} is out of range ({min}..={max})")]
    PeriodOutOfRange { period: usize, min: usize, max: usize },

    #[error("Series of length {len} is too short for period {period}")]
    SeriesTooShort { len: usize, period: usize },
}

/// Errors related to market data and connectivity
#[derive(Debug, Error)]
pub enum MarketDataError {
    #[error("Out of order candle for {market} at {ts}")]
    OutOfOrderCandle { market: String, ts: String },

    #[error("Transient network failure: {0}")]
    Transient(String),

    #[error("Exchange API rejected the request ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Authentication failed: {0}")]
    Auth(String),
}

impl MarketDataError {
    /// Transient errors abort the current tick and reschedule; they never
    /// mutate position state.
    pub fn is_transient(&self) -> bool {
        match self {
            MarketDataError::Transient(_) => true,
            MarketDataError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Errors related to order placement and account state
#[derive(Debug, Error)]
pub enum TradingError {
    #[error("Insufficient funds: need {need}, available {available}")]
    InsufficientFunds { need: Decimal, available: Decimal },

    #[error("Invalid order: {reason}")]
    InvalidOrder { reason: String },

    #[error("Order execution failed: {reason}")]
    ExecutionFailed { reason: String },

    #[error("{market} is unsuitable for trading, quote price is less than 0.0001")]
    UnsuitableQuotePrice { market: String },
}
