use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Candle width used when sampling OHLCV data from an exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Granularity {
    OneMinute,
    FiveMinutes,
    FifteenMinutes,
    OneHour,
    SixHours,
    OneDay,
}

impl Granularity {
    /// Returns the width of one candle in seconds
    pub fn to_seconds(&self) -> i64 {
        match self {
            Granularity::OneMinute => 60,
            Granularity::FiveMinutes => 300,
            Granularity::FifteenMinutes => 900,
            Granularity::OneHour => 3600,
            Granularity::SixHours => 21600,
            Granularity::OneDay => 86400,
        }
    }

    /// Short label used in config files and log lines
    pub fn to_short(&self) -> &'static str {
        match self {
            Granularity::OneMinute => "1m",
            Granularity::FiveMinutes => "5m",
            Granularity::FifteenMinutes => "15m",
            Granularity::OneHour => "1h",
            Granularity::SixHours => "6h",
            Granularity::OneDay => "1d",
        }
    }

    /// Human readable label for notifications and banners
    pub fn to_medium(&self) -> &'static str {
        match self {
            Granularity::OneMinute => "1 minute",
            Granularity::FiveMinutes => "5 minutes",
            Granularity::FifteenMinutes => "15 minutes",
            Granularity::OneHour => "1 hour",
            Granularity::SixHours => "6 hours",
            Granularity::OneDay => "1 day",
        }
    }

    /// Converts to the Coinbase Pro API granularity parameter (seconds)
    pub fn to_coinbase(&self) -> i64 {
        self.to_seconds()
    }

    /// Converts to the Binance API interval string
    pub fn to_binance(&self) -> &'static str {
        self.to_short()
    }

    /// Converts to the Kucoin API kline type string
    pub fn to_kucoin(&self) -> &'static str {
        match self {
            Granularity::OneMinute => "1min",
            Granularity::FiveMinutes => "5min",
            Granularity::FifteenMinutes => "15min",
            Granularity::OneHour => "1hour",
            Granularity::SixHours => "6hour",
            Granularity::OneDay => "1day",
        }
    }

    /// All supported granularities in ascending order
    pub fn all() -> Vec<Granularity> {
        vec![
            Granularity::OneMinute,
            Granularity::FiveMinutes,
            Granularity::FifteenMinutes,
            Granularity::OneHour,
            Granularity::SixHours,
            Granularity::OneDay,
        ]
    }
}

impl FromStr for Granularity {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "60" | "1m" | "1min" | "oneminute" => Ok(Granularity::OneMinute),
            "300" | "5m" | "5min" | "fiveminutes" => Ok(Granularity::FiveMinutes),
            "900" | "15m" | "15min" | "fifteenminutes" => Ok(Granularity::FifteenMinutes),
            "3600" | "1h" | "1hour" | "onehour" => Ok(Granularity::OneHour),
            "21600" | "6h" | "6hour" | "sixhours" => Ok(Granularity::SixHours),
            "86400" | "1d" | "1day" | "oneday" => Ok(Granularity::OneDay),
            _ => Err(anyhow!(
                "Invalid granularity: '{}'. Valid options: 1m, 5m, 15m, 1h, 6h, 1d",
                s
            )),
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_short())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_seconds() {
        assert_eq!(Granularity::OneMinute.to_seconds(), 60);
        assert_eq!(Granularity::FiveMinutes.to_seconds(), 300);
        assert_eq!(Granularity::FifteenMinutes.to_seconds(), 900);
        assert_eq!(Granularity::OneHour.to_seconds(), 3600);
        assert_eq!(Granularity::SixHours.to_seconds(), 21600);
        assert_eq!(Granularity::OneDay.to_seconds(), 86400);
    }

    #[test]
    fn test_from_str() {
        assert_eq!(Granularity::from_str("1m").unwrap(), Granularity::OneMinute);
        assert_eq!(Granularity::from_str("900").unwrap(), Granularity::FifteenMinutes);
        assert_eq!(Granularity::from_str("1h").unwrap(), Granularity::OneHour);
        assert_eq!(Granularity::from_str("6hour").unwrap(), Granularity::SixHours);
        assert_eq!(Granularity::from_str("1Day").unwrap(), Granularity::OneDay);
        assert!(Granularity::from_str("2h").is_err());
    }

    #[test]
    fn test_api_strings() {
        assert_eq!(Granularity::FifteenMinutes.to_binance(), "15m");
        assert_eq!(Granularity::FifteenMinutes.to_coinbase(), 900);
        assert_eq!(Granularity::FifteenMinutes.to_kucoin(), "15min");
        assert_eq!(Granularity::SixHours.to_binance(), "6h");
        assert_eq!(Granularity::SixHours.to_kucoin(), "6hour");
    }
}
