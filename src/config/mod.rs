//! Configuration loading.
//!
//! Options come from three layers, later layers overriding earlier ones:
//! a JSON config file (keyed by exchange name, with an optional nested
//! `config` object; flat top-level keys are accepted for backward
//! compatibility), environment variables for credentials, and argv.
//! The resulting [`Config`] is frozen for the life of the process.

mod cli;

pub use cli::Cli;

use crate::domain::errors::ConfigError;
use crate::domain::granularity::Granularity;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::env;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Supported exchanges. `Dummy` is the offline adapter used by tests and
/// simulations without network access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeKind {
    CoinbasePro,
    Binance,
    Kucoin,
    Dummy,
}

impl ExchangeKind {
    pub fn config_key(&self) -> &'static str {
        match self {
            ExchangeKind::CoinbasePro => "coinbasepro",
            ExchangeKind::Binance => "binance",
            ExchangeKind::Kucoin => "kucoin",
            ExchangeKind::Dummy => "dummy",
        }
    }

    /// Simulation taker fee when the exchange tier is unknown.
    pub fn default_taker_fee(&self) -> Decimal {
        match self {
            ExchangeKind::CoinbasePro => Decimal::new(5, 3),  // 0.005
            ExchangeKind::Binance => Decimal::new(1, 3),      // 0.001
            ExchangeKind::Kucoin => Decimal::new(15, 4),      // 0.0015
            ExchangeKind::Dummy => Decimal::new(5, 3),
        }
    }

    pub fn default_api_url(&self) -> &'static str {
        match self {
            ExchangeKind::CoinbasePro => "https://api.pro.coinbase.com",
            ExchangeKind::Binance => "https://api.binance.com",
            ExchangeKind::Kucoin => "https://api.kucoin.com",
            ExchangeKind::Dummy => "",
        }
    }
}

impl FromStr for ExchangeKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "coinbasepro" | "coinbase" => Ok(ExchangeKind::CoinbasePro),
            "binance" => Ok(ExchangeKind::Binance),
            "kucoin" => Ok(ExchangeKind::Kucoin),
            "dummy" => Ok(ExchangeKind::Dummy),
            other => Err(ConfigError::UnknownExchange(other.to_string())),
        }
    }
}

impl fmt::Display for ExchangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.config_key())
    }
}

/// Simulation mode and pacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SimSpeed {
    #[default]
    Off,
    Fast,
    Slow,
    FastSample,
    SlowSample,
}

impl SimSpeed {
    pub fn is_sim(&self) -> bool {
        *self != SimSpeed::Off
    }

    /// Sample variants cap the window at `adjust_total_periods` candles.
    pub fn is_sample(&self) -> bool {
        matches!(self, SimSpeed::FastSample | SimSpeed::SlowSample)
    }

    pub fn is_fast(&self) -> bool {
        matches!(self, SimSpeed::Fast | SimSpeed::FastSample)
    }
}

impl FromStr for SimSpeed {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "off" => Ok(SimSpeed::Off),
            "fast" => Ok(SimSpeed::Fast),
            "slow" => Ok(SimSpeed::Slow),
            "fast-sample" | "fastsample" => Ok(SimSpeed::FastSample),
            "slow-sample" | "slowsample" => Ok(SimSpeed::SlowSample),
            other => Err(ConfigError::InvalidOption {
                option: "sim".to_string(),
                reason: format!("unrecognized simulation speed '{}'", other),
            }),
        }
    }
}

/// Frozen application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub exchange: ExchangeKind,
    pub market: String,
    pub base_currency: String,
    pub quote_currency: String,
    pub granularity: Granularity,

    pub live: bool,
    pub sim: SimSpeed,
    pub sim_start_date: Option<String>,
    pub sim_end_date: Option<String>,
    pub sim_result_only: bool,

    // Sell bounds and exits
    pub sell_at_loss: bool,
    pub sell_upper_pcnt: Option<Decimal>,
    pub sell_lower_pcnt: Option<Decimal>,
    pub nosell_min_pcnt: Option<Decimal>,
    pub nosell_max_pcnt: Option<Decimal>,
    pub sell_at_resistance: bool,

    // Trailing stop loss
    pub trailing_stop_loss: Option<Decimal>,
    pub trailing_stop_loss_trigger: Decimal,
    pub dynamic_tsl: bool,
    pub tsl_multiplier: Decimal,
    pub tsl_trigger_multiplier: Decimal,
    pub tsl_max_pcnt: Decimal,
    /// Whether the trailing stop honours `sell_at_loss` (the older source
    /// revision did, the newer one does not; default false).
    pub tsl_respect_sell_at_loss: bool,

    // Prevent loss
    pub prevent_loss: bool,
    pub prevent_loss_trigger: Decimal,
    pub prevent_loss_margin: Decimal,

    // Trailing entry / exit machines
    pub trailing_buy_pcnt: Decimal,
    pub trailing_immediate_buy: bool,
    pub trailing_buy_immediate_pcnt: Option<Decimal>,
    pub trailing_sell_pcnt: Decimal,
    pub trailing_immediate_sell: bool,
    pub trailing_sell_immediate_pcnt: Option<Decimal>,
    pub trailing_sell_bailout_pcnt: Option<Decimal>,

    // Buy filters
    pub no_buy_near_high_pcnt: Decimal,
    pub buy_percent: Decimal,
    pub sell_percent: Decimal,
    pub buy_max_size: Option<Decimal>,
    pub buy_min_size: Option<Decimal>,

    // Granularity smart switching
    pub smart_switch: bool,
    pub sell_smart_switch: bool,

    // Signal disables
    pub disable_bull_only: bool,
    pub disable_buy_near_high: bool,
    pub disable_buy_macd: bool,
    pub disable_buy_ema: bool,
    pub disable_buy_obv: bool,
    pub disable_buy_elder_ray: bool,
    pub disable_failsafe_fibonacci_low: bool,
    pub disable_failsafe_lower_pcnt: bool,
    pub disable_profit_bank_upper_pcnt: bool,
    pub disable_profit_bank_reversal: bool,

    // Custom strategy
    pub enable_custom_strategy: bool,
    pub sell_trigger_override: bool,

    // Process behaviour
    pub auto_restart: bool,
    pub websocket: bool,
    pub is_verbose: bool,
    pub disable_tracker: bool,
    pub adjust_total_periods: usize,

    // Notifier
    pub disable_telegram: bool,
    pub disable_telegram_error_msgs: bool,
    pub telegram_token: Option<String>,
    pub telegram_client_id: Option<String>,
    pub telegram_data_dir: String,

    // Credentials
    pub api_key: String,
    pub api_secret: String,
    pub api_passphrase: String,
    pub api_url: String,
    pub recv_window: u64,
}

/// The recognized option set as it appears in config files. Field names
/// follow the file format; aliases keep older flat spellings working.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct RawOptions {
    base_currency: Option<String>,
    quote_currency: Option<String>,
    market: Option<String>,
    granularity: Option<String>,

    live: Option<u8>,
    sim: Option<String>,
    #[serde(alias = "simstartdate")]
    sim_start_date: Option<String>,
    #[serde(alias = "simenddate")]
    sim_end_date: Option<String>,
    #[serde(alias = "simresultonly")]
    sim_result_only: Option<bool>,

    #[serde(alias = "sellatloss")]
    sell_at_loss: Option<u8>,
    #[serde(alias = "sellupperpcnt")]
    sell_upper_pcnt: Option<Decimal>,
    #[serde(alias = "selllowerpcnt")]
    sell_lower_pcnt: Option<Decimal>,
    #[serde(alias = "nosellminpcnt")]
    nosell_min_pcnt: Option<Decimal>,
    #[serde(alias = "nosellmaxpcnt")]
    nosell_max_pcnt: Option<Decimal>,
    #[serde(alias = "sellatresistance")]
    sell_at_resistance: Option<bool>,

    #[serde(alias = "trailingstoploss")]
    trailing_stop_loss: Option<Decimal>,
    #[serde(alias = "trailingstoplosstrigger")]
    trailing_stop_loss_trigger: Option<Decimal>,
    #[serde(alias = "dynamictsl")]
    dynamic_tsl: Option<bool>,
    #[serde(alias = "tslmultiplier")]
    tsl_multiplier: Option<Decimal>,
    #[serde(alias = "tsltriggermultiplier")]
    tsl_trigger_multiplier: Option<Decimal>,
    #[serde(alias = "tslmaxpcnt")]
    tsl_max_pcnt: Option<Decimal>,
    #[serde(alias = "tslrespectsellatloss")]
    tsl_respect_sell_at_loss: Option<bool>,

    #[serde(alias = "preventloss")]
    prevent_loss: Option<bool>,
    #[serde(alias = "preventlosstrigger")]
    prevent_loss_trigger: Option<Decimal>,
    #[serde(alias = "preventlossmargin")]
    prevent_loss_margin: Option<Decimal>,

    #[serde(alias = "trailingbuypcnt")]
    trailing_buy_pcnt: Option<Decimal>,
    #[serde(alias = "trailingimmediatebuy")]
    trailing_immediate_buy: Option<bool>,
    #[serde(alias = "trailingbuyimmediatepcnt")]
    trailing_buy_immediate_pcnt: Option<Decimal>,
    #[serde(alias = "trailingsellpcnt")]
    trailing_sell_pcnt: Option<Decimal>,
    #[serde(alias = "trailingimmediatesell")]
    trailing_immediate_sell: Option<bool>,
    #[serde(alias = "trailingsellimmediatepcnt")]
    trailing_sell_immediate_pcnt: Option<Decimal>,
    #[serde(alias = "trailingsellbailoutpcnt")]
    trailing_sell_bailout_pcnt: Option<Decimal>,

    #[serde(alias = "nobuynearhighpcnt")]
    no_buy_near_high_pcnt: Option<Decimal>,
    #[serde(alias = "buypercent")]
    buy_percent: Option<Decimal>,
    #[serde(alias = "sellpercent")]
    sell_percent: Option<Decimal>,
    #[serde(alias = "buymaxsize")]
    buy_max_size: Option<Decimal>,
    #[serde(alias = "buyminsize")]
    buy_min_size: Option<Decimal>,

    #[serde(alias = "smartswitch")]
    smart_switch: Option<u8>,
    #[serde(alias = "sellsmartswitch")]
    sell_smart_switch: Option<u8>,

    #[serde(alias = "disablebullonly")]
    disable_bull_only: Option<bool>,
    #[serde(alias = "disablebuynearhigh")]
    disable_buy_near_high: Option<bool>,
    #[serde(alias = "disablebuymacd")]
    disable_buy_macd: Option<bool>,
    #[serde(alias = "disablebuyema")]
    disable_buy_ema: Option<bool>,
    #[serde(alias = "disablebuyobv")]
    disable_buy_obv: Option<bool>,
    #[serde(alias = "disablebuyelderray")]
    disable_buy_elder_ray: Option<bool>,
    #[serde(alias = "disablefailsafefibonaccilow")]
    disable_failsafe_fibonacci_low: Option<bool>,
    #[serde(alias = "disablefailsafelowerpcnt")]
    disable_failsafe_lower_pcnt: Option<bool>,
    #[serde(alias = "disableprofitbankupperpcnt")]
    disable_profit_bank_upper_pcnt: Option<bool>,
    #[serde(alias = "disableprofitbankreversal")]
    disable_profit_bank_reversal: Option<bool>,

    #[serde(alias = "enablecustomstrategy")]
    enable_custom_strategy: Option<bool>,
    #[serde(alias = "selltriggeroverride")]
    sell_trigger_override: Option<bool>,

    #[serde(alias = "autorestart")]
    auto_restart: Option<bool>,
    websocket: Option<bool>,
    verbose: Option<u8>,
    #[serde(alias = "disabletracker")]
    disable_tracker: Option<bool>,
    #[serde(alias = "adjusttotalperiods")]
    adjust_total_periods: Option<usize>,

    #[serde(alias = "disabletelegram")]
    disable_telegram: Option<bool>,
    #[serde(alias = "disabletelegramerrormsgs")]
    disable_telegram_error_msgs: Option<bool>,
    telegram_token: Option<String>,
    telegram_client_id: Option<String>,
    #[serde(alias = "telegramdatadir")]
    telegram_data_dir: Option<String>,

    api_key: Option<String>,
    api_secret: Option<String>,
    api_passphrase: Option<String>,
    api_url: Option<String>,
    recv_window: Option<u64>,
}

impl Config {
    /// Loads configuration from a JSON file (if present), then applies
    /// environment credentials and CLI overrides.
    pub fn load(path: &str, cli: &Cli) -> Result<Self, ConfigError> {
        let mut raw = RawOptions::default();
        let mut exchange_from_file = None;

        if Path::new(path).exists() {
            let text =
                std::fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
                    path: path.to_string(),
                    reason: e.to_string(),
                })?;
            let value: Value =
                serde_json::from_str(&text).map_err(|e| ConfigError::Unreadable {
                    path: path.to_string(),
                    reason: e.to_string(),
                })?;

            for kind in [
                ExchangeKind::Binance,
                ExchangeKind::CoinbasePro,
                ExchangeKind::Kucoin,
                ExchangeKind::Dummy,
            ] {
                if let Some(section) = value.get(kind.config_key()) {
                    exchange_from_file = Some(kind);
                    // credentials sit beside the nested `config` object
                    raw = parse_options(section)?;
                    if let Some(nested) = section.get("config") {
                        merge_options(&mut raw, parse_options(nested)?);
                    }
                    break;
                }
            }

            if exchange_from_file.is_none() {
                // backward compatible flat layout
                raw = parse_options(&value)?;
            }
        }

        let exchange = match &cli.exchange {
            Some(name) => ExchangeKind::from_str(name)?,
            None => exchange_from_file.unwrap_or(ExchangeKind::Dummy),
        };

        merge_options(&mut raw, cli.to_options());

        // credentials fall back to the environment
        let env_prefix = exchange.config_key().to_uppercase();
        let env_or = |field: &Option<String>, suffix: &str| -> String {
            field.clone().or_else(|| env::var(format!("{}_{}", env_prefix, suffix)).ok()).unwrap_or_default()
        };

        let market = raw.market.clone().unwrap_or_else(|| {
            match (&raw.base_currency, &raw.quote_currency) {
                (Some(b), Some(q)) => format!("{}-{}", b, q),
                _ => String::new(),
            }
        });

        let parsed = crate::domain::market::Market::parse(exchange, &market)?;
        let market = parsed.to_exchange_symbol();

        let granularity = match &raw.granularity {
            Some(g) => Granularity::from_str(g).map_err(|e| ConfigError::InvalidOption {
                option: "granularity".to_string(),
                reason: e.to_string(),
            })?,
            None => Granularity::OneHour,
        };

        let sim = match &raw.sim {
            Some(s) => SimSpeed::from_str(s)?,
            None => SimSpeed::Off,
        };

        let api_url = {
            let url = raw
                .api_url
                .clone()
                .unwrap_or_else(|| exchange.default_api_url().to_string());
            if !url.is_empty() {
                url::Url::parse(&url).map_err(|_| ConfigError::InvalidApiUrl(url.clone()))?;
            }
            url.trim_end_matches('/').to_string()
        };

        let live = raw.live.unwrap_or(0) == 1 && !sim.is_sim();

        let adjust_total_periods = raw.adjust_total_periods.unwrap_or_else(|| {
            if exchange == ExchangeKind::Binance && granularity == Granularity::OneDay {
                250
            } else {
                300
            }
        });
        if !(27..=300).contains(&adjust_total_periods) {
            return Err(ConfigError::InvalidOption {
                option: "adjusttotalperiods".to_string(),
                reason: format!("{} is outside 27..=300", adjust_total_periods),
            });
        }

        Ok(Config {
            exchange,
            market,
            base_currency: parsed.base,
            quote_currency: parsed.quote,
            granularity,
            live,
            sim,
            sim_start_date: raw.sim_start_date,
            sim_end_date: raw.sim_end_date,
            sim_result_only: raw.sim_result_only.unwrap_or(false),
            sell_at_loss: raw.sell_at_loss.unwrap_or(1) == 1,
            sell_upper_pcnt: raw.sell_upper_pcnt,
            sell_lower_pcnt: raw.sell_lower_pcnt,
            nosell_min_pcnt: raw.nosell_min_pcnt,
            nosell_max_pcnt: raw.nosell_max_pcnt,
            sell_at_resistance: raw.sell_at_resistance.unwrap_or(false),
            trailing_stop_loss: raw.trailing_stop_loss,
            trailing_stop_loss_trigger: raw.trailing_stop_loss_trigger.unwrap_or(Decimal::ZERO),
            dynamic_tsl: raw.dynamic_tsl.unwrap_or(false),
            tsl_multiplier: raw.tsl_multiplier.unwrap_or(Decimal::new(11, 1)),
            tsl_trigger_multiplier: raw.tsl_trigger_multiplier.unwrap_or(Decimal::new(11, 1)),
            tsl_max_pcnt: raw.tsl_max_pcnt.unwrap_or(Decimal::new(-5, 0)),
            tsl_respect_sell_at_loss: raw.tsl_respect_sell_at_loss.unwrap_or(false),
            prevent_loss: raw.prevent_loss.unwrap_or(false),
            prevent_loss_trigger: raw.prevent_loss_trigger.unwrap_or(Decimal::ONE),
            prevent_loss_margin: raw.prevent_loss_margin.unwrap_or(Decimal::new(1, 1)),
            trailing_buy_pcnt: raw.trailing_buy_pcnt.unwrap_or(Decimal::ZERO),
            trailing_immediate_buy: raw.trailing_immediate_buy.unwrap_or(false),
            trailing_buy_immediate_pcnt: raw.trailing_buy_immediate_pcnt,
            trailing_sell_pcnt: raw.trailing_sell_pcnt.unwrap_or(Decimal::ZERO),
            trailing_immediate_sell: raw.trailing_immediate_sell.unwrap_or(false),
            trailing_sell_immediate_pcnt: raw.trailing_sell_immediate_pcnt,
            trailing_sell_bailout_pcnt: raw.trailing_sell_bailout_pcnt,
            no_buy_near_high_pcnt: raw.no_buy_near_high_pcnt.unwrap_or(Decimal::new(3, 0)),
            buy_percent: raw.buy_percent.unwrap_or(Decimal::new(100, 0)),
            sell_percent: raw.sell_percent.unwrap_or(Decimal::new(100, 0)),
            buy_max_size: raw.buy_max_size,
            buy_min_size: raw.buy_min_size,
            smart_switch: raw.smart_switch.unwrap_or(0) == 1,
            sell_smart_switch: raw.sell_smart_switch.unwrap_or(0) == 1,
            disable_bull_only: raw.disable_bull_only.unwrap_or(false),
            disable_buy_near_high: raw.disable_buy_near_high.unwrap_or(false),
            disable_buy_macd: raw.disable_buy_macd.unwrap_or(false),
            disable_buy_ema: raw.disable_buy_ema.unwrap_or(false),
            disable_buy_obv: raw.disable_buy_obv.unwrap_or(false),
            disable_buy_elder_ray: raw.disable_buy_elder_ray.unwrap_or(false),
            disable_failsafe_fibonacci_low: raw.disable_failsafe_fibonacci_low.unwrap_or(false),
            disable_failsafe_lower_pcnt: raw.disable_failsafe_lower_pcnt.unwrap_or(false),
            disable_profit_bank_upper_pcnt: raw.disable_profit_bank_upper_pcnt.unwrap_or(false),
            disable_profit_bank_reversal: raw.disable_profit_bank_reversal.unwrap_or(false),
            enable_custom_strategy: raw.enable_custom_strategy.unwrap_or(false),
            sell_trigger_override: raw.sell_trigger_override.unwrap_or(false),
            auto_restart: raw.auto_restart.unwrap_or(false),
            websocket: raw.websocket.unwrap_or(false),
            is_verbose: raw.verbose.unwrap_or(0) == 1,
            disable_tracker: raw.disable_tracker.unwrap_or(false),
            adjust_total_periods,
            disable_telegram: raw.disable_telegram.unwrap_or(false),
            disable_telegram_error_msgs: raw.disable_telegram_error_msgs.unwrap_or(false),
            telegram_token: raw.telegram_token,
            telegram_client_id: raw.telegram_client_id,
            telegram_data_dir: raw
                .telegram_data_dir
                .unwrap_or_else(|| "telegram_data".to_string()),
            api_key: env_or(&raw.api_key, "API_KEY"),
            api_secret: env_or(&raw.api_secret, "API_SECRET"),
            api_passphrase: env_or(&raw.api_passphrase, "API_PASSPHRASE"),
            api_url,
            recv_window: raw.recv_window.unwrap_or(5000),
        })
    }

    pub fn is_sim(&self) -> bool {
        self.sim.is_sim()
    }

    /// Row count the control loop requires before trading.
    pub fn required_periods(&self) -> usize {
        if self.exchange == ExchangeKind::Binance && self.granularity == Granularity::OneDay {
            250
        } else {
            300
        }
    }
}

fn parse_options(value: &Value) -> Result<RawOptions, ConfigError> {
    serde_json::from_value(value.clone()).map_err(|e| ConfigError::InvalidOption {
        option: "config".to_string(),
        reason: e.to_string(),
    })
}

/// Overlays every `Some` field of `other` onto `base`.
fn merge_options(base: &mut RawOptions, other: RawOptions) {
    macro_rules! take {
        ($($field:ident),* $(,)?) => {
            $(if other.$field.is_some() { base.$field = other.$field; })*
        };
    }
    take!(
        base_currency, quote_currency, market, granularity, live, sim,
        sim_start_date, sim_end_date, sim_result_only, sell_at_loss,
        sell_upper_pcnt, sell_lower_pcnt, nosell_min_pcnt, nosell_max_pcnt,
        sell_at_resistance, trailing_stop_loss, trailing_stop_loss_trigger,
        dynamic_tsl, tsl_multiplier, tsl_trigger_multiplier, tsl_max_pcnt,
        tsl_respect_sell_at_loss, prevent_loss, prevent_loss_trigger,
        prevent_loss_margin, trailing_buy_pcnt, trailing_immediate_buy,
        trailing_buy_immediate_pcnt, trailing_sell_pcnt,
        trailing_immediate_sell, trailing_sell_immediate_pcnt,
        trailing_sell_bailout_pcnt, no_buy_near_high_pcnt, buy_percent,
        sell_percent, buy_max_size, buy_min_size, smart_switch,
        sell_smart_switch, disable_bull_only, disable_buy_near_high,
        disable_buy_macd, disable_buy_ema, disable_buy_obv,
        disable_buy_elder_ray, disable_failsafe_fibonacci_low,
        disable_failsafe_lower_pcnt, disable_profit_bank_upper_pcnt,
        disable_profit_bank_reversal, enable_custom_strategy,
        sell_trigger_override, auto_restart, websocket, verbose,
        disable_tracker, adjust_total_periods, disable_telegram,
        disable_telegram_error_msgs, telegram_token, telegram_client_id,
        telegram_data_dir, api_key, api_secret, api_passphrase, api_url,
        recv_window,
    );
}

/// Bare configuration for unit tests: dummy exchange, BTC-USD, one hour
/// candles, every option at its default.
#[cfg(test)]
pub fn test_config() -> Config {
    Config {
        exchange: ExchangeKind::Dummy,
        market: "BTC-USD".to_string(),
        base_currency: "BTC".to_string(),
        quote_currency: "USD".to_string(),
        granularity: Granularity::OneHour,
        live: false,
        sim: SimSpeed::Fast,
        sim_start_date: None,
        sim_end_date: None,
        sim_result_only: false,
        sell_at_loss: true,
        sell_upper_pcnt: None,
        sell_lower_pcnt: None,
        nosell_min_pcnt: None,
        nosell_max_pcnt: None,
        sell_at_resistance: false,
        trailing_stop_loss: None,
        trailing_stop_loss_trigger: Decimal::ZERO,
        dynamic_tsl: false,
        tsl_multiplier: Decimal::new(11, 1),
        tsl_trigger_multiplier: Decimal::new(11, 1),
        tsl_max_pcnt: Decimal::from(-5),
        tsl_respect_sell_at_loss: false,
        prevent_loss: false,
        prevent_loss_trigger: Decimal::ONE,
        prevent_loss_margin: Decimal::new(1, 1),
        trailing_buy_pcnt: Decimal::ZERO,
        trailing_immediate_buy: false,
        trailing_buy_immediate_pcnt: None,
        trailing_sell_pcnt: Decimal::ZERO,
        trailing_immediate_sell: false,
        trailing_sell_immediate_pcnt: None,
        trailing_sell_bailout_pcnt: None,
        no_buy_near_high_pcnt: Decimal::from(3),
        buy_percent: Decimal::from(100),
        sell_percent: Decimal::from(100),
        buy_max_size: None,
        buy_min_size: None,
        smart_switch: false,
        sell_smart_switch: false,
        disable_bull_only: false,
        disable_buy_near_high: false,
        disable_buy_macd: false,
        disable_buy_ema: false,
        disable_buy_obv: false,
        disable_buy_elder_ray: false,
        disable_failsafe_fibonacci_low: false,
        disable_failsafe_lower_pcnt: false,
        disable_profit_bank_upper_pcnt: false,
        disable_profit_bank_reversal: false,
        enable_custom_strategy: false,
        sell_trigger_override: false,
        auto_restart: false,
        websocket: false,
        is_verbose: false,
        disable_tracker: true,
        adjust_total_periods: 300,
        disable_telegram: true,
        disable_telegram_error_msgs: false,
        telegram_token: None,
        telegram_client_id: None,
        telegram_data_dir: "telegram_data".to_string(),
        api_key: String::new(),
        api_secret: String::new(),
        api_passphrase: String::new(),
        api_url: String::new(),
        recv_window: 5000,
    }
}
