use super::RawOptions;
use clap::Parser;
use rust_decimal::Decimal;

/// Command line flags. Every recognized config option has a flag; argv
/// overrides the config file.
#[derive(Debug, Default, Parser)]
#[command(name = "coinbot", about = "Automated cryptocurrency trading daemon")]
pub struct Cli {
    /// Path to the JSON configuration file
    #[arg(long, default_value = "config.json")]
    pub config: String,

    /// Exchange to trade on: coinbasepro, binance or kucoin
    #[arg(long)]
    pub exchange: Option<String>,

    /// Market to trade, e.g. BTC-USD or BTCUSDT
    #[arg(long)]
    pub market: Option<String>,

    /// Candle granularity: 1m, 5m, 15m, 1h, 6h, 1d
    #[arg(long)]
    pub granularity: Option<String>,

    /// Place real orders (1) instead of test accounting (0)
    #[arg(long)]
    pub live: Option<u8>,

    /// Simulation mode: off, fast, slow, fast-sample, slow-sample
    #[arg(long)]
    pub sim: Option<String>,

    /// Simulation window start (ISO-8601)
    #[arg(long)]
    pub simstartdate: Option<String>,

    /// Simulation window end (ISO-8601)
    #[arg(long)]
    pub simenddate: Option<String>,

    /// Only print the final simulation summary
    #[arg(long)]
    pub simresultonly: bool,

    /// Allow selling at a loss (1) or veto it (0)
    #[arg(long)]
    pub sellatloss: Option<u8>,

    #[arg(long)]
    pub sellupperpcnt: Option<Decimal>,

    #[arg(long)]
    pub selllowerpcnt: Option<Decimal>,

    #[arg(long)]
    pub nosellminpcnt: Option<Decimal>,

    #[arg(long)]
    pub nosellmaxpcnt: Option<Decimal>,

    #[arg(long)]
    pub sellatresistance: bool,

    #[arg(long)]
    pub trailingstoploss: Option<Decimal>,

    #[arg(long)]
    pub trailingstoplosstrigger: Option<Decimal>,

    #[arg(long)]
    pub dynamictsl: bool,

    #[arg(long)]
    pub tslmultiplier: Option<Decimal>,

    #[arg(long)]
    pub tsltriggermultiplier: Option<Decimal>,

    #[arg(long)]
    pub tslmaxpcnt: Option<Decimal>,

    #[arg(long)]
    pub preventloss: bool,

    #[arg(long)]
    pub preventlosstrigger: Option<Decimal>,

    #[arg(long)]
    pub preventlossmargin: Option<Decimal>,

    #[arg(long)]
    pub trailingbuypcnt: Option<Decimal>,

    #[arg(long)]
    pub trailingimmediatebuy: bool,

    #[arg(long)]
    pub trailingbuyimmediatepcnt: Option<Decimal>,

    #[arg(long)]
    pub trailingsellpcnt: Option<Decimal>,

    #[arg(long)]
    pub trailingimmediatesell: bool,

    #[arg(long)]
    pub trailingsellimmediatepcnt: Option<Decimal>,

    #[arg(long)]
    pub trailingsellbailoutpcnt: Option<Decimal>,

    #[arg(long)]
    pub nobuynearhighpcnt: Option<Decimal>,

    #[arg(long)]
    pub buypercent: Option<Decimal>,

    #[arg(long)]
    pub sellpercent: Option<Decimal>,

    #[arg(long)]
    pub buymaxsize: Option<Decimal>,

    #[arg(long)]
    pub buyminsize: Option<Decimal>,

    #[arg(long)]
    pub smartswitch: Option<u8>,

    #[arg(long)]
    pub sellsmartswitch: Option<u8>,

    #[arg(long)]
    pub disablebullonly: bool,

    #[arg(long)]
    pub disablebuynearhigh: bool,

    #[arg(long)]
    pub disablebuymacd: bool,

    #[arg(long)]
    pub disablebuyema: bool,

    #[arg(long)]
    pub disablebuyobv: bool,

    #[arg(long)]
    pub disablebuyelderray: bool,

    #[arg(long)]
    pub disablefailsafefibonaccilow: bool,

    #[arg(long)]
    pub disablefailsafelowerpcnt: bool,

    #[arg(long)]
    pub disableprofitbankupperpcnt: bool,

    #[arg(long)]
    pub disableprofitbankreversal: bool,

    #[arg(long)]
    pub enablecustomstrategy: bool,

    #[arg(long)]
    pub selltriggeroverride: bool,

    #[arg(long)]
    pub autorestart: bool,

    #[arg(long)]
    pub websocket: bool,

    #[arg(long)]
    pub verbose: Option<u8>,

    #[arg(long)]
    pub disabletracker: bool,

    #[arg(long)]
    pub adjusttotalperiods: Option<usize>,

    #[arg(long)]
    pub disabletelegram: bool,

    #[arg(long)]
    pub recvwindow: Option<u64>,
}

impl Cli {
    /// Converts the set flags into an option overlay.
    pub(super) fn to_options(&self) -> RawOptions {
        let set = |b: bool| if b { Some(true) } else { None };
        RawOptions {
            market: self.market.clone(),
            granularity: self.granularity.clone(),
            live: self.live,
            sim: self.sim.clone(),
            sim_start_date: self.simstartdate.clone(),
            sim_end_date: self.simenddate.clone(),
            sim_result_only: set(self.simresultonly),
            sell_at_loss: self.sellatloss,
            sell_upper_pcnt: self.sellupperpcnt,
            sell_lower_pcnt: self.selllowerpcnt,
            nosell_min_pcnt: self.nosellminpcnt,
            nosell_max_pcnt: self.nosellmaxpcnt,
            sell_at_resistance: set(self.sellatresistance),
            trailing_stop_loss: self.trailingstoploss,
            trailing_stop_loss_trigger: self.trailingstoplosstrigger,
            dynamic_tsl: set(self.dynamictsl),
            tsl_multiplier: self.tslmultiplier,
            tsl_trigger_multiplier: self.tsltriggermultiplier,
            tsl_max_pcnt: self.tslmaxpcnt,
            prevent_loss: set(self.preventloss),
            prevent_loss_trigger: self.preventlosstrigger,
            prevent_loss_margin: self.preventlossmargin,
            trailing_buy_pcnt: self.trailingbuypcnt,
            trailing_immediate_buy: set(self.trailingimmediatebuy),
            trailing_buy_immediate_pcnt: self.trailingbuyimmediatepcnt,
            trailing_sell_pcnt: self.trailingsellpcnt,
            trailing_immediate_sell: set(self.trailingimmediatesell),
            trailing_sell_immediate_pcnt: self.trailingsellimmediatepcnt,
            trailing_sell_bailout_pcnt: self.trailingsellbailoutpcnt,
            no_buy_near_high_pcnt: self.nobuynearhighpcnt,
            buy_percent: self.buypercent,
            sell_percent: self.sellpercent,
            buy_max_size: self.buymaxsize,
            buy_min_size: self.buyminsize,
            smart_switch: self.smartswitch,
            sell_smart_switch: self.sellsmartswitch,
            disable_bull_only: set(self.disablebullonly),
            disable_buy_near_high: set(self.disablebuynearhigh),
            disable_buy_macd: set(self.disablebuymacd),
            disable_buy_ema: set(self.disablebuyema),
            disable_buy_obv: set(self.disablebuyobv),
            disable_buy_elder_ray: set(self.disablebuyelderray),
            disable_failsafe_fibonacci_low: set(self.disablefailsafefibonaccilow),
            disable_failsafe_lower_pcnt: set(self.disablefailsafelowerpcnt),
            disable_profit_bank_upper_pcnt: set(self.disableprofitbankupperpcnt),
            disable_profit_bank_reversal: set(self.disableprofitbankreversal),
            enable_custom_strategy: set(self.enablecustomstrategy),
            sell_trigger_override: set(self.selltriggeroverride),
            auto_restart: set(self.autorestart),
            websocket: set(self.websocket),
            verbose: self.verbose,
            disable_tracker: set(self.disabletracker),
            adjust_total_periods: self.adjusttotalperiods,
            disable_telegram: set(self.disabletelegram),
            recv_window: self.recvwindow,
            ..RawOptions::default()
        }
    }
}
