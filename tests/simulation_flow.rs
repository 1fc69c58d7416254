//! End-to-end simulation runs through the real control loop with the
//! offline exchange and a synthetic candle window.

use chrono::{Duration, TimeZone, Utc};
use coinbot::application::bot::Bot;
use coinbot::config::{Cli, Config};
use coinbot::domain::candle::{Candle, CandleSeries};
use coinbot::domain::granularity::Granularity;
use coinbot::domain::order::OrderSide;
use coinbot::domain::position::LastAction;
use coinbot::infrastructure::exchange::{DummyExchange, Exchange};
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal_macros::dec;
use std::io::Write;
use std::sync::Arc;

fn sim_config(extra: &str) -> Config {
    let mut file = tempfile::NamedTempFile::new().expect("temp config");
    write!(
        file,
        r#"{{"dummy": {{"config": {{
            "market": "BTC-USD",
            "granularity": "1h",
            "sim": "fast",
            "disabletelegram": true,
            "disabletracker": true{}{}
        }}}}}}"#,
        if extra.is_empty() { "" } else { "," },
        extra
    )
    .unwrap();

    Config::load(file.path().to_str().unwrap(), &Cli::default()).expect("config loads")
}

fn series_from_closes(closes: &[f64]) -> CandleSeries {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let candles = closes
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let close = Decimal::from_f64(*c).unwrap();
            Candle {
                ts: start + Duration::hours(i as i64),
                market: "BTC-USD".to_string(),
                granularity: Granularity::OneHour,
                open: close,
                high: close + Decimal::ONE,
                low: close - Decimal::ONE,
                close,
                volume: Decimal::from(100),
            }
        })
        .collect();
    CandleSeries::from_candles(candles)
}

async fn run_sim(config: Config, closes: &[f64]) -> Bot {
    let exchange: Arc<dyn Exchange> = Arc::new(DummyExchange::new());
    let mut bot = Bot::new(config, exchange);
    bot.set_simulation_data(series_from_closes(closes));
    bot.run().await.expect("simulation completes");
    bot
}

#[tokio::test]
async fn uptrend_simulation_balances_buys_and_sells() {
    // linear rise from 100 to 200: one buy near the start, the window
    // close books the sell
    let closes: Vec<f64> = (0..300).map(|i| 100.0 + (i as f64) * 100.0 / 299.0).collect();
    let bot = run_sim(sim_config(""), &closes).await;

    assert_eq!(bot.position.buy_count, 1, "One entry on the EMA crossover");
    assert_eq!(
        bot.position.buy_count, bot.position.sell_count,
        "The summary closes the open trade"
    );
    assert_eq!(bot.position.last_action, LastAction::Sell);

    // margin identity: ((P2/P1) * (1-f)^2 - 1) * 100 against the recorded
    // buy price and the window's final close
    let orders = bot.account.order_log();
    assert_eq!(orders.len(), 1, "Only the buy went through the account");
    assert_eq!(orders[0].action, OrderSide::Buy);

    let p1 = orders[0].price.to_f64().unwrap();
    let p2 = 200.0;
    let fee = 0.005;
    let expected = ((p2 / p1) * (1.0 - fee) * (1.0 - fee) - 1.0) * 100.0;

    let first = bot.position.first_buy_size.to_f64().unwrap();
    let last = bot.position.last_sell_size.to_f64().unwrap();
    let margin = (last - first) / first * 100.0;

    assert!(
        (margin - expected).abs() < 1e-6,
        "margin {} should match the fee identity {}",
        margin,
        expected
    );
    assert!(margin > 90.0, "A near-doubling minus fees: {}", margin);
}

#[tokio::test]
async fn trailing_stop_loss_exits_during_the_run() {
    // decline, rally, then a deep fall: the stop arms on the rally and
    // fires on the way down, well before the window ends
    let mut closes = Vec::with_capacity(300);
    for i in 0..60 {
        closes.push(110.0 - (i as f64) * 0.1); // 110 -> 104.1
    }
    for i in 0..60 {
        closes.push(104.0 + (i as f64) * 0.2); // 104 -> 115.8
    }
    for i in 0..60 {
        closes.push(116.0 - (i as f64) * 0.3); // 116 -> 98.3
    }
    while closes.len() < 300 {
        closes.push(98.0);
    }

    let config = sim_config(r#""trailingstoploss": -3, "trailingstoplosstrigger": 3"#);
    let bot = run_sim(config, &closes).await;

    assert_eq!(bot.position.buy_count, 1);
    assert_eq!(bot.position.sell_count, 1);
    assert_eq!(bot.position.last_action, LastAction::Sell);

    let orders = bot.account.order_log();
    assert_eq!(orders.len(), 2, "Buy and sell both went through the account");
    assert_eq!(orders[1].action, OrderSide::Sell);
    assert!(
        orders[1].price > dec!(100),
        "The stop sold on the way down, not at the bottom: {}",
        orders[1].price
    );
    assert!(
        !bot.position.is_long(),
        "No position remains after the stop fired"
    );
}

#[tokio::test]
async fn no_sell_at_loss_keeps_the_position_open() {
    // rise enough to buy, then collapse: with sellatloss off and no
    // prevent-loss, nothing may sell at negative margin
    let mut closes = Vec::with_capacity(300);
    for i in 0..60 {
        closes.push(110.0 - (i as f64) * 0.1); // 110 -> 104.2
    }
    for i in 0..30 {
        closes.push(104.0 + (i as f64) * 0.2); // 104 -> 109.8
    }
    for i in 0..40 {
        closes.push(110.0 - (i as f64) * 2.0); // a crash: 110 -> 32
    }
    while closes.len() < 300 {
        closes.push(30.0);
    }

    let config = sim_config(r#""sellatloss": 0"#);
    let bot = run_sim(config, &closes).await;

    assert_eq!(bot.position.buy_count, 1);
    assert_eq!(
        bot.position.sell_count, 0,
        "The crash may not be sold into with sellatloss disabled"
    );
    assert!(bot.position.is_long(), "The trade stays open to the end");
}

#[tokio::test]
async fn simulation_is_deterministic() {
    let closes: Vec<f64> = (0..300)
        .map(|i| 100.0 + 10.0 * ((i as f64) / 25.0).sin())
        .collect();

    let a = run_sim(sim_config(""), &closes).await;
    let b = run_sim(sim_config(""), &closes).await;

    assert_eq!(a.position.buy_count, b.position.buy_count);
    assert_eq!(a.position.sell_count, b.position.sell_count);
    assert_eq!(a.position.buy_sum, b.position.buy_sum);
    assert_eq!(a.position.sell_sum, b.position.sell_sum);
}
