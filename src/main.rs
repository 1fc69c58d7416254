use clap::Parser;
use coinbot::application::bot::Bot;
use coinbot::application::simulator::Simulator;
use coinbot::config::{Cli, Config};
use coinbot::infrastructure::exchange::build_exchange;
use tracing::{Level, error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(Level::INFO.into()),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = match Config::load(&cli.config, &cli) {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    info!(
        "Starting coinbot for {} on {} ({}, {})",
        config.market,
        config.exchange,
        config.granularity,
        if config.live {
            "live"
        } else if config.is_sim() {
            "simulation"
        } else {
            "test"
        }
    );

    let exchange = build_exchange(&config);
    let is_sim = config.is_sim();
    let mut bot = Bot::new(config, exchange.clone());
    bot.seed_position().await?;

    let run = async {
        if is_sim {
            Simulator::new(bot, exchange).run().await
        } else {
            bot.run().await
        }
    };

    tokio::select! {
        result = run => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
        }
    }

    Ok(())
}
