//! Cross-process control files under `telegram_data/`.
//!
//! The external Telegram bot reads the per-market snapshot and writes
//! manual commands into the same file's `botcontrol` section. Writes
//! replace the whole file via a temp file and rename; reads retry on
//! conflict. These files are diagnostics plus manual-override input and
//! are never on the critical path of a trade.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

const READ_RETRIES: usize = 5;
const RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// Manual override requested through the control file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManualCommand {
    Buy,
    Sell,
    Pause,
}

/// Per-market snapshot published for the external bot.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MarketSnapshot {
    pub exchange: String,
    pub market: String,
    pub granularity: String,
    pub price: Decimal,
    pub margin: Decimal,
    pub last_action: String,
    pub action: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct BotControl {
    #[serde(default)]
    manualbuy: bool,
    #[serde(default)]
    manualsell: bool,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct ControlFile {
    #[serde(flatten)]
    snapshot: MarketSnapshot,
    #[serde(default)]
    botcontrol: BotControl,
}

pub struct ControlFiles {
    dir: PathBuf,
}

impl ControlFiles {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn market_path(&self, market: &str) -> PathBuf {
        self.dir.join(format!("{}.json", market))
    }

    /// Publishes the market snapshot, preserving any pending botcontrol
    /// section. Failures are logged and swallowed.
    pub async fn write_snapshot(&self, market: &str, snapshot: MarketSnapshot) {
        if let Err(e) = std::fs::create_dir_all(&self.dir) {
            warn!("ControlFiles: unable to create {}: {}", self.dir.display(), e);
            return;
        }

        let path = self.market_path(market);
        let botcontrol = self
            .read_file(&path)
            .await
            .map(|f| f.botcontrol)
            .unwrap_or_default();

        let contents = ControlFile { snapshot, botcontrol };
        if let Err(e) = self.replace_file(&path, &contents) {
            warn!("ControlFiles: unable to write {}: {}", path.display(), e);
        }
    }

    /// Reads and consumes a pending manual command. A pause keeps the
    /// status in place; manual buy/sell flags are cleared once read.
    pub async fn poll_command(&self, market: &str) -> Option<ManualCommand> {
        let path = self.market_path(market);
        let mut contents = self.read_file(&path).await?;

        if contents.botcontrol.status.as_deref() == Some("paused") {
            return Some(ManualCommand::Pause);
        }

        let command = if contents.botcontrol.manualbuy {
            contents.botcontrol.manualbuy = false;
            Some(ManualCommand::Buy)
        } else if contents.botcontrol.manualsell {
            contents.botcontrol.manualsell = false;
            Some(ManualCommand::Sell)
        } else {
            None
        };

        if command.is_some()
            && let Err(e) = self.replace_file(&path, &contents)
        {
            warn!("ControlFiles: unable to clear command flags: {}", e);
        }
        command
    }

    async fn read_file(&self, path: &Path) -> Option<ControlFile> {
        for attempt in 0..READ_RETRIES {
            match std::fs::read_to_string(path) {
                Ok(text) => match serde_json::from_str(&text) {
                    Ok(parsed) => return Some(parsed),
                    Err(e) => {
                        // mid-replace read or an external writer in flight
                        debug!(
                            "ControlFiles: parse failure on {} (attempt {}): {}",
                            path.display(),
                            attempt + 1,
                            e
                        );
                    }
                },
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
                Err(e) => {
                    debug!(
                        "ControlFiles: read failure on {} (attempt {}): {}",
                        path.display(),
                        attempt + 1,
                        e
                    );
                }
            }
            tokio::time::sleep(RETRY_BACKOFF).await;
        }
        None
    }

    fn replace_file(&self, path: &Path, contents: &ControlFile) -> std::io::Result<()> {
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(contents)?)?;
        std::fs::rename(&tmp, path)
    }

    /// Appends a trade record to the aggregate `data.json` log.
    pub async fn append_trade(&self, entry: TradeLogEntry) {
        if let Err(e) = std::fs::create_dir_all(&self.dir) {
            warn!("ControlFiles: unable to create {}: {}", self.dir.display(), e);
            return;
        }

        let path = self.dir.join("data.json");
        let mut log: TradeLog = std::fs::read_to_string(&path)
            .ok()
            .and_then(|text| serde_json::from_str(&text).ok())
            .unwrap_or_default();
        log.trades.push(entry);

        let tmp = path.with_extension("json.tmp");
        let result = serde_json::to_string_pretty(&log)
            .map_err(std::io::Error::other)
            .and_then(|text| std::fs::write(&tmp, text))
            .and_then(|_| std::fs::rename(&tmp, &path));
        if let Err(e) = result {
            warn!("ControlFiles: unable to append to data.json: {}", e);
        }
    }
}

/// One closed trade in the aggregate log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeLogEntry {
    pub market: String,
    pub action: String,
    pub price: Decimal,
    pub margin: Decimal,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct TradeLog {
    #[serde(default)]
    trades: Vec<TradeLogEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn snapshot() -> MarketSnapshot {
        MarketSnapshot {
            exchange: "binance".to_string(),
            market: "BTC-USDT".to_string(),
            granularity: "1h".to_string(),
            price: dec!(100),
            margin: dec!(1.5),
            last_action: "BUY".to_string(),
            action: "WAIT".to_string(),
            timestamp: "2024-01-01 00:00:00".to_string(),
        }
    }

    #[tokio::test]
    async fn test_snapshot_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let files = ControlFiles::new(dir.path());

        files.write_snapshot("BTC-USDT", snapshot()).await;

        let text =
            std::fs::read_to_string(dir.path().join("BTC-USDT.json")).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["market"], "BTC-USDT");
        assert_eq!(parsed["last_action"], "BUY");
    }

    #[tokio::test]
    async fn test_manual_buy_is_consumed_once() {
        let dir = tempfile::tempdir().unwrap();
        let files = ControlFiles::new(dir.path());
        files.write_snapshot("BTC-USDT", snapshot()).await;

        // external bot raises the flag
        let path = dir.path().join("BTC-USDT.json");
        let mut value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        value["botcontrol"]["manualbuy"] = serde_json::Value::Bool(true);
        std::fs::write(&path, value.to_string()).unwrap();

        assert_eq!(
            files.poll_command("BTC-USDT").await,
            Some(ManualCommand::Buy)
        );
        assert_eq!(files.poll_command("BTC-USDT").await, None, "Flag cleared");
    }

    #[tokio::test]
    async fn test_pause_persists() {
        let dir = tempfile::tempdir().unwrap();
        let files = ControlFiles::new(dir.path());
        files.write_snapshot("BTC-USDT", snapshot()).await;

        let path = dir.path().join("BTC-USDT.json");
        let mut value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        value["botcontrol"]["status"] = serde_json::Value::String("paused".to_string());
        std::fs::write(&path, value.to_string()).unwrap();

        assert_eq!(
            files.poll_command("BTC-USDT").await,
            Some(ManualCommand::Pause)
        );
        assert_eq!(
            files.poll_command("BTC-USDT").await,
            Some(ManualCommand::Pause),
            "Pause is a state, not a one-shot command"
        );
    }

    #[tokio::test]
    async fn test_trade_log_accumulates() {
        let dir = tempfile::tempdir().unwrap();
        let files = ControlFiles::new(dir.path());

        for price in [dec!(100), dec!(110)] {
            files
                .append_trade(TradeLogEntry {
                    market: "BTC-USDT".to_string(),
                    action: "SELL".to_string(),
                    price,
                    margin: dec!(2.5),
                    timestamp: "2024-01-01T00:00:00Z".to_string(),
                })
                .await;
        }

        let text = std::fs::read_to_string(dir.path().join("data.json")).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["trades"].as_array().unwrap().len(), 2);
        assert_eq!(parsed["trades"][1]["price"], "110");
    }

    #[tokio::test]
    async fn test_missing_file_yields_no_command() {
        let dir = tempfile::tempdir().unwrap();
        let files = ControlFiles::new(dir.path());
        assert_eq!(files.poll_command("BTC-USDT").await, None);
    }

    #[tokio::test]
    async fn test_write_preserves_pending_control() {
        let dir = tempfile::tempdir().unwrap();
        let files = ControlFiles::new(dir.path());
        files.write_snapshot("BTC-USDT", snapshot()).await;

        let path = dir.path().join("BTC-USDT.json");
        let mut value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        value["botcontrol"]["manualsell"] = serde_json::Value::Bool(true);
        std::fs::write(&path, value.to_string()).unwrap();

        // a snapshot refresh must not clobber the raised flag
        files.write_snapshot("BTC-USDT", snapshot()).await;
        assert_eq!(
            files.poll_command("BTC-USDT").await,
            Some(ManualCommand::Sell)
        );
    }
}
