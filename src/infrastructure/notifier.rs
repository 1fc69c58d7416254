//! One-way notification sink.
//!
//! Telegram's sendMessage endpoint when a token and chat id are
//! configured, otherwise a no-op. Failures are swallowed: a notification
//! must never affect a trade decision or abort a tick.

use crate::config::Config;
use crate::infrastructure::http::HttpClientFactory;
use reqwest_middleware::ClientWithMiddleware;
use tracing::debug;

pub struct Notifier {
    client: ClientWithMiddleware,
    token: Option<String>,
    client_id: Option<String>,
    enabled: bool,
}

impl Notifier {
    pub fn from_config(config: &Config) -> Self {
        Self {
            client: HttpClientFactory::create_client(),
            token: config.telegram_token.clone(),
            client_id: config.telegram_client_id.clone(),
            enabled: !config.disable_telegram
                && config.telegram_token.is_some()
                && config.telegram_client_id.is_some(),
        }
    }

    /// Disabled sink for tests and simulations.
    pub fn disabled() -> Self {
        Self {
            client: HttpClientFactory::create_client(),
            token: None,
            client_id: None,
            enabled: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub async fn notify(&self, message: &str) {
        if !self.enabled {
            return;
        }
        let (Some(token), Some(client_id)) = (&self.token, &self.client_id) else {
            return;
        };

        let url = format!("https://api.telegram.org/bot{}/sendMessage", token);
        let payload = serde_json::json!({
            "chat_id": client_id,
            "text": message,
        });

        match self.client.post(&url).json(&payload).send().await {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => {
                debug!("Notifier: telegram rejected message ({})", response.status());
            }
            Err(e) => {
                debug!("Notifier: telegram send failed: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;

    #[test]
    fn test_disabled_without_credentials() {
        let notifier = Notifier::from_config(&test_config());
        assert!(!notifier.is_enabled());
    }

    #[test]
    fn test_disable_flag_wins_over_credentials() {
        let mut config = test_config();
        config.telegram_token = Some("token".to_string());
        config.telegram_client_id = Some("123".to_string());
        config.disable_telegram = true;
        assert!(!Notifier::from_config(&config).is_enabled());

        config.disable_telegram = false;
        assert!(Notifier::from_config(&config).is_enabled());
    }

    #[test]
    fn test_notify_on_disabled_sink_is_a_noop() {
        let notifier = Notifier::disabled();
        tokio_test::block_on(notifier.notify("ignored"));
    }
}
