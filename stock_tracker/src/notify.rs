//! Telegram chat notifications

use crate::error::{Result, TrackerError};

const TELEGRAM_API: &str = "https://api.telegram.org";

/// Sends messages to one chat through the Telegram bot API
#[derive(Debug, Clone)]
pub struct TelegramNotifier {
    client: reqwest::Client,
    token: String,
    chat_id: String,
    /// API root, overridable for tests
    pub base_url: String,
}

impl TelegramNotifier {
    pub fn new(token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            token: token.into(),
            chat_id: chat_id.into(),
            base_url: TELEGRAM_API.to_string(),
        }
    }

    /// Notifier from optional CLI credentials; both are required
    pub fn from_credentials(token: Option<&str>, chat_id: Option<&str>) -> Option<Self> {
        match (token, chat_id) {
            (Some(token), Some(chat_id)) if !token.is_empty() && !chat_id.is_empty() => {
                Some(Self::new(token, chat_id))
            }
            _ => None,
        }
    }

    pub async fn send(&self, text: &str) -> Result<()> {
        let url = format!("{}/bot{}/sendMessage", self.base_url, self.token);
        let response = self
            .client
            .post(&url)
            .form(&[("chat_id", self.chat_id.as_str()), ("text", text)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TrackerError::Notification(format!("HTTP {}: {}", status, body)));
        }

        log::info!("Sent notification to chat {}", self.chat_id);
        Ok(())
    }
}
