//! Telegram delivery of report notices.

use anyhow::{Context, Result};
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::Recipient;
use tracing::debug;

use super::Notifier;

/// Parse the configured report chat: a numeric chat id, or a public
/// channel username such as `@my_calls`.
pub fn parse_recipient(raw: &str) -> Recipient {
    let raw = raw.trim();
    match raw.parse::<i64>() {
        Ok(id) => Recipient::Id(ChatId(id)),
        Err(_) => {
            let name = if raw.starts_with('@') {
                raw.to_string()
            } else {
                format!("@{raw}")
            };
            Recipient::ChannelUsername(name)
        }
    }
}

/// Posts notices to one Telegram chat.
pub struct TelegramNotifier {
    bot: Bot,
    recipient: Recipient,
}

impl TelegramNotifier {
    pub fn new(bot: Bot, recipient: Recipient) -> Self {
        Self { bot, recipient }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, text: &str) -> Result<()> {
        self.bot
            .send_message(self.recipient.clone(), text)
            .await
            .context("Failed to send Telegram message")?;
        debug!(text, "Telegram notice sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_numeric_chat() {
        assert_eq!(
            parse_recipient("-1001234567890"),
            Recipient::Id(ChatId(-1001234567890))
        );
    }

    #[test]
    fn test_parse_channel_username() {
        assert_eq!(
            parse_recipient("@calls_report"),
            Recipient::ChannelUsername("@calls_report".to_string())
        );
        assert_eq!(
            parse_recipient(" calls_report "),
            Recipient::ChannelUsername("@calls_report".to_string())
        );
    }
}
