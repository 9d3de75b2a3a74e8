use async_trait::async_trait;
use teloxide::prelude::*;
use tracing::warn;

use common::{Error, Notifier, Result};

/// Delivers alerts to every configured chat.
#[derive(Clone)]
pub struct TelegramNotifier {
    bot: Bot,
    chat_ids: Vec<ChatId>,
}

impl TelegramNotifier {
    pub fn new(bot: Bot, chat_ids: &[i64]) -> Self {
        Self {
            bot,
            chat_ids: chat_ids.iter().copied().map(ChatId).collect(),
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    /// A chat that cannot be reached is logged and skipped. Fails only when
    /// no chat received the message.
    async fn notify(&self, message: &str) -> Result<()> {
        let mut delivered = 0usize;
        for &chat_id in &self.chat_ids {
            match self.bot.send_message(chat_id, message).await {
                Ok(_) => delivered += 1,
                Err(e) => warn!(chat_id = ?chat_id, error = %e, "Failed to send Telegram alert"),
            }
        }
        if delivered == 0 && !self.chat_ids.is_empty() {
            return Err(Error::Notify(format!(
                "message reached none of {} chats",
                self.chat_ids.len()
            )));
        }
        Ok(())
    }
}
