use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;
use teloxide::prelude::*;
use teloxide::types::{
    InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup, KeyboardRemove,
    ReplyMarkup,
};

/// Pause between messages of a broadcast; Telegram allows about 30 per second.
pub const BROADCAST_SPACING: Duration = Duration::from_millis(35);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Keyboard {
    /// Leave whatever keyboard the chat shows.
    Keep,
    /// Reply keyboard, rows of button labels.
    Menu(Vec<Vec<String>>),
    Remove,
    /// Rows of (label, callback data).
    Inline(Vec<Vec<(String, String)>>),
}

impl Keyboard {
    pub fn inline_column(buttons: impl IntoIterator<Item = (String, String)>) -> Self {
        Keyboard::Inline(buttons.into_iter().map(|button| vec![button]).collect())
    }
}

#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send(&self, chat_id: i64, text: &str, keyboard: Keyboard) -> Result<()>;
    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> Result<()>;
}

pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

fn markup(keyboard: Keyboard) -> Option<ReplyMarkup> {
    match keyboard {
        Keyboard::Keep => None,
        Keyboard::Menu(rows) => Some(ReplyMarkup::Keyboard(KeyboardMarkup::new(
            rows.into_iter()
                .map(|row| row.into_iter().map(KeyboardButton::new).collect::<Vec<_>>()),
        ))),
        Keyboard::Remove => Some(ReplyMarkup::KeyboardRemove(KeyboardRemove::new())),
        Keyboard::Inline(rows) => Some(ReplyMarkup::InlineKeyboard(InlineKeyboardMarkup::new(
            rows.into_iter().map(|row| {
                row.into_iter()
                    .map(|(label, data)| InlineKeyboardButton::callback(label, data))
                    .collect::<Vec<_>>()
            }),
        ))),
    }
}

#[async_trait]
impl Messenger for TelegramMessenger {
    async fn send(&self, chat_id: i64, text: &str, keyboard: Keyboard) -> Result<()> {
        let request = self.bot.send_message(ChatId(chat_id), text);
        match markup(keyboard) {
            Some(markup) => request.reply_markup(markup).await?,
            None => request.await?,
        };
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> Result<()> {
        let request = self.bot.answer_callback_query(callback_id);
        match text {
            Some(text) => request.text(text).await?,
            None => request.await?,
        };
        Ok(())
    }
}

/// Sends `text` to every chat in turn; failures are logged and counted.
/// Returns (sent, failed).
pub async fn broadcast(
    messenger: &dyn Messenger,
    recipients: &[i64],
    text: &str,
    keyboard: Keyboard,
) -> (usize, usize) {
    let mut success_count = 0;
    let mut error_count = 0;

    for chat_id in recipients {
        match messenger.send(*chat_id, text, keyboard.clone()).await {
            Ok(()) => success_count += 1,
            Err(e) => {
                error_count += 1;
                tracing::error!("Failed to send message to {}: {}", chat_id, e);
            }
        }
        tokio::time::sleep(BROADCAST_SPACING).await;
    }

    (success_count, error_count)
}
