//! Telegram adapter (teloxide).
//!
//! Implements the `cdb-core` chat and subscription ports over the Telegram
//! Bot API, plus the polling router that feeds updates into the engine.

use std::path::Path;

use async_trait::async_trait;
use teloxide::{
    net::Download,
    prelude::*,
    types::{ChatMemberKind, InputFile, KeyboardButton, KeyboardMarkup, KeyboardRemove, ParseMode},
};
use tokio::time::sleep;
use tracing::warn;

pub mod router;

use cdb_core::{
    domain::{ChatId, UserId},
    keyboards::ReplyKeyboard,
    ports::{ChatPort, SubscriptionGate},
    Error, Result,
};

/// Outbound Telegram sender with a small bounded retry. Transient failures
/// get a fixed backoff; a 429 honors the server-provided delay instead.
#[derive(Clone)]
pub struct TelegramChat {
    bot: Bot,
    retries: u32,
    backoff: std::time::Duration,
}

impl TelegramChat {
    pub fn new(bot: Bot, retries: u32, backoff: std::time::Duration) -> Self {
        Self {
            bot,
            retries: retries.max(1),
            backoff,
        }
    }

    fn tg_chat(chat: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat.0)
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::Transport(format!("telegram error: {e}"))
    }

    async fn with_retry<T, Fut>(&self, mut op: impl FnMut() -> Fut) -> Result<T>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, teloxide::RequestError>>,
        Fut::IntoFuture: Send,
    {
        let mut attempt = 0u32;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => {
                    attempt += 1;
                    if attempt >= self.retries {
                        return Err(Self::map_err(e));
                    }
                    let delay = match &e {
                        teloxide::RequestError::RetryAfter(d) => *d,
                        _ => self.backoff,
                    };
                    warn!(error = %e, attempt, "telegram request failed, retrying");
                    sleep(delay).await;
                }
            }
        }
    }
}

fn keyboard_markup(kb: &ReplyKeyboard) -> KeyboardMarkup {
    let rows: Vec<Vec<KeyboardButton>> = kb
        .rows
        .iter()
        .map(|row| row.iter().map(|l| KeyboardButton::new(l.clone())).collect())
        .collect();
    KeyboardMarkup::new(rows).resize_keyboard(true)
}

#[async_trait]
impl ChatPort for TelegramChat {
    async fn send_text(&self, chat: ChatId, text: &str) -> Result<()> {
        self.with_retry(|| {
            self.bot
                .send_message(Self::tg_chat(chat), text.to_string())
                .parse_mode(ParseMode::Html)
        })
        .await?;
        Ok(())
    }

    async fn send_text_kb(
        &self,
        chat: ChatId,
        text: &str,
        keyboard: &ReplyKeyboard,
    ) -> Result<()> {
        let markup = keyboard_markup(keyboard);
        self.with_retry(|| {
            self.bot
                .send_message(Self::tg_chat(chat), text.to_string())
                .parse_mode(ParseMode::Html)
                .reply_markup(markup.clone())
        })
        .await?;
        Ok(())
    }

    async fn send_text_remove_kb(&self, chat: ChatId, text: &str) -> Result<()> {
        self.with_retry(|| {
            self.bot
                .send_message(Self::tg_chat(chat), text.to_string())
                .parse_mode(ParseMode::Html)
                .reply_markup(KeyboardRemove::new())
        })
        .await?;
        Ok(())
    }

    async fn send_photo(&self, chat: ChatId, path: &Path, caption: &str) -> Result<()> {
        let photo = InputFile::file(path.to_path_buf());
        self.with_retry(|| {
            self.bot
                .send_photo(Self::tg_chat(chat), photo.clone())
                .caption(caption.to_string())
                .parse_mode(ParseMode::Html)
        })
        .await?;
        Ok(())
    }

    async fn send_document(
        &self,
        chat: ChatId,
        path: &Path,
        caption: &str,
        filename: &str,
    ) -> Result<()> {
        let document = InputFile::file(path.to_path_buf()).file_name(filename.to_string());
        self.with_retry(|| {
            self.bot
                .send_document(Self::tg_chat(chat), document.clone())
                .caption(caption.to_string())
                .parse_mode(ParseMode::Html)
        })
        .await?;
        Ok(())
    }

    async fn download_file(&self, file_id: &str, dest: &Path) -> Result<()> {
        let file = self
            .with_retry(|| self.bot.get_file(file_id.to_string()))
            .await?;
        let mut dst = tokio::fs::File::create(dest).await?;
        self.bot
            .download_file(&file.path, &mut dst)
            .await
            .map_err(|e| Error::Transport(format!("download failed: {e}")))?;
        Ok(())
    }
}

/// Channel-membership probe. Any API failure reads as "not a member".
pub struct ChannelGate {
    bot: Bot,
    channel_id: i64,
}

impl ChannelGate {
    pub fn new(bot: Bot, channel_id: i64) -> Self {
        Self { bot, channel_id }
    }
}

#[async_trait]
impl SubscriptionGate for ChannelGate {
    async fn is_member(&self, user: UserId) -> bool {
        if user.0 < 0 {
            return false;
        }
        let member = self
            .bot
            .get_chat_member(
                teloxide::types::ChatId(self.channel_id),
                teloxide::types::UserId(user.0 as u64),
            )
            .await;
        match member {
            Ok(m) => matches!(
                m.kind,
                ChatMemberKind::Owner(_) | ChatMemberKind::Administrator(_) | ChatMemberKind::Member
            ),
            Err(e) => {
                warn!(user = user.0, error = %e, "membership probe failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyboard_rows_map_one_to_one() {
        let kb = ReplyKeyboard::new(vec![vec!["a", "b"], vec!["c"]]);
        let markup = keyboard_markup(&kb);
        assert_eq!(markup.keyboard.len(), 2);
        assert_eq!(markup.keyboard[0].len(), 2);
        assert_eq!(markup.keyboard[0][0].text, "a");
        assert_eq!(markup.keyboard[1][0].text, "c");
        assert_eq!(markup.resize_keyboard, Some(true));
    }
}
