//! Polling router: maps Telegram updates onto engine events and serializes
//! same-chat handling with per-chat locks.

use std::{collections::HashMap, sync::Arc};

use teloxide::{dispatching::Dispatcher, dptree, prelude::*, types::Message};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::info;

use cdb_core::{
    config::Config,
    domain::{ChatId, UserId},
    engine::{Engine, Event, Incoming},
    store::CatalogStore,
};

use crate::{ChannelGate, TelegramChat};

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub chat_locks: Arc<ChatLocks>,
}

/// One mutex per chat id. Events from the same chat run strictly in order;
/// different chats proceed concurrently.
#[derive(Default)]
pub struct ChatLocks {
    inner: Mutex<HashMap<i64, Arc<Mutex<()>>>>,
}

impl ChatLocks {
    pub async fn lock_chat(&self, chat_id: i64) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            map.entry(chat_id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

pub async fn run_polling(cfg: Arc<Config>, store: Arc<dyn CatalogStore>) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.bot_token.clone());

    if let Ok(me) = bot.get_me().await {
        info!(bot = %me.username(), "bot started");
    }

    let chat = Arc::new(TelegramChat::new(
        bot.clone(),
        cfg.send_retries,
        cfg.send_retry_backoff,
    ));
    let gate = Arc::new(ChannelGate::new(bot.clone(), cfg.channel_id));
    let engine = Arc::new(Engine::new(cfg, store, chat, gate));
    let shutdown = engine.shutdown_token();

    let state = Arc::new(AppState {
        engine,
        chat_locks: Arc::new(ChatLocks::default()),
    });

    let handler = dptree::entry().branch(Update::filter_message().endpoint(handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    // Stops an in-flight broadcast once polling has wound down.
    shutdown.cancel();
    Ok(())
}

async fn handle_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(from) = msg.from() else {
        return Ok(());
    };
    let Some(event) = event_of(&msg) else {
        return Ok(());
    };

    let incoming = Incoming {
        chat: ChatId(msg.chat.id.0),
        user: UserId(from.id.0 as i64),
        username: from.username.clone(),
        first_name: Some(from.first_name.clone()),
        last_name: from.last_name.clone(),
        event,
    };

    let _guard = state.chat_locks.lock_chat(msg.chat.id.0).await;
    state.engine.handle(incoming).await;
    Ok(())
}

fn event_of(msg: &Message) -> Option<Event> {
    if let Some(text) = msg.text() {
        return Some(map_text(text));
    }
    // Largest photo rendition carries the same file content.
    if let Some(best) = msg.photo().and_then(|sizes| sizes.last()) {
        return Some(Event::Photo {
            file_id: best.file.id.clone(),
        });
    }
    if let Some(doc) = msg.document() {
        return Some(Event::Document {
            file_id: doc.file.id.clone(),
            file_name: doc.file_name.clone(),
        });
    }
    None
}

/// Commands may arrive as `/start@BotName args`; anything that is not a
/// known command is plain conversation text.
fn map_text(text: &str) -> Event {
    let command = text
        .split_whitespace()
        .next()
        .unwrap_or("")
        .split('@')
        .next()
        .unwrap_or("");
    match command {
        "/start" => Event::Start,
        "/cancel" => Event::Cancel,
        _ => Event::Text(text.to_string()),
    }
}
