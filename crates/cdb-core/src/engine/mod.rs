//! The conversation engine.
//!
//! Every inbound event passes through the admission pipeline (rate limit,
//! ban check, subscription probe) before the state-specific transition runs.
//! Transition handlers mutate a *clone* of the stored session which is only
//! written back on success, so a failed handler leaves the conversation
//! where it was.

mod admin;
mod auth;
mod participant;
pub mod state;
mod upload;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::{
    broadcast::BroadcastDispatcher,
    config::Config,
    domain::{ChatId, UserId},
    formatting::paginate,
    keyboards::{admin_menu, main_menu, subscribe_keyboard},
    ports::{ChatPort, SubscriptionGate},
    ratelimit::RateLimiter,
    session::{ChatSession, Scratch, SessionRegistry},
    store::CatalogStore,
    Result,
};

use state::State;

pub(crate) const NOTICE_RATE_LIMITED: &str = "⏳ Too many messages! Please wait 10 seconds.";
pub(crate) const NOTICE_BANNED: &str = "🚫 You are banned from using this bot.";
pub(crate) const NOTICE_CHOOSE: &str = "❌ Please choose an option from the menu.";
pub(crate) const NOTICE_APOLOGY: &str = "😔 Something went wrong. Please try again.";
pub(crate) const NOTICE_EXPIRED: &str = "⚠️ Session expired. Send /start to begin again.";
pub(crate) const NOTICE_MASTER_ONLY: &str = "❌ Only master admins can do that.";

const WELCOME: &str = "👋 Welcome! Choose an action from the menu below:";

/// One inbound chat event, normalized by the transport adapter.
#[derive(Clone, Debug)]
pub struct Incoming {
    pub chat: ChatId,
    pub user: UserId,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub event: Event,
}

#[derive(Clone, Debug)]
pub enum Event {
    Start,
    Cancel,
    Text(String),
    Photo {
        file_id: String,
    },
    Document {
        file_id: String,
        file_name: Option<String>,
    },
}

impl Incoming {
    pub(crate) fn text(&self) -> Option<&str> {
        match &self.event {
            Event::Text(t) => Some(t.as_str()),
            _ => None,
        }
    }
}

/// Verdict of a transition handler about the session afterwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Flow {
    /// Write the mutated session back.
    Continue,
    /// Destroy the session; the chat starts over with `/start`.
    End,
}

pub struct Engine {
    cfg: Arc<Config>,
    store: Arc<dyn CatalogStore>,
    chat: Arc<dyn ChatPort>,
    gate: Arc<dyn SubscriptionGate>,
    registry: Mutex<SessionRegistry>,
    limiter: Mutex<RateLimiter>,
    broadcaster: BroadcastDispatcher,
    shutdown: CancellationToken,
}

impl Engine {
    pub fn new(
        cfg: Arc<Config>,
        store: Arc<dyn CatalogStore>,
        chat: Arc<dyn ChatPort>,
        gate: Arc<dyn SubscriptionGate>,
    ) -> Self {
        let limiter = RateLimiter::new(cfg.rate_limit_burst, cfg.rate_limit_block);
        let broadcaster = BroadcastDispatcher::new(chat.clone(), cfg.broadcast_delay);
        Self {
            cfg,
            store,
            chat,
            gate,
            registry: Mutex::new(SessionRegistry::default()),
            limiter: Mutex::new(limiter),
            broadcaster,
            shutdown: CancellationToken::new(),
        }
    }

    /// Token that aborts an in-flight broadcast when the process shuts down.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Top-level entry point. Never fails: handler errors are logged, the
    /// chat gets a generic apology, and the stored session is untouched.
    pub async fn handle(&self, incoming: Incoming) {
        if let Err(e) = self.process(&incoming).await {
            error!(chat = incoming.chat.0, error = %e, "event handling failed");
            let _ = self.chat.send_text(incoming.chat, NOTICE_APOLOGY).await;
        }
    }

    async fn process(&self, cx: &Incoming) -> Result<()> {
        if !self.limiter.lock().await.allow(cx.user) {
            self.chat.send_text(cx.chat, NOTICE_RATE_LIMITED).await?;
            return Ok(());
        }

        match &cx.event {
            Event::Start => return self.on_start(cx).await,
            Event::Cancel => return self.on_cancel(cx).await,
            _ => {}
        }

        // First inbound event for an unknown chat lands in the steady
        // participant state; admission below still applies.
        let mut session = { self.registry.lock().await.session(cx.chat) }
            .unwrap_or_else(|| ChatSession::new(State::ParticipantCode));

        if !session.state.is_admin_area() {
            if self.store.is_banned(cx.user.0)? {
                {
                    let mut reg = self.registry.lock().await;
                    reg.clear_session(cx.chat);
                    reg.unbind(cx.chat);
                }
                self.chat.send_text_remove_kb(cx.chat, NOTICE_BANNED).await?;
                return Ok(());
            }

            if session.state.subscription_gated() && !self.gate.is_member(cx.user).await {
                session.state = State::SubscriptionCheck;
                self.send_subscribe_prompt(cx.chat).await?;
                self.registry.lock().await.put(cx.chat, session);
                return Ok(());
            }
        }

        match self.dispatch(cx, &mut session).await? {
            Flow::Continue => self.registry.lock().await.put(cx.chat, session),
            Flow::End => self.registry.lock().await.clear_session(cx.chat),
        }
        Ok(())
    }

    async fn dispatch(&self, cx: &Incoming, s: &mut ChatSession) -> Result<Flow> {
        match s.state {
            State::SubscriptionCheck => self.on_subscription_check(cx, s).await,
            State::ParticipantCode => self.on_participant(cx, s).await,
            State::ProjectsMenu => self.on_projects_menu(cx, s).await,
            State::PacksMenu => self.on_packs_menu(cx, s).await,
            State::Login => self.on_login(cx, s).await,
            State::Password => self.on_password(cx, s).await,
            State::AdminMenu => self.on_admin_menu(cx, s).await,
            State::NewPassword => self.on_new_password(cx, s).await,
            State::UploadCategory => self.on_upload_category(cx, s).await,
            State::UploadPhoto => self.on_upload_photo(cx, s).await,
            State::UploadCaption => self.on_upload_caption(cx, s).await,
            State::UploadCustomName => self.on_upload_custom_name(cx, s).await,
            State::AdminManagement => self.on_admin_management(cx, s).await,
            State::AddAdminName => self.on_add_admin_name(cx, s).await,
            State::AddAdminLogin => self.on_add_admin_login(cx, s).await,
            State::AddAdminPassword => self.on_add_admin_password(cx, s).await,
            State::DelAdmin => self.on_del_admin(cx, s).await,
            State::CategoryManagement => self.on_category_management(cx, s).await,
            State::AddCategory => self.on_add_category(cx, s).await,
            State::DelCategory => self.on_del_category(cx, s).await,
            State::BanManagement => self.on_ban_management(cx, s).await,
            State::BanUserId => self.on_ban_user_id(cx, s).await,
            State::UnbanUserId => self.on_unban_user_id(cx, s).await,
            State::CameraCodesMenu => self.on_camera_codes_menu(cx, s).await,
            State::DeleteCamera => self.on_delete_camera(cx, s).await,
            State::ProjectManagement => self.on_project_management(cx, s).await,
            State::UploadProjectFile => self.on_upload_project_file(cx, s).await,
            State::UploadProjectCaption => self.on_upload_project_caption(cx, s).await,
            State::UploadProjectName => self.on_upload_project_name(cx, s).await,
            State::DeleteProject => self.on_delete_project(cx, s).await,
            State::PackManagement => self.on_pack_management(cx, s).await,
            State::UploadPackFile => self.on_upload_pack_file(cx, s).await,
            State::UploadPackCaption => self.on_upload_pack_caption(cx, s).await,
            State::UploadPackName => self.on_upload_pack_name(cx, s).await,
            State::DeletePack => self.on_delete_pack(cx, s).await,
            State::BroadcastMessage => self.on_broadcast_message(cx, s).await,
        }
    }

    /// `/start` resets everything for the chat, registers the user, then runs
    /// onboarding: ban check, subscription probe, main menu.
    async fn on_start(&self, cx: &Incoming) -> Result<()> {
        {
            let mut reg = self.registry.lock().await;
            reg.clear_session(cx.chat);
            reg.unbind(cx.chat);
        }

        self.store.upsert_user(
            cx.user.0,
            cx.username.as_deref(),
            cx.first_name.as_deref(),
            cx.last_name.as_deref(),
        )?;

        if self.store.is_banned(cx.user.0)? {
            self.chat.send_text_remove_kb(cx.chat, NOTICE_BANNED).await?;
            return Ok(());
        }

        if !self.gate.is_member(cx.user).await {
            self.send_subscribe_prompt(cx.chat).await?;
            self.registry
                .lock()
                .await
                .put(cx.chat, ChatSession::new(State::SubscriptionCheck));
            return Ok(());
        }

        info!(user = cx.user.0, "participant onboarded");
        self.chat.send_text_kb(cx.chat, WELCOME, &main_menu()).await?;
        self.registry
            .lock()
            .await
            .put(cx.chat, ChatSession::new(State::ParticipantCode));
        Ok(())
    }

    /// `/cancel` abandons any in-progress wizard and returns to the main
    /// menu. Admin identity is kept; only `/start` and logout drop it.
    async fn on_cancel(&self, cx: &Incoming) -> Result<()> {
        self.chat
            .send_text_kb(cx.chat, "❌ Action cancelled.", &main_menu())
            .await?;
        self.registry
            .lock()
            .await
            .put(cx.chat, ChatSession::new(State::ParticipantCode));
        Ok(())
    }

    // ---- shared helpers for the transition handlers ----

    pub(crate) async fn send_subscribe_prompt(&self, chat: ChatId) -> Result<()> {
        let text = format!(
            "📢 To use the bot, subscribe to our channel:\n{}\n\nThen press the button below.",
            self.cfg.channel_link
        );
        self.chat
            .send_text_kb(chat, &text, &subscribe_keyboard())
            .await
    }

    pub(crate) async fn choose_notice(&self, chat: ChatId) -> Result<Flow> {
        self.chat.send_text(chat, NOTICE_CHOOSE).await?;
        Ok(Flow::Continue)
    }

    /// Send a listing in safe-limit pages. The current reply keyboard stays up.
    pub(crate) async fn send_pages(
        &self,
        chat: ChatId,
        header: &str,
        entries: Vec<String>,
    ) -> Result<()> {
        for page in paginate(header, entries, self.cfg.message_safe_limit) {
            self.chat.send_text(chat, &page).await?;
        }
        Ok(())
    }

    pub(crate) async fn identity(&self, chat: ChatId) -> Option<String> {
        self.registry.lock().await.identity(chat)
    }

    /// Identity plus master flag. `None` means the binding is gone and the
    /// caller should tear the session down.
    pub(crate) async fn admin_identity(&self, chat: ChatId) -> Result<Option<(String, bool)>> {
        match self.identity(chat).await {
            Some(username) => {
                let is_master = self.store.is_master_admin(&username)?;
                Ok(Some((username, is_master)))
            }
            None => Ok(None),
        }
    }

    pub(crate) async fn expire_session(&self, chat: ChatId) -> Result<Flow> {
        self.chat.send_text_remove_kb(chat, NOTICE_EXPIRED).await?;
        Ok(Flow::End)
    }

    /// Return to the admin home menu, dropping any wizard scratch.
    pub(crate) async fn admin_home(
        &self,
        chat: ChatId,
        s: &mut ChatSession,
        is_master: bool,
    ) -> Result<Flow> {
        s.state = State::AdminMenu;
        s.scratch = Scratch::default();
        self.chat
            .send_text_kb(chat, "🔙 Admin menu:", &admin_menu(is_master))
            .await?;
        Ok(Flow::Continue)
    }
}
