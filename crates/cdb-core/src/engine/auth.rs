//! Admin authentication: login/password steps, master bootstrap, logout,
//! and password change.

use tracing::{info, warn};

use super::{Engine, Flow, Incoming, State};
use crate::{
    keyboards::{admin_menu, main_menu},
    session::{ChatSession, Scratch},
    Result,
};

impl Engine {
    pub(super) async fn on_login(&self, cx: &Incoming, s: &mut ChatSession) -> Result<Flow> {
        let Some(text) = cx.text() else {
            return self.choose_notice(cx.chat).await;
        };
        s.scratch.login_username = Some(text.trim().to_string());
        s.state = State::Password;
        self.chat.send_text(cx.chat, "🔑 Enter your password:").await?;
        Ok(Flow::Continue)
    }

    /// Verify credentials. An unknown username that appears in the master
    /// allowlist self-registers as a master admin with the given password.
    /// Any failure ends the conversation; the next attempt starts at `/start`.
    pub(super) async fn on_password(&self, cx: &Incoming, s: &mut ChatSession) -> Result<Flow> {
        let Some(password) = cx.text() else {
            return self.choose_notice(cx.chat).await;
        };
        let Some(username) = s.scratch.login_username.take() else {
            return self.expire_session(cx.chat).await;
        };

        if self.store.admin_exists(&username)? {
            if self.store.verify_admin(&username, password)? {
                let is_master = self.store.is_master_admin(&username)?;
                self.registry.lock().await.bind(cx.chat, &username);
                s.state = State::AdminMenu;
                s.scratch = Scratch::default();
                info!(admin = %username, is_master, "admin logged in");
                let greeting = if is_master {
                    format!("✅ Welcome back, master admin {username}!")
                } else {
                    format!("✅ Welcome back, admin {username}!")
                };
                self.chat
                    .send_text_kb(cx.chat, &greeting, &admin_menu(is_master))
                    .await?;
                return Ok(Flow::Continue);
            }
        } else if self.cfg.is_master_candidate(&username) {
            // First login of an allowlisted master: the password given now
            // becomes the account password.
            self.store.add_admin(&username, password, true, Some(&username))?;
            self.registry.lock().await.bind(cx.chat, &username);
            s.state = State::AdminMenu;
            s.scratch = Scratch::default();
            info!(admin = %username, "master admin registered");
            self.chat
                .send_text_kb(
                    cx.chat,
                    &format!("🎉 Registered as master admin {username}!"),
                    &admin_menu(true),
                )
                .await?;
            return Ok(Flow::Continue);
        }

        warn!(login = %username, "failed admin login");
        self.chat
            .send_text_remove_kb(cx.chat, "❌ Invalid credentials. Send /start to try again.")
            .await?;
        Ok(Flow::End)
    }

    pub(super) async fn on_new_password(&self, cx: &Incoming, s: &mut ChatSession) -> Result<Flow> {
        let Some(password) = cx.text() else {
            return self.choose_notice(cx.chat).await;
        };
        let Some((username, is_master)) = self.admin_identity(cx.chat).await? else {
            return self.expire_session(cx.chat).await;
        };

        self.store.set_admin_password(&username, password)?;
        info!(admin = %username, "admin password changed");
        s.state = State::AdminMenu;
        self.chat
            .send_text_kb(cx.chat, "✅ Password changed!", &admin_menu(is_master))
            .await?;
        Ok(Flow::Continue)
    }

    pub(super) async fn logout(&self, cx: &Incoming, s: &mut ChatSession) -> Result<Flow> {
        if let Some(username) = self.identity(cx.chat).await {
            info!(admin = %username, "admin logged out");
        }
        self.registry.lock().await.unbind(cx.chat);
        s.state = State::ParticipantCode;
        s.scratch = Scratch::default();
        self.chat
            .send_text_kb(cx.chat, "👋 Logged out.", &main_menu())
            .await?;
        Ok(Flow::Continue)
    }
}
