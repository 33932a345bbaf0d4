//! Participant-facing transitions: onboarding confirmation, camera code
//! lookup, and the projects/packs browsing menus.

use std::path::Path;

use super::{state::MainAction, Engine, Flow, Incoming, State};
use crate::{
    formatting::{format_caption, format_pack_label, format_project_label},
    keyboards::{back_only_keyboard, main_menu, ReplyKeyboard, BTN_BACK, BTN_SUBSCRIBED},
    session::ChatSession,
    Result,
};

impl Engine {
    /// Waiting for the "I subscribed" button. The claim is verified with a
    /// live probe; anything else is a menu miss.
    pub(super) async fn on_subscription_check(
        &self,
        cx: &Incoming,
        s: &mut ChatSession,
    ) -> Result<Flow> {
        match cx.text() {
            Some(BTN_SUBSCRIBED) => {
                if self.gate.is_member(cx.user).await {
                    s.state = State::ParticipantCode;
                    self.chat
                        .send_text_kb(
                            cx.chat,
                            "✅ Thanks for subscribing! Choose an action:",
                            &main_menu(),
                        )
                        .await?;
                } else {
                    self.chat
                        .send_text(cx.chat, "❌ You are not subscribed yet.")
                        .await?;
                    self.send_subscribe_prompt(cx.chat).await?;
                }
                Ok(Flow::Continue)
            }
            _ => self.choose_notice(cx.chat).await,
        }
    }

    /// Main menu: free text that is not a menu label is treated as a camera
    /// access code.
    pub(super) async fn on_participant(&self, cx: &Incoming, s: &mut ChatSession) -> Result<Flow> {
        let Some(text) = cx.text() else {
            return self.choose_notice(cx.chat).await;
        };

        match MainAction::parse(text) {
            MainAction::EnterCode => {
                self.chat.send_text(cx.chat, "🔢 Enter the camera code:").await?;
                Ok(Flow::Continue)
            }
            MainAction::Projects => self.render_projects_menu(cx, s).await,
            MainAction::Packs => self.render_packs_menu(cx, s).await,
            MainAction::AdminLogin => {
                s.state = State::Login;
                self.chat
                    .send_text_remove_kb(cx.chat, "🔐 Enter your login:")
                    .await?;
                Ok(Flow::Continue)
            }
            MainAction::Channel => {
                let text = format!("📢 Our channel: {}", self.cfg.channel_link);
                self.chat.send_text(cx.chat, &text).await?;
                Ok(Flow::Continue)
            }
            MainAction::Code(raw) => self.lookup_camera(cx, &raw).await,
        }
    }

    async fn lookup_camera(&self, cx: &Incoming, raw: &str) -> Result<Flow> {
        let code = raw.trim().to_uppercase();
        match self.store.get_camera(&code)? {
            Some(camera) => {
                let path = Path::new(&camera.image_path);
                if !path.is_file() {
                    self.chat
                        .send_text(cx.chat, "❌ The image for this camera is missing.")
                        .await?;
                    return Ok(Flow::Continue);
                }
                let caption = format!(
                    "📸 Camera code: {code}\n\n{}",
                    format_caption(
                        &camera.caption,
                        camera.custom_name.as_deref(),
                        &self.cfg.caption_emojis,
                        &self.cfg.name_emojis,
                    )
                );
                self.chat.send_photo(cx.chat, path, &caption).await?;
                Ok(Flow::Continue)
            }
            None => {
                self.chat
                    .send_text(cx.chat, "❌ Code not found. Check it and try again.")
                    .await?;
                Ok(Flow::Continue)
            }
        }
    }

    /// Rebuild the projects menu from the store and snapshot it in scratch;
    /// selections are matched against the snapshot, not re-queried.
    pub(super) async fn render_projects_menu(
        &self,
        cx: &Incoming,
        s: &mut ChatSession,
    ) -> Result<Flow> {
        let projects = self.store.list_projects()?;
        s.state = State::ProjectsMenu;
        s.scratch.project_menu.clear();

        if projects.is_empty() {
            self.chat
                .send_text_kb(cx.chat, "📭 No projects yet.", &back_only_keyboard())
                .await?;
            return Ok(Flow::Continue);
        }

        let mut labels = Vec::with_capacity(projects.len());
        for project in projects {
            let label = format_project_label(&project.display_name);
            labels.push(label.clone());
            s.scratch.project_menu.insert(label, project);
        }
        self.chat
            .send_text_kb(cx.chat, "📁 Choose a project:", &ReplyKeyboard::listing(labels))
            .await?;
        Ok(Flow::Continue)
    }

    pub(super) async fn on_projects_menu(
        &self,
        cx: &Incoming,
        s: &mut ChatSession,
    ) -> Result<Flow> {
        let Some(text) = cx.text() else {
            return self.choose_notice(cx.chat).await;
        };
        if text == BTN_BACK {
            s.state = State::ParticipantCode;
            s.scratch.project_menu.clear();
            self.chat
                .send_text_kb(cx.chat, "🔙 Main menu:", &main_menu())
                .await?;
            return Ok(Flow::Continue);
        }

        match s.scratch.project_menu.get(text) {
            Some(project) => {
                let path = Path::new(&project.file_path);
                if !path.is_file() {
                    self.chat
                        .send_text(cx.chat, "❌ The project file is missing.")
                        .await?;
                    return Ok(Flow::Continue);
                }
                let filename = file_basename(&project.file_path);
                self.chat
                    .send_document(cx.chat, path, &project.caption, &filename)
                    .await?;
                Ok(Flow::Continue)
            }
            None => {
                self.chat
                    .send_text(cx.chat, "❌ Choose a project from the list.")
                    .await?;
                Ok(Flow::Continue)
            }
        }
    }

    pub(super) async fn render_packs_menu(&self, cx: &Incoming, s: &mut ChatSession) -> Result<Flow> {
        let packs = self.store.list_packs()?;
        s.state = State::PacksMenu;
        s.scratch.pack_menu.clear();

        if packs.is_empty() {
            self.chat
                .send_text_kb(cx.chat, "📭 No camera packs yet.", &back_only_keyboard())
                .await?;
            return Ok(Flow::Continue);
        }

        let mut labels = Vec::with_capacity(packs.len());
        for pack in packs {
            let label = format_pack_label(&pack.display_name, &self.cfg.pack_emojis);
            labels.push(label.clone());
            s.scratch.pack_menu.insert(label, pack);
        }
        self.chat
            .send_text_kb(cx.chat, "📦 Choose a pack:", &ReplyKeyboard::listing(labels))
            .await?;
        Ok(Flow::Continue)
    }

    pub(super) async fn on_packs_menu(&self, cx: &Incoming, s: &mut ChatSession) -> Result<Flow> {
        let Some(text) = cx.text() else {
            return self.choose_notice(cx.chat).await;
        };
        if text == BTN_BACK {
            s.state = State::ParticipantCode;
            s.scratch.pack_menu.clear();
            self.chat
                .send_text_kb(cx.chat, "🔙 Main menu:", &main_menu())
                .await?;
            return Ok(Flow::Continue);
        }

        match s.scratch.pack_menu.get(text) {
            Some(pack) => {
                let path = Path::new(&pack.file_path);
                if !path.is_file() {
                    self.chat
                        .send_text(cx.chat, "❌ The pack file is missing.")
                        .await?;
                    return Ok(Flow::Continue);
                }
                let filename = file_basename(&pack.file_path);
                self.chat
                    .send_document(cx.chat, path, &pack.caption, &filename)
                    .await?;
                Ok(Flow::Continue)
            }
            None => {
                self.chat
                    .send_text(cx.chat, "❌ Choose a pack from the list.")
                    .await?;
                Ok(Flow::Continue)
            }
        }
    }
}

fn file_basename(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string())
}
