//! Upload wizards: camera screenshots, project files, and pack files.
//!
//! Each wizard stages its inputs in session scratch and only touches the
//! catalog at the final step. Backing out of a wizard discards any staged
//! download.

use std::{
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use tracing::{info, warn};

use super::{Engine, Event, Flow, Incoming, State};
use crate::{
    domain::Camera,
    errors::Error,
    formatting::{generate_code, safe_filename},
    keyboards::{admin_menu, back_only_keyboard, category_keyboard, BTN_BACK},
    ports::unique_media_path,
    session::{ChatSession, Scratch},
    Result,
};

/// Collision retries before giving up on code allocation. With 36^8 codes
/// this never triggers in practice.
const CODE_ALLOC_ATTEMPTS: usize = 8;

impl Engine {
    // ---- camera screenshot wizard ----

    pub(super) async fn start_camera_upload(
        &self,
        cx: &Incoming,
        s: &mut ChatSession,
    ) -> Result<Flow> {
        let categories = self.store.list_categories()?;
        if categories.is_empty() {
            self.chat
                .send_text(cx.chat, "📭 No categories yet. Create one first.")
                .await?;
            return Ok(Flow::Continue);
        }
        s.state = State::UploadCategory;
        self.chat
            .send_text_kb(
                cx.chat,
                "📂 Choose a category for the upload:",
                &category_keyboard(&categories),
            )
            .await?;
        Ok(Flow::Continue)
    }

    pub(super) async fn on_upload_category(
        &self,
        cx: &Incoming,
        s: &mut ChatSession,
    ) -> Result<Flow> {
        let Some(text) = cx.text() else {
            return self.choose_notice(cx.chat).await;
        };
        if text == BTN_BACK {
            return self.cancel_wizard(cx, s).await;
        }

        if !self.store.list_categories()?.iter().any(|c| c == text) {
            self.chat
                .send_text(cx.chat, "❌ Choose a category from the list.")
                .await?;
            return Ok(Flow::Continue);
        }

        s.scratch.category = Some(text.to_string());
        s.state = State::UploadPhoto;
        self.chat
            .send_text_kb(
                cx.chat,
                "📤 Send the camera screenshot:",
                &back_only_keyboard(),
            )
            .await?;
        Ok(Flow::Continue)
    }

    pub(super) async fn on_upload_photo(&self, cx: &Incoming, s: &mut ChatSession) -> Result<Flow> {
        if cx.text() == Some(BTN_BACK) {
            return self.cancel_wizard(cx, s).await;
        }
        let Event::Photo { file_id } = &cx.event else {
            self.chat.send_text(cx.chat, "❌ Please send a photo.").await?;
            return Ok(Flow::Continue);
        };
        let Some(category) = s.scratch.category.clone() else {
            return self.expire_session(cx.chat).await;
        };

        let dir = self.cfg.cameras_dir().join(safe_filename(&category));
        std::fs::create_dir_all(&dir)?;
        let dest = unique_media_path(&dir, "camera", "jpg");
        self.chat.download_file(file_id, &dest).await?;

        s.scratch.image_path = Some(dest);
        s.state = State::UploadCaption;
        self.chat
            .send_text(cx.chat, "✏️ Enter a caption for the screenshot:")
            .await?;
        Ok(Flow::Continue)
    }

    pub(super) async fn on_upload_caption(
        &self,
        cx: &Incoming,
        s: &mut ChatSession,
    ) -> Result<Flow> {
        let Some(text) = cx.text() else {
            return self.choose_notice(cx.chat).await;
        };
        if text == BTN_BACK {
            return self.cancel_wizard(cx, s).await;
        }
        s.scratch.caption = Some(text.trim().to_string());
        s.state = State::UploadCustomName;
        self.chat
            .send_text(cx.chat, "🏷️ Enter a display name, or send 'no' to skip:")
            .await?;
        Ok(Flow::Continue)
    }

    pub(super) async fn on_upload_custom_name(
        &self,
        cx: &Incoming,
        s: &mut ChatSession,
    ) -> Result<Flow> {
        let Some(text) = cx.text() else {
            return self.choose_notice(cx.chat).await;
        };
        if text == BTN_BACK {
            return self.cancel_wizard(cx, s).await;
        }
        let Some((username, is_master)) = self.admin_identity(cx.chat).await? else {
            return self.expire_session(cx.chat).await;
        };
        let (Some(category), Some(image_path), Some(caption)) = (
            s.scratch.category.take(),
            s.scratch.image_path.take(),
            s.scratch.caption.take(),
        ) else {
            return self.expire_session(cx.chat).await;
        };

        let custom_name = (!text.trim().eq_ignore_ascii_case("no"))
            .then(|| text.trim().to_string());

        let mut allocated = None;
        for _ in 0..CODE_ALLOC_ATTEMPTS {
            let code = generate_code();
            let camera = Camera {
                code: code.clone(),
                category: category.clone(),
                image_path: image_path.to_string_lossy().into_owned(),
                caption: caption.clone(),
                custom_name: custom_name.clone(),
                admin_username: username.clone(),
            };
            if self.store.add_camera(&camera)? {
                allocated = Some(code);
                break;
            }
        }
        let Some(code) = allocated else {
            return Err(Error::External(
                "could not allocate a unique camera code".to_string(),
            ));
        };

        info!(code = %code, category = %category, admin = %username, "camera uploaded");
        let mut msg = format!(
            "✅ Screenshot uploaded!\n🔢 Access code: {code}\n📂 Category: {category}"
        );
        if let Some(name) = &custom_name {
            msg.push_str(&format!("\n🏷️ Name: {name}"));
        }
        s.state = State::AdminMenu;
        s.scratch = Scratch::default();
        self.chat
            .send_text_kb(cx.chat, &msg, &admin_menu(is_master))
            .await?;
        Ok(Flow::Continue)
    }

    // ---- project upload wizard ----

    pub(super) async fn on_upload_project_file(
        &self,
        cx: &Incoming,
        s: &mut ChatSession,
    ) -> Result<Flow> {
        if cx.text() == Some(BTN_BACK) {
            return self.cancel_wizard(cx, s).await;
        }
        let Event::Document { file_id, file_name } = &cx.event else {
            self.chat
                .send_text(cx.chat, "❌ Please send the file as a document.")
                .await?;
            return Ok(Flow::Continue);
        };

        let dir = self.cfg.projects_dir();
        std::fs::create_dir_all(&dir)?;
        let dest = staged_path(&dir, file_name.as_deref(), "project.bin");
        self.chat.download_file(file_id, &dest).await?;

        s.scratch.file_path = Some(dest);
        s.state = State::UploadProjectCaption;
        self.chat
            .send_text(cx.chat, "✏️ Enter a caption for the project:")
            .await?;
        Ok(Flow::Continue)
    }

    pub(super) async fn on_upload_project_caption(
        &self,
        cx: &Incoming,
        s: &mut ChatSession,
    ) -> Result<Flow> {
        let Some(text) = cx.text() else {
            return self.choose_notice(cx.chat).await;
        };
        if text == BTN_BACK {
            return self.cancel_wizard(cx, s).await;
        }
        s.scratch.file_caption = Some(text.trim().to_string());
        s.state = State::UploadProjectName;
        self.chat
            .send_text(cx.chat, "📌 Enter the project name for the menu:")
            .await?;
        Ok(Flow::Continue)
    }

    pub(super) async fn on_upload_project_name(
        &self,
        cx: &Incoming,
        s: &mut ChatSession,
    ) -> Result<Flow> {
        let Some(text) = cx.text() else {
            return self.choose_notice(cx.chat).await;
        };
        if text == BTN_BACK {
            return self.cancel_wizard(cx, s).await;
        }
        let (Some(file_path), Some(caption)) = (
            s.scratch.file_path.take(),
            s.scratch.file_caption.take(),
        ) else {
            return self.expire_session(cx.chat).await;
        };

        let name = text.trim();
        self.store
            .add_project(&file_path.to_string_lossy(), &caption, name)?;
        info!(name, "project uploaded");
        self.chat
            .send_text(cx.chat, &format!("✅ Project '{name}' uploaded!"))
            .await?;
        s.scratch = Scratch::default();
        self.back_to_section_menu(cx, s).await
    }

    // ---- pack upload wizard ----

    pub(super) async fn on_upload_pack_file(
        &self,
        cx: &Incoming,
        s: &mut ChatSession,
    ) -> Result<Flow> {
        if cx.text() == Some(BTN_BACK) {
            return self.cancel_wizard(cx, s).await;
        }
        let Event::Document { file_id, file_name } = &cx.event else {
            self.chat
                .send_text(cx.chat, "❌ Please send the file as a document.")
                .await?;
            return Ok(Flow::Continue);
        };

        let dir = self.cfg.packs_dir();
        std::fs::create_dir_all(&dir)?;
        let dest = staged_path(&dir, file_name.as_deref(), "pack.bin");
        self.chat.download_file(file_id, &dest).await?;

        s.scratch.file_path = Some(dest);
        s.state = State::UploadPackCaption;
        self.chat
            .send_text(cx.chat, "✏️ Enter a caption for the pack:")
            .await?;
        Ok(Flow::Continue)
    }

    pub(super) async fn on_upload_pack_caption(
        &self,
        cx: &Incoming,
        s: &mut ChatSession,
    ) -> Result<Flow> {
        let Some(text) = cx.text() else {
            return self.choose_notice(cx.chat).await;
        };
        if text == BTN_BACK {
            return self.cancel_wizard(cx, s).await;
        }
        s.scratch.file_caption = Some(text.trim().to_string());
        s.state = State::UploadPackName;
        self.chat
            .send_text(cx.chat, "📌 Enter the pack name for the menu:")
            .await?;
        Ok(Flow::Continue)
    }

    pub(super) async fn on_upload_pack_name(
        &self,
        cx: &Incoming,
        s: &mut ChatSession,
    ) -> Result<Flow> {
        let Some(text) = cx.text() else {
            return self.choose_notice(cx.chat).await;
        };
        if text == BTN_BACK {
            return self.cancel_wizard(cx, s).await;
        }
        let Some((username, _)) = self.admin_identity(cx.chat).await? else {
            return self.expire_session(cx.chat).await;
        };
        let (Some(file_path), Some(caption)) = (
            s.scratch.file_path.take(),
            s.scratch.file_caption.take(),
        ) else {
            return self.expire_session(cx.chat).await;
        };

        let name = text.trim();
        self.store
            .add_pack(&file_path.to_string_lossy(), &caption, name, &username)?;
        info!(name, admin = %username, "pack uploaded");
        self.chat
            .send_text(cx.chat, &format!("✅ Pack '{name}' uploaded!"))
            .await?;
        s.scratch = Scratch::default();
        self.back_to_section_menu(cx, s).await
    }

    // ---- shared wizard plumbing ----

    /// Back out of the current wizard: drop any staged download, then return
    /// to the menu the wizard was entered from.
    async fn cancel_wizard(&self, cx: &Incoming, s: &mut ChatSession) -> Result<Flow> {
        discard_staged(s);
        self.back_to_section_menu(cx, s).await
    }

    /// The menu a wizard state belongs under.
    async fn back_to_section_menu(&self, cx: &Incoming, s: &mut ChatSession) -> Result<Flow> {
        let Some((_, is_master)) = self.admin_identity(cx.chat).await? else {
            return self.expire_session(cx.chat).await;
        };
        match s.state {
            State::UploadProjectFile
            | State::UploadProjectCaption
            | State::UploadProjectName => self.project_management_home(cx, s).await,
            State::UploadPackFile | State::UploadPackCaption | State::UploadPackName => {
                self.pack_management_home(cx, s, is_master).await
            }
            _ => self.admin_home(cx.chat, s, is_master).await,
        }
    }
}

fn discard_staged(s: &mut ChatSession) {
    for path in [s.scratch.image_path.take(), s.scratch.file_path.take()]
        .into_iter()
        .flatten()
    {
        if !path.is_file() {
            continue;
        }
        if let Err(e) = std::fs::remove_file(&path) {
            warn!(path = %path.display(), error = %e, "failed to discard staged upload");
        }
    }
}

/// Download destination under `dir`: millisecond timestamp prefix plus the
/// sanitized original filename.
fn staged_path(dir: &Path, original: Option<&str>, fallback: &str) -> PathBuf {
    let name = original
        .map(safe_filename)
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| fallback.to_string());
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    dir.join(format!("{ts}_{name}"))
}
