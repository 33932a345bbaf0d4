//! Admin-area transitions: the home menu, admin/category/ban management,
//! camera and project/pack administration, listings, and broadcast.

use std::path::Path;

use tracing::{info, warn};

use super::{
    state::{
        AdminManagementAction, AdminMenuAction, BanManagementAction, CameraCodesAction,
        CategoryManagementAction, PackManagementAction, ProjectManagementAction,
    },
    Engine, Flow, Incoming, State, NOTICE_MASTER_ONLY,
};
use crate::{
    domain::{BotUser, Pack},
    formatting::safe_filename,
    keyboards::{
        admin_management_keyboard, back_only_keyboard, ban_management_keyboard,
        camera_codes_keyboard, category_management_keyboard, pack_management_keyboard,
        project_management_keyboard, BTN_BACK,
    },
    session::ChatSession,
    Result,
};

impl Engine {
    pub(super) async fn on_admin_menu(&self, cx: &Incoming, s: &mut ChatSession) -> Result<Flow> {
        let Some((username, is_master)) = self.admin_identity(cx.chat).await? else {
            return self.expire_session(cx.chat).await;
        };
        let Some(text) = cx.text() else {
            return self.choose_notice(cx.chat).await;
        };

        let action = AdminMenuAction::parse(text);
        if action.master_only() && !is_master {
            self.chat.send_text(cx.chat, NOTICE_MASTER_ONLY).await?;
            return Ok(Flow::Continue);
        }

        match action {
            AdminMenuAction::Upload => self.start_camera_upload(cx, s).await,
            AdminMenuAction::MyCameras => self.list_my_cameras(cx, &username).await,
            AdminMenuAction::ManagePacks => self.pack_management_home(cx, s, is_master).await,
            AdminMenuAction::ChangePassword => {
                s.state = State::NewPassword;
                self.chat.send_text(cx.chat, "🔑 Enter a new password:").await?;
                Ok(Flow::Continue)
            }
            AdminMenuAction::Broadcast => {
                s.state = State::BroadcastMessage;
                self.chat
                    .send_text_kb(
                        cx.chat,
                        "✉️ Enter the broadcast text:",
                        &back_only_keyboard(),
                    )
                    .await?;
                Ok(Flow::Continue)
            }
            AdminMenuAction::Logout => self.logout(cx, s).await,
            AdminMenuAction::ManageAdmins => self.admin_management_home(cx, s).await,
            AdminMenuAction::ManageCategories => self.category_management_home(cx, s).await,
            AdminMenuAction::ManageBans => self.ban_management_home(cx, s).await,
            AdminMenuAction::CameraCodes => {
                s.state = State::CameraCodesMenu;
                self.chat
                    .send_text_kb(cx.chat, "🔑 Camera codes:", &camera_codes_keyboard())
                    .await?;
                Ok(Flow::Continue)
            }
            AdminMenuAction::DeleteCamera => {
                s.state = State::DeleteCamera;
                self.chat
                    .send_text_kb(
                        cx.chat,
                        "🗑️ Enter the camera code to delete:",
                        &back_only_keyboard(),
                    )
                    .await?;
                Ok(Flow::Continue)
            }
            AdminMenuAction::UserList => self.list_users(cx).await,
            AdminMenuAction::ManageProjects => self.project_management_home(cx, s).await,
            AdminMenuAction::BroadcastHistory => self.list_broadcast_history(cx).await,
            AdminMenuAction::Unrecognized => self.choose_notice(cx.chat).await,
        }
    }

    // ---- admin management ----

    async fn admin_management_home(&self, cx: &Incoming, s: &mut ChatSession) -> Result<Flow> {
        s.state = State::AdminManagement;
        self.chat
            .send_text_kb(cx.chat, "👑 Admin management:", &admin_management_keyboard())
            .await?;
        Ok(Flow::Continue)
    }

    pub(super) async fn on_admin_management(
        &self,
        cx: &Incoming,
        s: &mut ChatSession,
    ) -> Result<Flow> {
        let Some((_, is_master)) = self.admin_identity(cx.chat).await? else {
            return self.expire_session(cx.chat).await;
        };
        let Some(text) = cx.text() else {
            return self.choose_notice(cx.chat).await;
        };

        match AdminManagementAction::parse(text) {
            AdminManagementAction::AddAdmin => {
                s.state = State::AddAdminName;
                self.chat
                    .send_text_kb(
                        cx.chat,
                        "👤 Enter the new admin's display name:",
                        &back_only_keyboard(),
                    )
                    .await?;
                Ok(Flow::Continue)
            }
            AdminManagementAction::DelAdmin => {
                self.list_admins(cx).await?;
                s.state = State::DelAdmin;
                self.chat
                    .send_text_kb(
                        cx.chat,
                        "➖ Enter the login to remove:",
                        &back_only_keyboard(),
                    )
                    .await?;
                Ok(Flow::Continue)
            }
            AdminManagementAction::ListAdmins => {
                self.list_admins(cx).await?;
                Ok(Flow::Continue)
            }
            AdminManagementAction::Back => self.admin_home(cx.chat, s, is_master).await,
            AdminManagementAction::Unrecognized => self.choose_notice(cx.chat).await,
        }
    }

    pub(super) async fn on_add_admin_name(
        &self,
        cx: &Incoming,
        s: &mut ChatSession,
    ) -> Result<Flow> {
        let Some(text) = cx.text() else {
            return self.choose_notice(cx.chat).await;
        };
        if text == BTN_BACK {
            return self.admin_management_home(cx, s).await;
        }
        s.scratch.new_admin_name = Some(text.trim().to_string());
        s.state = State::AddAdminLogin;
        self.chat
            .send_text(cx.chat, "👤 Enter the new admin's login:")
            .await?;
        Ok(Flow::Continue)
    }

    pub(super) async fn on_add_admin_login(
        &self,
        cx: &Incoming,
        s: &mut ChatSession,
    ) -> Result<Flow> {
        let Some(text) = cx.text() else {
            return self.choose_notice(cx.chat).await;
        };
        if text == BTN_BACK {
            return self.admin_management_home(cx, s).await;
        }
        let login = text.trim().trim_start_matches('@').to_string();
        if login.is_empty() {
            self.chat.send_text(cx.chat, "❌ Login cannot be empty.").await?;
            return Ok(Flow::Continue);
        }
        s.scratch.new_admin_login = Some(login);
        s.state = State::AddAdminPassword;
        self.chat
            .send_text(cx.chat, "🔑 Enter the new admin's password:")
            .await?;
        Ok(Flow::Continue)
    }

    pub(super) async fn on_add_admin_password(
        &self,
        cx: &Incoming,
        s: &mut ChatSession,
    ) -> Result<Flow> {
        let Some(text) = cx.text() else {
            return self.choose_notice(cx.chat).await;
        };
        if text == BTN_BACK {
            return self.admin_management_home(cx, s).await;
        }
        let (Some(name), Some(login)) = (
            s.scratch.new_admin_name.take(),
            s.scratch.new_admin_login.take(),
        ) else {
            return self.expire_session(cx.chat).await;
        };

        if self.store.add_admin(&login, text, false, Some(&name))? {
            info!(admin = %login, "admin account created");
            self.chat
                .send_text(cx.chat, &format!("✅ Admin {name} (@{login}) added!"))
                .await?;
        } else {
            self.chat
                .send_text(cx.chat, "❌ That login is already taken.")
                .await?;
        }
        self.admin_management_home(cx, s).await
    }

    pub(super) async fn on_del_admin(&self, cx: &Incoming, s: &mut ChatSession) -> Result<Flow> {
        let Some(username) = self.identity(cx.chat).await else {
            return self.expire_session(cx.chat).await;
        };
        let Some(text) = cx.text() else {
            return self.choose_notice(cx.chat).await;
        };
        if text == BTN_BACK {
            return self.admin_management_home(cx, s).await;
        }

        let target = text.trim().trim_start_matches('@').to_string();
        if target == username {
            self.chat
                .send_text(cx.chat, "❌ You cannot remove yourself.")
                .await?;
        } else if self.cfg.is_master_candidate(&target) || self.store.is_master_admin(&target)? {
            self.chat
                .send_text(cx.chat, "❌ Master admins cannot be removed.")
                .await?;
        } else if !self.store.admin_exists(&target)? {
            self.chat
                .send_text(cx.chat, "❌ No admin with that login.")
                .await?;
        } else {
            self.store.delete_admin(&target)?;
            info!(admin = %target, "admin account removed");
            self.chat
                .send_text(cx.chat, &format!("✅ Admin {target} removed!"))
                .await?;
        }
        self.admin_management_home(cx, s).await
    }

    async fn list_admins(&self, cx: &Incoming) -> Result<()> {
        let admins = self.store.list_admins()?;
        if admins.is_empty() {
            return self.chat.send_text(cx.chat, "📭 No admins yet.").await;
        }
        let entries = admins
            .into_iter()
            .map(|a| {
                let emoji = if a.is_master { "👑" } else { "👤" };
                let display = a.display_name.unwrap_or_else(|| a.username.clone());
                format!("{emoji} {display} (@{})\n", a.username)
            })
            .collect();
        self.send_pages(cx.chat, "👥 Admins:\n\n", entries).await
    }

    // ---- category management ----

    async fn category_management_home(&self, cx: &Incoming, s: &mut ChatSession) -> Result<Flow> {
        s.state = State::CategoryManagement;
        let categories = self.store.list_categories()?;
        let text = if categories.is_empty() {
            "📂 Category management:\n\n📭 No categories yet.".to_string()
        } else {
            format!("📂 Category management:\n\n{}", categories.join("\n"))
        };
        self.chat
            .send_text_kb(cx.chat, &text, &category_management_keyboard())
            .await?;
        Ok(Flow::Continue)
    }

    pub(super) async fn on_category_management(
        &self,
        cx: &Incoming,
        s: &mut ChatSession,
    ) -> Result<Flow> {
        let Some((_, is_master)) = self.admin_identity(cx.chat).await? else {
            return self.expire_session(cx.chat).await;
        };
        let Some(text) = cx.text() else {
            return self.choose_notice(cx.chat).await;
        };

        match CategoryManagementAction::parse(text) {
            CategoryManagementAction::Add => {
                s.state = State::AddCategory;
                self.chat
                    .send_text_kb(
                        cx.chat,
                        "➕ Enter the new category name:",
                        &back_only_keyboard(),
                    )
                    .await?;
                Ok(Flow::Continue)
            }
            CategoryManagementAction::Del => {
                s.state = State::DelCategory;
                self.chat
                    .send_text_kb(
                        cx.chat,
                        "➖ Enter the category name to remove:",
                        &back_only_keyboard(),
                    )
                    .await?;
                Ok(Flow::Continue)
            }
            CategoryManagementAction::Back => self.admin_home(cx.chat, s, is_master).await,
            CategoryManagementAction::Unrecognized => self.choose_notice(cx.chat).await,
        }
    }

    pub(super) async fn on_add_category(&self, cx: &Incoming, s: &mut ChatSession) -> Result<Flow> {
        let Some(text) = cx.text() else {
            return self.choose_notice(cx.chat).await;
        };
        if text == BTN_BACK {
            return self.category_management_home(cx, s).await;
        }

        let name = text.trim().to_string();
        if name.is_empty() {
            self.chat
                .send_text(cx.chat, "❌ Category name cannot be empty.")
                .await?;
            return Ok(Flow::Continue);
        }

        if self.store.add_category(&name)? {
            std::fs::create_dir_all(self.cfg.cameras_dir().join(safe_filename(&name)))?;
            self.chat
                .send_text(cx.chat, &format!("✅ Category '{name}' added!"))
                .await?;
        } else {
            self.chat
                .send_text(cx.chat, "❌ That category already exists.")
                .await?;
        }
        self.category_management_home(cx, s).await
    }

    pub(super) async fn on_del_category(&self, cx: &Incoming, s: &mut ChatSession) -> Result<Flow> {
        let Some(text) = cx.text() else {
            return self.choose_notice(cx.chat).await;
        };
        if text == BTN_BACK {
            return self.category_management_home(cx, s).await;
        }

        // Cameras already filed under the category keep their rows and files.
        if self.store.delete_category(text.trim())? {
            self.chat.send_text(cx.chat, "✅ Category removed!").await?;
        } else {
            self.chat.send_text(cx.chat, "❌ No such category.").await?;
        }
        self.category_management_home(cx, s).await
    }

    // ---- ban management ----

    async fn ban_management_home(&self, cx: &Incoming, s: &mut ChatSession) -> Result<Flow> {
        s.state = State::BanManagement;
        self.chat
            .send_text_kb(cx.chat, "🚫 Ban management:", &ban_management_keyboard())
            .await?;
        Ok(Flow::Continue)
    }

    pub(super) async fn on_ban_management(
        &self,
        cx: &Incoming,
        s: &mut ChatSession,
    ) -> Result<Flow> {
        let Some((_, is_master)) = self.admin_identity(cx.chat).await? else {
            return self.expire_session(cx.chat).await;
        };
        let Some(text) = cx.text() else {
            return self.choose_notice(cx.chat).await;
        };

        match BanManagementAction::parse(text) {
            BanManagementAction::Ban => {
                s.state = State::BanUserId;
                self.chat
                    .send_text_kb(
                        cx.chat,
                        "🚫 Enter the user id to ban:",
                        &back_only_keyboard(),
                    )
                    .await?;
                Ok(Flow::Continue)
            }
            BanManagementAction::Unban => {
                s.state = State::UnbanUserId;
                self.chat
                    .send_text_kb(
                        cx.chat,
                        "✅ Enter the user id to unban:",
                        &back_only_keyboard(),
                    )
                    .await?;
                Ok(Flow::Continue)
            }
            BanManagementAction::ListBanned => {
                let banned = self.store.banned_user_ids()?;
                if banned.is_empty() {
                    self.chat.send_text(cx.chat, "📭 No banned users.").await?;
                } else {
                    let entries = banned.into_iter().map(|id| format!("🆔 {id}\n")).collect();
                    self.send_pages(cx.chat, "🚫 Banned users:\n\n", entries).await?;
                }
                Ok(Flow::Continue)
            }
            BanManagementAction::Back => self.admin_home(cx.chat, s, is_master).await,
            BanManagementAction::Unrecognized => self.choose_notice(cx.chat).await,
        }
    }

    pub(super) async fn on_ban_user_id(&self, cx: &Incoming, s: &mut ChatSession) -> Result<Flow> {
        let Some(text) = cx.text() else {
            return self.choose_notice(cx.chat).await;
        };
        if text == BTN_BACK {
            return self.ban_management_home(cx, s).await;
        }
        let Ok(user_id) = text.trim().parse::<i64>() else {
            self.chat
                .send_text(cx.chat, "❌ Invalid id. Send a numeric user id.")
                .await?;
            return Ok(Flow::Continue);
        };

        self.store.ban_user(user_id)?;
        info!(user_id, "user banned");
        self.chat
            .send_text(cx.chat, &format!("✅ User {user_id} banned!"))
            .await?;
        self.ban_management_home(cx, s).await
    }

    pub(super) async fn on_unban_user_id(
        &self,
        cx: &Incoming,
        s: &mut ChatSession,
    ) -> Result<Flow> {
        let Some(text) = cx.text() else {
            return self.choose_notice(cx.chat).await;
        };
        if text == BTN_BACK {
            return self.ban_management_home(cx, s).await;
        }
        let Ok(user_id) = text.trim().parse::<i64>() else {
            self.chat
                .send_text(cx.chat, "❌ Invalid id. Send a numeric user id.")
                .await?;
            return Ok(Flow::Continue);
        };

        self.store.unban_user(user_id)?;
        info!(user_id, "user unbanned");
        self.chat
            .send_text(cx.chat, &format!("✅ User {user_id} unbanned!"))
            .await?;
        self.ban_management_home(cx, s).await
    }

    // ---- camera codes and deletion ----

    pub(super) async fn on_camera_codes_menu(
        &self,
        cx: &Incoming,
        s: &mut ChatSession,
    ) -> Result<Flow> {
        let Some((_, is_master)) = self.admin_identity(cx.chat).await? else {
            return self.expire_session(cx.chat).await;
        };
        let Some(text) = cx.text() else {
            return self.choose_notice(cx.chat).await;
        };

        match CameraCodesAction::parse(text) {
            CameraCodesAction::Stats => {
                let stats = self.store.camera_stats()?;
                if stats.is_empty() {
                    self.chat.send_text(cx.chat, "📭 No cameras yet.").await?;
                } else {
                    let entries = stats
                        .into_iter()
                        .map(|c| format!("📂 {}: {}\n", c.category, c.count))
                        .collect();
                    self.send_pages(cx.chat, "📊 Cameras per category:\n\n", entries)
                        .await?;
                }
                Ok(Flow::Continue)
            }
            CameraCodesAction::AllCodes => {
                let cameras = self.store.all_cameras()?;
                if cameras.is_empty() {
                    self.chat.send_text(cx.chat, "📭 No cameras yet.").await?;
                } else {
                    let entries = cameras
                        .into_iter()
                        .map(|c| {
                            let mut entry = format!(
                                "🔑 {}\n📂 Category: {}\n👤 Admin: {}\n",
                                c.code, c.category, c.admin_username
                            );
                            if let Some(name) = &c.custom_name {
                                entry.push_str(&format!("🏷️ Name: {name}\n"));
                            }
                            entry.push('\n');
                            entry
                        })
                        .collect();
                    self.send_pages(cx.chat, "📝 All cameras:\n\n", entries).await?;
                }
                Ok(Flow::Continue)
            }
            CameraCodesAction::Back => self.admin_home(cx.chat, s, is_master).await,
            CameraCodesAction::Unrecognized => self.choose_notice(cx.chat).await,
        }
    }

    async fn list_my_cameras(&self, cx: &Incoming, username: &str) -> Result<Flow> {
        let cameras = self.store.cameras_by_admin(username)?;
        if cameras.is_empty() {
            self.chat
                .send_text(cx.chat, "📭 You have no cameras yet.")
                .await?;
            return Ok(Flow::Continue);
        }
        let entries = cameras
            .into_iter()
            .map(|c| {
                let mut entry = format!("🔑 {}\n📂 Category: {}\n", c.code, c.category);
                if let Some(name) = &c.custom_name {
                    entry.push_str(&format!("🏷️ Name: {name}\n"));
                }
                entry.push('\n');
                entry
            })
            .collect();
        self.send_pages(cx.chat, "📝 Your cameras:\n\n", entries).await?;
        Ok(Flow::Continue)
    }

    pub(super) async fn on_delete_camera(
        &self,
        cx: &Incoming,
        s: &mut ChatSession,
    ) -> Result<Flow> {
        let Some((_, is_master)) = self.admin_identity(cx.chat).await? else {
            return self.expire_session(cx.chat).await;
        };
        let Some(text) = cx.text() else {
            return self.choose_notice(cx.chat).await;
        };
        if text == BTN_BACK {
            return self.admin_home(cx.chat, s, is_master).await;
        }

        let code = text.trim().to_uppercase();
        match self.store.delete_camera(&code)? {
            Some(image_path) => {
                remove_media_file(&image_path);
                info!(code = %code, "camera deleted");
                self.chat
                    .send_text(cx.chat, &format!("✅ Camera {code} deleted!"))
                    .await?;
                self.admin_home(cx.chat, s, is_master).await
            }
            None => {
                self.chat
                    .send_text(cx.chat, "❌ No camera with that code.")
                    .await?;
                Ok(Flow::Continue)
            }
        }
    }

    // ---- user list ----

    async fn list_users(&self, cx: &Incoming) -> Result<Flow> {
        let users = self.store.list_users()?;
        if users.is_empty() {
            self.chat.send_text(cx.chat, "📭 No users yet.").await?;
            return Ok(Flow::Continue);
        }
        let header = format!("👥 Users ({}):\n\n", users.len());
        let entries = users.into_iter().map(user_entry).collect();
        self.send_pages(cx.chat, &header, entries).await?;
        Ok(Flow::Continue)
    }

    // ---- project management ----

    pub(super) async fn project_management_home(
        &self,
        cx: &Incoming,
        s: &mut ChatSession,
    ) -> Result<Flow> {
        s.state = State::ProjectManagement;
        self.chat
            .send_text_kb(
                cx.chat,
                "📁 Project management:",
                &project_management_keyboard(),
            )
            .await?;
        Ok(Flow::Continue)
    }

    pub(super) async fn on_project_management(
        &self,
        cx: &Incoming,
        s: &mut ChatSession,
    ) -> Result<Flow> {
        let Some((_, is_master)) = self.admin_identity(cx.chat).await? else {
            return self.expire_session(cx.chat).await;
        };
        let Some(text) = cx.text() else {
            return self.choose_notice(cx.chat).await;
        };

        match ProjectManagementAction::parse(text) {
            ProjectManagementAction::Upload => {
                s.state = State::UploadProjectFile;
                self.chat
                    .send_text_kb(
                        cx.chat,
                        "📤 Send the project file as a document:",
                        &back_only_keyboard(),
                    )
                    .await?;
                Ok(Flow::Continue)
            }
            ProjectManagementAction::List => {
                self.list_projects_admin(cx).await?;
                Ok(Flow::Continue)
            }
            ProjectManagementAction::Delete => {
                self.list_projects_admin(cx).await?;
                s.state = State::DeleteProject;
                self.chat
                    .send_text_kb(
                        cx.chat,
                        "🗑️ Enter the project id to delete:",
                        &back_only_keyboard(),
                    )
                    .await?;
                Ok(Flow::Continue)
            }
            ProjectManagementAction::Back => self.admin_home(cx.chat, s, is_master).await,
            ProjectManagementAction::Unrecognized => self.choose_notice(cx.chat).await,
        }
    }

    async fn list_projects_admin(&self, cx: &Incoming) -> Result<()> {
        let projects = self.store.list_projects()?;
        if projects.is_empty() {
            return self.chat.send_text(cx.chat, "📭 No projects yet.").await;
        }
        let entries = projects
            .into_iter()
            .map(|p| {
                format!(
                    "🆔 {}\n📌 {}\nℹ️ {}\n📂 {}\n{DIVIDER}\n",
                    p.id,
                    p.display_name,
                    p.caption,
                    basename(&p.file_path)
                )
            })
            .collect();
        self.send_pages(cx.chat, "📁 Projects:\n\n", entries).await
    }

    pub(super) async fn on_delete_project(
        &self,
        cx: &Incoming,
        s: &mut ChatSession,
    ) -> Result<Flow> {
        let Some(text) = cx.text() else {
            return self.choose_notice(cx.chat).await;
        };
        if text == BTN_BACK {
            return self.project_management_home(cx, s).await;
        }
        let Ok(id) = text.trim().parse::<i64>() else {
            self.chat
                .send_text(cx.chat, "❌ Invalid id. Send a numeric project id.")
                .await?;
            return Ok(Flow::Continue);
        };

        match self.store.delete_project(id)? {
            Some(file_path) => {
                remove_media_file(&file_path);
                info!(id, "project deleted");
                self.chat.send_text(cx.chat, "✅ Project deleted!").await?;
                self.project_management_home(cx, s).await
            }
            None => {
                self.chat
                    .send_text(cx.chat, "❌ No project with that id.")
                    .await?;
                Ok(Flow::Continue)
            }
        }
    }

    // ---- pack management ----

    pub(super) async fn pack_management_home(
        &self,
        cx: &Incoming,
        s: &mut ChatSession,
        is_master: bool,
    ) -> Result<Flow> {
        s.state = State::PackManagement;
        self.chat
            .send_text_kb(
                cx.chat,
                "📦 Pack management:",
                &pack_management_keyboard(is_master),
            )
            .await?;
        Ok(Flow::Continue)
    }

    pub(super) async fn on_pack_management(
        &self,
        cx: &Incoming,
        s: &mut ChatSession,
    ) -> Result<Flow> {
        let Some((username, is_master)) = self.admin_identity(cx.chat).await? else {
            return self.expire_session(cx.chat).await;
        };
        let Some(text) = cx.text() else {
            return self.choose_notice(cx.chat).await;
        };

        let action = PackManagementAction::parse(text);
        if matches!(
            action,
            PackManagementAction::All | PackManagementAction::Delete
        ) && !is_master
        {
            self.chat.send_text(cx.chat, NOTICE_MASTER_ONLY).await?;
            return Ok(Flow::Continue);
        }

        match action {
            PackManagementAction::Upload => {
                s.state = State::UploadPackFile;
                self.chat
                    .send_text_kb(
                        cx.chat,
                        "📤 Send the pack file as a document:",
                        &back_only_keyboard(),
                    )
                    .await?;
                Ok(Flow::Continue)
            }
            PackManagementAction::Mine => {
                let packs = self.store.packs_by_admin(&username)?;
                self.list_packs_admin(cx, "📦 Your packs:\n\n", packs, false)
                    .await?;
                Ok(Flow::Continue)
            }
            PackManagementAction::All => {
                let packs = self.store.list_packs()?;
                self.list_packs_admin(cx, "📦 All packs:\n\n", packs, true).await?;
                Ok(Flow::Continue)
            }
            PackManagementAction::Delete => {
                let packs = self.store.list_packs()?;
                self.list_packs_admin(cx, "📦 All packs:\n\n", packs, true).await?;
                s.state = State::DeletePack;
                self.chat
                    .send_text_kb(
                        cx.chat,
                        "🗑️ Enter the pack id to delete:",
                        &back_only_keyboard(),
                    )
                    .await?;
                Ok(Flow::Continue)
            }
            PackManagementAction::Back => self.admin_home(cx.chat, s, is_master).await,
            PackManagementAction::Unrecognized => self.choose_notice(cx.chat).await,
        }
    }

    async fn list_packs_admin(
        &self,
        cx: &Incoming,
        header: &str,
        packs: Vec<Pack>,
        with_author: bool,
    ) -> Result<()> {
        if packs.is_empty() {
            return self.chat.send_text(cx.chat, "📭 No packs yet.").await;
        }
        let entries = packs
            .into_iter()
            .map(|p| {
                let mut entry = format!("🆔 {}\n📦 {}\nℹ️ {}\n", p.id, p.display_name, p.caption);
                if with_author {
                    entry.push_str(&format!("👤 Author: {}\n", p.admin_username));
                }
                entry.push_str(DIVIDER);
                entry.push('\n');
                entry
            })
            .collect();
        self.send_pages(cx.chat, header, entries).await
    }

    pub(super) async fn on_delete_pack(&self, cx: &Incoming, s: &mut ChatSession) -> Result<Flow> {
        let Some(text) = cx.text() else {
            return self.choose_notice(cx.chat).await;
        };
        if text == BTN_BACK {
            let Some((_, is_master)) = self.admin_identity(cx.chat).await? else {
                return self.expire_session(cx.chat).await;
            };
            return self.pack_management_home(cx, s, is_master).await;
        }
        let Ok(id) = text.trim().parse::<i64>() else {
            self.chat
                .send_text(cx.chat, "❌ Invalid id. Send a numeric pack id.")
                .await?;
            return Ok(Flow::Continue);
        };

        match self.store.delete_pack(id)? {
            Some(file_path) => {
                remove_media_file(&file_path);
                info!(id, "pack deleted");
                self.chat.send_text(cx.chat, "✅ Pack deleted!").await?;
                let Some((_, is_master)) = self.admin_identity(cx.chat).await? else {
                    return self.expire_session(cx.chat).await;
                };
                self.pack_management_home(cx, s, is_master).await
            }
            None => {
                self.chat
                    .send_text(cx.chat, "❌ No pack with that id.")
                    .await?;
                Ok(Flow::Continue)
            }
        }
    }

    // ---- broadcast ----

    pub(super) async fn on_broadcast_message(
        &self,
        cx: &Incoming,
        s: &mut ChatSession,
    ) -> Result<Flow> {
        let Some((username, is_master)) = self.admin_identity(cx.chat).await? else {
            return self.expire_session(cx.chat).await;
        };
        let Some(text) = cx.text() else {
            return self.choose_notice(cx.chat).await;
        };
        if text == BTN_BACK {
            return self.admin_home(cx.chat, s, is_master).await;
        }

        let recipients = self.store.active_user_ids()?;
        if recipients.is_empty() {
            self.chat
                .send_text(cx.chat, "📭 No users to broadcast to.")
                .await?;
            return self.admin_home(cx.chat, s, is_master).await;
        }

        self.chat
            .send_text(
                cx.chat,
                &format!("⏳ Broadcasting to {} users...", recipients.len()),
            )
            .await?;

        let report = self
            .broadcaster
            .run(&recipients, text, &self.shutdown)
            .await;
        self.store.add_broadcast_record(&username, text)?;
        info!(
            admin = %username,
            success = report.success,
            failed = report.failed,
            "broadcast finished"
        );

        let mut summary = format!(
            "✅ Broadcast finished!\n✔️ Delivered: {}\n❌ Failed: {}",
            report.success, report.failed
        );
        if report.cancelled {
            summary.push_str("\n⚠️ Aborted before reaching everyone.");
        }
        self.chat.send_text(cx.chat, &summary).await?;
        self.admin_home(cx.chat, s, is_master).await
    }

    async fn list_broadcast_history(&self, cx: &Incoming) -> Result<Flow> {
        let history = self.store.broadcast_history()?;
        if history.is_empty() {
            self.chat.send_text(cx.chat, "📭 No broadcasts yet.").await?;
            return Ok(Flow::Continue);
        }
        let entries = history
            .into_iter()
            .map(|r| {
                format!(
                    "⏱️ {}\n👤 @{}\n✉️ {}\n{DIVIDER}\n",
                    r.timestamp, r.admin_username, r.message_text
                )
            })
            .collect();
        self.send_pages(cx.chat, "📊 Broadcast history:\n\n", entries)
            .await?;
        Ok(Flow::Continue)
    }
}

const DIVIDER: &str = "────────────────";

fn user_entry(u: BotUser) -> String {
    let mut entry = format!("🆔 {}\n", u.user_id);
    let name = [u.first_name.as_deref(), u.last_name.as_deref()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");
    if !name.is_empty() {
        entry.push_str(&format!("👤 {name}\n"));
    }
    if let Some(username) = &u.username {
        entry.push_str(&format!("📛 @{username}\n"));
    }
    if u.is_banned {
        entry.push_str("🚫 Banned\n");
    }
    entry.push_str(DIVIDER);
    entry.push('\n');
    entry
}

fn basename(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}

fn remove_media_file(path: &str) {
    if !Path::new(path).is_file() {
        return;
    }
    if let Err(e) = std::fs::remove_file(path) {
        warn!(path, error = %e, "failed to remove media file");
    }
}
