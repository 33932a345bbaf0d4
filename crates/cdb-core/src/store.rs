//! Catalog store port.
//!
//! The persistent catalog (admins, cameras, categories, users, bans, projects,
//! packs, broadcast log) lives behind this trait; the sqlite adapter in
//! `cdb-store` is the production implementation and the engine tests use an
//! in-memory one. Methods are synchronous: every call is a point lookup or a
//! small scan, cheap enough to run inline on the async workers.
//!
//! Uniqueness contract: camera codes and admin usernames are unique; inserts
//! that would violate that return `Ok(false)` rather than an error so callers
//! can regenerate/renotify.

use crate::{
    domain::{AdminRecord, BotUser, BroadcastRecord, Camera, CategoryCount, Pack, Project},
    Result,
};

pub trait CatalogStore: Send + Sync {
    // ---- admins ----
    fn add_admin(
        &self,
        username: &str,
        password: &str,
        is_master: bool,
        display_name: Option<&str>,
    ) -> Result<bool>;
    fn admin_exists(&self, username: &str) -> Result<bool>;
    fn verify_admin(&self, username: &str, password: &str) -> Result<bool>;
    fn is_master_admin(&self, username: &str) -> Result<bool>;
    fn set_admin_password(&self, username: &str, password: &str) -> Result<()>;
    fn delete_admin(&self, username: &str) -> Result<()>;
    fn list_admins(&self) -> Result<Vec<AdminRecord>>;

    // ---- cameras ----
    /// Insert with the caller-supplied code; `Ok(false)` on code collision.
    fn add_camera(&self, camera: &Camera) -> Result<bool>;
    fn get_camera(&self, code: &str) -> Result<Option<Camera>>;
    /// Returns the removed camera's image path, or `None` if the code is
    /// unknown (catalog untouched).
    fn delete_camera(&self, code: &str) -> Result<Option<String>>;
    fn cameras_by_admin(&self, username: &str) -> Result<Vec<Camera>>;
    fn all_cameras(&self) -> Result<Vec<Camera>>;
    fn camera_stats(&self) -> Result<Vec<CategoryCount>>;

    // ---- categories ----
    /// `Ok(false)` if the category already exists.
    fn add_category(&self, name: &str) -> Result<bool>;
    /// `Ok(false)` if there was no such category.
    fn delete_category(&self, name: &str) -> Result<bool>;
    fn list_categories(&self) -> Result<Vec<String>>;

    // ---- users / bans ----
    fn upsert_user(
        &self,
        user_id: i64,
        username: Option<&str>,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> Result<()>;
    fn list_users(&self) -> Result<Vec<BotUser>>;
    /// All registered, non-banned user ids (broadcast recipients).
    fn active_user_ids(&self) -> Result<Vec<i64>>;
    fn ban_user(&self, user_id: i64) -> Result<()>;
    fn unban_user(&self, user_id: i64) -> Result<()>;
    fn is_banned(&self, user_id: i64) -> Result<bool>;
    fn banned_user_ids(&self) -> Result<Vec<i64>>;

    // ---- projects ----
    fn add_project(&self, file_path: &str, caption: &str, display_name: &str) -> Result<()>;
    fn list_projects(&self) -> Result<Vec<Project>>;
    fn delete_project(&self, id: i64) -> Result<Option<String>>;

    // ---- packs ----
    fn add_pack(
        &self,
        file_path: &str,
        caption: &str,
        display_name: &str,
        admin_username: &str,
    ) -> Result<()>;
    fn list_packs(&self) -> Result<Vec<Pack>>;
    fn packs_by_admin(&self, username: &str) -> Result<Vec<Pack>>;
    fn delete_pack(&self, id: i64) -> Result<Option<String>>;

    // ---- broadcast log ----
    fn add_broadcast_record(&self, admin_username: &str, message_text: &str) -> Result<()>;
    /// Most recent first.
    fn broadcast_history(&self) -> Result<Vec<BroadcastRecord>>;
}
