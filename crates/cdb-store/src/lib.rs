//! Sqlite-backed catalog store.
//!
//! One connection behind a mutex; every call is a short point query, so a
//! single connection is plenty. The schema is created on open and default
//! categories are seeded once.

use std::{
    path::Path,
    sync::{Mutex, MutexGuard, PoisonError},
};

use rusqlite::{Connection, OptionalExtension, Row};
use tracing::info;

use cdb_core::{
    domain::{AdminRecord, BotUser, BroadcastRecord, Camera, CategoryCount, Pack, Project},
    store::CatalogStore,
    Error, Result,
};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS admins (
    username      TEXT PRIMARY KEY,
    password      TEXT NOT NULL,
    is_master     INTEGER NOT NULL DEFAULT 0,
    display_name  TEXT
);
CREATE TABLE IF NOT EXISTS cameras (
    code           TEXT PRIMARY KEY,
    category       TEXT NOT NULL,
    image_path     TEXT NOT NULL,
    caption        TEXT NOT NULL,
    custom_name    TEXT,
    admin_username TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS categories (
    name TEXT PRIMARY KEY
);
CREATE TABLE IF NOT EXISTS users (
    user_id    INTEGER PRIMARY KEY,
    username   TEXT,
    first_name TEXT,
    last_name  TEXT,
    is_banned  INTEGER NOT NULL DEFAULT 0
);
CREATE TABLE IF NOT EXISTS projects (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    display_name TEXT NOT NULL,
    caption      TEXT NOT NULL,
    file_path    TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS packs (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    display_name   TEXT NOT NULL,
    caption        TEXT NOT NULL,
    file_path      TEXT NOT NULL,
    admin_username TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS broadcasts (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    admin_username TEXT NOT NULL,
    message_text   TEXT NOT NULL,
    timestamp      TEXT NOT NULL
);
";

const DEFAULT_CATEGORIES: [&str; 3] = ["PTZ", "Speakers", "Drop"];

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(db_err)?;
        let store = Self::init(conn)?;
        info!(path = %path.display(), "catalog database opened");
        Ok(store)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA).map_err(db_err)?;
        for name in DEFAULT_CATEGORIES {
            conn.execute(
                "INSERT OR IGNORE INTO categories (name) VALUES (?1)",
                [name],
            )
            .map_err(db_err)?;
        }
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    #[cfg(test)]
    fn open_in_memory() -> Self {
        Self::init(Connection::open_in_memory().unwrap()).unwrap()
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn db_err(e: rusqlite::Error) -> Error {
    Error::Storage(e.to_string())
}

fn camera_from_row(row: &Row<'_>) -> rusqlite::Result<Camera> {
    Ok(Camera {
        code: row.get(0)?,
        category: row.get(1)?,
        image_path: row.get(2)?,
        caption: row.get(3)?,
        custom_name: row.get(4)?,
        admin_username: row.get(5)?,
    })
}

fn now_timestamp() -> String {
    chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

impl CatalogStore for SqliteStore {
    fn add_admin(
        &self,
        username: &str,
        password: &str,
        is_master: bool,
        display_name: Option<&str>,
    ) -> Result<bool> {
        let changed = self
            .conn()
            .execute(
                "INSERT OR IGNORE INTO admins (username, password, is_master, display_name)
                 VALUES (?1, ?2, ?3, ?4)",
                (username, password, is_master as i64, display_name),
            )
            .map_err(db_err)?;
        Ok(changed == 1)
    }

    fn admin_exists(&self, username: &str) -> Result<bool> {
        self.conn()
            .query_row(
                "SELECT 1 FROM admins WHERE username = ?1",
                [username],
                |_| Ok(()),
            )
            .optional()
            .map(|r| r.is_some())
            .map_err(db_err)
    }

    fn verify_admin(&self, username: &str, password: &str) -> Result<bool> {
        self.conn()
            .query_row(
                "SELECT 1 FROM admins WHERE username = ?1 AND password = ?2",
                (username, password),
                |_| Ok(()),
            )
            .optional()
            .map(|r| r.is_some())
            .map_err(db_err)
    }

    fn is_master_admin(&self, username: &str) -> Result<bool> {
        self.conn()
            .query_row(
                "SELECT is_master FROM admins WHERE username = ?1",
                [username],
                |row| row.get::<_, i64>(0),
            )
            .optional()
            .map(|r| r == Some(1))
            .map_err(db_err)
    }

    fn set_admin_password(&self, username: &str, password: &str) -> Result<()> {
        self.conn()
            .execute(
                "UPDATE admins SET password = ?2 WHERE username = ?1",
                (username, password),
            )
            .map_err(db_err)?;
        Ok(())
    }

    fn delete_admin(&self, username: &str) -> Result<()> {
        self.conn()
            .execute("DELETE FROM admins WHERE username = ?1", [username])
            .map_err(db_err)?;
        Ok(())
    }

    fn list_admins(&self) -> Result<Vec<AdminRecord>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT username, display_name, is_master FROM admins ORDER BY is_master DESC, username",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(AdminRecord {
                    username: row.get(0)?,
                    display_name: row.get(1)?,
                    is_master: row.get::<_, i64>(2)? == 1,
                })
            })
            .map_err(db_err)?;
        rows.collect::<rusqlite::Result<_>>().map_err(db_err)
    }

    fn add_camera(&self, camera: &Camera) -> Result<bool> {
        let changed = self
            .conn()
            .execute(
                "INSERT OR IGNORE INTO cameras
                 (code, category, image_path, caption, custom_name, admin_username)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                (
                    &camera.code,
                    &camera.category,
                    &camera.image_path,
                    &camera.caption,
                    &camera.custom_name,
                    &camera.admin_username,
                ),
            )
            .map_err(db_err)?;
        Ok(changed == 1)
    }

    fn get_camera(&self, code: &str) -> Result<Option<Camera>> {
        self.conn()
            .query_row(
                "SELECT code, category, image_path, caption, custom_name, admin_username
                 FROM cameras WHERE code = ?1",
                [code],
                camera_from_row,
            )
            .optional()
            .map_err(db_err)
    }

    fn delete_camera(&self, code: &str) -> Result<Option<String>> {
        let conn = self.conn();
        let image_path: Option<String> = conn
            .query_row(
                "SELECT image_path FROM cameras WHERE code = ?1",
                [code],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err)?;
        if image_path.is_some() {
            conn.execute("DELETE FROM cameras WHERE code = ?1", [code])
                .map_err(db_err)?;
        }
        Ok(image_path)
    }

    fn cameras_by_admin(&self, username: &str) -> Result<Vec<Camera>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT code, category, image_path, caption, custom_name, admin_username
                 FROM cameras WHERE admin_username = ?1 ORDER BY category, code",
            )
            .map_err(db_err)?;
        let rows = stmt.query_map([username], camera_from_row).map_err(db_err)?;
        rows.collect::<rusqlite::Result<_>>().map_err(db_err)
    }

    fn all_cameras(&self) -> Result<Vec<Camera>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT code, category, image_path, caption, custom_name, admin_username
                 FROM cameras ORDER BY category, code",
            )
            .map_err(db_err)?;
        let rows = stmt.query_map([], camera_from_row).map_err(db_err)?;
        rows.collect::<rusqlite::Result<_>>().map_err(db_err)
    }

    fn camera_stats(&self) -> Result<Vec<CategoryCount>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT category, COUNT(*) FROM cameras GROUP BY category ORDER BY category",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(CategoryCount {
                    category: row.get(0)?,
                    count: row.get::<_, i64>(1)? as u64,
                })
            })
            .map_err(db_err)?;
        rows.collect::<rusqlite::Result<_>>().map_err(db_err)
    }

    fn add_category(&self, name: &str) -> Result<bool> {
        let changed = self
            .conn()
            .execute("INSERT OR IGNORE INTO categories (name) VALUES (?1)", [name])
            .map_err(db_err)?;
        Ok(changed == 1)
    }

    fn delete_category(&self, name: &str) -> Result<bool> {
        let changed = self
            .conn()
            .execute("DELETE FROM categories WHERE name = ?1", [name])
            .map_err(db_err)?;
        Ok(changed == 1)
    }

    fn list_categories(&self) -> Result<Vec<String>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT name FROM categories ORDER BY rowid")
            .map_err(db_err)?;
        let rows = stmt.query_map([], |row| row.get(0)).map_err(db_err)?;
        rows.collect::<rusqlite::Result<_>>().map_err(db_err)
    }

    fn upsert_user(
        &self,
        user_id: i64,
        username: Option<&str>,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> Result<()> {
        // Profile fields refresh on every /start; the ban flag never does.
        self.conn()
            .execute(
                "INSERT INTO users (user_id, username, first_name, last_name)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(user_id) DO UPDATE SET
                   username = excluded.username,
                   first_name = excluded.first_name,
                   last_name = excluded.last_name",
                (user_id, username, first_name, last_name),
            )
            .map_err(db_err)?;
        Ok(())
    }

    fn list_users(&self) -> Result<Vec<BotUser>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT user_id, username, first_name, last_name, is_banned
                 FROM users ORDER BY user_id",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(BotUser {
                    user_id: row.get(0)?,
                    username: row.get(1)?,
                    first_name: row.get(2)?,
                    last_name: row.get(3)?,
                    is_banned: row.get::<_, i64>(4)? == 1,
                })
            })
            .map_err(db_err)?;
        rows.collect::<rusqlite::Result<_>>().map_err(db_err)
    }

    fn active_user_ids(&self) -> Result<Vec<i64>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT user_id FROM users WHERE is_banned = 0 ORDER BY user_id")
            .map_err(db_err)?;
        let rows = stmt.query_map([], |row| row.get(0)).map_err(db_err)?;
        rows.collect::<rusqlite::Result<_>>().map_err(db_err)
    }

    fn ban_user(&self, user_id: i64) -> Result<()> {
        let conn = self.conn();
        // Bans apply to ids the bot has never seen too.
        conn.execute(
            "INSERT OR IGNORE INTO users (user_id) VALUES (?1)",
            [user_id],
        )
        .map_err(db_err)?;
        conn.execute(
            "UPDATE users SET is_banned = 1 WHERE user_id = ?1",
            [user_id],
        )
        .map_err(db_err)?;
        Ok(())
    }

    fn unban_user(&self, user_id: i64) -> Result<()> {
        self.conn()
            .execute(
                "UPDATE users SET is_banned = 0 WHERE user_id = ?1",
                [user_id],
            )
            .map_err(db_err)?;
        Ok(())
    }

    fn is_banned(&self, user_id: i64) -> Result<bool> {
        self.conn()
            .query_row(
                "SELECT is_banned FROM users WHERE user_id = ?1",
                [user_id],
                |row| row.get::<_, i64>(0),
            )
            .optional()
            .map(|r| r == Some(1))
            .map_err(db_err)
    }

    fn banned_user_ids(&self) -> Result<Vec<i64>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT user_id FROM users WHERE is_banned = 1 ORDER BY user_id")
            .map_err(db_err)?;
        let rows = stmt.query_map([], |row| row.get(0)).map_err(db_err)?;
        rows.collect::<rusqlite::Result<_>>().map_err(db_err)
    }

    fn add_project(&self, file_path: &str, caption: &str, display_name: &str) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO projects (display_name, caption, file_path) VALUES (?1, ?2, ?3)",
                (display_name, caption, file_path),
            )
            .map_err(db_err)?;
        Ok(())
    }

    fn list_projects(&self) -> Result<Vec<Project>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT id, display_name, caption, file_path FROM projects ORDER BY id")
            .map_err(db_err)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Project {
                    id: row.get(0)?,
                    display_name: row.get(1)?,
                    caption: row.get(2)?,
                    file_path: row.get(3)?,
                })
            })
            .map_err(db_err)?;
        rows.collect::<rusqlite::Result<_>>().map_err(db_err)
    }

    fn delete_project(&self, id: i64) -> Result<Option<String>> {
        let conn = self.conn();
        let file_path: Option<String> = conn
            .query_row(
                "SELECT file_path FROM projects WHERE id = ?1",
                [id],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err)?;
        if file_path.is_some() {
            conn.execute("DELETE FROM projects WHERE id = ?1", [id])
                .map_err(db_err)?;
        }
        Ok(file_path)
    }

    fn add_pack(
        &self,
        file_path: &str,
        caption: &str,
        display_name: &str,
        admin_username: &str,
    ) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO packs (display_name, caption, file_path, admin_username)
                 VALUES (?1, ?2, ?3, ?4)",
                (display_name, caption, file_path, admin_username),
            )
            .map_err(db_err)?;
        Ok(())
    }

    fn list_packs(&self) -> Result<Vec<Pack>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT id, display_name, caption, file_path, admin_username
                 FROM packs ORDER BY id",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Pack {
                    id: row.get(0)?,
                    display_name: row.get(1)?,
                    caption: row.get(2)?,
                    file_path: row.get(3)?,
                    admin_username: row.get(4)?,
                })
            })
            .map_err(db_err)?;
        rows.collect::<rusqlite::Result<_>>().map_err(db_err)
    }

    fn packs_by_admin(&self, username: &str) -> Result<Vec<Pack>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT id, display_name, caption, file_path, admin_username
                 FROM packs WHERE admin_username = ?1 ORDER BY id",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map([username], |row| {
                Ok(Pack {
                    id: row.get(0)?,
                    display_name: row.get(1)?,
                    caption: row.get(2)?,
                    file_path: row.get(3)?,
                    admin_username: row.get(4)?,
                })
            })
            .map_err(db_err)?;
        rows.collect::<rusqlite::Result<_>>().map_err(db_err)
    }

    fn delete_pack(&self, id: i64) -> Result<Option<String>> {
        let conn = self.conn();
        let file_path: Option<String> = conn
            .query_row("SELECT file_path FROM packs WHERE id = ?1", [id], |row| {
                row.get(0)
            })
            .optional()
            .map_err(db_err)?;
        if file_path.is_some() {
            conn.execute("DELETE FROM packs WHERE id = ?1", [id])
                .map_err(db_err)?;
        }
        Ok(file_path)
    }

    fn add_broadcast_record(&self, admin_username: &str, message_text: &str) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO broadcasts (admin_username, message_text, timestamp)
                 VALUES (?1, ?2, ?3)",
                (admin_username, message_text, now_timestamp()),
            )
            .map_err(db_err)?;
        Ok(())
    }

    fn broadcast_history(&self) -> Result<Vec<BroadcastRecord>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT id, admin_username, message_text, timestamp
                 FROM broadcasts ORDER BY id DESC",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(BroadcastRecord {
                    id: row.get(0)?,
                    admin_username: row.get(1)?,
                    message_text: row.get(2)?,
                    timestamp: row.get(3)?,
                })
            })
            .map_err(db_err)?;
        rows.collect::<rusqlite::Result<_>>().map_err(db_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera(code: &str, category: &str) -> Camera {
        Camera {
            code: code.to_string(),
            category: category.to_string(),
            image_path: format!("/tmp/{code}.jpg"),
            caption: "caption".to_string(),
            custom_name: None,
            admin_username: "alice".to_string(),
        }
    }

    #[test]
    fn default_categories_are_seeded_once() {
        let store = SqliteStore::open_in_memory();
        let cats = store.list_categories().unwrap();
        assert_eq!(cats, vec!["PTZ", "Speakers", "Drop"]);

        assert!(store.add_category("Indoor").unwrap());
        assert!(!store.add_category("PTZ").unwrap());
        assert_eq!(store.list_categories().unwrap().len(), 4);

        assert!(store.delete_category("Indoor").unwrap());
        assert!(!store.delete_category("Indoor").unwrap());
    }

    #[test]
    fn admin_logins_are_unique_and_verifiable() {
        let store = SqliteStore::open_in_memory();
        assert!(store.add_admin("alice", "pw1", true, Some("Alice")).unwrap());
        assert!(!store.add_admin("alice", "other", false, None).unwrap());

        assert!(store.verify_admin("alice", "pw1").unwrap());
        assert!(!store.verify_admin("alice", "wrong").unwrap());
        assert!(store.is_master_admin("alice").unwrap());
        assert!(!store.is_master_admin("nobody").unwrap());

        store.set_admin_password("alice", "pw2").unwrap();
        assert!(store.verify_admin("alice", "pw2").unwrap());
        assert!(!store.verify_admin("alice", "pw1").unwrap());

        store.add_admin("bob", "pw", false, Some("Bob")).unwrap();
        let admins = store.list_admins().unwrap();
        assert_eq!(admins.len(), 2);
        // Masters list first.
        assert_eq!(admins[0].username, "alice");

        store.delete_admin("bob").unwrap();
        assert!(!store.admin_exists("bob").unwrap());
    }

    #[test]
    fn camera_codes_collide_without_clobbering() {
        let store = SqliteStore::open_in_memory();
        assert!(store.add_camera(&camera("AAAA1111", "PTZ")).unwrap());
        assert!(!store.add_camera(&camera("AAAA1111", "Drop")).unwrap());

        let got = store.get_camera("AAAA1111").unwrap().unwrap();
        assert_eq!(got.category, "PTZ");
        assert!(store.get_camera("ZZZZ9999").unwrap().is_none());
    }

    #[test]
    fn camera_delete_returns_the_image_path() {
        let store = SqliteStore::open_in_memory();
        store.add_camera(&camera("AAAA1111", "PTZ")).unwrap();

        let path = store.delete_camera("AAAA1111").unwrap();
        assert_eq!(path.as_deref(), Some("/tmp/AAAA1111.jpg"));
        assert!(store.delete_camera("AAAA1111").unwrap().is_none());
    }

    #[test]
    fn camera_stats_group_by_category() {
        let store = SqliteStore::open_in_memory();
        store.add_camera(&camera("AAAA1111", "PTZ")).unwrap();
        store.add_camera(&camera("BBBB2222", "PTZ")).unwrap();
        store.add_camera(&camera("CCCC3333", "Drop")).unwrap();

        let stats = store.camera_stats().unwrap();
        assert_eq!(stats.len(), 2);
        let ptz = stats.iter().find(|s| s.category == "PTZ").unwrap();
        assert_eq!(ptz.count, 2);

        let mine = store.cameras_by_admin("alice").unwrap();
        assert_eq!(mine.len(), 3);
        assert!(store.cameras_by_admin("bob").unwrap().is_empty());
    }

    #[test]
    fn bans_survive_profile_upserts() {
        let store = SqliteStore::open_in_memory();
        store.upsert_user(7, Some("u7"), Some("Seven"), None).unwrap();
        store.ban_user(7).unwrap();
        assert!(store.is_banned(7).unwrap());

        // /start refreshes the profile but must not lift the ban.
        store.upsert_user(7, Some("u7-new"), Some("Seven"), None).unwrap();
        assert!(store.is_banned(7).unwrap());
        let users = store.list_users().unwrap();
        assert_eq!(users[0].username.as_deref(), Some("u7-new"));

        store.unban_user(7).unwrap();
        assert!(!store.is_banned(7).unwrap());
    }

    #[test]
    fn bans_work_for_unknown_ids() {
        let store = SqliteStore::open_in_memory();
        store.ban_user(99).unwrap();
        assert!(store.is_banned(99).unwrap());
        assert_eq!(store.banned_user_ids().unwrap(), vec![99]);
        assert!(store.active_user_ids().unwrap().is_empty());
    }

    #[test]
    fn active_ids_exclude_banned_users() {
        let store = SqliteStore::open_in_memory();
        store.upsert_user(1, None, None, None).unwrap();
        store.upsert_user(2, None, None, None).unwrap();
        store.ban_user(2).unwrap();
        assert_eq!(store.active_user_ids().unwrap(), vec![1]);
    }

    #[test]
    fn projects_get_sequential_ids() {
        let store = SqliteStore::open_in_memory();
        store.add_project("/tmp/a.zip", "first", "A").unwrap();
        store.add_project("/tmp/b.zip", "second", "B").unwrap();

        let projects = store.list_projects().unwrap();
        assert_eq!(projects.len(), 2);
        assert!(projects[0].id < projects[1].id);

        let removed = store.delete_project(projects[0].id).unwrap();
        assert_eq!(removed.as_deref(), Some("/tmp/a.zip"));
        assert!(store.delete_project(projects[0].id).unwrap().is_none());
        assert_eq!(store.list_projects().unwrap().len(), 1);
    }

    #[test]
    fn packs_filter_by_admin() {
        let store = SqliteStore::open_in_memory();
        store.add_pack("/tmp/p1.zip", "c1", "P1", "alice").unwrap();
        store.add_pack("/tmp/p2.zip", "c2", "P2", "bob").unwrap();

        assert_eq!(store.list_packs().unwrap().len(), 2);
        let mine = store.packs_by_admin("alice").unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].display_name, "P1");
    }

    #[test]
    fn broadcast_history_is_most_recent_first() {
        let store = SqliteStore::open_in_memory();
        store.add_broadcast_record("alice", "first").unwrap();
        store.add_broadcast_record("alice", "second").unwrap();

        let history = store.broadcast_history().unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].message_text, "second");
        assert_eq!(history[1].message_text, "first");
    }
}
