//! End-to-end engine tests against in-memory fakes: a recording chat port,
//! a hashmap-backed catalog, and a switchable membership gate.

use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, AtomicU32, Ordering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;

use super::*;
use crate::{
    domain::{AdminRecord, BotUser, BroadcastRecord, Camera, CategoryCount, Pack, Project},
    errors::Error,
    keyboards::{
        ReplyKeyboard, BTN_ADMIN_LOGIN, BTN_BAN, BTN_BROADCAST, BTN_ENTER_CODE, BTN_MANAGE_BANS,
        BTN_PROJECTS, BTN_SUBSCRIBED, BTN_UPLOAD,
    },
    ports::{ChatPort, SubscriptionGate},
    store::CatalogStore,
};

#[derive(Clone, Debug, PartialEq)]
enum Out {
    Text { chat: i64, text: String },
    Photo { chat: i64, caption: String },
    Document { chat: i64, caption: String, filename: String },
}

#[derive(Default)]
struct RecordingChat {
    outbox: Mutex<Vec<Out>>,
}

impl RecordingChat {
    fn last_text(&self) -> String {
        self.outbox
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find_map(|o| match o {
                Out::Text { text, .. } => Some(text.clone()),
                _ => None,
            })
            .expect("no text sent")
    }

    fn texts(&self) -> Vec<String> {
        self.outbox
            .lock()
            .unwrap()
            .iter()
            .filter_map(|o| match o {
                Out::Text { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    fn photos(&self) -> Vec<Out> {
        self.outbox
            .lock()
            .unwrap()
            .iter()
            .filter(|o| matches!(o, Out::Photo { .. }))
            .cloned()
            .collect()
    }

    fn documents(&self) -> Vec<Out> {
        self.outbox
            .lock()
            .unwrap()
            .iter()
            .filter(|o| matches!(o, Out::Document { .. }))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ChatPort for RecordingChat {
    async fn send_text(&self, chat: ChatId, text: &str) -> Result<()> {
        self.outbox.lock().unwrap().push(Out::Text {
            chat: chat.0,
            text: text.to_string(),
        });
        Ok(())
    }

    async fn send_text_kb(
        &self,
        chat: ChatId,
        text: &str,
        _keyboard: &ReplyKeyboard,
    ) -> Result<()> {
        self.send_text(chat, text).await
    }

    async fn send_text_remove_kb(&self, chat: ChatId, text: &str) -> Result<()> {
        self.send_text(chat, text).await
    }

    async fn send_photo(&self, chat: ChatId, _path: &Path, caption: &str) -> Result<()> {
        self.outbox.lock().unwrap().push(Out::Photo {
            chat: chat.0,
            caption: caption.to_string(),
        });
        Ok(())
    }

    async fn send_document(
        &self,
        chat: ChatId,
        _path: &Path,
        caption: &str,
        filename: &str,
    ) -> Result<()> {
        self.outbox.lock().unwrap().push(Out::Document {
            chat: chat.0,
            caption: caption.to_string(),
            filename: filename.to_string(),
        });
        Ok(())
    }

    async fn download_file(&self, _file_id: &str, dest: &Path) -> Result<()> {
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(dest, b"media")?;
        Ok(())
    }
}

struct StaticGate {
    member: AtomicBool,
}

impl StaticGate {
    fn new(member: bool) -> Arc<Self> {
        Arc::new(Self {
            member: AtomicBool::new(member),
        })
    }

    fn set_member(&self, member: bool) {
        self.member.store(member, Ordering::SeqCst);
    }
}

#[async_trait]
impl SubscriptionGate for StaticGate {
    async fn is_member(&self, _user: UserId) -> bool {
        self.member.load(Ordering::SeqCst)
    }
}

#[derive(Clone)]
struct AdminRow {
    username: String,
    password: String,
    is_master: bool,
    display_name: Option<String>,
}

#[derive(Default)]
struct Inner {
    admins: Vec<AdminRow>,
    cameras: Vec<Camera>,
    categories: Vec<String>,
    users: Vec<BotUser>,
    projects: Vec<Project>,
    packs: Vec<Pack>,
    broadcasts: Vec<BroadcastRecord>,
    next_id: i64,
}

#[derive(Default)]
struct MemoryStore {
    inner: Mutex<Inner>,
    fail_get_camera: AtomicBool,
}

impl MemoryStore {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

impl CatalogStore for MemoryStore {
    fn add_admin(
        &self,
        username: &str,
        password: &str,
        is_master: bool,
        display_name: Option<&str>,
    ) -> Result<bool> {
        let mut inner = self.inner.lock().unwrap();
        if inner.admins.iter().any(|a| a.username == username) {
            return Ok(false);
        }
        inner.admins.push(AdminRow {
            username: username.to_string(),
            password: password.to_string(),
            is_master,
            display_name: display_name.map(str::to_string),
        });
        Ok(true)
    }

    fn admin_exists(&self, username: &str) -> Result<bool> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .admins
            .iter()
            .any(|a| a.username == username))
    }

    fn verify_admin(&self, username: &str, password: &str) -> Result<bool> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .admins
            .iter()
            .any(|a| a.username == username && a.password == password))
    }

    fn is_master_admin(&self, username: &str) -> Result<bool> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .admins
            .iter()
            .any(|a| a.username == username && a.is_master))
    }

    fn set_admin_password(&self, username: &str, password: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(a) = inner.admins.iter_mut().find(|a| a.username == username) {
            a.password = password.to_string();
        }
        Ok(())
    }

    fn delete_admin(&self, username: &str) -> Result<()> {
        self.inner
            .lock()
            .unwrap()
            .admins
            .retain(|a| a.username != username);
        Ok(())
    }

    fn list_admins(&self) -> Result<Vec<AdminRecord>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .admins
            .iter()
            .map(|a| AdminRecord {
                username: a.username.clone(),
                display_name: a.display_name.clone(),
                is_master: a.is_master,
            })
            .collect())
    }

    fn add_camera(&self, camera: &Camera) -> Result<bool> {
        let mut inner = self.inner.lock().unwrap();
        if inner.cameras.iter().any(|c| c.code == camera.code) {
            return Ok(false);
        }
        inner.cameras.push(camera.clone());
        Ok(true)
    }

    fn get_camera(&self, code: &str) -> Result<Option<Camera>> {
        if self.fail_get_camera.load(Ordering::SeqCst) {
            return Err(Error::Storage("store offline".to_string()));
        }
        Ok(self
            .inner
            .lock()
            .unwrap()
            .cameras
            .iter()
            .find(|c| c.code == code)
            .cloned())
    }

    fn delete_camera(&self, code: &str) -> Result<Option<String>> {
        let mut inner = self.inner.lock().unwrap();
        match inner.cameras.iter().position(|c| c.code == code) {
            Some(idx) => Ok(Some(inner.cameras.remove(idx).image_path)),
            None => Ok(None),
        }
    }

    fn cameras_by_admin(&self, username: &str) -> Result<Vec<Camera>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .cameras
            .iter()
            .filter(|c| c.admin_username == username)
            .cloned()
            .collect())
    }

    fn all_cameras(&self) -> Result<Vec<Camera>> {
        Ok(self.inner.lock().unwrap().cameras.clone())
    }

    fn camera_stats(&self) -> Result<Vec<CategoryCount>> {
        let inner = self.inner.lock().unwrap();
        let mut stats: Vec<CategoryCount> = Vec::new();
        for camera in &inner.cameras {
            match stats.iter_mut().find(|s| s.category == camera.category) {
                Some(s) => s.count += 1,
                None => stats.push(CategoryCount {
                    category: camera.category.clone(),
                    count: 1,
                }),
            }
        }
        Ok(stats)
    }

    fn add_category(&self, name: &str) -> Result<bool> {
        let mut inner = self.inner.lock().unwrap();
        if inner.categories.iter().any(|c| c == name) {
            return Ok(false);
        }
        inner.categories.push(name.to_string());
        Ok(true)
    }

    fn delete_category(&self, name: &str) -> Result<bool> {
        let mut inner = self.inner.lock().unwrap();
        let before = inner.categories.len();
        inner.categories.retain(|c| c != name);
        Ok(inner.categories.len() < before)
    }

    fn list_categories(&self) -> Result<Vec<String>> {
        Ok(self.inner.lock().unwrap().categories.clone())
    }

    fn upsert_user(
        &self,
        user_id: i64,
        username: Option<&str>,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        match inner.users.iter_mut().find(|u| u.user_id == user_id) {
            Some(u) => {
                u.username = username.map(str::to_string);
                u.first_name = first_name.map(str::to_string);
                u.last_name = last_name.map(str::to_string);
            }
            None => inner.users.push(BotUser {
                user_id,
                username: username.map(str::to_string),
                first_name: first_name.map(str::to_string),
                last_name: last_name.map(str::to_string),
                is_banned: false,
            }),
        }
        Ok(())
    }

    fn list_users(&self) -> Result<Vec<BotUser>> {
        Ok(self.inner.lock().unwrap().users.clone())
    }

    fn active_user_ids(&self) -> Result<Vec<i64>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .users
            .iter()
            .filter(|u| !u.is_banned)
            .map(|u| u.user_id)
            .collect())
    }

    fn ban_user(&self, user_id: i64) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        match inner.users.iter_mut().find(|u| u.user_id == user_id) {
            Some(u) => u.is_banned = true,
            None => inner.users.push(BotUser {
                user_id,
                username: None,
                first_name: None,
                last_name: None,
                is_banned: true,
            }),
        }
        Ok(())
    }

    fn unban_user(&self, user_id: i64) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(u) = inner.users.iter_mut().find(|u| u.user_id == user_id) {
            u.is_banned = false;
        }
        Ok(())
    }

    fn is_banned(&self, user_id: i64) -> Result<bool> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .users
            .iter()
            .any(|u| u.user_id == user_id && u.is_banned))
    }

    fn banned_user_ids(&self) -> Result<Vec<i64>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .users
            .iter()
            .filter(|u| u.is_banned)
            .map(|u| u.user_id)
            .collect())
    }

    fn add_project(&self, file_path: &str, caption: &str, display_name: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.projects.push(Project {
            id,
            display_name: display_name.to_string(),
            caption: caption.to_string(),
            file_path: file_path.to_string(),
        });
        Ok(())
    }

    fn list_projects(&self) -> Result<Vec<Project>> {
        Ok(self.inner.lock().unwrap().projects.clone())
    }

    fn delete_project(&self, id: i64) -> Result<Option<String>> {
        let mut inner = self.inner.lock().unwrap();
        match inner.projects.iter().position(|p| p.id == id) {
            Some(idx) => Ok(Some(inner.projects.remove(idx).file_path)),
            None => Ok(None),
        }
    }

    fn add_pack(
        &self,
        file_path: &str,
        caption: &str,
        display_name: &str,
        admin_username: &str,
    ) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.packs.push(Pack {
            id,
            display_name: display_name.to_string(),
            caption: caption.to_string(),
            file_path: file_path.to_string(),
            admin_username: admin_username.to_string(),
        });
        Ok(())
    }

    fn list_packs(&self) -> Result<Vec<Pack>> {
        Ok(self.inner.lock().unwrap().packs.clone())
    }

    fn packs_by_admin(&self, username: &str) -> Result<Vec<Pack>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .packs
            .iter()
            .filter(|p| p.admin_username == username)
            .cloned()
            .collect())
    }

    fn delete_pack(&self, id: i64) -> Result<Option<String>> {
        let mut inner = self.inner.lock().unwrap();
        match inner.packs.iter().position(|p| p.id == id) {
            Some(idx) => Ok(Some(inner.packs.remove(idx).file_path)),
            None => Ok(None),
        }
    }

    fn add_broadcast_record(&self, admin_username: &str, message_text: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.broadcasts.push(BroadcastRecord {
            id,
            admin_username: admin_username.to_string(),
            message_text: message_text.to_string(),
            timestamp: chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        });
        Ok(())
    }

    fn broadcast_history(&self) -> Result<Vec<BroadcastRecord>> {
        let mut history = self.inner.lock().unwrap().broadcasts.clone();
        history.reverse();
        Ok(history)
    }
}

static TEST_DIR_SEQ: AtomicU32 = AtomicU32::new(0);

fn temp_data_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "cdb-engine-test-{}-{}",
        std::process::id(),
        TEST_DIR_SEQ.fetch_add(1, Ordering::SeqCst)
    ));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

struct Harness {
    engine: Engine,
    chat: Arc<RecordingChat>,
    store: Arc<MemoryStore>,
    gate: Arc<StaticGate>,
    data_dir: PathBuf,
}

fn harness() -> Harness {
    let data_dir = temp_data_dir();
    let mut cfg = Config::for_tests(data_dir.clone());
    // Keep the flood guard out of the way unless a test targets it.
    cfg.rate_limit_burst = 1_000;
    let store = MemoryStore::new();
    let chat = Arc::new(RecordingChat::default());
    let gate = StaticGate::new(true);
    let engine = Engine::new(Arc::new(cfg), store.clone(), chat.clone(), gate.clone());
    Harness {
        engine,
        chat,
        store,
        gate,
        data_dir,
    }
}

fn msg(user: i64, event: Event) -> Incoming {
    Incoming {
        chat: ChatId(user),
        user: UserId(user),
        username: Some(format!("user{user}")),
        first_name: Some("Test".to_string()),
        last_name: None,
        event,
    }
}

fn text(user: i64, t: &str) -> Incoming {
    msg(user, Event::Text(t.to_string()))
}

/// Drive the master bootstrap login for the allowlisted "alice".
async fn login_master(h: &Harness, user: i64) {
    h.engine.handle(msg(user, Event::Start)).await;
    h.engine.handle(text(user, BTN_ADMIN_LOGIN)).await;
    h.engine.handle(text(user, "alice")).await;
    h.engine.handle(text(user, "secret")).await;
    assert!(h.chat.last_text().contains("master admin alice"));
}

#[tokio::test]
async fn start_onboards_subscribed_user() {
    let h = harness();
    h.engine.handle(msg(7, Event::Start)).await;

    assert!(h.chat.last_text().contains("Welcome"));
    let users = h.store.list_users().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].user_id, 7);
}

#[tokio::test]
async fn unsubscribed_user_is_held_at_the_gate() {
    let h = harness();
    h.gate.set_member(false);

    h.engine.handle(msg(7, Event::Start)).await;
    assert!(h.chat.last_text().contains("subscribe"));

    // The claim button alone does not unlock; the probe must pass.
    h.engine.handle(text(7, BTN_SUBSCRIBED)).await;
    assert!(h.chat.last_text().contains("subscribe"));

    h.gate.set_member(true);
    h.engine.handle(text(7, BTN_SUBSCRIBED)).await;
    assert!(h.chat.last_text().contains("Thanks for subscribing"));
}

#[tokio::test]
async fn membership_lapse_redirects_mid_conversation() {
    let h = harness();
    h.engine.handle(msg(7, Event::Start)).await;

    h.gate.set_member(false);
    h.engine.handle(text(7, BTN_PROJECTS)).await;
    assert!(h.chat.last_text().contains("subscribe"));
}

#[tokio::test]
async fn banned_user_is_turned_away() {
    let h = harness();
    h.store.ban_user(7).unwrap();

    h.engine.handle(msg(7, Event::Start)).await;
    assert!(h.chat.last_text().contains("banned"));

    h.engine.handle(text(7, "AB12CD34")).await;
    assert!(h.chat.last_text().contains("banned"));
}

#[tokio::test]
async fn flood_is_throttled() {
    let data_dir = temp_data_dir();
    let cfg = Config::for_tests(data_dir);
    let store = MemoryStore::new();
    let chat = Arc::new(RecordingChat::default());
    let engine = Engine::new(
        Arc::new(cfg),
        store,
        chat.clone(),
        StaticGate::new(true),
    );

    // Burst of 6 admitted, the 7th denied.
    for _ in 0..7 {
        engine.handle(text(7, "hello")).await;
    }
    assert!(chat.last_text().contains("Too many messages"));
}

#[tokio::test]
async fn unknown_code_gets_a_notice() {
    let h = harness();
    h.engine.handle(msg(7, Event::Start)).await;
    h.engine.handle(text(7, "NOPE1234")).await;
    assert!(h.chat.last_text().contains("Code not found"));
}

#[tokio::test]
async fn camera_lookup_sends_the_photo() {
    let h = harness();
    let image = h.data_dir.join("cam.jpg");
    std::fs::write(&image, b"jpeg").unwrap();
    h.store
        .add_camera(&Camera {
            code: "AB12CD34".to_string(),
            category: "PTZ".to_string(),
            image_path: image.to_string_lossy().into_owned(),
            caption: "lobby view".to_string(),
            custom_name: Some("Lobby".to_string()),
            admin_username: "alice".to_string(),
        })
        .unwrap();

    h.engine.handle(msg(7, Event::Start)).await;
    // Codes are case-insensitive on lookup.
    h.engine.handle(text(7, "ab12cd34")).await;

    let photos = h.chat.photos();
    assert_eq!(photos.len(), 1);
    let Out::Photo { caption, .. } = &photos[0] else {
        unreachable!()
    };
    assert!(caption.contains("AB12CD34"));
    assert!(caption.contains("<b>Lobby</b>"));
}

#[tokio::test]
async fn failed_login_ends_the_conversation() {
    let h = harness();
    h.engine.handle(msg(7, Event::Start)).await;
    h.engine.handle(text(7, BTN_ADMIN_LOGIN)).await;
    h.engine.handle(text(7, "mallory")).await;
    h.engine.handle(text(7, "guess")).await;
    assert!(h.chat.last_text().contains("Invalid credentials"));

    // The chat starts over as a fresh participant.
    h.engine.handle(text(7, BTN_ENTER_CODE)).await;
    assert!(h.chat.last_text().contains("camera code"));
}

#[tokio::test]
async fn master_bootstrap_registers_on_first_login() {
    let h = harness();
    login_master(&h, 1).await;

    assert!(h.store.admin_exists("alice").unwrap());
    assert!(h.store.is_master_admin("alice").unwrap());
    // Second login verifies the password set at bootstrap.
    h.engine.handle(msg(1, Event::Start)).await;
    h.engine.handle(text(1, BTN_ADMIN_LOGIN)).await;
    h.engine.handle(text(1, "alice")).await;
    h.engine.handle(text(1, "secret")).await;
    assert!(h.chat.last_text().contains("Welcome back, master admin alice"));
}

#[tokio::test]
async fn non_master_cannot_reach_master_actions() {
    let h = harness();
    h.store
        .add_admin("bob", "pw", false, Some("Bob"))
        .unwrap();

    h.engine.handle(msg(2, Event::Start)).await;
    h.engine.handle(text(2, BTN_ADMIN_LOGIN)).await;
    h.engine.handle(text(2, "bob")).await;
    h.engine.handle(text(2, "pw")).await;
    assert!(h.chat.last_text().contains("Welcome back, admin bob"));

    h.engine.handle(text(2, BTN_BROADCAST)).await;
    assert!(h.chat.last_text().contains("master admins"));
    h.engine.handle(text(2, BTN_MANAGE_BANS)).await;
    assert!(h.chat.last_text().contains("master admins"));
}

#[tokio::test]
async fn camera_upload_wizard_allocates_a_code() {
    let h = harness();
    h.store.add_category("PTZ").unwrap();
    login_master(&h, 1).await;

    h.engine.handle(text(1, BTN_UPLOAD)).await;
    h.engine.handle(text(1, "PTZ")).await;
    h.engine
        .handle(msg(
            1,
            Event::Photo {
                file_id: "file-abc".to_string(),
            },
        ))
        .await;
    h.engine.handle(text(1, "night view")).await;
    h.engine.handle(text(1, "no")).await;

    let done = h.chat.last_text();
    assert!(done.contains("Access code:"));
    assert!(done.contains("PTZ"));

    let cameras = h.store.all_cameras().unwrap();
    assert_eq!(cameras.len(), 1);
    assert_eq!(cameras[0].code.len(), 8);
    assert_eq!(cameras[0].custom_name, None);
    assert_eq!(cameras[0].admin_username, "alice");
    assert!(Path::new(&cameras[0].image_path).is_file());
}

#[tokio::test]
async fn wizard_rejects_unlisted_category_and_wrong_media() {
    let h = harness();
    h.store.add_category("PTZ").unwrap();
    login_master(&h, 1).await;

    h.engine.handle(text(1, BTN_UPLOAD)).await;
    h.engine.handle(text(1, "Speakers")).await;
    assert!(h.chat.last_text().contains("from the list"));

    h.engine.handle(text(1, "PTZ")).await;
    h.engine.handle(text(1, "not a photo")).await;
    assert!(h.chat.last_text().contains("send a photo"));
    assert!(h.store.all_cameras().unwrap().is_empty());
}

#[tokio::test]
async fn ban_flow_bans_by_id() {
    let h = harness();
    login_master(&h, 1).await;

    h.engine.handle(text(1, BTN_MANAGE_BANS)).await;
    h.engine.handle(text(1, BTN_BAN)).await;
    h.engine.handle(text(1, "not-a-number")).await;
    assert!(h.chat.last_text().contains("Invalid id"));

    h.engine.handle(text(1, "42")).await;
    assert!(h.store.is_banned(42).unwrap());
}

#[tokio::test]
async fn broadcast_reaches_active_users_and_is_recorded() {
    let h = harness();
    h.store.upsert_user(100, None, None, None).unwrap();
    h.store.upsert_user(101, None, None, None).unwrap();
    h.store.upsert_user(102, None, None, None).unwrap();
    h.store.ban_user(102).unwrap();
    login_master(&h, 1).await;

    h.engine.handle(text(1, BTN_BROADCAST)).await;
    h.engine.handle(text(1, "maintenance tonight")).await;

    let delivered: Vec<String> = h
        .chat
        .texts()
        .into_iter()
        .filter(|t| t.contains("maintenance tonight") && t.contains("Important message"))
        .collect();
    // Users 100, 101, and the admin (registered on /start); 102 is banned.
    assert_eq!(delivered.len(), 3);

    let history = h.store.broadcast_history().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].admin_username, "alice");
    assert_eq!(history[0].message_text, "maintenance tonight");
}

#[tokio::test]
async fn projects_menu_serves_the_selected_file() {
    let h = harness();
    let file = h.data_dir.join("demo.zip");
    std::fs::write(&file, b"zip").unwrap();
    h.store
        .add_project(&file.to_string_lossy(), "demo caption", "Demo")
        .unwrap();

    h.engine.handle(msg(7, Event::Start)).await;
    h.engine.handle(text(7, BTN_PROJECTS)).await;
    h.engine.handle(text(7, "📁 Demo")).await;

    let docs = h.chat.documents();
    assert_eq!(docs.len(), 1);
    let Out::Document { caption, filename, .. } = &docs[0] else {
        unreachable!()
    };
    assert_eq!(caption, "demo caption");
    assert_eq!(filename, "demo.zip");
}

#[tokio::test]
async fn handler_error_apologizes_and_preserves_state() {
    let h = harness();
    h.engine.handle(msg(7, Event::Start)).await;

    h.store.fail_get_camera.store(true, Ordering::SeqCst);
    h.engine.handle(text(7, "AB12CD34")).await;
    assert!(h.chat.last_text().contains("Something went wrong"));

    // Still in the main-menu state: the same lookup works once the store
    // recovers, with no /start needed.
    h.store.fail_get_camera.store(false, Ordering::SeqCst);
    h.engine.handle(text(7, "AB12CD34")).await;
    assert!(h.chat.last_text().contains("Code not found"));
}

#[tokio::test]
async fn cancel_abandons_a_wizard() {
    let h = harness();
    h.store.add_category("PTZ").unwrap();
    login_master(&h, 1).await;

    h.engine.handle(text(1, BTN_UPLOAD)).await;
    h.engine.handle(msg(1, Event::Cancel)).await;
    assert!(h.chat.last_text().contains("cancelled"));

    // Back in the participant menu.
    h.engine.handle(text(1, BTN_ENTER_CODE)).await;
    assert!(h.chat.last_text().contains("camera code"));
}
