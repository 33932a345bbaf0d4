//! Domain ids and catalog entity records.
//!
//! The catalog entities mirror what the persistent store holds; the engine only
//! references them by code/id and never caches them beyond a menu snapshot.

/// Telegram user id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UserId(pub i64);

/// Telegram chat id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

/// A stored camera: the participant-facing lookup key is `code`, globally
/// unique for as long as the row exists.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Camera {
    pub code: String,
    pub category: String,
    pub image_path: String,
    pub caption: String,
    pub custom_name: Option<String>,
    pub admin_username: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Project {
    pub id: i64,
    pub display_name: String,
    pub caption: String,
    pub file_path: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pack {
    pub id: i64,
    pub display_name: String,
    pub caption: String,
    pub file_path: String,
    pub admin_username: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdminRecord {
    pub username: String,
    pub display_name: Option<String>,
    pub is_master: bool,
}

/// A chat participant as registered on `/start`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BotUser {
    pub user_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_banned: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BroadcastRecord {
    pub id: i64,
    pub admin_username: String,
    pub message_text: String,
    pub timestamp: String,
}

/// Per-category camera count used by the stats listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CategoryCount {
    pub category: String,
    pub count: u64,
}
