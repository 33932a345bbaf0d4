//! Reply-keyboard vocabulary and layouts.
//!
//! Every menu the bot shows is a fixed set of labelled buttons; the engine
//! matches incoming text against these labels, so they live here as constants
//! rather than inline strings.

pub const BTN_SUBSCRIBED: &str = "✅ I subscribed";

pub const BTN_ENTER_CODE: &str = "🔍 Enter camera code";
pub const BTN_PROJECTS: &str = "📁 Projects";
pub const BTN_PACKS: &str = "📦 Camera packs";
pub const BTN_ADMIN_LOGIN: &str = "🔐 Admin login";
pub const BTN_CHANNEL: &str = "📢 Our channel";

pub const BTN_BACK: &str = "🔙 Back";

pub const BTN_UPLOAD: &str = "📤 Upload screenshot";
pub const BTN_MY_CAMERAS: &str = "📷 My cameras";
pub const BTN_MANAGE_PACKS: &str = "📦 Manage packs";
pub const BTN_CHANGE_PASSWORD: &str = "🔐 Change password";
pub const BTN_BROADCAST: &str = "✉️ Broadcast";
pub const BTN_LOGOUT: &str = "🚪 Log out";
pub const BTN_MANAGE_ADMINS: &str = "👑 Manage admins";
pub const BTN_MANAGE_CATEGORIES: &str = "📂 Manage categories";
pub const BTN_MANAGE_BANS: &str = "🚫 Manage bans";
pub const BTN_CAMERA_CODES: &str = "🔑 Camera codes";
pub const BTN_DELETE_CAMERA: &str = "🗑️ Delete camera";
pub const BTN_USER_LIST: &str = "👥 User list";
pub const BTN_MANAGE_PROJECTS: &str = "📁 Manage projects";
pub const BTN_BROADCAST_HISTORY: &str = "📊 Broadcast history";

pub const BTN_ADD_ADMIN: &str = "➕ Add admin";
pub const BTN_DEL_ADMIN: &str = "➖ Remove admin";
pub const BTN_LIST_ADMINS: &str = "👥 List admins";

pub const BTN_ADD_CATEGORY: &str = "➕ Add category";
pub const BTN_DEL_CATEGORY: &str = "➖ Remove category";

pub const BTN_BAN: &str = "🚫 Ban";
pub const BTN_UNBAN: &str = "✅ Unban";
pub const BTN_LIST_BANNED: &str = "👥 Banned list";

pub const BTN_CATEGORY_STATS: &str = "📊 Stats by category";
pub const BTN_ALL_CODES: &str = "📝 All codes";

pub const BTN_UPLOAD_PROJECT: &str = "📤 Upload project";
pub const BTN_LIST_PROJECTS: &str = "📝 List projects";
pub const BTN_DELETE_PROJECT: &str = "🗑️ Delete project";

pub const BTN_UPLOAD_PACK: &str = "📤 Upload pack";
pub const BTN_MY_PACKS: &str = "📦 My packs";
pub const BTN_ALL_PACKS: &str = "📦 All packs";
pub const BTN_DELETE_PACK: &str = "🗑️ Delete pack";

/// Transport-agnostic reply keyboard: rows of button labels. The adapter turns
/// this into whatever markup the transport expects.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplyKeyboard {
    pub rows: Vec<Vec<String>>,
}

impl ReplyKeyboard {
    pub fn new(rows: Vec<Vec<&str>>) -> Self {
        Self {
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(|s| s.to_string()).collect())
                .collect(),
        }
    }

    /// One button per row from owned labels, with a trailing back button.
    pub fn listing(labels: impl IntoIterator<Item = String>) -> Self {
        let mut rows: Vec<Vec<String>> = labels.into_iter().map(|l| vec![l]).collect();
        rows.push(vec![BTN_BACK.to_string()]);
        Self { rows }
    }
}

pub fn subscribe_keyboard() -> ReplyKeyboard {
    ReplyKeyboard::new(vec![vec![BTN_SUBSCRIBED]])
}

pub fn main_menu() -> ReplyKeyboard {
    ReplyKeyboard::new(vec![
        vec![BTN_ENTER_CODE],
        vec![BTN_PROJECTS],
        vec![BTN_PACKS],
        vec![BTN_ADMIN_LOGIN],
        vec![BTN_CHANNEL],
    ])
}

pub fn admin_menu(is_master: bool) -> ReplyKeyboard {
    let mut rows = vec![vec![BTN_UPLOAD]];
    if is_master {
        rows.push(vec![BTN_MANAGE_ADMINS]);
        rows.push(vec![BTN_MANAGE_CATEGORIES]);
        rows.push(vec![BTN_MANAGE_BANS]);
        rows.push(vec![BTN_CAMERA_CODES]);
        rows.push(vec![BTN_DELETE_CAMERA]);
        rows.push(vec![BTN_USER_LIST]);
        rows.push(vec![BTN_MANAGE_PROJECTS]);
        rows.push(vec![BTN_BROADCAST]);
        rows.push(vec![BTN_BROADCAST_HISTORY]);
    } else {
        rows.push(vec![BTN_MY_CAMERAS]);
    }
    rows.push(vec![BTN_MANAGE_PACKS]);
    rows.push(vec![BTN_CHANGE_PASSWORD]);
    rows.push(vec![BTN_LOGOUT]);
    ReplyKeyboard::new(rows)
}

/// Categories two per row, back button last.
pub fn category_keyboard(categories: &[String]) -> ReplyKeyboard {
    let mut rows: Vec<Vec<String>> = categories.chunks(2).map(|c| c.to_vec()).collect();
    rows.push(vec![BTN_BACK.to_string()]);
    ReplyKeyboard { rows }
}

pub fn admin_management_keyboard() -> ReplyKeyboard {
    ReplyKeyboard::new(vec![
        vec![BTN_ADD_ADMIN, BTN_DEL_ADMIN],
        vec![BTN_LIST_ADMINS],
        vec![BTN_BACK],
    ])
}

pub fn category_management_keyboard() -> ReplyKeyboard {
    ReplyKeyboard::new(vec![vec![BTN_ADD_CATEGORY, BTN_DEL_CATEGORY], vec![BTN_BACK]])
}

pub fn ban_management_keyboard() -> ReplyKeyboard {
    ReplyKeyboard::new(vec![
        vec![BTN_BAN, BTN_UNBAN],
        vec![BTN_LIST_BANNED],
        vec![BTN_BACK],
    ])
}

pub fn camera_codes_keyboard() -> ReplyKeyboard {
    ReplyKeyboard::new(vec![
        vec![BTN_CATEGORY_STATS],
        vec![BTN_ALL_CODES],
        vec![BTN_BACK],
    ])
}

pub fn back_only_keyboard() -> ReplyKeyboard {
    ReplyKeyboard::new(vec![vec![BTN_BACK]])
}

pub fn project_management_keyboard() -> ReplyKeyboard {
    ReplyKeyboard::new(vec![
        vec![BTN_UPLOAD_PROJECT],
        vec![BTN_LIST_PROJECTS],
        vec![BTN_DELETE_PROJECT],
        vec![BTN_BACK],
    ])
}

pub fn pack_management_keyboard(is_master: bool) -> ReplyKeyboard {
    let mut rows = vec![vec![BTN_UPLOAD_PACK]];
    if is_master {
        rows.push(vec![BTN_ALL_PACKS]);
        rows.push(vec![BTN_DELETE_PACK]);
    } else {
        rows.push(vec![BTN_MY_PACKS]);
    }
    rows.push(vec![BTN_BACK]);
    ReplyKeyboard::new(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn master_menu_has_management_rows() {
        let master = admin_menu(true);
        let flat: Vec<&String> = master.rows.iter().flatten().collect();
        assert!(flat.iter().any(|l| l.as_str() == BTN_MANAGE_BANS));
        assert!(flat.iter().any(|l| l.as_str() == BTN_BROADCAST_HISTORY));
        assert!(!flat.iter().any(|l| l.as_str() == BTN_MY_CAMERAS));

        let regular = admin_menu(false);
        let flat: Vec<&String> = regular.rows.iter().flatten().collect();
        assert!(flat.iter().any(|l| l.as_str() == BTN_MY_CAMERAS));
        assert!(!flat.iter().any(|l| l.as_str() == BTN_MANAGE_BANS));
        assert!(!flat.iter().any(|l| l.as_str() == BTN_BROADCAST));
    }

    #[test]
    fn category_keyboard_pairs_and_appends_back() {
        let cats = vec!["PTZ".to_string(), "Speakers".to_string(), "Drop".to_string()];
        let kb = category_keyboard(&cats);
        assert_eq!(kb.rows.len(), 3);
        assert_eq!(kb.rows[0], vec!["PTZ", "Speakers"]);
        assert_eq!(kb.rows[1], vec!["Drop"]);
        assert_eq!(kb.rows[2], vec![BTN_BACK]);
    }
}
