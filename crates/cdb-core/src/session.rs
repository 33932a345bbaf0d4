//! Per-chat conversation state and the process-wide session registry.
//!
//! Exactly one live `ChatSession` per chat identity; the registry is owned by
//! the engine behind a mutex and mutated only from there. Admin identity is
//! kept in a separate map so logging out of a wizard (which clears scratch)
//! never drops authentication, and vice versa.

use std::{collections::HashMap, path::PathBuf};

use crate::{
    domain::{ChatId, Pack, Project},
    engine::state::State,
};

/// Scratch data for the in-progress multi-step operation. Cleared wholesale on
/// `/start`, logout, and wizard cancellation.
#[derive(Clone, Debug, Default)]
pub struct Scratch {
    /// Username staged between the login and password steps.
    pub login_username: Option<String>,

    // Camera upload wizard
    pub category: Option<String>,
    pub image_path: Option<PathBuf>,
    pub caption: Option<String>,

    // Admin-creation wizard
    pub new_admin_name: Option<String>,
    pub new_admin_login: Option<String>,

    // Project/pack upload wizards (staged file + caption)
    pub file_path: Option<PathBuf>,
    pub file_caption: Option<String>,

    /// Label → entity snapshots built at menu render time. Valid only until
    /// the next listing; selection is matched against these, not the store.
    pub project_menu: HashMap<String, Project>,
    pub pack_menu: HashMap<String, Pack>,
}

#[derive(Clone, Debug)]
pub struct ChatSession {
    pub state: State,
    pub scratch: Scratch,
}

impl ChatSession {
    pub fn new(state: State) -> Self {
        Self {
            state,
            scratch: Scratch::default(),
        }
    }
}

/// Process-wide map from chat identity to conversation state and to the
/// authenticated admin identity. Not persisted; a process restart logs
/// everyone out and drops all in-flight wizards.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<i64, ChatSession>,
    admins: HashMap<i64, String>,
}

impl SessionRegistry {
    pub fn session(&self, chat: ChatId) -> Option<ChatSession> {
        self.sessions.get(&chat.0).cloned()
    }

    pub fn put(&mut self, chat: ChatId, session: ChatSession) {
        self.sessions.insert(chat.0, session);
    }

    pub fn clear_session(&mut self, chat: ChatId) {
        self.sessions.remove(&chat.0);
    }

    /// Bind an authenticated admin identity to a chat. Rebinding overwrites.
    pub fn bind(&mut self, chat: ChatId, username: &str) {
        self.admins.insert(chat.0, username.to_string());
    }

    pub fn identity(&self, chat: ChatId) -> Option<String> {
        self.admins.get(&chat.0).cloned()
    }

    pub fn unbind(&mut self, chat: ChatId) {
        self.admins.remove(&chat.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rebinding_overwrites_identity() {
        let mut reg = SessionRegistry::default();
        reg.bind(ChatId(7), "alice");
        reg.bind(ChatId(7), "bob");
        assert_eq!(reg.identity(ChatId(7)).as_deref(), Some("bob"));

        reg.unbind(ChatId(7));
        assert_eq!(reg.identity(ChatId(7)), None);
    }

    #[test]
    fn identity_survives_session_clear() {
        let mut reg = SessionRegistry::default();
        reg.bind(ChatId(7), "alice");
        reg.put(ChatId(7), ChatSession::new(State::AdminMenu));

        reg.clear_session(ChatId(7));
        assert!(reg.session(ChatId(7)).is_none());
        assert_eq!(reg.identity(ChatId(7)).as_deref(), Some("alice"));
    }
}
