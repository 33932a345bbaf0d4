use std::{env, fs, path::PathBuf, time::Duration};

use crate::{errors::Error, Result};

/// Typed configuration, loaded once at startup from the environment.
#[derive(Clone, Debug)]
pub struct Config {
    // Core
    pub bot_token: String,
    /// Channel whose membership gates participant access.
    pub channel_id: i64,
    /// Public invite link shown in subscription prompts.
    pub channel_link: String,
    /// Usernames allowed to self-register as master admins on first login.
    pub master_admins: Vec<String>,

    // Storage
    pub data_dir: PathBuf,
    pub db_path: PathBuf,

    // Admission
    pub rate_limit_burst: u32,
    pub rate_limit_block: Duration,

    // Outbound
    pub broadcast_delay: Duration,
    pub send_retries: u32,
    pub send_retry_backoff: Duration,
    /// Listings are split so no single message exceeds this (transport limit
    /// is 4096; 4000 leaves headroom).
    pub message_safe_limit: usize,

    // Caption decoration pools
    pub caption_emojis: Vec<String>,
    pub name_emojis: Vec<String>,
    pub pack_emojis: Vec<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let bot_token = env_str("TELEGRAM_BOT_TOKEN").unwrap_or_default();
        if bot_token.trim().is_empty() {
            return Err(Error::Config(
                "TELEGRAM_BOT_TOKEN environment variable is required".to_string(),
            ));
        }

        let channel_id = env_i64("CHANNEL_ID").ok_or_else(|| {
            Error::Config("CHANNEL_ID environment variable is required".to_string())
        })?;
        let channel_link =
            env_str("CHANNEL_LINK").unwrap_or_else(|| "https://t.me/".to_string());

        let master_admins = parse_csv(env_str("MASTER_ADMINS"));
        if master_admins.is_empty() {
            return Err(Error::Config(
                "MASTER_ADMINS environment variable is required".to_string(),
            ));
        }

        let data_dir = env_path("DATA_DIR").unwrap_or_else(|| PathBuf::from("data"));
        let db_path = env_path("DATABASE_PATH").unwrap_or_else(|| data_dir.join("catalog.db"));

        // Media subdirectories must exist before the first upload lands.
        fs::create_dir_all(data_dir.join("cameras"))?;
        fs::create_dir_all(data_dir.join("projects"))?;
        fs::create_dir_all(data_dir.join("packs"))?;

        let rate_limit_burst = env_u32("RATE_LIMIT_BURST").unwrap_or(6);
        let rate_limit_block =
            Duration::from_secs(env_u64("RATE_LIMIT_BLOCK_SECS").unwrap_or(10));

        let broadcast_delay =
            Duration::from_millis(env_u64("BROADCAST_DELAY_MS").unwrap_or(100));
        let send_retries = env_u32("SEND_RETRIES").unwrap_or(3);
        let send_retry_backoff =
            Duration::from_secs(env_u64("SEND_RETRY_BACKOFF_SECS").unwrap_or(2));
        let message_safe_limit = env_usize("MESSAGE_SAFE_LIMIT").unwrap_or(4000);

        let caption_emojis = parse_csv(
            env_str("CAPTION_EMOJIS").or_else(|| Some("🔥,💎,⚡,🌙,⭐,🎯".to_string())),
        );
        let name_emojis = parse_csv(
            env_str("NAME_EMOJIS").or_else(|| Some("📛,🏷️,🔖,📌".to_string())),
        );
        let pack_emojis =
            parse_csv(env_str("PACK_EMOJIS").or_else(|| Some("📦,🎁,🗂️".to_string())));

        Ok(Self {
            bot_token,
            channel_id,
            channel_link,
            master_admins,
            data_dir,
            db_path,
            rate_limit_burst,
            rate_limit_block,
            broadcast_delay,
            send_retries,
            send_retry_backoff,
            message_safe_limit,
            caption_emojis,
            name_emojis,
            pack_emojis,
        })
    }

    pub fn is_master_candidate(&self, username: &str) -> bool {
        self.master_admins.iter().any(|m| m == username)
    }

    pub fn cameras_dir(&self) -> PathBuf {
        self.data_dir.join("cameras")
    }

    pub fn projects_dir(&self) -> PathBuf {
        self.data_dir.join("projects")
    }

    pub fn packs_dir(&self) -> PathBuf {
        self.data_dir.join("packs")
    }
}

#[cfg(test)]
impl Config {
    /// Config with all the fixed defaults and no environment access, for tests.
    pub fn for_tests(data_dir: PathBuf) -> Self {
        Self {
            bot_token: "test-token".to_string(),
            channel_id: -100,
            channel_link: "https://t.me/example".to_string(),
            master_admins: vec!["alice".to_string()],
            db_path: data_dir.join("catalog.db"),
            data_dir,
            rate_limit_burst: 6,
            rate_limit_block: Duration::from_secs(10),
            broadcast_delay: Duration::from_millis(0),
            send_retries: 3,
            send_retry_backoff: Duration::from_secs(2),
            message_safe_limit: 4000,
            caption_emojis: vec!["🔥".to_string()],
            name_emojis: vec!["📌".to_string()],
            pack_emojis: vec!["📦".to_string()],
        }
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.trim().is_empty())
}

fn env_path(key: &str) -> Option<PathBuf> {
    env_str(key).map(PathBuf::from)
}

fn env_i64(key: &str) -> Option<i64> {
    env_str(key).and_then(|s| s.trim().parse().ok())
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse().ok())
}

fn env_u32(key: &str) -> Option<u32> {
    env_str(key).and_then(|s| s.trim().parse().ok())
}

fn env_usize(key: &str) -> Option<usize> {
    env_str(key).and_then(|s| s.trim().parse().ok())
}

fn parse_csv(value: Option<String>) -> Vec<String> {
    value
        .map(|s| {
            s.split(',')
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_csv_trims_and_drops_empty() {
        let got = parse_csv(Some(" alice, bob ,,carol".to_string()));
        assert_eq!(got, vec!["alice", "bob", "carol"]);
        assert!(parse_csv(None).is_empty());
    }
}
