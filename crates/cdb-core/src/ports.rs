//! Ports (traits) for the external collaborators.
//!
//! Telegram is the first transport; the shapes are kept messenger-neutral so
//! another chat adapter can sit behind the same interface.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::{
    domain::{ChatId, UserId},
    keyboards::ReplyKeyboard,
    Result,
};

/// Outbound chat capability. All sends are best-effort with the adapter's
/// bounded retry; an `Err` means retries were exhausted.
#[async_trait]
pub trait ChatPort: Send + Sync {
    async fn send_text(&self, chat: ChatId, text: &str) -> Result<()>;

    async fn send_text_kb(&self, chat: ChatId, text: &str, keyboard: &ReplyKeyboard)
        -> Result<()>;

    /// Send text and take the reply keyboard away (login prompt).
    async fn send_text_remove_kb(&self, chat: ChatId, text: &str) -> Result<()>;

    async fn send_photo(&self, chat: ChatId, path: &Path, caption: &str) -> Result<()>;

    async fn send_document(
        &self,
        chat: ChatId,
        path: &Path,
        caption: &str,
        filename: &str,
    ) -> Result<()>;

    /// Download a transport-hosted file (photo or document) to `dest`.
    async fn download_file(&self, file_id: &str, dest: &Path) -> Result<()>;
}

/// Membership probe for the required channel. Implementations treat probe
/// failures as "not a member" (fail-closed).
#[async_trait]
pub trait SubscriptionGate: Send + Sync {
    async fn is_member(&self, user: UserId) -> bool;
}

/// Helper for building download destinations with sanitized names.
pub fn unique_media_path(dir: &Path, stem: &str, ext: &str) -> PathBuf {
    let ts = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    dir.join(format!("{stem}_{ts}.{ext}"))
}
