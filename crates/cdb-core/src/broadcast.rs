//! Bulk send loop for admin broadcasts.
//!
//! Deliberately sequential: a fixed inter-send delay respects transport
//! throughput limits, and each recipient failure is isolated, counted, and
//! logged without aborting the loop. No retry and no exactly-once guarantee.
//! Expressed as a cancellable task so an admin-initiated abort can be wired
//! in later without redesign.

use std::{sync::Arc, time::Duration};

use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::{domain::ChatId, ports::ChatPort};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub success: u32,
    pub failed: u32,
    pub cancelled: bool,
}

pub struct BroadcastDispatcher {
    chat: Arc<dyn ChatPort>,
    delay: Duration,
}

impl BroadcastDispatcher {
    pub fn new(chat: Arc<dyn ChatPort>, delay: Duration) -> Self {
        Self { chat, delay }
    }

    pub async fn run(
        &self,
        recipients: &[i64],
        text: &str,
        cancel: &CancellationToken,
    ) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        let body = format!("📢 Important message!\n\n{text}");

        for &user_id in recipients {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }

            match self.chat.send_text(ChatId(user_id), &body).await {
                Ok(()) => report.success += 1,
                Err(e) => {
                    report.failed += 1;
                    warn!(user_id, error = %e, "broadcast send failed");
                }
            }

            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
        }

        report
    }
}
