use std::io::Write;

use chrono::NaiveDateTime;
use tracing::{info, warn};

use crate::types::RewardEvent;

/// A user-facing alert: a headline plus two detail lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub detail_a: String,
    pub detail_b: String,
}

impl Notification {
    /// A newly confirmed mini-block, stamped with the time it was noticed.
    pub fn reward_found(event: &RewardEvent, noticed_at: NaiveDateTime) -> Self {
        Self {
            title: "Dero Mini-Block Found!".to_string(),
            detail_a: format!("MB:{} ({} DERO)", event.height, event.amount),
            detail_b: noticed_at.format("%d/%m/%Y %H:%M:%S").to_string(),
        }
    }

    /// No reward for `polls` consecutive polls.
    pub fn reward_absence(polls: u32) -> Self {
        Self {
            title: format!("No rewards for the last {polls} polls!"),
            detail_a: String::new(),
            detail_b: String::new(),
        }
    }
}

/// Log the notification and ring the terminal bell on stderr.
pub fn announce(notification: &Notification) {
    info!(
        detail_a = %notification.detail_a,
        detail_b = %notification.detail_b,
        "{}",
        notification.title
    );
    let mut stderr = std::io::stderr().lock();
    if let Err(e) = stderr.write_all(b"\x07").and_then(|_| stderr.flush()) {
        warn!("Failed to ring terminal bell: {e}");
    }
}
