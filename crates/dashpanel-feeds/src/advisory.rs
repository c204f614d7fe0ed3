//! Short-lived notices shown next to the feed list.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

#[derive(Debug)]
struct Notice {
    message: String,
    posted_at: Instant,
}

/// Holds at most one notice, which expires after a fixed time-to-live.
#[derive(Debug)]
pub struct AdvisoryBoard {
    ttl: Duration,
    notice: Mutex<Option<Notice>>,
}

impl AdvisoryBoard {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            notice: Mutex::new(None),
        }
    }

    /// Post a notice, replacing any current one and restarting its timer.
    pub fn post(&self, message: impl Into<String>) {
        *self.notice.lock() = Some(Notice {
            message: message.into(),
            posted_at: Instant::now(),
        });
    }

    /// The current notice, if it has not expired.
    pub fn current(&self) -> Option<String> {
        let mut notice = self.notice.lock();
        match notice.as_ref() {
            Some(n) if n.posted_at.elapsed() < self.ttl => Some(n.message.clone()),
            Some(_) => {
                *notice = None;
                None
            }
            None => None,
        }
    }

    pub fn clear(&self) {
        *self.notice.lock() = None;
    }
}
