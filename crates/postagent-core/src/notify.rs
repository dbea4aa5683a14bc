//! Transient user-facing notifications ("toasts").
//!
//! Publishing never blocks and never fails. Messages are shown newest first
//! and disappear on their own once their display time is up.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

/// How long a success toast stays up
const SUCCESS_DISPLAY_MS: i64 = 2000;

/// How long an error toast stays up
const ERROR_DISPLAY_MS: i64 = 4000;

/// Oldest toasts are dropped past this many
const MAX_ACTIVE: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
}

impl NotificationKind {
    pub fn display_duration(&self) -> Duration {
        match self {
            NotificationKind::Success => Duration::milliseconds(SUCCESS_DISPLAY_MS),
            NotificationKind::Error => Duration::milliseconds(ERROR_DISPLAY_MS),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: u64,
    pub kind: NotificationKind,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.created_at + self.kind.display_duration()
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at()
    }
}

#[derive(Default)]
struct Queue {
    next_id: u64,
    /// Front is the newest message
    messages: VecDeque<Notification>,
}

/// Shared toast queue. Clones publish into the same queue.
#[derive(Clone, Default)]
pub struct NotificationBus {
    inner: Arc<Mutex<Queue>>,
}

impl NotificationBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn queue(&self) -> MutexGuard<'_, Queue> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn publish(&self, kind: NotificationKind, text: impl Into<String>) {
        let text = text.into();
        match kind {
            NotificationKind::Success => info!(message = %text, "Notification"),
            NotificationKind::Error => warn!(message = %text, "Notification"),
        }

        let mut queue = self.queue();
        queue.next_id += 1;
        let notification = Notification {
            id: queue.next_id,
            kind,
            text,
            created_at: Utc::now(),
        };
        queue.messages.push_front(notification);
        queue.messages.truncate(MAX_ACTIVE);
    }

    pub fn success(&self, text: impl Into<String>) {
        self.publish(NotificationKind::Success, text);
    }

    pub fn error(&self, text: impl Into<String>) {
        self.publish(NotificationKind::Error, text);
    }

    /// Live notifications, newest first
    pub fn active(&self) -> Vec<Notification> {
        self.active_at(Utc::now())
    }

    /// Live notifications as of `now`, newest first. Expired ones are dropped.
    pub fn active_at(&self, now: DateTime<Utc>) -> Vec<Notification> {
        let mut queue = self.queue();
        queue.messages.retain(|n| !n.is_expired_at(now));
        queue.messages.iter().cloned().collect()
    }

    pub fn dismiss(&self, id: u64) {
        self.queue().messages.retain(|n| n.id != id);
    }

    pub fn dismiss_all(&self) {
        self.queue().messages.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newest_first() {
        let bus = NotificationBus::new();
        bus.success("first");
        bus.error("second");
        bus.success("third");

        let texts: Vec<_> = bus.active().into_iter().map(|n| n.text).collect();
        assert_eq!(texts, vec!["third", "second", "first"]);
    }

    #[test]
    fn test_expiry_depends_on_kind() {
        let bus = NotificationBus::new();
        bus.success("saved");
        bus.error("failed");

        let later = Utc::now() + Duration::milliseconds(SUCCESS_DISPLAY_MS + 500);
        let active = bus.active_at(later);
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].kind, NotificationKind::Error);

        let much_later = Utc::now() + Duration::milliseconds(ERROR_DISPLAY_MS + 500);
        assert!(bus.active_at(much_later).is_empty());
        // Pruned for good
        assert!(bus.active().is_empty());
    }

    #[test]
    fn test_clones_share_the_queue() {
        let bus = NotificationBus::new();
        let publisher = bus.clone();
        publisher.error("Connection error");
        assert_eq!(bus.active().len(), 1);
    }

    #[test]
    fn test_queue_is_capped() {
        let bus = NotificationBus::new();
        for i in 0..(MAX_ACTIVE + 5) {
            bus.success(format!("msg {}", i));
        }
        let active = bus.active();
        assert_eq!(active.len(), MAX_ACTIVE);
        assert_eq!(active[0].text, format!("msg {}", MAX_ACTIVE + 4));
    }

    #[test]
    fn test_dismiss() {
        let bus = NotificationBus::new();
        bus.success("a");
        bus.success("b");
        let newest = bus.active()[0].id;
        bus.dismiss(newest);
        assert_eq!(bus.active()[0].text, "a");
        bus.dismiss_all();
        assert!(bus.active().is_empty());
    }
}
