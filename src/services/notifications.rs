//! User-visible notifications and messages.

use serde::{Deserialize, Serialize};
use std::{
    collections::VecDeque,
    sync::{Mutex, PoisonError},
};

/// Default number of notices kept by [`NotificationLog`].
pub const DEFAULT_CAPACITY: usize = 50;

/// Background failure shown as a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub message: String,
}

impl Notification {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self { title: title.into(), message: message.into() }
    }
}

/// Result of a user action shown as a dialog message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub title: String,
    pub description: String,
    pub success: bool,
}

impl Message {
    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self { title: title.into(), description: description.into(), success: false }
    }
}

/// Sink for user-visible errors. Fire-and-forget.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);

    fn set_message(&self, message: Message);
}

/// Anything surfaced to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    Notification(Notification),
    Message(Message),
}

/// Notifier logging every notice and keeping the most recent ones.
#[derive(Debug)]
pub struct NotificationLog {
    capacity: usize,
    notices: Mutex<VecDeque<Notice>>,
}

impl Default for NotificationLog {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl NotificationLog {
    pub fn new(capacity: usize) -> Self {
        Self { capacity: capacity.max(1), notices: Mutex::new(VecDeque::new()) }
    }

    /// Kept notices, oldest first.
    pub fn recent(&self) -> Vec<Notice> {
        let notices = self.notices.lock().unwrap_or_else(PoisonError::into_inner);
        notices.iter().cloned().collect()
    }

    fn push(&self, notice: Notice) {
        let mut notices = self.notices.lock().unwrap_or_else(PoisonError::into_inner);
        if notices.len() == self.capacity {
            notices.pop_front();
        }
        notices.push_back(notice);
    }
}

impl Notifier for NotificationLog {
    fn notify(&self, notification: Notification) {
        tracing::warn!(title = %notification.title, "{}", notification.message);
        self.push(Notice::Notification(notification));
    }

    fn set_message(&self, message: Message) {
        if message.success {
            tracing::info!(title = %message.title, "{}", message.description);
        } else {
            tracing::warn!(title = %message.title, "{}", message.description);
        }
        self.push(Notice::Message(message));
    }
}
