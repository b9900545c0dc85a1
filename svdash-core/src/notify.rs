use std::sync::Mutex;
use std::time::SystemTime;

/// Severity of a user notification
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotificationLevel {
    Success,
    Error,
}

#[derive(Clone, Debug)]
pub struct Notification {
    pub at: SystemTime,
    pub level: NotificationLevel,
    pub message: String,
}

/// Sink for user-facing notifications
pub trait Notificator: Send + Sync {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
}

/// Notificator that keeps everything it is told, newest last
#[derive(Debug, Default)]
pub struct MemoryNotificator {
    entries: Mutex<Vec<Notification>>,
}

impl MemoryNotificator {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, level: NotificationLevel, message: &str) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.push(Notification {
            at: SystemTime::now(),
            level,
            message: message.to_string(),
        });
    }

    pub fn all(&self) -> Vec<Notification> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn messages(&self, level: NotificationLevel) -> Vec<String> {
        self.all()
            .into_iter()
            .filter(|n| n.level == level)
            .map(|n| n.message)
            .collect()
    }

    pub fn successes(&self) -> Vec<String> {
        self.messages(NotificationLevel::Success)
    }

    pub fn errors(&self) -> Vec<String> {
        self.messages(NotificationLevel::Error)
    }

    /// Remove and return everything recorded so far
    pub fn drain(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.entries.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

impl Notificator for MemoryNotificator {
    fn success(&self, message: &str) {
        self.push(NotificationLevel::Success, message);
    }

    fn error(&self, message: &str) {
        self.push(NotificationLevel::Error, message);
    }
}
