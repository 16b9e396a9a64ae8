use std::time::{Duration, Instant};

/// Type of notification to display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationType {
    Info,
    Error,
}

/// A status-line message that expires at a fixed deadline.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub message: String,
    pub notification_type: NotificationType,
    pub expires_at: Instant,
}

impl Notification {
    pub fn info(message: impl Into<String>, now: Instant, ttl: Duration) -> Self {
        Self::new(message, NotificationType::Info, now, ttl)
    }

    /// Errors stay up twice as long as info messages.
    pub fn error(message: impl Into<String>, now: Instant, ttl: Duration) -> Self {
        Self::new(message, NotificationType::Error, now, ttl.saturating_mul(2))
    }

    fn new(
        message: impl Into<String>,
        notification_type: NotificationType,
        now: Instant,
        ttl: Duration,
    ) -> Self {
        Self {
            message: message.into(),
            notification_type,
            expires_at: now + ttl,
        }
    }

    pub fn should_dismiss(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    pub fn is_error(&self) -> bool {
        self.notification_type == NotificationType::Error
    }
}
