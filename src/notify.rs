use std::time::{Duration, Instant};

use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: Uuid,
    pub message: String,
    pub shown_at: Instant,
}

impl Notification {
    pub fn expires_at(&self, lifetime: Duration) -> Instant {
        self.shown_at + lifetime
    }
}

/// Transient messages with a fixed lifetime. Rapid pushes stack; nothing is
/// queued or rate limited.
#[derive(Debug, Clone)]
pub struct Notifier {
    lifetime: Duration,
    active: Vec<Notification>,
}

impl Notifier {
    pub fn new(lifetime: Duration) -> Self {
        Self {
            lifetime,
            active: Vec::new(),
        }
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    pub fn push(&mut self, message: impl Into<String>, now: Instant) -> &Notification {
        let index = self.active.len();
        self.active.push(Notification {
            id: Uuid::new_v4(),
            message: message.into(),
            shown_at: now,
        });
        &self.active[index]
    }

    /// Drops every notification whose lifetime has elapsed at `now` and
    /// returns their ids in the order they were shown.
    pub fn expire(&mut self, now: Instant) -> Vec<Uuid> {
        let lifetime = self.lifetime;
        let mut expired = Vec::new();
        self.active.retain(|notification| {
            let alive = now < notification.expires_at(lifetime);
            if !alive {
                expired.push(notification.id);
            }
            alive
        });
        expired
    }

    pub fn active(&self) -> &[Notification] {
        &self.active
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(Duration::from_secs(3))
    }
}
