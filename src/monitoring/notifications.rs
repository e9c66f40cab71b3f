// monitoring/notifications.rs

use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::VecDeque;

/// Human-readable event raised by the simulation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    /// Creation-ordered and unique for the lifetime of the sink.
    pub id: u64,
    pub message: String,
    pub timestamp: DateTime<Local>,
}

/// Bounded newest-first event log. Oldest entries are evicted first.
#[derive(Debug, Clone)]
pub struct NotificationSink {
    capacity: usize,
    next_id: u64,
    entries: VecDeque<Notification>,
}

impl NotificationSink {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            next_id: 1,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    pub fn append(&mut self, message: impl Into<String>, timestamp: DateTime<Local>) -> Notification {
        let notification = Notification {
            id: self.next_id,
            message: message.into(),
            timestamp,
        };
        self.next_id += 1;

        log::info!("Notification #{}: {}", notification.id, notification.message);
        self.entries.push_front(notification.clone());
        self.entries.truncate(self.capacity);
        notification
    }

    /// Newest first.
    pub fn notifications(&self) -> Vec<Notification> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
