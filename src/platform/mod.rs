pub mod telegram;

use std::collections::VecDeque;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::watch::pipeline::NotificationEmitter;
use crate::watch::{Message, Notification};

/// Messages received from the platform, waiting for the next scan.
///
/// Holds at most `capacity` messages; past that the oldest are dropped.
#[derive(Clone)]
pub struct MessageInbox {
    queue: Arc<Mutex<VecDeque<Message>>>,
    capacity: usize,
}

impl MessageInbox {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: Arc::new(Mutex::new(VecDeque::new())),
            capacity: capacity.max(1),
        }
    }

    pub async fn push(&self, message: Message) {
        let mut queue = self.queue.lock().await;
        if queue.len() >= self.capacity {
            if let Some(dropped) = queue.pop_front() {
                warn!(
                    "Inbox full ({} messages), dropping oldest message {}",
                    self.capacity, dropped.id
                );
            }
        }
        queue.push_back(message);
    }

    /// Take up to `max` of the oldest messages
    pub async fn drain(&self, max: usize) -> Vec<Message> {
        let mut queue = self.queue.lock().await;
        let n = max.min(queue.len());
        queue.drain(..n).collect()
    }

    /// Put a batch back at the front, keeping its order. If that overflows
    /// the inbox the oldest messages are dropped.
    pub async fn requeue(&self, batch: Vec<Message>) {
        let mut queue = self.queue.lock().await;
        for message in batch.into_iter().rev() {
            queue.push_front(message);
        }

        let overflow = queue.len().saturating_sub(self.capacity);
        if overflow > 0 {
            queue.drain(..overflow);
            warn!(
                "Inbox full ({} messages), dropped {} oldest message(s) on requeue",
                self.capacity, overflow
            );
        }
    }

    pub async fn len(&self) -> usize {
        self.queue.lock().await.len()
    }
}

/// Dry-run emitter: logs each notification as JSON instead of delivering it
pub struct LogEmitter;

#[async_trait]
impl NotificationEmitter for LogEmitter {
    async fn emit(&self, notifications: &[Notification]) -> Result<()> {
        for notification in notifications {
            let json = serde_json::to_string(notification).context("Failed to encode notification")?;
            info!("Notification (dry run): {}", json);
        }
        Ok(())
    }
}
