use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::MessageId;
use tracing::{debug, error, info, warn};

use super::MessageInbox;
use crate::store::WatchStore;
use crate::watch::pipeline::NotificationEmitter;
use crate::watch::{Message as WatchMessage, Notification, User};

/// Split long messages for Telegram's 4096 char limit
fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < text.len() {
        let mut end = (start + max_len).min(text.len());
        // Walk back to a valid UTF-8 char boundary so slicing doesn't panic
        while end > start && !text.is_char_boundary(end) {
            end -= 1;
        }
        let actual_end = if end < text.len() {
            text[start..end]
                .rfind('\n')
                .map(|pos| start + pos + 1)
                .unwrap_or(end)
        } else {
            end
        };

        chunks.push(text[start..actual_end].to_string());
        start = actual_end;
    }

    chunks
}

/// Message ids are `"<chat_id>:<message_id>"` so the emitter can forward them
pub fn message_key(chat_id: ChatId, message_id: MessageId) -> String {
    format!("{}:{}", chat_id.0, message_id.0)
}

fn parse_message_key(key: &str) -> Option<(ChatId, MessageId)> {
    let (chat, message) = key.rsplit_once(':')?;
    Some((ChatId(chat.parse().ok()?), MessageId(message.parse().ok()?)))
}

/// Directory entry for a Telegram account. Users without a username are
/// known by their numeric id.
fn directory_user(user: &teloxide::types::User) -> User {
    let internal_id = user.id.0.to_string();
    User {
        external_id: user.username.clone().unwrap_or_else(|| internal_id.clone()),
        internal_id,
        is_bot: user.is_bot,
    }
}

fn notification_text(notification: &Notification) -> String {
    let mut text = String::from("Your watch words were mentioned:\n");
    for word in &notification.words {
        text.push_str(&format!("  - {}\n", word));
    }
    if notification.author_is_bot == Some(true) {
        text.push_str("(posted by a bot)\n");
    }
    text
}

/// Run the Telegram listener, feeding group messages into `inbox`
pub async fn run(
    store: WatchStore,
    inbox: MessageInbox,
    watched_chat_ids: Vec<i64>,
    bot: Arc<Bot>,
) -> Result<()> {
    let bot = (*bot).clone();

    info!("Starting Telegram platform...");

    let handler = Update::filter_message()
        .filter_map(move |msg: Message| {
            if msg.chat.is_private() {
                return None;
            }
            if watched_chat_ids.is_empty() || watched_chat_ids.contains(&msg.chat.id.0) {
                Some(msg)
            } else {
                None
            }
        })
        .endpoint(handle_message);

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![store, inbox])
        .default_handler(|upd| async move {
            debug!("Unhandled update: {:?}", upd.id);
        })
        .error_handler(LoggingErrorHandler::with_custom_text("telegram"))
        .build()
        .dispatch()
        .await;

    Ok(())
}

async fn handle_message(msg: Message, store: WatchStore, inbox: MessageInbox) -> ResponseResult<()> {
    let user = match msg.from.as_ref() {
        Some(user) => user,
        None => return Ok(()),
    };

    let content = match msg.text().or_else(|| msg.caption()) {
        Some(t) => t.to_string(),
        None => return Ok(()),
    };

    let author = directory_user(user);
    if let Err(e) = store.upsert_user(&author).await {
        error!("Failed to record user {}: {:#}", author.internal_id, e);
    }

    debug!(
        "Queued message {} from {} in chat {}",
        msg.id.0, author.external_id, msg.chat.id.0
    );

    inbox
        .push(WatchMessage {
            id: message_key(msg.chat.id, msg.id),
            author_id: author.internal_id,
            content,
        })
        .await;

    Ok(())
}

/// Delivers notifications as direct messages and forwards the original message
pub struct TelegramEmitter {
    bot: Arc<Bot>,
}

impl TelegramEmitter {
    pub fn new(bot: Arc<Bot>) -> Self {
        Self { bot }
    }

    async fn deliver(&self, notification: &Notification) -> Result<()> {
        let target: i64 = notification
            .target_internal_id
            .parse()
            .with_context(|| format!("Invalid Telegram user id: {}", notification.target_internal_id))?;
        let target = ChatId(target);

        for chunk in split_message(&notification_text(notification), 4000) {
            self.bot
                .send_message(target, chunk)
                .await
                .context("Failed to send notification")?;
        }

        match parse_message_key(&notification.message_id) {
            Some((chat_id, message_id)) => {
                self.bot
                    .forward_message(target, chat_id, message_id)
                    .await
                    .context("Failed to forward message")?;
            }
            None => warn!("Cannot forward message with id {}", notification.message_id),
        }

        Ok(())
    }
}

#[async_trait]
impl NotificationEmitter for TelegramEmitter {
    async fn emit(&self, notifications: &[Notification]) -> Result<()> {
        let mut failed = 0;
        for notification in notifications {
            if let Err(e) = self.deliver(notification).await {
                failed += 1;
                error!(
                    "Failed to notify {} about {}: {:#}",
                    notification.target_external_id, notification.message_id, e
                );
            }
        }
        info!(
            "Delivered {}/{} notification(s)",
            notifications.len() - failed,
            notifications.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_key_round_trip() {
        let key = message_key(ChatId(-1001234), MessageId(42));
        assert_eq!(key, "-1001234:42");
        assert_eq!(parse_message_key(&key), Some((ChatId(-1001234), MessageId(42))));
    }

    #[test]
    fn test_parse_message_key_rejects_garbage() {
        assert_eq!(parse_message_key("m1"), None);
        assert_eq!(parse_message_key("chat:7"), None);
    }

    #[test]
    fn test_notification_text_lists_words() {
        let notification = Notification {
            words: vec!["cat".to_string(), "/do+g/".to_string()],
            target_external_id: "alice".to_string(),
            target_internal_id: "1001".to_string(),
            message_id: "-100:1".to_string(),
            author_is_bot: Some(true),
        };

        let text = notification_text(&notification);
        assert!(text.contains("  - cat\n"));
        assert!(text.contains("  - /do+g/\n"));
        assert!(text.contains("bot"));
    }

    #[test]
    fn test_split_message_respects_char_boundaries() {
        let text = "é".repeat(10);
        let chunks = split_message(&text, 5);
        assert!(chunks.iter().all(|c| c.len() <= 5));
        assert_eq!(chunks.concat(), text);
    }
}
