use anyhow::Result;
use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::aggregate::split_matched_words;
use super::{scan, Message, Notification, NotifyMode, ScanError, User, UserDirectory, WatchCatalog, WatchWord};

/// Words that matched one message for one owner, as returned by a
/// store-side query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedWords {
    /// Newline-joined word texts in catalog order
    pub matched_words: String,
    pub owner_external_id: String,
    pub owner_internal_id: String,
}

impl MatchedWords {
    pub fn into_notification(self, message_id: &str) -> Notification {
        Notification {
            words: split_matched_words(&self.matched_words),
            target_external_id: self.owner_external_id,
            target_internal_id: self.owner_internal_id,
            message_id: message_id.to_string(),
            author_is_bot: None,
        }
    }
}

/// Source of registered watch words
#[async_trait]
pub trait WordCatalog: Send + Sync {
    /// Every registered word, in catalog order
    async fn load_words(&self) -> Result<Vec<WatchWord>>;

    /// Words matching `message` that its owners are eligible to hear about,
    /// grouped per owner
    async fn find_matching_words(&self, message: &Message) -> Result<Vec<MatchedWords>>;
}

#[async_trait]
pub trait UserDirectorySource: Send + Sync {
    async fn load_users(&self) -> Result<Vec<User>>;
}

/// Delivery channel for finished notifications
#[async_trait]
pub trait NotificationEmitter: Send + Sync {
    async fn emit(&self, notifications: &[Notification]) -> Result<()>;
}

/// Load a catalog + directory snapshot and scan `messages` in process.
///
/// Any load failure aborts the pass with no partial results.
pub async fn scan_in_process(
    catalog: &dyn WordCatalog,
    directory: &dyn UserDirectorySource,
    messages: &[Message],
    mode: NotifyMode,
) -> Result<Vec<Notification>, ScanError> {
    let words = catalog.load_words().await.map_err(ScanError::CatalogLoad)?;
    let users = directory
        .load_users()
        .await
        .map_err(ScanError::UserDirectoryLoad)?;

    let catalog = WatchCatalog::compile(words);
    let users = UserDirectory::new(users);
    debug!(
        "Scanning {} message(s) against {} word(s) for {} user(s)",
        messages.len(),
        catalog.len(),
        users.len()
    );

    Ok(scan(messages, &catalog, &users, mode))
}

/// Ask the catalog store for each message's matches, in per-target mode.
///
/// Lookups run concurrently. A failed lookup drops only that message.
pub async fn scan_with_store_query(
    catalog: &dyn WordCatalog,
    messages: &[Message],
) -> Vec<Notification> {
    let lookups = messages.iter().map(|message| async move {
        let result = catalog.find_matching_words(message).await;
        (message, result)
    });

    let mut notifications = Vec::new();
    for (message, result) in join_all(lookups).await {
        match result {
            Ok(matched) => notifications.extend(
                matched
                    .into_iter()
                    .map(|m| m.into_notification(&message.id))
                    .filter(|n| !n.words.is_empty()),
            ),
            Err(e) => warn!("Skipping message {}: {:#}", message.id, e),
        }
    }

    notifications
}
